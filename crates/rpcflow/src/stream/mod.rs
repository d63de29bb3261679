//! Push sources, the push-to-pull bridge, and reply normalization.

mod bridge;
mod normalize;
mod push;

pub use bridge::{PullSequence, bridge};
pub use normalize::{Reply, normalize};
pub use push::{Observer, PushStream, Subscriber, Subscription};
