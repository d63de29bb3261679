pub mod client;
pub mod echo;

/// Wire messages for the demo echo service.
pub mod echo_proto {
    #[derive(Clone, PartialEq, prost::Message)]
    pub struct EchoRequest {
        #[prost(string, tag = "1")]
        pub message: String,
    }

    #[derive(Clone, PartialEq, prost::Message)]
    pub struct EchoResponse {
        #[prost(string, tag = "1")]
        pub message: String,
        #[prost(string, tag = "2")]
        pub call_id: String,
    }

    #[derive(Clone, PartialEq, prost::Message)]
    pub struct CountdownRequest {
        #[prost(uint32, tag = "1")]
        pub from: u32,
    }

    #[derive(Clone, PartialEq, prost::Message)]
    pub struct Tick {
        #[prost(uint32, tag = "1")]
        pub remaining: u32,
    }

    #[derive(Clone, PartialEq, prost::Message)]
    pub struct SumRequest {
        #[prost(int64, tag = "1")]
        pub value: i64,
    }

    #[derive(Clone, PartialEq, prost::Message)]
    pub struct SumResponse {
        #[prost(int64, tag = "1")]
        pub total: i64,
        #[prost(uint32, tag = "2")]
        pub count: u32,
    }

    #[derive(Clone, PartialEq, prost::Message)]
    pub struct ChatMessage {
        #[prost(string, tag = "1")]
        pub from: String,
        #[prost(string, tag = "2")]
        pub text: String,
    }
}

/// Declaring-type name the echo handlers are registered under.
pub const ECHO_SERVICE: &str = "EchoService";

/// Package-qualified name of the echo service on the wire.
pub const ECHO_SERVICE_FULL_NAME: &str = "demo.EchoService";
