/// Configuration for the service binder.
#[derive(Debug, Clone, Default)]
pub struct BinderConfig {
    /// Fail the bind when a handler's service has no registered descriptor.
    ///
    /// Off by default: such services are skipped with a warning and counted.
    pub strict: bool,
}

impl BinderConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set strict mode.
    pub fn with_strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }
}
