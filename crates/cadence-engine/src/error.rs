use cadence_ir::BufferError;

/// Result alias carrying [`EngineError`].
pub type Result<T> = std::result::Result<T, EngineError>;

/// Structural errors raised while wiring a synth.
///
/// Numeric misuse never ends up here; it is coerced to a safe default.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// No factory or alias is registered under this name.
    #[error("unknown ugen: {0}")]
    UnknownUGen(String),
    /// A ugen key such as `"adsr#amp.env"` could not be parsed.
    #[error("invalid ugen key {key:?}: {reason}")]
    InvalidKey { key: String, reason: &'static str },
    /// Alias resolution came back to a name it had already visited.
    #[error("alias cycle through {0}")]
    AliasCycle(String),
    /// A ugen spec value had the wrong shape for its key.
    #[error("ugen {ugen}: {message}")]
    InvalidSpec { ugen: String, message: String },
    #[error("invalid config: {0}")]
    Config(#[from] serde_json::Error),
    #[error(transparent)]
    Buffer(#[from] BufferError),
}

impl EngineError {
    /// A malformed option on ugen `ugen`.
    pub fn invalid_spec(ugen: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidSpec {
            ugen: ugen.into(),
            message: message.into(),
        }
    }
}
