use serde::Serialize;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum GovernorError {
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Unknown engine: {0}")]
    UnknownEngine(String),

    #[error("Engine already registered: {0}")]
    DuplicateEngine(String),

    #[error("Unknown proxy: {0}")]
    UnknownProxy(String),

    #[error("Proxy already registered: {0}")]
    DuplicateProxy(String),

    #[error("Unknown strategy: {0}")]
    UnknownStrategy(String),

    #[error("Health check failed: {0}")]
    HealthCheck(String),

    #[error("Configuration error: {0}")]
    Config(String),
}
impl Serialize for GovernorError {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(self.to_string().as_str())
    }
}
pub type GovernorResult<T> = Result<T, GovernorError>;
