use thiserror::Error;

#[derive(Error, Debug)]
pub enum PimError {
    #[error("Unknown field: {field} (service {service})")]
    InvalidField { field: String, service: String },
    #[error("Malformed timestamp: {0}")]
    MalformedTimestamp(String),
    #[error("Provider error: {0}")]
    Provider(String),
    #[error("Transport error: {0}")]
    Transport(String),
    #[error("Protocol error: {0}")]
    Protocol(String),
    #[error("Config error: {0}")]
    Config(String),
    #[error("I/O error: {0}")]
    Io(String),
}

pub type Result<T> = std::result::Result<T, PimError>;

// Helper conversions
impl From<rusqlite::Error> for PimError {
    fn from(e: rusqlite::Error) -> Self { Self::Provider(e.to_string()) }
}
impl From<serde_json::Error> for PimError {
    fn from(e: serde_json::Error) -> Self { Self::Protocol(e.to_string()) }
}
impl From<tokio_tungstenite::tungstenite::Error> for PimError {
    fn from(e: tokio_tungstenite::tungstenite::Error) -> Self { Self::Transport(e.to_string()) }
}
impl From<::config::ConfigError> for PimError {
    fn from(e: ::config::ConfigError) -> Self { Self::Config(e.to_string()) }
}
impl From<tokio::task::JoinError> for PimError {
    fn from(e: tokio::task::JoinError) -> Self { Self::Provider(format!("query task failed: {e}")) }
}
impl From<std::io::Error> for PimError {
    fn from(e: std::io::Error) -> Self { Self::Io(e.to_string()) }
}
