#[derive(Debug, thiserror::Error)]
pub enum BridgeError {
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("invalid listen address: {0}")]
    InvalidListenAddr(std::net::AddrParseError),
}

pub type BridgeResult<T> = std::result::Result<T, BridgeError>;
