#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("invalid bridge endpoint: {0}")]
    InvalidEndpoint(String),
    #[error("call request failed: {0}")]
    Request(reqwest::Error),
    #[error("bridge rejected the call: {0}")]
    Rejected(String),
    #[error("failed to decode bridge response: {0}")]
    Decode(reqwest::Error),
}

pub type ClientResult<T> = std::result::Result<T, ClientError>;
