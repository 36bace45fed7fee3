use deepseek_client::ClientError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CuratorError {
    #[error(transparent)]
    Llm(#[from] ClientError),

    #[error("verdict store I/O: {0}")]
    StoreIo(#[from] std::io::Error),

    #[error("verdict store is corrupt: {0}")]
    StoreFormat(#[from] serde_json::Error),
}
