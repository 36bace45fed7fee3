use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("DEEPSEEK_API_KEY environment variable not set")]
    MissingCredential,

    #[error(transparent)]
    Http(#[from] reqwest::Error),

    #[error("chat API error ({status}): {body}")]
    Api { status: u16, body: String },

    #[error("completion contained no message content")]
    EmptyCompletion,

    #[error("{context}")]
    MalformedResponse {
        context: String,
        #[source]
        source: serde_json::Error,
    },
}

impl ClientError {
    pub(crate) fn malformed(context: impl Into<String>, source: serde_json::Error) -> Self {
        Self::MalformedResponse {
            context: context.into(),
            source,
        }
    }
}
