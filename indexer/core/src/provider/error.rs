use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("reqwest error: {0}")]
    Reqwest(#[from] reqwest::Error),
    #[error("invalid RPC URL: {0}")]
    InvalidUrl(String),
    #[error("unexpected response status {status} from {url}")]
    Status { status: u16, url: String },
    #[error("failed to decode response from {url}: {source}")]
    Body {
        url: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("invalid {field} {value:?} in response")]
    InvalidField { field: &'static str, value: String },
    #[error("provider unavailable: {0}")]
    Unavailable(String),
}
