use std::time::Duration;

#[derive(Debug, thiserror::Error)]
pub enum TrialScoutError {
    #[error("Failed to build HTTP client: {0}")]
    HttpClientInit(#[source] reqwest::Error),

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("{api} did not respond within {timeout:?}")]
    Timeout { api: String, timeout: Duration },

    #[error("{api} API error: {message}")]
    Api { api: String, message: String },

    #[error("{api} returned invalid JSON: {source}")]
    ApiJson {
        api: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Template error: {0}")]
    Template(#[from] minijinja::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl TrialScoutError {
    /// Maps a transport failure, keeping timeouts distinguishable from other send errors.
    pub(crate) fn from_send(api: &str, timeout: Duration, err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout {
                api: api.to_string(),
                timeout,
            }
        } else {
            Self::Http(err)
        }
    }
}
