//! Upstream HTTP clients and the helpers they share.

use std::borrow::Cow;
use std::time::Duration;

use crate::error::TrialScoutError;

pub mod clinicaltrials;
pub mod completion;

const MAX_BODY_BYTES: usize = 16 * 1024 * 1024;
const BODY_EXCERPT_CHARS: usize = 300;
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Builds the HTTP client used by every upstream source.
///
/// Request timeouts are applied per call by each client, so none is set here.
pub(crate) fn http_client() -> Result<reqwest::Client, TrialScoutError> {
    reqwest::Client::builder()
        .connect_timeout(CONNECT_TIMEOUT)
        .user_agent(concat!("trialscout/", env!("CARGO_PKG_VERSION")))
        .build()
        .map_err(TrialScoutError::HttpClientInit)
}

/// Returns the base URL from `env_var` when set and non-empty, otherwise `default`.
pub(crate) fn env_base(default: &'static str, env_var: &str) -> Cow<'static, str> {
    match std::env::var(env_var) {
        Ok(value) if !value.trim().is_empty() => Cow::Owned(value.trim().to_string()),
        _ => Cow::Borrowed(default),
    }
}

pub(crate) fn join_endpoint(base: &str, path: &str) -> String {
    format!(
        "{}/{}",
        base.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}

/// Reads a response body, refusing anything larger than the fixed cap.
pub(crate) async fn read_limited_body(
    mut resp: reqwest::Response,
    api: &str,
    timeout: Duration,
) -> Result<Vec<u8>, TrialScoutError> {
    if resp
        .content_length()
        .is_some_and(|len| len > MAX_BODY_BYTES as u64)
    {
        return Err(TrialScoutError::Api {
            api: api.to_string(),
            message: format!("Response body exceeds {MAX_BODY_BYTES} bytes"),
        });
    }

    let mut body = Vec::new();
    while let Some(chunk) = resp
        .chunk()
        .await
        .map_err(|err| TrialScoutError::from_send(api, timeout, err))?
    {
        if body.len() + chunk.len() > MAX_BODY_BYTES {
            return Err(TrialScoutError::Api {
                api: api.to_string(),
                message: format!("Response body exceeds {MAX_BODY_BYTES} bytes"),
            });
        }
        body.extend_from_slice(&chunk);
    }
    Ok(body)
}

/// Short, single-line excerpt of a body for error messages.
pub(crate) fn body_excerpt(bytes: &[u8]) -> String {
    let text = String::from_utf8_lossy(bytes);
    let collapsed = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if collapsed.chars().count() <= BODY_EXCERPT_CHARS {
        return collapsed;
    }
    let mut out = collapsed.chars().take(BODY_EXCERPT_CHARS).collect::<String>();
    out.push('…');
    out
}
