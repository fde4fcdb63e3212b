use reqwest::StatusCode;
use thiserror::Error;
use url::Url;

/// Failure of a single fetch. Every variant is terminal for that call.
#[derive(Debug, Error)]
pub enum FetchError {
    /// Transport failure: connect, DNS, timeout or reading the body.
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Server answered with a non-success status. The body is not parsed.
    #[error("request to {url} failed with status {status}")]
    Http { status: StatusCode, url: Url },

    /// Body arrived but is not valid JSON. `body` is truncated for display.
    #[error("failed to parse JSON from {url}: {source} (body: {body})")]
    Parse {
        url: Url,
        body: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid request URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// The task driving the request was torn down by the runtime.
    #[error("request was cancelled before it completed")]
    Cancelled,
}

impl FetchError {
    /// Status code carried by an HTTP failure.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            Self::Http { status, .. } => Some(*status),
            Self::Network(err) => err.status(),
            _ => None,
        }
    }

    pub fn is_network(&self) -> bool {
        matches!(self, Self::Network(_))
    }
}

pub(crate) fn truncate_body(body: &[u8]) -> String {
    const MAX: usize = 200;
    let text = String::from_utf8_lossy(body);
    if text.len() > MAX {
        let mut end = MAX;
        while !text.is_char_boundary(end) {
            end -= 1;
        }
        format!("{}...", &text[..end])
    } else {
        text.into_owned()
    }
}
