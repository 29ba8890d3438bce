use thiserror::Error;

/// All socket/HTTP/WS transport errors generated by `meridian-integration`
/// adapters. Mirrors `barter-integration::error::SocketError`.
#[derive(Debug, Error)]
pub enum SocketError {
    #[error("Sink error")]
    Sink,

    #[error("deserialising JSON error: {error} for payload: {payload}")]
    Deserialise {
        error: serde_json::Error,
        payload: String,
    },

    #[error("serialising JSON error: {0}")]
    Serialise(serde_json::Error),

    #[error("SerDe query string serialisation error: {0}")]
    QueryParams(#[from] serde_qs::Error),

    #[error("error parsing Url: {0}")]
    UrlParse(#[from] url::ParseError),

    #[error("error subscribing to resources over the socket: {0}")]
    Subscribe(String),

    #[error("stream terminated with closing frame: {0}")]
    Terminated(String),

    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    #[error("HTTP error: {0}")]
    Http(reqwest::Error),

    #[error("HTTP request timed out")]
    HttpTimeout(reqwest::Error),

    #[error("HTTP response (status={0}) error: {1}")]
    HttpResponse(reqwest::StatusCode, String),

    #[error("consumed error message from exchange: {0}")]
    Exchange(String),
}

impl From<reqwest::Error> for SocketError {
    fn from(error: reqwest::Error) -> Self {
        if error.is_timeout() {
            SocketError::HttpTimeout(error)
        } else {
            SocketError::Http(error)
        }
    }
}
