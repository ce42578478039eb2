use thiserror::Error;

/// Errors returned by the places client.
#[derive(Debug, Error)]
pub enum PlacesError {
    /// Network or TLS failure from the underlying HTTP client.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Google API returned status {status}")]
    UnexpectedStatus { status: u16 },

    /// The search response carried a `status` other than `OK` or `ZERO_RESULTS`.
    #[error("Google API error: {status} - {message}")]
    ApiStatus { status: String, message: String },

    #[error("JSON deserialization error for {context}: {source}")]
    Deserialize {
        context: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid places base URL \"{url}\": {reason}")]
    InvalidBaseUrl { url: String, reason: String },
}
