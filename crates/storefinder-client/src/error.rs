use thiserror::Error;

/// Errors from talking to the backend store service.
#[derive(Debug, Error)]
pub enum ClientError {
    /// Network or TLS failure from the underlying HTTP client.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("unexpected HTTP status {status} from {url}")]
    UnexpectedStatus { status: u16, url: String },

    /// The response body is not valid JSON or does not match the expected shape.
    #[error("JSON deserialization error for {context}: {source}")]
    Deserialize {
        context: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid backend URL \"{url}\": {reason}")]
    InvalidBaseUrl { url: String, reason: String },
}

/// Why the device position could not be obtained.
///
/// `Display` renders the message shown to the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum LocationError {
    #[error("Geolocation is not supported on this device.")]
    NotSupported,
    #[error("Location access denied. Please enable your location in the browser.")]
    PermissionDenied,
    #[error("Your location information is unavailable. Please check device settings.")]
    PositionUnavailable,
    #[error("Timed out while trying to retrieve your location. Please try again.")]
    Timeout,
    #[error("An unknown error occurred while trying to get your location.")]
    Unknown,
}

impl LocationError {
    /// Maps a W3C geolocation error code (1, 2, 3) to its variant.
    #[must_use]
    pub fn from_code(code: u16) -> Self {
        match code {
            1 => Self::PermissionDenied,
            2 => Self::PositionUnavailable,
            3 => Self::Timeout,
            _ => Self::Unknown,
        }
    }
}
