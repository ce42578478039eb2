use reqwest::{Client, Url};
use serde::de::DeserializeOwned;

use crate::error::ClientError;

/// GETs `url` and decodes a JSON array of `T`.
///
/// A body that is valid JSON but not an array yields an empty list. Items
/// that do not decode as `T` are skipped.
///
/// # Errors
///
/// - [`ClientError::Http`] on transport failure.
/// - [`ClientError::UnexpectedStatus`] on a non-2xx response.
/// - [`ClientError::Deserialize`] when the body is not JSON.
pub(crate) async fn fetch_array<T: DeserializeOwned>(
    client: &Client,
    url: &Url,
) -> Result<Vec<T>, ClientError> {
    let response = client.get(url.clone()).send().await?;
    let status = response.status();
    if !status.is_success() {
        return Err(ClientError::UnexpectedStatus {
            status: status.as_u16(),
            url: url.to_string(),
        });
    }

    let body = response.text().await?;
    let value: serde_json::Value =
        serde_json::from_str(&body).map_err(|e| ClientError::Deserialize {
            context: url.to_string(),
            source: e,
        })?;

    let serde_json::Value::Array(items) = value else {
        tracing::warn!(url = %url, "expected a JSON array; treating as empty");
        return Ok(Vec::new());
    };

    let total = items.len();
    let parsed: Vec<T> = items
        .into_iter()
        .filter_map(|item| match serde_json::from_value(item) {
            Ok(parsed) => Some(parsed),
            Err(e) => {
                tracing::debug!(url = %url, error = %e, "skipping malformed item");
                None
            }
        })
        .collect();
    if parsed.len() < total {
        tracing::debug!(url = %url, total, kept = parsed.len(), "dropped malformed items");
    }
    Ok(parsed)
}
