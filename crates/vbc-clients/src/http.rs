//! Shared request plumbing for the platform clients.

use reqwest::{RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;

use vbc_sync::ClientError;

/// Build the HTTP client shared by every platform client.
pub fn build_http_client() -> Result<reqwest::Client, ClientError> {
    reqwest::Client::builder()
        .user_agent(concat!("vbc/", env!("CARGO_PKG_VERSION")))
        .build()
        .map_err(|e| ClientError::Transport {
            endpoint: "client setup".to_string(),
            reason: e.to_string(),
        })
}

/// Send `request` and decode a JSON body, mapping failures onto [`ClientError`].
pub(crate) async fn send_json<T: DeserializeOwned>(
    endpoint: &str,
    request: RequestBuilder,
) -> Result<T, ClientError> {
    let response = request.send().await.map_err(|e| ClientError::Transport {
        endpoint: endpoint.to_string(),
        reason: e.to_string(),
    })?;

    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(status_error(endpoint, status, body));
    }

    response.json().await.map_err(|e| ClientError::Decode {
        endpoint: endpoint.to_string(),
        reason: e.to_string(),
    })
}

pub(crate) fn status_error(endpoint: &str, status: StatusCode, body: String) -> ClientError {
    match status {
        StatusCode::NOT_FOUND => ClientError::NotFound(endpoint.to_string()),
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
            ClientError::Auth(format!("{} returned {}: {}", endpoint, status.as_u16(), body))
        }
        _ => ClientError::Status {
            endpoint: endpoint.to_string(),
            status: status.as_u16(),
            body,
        },
    }
}

/// Decode-error helper for payloads that parse as JSON but carry bad values.
pub(crate) fn decode_error(endpoint: &str, reason: impl ToString) -> ClientError {
    ClientError::Decode {
        endpoint: endpoint.to_string(),
        reason: reason.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            status_error("/x", StatusCode::NOT_FOUND, String::new()),
            ClientError::NotFound("/x".into())
        );
        assert!(matches!(
            status_error("/x", StatusCode::UNAUTHORIZED, "nope".into()),
            ClientError::Auth(msg) if msg.contains("401") && msg.contains("nope")
        ));
        assert_eq!(
            status_error("/x", StatusCode::BAD_GATEWAY, "down".into()),
            ClientError::Status {
                endpoint: "/x".into(),
                status: 502,
                body: "down".into()
            }
        );
    }

    #[test]
    fn test_build_client() {
        assert!(build_http_client().is_ok());
    }
}
