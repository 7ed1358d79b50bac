//! Mastodon REST client.
//!
//! Authenticates as a registered application (client-credentials grant) and
//! reads an account's public statuses.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::de::IgnoredAny;
use serde::Deserialize;

use vbc_core::{Account, AccountId, AppCredentials, InstanceName, Post, PostId};
use vbc_sync::{ClientError, SourceClient};

use crate::http::{decode_error, send_json};

/// Name the application registers under.
pub const APP_NAME: &str = "Very Bad Crossposter";

/// Scope requested at registration and token time.
pub const APP_SCOPES: &str = "read:statuses";

/// Out-of-band redirect: the app never goes through an authorization page.
pub const NO_REDIRECT: &str = "urn:ietf:wg:oauth:2.0:oob";

/// Page size used while walking the full history.
pub const HISTORY_PAGE_SIZE: usize = 40;

#[derive(Debug, Deserialize)]
struct AppResponse {
    client_id: String,
    client_secret: String,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
}

#[derive(Debug, Deserialize)]
struct AccountResponse {
    id: String,
    username: String,
}

#[derive(Debug, Deserialize)]
struct StatusResponse {
    id: String,
    created_at: DateTime<Utc>,
    #[serde(default)]
    content: String,
    url: Option<String>,
    in_reply_to_id: Option<String>,
    #[serde(default)]
    media_attachments: Vec<IgnoredAny>,
}

impl StatusResponse {
    fn into_post(self, endpoint: &str) -> Result<Post, ClientError> {
        let id = self.id.parse().map_err(|e| decode_error(endpoint, e))?;
        let in_reply_to = self
            .in_reply_to_id
            .map(|id| id.parse::<PostId>())
            .transpose()
            .map_err(|e| decode_error(endpoint, e))?;

        Ok(Post {
            id,
            created_at: self.created_at,
            content: self.content,
            url: self.url,
            in_reply_to,
            attachment_count: self.media_attachments.len(),
        })
    }
}

/// Register a new application with `instance`.
pub async fn register_app(
    http: &reqwest::Client,
    instance: &InstanceName,
) -> Result<AppCredentials, ClientError> {
    let endpoint = "/api/v1/apps";
    let request = http.post(instance.join("api/v1/apps")).form(&[
        ("client_name", APP_NAME),
        ("redirect_uris", NO_REDIRECT),
        ("scopes", APP_SCOPES),
    ]);

    let app: AppResponse = send_json(endpoint, request).await?;
    tracing::info!(instance = %instance, client_id = %app.client_id, "registered application");

    Ok(AppCredentials {
        client_id: app.client_id,
        client_secret: app.client_secret,
    })
}

/// An authenticated connection to one Mastodon instance.
#[derive(Clone)]
pub struct MastodonClient {
    http: reqwest::Client,
    instance: InstanceName,
    access_token: String,
}

impl MastodonClient {
    /// Exchange application credentials for an app token.
    pub async fn connect(
        http: reqwest::Client,
        instance: InstanceName,
        credentials: &AppCredentials,
    ) -> Result<Self, ClientError> {
        let request = http.post(instance.join("oauth/token")).form(&[
            ("grant_type", "client_credentials"),
            ("client_id", credentials.client_id.as_str()),
            ("client_secret", credentials.client_secret.as_str()),
            ("redirect_uri", NO_REDIRECT),
            ("scope", APP_SCOPES),
        ]);

        let token: TokenResponse = send_json("/oauth/token", request).await.map_err(|e| match e {
            ClientError::Status { status, body, .. } if status == 400 => {
                ClientError::Auth(format!("token request rejected: {}", body))
            }
            other => other,
        })?;

        Ok(Self {
            http,
            instance,
            access_token: token.access_token,
        })
    }

    pub fn instance(&self) -> &InstanceName {
        &self.instance
    }

    async fn statuses_page(
        &self,
        account: AccountId,
        limit: usize,
        max_id: Option<PostId>,
    ) -> Result<Vec<Post>, ClientError> {
        let path = format!("api/v1/accounts/{}/statuses", account);
        let endpoint = format!("/{}", path);

        let mut query = vec![("limit", limit.to_string())];
        if let Some(max_id) = max_id {
            query.push(("max_id", max_id.to_string()));
        }

        let request = self
            .http
            .get(self.instance.join(&path))
            .bearer_auth(&self.access_token)
            .query(&query);
        let statuses: Vec<StatusResponse> = send_json(&endpoint, request).await?;

        statuses
            .into_iter()
            .map(|status| status.into_post(&endpoint))
            .collect()
    }
}

/// Cursor for the page after `page`: the oldest ID seen.
fn next_max_id(page: &[Post]) -> Option<PostId> {
    page.iter().map(|post| post.id).min()
}

#[async_trait]
impl SourceClient for MastodonClient {
    async fn get_account(&self, id: AccountId) -> Result<Account, ClientError> {
        let path = format!("api/v1/accounts/{}", id);
        let endpoint = format!("/{}", path);
        let request = self
            .http
            .get(self.instance.join(&path))
            .bearer_auth(&self.access_token);

        let account: AccountResponse = send_json(&endpoint, request).await?;
        let parsed: AccountId = account
            .id
            .parse()
            .map_err(|e| decode_error(&endpoint, e))?;
        if parsed != id {
            return Err(decode_error(
                &endpoint,
                format!("asked for account {} but got {}", id, parsed),
            ));
        }

        Ok(Account {
            id: parsed,
            handle: account.username,
        })
    }

    async fn get_post_history(&self, account: AccountId) -> Result<Vec<Post>, ClientError> {
        let mut history = Vec::new();
        let mut max_id = None;

        loop {
            let page = self
                .statuses_page(account, HISTORY_PAGE_SIZE, max_id)
                .await?;
            if page.is_empty() {
                break;
            }

            let next = next_max_id(&page);
            tracing::debug!(account = %account, fetched = page.len(), "fetched history page");
            history.extend(page);

            if next.is_none() || next == max_id {
                break;
            }
            max_id = next;
        }

        Ok(history)
    }

    async fn get_recent_posts(
        &self,
        account: AccountId,
        limit: usize,
    ) -> Result<Vec<Post>, ClientError> {
        self.statuses_page(account, limit, None).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const STATUS: &str = r#"{
        "id": "110000000000000042",
        "created_at": "2023-05-01T12:30:00.000Z",
        "content": "<p>hello</p>",
        "url": "https://tiggi.es/@mbr/110000000000000042",
        "in_reply_to_id": null,
        "media_attachments": [],
        "visibility": "public"
    }"#;

    fn parse(json: &str) -> Result<Post, ClientError> {
        serde_json::from_str::<StatusResponse>(json)
            .unwrap()
            .into_post("/test")
    }

    #[test]
    fn test_status_to_post() {
        let post = parse(STATUS).unwrap();
        assert_eq!(post.id, PostId(110000000000000042));
        assert_eq!(post.content, "<p>hello</p>");
        assert_eq!(post.created_at.to_rfc3339(), "2023-05-01T12:30:00+00:00");
        assert!(!post.is_reply());
        assert!(!post.has_attachments());
    }

    #[test]
    fn test_status_reply_and_media() {
        let json = r#"{
            "id": "7",
            "created_at": "2023-05-01T12:30:00Z",
            "content": "",
            "url": null,
            "in_reply_to_id": "6",
            "media_attachments": [{"id": "1", "type": "image"}, {"id": "2", "type": "video"}]
        }"#;
        let post = parse(json).unwrap();
        assert_eq!(post.in_reply_to, Some(PostId(6)));
        assert_eq!(post.attachment_count, 2);
        assert_eq!(post.url, None);
    }

    #[test]
    fn test_status_bad_id() {
        let json = r#"{"id": "abc", "created_at": "2023-05-01T12:30:00Z"}"#;
        assert!(matches!(parse(json), Err(ClientError::Decode { .. })));
    }

    #[test]
    fn test_next_max_id() {
        let page: Vec<Post> = [30, 20, 25]
            .into_iter()
            .map(|id| parse(STATUS).map(|p| Post { id: PostId(id), ..p }).unwrap())
            .collect();
        assert_eq!(next_max_id(&page), Some(PostId(20)));
        assert_eq!(next_max_id(&[]), None);
    }

    #[test]
    fn test_app_response_shape() {
        let json = r#"{"id":"1","name":"Very Bad Crossposter","client_id":"cid","client_secret":"cs","vapid_key":"x"}"#;
        let app: AppResponse = serde_json::from_str(json).unwrap();
        assert_eq!(app.client_id, "cid");
        assert_eq!(app.client_secret, "cs");
    }
}
