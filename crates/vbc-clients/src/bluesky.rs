//! Bluesky XRPC client.
//!
//! Logs in with an app password, resolves profiles and creates feed posts.
//! Access tokens are short-lived; an expired token is refreshed once and the
//! rejected call is repeated.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use vbc_core::{DestinationProfile, PublishedRecord};
use vbc_sync::{ClientError, DestinationClient};

use crate::http::send_json;

/// Default personal data server.
pub const DEFAULT_SERVER: &str = "https://bsky.social";

/// Collection every mirrored post is written into.
pub const POST_COLLECTION: &str = "app.bsky.feed.post";

const CREATE_SESSION: &str = "com.atproto.server.createSession";
const REFRESH_SESSION: &str = "com.atproto.server.refreshSession";
const GET_PROFILE: &str = "app.bsky.actor.getProfile";
const CREATE_RECORD: &str = "com.atproto.repo.createRecord";

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Session {
    access_jwt: String,
    refresh_jwt: String,
    did: String,
    handle: String,
}

#[derive(Debug, Serialize)]
struct CreateSessionInput<'a> {
    identifier: &'a str,
    password: &'a str,
}

#[derive(Debug, Deserialize)]
struct ProfileView {
    did: String,
    handle: String,
}

#[derive(Debug, Serialize)]
struct FeedPost<'a> {
    #[serde(rename = "$type")]
    kind: &'static str,
    text: &'a str,
    #[serde(rename = "createdAt")]
    created_at: String,
}

#[derive(Debug, Serialize)]
struct CreateRecordInput<'a> {
    repo: &'a str,
    collection: &'static str,
    record: FeedPost<'a>,
}

#[derive(Debug, Deserialize)]
struct CreateRecordOutput {
    uri: String,
    cid: String,
}

/// Build the `createRecord` body for one post.
fn post_record<'a>(
    repo: &'a str,
    text: &'a str,
    created_at: DateTime<Utc>,
) -> CreateRecordInput<'a> {
    CreateRecordInput {
        repo,
        collection: POST_COLLECTION,
        record: FeedPost {
            kind: POST_COLLECTION,
            text,
            created_at: created_at.to_rfc3339_opts(SecondsFormat::Secs, true),
        },
    }
}

fn is_expired_token(error: &ClientError) -> bool {
    match error {
        ClientError::Status { status: 400, body, .. } => body.contains("ExpiredToken"),
        ClientError::Auth(message) => message.contains("ExpiredToken"),
        _ => false,
    }
}

/// An authenticated session with a Bluesky server.
#[derive(Clone)]
pub struct BlueskyClient {
    http: reqwest::Client,
    server: String,
    session: Arc<RwLock<Session>>,
}

impl BlueskyClient {
    /// Log in to `server` as `handle` with an app password.
    pub async fn login(
        http: reqwest::Client,
        server: &str,
        handle: &str,
        app_key: &str,
    ) -> Result<Self, ClientError> {
        let server = server.trim_end_matches('/').to_string();
        tracing::info!(server = %server, handle = %handle, "logging in");

        let request = http
            .post(xrpc_url(&server, CREATE_SESSION))
            .json(&CreateSessionInput {
                identifier: handle,
                password: app_key,
            });
        let session: Session = send_json(CREATE_SESSION, request).await?;
        tracing::debug!(did = %session.did, "session created");

        Ok(Self {
            http,
            server,
            session: Arc::new(RwLock::new(session)),
        })
    }

    /// DID and handle of the logged-in account.
    pub async fn session_profile(&self) -> DestinationProfile {
        let session = self.session.read().await;
        DestinationProfile {
            did: session.did.clone(),
            handle: session.handle.clone(),
        }
    }

    async fn access_token(&self) -> String {
        self.session.read().await.access_jwt.clone()
    }

    async fn refresh(&self) -> Result<(), ClientError> {
        let refresh_jwt = self.session.read().await.refresh_jwt.clone();
        let request = self
            .http
            .post(xrpc_url(&self.server, REFRESH_SESSION))
            .bearer_auth(refresh_jwt);

        let session: Session = send_json(REFRESH_SESSION, request).await?;
        *self.session.write().await = session;
        tracing::debug!("refreshed session");
        Ok(())
    }

    async fn get_profile(&self, handle: &str) -> Result<ProfileView, ClientError> {
        let request = self
            .http
            .get(xrpc_url(&self.server, GET_PROFILE))
            .bearer_auth(self.access_token().await)
            .query(&[("actor", handle)]);
        send_json(GET_PROFILE, request).await
    }

    async fn create_record(
        &self,
        input: &CreateRecordInput<'_>,
    ) -> Result<CreateRecordOutput, ClientError> {
        let request = self
            .http
            .post(xrpc_url(&self.server, CREATE_RECORD))
            .bearer_auth(self.access_token().await)
            .json(input);
        send_json(CREATE_RECORD, request).await
    }
}

fn xrpc_url(server: &str, method: &str) -> String {
    format!("{}/xrpc/{}", server, method)
}

#[async_trait]
impl DestinationClient for BlueskyClient {
    async fn resolve_profile(&self, handle: &str) -> Result<DestinationProfile, ClientError> {
        let profile = match self.get_profile(handle).await {
            Err(e) if is_expired_token(&e) => {
                self.refresh().await?;
                self.get_profile(handle).await?
            }
            other => other?,
        };

        Ok(DestinationProfile {
            did: profile.did,
            handle: profile.handle,
        })
    }

    async fn create_post(
        &self,
        profile: &DestinationProfile,
        text: &str,
        created_at: DateTime<Utc>,
    ) -> Result<PublishedRecord, ClientError> {
        let input = post_record(&profile.did, text, created_at);

        // An expired token means the record was not created, so repeating is safe.
        let output = match self.create_record(&input).await {
            Err(e) if is_expired_token(&e) => {
                self.refresh().await?;
                self.create_record(&input).await?
            }
            other => other?,
        };

        Ok(PublishedRecord::new(output.cid, output.uri))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_post_record_shape() {
        let created_at = Utc.with_ymd_and_hms(2023, 5, 1, 12, 30, 0).unwrap();
        let input = post_record("did:plc:abc", "hello", created_at);

        let json = serde_json::to_value(&input).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "repo": "did:plc:abc",
                "collection": "app.bsky.feed.post",
                "record": {
                    "$type": "app.bsky.feed.post",
                    "text": "hello",
                    "createdAt": "2023-05-01T12:30:00Z"
                }
            })
        );
    }

    #[test]
    fn test_session_shape() {
        let json = r#"{"accessJwt":"a","refreshJwt":"r","did":"did:plc:abc","handle":"mbr.bsky.social","active":true}"#;
        let session: Session = serde_json::from_str(json).unwrap();
        assert_eq!(session.did, "did:plc:abc");
        assert_eq!(session.refresh_jwt, "r");
    }

    #[test]
    fn test_create_output_shape() {
        let json = r#"{"uri":"at://did:plc:abc/app.bsky.feed.post/3k","cid":"bafyrei","commit":{}}"#;
        let output: CreateRecordOutput = serde_json::from_str(json).unwrap();
        assert_eq!(output.cid, "bafyrei");
    }

    #[test]
    fn test_expired_token_detection() {
        let expired = ClientError::Status {
            endpoint: CREATE_RECORD.into(),
            status: 400,
            body: r#"{"error":"ExpiredToken","message":"Token has expired"}"#.into(),
        };
        assert!(is_expired_token(&expired));

        let other = ClientError::Status {
            endpoint: CREATE_RECORD.into(),
            status: 400,
            body: r#"{"error":"InvalidRequest"}"#.into(),
        };
        assert!(!is_expired_token(&other));
    }

    #[test]
    fn test_xrpc_url() {
        assert_eq!(
            xrpc_url("https://bsky.social", GET_PROFILE),
            "https://bsky.social/xrpc/app.bsky.actor.getProfile"
        );
    }
}
