//! Mastodon application credentials.
//!
//! Credentials come from the environment if both halves are set, otherwise
//! from the ledger's reserved keys, otherwise from a fresh registration that is
//! then saved to the ledger.

use async_trait::async_trait;

use vbc_core::{AppCredentials, InstanceName};
use vbc_ledger::Ledger;
use vbc_sync::ClientError;

use crate::error::{CredentialError, Result};
use crate::mastodon;

/// Where the credentials in use came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CredentialSource {
    Environment,
    Ledger,
    Registered,
}

/// Registers new applications with a source instance.
#[async_trait]
pub trait AppRegistrar: Send + Sync {
    async fn register(
        &self,
        instance: &InstanceName,
    ) -> std::result::Result<AppCredentials, ClientError>;
}

/// Registers over HTTP via `POST /api/v1/apps`.
pub struct MastodonRegistrar {
    http: reqwest::Client,
}

impl MastodonRegistrar {
    pub fn new(http: reqwest::Client) -> Self {
        Self { http }
    }
}

#[async_trait]
impl AppRegistrar for MastodonRegistrar {
    async fn register(
        &self,
        instance: &InstanceName,
    ) -> std::result::Result<AppCredentials, ClientError> {
        mastodon::register_app(&self.http, instance).await
    }
}

/// Pair up the two optional environment values.
///
/// Returns `None`, with a warning, when only one of them is set.
pub fn pair_from_env(
    client_id: Option<String>,
    client_secret: Option<String>,
) -> Option<AppCredentials> {
    match (client_id, client_secret) {
        (Some(client_id), Some(client_secret)) => Some(AppCredentials {
            client_id,
            client_secret,
        }),
        (Some(_), None) => {
            tracing::warn!(
                "VBC_MASTODON_APP_SECRET is not set when VBC_MASTODON_APP_ID is, ignoring"
            );
            None
        }
        (None, Some(_)) => {
            tracing::warn!(
                "VBC_MASTODON_APP_ID is not set when VBC_MASTODON_APP_SECRET is, ignoring"
            );
            None
        }
        (None, None) => None,
    }
}

/// Find or create the application credentials for `instance`.
///
/// A failure to save freshly registered credentials is not fatal: the operator
/// is told which environment variables to set and the credentials are used
/// for this run.
pub async fn resolve_app_credentials<L, R>(
    instance: &InstanceName,
    from_env: Option<AppCredentials>,
    ledger: &L,
    registrar: &R,
) -> Result<(AppCredentials, CredentialSource)>
where
    L: Ledger + ?Sized,
    R: AppRegistrar + ?Sized,
{
    if let Some(credentials) = from_env {
        tracing::info!("restoring application from environment variables");
        return Ok((credentials, CredentialSource::Environment));
    }

    if let Some(credentials) = ledger.load_credentials(instance).await? {
        tracing::info!("restoring application from store");
        return Ok((credentials, CredentialSource::Ledger));
    }

    tracing::info!(instance = %instance, "registering new application");
    let credentials = registrar
        .register(instance)
        .await
        .map_err(CredentialError::Register)?;

    if let Err(e) = ledger.store_credentials(instance, &credentials).await {
        tracing::warn!(error = %e, "application credentials could not be saved to the store");
        tracing::warn!("use the following environment variables going forward:");
        tracing::warn!("VBC_MASTODON_APP_ID=\"{}\"", credentials.client_id);
        tracing::warn!("VBC_MASTODON_APP_SECRET=\"{}\"", credentials.client_secret);
    }

    Ok((credentials, CredentialSource::Registered))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use vbc_ledger::MemoryLedger;

    struct FakeRegistrar {
        calls: AtomicUsize,
        fail: bool,
    }

    impl FakeRegistrar {
        fn new(fail: bool) -> Self {
            Self {
                calls: AtomicUsize::new(0),
                fail,
            }
        }
    }

    #[async_trait]
    impl AppRegistrar for FakeRegistrar {
        async fn register(
            &self,
            _instance: &InstanceName,
        ) -> std::result::Result<AppCredentials, ClientError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(ClientError::Status {
                    endpoint: "/api/v1/apps".into(),
                    status: 422,
                    body: "invalid".into(),
                });
            }
            Ok(creds("registered"))
        }
    }

    fn creds(tag: &str) -> AppCredentials {
        AppCredentials {
            client_id: format!("{}-id", tag),
            client_secret: format!("{}-secret", tag),
        }
    }

    fn instance() -> InstanceName {
        InstanceName::canonicalize("https://tiggi.es").unwrap()
    }

    #[test]
    fn test_pair_from_env() {
        assert_eq!(
            pair_from_env(Some("a".into()), Some("b".into())),
            Some(AppCredentials {
                client_id: "a".into(),
                client_secret: "b".into()
            })
        );
        assert_eq!(pair_from_env(Some("a".into()), None), None);
        assert_eq!(pair_from_env(None, Some("b".into())), None);
        assert_eq!(pair_from_env(None, None), None);
    }

    #[tokio::test]
    async fn test_environment_wins() {
        let ledger = MemoryLedger::new();
        ledger.store_credentials(&instance(), &creds("stored")).await.unwrap();
        let registrar = FakeRegistrar::new(false);

        let (credentials, source) =
            resolve_app_credentials(&instance(), Some(creds("env")), &ledger, &registrar)
                .await
                .unwrap();
        assert_eq!(credentials, creds("env"));
        assert_eq!(source, CredentialSource::Environment);
        assert_eq!(registrar.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_ledger_before_registration() {
        let ledger = MemoryLedger::new();
        ledger.store_credentials(&instance(), &creds("stored")).await.unwrap();
        let registrar = FakeRegistrar::new(false);

        let (credentials, source) = resolve_app_credentials(&instance(), None, &ledger, &registrar)
            .await
            .unwrap();
        assert_eq!(credentials, creds("stored"));
        assert_eq!(source, CredentialSource::Ledger);
        assert_eq!(registrar.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_registration_is_persisted() {
        let ledger = MemoryLedger::new();
        let registrar = FakeRegistrar::new(false);

        let (credentials, source) = resolve_app_credentials(&instance(), None, &ledger, &registrar)
            .await
            .unwrap();
        assert_eq!(source, CredentialSource::Registered);
        assert_eq!(
            ledger.load_credentials(&instance()).await.unwrap(),
            Some(credentials)
        );

        let (_, source) = resolve_app_credentials(&instance(), None, &ledger, &registrar)
            .await
            .unwrap();
        assert_eq!(source, CredentialSource::Ledger);
        assert_eq!(registrar.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_registration_failure() {
        let ledger = MemoryLedger::new();
        let registrar = FakeRegistrar::new(true);

        let result = resolve_app_credentials(&instance(), None, &ledger, &registrar).await;
        assert!(matches!(result, Err(CredentialError::Register(_))));
    }
}
