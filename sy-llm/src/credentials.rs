//! Tiered credential resolution.
//!
//! Tier order, first applicable wins: local inference (no credential),
//! vendor-native credential chains, workspace BYOK, rotating server keys,
//! caller-supplied key. Fall-through happens only on explicit
//! not-found/exhausted/decrypt-failed results; anything unexpected surfaces
//! as `MissingCredential` with provider and model context.

use crate::error::{OrchestratorError, Result};
use crate::provider::ProviderId;
use async_trait::async_trait;
use serde::Deserialize;
use std::collections::HashSet;
use thiserror::Error;

/// Where the resolved key came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyOrigin {
    /// Workspace-scoped bring-your-own-key, decrypted at rest.
    Byok,
    /// Drawn from the platform's rotating server-key pool.
    RotatingServerKey,
    /// Supplied by the caller on this request.
    UserSupplied,
    /// Local inference; no credential needed.
    NoCredentialRequired,
    /// Caller should rely on the vendor's ambient credential chain.
    VendorNativeChain,
}

#[derive(Debug, Clone)]
pub struct CredentialRequest {
    pub provider: ProviderId,
    pub model: String,
    pub workspace_id: Option<String>,
    pub user_key: Option<String>,
}

#[derive(Debug, Clone)]
pub struct CredentialResolution {
    pub key: Option<String>,
    pub origin: KeyOrigin,
}

/// Errors a secret store may report. `DecryptionFailed` triggers tier
/// fallback; `Unavailable` does not (it is the arbitrary-exception case).
#[derive(Debug, Error)]
pub enum SecretStoreError {
    #[error("decryption failed: {0}")]
    DecryptionFailed(String),
    #[error("secret store unavailable: {0}")]
    Unavailable(String),
}

/// Workspace-scoped encrypted key storage. `Ok(None)` means no key stored.
#[async_trait]
pub trait SecretStore: Send + Sync {
    async fn fetch(
        &self,
        workspace_id: &str,
        provider: ProviderId,
    ) -> std::result::Result<Option<String>, SecretStoreError>;
}

#[derive(Debug, Error)]
pub enum KeyPoolError {
    #[error("pool exhausted")]
    Exhausted,
    #[error("pool misconfigured: {0}")]
    Misconfigured(String),
}

/// Rotating pool of server-managed keys.
#[async_trait]
pub trait RotatingKeyPool: Send + Sync {
    async fn next(&self, provider: ProviderId) -> std::result::Result<String, KeyPoolError>;
}

/// Deployment knobs for credential resolution.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CredentialEnv {
    /// Running as the managed/hosted offering.
    #[serde(default)]
    pub hosted: bool,
    /// Self-hosted deployments may still enable platform keys for
    /// credential-sensitive providers.
    #[serde(default)]
    pub server_keys_enabled: bool,
    /// Models the platform supplies working credentials for.
    #[serde(default)]
    pub hosted_models: HashSet<String>,
}

impl CredentialEnv {
    fn hosts_model(&self, provider: ProviderId, folded_model: &str) -> bool {
        let eligible =
            self.hosted || (self.server_keys_enabled && provider.is_credential_sensitive());
        eligible && self.hosted_models.iter().any(|m| m.eq_ignore_ascii_case(folded_model))
    }
}

/// Resolve the credential to use for one request.
#[tracing::instrument(level = "debug", skip_all, fields(provider = %request.provider, model = %request.model))]
pub async fn resolve_credential(
    env: &CredentialEnv,
    secrets: &dyn SecretStore,
    pool: &dyn RotatingKeyPool,
    request: &CredentialRequest,
) -> Result<CredentialResolution> {
    let provider = request.provider;
    let folded_model = request.model.to_ascii_lowercase();

    // Tier 1: local inference. A caller key is kept only when the wire
    // protocol accepts a bearer token.
    if provider.is_local() {
        let key = request
            .user_key
            .clone()
            .filter(|_| provider.accepts_bearer_token());
        return Ok(CredentialResolution {
            key,
            origin: KeyOrigin::NoCredentialRequired,
        });
    }

    // Tier 2: vendor-native credential chain.
    if provider.uses_native_credential_chain() {
        return Ok(CredentialResolution {
            key: None,
            origin: KeyOrigin::VendorNativeChain,
        });
    }

    // Tier 3: platform-managed keys for hosted models. BYOK wins over the
    // rotating pool whenever a workspace key exists.
    if env.hosts_model(provider, &folded_model) {
        if let Some(workspace_id) = request.workspace_id.as_deref() {
            match secrets.fetch(workspace_id, provider).await {
                Ok(Some(key)) => {
                    return Ok(CredentialResolution {
                        key: Some(key),
                        origin: KeyOrigin::Byok,
                    });
                }
                Ok(None) => {}
                Err(SecretStoreError::DecryptionFailed(detail)) => {
                    tracing::warn!(workspace = workspace_id, %detail,
                        "byok decryption failed; falling back to server keys");
                }
                Err(SecretStoreError::Unavailable(detail)) => {
                    return Err(OrchestratorError::MissingCredential {
                        provider,
                        model: request.model.clone(),
                        reason: format!("secret store unavailable: {detail}"),
                    });
                }
            }
        }

        match pool.next(provider).await {
            Ok(key) => {
                return Ok(CredentialResolution {
                    key: Some(key),
                    origin: KeyOrigin::RotatingServerKey,
                });
            }
            Err(e) => {
                tracing::warn!(%e, "rotating key pool unavailable; falling back to caller key");
            }
        }

        return match request.user_key.clone() {
            Some(key) => Ok(CredentialResolution {
                key: Some(key),
                origin: KeyOrigin::UserSupplied,
            }),
            None => Err(OrchestratorError::MissingCredential {
                provider,
                model: request.model.clone(),
                reason: "server key pool exhausted and no caller key supplied".to_string(),
            }),
        };
    }

    // Tier 4/5: caller-supplied key or nothing.
    match request.user_key.clone() {
        Some(key) => Ok(CredentialResolution {
            key: Some(key),
            origin: KeyOrigin::UserSupplied,
        }),
        None => Err(OrchestratorError::MissingCredential {
            provider,
            model: request.model.clone(),
            reason: "no caller key supplied".to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FixedStore(std::result::Result<Option<String>, fn() -> SecretStoreError>);

    #[async_trait]
    impl SecretStore for FixedStore {
        async fn fetch(
            &self,
            _workspace_id: &str,
            _provider: ProviderId,
        ) -> std::result::Result<Option<String>, SecretStoreError> {
            match &self.0 {
                Ok(v) => Ok(v.clone()),
                Err(make) => Err(make()),
            }
        }
    }

    struct FixedPool(std::result::Result<String, fn() -> KeyPoolError>);

    #[async_trait]
    impl RotatingKeyPool for FixedPool {
        async fn next(&self, _provider: ProviderId) -> std::result::Result<String, KeyPoolError> {
            match &self.0 {
                Ok(k) => Ok(k.clone()),
                Err(make) => Err(make()),
            }
        }
    }

    fn hosted_env() -> CredentialEnv {
        CredentialEnv {
            hosted: true,
            server_keys_enabled: false,
            hosted_models: ["gpt-4o".to_string()].into_iter().collect(),
        }
    }

    fn request(provider: ProviderId, model: &str) -> CredentialRequest {
        CredentialRequest {
            provider,
            model: model.to_string(),
            workspace_id: Some("ws-1".to_string()),
            user_key: None,
        }
    }

    #[tokio::test]
    async fn byok_wins_over_a_functioning_pool() {
        let store = FixedStore(Ok(Some("sk-byok".to_string())));
        let pool = FixedPool(Ok("sk-rotating".to_string()));
        let res = resolve_credential(
            &hosted_env(),
            &store,
            &pool,
            &request(ProviderId::OpenAi, "gpt-4o"),
        )
        .await
        .unwrap();
        assert_eq!(res.origin, KeyOrigin::Byok);
        assert_eq!(res.key.as_deref(), Some("sk-byok"));
    }

    #[tokio::test]
    async fn rotating_pool_serves_when_no_byok_is_stored() {
        let store = FixedStore(Ok(None));
        let pool = FixedPool(Ok("sk-rotating".to_string()));
        let res = resolve_credential(
            &hosted_env(),
            &store,
            &pool,
            &request(ProviderId::OpenAi, "GPT-4o"),
        )
        .await
        .unwrap();
        assert_eq!(res.origin, KeyOrigin::RotatingServerKey);
        assert_eq!(res.key.as_deref(), Some("sk-rotating"));
    }

    #[tokio::test]
    async fn decrypt_failure_falls_through_to_the_pool() {
        let store = FixedStore(Err(|| SecretStoreError::DecryptionFailed("bad tag".into())));
        let pool = FixedPool(Ok("sk-rotating".to_string()));
        let res = resolve_credential(
            &hosted_env(),
            &store,
            &pool,
            &request(ProviderId::OpenAi, "gpt-4o"),
        )
        .await
        .unwrap();
        assert_eq!(res.origin, KeyOrigin::RotatingServerKey);
    }

    #[tokio::test]
    async fn unavailable_store_surfaces_as_missing_credential() {
        let store = FixedStore(Err(|| SecretStoreError::Unavailable("timeout".into())));
        let pool = FixedPool(Ok("sk-rotating".to_string()));
        let err = resolve_credential(
            &hosted_env(),
            &store,
            &pool,
            &request(ProviderId::OpenAi, "gpt-4o"),
        )
        .await
        .unwrap_err();
        match err {
            OrchestratorError::MissingCredential { provider, model, .. } => {
                assert_eq!(provider, ProviderId::OpenAi);
                assert_eq!(model, "gpt-4o");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn exhausted_pool_falls_back_to_caller_key_then_fails() {
        let store = FixedStore(Ok(None));
        let pool = FixedPool(Err(|| KeyPoolError::Exhausted));

        let mut req = request(ProviderId::OpenAi, "gpt-4o");
        req.user_key = Some("sk-user".to_string());
        let res = resolve_credential(&hosted_env(), &store, &pool, &req)
            .await
            .unwrap();
        assert_eq!(res.origin, KeyOrigin::UserSupplied);

        let res = resolve_credential(
            &hosted_env(),
            &store,
            &pool,
            &request(ProviderId::OpenAi, "gpt-4o"),
        )
        .await;
        assert!(matches!(
            res,
            Err(OrchestratorError::MissingCredential { .. })
        ));
    }

    #[tokio::test]
    async fn unhosted_models_require_a_caller_key() {
        let store = FixedStore(Ok(Some("sk-byok".to_string())));
        let pool = FixedPool(Ok("sk-rotating".to_string()));

        // Not in the hosted allow-list: BYOK/pool tiers are skipped entirely.
        let mut req = request(ProviderId::OpenAi, "gpt-4o-mini");
        req.user_key = Some("sk-user".to_string());
        let res = resolve_credential(&hosted_env(), &store, &pool, &req)
            .await
            .unwrap();
        assert_eq!(res.origin, KeyOrigin::UserSupplied);

        let res = resolve_credential(
            &hosted_env(),
            &store,
            &pool,
            &request(ProviderId::OpenAi, "gpt-4o-mini"),
        )
        .await;
        assert!(matches!(
            res,
            Err(OrchestratorError::MissingCredential { .. })
        ));
    }

    #[tokio::test]
    async fn server_keys_mode_covers_credential_sensitive_providers_only() {
        let env = CredentialEnv {
            hosted: false,
            server_keys_enabled: true,
            hosted_models: ["gpt-4o".to_string(), "grok-4".to_string()]
                .into_iter()
                .collect(),
        };
        let store = FixedStore(Ok(None));
        let pool = FixedPool(Ok("sk-rotating".to_string()));

        let res = resolve_credential(&env, &store, &pool, &request(ProviderId::OpenAi, "gpt-4o"))
            .await
            .unwrap();
        assert_eq!(res.origin, KeyOrigin::RotatingServerKey);

        // xai is not credential-sensitive: tier 3 never applies.
        let res = resolve_credential(&env, &store, &pool, &request(ProviderId::Xai, "grok-4")).await;
        assert!(matches!(
            res,
            Err(OrchestratorError::MissingCredential { .. })
        ));
    }

    #[tokio::test]
    async fn local_provider_needs_no_credential_but_keeps_bearer_keys() {
        let store = FixedStore(Ok(None));
        let pool = FixedPool(Err(|| KeyPoolError::Misconfigured("empty".into())));

        let mut req = request(ProviderId::Ollama, "llama3.1");
        req.user_key = Some("proxy-token".to_string());
        let res = resolve_credential(&CredentialEnv::default(), &store, &pool, &req)
            .await
            .unwrap();
        assert_eq!(res.origin, KeyOrigin::NoCredentialRequired);
        assert_eq!(res.key.as_deref(), Some("proxy-token"));
    }

    #[tokio::test]
    async fn native_chain_providers_resolve_without_a_key() {
        let store = FixedStore(Ok(None));
        let pool = FixedPool(Err(|| KeyPoolError::Exhausted));
        let res = resolve_credential(
            &CredentialEnv::default(),
            &store,
            &pool,
            &request(ProviderId::Bedrock, "anthropic.claude-sonnet-4-5"),
        )
        .await
        .unwrap();
        assert_eq!(res.origin, KeyOrigin::VendorNativeChain);
        assert!(res.key.is_none());
    }

    #[test]
    fn credential_env_parses_from_toml() {
        let env: CredentialEnv = toml::from_str(
            r#"
            hosted = true
            hosted_models = ["gpt-4o", "claude-sonnet-4-5"]
            "#,
        )
        .unwrap();
        assert!(env.hosted);
        assert!(!env.server_keys_enabled);
        assert!(env.hosted_models.contains("gpt-4o"));
    }
}
