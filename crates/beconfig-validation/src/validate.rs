//! BackendConfig validation
//!
//! A single pass over the spec with at most one Secret read:
//! 1. no config, or IAP absent/disabled: valid, nothing else is checked
//! 2. IAP enabled with a `secretName`: fetch the Secret and copy
//!    `client_id`/`client_secret` into the inline credential fields
//! 3. IAP enabled together with CDN: rejected
//!
//! Resolved credentials are written before the CDN check, so a config
//! rejected for step 3 still carries them. Inline credentials given without a
//! `secretName` are accepted as-is.

use beconfig_common::crd::BackendConfig;
use tracing::debug;

use crate::error::ValidationError;
use crate::secrets::{SecretRecord, SecretStore, OAUTH_CLIENT_ID_KEY, OAUTH_CLIENT_SECRET_KEY};

/// Validate a BackendConfig, resolving IAP credentials in place.
///
/// `None` means no BackendConfig is attached, which is always valid.
pub async fn validate(
    store: &dyn SecretStore,
    config: Option<&mut BackendConfig>,
) -> Result<(), ValidationError> {
    match config {
        Some(config) => validate_iap(store, config).await,
        None => Ok(()),
    }
}

async fn validate_iap(
    store: &dyn SecretStore,
    config: &mut BackendConfig,
) -> Result<(), ValidationError> {
    if !config.iap_enabled() {
        return Ok(());
    }

    if let Some(secret_name) = config.iap_secret_name().map(str::to_string) {
        let namespace = config.lookup_namespace().to_string();
        let record = store
            .fetch(&namespace, &secret_name)
            .await
            .map_err(|source| ValidationError::SecretLookup {
                secret: secret_name.clone(),
                source,
            })?;

        let client_id = credential(&record, &secret_name, OAUTH_CLIENT_ID_KEY)?;
        let client_secret = credential(&record, &secret_name, OAUTH_CLIENT_SECRET_KEY)?;

        if let Some(creds) = config
            .spec
            .iap
            .as_mut()
            .and_then(|iap| iap.oauth_client_credentials.as_mut())
        {
            creds.client_id = client_id;
            creds.client_secret = client_secret;
        }

        debug!(
            backend_config = %config.qualified_name(),
            secret = %secret_name,
            "resolved IAP OAuth credentials from secret"
        );
    }

    if config.cdn_enabled() {
        return Err(ValidationError::MutuallyExclusiveFeatures);
    }

    Ok(())
}

/// Read one credential key, decoding its bytes as UTF-8 (lossy)
fn credential(
    record: &SecretRecord,
    secret_name: &str,
    key: &'static str,
) -> Result<String, ValidationError> {
    record
        .get(key)
        .map(|bytes| String::from_utf8_lossy(bytes).into_owned())
        .ok_or_else(|| ValidationError::MissingCredentialField {
            secret: secret_name.to_string(),
            field: key,
        })
}
