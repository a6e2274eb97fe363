//! Validation error types

use beconfig_common::Error;

/// Why a BackendConfig was rejected
#[derive(Debug, thiserror::Error)]
pub enum ValidationError {
    /// The credentials Secret could not be fetched
    #[error("error retrieving secret {secret}: {source}")]
    SecretLookup {
        /// Name of the Secret
        secret: String,
        /// The underlying fetch failure
        #[source]
        source: Error,
    },

    /// The credentials Secret lacks a required key
    #[error("secret {secret} missing {field} data")]
    MissingCredentialField {
        /// Name of the Secret
        secret: String,
        /// The missing key (`client_id` or `client_secret`)
        field: &'static str,
    },

    /// IAP and CDN are both enabled
    #[error("iap and cdn cannot be enabled at the same time")]
    MutuallyExclusiveFeatures,
}

impl ValidationError {
    /// Check if re-running validation later could succeed without a spec change
    ///
    /// Only a transient Secret fetch failure qualifies.
    pub fn is_retryable(&self) -> bool {
        match self {
            ValidationError::SecretLookup { source, .. } => source.is_retryable(),
            ValidationError::MissingCredentialField { .. } => false,
            ValidationError::MutuallyExclusiveFeatures => false,
        }
    }

    /// Machine-readable reason for status conditions and events
    pub fn reason(&self) -> &'static str {
        match self {
            ValidationError::SecretLookup { .. } => "SecretLookupFailed",
            ValidationError::MissingCredentialField { .. } => "MissingCredentialField",
            ValidationError::MutuallyExclusiveFeatures => "MutuallyExclusiveFeatures",
        }
    }
}
