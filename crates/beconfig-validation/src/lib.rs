//! BackendConfig validation
//!
//! Resolves IAP OAuth credentials from Secrets and rejects configurations
//! that enable IAP together with CDN.

#![deny(missing_docs)]

pub mod error;
pub mod secrets;
pub mod validate;

pub use error::ValidationError;
pub use secrets::{
    KubeSecretStore, SecretRecord, SecretStore, StaticSecretStore, OAUTH_CLIENT_ID_KEY,
    OAUTH_CLIENT_SECRET_KEY,
};
pub use validate::validate;
