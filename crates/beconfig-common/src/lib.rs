//! Common types for BackendConfig validation: CRDs, errors, and utilities

#![deny(missing_docs)]

pub mod crd;
pub mod error;
pub mod kube_utils;
pub mod telemetry;
pub mod yaml;

pub use error::Error;

/// Result type alias using our custom Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Namespace the API server assigns to namespaced objects that omit one
pub const DEFAULT_NAMESPACE: &str = "default";
