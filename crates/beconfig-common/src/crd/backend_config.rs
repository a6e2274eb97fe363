//! BackendConfig CRD
//!
//! A BackendConfig is attached to a Service and carries the load balancer
//! backend policy: IAP, CDN, Cloud Armor, timeouts, draining and session
//! affinity.

use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::DEFAULT_NAMESPACE;

/// Kind string used to pick BackendConfig documents out of manifests
pub const BACKEND_CONFIG_KIND: &str = "BackendConfig";

/// BackendConfig holds the backend service policy for a Service port.
///
/// Example:
/// ```yaml
/// apiVersion: cloud.google.com/v1beta1
/// kind: BackendConfig
/// metadata:
///   name: web
///   namespace: ns1
/// spec:
///   iap:
///     enabled: true
///     oauthclientCredentials:
///       secretName: oauth-creds
///   cdn:
///     enabled: false
/// ```
#[derive(CustomResource, Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[kube(
    group = "cloud.google.com",
    version = "v1beta1",
    kind = "BackendConfig",
    namespaced,
    derive = "PartialEq",
    printcolumn = r#"{"name":"IAP","type":"boolean","jsonPath":".spec.iap.enabled"}"#,
    printcolumn = r#"{"name":"CDN","type":"boolean","jsonPath":".spec.cdn.enabled"}"#,
    printcolumn = r#"{"name":"Age","type":"date","jsonPath":".metadata.creationTimestamp"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct BackendConfigSpec {
    /// Identity-Aware Proxy settings
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iap: Option<IapConfig>,

    /// Cloud CDN settings
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cdn: Option<CdnConfig>,

    /// Cloud Armor security policy
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub security_policy: Option<SecurityPolicyConfig>,

    /// Backend service timeout in seconds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_sec: Option<i64>,

    /// Connection draining settings
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub connection_draining: Option<ConnectionDrainingConfig>,

    /// Session affinity settings
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_affinity: Option<SessionAffinityConfig>,
}

/// Identity-Aware Proxy configuration
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct IapConfig {
    /// Whether IAP is enabled
    #[serde(default)]
    pub enabled: bool,

    /// OAuth client used by IAP
    #[serde(
        default,
        rename = "oauthclientCredentials",
        skip_serializing_if = "Option::is_none"
    )]
    pub oauth_client_credentials: Option<OAuthClientCredentials>,
}

/// OAuth client credentials for IAP.
///
/// Either `client_id`/`client_secret` are given inline, or `secret_name`
/// names a Secret (in the BackendConfig's namespace) holding `client_id` and
/// `client_secret` keys. Validation fills the inline fields from the Secret.
#[derive(Clone, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct OAuthClientCredentials {
    /// Name of the Secret holding the OAuth client
    #[serde(default)]
    pub secret_name: String,

    /// OAuth client ID
    #[serde(default, rename = "clientID", skip_serializing_if = "String::is_empty")]
    pub client_id: String,

    /// OAuth client secret
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub client_secret: String,
}

impl std::fmt::Debug for OAuthClientCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OAuthClientCredentials")
            .field("secret_name", &self.secret_name)
            .field("client_id", &self.client_id)
            .field(
                "client_secret",
                &if self.client_secret.is_empty() { "" } else { "<redacted>" },
            )
            .finish()
    }
}

/// Cloud CDN configuration
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CdnConfig {
    /// Whether CDN caching is enabled
    #[serde(default)]
    pub enabled: bool,

    /// Cache key policy
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cache_policy: Option<CacheKeyPolicy>,
}

/// Which request parts make up the CDN cache key
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CacheKeyPolicy {
    /// Include the host header
    #[serde(default)]
    pub include_host: bool,

    /// Include the protocol
    #[serde(default)]
    pub include_protocol: bool,

    /// Include the query string
    #[serde(default)]
    pub include_query_string: bool,

    /// Query parameters excluded from the key
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub query_string_blacklist: Vec<String>,

    /// Query parameters included in the key
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub query_string_whitelist: Vec<String>,
}

/// Cloud Armor policy reference
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
pub struct SecurityPolicyConfig {
    /// Security policy name
    pub name: String,
}

/// Connection draining
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionDrainingConfig {
    /// Draining timeout in seconds
    #[serde(default)]
    pub draining_timeout_sec: i64,
}

/// Session affinity
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SessionAffinityConfig {
    /// Affinity type (e.g. CLIENT_IP, GENERATED_COOKIE)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub affinity_type: Option<String>,

    /// Cookie TTL for GENERATED_COOKIE affinity
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub affinity_cookie_ttl_sec: Option<i64>,
}

impl BackendConfig {
    /// Namespace used for Secret lookups
    pub fn lookup_namespace(&self) -> &str {
        self.metadata.namespace.as_deref().unwrap_or(DEFAULT_NAMESPACE)
    }

    /// `<namespace>/<name>` for log lines and reports
    pub fn qualified_name(&self) -> String {
        format!(
            "{}/{}",
            self.lookup_namespace(),
            self.metadata.name.as_deref().unwrap_or("<unnamed>")
        )
    }

    /// Whether IAP is present and enabled
    pub fn iap_enabled(&self) -> bool {
        self.spec.iap.as_ref().is_some_and(|iap| iap.enabled)
    }

    /// Whether CDN is present and enabled
    pub fn cdn_enabled(&self) -> bool {
        self.spec.cdn.as_ref().is_some_and(|cdn| cdn.enabled)
    }

    /// Name of the Secret IAP credentials must be resolved from.
    ///
    /// `None` unless IAP is enabled and a non-empty `secretName` is set.
    pub fn iap_secret_name(&self) -> Option<&str> {
        self.spec
            .iap
            .as_ref()
            .filter(|iap| iap.enabled)
            .and_then(|iap| iap.oauth_client_credentials.as_ref())
            .map(|creds| creds.secret_name.as_str())
            .filter(|name| !name.is_empty())
    }

    /// OAuth client credentials, if the IAP block carries any
    pub fn oauth_client_credentials(&self) -> Option<&OAuthClientCredentials> {
        self.spec
            .iap
            .as_ref()
            .and_then(|iap| iap.oauth_client_credentials.as_ref())
    }
}
