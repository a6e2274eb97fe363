//! Secret lookup capability
//!
//! The validator only ever reads one Secret per call, through the
//! [`SecretStore`] trait. Production uses [`KubeSecretStore`]; offline runs
//! and tests use [`StaticSecretStore`].

use std::collections::BTreeMap;

use async_trait::async_trait;
use k8s_openapi::api::core::v1::Secret;
use kube::{Client, ResourceExt};
use tracing::{debug, instrument};

#[cfg(test)]
use mockall::automock;

use beconfig_common::kube_utils::get_secret;
use beconfig_common::yaml::{document_kind, from_document, parse_yaml_multi};
use beconfig_common::{Error, DEFAULT_NAMESPACE};

/// Secret key holding the IAP OAuth client ID
pub const OAUTH_CLIENT_ID_KEY: &str = "client_id";
/// Secret key holding the IAP OAuth client secret
pub const OAUTH_CLIENT_SECRET_KEY: &str = "client_secret";

const SECRET_KIND: &str = "Secret";

/// A fetched Secret reduced to its decoded key/value bytes
#[derive(Clone, Default, PartialEq, Eq)]
pub struct SecretRecord {
    /// Secret name
    pub name: String,
    /// Secret namespace
    pub namespace: String,
    /// Decoded values by key
    pub data: BTreeMap<String, Vec<u8>>,
}

impl std::fmt::Debug for SecretRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SecretRecord")
            .field("name", &self.name)
            .field("namespace", &self.namespace)
            .field("keys", &self.data.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl SecretRecord {
    /// Create an empty record
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            namespace: namespace.into(),
            data: BTreeMap::new(),
        }
    }

    /// Add a value, replacing any existing one for the key
    pub fn with_data(mut self, key: impl Into<String>, value: impl Into<Vec<u8>>) -> Self {
        self.data.insert(key.into(), value.into());
        self
    }

    /// Raw bytes for a key
    pub fn get(&self, key: &str) -> Option<&[u8]> {
        self.data.get(key).map(Vec::as_slice)
    }
}

impl From<Secret> for SecretRecord {
    /// `stringData` overlays `data`, matching how the API server merges the
    /// two on write.
    fn from(secret: Secret) -> Self {
        let name = secret.name_any();
        let namespace = secret
            .namespace()
            .unwrap_or_else(|| DEFAULT_NAMESPACE.to_string());

        let mut data: BTreeMap<String, Vec<u8>> = secret
            .data
            .unwrap_or_default()
            .into_iter()
            .map(|(k, v)| (k, v.0))
            .collect();
        for (k, v) in secret.string_data.unwrap_or_default() {
            data.insert(k, v.into_bytes());
        }

        Self {
            name,
            namespace,
            data,
        }
    }
}

/// Read-only access to Secrets by namespace and name
#[cfg_attr(test, automock)]
#[async_trait]
pub trait SecretStore: Send + Sync {
    /// Fetch a Secret
    ///
    /// Returns [`Error::SecretNotFound`] when the Secret does not exist.
    async fn fetch(&self, namespace: &str, name: &str) -> Result<SecretRecord, Error>;
}

/// SecretStore backed by the Kubernetes API
pub struct KubeSecretStore {
    client: Client,
}

impl KubeSecretStore {
    /// Create a store wrapping the given kube Client
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl SecretStore for KubeSecretStore {
    #[instrument(skip(self))]
    async fn fetch(&self, namespace: &str, name: &str) -> Result<SecretRecord, Error> {
        let secret = get_secret(&self.client, namespace, name).await?;
        debug!("fetched secret");
        Ok(secret.into())
    }
}

/// In-memory SecretStore
#[derive(Debug, Default, Clone)]
pub struct StaticSecretStore {
    secrets: BTreeMap<(String, String), SecretRecord>,
}

impl StaticSecretStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a record, keyed by its namespace and name
    pub fn insert(&mut self, record: SecretRecord) {
        self.secrets
            .insert((record.namespace.clone(), record.name.clone()), record);
    }

    /// Build a store from the `kind: Secret` documents of a YAML manifest
    pub fn from_manifests(manifests: &str, default_namespace: &str) -> Result<Self, Error> {
        let mut store = Self::new();
        store.load_manifests(manifests, default_namespace)?;
        Ok(store)
    }

    /// Load every `kind: Secret` document from a YAML manifest.
    ///
    /// Other kinds are ignored. Secrets without a namespace land in
    /// `default_namespace`.
    pub fn load_manifests(
        &mut self,
        manifests: &str,
        default_namespace: &str,
    ) -> Result<usize, Error> {
        let mut loaded = 0;
        for doc in parse_yaml_multi(manifests)? {
            if document_kind(&doc) != Some(SECRET_KIND) {
                continue;
            }
            let mut secret: Secret = from_document(doc, SECRET_KIND)?;
            if secret.metadata.namespace.is_none() {
                secret.metadata.namespace = Some(default_namespace.to_string());
            }
            self.insert(secret.into());
            loaded += 1;
        }
        Ok(loaded)
    }

    /// Number of secrets held
    pub fn len(&self) -> usize {
        self.secrets.len()
    }

    /// Whether the store is empty
    pub fn is_empty(&self) -> bool {
        self.secrets.is_empty()
    }
}

#[async_trait]
impl SecretStore for StaticSecretStore {
    async fn fetch(&self, namespace: &str, name: &str) -> Result<SecretRecord, Error> {
        self.secrets
            .get(&(namespace.to_string(), name.to_string()))
            .cloned()
            .ok_or_else(|| Error::secret_not_found(namespace, name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
    use k8s_openapi::ByteString;

    fn secret(data: &[(&str, &[u8])], string_data: &[(&str, &str)]) -> Secret {
        Secret {
            metadata: ObjectMeta {
                name: Some("oauth-creds".to_string()),
                namespace: Some("ns1".to_string()),
                ..Default::default()
            },
            data: Some(
                data.iter()
                    .map(|(k, v)| (k.to_string(), ByteString(v.to_vec())))
                    .collect(),
            ),
            string_data: Some(
                string_data
                    .iter()
                    .map(|(k, v)| (k.to_string(), v.to_string()))
                    .collect(),
            ),
            ..Default::default()
        }
    }

    #[test]
    fn record_from_secret_copies_data() {
        let record = SecretRecord::from(secret(&[("client_id", b"abc")], &[]));
        assert_eq!(record.name, "oauth-creds");
        assert_eq!(record.namespace, "ns1");
        assert_eq!(record.get(OAUTH_CLIENT_ID_KEY), Some(b"abc".as_slice()));
        assert_eq!(record.get(OAUTH_CLIENT_SECRET_KEY), None);
    }

    #[test]
    fn string_data_overrides_data() {
        let record = SecretRecord::from(secret(
            &[("client_id", b"old"), ("client_secret", b"xyz")],
            &[("client_id", "new")],
        ));
        assert_eq!(record.get(OAUTH_CLIENT_ID_KEY), Some(b"new".as_slice()));
        assert_eq!(record.get(OAUTH_CLIENT_SECRET_KEY), Some(b"xyz".as_slice()));
    }

    #[test]
    fn record_debug_hides_values() {
        let record = SecretRecord::new("ns1", "oauth-creds").with_data("client_secret", "xyz");
        let rendered = format!("{:?}", record);
        assert!(rendered.contains("client_secret"));
        assert!(!rendered.contains("xyz"));
    }

    #[tokio::test]
    async fn static_store_fetch() {
        let mut store = StaticSecretStore::new();
        store.insert(SecretRecord::new("ns1", "oauth-creds").with_data("client_id", "abc"));

        let record = store.fetch("ns1", "oauth-creds").await.unwrap();
        assert_eq!(record.get("client_id"), Some(b"abc".as_slice()));

        let err = store.fetch("ns2", "oauth-creds").await.unwrap_err();
        assert!(matches!(
            err,
            Error::SecretNotFound { ref namespace, ref name } if namespace == "ns2" && name == "oauth-creds"
        ));
    }

    #[tokio::test]
    async fn static_store_loads_secret_manifests() {
        let manifests = r#"
apiVersion: v1
kind: Secret
metadata:
  name: oauth-creds
  namespace: ns1
data:
  client_id: YWJj
  client_secret: eHl6
---
apiVersion: v1
kind: Secret
metadata:
  name: plain
stringData:
  client_id: inline
---
apiVersion: cloud.google.com/v1beta1
kind: BackendConfig
metadata:
  name: web
"#;
        let mut store = StaticSecretStore::new();
        let loaded = store.load_manifests(manifests, "fallback").unwrap();
        assert_eq!(loaded, 2);
        assert_eq!(store.len(), 2);

        let creds = store.fetch("ns1", "oauth-creds").await.unwrap();
        assert_eq!(creds.get("client_id"), Some(b"abc".as_slice()));
        assert_eq!(creds.get("client_secret"), Some(b"xyz".as_slice()));

        let plain = store.fetch("fallback", "plain").await.unwrap();
        assert_eq!(plain.get("client_id"), Some(b"inline".as_slice()));
    }

    #[tokio::test]
    async fn static_store_from_manifests() {
        let manifests = r#"
apiVersion: v1
kind: Secret
metadata:
  name: oauth-creds
stringData:
  client_id: abc
  client_secret: xyz
"#;
        let store = StaticSecretStore::from_manifests(manifests, "ns1").unwrap();
        assert_eq!(store.len(), 1);

        let creds = store.fetch("ns1", "oauth-creds").await.unwrap();
        assert_eq!(creds.get(OAUTH_CLIENT_SECRET_KEY), Some(b"xyz".as_slice()));

        assert!(StaticSecretStore::from_manifests("a: {{", "ns1").is_err());
    }

    #[test]
    fn static_store_rejects_bad_base64() {
        let manifests = r#"
apiVersion: v1
kind: Secret
metadata:
  name: broken
data:
  client_id: "!!not base64!!"
"#;
        let mut store = StaticSecretStore::new();
        let err = store.load_manifests(manifests, "default").unwrap_err();
        assert!(matches!(err, Error::Serialization { .. }));
        assert!(store.is_empty());
    }
}
