//! Validate command
//!
//! Loads BackendConfig documents from manifest files and runs them through
//! the validator. Secrets come from `--secrets` manifests when given,
//! otherwise from the cluster.

use std::path::{Path, PathBuf};

use clap::Args;
use tracing::{debug, info};

use beconfig_common::crd::{BackendConfig, BACKEND_CONFIG_KIND};
use beconfig_common::kube_utils::create_client;
use beconfig_common::yaml::{document_kind, from_document, parse_yaml_multi};
use beconfig_common::DEFAULT_NAMESPACE;
use beconfig_validation::{validate, KubeSecretStore, SecretStore, StaticSecretStore};

use crate::config::resolve_kubeconfig;
use crate::{Error, Result};

#[derive(Args, Debug)]
pub struct ValidateArgs {
    /// BackendConfig manifest files (multi-document YAML allowed)
    #[arg(required = true)]
    pub files: Vec<PathBuf>,

    /// Secret manifests to resolve credentials from instead of the cluster
    #[arg(long = "secrets", value_name = "FILE")]
    pub secrets: Vec<PathBuf>,

    /// Namespace for documents that don't set one
    #[arg(long, short = 'n', default_value = DEFAULT_NAMESPACE)]
    pub namespace: String,

    /// Kubeconfig used for Secret lookups
    #[arg(long)]
    pub kubeconfig: Option<PathBuf>,

    /// Print the resolved IAP client ID of valid configs
    #[arg(long)]
    pub show_resolved: bool,
}

/// A BackendConfig document read from a manifest file
#[derive(Debug)]
pub struct LoadedDocument {
    /// File and document index, e.g. `web.yaml#2`
    pub source: String,
    /// The parsed config, or why it could not be parsed
    pub config: std::result::Result<BackendConfig, beconfig_common::Error>,
}

/// Validation result for one document
#[derive(Debug)]
pub struct Outcome {
    /// `<namespace>/<name>`, or the document source when unparsable
    pub name: String,
    /// `Ok` with the resolved client ID (if any), or the failure message
    pub result: std::result::Result<Option<String>, String>,
}

impl Outcome {
    fn is_valid(&self) -> bool {
        self.result.is_ok()
    }
}

pub async fn run(args: ValidateArgs) -> Result<()> {
    let outcomes = check(&args).await?;
    if outcomes.is_empty() {
        println!("No {} documents found", BACKEND_CONFIG_KIND);
        return Ok(());
    }

    for line in render_report(&outcomes, args.show_resolved) {
        println!("{}", line);
    }
    verdict(&outcomes)
}

/// Load every BackendConfig named by the arguments and validate it
pub async fn check(args: &ValidateArgs) -> Result<Vec<Outcome>> {
    let mut documents = Vec::new();
    for file in &args.files {
        let content = read_file(file)?;
        documents.extend(load_backend_configs(
            &file.display().to_string(),
            &content,
            &args.namespace,
        )?);
    }
    if documents.is_empty() {
        return Ok(Vec::new());
    }

    let store = build_secret_store(args, &documents).await?;
    Ok(validate_all(store.as_ref(), documents).await)
}

/// Per-document result lines, a blank line, then the summary.
///
/// Only the client ID is ever shown; the client secret never is.
pub fn render_report(outcomes: &[Outcome], show_resolved: bool) -> Vec<String> {
    let mut lines = Vec::with_capacity(outcomes.len() + 2);
    for outcome in outcomes {
        match &outcome.result {
            Ok(client_id) => {
                lines.push(format!("  {} valid", outcome.name));
                if let (true, Some(client_id)) = (show_resolved, client_id) {
                    lines.push(format!("    iap clientID: {}", client_id));
                }
            }
            Err(message) => lines.push(format!("  {} invalid: {}", outcome.name, message)),
        }
    }

    let invalid = count_invalid(outcomes);
    lines.push(String::new());
    if invalid == 0 {
        lines.push(format!("All {} BackendConfigs valid", outcomes.len()));
    } else {
        lines.push(format!(
            "{} of {} BackendConfigs invalid",
            invalid,
            outcomes.len()
        ));
    }
    lines
}

fn count_invalid(outcomes: &[Outcome]) -> usize {
    outcomes.iter().filter(|o| !o.is_valid()).count()
}

/// Fail when any document is invalid
fn verdict(outcomes: &[Outcome]) -> Result<()> {
    match count_invalid(outcomes) {
        0 => Ok(()),
        invalid => Err(Error::validation(format!(
            "{} of {} BackendConfigs invalid",
            invalid,
            outcomes.len()
        ))),
    }
}

fn read_file(path: &Path) -> Result<String> {
    std::fs::read_to_string(path).map_err(|source| Error::ReadFile {
        path: path.to_path_buf(),
        source,
    })
}

/// Pick the BackendConfig documents out of a manifest.
///
/// Malformed YAML fails the whole file; a document that is YAML but not a
/// valid BackendConfig is returned as a per-document error.
pub fn load_backend_configs(
    file: &str,
    content: &str,
    default_namespace: &str,
) -> Result<Vec<LoadedDocument>> {
    let docs = parse_yaml_multi(content).map_err(beconfig_common::Error::from)?;

    let mut loaded = Vec::new();
    for (index, doc) in docs.into_iter().enumerate() {
        let source = format!("{}#{}", file, index + 1);
        match document_kind(&doc) {
            Some(BACKEND_CONFIG_KIND) => {}
            kind => {
                info!(
                    %source,
                    kind = kind.unwrap_or("<none>"),
                    "skipping non-BackendConfig document"
                );
                continue;
            }
        }

        let config = from_document::<BackendConfig>(doc, BACKEND_CONFIG_KIND).map(|mut config| {
            config
                .metadata
                .namespace
                .get_or_insert_with(|| default_namespace.to_string());
            config
        });
        loaded.push(LoadedDocument { source, config });
    }
    Ok(loaded)
}

/// Choose where Secrets come from.
///
/// The cluster is only contacted when some document actually references a
/// credentials Secret.
async fn build_secret_store(
    args: &ValidateArgs,
    documents: &[LoadedDocument],
) -> Result<Box<dyn SecretStore>> {
    if !args.secrets.is_empty() {
        let mut store = StaticSecretStore::new();
        for file in &args.secrets {
            let loaded = store.load_manifests(&read_file(file)?, &args.namespace)?;
            debug!(file = %file.display(), loaded, "loaded secret manifests");
        }
        return Ok(Box::new(store));
    }

    let needs_cluster = documents.iter().any(|doc| {
        doc.config
            .as_ref()
            .is_ok_and(|config| config.iap_secret_name().is_some())
    });
    if !needs_cluster {
        return Ok(Box::new(StaticSecretStore::new()));
    }

    let kubeconfig = resolve_kubeconfig(args.kubeconfig.as_deref());
    let source = kubeconfig
        .as_ref()
        .map(|p| p.display().to_string())
        .unwrap_or_else(|| "<default>".to_string());
    info!(kubeconfig = %source, "resolving credentials secrets from cluster");
    let client = create_client(kubeconfig.as_deref()).await?;
    Ok(Box::new(KubeSecretStore::new(client)))
}

/// Validate every loaded document in order
pub async fn validate_all(
    store: &dyn SecretStore,
    documents: Vec<LoadedDocument>,
) -> Vec<Outcome> {
    let mut outcomes = Vec::with_capacity(documents.len());
    for doc in documents {
        let outcome = match doc.config {
            Ok(mut config) => {
                let name = config.qualified_name();
                let result = validate(store, Some(&mut config))
                    .await
                    .map(|()| resolved_client_id(&config))
                    .map_err(|e| e.to_string());
                Outcome { name, result }
            }
            Err(e) => Outcome {
                name: doc.source,
                result: Err(e.to_string()),
            },
        };
        outcomes.push(outcome);
    }
    outcomes
}

fn resolved_client_id(config: &BackendConfig) -> Option<String> {
    config.iap_secret_name()?;
    config
        .oauth_client_credentials()
        .map(|creds| creds.client_id.clone())
}

#[cfg(test)]
mod tests {
    use super::*;
    use beconfig_validation::SecretRecord;

    const MANIFEST: &str = r#"
apiVersion: cloud.google.com/v1beta1
kind: BackendConfig
metadata:
  name: web
  namespace: ns1
spec:
  iap:
    enabled: true
    oauthclientCredentials:
      secretName: oauth-creds
---
apiVersion: v1
kind: Service
metadata:
  name: web
---
apiVersion: cloud.google.com/v1beta1
kind: BackendConfig
metadata:
  name: cached
spec:
  cdn:
    enabled: true
---
apiVersion: cloud.google.com/v1beta1
kind: BackendConfig
metadata:
  name: both
  namespace: ns1
spec:
  iap:
    enabled: true
  cdn:
    enabled: true
"#;

    fn store() -> StaticSecretStore {
        let mut store = StaticSecretStore::new();
        store.insert(
            SecretRecord::new("ns1", "oauth-creds")
                .with_data("client_id", "abc")
                .with_data("client_secret", "xyz"),
        );
        store
    }

    #[test]
    fn loads_only_backend_configs() {
        let docs = load_backend_configs("all.yaml", MANIFEST, "team-a").unwrap();
        assert_eq!(docs.len(), 3);
        assert_eq!(docs[0].source, "all.yaml#1");
        assert_eq!(docs[1].source, "all.yaml#3");

        let cached = docs[1].config.as_ref().unwrap();
        assert_eq!(cached.lookup_namespace(), "team-a");
    }

    #[test]
    fn unparsable_document_is_reported_per_document() {
        let manifest = r#"
apiVersion: cloud.google.com/v1beta1
kind: BackendConfig
metadata:
  name: broken
spec:
  timeoutSec: "forty"
"#;
        let docs = load_backend_configs("broken.yaml", manifest, "default").unwrap();
        assert_eq!(docs.len(), 1);
        assert!(docs[0].config.is_err());
    }

    #[test]
    fn malformed_yaml_fails_the_file() {
        assert!(load_backend_configs("bad.yaml", "a: {{", "default").is_err());
    }

    #[tokio::test]
    async fn validates_each_document() {
        let docs = load_backend_configs("all.yaml", MANIFEST, "default").unwrap();
        let outcomes = validate_all(&store(), docs).await;

        assert_eq!(outcomes.len(), 3);

        assert_eq!(outcomes[0].name, "ns1/web");
        assert_eq!(outcomes[0].result, Ok(Some("abc".to_string())));

        assert_eq!(outcomes[1].name, "default/cached");
        assert_eq!(outcomes[1].result, Ok(None));

        assert_eq!(outcomes[2].name, "ns1/both");
        assert_eq!(
            outcomes[2].result,
            Err("iap and cdn cannot be enabled at the same time".to_string())
        );
        assert!(!outcomes[2].is_valid());
    }

    #[tokio::test]
    async fn missing_secret_is_reported() {
        let docs = load_backend_configs("all.yaml", MANIFEST, "default").unwrap();
        let outcomes = validate_all(&StaticSecretStore::new(), docs).await;

        let message = outcomes[0].result.as_ref().unwrap_err();
        assert!(message.contains("error retrieving secret oauth-creds"));
    }

    const SECRETS: &str = "apiVersion: v1\nkind: Secret\nmetadata:\n  name: oauth-creds\n  namespace: ns1\nstringData:\n  client_id: abc\n  client_secret: xyz\n";

    fn scratch_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("beconfig-{}-{}", name, std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    fn offline_args(files: Vec<PathBuf>, secrets: Vec<PathBuf>) -> ValidateArgs {
        ValidateArgs {
            files,
            secrets,
            namespace: "default".to_string(),
            kubeconfig: Some(PathBuf::from("/nonexistent/kubeconfig")),
            show_resolved: true,
        }
    }

    #[tokio::test]
    async fn secrets_flag_avoids_cluster() {
        let dir = scratch_dir("secrets-flag");
        let secrets = dir.join("secrets.yaml");
        std::fs::write(&secrets, SECRETS).unwrap();

        let args = offline_args(vec![], vec![secrets]);
        let docs = load_backend_configs("all.yaml", MANIFEST, "default").unwrap();
        let store = build_secret_store(&args, &docs).await.unwrap();
        let record = store.fetch("ns1", "oauth-creds").await.unwrap();
        assert_eq!(record.get("client_secret"), Some(b"xyz".as_slice()));

        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[tokio::test]
    async fn run_fails_when_any_document_is_invalid() {
        let dir = scratch_dir("run-invalid");
        let manifest = dir.join("both.yaml");
        std::fs::write(
            &manifest,
            "kind: BackendConfig\nmetadata:\n  name: both\nspec:\n  iap:\n    enabled: true\n  cdn:\n    enabled: true\n",
        )
        .unwrap();

        let err = run(offline_args(vec![manifest], vec![])).await.unwrap_err();
        assert!(matches!(err, Error::Validation { .. }));
        assert_eq!(err.to_string(), "validation error: 1 of 1 BackendConfigs invalid");

        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[tokio::test]
    async fn run_succeeds_when_all_documents_are_valid() {
        let dir = scratch_dir("run-valid");
        let manifest = dir.join("web.yaml");
        let secrets = dir.join("secrets.yaml");
        let valid = MANIFEST.split("\n---\n").take(3).collect::<Vec<_>>().join("\n---\n");
        std::fs::write(&manifest, valid).unwrap();
        std::fs::write(&secrets, SECRETS).unwrap();

        let args = offline_args(vec![manifest], vec![secrets]);
        let outcomes = check(&args).await.unwrap();
        assert_eq!(outcomes.len(), 2);
        assert!(outcomes.iter().all(Outcome::is_valid));

        assert!(run(args).await.is_ok());

        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[tokio::test]
    async fn run_without_backend_configs_succeeds() {
        let dir = scratch_dir("run-empty");
        let manifest = dir.join("service.yaml");
        std::fs::write(&manifest, "apiVersion: v1\nkind: Service\nmetadata:\n  name: web\n").unwrap();

        let args = offline_args(vec![manifest], vec![]);
        assert!(check(&args).await.unwrap().is_empty());
        assert!(run(args).await.is_ok());

        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[tokio::test]
    async fn run_reports_unreadable_file() {
        let args = offline_args(vec![PathBuf::from("/nonexistent/web.yaml")], vec![]);
        let err = run(args).await.unwrap_err();
        assert!(matches!(err, Error::ReadFile { .. }));
    }

    #[tokio::test]
    async fn report_shows_client_id_but_never_the_secret() {
        let docs = load_backend_configs("all.yaml", MANIFEST, "default").unwrap();
        let outcomes = validate_all(&store(), docs).await;

        let lines = render_report(&outcomes, true);
        assert_eq!(
            lines,
            vec![
                "  ns1/web valid".to_string(),
                "    iap clientID: abc".to_string(),
                "  default/cached valid".to_string(),
                "  ns1/both invalid: iap and cdn cannot be enabled at the same time".to_string(),
                String::new(),
                "1 of 3 BackendConfigs invalid".to_string(),
            ]
        );
        assert!(lines.iter().all(|line| !line.contains("xyz")));
        assert!(verdict(&outcomes).is_err());

        let quiet = render_report(&outcomes, false);
        assert!(quiet.iter().all(|line| !line.contains("clientID")));
    }

    #[test]
    fn report_summary_when_all_valid() {
        let outcomes = vec![Outcome {
            name: "default/cached".to_string(),
            result: Ok(None),
        }];
        let lines = render_report(&outcomes, true);
        assert_eq!(lines.last().map(String::as_str), Some("All 1 BackendConfigs valid"));
        assert!(verdict(&outcomes).is_ok());
    }

    #[tokio::test]
    async fn no_secret_references_skip_cluster() {
        let args = ValidateArgs {
            files: vec![],
            secrets: vec![],
            namespace: "default".to_string(),
            kubeconfig: Some(PathBuf::from("/nonexistent/kubeconfig")),
            show_resolved: false,
        };
        let manifest = "kind: BackendConfig\nmetadata:\n  name: c\nspec:\n  cdn:\n    enabled: true\n";
        let docs = load_backend_configs("cdn.yaml", manifest, "default").unwrap();
        assert!(build_secret_store(&args, &docs).await.is_ok());
    }

    #[tokio::test]
    async fn secret_references_need_a_client() {
        let args = ValidateArgs {
            files: vec![],
            secrets: vec![],
            namespace: "default".to_string(),
            kubeconfig: Some(PathBuf::from("/nonexistent/kubeconfig")),
            show_resolved: false,
        };
        let docs = load_backend_configs("all.yaml", MANIFEST, "default").unwrap();
        let err = build_secret_store(&args, &docs).await.err().unwrap();
        assert!(err.to_string().contains("failed to read kubeconfig"));
    }
}
