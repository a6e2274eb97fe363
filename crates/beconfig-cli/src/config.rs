//! Kubeconfig resolution
//!
//! Priority (highest first):
//! 1. Explicit `--kubeconfig` flag
//! 2. `BECONFIG_KUBECONFIG` environment variable
//! 3. kube defaults (`KUBECONFIG` env / `~/.kube/config` / in-cluster)

use std::path::{Path, PathBuf};

/// Environment variable overriding the kubeconfig used for Secret lookups
pub const BECONFIG_KUBECONFIG_ENV: &str = "BECONFIG_KUBECONFIG";

/// Resolve a kubeconfig path using the priority chain.
///
/// Returns `None` to fall back to kube's own inference.
pub fn resolve_kubeconfig(explicit: Option<&Path>) -> Option<PathBuf> {
    resolve_from(explicit, std::env::var(BECONFIG_KUBECONFIG_ENV).ok())
}

fn resolve_from(explicit: Option<&Path>, env_value: Option<String>) -> Option<PathBuf> {
    if let Some(path) = explicit {
        return Some(path.to_path_buf());
    }

    env_value.filter(|p| !p.is_empty()).map(PathBuf::from)
}
