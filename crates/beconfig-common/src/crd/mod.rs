//! Custom Resource Definitions consumed by the validator

mod backend_config;

pub use backend_config::{
    BackendConfig, BackendConfigSpec, CacheKeyPolicy, CdnConfig, ConnectionDrainingConfig,
    IapConfig, OAuthClientCredentials, SecurityPolicyConfig, SessionAffinityConfig,
    BACKEND_CONFIG_KIND,
};
