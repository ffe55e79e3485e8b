//! Custom resource type definitions for every managed SQL object kind,
//! grounded in the `kube::CustomResource` derive pattern shown by
//! `other_examples/989eaaa0_tembo-io-tembo__coredb-operator-src-controller.rs.rs`
//! and `other_examples/da4f723e_CleverCloud-clever-operator__src-svc-k8s-addon-postgresql.rs.rs`.

pub mod common;
pub mod hana;
pub mod mssql;
pub mod mysql;
pub mod postgresql;
pub mod provider_config;
pub mod status;

pub use provider_config::{
    ClusterProviderConfig, ClusterProviderConfigCrdSpec, Credentials, CredentialsSource,
    MySqlTlsMode, ProviderConfig, ProviderConfigCrdSpec, ProviderConfigSpec,
    ProviderConfigStatus, ProviderConfigUsage, ProviderConfigUsageSpec, SecretRef, SslMode,
};
pub use status::{Condition, ConditionReason, Conditions};
