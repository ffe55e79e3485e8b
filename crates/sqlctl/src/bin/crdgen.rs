//! Dumps every managed kind's CustomResourceDefinition as YAML, one
//! `---`-separated document per kind, so the cluster admin can
//! `cargo run --bin crdgen | kubectl apply -f -`. Grounded in
//! `other_examples/9982ea15_octopilot-secret-manager-controller__src-controller-crdgen.rs.rs`'s
//! `CustomResourceExt::crd()` + `serde_yaml::to_string` pattern.

use kube::core::CustomResourceExt;
use sqlctl_resources::hana::{DbSchema, Role as HanaRole, Usergroup, User as HanaUser};
use sqlctl_resources::mssql::{Database as MssqlDatabase, Grant as MssqlGrant, Login, User as MssqlUser};
use sqlctl_resources::mysql::{Database as MysqlDatabase, Grant as MysqlGrant, User as MysqlUser};
use sqlctl_resources::postgresql::{
    Database as PgDatabase, DefaultPrivileges, ExtensionInstallation, Grant as PgGrant, Role as PgRole, Schema,
};
use sqlctl_resources::provider_config::{ClusterProviderConfig, ProviderConfig, ProviderConfigUsage};

fn main() {
    let crds = vec![
        PgDatabase::crd(),
        PgRole::crd(),
        Schema::crd(),
        PgGrant::crd(),
        DefaultPrivileges::crd(),
        ExtensionInstallation::crd(),
        MysqlDatabase::crd(),
        MysqlUser::crd(),
        MysqlGrant::crd(),
        MssqlDatabase::crd(),
        Login::crd(),
        MssqlUser::crd(),
        MssqlGrant::crd(),
        HanaUser::crd(),
        HanaRole::crd(),
        Usergroup::crd(),
        DbSchema::crd(),
        ProviderConfig::crd(),
        ClusterProviderConfig::crd(),
        ProviderConfigUsage::crd(),
    ];

    println!("# This file is auto-generated by crdgen");
    println!("# DO NOT EDIT THIS FILE MANUALLY");
    println!("# Regenerate with: cargo run --bin crdgen > deploy/crds.yaml");
    println!("#");

    for crd in crds {
        let yaml = serde_yaml::to_string(&crd).unwrap_or_else(|e| {
            eprintln!("failed to serialize CRD to yaml: {e}");
            std::process::exit(1);
        });
        println!("---");
        print!("{yaml}");
    }
}
