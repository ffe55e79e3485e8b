//! `sqlctl`: reconciles declarative SQL-server objects against live
//! Postgres/MySQL/MSSQL/HANA servers. Entry point grounded in the
//! `env_logger::Builder::from_env(...).format_timestamp_millis().init()`
//! idiom from the teacher's own `dbflux` binary, with the controller
//! startup sequence grounded in
//! `other_examples/989eaaa0_tembo-io-tembo__coredb-operator-src-controller.rs.rs`'s
//! `init` (checking the CRDs are queryable before handing off to the
//! controllers).

use std::sync::Arc;

use kube::{Api, Client};
use sqlctl_core::{KubeObjectStore, ObjectStore, RuntimeConfig};
use sqlctl_resources::hana::{DbSchema, Role as HanaRole, Usergroup, User as HanaUser};
use sqlctl_resources::mssql::{Database as MssqlDatabase, Grant as MssqlGrant, Login, User as MssqlUser};
use sqlctl_resources::mysql::{Database as MysqlDatabase, Grant as MysqlGrant, User as MysqlUser};
use sqlctl_resources::postgresql::{
    Database as PgDatabase, DefaultPrivileges, ExtensionInstallation, Grant as PgGrant, Role as PgRole, Schema,
};

#[tokio::main]
async fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();

    let config = RuntimeConfig::from_env();
    log::info!(
        "sqlctl starting: poll_interval={:?}, max_concurrency={}",
        config.poll_interval,
        config.max_concurrency
    );

    let client = build_client(&config).await.unwrap_or_else(|e| {
        log::error!("failed to build kube client: {e}");
        std::process::exit(1);
    });

    if let Err(e) = check_crds_installed(&client).await {
        log::error!("required CRDs are not queryable: {e}");
        log::info!("installation: cargo run --bin crdgen | kubectl apply -f -");
        std::process::exit(1);
    }

    let object_store: Arc<dyn ObjectStore> = Arc::new(KubeObjectStore::new(client.clone()));
    sqlctl_controller::setup::run_all(client, object_store, config).await;
}

/// Builds the kube client, honoring `config.kubeconfig_path` when set and
/// otherwise falling back to in-cluster config or the default lookup.
async fn build_client(config: &RuntimeConfig) -> kube::Result<Client> {
    if let Some(path) = &config.kubeconfig_path {
        match kube::config::Kubeconfig::read_from(path) {
            Ok(kubeconfig) => {
                let kube_config =
                    kube::Config::from_custom_kubeconfig(kubeconfig, &kube::config::KubeConfigOptions::default())
                        .await?;
                return Client::try_from(kube_config);
            }
            Err(e) => {
                log::warn!("ignoring KUBECONFIG={path}: {e}, falling back to default client lookup");
            }
        }
    }
    Client::try_default().await
}

async fn check_crds_installed(client: &Client) -> kube::Result<()> {
    Api::<PgDatabase>::all(client.clone()).list(&Default::default()).await?;
    Api::<PgRole>::all(client.clone()).list(&Default::default()).await?;
    Api::<Schema>::all(client.clone()).list(&Default::default()).await?;
    Api::<PgGrant>::all(client.clone()).list(&Default::default()).await?;
    Api::<DefaultPrivileges>::all(client.clone()).list(&Default::default()).await?;
    Api::<ExtensionInstallation>::all(client.clone()).list(&Default::default()).await?;
    Api::<MysqlDatabase>::all(client.clone()).list(&Default::default()).await?;
    Api::<MysqlUser>::all(client.clone()).list(&Default::default()).await?;
    Api::<MysqlGrant>::all(client.clone()).list(&Default::default()).await?;
    Api::<MssqlDatabase>::all(client.clone()).list(&Default::default()).await?;
    Api::<Login>::all(client.clone()).list(&Default::default()).await?;
    Api::<MssqlUser>::all(client.clone()).list(&Default::default()).await?;
    Api::<MssqlGrant>::all(client.clone()).list(&Default::default()).await?;
    Api::<HanaUser>::all(client.clone()).list(&Default::default()).await?;
    Api::<HanaRole>::all(client.clone()).list(&Default::default()).await?;
    Api::<Usergroup>::all(client.clone()).list(&Default::default()).await?;
    Api::<DbSchema>::all(client.clone()).list(&Default::default()).await?;
    Ok(())
}
