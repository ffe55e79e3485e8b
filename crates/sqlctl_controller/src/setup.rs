//! Controller registration (C8): one `kube::runtime::Controller` per
//! managed resource kind, each with its own [`Context`] (and therefore its
//! own concurrency-bounding semaphore), run to completion together.
//! Grounded in the `Controller::new(api, Config::default()).run(...)
//! .filter_map(...).for_each(...).boxed()` shape used by
//! `other_examples/989eaaa0_tembo-io-tembo__coredb-operator-src-controller.rs.rs`'s
//! `init`.

use std::fmt::Debug;
use std::sync::Arc;

use futures::future::BoxFuture;
use futures::{FutureExt, StreamExt};
use kube::runtime::controller::Action;
use kube::runtime::{watcher, Controller};
use kube::{Api, Client, Resource};
use serde::de::DeserializeOwned;
use sqlctl_core::{Error, ObjectStore, Result, RuntimeConfig};

use crate::reconcile::{hana, mssql, mysql, postgresql, Context};

/// Builds and runs one controller for kind `K`, draining its event stream
/// forever. Each kind gets its own [`Context`], so one kind's backlog never
/// starves another's concurrency budget.
fn run_controller<K, ReconcileFn, ReconcileFut, ErrorPolicyFn>(
    client: Client,
    object_store: Arc<dyn ObjectStore>,
    config: RuntimeConfig,
    reconcile: ReconcileFn,
    error_policy: ErrorPolicyFn,
) -> BoxFuture<'static, ()>
where
    K: Resource<Scope = k8s_openapi::NamespaceResourceScope, DynamicType = ()>
        + Clone
        + Debug
        + DeserializeOwned
        + Send
        + Sync
        + 'static,
    ReconcileFn: Fn(Arc<K>, Arc<Context>) -> ReconcileFut + Send + Sync + 'static,
    ReconcileFut: std::future::Future<Output = Result<Action>> + Send + 'static,
    ErrorPolicyFn: Fn(Arc<K>, &Error, Arc<Context>) -> Action + Send + Sync + 'static,
{
    let ctx = Context::new(client.clone(), object_store, config.clone(), config.max_concurrency as usize);
    let api: Api<K> = Api::all(client);
    Controller::new(api, watcher::Config::default())
        .run(reconcile, error_policy, ctx)
        .filter_map(|result| async move {
            if let Err(e) = &result {
                log::warn!("reconciler event stream error: {e}");
            }
            result.ok()
        })
        .for_each(|_| futures::future::ready(()))
        .boxed()
}

/// Starts every managed kind's controller and runs them all until the
/// process is stopped. Returns once every controller's event stream ends
/// (in practice, never — `kube::runtime::Controller` watches forever).
pub async fn run_all(client: Client, object_store: Arc<dyn ObjectStore>, config: RuntimeConfig) {
    use sqlctl_resources::{hana as hana_res, mssql as mssql_res, mysql as mysql_res, postgresql as pg_res};

    let controllers: Vec<BoxFuture<'static, ()>> = vec![
        run_controller::<pg_res::Database, _, _, _>(
            client.clone(), object_store.clone(), config.clone(),
            postgresql::reconcile_database, postgresql::error_policy,
        ),
        run_controller::<pg_res::Role, _, _, _>(
            client.clone(), object_store.clone(), config.clone(),
            postgresql::reconcile_role, postgresql::error_policy,
        ),
        run_controller::<pg_res::Schema, _, _, _>(
            client.clone(), object_store.clone(), config.clone(),
            postgresql::reconcile_schema, postgresql::error_policy,
        ),
        run_controller::<pg_res::Grant, _, _, _>(
            client.clone(), object_store.clone(), config.clone(),
            postgresql::reconcile_grant, postgresql::error_policy,
        ),
        run_controller::<pg_res::DefaultPrivileges, _, _, _>(
            client.clone(), object_store.clone(), config.clone(),
            postgresql::reconcile_default_privileges, postgresql::error_policy,
        ),
        run_controller::<pg_res::ExtensionInstallation, _, _, _>(
            client.clone(), object_store.clone(), config.clone(),
            postgresql::reconcile_extension_installation, postgresql::error_policy,
        ),
        run_controller::<mysql_res::Database, _, _, _>(
            client.clone(), object_store.clone(), config.clone(),
            mysql::reconcile_database, mysql::error_policy,
        ),
        run_controller::<mysql_res::User, _, _, _>(
            client.clone(), object_store.clone(), config.clone(),
            mysql::reconcile_user, mysql::error_policy,
        ),
        run_controller::<mysql_res::Grant, _, _, _>(
            client.clone(), object_store.clone(), config.clone(),
            mysql::reconcile_grant, mysql::error_policy,
        ),
        run_controller::<mssql_res::Database, _, _, _>(
            client.clone(), object_store.clone(), config.clone(),
            mssql::reconcile_database, mssql::error_policy,
        ),
        run_controller::<mssql_res::Login, _, _, _>(
            client.clone(), object_store.clone(), config.clone(),
            mssql::reconcile_login, mssql::error_policy,
        ),
        run_controller::<mssql_res::User, _, _, _>(
            client.clone(), object_store.clone(), config.clone(),
            mssql::reconcile_user, mssql::error_policy,
        ),
        run_controller::<mssql_res::Grant, _, _, _>(
            client.clone(), object_store.clone(), config.clone(),
            mssql::reconcile_grant, mssql::error_policy,
        ),
        run_controller::<hana_res::User, _, _, _>(
            client.clone(), object_store.clone(), config.clone(),
            hana::reconcile_user, hana::error_policy,
        ),
        run_controller::<hana_res::Role, _, _, _>(
            client.clone(), object_store.clone(), config.clone(),
            hana::reconcile_role, hana::error_policy,
        ),
        run_controller::<hana_res::Usergroup, _, _, _>(
            client.clone(), object_store.clone(), config.clone(),
            hana::reconcile_usergroup, hana::error_policy,
        ),
        run_controller::<hana_res::DbSchema, _, _, _>(
            client, object_store, config,
            hana::reconcile_dbschema, hana::error_policy,
        ),
    ];

    log::info!("sqlctl started {} controllers", controllers.len());
    futures::future::join_all(controllers).await;
}
