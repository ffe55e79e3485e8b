//! Generic reconciliation plumbing shared by every resource kind's
//! reconciler: the shared [`Context`], a finalizer-wrapped apply/cleanup
//! harness, and a generic status patcher. Grounded in the
//! `finalizer(&api, FINALIZER, obj, |event| async { ... })` /
//! `Controller::new(...).run(reconcile, error_policy, ctx)` shape used by
//! `other_examples/989eaaa0_tembo-io-tembo__coredb-operator-src-controller.rs.rs`.

pub mod hana;
pub mod mssql;
pub mod mysql;
pub mod postgresql;

use std::collections::BTreeMap;
use std::fmt::Debug;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use kube::api::{Patch, PatchParams};
use kube::runtime::controller::Action;
use kube::runtime::finalizer::{self, Event as FinalizerEvent};
use kube::{Api, Client, Resource, ResourceExt};
use serde::de::DeserializeOwned;
use sqlctl_core::{ConnectionDetails, Error, ObjectStore, Result, RuntimeConfig};
use tokio::sync::Semaphore;

/// Shared across every reconciliation of one resource kind. One
/// `Context` (with its own semaphore) is built per kind in
/// [`crate::setup::run_all`], bounding that kind's concurrency
/// independently of the others (`SPEC_FULL.md` section 5).
pub struct Context {
    pub client: Client,
    pub object_store: Arc<dyn ObjectStore>,
    pub config: RuntimeConfig,
    pub semaphore: Arc<Semaphore>,
}

impl Context {
    pub fn new(client: Client, object_store: Arc<dyn ObjectStore>, config: RuntimeConfig, max_concurrency: usize) -> Arc<Self> {
        Arc::new(Self {
            client,
            object_store,
            config,
            semaphore: Arc::new(Semaphore::new(max_concurrency)),
        })
    }
}

/// Runs `apply`/`cleanup` through `kube::runtime::finalizer`, the common
/// "attach a finalizer on create, call cleanup on delete" pattern every
/// kind in this crate uses. The host-supplied finalizer itself (removing
/// it once `cleanup` succeeds) is handled by `kube::runtime::finalizer`
/// internally, matching the division of labor `SPEC_FULL.md` section 1
/// describes for the host reconciler.
pub async fn run_finalized<K, ApplyFut, CleanupFut>(
    client: Client,
    namespace: &str,
    finalizer_name: &str,
    obj: Arc<K>,
    apply: impl FnOnce(Arc<K>) -> ApplyFut,
    cleanup: impl FnOnce(Arc<K>) -> CleanupFut,
) -> Result<Action>
where
    K: Resource<Scope = k8s_openapi::NamespaceResourceScope, DynamicType = ()>
        + Clone
        + Debug
        + DeserializeOwned
        + Send
        + Sync
        + 'static,
    ApplyFut: Future<Output = Result<Action>>,
    CleanupFut: Future<Output = Result<Action>>,
{
    let api: Api<K> = Api::namespaced(client, namespace);
    let mut apply = Some(apply);
    let mut cleanup = Some(cleanup);
    finalizer::finalizer(&api, finalizer_name, obj, |event| async move {
        match event {
            FinalizerEvent::Apply(obj) => apply.take().expect("apply called once")(obj).await,
            FinalizerEvent::Cleanup(obj) => cleanup.take().expect("cleanup called once")(obj).await,
        }
    })
    .await
    .map_err(|e| Error::Finalizer(e.to_string()))
}

/// Merge-patches `status` onto `name` in `namespace` via server-side
/// apply, generic over the resource kind so every reconciler shares one
/// implementation (`SPEC_FULL.md` section 6, "Status conditions written
/// back").
pub async fn patch_status<K>(client: &Client, namespace: &str, name: &str, status: serde_json::Value) -> Result<()>
where
    K: Resource<Scope = k8s_openapi::NamespaceResourceScope, DynamicType = ()>
        + Clone
        + Debug
        + DeserializeOwned
        + Send
        + Sync
        + 'static,
{
    let api: Api<K> = Api::namespaced(client.clone(), namespace);
    let patch = Patch::Merge(serde_json::json!({ "status": status }));
    api.patch_status(name, &PatchParams::apply("sqlctl").force(), &patch)
        .await
        .map_err(Error::Kube)?;
    Ok(())
}

/// Common error policy: log and requeue after a short backoff,
/// regardless of kind — errors are already classified via
/// `Error::is_retriable` upstream for logging verbosity, but the host
/// reconciler requeues either way (`SPEC_FULL.md` section 7).
pub fn requeue_after(error: &Error) -> Action {
    if error.is_retriable() {
        log::warn!("reconcile failed, will retry: {error}");
        Action::requeue(Duration::from_secs(30))
    } else {
        log::error!("reconcile failed permanently: {error}");
        Action::requeue(Duration::from_secs(300))
    }
}

pub fn namespace_of<K: ResourceExt>(obj: &K) -> Result<String> {
    obj.namespace().ok_or(Error::NotThisKind)
}

/// `ProviderConfigUsage` name for one managed object, derived the same
/// way every kind in this crate derives its k8s-safe names: the object's
/// own name plus its kind, lower-cased.
pub fn usage_name(kind: &str, name: &str) -> String {
    format!("{name}-{}", kind.to_lowercase())
}

pub fn resource_ref(kind: &str, namespace: &str, name: &str) -> String {
    format!("{kind}/{namespace}/{name}")
}

fn connection_details_name(name: &str) -> String {
    format!("{name}-connection-details")
}

/// Writes the connection-details secret a principal's consumers read from,
/// per `SPEC_FULL.md` section 6.
pub async fn write_connection_details(
    object_store: &dyn ObjectStore,
    namespace: &str,
    name: &str,
    details: &ConnectionDetails,
) -> Result<()> {
    object_store
        .apply_secret(namespace, &connection_details_name(name), details.to_secret_data(), "sqlctl")
        .await
}

/// Reads back the connection-details secret written by a prior reconcile,
/// if any — `None` the first time a principal is created.
pub async fn read_connection_details(
    object_store: &dyn ObjectStore,
    namespace: &str,
    name: &str,
) -> Result<Option<BTreeMap<String, Vec<u8>>>> {
    match object_store.get_secret(namespace, &connection_details_name(name)).await {
        Ok(data) => Ok(Some(data)),
        Err(Error::GetSecret(_)) => Ok(None),
        Err(e) => Err(e),
    }
}

/// Resolves a principal's password: the secret named by its
/// `passwordSecretRef` if set, otherwise a freshly generated one
/// (`SPEC_FULL.md` 4.5 Create contract).
pub async fn resolve_password(
    object_store: &dyn ObjectStore,
    secret_ref: Option<(&str, &str, &str)>,
) -> Result<String> {
    match secret_ref {
        Some((namespace, name, key)) => {
            let data = object_store.get_secret(namespace, name).await?;
            let bytes = data
                .get(key)
                .ok_or_else(|| Error::GetPasswordSecret(format!("{namespace}/{name}:{key}")))?;
            Ok(String::from_utf8_lossy(bytes).into_owned())
        }
        None => Ok(sqlctl_core::generate_password()),
    }
}

/// Resolves the password a principal should have right now: an explicit
/// `passwordSecretRef` always wins, otherwise the password already
/// recorded in its connection-details secret is kept stable, otherwise
/// (first reconcile) a fresh one is generated.
pub async fn resolve_principal_password(
    object_store: &dyn ObjectStore,
    secret_ref: Option<(&str, &str, &str)>,
    existing_connection_details: Option<&BTreeMap<String, Vec<u8>>>,
) -> Result<String> {
    if secret_ref.is_some() {
        return resolve_password(object_store, secret_ref).await;
    }
    if let Some(existing) = existing_connection_details {
        if let Some(bytes) = existing.get("password") {
            return Ok(String::from_utf8_lossy(bytes).into_owned());
        }
    }
    Ok(sqlctl_core::generate_password())
}

/// Conditions payload for a `Ready`/`Synced` status patch, both set to the
/// same `status`/`reason` (`SPEC_FULL.md` section 6).
pub fn conditions_json(
    status: bool,
    reason: sqlctl_resources::status::ConditionReason,
) -> serde_json::Value {
    use sqlctl_resources::status::Condition;
    serde_json::json!([
        serde_json::to_value(Condition::ready(status, reason.clone())).expect("Condition serializes"),
        serde_json::to_value(Condition::synced(status, reason)).expect("Condition serializes"),
    ])
}
