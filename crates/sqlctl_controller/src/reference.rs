//! Reference resolver (C7): resolves a `{value, valueRef, valueSelector}`
//! triple to a concrete string, preferring an explicit value, then a
//! named reference, then a label selector that must match exactly one
//! object. Algorithm grounded in `SPEC_FULL.md` 4.6; the `Api::get`/
//! `Api::list` usage follows the general kube-rs idiom seen throughout
//! the `other_examples` pack.

use kube::api::ListParams;
use kube::{Api, Client, Resource, ResourceExt};
use serde::de::DeserializeOwned;
use sqlctl_core::{Error, Result};
use sqlctl_resources::common::Reference;
use std::fmt::Debug;

/// Resolves `reference` against objects of kind `K` in `namespace`,
/// returning the resolved external name (object name, by convention the
/// external identifier for every kind in this crate).
pub async fn resolve<K>(client: &Client, namespace: &str, reference: &Reference) -> Result<String>
where
    K: Resource<Scope = k8s_openapi::NamespaceResourceScope>
        + Clone
        + Debug
        + DeserializeOwned
        + Send
        + Sync
        + 'static,
    K::DynamicType: Default,
{
    if let Some(value) = &reference.value {
        return Ok(value.clone());
    }

    let api: Api<K> = Api::namespaced(client.clone(), namespace);

    if let Some(name) = &reference.value_ref {
        let obj = api
            .get(name)
            .await
            .map_err(|_| Error::ReferenceNotFound(name.clone()))?;
        return Ok(obj.name_any());
    }

    if let Some(selector) = &reference.value_selector {
        let label_selector = selector
            .match_labels
            .iter()
            .map(|(k, v)| format!("{k}={v}"))
            .collect::<Vec<_>>()
            .join(",");
        let list = api
            .list(&ListParams::default().labels(&label_selector))
            .await
            .map_err(|e| Error::AmbiguousReference(e.to_string()))?;
        return match list.items.as_slice() {
            [single] => Ok(single.name_any()),
            [] => Err(Error::ReferenceNotFound(format!("selector matched no objects: {label_selector}"))),
            _ => Err(Error::AmbiguousReference(format!(
                "selector matched {} objects: {label_selector}",
                list.items.len()
            ))),
        };
    }

    Err(Error::ReferenceNotFound("no value, valueRef, or valueSelector set".to_string()))
}
