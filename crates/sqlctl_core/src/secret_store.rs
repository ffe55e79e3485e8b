use std::collections::BTreeMap;

use async_trait::async_trait;
use k8s_openapi::api::core::v1::Secret;
use kube::api::{Api, ObjectMeta, Patch, PatchParams, PostParams};
use kube::Client;

use crate::error::{Error, Result};

/// Abstraction over the object store that holds connection secrets,
/// generalized from `dbflux_core::secrets::SecretStore` (which talks to
/// the OS keyring) to one backed by the Kubernetes API. Shape kept the
/// same (`is_available`/fetch/write), renamed to this crate's vocabulary.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    async fn get_secret(&self, namespace: &str, name: &str) -> Result<BTreeMap<String, Vec<u8>>>;

    async fn apply_secret(
        &self,
        namespace: &str,
        name: &str,
        data: BTreeMap<String, Vec<u8>>,
        owner: &str,
    ) -> Result<()>;
}

/// Production [`ObjectStore`] backed by a real `kube::Client`.
pub struct KubeObjectStore {
    client: Client,
}

impl KubeObjectStore {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ObjectStore for KubeObjectStore {
    async fn get_secret(&self, namespace: &str, name: &str) -> Result<BTreeMap<String, Vec<u8>>> {
        let api: Api<Secret> = Api::namespaced(self.client.clone(), namespace);
        let secret = api
            .get(name)
            .await
            .map_err(|e| Error::GetSecret(e.to_string()))?;
        let data = secret
            .data
            .ok_or(Error::MissingConnectionSecret)?
            .into_iter()
            .map(|(k, v)| (k, v.0))
            .collect();
        Ok(data)
    }

    async fn apply_secret(
        &self,
        namespace: &str,
        name: &str,
        data: BTreeMap<String, Vec<u8>>,
        owner: &str,
    ) -> Result<()> {
        let api: Api<Secret> = Api::namespaced(self.client.clone(), namespace);
        let secret = Secret {
            metadata: ObjectMeta {
                name: Some(name.to_string()),
                namespace: Some(namespace.to_string()),
                ..Default::default()
            },
            data: Some(
                data.into_iter()
                    .map(|(k, v)| (k, k8s_openapi::ByteString(v)))
                    .collect(),
            ),
            ..Default::default()
        };
        match api.create(&PostParams::default(), &secret).await {
            Ok(_) => Ok(()),
            Err(kube::Error::Api(e)) if e.code == 409 => {
                let patch = Patch::Merge(&secret);
                api.patch(name, &PatchParams::apply(owner), &patch)
                    .await
                    .map_err(|e| Error::GetSecret(e.to_string()))?;
                Ok(())
            }
            Err(e) => Err(Error::GetSecret(e.to_string())),
        }
    }
}
