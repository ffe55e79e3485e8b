//! Credential resolver (C2): locates a managed object's provider config,
//! tracks a usage edge, and loads the credentials bundle it points at.
//! Algorithm grounded in `SPEC_FULL.md` 4.2.

use kube::api::{Patch, PatchParams, PostParams};
use kube::{Api, Client};
use sqlctl_core::{CredentialsBundle, Error, ObjectStore, Result};
use sqlctl_resources::provider_config::{
    ClusterProviderConfig, ProviderConfig, ProviderConfigSpec, ProviderConfigUsage,
    ProviderConfigUsageSpec,
};

/// What a reference to a provider config resolved to, before its secret
/// is fetched.
pub struct ResolvedProviderConfig {
    pub spec: ProviderConfigSpec,
    pub secret_namespace: String,
    pub secret_name: String,
}

/// Either scope of provider config a managed object may reference.
pub enum ProviderConfigRef {
    Namespaced { namespace: String, name: String },
    Cluster { name: String },
}

pub async fn resolve_provider_config(
    client: &Client,
    reference: &ProviderConfigRef,
) -> Result<ResolvedProviderConfig> {
    let spec = match reference {
        ProviderConfigRef::Namespaced { namespace, name } => {
            let api: Api<ProviderConfig> = Api::namespaced(client.clone(), namespace);
            let obj = api
                .get(name)
                .await
                .map_err(|e| Error::GetProviderConfig(e.to_string()))?;
            obj.spec.inner
        }
        ProviderConfigRef::Cluster { name } => {
            let api: Api<ClusterProviderConfig> = Api::all(client.clone());
            let obj = api
                .get(name)
                .await
                .map_err(|e| Error::GetProviderConfig(e.to_string()))?;
            obj.spec.inner
        }
    };

    let secret_ref = spec
        .credentials
        .connection_secret_ref
        .as_ref()
        .ok_or(Error::MissingSecretRef)?;

    Ok(ResolvedProviderConfig {
        secret_namespace: secret_ref.namespace.clone(),
        secret_name: secret_ref.name.clone(),
        spec,
    })
}

/// Creates/patches a `ProviderConfigUsage` recording that `resource_ref`
/// (a namespaced "kind/name" string) depends on `provider_config_ref`, so
/// the host layer's garbage collection never deletes a config still in
/// use. Idempotent — a 409 Conflict on create is treated as success via
/// a server-side-apply patch, following the same create-then-patch
/// fallback used in `sqlctl_core::secret_store::KubeObjectStore::apply_secret`.
pub async fn track_usage(
    client: &Client,
    namespace: &str,
    usage_name: &str,
    provider_config_ref: &str,
    resource_ref: &str,
) -> Result<()> {
    let api: Api<ProviderConfigUsage> = Api::namespaced(client.clone(), namespace);
    let usage = ProviderConfigUsage::new(
        usage_name,
        ProviderConfigUsageSpec {
            provider_config_ref: provider_config_ref.to_string(),
            resource_ref: resource_ref.to_string(),
        },
    );
    match api.create(&PostParams::default(), &usage).await {
        Ok(_) => Ok(()),
        Err(kube::Error::Api(e)) if e.code == 409 => {
            let patch = Patch::Merge(&usage);
            api.patch(usage_name, &PatchParams::apply("sqlctl"), &patch)
                .await
                .map_err(|e| Error::TrackUsage(e.to_string()))?;
            Ok(())
        }
        Err(e) => Err(Error::TrackUsage(e.to_string())),
    }
}

/// Runs the full C2 algorithm: resolve the config, track usage, fetch the
/// secret, parse it into a [`CredentialsBundle`].
pub async fn resolve_credentials(
    client: &Client,
    store: &dyn ObjectStore,
    namespace: &str,
    usage_name: &str,
    resource_ref: &str,
    reference: &ProviderConfigRef,
    provider_config_ref: &str,
) -> Result<(CredentialsBundle, ProviderConfigSpec)> {
    let resolved = resolve_provider_config(client, reference).await?;
    track_usage(client, namespace, usage_name, provider_config_ref, resource_ref).await?;
    let data = store
        .get_secret(&resolved.secret_namespace, &resolved.secret_name)
        .await?;
    let bundle = CredentialsBundle::from_secret_data(&data).ok_or(Error::MissingConnectionSecret)?;
    Ok((bundle, resolved.spec))
}
