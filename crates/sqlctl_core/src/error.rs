use thiserror::Error;

/// Errors produced by dialect adapters, the credential resolver, the
/// query composer, and the external client state machine.
///
/// All components in this crate and its siblings return this single error
/// type so the host reconciler can make one retry decision via
/// [`Error::is_retriable`] regardless of which component failed.
#[derive(Debug, Error)]
pub enum Error {
    /// Failed to open a connection to the remote SQL server.
    #[error("connection failed: {0}")]
    ConnectionFailed(String),

    /// A statement inside `exec`/`exec_tx` failed.
    #[error("exec failed: {0}")]
    ExecFailed(String),

    /// `exec_tx` is not supported by this dialect (MSSQL).
    #[error("transactions are not supported by this driver: {0}")]
    NotSupported(String),

    /// A `scan`/`query` read failed for a reason other than no-rows.
    #[error("query failed: {0}")]
    QueryFailed(String),

    /// A `scan` read returned zero rows.
    #[error("no rows returned")]
    NoRows,

    /// Credential resolution (C2) could not find a provider config.
    #[error("failed to get provider config: {0}")]
    GetProviderConfig(String),

    /// The referenced provider config object is of a kind this object may
    /// not reference (e.g. a namespaced object referencing another
    /// namespace's config without going through the cluster-scoped kind).
    #[error("invalid provider config kind: {0}")]
    InvalidProviderConfigKind(String),

    /// The provider config has no `connectionSecretRef`.
    #[error("provider config is missing a connection secret reference")]
    MissingSecretRef,

    /// Failed to track the provider-config usage edge.
    #[error("failed to track provider config usage: {0}")]
    TrackUsage(String),

    /// Failed to fetch the credentials secret named by the provider config.
    #[error("failed to get secret: {0}")]
    GetSecret(String),

    /// A required key was absent from a fetched secret.
    #[error("missing connection secret")]
    MissingConnectionSecret,

    /// Failed to fetch the password secret referenced by a role/user/login.
    #[error("failed to get password secret: {0}")]
    GetPasswordSecret(String),

    /// The spec's object is not of the kind this `ExternalClient` handles.
    #[error("object is not of the expected kind")]
    NotThisKind,

    /// Observe's primary or secondary SELECT failed.
    #[error("select failed: {0}")]
    SelectFailed(String),

    /// Create's DDL failed.
    #[error("create failed: {0}")]
    CreateFailed(String),

    /// Update's DDL failed.
    #[error("update failed: {0}")]
    UpdateFailed(String),

    /// Delete's DDL failed (and the object still exists — idempotent
    /// deletes of an already-absent object are not an error).
    #[error("drop failed: {0}")]
    DropFailed(String),

    /// Could not read the grants/permissions list for a principal.
    #[error("cannot get grants: {0}")]
    CannotGetGrants(String),

    /// Could not kill an active session ahead of an MSSQL user drop.
    #[error("cannot kill session: {0}")]
    CannotKillSession(String),

    /// More than one mutually-exclusive grant field was set on a spec.
    #[error("grant spec is ambiguous: {0}")]
    GrantTypeAmbiguous(String),

    /// The server-side password was changed outside of this controller.
    /// This is a reported condition, never auto-healed.
    #[error("password was changed externally on {0}")]
    ExternallyChangedPassword(String),

    /// A reference-or-selector field resolved to more than one object.
    #[error("ambiguous reference: {0}")]
    AmbiguousReference(String),

    /// A reference-or-selector field resolved to no object.
    #[error("reference not found: {0}")]
    ReferenceNotFound(String),

    /// Propagated Kubernetes API error.
    #[error("kubernetes API error: {0}")]
    Kube(#[from] kube::Error),

    /// The finalizer wrapper around Apply/Cleanup failed (distinct from
    /// a plain `Kube` error since it can also wrap a reconcile error).
    #[error("finalizer error: {0}")]
    Finalizer(String),
}

impl Error {
    /// Whether the host reconciler should requeue quickly (transient) or
    /// back off for a long interval / wait for spec changes (permanent).
    ///
    /// See `SPEC_FULL.md` section 7 for the taxonomy this mirrors.
    pub fn is_retriable(&self) -> bool {
        match self {
            Error::GetProviderConfig(_)
            | Error::GetSecret(_)
            | Error::MissingConnectionSecret
            | Error::GetPasswordSecret(_)
            | Error::TrackUsage(_)
            | Error::ConnectionFailed(_)
            | Error::SelectFailed(_)
            | Error::ReferenceNotFound(_)
            | Error::Kube(_) => true,
            Error::NoRows => true,
            Error::InvalidProviderConfigKind(_)
            | Error::MissingSecretRef
            | Error::NotThisKind
            | Error::GrantTypeAmbiguous(_)
            | Error::AmbiguousReference(_)
            | Error::NotSupported(_) => false,
            Error::ExternallyChangedPassword(_) => false,
            Error::ExecFailed(_)
            | Error::QueryFailed(_)
            | Error::CreateFailed(_)
            | Error::UpdateFailed(_)
            | Error::DropFailed(_)
            | Error::CannotGetGrants(_)
            | Error::CannotKillSession(_) => true,
            Error::Finalizer(_) => true,
        }
    }

    /// True when this error represents "object already absent" on a
    /// delete path, which the caller should treat as success.
    pub fn is_missing_object(&self) -> bool {
        matches!(self, Error::NoRows)
    }
}

pub type Result<T> = std::result::Result<T, Error>;
