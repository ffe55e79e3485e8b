//! External client (C5): per-kind Observe/Create/Update/Delete state
//! machine, grounded in `SPEC_FULL.md` 4.5 and in the reconcile/cleanup
//! split shown by
//! `other_examples/989eaaa0_tembo-io-tembo__coredb-operator-src-controller.rs.rs`.

pub mod hana;
pub mod mssql;
pub mod mysql;
pub mod postgresql;

/// Result of Observe: whether the object exists on the server, and if it
/// does, whether it already matches spec.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ObserveResult {
    pub exists: bool,
    pub up_to_date: bool,
}

impl ObserveResult {
    pub fn missing() -> Self {
        Self { exists: false, up_to_date: false }
    }

    pub fn found(up_to_date: bool) -> Self {
        Self { exists: true, up_to_date }
    }
}

/// Runs `scan` and converts "no rows" into `exists = false` rather than
/// an error, per `SPEC_FULL.md` 4.5's Observe contract.
pub async fn exists_via_scan(
    connection: &mut dyn sqlctl_core::SqlConnection,
    query: &sqlctl_core::Query,
) -> sqlctl_core::Result<bool> {
    match connection.scan_one(query).await {
        Ok(_) => Ok(true),
        Err(e) if e.is_missing_object() => Ok(false),
        Err(e) => Err(e),
    }
}

/// Runs a drop statement and treats "object already gone" as success,
/// per `SPEC_FULL.md` 4.5's Delete contract (idempotent delete) and
/// testable property #3.
pub async fn delete_idempotent(
    connection: &mut dyn sqlctl_core::SqlConnection,
    query: &sqlctl_core::Query,
) -> sqlctl_core::Result<()> {
    match connection.exec(query).await {
        Ok(()) => Ok(()),
        Err(e) if e.is_missing_object() => Ok(()),
        Err(e) => Err(e),
    }
}
