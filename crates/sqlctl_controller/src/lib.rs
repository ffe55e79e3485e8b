//! Credential resolution (C2), query composition (C3), drift detection
//! reuse (C4), the per-kind external client state machine (C5), the
//! connector factory (C6), reference resolution (C7), and controller
//! registration (C8) for every managed SQL resource kind.

pub mod compose;
pub mod connector;
pub mod credentials;
pub mod external;
pub mod reconcile;
pub mod reference;
pub mod setup;

pub use connector::{Connected, Connector, Dialect};
pub use credentials::ProviderConfigRef;
pub use reconcile::Context;
