mod dialect;
mod driver;

pub use dialect::MssqlDialect;
pub use driver::{MssqlConnection, MssqlDriverFactory};
