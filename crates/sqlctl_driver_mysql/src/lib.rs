mod dialect;
mod driver;

pub use dialect::MysqlDialect;
pub use driver::{MysqlConnection, MysqlDriverFactory};
