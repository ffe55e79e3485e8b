mod dialect;
mod driver;

pub use dialect::HanaDialect;
pub use driver::{HanaConnectionAdapter, HanaDriverFactory};
