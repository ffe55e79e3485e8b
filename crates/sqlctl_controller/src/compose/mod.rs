pub mod hana;
pub mod mssql;
pub mod mysql;
pub mod postgresql;
