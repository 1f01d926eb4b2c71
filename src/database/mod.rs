pub mod chart_storage;
pub mod connection;
pub mod models;
pub mod query;
pub mod store;

pub use connection::Database;
pub use store::{ChartStore, MemoryChartStore, SqliteChartStore};
