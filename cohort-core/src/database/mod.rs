pub mod infrastructure;
pub mod ports;
pub mod postgres;

pub use infrastructure::memory::InMemoryStore;
pub use postgres::PostgresDatabase;
