pub mod connection;
pub mod migrations;

pub use connection::{connect_in_memory, get_database_pool, DatabaseManager};
pub use migrations::{run_migrations, MigrationManager};
