//! # llog-db
//!
//! PostgreSQL persistence for llog: the pool, the Postgres
//! implementations of the `llog-core` store traits, and the fixtures
//! the integration suites build on.
//!
//! ## Example
//!
//! ```rust,ignore
//! use llog_core::{ItemStore, RegistryQuery};
//! use llog_db::Database;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let db = Database::connect("postgres://localhost/llog").await?;
//!     let page = db.items.list(&RegistryQuery::new()).await?;
//!     println!("{} items", page.total_items);
//!     Ok(())
//! }
//! ```

pub mod folders;
pub mod items;
pub mod jobs;
pub mod pool;

// Compiled unconditionally, not cfg(test): the tests/ directory builds
// this crate as a normal dependency and needs the fixtures from there.
pub mod test_fixtures;

pub use llog_core::*;

/// Escape `%`, `_`, and `\` so user text matches literally inside a
/// LIKE/ILIKE pattern.
pub fn escape_like(input: &str) -> String {
    input
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_")
}

pub use folders::{PgFolderStore, PgFolderTree};
pub use items::PgItemStore;
pub use jobs::PgJobQueue;
pub use pool::{create_pool, create_pool_with_config, PoolConfig};

/// All stores over one shared pool. The API layer destructures this
/// into trait objects at startup.
pub struct Database {
    pub pool: sqlx::Pool<sqlx::Postgres>,
    /// Item registry store.
    pub items: PgItemStore,
    /// Registered-folder store.
    pub folders: PgFolderStore,
    /// Combined folder-tree mutations across items and the registry.
    pub folder_tree: PgFolderTree,
    /// Background job queue.
    pub jobs: PgJobQueue,
}

impl Database {
    /// Wrap an already-connected pool.
    pub fn new(pool: sqlx::Pool<sqlx::Postgres>) -> Self {
        Self {
            items: PgItemStore::new(pool.clone()),
            folders: PgFolderStore::new(pool.clone()),
            folder_tree: PgFolderTree::new(pool.clone()),
            jobs: PgJobQueue::new(pool.clone()),
            pool,
        }
    }

    /// Connect with the default pool configuration.
    pub async fn connect(url: &str) -> Result<Self> {
        let pool = pool::create_pool(url).await?;
        Ok(Self::new(pool))
    }

    /// Connect with explicit pool tuning.
    pub async fn connect_with_config(url: &str, config: PoolConfig) -> Result<Self> {
        let pool = pool::create_pool_with_config(url, config).await?;
        Ok(Self::new(pool))
    }

    /// Connect to the database the test environment points at.
    #[cfg(test)]
    pub async fn connect_test() -> Result<Self> {
        let database_url = std::env::var("DATABASE_URL")
            .unwrap_or_else(|_| crate::test_fixtures::DEFAULT_TEST_DATABASE_URL.to_string());
        Self::connect(&database_url).await
    }

    /// Apply any migrations not yet recorded in the target database.
    #[cfg(feature = "migrations")]
    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("../../migrations")
            .run(&self.pool)
            .await
            .map_err(|e| Error::Database(sqlx::Error::Migrate(Box::new(e))))?;
        Ok(())
    }

    /// Borrow the underlying pool, for callers that need raw queries.
    pub fn pool(&self) -> &sqlx::Pool<sqlx::Postgres> {
        &self.pool
    }
}

impl Clone for Database {
    fn clone(&self) -> Self {
        Self {
            pool: self.pool.clone(),
            items: PgItemStore::new(self.pool.clone()),
            folders: PgFolderStore::new(self.pool.clone()),
            folder_tree: PgFolderTree::new(self.pool.clone()),
            // Keep the notify handle shared so workers listening through
            // one clone hear jobs queued through another.
            jobs: PgJobQueue::with_notify(self.pool.clone(), self.jobs.job_notify()),
        }
    }
}
