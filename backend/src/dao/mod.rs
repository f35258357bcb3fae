//! DAO contract and reference implementations (`spec.md` §4.3).
//!
//! `Dao::serve` is synchronous and takes `&mut self` deliberately: the
//! worker owns exactly one DAO instance on its own dedicated thread, so a
//! DAO implementation that refuses cross-thread use (embedded SQL) is safe,
//! and a connection handle can be replaced in place on reconnect without any
//! interior mutability.

mod memory;
mod sqlite;

pub use memory::{InMemoryDao, InMemoryDaoFactory};
pub use sqlite::{SqliteDao, SqliteDaoFactory};

use crate::domain::Request;

/// Error building a DAO from its factory.
#[derive(Debug, thiserror::Error)]
pub enum DaoBuildError {
    /// The backing store could not be opened/initialized.
    #[error("failed to initialize dao: {0}")]
    InitFailed(String),
}

/// A pluggable database-operation executor.
///
/// Implementations must, before `serve` returns, set exactly one of the
/// request's success payload or failure cause (`spec.md` §3's completion
/// invariant; enforced here at the type level by
/// [`crate::domain::Request::complete_success`]/`complete_failure`).
pub trait Dao {
    /// Execute the operation described by `request`, completing it.
    fn serve(&mut self, request: &Request);
}

/// Builds a [`Dao`] on the caller's own execution context.
///
/// The worker loop calls this from inside the thread it dedicates to DB
/// work, never from the thread that constructed the factory, because some
/// DAO implementations refuse use from any other thread.
pub trait DaoFactory: Send + Sync {
    /// Construct a fresh DAO instance.
    ///
    /// # Errors
    /// Returns [`DaoBuildError`] if the backing store cannot be
    /// initialized.
    fn build(&self) -> Result<Box<dyn Dao>, DaoBuildError>;
}
