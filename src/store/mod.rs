//! Persistent table state behind a transactional seam.
//!
//! [`Queries`] lists the primitive reads and writes. [`Database`] hands a
//! transaction-scoped `&mut dyn Queries` to a body and commits only if the
//! body returns `Ok`; any error, or a panic unwinding through the body,
//! discards every write the body made.
pub mod memory;
pub use memory::*;

#[cfg(feature = "database")]
pub mod postgres;
#[cfg(feature = "database")]
pub use postgres::*;

pub mod queries;
pub use queries::*;

pub mod rows;
pub use rows::*;

pub use crate::Error;
use futures::future::BoxFuture;

#[async_trait::async_trait]
pub trait Database: Send + Sync + 'static {
    /// Run `body` inside one transaction.
    async fn transact<T, F>(&self, body: F) -> Result<T, Error>
    where
        T: Send + 'static,
        F: for<'q> FnOnce(&'q mut dyn Queries) -> BoxFuture<'q, Result<T, Error>> + Send + 'static;
}
