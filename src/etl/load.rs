//! Loader trait for writing data to destinations

use crate::Result;
use async_trait::async_trait;

/// Loader trait for loading data to a destination
///
/// Implementors define how to load items to destinations:
/// - DuckDB or Snowflake tables
/// - Objects in S3-compatible storage
///
/// # Example
/// ```no_run
/// use ecommerce_etl::etl::Loader;
/// use ecommerce_etl::Result;
/// use async_trait::async_trait;
///
/// struct CountingLoader;
///
/// #[async_trait]
/// impl Loader for CountingLoader {
///     type Item = String;
///
///     async fn load(&self, items: Vec<Self::Item>) -> Result<usize> {
///         Ok(items.len())
///     }
/// }
/// ```
#[async_trait]
pub trait Loader: Send + Sync {
    /// The type of items to load
    type Item: Send;

    /// Load items to the destination
    ///
    /// Returns the number of rows (or objects) written
    ///
    /// # Errors
    /// Returns `Connection` when the destination is unreachable and
    /// `SchemaMismatch` when the items do not fit the destination.
    async fn load(&self, items: Vec<Self::Item>) -> Result<usize>;
}
