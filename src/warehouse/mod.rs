//! Relational targets for the star schema
//!
//! A [`Warehouse`] is anything that can create a declared table, report
//! the columns of an existing table and append rows to it. The loaders in
//! [`loader`] drive a warehouse for one table or for the whole schema.

mod duckdb;
mod loader;
mod snowflake;

pub use self::duckdb::{CsvImport, DuckDbTableExtractor, DuckDbWarehouse};
pub use loader::{StarSchemaLoader, TableLoader};
pub use snowflake::{SnowflakeConfig, SnowflakeWarehouse, TokenType};

use crate::model::{CellValue, TableSchema};
use crate::{Error, Result};
use async_trait::async_trait;

#[async_trait]
pub trait Warehouse: Send + Sync {
    /// Short name used in log lines and errors
    fn name(&self) -> &str;

    /// `CREATE TABLE IF NOT EXISTS` for the declared schema
    async fn create_table(&self, schema: &TableSchema) -> Result<()>;

    /// Column names of an existing table, in table order
    async fn columns(&self, table: &str) -> Result<Vec<String>>;

    /// Append rows, each holding one value per schema column
    async fn append(&self, schema: &TableSchema, rows: Vec<Vec<CellValue>>) -> Result<usize>;

    async fn row_count(&self, table: &str) -> Result<u64>;
}

/// Create the table if needed and check the stored columns
///
/// An existing table must have exactly the declared columns, in order.
pub async fn ensure_table<W: Warehouse + ?Sized>(warehouse: &W, schema: &TableSchema) -> Result<()> {
    warehouse.create_table(schema).await?;

    let found = warehouse.columns(schema.name).await?;
    let expected = schema.column_names();
    if found.iter().map(String::as_str).ne(expected.iter().copied()) {
        return Err(Error::SchemaMismatch {
            table: schema.name.to_string(),
            expected: expected.into_iter().map(str::to_string).collect(),
            found,
        });
    }
    Ok(())
}
