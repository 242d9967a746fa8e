//! E-commerce ETL
//!
//! Builds the Olist e-commerce star schema: raw parquet tables are
//! extracted from disk or S3, reshaped into dimension and fact tables, and
//! loaded into DuckDB or Snowflake.

pub mod cli;
pub mod config;
pub mod error;
pub mod etl;
pub mod model;
pub mod storage;
pub mod transform;
pub mod warehouse;

// Re-exports for convenience
pub use error::{Error, Result};
pub use etl::{Extractor, IdentityTransformer, Loader, Pipeline, Transformer};
pub use model::{RawDataset, RawTable, StarSchema};
pub use storage::{MemoryStore, ObjectStore, ObjectUploader, RawDatasetExtractor, S3Store};
pub use transform::StarSchemaTransformer;
pub use warehouse::{DuckDbWarehouse, SnowflakeWarehouse, StarSchemaLoader, TableLoader, Warehouse};
