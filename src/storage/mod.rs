//! Object storage and parquet I/O
//!
//! This module handles all file and object transfers:
//! - S3 and in-memory object stores
//! - Parquet decoding into typed raw rows
//! - Parquet uploads for staging

mod object;
mod tables;

pub use object::{MemoryStore, ObjectStore, PARQUET_CONTENT_TYPE, S3Store};
pub use tables::{
    ObjectUploader, ParquetExtractor, ParquetObject, ParquetSource, RawDatasetExtractor,
    decode_parquet, read_parquet_file,
};
