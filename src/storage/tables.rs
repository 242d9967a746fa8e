//! Parquet table sources and sinks
//!
//! Raw tables are decoded straight into their typed rows with
//! `serde_arrow`, whether the bytes come from a local file or an object
//! store.

use super::object::ObjectStore;
use crate::etl::{Extractor, Loader};
use crate::model::RawDataset;
use crate::model::RawTable;
use crate::{Error, Result};
use async_trait::async_trait;
use bytes::Bytes;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use parquet::file::reader::ChunkReader;
use serde::de::DeserializeOwned;
use std::fmt;
use std::marker::PhantomData;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Decode every record batch of a parquet stream into rows of `T`
///
/// `what` names the source in error messages.
pub fn decode_parquet<T, R>(reader: R, what: &str) -> Result<Vec<T>>
where
    T: DeserializeOwned,
    R: ChunkReader + 'static,
{
    let builder =
        ParquetRecordBatchReaderBuilder::try_new(reader).map_err(|e| Error::format(what, e))?;
    let batches = builder.build().map_err(|e| Error::format(what, e))?;

    let mut rows = Vec::new();
    for batch in batches {
        let batch = batch.map_err(|e| Error::format(what, e))?;
        let decoded: Vec<T> =
            serde_arrow::from_record_batch(&batch).map_err(|e| Error::format(what, e))?;
        rows.extend(decoded);
    }
    Ok(rows)
}

/// Decode a local parquet file; a missing file is [`Error::NotFound`]
pub fn read_parquet_file<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>> {
    let file = std::fs::File::open(path).map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => Error::NotFound(path.display().to_string()),
        _ => Error::Io(e),
    })?;
    decode_parquet(file, &path.display().to_string())
}

/// Where a parquet table lives
#[derive(Clone)]
pub enum ParquetSource {
    File(PathBuf),
    Object {
        store: Arc<dyn ObjectStore>,
        key: String,
    },
}

impl ParquetSource {
    pub async fn read<T: DeserializeOwned>(&self) -> Result<Vec<T>> {
        match self {
            ParquetSource::File(path) => read_parquet_file(path),
            ParquetSource::Object { store, key } => {
                let body = store.get(key).await?;
                decode_parquet(body, &store.describe(key))
            }
        }
    }
}

impl fmt::Display for ParquetSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParquetSource::File(path) => write!(f, "{}", path.display()),
            ParquetSource::Object { store, key } => f.write_str(&store.describe(key)),
        }
    }
}

/// Extract the rows of one parquet table
pub struct ParquetExtractor<T> {
    source: ParquetSource,
    _row: PhantomData<fn() -> T>,
}

impl<T> ParquetExtractor<T> {
    pub fn new(source: ParquetSource) -> Self {
        Self {
            source,
            _row: PhantomData,
        }
    }
}

impl<T> Extractor for ParquetExtractor<T>
where
    T: DeserializeOwned + Send + 'static,
{
    type Item = T;

    async fn extract(&self) -> Result<Vec<T>> {
        let rows = self.source.read().await?;
        log::debug!("Read {} row(s) from {}", rows.len(), self.source);
        Ok(rows)
    }
}

/// Extract all eight raw tables as a single [`RawDataset`]
///
/// Every table must exist and contain at least one row.
pub struct RawDatasetExtractor {
    locate: Box<dyn Fn(RawTable) -> ParquetSource + Send + Sync>,
}

impl RawDatasetExtractor {
    /// Read the `olist_*_dataset.parquet` files of a local directory
    pub fn local(dir: impl AsRef<Path>) -> Self {
        let dir = dir.as_ref().to_path_buf();
        Self {
            locate: Box::new(move |table| ParquetSource::File(dir.join(table.file_name()))),
        }
    }

    /// Read `<prefix>/<table>.parquet` objects from a store
    pub fn object_store(store: Arc<dyn ObjectStore>, prefix: &str) -> Self {
        let prefix = prefix.to_string();
        Self {
            locate: Box::new(move |table| ParquetSource::Object {
                store: Arc::clone(&store),
                key: table.object_key(&prefix),
            }),
        }
    }

    pub fn source(&self, table: RawTable) -> ParquetSource {
        (self.locate)(table)
    }

    async fn table<T>(&self, table: RawTable) -> Result<Vec<T>>
    where
        T: DeserializeOwned + Send + 'static,
    {
        let source = self.source(table);
        let rows = ParquetExtractor::<T>::new(source.clone()).extract().await?;
        if rows.is_empty() {
            return Err(Error::EmptySource(source.to_string()));
        }
        log::info!("Loaded {} {} row(s)", rows.len(), table);
        Ok(rows)
    }

    pub async fn read_dataset(&self) -> Result<RawDataset> {
        Ok(RawDataset {
            customers: self.table(RawTable::Customers).await?,
            order_items: self.table(RawTable::OrderItems).await?,
            order_payments: self.table(RawTable::OrderPayments).await?,
            order_reviews: self.table(RawTable::OrderReviews).await?,
            orders: self.table(RawTable::Orders).await?,
            product_categories: self.table(RawTable::ProductCategories).await?,
            products: self.table(RawTable::Products).await?,
            sellers: self.table(RawTable::Sellers).await?,
        })
    }
}

impl Extractor for RawDatasetExtractor {
    type Item = RawDataset;

    async fn extract(&self) -> Result<Vec<RawDataset>> {
        Ok(vec![self.read_dataset().await?])
    }
}

/// A named table encoded as a parquet file
#[derive(Debug, Clone, PartialEq)]
pub struct ParquetObject {
    pub table: String,
    pub body: Bytes,
}

/// Upload parquet tables to `<prefix>/<table>.parquet`
pub struct ObjectUploader {
    store: Arc<dyn ObjectStore>,
    prefix: String,
}

impl ObjectUploader {
    pub fn new(store: Arc<dyn ObjectStore>, prefix: impl Into<String>) -> Self {
        Self {
            store,
            prefix: prefix.into(),
        }
    }

    pub fn key_for(&self, table: &str) -> String {
        let prefix = self.prefix.trim_matches('/');
        if prefix.is_empty() {
            format!("{}.parquet", table)
        } else {
            format!("{}/{}.parquet", prefix, table)
        }
    }
}

#[async_trait]
impl Loader for ObjectUploader {
    type Item = ParquetObject;

    async fn load(&self, items: Vec<ParquetObject>) -> Result<usize> {
        let mut count = 0;
        for item in items {
            let key = self.key_for(&item.table);
            self.store.put(&key, item.body).await?;
            log::info!("Uploaded {} to {}", item.table, self.store.describe(&key));
            count += 1;
        }
        Ok(count)
    }
}
