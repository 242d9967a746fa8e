//! Object storage for staged parquet files

use crate::{Error, Result};
use async_trait::async_trait;
use bytes::Bytes;
use s3::creds::Credentials;
use s3::error::S3Error;
use s3::{Bucket, Region};
use std::collections::HashMap;
use std::sync::Mutex;

/// Content type used for every staged object
pub const PARQUET_CONTENT_TYPE: &str = "application/vnd.apache.parquet";

/// Minimal key/value object store
///
/// Keys are relative to the store's bucket, e.g. `Data/customers.parquet`.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Fetch an object; a missing key is [`Error::NotFound`]
    async fn get(&self, key: &str) -> Result<Bytes>;

    /// Store an object, replacing any previous content
    async fn put(&self, key: &str, body: Bytes) -> Result<()>;

    /// Human-readable location, used in log lines and errors
    fn describe(&self, key: &str) -> String;
}

/// S3 (or S3-compatible) bucket
pub struct S3Store {
    bucket: Bucket,
}

impl S3Store {
    /// Connect to a bucket
    ///
    /// Credentials come from the usual AWS environment variables or
    /// profile. A custom `endpoint` switches to path-style addressing,
    /// as needed by MinIO and LocalStack.
    pub fn new(bucket: &str, region: &str, endpoint: Option<&str>) -> Result<Self> {
        let region = match endpoint {
            Some(endpoint) => Region::Custom {
                region: region.to_string(),
                endpoint: endpoint.trim_end_matches('/').to_string(),
            },
            None => region
                .parse::<Region>()
                .map_err(|e| Error::Config(format!("Invalid AWS region '{}': {}", region, e)))?,
        };

        let creds = Credentials::default().map_err(|e| Error::connection("s3", e))?;

        let mut bucket =
            Bucket::new(bucket, region, creds).map_err(|e| Error::connection("s3", e))?;
        if endpoint.is_some() {
            bucket = bucket.with_path_style();
        }

        log::debug!("Using S3 bucket {}", bucket.name());
        Ok(Self { bucket })
    }
}

#[async_trait]
impl ObjectStore for S3Store {
    async fn get(&self, key: &str) -> Result<Bytes> {
        log::debug!("GET {}", self.describe(key));
        match self.bucket.get_object(key).await {
            Ok(response) => Ok(response.bytes().clone()),
            Err(S3Error::HttpFailWithBody(404, _)) => Err(Error::NotFound(self.describe(key))),
            Err(e) => Err(Error::connection(self.describe(key), e)),
        }
    }

    async fn put(&self, key: &str, body: Bytes) -> Result<()> {
        log::debug!("PUT {} ({} bytes)", self.describe(key), body.len());
        self.bucket
            .put_object_with_content_type(key, &body, PARQUET_CONTENT_TYPE)
            .await
            .map_err(|e| Error::connection(self.describe(key), e))?;
        Ok(())
    }

    fn describe(&self, key: &str) -> String {
        format!("s3://{}/{}", self.bucket.name(), key)
    }
}

/// In-process store, handy for tests and dry runs
#[derive(Default)]
pub struct MemoryStore {
    objects: Mutex<HashMap<String, Bytes>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Keys currently stored, sorted
    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self
            .objects
            .lock()
            .map(|objects| objects.keys().cloned().collect())
            .unwrap_or_default();
        keys.sort();
        keys
    }
}

#[async_trait]
impl ObjectStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Bytes> {
        let objects = self
            .objects
            .lock()
            .map_err(|e| Error::connection("memory store", e))?;
        objects
            .get(key)
            .cloned()
            .ok_or_else(|| Error::NotFound(self.describe(key)))
    }

    async fn put(&self, key: &str, body: Bytes) -> Result<()> {
        let mut objects = self
            .objects
            .lock()
            .map_err(|e| Error::connection("memory store", e))?;
        objects.insert(key.to_string(), body);
        Ok(())
    }

    fn describe(&self, key: &str) -> String {
        format!("memory://{}", key)
    }
}
