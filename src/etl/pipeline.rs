//! Pipeline orchestration for ETL operations

use super::{Extractor, Loader, Transformer};
use crate::Result;

/// ETL Pipeline that orchestrates Extract, Transform, and Load operations
///
/// The pipeline is linear: any stage failure stops the run and is
/// returned to the caller. Nothing is retried or resumed.
///
/// # Type Parameters
/// - `E`: Extractor type
/// - `T`: Transformer type (must transform from E::Item)
/// - `L`: Loader type (must load T::Output)
///
/// # Example
/// ```no_run
/// use ecommerce_etl::etl::{IdentityTransformer, Pipeline};
/// # use ecommerce_etl::etl::{Extractor, Loader};
/// # use ecommerce_etl::Result;
/// # use async_trait::async_trait;
/// # struct MyExtractor;
/// # impl Extractor for MyExtractor {
/// #     type Item = i32;
/// #     async fn extract(&self) -> Result<Vec<Self::Item>> { Ok(vec![]) }
/// # }
/// # struct MyLoader;
/// # #[async_trait]
/// # impl Loader for MyLoader {
/// #     type Item = i32;
/// #     async fn load(&self, items: Vec<Self::Item>) -> Result<usize> { Ok(items.len()) }
/// # }
///
/// # async fn example() -> Result<()> {
/// let pipeline = Pipeline::new(MyExtractor, IdentityTransformer::new(), MyLoader);
///
/// let count = pipeline.run().await?;
/// println!("Loaded {} rows", count);
/// # Ok(())
/// # }
/// ```
pub struct Pipeline<E, T, L> {
    extractor: E,
    transformer: T,
    loader: L,
}

impl<E, T, L> Pipeline<E, T, L>
where
    E: Extractor,
    T: Transformer<Input = E::Item>,
    L: Loader<Item = T::Output>,
{
    /// Create a new pipeline
    pub fn new(extractor: E, transformer: T, loader: L) -> Self {
        Self {
            extractor,
            transformer,
            loader,
        }
    }

    /// Run the complete ETL pipeline
    ///
    /// Steps:
    /// 1. Extract items from source
    /// 2. Transform each item
    /// 3. Load items to destination
    ///
    /// Returns whatever count the loader reports
    ///
    /// # Errors
    /// Returns the first error raised by any stage
    pub async fn run(&self) -> Result<usize> {
        log::info!("Starting ETL pipeline");

        log::debug!("Extracting from source...");
        let items = self.extractor.extract().await?;
        log::info!("Extracted {} item(s)", items.len());

        if items.is_empty() {
            log::warn!("No items extracted, pipeline complete");
            return Ok(0);
        }

        log::debug!("Transforming items...");
        let transformed = self.transformer.transform_many(items)?;
        log::info!("Transformed {} item(s)", transformed.len());

        log::debug!("Loading to destination...");
        let count = self.loader.load(transformed).await?;
        log::info!("Loaded {} row(s)", count);

        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;
    use crate::transform::normalize_uuid;
    use async_trait::async_trait;
    use std::sync::{Arc, Mutex};

    struct IdExtractor(Vec<&'static str>);

    impl Extractor for IdExtractor {
        type Item = String;
        async fn extract(&self) -> Result<Vec<String>> {
            Ok(self.0.iter().map(|s| s.to_string()).collect())
        }
    }

    struct UuidNormalizer;

    impl Transformer for UuidNormalizer {
        type Input = String;
        type Output = String;
        fn transform(&self, input: String) -> Result<String> {
            normalize_uuid(&input)
        }
    }

    #[derive(Default)]
    struct CollectingLoader {
        loaded: Arc<Mutex<Vec<String>>>,
        calls: Arc<Mutex<usize>>,
    }

    #[async_trait]
    impl Loader for CollectingLoader {
        type Item = String;
        async fn load(&self, items: Vec<String>) -> Result<usize> {
            *self.calls.lock().unwrap() += 1;
            let count = items.len();
            self.loaded.lock().unwrap().extend(items);
            Ok(count)
        }
    }

    struct UnreachableStore;

    #[async_trait]
    impl Loader for UnreachableStore {
        type Item = String;
        async fn load(&self, _items: Vec<String>) -> Result<usize> {
            Err(Error::connection("warehouse", "connection refused"))
        }
    }

    #[tokio::test]
    async fn test_pipeline_normalizes_in_order() {
        let loader = CollectingLoader::default();
        let loaded = loader.loaded.clone();

        let pipeline = Pipeline::new(
            IdExtractor(vec![
                "3504C0CB71D7FA48D967E0E4C94D59D9",
                "{289cdb32-5fb7-e7f8-91c3-8608bf9e0962}",
            ]),
            UuidNormalizer,
            loader,
        );

        assert_eq!(pipeline.run().await.unwrap(), 2);
        assert_eq!(
            *loaded.lock().unwrap(),
            vec![
                "3504c0cb-71d7-fa48-d967-e0e4c94d59d9",
                "289cdb32-5fb7-e7f8-91c3-8608bf9e0962",
            ]
        );
    }

    #[tokio::test]
    async fn test_empty_extraction_skips_load() {
        let loader = CollectingLoader::default();
        let calls = loader.calls.clone();

        let pipeline = Pipeline::new(IdExtractor(vec![]), UuidNormalizer, loader);

        assert_eq!(pipeline.run().await.unwrap(), 0);
        assert_eq!(*calls.lock().unwrap(), 0);
    }

    #[tokio::test]
    async fn test_transform_failure_stops_before_load() {
        let loader = CollectingLoader::default();
        let calls = loader.calls.clone();

        let pipeline = Pipeline::new(
            IdExtractor(vec!["3504c0cb71d7fa48d967e0e4c94d59d9", "not-a-uuid"]),
            UuidNormalizer,
            loader,
        );

        let err = pipeline.run().await.unwrap_err();
        assert!(matches!(err, Error::Value { kind: "uuid", .. }));
        assert_eq!(*calls.lock().unwrap(), 0);
    }

    #[tokio::test]
    async fn test_load_failure_is_returned() {
        let pipeline = Pipeline::new(
            IdExtractor(vec!["3504c0cb71d7fa48d967e0e4c94d59d9"]),
            UuidNormalizer,
            UnreachableStore,
        );

        let err = pipeline.run().await.unwrap_err();
        assert!(matches!(err, Error::Connection { .. }));
    }
}
