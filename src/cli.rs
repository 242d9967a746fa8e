//! CLI helper functions
//!
//! One function per command. Each builds its pipeline from [`Settings`]
//! and reports progress through the log.

use crate::{
    config::Settings,
    etl::{IdentityTransformer, Pipeline},
    model::RawTable,
    storage::{ObjectStore, ObjectUploader, RawDatasetExtractor, S3Store},
    transform::StarSchemaTransformer,
    warehouse::{
        CsvImport, DuckDbTableExtractor, DuckDbWarehouse, SnowflakeWarehouse, StarSchemaLoader,
        Warehouse,
    },
};
use clap::ValueEnum;
use eyre::{Context, Result};
use owo_colors::OwoColorize;
use std::path::Path;
use std::sync::Arc;

/// Where the raw parquet tables are read from
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum Source {
    /// Parquet files in DATA_DIR
    #[default]
    Local,
    /// Parquet objects under s3://BUCKET_NAME/S3_PREFIX
    S3,
}

/// Where the star schema is loaded
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum Target {
    /// Embedded DuckDB file at DUCKDB_PATH
    #[default]
    Duckdb,
    /// Snowflake through the SQL API
    Snowflake,
}

/// Connect to the S3 bucket named in the settings
pub fn load_s3_store(settings: &Settings) -> Result<Arc<dyn ObjectStore>> {
    let s3 = settings.s3()?;
    let store = S3Store::new(&s3.bucket, &s3.region, s3.endpoint.as_deref())
        .with_context(|| format!("Failed to connect to bucket {}", s3.bucket))?;
    Ok(Arc::new(store))
}

fn load_warehouse(settings: &Settings, target: Target) -> Result<Arc<dyn Warehouse>> {
    match target {
        Target::Duckdb => {
            let warehouse = DuckDbWarehouse::open(&settings.duckdb_path).with_context(|| {
                format!("Failed to open DuckDB at {}", settings.duckdb_path.display())
            })?;
            Ok(Arc::new(warehouse))
        }
        Target::Snowflake => {
            let warehouse = SnowflakeWarehouse::try_new(settings.snowflake()?.clone())
                .context("Failed to create Snowflake client")?;
            Ok(Arc::new(warehouse))
        }
    }
}

/// Build the star schema and load it into the target
///
/// Pipeline: RawDatasetExtractor → StarSchemaTransformer → StarSchemaLoader
pub async fn run_pipeline(settings: &Settings, source: Source, target: Target) -> Result<usize> {
    let extractor = match source {
        Source::Local => {
            log::info!(
                "Reading raw tables from {}",
                settings.data_dir.display().bright_black()
            );
            RawDatasetExtractor::local(&settings.data_dir)
        }
        Source::S3 => {
            let store = load_s3_store(settings)?;
            let prefix = &settings.s3()?.prefix;
            log::info!("Reading raw tables from {}", store.describe(prefix).bright_black());
            RawDatasetExtractor::object_store(store, prefix)
        }
    };

    let transformer =
        StarSchemaTransformer::new().with_date_range(settings.date_start, settings.date_end);

    let warehouse = load_warehouse(settings, target)?;
    log::info!("Loading star schema into {}", warehouse.name().cyan());
    let loader = StarSchemaLoader::new(warehouse);

    let count = Pipeline::new(extractor, transformer, loader)
        .run()
        .await
        .context("Star schema pipeline failed")?;

    log::info!("✓ Loaded {} row(s) into the star schema", count);
    Ok(count)
}

/// Convert every CSV file in `raw_dir` to a parquet file in `data_dir`
pub fn convert_csv_to_parquet(raw_dir: impl AsRef<Path>, data_dir: impl AsRef<Path>) -> Result<usize> {
    let raw_dir = raw_dir.as_ref();
    let data_dir = data_dir.as_ref();

    let mut files = std::fs::read_dir(raw_dir)
        .with_context(|| format!("Failed to read directory: {}", raw_dir.display()))?
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| p.extension().and_then(|s| s.to_str()) == Some("csv"))
        .collect::<Vec<_>>();
    files.sort();

    std::fs::create_dir_all(data_dir)
        .with_context(|| format!("Failed to create directory: {}", data_dir.display()))?;

    let duckdb = DuckDbWarehouse::open_in_memory()?;
    for csv in &files {
        let parquet = data_dir.join(csv.with_extension("parquet").file_name().unwrap_or_default());
        log::info!(
            "Converting {} -> {}",
            csv.display().bright_black(),
            parquet.display().bright_black()
        );
        duckdb
            .copy_csv_to_parquet(csv, &parquet)
            .with_context(|| format!("Failed to convert {}", csv.display()))?;
    }

    log::info!("✓ Converted {} CSV file(s) to parquet", files.len());
    Ok(files.len())
}

/// Staging tables seeded from the raw CSV files
pub fn seed_imports(raw_dir: &Path) -> Vec<CsvImport> {
    let csv = |name: &str| raw_dir.join(name);
    vec![
        CsvImport::new(RawTable::Customers.table_name(), csv("olist_customers_dataset.csv")),
        CsvImport::new("geolocations", csv("olist_geolocation_dataset.csv")),
        CsvImport::new(RawTable::OrderItems.table_name(), csv("olist_order_items_dataset.csv"))
            .with_projection(
                "order_id, order_item_id AS quantity, product_id, seller_id, \
                 shipping_limit_date, price, freight_value, \
                 CAST(row_number() OVER () - 1 AS BIGINT) AS order_items_id, \
                 order_item_id * price + freight_value AS total_price",
            ),
        CsvImport::new(
            RawTable::OrderPayments.table_name(),
            csv("olist_order_payments_dataset.csv"),
        ),
        CsvImport::new(
            RawTable::OrderReviews.table_name(),
            csv("olist_order_reviews_dataset.csv"),
        ),
        CsvImport::new(RawTable::Orders.table_name(), csv("olist_orders_dataset.csv")),
        CsvImport::new(RawTable::Sellers.table_name(), csv("olist_sellers_dataset.csv")),
        CsvImport::new(RawTable::Products.table_name(), csv("olist_products_dataset.csv")),
        CsvImport::new(
            RawTable::ProductCategories.table_name(),
            csv("product_category_name_translation.csv"),
        ),
    ]
}

/// Load the raw CSV files into DuckDB staging tables, replacing them
pub fn seed_database(settings: &Settings) -> Result<usize> {
    let duckdb = DuckDbWarehouse::open(&settings.duckdb_path)
        .with_context(|| format!("Failed to open DuckDB at {}", settings.duckdb_path.display()))?;

    let imports = seed_imports(&settings.raw_data_dir);
    for import in &imports {
        log::info!(
            "Loading {} from {}",
            import.table.cyan(),
            import.file.display().bright_black()
        );
        let rows = duckdb
            .import_csv(import)
            .with_context(|| format!("Failed to seed table {}", import.table))?;
        log::info!("Loaded {} record(s) into {}", rows, import.table);
    }

    log::info!("✓ Seeded {} table(s)", imports.len());
    Ok(imports.len())
}

/// Keep table names matching `include` and not matching `exclude`
pub fn filter_tables(
    tables: Vec<String>,
    include: Option<&str>,
    exclude: Option<&str>,
) -> Result<Vec<String>> {
    let mut tables = tables;

    if let Some(include_pattern) = include {
        let regex = regex::Regex::new(include_pattern)
            .with_context(|| format!("Invalid include regex pattern: {}", include_pattern))?;
        tables.retain(|t| regex.is_match(t));
        log::debug!("After include filter '{}': {} table(s)", include_pattern, tables.len());
    }

    if let Some(exclude_pattern) = exclude {
        let regex = regex::Regex::new(exclude_pattern)
            .with_context(|| format!("Invalid exclude regex pattern: {}", exclude_pattern))?;
        tables.retain(|t| !regex.is_match(t));
        log::debug!("After exclude filter '{}': {} table(s)", exclude_pattern, tables.len());
    }

    Ok(tables)
}

/// Export seeded DuckDB tables to S3 as parquet
///
/// Pipeline: DuckDbTableExtractor → IdentityTransformer → ObjectUploader
pub async fn stage_tables(
    settings: &Settings,
    include: Option<&str>,
    exclude: Option<&str>,
) -> Result<usize> {
    let duckdb = Arc::new(
        DuckDbWarehouse::open(&settings.duckdb_path).with_context(|| {
            format!("Failed to open DuckDB at {}", settings.duckdb_path.display())
        })?,
    );
    let tables = filter_tables(duckdb.tables()?, include, exclude)?;
    if tables.is_empty() {
        log::warn!("No tables to stage; run the seed command first");
        return Ok(0);
    }
    log::info!("Staging {} table(s): {}", tables.len(), tables.join(", ").cyan());

    let store = load_s3_store(settings)?;
    let uploader = ObjectUploader::new(store, settings.s3()?.prefix.as_str());
    let extractor = DuckDbTableExtractor::new(duckdb).with_tables(tables)?;

    let count = Pipeline::new(extractor, IdentityTransformer::new(), uploader)
        .run()
        .await
        .context("Staging pipeline failed")?;

    log::info!("✓ Staged {} table(s)", count);
    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_filter_tables() {
        let tables = names(&["customers", "geolocations", "order_items", "orders"]);

        let included = filter_tables(tables.clone(), Some("^order"), None).unwrap();
        assert_eq!(included, names(&["order_items", "orders"]));

        let excluded = filter_tables(tables.clone(), None, Some("geo")).unwrap();
        assert_eq!(excluded, names(&["customers", "order_items", "orders"]));

        assert!(filter_tables(tables, Some("("), None).is_err());
    }

    #[test]
    fn test_seed_imports_cover_raw_tables() {
        let imports = seed_imports(Path::new("raw"));
        for table in RawTable::ALL {
            assert!(
                imports.iter().any(|i| i.table == table.table_name()),
                "missing {}",
                table
            );
        }
        assert_eq!(imports.len(), 9);
    }

    #[test]
    fn test_convert_directory() {
        let raw = tempfile::tempdir().unwrap();
        let data = tempfile::tempdir().unwrap();
        std::fs::write(
            raw.path().join("product_category_name_translation.csv"),
            "product_category_name,product_category_name_english\nbeleza_saude,health_beauty\n",
        )
        .unwrap();
        std::fs::write(raw.path().join("notes.txt"), "ignored").unwrap();

        let count = convert_csv_to_parquet(raw.path(), data.path().join("out")).unwrap();
        assert_eq!(count, 1);
        assert!(
            data.path()
                .join("out/product_category_name_translation.parquet")
                .exists()
        );
    }
}
