//! Embedded DuckDB warehouse
//!
//! Besides being a [`Warehouse`], DuckDB does the CSV work of the tool:
//! converting raw CSV files to parquet, seeding staging tables and
//! exporting those tables back out as parquet.

use super::Warehouse;
use crate::etl::Extractor;
use crate::model::{CellValue, Dialect, TableSchema, quote_ident};
use crate::storage::ParquetObject;
use crate::{Error, Result};
use async_trait::async_trait;
use bytes::Bytes;
use duckdb::types::{TimeUnit, Value};
use duckdb::{Connection, appender_params_from_iter, params};
use regex::Regex;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

/// Timestamps stay text so the transformer can normalize them itself
const CSV_OPTIONS: &str = "header = true, auto_type_candidates = ['BIGINT', 'DOUBLE', 'VARCHAR']";

const IDENTIFIER_PATTERN: &str = r"^[A-Za-z_][A-Za-z0-9_]*$";

/// Check that a user-supplied table name is a plain SQL identifier
pub fn validate_table_name(name: &str) -> Result<()> {
    let identifier = Regex::new(IDENTIFIER_PATTERN).map_err(|e| Error::Config(e.to_string()))?;
    if identifier.is_match(name) {
        Ok(())
    } else {
        Err(Error::Config(format!("Invalid table name '{}'", name)))
    }
}

fn quote_literal(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

fn read_csv_sql(path: &Path) -> String {
    format!(
        "read_csv({}, {})",
        quote_literal(&path.display().to_string()),
        CSV_OPTIONS
    )
}

/// One CSV file seeded into a staging table
///
/// `projection` is the select list applied to the CSV rows, `*` by
/// default.
#[derive(Debug, Clone, PartialEq)]
pub struct CsvImport {
    pub table: String,
    pub file: PathBuf,
    pub projection: String,
}

impl CsvImport {
    pub fn new(table: impl Into<String>, file: impl Into<PathBuf>) -> Self {
        Self {
            table: table.into(),
            file: file.into(),
            projection: "*".to_string(),
        }
    }

    pub fn with_projection(mut self, projection: impl Into<String>) -> Self {
        self.projection = projection.into();
        self
    }
}

pub struct DuckDbWarehouse {
    name: String,
    conn: Mutex<Connection>,
}

impl DuckDbWarehouse {
    /// Open (or create) a database file
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let conn = Connection::open(path)
            .map_err(|e| Error::connection(path.display().to_string(), e))?;
        log::debug!("Opened DuckDB database {}", path.display());
        Ok(Self {
            name: path.display().to_string(),
            conn: Mutex::new(conn),
        })
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(|e| Error::connection("duckdb", e))?;
        Ok(Self {
            name: "memory".to_string(),
            conn: Mutex::new(conn),
        })
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| Error::connection(self.name.as_str(), e))
    }

    /// Run one or more statements that return no rows
    pub fn execute_batch(&self, sql: &str) -> Result<()> {
        log::debug!("DuckDB: {}", sql);
        self.lock()?
            .execute_batch(sql)
            .map_err(|e| Error::statement(self.name.as_str(), e))
    }

    /// Base tables of the main schema, sorted by name
    pub fn tables(&self) -> Result<Vec<String>> {
        let conn = self.lock()?;
        let mut stmt = conn
            .prepare(
                "SELECT table_name FROM information_schema.tables \
                 WHERE table_schema = current_schema() AND table_type = 'BASE TABLE' \
                 ORDER BY table_name",
            )
            .map_err(|e| Error::statement(self.name.as_str(), e))?;
        let names = stmt
            .query_map([], |row| row.get::<_, String>(0))
            .and_then(|rows| rows.collect::<std::result::Result<Vec<_>, _>>())
            .map_err(|e| Error::statement(self.name.as_str(), e))?;
        Ok(names)
    }

    /// Replace a table with the rows of a CSV file
    pub fn import_csv(&self, import: &CsvImport) -> Result<u64> {
        validate_table_name(&import.table)?;
        if !import.file.exists() {
            return Err(Error::NotFound(import.file.display().to_string()));
        }

        self.execute_batch(&format!(
            "CREATE OR REPLACE TABLE {} AS SELECT {} FROM {}",
            quote_ident(&import.table),
            import.projection,
            read_csv_sql(&import.file)
        ))?;
        self.count_rows(&import.table)
    }

    /// Convert a CSV file to a snappy-compressed parquet file
    pub fn copy_csv_to_parquet(&self, csv: &Path, parquet: &Path) -> Result<()> {
        if !csv.exists() {
            return Err(Error::NotFound(csv.display().to_string()));
        }
        self.execute_batch(&format!(
            "COPY (SELECT * FROM {}) TO {} (FORMAT PARQUET, COMPRESSION SNAPPY)",
            read_csv_sql(csv),
            quote_literal(&parquet.display().to_string())
        ))
    }

    /// Encode a whole table as snappy-compressed parquet
    pub fn export_parquet(&self, table: &str) -> Result<Bytes> {
        validate_table_name(table)?;

        // Removed on drop, whatever the outcome
        let dir = tempfile::tempdir()?;
        let path = dir.path().join(format!("{}.parquet", table));
        self.execute_batch(&format!(
            "COPY {} TO {} (FORMAT PARQUET, COMPRESSION SNAPPY)",
            quote_ident(table),
            quote_literal(&path.display().to_string())
        ))?;
        Ok(Bytes::from(std::fs::read(&path)?))
    }

    fn count_rows(&self, table: &str) -> Result<u64> {
        let conn = self.lock()?;
        let count: i64 = conn
            .query_row(
                &format!("SELECT count(*) FROM {}", quote_ident(table)),
                [],
                |row| row.get(0),
            )
            .map_err(|e| Error::statement(self.name.as_str(), e))?;
        Ok(count.max(0) as u64)
    }
}

fn to_duckdb_value(cell: CellValue) -> Value {
    match cell {
        CellValue::Null => Value::Null,
        CellValue::Integer(v) => Value::BigInt(v),
        CellValue::Float(v) => Value::Double(v),
        CellValue::Text(v) => Value::Text(v),
        CellValue::Timestamp(ts) => {
            Value::Timestamp(TimeUnit::Microsecond, ts.and_utc().timestamp_micros())
        }
    }
}

#[async_trait]
impl Warehouse for DuckDbWarehouse {
    fn name(&self) -> &str {
        &self.name
    }

    async fn create_table(&self, schema: &TableSchema) -> Result<()> {
        self.execute_batch(&schema.create_sql(Dialect::DuckDb))
    }

    async fn columns(&self, table: &str) -> Result<Vec<String>> {
        let conn = self.lock()?;
        let mut stmt = conn
            .prepare(
                "SELECT column_name FROM information_schema.columns \
                 WHERE table_schema = current_schema() AND table_name = ? \
                 ORDER BY ordinal_position",
            )
            .map_err(|e| Error::statement(self.name.as_str(), e))?;
        let columns = stmt
            .query_map(params![table], |row| row.get::<_, String>(0))
            .and_then(|rows| rows.collect::<std::result::Result<Vec<_>, _>>())
            .map_err(|e| Error::statement(self.name.as_str(), e))?;
        Ok(columns)
    }

    async fn append(&self, schema: &TableSchema, rows: Vec<Vec<CellValue>>) -> Result<usize> {
        let conn = self.lock()?;
        let mut appender = conn
            .appender(schema.name)
            .map_err(|e| Error::statement(self.name.as_str(), e))?;

        let mut count = 0;
        for row in rows {
            appender
                .append_row(appender_params_from_iter(row.into_iter().map(to_duckdb_value)))
                .map_err(|e| Error::statement(self.name.as_str(), e))?;
            count += 1;
        }
        appender
            .flush()
            .map_err(|e| Error::statement(self.name.as_str(), e))?;
        Ok(count)
    }

    async fn row_count(&self, table: &str) -> Result<u64> {
        self.count_rows(table)
    }
}

/// Export seeded tables as parquet objects for staging
pub struct DuckDbTableExtractor {
    warehouse: Arc<DuckDbWarehouse>,
    tables: Option<Vec<String>>,
}

impl DuckDbTableExtractor {
    /// Export every base table
    pub fn new(warehouse: Arc<DuckDbWarehouse>) -> Self {
        Self {
            warehouse,
            tables: None,
        }
    }

    /// Export only the named tables
    pub fn with_tables(mut self, tables: Vec<String>) -> Result<Self> {
        for table in &tables {
            validate_table_name(table)?;
        }
        self.tables = Some(tables);
        Ok(self)
    }
}

impl Extractor for DuckDbTableExtractor {
    type Item = ParquetObject;

    async fn extract(&self) -> Result<Vec<ParquetObject>> {
        let tables = match &self.tables {
            Some(tables) => tables.clone(),
            None => self.warehouse.tables()?,
        };

        let mut objects = Vec::with_capacity(tables.len());
        for table in tables {
            let body = self.warehouse.export_parquet(&table)?;
            log::debug!("Exported {} ({} bytes)", table, body.len());
            objects.push(ParquetObject { table, body });
        }
        Ok(objects)
    }
}
