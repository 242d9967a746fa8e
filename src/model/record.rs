//! Column, schema and cell primitives shared by transformers and loaders

use chrono::NaiveDateTime;

/// SQL dialect a schema is rendered for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dialect {
    DuckDb,
    Snowflake,
}

/// Storage type of a target column
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnType {
    /// Canonical hyphenated UUID stored as text
    Uuid,
    /// Variable-length text with a maximum length
    Text(u32),
    Integer,
    Float,
    /// UTC timestamp with second precision
    Timestamp,
}

impl ColumnType {
    pub fn sql_type(&self, dialect: Dialect) -> String {
        match (self, dialect) {
            (ColumnType::Uuid, _) => "VARCHAR(50)".to_string(),
            (ColumnType::Text(len), _) => format!("VARCHAR({len})"),
            (ColumnType::Integer, Dialect::DuckDb) => "BIGINT".to_string(),
            (ColumnType::Integer, Dialect::Snowflake) => "INT".to_string(),
            (ColumnType::Float, Dialect::DuckDb) => "DOUBLE".to_string(),
            (ColumnType::Float, Dialect::Snowflake) => "FLOAT".to_string(),
            (ColumnType::Timestamp, Dialect::DuckDb) => "TIMESTAMP".to_string(),
            (ColumnType::Timestamp, Dialect::Snowflake) => "TIMESTAMP_TZ(0)".to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnDef {
    pub name: &'static str,
    pub ty: ColumnType,
}

impl ColumnDef {
    pub const fn new(name: &'static str, ty: ColumnType) -> Self {
        Self { name, ty }
    }
}

/// Static column-to-type mapping for one target table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TableSchema {
    pub name: &'static str,
    pub columns: &'static [ColumnDef],
}

impl TableSchema {
    pub fn column_names(&self) -> Vec<&'static str> {
        self.columns.iter().map(|c| c.name).collect()
    }

    /// Idempotent `CREATE TABLE IF NOT EXISTS` statement
    pub fn create_sql(&self, dialect: Dialect) -> String {
        let columns = self
            .columns
            .iter()
            .map(|c| format!("    {} {}", quote_ident(c.name), c.ty.sql_type(dialect)))
            .collect::<Vec<_>>()
            .join(",\n");
        format!(
            "CREATE TABLE IF NOT EXISTS {}(\n{}\n)",
            quote_ident(self.name),
            columns
        )
    }

    /// Parameterized single-row `INSERT` with one `?` per column
    pub fn insert_sql(&self) -> String {
        let columns = self
            .columns
            .iter()
            .map(|c| quote_ident(c.name))
            .collect::<Vec<_>>()
            .join(", ");
        let params = vec!["?"; self.columns.len()].join(", ");
        format!(
            "INSERT INTO {} ({}) VALUES ({})",
            quote_ident(self.name),
            columns,
            params
        )
    }
}

pub(crate) fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// A single typed cell handed to a loader
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    Null,
    Integer(i64),
    Float(f64),
    Text(String),
    Timestamp(NaiveDateTime),
}

impl From<i64> for CellValue {
    fn from(value: i64) -> Self {
        CellValue::Integer(value)
    }
}

impl From<i32> for CellValue {
    fn from(value: i32) -> Self {
        CellValue::Integer(value.into())
    }
}

impl From<u32> for CellValue {
    fn from(value: u32) -> Self {
        CellValue::Integer(value.into())
    }
}

impl From<f64> for CellValue {
    fn from(value: f64) -> Self {
        CellValue::Float(value)
    }
}

impl From<String> for CellValue {
    fn from(value: String) -> Self {
        CellValue::Text(value)
    }
}

impl From<&str> for CellValue {
    fn from(value: &str) -> Self {
        CellValue::Text(value.to_string())
    }
}

impl From<NaiveDateTime> for CellValue {
    fn from(value: NaiveDateTime) -> Self {
        CellValue::Timestamp(value)
    }
}

impl<T: Into<CellValue>> From<Option<T>> for CellValue {
    fn from(value: Option<T>) -> Self {
        value.map_or(CellValue::Null, Into::into)
    }
}

/// A row type that can be written to a table
///
/// `COLUMNS` is the ordered column list the row produces; `values` must
/// return one cell per column in the same order.
pub trait Record: Send + Sync + 'static {
    const COLUMNS: &'static [&'static str];

    fn values(&self) -> Vec<CellValue>;
}
