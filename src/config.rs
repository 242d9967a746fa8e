//! Settings read from the process environment
//!
//! Every setting is looked up through a `lookup(key)` function so the
//! parsing can be tested without touching process state. Blank values
//! count as unset.

use crate::warehouse::{SnowflakeConfig, TokenType};
use crate::{Error, Result};
use chrono::NaiveDate;
use std::path::PathBuf;

pub const DEFAULT_DATA_DIR: &str = "Dataset/Data";
pub const DEFAULT_RAW_DATA_DIR: &str = "Dataset/Raw-Dataset/E-Commerce";
pub const DEFAULT_DUCKDB_PATH: &str = "olist_ecommerce.duckdb";
pub const DEFAULT_AWS_REGION: &str = "us-east-1";
pub const DEFAULT_S3_PREFIX: &str = "Data";
pub const DEFAULT_BATCH_ROWS: usize = 5000;

/// Object storage location of the staged raw tables
#[derive(Debug, Clone, PartialEq)]
pub struct S3Settings {
    pub bucket: String,
    pub region: String,
    /// Custom endpoint, e.g. MinIO; enables path-style addressing
    pub endpoint: Option<String>,
    pub prefix: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    /// Local parquet files
    pub data_dir: PathBuf,
    /// Raw CSV files
    pub raw_data_dir: PathBuf,
    pub duckdb_path: PathBuf,
    pub date_start: NaiveDate,
    pub date_end: NaiveDate,
    s3: Option<S3Settings>,
    snowflake: std::result::Result<SnowflakeConfig, Vec<&'static str>>,
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn parse_date(key: &str, value: Option<String>, default: NaiveDate) -> Result<NaiveDate> {
    match value {
        None => Ok(default),
        Some(v) => NaiveDate::parse_from_str(&v, "%Y-%m-%d")
            .map_err(|e| Error::Config(format!("{} must be a YYYY-MM-DD date, got '{}': {}", key, v, e))),
    }
}

impl Settings {
    /// Read settings from the process environment
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| non_blank(lookup(key));

        let date_start = parse_date(
            "DATE_DIM_START",
            get("DATE_DIM_START"),
            NaiveDate::from_ymd_opt(2016, 1, 1).unwrap_or_default(),
        )?;
        let date_end = parse_date(
            "DATE_DIM_END",
            get("DATE_DIM_END"),
            NaiveDate::from_ymd_opt(2018, 12, 31).unwrap_or_default(),
        )?;
        if date_start > date_end {
            return Err(Error::Config(format!(
                "DATE_DIM_START ({}) is after DATE_DIM_END ({})",
                date_start, date_end
            )));
        }

        let s3 = get("BUCKET_NAME").map(|bucket| S3Settings {
            bucket,
            region: get("AWS_REGION").unwrap_or_else(|| DEFAULT_AWS_REGION.to_string()),
            endpoint: get("S3_ENDPOINT"),
            prefix: get("S3_PREFIX").unwrap_or_else(|| DEFAULT_S3_PREFIX.to_string()),
        });

        Ok(Self {
            data_dir: get("DATA_DIR")
                .unwrap_or_else(|| DEFAULT_DATA_DIR.to_string())
                .into(),
            raw_data_dir: get("RAW_DATA_DIR")
                .unwrap_or_else(|| DEFAULT_RAW_DATA_DIR.to_string())
                .into(),
            duckdb_path: get("DUCKDB_PATH")
                .unwrap_or_else(|| DEFAULT_DUCKDB_PATH.to_string())
                .into(),
            date_start,
            date_end,
            s3,
            snowflake: Self::snowflake_from(&get)?,
        })
    }

    /// Snowflake settings, or the list of missing required keys
    fn snowflake_from<G>(get: &G) -> Result<std::result::Result<SnowflakeConfig, Vec<&'static str>>>
    where
        G: Fn(&str) -> Option<String>,
    {
        const REQUIRED: [&str; 5] = [
            "SNOWFLAKE_ACCOUNT",
            "SNOWFLAKE_TOKEN",
            "SNOWFLAKE_WAREHOUSE",
            "SNOWFLAKE_DATABASE",
            "SNOWFLAKE_SCHEMA",
        ];
        let missing: Vec<&'static str> = REQUIRED.into_iter().filter(|k| get(*k).is_none()).collect();
        if !missing.is_empty() {
            return Ok(Err(missing));
        }

        let token_type = match get("SNOWFLAKE_TOKEN_TYPE") {
            Some(v) => v.parse::<TokenType>()?,
            None => TokenType::default(),
        };
        let batch_rows = match get("SNOWFLAKE_BATCH_ROWS") {
            Some(v) => v
                .parse::<usize>()
                .ok()
                .filter(|n| *n > 0)
                .ok_or_else(|| {
                    Error::Config(format!("SNOWFLAKE_BATCH_ROWS must be a positive integer, got '{}'", v))
                })?,
            None => DEFAULT_BATCH_ROWS,
        };

        Ok(Ok(SnowflakeConfig {
            account: get("SNOWFLAKE_ACCOUNT").unwrap_or_default(),
            token: get("SNOWFLAKE_TOKEN").unwrap_or_default(),
            token_type,
            warehouse: get("SNOWFLAKE_WAREHOUSE").unwrap_or_default(),
            database: get("SNOWFLAKE_DATABASE").unwrap_or_default(),
            schema: get("SNOWFLAKE_SCHEMA").unwrap_or_default(),
            role: get("SNOWFLAKE_ROLE"),
            batch_rows,
        }))
    }

    /// S3 settings; `BUCKET_NAME` is required
    pub fn s3(&self) -> Result<&S3Settings> {
        self.s3
            .as_ref()
            .ok_or_else(|| Error::Config("Missing required setting(s): BUCKET_NAME".to_string()))
    }

    /// Snowflake settings; all missing keys are reported together
    pub fn snowflake(&self) -> Result<&SnowflakeConfig> {
        self.snowflake.as_ref().map_err(|missing| {
            Error::Config(format!("Missing required setting(s): {}", missing.join(", ")))
        })
    }
}
