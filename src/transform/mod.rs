//! Transformers that reshape raw rows into the star schema
//!
//! - `normalize`: canonical UUID, timestamp and measure values
//! - `dimension`: deduplicating dimension builder with surrogate keys
//! - `dates`: calendar date dimension
//! - `star_schema`: the Olist dimension/fact model

mod dates;
mod dimension;
mod normalize;
mod star_schema;

pub use dates::date_dimension;
pub use dimension::{Dimension, DimensionRow, KeepPolicy};
pub use normalize::{
    canonical_timestamp, format_timestamp, normalize_optional_uuid, normalize_uuid,
    parse_optional_timestamp, parse_timestamp, round_measure,
};
pub use star_schema::StarSchemaTransformer;
