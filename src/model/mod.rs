//! Typed rows for every table the tool reads or writes
//!
//! - `raw`: source tables exactly as extracted
//! - `star`: dimension and fact rows produced by the transformer
//! - `record`: the column/value view loaders use to write rows
//! - `catalog`: declared target table schemas

pub mod catalog;
mod raw;
mod record;
mod star;

pub use raw::{
    RawCustomer, RawDataset, RawOrder, RawOrderItem, RawOrderPayment, RawOrderReview, RawProduct,
    RawProductCategory, RawSeller, RawTable,
};
pub(crate) use record::quote_ident;
pub use record::{CellValue, ColumnDef, ColumnType, Dialect, Record, TableSchema};
pub use star::{
    DimCustomer, DimDate, DimProduct, DimSeller, FactOrder, FactPayment, StarSchema,
};
