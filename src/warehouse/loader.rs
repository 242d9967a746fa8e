//! Loaders that write typed rows into a warehouse

use super::{Warehouse, ensure_table};
use crate::etl::Loader;
use crate::model::catalog::{
    DIM_CUSTOMERS, DIM_DATES, DIM_PRODUCTS, DIM_SELLERS, FACT_ORDERS, FACT_PAYMENTS,
};
use crate::model::{Record, StarSchema, TableSchema};
use crate::{Error, Result};
use async_trait::async_trait;
use std::marker::PhantomData;
use std::sync::Arc;

/// Load rows of one record type into one declared table
pub struct TableLoader<R, W: ?Sized> {
    warehouse: Arc<W>,
    schema: TableSchema,
    _record: PhantomData<fn(R)>,
}

impl<R: Record, W: Warehouse + ?Sized> TableLoader<R, W> {
    /// Pair a record type with a table schema
    ///
    /// Fails with `SchemaMismatch` if the record's columns differ from
    /// the declared ones.
    pub fn new(warehouse: Arc<W>, schema: TableSchema) -> Result<Self> {
        if R::COLUMNS != schema.column_names().as_slice() {
            return Err(Error::SchemaMismatch {
                table: schema.name.to_string(),
                expected: schema.column_names().into_iter().map(str::to_string).collect(),
                found: R::COLUMNS.iter().map(|c| c.to_string()).collect(),
            });
        }
        Ok(Self {
            warehouse,
            schema,
            _record: PhantomData,
        })
    }
}

#[async_trait]
impl<R: Record, W: Warehouse + ?Sized> Loader for TableLoader<R, W> {
    type Item = R;

    async fn load(&self, items: Vec<R>) -> Result<usize> {
        ensure_table(self.warehouse.as_ref(), &self.schema).await?;

        let rows: Vec<_> = items.iter().map(Record::values).collect();
        let count = self.warehouse.append(&self.schema, rows).await?;
        log::info!(
            "Loaded {} row(s) into {}.{}",
            count,
            self.warehouse.name(),
            self.schema.name
        );
        Ok(count)
    }
}

/// Load every table of a [`StarSchema`], facts first
pub struct StarSchemaLoader<W: ?Sized> {
    warehouse: Arc<W>,
}

impl<W: Warehouse + ?Sized> StarSchemaLoader<W> {
    pub fn new(warehouse: Arc<W>) -> Self {
        Self { warehouse }
    }

    async fn table<R: Record>(&self, schema: TableSchema, rows: Vec<R>) -> Result<usize> {
        TableLoader::<R, W>::new(Arc::clone(&self.warehouse), schema)?
            .load(rows)
            .await
    }

    pub async fn load_schema(&self, schema: StarSchema) -> Result<usize> {
        let mut total = 0;
        total += self.table(FACT_ORDERS, schema.orders).await?;
        total += self.table(FACT_PAYMENTS, schema.payments).await?;
        total += self.table(DIM_CUSTOMERS, schema.customers).await?;
        total += self.table(DIM_SELLERS, schema.sellers).await?;
        total += self.table(DIM_PRODUCTS, schema.products).await?;
        total += self.table(DIM_DATES, schema.dates).await?;
        Ok(total)
    }
}

#[async_trait]
impl<W: Warehouse + ?Sized> Loader for StarSchemaLoader<W> {
    type Item = StarSchema;

    async fn load(&self, items: Vec<StarSchema>) -> Result<usize> {
        let mut total = 0;
        for schema in items {
            total += self.load_schema(schema).await?;
        }
        Ok(total)
    }
}
