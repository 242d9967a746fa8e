//! Declared schemas of the star-schema target tables

use super::record::{ColumnDef, ColumnType::*, TableSchema};

pub const FACT_ORDERS: TableSchema = TableSchema {
    name: "FACT_ORDERS",
    columns: &[
        ColumnDef::new("order_id", Uuid),
        ColumnDef::new("order_item_id", Integer),
        ColumnDef::new("product_id", Uuid),
        ColumnDef::new("seller_id", Uuid),
        ColumnDef::new("shipping_limit_date", Timestamp),
        ColumnDef::new("price", Float),
        ColumnDef::new("freight_value", Float),
        ColumnDef::new("total_price", Integer),
        ColumnDef::new("customer_id", Uuid),
        ColumnDef::new("order_status", Text(50)),
        ColumnDef::new("order_purchase_timestamp", Timestamp),
        ColumnDef::new("order_approved_at", Timestamp),
        ColumnDef::new("order_delivered_carrier_date", Timestamp),
        ColumnDef::new("order_delivered_customer_date", Timestamp),
        ColumnDef::new("order_estimated_delivery_date", Timestamp),
        ColumnDef::new("order_rating", Float),
    ],
};

pub const FACT_PAYMENTS: TableSchema = TableSchema {
    name: "FACT_PAYMENTS",
    columns: &[
        ColumnDef::new("order_id", Uuid),
        ColumnDef::new("payment_sequential", Integer),
        ColumnDef::new("payment_type", Text(50)),
        ColumnDef::new("payment_installments", Integer),
        ColumnDef::new("payment_value", Float),
    ],
};

pub const DIM_CUSTOMERS: TableSchema = TableSchema {
    name: "DIM_CUSTOMERS",
    columns: &[
        ColumnDef::new("customer_id", Uuid),
        ColumnDef::new("customer_zip_code_prefix", Integer),
        ColumnDef::new("customer_city", Text(50)),
        ColumnDef::new("customer_state", Text(50)),
        ColumnDef::new("customer_name", Text(20)),
    ],
};

pub const DIM_SELLERS: TableSchema = TableSchema {
    name: "DIM_SELLERS",
    columns: &[
        ColumnDef::new("seller_id", Uuid),
        ColumnDef::new("seller_zip_code_prefix", Integer),
        ColumnDef::new("seller_city", Text(50)),
        ColumnDef::new("seller_state", Text(50)),
        ColumnDef::new("seller_name", Text(20)),
    ],
};

pub const DIM_PRODUCTS: TableSchema = TableSchema {
    name: "DIM_PRODUCTS",
    columns: &[
        ColumnDef::new("product_id", Uuid),
        ColumnDef::new("product_category_name", Text(50)),
        ColumnDef::new("product_name_length", Integer),
        ColumnDef::new("product_description_length", Integer),
        ColumnDef::new("product_photos_qty", Integer),
        ColumnDef::new("product_weight_g", Integer),
        ColumnDef::new("product_length_cm", Integer),
        ColumnDef::new("product_height_cm", Integer),
        ColumnDef::new("product_width_cm", Integer),
        ColumnDef::new("product_name", Text(20)),
    ],
};

pub const DIM_DATES: TableSchema = TableSchema {
    name: "DIM_DATES",
    columns: &[
        ColumnDef::new("date", Timestamp),
        ColumnDef::new("quarter", Integer),
        ColumnDef::new("month", Integer),
        ColumnDef::new("year", Integer),
        ColumnDef::new("week_by_year", Integer),
        ColumnDef::new("day", Integer),
        ColumnDef::new("weekday", Integer),
        ColumnDef::new("weekday_name", Text(50)),
    ],
};

/// Load order of the star schema: facts first, then dimensions
pub const STAR_SCHEMA: [TableSchema; 6] = [
    FACT_ORDERS,
    FACT_PAYMENTS,
    DIM_CUSTOMERS,
    DIM_SELLERS,
    DIM_PRODUCTS,
    DIM_DATES,
];
