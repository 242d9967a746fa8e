//! Raw Olist source rows
//!
//! Field names follow the source columns. Identifier and timestamp columns
//! stay as untrusted strings until the transformer normalizes them.

use serde::de::{self, Deserializer, Visitor};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawCustomer {
    pub customer_id: String,
    pub customer_unique_id: String,
    pub customer_zip_code_prefix: i64,
    pub customer_city: String,
    pub customer_state: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawOrderItem {
    pub order_id: String,
    // Staged database tables carry the sequence number as `quantity`
    #[serde(alias = "quantity")]
    pub order_item_id: i64,
    pub product_id: String,
    pub seller_id: String,
    pub shipping_limit_date: String,
    pub price: f64,
    pub freight_value: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawOrderPayment {
    pub order_id: String,
    pub payment_sequential: i64,
    pub payment_type: String,
    pub payment_installments: i64,
    pub payment_value: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawOrderReview {
    pub review_id: String,
    pub order_id: String,
    pub review_score: i64,
    #[serde(default)]
    pub review_comment_title: Option<String>,
    #[serde(default)]
    pub review_comment_message: Option<String>,
    pub review_creation_date: String,
    #[serde(default)]
    pub review_answer_timestamp: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawOrder {
    pub order_id: String,
    pub customer_id: String,
    pub order_status: String,
    pub order_purchase_timestamp: String,
    #[serde(default)]
    pub order_approved_at: Option<String>,
    #[serde(default)]
    pub order_delivered_carrier_date: Option<String>,
    #[serde(default)]
    pub order_delivered_customer_date: Option<String>,
    pub order_estimated_delivery_date: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawProductCategory {
    pub product_category_name: String,
    pub product_category_name_english: String,
}

/// Product measurements contain nulls. Extracts written by pandas store
/// them as doubles, DuckDB CSV conversion as integers; both decode.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawProduct {
    pub product_id: String,
    #[serde(default)]
    pub product_category_name: Option<String>,
    #[serde(
        rename = "product_name_lenght",
        alias = "product_name_length",
        default,
        deserialize_with = "measure"
    )]
    pub product_name_length: Option<f64>,
    #[serde(
        rename = "product_description_lenght",
        alias = "product_description_length",
        default,
        deserialize_with = "measure"
    )]
    pub product_description_length: Option<f64>,
    #[serde(default, deserialize_with = "measure")]
    pub product_photos_qty: Option<f64>,
    #[serde(default, deserialize_with = "measure")]
    pub product_weight_g: Option<f64>,
    #[serde(default, deserialize_with = "measure")]
    pub product_length_cm: Option<f64>,
    #[serde(default, deserialize_with = "measure")]
    pub product_height_cm: Option<f64>,
    #[serde(default, deserialize_with = "measure")]
    pub product_width_cm: Option<f64>,
}

/// A nullable measure stored as any integer or float column
fn measure<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Measure>::deserialize(deserializer)?.map(|m| m.0))
}

struct Measure(f64);

impl<'de> Deserialize<'de> for Measure {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_any(MeasureVisitor)
    }
}

struct MeasureVisitor;

impl Visitor<'_> for MeasureVisitor {
    type Value = Measure;

    fn expecting(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        f.write_str("an integer or floating point measure")
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<Measure, E> {
        Ok(Measure(v as f64))
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<Measure, E> {
        Ok(Measure(v as f64))
    }

    fn visit_f64<E: de::Error>(self, v: f64) -> Result<Measure, E> {
        Ok(Measure(v))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawSeller {
    pub seller_id: String,
    pub seller_zip_code_prefix: i64,
    pub seller_city: String,
    pub seller_state: String,
}

/// The source tables the star schema is built from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RawTable {
    Customers,
    OrderItems,
    OrderPayments,
    OrderReviews,
    Orders,
    ProductCategories,
    Products,
    Sellers,
}

impl RawTable {
    pub const ALL: [RawTable; 8] = [
        RawTable::Customers,
        RawTable::OrderItems,
        RawTable::OrderPayments,
        RawTable::OrderReviews,
        RawTable::Orders,
        RawTable::ProductCategories,
        RawTable::Products,
        RawTable::Sellers,
    ];

    /// Table name used in the staging database and object keys
    pub fn table_name(&self) -> &'static str {
        match self {
            RawTable::Customers => "customers",
            RawTable::OrderItems => "order_items",
            RawTable::OrderPayments => "order_payments",
            RawTable::OrderReviews => "order_reviews",
            RawTable::Orders => "orders",
            RawTable::ProductCategories => "product_categories",
            RawTable::Products => "products",
            RawTable::Sellers => "sellers",
        }
    }

    /// File name of the local parquet extract
    pub fn file_name(&self) -> &'static str {
        match self {
            RawTable::Customers => "olist_customers_dataset.parquet",
            RawTable::OrderItems => "olist_order_items_dataset.parquet",
            RawTable::OrderPayments => "olist_order_payments_dataset.parquet",
            RawTable::OrderReviews => "olist_order_reviews_dataset.parquet",
            RawTable::Orders => "olist_orders_dataset.parquet",
            RawTable::ProductCategories => "product_category_name_translation.parquet",
            RawTable::Products => "olist_products_dataset.parquet",
            RawTable::Sellers => "olist_sellers_dataset.parquet",
        }
    }

    /// Object key under the given prefix, e.g. `Data/customers.parquet`
    pub fn object_key(&self, prefix: &str) -> String {
        let prefix = prefix.trim_matches('/');
        if prefix.is_empty() {
            format!("{}.parquet", self.table_name())
        } else {
            format!("{}/{}.parquet", prefix, self.table_name())
        }
    }
}

impl std::fmt::Display for RawTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.table_name())
    }
}

/// All raw tables of one extraction
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawDataset {
    pub customers: Vec<RawCustomer>,
    pub order_items: Vec<RawOrderItem>,
    pub order_payments: Vec<RawOrderPayment>,
    pub order_reviews: Vec<RawOrderReview>,
    pub orders: Vec<RawOrder>,
    pub product_categories: Vec<RawProductCategory>,
    pub products: Vec<RawProduct>,
    pub sellers: Vec<RawSeller>,
}

impl RawDataset {
    pub fn row_count(&self, table: RawTable) -> usize {
        match table {
            RawTable::Customers => self.customers.len(),
            RawTable::OrderItems => self.order_items.len(),
            RawTable::OrderPayments => self.order_payments.len(),
            RawTable::OrderReviews => self.order_reviews.len(),
            RawTable::Orders => self.orders.len(),
            RawTable::ProductCategories => self.product_categories.len(),
            RawTable::Products => self.products.len(),
            RawTable::Sellers => self.sellers.len(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_object_key() {
        assert_eq!(
            RawTable::Customers.object_key("Data"),
            "Data/customers.parquet"
        );
        assert_eq!(
            RawTable::OrderItems.object_key("/staging/raw/"),
            "staging/raw/order_items.parquet"
        );
        assert_eq!(RawTable::Sellers.object_key(""), "sellers.parquet");
    }

    #[test]
    fn test_product_misspelled_columns() {
        let product: RawProduct = serde_json::from_value(serde_json::json!({
            "product_id": "1e9e8ef04dbcff4541ed26657ea517e5",
            "product_category_name": "perfumaria",
            "product_name_lenght": 40.0,
            "product_description_lenght": 287.0,
            "product_photos_qty": 1.0,
        }))
        .unwrap();
        assert_eq!(product.product_name_length, Some(40.0));
        assert_eq!(product.product_description_length, Some(287.0));
        assert_eq!(product.product_weight_g, None);
    }

    #[test]
    fn test_product_integer_measures() {
        let product: RawProduct = serde_json::from_value(serde_json::json!({
            "product_id": "1e9e8ef04dbcff4541ed26657ea517e5",
            "product_name_lenght": 40,
            "product_weight_g": null,
            "product_height_cm": 10,
        }))
        .unwrap();
        assert_eq!(product.product_name_length, Some(40.0));
        assert_eq!(product.product_weight_g, None);
        assert_eq!(product.product_height_cm, Some(10.0));

        let err = serde_json::from_value::<RawProduct>(serde_json::json!({
            "product_id": "1e9e8ef04dbcff4541ed26657ea517e5",
            "product_weight_g": "heavy",
        }));
        assert!(err.is_err());
    }

    #[test]
    fn test_order_item_quantity_alias() {
        let item: RawOrderItem = serde_json::from_value(serde_json::json!({
            "order_id": "00010242fe8c5a6d1ba2dd792cb16214",
            "quantity": 1,
            "order_items_id": 0,
            "product_id": "4244733e06e7ecb4970a6e2683c13e61",
            "seller_id": "48436dade18ac8b2bce089ec2a041202",
            "shipping_limit_date": "2017-09-19 09:45:35",
            "price": 58.9,
            "freight_value": 13.29,
        }))
        .unwrap();
        assert_eq!(item.order_item_id, 1);
    }

    #[test]
    fn test_every_table_has_distinct_file() {
        let files: std::collections::HashSet<_> =
            RawTable::ALL.iter().map(|t| t.file_name()).collect();
        assert_eq!(files.len(), RawTable::ALL.len());
    }
}
