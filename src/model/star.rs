//! Dimension and fact rows of the e-commerce star schema

use super::record::{CellValue, Record};
use chrono::NaiveDateTime;

#[derive(Debug, Clone, PartialEq)]
pub struct DimCustomer {
    pub customer_id: String,
    pub customer_zip_code_prefix: i64,
    pub customer_city: String,
    pub customer_state: String,
    pub customer_name: String,
}

impl Record for DimCustomer {
    const COLUMNS: &'static [&'static str] = &[
        "customer_id",
        "customer_zip_code_prefix",
        "customer_city",
        "customer_state",
        "customer_name",
    ];

    fn values(&self) -> Vec<CellValue> {
        vec![
            self.customer_id.as_str().into(),
            self.customer_zip_code_prefix.into(),
            self.customer_city.as_str().into(),
            self.customer_state.as_str().into(),
            self.customer_name.as_str().into(),
        ]
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DimSeller {
    pub seller_id: String,
    pub seller_zip_code_prefix: i64,
    pub seller_city: String,
    pub seller_state: String,
    pub seller_name: String,
}

impl Record for DimSeller {
    const COLUMNS: &'static [&'static str] = &[
        "seller_id",
        "seller_zip_code_prefix",
        "seller_city",
        "seller_state",
        "seller_name",
    ];

    fn values(&self) -> Vec<CellValue> {
        vec![
            self.seller_id.as_str().into(),
            self.seller_zip_code_prefix.into(),
            self.seller_city.as_str().into(),
            self.seller_state.as_str().into(),
            self.seller_name.as_str().into(),
        ]
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DimProduct {
    pub product_id: String,
    pub product_category_name: String,
    pub product_name_length: Option<i64>,
    pub product_description_length: Option<i64>,
    pub product_photos_qty: Option<i64>,
    pub product_weight_g: Option<i64>,
    pub product_length_cm: Option<i64>,
    pub product_height_cm: Option<i64>,
    pub product_width_cm: Option<i64>,
    pub product_name: String,
}

impl Record for DimProduct {
    const COLUMNS: &'static [&'static str] = &[
        "product_id",
        "product_category_name",
        "product_name_length",
        "product_description_length",
        "product_photos_qty",
        "product_weight_g",
        "product_length_cm",
        "product_height_cm",
        "product_width_cm",
        "product_name",
    ];

    fn values(&self) -> Vec<CellValue> {
        vec![
            self.product_id.as_str().into(),
            self.product_category_name.as_str().into(),
            self.product_name_length.into(),
            self.product_description_length.into(),
            self.product_photos_qty.into(),
            self.product_weight_g.into(),
            self.product_length_cm.into(),
            self.product_height_cm.into(),
            self.product_width_cm.into(),
            self.product_name.as_str().into(),
        ]
    }
}

/// One calendar day of the date dimension
#[derive(Debug, Clone, PartialEq)]
pub struct DimDate {
    pub date: NaiveDateTime,
    pub quarter: u32,
    pub month: u32,
    pub year: i32,
    pub week_by_year: u32,
    pub day: u32,
    /// Monday is 0
    pub weekday: u32,
    pub weekday_name: String,
}

impl Record for DimDate {
    const COLUMNS: &'static [&'static str] = &[
        "date",
        "quarter",
        "month",
        "year",
        "week_by_year",
        "day",
        "weekday",
        "weekday_name",
    ];

    fn values(&self) -> Vec<CellValue> {
        vec![
            self.date.into(),
            self.quarter.into(),
            self.month.into(),
            self.year.into(),
            self.week_by_year.into(),
            self.day.into(),
            self.weekday.into(),
            self.weekday_name.as_str().into(),
        ]
    }
}

/// One order item joined with its order and latest review
#[derive(Debug, Clone, PartialEq)]
pub struct FactOrder {
    pub order_id: String,
    pub order_item_id: i64,
    pub product_id: String,
    pub seller_id: String,
    pub shipping_limit_date: NaiveDateTime,
    pub price: f64,
    pub freight_value: f64,
    pub total_price: i64,
    pub customer_id: Option<String>,
    pub order_status: Option<String>,
    pub order_purchase_timestamp: Option<NaiveDateTime>,
    pub order_approved_at: Option<NaiveDateTime>,
    pub order_delivered_carrier_date: Option<NaiveDateTime>,
    pub order_delivered_customer_date: Option<NaiveDateTime>,
    pub order_estimated_delivery_date: Option<NaiveDateTime>,
    pub order_rating: Option<f64>,
}

impl Record for FactOrder {
    const COLUMNS: &'static [&'static str] = &[
        "order_id",
        "order_item_id",
        "product_id",
        "seller_id",
        "shipping_limit_date",
        "price",
        "freight_value",
        "total_price",
        "customer_id",
        "order_status",
        "order_purchase_timestamp",
        "order_approved_at",
        "order_delivered_carrier_date",
        "order_delivered_customer_date",
        "order_estimated_delivery_date",
        "order_rating",
    ];

    fn values(&self) -> Vec<CellValue> {
        vec![
            self.order_id.as_str().into(),
            self.order_item_id.into(),
            self.product_id.as_str().into(),
            self.seller_id.as_str().into(),
            self.shipping_limit_date.into(),
            self.price.into(),
            self.freight_value.into(),
            self.total_price.into(),
            self.customer_id.clone().into(),
            self.order_status.clone().into(),
            self.order_purchase_timestamp.into(),
            self.order_approved_at.into(),
            self.order_delivered_carrier_date.into(),
            self.order_delivered_customer_date.into(),
            self.order_estimated_delivery_date.into(),
            self.order_rating.into(),
        ]
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FactPayment {
    pub order_id: String,
    pub payment_sequential: i64,
    pub payment_type: String,
    pub payment_installments: i64,
    pub payment_value: f64,
}

impl Record for FactPayment {
    const COLUMNS: &'static [&'static str] = &[
        "order_id",
        "payment_sequential",
        "payment_type",
        "payment_installments",
        "payment_value",
    ];

    fn values(&self) -> Vec<CellValue> {
        vec![
            self.order_id.as_str().into(),
            self.payment_sequential.into(),
            self.payment_type.as_str().into(),
            self.payment_installments.into(),
            self.payment_value.into(),
        ]
    }
}

/// Output of the star-schema transform, ready for loading
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StarSchema {
    pub customers: Vec<DimCustomer>,
    pub sellers: Vec<DimSeller>,
    pub products: Vec<DimProduct>,
    pub dates: Vec<DimDate>,
    pub orders: Vec<FactOrder>,
    pub payments: Vec<FactPayment>,
}

impl StarSchema {
    pub fn total_rows(&self) -> usize {
        self.customers.len()
            + self.sellers.len()
            + self.products.len()
            + self.dates.len()
            + self.orders.len()
            + self.payments.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_arity<R: Record>(row: &R) {
        assert_eq!(row.values().len(), R::COLUMNS.len());
    }

    #[test]
    fn test_values_match_columns() {
        let ts = chrono::NaiveDate::from_ymd_opt(2017, 9, 19)
            .unwrap()
            .and_hms_opt(9, 45, 35)
            .unwrap();
        assert_arity(&DimCustomer {
            customer_id: "a".into(),
            customer_zip_code_prefix: 14409,
            customer_city: "franca".into(),
            customer_state: "SP".into(),
            customer_name: "Customer_1".into(),
        });
        assert_arity(&FactOrder {
            order_id: "o".into(),
            order_item_id: 1,
            product_id: "p".into(),
            seller_id: "s".into(),
            shipping_limit_date: ts,
            price: 58.9,
            freight_value: 13.29,
            total_price: 72,
            customer_id: None,
            order_status: None,
            order_purchase_timestamp: None,
            order_approved_at: None,
            order_delivered_carrier_date: None,
            order_delivered_customer_date: None,
            order_estimated_delivery_date: None,
            order_rating: None,
        });
        assert_arity(&FactPayment {
            order_id: "o".into(),
            payment_sequential: 1,
            payment_type: "credit_card".into(),
            payment_installments: 8,
            payment_value: 99.33,
        });
    }
}
