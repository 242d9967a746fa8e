//! Olist star-schema transform
//!
//! Turns the eight raw source tables into four dimensions (customers,
//! sellers, products, dates) and two facts (order items, payments).

use super::dates::date_dimension;
use super::dimension::{Dimension, KeepPolicy};
use super::normalize::{normalize_uuid, parse_optional_timestamp, parse_timestamp, round_measure};
use crate::etl::Transformer;
use crate::model::{
    DimCustomer, DimProduct, DimSeller, FactOrder, FactPayment, RawDataset, RawOrder,
    RawOrderReview, StarSchema,
};
use crate::{Error, Result};
use chrono::{NaiveDate, NaiveDateTime};
use std::collections::HashMap;

const UNKNOWN_CATEGORY: &str = "unknown";

/// Transformer from a [`RawDataset`] to a [`StarSchema`]
///
/// Dimension keys are the canonical natural UUIDs; surrogate keys only
/// number the generated display names (`Customer_1`, `Seller_1`, ...).
#[derive(Debug, Clone)]
pub struct StarSchemaTransformer {
    date_start: NaiveDate,
    date_end: NaiveDate,
}

impl Default for StarSchemaTransformer {
    fn default() -> Self {
        Self {
            date_start: NaiveDate::from_ymd_opt(2016, 1, 1).unwrap_or_default(),
            date_end: NaiveDate::from_ymd_opt(2018, 12, 31).unwrap_or_default(),
        }
    }
}

/// Per-order attributes joined onto each order item
#[derive(Debug, Clone)]
struct OrderInfo {
    customer_id: Option<String>,
    status: String,
    purchased_at: NaiveDateTime,
    approved_at: Option<NaiveDateTime>,
    delivered_carrier_at: Option<NaiveDateTime>,
    delivered_customer_at: Option<NaiveDateTime>,
    estimated_delivery_at: NaiveDateTime,
}

impl StarSchemaTransformer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the inclusive calendar range of the date dimension
    pub fn with_date_range(mut self, start: NaiveDate, end: NaiveDate) -> Self {
        self.date_start = start;
        self.date_end = end;
        self
    }

    /// Build the star schema from a complete raw extraction
    pub fn build(&self, raw: &RawDataset) -> Result<StarSchema> {
        let (customers, customer_map) = self.customers(raw)?;
        log::debug!("Built {} customer dimension row(s)", customers.len());

        let sellers = self.sellers(raw)?;
        log::debug!("Built {} seller dimension row(s)", sellers.len());

        let products = self.products(raw)?;
        log::debug!("Built {} product dimension row(s)", products.len());

        let orders = self.orders(&raw.orders, &customer_map)?;
        let ratings = self.latest_ratings(&raw.order_reviews)?;
        let fact_orders = self.fact_orders(raw, &orders, &ratings)?;
        log::debug!("Built {} order fact row(s)", fact_orders.len());

        let payments = self.payments(raw)?;
        log::debug!("Built {} payment fact row(s)", payments.len());

        let dates = date_dimension(self.date_start, self.date_end);
        log::debug!(
            "Built {} date dimension row(s) from {} to {}",
            dates.len(),
            self.date_start,
            self.date_end
        );

        Ok(StarSchema {
            customers,
            sellers,
            products,
            dates,
            orders: fact_orders,
            payments,
        })
    }

    /// Customer dimension keyed by `customer_unique_id`
    ///
    /// Also returns the per-order `customer_id` to `customer_unique_id`
    /// map used to rewrite order references.
    fn customers(&self, raw: &RawDataset) -> Result<(Vec<DimCustomer>, HashMap<String, String>)> {
        let mut customer_map = HashMap::with_capacity(raw.customers.len());
        for customer in &raw.customers {
            customer_map.insert(
                normalize_uuid(&customer.customer_id)?,
                normalize_uuid(&customer.customer_unique_id)?,
            );
        }

        let dimension = Dimension::try_build(
            &raw.customers,
            KeepPolicy::First,
            |c| normalize_uuid(&c.customer_unique_id),
            |c| {
                Ok::<_, Error>((
                    c.customer_zip_code_prefix,
                    c.customer_city.clone(),
                    c.customer_state.clone(),
                ))
            },
        )?;

        let rows = dimension
            .into_rows()
            .into_iter()
            .map(|row| {
                let (zip, city, state) = row.attributes;
                DimCustomer {
                    customer_id: row.natural_key,
                    customer_zip_code_prefix: zip,
                    customer_city: city,
                    customer_state: state,
                    customer_name: format!("Customer_{}", row.key),
                }
            })
            .collect();

        Ok((rows, customer_map))
    }

    fn sellers(&self, raw: &RawDataset) -> Result<Vec<DimSeller>> {
        let dimension = Dimension::try_build(
            &raw.sellers,
            KeepPolicy::First,
            |s| normalize_uuid(&s.seller_id),
            |s| {
                Ok::<_, Error>((
                    s.seller_zip_code_prefix,
                    s.seller_city.clone(),
                    s.seller_state.clone(),
                ))
            },
        )?;

        Ok(dimension
            .into_rows()
            .into_iter()
            .map(|row| {
                let (zip, city, state) = row.attributes;
                DimSeller {
                    seller_id: row.natural_key,
                    seller_zip_code_prefix: zip,
                    seller_city: city,
                    seller_state: state,
                    seller_name: format!("Seller_{}", row.key),
                }
            })
            .collect())
    }

    /// Product dimension with categories translated to English
    fn products(&self, raw: &RawDataset) -> Result<Vec<DimProduct>> {
        let translations: HashMap<&str, &str> = raw
            .product_categories
            .iter()
            .map(|c| {
                (
                    c.product_category_name.as_str(),
                    c.product_category_name_english.as_str(),
                )
            })
            .collect();

        let dimension = Dimension::try_build(
            &raw.products,
            KeepPolicy::First,
            |p| normalize_uuid(&p.product_id),
            |p| {
                let category = p
                    .product_category_name
                    .as_deref()
                    .and_then(|name| translations.get(name).copied())
                    .unwrap_or(UNKNOWN_CATEGORY)
                    .to_string();
                Ok::<_, Error>(DimProduct {
                    product_id: String::new(),
                    product_category_name: category,
                    product_name_length: round_measure(
                        "product_name_length",
                        p.product_name_length,
                    )?,
                    product_description_length: round_measure(
                        "product_description_length",
                        p.product_description_length,
                    )?,
                    product_photos_qty: round_measure("product_photos_qty", p.product_photos_qty)?,
                    product_weight_g: round_measure("product_weight_g", p.product_weight_g)?,
                    product_length_cm: round_measure("product_length_cm", p.product_length_cm)?,
                    product_height_cm: round_measure("product_height_cm", p.product_height_cm)?,
                    product_width_cm: round_measure("product_width_cm", p.product_width_cm)?,
                    product_name: String::new(),
                })
            },
        )?;

        Ok(dimension
            .into_rows()
            .into_iter()
            .map(|row| DimProduct {
                product_id: row.natural_key,
                product_name: format!("Product_{}", row.key),
                ..row.attributes
            })
            .collect())
    }

    /// Orders keyed by canonical order id, first occurrence wins
    fn orders(
        &self,
        orders: &[RawOrder],
        customer_map: &HashMap<String, String>,
    ) -> Result<Dimension<String, OrderInfo>> {
        Dimension::try_build(
            orders,
            KeepPolicy::First,
            |o| normalize_uuid(&o.order_id),
            |o| -> Result<OrderInfo> {
                let customer_id = normalize_uuid(&o.customer_id)?;
                Ok(OrderInfo {
                    customer_id: customer_map.get(&customer_id).cloned(),
                    status: o.order_status.clone(),
                    purchased_at: parse_timestamp(&o.order_purchase_timestamp)?,
                    approved_at: parse_optional_timestamp(o.order_approved_at.as_deref())?,
                    delivered_carrier_at: parse_optional_timestamp(
                        o.order_delivered_carrier_date.as_deref(),
                    )?,
                    delivered_customer_at: parse_optional_timestamp(
                        o.order_delivered_customer_date.as_deref(),
                    )?,
                    estimated_delivery_at: parse_timestamp(&o.order_estimated_delivery_date)?,
                })
            },
        )
    }

    /// Review score of the most recently created review of each order
    fn latest_ratings(&self, reviews: &[RawOrderReview]) -> Result<Dimension<String, f64>> {
        let mut dated = reviews
            .iter()
            .map(|r| -> Result<_> {
                normalize_uuid(&r.review_id)?;
                parse_optional_timestamp(r.review_answer_timestamp.as_deref())?;
                Ok((parse_timestamp(&r.review_creation_date)?, r))
            })
            .collect::<Result<Vec<_>>>()?;

        // Stable, so equal creation dates keep source order
        dated.sort_by_key(|(created, _)| *created);

        Dimension::try_build(
            dated,
            KeepPolicy::Last,
            |(_, r)| normalize_uuid(&r.order_id),
            |(_, r)| Ok(r.review_score as f64),
        )
    }

    fn fact_orders(
        &self,
        raw: &RawDataset,
        orders: &Dimension<String, OrderInfo>,
        ratings: &Dimension<String, f64>,
    ) -> Result<Vec<FactOrder>> {
        raw.order_items
            .iter()
            .map(|item| -> Result<FactOrder> {
                let order_id = normalize_uuid(&item.order_id)?;
                let order = orders.get(&order_id).map(|row| &row.attributes);
                let total = round_measure("total_price", Some(item.price + item.freight_value))?
                    .ok_or_else(|| {
                        Error::value(
                            "measure",
                            item.price.to_string(),
                            "total_price is not a number",
                        )
                    })?;

                Ok(FactOrder {
                    order_item_id: item.order_item_id,
                    product_id: normalize_uuid(&item.product_id)?,
                    seller_id: normalize_uuid(&item.seller_id)?,
                    shipping_limit_date: parse_timestamp(&item.shipping_limit_date)?,
                    price: item.price,
                    freight_value: item.freight_value,
                    total_price: total,
                    customer_id: order.and_then(|o| o.customer_id.clone()),
                    order_status: order.map(|o| o.status.clone()),
                    order_purchase_timestamp: order.map(|o| o.purchased_at),
                    order_approved_at: order.and_then(|o| o.approved_at),
                    order_delivered_carrier_date: order.and_then(|o| o.delivered_carrier_at),
                    order_delivered_customer_date: order.and_then(|o| o.delivered_customer_at),
                    order_estimated_delivery_date: order.map(|o| o.estimated_delivery_at),
                    order_rating: ratings.get(&order_id).map(|row| row.attributes),
                    order_id,
                })
            })
            .collect()
    }

    fn payments(&self, raw: &RawDataset) -> Result<Vec<FactPayment>> {
        raw.order_payments
            .iter()
            .map(|p| -> Result<FactPayment> {
                Ok(FactPayment {
                    order_id: normalize_uuid(&p.order_id)?,
                    payment_sequential: p.payment_sequential,
                    payment_type: p.payment_type.clone(),
                    payment_installments: p.payment_installments,
                    payment_value: p.payment_value,
                })
            })
            .collect()
    }
}

impl Transformer for StarSchemaTransformer {
    type Input = RawDataset;
    type Output = StarSchema;

    fn transform(&self, input: Self::Input) -> Result<Self::Output> {
        let schema = self.build(&input)?;
        log::info!(
            "Star schema ready: {} fact order(s), {} payment(s), {} customer(s), {} seller(s), {} product(s), {} date(s)",
            schema.orders.len(),
            schema.payments.len(),
            schema.customers.len(),
            schema.sellers.len(),
            schema.products.len(),
            schema.dates.len()
        );
        Ok(schema)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{
        RawCustomer, RawOrderItem, RawOrderPayment, RawProduct, RawProductCategory, RawSeller,
    };
    use std::collections::HashSet;

    const ORDER_A: &str = "e481f51cbdc54678b7cc49136f2d6af7";
    const ORDER_B: &str = "53cdb2fc8bc7dce0b6741e2150273451";
    const CUSTOMER_A: &str = "9ef432eb6251297304e76186b10a928d";
    const CUSTOMER_B: &str = "b0830fb4747a6c6d20dea0b8c802d7ef";
    const UNIQUE_1: &str = "7c396fd4830fd04220f754e42b4e5bff";
    const PRODUCT_1: &str = "87285b34884572647811a353c7ac498a";
    const PRODUCT_2: &str = "595fac2a385ac33a80bd5114aec74eb8";
    const SELLER_1: &str = "3504c0cb71d7fa48d967e0e4c94d59d9";

    fn dataset() -> RawDataset {
        RawDataset {
            customers: vec![
                RawCustomer {
                    customer_id: CUSTOMER_A.into(),
                    customer_unique_id: UNIQUE_1.into(),
                    customer_zip_code_prefix: 3149,
                    customer_city: "sao paulo".into(),
                    customer_state: "SP".into(),
                },
                // Same person, second order, moved city
                RawCustomer {
                    customer_id: CUSTOMER_B.into(),
                    customer_unique_id: UNIQUE_1.into(),
                    customer_zip_code_prefix: 47813,
                    customer_city: "barreiras".into(),
                    customer_state: "BA".into(),
                },
            ],
            order_items: vec![
                RawOrderItem {
                    order_id: ORDER_A.into(),
                    order_item_id: 1,
                    product_id: PRODUCT_1.into(),
                    seller_id: SELLER_1.into(),
                    shipping_limit_date: "2017-10-06 11:07:15".into(),
                    price: 29.99,
                    freight_value: 8.72,
                },
                RawOrderItem {
                    order_id: ORDER_B.into(),
                    order_item_id: 1,
                    product_id: PRODUCT_2.into(),
                    seller_id: SELLER_1.into(),
                    shipping_limit_date: "2018-07-30 03:24:27".into(),
                    price: 118.7,
                    freight_value: 22.76,
                },
            ],
            order_payments: vec![RawOrderPayment {
                order_id: ORDER_A.into(),
                payment_sequential: 1,
                payment_type: "credit_card".into(),
                payment_installments: 1,
                payment_value: 18.12,
            }],
            order_reviews: vec![
                RawOrderReview {
                    review_id: "a54f0611adc9ed256b57ede6b6eb5114".into(),
                    order_id: ORDER_A.into(),
                    review_score: 2,
                    review_comment_title: None,
                    review_comment_message: Some("late".into()),
                    review_creation_date: "2017-10-20 00:00:00".into(),
                    review_answer_timestamp: Some("2017-10-21 13:00:00".into()),
                },
                RawOrderReview {
                    review_id: "8d5266042046a06655c8db133d120ba5".into(),
                    order_id: ORDER_A.into(),
                    review_score: 4,
                    review_comment_title: None,
                    review_comment_message: None,
                    review_creation_date: "2017-10-11 00:00:00".into(),
                    review_answer_timestamp: None,
                },
            ],
            orders: vec![
                RawOrder {
                    order_id: ORDER_A.into(),
                    customer_id: CUSTOMER_A.into(),
                    order_status: "delivered".into(),
                    order_purchase_timestamp: "2017-10-02 10:56:33".into(),
                    order_approved_at: Some("2017-10-02 11:07:15".into()),
                    order_delivered_carrier_date: Some("2017-10-04 19:55:00".into()),
                    order_delivered_customer_date: Some("2017-10-10 21:25:13".into()),
                    order_estimated_delivery_date: "2017-10-18 00:00:00".into(),
                },
                RawOrder {
                    order_id: ORDER_B.into(),
                    customer_id: CUSTOMER_B.into(),
                    order_status: "shipped".into(),
                    order_purchase_timestamp: "2018-07-24 20:41:37".into(),
                    order_approved_at: Some("".into()),
                    order_delivered_carrier_date: None,
                    order_delivered_customer_date: None,
                    order_estimated_delivery_date: "2018-08-13 00:00:00".into(),
                },
            ],
            product_categories: vec![RawProductCategory {
                product_category_name: "utilidades_domesticas".into(),
                product_category_name_english: "housewares".into(),
            }],
            products: vec![
                RawProduct {
                    product_id: PRODUCT_1.into(),
                    product_category_name: Some("utilidades_domesticas".into()),
                    product_name_length: Some(40.0),
                    product_description_length: Some(268.0),
                    product_photos_qty: Some(4.0),
                    product_weight_g: Some(500.0),
                    product_length_cm: Some(19.0),
                    product_height_cm: Some(8.0),
                    product_width_cm: Some(13.0),
                },
                RawProduct {
                    product_id: PRODUCT_2.into(),
                    product_category_name: None,
                    product_name_length: None,
                    product_description_length: None,
                    product_photos_qty: None,
                    product_weight_g: Some(f64::NAN),
                    product_length_cm: None,
                    product_height_cm: None,
                    product_width_cm: None,
                },
            ],
            sellers: vec![RawSeller {
                seller_id: SELLER_1.into(),
                seller_zip_code_prefix: 9350,
                seller_city: "maua".into(),
                seller_state: "SP".into(),
            }],
        }
    }

    fn transformer() -> StarSchemaTransformer {
        StarSchemaTransformer::new().with_date_range(
            NaiveDate::from_ymd_opt(2017, 1, 1).unwrap(),
            NaiveDate::from_ymd_opt(2017, 1, 31).unwrap(),
        )
    }

    #[test]
    fn test_customer_dimension_dedupes_first_seen() {
        let schema = transformer().build(&dataset()).unwrap();
        assert_eq!(schema.customers.len(), 1);
        let customer = &schema.customers[0];
        assert_eq!(customer.customer_id, "7c396fd4-830f-d042-20f7-54e42b4e5bff");
        assert_eq!(customer.customer_city, "sao paulo");
        assert_eq!(customer.customer_name, "Customer_1");
    }

    #[test]
    fn test_fact_orders_reference_unique_customer() {
        let schema = transformer().build(&dataset()).unwrap();
        let customer_keys: HashSet<_> = schema.customers.iter().map(|c| &c.customer_id).collect();
        let product_keys: HashSet<_> = schema.products.iter().map(|p| &p.product_id).collect();
        let seller_keys: HashSet<_> = schema.sellers.iter().map(|s| &s.seller_id).collect();

        assert_eq!(schema.orders.len(), 2);
        for fact in &schema.orders {
            let customer = fact.customer_id.as_ref().unwrap();
            assert!(customer_keys.contains(customer));
            assert!(product_keys.contains(&fact.product_id));
            assert!(seller_keys.contains(&fact.seller_id));
        }
    }

    #[test]
    fn test_fact_order_columns() {
        let schema = transformer().build(&dataset()).unwrap();
        let first = &schema.orders[0];
        assert_eq!(first.order_id, "e481f51c-bdc5-4678-b7cc-49136f2d6af7");
        // 29.99 + 8.72 = 38.71
        assert_eq!(first.total_price, 39);
        assert_eq!(first.order_status.as_deref(), Some("delivered"));
        assert_eq!(
            first.order_purchase_timestamp.map(|t| t.to_string()),
            Some("2017-10-02 10:56:33".to_string())
        );
        // The review created on 2017-10-20 is the latest
        assert_eq!(first.order_rating, Some(2.0));

        let second = &schema.orders[1];
        assert_eq!(second.total_price, 141);
        assert_eq!(second.order_approved_at, None);
        assert_eq!(second.order_rating, None);
    }

    #[test]
    fn test_products_translated_and_rounded() {
        let schema = transformer().build(&dataset()).unwrap();
        let housewares = &schema.products[0];
        assert_eq!(housewares.product_category_name, "housewares");
        assert_eq!(housewares.product_weight_g, Some(500));
        assert_eq!(housewares.product_name, "Product_1");

        let unknown = &schema.products[1];
        assert_eq!(unknown.product_category_name, UNKNOWN_CATEGORY);
        assert_eq!(unknown.product_weight_g, None);
        assert_eq!(unknown.product_name, "Product_2");
    }

    #[test]
    fn test_sellers_and_payments() {
        let schema = transformer().build(&dataset()).unwrap();
        assert_eq!(schema.sellers.len(), 1);
        assert_eq!(schema.sellers[0].seller_name, "Seller_1");
        assert_eq!(schema.payments.len(), 1);
        assert_eq!(
            schema.payments[0].order_id,
            "e481f51c-bdc5-4678-b7cc-49136f2d6af7"
        );
    }

    #[test]
    fn test_date_range_applied() {
        let schema = transformer().build(&dataset()).unwrap();
        assert_eq!(schema.dates.len(), 31);
    }

    #[test]
    fn test_malformed_uuid_rejected() {
        let mut raw = dataset();
        raw.order_payments[0].order_id = "not-a-uuid".into();
        let err = transformer().transform(raw).unwrap_err();
        assert!(matches!(err, Error::Value { kind: "uuid", .. }));
    }

    #[test]
    fn test_malformed_timestamp_rejected() {
        let mut raw = dataset();
        raw.orders[0].order_purchase_timestamp = "soon".into();
        let err = transformer().transform(raw).unwrap_err();
        assert!(matches!(err, Error::Value { kind: "timestamp", .. }));
    }

    #[test]
    fn test_deterministic() {
        let a = transformer().build(&dataset()).unwrap();
        let b = transformer().build(&dataset()).unwrap();
        assert_eq!(a, b);
    }
}
