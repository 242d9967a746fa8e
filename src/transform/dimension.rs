//! Deduplicating dimension builder
//!
//! A dimension is built from raw rows by extracting a natural key and a
//! set of attributes from each row. Keys are unique within the result.
//!
//! Surrogate keys are `1..=N` in order of the first appearance of each
//! natural key, regardless of policy. The [`KeepPolicy`] only decides
//! whose attributes survive when a natural key repeats.

use crate::{Error, Result};
use std::collections::HashMap;
use std::convert::Infallible;
use std::hash::Hash;

/// Which occurrence of a repeated natural key supplies the attributes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum KeepPolicy {
    /// The first row seen wins
    #[default]
    First,
    /// The last row seen wins
    Last,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DimensionRow<K, A> {
    /// Surrogate key, starting at 1
    pub key: u64,
    pub natural_key: K,
    pub attributes: A,
}

#[derive(Debug, Clone)]
pub struct Dimension<K, A> {
    rows: Vec<DimensionRow<K, A>>,
    index: HashMap<K, usize>,
}

impl<K, A> Dimension<K, A>
where
    K: Eq + Hash + Clone,
{
    /// Build a dimension where key and attribute extraction may fail
    ///
    /// Attributes are extracted for every row, including duplicates that
    /// end up discarded, so malformed values are rejected consistently.
    pub fn try_build<R, I, KF, AF, E>(
        rows: I,
        policy: KeepPolicy,
        natural_key: KF,
        attributes: AF,
    ) -> std::result::Result<Self, E>
    where
        I: IntoIterator<Item = R>,
        KF: Fn(&R) -> std::result::Result<K, E>,
        AF: Fn(&R) -> std::result::Result<A, E>,
    {
        let mut dimension = Self {
            rows: Vec::new(),
            index: HashMap::new(),
        };

        for row in rows {
            let key = natural_key(&row)?;
            let attrs = attributes(&row)?;

            match dimension.index.get(&key) {
                Some(&pos) => {
                    if policy == KeepPolicy::Last {
                        dimension.rows[pos].attributes = attrs;
                    }
                }
                None => {
                    let pos = dimension.rows.len();
                    dimension.rows.push(DimensionRow {
                        key: pos as u64 + 1,
                        natural_key: key.clone(),
                        attributes: attrs,
                    });
                    dimension.index.insert(key, pos);
                }
            }
        }

        Ok(dimension)
    }

    pub fn build<R, I, KF, AF>(rows: I, policy: KeepPolicy, natural_key: KF, attributes: AF) -> Self
    where
        I: IntoIterator<Item = R>,
        KF: Fn(&R) -> K,
        AF: Fn(&R) -> A,
    {
        let built = Self::try_build::<_, _, _, _, Infallible>(
            rows,
            policy,
            |r| Ok(natural_key(r)),
            |r| Ok(attributes(r)),
        );
        match built {
            Ok(dimension) => dimension,
            Err(never) => match never {},
        }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn get(&self, natural_key: &K) -> Option<&DimensionRow<K, A>> {
        self.index.get(natural_key).map(|&pos| &self.rows[pos])
    }

    /// Surrogate key of a natural key, if present
    pub fn key_of(&self, natural_key: &K) -> Option<u64> {
        self.get(natural_key).map(|row| row.key)
    }

    /// Surrogate key lookup that treats a dangling reference as an error
    pub fn link(&self, natural_key: &K) -> Result<u64>
    where
        K: std::fmt::Debug,
    {
        self.key_of(natural_key).ok_or_else(|| {
            Error::value(
                "foreign key",
                format!("{natural_key:?}"),
                "no matching dimension row",
            )
        })
    }

    pub fn rows(&self) -> &[DimensionRow<K, A>] {
        &self.rows
    }

    /// Rows in surrogate key order
    pub fn into_rows(self) -> Vec<DimensionRow<K, A>> {
        self.rows
    }
}
