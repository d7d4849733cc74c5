//! SlotSet, a validated, partial assignment of dimensions to values.

use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

use crate::error::SchemaError;
use crate::schema::{Dimension, SlotValue, validate};

/// Validated slots for one session at one point in time.
///
/// Absence of a key means "unspecified". Values can only be inserted through
/// the validator, so every stored value is legal for its dimension.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct SlotSet {
    slots: BTreeMap<Dimension, SlotValue>,
}

impl SlotSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate `raw` and store it, overwriting any previous value.
    pub fn set(&mut self, dimension: Dimension, raw: &str) -> Result<(), SchemaError> {
        let value = validate(dimension, raw)?;
        self.slots.insert(dimension, value);
        Ok(())
    }

    /// Store an already validated value.
    pub fn insert(&mut self, dimension: Dimension, value: SlotValue) {
        self.slots.insert(dimension, value);
    }

    /// Builder form of [`SlotSet::set`].
    pub fn with(mut self, dimension: Dimension, raw: &str) -> Result<Self, SchemaError> {
        self.set(dimension, raw)?;
        Ok(self)
    }

    /// Build from loosely-typed `(key, value)` pairs.
    ///
    /// Invalid keys and values are dropped; the errors are returned alongside
    /// so callers can log them.
    pub fn from_raw_pairs<'a, I>(pairs: I) -> (Self, Vec<SchemaError>)
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        let mut set = Self::new();
        let mut dropped = Vec::new();
        for (key, raw) in pairs {
            let result = key
                .parse::<Dimension>()
                .and_then(|dim| set.set(dim, raw));
            if let Err(e) = result {
                dropped.push(e);
            }
        }
        (set, dropped)
    }

    pub fn get(&self, dimension: Dimension) -> Option<&SlotValue> {
        self.slots.get(&dimension)
    }

    pub fn text(&self, dimension: Dimension) -> Option<&str> {
        self.get(dimension).and_then(SlotValue::as_text)
    }

    pub fn integer(&self, dimension: Dimension) -> Option<i64> {
        self.get(dimension).and_then(SlotValue::as_integer)
    }

    pub fn contains(&self, dimension: Dimension) -> bool {
        self.slots.contains_key(&dimension)
    }

    pub fn remove(&mut self, dimension: Dimension) -> Option<SlotValue> {
        self.slots.remove(&dimension)
    }

    pub fn clear(&mut self) {
        self.slots.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (Dimension, &SlotValue)> {
        self.slots.iter().map(|(d, v)| (*d, v))
    }

    pub fn dimensions(&self) -> impl Iterator<Item = Dimension> + '_ {
        self.slots.keys().copied()
    }

    /// Last-write-wins merge: every key in `update` overwrites, untouched keys survive.
    pub fn merge(&self, update: &SlotSet) -> SlotSet {
        let mut merged = self.clone();
        merged.merge_from(update);
        merged
    }

    /// In-place form of [`SlotSet::merge`].
    pub fn merge_from(&mut self, update: &SlotSet) {
        for (dim, value) in &update.slots {
            self.slots.insert(*dim, value.clone());
        }
    }

    /// Keep only the given dimensions.
    pub fn project(&self, dimensions: &[Dimension]) -> SlotSet {
        SlotSet {
            slots: self
                .slots
                .iter()
                .filter(|(d, _)| dimensions.contains(d))
                .map(|(d, v)| (*d, v.clone()))
                .collect(),
        }
    }

    /// Render as query-string pairs, in dimension order.
    pub fn query_pairs(&self) -> Vec<(&'static str, String)> {
        self.slots
            .iter()
            .map(|(d, v)| (d.as_str(), v.to_query_value()))
            .collect()
    }
}

impl fmt::Display for SlotSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self
            .slots
            .iter()
            .map(|(d, v)| format!("{d}={v}"))
            .collect();
        write!(f, "{{{}}}", parts.join(", "))
    }
}
