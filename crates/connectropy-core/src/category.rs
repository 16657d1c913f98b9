//! The category axis shared by every fingerprint.
//!
//! Every fingerprint is laid out over the same two halves, one slot per
//! category:
//!
//! ```text
//! in  half: {c}_in   weight share of incoming edges whose source has category c
//! out half: {c}_out  weight share of outgoing edges whose sink has category c
//! ```
//!
//! The order is fixed when the index is built and never re-derived, so a
//! cached table stays comparable across runs. Default order is the order in
//! which categories are first observed in the metadata; hash-map iteration
//! order is never used.

use crate::metadata::NodeMetadata;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Half of a fingerprint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    /// Edges arriving at the node; partners are sources.
    In,
    /// Edges leaving the node; partners are sinks.
    Out,
}

impl Direction {
    pub const BOTH: [Direction; 2] = [Direction::In, Direction::Out];

    /// Column suffix for this half.
    pub fn suffix(self) -> &'static str {
        match self {
            Direction::In => "_in",
            Direction::Out => "_out",
        }
    }

    /// Bare name, used as a field prefix (`in_entropy`, `out_diff_U`).
    pub fn name(self) -> &'static str {
        match self {
            Direction::In => "in",
            Direction::Out => "out",
        }
    }
}

/// Ordered, de-duplicated category set.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "Vec<String>", into = "Vec<String>")]
pub struct CategoryIndex {
    categories: Vec<String>,
    position: HashMap<String, usize>,
}

impl PartialEq for CategoryIndex {
    fn eq(&self, other: &Self) -> bool {
        self.categories == other.categories
    }
}

impl Eq for CategoryIndex {}

impl CategoryIndex {
    /// Build an index from an explicit list, keeping the first occurrence of repeats.
    ///
    /// Fails with [`Error::EmptyCategories`] when the list is empty.
    pub fn new<I, S>(categories: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut ordered = Vec::new();
        let mut position = HashMap::new();
        for category in categories {
            let category = category.into();
            if !position.contains_key(&category) {
                position.insert(category.clone(), ordered.len());
                ordered.push(category);
            }
        }
        if ordered.is_empty() {
            return Err(Error::EmptyCategories);
        }
        Ok(Self {
            categories: ordered,
            position,
        })
    }

    /// Categories from `explicit` if given, otherwise every non-null label in
    /// `metadata` in first-observed order.
    ///
    /// # Example
    ///
    /// ```rust
    /// use connectropy_core::{CategoryIndex, NodeMetadata};
    ///
    /// let meta: NodeMetadata = [("X", Some("a".to_string())), ("Y", Some("b".to_string()))]
    ///     .into_iter()
    ///     .collect();
    /// let index = CategoryIndex::from_metadata(&meta, None).unwrap();
    /// assert_eq!(index.axis(), ["a_in", "a_out", "b_in", "b_out"]);
    /// ```
    pub fn from_metadata(metadata: &NodeMetadata, explicit: Option<&[String]>) -> Result<Self> {
        match explicit {
            Some(list) => Self::new(list.iter().cloned()),
            None => Self::new(metadata.observed_categories()),
        }
    }

    pub fn categories(&self) -> &[String] {
        &self.categories
    }

    /// Number of categories (the width of each half).
    pub fn len(&self) -> usize {
        self.categories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.categories.is_empty()
    }

    /// Slot of `category` within each half.
    pub fn position(&self, category: &str) -> Option<usize> {
        self.position.get(category).copied()
    }

    pub fn contains(&self, category: &str) -> bool {
        self.position.contains_key(category)
    }

    /// Column labels of one half, e.g. `["a_in", "b_in"]`.
    pub fn columns(&self, direction: Direction) -> Vec<String> {
        self.categories
            .iter()
            .map(|c| format!("{c}{}", direction.suffix()))
            .collect()
    }

    pub fn in_columns(&self) -> Vec<String> {
        self.columns(Direction::In)
    }

    pub fn out_columns(&self) -> Vec<String> {
        self.columns(Direction::Out)
    }

    /// Full labeled axis, interleaved per category: `a_in, a_out, b_in, b_out, ...`.
    pub fn axis(&self) -> Vec<String> {
        self.categories
            .iter()
            .flat_map(|c| Direction::BOTH.map(|d| format!("{c}{}", d.suffix())))
            .collect()
    }
}

impl TryFrom<Vec<String>> for CategoryIndex {
    type Error = Error;

    fn try_from(categories: Vec<String>) -> Result<Self> {
        Self::new(categories)
    }
}

impl From<CategoryIndex> for Vec<String> {
    fn from(index: CategoryIndex) -> Self {
        index.categories
    }
}
