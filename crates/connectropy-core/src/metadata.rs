//! Node annotations: node id -> category label.

use crate::edge::NodeId;
use std::collections::HashMap;

/// Category label per node, with null labels allowed.
///
/// Remembers the order in which ids were first seen, which is the default
/// order of the category axis.
#[derive(Debug, Clone, Default)]
pub struct NodeMetadata {
    categories: HashMap<NodeId, Option<String>>,
    order: Vec<NodeId>,
}

impl NodeMetadata {
    /// Create empty metadata.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the category of `id`. Blank labels are stored as null.
    ///
    /// Re-inserting an id replaces its category but keeps its original position.
    pub fn insert(&mut self, id: impl Into<NodeId>, category: Option<String>) {
        let id = id.into();
        let category = category.filter(|c| !c.trim().is_empty());
        if !self.categories.contains_key(&id) {
            self.order.push(id.clone());
        }
        self.categories.insert(id, category);
    }

    /// Category of `id`, or `None` if the id is unknown or its label is null.
    pub fn category(&self, id: &str) -> Option<&str> {
        self.categories.get(id).and_then(|c| c.as_deref())
    }

    /// Whether `id` has a row (null category or not).
    pub fn contains(&self, id: &str) -> bool {
        self.categories.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Rows in first-seen order.
    pub fn iter(&self) -> impl Iterator<Item = (&NodeId, Option<&str>)> + '_ {
        self.order
            .iter()
            .map(move |id| (id, self.categories[id].as_deref()))
    }

    /// Distinct non-null categories in first-observed order.
    pub fn observed_categories(&self) -> Vec<String> {
        let mut seen = std::collections::HashSet::new();
        self.iter()
            .filter_map(|(_, c)| c)
            .filter(|c| seen.insert(*c))
            .map(str::to_string)
            .collect()
    }
}

impl<I: Into<NodeId>> FromIterator<(I, Option<String>)> for NodeMetadata {
    fn from_iter<T: IntoIterator<Item = (I, Option<String>)>>(iter: T) -> Self {
        let mut metadata = Self::new();
        for (id, category) in iter {
            metadata.insert(id, category);
        }
        metadata
    }
}
