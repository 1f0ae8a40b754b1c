//! Ordered reference lists that give bitmask positions their meaning.

use crate::error::{QueryError, QueryResult};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Ordered, duplicate-free list of item ids. Index 0 is bit 0 (LSB) of any
/// mask decoded against it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<String>", into = "Vec<String>")]
pub struct ReferenceList {
    items: Vec<String>,
    index: HashMap<String, usize>,
}

impl ReferenceList {
    pub fn new<I, S>(items: I) -> QueryResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let items: Vec<String> = items.into_iter().map(Into::into).collect();
        let mut index = HashMap::with_capacity(items.len());
        for (pos, id) in items.iter().enumerate() {
            if index.insert(id.clone(), pos).is_some() {
                return Err(QueryError::DuplicateItem(id.clone()));
            }
        }
        Ok(ReferenceList { items, index })
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Bit position of `id`, if present.
    pub fn position(&self, id: &str) -> Option<usize> {
        self.index.get(id).copied()
    }

    pub fn get(&self, position: usize) -> Option<&str> {
        self.items.get(position).map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.items.iter().map(String::as_str)
    }
}

impl TryFrom<Vec<String>> for ReferenceList {
    type Error = QueryError;

    fn try_from(items: Vec<String>) -> QueryResult<Self> {
        ReferenceList::new(items)
    }
}

impl From<ReferenceList> for Vec<String> {
    fn from(list: ReferenceList) -> Self {
        list.items
    }
}
