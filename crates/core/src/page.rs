//! Paged list results

use serde::{Deserialize, Serialize};

/// Parameters of a paged list call
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListParams {
    /// Fields to include in each item (`_include`)
    #[serde(rename = "_include", default, skip_serializing_if = "Vec::is_empty")]
    pub include: Vec<String>,
    /// Number of items to skip (`_offset`)
    #[serde(rename = "_offset", default)]
    pub offset: usize,
}

impl ListParams {
    /// Request only the given fields
    pub fn including<I, S>(fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        ListParams {
            include: fields.into_iter().map(Into::into).collect(),
            offset: 0,
        }
    }
}

/// One page of a list call
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page<T> {
    /// Items on this page
    pub items: Vec<T>,
    /// Total number of items across all pages, as reported by the server
    pub total: usize,
}

impl<T> Page<T> {
    /// Create a page
    pub fn new(items: Vec<T>, total: usize) -> Self {
        Page { items, total }
    }
}
