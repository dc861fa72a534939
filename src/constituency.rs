//! Postcode to parliamentary constituency lookup
use crate::error::LookupError;
use crate::validation::sanitize_postcode;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Constituency {
    pub id: String,
    pub name: String,
}

impl Constituency {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
        }
    }
}

pub trait ConstituencyLookup: Send + Sync {
    /// `Ok(None)` when the postcode is not in any known constituency.
    fn find_by_postcode(&self, postcode: &str) -> Result<Option<Constituency>, LookupError>;
}

/// Lookup backed by a fixed postcode table, keyed by sanitised postcode.
#[derive(Debug, Default, Clone)]
pub struct StaticConstituencyLookup {
    by_postcode: HashMap<String, Constituency>,
}

impl StaticConstituencyLookup {
    pub fn new() -> Self {
        Self::default()
    }
    pub fn with_postcode(mut self, postcode: &str, constituency: Constituency) -> Self {
        self.by_postcode
            .insert(sanitize_postcode(postcode), constituency);
        self
    }
    pub fn len(&self) -> usize {
        self.by_postcode.len()
    }
    pub fn is_empty(&self) -> bool {
        self.by_postcode.is_empty()
    }
}

impl ConstituencyLookup for StaticConstituencyLookup {
    fn find_by_postcode(&self, postcode: &str) -> Result<Option<Constituency>, LookupError> {
        Ok(self.by_postcode.get(&sanitize_postcode(postcode)).cloned())
    }
}
