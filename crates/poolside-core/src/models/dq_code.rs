//! Closed list of violation codes

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// One violation code as shown on the judge's code sheet
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DqCode {
    pub code: String,
    pub description: String,
}

/// Violation codes grouped by category (stroke, start, turn, ...)
///
/// The JSON form is a map of category name to code list:
/// `{"freestyle": [{"code": "1A", "description": "..."}]}`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DqCodeCatalog {
    categories: BTreeMap<String, Vec<DqCode>>,
}

impl DqCodeCatalog {
    pub fn from_json(payload: &str) -> Result<Self> {
        let catalog: Self = serde_json::from_str(payload)?;
        if catalog.categories.values().all(Vec::is_empty) {
            return Err(Error::InvalidInput("DQ code catalog is empty".into()));
        }
        Ok(catalog)
    }

    pub fn load(path: &std::path::Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_json(&raw)
    }

    /// Look up a code, case-insensitively
    pub fn find(&self, code: &str) -> Option<&DqCode> {
        self.categories
            .values()
            .flatten()
            .find(|entry| entry.code.eq_ignore_ascii_case(code.trim()))
    }

    pub fn contains(&self, code: &str) -> bool {
        self.find(code).is_some()
    }

    pub fn categories(&self) -> impl Iterator<Item = (&str, &[DqCode])> {
        self.categories
            .iter()
            .map(|(name, codes)| (name.as_str(), codes.as_slice()))
    }
}

/// Canonical form of a code as entered by the judge
pub fn normalize_dq_code(raw: &str) -> Option<String> {
    let code = raw.trim();
    if code.is_empty() {
        None
    } else {
        Some(code.to_ascii_uppercase())
    }
}
