//! Filter model.
//!
//! A row passes when every active per-column filter accepts it AND the quick
//! filter (if set) matches its text projection. Column filters combine a
//! selected-value set with an optional text predicate; both must pass.

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

use crate::value::{NormalizedValue, RowValue};

/// Text filter mode
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub enum TextFilterMode {
    Contains,
    NotContains,
    StartsWith,
    EndsWith,
    Equals,
    NotEquals,
}

/// Text filter predicate
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TextFilter {
    pub mode: TextFilterMode,
    pub value: String,
    pub case_sensitive: bool,
}

impl TextFilter {
    pub fn matches(&self, text: &str) -> bool {
        let (haystack, needle) = if self.case_sensitive {
            (text.to_string(), self.value.clone())
        } else {
            (text.to_lowercase(), self.value.to_lowercase())
        };

        match self.mode {
            TextFilterMode::Contains => haystack.contains(&needle),
            TextFilterMode::NotContains => !haystack.contains(&needle),
            TextFilterMode::StartsWith => haystack.starts_with(&needle),
            TextFilterMode::EndsWith => haystack.ends_with(&needle),
            TextFilterMode::Equals => haystack == needle,
            TextFilterMode::NotEquals => haystack != needle,
        }
    }
}

/// Per-column filter criteria
#[derive(Debug, Clone, Default)]
pub struct ColumnFilter {
    /// Selected normalized values to INCLUDE (None = all pass)
    pub selected: Option<HashSet<NormalizedValue>>,

    /// Optional text predicate (AND with selected)
    pub text_filter: Option<TextFilter>,
}

impl ColumnFilter {
    /// Check if a value passes this filter
    pub fn passes(&self, value: &RowValue) -> bool {
        let normalized = value.normalized();

        if let Some(selected) = &self.selected {
            if !selected.contains(&normalized) {
                return false;
            }
        }

        // RULE: Non-text values FAIL text filters
        if let Some(text_filter) = &self.text_filter {
            match value {
                RowValue::Text(s) => {
                    if !text_filter.matches(s) {
                        return false;
                    }
                }
                _ => return false,
            }
        }

        true
    }

    /// Is this filter active (has any criteria)?
    pub fn is_active(&self) -> bool {
        self.selected.is_some() || self.text_filter.is_some()
    }
}

/// Combined filter state: per-field column filters plus the quick filter.
#[derive(Debug, Clone, Default)]
pub struct FilterModel {
    /// Per-column filter criteria, keyed by field id
    column_filters: HashMap<String, ColumnFilter>,

    /// Quick filter, normalized (lowercased) at assignment. None = inactive.
    quick_filter: Option<String>,
}

impl FilterModel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the quick filter. Empty or whitespace-only strings deactivate it.
    /// Returns true if the effective value changed.
    pub fn set_quick_filter(&mut self, raw: Option<&str>) -> bool {
        let normalized = match raw {
            None => None,
            Some(s) if s.trim().is_empty() => None,
            Some(s) => Some(s.to_lowercase()),
        };
        if self.quick_filter != normalized {
            self.quick_filter = normalized;
            true
        } else {
            false
        }
    }

    /// The normalized quick-filter value, if active.
    pub fn quick_filter(&self) -> Option<&str> {
        self.quick_filter.as_deref()
    }

    pub fn set_column_filter(&mut self, field: impl Into<String>, filter: ColumnFilter) {
        self.column_filters.insert(field.into(), filter);
    }

    pub fn clear_column_filter(&mut self, field: &str) {
        self.column_filters.remove(field);
    }

    pub fn clear_all(&mut self) {
        self.column_filters.clear();
        self.quick_filter = None;
    }

    /// Active (field, filter) pairs only.
    pub fn active_column_filters(&self) -> impl Iterator<Item = (&str, &ColumnFilter)> {
        self.column_filters
            .iter()
            .filter(|(_, f)| f.is_active())
            .map(|(k, f)| (k.as_str(), f))
    }

    /// Is any filtering active (column filters or quick filter)?
    pub fn is_active(&self) -> bool {
        self.quick_filter.is_some() || self.column_filters.values().any(|f| f.is_active())
    }
}
