//! Categorised warnings collected during a processing pass.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::warn;

/// What a warning is about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WarningCategory {
    /// An input field or observation set was not available.
    FileAvailability,
    SampleCount,
    DataQuality,
    Processing,
    Other,
}

impl WarningCategory {
    pub const ALL: [WarningCategory; 5] = [
        WarningCategory::FileAvailability,
        WarningCategory::SampleCount,
        WarningCategory::DataQuality,
        WarningCategory::Processing,
        WarningCategory::Other,
    ];

    pub fn name(self) -> &'static str {
        match self {
            WarningCategory::FileAvailability => "file_availability",
            WarningCategory::SampleCount => "sample_count",
            WarningCategory::DataQuality => "data_quality",
            WarningCategory::Processing => "processing",
            WarningCategory::Other => "other",
        }
    }
}

impl fmt::Display for WarningCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WarningEntry {
    pub category: WarningCategory,
    pub message: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub details: BTreeMap<String, String>,
}

/// Append-only warning list. [`add`](Self::add) also emits the warning
/// through `tracing`; [`record`](Self::record) only stores it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WarningLog {
    entries: Vec<WarningEntry>,
}

impl WarningLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, category: WarningCategory, message: impl Into<String>) {
        self.add_with_details(category, message, BTreeMap::new());
    }

    pub fn add_with_details(
        &mut self,
        category: WarningCategory,
        message: impl Into<String>,
        details: BTreeMap<String, String>,
    ) {
        let message = message.into();
        warn!(category = %category, "{message}");
        self.entries.push(WarningEntry {
            category,
            message,
            details,
        });
    }

    /// Stores a warning without emitting it, for conditions already logged
    /// where they arose.
    pub fn record(
        &mut self,
        category: WarningCategory,
        message: impl Into<String>,
        details: BTreeMap<String, String>,
    ) {
        self.entries.push(WarningEntry {
            category,
            message: message.into(),
            details,
        });
    }

    /// Warnings of one category, or all of them.
    pub fn entries(&self, category: Option<WarningCategory>) -> Vec<&WarningEntry> {
        self.entries
            .iter()
            .filter(|e| category.is_none_or(|c| e.category == c))
            .collect()
    }

    /// Count per category, including empty categories.
    pub fn counts(&self) -> BTreeMap<WarningCategory, usize> {
        let mut counts: BTreeMap<WarningCategory, usize> =
            WarningCategory::ALL.iter().map(|&c| (c, 0)).collect();
        for entry in &self.entries {
            *counts.entry(entry.category).or_default() += 1;
        }
        counts
    }

    pub fn has_warnings(&self, category: Option<WarningCategory>) -> bool {
        self.entries
            .iter()
            .any(|e| category.is_none_or(|c| e.category == c))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drops the warnings of one category, or all of them.
    pub fn clear(&mut self, category: Option<WarningCategory>) {
        match category {
            Some(c) => self.entries.retain(|e| e.category != c),
            None => self.entries.clear(),
        }
    }

    /// Appends another log's entries without re-emitting them.
    pub fn extend(&mut self, other: WarningLog) {
        self.entries.extend(other.entries);
    }
}
