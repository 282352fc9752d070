//! Traversal configuration

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::Result;
use crate::limits::Limits;

/// Which event adapter feeds the document builder
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventSource {
    /// `quick-xml` pull reader
    #[default]
    Pull,
    /// SAX-style push callbacks
    Push,
}

/// Options for loading and traversing a schema set
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TraversalOptions {
    /// Let a later global declaration replace an earlier one of the same name
    pub tolerate_duplicates: bool,

    /// Turn leading text of a compositor into a synthetic annotation
    pub synthetic_annotations: bool,

    pub event_source: EventSource,

    pub limits: Limits,
}

impl Default for TraversalOptions {
    fn default() -> Self {
        Self {
            tolerate_duplicates: false,
            synthetic_annotations: true,
            event_source: EventSource::Pull,
            limits: Limits::default(),
        }
    }
}

impl TraversalOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_tolerate_duplicates(mut self, tolerate: bool) -> Self {
        self.tolerate_duplicates = tolerate;
        self
    }

    pub fn with_synthetic_annotations(mut self, enabled: bool) -> Self {
        self.synthetic_annotations = enabled;
        self
    }

    pub fn with_event_source(mut self, source: EventSource) -> Self {
        self.event_source = source;
        self
    }

    pub fn with_limits(mut self, limits: Limits) -> Self {
        self.limits = limits;
        self
    }

    /// Read options from a JSON file; missing fields take their defaults
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path.as_ref())?;
        Ok(serde_json::from_str(&text)?)
    }
}
