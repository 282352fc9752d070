//! Annotations

use serde::Serialize;

/// Content of an `annotation` element
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct Annotation {
    /// Text of each `documentation` child
    pub documentation: Vec<String>,
    /// Text of each `appinfo` child
    pub app_info: Vec<String>,
    /// Built from loose text instead of an `annotation` element
    pub synthetic: bool,
}

impl Annotation {
    /// Annotation made from leading text of a schema component
    pub fn synthetic(text: &str) -> Self {
        Self {
            documentation: vec![text.trim().to_string()],
            app_info: Vec::new(),
            synthetic: true,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.documentation.is_empty() && self.app_info.is_empty()
    }
}
