//! Declaration registry: the closed set of component names a view may use.
//!
//! The manifest is plain text with `declare const <Name>: Widgets.<Type>;`
//! entries. Anything else in the file is ignored, and a manifest without
//! matches yields an empty set rather than an error.

use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// Manifest used when the caller does not supply one.
pub const DEFAULT_DECLARATIONS: &str = include_str!("widgets.d.ts");

lazy_static! {
    static ref DECLARE_CONST_RE: Regex =
        Regex::new(r"declare\s+const\s+(\w+)\s*:\s*Widgets\.").unwrap();
}

/// Duplicate-free component names, kept in first-occurrence order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ComponentNameSet {
    names: Vec<String>,
}

impl ComponentNameSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `name` unless already present. Returns whether it was inserted.
    pub fn insert(&mut self, name: &str) -> bool {
        if self.contains(name) {
            return false;
        }
        self.names.push(name.to_string());
        true
    }

    pub fn contains(&self, name: &str) -> bool {
        self.names.iter().any(|n| n == name)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.names.iter().map(String::as_str)
    }

    pub fn to_vec(&self) -> Vec<String> {
        self.names.clone()
    }
}

impl<'a> FromIterator<&'a str> for ComponentNameSet {
    fn from_iter<I: IntoIterator<Item = &'a str>>(iter: I) -> Self {
        let mut set = ComponentNameSet::new();
        for name in iter {
            set.insert(name);
        }
        set
    }
}

pub fn extract_component_names(manifest: &str) -> ComponentNameSet {
    let names: ComponentNameSet = DECLARE_CONST_RE
        .captures_iter(manifest)
        .filter_map(|caps| caps.get(1))
        .map(|m| m.as_str())
        .collect();
    log::debug!("extracted {} component names from manifest", names.len());
    names
}

/// The component names of the bundled widget manifest.
pub fn default_component_names() -> ComponentNameSet {
    extract_component_names(DEFAULT_DECLARATIONS)
}
