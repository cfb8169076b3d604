//! Contract Context - Per-load knowledge shared by planners and executors
//!
//! Holds the names of discriminator properties found anywhere in the
//! contract. Built once when the contract is loaded and shared read-only.

use std::collections::BTreeSet;

use serde_json::Value;

use crate::fuzzer::path::FieldPath;

/// Read-only facts gathered while loading one contract
#[derive(Debug, Clone, Default)]
pub struct ContractContext {
    discriminators: BTreeSet<String>,
}

impl ContractContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Collect every `discriminator.propertyName` in a raw contract document
    pub fn from_document(document: &Value) -> Self {
        let mut context = Self::new();
        context.collect(document);
        context
    }

    pub fn with_discriminator(mut self, name: impl Into<String>) -> Self {
        self.discriminators.insert(name.into());
        self
    }

    /// Whether the field's terminal name is a discriminator property
    pub fn is_discriminator(&self, path: &FieldPath) -> bool {
        path.leaf_name()
            .is_some_and(|name| self.discriminators.contains(name))
    }

    pub fn discriminators(&self) -> impl Iterator<Item = &str> {
        self.discriminators.iter().map(String::as_str)
    }

    fn collect(&mut self, value: &Value) {
        match value {
            Value::Object(map) => {
                if let Some(name) = map
                    .get("discriminator")
                    .and_then(|d| d.get("propertyName"))
                    .and_then(Value::as_str)
                {
                    self.discriminators.insert(name.to_string());
                }
                map.values().for_each(|child| self.collect(child));
            }
            Value::Array(items) => items.iter().for_each(|child| self.collect(child)),
            _ => {}
        }
    }
}
