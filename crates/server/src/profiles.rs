//! Target profile lookup from configuration

use monitor::{Device, ProfileLookup};
use std::collections::BTreeMap;

/// Per-model profiles with an optional fallback
#[derive(Debug, Clone, Default)]
pub struct ProfileTable {
    by_model: BTreeMap<String, String>,
    default_profile: Option<String>,
}

impl ProfileTable {
    pub fn new(by_model: BTreeMap<String, String>, default_profile: Option<String>) -> Self {
        Self {
            by_model,
            default_profile,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.by_model.is_empty() && self.default_profile.is_none()
    }
}

impl ProfileLookup for ProfileTable {
    fn target_profile(&self, device: &Device) -> Option<String> {
        device
            .model_name
            .as_ref()
            .and_then(|model| self.by_model.get(model))
            .or(self.default_profile.as_ref())
            .cloned()
    }
}
