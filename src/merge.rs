use std::collections::BTreeMap;

use tracing::debug;

use crate::error::RigfileError;
use crate::types::{Config, Spec};

/// Fold `other` into `self`; `other` is the later, higher-priority side.
pub trait Merge {
    fn merge(&mut self, other: Self);
}

impl Merge for String {
    /// A non-empty later value wins.
    fn merge(&mut self, other: Self) {
        if !other.is_empty() {
            *self = other;
        }
    }
}

impl<T> Merge for Vec<T> {
    fn merge(&mut self, other: Self) {
        self.extend(other);
    }
}

impl<V> Merge for BTreeMap<String, V> {
    /// Union of both maps; a later entry replaces an earlier one whole.
    fn merge(&mut self, other: Self) {
        self.extend(other);
    }
}

impl Merge for Spec {
    fn merge(&mut self, other: Self) {
        self.workspace.merge(other.workspace);
        Merge::merge(&mut self.instances, other.instances);
    }
}

impl Merge for Config {
    fn merge(&mut self, other: Self) {
        self.version.merge(other.version);
        self.name.merge(other.name);
        self.description.merge(other.description);
        Merge::merge(&mut self.sandboxes, other.sandboxes);
        Merge::merge(&mut self.servers, other.servers);
        self.spec.merge(other.spec);
    }
}

/// Merge configs in order: later configs override earlier ones.
pub fn merge_configs(configs: Vec<Config>) -> Result<Config, RigfileError> {
    let count = configs.len();
    let mut iter = configs.into_iter();
    let mut merged = iter.next().ok_or(RigfileError::NothingToMerge)?;
    for config in iter {
        merged.merge(config);
    }
    debug!(count, "merged configs");
    Ok(merged)
}
