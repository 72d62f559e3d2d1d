//! Which extensions loaded this session.

use std::collections::btree_map;
use std::collections::BTreeMap;

use delegate::delegate;

/// Maps an extension identifier to whether it loaded.
/// Entries are only ever added, the first outcome for an identifier wins.
#[derive(Debug, Default, Clone)]
pub struct ExtensionRecord {
    #[allow(clippy::missing_docs_in_private_items)]
    entries: BTreeMap<String, bool>,
}

impl ExtensionRecord {
    /// Record the outcome of loading `id`.
    pub fn record(&mut self, id: impl Into<String>, loaded: bool) {
        self.entries.entry(id.into()).or_insert(loaded);
    }

    /// Number of extensions that loaded.
    pub fn succeeded(&self) -> usize {
        self.entries.values().filter(|loaded| **loaded).count()
    }

    /// Number of extensions that failed to load.
    pub fn failed(&self) -> usize {
        self.entries.values().filter(|loaded| !**loaded).count()
    }

    delegate! {
        to self.entries {
            /// Outcome for a single extension.
            pub fn get(&self, id: &str) -> Option<&bool>;
            pub fn is_empty(&self) -> bool;
            /// Iterate in identifier order.
            pub fn iter(&self) -> btree_map::Iter<'_, String, bool>;
        }
    }
}
