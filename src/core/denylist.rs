//! Attribute names the serializer never descends into.
//!
//! Matching is by attribute name only, whatever the kind or owner. The
//! default set covers attributes that point back up the scene (channels,
//! control groups, parent overrides) and bulk data nobody downstream reads.

use std::collections::HashSet;

/// Default recursion denylist.
pub const DEFAULT_DENYLIST: &[&str] = &[
    // Re-enter the scene
    "trackGroups",
    "scene",
    "positionChannel",
    "orientationChannel",
    "presetGroups",
    "rootControlGroup",
    "channel",
    "phonememap",
    "rightValueChannel",
    "leftValueChannel",
    "rightvaluechannel",
    "leftvaluechannel",
    "flexnames",
    "flexWeights",
    "controls",
    "bones",
    "overrideParent",
    // Bulk/internal
    "bookmarkSets",
    "activeMonitor",
    "aviFile",
    "displayScale",
    "mapname",
    "info",
    "operators",
    "log",
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Denylist {
    names: HashSet<String>,
}

impl Default for Denylist {
    fn default() -> Self {
        DEFAULT_DENYLIST.iter().copied().collect()
    }
}

impl Denylist {
    /// Denylist that blocks nothing.
    pub fn empty() -> Self {
        Self {
            names: HashSet::new(),
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.names.contains(name)
    }

    pub fn insert(&mut self, name: impl Into<String>) -> bool {
        self.names.insert(name.into())
    }

    pub fn remove(&mut self, name: &str) -> bool {
        self.names.remove(name)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Names in sorted order (for logs and diagnostics)
    pub fn sorted(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.names.iter().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

impl<S: Into<String>> FromIterator<S> for Denylist {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self {
            names: iter.into_iter().map(Into::into).collect(),
        }
    }
}

impl<S: Into<String>> Extend<S> for Denylist {
    fn extend<I: IntoIterator<Item = S>>(&mut self, iter: I) {
        self.names.extend(iter.into_iter().map(Into::into));
    }
}
