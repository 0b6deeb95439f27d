//! Classification of the difference between two path sets.
//!
//! Given `old` and `new`, the changed entries are those in exactly one side:
//!
//! ```text
//! changed   = (old ∪ new) − (old ∩ new)
//! modified  = changed entries grouped by path, groups of two or more
//! renamed   = remaining changed entries grouped by id, groups of two or more
//! added     = new − old − modified − renamed
//! removed   = old − new − modified − renamed
//! unchanged = old ∩ new
//! ```
//!
//! Path grouping runs first, so an entry that is both a path match and a
//! content match counts as modified.

use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::fmt;

use arbor_types::ObjectId;

/// A blob at a `/`-separated path.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PathEntry {
    pub path: String,
    pub id: ObjectId,
}

impl PathEntry {
    pub fn new(path: impl Into<String>, id: ObjectId) -> Self {
        Self {
            path: path.into(),
            id,
        }
    }
}

/// One classified difference.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Change {
    Added {
        path: String,
        id: ObjectId,
    },
    Removed {
        path: String,
        id: ObjectId,
    },
    Modified {
        path: String,
        from: ObjectId,
        to: ObjectId,
    },
    Renamed {
        from: String,
        to: String,
        id: ObjectId,
    },
}

impl Change {
    /// The path a change is listed under. Renames list under the new path.
    pub fn path(&self) -> &str {
        match self {
            Change::Added { path, .. }
            | Change::Removed { path, .. }
            | Change::Modified { path, .. } => path,
            Change::Renamed { to, .. } => to,
        }
    }

    /// One-letter status, as printed by `diff`.
    pub fn status(&self) -> char {
        match self {
            Change::Added { .. } => 'A',
            Change::Removed { .. } => 'D',
            Change::Modified { .. } => 'M',
            Change::Renamed { .. } => 'R',
        }
    }
}

impl fmt::Display for Change {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Change::Renamed { from, to, .. } => write!(f, "{}\t{from} -> {to}", self.status()),
            other => write!(f, "{}\t{}", other.status(), other.path()),
        }
    }
}

/// The classified difference between an old and a new path set.
///
/// The four change classes are pairwise disjoint, and together with
/// `unchanged` they cover `old ∪ new` exactly.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ChangeSet {
    pub added: BTreeSet<PathEntry>,
    pub removed: BTreeSet<PathEntry>,
    /// Changed entries sharing a path, keyed by that path.
    pub modified: BTreeMap<String, BTreeSet<PathEntry>>,
    /// Changed entries sharing content but not a path, keyed by content id.
    pub renamed: BTreeMap<ObjectId, BTreeSet<PathEntry>>,
    pub unchanged: BTreeSet<PathEntry>,
    /// Changed entries that came from the old side.
    before: BTreeSet<PathEntry>,
}

impl ChangeSet {
    /// Classify the difference between `old` and `new`.
    pub fn between(old: &HashSet<PathEntry>, new: &HashSet<PathEntry>) -> Self {
        let before: BTreeSet<PathEntry> = old.difference(new).cloned().collect();
        let after: BTreeSet<PathEntry> = new.difference(old).cloned().collect();
        let unchanged: BTreeSet<PathEntry> = old.intersection(new).cloned().collect();

        let changed: BTreeSet<&PathEntry> = before.iter().chain(after.iter()).collect();

        let modified = groups_of_two_or_more(changed.iter().copied(), |e| e.path.clone());
        let in_modified: HashSet<&PathEntry> = modified.values().flatten().collect();

        let renamed = groups_of_two_or_more(
            changed.iter().copied().filter(|e| !in_modified.contains(e)),
            |e| e.id,
        );
        let in_renamed: HashSet<&PathEntry> = renamed.values().flatten().collect();

        let unclaimed = |e: &&PathEntry| !in_modified.contains(e) && !in_renamed.contains(e);
        let added = after.iter().filter(unclaimed).cloned().collect();
        let removed = before.iter().filter(unclaimed).cloned().collect();

        Self {
            added,
            removed,
            modified,
            renamed,
            unchanged,
            before,
        }
    }

    /// `true` if nothing changed.
    pub fn is_empty(&self) -> bool {
        self.added.is_empty()
            && self.removed.is_empty()
            && self.modified.is_empty()
            && self.renamed.is_empty()
    }

    /// Render the classes as individual changes, sorted by path.
    ///
    /// Within a modified or renamed group, old-side members are paired with
    /// new-side members in order. Members left without a partner (a file
    /// copied to two new paths, say) are listed as added or removed.
    pub fn changes(&self) -> Vec<Change> {
        let mut changes = Vec::new();

        for entry in &self.added {
            changes.push(Change::Added {
                path: entry.path.clone(),
                id: entry.id,
            });
        }
        for entry in &self.removed {
            changes.push(Change::Removed {
                path: entry.path.clone(),
                id: entry.id,
            });
        }
        for group in self.modified.values() {
            self.pair_up(group, &mut changes, |from, to| Change::Modified {
                path: to.path.clone(),
                from: from.id,
                to: to.id,
            });
        }
        for group in self.renamed.values() {
            self.pair_up(group, &mut changes, |from, to| Change::Renamed {
                from: from.path.clone(),
                to: to.path.clone(),
                id: to.id,
            });
        }

        changes.sort_by(|a, b| a.path().cmp(b.path()).then(a.status().cmp(&b.status())));
        changes
    }

    fn pair_up(
        &self,
        group: &BTreeSet<PathEntry>,
        changes: &mut Vec<Change>,
        pair: impl Fn(&PathEntry, &PathEntry) -> Change,
    ) {
        let (sources, targets): (Vec<&PathEntry>, Vec<&PathEntry>) =
            group.iter().partition(|e| self.before.contains(*e));
        let paired = sources.len().min(targets.len());

        for (from, to) in sources.iter().zip(&targets) {
            changes.push(pair(*from, *to));
        }
        for entry in &sources[paired..] {
            changes.push(Change::Removed {
                path: entry.path.clone(),
                id: entry.id,
            });
        }
        for entry in &targets[paired..] {
            changes.push(Change::Added {
                path: entry.path.clone(),
                id: entry.id,
            });
        }
    }
}

fn groups_of_two_or_more<'a, K: Ord>(
    entries: impl Iterator<Item = &'a PathEntry>,
    key: impl Fn(&PathEntry) -> K,
) -> BTreeMap<K, BTreeSet<PathEntry>> {
    let mut groups: BTreeMap<K, BTreeSet<PathEntry>> = BTreeMap::new();
    for entry in entries {
        groups.entry(key(entry)).or_default().insert(entry.clone());
    }
    groups.retain(|_, members| members.len() > 1);
    groups
}
