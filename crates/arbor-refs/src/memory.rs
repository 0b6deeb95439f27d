//! In-memory reference store for testing and ephemeral use.
//!
//! [`InMemoryRefStore`] keeps HEAD and every ref in maps protected by a
//! `RwLock`. It implements the full [`RefStore`] trait and is what the unit
//! tests of the resolver run against.

use std::collections::{BTreeMap, HashMap};
use std::sync::RwLock;

use arbor_types::ObjectId;
use tracing::info;

use crate::error::{RefError, RefResult};
use crate::names::{validate_branch_name, validate_tag_name};
use crate::traits::RefStore;
use crate::types::{Head, RefKind};

/// An in-memory implementation of [`RefStore`].
///
/// Data is lost when the store is dropped.
#[derive(Debug, Default)]
pub struct InMemoryRefStore {
    refs: RwLock<HashMap<RefKind, BTreeMap<String, String>>>,
    head: RwLock<Option<String>>,
}

impl InMemoryRefStore {
    /// Create a new empty ref store.
    pub fn new() -> Self {
        Self::default()
    }

    /// A store laid out like a freshly initialised repository: HEAD names
    /// `master`, which exists but has no commits.
    pub fn initialised() -> RefResult<Self> {
        let store = Self::new();
        store.write_ref(RefKind::Branch, "master", None)?;
        store.write_head(&Head::Symbolic("master".into()))?;
        Ok(store)
    }

    /// Store raw HEAD text, bypassing [`Head`] parsing.
    pub fn set_head_raw(&self, contents: &str) -> RefResult<()> {
        let mut head = self.head.write().map_err(poisoned)?;
        *head = Some(contents.to_string());
        Ok(())
    }

    /// Store raw ref text without validating either the name or the value.
    pub fn set_ref_raw(&self, kind: RefKind, name: &str, contents: &str) -> RefResult<()> {
        let mut refs = self.refs.write().map_err(poisoned)?;
        refs.entry(kind)
            .or_default()
            .insert(name.to_string(), contents.to_string());
        Ok(())
    }
}

fn poisoned<E: std::fmt::Display>(e: E) -> RefError {
    RefError::Poisoned(e.to_string())
}

impl RefStore for InMemoryRefStore {
    fn read_head(&self) -> RefResult<Option<String>> {
        let head = self.head.read().map_err(poisoned)?;
        Ok(head.as_ref().map(|s| s.trim().to_string()))
    }

    fn write_head(&self, head: &Head) -> RefResult<()> {
        if let Head::Symbolic(branch) = head {
            validate_branch_name(branch)?;
        }
        self.set_head_raw(&head.contents())?;
        info!(head = %head.contents(), "HEAD updated");
        Ok(())
    }

    fn read_ref(&self, kind: RefKind, name: &str) -> RefResult<Option<String>> {
        let refs = self.refs.read().map_err(poisoned)?;
        Ok(refs
            .get(&kind)
            .and_then(|names| names.get(name))
            .map(|s| s.trim().to_string()))
    }

    fn write_ref(&self, kind: RefKind, name: &str, target: Option<&ObjectId>) -> RefResult<()> {
        match kind {
            RefKind::Branch => validate_branch_name(name)?,
            RefKind::Tag => validate_tag_name(name)?,
        }
        let contents = target.map(ObjectId::to_hex).unwrap_or_default();
        self.set_ref_raw(kind, name, &contents)?;
        info!(%kind, name, target = %contents, "ref updated");
        Ok(())
    }

    fn list_refs(&self, kind: RefKind) -> RefResult<Vec<String>> {
        let refs = self.refs.read().map_err(poisoned)?;
        Ok(refs
            .get(&kind)
            .map(|names| names.keys().cloned().collect())
            .unwrap_or_default())
    }
}
