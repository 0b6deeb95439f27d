//! Resolution of references to commit ids.
//!
//! Resolution is a small state machine over [`Reference`]. Each
//! [`Resolver::step`] either classifies raw text or follows one level of
//! indirection:
//!
//! ```text
//! "master"            -> Branch("master")
//! Branch("master")    -> Commit(<contents of refs/heads/master>)
//! "HEAD"              -> Head -> Unknown("refs/heads/master") -> ...
//! Commit("0fd0bc")    -> Commit("0fd0bcfb44f83e7d5ac7a8922578276b9af48746")
//! ```
//!
//! A full 40 digit commit id is terminal. A step that finds nothing ends
//! resolution with no result, which is how "no commits yet" is reported.

use std::fmt;

use arbor_store::ObjectStore;
use arbor_types::{is_hex_prefix, ObjectId, ID_HEX_LEN, MIN_PREFIX_LEN};
use tracing::{debug, warn};

use crate::error::{ResolveError, ResolveResult};
use crate::traits::RefStore;
use crate::types::{RefKind, Reference};

/// Upper bound on steps before resolution gives up.
pub const MAX_STEPS: usize = 16;

/// Non-fatal findings collected during resolution.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ResolveWarning {
    /// A partial id matched several objects; the first in sorted order won.
    Ambiguous {
        prefix: String,
        candidates: Vec<ObjectId>,
        chosen: ObjectId,
    },
}

impl fmt::Display for ResolveWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResolveWarning::Ambiguous {
                prefix,
                candidates,
                chosen,
            } => write!(
                f,
                "ambiguous ref {prefix}: {} candidates, using {chosen}",
                candidates.len()
            ),
        }
    }
}

/// Outcome of [`Resolver::resolve`].
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Resolution {
    /// The terminal reference, or `None` when nothing was found.
    pub reference: Option<Reference>,
    pub warnings: Vec<ResolveWarning>,
}

impl Resolution {
    /// The resolved commit id, if resolution reached one.
    pub fn commit_id(&self) -> Option<ObjectId> {
        self.reference.as_ref().and_then(Reference::commit_id)
    }

    pub fn is_ambiguous(&self) -> bool {
        self.warnings
            .iter()
            .any(|w| matches!(w, ResolveWarning::Ambiguous { .. }))
    }
}

/// Resolves references against a ref store and an object store.
pub struct Resolver<'a> {
    refs: &'a dyn RefStore,
    objects: &'a dyn ObjectStore,
}

impl<'a> Resolver<'a> {
    pub fn new(refs: &'a dyn RefStore, objects: &'a dyn ObjectStore) -> Self {
        Self { refs, objects }
    }

    /// Classify raw text without following it.
    ///
    /// `HEAD` is the head pointer, 6 to 40 hex digits are a commit id, and
    /// anything else is looked up as a branch or tag name. `Ok(None)` if
    /// no such ref exists.
    pub fn classify(&self, text: &str) -> ResolveResult<Option<Reference>> {
        if text == "HEAD" {
            return Ok(Some(Reference::Head));
        }
        if is_hex_prefix(text) {
            return Ok(Some(Reference::Commit(text.to_ascii_lowercase())));
        }
        self.classify_symbolic(text)
    }

    /// `refs/heads/x`, `heads/x`, `refs/tags/x`, `tags/x` or a bare `x`.
    /// A bare name is looked up among branches first, then tags.
    fn classify_symbolic(&self, text: &str) -> ResolveResult<Option<Reference>> {
        let parts: Vec<&str> = text
            .trim_matches('/')
            .splitn(3, '/')
            .filter(|p| !p.is_empty())
            .collect();
        let Some((&name, rest)) = parts.split_last() else {
            return Ok(None);
        };

        let kinds: &[RefKind] = match rest.last() {
            Some(&"heads") => &[RefKind::Branch],
            Some(&"tags") => &[RefKind::Tag],
            _ => &[RefKind::Branch, RefKind::Tag],
        };
        for &kind in kinds {
            if self.refs.has_ref(kind, name)? {
                return Ok(Some(kind.reference(name)));
            }
        }
        Ok(None)
    }

    /// Perform one resolution step.
    ///
    /// A full commit id steps to itself.
    pub fn step(&self, reference: &Reference) -> ResolveResult<Option<Reference>> {
        self.step_collecting(reference, &mut Vec::new())
    }

    fn step_collecting(
        &self,
        reference: &Reference,
        warnings: &mut Vec<ResolveWarning>,
    ) -> ResolveResult<Option<Reference>> {
        match reference {
            Reference::Unknown(text) => self.classify(text),
            Reference::Head => Ok(self.refs.read_head()?.map(Reference::Unknown)),
            Reference::Branch(name) => self.follow(RefKind::Branch, name),
            Reference::Tag(name) => self.follow(RefKind::Tag, name),
            Reference::Commit(id) => self.expand(id, warnings),
        }
    }

    /// Read a branch or tag. An empty ref has no commit yet.
    fn follow(&self, kind: RefKind, name: &str) -> ResolveResult<Option<Reference>> {
        Ok(self
            .refs
            .read_ref(kind, name)?
            .filter(|contents| !contents.is_empty())
            .map(|contents| Reference::Commit(contents.to_ascii_lowercase())))
    }

    fn expand(
        &self,
        id: &str,
        warnings: &mut Vec<ResolveWarning>,
    ) -> ResolveResult<Option<Reference>> {
        if id.len() < MIN_PREFIX_LEN || !id.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Ok(None);
        }
        if id.len() == ID_HEX_LEN {
            return Ok(Some(Reference::Commit(id.to_string())));
        }

        let candidates = self.objects.ids_with_prefix(id)?;
        let Some(&chosen) = candidates.first() else {
            debug!(prefix = id, "no object matches partial id");
            return Ok(None);
        };
        if candidates.len() > 1 {
            warn!(
                prefix = id,
                candidates = candidates.len(),
                %chosen,
                "ambiguous ref"
            );
            warnings.push(ResolveWarning::Ambiguous {
                prefix: id.to_string(),
                candidates,
                chosen,
            });
        }
        Ok(Some(Reference::Commit(chosen.to_hex())))
    }

    /// Step until a full commit id or a dead end.
    pub fn resolve(&self, reference: Reference) -> ResolveResult<Resolution> {
        let start = reference.to_string();
        let mut warnings = Vec::new();
        let mut current = reference;

        for _ in 0..MAX_STEPS {
            match self.step_collecting(&current, &mut warnings)? {
                None => {
                    debug!(%start, at = %current, "reference did not resolve");
                    return Ok(Resolution {
                        reference: None,
                        warnings,
                    });
                }
                Some(next) if next == current => {
                    debug!(%start, commit = %next, "reference resolved");
                    return Ok(Resolution {
                        reference: Some(next),
                        warnings,
                    });
                }
                Some(next) => current = next,
            }
        }
        Err(ResolveError::TooManySteps {
            start,
            steps: MAX_STEPS,
        })
    }

    /// Resolve raw text, as typed by a user.
    pub fn resolve_str(&self, text: &str) -> ResolveResult<Resolution> {
        self.resolve(Reference::unknown(text))
    }
}
