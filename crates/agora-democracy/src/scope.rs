//! Scope containment tree.
//!
//! An immutable snapshot of the scope hierarchy (instance → topic →
//! sub-topic). Containment is reflexive: every scope contains itself.

use std::collections::HashMap;

use agora_core::entities::Scope;

use crate::error::DemocracyError;

#[derive(Debug, Clone, Default)]
pub struct ScopeTree {
    parents: HashMap<String, Option<String>>,
    depths: HashMap<String, usize>,
}

impl ScopeTree {
    /// Build a tree from `(id, parent)` pairs.
    ///
    /// # Errors
    ///
    /// Returns `DemocracyError::InvalidScope` if a parent is unknown or the
    /// parent links contain a cycle.
    pub fn new<I, S>(links: I) -> Result<Self, DemocracyError>
    where
        I: IntoIterator<Item = (S, Option<S>)>,
        S: Into<String>,
    {
        let parents: HashMap<String, Option<String>> = links
            .into_iter()
            .map(|(id, parent)| (id.into(), parent.map(Into::into)))
            .collect();

        for (id, parent) in &parents {
            if let Some(parent) = parent
                && !parents.contains_key(parent)
            {
                return Err(DemocracyError::InvalidScope(format!(
                    "{id} has unknown parent {parent}"
                )));
            }
        }

        let mut depths: HashMap<String, usize> = HashMap::with_capacity(parents.len());
        for id in parents.keys() {
            if depths.contains_key(id) {
                continue;
            }
            // Climb until a root or an already-measured scope, then assign
            // depths on the way back down.
            let mut path: Vec<&str> = Vec::new();
            let mut cursor = Some(id.as_str());
            let base = loop {
                let Some(current) = cursor else { break None };
                if let Some(&depth) = depths.get(current) {
                    break Some(depth);
                }
                if path.contains(&current) {
                    return Err(DemocracyError::InvalidScope(format!(
                        "cycle in scope tree at {current}"
                    )));
                }
                path.push(current);
                cursor = parents.get(current).and_then(Option::as_deref);
            };
            let mut depth = base.map_or(0, |d| d + 1);
            for scope in path.iter().rev() {
                depths.insert((*scope).to_string(), depth);
                depth += 1;
            }
        }

        Ok(Self { parents, depths })
    }

    /// Build a tree from stored scopes.
    ///
    /// # Errors
    ///
    /// Same as [`Self::new`].
    pub fn from_scopes<'a>(scopes: impl IntoIterator<Item = &'a Scope>) -> Result<Self, DemocracyError> {
        Self::new(
            scopes
                .into_iter()
                .map(|s| (s.id.as_str(), s.parent_id.as_deref())),
        )
    }

    #[must_use]
    pub fn has(&self, scope: &str) -> bool {
        self.parents.contains_key(scope)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.parents.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.parents.is_empty()
    }

    fn check(&self, scope: &str) -> Result<(), DemocracyError> {
        if self.has(scope) {
            Ok(())
        } else {
            Err(DemocracyError::InvalidScope(format!("unknown scope {scope}")))
        }
    }

    /// Depth in the tree; roots have depth 0. Deeper scopes are more specific.
    ///
    /// # Errors
    ///
    /// Returns `DemocracyError::InvalidScope` for an unknown scope.
    pub fn specificity(&self, scope: &str) -> Result<usize, DemocracyError> {
        self.depths
            .get(scope)
            .copied()
            .ok_or_else(|| DemocracyError::InvalidScope(format!("unknown scope {scope}")))
    }

    /// True iff `inner` is `outer` or a descendant of it.
    ///
    /// # Errors
    ///
    /// Returns `DemocracyError::InvalidScope` if either scope is unknown.
    pub fn contains(&self, outer: &str, inner: &str) -> Result<bool, DemocracyError> {
        self.check(outer)?;
        let outer_depth = self.specificity(outer)?;
        let inner_depth = self.specificity(inner)?;
        if outer_depth > inner_depth {
            return Ok(false);
        }
        let mut cursor = inner;
        for _ in 0..(inner_depth - outer_depth) {
            cursor = self.parent(cursor).unwrap_or(cursor);
        }
        Ok(cursor == outer)
    }

    fn parent(&self, scope: &str) -> Option<&str> {
        self.parents.get(scope).and_then(Option::as_deref)
    }

    /// `scope` followed by each ancestor up to the root.
    ///
    /// # Errors
    ///
    /// Returns `DemocracyError::InvalidScope` for an unknown scope.
    pub fn ancestors<'a>(&'a self, scope: &'a str) -> Result<Vec<&'a str>, DemocracyError> {
        self.check(scope)?;
        let mut out = vec![scope];
        let mut cursor = scope;
        while let Some(parent) = self.parent(cursor) {
            out.push(parent);
            cursor = parent;
        }
        Ok(out)
    }

    /// The instance (root) scope that `scope` belongs to.
    ///
    /// # Errors
    ///
    /// Returns `DemocracyError::InvalidScope` for an unknown scope.
    pub fn root_of<'a>(&'a self, scope: &'a str) -> Result<&'a str, DemocracyError> {
        let path = self.ancestors(scope)?;
        Ok(path.last().copied().unwrap_or(scope))
    }
}
