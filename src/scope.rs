//! Named scopes
//!
//! Scopes form a tree rooted at [`ANY`]. Each scope owns the provider table
//! of its partition; a provider registered in a scope is visible to
//! injectors of that scope and of every descendant.

use crate::{Provider, Token};
use ahash::RandomState;
use dashmap::DashMap;
use std::hash::Hash;
use std::sync::Arc;

/// Root scope, an ancestor of every other scope.
pub const ANY: &str = "any";
/// Application scope, the default for registrations.
pub const MAIN: &str = "main";
/// Per-request scope.
pub const REQUEST: &str = "request";

/// Concurrent table used for provider and binding maps.
///
/// 8 shards: DI tables are small and created per injector, so creation cost
/// matters more than write concurrency.
#[inline]
pub(crate) fn table<K: Eq + Hash, V>() -> DashMap<K, V, RandomState> {
    DashMap::with_capacity_and_hasher_and_shard_amount(0, RandomState::new(), 8)
}

/// A node of the scope tree with its provider table.
pub struct Scope {
    name: Arc<str>,
    parent: Option<Arc<Scope>>,
    depth: u32,
    providers: DashMap<Token, Arc<Provider>, RandomState>,
}

impl Scope {
    /// Create the root scope.
    pub fn root(name: impl Into<Arc<str>>) -> Self {
        Self {
            name: name.into(),
            parent: None,
            depth: 0,
            providers: table(),
        }
    }

    /// Create a child of `parent`.
    pub fn child(name: impl Into<Arc<str>>, parent: &Arc<Scope>) -> Self {
        Self {
            name: name.into(),
            parent: Some(Arc::clone(parent)),
            depth: parent.depth + 1,
            providers: table(),
        }
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub(crate) fn name_arc(&self) -> &Arc<str> {
        &self.name
    }

    #[inline]
    pub fn parent(&self) -> Option<&Arc<Scope>> {
        self.parent.as_ref()
    }

    /// Distance from the root.
    #[inline]
    pub fn depth(&self) -> u32 {
        self.depth
    }

    /// Insert `provider`, replacing any earlier one for the same token.
    pub fn register_provider(&self, provider: Arc<Provider>) -> Option<Arc<Provider>> {
        self.providers.insert(provider.token().clone(), provider)
    }

    /// Provider registered for `token` in this scope only.
    #[inline]
    pub fn provider(&self, token: &Token) -> Option<Arc<Provider>> {
        self.providers.get(token).map(|p| Arc::clone(p.value()))
    }

    #[inline]
    pub fn contains(&self, token: &Token) -> bool {
        self.providers.contains_key(token)
    }

    /// Providers of this scope ordered by priority, token and creation order.
    pub fn providers(&self) -> Vec<Arc<Provider>> {
        let mut providers: Vec<_> = self.providers.iter().map(|p| Arc::clone(p.value())).collect();
        providers.sort_by(|a, b| a.sort_key().cmp(&b.sort_key()));
        providers
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.providers.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }

    /// This scope followed by its ancestors up to the root.
    pub fn ancestors(self: &Arc<Self>) -> impl Iterator<Item = Arc<Scope>> {
        std::iter::successors(Some(Arc::clone(self)), |s| s.parent.clone())
    }

    /// Whether `name` is this scope or one of its ancestors.
    pub fn is_descendant_of(&self, name: &str) -> bool {
        let mut current = Some(self);
        while let Some(scope) = current {
            if &*scope.name == name {
                return true;
            }
            current = scope.parent.as_deref();
        }
        false
    }
}

impl std::fmt::Debug for Scope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scope")
            .field("name", &self.name)
            .field("parent", &self.parent.as_ref().map(|p| p.name()))
            .field("depth", &self.depth)
            .field("providers", &self.providers.len())
            .finish()
    }
}

impl std::fmt::Display for Scope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.name)
    }
}
