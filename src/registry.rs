//! Provider registry
//!
//! The [`Registry`] owns the scope tree, the set of provided tokens, the
//! creation-order counter and the lock flag. Providers are registered into
//! it during bootstrap; injectors are created from it afterwards.

use crate::scope::{self, ANY, MAIN, REQUEST, table};
use crate::{Concrete, DiError, Factory, Injectable, Injector, Provide, Provided, Provider, Result, Scope, Token};
use ahash::RandomState;
use dashmap::{DashMap, DashSet};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

#[cfg(feature = "logging")]
use tracing::debug;

/// Registry of scopes and their providers.
///
/// # Example
///
/// ```rust
/// use djx::{Registry, Token};
/// use std::sync::Arc;
///
/// let registry = Arc::new(Registry::new());
/// registry.provide("greeting").value(String::from("hello")).register().unwrap();
/// registry.alias("salutation", "greeting").unwrap();
///
/// let injector = registry.injector("main").unwrap();
/// let greeting = injector.get_as::<String>("salutation").unwrap();
/// assert_eq!(*greeting, "hello");
/// ```
pub struct Registry {
    scopes: DashMap<Arc<str>, Arc<Scope>, RandomState>,
    provided: DashSet<Token, RandomState>,
    order: AtomicU64,
    locked: AtomicBool,
    default_scope: Arc<str>,
}

impl Registry {
    /// Registry with the `any` -> `main` -> `request` scope chain and `main`
    /// as the default scope.
    pub fn new() -> Self {
        let registry = Self::empty(MAIN.into());
        let any = registry.insert_scope(Arc::new(Scope::root(ANY)));
        let main = registry.insert_scope(Arc::new(Scope::child(MAIN, &any)));
        registry.insert_scope(Arc::new(Scope::child(REQUEST, &main)));
        registry
    }

    /// Declare a custom scope tree.
    pub fn builder() -> RegistryBuilder {
        RegistryBuilder::default()
    }

    fn empty(default_scope: Arc<str>) -> Self {
        Self {
            scopes: table(),
            provided: DashSet::with_hasher(RandomState::new()),
            order: AtomicU64::new(0),
            locked: AtomicBool::new(false),
            default_scope,
        }
    }

    fn insert_scope(&self, scope: Arc<Scope>) -> Arc<Scope> {
        self.scopes.insert(Arc::clone(scope.name_arc()), Arc::clone(&scope));
        scope
    }

    /// Add a scope under `parent`.
    pub fn add_scope(&self, name: impl Into<Arc<str>>, parent: &str) -> Result<Arc<Scope>> {
        self.check_not_locked()?;
        let name = name.into();
        if self.scopes.contains_key(&name) {
            return Err(DiError::ScopeMismatch {
                scope: name.to_string(),
                from: parent.to_string(),
            });
        }
        let parent = self.scope(parent)?;

        #[cfg(feature = "logging")]
        debug!(
            target: "djx",
            scope = %name,
            parent = parent.name(),
            "Adding scope"
        );

        Ok(self.insert_scope(Arc::new(Scope::child(name, &parent))))
    }

    /// Scope by name.
    pub fn scope(&self, name: &str) -> Result<Arc<Scope>> {
        self.scopes
            .get(name)
            .map(|s| Arc::clone(s.value()))
            .ok_or_else(|| DiError::UnknownScope(name.to_string()))
    }

    #[inline]
    pub fn default_scope(&self) -> &str {
        &self.default_scope
    }

    /// Names of all declared scopes, root first.
    pub fn scope_names(&self) -> Vec<String> {
        let mut scopes: Vec<_> = self.scopes.iter().map(|s| Arc::clone(s.value())).collect();
        scopes.sort_by(|a, b| a.depth().cmp(&b.depth()).then_with(|| a.name().cmp(b.name())));
        scopes.into_iter().map(|s| s.name().to_string()).collect()
    }

    /// Start a provider registration for `token`.
    #[inline]
    pub fn provide(&self, token: impl Into<Token>) -> Provide<'_> {
        Provide::new(self, token.into())
    }

    /// Register `abstract_` as a late-bound alias of `target`.
    pub fn alias(&self, abstract_: impl Into<Token>, target: impl Into<Token>) -> Result<Provided> {
        self.provide(abstract_).alias(target).register()
    }

    /// Register `T` under its own type token, constructed from its signature.
    pub fn injectable<T: Injectable>(&self) -> Provide<'_> {
        self.provide(Token::of::<T>()).factory(Factory::injectable::<T>())
    }

    /// Validate and insert a single provider, replacing any earlier provider
    /// for the same token in the same scope.
    pub fn register_provider(&self, mut provider: Provider) -> Result<Arc<Provider>> {
        self.check_not_locked()?;
        provider.check(self)?;

        let scope = self.scope(provider.scope().unwrap_or(&self.default_scope))?;
        provider.assign(Arc::clone(scope.name_arc()), self.next_order());

        let provider = Arc::new(provider);
        self.provided.insert(provider.token().clone());
        let _replaced = scope.register_provider(Arc::clone(&provider));

        #[cfg(feature = "logging")]
        if _replaced.is_some() {
            debug!(
                target: "djx",
                token = %provider.token(),
                scope = scope.name(),
                "Provider replaced an earlier registration"
            );
        }

        Ok(provider)
    }

    /// Whether any scope has ever had a provider for `token`.
    #[inline]
    pub fn is_provided(&self, token: &Token) -> bool {
        self.provided.contains(token)
    }

    /// All providers of all scopes, in listing order.
    pub fn providers(&self) -> Vec<Arc<Provider>> {
        let mut providers: Vec<_> = self.scopes.iter().flat_map(|s| s.value().providers()).collect();
        providers.sort_by(|a, b| a.sort_key().cmp(&b.sort_key()));
        providers
    }

    /// Freeze registration. Lookups are unaffected.
    pub fn lock(&self) {
        #[cfg(feature = "logging")]
        debug!(target: "djx", providers = self.provided.len(), "Registry locked");

        self.locked.store(true, Ordering::Release);
    }

    #[inline]
    pub fn is_locked(&self) -> bool {
        self.locked.load(Ordering::Acquire)
    }

    #[inline]
    fn check_not_locked(&self) -> Result<()> {
        if self.is_locked() {
            Err(DiError::Locked)
        } else {
            Ok(())
        }
    }

    /// Next value of the creation-order counter.
    #[inline]
    pub fn next_order(&self) -> u64 {
        self.order.fetch_add(1, Ordering::Relaxed)
    }

    /// Create an injector activated for `scope`, with parent injectors for
    /// every ancestor scope.
    pub fn injector(self: &Arc<Self>, scope: &str) -> Result<Injector> {
        Injector::new(Arc::clone(self), scope)
    }

    /// Register a value provider keyed by the type `T`, in the default scope.
    pub fn provide_value<T: Send + Sync + 'static>(&self, value: T) -> Result<Arc<Provider>> {
        self.register_provider(Provider::new(Token::of::<T>(), Concrete::Value(Arc::new(value))))
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Registry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registry")
            .field("scopes", &self.scope_names())
            .field("provided", &self.provided.len())
            .field("default_scope", &self.default_scope)
            .field("locked", &self.is_locked())
            .finish()
    }
}

/// Declares the scope tree of a [`Registry`].
///
/// The root is always [`scope::ANY`]; scopes must be declared after their
/// parent.
///
/// ```rust
/// use djx::Registry;
///
/// let registry = Registry::builder()
///     .scope("app", "any")
///     .scope("session", "app")
///     .scope("request", "session")
///     .default_scope("app")
///     .build()
///     .unwrap();
/// assert_eq!(registry.default_scope(), "app");
/// assert_eq!(registry.scope("request").unwrap().depth(), 3);
/// ```
#[derive(Debug, Default)]
pub struct RegistryBuilder {
    scopes: Vec<(String, String)>,
    default_scope: Option<String>,
}

impl RegistryBuilder {
    pub fn scope(mut self, name: impl Into<String>, parent: impl Into<String>) -> Self {
        self.scopes.push((name.into(), parent.into()));
        self
    }

    pub fn default_scope(mut self, name: impl Into<String>) -> Self {
        self.default_scope = Some(name.into());
        self
    }

    /// Build the registry. Unknown parents or default scope fail with
    /// [`DiError::UnknownScope`].
    pub fn build(self) -> Result<Registry> {
        let default_scope = self.default_scope.unwrap_or_else(|| {
            self.scopes
                .first()
                .map(|(name, _)| name.clone())
                .unwrap_or_else(|| scope::ANY.to_string())
        });

        let registry = Registry::empty(default_scope.as_str().into());
        registry.insert_scope(Arc::new(Scope::root(ANY)));
        for (name, parent) in self.scopes {
            registry.add_scope(name, &parent)?;
        }
        registry.scope(&default_scope)?;
        Ok(registry)
    }
}
