//! Dependency descriptors
//!
//! A [`Dependency`] names an ordered list of candidate tokens, an optional
//! scope to resolve them in and an optional default. It is attached to a
//! factory [`Parameter`](crate::Parameter) or wrapped in an [`Inject`] handle.

use crate::{DiError, Injector, Instance, Result, Token, context};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::marker::PhantomData;
use std::sync::Arc;

#[cfg(feature = "logging")]
use tracing::trace;

/// Fallback used when no candidate of a [`Dependency`] resolves.
///
/// A value is returned as is; a factory is called each time the fallback is
/// needed.
#[derive(Clone)]
pub enum DefaultValue {
    Value(Instance),
    Factory(Arc<dyn Fn() -> Instance + Send + Sync>),
}

impl DefaultValue {
    pub fn value<T: Send + Sync + 'static>(value: T) -> Self {
        Self::Value(Arc::new(value))
    }

    pub fn factory<T, F>(producer: F) -> Self
    where
        T: Send + Sync + 'static,
        F: Fn() -> T + Send + Sync + 'static,
    {
        Self::Factory(Arc::new(move || Arc::new(producer()) as Instance))
    }

    #[inline]
    pub fn produce(&self) -> Instance {
        match self {
            Self::Value(value) => Arc::clone(value),
            Self::Factory(producer) => producer(),
        }
    }
}

impl fmt::Debug for DefaultValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Value(_) => f.write_str("DefaultValue::Value(..)"),
            Self::Factory(_) => f.write_str("DefaultValue::Factory(..)"),
        }
    }
}

/// Declarative dependency on one of several tokens.
///
/// # Example
///
/// ```rust
/// use djx::{Dependency, Registry, Token};
/// use std::sync::Arc;
///
/// let registry = Arc::new(Registry::new());
/// registry.provide("b").value(2u32).register().unwrap();
/// let injector = registry.injector("main").unwrap();
///
/// let dep = Dependency::new("a").or("b");
/// let value = dep.resolve_as::<u32>(&injector).unwrap();
/// assert_eq!(*value, 2);
///
/// let fallback = Dependency::new("a").default_value(9u32);
/// assert_eq!(*fallback.resolve_as::<u32>(&injector).unwrap(), 9);
/// ```
#[derive(Clone)]
pub struct Dependency {
    deps: Arc<[Token]>,
    scope: Option<Arc<str>>,
    default: Option<DefaultValue>,
}

impl Dependency {
    /// Depend on a single token.
    pub fn new(token: impl Into<Token>) -> Self {
        Self::any_of([token.into()])
    }

    /// Depend on the type `T`.
    #[inline]
    pub fn of<T: ?Sized + 'static>() -> Self {
        Self::new(Token::of::<T>())
    }

    /// Depend on the first of `tokens` that resolves.
    pub fn any_of<I, T>(tokens: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<Token>,
    {
        Self {
            deps: tokens.into_iter().map(Into::into).collect(),
            scope: None,
            default: None,
        }
    }

    /// Append a fallback candidate.
    pub fn or(mut self, token: impl Into<Token>) -> Self {
        let mut deps = self.deps.to_vec();
        deps.push(token.into());
        self.deps = deps.into();
        self
    }

    /// Replace the candidate list.
    pub fn candidates<I, T>(mut self, tokens: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<Token>,
    {
        self.deps = tokens.into_iter().map(Into::into).collect();
        self
    }

    /// Resolve the candidates in the nearest injector of scope `name`.
    pub fn scope(mut self, name: impl Into<Arc<str>>) -> Self {
        self.scope = Some(name.into());
        self
    }

    pub fn default_value<T: Send + Sync + 'static>(mut self, value: T) -> Self {
        self.default = Some(DefaultValue::value(value));
        self
    }

    pub fn default_with<T, F>(mut self, producer: F) -> Self
    where
        T: Send + Sync + 'static,
        F: Fn() -> T + Send + Sync + 'static,
    {
        self.default = Some(DefaultValue::factory(producer));
        self
    }

    #[inline]
    pub fn deps(&self) -> &[Token] {
        &self.deps
    }

    /// Scope name the candidates are resolved in (`any` when unpinned).
    #[inline]
    pub fn scope_name(&self) -> &str {
        self.scope.as_deref().unwrap_or(crate::scope::ANY)
    }

    #[inline]
    pub fn has_default(&self) -> bool {
        self.default.is_some()
    }

    /// Resolve against `injector`.
    ///
    /// Candidates failing with a lookup error are skipped; any other error
    /// is returned immediately. An inactive pinned scope counts as no
    /// candidate resolving.
    pub fn resolve(&self, injector: &Injector) -> Result<Instance> {
        if let Some(target) = injector.at(self.scope_name()) {
            for token in self.deps.iter() {
                match target.resolve(token) {
                    Ok(value) => return Ok(value),
                    Err(err) if err.is_lookup() => {
                        #[cfg(feature = "logging")]
                        trace!(
                            target: "djx",
                            token = %token,
                            "Dependency candidate not resolved, trying next"
                        );
                    }
                    Err(err) => return Err(err),
                }
            }
        }

        match &self.default {
            Some(default) => Ok(default.produce()),
            None => Err(DiError::Unresolved {
                candidates: self
                    .deps
                    .iter()
                    .map(Token::name)
                    .collect::<Vec<_>>()
                    .join(", "),
            }),
        }
    }

    /// Resolve and downcast to `T`.
    pub fn resolve_as<T: Send + Sync + 'static>(&self, injector: &Injector) -> Result<Arc<T>> {
        self.resolve(injector)?
            .downcast::<T>()
            .map_err(|_| DiError::type_mismatch::<T>(self))
    }
}

impl PartialEq for Dependency {
    fn eq(&self, other: &Self) -> bool {
        self.scope_name() == other.scope_name() && self.deps == other.deps
    }
}

impl Eq for Dependency {}

impl Hash for Dependency {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.scope_name().hash(state);
        self.deps.hash(state);
    }
}

impl fmt::Display for Dependency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Dependency[")?;
        for (i, token) in self.deps.iter().enumerate() {
            if i > 0 {
                f.write_str(" | ")?;
            }
            write!(f, "{token}")?;
        }
        if let Some(scope) = &self.scope {
            write!(f, " @ {scope}")?;
        }
        f.write_str("]")
    }
}

impl fmt::Debug for Dependency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dependency")
            .field("deps", &self.deps)
            .field("scope", &self.scope_name())
            .field("default", &self.default)
            .finish()
    }
}

impl From<Token> for Dependency {
    #[inline]
    fn from(token: Token) -> Self {
        Self::new(token)
    }
}

impl From<&str> for Dependency {
    #[inline]
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

/// Dependency on the type `T`; refine with the builder methods.
///
/// ```rust
/// use djx::depends;
///
/// struct Database;
/// let dep = depends::<Database>().scope("main");
/// assert_eq!(dep.scope_name(), "main");
/// ```
#[inline]
pub fn depends<T: ?Sized + 'static>() -> Dependency {
    Dependency::of::<T>()
}

/// Lazy handle resolving a dependency against the active injector.
///
/// ```rust
/// use djx::{Inject, Registry};
/// use std::sync::Arc;
///
/// let registry = Arc::new(Registry::new());
/// registry.provide("port").value(8080u16).register().unwrap();
/// let injector = registry.injector("main").unwrap();
///
/// let port: Inject<u16> = Inject::new("port");
/// assert!(port.get().is_err());
///
/// let _active = injector.activate();
/// assert_eq!(*port.get().unwrap(), 8080);
/// ```
pub struct Inject<T> {
    dependency: Dependency,
    _marker: PhantomData<fn() -> T>,
}

impl<T: Send + Sync + 'static> Inject<T> {
    pub fn new(dependency: impl Into<Dependency>) -> Self {
        Self {
            dependency: dependency.into(),
            _marker: PhantomData,
        }
    }

    /// Inject the type `T` itself.
    pub fn of() -> Self {
        Self::new(Dependency::of::<T>())
    }

    #[inline]
    pub fn dependency(&self) -> &Dependency {
        &self.dependency
    }

    /// Resolve against the current active injector.
    pub fn get(&self) -> Result<Arc<T>> {
        let injector = context::current().ok_or(DiError::NoActiveInjector)?;
        self.dependency.resolve_as::<T>(&injector)
    }
}

impl<T> Clone for Inject<T> {
    fn clone(&self) -> Self {
        Self {
            dependency: self.dependency.clone(),
            _marker: PhantomData,
        }
    }
}

impl<T> fmt::Debug for Inject<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Inject").field(&self.dependency).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Registry;

    #[derive(Debug, PartialEq)]
    struct Database(&'static str);

    fn registry() -> Arc<Registry> {
        let registry = Arc::new(Registry::new());
        registry
            .provide(Token::of::<Database>())
            .value(Database("main"))
            .register()
            .unwrap();
        registry
    }

    #[test]
    fn test_first_resolving_candidate_wins() {
        let registry = registry();
        registry.provide("b").value(2u32).register().unwrap();
        registry.provide("c").value(3u32).register().unwrap();
        let inj = registry.injector("main").unwrap();

        let dep = Dependency::any_of(["a", "b", "c"]);
        assert_eq!(*dep.resolve_as::<u32>(&inj).unwrap(), 2);
    }

    #[test]
    fn test_unresolved_without_default() {
        let inj = registry().injector("main").unwrap();
        let err = Dependency::any_of(["x", "y"]).resolve(&inj).unwrap_err();
        match err {
            DiError::Unresolved { candidates } => assert_eq!(candidates, "x, y"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_default_factory_runs_per_fallback() {
        let inj = registry().injector("main").unwrap();
        let dep = Dependency::new("missing").default_with(|| vec![1u8]);
        let a = dep.resolve_as::<Vec<u8>>(&inj).unwrap();
        let b = dep.resolve_as::<Vec<u8>>(&inj).unwrap();
        assert_eq!(*a, vec![1]);
        assert!(!Arc::ptr_eq(&a, &b));
    }

    #[test]
    fn test_inactive_scope_uses_default() {
        let inj = registry().injector("main").unwrap();
        let dep = depends::<Database>().scope("request").default_value(Database("fallback"));
        assert_eq!(*dep.resolve_as::<Database>(&inj).unwrap(), Database("fallback"));

        let pinned = depends::<Database>().scope("main");
        assert_eq!(*pinned.resolve_as::<Database>(&inj).unwrap(), Database("main"));
    }

    #[test]
    fn test_non_lookup_errors_propagate() {
        let registry = registry();
        registry
            .provide("broken")
            .factory(crate::Factory::try_new(|| -> Result<u8> {
                Err(DiError::creation_failed("broken", "boom"))
            }))
            .register()
            .unwrap();
        let inj = registry.injector("main").unwrap();
        let dep = Dependency::new("broken").default_value(0u8);
        assert!(matches!(dep.resolve(&inj), Err(DiError::CreationFailed { .. })));
    }

    #[test]
    fn test_equality_ignores_default() {
        let a = Dependency::new("a").default_value(1u8);
        let b = Dependency::new("a");
        assert_eq!(a, b);
        assert_ne!(a, Dependency::new("a").scope("request"));
        assert_eq!(Dependency::new("a"), Dependency::new("a").scope("any"));
    }

    #[test]
    fn test_inject_requires_active_injector() {
        let inj = registry().injector("main").unwrap();
        let db: Inject<Database> = Inject::of();
        assert!(matches!(db.get(), Err(DiError::NoActiveInjector)));

        let _active = inj.activate();
        assert_eq!(*db.get().unwrap(), Database("main"));
    }
}
