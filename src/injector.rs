//! Injectors
//!
//! An [`Injector`] is the live activation of a scope. It binds providers of
//! its scope on first lookup, keeps their cached instances, and delegates
//! anything its scope does not provide to the parent injector.

use crate::context::{self, ActiveInjector, ResolutionGuard};
use crate::scope::{ANY, table};
use crate::{Arguments, Binding, DiError, Instance, Registry, Result, Scope, Token};
use ahash::RandomState;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use std::sync::Arc;

#[cfg(feature = "logging")]
use tracing::{debug, trace};

struct InjectorInner {
    registry: Arc<Registry>,
    scope: Arc<Scope>,
    parent: Option<Injector>,
    bindings: DashMap<Token, Arc<Binding>, RandomState>,
}

/// Live injector for one scope. Cloning is cheap and shares bindings.
///
/// # Examples
///
/// ```rust
/// use djx::{Factory, Registry};
/// use std::sync::Arc;
///
/// let registry = Arc::new(Registry::new());
/// registry
///     .provide("config")
///     .factory(Factory::new(|| vec![String::from("debug")]))
///     .cache(true)
///     .register()
///     .unwrap();
///
/// let main = registry.injector("main").unwrap();
/// let a = main.get_as::<Vec<String>>("config").unwrap();
///
/// // request injectors share main's cached instance
/// let request = main.enter("request").unwrap();
/// let b = request.get_as::<Vec<String>>("config").unwrap();
/// assert!(Arc::ptr_eq(&a, &b));
/// ```
#[derive(Clone)]
pub struct Injector {
    inner: Arc<InjectorInner>,
}

impl Injector {
    /// Injector for `scope` with a parent injector per ancestor scope.
    pub fn new(registry: Arc<Registry>, scope: &str) -> Result<Self> {
        let scope = registry.scope(scope)?;
        let mut chain: Vec<Arc<Scope>> = scope.ancestors().collect();
        chain.reverse();

        let mut current: Option<Injector> = None;
        for scope in chain {
            current = Some(Self::with_parent(Arc::clone(&registry), scope, current));
        }
        current.ok_or_else(|| DiError::UnknownScope(scope.name().to_string()))
    }

    fn with_parent(registry: Arc<Registry>, scope: Arc<Scope>, parent: Option<Injector>) -> Self {
        #[cfg(feature = "logging")]
        debug!(
            target: "djx",
            scope = scope.name(),
            parent = parent.as_ref().map(|p| p.scope_name()),
            "Creating injector"
        );

        Self {
            inner: Arc::new(InjectorInner {
                registry,
                scope,
                parent,
                bindings: table(),
            }),
        }
    }

    /// Child injector for a descendant `scope`, with intermediate injectors
    /// for any scopes in between.
    pub fn enter(&self, scope: &str) -> Result<Injector> {
        let target = self.inner.registry.scope(scope)?;
        let mut chain = Vec::new();
        for node in target.ancestors() {
            if node.name() == self.scope_name() {
                break;
            }
            chain.push(node);
        }

        let reachable = target.name() != self.scope_name() && target.is_descendant_of(self.scope_name());
        if !reachable {
            return Err(DiError::ScopeMismatch {
                scope: scope.to_string(),
                from: self.scope_name().to_string(),
            });
        }

        let mut current = self.clone();
        for node in chain.into_iter().rev() {
            current = Self::with_parent(Arc::clone(&self.inner.registry), node, Some(current));
        }
        Ok(current)
    }

    /// Nearest injector in the chain whose scope is `scope`; `any` narrows to
    /// this injector.
    pub fn at(&self, scope: &str) -> Option<Injector> {
        if scope == ANY {
            return Some(self.clone());
        }
        self.chain().find(|i| i.scope_name() == scope).cloned()
    }

    /// This injector followed by its parents.
    pub fn chain(&self) -> impl Iterator<Item = &Injector> {
        std::iter::successors(Some(self), |i| i.inner.parent.as_ref())
    }

    /// Resolve `token` with no call-time arguments (`injector[token]`).
    #[inline]
    pub fn resolve(&self, token: &Token) -> Result<Instance> {
        self.make(token, Arguments::new())
    }

    /// Resolve `token`, passing call-time arguments to its resolver.
    ///
    /// Lookup order: this injector's bindings, then its scope's providers,
    /// then the parent injector. The binding runs on the injector that owns
    /// it, so cached instances of outer scopes are shared.
    pub fn make(&self, token: &Token, args: Arguments) -> Result<Instance> {
        if *token == Token::of::<Injector>() {
            return Ok(Arc::new(self.clone()));
        }

        for (hops, injector) in self.chain().enumerate() {
            if let Some(binding) = injector.binding(token) {
                #[cfg(feature = "logging")]
                if hops > 0 {
                    trace!(
                        target: "djx",
                        token = %token,
                        scope = injector.scope_name(),
                        hops,
                        "Resolved from ancestor injector"
                    );
                }
                #[cfg(not(feature = "logging"))]
                let _ = hops;

                let _guard = ResolutionGuard::enter(injector.id(), token)?;
                return binding.resolve(injector, &args);
            }
        }

        #[cfg(feature = "logging")]
        debug!(
            target: "djx",
            token = %token,
            scope = self.scope_name(),
            "No provider found in scope chain"
        );

        Err(DiError::not_found(token))
    }

    /// Binding for `token` owned by this injector, set up from the scope's
    /// provider on first use and again whenever that provider is replaced.
    fn binding(&self, token: &Token) -> Option<Arc<Binding>> {
        let provider = self.inner.scope.provider(token);
        if let Some(binding) = self.inner.bindings.get(token) {
            if binding.is_current(provider.as_ref()) {
                return Some(Arc::clone(binding.value()));
            }
        }

        let provider = provider?;
        let mut found = None;
        for (key, resolver) in provider.setup(&self.inner.scope) {
            let fresh = Arc::new(Binding::new(key.clone(), resolver).with_source(Arc::clone(&provider)));
            let binding = match self.inner.bindings.entry(key.clone()) {
                Entry::Occupied(mut entry) => {
                    if entry.get().is_current(Some(&provider)) {
                        Arc::clone(entry.get())
                    } else {
                        #[cfg(feature = "logging")]
                        trace!(target: "djx", token = %key, "Rebinding replaced provider");
                        entry.insert(Arc::clone(&fresh));
                        fresh
                    }
                }
                Entry::Vacant(entry) => Arc::clone(entry.insert(fresh).value()),
            };
            if key == *token {
                found = Some(binding);
            }
        }
        found
    }

    /// Resolve the type `T` by its own token.
    #[inline]
    pub fn get<T: Send + Sync + 'static>(&self) -> Result<Arc<T>> {
        self.get_as::<T>(Token::of::<T>())
    }

    /// Resolve `token` and downcast to `T`.
    pub fn get_as<T: Send + Sync + 'static>(&self, token: impl Into<Token>) -> Result<Arc<T>> {
        let token = token.into();
        self.resolve(&token)?
            .downcast::<T>()
            .map_err(|_| DiError::type_mismatch::<T>(&token))
    }

    /// Like [`get`](Self::get), but `None` on any error.
    #[inline]
    pub fn try_get<T: Send + Sync + 'static>(&self) -> Option<Arc<T>> {
        self.get::<T>().ok()
    }

    /// Whether `token` resolves to a binding or provider anywhere in the
    /// chain. Does not run anything.
    pub fn contains(&self, token: &Token) -> bool {
        *token == Token::of::<Injector>()
            || self
                .chain()
                .any(|i| i.inner.bindings.contains_key(token) || i.inner.scope.contains(token))
    }

    /// Bind `value` under `token` in this injector only.
    pub fn insert_value<T: Send + Sync + 'static>(&self, token: impl Into<Token>, value: T) {
        self.insert_instance(token.into(), Arc::new(value));
    }

    /// Bind an already shared instance under `token` in this injector only.
    pub fn insert_instance(&self, token: Token, value: Instance) {
        #[cfg(feature = "logging")]
        trace!(target: "djx", token = %token, scope = self.scope_name(), "Binding instance");

        self.inner
            .bindings
            .insert(token.clone(), Arc::new(Binding::instance(token, value)));
    }

    /// Make this injector current on this thread until the guard drops.
    #[inline]
    pub fn activate(&self) -> ActiveInjector {
        context::activate(self.clone())
    }

    #[inline]
    pub fn scope(&self) -> &Arc<Scope> {
        &self.inner.scope
    }

    #[inline]
    pub fn scope_name(&self) -> &str {
        self.inner.scope.name()
    }

    #[inline]
    pub fn parent(&self) -> Option<&Injector> {
        self.inner.parent.as_ref()
    }

    #[inline]
    pub fn registry(&self) -> &Arc<Registry> {
        &self.inner.registry
    }

    /// Number of bindings set up in this injector.
    #[inline]
    pub fn binding_count(&self) -> usize {
        self.inner.bindings.len()
    }

    /// Whether both handles point at the same injector.
    #[inline]
    pub fn ptr_eq(&self, other: &Injector) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    #[inline]
    fn id(&self) -> usize {
        Arc::as_ptr(&self.inner) as usize
    }
}

impl std::fmt::Debug for Injector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Injector")
            .field("scope", &self.scope_name())
            .field("bindings", &self.binding_count())
            .field("parent", &self.parent().map(|p| p.scope_name()))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Factory, Parameter, Signature};
    use std::sync::atomic::{AtomicU32, Ordering};

    #[derive(Debug)]
    struct Counter(u32);

    fn registry() -> Arc<Registry> {
        Arc::new(Registry::new())
    }

    #[test]
    fn test_injector_chain() {
        let registry = registry();
        let request = registry.injector("request").unwrap();
        let scopes: Vec<_> = request.chain().map(|i| i.scope_name()).collect();
        assert_eq!(scopes, ["request", "main", "any"]);
    }

    #[test]
    fn test_not_found() {
        let inj = registry().injector("main").unwrap();
        let err = inj.resolve(&Token::symbol("missing")).unwrap_err();
        assert!(matches!(err, DiError::NotFound { .. }));
        assert!(!inj.contains(&Token::symbol("missing")));
    }

    #[test]
    fn test_injector_token_resolves_to_self() {
        let inj = registry().injector("main").unwrap();
        let resolved = inj.get::<Injector>().unwrap();
        assert!(resolved.ptr_eq(&inj));
        assert!(inj.contains(&Token::of::<Injector>()));
    }

    #[test]
    fn test_parent_scope_provider_bound_in_owner() {
        let registry = registry();
        registry
            .provide("shared")
            .factory(Factory::new(|| Counter(1)))
            .cache(true)
            .register()
            .unwrap();

        let main = registry.injector("main").unwrap();
        let r1 = main.enter("request").unwrap();
        let r2 = main.enter("request").unwrap();

        let a = r1.get_as::<Counter>("shared").unwrap();
        let b = r2.get_as::<Counter>("shared").unwrap();
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(r1.binding_count(), 0);
        assert_eq!(main.binding_count(), 1);
    }

    #[test]
    fn test_request_scoped_cache_is_per_injector() {
        let registry = registry();
        let calls = Arc::new(AtomicU32::new(0));
        let counter = Arc::clone(&calls);
        registry
            .provide("per_request")
            .factory(Factory::new(move || Counter(counter.fetch_add(1, Ordering::SeqCst))))
            .cache(true)
            .scope("request")
            .register()
            .unwrap();

        let main = registry.injector("main").unwrap();
        assert!(main.get_as::<Counter>("per_request").is_err());

        let r1 = main.enter("request").unwrap();
        let r2 = main.enter("request").unwrap();
        let a = r1.get_as::<Counter>("per_request").unwrap();
        let a2 = r1.get_as::<Counter>("per_request").unwrap();
        let b = r2.get_as::<Counter>("per_request").unwrap();
        assert!(Arc::ptr_eq(&a, &a2));
        assert!(!Arc::ptr_eq(&a, &b));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_enter_rejects_non_descendants() {
        let registry = registry();
        let request = registry.injector("request").unwrap();
        assert!(matches!(request.enter("main"), Err(DiError::ScopeMismatch { .. })));
        assert!(matches!(request.enter("request"), Err(DiError::ScopeMismatch { .. })));

        let any = registry.injector("any").unwrap();
        let entered = any.enter("request").unwrap();
        let scopes: Vec<_> = entered.chain().map(|i| i.scope_name()).collect();
        assert_eq!(scopes, ["request", "main", "any"]);
    }

    #[test]
    fn test_at_narrows_to_scope() {
        let registry = registry();
        let request = registry.injector("request").unwrap();
        assert!(request.at("any").unwrap().ptr_eq(&request));
        assert_eq!(request.at("main").unwrap().scope_name(), "main");
        assert!(registry.injector("main").unwrap().at("request").is_none());
    }

    #[test]
    fn test_insert_value_shadows_providers() {
        let registry = registry();
        registry.provide("name").value(String::from("main")).register().unwrap();
        let request = registry.injector("request").unwrap();
        request.insert_value("name", String::from("request"));
        assert_eq!(*request.get_as::<String>("name").unwrap(), "request");
        assert_eq!(*request.parent().unwrap().get_as::<String>("name").unwrap(), "main");
    }

    #[test]
    fn test_type_mismatch() {
        let registry = registry();
        registry.provide("n").value(1u8).register().unwrap();
        let inj = registry.injector("main").unwrap();
        assert!(matches!(inj.get_as::<u32>("n"), Err(DiError::TypeMismatch { .. })));
    }

    #[test]
    fn test_circular_dependency_is_reported() {
        let registry = registry();
        let factory = |dep: &'static str| {
            Factory::with_signature(
                Signature::new().param(Parameter::positional("dep").inject(dep)),
                |_: &Arguments| Ok(()),
            )
        };
        registry.provide("a").factory(factory("b")).register().unwrap();
        registry.provide("b").factory(factory("a")).register().unwrap();

        let inj = registry.injector("main").unwrap();
        match inj.resolve(&Token::symbol("a")) {
            Err(DiError::CircularDependency { path }) => assert_eq!(path, "a -> b -> a"),
            other => panic!("expected circular dependency, got {other:?}"),
        }
        // the failed resolution leaves nothing on the stack
        assert!(matches!(inj.resolve(&Token::symbol("a")), Err(DiError::CircularDependency { .. })));
    }

    #[test]
    fn test_alias_is_late_bound() {
        let registry = registry();
        registry.provide("target").value(1u8).register().unwrap();
        registry.alias("alias", "target").unwrap();
        registry.provide("target").value(2u8).register().unwrap();

        let main = registry.injector("main").unwrap();
        assert_eq!(*main.get_as::<u8>("alias").unwrap(), 2);
        let request = main.enter("request").unwrap();
        assert_eq!(*request.get_as::<u8>("alias").unwrap(), 2);

        // live injectors see later replacements too
        registry.provide("target").value(3u8).register().unwrap();
        assert_eq!(*request.get_as::<u8>("alias").unwrap(), 3);
    }

    #[test]
    fn test_replaced_provider_drops_cached_value() {
        let registry = registry();
        registry
            .provide("n")
            .factory(Factory::new(|| Counter(1)))
            .cache(true)
            .register()
            .unwrap();
        let inj = registry.injector("main").unwrap();
        let first = inj.get_as::<Counter>("n").unwrap();
        assert!(Arc::ptr_eq(&first, &inj.get_as::<Counter>("n").unwrap()));

        registry
            .provide("n")
            .factory(Factory::new(|| Counter(2)))
            .cache(true)
            .register()
            .unwrap();
        assert_eq!(inj.get_as::<Counter>("n").unwrap().0, 2);
    }
}
