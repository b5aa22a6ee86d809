//! Factories and resolvers
//!
//! A [`Factory`] is a callable with a declared [`Signature`]. A [`Resolver`]
//! is the runtime form of a provider inside one injector, and a [`Binding`]
//! pairs it with the write-once cell holding the cached instance.

use crate::{Arguments, BoundArguments, DiError, Injectable, Injector, Instance, Provider, Result, Signature, Token};
use once_cell::sync::OnceCell;
use std::fmt;
use std::sync::Arc;

#[cfg(feature = "logging")]
use tracing::{debug, trace};

type FactoryFn = dyn Fn(&Arguments) -> Result<Instance> + Send + Sync;

/// Callable producing instances, with its parameter list.
///
/// The signature is bound lazily on first use and the binding is shared by
/// every clone, so a factory registered under several tokens binds once.
#[derive(Clone)]
pub struct Factory {
    func: Arc<FactoryFn>,
    signature: Arc<Signature>,
    bound: Arc<OnceCell<Option<BoundArguments>>>,
    type_name: &'static str,
}

impl Factory {
    /// Parameterless, infallible factory.
    pub fn new<T, F>(f: F) -> Self
    where
        T: Send + Sync + 'static,
        F: Fn() -> T + Send + Sync + 'static,
    {
        Self::from_fn::<T>(Signature::new(), Arc::new(move |_: &Arguments| Ok(Arc::new(f()) as Instance)))
    }

    /// Parameterless factory that may fail.
    pub fn try_new<T, F>(f: F) -> Self
    where
        T: Send + Sync + 'static,
        F: Fn() -> Result<T> + Send + Sync + 'static,
    {
        Self::from_fn::<T>(Signature::new(), Arc::new(move |_: &Arguments| Ok(Arc::new(f()?) as Instance)))
    }

    /// Factory receiving its bound arguments.
    pub fn with_signature<T, F>(signature: Signature, f: F) -> Self
    where
        T: Send + Sync + 'static,
        F: Fn(&Arguments) -> Result<T> + Send + Sync + 'static,
    {
        Self::from_fn::<T>(signature, Arc::new(move |args: &Arguments| Ok(Arc::new(f(args)?) as Instance)))
    }

    /// Factory constructing an [`Injectable`] type from its own signature.
    pub fn injectable<T: Injectable>() -> Self {
        Self::with_signature(T::signature(), T::construct)
    }

    fn from_fn<T: 'static>(signature: Signature, func: Arc<FactoryFn>) -> Self {
        Self {
            func,
            signature: Arc::new(signature),
            bound: Arc::new(OnceCell::new()),
            type_name: std::any::type_name::<T>(),
        }
    }

    #[inline]
    pub fn signature(&self) -> &Signature {
        &self.signature
    }

    /// Name of the produced type.
    #[inline]
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// Bind the signature (once) and run the factory.
    pub fn call(&self, injector: &Injector, owner: &Token, overrides: &Arguments) -> Result<Instance> {
        let bound = self.bound.get_or_init(|| {
            #[cfg(feature = "logging")]
            trace!(
                target: "djx",
                token = %owner,
                params = self.signature.params().len(),
                "Binding factory signature"
            );
            self.signature.bind_partial()
        });

        match bound {
            None => {
                if let Some(param) = unexpected_label(overrides) {
                    return Err(DiError::UnexpectedArgument {
                        token: owner.clone(),
                        param,
                    });
                }
                (self.func)(&Arguments::new())
            }
            Some(bound) => {
                let args = bound.bind(injector, owner, overrides)?;
                (self.func)(&args)
            }
        }
    }
}

fn unexpected_label(overrides: &Arguments) -> Option<String> {
    if overrides.instance(0).is_some() {
        return Some("#0".to_string());
    }
    if overrides.is_empty() {
        None
    } else {
        Some("keyword argument".to_string())
    }
}

impl fmt::Debug for Factory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Factory")
            .field("type_name", &self.type_name)
            .field("signature", &self.signature)
            .finish()
    }
}

/// Runtime form of a provider.
#[derive(Clone)]
pub enum Resolver {
    /// Returns the stored instance
    Value(Instance),
    /// Re-resolves `target` through the injector on every uncached call,
    /// with `params` ahead of the call-time arguments
    Alias {
        target: Token,
        params: Arguments,
        cache: bool,
    },
    /// Runs the factory
    Factory { factory: Factory, cache: bool },
}

impl Resolver {
    /// Whether zero-argument results are kept in the binding's cell.
    #[inline]
    pub fn is_cached(&self) -> bool {
        match self {
            Self::Value(_) => true,
            Self::Alias { cache, .. } | Self::Factory { cache, .. } => *cache,
        }
    }

    /// Produce an instance without consulting any cache.
    pub fn produce(&self, injector: &Injector, token: &Token, args: &Arguments) -> Result<Instance> {
        match self {
            Self::Value(value) => {
                if let Some(param) = unexpected_label(args) {
                    return Err(DiError::UnexpectedArgument {
                        token: token.clone(),
                        param,
                    });
                }
                Ok(Arc::clone(value))
            }
            Self::Alias { target, params, .. } if params.is_empty() => injector.make(target, args.clone()),
            Self::Alias { target, params, .. } => injector.make(target, params.merged_with(args)),
            Self::Factory { factory, .. } => factory.call(injector, token, args),
        }
    }
}

impl fmt::Debug for Resolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Value(_) => f.write_str("Resolver::Value"),
            Self::Alias { target, params, cache } => f
                .debug_struct("Resolver::Alias")
                .field("target", target)
                .field("params", params)
                .field("cache", cache)
                .finish(),
            Self::Factory { factory, cache } => f
                .debug_struct("Resolver::Factory")
                .field("factory", &factory.type_name())
                .field("cache", cache)
                .finish(),
        }
    }
}

/// A resolver bound inside one injector, with its cache cell.
pub struct Binding {
    token: Token,
    resolver: Resolver,
    cell: OnceCell<Instance>,
    source: Option<Arc<Provider>>,
}

impl Binding {
    pub fn new(token: Token, resolver: Resolver) -> Self {
        Self {
            token,
            resolver,
            cell: OnceCell::new(),
            source: None,
        }
    }

    /// Remember the provider this binding was set up from.
    pub fn with_source(mut self, provider: Arc<Provider>) -> Self {
        self.source = Some(provider);
        self
    }

    /// Whether the binding still reflects `provider`. Bindings not set up
    /// from a provider are always current.
    #[inline]
    pub fn is_current(&self, provider: Option<&Arc<Provider>>) -> bool {
        match (&self.source, provider) {
            (None, _) => true,
            (Some(source), Some(provider)) => Arc::ptr_eq(source, provider),
            (Some(_), None) => false,
        }
    }

    /// Bind a value that is already known, e.g. the current request.
    pub fn instance(token: Token, value: Instance) -> Self {
        Self::new(token, Resolver::Value(value))
    }

    #[inline]
    pub fn token(&self) -> &Token {
        &self.token
    }

    #[inline]
    pub fn resolver(&self) -> &Resolver {
        &self.resolver
    }

    /// Whether the cell already holds an instance.
    #[inline]
    pub fn is_filled(&self) -> bool {
        self.cell.get().is_some()
    }

    /// Resolve with `injector`, the injector owning this binding.
    ///
    /// Cached resolvers fill the cell on the first successful zero-argument
    /// call. Calls with arguments never read or write it.
    pub fn resolve(&self, injector: &Injector, args: &Arguments) -> Result<Instance> {
        if let Resolver::Value(value) = &self.resolver {
            if args.is_empty() {
                return Ok(Arc::clone(value));
            }
        }

        if !self.resolver.is_cached() || !args.is_empty() {
            return self.resolver.produce(injector, &self.token, args);
        }

        if let Some(value) = self.cell.get() {
            #[cfg(feature = "logging")]
            trace!(target: "djx", token = %self.token, "Resolved from binding cache");
            return Ok(Arc::clone(value));
        }

        let value = self.cell.get_or_try_init(|| {
            #[cfg(feature = "logging")]
            debug!(
                target: "djx",
                token = %self.token,
                "Cached binding initializing on first access"
            );
            self.resolver.produce(injector, &self.token, args)
        })?;
        Ok(Arc::clone(value))
    }
}

impl fmt::Debug for Binding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Binding")
            .field("token", &self.token)
            .field("resolver", &self.resolver)
            .field("filled", &self.is_filled())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Parameter, Registry};
    use std::sync::atomic::{AtomicU32, Ordering};

    fn injector() -> Injector {
        Arc::new(Registry::new()).injector("main").unwrap()
    }

    #[test]
    fn test_value_binding_returns_same_instance() {
        let inj = injector();
        let binding = Binding::instance(Token::symbol("v"), Arc::new(5u8));
        let a = binding.resolve(&inj, &Arguments::new()).unwrap();
        let b = binding.resolve(&inj, &Arguments::new()).unwrap();
        assert!(Arc::ptr_eq(&a, &b));
        assert!(binding.resolve(&inj, &Arguments::new().with_arg(1u8)).is_err());
    }

    #[test]
    fn test_cached_factory_runs_once() {
        let inj = injector();
        let calls = Arc::new(AtomicU32::new(0));
        let counter = Arc::clone(&calls);
        let factory = Factory::new(move || counter.fetch_add(1, Ordering::SeqCst));
        let binding = Binding::new(Token::symbol("f"), Resolver::Factory { factory, cache: true });

        assert!(!binding.is_filled());
        let a = binding.resolve(&inj, &Arguments::new()).unwrap();
        let b = binding.resolve(&inj, &Arguments::new()).unwrap();
        assert!(Arc::ptr_eq(&a, &b));
        assert!(binding.is_filled());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_uncached_factory_runs_each_time() {
        let inj = injector();
        let calls = Arc::new(AtomicU32::new(0));
        let counter = Arc::clone(&calls);
        let factory = Factory::new(move || counter.fetch_add(1, Ordering::SeqCst));
        let binding = Binding::new(Token::symbol("f"), Resolver::Factory { factory, cache: false });

        binding.resolve(&inj, &Arguments::new()).unwrap();
        binding.resolve(&inj, &Arguments::new()).unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert!(!binding.is_filled());
    }

    #[test]
    fn test_arguments_bypass_cache() {
        let inj = injector();
        let factory = Factory::with_signature(
            Signature::new().param(Parameter::positional("n").default_value(1u32)),
            |args: &Arguments| Ok(*args.positional::<u32>(0)? * 10),
        );
        let binding = Binding::new(Token::symbol("f"), Resolver::Factory { factory, cache: true });

        let explicit = binding.resolve(&inj, &Arguments::new().with_arg(4u32)).unwrap();
        assert_eq!(*explicit.downcast::<u32>().unwrap(), 40);
        assert!(!binding.is_filled());

        let cached = binding.resolve(&inj, &Arguments::new()).unwrap();
        assert_eq!(*cached.downcast::<u32>().unwrap(), 10);
        assert!(binding.is_filled());
    }

    #[test]
    fn test_parameterless_factory_rejects_arguments() {
        let inj = injector();
        let factory = Factory::new(|| 1u8);
        let err = factory
            .call(&inj, &Token::symbol("f"), &Arguments::new().with_kwarg("x", 1u8))
            .unwrap_err();
        assert!(matches!(err, DiError::UnexpectedArgument { .. }));
    }

    #[test]
    fn test_failed_initialization_leaves_cell_empty() {
        let inj = injector();
        let factory = Factory::try_new(|| -> Result<u8> { Err(DiError::creation_failed("f", "nope")) });
        let binding = Binding::new(Token::symbol("f"), Resolver::Factory { factory, cache: true });
        assert!(binding.resolve(&inj, &Arguments::new()).is_err());
        assert!(!binding.is_filled());
    }

    #[test]
    fn test_binding_tracks_its_provider() {
        let first = Arc::new(Provider::new("v", crate::Concrete::Value(Arc::new(1u8))));
        let second = Arc::new(Provider::new("v", crate::Concrete::Value(Arc::new(2u8))));
        let binding = Binding::new(Token::symbol("v"), Resolver::Value(Arc::new(1u8)))
            .with_source(Arc::clone(&first));
        assert!(binding.is_current(Some(&first)));
        assert!(!binding.is_current(Some(&second)));
        assert!(Binding::instance(Token::symbol("v"), Arc::new(0u8)).is_current(Some(&second)));
    }

    #[test]
    fn test_resolver_cache_flags() {
        assert!(Resolver::Value(Arc::new(1u8)).is_cached());
        assert!(!Resolver::Alias { target: Token::symbol("x"), params: Arguments::new(), cache: false }.is_cached());
    }
}
