//! Providers
//!
//! A [`Provider`] declares how an abstract token is satisfied: by a value,
//! by an alias to another token, or by a [`Factory`]. Providers are built
//! through [`Registry::provide`] and stored in the provider table of their
//! [`Scope`].

use crate::{Arguments, DiError, Factory, Injector, Registry, Resolver, Result, Scope, Token};
use std::any::Any;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

#[cfg(feature = "logging")]
use tracing::{debug, trace};

/// Type-erased instance produced by resolution.
pub type Instance = Arc<dyn Any + Send + Sync>;

/// Priority given to providers that do not set one.
pub const DEFAULT_PRIORITY: i32 = 1;

/// The three ways to satisfy a token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProviderKind {
    Value,
    Alias,
    Factory,
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Value => "value",
            Self::Alias => "alias",
            Self::Factory => "factory",
        })
    }
}

/// What a provider resolves to.
#[derive(Clone)]
pub enum Concrete {
    Value(Instance),
    /// Target token and the arguments placed before call-time ones
    Alias(Token, Arguments),
    Factory(Factory),
}

impl Concrete {
    #[inline]
    pub fn kind(&self) -> ProviderKind {
        match self {
            Self::Value(_) => ProviderKind::Value,
            Self::Alias(..) => ProviderKind::Alias,
            Self::Factory(_) => ProviderKind::Factory,
        }
    }
}

impl fmt::Debug for Concrete {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Value(_) => f.write_str("Value(..)"),
            Self::Alias(target, params) => f.debug_tuple("Alias").field(target).field(params).finish(),
            Self::Factory(factory) => f.debug_tuple("Factory").field(&factory.type_name()).finish(),
        }
    }
}

/// Declarative binding of one abstract token.
///
/// Providers compare and hash by token alone. Listings are ordered by
/// [`Provider::sort_key`].
#[derive(Clone)]
pub struct Provider {
    token: Token,
    concrete: Concrete,
    priority: i32,
    scope: Option<Arc<str>>,
    cache: Option<bool>,
    options: BTreeMap<String, Instance>,
    order: u64,
}

impl Provider {
    pub fn new(token: impl Into<Token>, concrete: Concrete) -> Self {
        Self {
            token: token.into(),
            concrete,
            priority: DEFAULT_PRIORITY,
            scope: None,
            cache: None,
            options: BTreeMap::new(),
            order: 0,
        }
    }

    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    pub fn in_scope(mut self, scope: impl Into<Arc<str>>) -> Self {
        self.scope = Some(scope.into());
        self
    }

    pub fn with_cache(mut self, cache: bool) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Attach a free-form option. Options are carried for callers and
    /// never read during resolution.
    pub fn with_option<T: Send + Sync + 'static>(mut self, key: impl Into<String>, value: T) -> Self {
        self.options.insert(key.into(), Arc::new(value));
        self
    }

    #[inline]
    pub fn token(&self) -> &Token {
        &self.token
    }

    #[inline]
    pub fn concrete(&self) -> &Concrete {
        &self.concrete
    }

    #[inline]
    pub fn kind(&self) -> ProviderKind {
        self.concrete.kind()
    }

    #[inline]
    pub fn priority(&self) -> i32 {
        self.priority
    }

    /// Scope name; `None` until registered when not set explicitly.
    #[inline]
    pub fn scope(&self) -> Option<&str> {
        self.scope.as_deref()
    }

    /// Cache setting as given, before defaults apply.
    #[inline]
    pub fn cache_setting(&self) -> Option<bool> {
        self.cache
    }

    /// Effective cache policy: values always, aliases and factories only
    /// when asked to.
    #[inline]
    pub fn is_cached(&self) -> bool {
        match self.concrete {
            Concrete::Value(_) => true,
            Concrete::Alias(..) | Concrete::Factory(_) => self.cache.unwrap_or(false),
        }
    }

    #[inline]
    pub fn options(&self) -> &BTreeMap<String, Instance> {
        &self.options
    }

    /// Option `key` when present and of type `T`.
    pub fn option<T: Send + Sync + 'static>(&self, key: &str) -> Option<Arc<T>> {
        self.options.get(key).cloned()?.downcast().ok()
    }

    /// Creation order assigned by the registry.
    #[inline]
    pub fn order(&self) -> u64 {
        self.order
    }

    /// Listing order: priority, then token, then creation order.
    #[inline]
    pub fn sort_key(&self) -> (i32, &Token, u64) {
        (self.priority, &self.token, self.order)
    }

    pub(crate) fn assign(&mut self, scope: Arc<str>, order: u64) {
        self.scope = Some(scope);
        self.order = order;
    }

    /// Validate the provider against `registry` before it is inserted.
    pub fn check(&self, registry: &Registry) -> Result<()> {
        match &self.concrete {
            Concrete::Value(_) => Ok(()),
            Concrete::Alias(target, _) => {
                if registry.is_provided(target) || *target == Token::of::<Injector>() {
                    Ok(())
                } else {
                    Err(DiError::ProviderNotFound {
                        token: self.token.clone(),
                        target: target.clone(),
                    })
                }
            }
            Concrete::Factory(factory) => factory.signature().validate().map_err(|reason| {
                DiError::InvalidSignature {
                    token: self.token.clone(),
                    reason,
                }
            }),
        }
    }

    /// Produce the resolvers to bind in an injector for `scope`.
    #[cfg_attr(not(feature = "logging"), allow(unused_variables))]
    pub fn setup(&self, scope: &Scope) -> Vec<(Token, Resolver)> {
        #[cfg(feature = "logging")]
        trace!(
            target: "djx",
            token = %self.token,
            kind = %self.kind(),
            scope = scope.name(),
            "Setting up provider"
        );

        let resolver = match &self.concrete {
            Concrete::Value(value) => Resolver::Value(Arc::clone(value)),
            Concrete::Alias(target, params) => Resolver::Alias {
                target: target.clone(),
                params: params.clone(),
                cache: self.is_cached(),
            },
            Concrete::Factory(factory) => Resolver::Factory {
                factory: factory.clone(),
                cache: self.is_cached(),
            },
        };
        vec![(self.token.clone(), resolver)]
    }
}

impl PartialEq for Provider {
    fn eq(&self, other: &Self) -> bool {
        self.token == other.token
    }
}

impl Eq for Provider {}

impl Hash for Provider {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.token.hash(state);
    }
}

impl fmt::Debug for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Provider")
            .field("token", &self.token)
            .field("concrete", &self.concrete)
            .field("priority", &self.priority)
            .field("scope", &self.scope)
            .field("cache", &self.cache)
            .field("options", &self.options.keys().collect::<Vec<_>>())
            .field("order", &self.order)
            .finish()
    }
}

/// Result of [`Provide::register`].
#[derive(Debug, Clone)]
pub enum Provided {
    /// Exactly one abstract was registered
    One(Arc<Provider>),
    /// Several abstracts, keyed by token
    Many(HashMap<Token, Arc<Provider>>),
}

impl Provided {
    /// The provider registered for `token`.
    pub fn get(&self, token: &Token) -> Option<&Arc<Provider>> {
        match self {
            Self::One(provider) => (provider.token() == token).then_some(provider),
            Self::Many(providers) => providers.get(token),
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Self::One(_) => 1,
            Self::Many(providers) => providers.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Builder returned by [`Registry::provide`].
///
/// # Example
///
/// ```rust
/// use djx::{Factory, Provided, Registry};
/// use std::sync::Arc;
///
/// let registry = Arc::new(Registry::new());
/// let provided = registry
///     .provide("clock")
///     .and("timer")
///     .factory(Factory::new(|| 42u64))
///     .cache(true)
///     .priority(5)
///     .register()
///     .unwrap();
/// assert!(matches!(provided, Provided::Many(ref map) if map.len() == 2));
/// ```
#[must_use = "call `register()` to add the provider"]
pub struct Provide<'r> {
    registry: &'r Registry,
    abstracts: Vec<Token>,
    concretes: Vec<Concrete>,
    priority: i32,
    scope: Option<Arc<str>>,
    cache: Option<bool>,
    options: BTreeMap<String, Instance>,
}

impl<'r> Provide<'r> {
    pub(crate) fn new(registry: &'r Registry, token: Token) -> Self {
        Self {
            registry,
            abstracts: vec![token],
            concretes: Vec::new(),
            priority: DEFAULT_PRIORITY,
            scope: None,
            cache: None,
            options: BTreeMap::new(),
        }
    }

    /// Also register under `token`.
    pub fn and(mut self, token: impl Into<Token>) -> Self {
        self.abstracts.push(token.into());
        self
    }

    pub fn value<T: Send + Sync + 'static>(self, value: T) -> Self {
        self.instance(Arc::new(value))
    }

    /// Provide an already shared instance.
    pub fn instance(mut self, value: Instance) -> Self {
        self.concretes.push(Concrete::Value(value));
        self
    }

    pub fn alias(self, target: impl Into<Token>) -> Self {
        self.alias_with(target, Arguments::new())
    }

    /// Alias passing `params` ahead of the call-time arguments on every
    /// resolution. Call-time keywords win over preset ones.
    pub fn alias_with(mut self, target: impl Into<Token>, params: Arguments) -> Self {
        self.concretes.push(Concrete::Alias(target.into(), params));
        self
    }

    pub fn factory(mut self, factory: Factory) -> Self {
        self.concretes.push(Concrete::Factory(factory));
        self
    }

    pub fn priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    pub fn scope(mut self, scope: impl Into<Arc<str>>) -> Self {
        self.scope = Some(scope.into());
        self
    }

    pub fn cache(mut self, cache: bool) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn option<T: Send + Sync + 'static>(mut self, key: impl Into<String>, value: T) -> Self {
        self.options.insert(key.into(), Arc::new(value));
        self
    }

    /// Validate and insert one provider per distinct abstract.
    pub fn register(self) -> Result<Provided> {
        let first = self.abstracts[0].clone();
        let concrete = match self.concretes.len() {
            0 => return Err(DiError::MissingConcrete { token: first }),
            1 => self.concretes[0].clone(),
            _ => {
                return Err(DiError::ConflictingConcrete {
                    token: first,
                    kinds: self
                        .concretes
                        .iter()
                        .map(|c| c.kind().to_string())
                        .collect::<Vec<_>>()
                        .join(", "),
                });
            }
        };

        let mut abstracts: Vec<Token> = Vec::with_capacity(self.abstracts.len());
        for token in self.abstracts {
            if !abstracts.contains(&token) {
                abstracts.push(token);
            }
        }

        let providers = abstracts
            .into_iter()
            .map(|token| {
                let mut provider = Provider::new(token, concrete.clone()).with_priority(self.priority);
                provider.scope = self.scope.clone();
                provider.cache = self.cache;
                provider.options = self.options.clone();
                provider
            })
            .collect::<Vec<_>>();

        for provider in &providers {
            provider.check(self.registry)?;
        }

        #[cfg(feature = "logging")]
        debug!(
            target: "djx",
            token = %first,
            kind = %concrete.kind(),
            abstracts = providers.len(),
            "Registering provider"
        );

        let mut registered = providers
            .into_iter()
            .map(|provider| self.registry.register_provider(provider))
            .collect::<Result<Vec<_>>>()?;

        if registered.len() == 1 {
            Ok(Provided::One(registered.remove(0)))
        } else {
            Ok(Provided::Many(
                registered
                    .into_iter()
                    .map(|p| (p.token().clone(), p))
                    .collect(),
            ))
        }
    }
}

/// Shorthand for common [`Registry::provide`] forms.
///
/// ```rust
/// use djx::{provide, Registry};
/// use std::sync::Arc;
///
/// let registry = Arc::new(Registry::new());
/// provide!(registry, "name" => value String::from("djx")).unwrap();
/// provide!(registry, "title" => alias "name").unwrap();
/// provide!(registry, "answer" => cached factory || 42u32).unwrap();
/// ```
#[macro_export]
macro_rules! provide {
    ($registry:expr, $token:expr => value $value:expr) => {
        $registry.provide($token).value($value).register()
    };
    ($registry:expr, $token:expr => alias $target:expr) => {
        $registry.provide($token).alias($target).register()
    };
    ($registry:expr, $token:expr => factory $factory:expr) => {
        $registry
            .provide($token)
            .factory($crate::Factory::new($factory))
            .register()
    };
    ($registry:expr, $token:expr => cached factory $factory:expr) => {
        $registry
            .provide($token)
            .factory($crate::Factory::new($factory))
            .cache(true)
            .register()
    };
}
