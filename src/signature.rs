//! Factory signatures and argument binding
//!
//! Rust has no runtime signature introspection, so a factory declares its
//! parameters up front as a [`Signature`]. Parameters carrying a
//! [`Dependency`] are supplied by the injector; the rest come from call-time
//! [`Arguments`] or their declared default.
//!
//! # Example
//!
//! ```rust
//! use djx::{Arguments, Factory, Parameter, Registry, Signature};
//! use std::sync::Arc;
//!
//! let registry = Arc::new(Registry::new());
//! registry.provide("greeting").value(String::from("hi")).register().unwrap();
//! registry
//!     .provide("shout")
//!     .factory(Factory::with_signature(
//!         Signature::new().param(Parameter::positional("greeting").inject("greeting")),
//!         |args: &Arguments| Ok(args.positional::<String>(0)?.to_uppercase()),
//!     ))
//!     .register()
//!     .unwrap();
//!
//! let injector = registry.injector("main").unwrap();
//! assert_eq!(*injector.get_as::<String>("shout").unwrap(), "HI");
//! ```

use crate::{DefaultValue, Dependency, DiError, Injector, Instance, Result, Token};
use std::any::Any;
use std::borrow::Cow;
use std::collections::HashSet;
use std::sync::Arc;

/// How a parameter may be supplied at call time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParamKind {
    /// Filled by position or by name
    Positional,
    /// Filled by name only
    Keyword,
}

/// One declared factory parameter.
#[derive(Clone)]
pub struct Parameter {
    name: Cow<'static, str>,
    kind: ParamKind,
    dependency: Option<Dependency>,
    default: Option<DefaultValue>,
    optional: bool,
}

impl Parameter {
    /// A parameter that can be given by position or by name.
    pub fn positional(name: impl Into<Cow<'static, str>>) -> Self {
        Self::with_kind(name, ParamKind::Positional)
    }

    /// A keyword-only parameter.
    pub fn keyword(name: impl Into<Cow<'static, str>>) -> Self {
        Self::with_kind(name, ParamKind::Keyword)
    }

    fn with_kind(name: impl Into<Cow<'static, str>>, kind: ParamKind) -> Self {
        Self {
            name: name.into(),
            kind,
            dependency: None,
            default: None,
            optional: false,
        }
    }

    /// Mark the parameter as injected from `dependency`.
    pub fn inject(mut self, dependency: impl Into<Dependency>) -> Self {
        self.dependency = Some(dependency.into());
        self
    }

    /// Value used when neither an override nor the dependency supplies one.
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

    /// Leave the parameter out of the bound arguments instead of failing
    /// when nothing supplies it.
    pub fn optional(mut self) -> Self {
        self.optional = true;
        self
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn kind(&self) -> ParamKind {
        self.kind
    }

    #[inline]
    pub fn dependency(&self) -> Option<&Dependency> {
        self.dependency.as_ref()
    }

    #[inline]
    pub fn is_injected(&self) -> bool {
        self.dependency.is_some()
    }

    /// Produce the value for this parameter when no override was given.
    fn supply(&self, injector: &Injector, owner: &Token) -> Result<Option<Instance>> {
        if let Some(dependency) = &self.dependency {
            match dependency.resolve(injector) {
                Ok(value) => return Ok(Some(value)),
                Err(err) if err.is_lookup() && (self.default.is_some() || self.optional) => {}
                Err(err) => return Err(err),
            }
        }
        if let Some(default) = &self.default {
            return Ok(Some(default.produce()));
        }
        if self.optional {
            return Ok(None);
        }
        Err(DiError::MissingArgument {
            token: owner.clone(),
            param: self.name.to_string(),
        })
    }
}

impl std::fmt::Debug for Parameter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Parameter")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .field("dependency", &self.dependency)
            .field("has_default", &self.default.is_some())
            .field("optional", &self.optional)
            .finish()
    }
}

/// Ordered parameter list of a factory.
#[derive(Clone, Default, Debug)]
pub struct Signature {
    params: Vec<Parameter>,
}

impl Signature {
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a parameter.
    pub fn param(mut self, param: Parameter) -> Self {
        self.params.push(param);
        self
    }

    #[inline]
    pub fn params(&self) -> &[Parameter] {
        &self.params
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    /// Check that names are unique and every injected parameter names at
    /// least one candidate token.
    pub fn validate(&self) -> std::result::Result<(), String> {
        let mut seen = HashSet::with_capacity(self.params.len());
        for param in &self.params {
            if !seen.insert(param.name()) {
                return Err(format!("duplicate parameter `{}`", param.name()));
            }
            if let Some(dependency) = &param.dependency {
                if dependency.deps().is_empty() {
                    return Err(format!(
                        "parameter `{}` depends on no candidate tokens",
                        param.name()
                    ));
                }
            }
        }
        Ok(())
    }

    /// Split the signature for injection. `None` when there are no
    /// parameters at all, so callers can take the zero-argument path.
    pub fn bind_partial(&self) -> Option<BoundArguments> {
        if self.params.is_empty() {
            return None;
        }
        let (positional, keyword) = self
            .params
            .iter()
            .cloned()
            .partition(|p| p.kind == ParamKind::Positional);
        Some(BoundArguments {
            positional,
            keyword,
        })
    }
}

/// A signature prepared for injection.
#[derive(Clone, Debug)]
pub struct BoundArguments {
    positional: Vec<Parameter>,
    keyword: Vec<Parameter>,
}

impl BoundArguments {
    /// Values for the positional parameters. Call-time positional or
    /// same-named keyword overrides win over injection.
    ///
    /// The first element is the contiguous positional run. Once an optional
    /// positional is left out, every later positional still gets its
    /// override or injected value, but by name in the second element, so
    /// positions after the gap never shift.
    pub fn inject_args(
        &self,
        injector: &Injector,
        owner: &Token,
        overrides: &Arguments,
    ) -> Result<(Vec<Instance>, Vec<(Cow<'static, str>, Instance)>)> {
        let mut values = Vec::with_capacity(self.positional.len());
        let mut spilled = Vec::new();
        let mut gap = false;
        for (index, param) in self.positional.iter().enumerate() {
            let given = overrides
                .args
                .get(index)
                .or_else(|| overrides.keyword_instance(param.name()))
                .cloned();
            let value = match given {
                Some(value) => Some(value),
                None => param.supply(injector, owner)?,
            };
            match value {
                Some(value) if gap => spilled.push((param.name.clone(), value)),
                Some(value) => values.push(value),
                None => gap = true,
            }
        }
        Ok((values, spilled))
    }

    /// Values for the keyword-only parameters. Optional parameters nothing
    /// supplied are left out.
    pub fn inject_kwargs(
        &self,
        injector: &Injector,
        owner: &Token,
        overrides: &Arguments,
    ) -> Result<Vec<(Cow<'static, str>, Instance)>> {
        let mut values = Vec::with_capacity(self.keyword.len());
        for param in &self.keyword {
            match overrides.keyword_instance(param.name()) {
                Some(value) => values.push((param.name.clone(), Arc::clone(value))),
                None => {
                    if let Some(value) = param.supply(injector, owner)? {
                        values.push((param.name.clone(), value));
                    }
                }
            }
        }
        Ok(values)
    }

    /// Merge call-time overrides with injected values into the arguments
    /// handed to the factory.
    pub fn bind(&self, injector: &Injector, owner: &Token, overrides: &Arguments) -> Result<Arguments> {
        self.check_overrides(owner, overrides)?;

        let (args, mut kwargs) = self.inject_args(injector, owner, overrides)?;
        kwargs.extend(self.inject_kwargs(injector, owner, overrides)?);
        let names = self
            .positional
            .iter()
            .take(args.len())
            .map(|p| p.name.clone())
            .collect();

        Ok(Arguments {
            args,
            names,
            kwargs,
            owner: Some(owner.clone()),
        })
    }

    fn check_overrides(&self, owner: &Token, overrides: &Arguments) -> Result<()> {
        if overrides.args.len() > self.positional.len() {
            return Err(DiError::UnexpectedArgument {
                token: owner.clone(),
                param: format!("#{}", self.positional.len()),
            });
        }
        for (name, _) in &overrides.kwargs {
            let position = self.positional.iter().position(|p| p.name == *name);
            let known = position.is_some() || self.keyword.iter().any(|p| p.name == *name);
            let doubled = position.is_some_and(|index| index < overrides.args.len());
            if !known || doubled {
                return Err(DiError::UnexpectedArgument {
                    token: owner.clone(),
                    param: name.to_string(),
                });
            }
        }
        Ok(())
    }
}

/// Positional and keyword values, used both for call-time overrides and
/// for the bound arguments a factory receives.
///
/// ```rust
/// use djx::Arguments;
///
/// let args = Arguments::new().with_arg(3u32).with_kwarg("name", String::from("x"));
/// assert_eq!(*args.positional::<u32>(0).unwrap(), 3);
/// assert_eq!(*args.keyword::<String>("name").unwrap(), "x");
/// ```
#[derive(Clone, Default)]
pub struct Arguments {
    args: Vec<Instance>,
    names: Vec<Cow<'static, str>>,
    kwargs: Vec<(Cow<'static, str>, Instance)>,
    owner: Option<Token>,
}

impl Arguments {
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a positional value.
    pub fn with_arg<T: Send + Sync + 'static>(self, value: T) -> Self {
        self.with_instance(Arc::new(value))
    }

    /// Append an already type-erased positional value.
    pub fn with_instance(mut self, value: Instance) -> Self {
        self.args.push(value);
        self
    }

    /// Set a keyword value, replacing an earlier one of the same name.
    pub fn with_kwarg<T: Send + Sync + 'static>(
        mut self,
        name: impl Into<Cow<'static, str>>,
        value: T,
    ) -> Self {
        let name = name.into();
        self.kwargs.retain(|(n, _)| *n != name);
        self.kwargs.push((name, Arc::new(value) as Instance));
        self
    }

    /// `self` followed by `later`: positionals of `self` come first and
    /// keywords of `later` replace same-named ones of `self`.
    pub fn merged_with(&self, later: &Arguments) -> Arguments {
        let mut kwargs: Vec<_> = self
            .kwargs
            .iter()
            .filter(|(name, _)| later.keyword_instance(name).is_none())
            .cloned()
            .collect();
        kwargs.extend(later.kwargs.iter().cloned());
        Arguments {
            args: self.args.iter().chain(&later.args).cloned().collect(),
            names: Vec::new(),
            kwargs,
            owner: None,
        }
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.args.is_empty() && self.kwargs.is_empty()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.args.len() + self.kwargs.len()
    }

    #[inline]
    pub fn instance(&self, index: usize) -> Option<&Instance> {
        self.args.get(index)
    }

    pub fn keyword_instance(&self, name: &str) -> Option<&Instance> {
        self.kwargs.iter().find(|(n, _)| n == name).map(|(_, v)| v)
    }

    /// Positional value at `index`.
    pub fn positional<T: Send + Sync + 'static>(&self, index: usize) -> Result<Arc<T>> {
        let label = self
            .names
            .get(index)
            .map(|n| n.to_string())
            .unwrap_or_else(|| format!("#{index}"));
        match self.args.get(index) {
            Some(value) => downcast(value, &label),
            None => Err(self.missing(label)),
        }
    }

    /// Keyword value by name.
    pub fn keyword<T: Send + Sync + 'static>(&self, name: &str) -> Result<Arc<T>> {
        match self.keyword_instance(name) {
            Some(value) => downcast(value, name),
            None => Err(self.missing(name.to_string())),
        }
    }

    pub fn try_keyword<T: Send + Sync + 'static>(&self, name: &str) -> Option<Arc<T>> {
        self.keyword_instance(name)
            .and_then(|value| Arc::clone(value).downcast::<T>().ok())
    }

    /// Value of a parameter by name, whether it was bound by position or
    /// by keyword. Positionals following a left-out optional one are only
    /// reachable this way.
    pub fn get<T: Send + Sync + 'static>(&self, name: &str) -> Result<Arc<T>> {
        if let Some(index) = self.names.iter().position(|n| n == name) {
            return self.positional(index);
        }
        self.keyword(name)
    }

    fn missing(&self, param: String) -> DiError {
        DiError::MissingArgument {
            token: self
                .owner
                .clone()
                .unwrap_or_else(|| Token::symbol("<arguments>")),
            param,
        }
    }
}

fn downcast<T: Send + Sync + 'static>(value: &Instance, label: &str) -> Result<Arc<T>> {
    Arc::clone(value)
        .downcast::<T>()
        .map_err(|_: Arc<dyn Any + Send + Sync>| DiError::type_mismatch::<T>(label))
}

impl std::fmt::Debug for Arguments {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Arguments")
            .field("args", &self.args.len())
            .field(
                "kwargs",
                &self.kwargs.iter().map(|(n, _)| n.as_ref()).collect::<Vec<_>>(),
            )
            .finish()
    }
}
