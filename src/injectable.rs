//! Injectable types and provider modules
//!
//! [`Injectable`] is the typed way to register a constructor: the type
//! declares its [`Signature`] and builds itself from the bound
//! [`Arguments`]. `#[derive(Injectable)]` (feature `derive`) generates both
//! from struct fields.
//!
//! # Example
//!
//! ```rust
//! use djx::{Arguments, Injectable, Parameter, Registry, Result, Signature};
//! use std::sync::Arc;
//!
//! struct Database {
//!     url: String,
//! }
//!
//! struct UserRepository {
//!     db: Arc<Database>,
//! }
//!
//! impl Injectable for UserRepository {
//!     fn signature() -> Signature {
//!         Signature::new().param(Parameter::keyword("db").inject(djx::depends::<Database>()))
//!     }
//!
//!     fn construct(args: &Arguments) -> Result<Self> {
//!         Ok(UserRepository { db: args.keyword("db")? })
//!     }
//! }
//!
//! let registry = Arc::new(Registry::new());
//! registry.provide_value(Database { url: "postgres://localhost".into() }).unwrap();
//! registry.injectable::<UserRepository>().register().unwrap();
//!
//! let injector = registry.injector("main").unwrap();
//! let repo = injector.get::<UserRepository>().unwrap();
//! assert_eq!(repo.db.url, "postgres://localhost");
//! ```

use crate::{Arguments, Registry, Result, Signature, Token};

/// A type constructed by the injector from a declared signature.
pub trait Injectable: Send + Sync + Sized + 'static {
    /// Parameters of the constructor. Defaults to none.
    fn signature() -> Signature {
        Signature::new()
    }

    /// Build the value from its bound arguments.
    fn construct(args: &Arguments) -> Result<Self>;

    /// Candidate tokens of every injected parameter, in declaration order.
    fn dependency_tokens() -> Vec<Token> {
        Self::signature()
            .params()
            .iter()
            .filter_map(|p| p.dependency())
            .flat_map(|d| d.deps().iter().cloned())
            .collect()
    }
}

/// A group of related registrations.
///
/// ```rust
/// use djx::{Module, Registry, Result};
///
/// struct Defaults;
///
/// impl Module for Defaults {
///     fn register(registry: &Registry) -> Result<()> {
///         registry.provide("page_size").value(50usize).register()?;
///         registry.alias("limit", "page_size")?;
///         Ok(())
///     }
/// }
///
/// let registry = Registry::new();
/// Defaults::register(&registry).unwrap();
/// assert!(registry.is_provided(&"limit".into()));
/// ```
pub trait Module {
    /// Register everything this module provides.
    fn register(registry: &Registry) -> Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{DiError, Parameter, depends};
    use std::sync::Arc;

    struct Config {
        debug: bool,
    }

    impl Injectable for Config {
        fn construct(_: &Arguments) -> Result<Self> {
            Ok(Config { debug: true })
        }
    }

    struct Logger {
        config: Arc<Config>,
        prefix: Arc<String>,
    }

    impl Injectable for Logger {
        fn signature() -> Signature {
            Signature::new()
                .param(Parameter::positional("config").inject(depends::<Config>()))
                .param(Parameter::keyword("prefix").default_value(String::from("app")))
        }

        fn construct(args: &Arguments) -> Result<Self> {
            Ok(Logger {
                config: args.positional(0)?,
                prefix: args.keyword("prefix")?,
            })
        }
    }

    #[test]
    fn test_injectable_resolution() {
        let registry = Arc::new(Registry::new());
        registry.injectable::<Config>().cache(true).register().unwrap();
        registry.injectable::<Logger>().register().unwrap();

        let injector = registry.injector("main").unwrap();
        let logger = injector.get::<Logger>().unwrap();
        assert!(logger.config.debug);
        assert_eq!(*logger.prefix, "app");
        assert!(Arc::ptr_eq(&logger.config, &injector.get::<Config>().unwrap()));
    }

    #[test]
    fn test_missing_dependency_fails() {
        let registry = Arc::new(Registry::new());
        registry.injectable::<Logger>().register().unwrap();
        let injector = registry.injector("main").unwrap();
        assert!(matches!(injector.get::<Logger>(), Err(DiError::Unresolved { .. })));
    }

    #[test]
    fn test_dependency_tokens() {
        assert_eq!(Logger::dependency_tokens(), vec![Token::of::<Config>()]);
        assert!(Config::dependency_tokens().is_empty());
    }
}
