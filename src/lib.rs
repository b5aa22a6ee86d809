//! # djx - Scoped Dependency Injection for Web Applications
//!
//! A provider registry partitioned into named scopes, injectors that bind
//! and cache providers per scope activation, declarative dependencies for
//! factory parameters, and REST content negotiation on top.
//!
//! ## Features
//!
//! - **Tokens** - types, string symbols and generic forms share one key space
//! - **Providers** - values, late-bound aliases and factories with declared signatures
//! - **Scopes** - `any` -> `main` -> `request` by default, or a custom tree
//! - **Caching** - opt-in per provider, one write-once cell per injector binding
//! - **Dependencies** - candidate lists, scope pinning and explicit defaults
//! - **Request context** - a request injector made current for each request
//! - **Observable** - optional tracing integration with JSON or pretty output
//!
//! ## Quick Start
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
//!         |args: &Arguments| Ok(args.get::<String>("greeting")?.to_uppercase()),
//!     ))
//!     .register()
//!     .unwrap();
//!
//! let injector = registry.injector("main").unwrap();
//! assert_eq!(*injector.get_as::<String>("shout").unwrap(), "HI");
//! ```
//!
//! ## Scopes
//!
//! ```rust
//! use djx::{Factory, Registry};
//! use std::sync::Arc;
//!
//! struct RequestId(u64);
//!
//! let registry = Arc::new(Registry::new());
//! registry.provide("app").value(String::from("shop")).register().unwrap();
//! registry
//!     .provide("request_id")
//!     .factory(Factory::new(|| RequestId(7)))
//!     .scope("request")
//!     .cache(true)
//!     .register()
//!     .unwrap();
//!
//! let main = registry.injector("main").unwrap();
//! let request = main.enter("request").unwrap();
//!
//! // request injectors see main's providers, main does not see request's
//! assert!(request.get_as::<String>("app").is_ok());
//! assert_eq!(request.get_as::<RequestId>("request_id").unwrap().0, 7);
//! assert!(main.get_as::<RequestId>("request_id").is_err());
//! ```

// Lets `#[derive(Injectable)]` expansions name `::djx` inside this crate
extern crate self as djx;

pub mod context;
mod dependency;
mod error;
mod handler;
mod injectable;
mod injector;
#[cfg(feature = "logging")]
pub mod logging;
pub mod media_type;
pub mod negotiation;
mod provider;
mod registry;
mod resolver;
pub mod scope;
mod signature;
mod token;

pub use dependency::*;
pub use error::*;
pub use handler::*;
pub use injectable::*;
pub use injector::*;
pub use media_type::{MediaType, media_type_matches, order_by_precedence};
pub use provider::*;
pub use registry::*;
pub use resolver::*;
pub use scope::{ANY, MAIN, REQUEST, Scope};
pub use signature::*;
pub use token::*;

#[cfg(feature = "derive")]
pub use djx_derive::Injectable;

// Re-export tracing macros for convenience when logging feature is enabled
#[cfg(feature = "logging")]
pub use tracing::{debug, error, info, trace, warn};

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::{
        Arguments, Dependency, DiError, Factory, Inject, Injectable, Injector, InjectorContextHandler,
        Module, Parameter, Registry, Result, Signature, Token, depends,
    };
    pub use std::sync::Arc;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::negotiation::{ContentNegotiator, Renderer, RequestHeaders};
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[derive(Debug)]
    struct Database {
        url: String,
    }

    fn registry() -> Arc<Registry> {
        Arc::new(Registry::new())
    }

    #[test]
    fn test_value_identity() {
        let registry = registry();
        registry
            .provide(Token::of::<Database>())
            .value(Database { url: "test".into() })
            .register()
            .unwrap();

        let injector = registry.injector("main").unwrap();
        let db1 = injector.get::<Database>().unwrap();
        let db2 = injector.get::<Database>().unwrap();
        assert_eq!(db1.url, "test");
        assert!(Arc::ptr_eq(&db1, &db2));
    }

    #[test]
    fn test_greeting_and_shout() {
        let registry = registry();
        registry.provide("greeting").value(String::from("hi")).register().unwrap();
        registry
            .provide("shout")
            .factory(Factory::with_signature(
                Signature::new().param(Parameter::positional("greeting").inject("greeting")),
                |args: &Arguments| Ok(args.positional::<String>(0)?.to_uppercase()),
            ))
            .register()
            .unwrap();

        let injector = registry.injector("main").unwrap();
        assert_eq!(*injector.get_as::<String>("greeting").unwrap(), "hi");
        assert_eq!(*injector.get_as::<String>("shout").unwrap(), "HI");
    }

    #[test]
    fn test_cached_and_uncached_factories() {
        let registry = registry();
        registry
            .provide("cached")
            .factory(Factory::new(|| vec![0u8; 4]))
            .cache(true)
            .register()
            .unwrap();
        registry
            .provide("fresh")
            .factory(Factory::new(|| vec![0u8; 4]))
            .register()
            .unwrap();

        let injector = registry.injector("main").unwrap();
        let a = injector.get_as::<Vec<u8>>("cached").unwrap();
        let b = injector.get_as::<Vec<u8>>("cached").unwrap();
        assert!(Arc::ptr_eq(&a, &b));

        let c = injector.get_as::<Vec<u8>>("fresh").unwrap();
        let d = injector.get_as::<Vec<u8>>("fresh").unwrap();
        assert!(!Arc::ptr_eq(&c, &d));
    }

    #[test]
    fn test_late_bound_alias() {
        let registry = registry();
        registry.provide("b").value(1u32).register().unwrap();
        registry.alias("a", "b").unwrap();

        let injector = registry.injector("main").unwrap();
        assert_eq!(*injector.get_as::<u32>("a").unwrap(), 1);

        registry.provide("b").value(2u32).register().unwrap();
        assert_eq!(*injector.get_as::<u32>("a").unwrap(), 2);
        assert_eq!(
            *injector.get_as::<u32>("a").unwrap(),
            *injector.get_as::<u32>("b").unwrap()
        );
    }

    #[test]
    fn test_unregistered_token_is_lookup_error() {
        let injector = registry().injector("request").unwrap();
        let err = injector.resolve(&Token::symbol("nothing")).unwrap_err();
        assert!(err.is_lookup());
        assert!(injector.try_get::<Database>().is_none());
    }

    #[test]
    fn test_dependency_default_when_nothing_resolves() {
        let injector = registry().injector("main").unwrap();
        let dep = Dependency::any_of(["a", "b"]).default_value(String::from("d"));
        assert_eq!(*dep.resolve_as::<String>(&injector).unwrap(), "d");
    }

    #[test]
    fn test_request_scope_sharing() {
        let registry = registry();
        let created = Arc::new(AtomicU32::new(0));
        let counter = Arc::clone(&created);
        registry
            .provide("session")
            .factory(Factory::new(move || counter.fetch_add(1, Ordering::SeqCst)))
            .cache(true)
            .scope(REQUEST)
            .register()
            .unwrap();
        registry
            .provide(Token::of::<Database>())
            .factory(Factory::new(|| Database { url: "pool".into() }))
            .cache(true)
            .register()
            .unwrap();

        let handler = InjectorContextHandler::new(Arc::clone(&registry)).unwrap();
        let dbs: Vec<Arc<Database>> = (0..3)
            .map(|_| {
                handler
                    .handle((), |inj| {
                        inj.get_as::<u32>("session").unwrap();
                        Inject::<Database>::of().get().unwrap()
                    })
                    .unwrap()
            })
            .collect();

        assert!(dbs.windows(2).all(|w| Arc::ptr_eq(&w[0], &w[1])));
        assert_eq!(created.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn test_injector_resolves_itself_in_factories() {
        let registry = registry();
        registry
            .provide("scope_name")
            .factory(Factory::with_signature(
                Signature::new().param(Parameter::keyword("injector").inject(depends::<Injector>())),
                |args: &Arguments| Ok(args.keyword::<Injector>("injector")?.scope_name().to_string()),
            ))
            .scope(REQUEST)
            .register()
            .unwrap();

        let injector = registry.injector("request").unwrap();
        assert_eq!(*injector.get_as::<String>("scope_name").unwrap(), "request");
    }

    #[test]
    fn test_make_with_overrides() {
        let registry = registry();
        registry
            .provide("greet")
            .factory(Factory::with_signature(
                Signature::new()
                    .param(Parameter::positional("name").default_value(String::from("world")))
                    .param(Parameter::keyword("punct").default_value('!')),
                |args: &Arguments| {
                    Ok(format!(
                        "hello {}{}",
                        args.get::<String>("name")?,
                        args.keyword::<char>("punct")?
                    ))
                },
            ))
            .cache(true)
            .register()
            .unwrap();

        let injector = registry.injector("main").unwrap();
        let custom = injector
            .make(
                &"greet".into(),
                Arguments::new().with_arg(String::from("djx")).with_kwarg("punct", '?'),
            )
            .unwrap();
        assert_eq!(*custom.downcast::<String>().unwrap(), "hello djx?");
        assert_eq!(*injector.get_as::<String>("greet").unwrap(), "hello world!");
    }

    #[test]
    fn test_alias_with_preset_arguments() {
        let registry = registry();
        registry
            .provide("join")
            .factory(Factory::with_signature(
                Signature::new()
                    .param(Parameter::positional("head"))
                    .param(Parameter::positional("tail").default_value(String::from("end")))
                    .param(Parameter::keyword("sep").default_value('-')),
                |args: &Arguments| {
                    Ok(format!(
                        "{}{}{}",
                        args.positional::<String>(0)?,
                        args.keyword::<char>("sep")?,
                        args.get::<String>("tail")?
                    ))
                },
            ))
            .register()
            .unwrap();
        registry
            .provide("joined")
            .alias_with(
                "join",
                Arguments::new().with_arg(String::from("start")).with_kwarg("sep", '+'),
            )
            .cache(true)
            .register()
            .unwrap();

        let injector = registry.injector("main").unwrap();
        let a = injector.get_as::<String>("joined").unwrap();
        let b = injector.get_as::<String>("joined").unwrap();
        assert_eq!(*a, "start+end");
        assert!(Arc::ptr_eq(&a, &b));

        let token = Token::symbol("joined");
        let later = injector
            .make(&token, Arguments::new().with_arg(String::from("mid")))
            .unwrap();
        assert_eq!(*later.downcast::<String>().unwrap(), "start+mid");
        let keyed = injector
            .make(&token, Arguments::new().with_kwarg("sep", '/'))
            .unwrap();
        assert_eq!(*keyed.downcast::<String>().unwrap(), "start/end");
        assert!(Arc::ptr_eq(&injector.get_as::<String>("joined").unwrap(), &a));
    }

    struct Json;

    impl Renderer for Json {
        fn media_type(&self) -> &str {
            "application/json"
        }

        fn format(&self) -> &str {
            "json"
        }
    }

    #[test]
    fn test_negotiation_scenarios() {
        let registry = registry();
        negotiation::register(&registry).unwrap();
        let negotiator = negotiation::negotiator(&registry.injector("request").unwrap()).unwrap();
        let renderers: Vec<Arc<dyn Renderer>> = vec![Arc::new(Json)];

        let any = RequestHeaders::new().with_accept("*/*");
        let (renderer, media_type) = negotiator.select_renderer(&any, &renderers, None).unwrap();
        assert_eq!(renderer.media_type(), "application/json");
        assert_eq!(media_type, "application/json");

        let exact = RequestHeaders::new().with_accept("application/json;indent=8");
        let (_, media_type) = negotiator.select_renderer(&exact, &renderers, None).unwrap();
        assert_eq!(media_type, "application/json;indent=8");
    }

    #[cfg(feature = "derive")]
    mod derive {
        use crate::{DiError, Injectable, Registry, Token};
        use std::sync::Arc;

        struct Database {
            url: String,
        }

        struct Cache;

        #[derive(Injectable)]
        struct UserService {
            #[inject]
            db: Arc<Database>,
            #[inject(optional)]
            cache: Option<Arc<Cache>>,
            #[inject(token = "greeting", scope = "main")]
            greeting: Arc<String>,
            requests: u64,
        }

        #[test]
        fn test_derived_injectable() {
            let registry = Arc::new(Registry::new());
            registry.provide_value(Database { url: "db".into() }).unwrap();
            registry.provide("greeting").value(String::from("hi")).register().unwrap();
            registry.injectable::<UserService>().register().unwrap();

            let request = registry.injector("request").unwrap();
            let service = request.get::<UserService>().unwrap();
            assert_eq!(service.db.url, "db");
            assert!(service.cache.is_none());
            assert_eq!(*service.greeting, "hi");
            assert_eq!(service.requests, 0);

            assert_eq!(
                UserService::dependency_tokens(),
                vec![Token::of::<Database>(), Token::of::<Cache>(), Token::symbol("greeting")]
            );
        }

        #[test]
        fn test_derived_missing_dependency() {
            let registry = Arc::new(Registry::new());
            registry.injectable::<UserService>().register().unwrap();
            let err = registry.injector("main").unwrap().get::<UserService>().err().unwrap();
            assert!(matches!(err, DiError::Unresolved { .. }));
        }
    }
}
