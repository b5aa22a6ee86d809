//! Per-request injector context
//!
//! [`InjectorContextHandler`] holds the application injector and opens a
//! request-scoped child injector around each request, making it current for
//! the duration of the handler.

use crate::scope::REQUEST;
use crate::{DiError, Injector, Registry, Result, Token};
use std::sync::Arc;

#[cfg(feature = "logging")]
use tracing::debug;

/// Opens a request injector per request.
///
/// # Example
///
/// ```rust
/// use djx::{Inject, InjectorContextHandler, Registry};
/// use std::sync::Arc;
///
/// struct Request {
///     path: String,
/// }
///
/// let registry = Arc::new(Registry::new());
/// registry.provide("site").value(String::from("example.org")).register().unwrap();
/// let handler = InjectorContextHandler::new(registry).unwrap();
///
/// let url = handler
///     .handle(Request { path: "/users".into() }, |_| {
///         let site: Inject<String> = Inject::new("site");
///         let request: Inject<Request> = Inject::of();
///         format!("{}{}", site.get().unwrap(), request.get().unwrap().path)
///     })
///     .unwrap();
/// assert_eq!(url, "example.org/users");
/// ```
pub struct InjectorContextHandler {
    main: Injector,
    request_scope: Arc<str>,
}

impl InjectorContextHandler {
    /// Handler using the registry's default scope for the application
    /// injector and `request` for requests.
    pub fn new(registry: Arc<Registry>) -> Result<Self> {
        let app_scope = registry.default_scope().to_string();
        Self::with_scopes(registry, &app_scope, REQUEST)
    }

    /// Handler with explicit application and request scopes. The request
    /// scope must descend from the application scope.
    pub fn with_scopes(registry: Arc<Registry>, app_scope: &str, request_scope: &str) -> Result<Self> {
        let request = registry.scope(request_scope)?;
        if request.name() == app_scope || !request.is_descendant_of(app_scope) {
            return Err(DiError::ScopeMismatch {
                scope: request_scope.to_string(),
                from: app_scope.to_string(),
            });
        }

        Ok(Self {
            main: registry.injector(app_scope)?,
            request_scope: request_scope.into(),
        })
    }

    /// The application injector shared by all requests.
    #[inline]
    pub fn main(&self) -> &Injector {
        &self.main
    }

    #[inline]
    pub fn registry(&self) -> &Arc<Registry> {
        self.main.registry()
    }

    /// A fresh request injector, not yet active.
    pub fn injector(&self) -> Result<Injector> {
        self.main.enter(&self.request_scope)
    }

    fn open<Req: Send + Sync + 'static>(&self, request: Req) -> Result<Injector> {
        let injector = self.injector()?;

        #[cfg(feature = "logging")]
        debug!(
            target: "djx",
            request = std::any::type_name::<Req>(),
            scope = injector.scope_name(),
            "Opening request injector"
        );

        injector.insert_value(Token::of::<Req>(), request);
        Ok(injector)
    }

    /// Run `f` with a request injector active on this thread. The request is
    /// bound under its own type token. The injector and its cached values
    /// are dropped when `f` returns.
    pub fn handle<Req, R, F>(&self, request: Req, f: F) -> Result<R>
    where
        Req: Send + Sync + 'static,
        F: FnOnce(&Injector) -> R,
    {
        let injector = self.open(request)?;
        let _active = injector.activate();
        Ok(f(&injector))
    }

    /// Async form of [`handle`](Self::handle): the request injector is the
    /// task-local current injector while the returned future runs.
    #[cfg(feature = "async")]
    pub async fn handle_async<Req, F, Fut>(&self, request: Req, f: F) -> Result<Fut::Output>
    where
        Req: Send + Sync + 'static,
        F: FnOnce(Injector) -> Fut,
        Fut: std::future::Future,
    {
        let injector = self.open(request)?;
        let future = f(injector.clone());
        Ok(crate::context::scope_async(injector, future).await)
    }
}

impl std::fmt::Debug for InjectorContextHandler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InjectorContextHandler")
            .field("main", &self.main)
            .field("request_scope", &self.request_scope)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Factory, Inject, context};
    use std::sync::atomic::{AtomicU32, Ordering};

    #[derive(Debug, PartialEq)]
    struct Request(u32);

    struct RequestId(u32);

    fn registry() -> Arc<Registry> {
        let registry = Arc::new(Registry::new());
        registry
            .provide("app_name")
            .value(String::from("djx"))
            .register()
            .unwrap();
        registry
    }

    #[test]
    fn test_request_bound_and_active() {
        let handler = InjectorContextHandler::new(registry()).unwrap();
        let seen = handler
            .handle(Request(7), |injector| {
                assert_eq!(injector.scope_name(), "request");
                let request: Inject<Request> = Inject::of();
                request.get().unwrap().0
            })
            .unwrap();
        assert_eq!(seen, 7);
        assert!(context::current().is_none());
    }

    #[test]
    fn test_request_cache_not_shared_between_requests() {
        let registry = registry();
        let next = Arc::new(AtomicU32::new(0));
        let counter = Arc::clone(&next);
        registry
            .provide(Token::of::<RequestId>())
            .factory(Factory::new(move || RequestId(counter.fetch_add(1, Ordering::SeqCst))))
            .cache(true)
            .scope(REQUEST)
            .register()
            .unwrap();
        let handler = InjectorContextHandler::new(registry).unwrap();

        let ids: Vec<u32> = (0..2)
            .map(|_| {
                handler
                    .handle((), |inj| {
                        let a = inj.get::<RequestId>().unwrap();
                        let b = inj.get::<RequestId>().unwrap();
                        assert!(Arc::ptr_eq(&a, &b));
                        a.0
                    })
                    .unwrap()
            })
            .collect();
        assert_eq!(ids, [0, 1]);
    }

    #[test]
    fn test_main_values_shared() {
        let handler = InjectorContextHandler::new(registry()).unwrap();
        let a = handler.handle((), |inj| inj.get_as::<String>("app_name").unwrap()).unwrap();
        let b = handler.handle((), |inj| inj.get_as::<String>("app_name").unwrap()).unwrap();
        assert!(Arc::ptr_eq(&a, &b));
    }

    #[test]
    fn test_invalid_scopes() {
        let registry = registry();
        assert!(matches!(
            InjectorContextHandler::with_scopes(Arc::clone(&registry), "request", "main"),
            Err(DiError::ScopeMismatch { .. })
        ));
        assert!(matches!(
            InjectorContextHandler::with_scopes(registry, "main", "session"),
            Err(DiError::UnknownScope(_))
        ));
    }

    #[cfg(feature = "async")]
    #[tokio::test]
    async fn test_handle_async() {
        let handler = InjectorContextHandler::new(registry()).unwrap();
        let value = handler
            .handle_async(Request(3), |_| async {
                tokio::task::yield_now().await;
                let request: Inject<Request> = Inject::of();
                request.get().unwrap().0
            })
            .await
            .unwrap();
        assert_eq!(value, 3);
    }
}
