//! Content negotiation
//!
//! Selects the parser for a request body from its `Content-Type`, and the
//! renderer plus response media type from its `Accept` header. The default
//! negotiator is registered in the `main` scope by [`register`].

use crate::media_type::{MediaType, media_type_matches, order_by_precedence};
use crate::scope::MAIN;
use crate::{Factory, Injector, Module, Registry, Result, Token};
use std::sync::Arc;
use thiserror::Error;

#[cfg(feature = "logging")]
use tracing::{debug, trace};

/// Negotiation failures.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum NegotiationError {
    /// No renderer matches any accepted media type
    #[error("{0} is not acceptable")]
    NotAcceptable(String),

    /// A format suffix was requested that no renderer produces
    #[error("No renderer for format `{0}`")]
    FormatNotFound(String),
}

/// Headers negotiation looks at.
pub trait RequestInfo {
    /// `Content-Type` of the request body.
    fn content_type(&self) -> Option<&str>;

    /// Raw `Accept` header.
    fn accept(&self) -> Option<&str>;
}

/// Something that parses request bodies of one media type.
pub trait Parser: Send + Sync {
    fn media_type(&self) -> &str;
}

/// Something that renders responses of one media type.
pub trait Renderer: Send + Sync {
    fn media_type(&self) -> &str;

    /// Format suffix, e.g. `json` for `/users.json`.
    fn format(&self) -> &str;
}

/// Chooses parsers and renderers for a request.
pub trait ContentNegotiator: Send + Sync {
    /// The first parser accepting the request's content type.
    fn select_parser(&self, request: &dyn RequestInfo, parsers: &[Arc<dyn Parser>]) -> Option<Arc<dyn Parser>>;

    /// The renderer and the media type the response is sent as.
    fn select_renderer(
        &self,
        request: &dyn RequestInfo,
        renderers: &[Arc<dyn Renderer>],
        format: Option<&str>,
    ) -> std::result::Result<(Arc<dyn Renderer>, String), NegotiationError>;
}

/// Negotiation by media type precedence.
///
/// # Example
///
/// ```rust
/// use djx::negotiation::{ContentNegotiator, DefaultContentNegotiator, Renderer, RequestHeaders};
/// use std::sync::Arc;
///
/// struct Json;
/// impl Renderer for Json {
///     fn media_type(&self) -> &str { "application/json" }
///     fn format(&self) -> &str { "json" }
/// }
///
/// let renderers: Vec<Arc<dyn Renderer>> = vec![Arc::new(Json)];
/// let request = RequestHeaders::new().with_accept("*/*; indent=4");
/// let (_, media_type) = DefaultContentNegotiator
///     .select_renderer(&request, &renderers, None)
///     .unwrap();
/// assert_eq!(media_type, "application/json;indent=4");
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultContentNegotiator;

impl DefaultContentNegotiator {
    /// Keep only the renderers producing `format`.
    pub fn filter_renderers(
        &self,
        renderers: &[Arc<dyn Renderer>],
        format: &str,
    ) -> std::result::Result<Vec<Arc<dyn Renderer>>, NegotiationError> {
        let filtered: Vec<_> = renderers
            .iter()
            .filter(|r| r.format() == format)
            .cloned()
            .collect();
        if filtered.is_empty() {
            return Err(NegotiationError::FormatNotFound(format.to_string()));
        }
        Ok(filtered)
    }

    /// Accepted media type strings, `*/*` when the header is absent.
    pub fn get_accept_list(&self, request: &dyn RequestInfo) -> Vec<String> {
        request
            .accept()
            .unwrap_or("*/*")
            .split(',')
            .map(|token| token.trim().to_string())
            .collect()
    }
}

impl ContentNegotiator for DefaultContentNegotiator {
    fn select_parser(&self, request: &dyn RequestInfo, parsers: &[Arc<dyn Parser>]) -> Option<Arc<dyn Parser>> {
        let content_type = request.content_type().unwrap_or_default();
        parsers
            .iter()
            .find(|p| media_type_matches(p.media_type(), content_type))
            .cloned()
    }

    fn select_renderer(
        &self,
        request: &dyn RequestInfo,
        renderers: &[Arc<dyn Renderer>],
        format: Option<&str>,
    ) -> std::result::Result<(Arc<dyn Renderer>, String), NegotiationError> {
        let filtered;
        let renderers = match format.filter(|f| !f.is_empty()) {
            Some(format) => {
                filtered = self.filter_renderers(renderers, format)?;
                filtered.as_slice()
            }
            None => renderers,
        };

        let accepts = self.get_accept_list(request);

        for media_type_set in order_by_precedence(&accepts) {
            for renderer in renderers {
                let offered = MediaType::parse(renderer.media_type());
                for media_type in &media_type_set {
                    let requested = MediaType::parse(media_type);
                    if !offered.matches(&requested) {
                        continue;
                    }

                    #[cfg(feature = "logging")]
                    trace!(
                        target: "djx",
                        renderer = renderer.media_type(),
                        accepted = %media_type,
                        "Renderer matched"
                    );

                    // the more specific side decides the response type
                    let selected = if offered.precedence() > requested.precedence() {
                        std::iter::once(renderer.media_type().to_string())
                            .chain(requested.params().iter().map(|(k, v)| format!("{k}={v}")))
                            .collect::<Vec<_>>()
                            .join(";")
                    } else {
                        media_type.clone()
                    };
                    return Ok((Arc::clone(renderer), selected));
                }
            }
        }

        #[cfg(feature = "logging")]
        debug!(target: "djx", accept = ?accepts, "No acceptable renderer");

        Err(NegotiationError::NotAcceptable(accepts.join(" ")))
    }
}

/// Plain header values implementing [`RequestInfo`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestHeaders {
    content_type: Option<String>,
    accept: Option<String>,
}

impl RequestHeaders {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_content_type(mut self, value: impl Into<String>) -> Self {
        self.content_type = Some(value.into());
        self
    }

    pub fn with_accept(mut self, value: impl Into<String>) -> Self {
        self.accept = Some(value.into());
        self
    }
}

impl RequestInfo for RequestHeaders {
    fn content_type(&self) -> Option<&str> {
        self.content_type.as_deref()
    }

    fn accept(&self) -> Option<&str> {
        self.accept.as_deref()
    }
}

/// Registers [`DefaultContentNegotiator`] as the `main`-scoped, cached
/// `dyn ContentNegotiator`.
pub struct NegotiationModule;

impl Module for NegotiationModule {
    fn register(registry: &Registry) -> Result<()> {
        registry
            .provide(Token::of::<dyn ContentNegotiator>())
            .factory(Factory::new(|| {
                Arc::new(DefaultContentNegotiator) as Arc<dyn ContentNegotiator>
            }))
            .scope(MAIN)
            .cache(true)
            .register()?;
        Ok(())
    }
}

/// Register the default negotiator.
#[inline]
pub fn register(registry: &Registry) -> Result<()> {
    NegotiationModule::register(registry)
}

/// The negotiator visible from `injector`.
pub fn negotiator(injector: &Injector) -> Result<Arc<dyn ContentNegotiator>> {
    let negotiator = injector.get_as::<Arc<dyn ContentNegotiator>>(Token::of::<dyn ContentNegotiator>())?;
    Ok(Arc::clone(&*negotiator))
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Fixed(&'static str, &'static str);

    impl Renderer for Fixed {
        fn media_type(&self) -> &str {
            self.0
        }

        fn format(&self) -> &str {
            self.1
        }
    }

    impl Parser for Fixed {
        fn media_type(&self) -> &str {
            self.0
        }
    }

    fn renderers() -> Vec<Arc<dyn Renderer>> {
        vec![
            Arc::new(Fixed("application/json", "json")),
            Arc::new(Fixed("text/html", "html")),
        ]
    }

    fn select(accept: Option<&str>, format: Option<&str>) -> std::result::Result<(String, String), NegotiationError> {
        let mut request = RequestHeaders::new();
        if let Some(accept) = accept {
            request = request.with_accept(accept);
        }
        DefaultContentNegotiator
            .select_renderer(&request, &renderers(), format)
            .map(|(r, mt)| (r.media_type().to_string(), mt))
    }

    #[test]
    fn test_missing_accept_picks_first_renderer() {
        let (renderer, media_type) = select(None, None).unwrap();
        assert_eq!(renderer, "application/json");
        assert_eq!(media_type, "application/json");
    }

    #[test]
    fn test_exact_request_returned_verbatim() {
        let (renderer, media_type) = select(Some("text/html, application/json; indent=8"), None).unwrap();
        // precedence 3 group is tried first
        assert_eq!(renderer, "application/json");
        assert_eq!(media_type, "application/json; indent=8");
    }

    #[test]
    fn test_wildcard_params_are_carried_over() {
        let (renderer, media_type) = select(Some("text/*; q=0.5"), None).unwrap();
        assert_eq!(renderer, "text/html");
        assert_eq!(media_type, "text/html;q=0.5");
    }

    #[test]
    fn test_not_acceptable() {
        let err = select(Some("image/png, image/gif"), None).unwrap_err();
        assert_eq!(err, NegotiationError::NotAcceptable("image/png image/gif".into()));
    }

    #[test]
    fn test_format_filter() {
        let (renderer, _) = select(Some("*/*"), Some("html")).unwrap();
        assert_eq!(renderer, "text/html");
        assert_eq!(
            select(Some("*/*"), Some("xml")).unwrap_err(),
            NegotiationError::FormatNotFound("xml".into())
        );
        // an empty suffix means no format
        assert_eq!(select(None, Some("")).unwrap().0, "application/json");
    }

    #[test]
    fn test_select_parser() {
        let parsers: Vec<Arc<dyn Parser>> = vec![
            Arc::new(Fixed("application/json", "json")),
            Arc::new(Fixed("multipart/form-data", "form")),
        ];
        let request = RequestHeaders::new().with_content_type("multipart/form-data; boundary=x");
        let parser = DefaultContentNegotiator.select_parser(&request, &parsers).unwrap();
        assert_eq!(parser.media_type(), "multipart/form-data");

        let none = DefaultContentNegotiator.select_parser(&RequestHeaders::new(), &parsers);
        assert!(none.is_none());
    }

    #[test]
    fn test_registered_negotiator_is_cached_in_main() {
        let registry = Arc::new(Registry::new());
        register(&registry).unwrap();

        let main = registry.injector("main").unwrap();
        let request = main.enter("request").unwrap();
        let a = negotiator(&main).unwrap();
        let b = negotiator(&request).unwrap();
        assert!(Arc::ptr_eq(&a, &b));
    }
}
