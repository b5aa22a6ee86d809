#![no_main]

//! Fuzz target for media type parsing and renderer selection
//!
//! Arbitrary Accept headers and format suffixes against a fixed renderer
//! set. Selection either succeeds with a renderer that matches the chosen
//! media type or fails with one of the two negotiation errors.

use arbitrary::Arbitrary;
use djx::negotiation::{ContentNegotiator, DefaultContentNegotiator, NegotiationError, Renderer, RequestHeaders};
use djx::{MediaType, media_type_matches, order_by_precedence};
use libfuzzer_sys::fuzz_target;
use std::sync::Arc;

struct Fixed(&'static str, &'static str);

impl Renderer for Fixed {
    fn media_type(&self) -> &str {
        self.0
    }

    fn format(&self) -> &str {
        self.1
    }
}

#[derive(Debug, Arbitrary)]
struct Input {
    accept: Option<String>,
    format: Option<String>,
    lhs: String,
    rhs: String,
}

fuzz_target!(|input: Input| {
    // Parsing never fails and precedence stays in range
    let lhs = MediaType::parse(&input.lhs);
    assert!(lhs.precedence() <= 3);
    let _ = media_type_matches(&input.lhs, &input.rhs);
    assert!(MediaType::parse("*/*").matches(&lhs));

    let groups = order_by_precedence(input.lhs.split(','));
    assert!(groups.iter().all(|g| !g.is_empty()));

    let renderers: Vec<Arc<dyn Renderer>> = vec![
        Arc::new(Fixed("application/json", "json")),
        Arc::new(Fixed("text/html", "html")),
    ];
    let mut request = RequestHeaders::new();
    if let Some(accept) = &input.accept {
        request = request.with_accept(accept.as_str());
    }

    match DefaultContentNegotiator.select_renderer(&request, &renderers, input.format.as_deref()) {
        Ok((renderer, _)) => {
            if let Some(format) = input.format.as_deref().filter(|f| !f.is_empty()) {
                assert_eq!(renderer.format(), format);
            }
        }
        Err(NegotiationError::FormatNotFound(format)) => {
            assert!(format != "json" && format != "html");
        }
        Err(NegotiationError::NotAcceptable(_)) => {}
    }
});
