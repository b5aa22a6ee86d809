//! Example demonstrating content negotiation through the injector
//!
//! Run with:
//!   cargo run --example negotiation

use djx::negotiation::{self, ContentNegotiator, Parser, Renderer, RequestHeaders, RequestInfo};
use djx::{InjectorContextHandler, Registry};
use std::sync::Arc;

struct JsonRenderer;

impl Renderer for JsonRenderer {
    fn media_type(&self) -> &str {
        "application/json"
    }

    fn format(&self) -> &str {
        "json"
    }
}

struct HtmlRenderer;

impl Renderer for HtmlRenderer {
    fn media_type(&self) -> &str {
        "text/html"
    }

    fn format(&self) -> &str {
        "html"
    }
}

struct FormParser;

impl Parser for FormParser {
    fn media_type(&self) -> &str {
        "application/x-www-form-urlencoded"
    }
}

fn main() {
    println!("=== djx Content Negotiation Demo ===\n");

    let registry = Arc::new(Registry::new());
    negotiation::register(&registry).unwrap();
    let handler = InjectorContextHandler::new(Arc::clone(&registry)).unwrap();

    let renderers: Vec<Arc<dyn Renderer>> = vec![Arc::new(JsonRenderer), Arc::new(HtmlRenderer)];
    let parsers: Vec<Arc<dyn Parser>> = vec![Arc::new(FormParser)];

    let requests = [
        (RequestHeaders::new(), None),
        (RequestHeaders::new().with_accept("text/html, */*;q=0.8"), None),
        (RequestHeaders::new().with_accept("application/*; indent=4"), None),
        (RequestHeaders::new().with_accept("*/*"), Some("html")),
        (RequestHeaders::new().with_accept("image/png"), None),
        (RequestHeaders::new(), Some("xml")),
    ];

    for (headers, format) in requests {
        let outcome = handler
            .handle(headers.clone(), |injector| {
                let negotiator = negotiation::negotiator(injector)?;
                Ok::<_, djx::DiError>(negotiator.select_renderer(&headers, &renderers, format))
            })
            .and_then(|r| r)
            .unwrap();

        let accept = headers.accept().unwrap_or("<none>");
        match outcome {
            Ok((renderer, media_type)) => println!(
                "  Accept: {accept:<28} format: {:<6} -> {} as {media_type}",
                format.unwrap_or("-"),
                renderer.format()
            ),
            Err(err) => println!("  Accept: {accept:<28} format: {:<6} -> {err}", format.unwrap_or("-")),
        }
    }

    let upload = RequestHeaders::new().with_content_type("application/x-www-form-urlencoded; charset=utf-8");
    let parser = handler
        .handle(upload.clone(), |injector| {
            negotiation::negotiator(injector).map(|n| n.select_parser(&upload, &parsers))
        })
        .and_then(|r| r)
        .unwrap();
    println!("\n  Parser for form upload: {:?}", parser.map(|p| p.media_type().to_string()));

    println!("\n=== Demo Complete ===");
}
