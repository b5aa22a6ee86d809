//! Example demonstrating logging capabilities
//!
//! Run with JSON logging (production):
//! ```bash
//! cargo run --example logging --features logging-json
//! ```
//!
//! Run with pretty logging (development):
//! ```bash
//! cargo run --example logging --features logging-pretty
//! ```

use djx::{Factory, InjectorContextHandler, Registry, Token};
use std::sync::Arc;

#[allow(dead_code)]
struct Database {
    url: String,
}

#[allow(dead_code)]
struct RequestContext {
    request_id: String,
}

fn main() {
    // JSON if logging-json is enabled, pretty if only logging-pretty
    djx::logging::init();

    println!("=== djx Logging Demo ===\n");

    // Registering provider (x3)
    let registry = Arc::new(Registry::new());
    registry
        .provide_value(Database {
            url: "postgres://localhost/mydb".into(),
        })
        .unwrap();
    registry
        .provide(Token::of::<RequestContext>())
        .factory(Factory::new(|| RequestContext {
            request_id: "req-12345".into(),
        }))
        .scope("request")
        .cache(true)
        .register()
        .unwrap();
    registry.alias("db", Token::of::<Database>()).unwrap();

    // Provider replaced an earlier registration
    registry.provide("greeting").value(String::from("hello")).register().unwrap();
    registry.provide("greeting").value(String::from("hi")).register().unwrap();

    // Creating injector
    let handler = InjectorContextHandler::new(Arc::clone(&registry)).unwrap();

    // Opening request injector, Creating injector, Activating injector,
    // Setting up provider, Resolved from ancestor injector
    handler
        .handle("GET /users", |injector| {
            let _ctx = injector.get::<RequestContext>().unwrap();
            let _db = injector.get_as::<Database>("db").unwrap();
            let _greeting = injector.get_as::<String>("greeting").unwrap();

            // Resolved from binding cache
            let _again = injector.get::<RequestContext>().unwrap();

            // No provider found in scope chain
            assert!(injector.try_get::<u64>().is_none());
        })
        .unwrap();

    // Registry locked
    registry.lock();
    assert!(registry.provide("late").value(1u8).register().is_err());

    println!("\n=== Demo Complete ===");
    println!("Check the log output above to see structured logging in action!");
    println!("\nTip: Use --features logging-json for production (JSON output)");
    println!("     Use --features logging-pretty for development (colorful output)");
}
