//! Example demonstrating the #[derive(Injectable)] macro
//!
//! Run with:
//!   cargo run --example derive --features derive

use djx::{Injectable, Registry};
use std::sync::Arc;

struct Database {
    url: String,
}

struct Cache {
    size: usize,
}

#[allow(dead_code)]
struct Logger {
    level: String,
}

#[derive(Injectable)]
struct UserService {
    #[inject]
    db: Arc<Database>,
    #[inject]
    cache: Arc<Cache>,
    #[inject(optional)]
    logger: Option<Arc<Logger>>,
    #[inject(token = "app_name")]
    app_name: Arc<String>,
    // Non-injected field uses Default
    request_count: u64,
}

impl UserService {
    fn describe(&self) -> String {
        let logger_status = if self.logger.is_some() {
            "with logging"
        } else {
            "without logging"
        };
        format!(
            "{} connected to {} with cache size {} ({}, requests: {})",
            self.app_name, self.db.url, self.cache.size, logger_status, self.request_count
        )
    }
}

// Nested injection, resolved from the request scope
#[allow(dead_code)]
#[derive(Injectable)]
struct ApiController {
    #[inject]
    user_service: Arc<UserService>,
    #[inject(scope = "main")]
    db: Arc<Database>,
}

fn main() {
    println!("=== djx Derive Macro Demo ===\n");

    let registry = Arc::new(Registry::new());
    registry
        .provide_value(Database {
            url: "postgres://localhost:5432/myapp".into(),
        })
        .unwrap();
    registry.provide_value(Cache { size: 1024 }).unwrap();
    registry.provide("app_name").value(String::from("UserService")).register().unwrap();
    // Logger is NOT registered, so it will be None

    registry.injectable::<UserService>().cache(true).register().unwrap();
    registry.injectable::<ApiController>().scope("request").register().unwrap();

    println!("UserService depends on {:?}\n", UserService::dependency_tokens());

    let main = registry.injector("main").unwrap();
    let user_service = main.get::<UserService>().expect("Failed to create UserService");
    println!("  {}", user_service.describe());

    let request = main.enter("request").unwrap();
    let controller = request.get::<ApiController>().expect("Failed to create ApiController");
    assert!(Arc::ptr_eq(&controller.user_service, &user_service));
    println!("  ApiController shares the cached UserService");

    println!("\n=== Demo Complete ===");
}
