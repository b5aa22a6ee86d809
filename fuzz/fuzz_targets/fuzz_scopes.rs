#![no_main]

//! Fuzz target for custom scope trees
//!
//! Builds a random scope tree, registers values into random scopes and
//! checks visibility: a value is visible from an injector exactly when its
//! scope is on the injector's ancestor chain.

use arbitrary::Arbitrary;
use djx::{Registry, Token};
use libfuzzer_sys::fuzz_target;
use std::sync::Arc;

#[derive(Debug, Arbitrary)]
struct Input {
    // parent index for each scope after the root
    parents: Vec<u8>,
    values: Vec<(u8, u16)>,
    enters: Vec<(u8, u8)>,
}

fuzz_target!(|input: Input| {
    let mut builder = Registry::builder().scope("s0", "any");
    let mut names = vec!["s0".to_string()];
    for (i, parent) in input.parents.iter().take(16).enumerate() {
        let name = format!("s{}", i + 1);
        let parent = names[*parent as usize % names.len()].clone();
        builder = builder.scope(name.as_str(), parent);
        names.push(name);
    }
    let registry = Arc::new(builder.build().unwrap());

    for (scope, value) in &input.values {
        let scope = &names[*scope as usize % names.len()];
        registry.provide(Token::symbol(scope.as_str())).value(*value).scope(scope.as_str()).register().unwrap();
    }

    for (from, to) in input.enters {
        let from = &names[from as usize % names.len()];
        let to = &names[to as usize % names.len()];
        let Ok(outer) = registry.injector(from) else {
            continue;
        };

        let target = registry.scope(to).unwrap();
        match outer.enter(to) {
            Ok(inner) => {
                assert!(target.is_descendant_of(from) && from != to);
                for scope in &names {
                    let visible = inner.contains(&Token::symbol(scope.as_str()));
                    let provided = registry.scope(scope).unwrap().contains(&Token::symbol(scope.as_str()));
                    assert_eq!(visible, provided && target.is_descendant_of(scope));
                }
            }
            Err(_) => assert!(!target.is_descendant_of(from) || from == to),
        }
    }
});
