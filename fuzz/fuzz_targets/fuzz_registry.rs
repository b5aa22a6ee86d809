#![no_main]

//! Fuzz target for registration and resolution
//!
//! Registers values, aliases and factories under a handful of symbol tokens
//! in random order, including alias cycles, and resolves them from main and
//! request injectors. Every lookup must return, never panic or overflow.

use arbitrary::Arbitrary;
use djx::{Arguments, DiError, Factory, Parameter, Registry, Signature, Token};
use libfuzzer_sys::fuzz_target;
use std::sync::Arc;

const NAMES: [&str; 6] = ["a", "b", "c", "d", "e", "f"];

fn token(index: u8) -> Token {
    Token::symbol(NAMES[index as usize % NAMES.len()])
}

fn scope(request: bool) -> &'static str {
    if request { "request" } else { "main" }
}

#[derive(Debug, Arbitrary)]
enum RegistryOp {
    Value { name: u8, value: u32, request: bool },
    Alias { name: u8, target: u8, cache: bool },
    Factory { name: u8, dep: u8, cache: bool, request: bool },
    FactoryWithDefault { name: u8, dep: u8, fallback: u32 },
    ResolveMain(u8),
    ResolveRequest(u8),
    MakeWithArg { name: u8, arg: u32 },
    InsertRequest { name: u8, value: u32 },
    EnterRequest,
    Lock,
}

fuzz_target!(|ops: Vec<RegistryOp>| {
    let registry = Arc::new(Registry::new());
    let main = registry.injector("main").unwrap();
    let mut request = main.enter("request").unwrap();
    let mut locked = false;

    for op in ops {
        match op {
            RegistryOp::Value { name, value, request } => {
                let result = registry.provide(token(name)).value(value).scope(scope(request)).register();
                assert_eq!(result.is_err(), locked);
            }
            RegistryOp::Alias { name, target, cache } => {
                let _ = registry.provide(token(name)).alias(token(target)).cache(cache).register();
            }
            RegistryOp::Factory { name, dep, cache, request } => {
                let factory = Factory::with_signature(
                    Signature::new().param(Parameter::positional("dep").inject(token(dep))),
                    |args: &Arguments| Ok(args.positional::<u32>(0).map(|v| v.wrapping_add(1)).unwrap_or(0)),
                );
                let _ = registry
                    .provide(token(name))
                    .factory(factory)
                    .cache(cache)
                    .scope(scope(request))
                    .register();
            }
            RegistryOp::FactoryWithDefault { name, dep, fallback } => {
                let factory = Factory::with_signature(
                    Signature::new().param(Parameter::keyword("dep").inject(token(dep)).default_value(fallback)),
                    |args: &Arguments| Ok(*args.keyword::<u32>("dep")?),
                );
                let _ = registry.provide(token(name)).factory(factory).register();
            }
            RegistryOp::ResolveMain(name) => match main.resolve(&token(name)) {
                Ok(_) => {}
                Err(DiError::CircularDependency { path }) => assert!(path.contains(" -> ")),
                Err(_) => {}
            },
            RegistryOp::ResolveRequest(name) => {
                let _ = request.resolve(&token(name));
            }
            RegistryOp::MakeWithArg { name, arg } => {
                let _ = request.make(&token(name), Arguments::new().with_arg(arg));
            }
            RegistryOp::InsertRequest { name, value } => {
                request.insert_value(token(name), value);
                assert_eq!(*request.get_as::<u32>(token(name)).unwrap(), value);
            }
            RegistryOp::EnterRequest => {
                request = main.enter("request").unwrap();
            }
            RegistryOp::Lock => {
                registry.lock();
                locked = true;
            }
        }
    }
});
