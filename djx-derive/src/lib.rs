//! Derive macros for djx
//!
//! `#[derive(Injectable)]` generates a `djx::Injectable` impl from a struct's
//! fields: every `#[inject]` field becomes a keyword parameter of the
//! signature, resolved by the injector before `construct` runs.
//!
//! # Example
//!
//! ```rust,ignore
//! use djx::{Injectable, Registry};
//! use std::sync::Arc;
//!
//! struct Database {
//!     url: String,
//! }
//!
//! struct Cache;
//!
//! #[derive(Injectable)]
//! struct UserService {
//!     #[inject]
//!     db: Arc<Database>,
//!     #[inject(optional)]
//!     cache: Option<Arc<Cache>>,
//!     #[inject(token = "greeting")]
//!     greeting: Arc<String>,
//!     // Non-injected fields use Default
//!     request_count: u64,
//! }
//!
//! let registry = Arc::new(Registry::new());
//! registry.provide_value(Database { url: "postgres://localhost".into() }).unwrap();
//! registry.provide("greeting").value(String::from("hi")).register().unwrap();
//! registry.injectable::<UserService>().register().unwrap();
//!
//! let service = registry.injector("main").unwrap().get::<UserService>().unwrap();
//! assert!(service.cache.is_none());
//! ```

use proc_macro::TokenStream;
use quote::quote;
use syn::{Attribute, Data, DeriveInput, Fields, LitStr, Type, parse_macro_input};

/// Derive `djx::Injectable` for a struct with named fields.
///
/// # Attributes
///
/// - `#[inject]` - Resolve the field by its type. The field must be `Arc<T>`.
/// - `#[inject(optional)]` - Leave the field `None` when nothing resolves.
///   The field must be `Option<Arc<T>>`.
/// - `#[inject(token = "name")]` - Resolve a string token instead of the type.
/// - `#[inject(scope = "main")]` - Resolve from the injector of that scope.
///
/// Options combine: `#[inject(optional, token = "cache", scope = "main")]`.
/// Fields without `#[inject]` use `Default::default()`.
#[proc_macro_derive(Injectable, attributes(inject))]
pub fn derive_injectable(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);

    match expand(&input) {
        Ok(expanded) => TokenStream::from(expanded),
        Err(err) => err.to_compile_error().into(),
    }
}

fn expand(input: &DeriveInput) -> syn::Result<proc_macro2::TokenStream> {
    let name = &input.ident;
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

    let fields = match &input.data {
        Data::Struct(data) => match &data.fields {
            Fields::Named(fields) => &fields.named,
            _ => {
                return Err(syn::Error::new_spanned(
                    input,
                    "Injectable can only be derived for structs with named fields",
                ));
            }
        },
        _ => {
            return Err(syn::Error::new_spanned(
                input,
                "Injectable can only be derived for structs",
            ));
        }
    };

    let mut params = Vec::new();
    let mut field_inits = Vec::new();

    for field in fields.iter() {
        let Some(field_name) = field.ident.as_ref() else {
            continue;
        };
        let key = field_name.to_string();
        let field_type = &field.ty;

        let Some(attr) = find_inject_attr(&field.attrs)? else {
            field_inits.push(quote! {
                #field_name: ::std::default::Default::default()
            });
            continue;
        };

        let inner_type = if attr.optional {
            extract_option_arc_inner_type(field_type).ok_or_else(|| {
                syn::Error::new_spanned(
                    field_type,
                    "Fields marked with #[inject(optional)] must have type Option<Arc<T>>",
                )
            })?
        } else {
            extract_arc_inner_type(field_type).ok_or_else(|| {
                syn::Error::new_spanned(field_type, "Fields marked with #[inject] must have type Arc<T>")
            })?
        };

        let mut dependency = match &attr.token {
            Some(token) => quote! { ::djx::Dependency::new(#token) },
            None => quote! { ::djx::depends::<#inner_type>() },
        };
        if let Some(scope) = &attr.scope {
            dependency = quote! { #dependency.scope(#scope) };
        }

        let mut param = quote! { ::djx::Parameter::keyword(#key).inject(#dependency) };
        if attr.optional {
            param = quote! { #param.optional() };
            field_inits.push(quote! {
                #field_name: args.try_keyword::<#inner_type>(#key)
            });
        } else {
            field_inits.push(quote! {
                #field_name: args.keyword::<#inner_type>(#key)?
            });
        }
        params.push(param);
    }

    let args_ident = if params.is_empty() {
        quote! { _args }
    } else {
        quote! { args }
    };

    Ok(quote! {
        impl #impl_generics ::djx::Injectable for #name #ty_generics #where_clause {
            fn signature() -> ::djx::Signature {
                ::djx::Signature::new()
                    #(.param(#params))*
            }

            fn construct(#args_ident: &::djx::Arguments) -> ::djx::Result<Self> {
                Ok(Self {
                    #(#field_inits),*
                })
            }
        }
    })
}

/// Parsed `#[inject(...)]` options
#[derive(Default)]
struct InjectAttr {
    optional: bool,
    token: Option<LitStr>,
    scope: Option<LitStr>,
}

fn find_inject_attr(attrs: &[Attribute]) -> syn::Result<Option<InjectAttr>> {
    let Some(attr) = attrs.iter().find(|attr| attr.path().is_ident("inject")) else {
        return Ok(None);
    };

    let mut parsed = InjectAttr::default();
    if attr.meta.require_path_only().is_ok() {
        return Ok(Some(parsed));
    }

    attr.parse_nested_meta(|meta| {
        if meta.path.is_ident("optional") {
            parsed.optional = true;
            Ok(())
        } else if meta.path.is_ident("token") {
            parsed.token = Some(meta.value()?.parse()?);
            Ok(())
        } else if meta.path.is_ident("scope") {
            parsed.scope = Some(meta.value()?.parse()?);
            Ok(())
        } else {
            Err(meta.error("expected `optional`, `token = \"..\"` or `scope = \"..\"`"))
        }
    })?;
    Ok(Some(parsed))
}

/// Extract T from Arc<T>
fn extract_arc_inner_type(ty: &Type) -> Option<&Type> {
    single_generic_arg(ty, "Arc")
}

/// Extract T from Option<Arc<T>>
fn extract_option_arc_inner_type(ty: &Type) -> Option<&Type> {
    single_generic_arg(ty, "Option").and_then(extract_arc_inner_type)
}

fn single_generic_arg<'a>(ty: &'a Type, wrapper: &str) -> Option<&'a Type> {
    let Type::Path(type_path) = ty else {
        return None;
    };
    let segment = type_path.path.segments.last()?;
    if segment.ident != wrapper {
        return None;
    }
    match &segment.arguments {
        syn::PathArguments::AngleBracketed(args) => match args.args.first()? {
            syn::GenericArgument::Type(inner) => Some(inner),
            _ => None,
        },
        _ => None,
    }
}
