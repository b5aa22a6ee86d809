//! Error types for dependency injection

use crate::Token;
use thiserror::Error;

/// Errors that can occur during registration or resolution
#[derive(Error, Debug, Clone)]
pub enum DiError {
    /// No provider for the token anywhere in the scope chain
    #[error("No provider found for `{token}`")]
    NotFound { token: Token },

    /// None of a dependency's candidate tokens resolved and it has no default
    #[error("None of the candidates [{candidates}] could be resolved")]
    Unresolved { candidates: String },

    /// An alias points at a token nothing provides
    #[error("No provider for aliased `{target}` in `{token}`")]
    ProviderNotFound { token: Token, target: Token },

    /// `provide` was finished without a value, alias or factory
    #[error("No applicable provider kind for `{token}`: expected a value, alias or factory")]
    MissingConcrete { token: Token },

    /// `provide` was given more than one of value, alias or factory
    #[error("Conflicting provider kinds for `{token}`: {kinds}")]
    ConflictingConcrete { token: Token, kinds: String },

    /// A factory declares a malformed signature
    #[error("Invalid signature for factory `{token}`: {reason}")]
    InvalidSignature { token: Token, reason: String },

    /// Scope name not declared in the registry
    #[error("Unknown scope: {0}")]
    UnknownScope(String),

    /// Scope cannot be entered from the given injector
    #[error("Scope `{scope}` cannot be entered from `{from}`")]
    ScopeMismatch { scope: String, from: String },

    /// Registry is locked and cannot be modified
    #[error("Registry is locked - cannot register new providers")]
    Locked,

    /// A resolved instance does not have the requested type
    #[error("Type mismatch for `{subject}`: expected {expected}")]
    TypeMismatch {
        subject: String,
        expected: &'static str,
    },

    /// A factory parameter had no override, no dependency and no default
    #[error("Missing argument `{param}` for `{token}`")]
    MissingArgument { token: Token, param: String },

    /// Call-time arguments did not fit the factory signature
    #[error("Unexpected argument `{param}` for `{token}`")]
    UnexpectedArgument { token: Token, param: String },

    /// Circular dependency detected during resolution
    #[error("Circular dependency detected: {path}")]
    CircularDependency { path: String },

    /// Factory failed to create the instance
    #[error("Failed to create `{token}`: {reason}")]
    CreationFailed { token: String, reason: String },

    /// `Inject` was used outside an activated injector
    #[error("No active injector in the current context")]
    NoActiveInjector,
}

impl DiError {
    /// Create a NotFound error for a token
    #[inline]
    pub fn not_found(token: &Token) -> Self {
        Self::NotFound {
            token: token.clone(),
        }
    }

    /// Create a CreationFailed error
    #[inline]
    pub fn creation_failed(token: impl std::fmt::Display, reason: impl Into<String>) -> Self {
        Self::CreationFailed {
            token: token.to_string(),
            reason: reason.into(),
        }
    }

    /// Create a TypeMismatch error for type `T`
    #[inline]
    pub fn type_mismatch<T: ?Sized + 'static>(subject: impl std::fmt::Display) -> Self {
        Self::TypeMismatch {
            subject: subject.to_string(),
            expected: std::any::type_name::<T>(),
        }
    }

    /// Lookup failures: nothing in the scope chain could satisfy the request.
    #[inline]
    pub fn is_lookup(&self) -> bool {
        matches!(self, Self::NotFound { .. } | Self::Unresolved { .. })
    }

    /// Registration-time failures.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            Self::ProviderNotFound { .. }
                | Self::MissingConcrete { .. }
                | Self::ConflictingConcrete { .. }
                | Self::InvalidSignature { .. }
                | Self::UnknownScope(_)
                | Self::ScopeMismatch { .. }
                | Self::Locked
        )
    }
}

/// Result type alias for DI operations
pub type Result<T> = std::result::Result<T, DiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classification() {
        let token = Token::symbol("db");
        assert!(DiError::not_found(&token).is_lookup());
        assert!(!DiError::not_found(&token).is_configuration());
        assert!(DiError::Locked.is_configuration());
        assert!(DiError::MissingConcrete { token }.is_configuration());
        assert!(!DiError::NoActiveInjector.is_lookup());
    }

    #[test]
    fn test_messages_name_the_token() {
        let err = DiError::not_found(&Token::symbol("greeting"));
        assert_eq!(err.to_string(), "No provider found for `greeting`");

        let err = DiError::type_mismatch::<String>("greeting");
        assert!(err.to_string().contains("alloc::string::String"));
    }
}
