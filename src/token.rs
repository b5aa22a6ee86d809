//! Injection tokens
//!
//! A [`Token`] is the registry key for a provider. Types, string symbols and
//! parametrised generic forms are canonicalized into one comparable identity,
//! so two tokens built from the same type or the same text always land in the
//! same registry slot.

use std::any::TypeId;
use std::borrow::Cow;
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

/// Canonical identity of a token. Only this takes part in equality,
/// hashing and ordering.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
enum Identity {
    Type(TypeId),
    Symbol(Arc<str>),
    Generic(Arc<Identity>, Arc<[Identity]>),
}

/// Hashable, ordered key identifying an injectable.
///
/// # Examples
///
/// ```rust
/// use djx::Token;
///
/// struct Database;
///
/// assert_eq!(Token::of::<Database>(), Token::of::<Database>());
/// assert_eq!(Token::symbol("greeting"), Token::from("greeting"));
/// assert_eq!(Token::from(String::from("greeting")), Token::from("greeting"));
/// assert_ne!(Token::symbol("greeting"), Token::of::<Database>());
///
/// let list = Token::generic(Token::symbol("list"), [Token::of::<Database>()]);
/// assert!(list.is_generic());
/// ```
#[derive(Clone)]
pub struct Token {
    identity: Identity,
    name: Cow<'static, str>,
}

impl Token {
    /// Token for a Rust type (including `dyn Trait` types).
    #[inline]
    pub fn of<T: ?Sized + 'static>() -> Self {
        Self {
            identity: Identity::Type(TypeId::of::<T>()),
            name: Cow::Borrowed(std::any::type_name::<T>()),
        }
    }

    /// Token for a string symbol.
    #[inline]
    pub fn symbol(name: impl Into<Arc<str>>) -> Self {
        let name: Arc<str> = name.into();
        Self {
            name: Cow::Owned(name.to_string()),
            identity: Identity::Symbol(name),
        }
    }

    /// Parametrised form of `base`, e.g. `list[Database]`.
    ///
    /// Two generic tokens are equal when their bases and all arguments are
    /// equal, in order.
    pub fn generic(base: Token, args: impl IntoIterator<Item = Token>) -> Self {
        let args: Vec<Token> = args.into_iter().collect();
        let name = format!(
            "{}[{}]",
            base.name,
            args.iter().map(|a| a.name()).collect::<Vec<_>>().join(", ")
        );
        Self {
            identity: Identity::Generic(
                Arc::new(base.identity),
                args.into_iter().map(|a| a.identity).collect(),
            ),
            name: Cow::Owned(name),
        }
    }

    /// Human readable name (type name or symbol text).
    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The `TypeId` when this token was built from a type.
    #[inline]
    pub fn type_id(&self) -> Option<TypeId> {
        match self.identity {
            Identity::Type(id) => Some(id),
            _ => None,
        }
    }

    #[inline]
    pub fn is_type(&self) -> bool {
        matches!(self.identity, Identity::Type(_))
    }

    #[inline]
    pub fn is_symbol(&self) -> bool {
        matches!(self.identity, Identity::Symbol(_))
    }

    #[inline]
    pub fn is_generic(&self) -> bool {
        matches!(self.identity, Identity::Generic(..))
    }
}

impl PartialEq for Token {
    #[inline]
    fn eq(&self, other: &Self) -> bool {
        self.identity == other.identity
    }
}

impl Eq for Token {}

impl Hash for Token {
    #[inline]
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.identity.hash(state);
    }
}

impl PartialOrd for Token {
    #[inline]
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Token {
    #[inline]
    fn cmp(&self, other: &Self) -> Ordering {
        self.identity.cmp(&other.identity)
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

impl fmt::Debug for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match self.identity {
            Identity::Type(_) => "type",
            Identity::Symbol(_) => "symbol",
            Identity::Generic(..) => "generic",
        };
        write!(f, "Token({kind}: {})", self.name)
    }
}

impl From<&str> for Token {
    #[inline]
    fn from(name: &str) -> Self {
        Token::symbol(name)
    }
}

impl From<String> for Token {
    #[inline]
    fn from(name: String) -> Self {
        Token::symbol(name)
    }
}

impl From<Arc<str>> for Token {
    #[inline]
    fn from(name: Arc<str>) -> Self {
        Token::symbol(name)
    }
}

impl From<&Token> for Token {
    #[inline]
    fn from(token: &Token) -> Self {
        token.clone()
    }
}
