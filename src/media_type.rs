//! Media type parsing and matching
//!
//! Media types are parsed leniently: the text before the first `;` is split
//! at the first `/` into main type and subtype (both lowercased), and each
//! `key=value` after it becomes a parameter. Parsing never fails; malformed
//! input simply matches nothing specific.

use std::fmt;

/// A parsed media type such as `application/json; indent=4`.
///
/// ```rust
/// use djx::MediaType;
///
/// let accepted = MediaType::parse("application/*; q=0.8");
/// assert_eq!(accepted.main_type(), "application");
/// assert_eq!(accepted.precedence(), 1);
/// assert!(MediaType::parse("application/json").matches(&accepted));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaType {
    main_type: String,
    sub_type: String,
    params: Vec<(String, String)>,
}

impl MediaType {
    pub fn parse(text: &str) -> Self {
        let mut parts = text.split(';');
        let full_type = parts.next().unwrap_or_default().trim().to_ascii_lowercase();
        let (main_type, sub_type) = match full_type.split_once('/') {
            Some((main, sub)) => (main.trim().to_string(), sub.trim().to_string()),
            None => (full_type, String::new()),
        };

        let mut params: Vec<(String, String)> = Vec::new();
        for part in parts {
            let Some((key, value)) = part.split_once('=') else {
                continue;
            };
            let key = key.trim().to_ascii_lowercase();
            if key.is_empty() {
                continue;
            }
            let value = unquote(value.trim()).to_string();
            match params.iter_mut().find(|(k, _)| *k == key) {
                Some(existing) => existing.1 = value,
                None => params.push((key, value)),
            }
        }

        Self {
            main_type,
            sub_type,
            params,
        }
    }

    #[inline]
    pub fn main_type(&self) -> &str {
        &self.main_type
    }

    #[inline]
    pub fn sub_type(&self) -> &str {
        &self.sub_type
    }

    /// Parameters in the order they were given.
    #[inline]
    pub fn params(&self) -> &[(String, String)] {
        &self.params
    }

    pub fn param(&self, key: &str) -> Option<&str> {
        self.params
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// The `q` parameter, 1.0 when absent or unparsable.
    pub fn quality(&self) -> f32 {
        self.param("q")
            .and_then(|q| q.parse::<f32>().ok())
            .unwrap_or(1.0)
    }

    /// Whether `self` is satisfied by `other`.
    ///
    /// Every parameter of `self` except `q` must be present in `other` with
    /// the same value. Subtypes and main types must be equal unless either
    /// side is the `*` wildcard.
    pub fn matches(&self, other: &MediaType) -> bool {
        let params_match = self
            .params
            .iter()
            .filter(|(k, _)| k != "q")
            .all(|(k, v)| other.param(k) == Some(v.as_str()));

        params_match
            && wildcard_eq(&self.sub_type, &other.sub_type)
            && wildcard_eq(&self.main_type, &other.main_type)
    }

    /// Specificity: 0 for `*/*`, 1 for `type/*`, 2 for a concrete type with
    /// no parameters besides `q`, 3 otherwise.
    pub fn precedence(&self) -> u8 {
        if self.main_type == "*" {
            0
        } else if self.sub_type == "*" {
            1
        } else if self.params.iter().all(|(k, _)| k == "q") {
            2
        } else {
            3
        }
    }
}

fn wildcard_eq(a: &str, b: &str) -> bool {
    a == "*" || b == "*" || a == b
}

fn unquote(value: &str) -> &str {
    value
        .strip_prefix('"')
        .and_then(|v| v.strip_suffix('"'))
        .unwrap_or(value)
}

impl fmt::Display for MediaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.main_type, self.sub_type)?;
        for (key, value) in &self.params {
            write!(f, "; {key}={value}")?;
        }
        Ok(())
    }
}

impl From<&str> for MediaType {
    fn from(text: &str) -> Self {
        Self::parse(text)
    }
}

/// Whether the media type text `lhs` is satisfied by `rhs`.
///
/// ```rust
/// use djx::media_type_matches;
///
/// assert!(media_type_matches("application/json", "application/*"));
/// assert!(media_type_matches("application/json", "*/*"));
/// assert!(!media_type_matches("application/json; indent=4", "application/json"));
/// ```
#[inline]
pub fn media_type_matches(lhs: &str, rhs: &str) -> bool {
    MediaType::parse(lhs).matches(&MediaType::parse(rhs))
}

/// Group media type strings by precedence, most specific group first.
/// Empty groups are dropped; within a group, first-seen order is kept and
/// duplicates are removed.
///
/// ```rust
/// use djx::order_by_precedence;
///
/// let groups = order_by_precedence(["*/*", "text/html", "application/json; indent=4"]);
/// assert_eq!(groups, vec![
///     vec!["application/json; indent=4".to_string()],
///     vec!["text/html".to_string()],
///     vec!["*/*".to_string()],
/// ]);
/// ```
pub fn order_by_precedence<I, S>(media_types: I) -> Vec<Vec<String>>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut groups: [Vec<String>; 4] = Default::default();
    for media_type in media_types {
        let media_type = media_type.as_ref();
        let group = &mut groups[3 - MediaType::parse(media_type).precedence() as usize];
        if !group.iter().any(|m| m == media_type) {
            group.push(media_type.to_string());
        }
    }
    groups.into_iter().filter(|g| !g.is_empty()).collect()
}
