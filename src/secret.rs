//! Credential wrapper that refuses to print itself in debug output.
//!
//! A [`Secret`] behaves like the string it holds wherever it is used as text
//! (`Display`, `Deref<Target = str>`, equality, command arguments), but its
//! `Debug` representation is always [`MASK`]. This guards against app-specific
//! passwords ending up in `{:?}` logs; it is not encryption, and
//! [`Secret::expose`] or `to_string()` still yield the real value.

use serde::Deserialize;
use std::any::Any;
use std::ffi::OsStr;
use std::fmt;
use std::ops::Deref;

/// Placeholder rendered instead of a secret's value.
pub const MASK: &str = "******";

/// An immutable sensitive string.
#[derive(Clone, PartialEq, Eq, Hash, Deserialize)]
#[serde(transparent)]
pub struct Secret(String);

impl Secret {
    #[must_use]
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Borrow the underlying value.
    #[must_use]
    pub fn expose(&self) -> &str {
        &self.0
    }
}

/// Wrap `value` so it is masked in debug output.
#[must_use]
pub fn make_secret(value: impl Into<String>) -> Secret {
    Secret::new(value)
}

/// Whether `value` is a [`Secret`].
///
/// Logging code calls this on values of unknown type before rendering them.
#[must_use]
pub fn is_secret(value: &dyn Any) -> bool {
    value.is::<Secret>()
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(MASK)
    }
}

impl fmt::Display for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Deref for Secret {
    type Target = str;

    fn deref(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for Secret {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl AsRef<OsStr> for Secret {
    fn as_ref(&self) -> &OsStr {
        OsStr::new(&self.0)
    }
}

impl From<String> for Secret {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for Secret {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl PartialEq<str> for Secret {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

impl PartialEq<&str> for Secret {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}

impl PartialEq<String> for Secret {
    fn eq(&self, other: &String) -> bool {
        &self.0 == other
    }
}

impl PartialEq<Secret> for str {
    fn eq(&self, other: &Secret) -> bool {
        self == other.0
    }
}

impl PartialEq<Secret> for &str {
    fn eq(&self, other: &Secret) -> bool {
        *self == other.0
    }
}

impl PartialEq<Secret> for String {
    fn eq(&self, other: &Secret) -> bool {
        *self == other.0
    }
}
