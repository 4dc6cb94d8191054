//! Package atom identity.
//!
//! An [`Atom`] is the opaque name+version string of a package
//! (`category/name-version`). The engine never parses it; it only requires
//! that an atom is non-empty and free of whitespace, since whitespace
//! separates the atom from its use-flag combination on the wire.

use std::borrow::Borrow;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// Opaque, validated package identity.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Atom(String);

impl Atom {
    /// Validates and wraps an atom string.
    pub fn new(atom: impl Into<String>) -> Result<Self, CoreError> {
        let atom = atom.into();
        if atom.is_empty() || atom.chars().any(char::is_whitespace) {
            return Err(CoreError::InvalidAtom { atom });
        }
        Ok(Atom(atom))
    }

    /// Returns the atom as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Atom {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Borrow<str> for Atom {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for Atom {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for Atom {
    type Error = CoreError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Atom::new(value)
    }
}

impl TryFrom<&str> for Atom {
    type Error = CoreError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Atom::new(value)
    }
}

impl From<Atom> for String {
    fn from(atom: Atom) -> Self {
        atom.0
    }
}
