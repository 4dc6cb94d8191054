//! Package nodes and their per-package metadata.
//!
//! A [`Package`] is either *real* (indexed by atom in the graph, state
//! Stable, Unstable or Blocked) or a *sentinel* (`ActingStable`), a terminal
//! copy created only to break a dependency cycle.

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::atom::Atom;
use crate::error::CoreError;

/// Stabilization state of a package, with its stable wire/persistence code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i64")]
pub enum PackageState {
    /// Enough workers confirmed a successful build.
    Stable,
    /// Not yet resolved; eligible for dispatch once its dependencies are.
    Unstable,
    /// Sentinel standing in for a package on a broken cycle edge.
    ActingStable,
    /// Enough workers reported a failed build.
    Blocked,
}

impl PackageState {
    /// Integer code used on the wire and in snapshots.
    pub fn code(self) -> i64 {
        match self {
            PackageState::Stable => 0,
            PackageState::Unstable => 1,
            PackageState::ActingStable => 2,
            PackageState::Blocked => 3,
        }
    }

    /// Parses an integer state code.
    pub fn from_code(code: i64) -> Result<Self, CoreError> {
        match code {
            0 => Ok(PackageState::Stable),
            1 => Ok(PackageState::Unstable),
            2 => Ok(PackageState::ActingStable),
            3 => Ok(PackageState::Blocked),
            _ => Err(CoreError::UnknownState { code }),
        }
    }

    /// Whether this is the sentinel state.
    pub fn is_sentinel(self) -> bool {
        self == PackageState::ActingStable
    }

    /// Whether a dependency in this state still blocks its dependents.
    pub fn is_unresolved(self) -> bool {
        self == PackageState::Unstable
    }
}

impl From<PackageState> for i64 {
    fn from(state: PackageState) -> Self {
        state.code()
    }
}

impl TryFrom<i64> for PackageState {
    type Error = CoreError;

    fn try_from(code: i64) -> Result<Self, Self::Error> {
        PackageState::from_code(code)
    }
}

impl fmt::Display for PackageState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PackageState::Stable => "stable",
            PackageState::Unstable => "unstable",
            PackageState::ActingStable => "acting-stable",
            PackageState::Blocked => "blocked",
        };
        f.write_str(name)
    }
}

/// One set of build options a package must be validated under.
///
/// Flags are kept sorted so two combinations with the same flags compare
/// equal regardless of the order they were submitted in.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UseFlagCombination(BTreeSet<String>);

impl UseFlagCombination {
    /// Parses a space-separated flag list. Repeated separators are ignored.
    pub fn parse(flags: &str) -> Self {
        UseFlagCombination(flags.split_whitespace().map(str::to_string).collect())
    }

    /// Builds a combination from individual flags.
    pub fn from_flags<I, S>(flags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        UseFlagCombination(flags.into_iter().map(Into::into).collect())
    }

    /// Iterates the flags in sorted order.
    pub fn flags(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    /// Number of flags in the combination.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// True for the combination with every optional flag disabled.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for UseFlagCombination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for flag in &self.0 {
            if !first {
                f.write_str(" ")?;
            }
            f.write_str(flag)?;
            first = false;
        }
        Ok(())
    }
}

/// A package node.
///
/// Dependencies are graph edges owned by [`PackageGraph`](crate::PackageGraph),
/// and vote counters are owned by [`VoteTally`](crate::VoteTally); a node only
/// carries what is specific to this copy of the atom.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Package {
    /// Package identity.
    pub atom: Atom,
    /// Current stabilization state.
    pub state: PackageState,
    /// Registered use-flag combinations, in insertion order.
    pub combinations: Vec<UseFlagCombination>,
    /// Index of the combination currently under test.
    pub active_combination: usize,
}

impl Package {
    /// A freshly discovered package: unstable, no combinations.
    pub fn unstable(atom: Atom) -> Self {
        Package {
            atom,
            state: PackageState::Unstable,
            combinations: Vec::new(),
            active_combination: 0,
        }
    }

    /// A sentinel copy of `atom`.
    pub fn sentinel(atom: Atom) -> Self {
        Package {
            atom,
            state: PackageState::ActingStable,
            combinations: Vec::new(),
            active_combination: 0,
        }
    }

    /// Whether this node is a cycle-breaking sentinel.
    pub fn is_sentinel(&self) -> bool {
        self.state.is_sentinel()
    }

    /// Whether any use-flag combination is registered.
    pub fn has_combinations(&self) -> bool {
        !self.combinations.is_empty()
    }

    /// The combination currently under test, if the cursor is in range.
    pub fn current_combination(&self) -> Option<&UseFlagCombination> {
        self.combinations.get(self.active_combination)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn state_codes_are_stable() {
        for (state, code) in [
            (PackageState::Stable, 0),
            (PackageState::Unstable, 1),
            (PackageState::ActingStable, 2),
            (PackageState::Blocked, 3),
        ] {
            assert_eq!(state.code(), code);
            assert_eq!(PackageState::from_code(code).unwrap(), state);
        }
        assert!(matches!(
            PackageState::from_code(4),
            Err(CoreError::UnknownState { code: 4 })
        ));
    }

    #[test]
    fn state_serializes_as_integer() {
        assert_eq!(serde_json::to_string(&PackageState::Blocked).unwrap(), "3");
        let back: PackageState = serde_json::from_str("2").unwrap();
        assert_eq!(back, PackageState::ActingStable);
        assert!(serde_json::from_str::<PackageState>("9").is_err());
    }

    #[test]
    fn combination_parse_sorts_and_dedups() {
        let combo = UseFlagCombination::parse("  ssl -ipv6 ssl  gtk ");
        assert_eq!(combo.len(), 3);
        assert_eq!(combo.to_string(), "-ipv6 gtk ssl");
        assert_eq!(combo, UseFlagCombination::from_flags(["gtk", "-ipv6", "ssl"]));
    }

    #[test]
    fn current_combination_follows_cursor() {
        let mut pkg = Package::unstable(Atom::new("a/b-1").unwrap());
        assert!(pkg.current_combination().is_none());

        pkg.combinations.push(UseFlagCombination::parse("ssl"));
        pkg.combinations.push(UseFlagCombination::parse("-ssl"));
        assert_eq!(pkg.current_combination().unwrap().to_string(), "ssl");

        pkg.active_combination = 1;
        assert_eq!(pkg.current_combination().unwrap().to_string(), "-ssl");

        pkg.active_combination = 2;
        assert!(pkg.current_combination().is_none());
    }
}
