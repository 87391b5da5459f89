use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::TypeError;

/// Replica acknowledgement policy for a single statement.
///
/// Names follow the column store's native spelling (`LOCAL_QUORUM`, ...);
/// parsing is case-insensitive.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Consistency {
    Any,
    One,
    Two,
    Three,
    Quorum,
    All,
    #[default]
    LocalQuorum,
    EachQuorum,
    LocalOne,
}

impl Consistency {
    pub const ALL_LEVELS: [Consistency; 9] = [
        Consistency::Any,
        Consistency::One,
        Consistency::Two,
        Consistency::Three,
        Consistency::Quorum,
        Consistency::All,
        Consistency::LocalQuorum,
        Consistency::EachQuorum,
        Consistency::LocalOne,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Consistency::Any => "ANY",
            Consistency::One => "ONE",
            Consistency::Two => "TWO",
            Consistency::Three => "THREE",
            Consistency::Quorum => "QUORUM",
            Consistency::All => "ALL",
            Consistency::LocalQuorum => "LOCAL_QUORUM",
            Consistency::EachQuorum => "EACH_QUORUM",
            Consistency::LocalOne => "LOCAL_ONE",
        }
    }

    /// `ANY` only applies to writes; a read at `ANY` is rejected by the store.
    pub fn is_valid_for_reads(&self) -> bool {
        !matches!(self, Consistency::Any)
    }
}

impl fmt::Display for Consistency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Consistency {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_uppercase();
        Self::ALL_LEVELS
            .into_iter()
            .find(|level| level.as_str() == wanted)
            .ok_or_else(|| TypeError::UnknownConsistency(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_local_quorum() {
        assert_eq!(Consistency::default(), Consistency::LocalQuorum);
    }

    #[test]
    fn parse_every_level() {
        for level in Consistency::ALL_LEVELS {
            assert_eq!(level.as_str().parse::<Consistency>().unwrap(), level);
        }
    }

    #[test]
    fn parse_is_case_insensitive() {
        assert_eq!("local_one".parse::<Consistency>().unwrap(), Consistency::LocalOne);
        assert_eq!(" Quorum ".parse::<Consistency>().unwrap(), Consistency::Quorum);
    }

    #[test]
    fn parse_unknown_level() {
        let err = "SERIAL".parse::<Consistency>().unwrap_err();
        assert_eq!(err, TypeError::UnknownConsistency("SERIAL".into()));
    }

    #[test]
    fn any_is_write_only() {
        assert!(!Consistency::Any.is_valid_for_reads());
        assert!(Consistency::One.is_valid_for_reads());
    }

    #[test]
    fn serde_uses_native_names() {
        let json = serde_json::to_string(&Consistency::EachQuorum).unwrap();
        assert_eq!(json, "\"EACH_QUORUM\"");
    }
}
