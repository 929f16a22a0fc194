use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// What the registry does when its screen regains navigation focus.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum FocusPolicy {
    /// Run every registered callback, like a pull gesture.
    Sweep,
    /// Only bump the generation so dependent views re-key.
    #[default]
    Rekey,
    /// Do nothing.
    Ignore,
}

impl FocusPolicy {
    pub fn display_name(self) -> &'static str {
        match self {
            FocusPolicy::Sweep => "sweep",
            FocusPolicy::Rekey => "rekey",
            FocusPolicy::Ignore => "ignore",
        }
    }

    pub fn all() -> &'static [FocusPolicy] {
        &[FocusPolicy::Sweep, FocusPolicy::Rekey, FocusPolicy::Ignore]
    }
}

impl fmt::Display for FocusPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

impl FromStr for FocusPolicy {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        FocusPolicy::all()
            .iter()
            .copied()
            .find(|policy| policy.display_name().eq_ignore_ascii_case(s))
            .ok_or_else(|| {
                anyhow::anyhow!("Unknown focus policy '{s}' (expected sweep, rekey or ignore)")
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_is_case_insensitive() {
        assert_eq!("Sweep".parse::<FocusPolicy>().unwrap(), FocusPolicy::Sweep);
        assert_eq!(" rekey ".parse::<FocusPolicy>().unwrap(), FocusPolicy::Rekey);
        assert!("reload".parse::<FocusPolicy>().is_err());
    }

    #[test]
    fn test_display_round_trips_names() {
        for policy in FocusPolicy::all() {
            assert_eq!(policy.to_string().parse::<FocusPolicy>().unwrap(), *policy);
        }
    }
}
