use serde::{Deserialize, Serialize};
use std::fmt;

/// Whether a transaction increases or decreases the account balance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Inflow,
    Outflow,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Inflow => write!(f, "inflow"),
            Direction::Outflow => write!(f, "outflow"),
        }
    }
}

impl std::str::FromStr for Direction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "inflow" | "in" | "credit" => Ok(Direction::Inflow),
            "outflow" | "out" | "debit" => Ok(Direction::Outflow),
            other => Err(format!("Unknown direction: '{other}'")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn display_roundtrip() {
        for d in [Direction::Inflow, Direction::Outflow] {
            assert_eq!(Direction::from_str(&d.to_string()).unwrap(), d);
        }
    }

    #[test]
    fn parse_aliases() {
        assert_eq!(Direction::from_str("CREDIT").unwrap(), Direction::Inflow);
        assert_eq!(Direction::from_str(" debit ").unwrap(), Direction::Outflow);
        assert!(Direction::from_str("sideways").is_err());
    }

    #[test]
    fn serde_lowercase() {
        assert_eq!(serde_json::to_string(&Direction::Outflow).unwrap(), "\"outflow\"");
    }
}
