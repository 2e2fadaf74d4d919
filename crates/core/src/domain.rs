//! Domain identifiers: the closed set of screens a tip can be requested for.

use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// A product domain. Each variant maps to exactly one strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DomainId {
    Profile,
    Goals,
    Budget,
    Trade,
    Jobs,
    Discovery,
}

impl DomainId {
    /// Every domain, in declaration order.
    pub const ALL: [DomainId; 6] = [
        DomainId::Profile,
        DomainId::Goals,
        DomainId::Budget,
        DomainId::Trade,
        DomainId::Jobs,
        DomainId::Discovery,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Profile => "profile",
            Self::Goals => "goals",
            Self::Budget => "budget",
            Self::Trade => "trade",
            Self::Jobs => "jobs",
            Self::Discovery => "discovery",
        }
    }
}

impl std::fmt::Display for DomainId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DomainId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "profile" => Ok(Self::Profile),
            "goals" => Ok(Self::Goals),
            "budget" => Ok(Self::Budget),
            "trade" => Ok(Self::Trade),
            "jobs" => Ok(Self::Jobs),
            "discovery" => Ok(Self::Discovery),
            other => Err(format!("unknown domain '{other}'")),
        }
    }
}
