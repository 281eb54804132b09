use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::error::Error;

/// Ethereum hard forks in chronological order.
///
/// The configured fork decides which opcodes the interpreter accepts. An opcode introduced by a
/// later fork than the configured one executes as an invalid instruction.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
#[repr(u8)]
pub enum HardFork {
    /// Initial Ethereum release (July 2015)
    Frontier = 0,
    /// DELEGATECALL (March 2016)
    Homestead = 1,
    /// STATICCALL, REVERT, RETURNDATASIZE, RETURNDATACOPY (October 2017)
    Byzantium = 3,
    /// CREATE2, EXTCODEHASH, SHL, SHR, SAR (February 2019)
    Constantinople = 4,
    /// CHAINID, SELFBALANCE (October 2019)
    Istanbul = 6,
    /// BASEFEE (August 2021)
    London = 9,
    /// The Merge (September 2022), PREVRANDAO replaces DIFFICULTY
    Paris = 12,
    /// PUSH0 (March 2023)
    Shanghai = 13,
    /// TLOAD, TSTORE, MCOPY, BLOBHASH, BLOBBASEFEE (March 2024)
    Cancun = 14,
    /// Latest hard fork (default)
    #[default]
    Latest = 255,
}

impl HardFork {
    /// Returns the effective hard fork, resolving `Latest` to the actual latest fork.
    #[inline]
    pub const fn effective(self) -> Self {
        match self {
            Self::Latest => Self::Cancun,
            other => other,
        }
    }

    /// Returns true if `self` is at or after `other`.
    ///
    /// ```
    /// use sleipnir_config::hardfork::HardFork;
    ///
    /// assert!(HardFork::Latest.is_active(HardFork::Shanghai));
    /// assert!(!HardFork::London.is_active(HardFork::Shanghai));
    /// ```
    #[inline]
    pub const fn is_active(self, other: Self) -> bool {
        self.effective() as u8 >= other.effective() as u8
    }

    /// Returns the lowercase name of the fork, as used in configuration files.
    pub const fn name(self) -> &'static str {
        match self {
            Self::Frontier => "frontier",
            Self::Homestead => "homestead",
            Self::Byzantium => "byzantium",
            Self::Constantinople => "constantinople",
            Self::Istanbul => "istanbul",
            Self::London => "london",
            Self::Paris => "paris",
            Self::Shanghai => "shanghai",
            Self::Cancun => "cancun",
            Self::Latest => "latest",
        }
    }
}

impl fmt::Display for HardFork {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for HardFork {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "frontier" => Ok(Self::Frontier),
            "homestead" => Ok(Self::Homestead),
            "byzantium" => Ok(Self::Byzantium),
            "constantinople" => Ok(Self::Constantinople),
            "istanbul" => Ok(Self::Istanbul),
            "london" => Ok(Self::London),
            "paris" | "merge" => Ok(Self::Paris),
            "shanghai" => Ok(Self::Shanghai),
            "cancun" => Ok(Self::Cancun),
            "latest" => Ok(Self::Latest),
            other => Err(Error::ParseError(format!("unknown hard fork: '{other}'"))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_latest_resolves_to_cancun() {
        assert_eq!(HardFork::Latest.effective(), HardFork::Cancun);
        assert!(HardFork::Cancun.is_active(HardFork::Latest));
        assert!(HardFork::Latest.is_active(HardFork::Cancun));
    }

    #[test]
    fn test_fork_ordering() {
        assert!(HardFork::Byzantium.is_active(HardFork::Homestead));
        assert!(!HardFork::Homestead.is_active(HardFork::Byzantium));
        assert!(HardFork::Frontier.is_active(HardFork::Frontier));
    }

    #[test]
    fn test_parse_round_trip() {
        for fork in [HardFork::Frontier, HardFork::Istanbul, HardFork::Shanghai, HardFork::Latest]
        {
            assert_eq!(fork.to_string().parse::<HardFork>().expect("failed to parse"), fork);
        }
        assert_eq!("Merge".parse::<HardFork>().expect("failed to parse"), HardFork::Paris);
        assert!("prague".parse::<HardFork>().is_err());
    }
}
