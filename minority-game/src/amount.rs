use crate::{GameError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub const MIST_PER_SUI: u64 = 1_000_000_000;
const DECIMALS: usize = 9;

/// Amount of SUI, stored in MIST.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Amount(u64);

impl Amount {
    pub const ZERO: Amount = Amount(0);

    pub const fn from_mist(mist: u64) -> Self {
        Self(mist)
    }

    pub const fn to_mist(self) -> u64 {
        self.0
    }

    pub fn from_sui(sui: u64) -> Result<Self> {
        sui.checked_mul(MIST_PER_SUI)
            .map(Self)
            .ok_or_else(|| GameError::InvalidBetAmount(format!("{} SUI overflows", sui)))
    }

    pub fn to_sui(self) -> f64 {
        self.0 as f64 / MIST_PER_SUI as f64
    }

    pub fn checked_mul(self, rhs: u64) -> Option<Self> {
        self.0.checked_mul(rhs).map(Self)
    }

    /// Even split into `parts`, returning `(share, remainder)`.
    pub fn split(self, parts: u64) -> Option<(Self, Self)> {
        if parts == 0 {
            return None;
        }
        Some((Self(self.0 / parts), Self(self.0 % parts)))
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let whole = self.0 / MIST_PER_SUI;
        let frac = self.0 % MIST_PER_SUI;
        if frac == 0 {
            return write!(f, "{} SUI", whole);
        }

        let digits = format!("{:09}", frac);
        write!(f, "{}.{} SUI", whole, digits.trim_end_matches('0'))
    }
}

impl FromStr for Amount {
    type Err = GameError;

    /// Parses a decimal SUI value such as `0.1` or `10`.
    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim().trim_end_matches("SUI").trim();
        let invalid = || GameError::InvalidBetAmount(format!("'{}' is not a SUI amount", s));

        let (whole, frac) = match s.split_once('.') {
            Some((w, f)) => (w, f),
            None => (s, ""),
        };

        if whole.is_empty() && frac.is_empty() {
            return Err(invalid());
        }
        if frac.len() > DECIMALS || !frac.chars().all(|c| c.is_ascii_digit()) {
            return Err(invalid());
        }

        let whole: u64 = if whole.is_empty() {
            0
        } else {
            whole.parse().map_err(|_| invalid())?
        };
        let frac_mist: u64 = if frac.is_empty() {
            0
        } else {
            format!("{:0<9}", frac).parse().map_err(|_| invalid())?
        };

        whole
            .checked_mul(MIST_PER_SUI)
            .and_then(|m| m.checked_add(frac_mist))
            .map(Self)
            .ok_or_else(invalid)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_and_display() {
        let bet: Amount = "0.1".parse().unwrap();
        assert_eq!(bet.to_mist(), 100_000_000);
        assert_eq!(bet.to_string(), "0.1 SUI");

        assert_eq!("10".parse::<Amount>().unwrap(), Amount::from_sui(10).unwrap());
        assert_eq!(".5".parse::<Amount>().unwrap().to_mist(), 500_000_000);
        assert_eq!(Amount::from_mist(225_000_000).to_string(), "0.225 SUI");
        assert_eq!(Amount::from_mist(1).to_string(), "0.000000001 SUI");
        assert_eq!("1.5 SUI".parse::<Amount>().unwrap().to_mist(), 1_500_000_000);
    }

    #[test]
    fn test_parse_rejects_garbage() {
        for bad in ["", ".", "abc", "1.2.3", "0.0000000001", "-1", "1e3"] {
            assert!(bad.parse::<Amount>().is_err(), "{}", bad);
        }
    }

    #[test]
    fn test_split() {
        let pool = Amount::from_mist(1_000);
        assert_eq!(pool.split(3), Some((Amount::from_mist(333), Amount::from_mist(1))));
        assert_eq!(pool.split(0), None);
    }
}
