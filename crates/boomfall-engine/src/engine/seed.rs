use std::{fmt, str::FromStr};

use rand::{
    Rng,
    distr::{Distribution, StandardUniform},
};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Seed of every random decision made by a session.
///
/// Piece draws and wall gaps both derive from it, so two sessions created
/// with the same seed and configuration evolve identically under the same
/// inputs. Written as 32 hexadecimal digits.
///
/// # Example
///
/// ```
/// use boomfall_engine::SessionSeed;
/// use rand::Rng as _;
///
/// let seed: SessionSeed = rand::rng().random();
/// let parsed: SessionSeed = seed.to_string().parse().unwrap();
/// assert_eq!(seed, parsed);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SessionSeed([u8; 16]);

/// Malformed textual seed.
#[derive(Debug, Clone, PartialEq, Eq, derive_more::Display, derive_more::Error)]
#[display("invalid seed {text:?}: expected 32 hex digits")]
pub struct ParseSeedError {
    text: String,
}

impl SessionSeed {
    #[must_use]
    pub const fn from_bytes(bytes: [u8; 16]) -> Self {
        Self(bytes)
    }

    #[must_use]
    pub const fn to_bytes(self) -> [u8; 16] {
        self.0
    }
}

impl From<u128> for SessionSeed {
    fn from(value: u128) -> Self {
        Self(value.to_be_bytes())
    }
}

impl fmt::Display for SessionSeed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:032x}", u128::from_be_bytes(self.0))
    }
}

impl FromStr for SessionSeed {
    type Err = ParseSeedError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let error = || ParseSeedError { text: s.to_owned() };
        if s.len() != 32 {
            return Err(error());
        }
        u128::from_str_radix(s, 16)
            .map(Self::from)
            .map_err(|_| error())
    }
}

impl Serialize for SessionSeed {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for SessionSeed {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let hex_str = String::deserialize(deserializer)?;
        hex_str.parse().map_err(serde::de::Error::custom)
    }
}

/// Allows `rng.random::<SessionSeed>()`.
impl Distribution<SessionSeed> for StandardUniform {
    fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> SessionSeed {
        let mut seed = [0; 16];
        rng.fill(&mut seed);
        SessionSeed(seed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hex_text_form() {
        let seed = SessionSeed::from(0xdead_beef_u128);
        assert_eq!(seed.to_string(), "000000000000000000000000deadbeef");
        let json = serde_json::to_string(&seed).unwrap();
        assert_eq!(json, "\"000000000000000000000000deadbeef\"");
        let back: SessionSeed = serde_json::from_str(&json).unwrap();
        assert_eq!(back, seed);
    }

    #[test]
    fn test_rejects_malformed_text() {
        assert!("abc".parse::<SessionSeed>().is_err());
        assert!("zz000000000000000000000000000000".parse::<SessionSeed>().is_err());
        assert!(serde_json::from_str::<SessionSeed>("\"12\"").is_err());
    }
}
