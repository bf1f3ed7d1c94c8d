//! Identifier types for the population generator
//!
//! Person identifiers are UUIDs derived from the person's seed so that a
//! seeded run produces the same identifiers every time. Link identifiers tie a
//! generated person back to the fixed-identity record group it was bound to.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use uuid::Uuid;

/// Generator stream person identifiers are drawn from; a person's own
/// generator uses stream 0
const PERSON_ID_STREAM: u64 = 1;

/// First link identifier handed out to fixed-identity record groups
pub const LINK_ID_BASE: u64 = 100_000;

/// Unique identifier for a generated person
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PersonId(pub Uuid);

impl PersonId {
    /// Create a new random person ID
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Derive a person ID from a seed; equal seeds give equal IDs
    pub fn from_seed(seed: u64) -> Self {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        rng.set_stream(PERSON_ID_STREAM);
        let bytes: [u8; 16] = rng.gen();
        Self(uuid::Builder::from_random_bytes(bytes).into_uuid())
    }
}

impl Default for PersonId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for PersonId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PERSON_{}", self.0.simple())
    }
}

impl Serialize for PersonId {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&format!("PERSON_{}", self.0.simple()))
    }
}

impl<'de> Deserialize<'de> for PersonId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        let raw = s.strip_prefix("PERSON_").unwrap_or(&s);
        let uuid = Uuid::parse_str(raw).map_err(serde::de::Error::custom)?;
        Ok(PersonId(uuid))
    }
}

/// Synthetic link identifier assigned to a fixed-identity record group at load time
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct LinkId(pub u64);

impl LinkId {
    /// Link identifier for the group at `index` in load order
    pub fn for_index(index: usize) -> Self {
        Self(LINK_ID_BASE + index as u64)
    }
}

impl fmt::Display for LinkId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_person_id_from_seed_is_deterministic() {
        assert_eq!(PersonId::from_seed(42), PersonId::from_seed(42));
        assert_ne!(PersonId::from_seed(42), PersonId::from_seed(43));
    }

    #[test]
    fn test_person_id_does_not_reuse_person_stream() {
        let mut person_rng = ChaCha8Rng::seed_from_u64(42);
        let leading: [u8; 16] = person_rng.gen();
        let id = PersonId::from_seed(42);
        assert_ne!(id, PersonId(uuid::Builder::from_random_bytes(leading).into_uuid()));
    }

    #[test]
    fn test_person_id_serialization() {
        let id = PersonId::from_seed(7);
        let json = serde_json::to_string(&id).unwrap();
        assert!(json.contains("PERSON_"));
        let back: PersonId = serde_json::from_str(&json).unwrap();
        assert_eq!(id, back);

        let raw = format!("\"{}\"", id.0);
        let back: PersonId = serde_json::from_str(&raw).unwrap();
        assert_eq!(id, back);
    }

    #[test]
    fn test_link_id_offsets() {
        assert_eq!(LinkId::for_index(0), LinkId(100_000));
        assert_eq!(LinkId::for_index(12).to_string(), "100012");
    }
}
