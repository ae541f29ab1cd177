//! Time-ordered opaque identifiers.
//!
//! An identifier is 108 bits rendered as 22 lowercase characters of Crockford
//! base32 (no `i`, `l`, `o` or `u`):
//!
//! - 10 characters of millisecond Unix timestamp (48 bits, most significant first)
//! - 12 characters of randomness (60 bits)
//!
//! Identifiers generated in different milliseconds sort lexicographically in
//! the order they were generated. Within one millisecond the random suffix
//! breaks ties. There is no counter, so two identifiers say nothing about how
//! many were issued between them.
//!
//! The random suffix comes from a non-cryptographic generator. Knowing an
//! identifier must never be enough to read what it names; access control lives
//! in the request context.

use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

use rand::Rng;
use serde::{Deserialize, Serialize};

/// Crockford's base32 alphabet, lowercase.
const ENCODING: &[u8; 32] = b"0123456789abcdefghjkmnpqrstvwxyz";

const TIME_LEN: usize = 10;
const RANDOM_LEN: usize = 12;

/// Length of every identifier in characters.
pub const ID_LEN: usize = TIME_LEN + RANDOM_LEN;

/// A generated identifier.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Identifier(String);

impl Identifier {
    /// Generate a new identifier from the wall clock and the thread-local RNG.
    pub fn generate() -> Self {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or_default();
        Self::generate_at(now, &mut rand::rng())
    }

    /// Generate an identifier for the given millisecond timestamp.
    pub fn generate_at<R: Rng + ?Sized>(timestamp_ms: u64, rng: &mut R) -> Self {
        let mut id = [0u8; ID_LEN];

        let mut now = timestamp_ms;
        for slot in id[..TIME_LEN].iter_mut().rev() {
            *slot = ENCODING[(now % 32) as usize];
            now /= 32;
        }

        for slot in id[TIME_LEN..].iter_mut() {
            *slot = ENCODING[rng.random_range(0..32)];
        }

        // Every byte comes from the ASCII alphabet above.
        Self(id.iter().map(|&b| b as char).collect())
    }

    /// Parse a string that must already be a well-formed identifier.
    pub fn parse(s: &str) -> Option<Self> {
        is_well_formed(s).then(|| Self(s.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// True when `s` has the exact shape of a generated identifier.
pub fn is_well_formed(s: &str) -> bool {
    s.len() == ID_LEN && s.bytes().all(|b| ENCODING.contains(&b))
}

/// The identifier of an account.
///
/// Account ids travel inside access tokens, so a value of this type is not
/// guaranteed to be well formed until checked with [`AccountId::as_scoping_literal`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AccountId(String);

impl AccountId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The id as it may be spliced into a SQL statement, or `None` when it is
    /// not a well-formed identifier.
    pub fn as_scoping_literal(&self) -> Option<&str> {
        is_well_formed(&self.0).then_some(self.0.as_str())
    }
}

impl From<Identifier> for AccountId {
    fn from(id: Identifier) -> Self {
        Self(id.0)
    }
}

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
