use rust_decimal::Decimal;
use std::fmt;

/// The two independently tracked reward ledgers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Source {
    Settlement,
    Appchain,
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl Source {
    pub fn as_str(&self) -> &'static str {
        match self {
            Source::Settlement => "settlement",
            Source::Appchain => "appchain",
        }
    }
}

/// Participant identifier exactly as a source reported it.
///
/// Merging is keyed on this form. Two spellings of the same integer are
/// distinct keys until canonicalized at emission.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RawIdentity(String);

impl RawIdentity {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into().trim().to_string())
    }

    /// Build from a JSON scalar. Strings are kept as written, integers use their
    /// decimal spelling; anything else is not an identity.
    pub fn from_json(value: &serde_json::Value) -> Option<Self> {
        match value {
            serde_json::Value::String(s) => Some(Self::new(s.as_str())),
            serde_json::Value::Number(n) if n.is_u64() => Some(Self::new(n.to_string())),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RawIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Canonical participant identity: a 256-bit big-endian integer.
///
/// Byte order matches the lexicographic order of the canonical hex string, so
/// `Ord` on this type is the export sort order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ParticipantId([u8; 32]);

impl ParticipantId {
    pub const HEX_DIGITS: usize = 64;

    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// `0x` followed by 64 lowercase, zero-padded hex digits
    pub fn to_canonical(&self) -> String {
        format!("0x{}", hex::encode(self.0))
    }
}

impl fmt::Display for ParticipantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_canonical())
    }
}

/// One participant's reconciled position across both ledgers.
///
/// INVARIANTS:
/// - `total_rewards = settlement_rewards + appchain_rewards`
/// - `airdrop_amount = appchain_rewards - settlement_rewards`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CombinedRecord {
    pub identity: ParticipantId,
    pub settlement_rewards: Decimal,
    pub appchain_rewards: Decimal,
    pub total_rewards: Decimal,
    pub airdrop_amount: Decimal,
}

impl CombinedRecord {
    /// Participant is owed a distribution
    pub fn is_airdrop_eligible(&self) -> bool {
        self.airdrop_amount > Decimal::ZERO
    }
}

/// A participant that was excluded from the combined set, and why
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RejectedParticipant {
    pub raw: RawIdentity,
    pub reason: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_participant_id_orders_like_canonical_hex() {
        let mut low = [0u8; 32];
        low[31] = 0x0f;
        let mut high = [0u8; 32];
        high[30] = 0x01;

        let low = ParticipantId::from_bytes(low);
        let high = ParticipantId::from_bytes(high);

        assert!(low < high);
        assert!(low.to_canonical() < high.to_canonical());
        assert_eq!(low.to_canonical().len(), 2 + ParticipantId::HEX_DIGITS);
    }

    #[test]
    fn test_raw_identity_from_json() {
        let from_str = RawIdentity::from_json(&serde_json::json!(" 0x1f ")).unwrap();
        assert_eq!(from_str.as_str(), "0x1f");

        let from_num = RawIdentity::from_json(&serde_json::json!(31)).unwrap();
        assert_eq!(from_num.as_str(), "31");

        assert!(RawIdentity::from_json(&serde_json::json!(null)).is_none());
        assert!(RawIdentity::from_json(&serde_json::json!(-4)).is_none());
    }

    #[test]
    fn test_eligibility_is_strictly_positive() {
        let record = |airdrop: i64| CombinedRecord {
            identity: ParticipantId::from_bytes([0u8; 32]),
            settlement_rewards: Decimal::ZERO,
            appchain_rewards: Decimal::ZERO,
            total_rewards: Decimal::ZERO,
            airdrop_amount: Decimal::from(airdrop),
        };

        assert!(record(1).is_airdrop_eligible());
        assert!(!record(0).is_airdrop_eligible());
        assert!(!record(-1).is_airdrop_eligible());
    }
}
