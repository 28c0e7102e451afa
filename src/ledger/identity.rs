use primitive_types::U256;

use crate::error::IdentityError;
use crate::ledger::models::{ParticipantId, RawIdentity};

/// Canonicalize a raw participant identifier.
///
/// Accepts `0x`/`0X` hex or plain decimal of any width or padding. The same
/// integer always yields the same `ParticipantId`.
pub fn canonicalize(raw: &RawIdentity) -> Result<ParticipantId, IdentityError> {
    let text = raw.as_str();
    let malformed = || IdentityError::Malformed {
        raw: text.to_string(),
    };
    let out_of_range = || IdentityError::OutOfRange {
        raw: text.to_string(),
    };

    if let Some(digits) = text.strip_prefix("0x").or_else(|| text.strip_prefix("0X")) {
        if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(malformed());
        }
        let significant = digits.trim_start_matches('0');
        if significant.len() > ParticipantId::HEX_DIGITS {
            return Err(out_of_range());
        }

        let padded = format!("{:0>width$}", significant, width = ParticipantId::HEX_DIGITS);
        let mut bytes = [0u8; 32];
        hex::decode_to_slice(padded, &mut bytes).map_err(|_| malformed())?;
        return Ok(ParticipantId::from_bytes(bytes));
    }

    if text.is_empty() || !text.chars().all(|c| c.is_ascii_digit()) {
        return Err(malformed());
    }
    let value = U256::from_dec_str(text).map_err(|_| out_of_range())?;
    let mut bytes = [0u8; 32];
    value.to_big_endian(&mut bytes);
    Ok(ParticipantId::from_bytes(bytes))
}

/// Merge key for a raw identifier: its canonical spelling when it parses,
/// otherwise the raw text unchanged so the failure surfaces at emission.
pub fn merge_key(raw: RawIdentity) -> RawIdentity {
    match canonicalize(&raw) {
        Ok(id) => RawIdentity::new(id.to_canonical()),
        Err(_) => raw,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn canonical(raw: &str) -> Result<String, IdentityError> {
        canonicalize(&RawIdentity::new(raw)).map(|id| id.to_canonical())
    }

    #[test]
    fn test_decimal_and_hex_agree() {
        let expected = format!("0x{}ff", "0".repeat(62));
        assert_eq!(canonical("255").unwrap(), expected);
        assert_eq!(canonical("0xff").unwrap(), expected);
        assert_eq!(canonical("0xFF").unwrap(), expected);
        assert_eq!(canonical("0x00000ff").unwrap(), expected);
        let native = RawIdentity::from_json(&serde_json::json!(255)).unwrap();
        assert_eq!(canonicalize(&native).unwrap().to_canonical(), expected);
    }

    #[test]
    fn test_canonical_form_is_a_fixed_point() {
        for raw in ["0", "1", "0x7b", "3618502788666131213697322783095070105623107215331596699973092056135872020480"] {
            let once = canonical(raw).unwrap();
            let twice = canonical(&once).unwrap();
            assert_eq!(once, twice);
            assert_eq!(once.len(), 66);
            assert!(once.starts_with("0x"));
        }
    }

    #[test]
    fn test_full_width_accepted() {
        let max = format!("0x{}", "f".repeat(64));
        assert_eq!(canonical(&max).unwrap(), max);

        let max_dec = "115792089237316195423570985008687907853269984665640564039457584007913129639935";
        assert_eq!(canonical(max_dec).unwrap(), max);
    }

    #[test]
    fn test_out_of_range() {
        let wide = format!("0x1{}", "0".repeat(64));
        assert!(matches!(canonical(&wide), Err(IdentityError::OutOfRange { .. })));

        let wide_dec = "115792089237316195423570985008687907853269984665640564039457584007913129639936";
        assert!(matches!(canonical(wide_dec), Err(IdentityError::OutOfRange { .. })));
    }

    #[test]
    fn test_merge_key_unifies_spellings() {
        let key = merge_key(RawIdentity::new("0x0f"));
        assert_eq!(key, merge_key(RawIdentity::new("15")));
        assert_eq!(key, merge_key(RawIdentity::new("0xF")));
        assert_eq!(key.as_str(), format!("0x{}0f", "0".repeat(62)));

        assert_eq!(merge_key(RawIdentity::new("bogus")).as_str(), "bogus");
    }

    #[test]
    fn test_malformed() {
        for raw in ["", "0x", "0xfg", "12a", "-1"] {
            assert!(
                matches!(canonical(raw), Err(IdentityError::Malformed { .. })),
                "expected Malformed for {:?}",
                raw
            );
        }
    }
}
