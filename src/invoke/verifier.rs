use rust_decimal::Decimal;
use std::cmp::Ordering;
use std::str::FromStr;
use tracing::{debug, info};

use crate::export::AirdropRow;
use crate::invoke::schema::{CallField, InvokeEntry, InvokeSchema};

/// Recover every complete `reward` call from a batch, sorted by identity.
///
/// Incomplete or malformed calls are skipped.
pub fn parse_batch(text: &str) -> Vec<InvokeEntry> {
    let entrypoint = InvokeSchema::position(CallField::Entrypoint);
    let identity_at = InvokeSchema::position(CallField::Identity) - entrypoint;
    let amount_at = InvokeSchema::position(CallField::Amount) - entrypoint;

    let mut entries = Vec::new();
    let mut skipped = 0usize;
    for tokens in InvokeSchema::calls(text) {
        let mut i = 0;
        while i < tokens.len() {
            if !InvokeSchema::is_entrypoint(tokens[i]) {
                i += 1;
                continue;
            }

            let identity = tokens.get(i + identity_at).copied();
            let amount = tokens.get(i + amount_at).copied();
            match (identity, amount) {
                (Some(identity), Some(amount))
                    if InvokeSchema::is_identity(identity) && InvokeSchema::is_amount(amount) =>
                {
                    entries.push(InvokeEntry {
                        identity: identity.to_string(),
                        amount: amount.to_string(),
                    });
                    i += amount_at + 1;
                }
                _ => {
                    skipped += 1;
                    i += 1;
                }
            }
        }
    }

    if skipped > 0 {
        debug!("Skipped {} incomplete calls", skipped);
    }
    info!("✓ Extracted {} calls from command batch", entries.len());

    entries.sort_by(|a, b| a.identity.cmp(&b.identity));
    entries
}

/// Differences between an airdrop export and a parsed batch
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RoundTripReport {
    pub matched: usize,
    /// Exported but absent from the batch
    pub missing: Vec<String>,
    /// In the batch but never exported
    pub unexpected: Vec<String>,
    /// Present in both with different amounts: (identity, exported, batch)
    pub mismatched: Vec<(String, String, String)>,
}

impl RoundTripReport {
    pub fn is_clean(&self) -> bool {
        self.missing.is_empty() && self.unexpected.is_empty() && self.mismatched.is_empty()
    }

    pub fn describe(&self) -> String {
        format!(
            "{} matched, {} missing, {} unexpected, {} mismatched",
            self.matched,
            self.missing.len(),
            self.unexpected.len(),
            self.mismatched.len()
        )
    }
}

/// Merge-join the sorted export against the sorted batch entries
pub fn compare(expected: &[AirdropRow], parsed: &[InvokeEntry]) -> RoundTripReport {
    let mut expected: Vec<&AirdropRow> = expected.iter().collect();
    expected.sort_by(|a, b| a.identity.cmp(&b.identity));

    let mut report = RoundTripReport::default();
    let (mut e, mut p) = (0, 0);

    while e < expected.len() && p < parsed.len() {
        let row = expected[e];
        let entry = &parsed[p];
        match row.identity.cmp(&entry.identity) {
            Ordering::Less => {
                report.missing.push(row.identity.clone());
                e += 1;
            }
            Ordering::Greater => {
                report.unexpected.push(entry.identity.clone());
                p += 1;
            }
            Ordering::Equal => {
                let same = Decimal::from_str(&entry.amount)
                    .map(|amount| amount == row.airdrop_amount)
                    .unwrap_or(false);
                if same {
                    report.matched += 1;
                } else {
                    report.mismatched.push((
                        row.identity.clone(),
                        row.airdrop_amount.normalize().to_string(),
                        entry.amount.clone(),
                    ));
                }
                e += 1;
                p += 1;
            }
        }
    }

    report
        .missing
        .extend(expected[e..].iter().map(|row| row.identity.clone()));
    report
        .unexpected
        .extend(parsed[p..].iter().map(|entry| entry.identity.clone()));

    report
}
