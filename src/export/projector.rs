use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult};
use crate::export::tabular::TabularRow;
use crate::ledger::identity::canonicalize;
use crate::ledger::models::{CombinedRecord, RejectedParticipant};
use crate::sources::SourceLedger;

/// Render an amount without trailing fractional zeros
pub fn format_amount(amount: Decimal) -> String {
    amount.normalize().to_string()
}

/// One line of the full combined export
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CombinedRow {
    pub identity: String,
    #[serde(with = "rust_decimal::serde::str")]
    pub settlement_rewards: Decimal,
    #[serde(with = "rust_decimal::serde::str")]
    pub appchain_rewards: Decimal,
    #[serde(with = "rust_decimal::serde::str")]
    pub total_rewards: Decimal,
}

impl TabularRow for CombinedRow {
    const HEADER: &'static [&'static str] =
        &["identity", "settlementRewards", "appchainRewards", "totalRewards"];
}

/// One line of the airdrop-eligible export
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AirdropRow {
    pub identity: String,
    #[serde(with = "rust_decimal::serde::str")]
    pub airdrop_amount: Decimal,
}

impl TabularRow for AirdropRow {
    const HEADER: &'static [&'static str] = &["identity", "airdropAmount"];
}

/// One line of a single-source export
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceRow {
    pub identity: String,
    #[serde(with = "rust_decimal::serde::str")]
    pub total_rewards: Decimal,
}

impl TabularRow for SourceRow {
    const HEADER: &'static [&'static str] = &["identity", "totalRewards"];
}

/// Both output views of one run
#[derive(Debug, Clone, Default)]
pub struct ExportViews {
    /// Every record in insertion order
    pub full: Vec<CombinedRow>,
    /// Positive airdrops only, ascending by canonical identity
    pub eligible: Vec<AirdropRow>,
}

impl ExportViews {
    /// Project a combined record set; an empty set is `NoRecords`
    pub fn project(records: &[CombinedRecord]) -> AppResult<Self> {
        if records.is_empty() {
            return Err(AppError::NoRecords);
        }
        Ok(Self {
            full: full_view(records),
            eligible: eligible_view(records),
        })
    }
}

pub fn full_view(records: &[CombinedRecord]) -> Vec<CombinedRow> {
    records
        .iter()
        .map(|r| CombinedRow {
            identity: r.identity.to_canonical(),
            settlement_rewards: r.settlement_rewards.normalize(),
            appchain_rewards: r.appchain_rewards.normalize(),
            total_rewards: r.total_rewards.normalize(),
        })
        .collect()
}

pub fn eligible_view(records: &[CombinedRecord]) -> Vec<AirdropRow> {
    let mut eligible: Vec<&CombinedRecord> =
        records.iter().filter(|r| r.is_airdrop_eligible()).collect();
    eligible.sort_by(|a, b| a.identity.cmp(&b.identity));

    eligible
        .into_iter()
        .map(|r| AirdropRow {
            identity: r.identity.to_canonical(),
            airdrop_amount: r.airdrop_amount.normalize(),
        })
        .collect()
}

/// Canonicalized view of one source ledger, in source order
pub fn source_view(ledger: &SourceLedger) -> (Vec<SourceRow>, Vec<RejectedParticipant>) {
    let mut rows = Vec::new();
    let mut rejected = Vec::new();

    for (raw, amount) in ledger.iter() {
        match canonicalize(raw) {
            Ok(id) => rows.push(SourceRow {
                identity: id.to_canonical(),
                total_rewards: amount.normalize(),
            }),
            Err(e) => rejected.push(RejectedParticipant {
                raw: raw.clone(),
                reason: e.to_string(),
            }),
        }
    }

    (rows, rejected)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::BatchError;
    use crate::export::tabular::{read_rows, write_rows};
    use crate::ledger::models::{ParticipantId, RawIdentity, Source};
    use std::str::FromStr;
    use crate::sources::Aggregation;

    fn id(last: u8) -> ParticipantId {
        let mut bytes = [0u8; 32];
        bytes[31] = last;
        ParticipantId::from_bytes(bytes)
    }

    fn record(last: u8, settlement: i64, appchain: i64) -> CombinedRecord {
        let s = Decimal::from(settlement);
        let a = Decimal::from(appchain);
        CombinedRecord {
            identity: id(last),
            settlement_rewards: s,
            appchain_rewards: a,
            total_rewards: s + a,
            airdrop_amount: a - s,
        }
    }

    #[test]
    fn test_eligible_filter_and_sort() {
        let records = vec![record(2, 0, 5), record(1, 1, 0), record(3, 1, 10)];

        let eligible = eligible_view(&records);
        assert_eq!(
            eligible,
            vec![
                AirdropRow {
                    identity: id(2).to_canonical(),
                    airdrop_amount: Decimal::from(5)
                },
                AirdropRow {
                    identity: id(3).to_canonical(),
                    airdrop_amount: Decimal::from(9)
                },
            ]
        );
    }

    #[test]
    fn test_zero_delta_excluded() {
        let records = vec![record(7, 20, 20)];
        assert!(eligible_view(&records).is_empty());
    }

    #[test]
    fn test_full_view_keeps_insertion_order() {
        let records = vec![record(9, 1, 0), record(1, 0, 1)];
        let views = ExportViews::project(&records).unwrap();

        assert_eq!(views.full.len(), 2);
        assert_eq!(views.full[0].identity, id(9).to_canonical());
        assert_eq!(views.full[1].identity, id(1).to_canonical());
    }

    #[test]
    fn test_combined_export_amounts_are_normalized() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("combined.csv");
        let mut r = record(4, 0, 0);
        r.settlement_rewards = Decimal::from_str("1.50").unwrap();
        r.appchain_rewards = Decimal::from_str("2.50").unwrap();
        r.total_rewards = r.settlement_rewards + r.appchain_rewards;
        r.airdrop_amount = r.appchain_rewards - r.settlement_rewards;

        let views = ExportViews::project(&[r]).unwrap();
        write_rows(&path, &views.full).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        assert_eq!(
            text,
            format!(
                "identity,settlementRewards,appchainRewards,totalRewards\n{},1.5,2.5,4\n",
                id(4).to_canonical()
            )
        );
        assert_eq!(views.eligible[0].airdrop_amount.to_string(), "1");
    }

    #[test]
    fn test_empty_is_no_records() {
        assert!(matches!(ExportViews::project(&[]), Err(AppError::NoRecords)));
    }

    #[test]
    fn test_amount_formatting() {
        assert_eq!(format_amount(Decimal::from_str("12.500").unwrap()), "12.5");
        assert_eq!(format_amount(Decimal::from_str("8.0").unwrap()), "8");
        assert_eq!(format_amount(Decimal::from(-100)), "-100");
    }

    #[test]
    fn test_airdrop_export_reads_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("airdrop.csv");
        let rows = eligible_view(&[record(2, 0, 42), record(1, 3, 10)]);

        write_rows(&path, &rows).unwrap();
        assert_eq!(read_rows::<AirdropRow>(&path).unwrap(), rows);

        std::fs::write(&path, "identity,airdropAmount\n0xabc,lots\n").unwrap();
        assert!(matches!(
            read_rows::<AirdropRow>(&path),
            Err(AppError::Batch(BatchError::MalformedRow { .. }))
        ));
    }

    #[test]
    fn test_source_view_canonicalizes() {
        let mut ledger = SourceLedger::new(Source::Appchain, Aggregation::LastWriteWins);
        ledger.record(RawIdentity::new("0x2"), Ok(Decimal::from(4)));
        ledger.record(RawIdentity::new("bogus"), Ok(Decimal::from(1)));

        let (rows, rejected) = source_view(&ledger);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].identity, id(2).to_canonical());
        assert_eq!(rejected.len(), 1);
    }
}
