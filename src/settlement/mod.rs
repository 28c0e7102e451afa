// Cross-ledger reward reconciliation
use rust_decimal::Decimal;
use std::collections::HashMap;
use tracing::{debug, warn};

use crate::error::AmountError;
use crate::ledger::identity::canonicalize;
use crate::ledger::models::{CombinedRecord, ParticipantId, RawIdentity, RejectedParticipant};
use crate::sources::SourceLedger;

/// Output of one reconciliation pass
#[derive(Debug, Clone, Default)]
pub struct Reconciliation {
    /// Settlement-seeded participants first, then appchain-only ones
    pub records: Vec<CombinedRecord>,
    /// Participants that could not be emitted
    pub rejected: Vec<RejectedParticipant>,
}

impl Reconciliation {
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[derive(Debug)]
struct PendingRecord {
    raw: RawIdentity,
    settlement: Decimal,
    appchain: Decimal,
}

impl PendingRecord {
    fn into_record(self, identity: ParticipantId) -> Result<CombinedRecord, AmountError> {
        let total_rewards = self
            .settlement
            .checked_add(self.appchain)
            .ok_or(AmountError::Overflow)?;
        let airdrop_amount = self
            .appchain
            .checked_sub(self.settlement)
            .ok_or(AmountError::Overflow)?;

        Ok(CombinedRecord {
            identity,
            settlement_rewards: self.settlement,
            appchain_rewards: self.appchain,
            total_rewards,
            airdrop_amount,
        })
    }
}

/// Merges the settlement and appchain ledgers into one record per participant
pub struct RewardReconciler;

impl RewardReconciler {
    /// Merge on the ledgers' identity keys, then canonicalize on emission.
    ///
    /// Ledgers key every parseable identity by its canonical spelling, so one
    /// participant has one key in both. Participants poisoned in either ledger
    /// are left out entirely; the ledgers already report them.
    pub fn reconcile(settlement: &SourceLedger, appchain: &SourceLedger) -> Reconciliation {
        let mut pending: Vec<PendingRecord> = Vec::new();
        let mut index: HashMap<RawIdentity, usize> = HashMap::new();

        for (raw, value) in settlement.iter() {
            index.insert(raw.clone(), pending.len());
            pending.push(PendingRecord {
                raw: raw.clone(),
                settlement: value,
                appchain: Decimal::ZERO,
            });
        }

        for (raw, value) in appchain.iter() {
            match index.get(raw) {
                Some(&i) => pending[i].appchain = value,
                None => {
                    index.insert(raw.clone(), pending.len());
                    pending.push(PendingRecord {
                        raw: raw.clone(),
                        settlement: Decimal::ZERO,
                        appchain: value,
                    });
                }
            }
        }

        let mut reconciliation = Reconciliation::default();

        for entry in pending {
            if settlement.is_poisoned(&entry.raw) || appchain.is_poisoned(&entry.raw) {
                continue;
            }
            let raw = entry.raw.clone();
            let reject = |reason: String| {
                warn!("⚠️ Excluding participant {}: {}", raw, reason);
                RejectedParticipant {
                    raw: raw.clone(),
                    reason,
                }
            };

            let identity = match canonicalize(&entry.raw) {
                Ok(identity) => identity,
                Err(e) => {
                    reconciliation.rejected.push(reject(e.to_string()));
                    continue;
                }
            };

            match entry.into_record(identity) {
                Ok(record) => reconciliation.records.push(record),
                Err(e) => reconciliation.rejected.push(reject(e.to_string())),
            }
        }

        debug!(
            "Reconciled {} participants ({} rejected)",
            reconciliation.records.len(),
            reconciliation.rejected.len()
        );

        reconciliation
    }
}
