use rust_decimal::Decimal;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::collections::HashMap;
use tracing::{debug, warn};

use crate::error::{AmountError, SourceError};
use crate::ledger::amount::{normalize_amount, AmountValue};
use crate::ledger::identity::merge_key;
use crate::ledger::models::{RawIdentity, RejectedParticipant, Source};
use crate::sources::models::{AppchainData, Connection, GraphQlResponse, RewardNode, SettlementData};

/// How repeated entries for one participant combine within a source
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Aggregation {
    /// Every edge is an event; amounts accumulate
    Sum,
    /// Every edge is a cumulative total; the latest edge replaces earlier ones
    LastWriteWins,
}

#[derive(Debug, Clone)]
struct LedgerEntry {
    raw: RawIdentity,
    amount: Result<Decimal, AmountError>,
}

/// Per-source mapping from identity to aggregated reward.
///
/// Identities are keyed by their canonical spelling, so `0x0f`, `0xF` and `15`
/// land on one entry. Iteration follows first appearance of each identity. An entry whose amount
/// failed to parse is held apart: under `Sum` it stays poisoned for the rest
/// of the source, under `LastWriteWins` a later valid edge replaces it.
#[derive(Debug, Clone)]
pub struct SourceLedger {
    source: Source,
    aggregation: Aggregation,
    entries: Vec<LedgerEntry>,
    index: HashMap<RawIdentity, usize>,
    skipped_edges: usize,
}

impl SourceLedger {
    pub fn new(source: Source, aggregation: Aggregation) -> Self {
        Self {
            source,
            aggregation,
            entries: Vec::new(),
            index: HashMap::new(),
            skipped_edges: 0,
        }
    }

    pub fn source(&self) -> Source {
        self.source
    }

    /// Apply one edge's amount according to the aggregation strategy
    pub fn record(&mut self, raw: RawIdentity, amount: Result<Decimal, AmountError>) {
        let raw = merge_key(raw);
        let position = match self.index.get(&raw).copied() {
            Some(position) => position,
            None => {
                self.index.insert(raw.clone(), self.entries.len());
                self.entries.push(LedgerEntry { raw, amount });
                return;
            }
        };

        let aggregation = self.aggregation;
        let entry = &mut self.entries[position];
        let current = std::mem::replace(&mut entry.amount, Err(AmountError::Overflow));
        entry.amount = match (aggregation, current, amount) {
            (Aggregation::LastWriteWins, _, next) => next,
            (Aggregation::Sum, Err(poisoned), _) => Err(poisoned),
            (Aggregation::Sum, Ok(_), Err(e)) => Err(e),
            (Aggregation::Sum, Ok(current), Ok(next)) => {
                current.checked_add(next).ok_or(AmountError::Overflow)
            }
        };
    }

    /// Aggregated amount, `None` if absent or poisoned
    pub fn get(&self, raw: &RawIdentity) -> Option<Decimal> {
        self.index
            .get(&merge_key(raw.clone()))
            .and_then(|&i| self.entries[i].amount.as_ref().ok().copied())
    }

    /// Whether `raw` was seen but its amount is unusable
    pub fn is_poisoned(&self, raw: &RawIdentity) -> bool {
        self.index
            .get(&merge_key(raw.clone()))
            .map_or(false, |&i| self.entries[i].amount.is_err())
    }

    /// Usable entries in first-appearance order
    pub fn iter(&self) -> impl Iterator<Item = (&RawIdentity, Decimal)> + '_ {
        self.entries
            .iter()
            .filter_map(|e| e.amount.as_ref().ok().map(|amount| (&e.raw, *amount)))
    }

    /// Participants whose amount could not be established
    pub fn poisoned(&self) -> Vec<RejectedParticipant> {
        self.entries
            .iter()
            .filter_map(|e| {
                e.amount.as_ref().err().map(|err| RejectedParticipant {
                    raw: e.raw.clone(),
                    reason: format!("{} amount: {}", self.source, err),
                })
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.iter().count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Edges dropped because they carried no node or named no participant
    pub fn skipped_edges(&self) -> usize {
        self.skipped_edges
    }
}

/// Turns one source's GraphQL document into a `SourceLedger`
#[derive(Debug, Clone, Copy)]
pub struct RewardExtractor {
    source: Source,
    aggregation: Aggregation,
}

impl RewardExtractor {
    /// Claim events accumulate per participant
    pub fn settlement() -> Self {
        Self {
            source: Source::Settlement,
            aggregation: Aggregation::Sum,
        }
    }

    /// Cumulative totals; the last row for a participant wins
    pub fn appchain() -> Self {
        Self {
            source: Source::Appchain,
            aggregation: Aggregation::LastWriteWins,
        }
    }

    pub fn for_source(source: Source) -> Self {
        match source {
            Source::Settlement => Self::settlement(),
            Source::Appchain => Self::appchain(),
        }
    }

    pub fn with_aggregation(mut self, aggregation: Aggregation) -> Self {
        self.aggregation = aggregation;
        self
    }

    /// Ledger substituted when the source yields no usable data
    pub fn empty_ledger(&self) -> SourceLedger {
        SourceLedger::new(self.source, self.aggregation)
    }

    /// Extract the source mapping, failing with `SourceError` if the document
    /// carries GraphQL errors or lacks the expected nesting.
    pub fn extract(&self, document: &Value) -> Result<SourceLedger, SourceError> {
        match self.source {
            Source::Settlement => {
                let data: SettlementData = self.unwrap_envelope(document)?;
                self.collect(data.claims)
            }
            Source::Appchain => {
                let data: AppchainData = self.unwrap_envelope(document)?;
                self.collect(data.totals)
            }
        }
    }

    /// Like `extract`, substituting an empty ledger on failure
    pub fn extract_or_empty(&self, document: &Value) -> (SourceLedger, Option<SourceError>) {
        match self.extract(document) {
            Ok(ledger) => (ledger, None),
            Err(e) => {
                warn!("⚠️ {}; continuing with an empty {} ledger", e, self.source);
                (self.empty_ledger(), Some(e))
            }
        }
    }

    fn unwrap_envelope<T: DeserializeOwned>(&self, document: &Value) -> Result<T, SourceError> {
        let response: GraphQlResponse<T> =
            serde_json::from_value(document.clone()).map_err(|e| SourceError::Malformed {
                layer: self.source,
                message: e.to_string(),
            })?;

        if let Some(errors) = response.errors.filter(|e| !e.is_null()) {
            return Err(SourceError::GraphQl {
                layer: self.source,
                errors: errors.to_string(),
            });
        }

        response.data.ok_or_else(|| SourceError::Malformed {
            layer: self.source,
            message: "missing `data`".to_string(),
        })
    }

    fn collect<N: RewardNode>(
        &self,
        connection: Option<Connection<N>>,
    ) -> Result<SourceLedger, SourceError> {
        let malformed = |message: &str| SourceError::Malformed {
            layer: self.source,
            message: message.to_string(),
        };
        let connection = connection.ok_or_else(|| malformed("missing collection"))?;
        let edges = connection.edges.ok_or_else(|| malformed("missing `edges`"))?;

        if let Some(total) = connection.total_count {
            if total > edges.len() as u64 {
                warn!(
                    "⚠️ {} result truncated: totalCount={} but received {} edges",
                    self.source,
                    total,
                    edges.len()
                );
            }
        }

        let mut ledger = SourceLedger::new(self.source, self.aggregation);
        for edge in edges {
            let Some(node) = edge.node else {
                ledger.skipped_edges += 1;
                continue;
            };
            let Some(raw) = node.player().and_then(RawIdentity::from_json) else {
                ledger.skipped_edges += 1;
                continue;
            };
            let amount = AmountValue::from_json(node.amount()).and_then(|v| normalize_amount(&v));
            if let Err(e) = &amount {
                warn!("⚠️ {} edge for {} has unusable amount: {}", self.source, raw, e);
            }
            ledger.record(raw, amount);
        }

        if ledger.skipped_edges > 0 {
            warn!(
                "⚠️ Skipped {} {} edges without a participant",
                ledger.skipped_edges, self.source
            );
        }
        debug!("{} ledger holds {} participants", self.source, ledger.len());

        Ok(ledger)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn claim(player: &str, amount: Value) -> Value {
        json!({ "node": { "player": player, "ty": { "TOKEN": { "amount": amount } } } })
    }

    fn total(player: &str, rewards: Value) -> Value {
        json!({ "node": { "player": player, "rewards_earned": rewards } })
    }

    fn settlement_doc(edges: Vec<Value>) -> Value {
        json!({ "data": { "numsClaimsModels": { "totalCount": edges.len(), "edges": edges } } })
    }

    fn appchain_doc(edges: Vec<Value>) -> Value {
        json!({ "data": { "numsTotalsModels": { "totalCount": edges.len(), "edges": edges } } })
    }

    fn raw(s: &str) -> RawIdentity {
        RawIdentity::new(s)
    }

    #[test]
    fn test_settlement_accumulates_mixed_encodings() {
        let doc = settlement_doc(vec![claim("0xa", json!("0x3")), claim("0xa", json!("5"))]);
        let ledger = RewardExtractor::settlement().extract(&doc).unwrap();

        assert_eq!(ledger.get(&raw("0xa")), Some(Decimal::from(8)));
        assert_eq!(ledger.len(), 1);
    }

    #[test]
    fn test_appchain_last_write_wins() {
        let doc = appchain_doc(vec![total("0xb", json!(10)), total("0xb", json!(7))]);
        let ledger = RewardExtractor::appchain().extract(&doc).unwrap();

        assert_eq!(ledger.get(&raw("0xb")), Some(Decimal::from(7)));
    }

    #[test]
    fn test_aggregation_is_a_parameter() {
        let doc = appchain_doc(vec![total("0xb", json!(10)), total("0xb", json!(7))]);
        let ledger = RewardExtractor::appchain()
            .with_aggregation(Aggregation::Sum)
            .extract(&doc)
            .unwrap();

        assert_eq!(ledger.get(&raw("0xb")), Some(Decimal::from(17)));
    }

    #[test]
    fn test_claim_without_token_counts_as_zero() {
        let doc = settlement_doc(vec![json!({ "node": { "player": "0xc", "ty": {} } })]);
        let ledger = RewardExtractor::settlement().extract(&doc).unwrap();

        assert_eq!(ledger.get(&raw("0xc")), Some(Decimal::ZERO));
    }

    #[test]
    fn test_missing_nesting_is_malformed() {
        let docs = [
            json!({}),
            json!({ "data": {} }),
            json!({ "data": { "numsClaimsModels": { "totalCount": 0 } } }),
            json!({ "data": { "numsClaimsModels": "nope" } }),
        ];
        for doc in docs {
            let err = RewardExtractor::settlement().extract(&doc).unwrap_err();
            assert!(matches!(err, SourceError::Malformed { .. }), "{:?}", err);
        }
    }

    #[test]
    fn test_graphql_errors_fail_the_source() {
        let doc = json!({ "data": null, "errors": [{ "message": "boom" }] });
        let err = RewardExtractor::appchain().extract(&doc).unwrap_err();
        assert!(matches!(err, SourceError::GraphQl { layer: Source::Appchain, .. }));

        let (ledger, condition) = RewardExtractor::appchain().extract_or_empty(&doc);
        assert!(ledger.is_empty());
        assert!(condition.is_some());
    }

    #[test]
    fn test_poisoned_sum_stays_poisoned() {
        let doc = settlement_doc(vec![
            claim("0xd", json!("1")),
            claim("0xd", json!("garbage")),
            claim("0xd", json!("2")),
            claim("0xe", json!("4")),
        ]);
        let ledger = RewardExtractor::settlement().extract(&doc).unwrap();

        assert_eq!(ledger.get(&raw("0xd")), None);
        assert!(ledger.is_poisoned(&raw("0xd")));
        assert!(!ledger.is_poisoned(&raw("0xe")));
        assert_eq!(ledger.get(&raw("0xe")), Some(Decimal::from(4)));
        let poisoned = ledger.poisoned();
        assert_eq!(poisoned.len(), 1);
        assert_eq!(poisoned[0].raw, merge_key(raw("0xd")));
    }

    #[test]
    fn test_poisoned_total_replaced_by_later_row() {
        let doc = appchain_doc(vec![total("0xf", json!("garbage")), total("0xf", json!("9"))]);
        let ledger = RewardExtractor::appchain().extract(&doc).unwrap();

        assert_eq!(ledger.get(&raw("0xf")), Some(Decimal::from(9)));
        assert!(ledger.poisoned().is_empty());
    }

    #[test]
    fn test_first_appearance_order_and_skipped_edges() {
        let doc = appchain_doc(vec![
            total("0x2", json!(1)),
            json!({ "node": { "rewards_earned": 5 } }),
            total("0x1", json!(1)),
            total("0x2", json!(3)),
        ]);
        let ledger = RewardExtractor::appchain().extract(&doc).unwrap();

        let order: Vec<RawIdentity> = ledger.iter().map(|(r, _)| r.clone()).collect();
        assert_eq!(order, vec![merge_key(raw("0x2")), merge_key(raw("0x1"))]);
        assert_eq!(ledger.skipped_edges(), 1);
    }

    #[test]
    fn test_null_nodes_are_skipped_and_counted() {
        let doc = appchain_doc(vec![
            json!({ "node": null }),
            json!({}),
            total("0x1", json!(2)),
        ]);
        let ledger = RewardExtractor::appchain().extract(&doc).unwrap();

        assert_eq!(ledger.len(), 1);
        assert_eq!(ledger.skipped_edges(), 2);
    }

    #[test]
    fn test_spellings_merge_within_a_source() {
        let doc = settlement_doc(vec![
            claim("0x0f", json!("5")),
            claim("15", json!("0x2")),
            claim("0XF", json!(1)),
        ]);
        let ledger = RewardExtractor::settlement().extract(&doc).unwrap();

        assert_eq!(ledger.len(), 1);
        assert_eq!(ledger.get(&raw("0xf")), Some(Decimal::from(8)));
    }

    #[test]
    fn test_empty_claim_amount_counts_as_zero() {
        let doc = settlement_doc(vec![claim("0xa", json!("")), claim("0xa", json!("4"))]);
        let ledger = RewardExtractor::settlement().extract(&doc).unwrap();

        assert!(!ledger.is_poisoned(&raw("0xa")));
        assert_eq!(ledger.get(&raw("0xa")), Some(Decimal::from(4)));
    }

    #[test]
    fn test_empty_total_is_not_a_number() {
        let doc = appchain_doc(vec![total("0xa", json!(""))]);
        let ledger = RewardExtractor::appchain().extract(&doc).unwrap();

        assert!(ledger.is_poisoned(&raw("0xa")));
    }
}
