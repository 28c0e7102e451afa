// Run orchestration: fetch, reconcile, export, encode, verify
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::Path;
use tracing::{debug, error, info, warn};

use crate::config::OutputPaths;
use crate::error::{AppError, AppResult, SourceError};
use crate::export::projector::{source_view, ExportViews};
use crate::export::{read_rows, write_rows, AirdropRow};
use crate::invoke::{compare, generate_batch, parse_batch, InvokeEntry, RoundTripReport};
use crate::settlement::{Reconciliation, RewardReconciler};
use crate::sources::{RewardExtractor, RewardSource, SourceLedger};

/// What one source contributed to a run
#[derive(Debug)]
pub struct SourceOutcome {
    pub ledger: SourceLedger,
    pub failure: Option<SourceError>,
}

impl SourceOutcome {
    pub fn is_available(&self) -> bool {
        self.failure.is_none()
    }
}

/// Fetch and extract one source. Any failure yields an empty ledger.
pub async fn collect_source(source: &dyn RewardSource) -> SourceOutcome {
    let extractor = RewardExtractor::for_source(source.layer());
    match source.fetch().await {
        Ok(document) => {
            let (ledger, failure) = extractor.extract_or_empty(&document);
            SourceOutcome { ledger, failure }
        }
        Err(e) => {
            warn!("⚠️ {}; continuing without {} data", e, source.layer());
            SourceOutcome {
                ledger: extractor.empty_ledger(),
                failure: Some(e),
            }
        }
    }
}

/// Counts reported at the end of every non-fatal run
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub settlement_available: bool,
    pub appchain_available: bool,
    pub settlement_participants: usize,
    pub appchain_participants: usize,
    pub combined_participants: usize,
    pub eligible_participants: usize,
    pub rejected_participants: usize,
    pub skipped_edges: usize,
}

impl RunSummary {
    pub fn log(&self) {
        info!("📊 Summary:");
        info!(
            "- Settlement participants: {}{}",
            self.settlement_participants,
            if self.settlement_available { "" } else { " (unavailable)" }
        );
        info!(
            "- Appchain participants: {}{}",
            self.appchain_participants,
            if self.appchain_available { "" } else { " (unavailable)" }
        );
        info!("- Total unique participants: {}", self.combined_participants);
        info!("- Participants eligible for airdrop: {}", self.eligible_participants);
        if self.rejected_participants > 0 {
            warn!("- Participants excluded: {}", self.rejected_participants);
        }
        if self.skipped_edges > 0 {
            warn!("- Edges without a participant: {}", self.skipped_edges);
        }
        if let Ok(json) = serde_json::to_string(self) {
            debug!("Run summary: {}", json);
        }
    }
}

/// Everything a reconcile run produced
#[derive(Debug)]
pub struct ReconcileRun {
    pub settlement: SourceOutcome,
    pub appchain: SourceOutcome,
    pub reconciliation: Reconciliation,
    pub views: ExportViews,
    pub summary: RunSummary,
}

/// Fetch both sources concurrently and reconcile them.
///
/// Fails only if neither source produced usable data, or if the combined set
/// is empty and `allow_empty` is false.
pub async fn reconcile(
    settlement_source: &dyn RewardSource,
    appchain_source: &dyn RewardSource,
    allow_empty: bool,
) -> AppResult<ReconcileRun> {
    let started_at = Utc::now();

    let (settlement, appchain) = tokio::join!(
        collect_source(settlement_source),
        collect_source(appchain_source)
    );

    if !settlement.is_available() && !appchain.is_available() {
        error!("❌ Failed to fetch usable data from both sources");
        return Err(AppError::BothSourcesUnreachable);
    }

    info!("🔄 Reconciling reward ledgers");
    let reconciliation = RewardReconciler::reconcile(&settlement.ledger, &appchain.ledger);

    let views = match ExportViews::project(&reconciliation.records) {
        Ok(views) => views,
        Err(AppError::NoRecords) if allow_empty => {
            warn!("⚠️ No records to export");
            ExportViews::default()
        }
        Err(e) => return Err(e),
    };

    let mut rejected = settlement.ledger.poisoned();
    rejected.extend(appchain.ledger.poisoned());
    rejected.extend(reconciliation.rejected.iter().cloned());
    for participant in &rejected {
        debug!("Excluded {}: {}", participant.raw, participant.reason);
    }

    let summary = RunSummary {
        started_at,
        finished_at: Utc::now(),
        settlement_available: settlement.is_available(),
        appchain_available: appchain.is_available(),
        settlement_participants: settlement.ledger.len(),
        appchain_participants: appchain.ledger.len(),
        combined_participants: views.full.len(),
        eligible_participants: views.eligible.len(),
        rejected_participants: rejected.len(),
        skipped_edges: settlement.ledger.skipped_edges() + appchain.ledger.skipped_edges(),
    };

    Ok(ReconcileRun {
        settlement,
        appchain,
        reconciliation,
        views,
        summary,
    })
}

/// Write the combined, airdrop and per-source exports of a run.
///
/// Nothing is written when the combined set is empty.
pub fn write_exports(run: &ReconcileRun, paths: &OutputPaths) -> AppResult<()> {
    if run.views.full.is_empty() {
        warn!("⚠️ Skipping export: no records");
        return Ok(());
    }

    write_rows(&paths.combined_csv, &run.views.full)?;
    info!("✓ Combined rewards written to {}", paths.combined_csv.display());

    write_rows(&paths.airdrop_csv, &run.views.eligible)?;
    info!("✓ Airdrop rows written to {}", paths.airdrop_csv.display());

    for (outcome, path) in [
        (&run.settlement, &paths.settlement_csv),
        (&run.appchain, &paths.appchain_csv),
    ] {
        if outcome.ledger.is_empty() {
            continue;
        }
        let (rows, _) = source_view(&outcome.ledger);
        write_rows(path, &rows)?;
        info!(
            "✓ {} rewards written to {} ({} participants)",
            outcome.ledger.source(),
            path.display(),
            rows.len()
        );
    }

    Ok(())
}

/// Load the airdrop export written by `write_exports`
pub fn read_airdrop_rows(path: &Path) -> AppResult<Vec<AirdropRow>> {
    read_rows::<AirdropRow>(path)
}

/// Encode the airdrop export as a command batch file; returns the call count
pub fn generate_invoke(paths: &OutputPaths, target: &str) -> AppResult<usize> {
    let rows = read_airdrop_rows(&paths.airdrop_csv)?;
    let batch = generate_batch(target, &rows)?;
    std::fs::write(&paths.invoke_file, batch)?;

    info!(
        "✓ Command batch with {} calls written to {}",
        rows.len(),
        paths.invoke_file.display()
    );
    Ok(rows.len())
}

/// Parse the command batch, write the inverse export and compare it with the
/// airdrop export. Any difference is an error.
pub fn verify_invoke(paths: &OutputPaths) -> AppResult<RoundTripReport> {
    let text = std::fs::read_to_string(&paths.invoke_file)?;
    let entries: Vec<InvokeEntry> = parse_batch(&text);

    write_rows(&paths.inverse_csv, &entries)?;
    info!(
        "✓ Inverse export with {} rows written to {}",
        entries.len(),
        paths.inverse_csv.display()
    );

    let expected = read_airdrop_rows(&paths.airdrop_csv)?;
    let report = compare(&expected, &entries);
    if !report.is_clean() {
        error!("❌ Command batch does not match airdrop export: {}", report.describe());
        return Err(AppError::RoundTripMismatch(report.describe()));
    }

    info!("✓ Command batch matches airdrop export: {}", report.describe());
    Ok(report)
}
