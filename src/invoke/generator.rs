use rust_decimal::Decimal;
use tracing::info;

use crate::error::BatchError;
use crate::export::projector::format_amount;
use crate::export::AirdropRow;
use crate::invoke::schema::InvokeSchema;

/// Encode the airdrop-eligible rows as one command batch, in row order.
///
/// Every amount must be a positive integer; the batch carries no fractions.
pub fn generate_batch(target: &str, rows: &[AirdropRow]) -> Result<String, BatchError> {
    if rows.is_empty() {
        return Err(BatchError::Empty);
    }

    let calls = rows
        .iter()
        .map(|row| {
            let amount = row.airdrop_amount;
            if amount <= Decimal::ZERO || !amount.fract().is_zero() {
                return Err(BatchError::NonIntegralAmount {
                    identity: row.identity.clone(),
                    amount: format_amount(amount),
                });
            }
            Ok(InvokeSchema::render_call(target, &row.identity, &format_amount(amount)))
        })
        .collect::<Result<Vec<_>, _>>()?;

    info!("✓ Generated command batch with {} calls", calls.len());
    Ok(InvokeSchema::render_batch(&calls))
}
