use rusqlite::Connection;

use crate::db::queries;
use crate::models::{Payment, PaymentStatus, RevenueKind};

/// The ledger side of a void, applied as one transaction: void record,
/// compensating revenue entry, payment reversal. Every write is keyed by
/// booking id, so re-applying after a partial failure completes whatever is
/// missing without double-reversing revenue.
///
/// `payment` must be present when `refund_required`; the refund amount is
/// captured from it here and never recomputed later.
pub fn apply_void_ledger(
    conn: &Connection,
    booking_id: &str,
    reason: &str,
    refund_required: bool,
    payment: Option<&Payment>,
) -> anyhow::Result<()> {
    let refund_amount = if refund_required {
        Some(
            payment
                .ok_or_else(|| anyhow::anyhow!("refund requested without a payment"))?
                .amount,
        )
    } else {
        None
    };

    let tx = conn.unchecked_transaction()?;

    queries::insert_void_record(&tx, booking_id, reason, refund_required, refund_amount)?;

    if let Some(amount) = refund_amount {
        queries::insert_revenue_entry(
            &tx,
            booking_id,
            RevenueKind::Refund,
            -1,
            -amount,
            &queries::current_period(),
        )?;
        queries::update_payment_status(&tx, booking_id, PaymentStatus::Reversed)?;
    }

    tx.commit()?;
    Ok(())
}
