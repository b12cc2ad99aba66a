//! Session/discount join and derived revenue metrics.

use std::collections::HashMap;

use rust_decimal::Decimal;

use crate::model::{CanonicalSession, EffectRollup, MergedSession};

use super::TransformError;

/// Normalized state of a completed session.
pub const CLOSED_STATE: &str = "closed";

/// Left-join sessions with their discount rollups.
///
/// Every session yields exactly one merged row. Sessions without a rollup get
/// a zero discount and keep their own load timestamp.
pub fn merge_sessions(
    sessions: &[CanonicalSession],
    rollups: &[EffectRollup],
) -> Result<Vec<MergedSession>, TransformError> {
    let by_session: HashMap<&str, &EffectRollup> = rollups
        .iter()
        .map(|rollup| (rollup.session_id.as_str(), rollup))
        .collect();

    sessions
        .iter()
        .map(|session| {
            let rollup = by_session.get(session.session_id.as_str());
            let discount_amount_usd = rollup.map_or(Decimal::ZERO, |r| r.discount_amount_usd);
            let source_load_ts = match rollup {
                Some(r) if r.source_load_ts > session.source_load_ts => r.source_load_ts,
                _ => session.source_load_ts,
            };
            let (net_revenue, discount_depth) = derive_metrics(
                &session.session_id,
                session.state.as_deref(),
                session.total_usd,
                discount_amount_usd,
            )?;

            Ok(MergedSession {
                session_id: session.session_id.clone(),
                created_at: session.created_at,
                state: session.state.clone(),
                total_usd: session.total_usd,
                number_of_cart_items: session.number_of_cart_items,
                store_integration_id: session.store_integration_id.clone(),
                channel: session.channel,
                discount_amount_usd,
                net_revenue,
                discount_depth,
                source_load_ts,
            })
        })
        .collect()
}

/// Compute `(net_revenue, discount_depth)` for one session.
///
/// Both are only defined for closed sessions with a known total. Depth
/// additionally needs a positive total. A defined metric that does not fit
/// in a `Decimal` is an error rather than a null.
pub fn derive_metrics(
    session_id: &str,
    state: Option<&str>,
    total_usd: Option<Decimal>,
    discount_amount_usd: Decimal,
) -> Result<(Option<Decimal>, Option<Decimal>), TransformError> {
    if state != Some(CLOSED_STATE) {
        return Ok((None, None));
    }
    let Some(total) = total_usd else {
        return Ok((None, None));
    };

    let overflow = |column| TransformError::Overflow {
        session_id: session_id.to_string(),
        column,
    };

    let net_revenue = total
        .checked_sub(discount_amount_usd)
        .ok_or_else(|| overflow("net_revenue"))?;
    let discount_depth = if total > Decimal::ZERO {
        Some(
            discount_amount_usd
                .checked_div(total)
                .ok_or_else(|| overflow("discount_depth"))?,
        )
    } else {
        None
    };

    Ok((Some(net_revenue), discount_depth))
}
