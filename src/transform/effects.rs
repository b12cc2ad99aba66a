//! Discount effect rollup.

use std::collections::btree_map::Entry;
use std::collections::BTreeMap;

use rust_decimal::Decimal;

use crate::model::{EffectRollup, RawEffect};
use crate::normalize;

use super::{recency, TransformError};

/// Effect types whose values count toward a session's discount.
pub const DEFAULT_DISCOUNT_EFFECT_TYPES: [&str; 2] =
    ["setDiscountPerItem", "setDiscountPerAdditionalCost"];

/// Roll raw effects up into one discount total per session.
///
/// Only the latest row per (session, effect type) is considered. Values of
/// types in `discount_types` are summed, with unparseable values counting as
/// zero. Sessions without any effect row are absent from the result.
///
/// Fails if a session's discount total does not fit in a `Decimal`.
pub fn rollup_effects(
    raw: Vec<RawEffect>,
    discount_types: &[String],
) -> Result<Vec<EffectRollup>, TransformError> {
    let mut latest: BTreeMap<(String, String), RawEffect> = BTreeMap::new();

    for row in raw {
        let key = (
            row.session_id.clone(),
            row.effect_type.clone().unwrap_or_default(),
        );
        match latest.entry(key) {
            Entry::Vacant(slot) => {
                slot.insert(row);
            }
            Entry::Occupied(mut slot) => {
                let current = slot.get();
                if recency(row.load_ts, row.row_id) > recency(current.load_ts, current.row_id) {
                    slot.insert(row);
                }
            }
        }
    }

    let mut rollups: BTreeMap<String, EffectRollup> = BTreeMap::new();

    for ((session_id, effect_type), row) in latest {
        let amount = if discount_types.iter().any(|t| *t == effect_type) {
            normalize::decimal(row.value.as_deref()).unwrap_or(Decimal::ZERO)
        } else {
            Decimal::ZERO
        };

        match rollups.entry(session_id) {
            Entry::Vacant(slot) => {
                let session_id = slot.key().clone();
                slot.insert(EffectRollup {
                    session_id,
                    discount_amount_usd: amount,
                    representative_effect_type: effect_type,
                    source_load_ts: row.load_ts,
                });
            }
            Entry::Occupied(mut slot) => {
                let rollup = slot.get_mut();
                rollup.discount_amount_usd = rollup
                    .discount_amount_usd
                    .checked_add(amount)
                    .ok_or_else(|| TransformError::Overflow {
                        session_id: rollup.session_id.clone(),
                        column: "discount_amount_usd",
                    })?;
                if effect_type > rollup.representative_effect_type {
                    rollup.representative_effect_type = effect_type;
                }
                if row.load_ts > rollup.source_load_ts {
                    rollup.source_load_ts = row.load_ts;
                }
            }
        }
    }

    Ok(rollups.into_values().collect())
}
