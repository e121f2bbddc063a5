// Copyright (C) 2026 Parity Technologies (UK) Ltd.
// SPDX-License-Identifier: GPL-3.0-or-later

//! Inflation bookkeeping from `EraPaid`.

use super::EventInterpreter;
use crate::events::EraPaid;
use crate::store::StoreError;
use primitive_types::U256;

pub(super) async fn handle_era_paid(
    interp: &EventInterpreter,
    block_number: u64,
    timestamp: u64,
    paid: EraPaid,
) -> Result<(), StoreError> {
    let Some(era_index) = paid.era_index else {
        interp
            .warn(
                block_number,
                timestamp,
                "missing_field",
                "EraPaid without eraIndex".to_string(),
            )
            .await;
        return Ok(());
    };

    let (Some(validator_payout), Some(remainder)) = (paid.validator_payout, paid.remainder) else {
        interp
            .warn(
                block_number,
                timestamp,
                "missing_field",
                format!("EraPaid for era {era_index} without payout amounts"),
            )
            .await;
        return Ok(());
    };

    // Planck amounts exceed u64, so the sum is done as U256 over the
    // decimal strings. On conversion failure nothing on the era row moves.
    let total = match (
        U256::from_dec_str(&validator_payout),
        U256::from_dec_str(&remainder),
    ) {
        (Ok(payout), Ok(rest)) => match payout.checked_add(rest) {
            Some(total) => total.to_string(),
            None => {
                tracing::warn!(era = era_index, "inflation sum overflowed, skipping");
                return Ok(());
            }
        },
        _ => {
            tracing::warn!(
                era = era_index,
                payout = %validator_payout,
                remainder = %remainder,
                "unparseable inflation amounts, skipping"
            );
            return Ok(());
        }
    };

    // Latest observation wins. A missing era row is a no-op; the boundary
    // events fill it in later.
    let updated = interp
        .store
        .set_era_inflation(era_index, &validator_payout, &remainder, &total)
        .await?;
    if updated == 0 {
        tracing::debug!(era = era_index, "EraPaid for unknown era, nothing updated");
    }

    Ok(())
}
