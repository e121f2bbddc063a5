// Copyright (C) 2026 Parity Technologies (UK) Ltd.
// SPDX-License-Identifier: GPL-3.0-or-later

//! Derivation of the era / session / election state machine from the Asset
//! Hub event stream.
//!
//! The interpreter consumes the filtered events of one freshly persisted
//! block and mutates the store. It keeps no state of its own between
//! events: every handler re-reads current rows from the store and queries
//! historical chain state at its own block, which is what makes arbitrary
//! interleavings of backfill, live and gap-fill processing safe.
//!
//! No error escapes an event handler. A failed handler is logged; the block
//! itself stays persisted and reprocessing (gap fill or reimport) repairs
//! the derived state.

mod inflation;
mod phases;
mod scores;
mod session;

use crate::client::ChainApi;
use crate::events::{AhEvent, RawEvent};
use crate::store::{NewWarning, Store};
use crate::types::Severity;

#[derive(Clone)]
pub struct EventInterpreter {
    store: Store,
    ss58_prefix: u16,
}

impl EventInterpreter {
    pub fn new(store: Store, ss58_prefix: u16) -> Self {
        Self { store, ss58_prefix }
    }

    /// Apply the special events of one persisted Asset Hub block, in
    /// ingestion order.
    pub async fn apply_block(
        &self,
        chain: &dyn ChainApi,
        block_number: u64,
        timestamp: u64,
        events: &[RawEvent],
    ) {
        for event in events {
            if event.pallet.eq_ignore_ascii_case("staking") && event.method == "Slashed" {
                self.warn(
                    block_number,
                    timestamp,
                    "unexpected_event",
                    format!("slash observed: {}", event.event_id(block_number)),
                )
                .await;
                continue;
            }

            let Some(parsed) = AhEvent::parse(event, self.ss58_prefix) else {
                continue;
            };

            let result = match parsed {
                AhEvent::SessionReport(report) => {
                    session::handle_session_report(self, chain, block_number, timestamp, report)
                        .await
                }
                AhEvent::EraPaid(paid) => {
                    inflation::handle_era_paid(self, block_number, timestamp, paid).await
                }
                AhEvent::PhaseTransitioned(transition) => {
                    phases::handle_phase_transitioned(
                        self,
                        chain,
                        block_number,
                        timestamp,
                        event,
                        transition,
                    )
                    .await
                }
                AhEvent::ElectionSigned(signed) => {
                    scores::handle_signed_event(self, chain, block_number, timestamp, signed).await
                }
            };

            if let Err(e) = result {
                tracing::error!(
                    block = block_number,
                    event = %event.event_type(),
                    error = %e,
                    "event handler failed"
                );
            }
        }
    }

    /// Append a warning row; warnings are observability output only and
    /// must never fail the caller.
    pub(crate) async fn warn(
        &self,
        block_number: u64,
        timestamp: u64,
        kind: &str,
        message: String,
    ) {
        tracing::warn!(block = block_number, kind, "{message}");
        let warning = NewWarning {
            era_id: None,
            session_id: None,
            block_number,
            kind: kind.to_string(),
            message,
            severity: Severity::Warning,
            timestamp,
        };
        if let Err(e) = self.store.insert_warning(warning).await {
            tracing::error!(block = block_number, error = %e, "failed to record warning");
        }
    }
}
