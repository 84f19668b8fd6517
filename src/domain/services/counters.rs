//! Counter Delta Accounting
//!
//! Backends report document operations as ever-growing totals. Charts want
//! per-sample activity, so each reading is turned into a delta against the
//! previous reading of the same connection.

use crate::domain::entities::{DocCounts, DocumentCounters};

/// Last observed raw totals for one connection. Zero means "unset".
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CounterState {
    pub queried: i64,
    pub inserted: i64,
    pub deleted: i64,
    pub updated: i64,
}

impl CounterState {
    /// Record a new reading and return the deltas since the previous one.
    ///
    /// A counter seen for the first time yields 0. A counter that went
    /// backwards (upstream restart) yields a negative delta, unchanged.
    pub fn advance(&mut self, raw: &DocumentCounters) -> DocCounts {
        DocCounts {
            queried: step(&mut self.queried, raw.returned),
            inserted: step(&mut self.inserted, raw.inserted),
            deleted: step(&mut self.deleted, raw.deleted),
            updated: step(&mut self.updated, raw.updated),
        }
    }
}

fn step(previous: &mut i64, raw: i64) -> i64 {
    let delta = if *previous == 0 { 0 } else { raw - *previous };
    *previous = raw;
    delta
}
