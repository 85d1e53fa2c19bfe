use chrono::{DateTime, Utc};

use crate::model::*;

use super::EngineError;

/// Half-open overlap test for two bookings given as start + minutes.
/// Both durations must be positive; validation rejects zero upstream.
pub fn overlaps(
    existing_start: DateTime<Utc>,
    existing_duration: u32,
    candidate_start: DateTime<Utc>,
    candidate_duration: u32,
) -> bool {
    Span::starting_at(existing_start, existing_duration)
        .overlaps(&Span::starting_at(candidate_start, candidate_duration))
}

/// Fails with the first reservation on the table that overlaps `span`.
pub(crate) fn check_no_conflict(ts: &TableState, span: Span) -> Result<(), EngineError> {
    match ts.overlapping(span).next() {
        Some(existing) => Err(EngineError::Overlap {
            table_id: ts.table.id,
            conflicting: existing.id,
        }),
        None => Ok(()),
    }
}
