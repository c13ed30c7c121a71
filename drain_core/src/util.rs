//! Common time and unit helpers for drain_core.

/// Number of grams in one kilogram.
pub const GRAMS_PER_KG: f64 = 1000.0;

/// Next deadline for a periodic task that just ran at `now`.
///
/// Missed cycles are skipped rather than replayed: after a long stall the
/// task runs once and resumes on its original phase.
#[inline]
pub fn advance_deadline(prev: u64, period: u64, now: u64) -> u64 {
    let period = period.max(1);
    let next = prev.saturating_add(period);
    if next > now {
        return next;
    }
    let behind = now - prev;
    prev.saturating_add((behind / period + 1).saturating_mul(period))
}

#[inline]
pub fn kg_to_grams(kg: f64) -> f64 {
    kg * GRAMS_PER_KG
}
