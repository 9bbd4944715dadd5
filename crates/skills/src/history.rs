//! Bounded action logs kept by the simulated modules.

/// Entries kept per log; older entries are dropped first.
pub const HISTORY_LIMIT: usize = 64;

/// Append `item`, dropping the oldest entries beyond `HISTORY_LIMIT`.
pub fn push_bounded<T>(log: &mut Vec<T>, item: T) {
    log.push(item);
    if log.len() > HISTORY_LIMIT {
        let excess = log.len() - HISTORY_LIMIT;
        log.drain(..excess);
    }
}
