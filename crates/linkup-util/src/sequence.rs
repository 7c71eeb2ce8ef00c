use std::sync::atomic::{AtomicI64, Ordering};

static APPEND_SEQUENCE: AtomicI64 = AtomicI64::new(0);

/// Next per-process append sequence number. Monotone across all threads;
/// used as the deterministic tie-break when message timestamps collide.
pub fn next() -> i64 {
    APPEND_SEQUENCE.fetch_add(1, Ordering::Relaxed) + 1
}
