/// Value used as a 'negative infinity' score to seed forbidden states.
/// Close to `i32::MIN`, with enough headroom that adding two gap
/// penalties to it stays below any reachable score without underflow.
pub const MIN_SCORE: i32 = i32::MIN + 1_000_000;

/// Default capacity for the score vectors when no size hint is given.
pub const DEFAULT_ALIGNER_CAPACITY: usize = 200;
