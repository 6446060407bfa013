//! Snowflake identifier generation and base-62 short id encoding.
//!
//! An identifier is a 63-bit integer laid out as:
//!
//! ```text
//! | 41 bits: ms since EPOCH_MILLIS | 10 bits: node id | 12 bits: sequence |
//! ```
//!
//! Identifiers from one generator are strictly increasing. The encoded form uses
//! [`BASE62_ALPHABET`], whose ordering must never change: previously issued short
//! ids depend on it.

use std::sync::Mutex;
use std::time::{Duration, Instant};
use tracing::warn;

/// Symbols used by [`encode_base62`], in digit order.
pub const BASE62_ALPHABET: &[u8; 62] =
    b"0123456789abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ";

/// Custom epoch in Unix milliseconds (2010-11-04T01:42:54.657Z).
pub const EPOCH_MILLIS: u64 = 1_288_834_974_657;

/// Highest valid node id.
pub const MAX_NODE_ID: u16 = 1023;

/// Node id used when the configured one is out of range.
pub const DEFAULT_NODE_ID: u16 = 1;

/// How long [`SnowflakeGenerator::next_id`] waits for the clock to advance after
/// the per-millisecond sequence is used up.
///
/// `next_id` is synchronous and holds the generator lock while waiting, so a
/// stalled clock blocks the calling thread for at most this long.
pub const DEFAULT_MAX_CLOCK_WAIT: Duration = Duration::from_millis(50);

/// Pause between clock reads while waiting for the next millisecond.
const CLOCK_POLL_INTERVAL: Duration = Duration::from_micros(50);

const NODE_BITS: u32 = 10;
const SEQUENCE_BITS: u32 = 12;
const TIMESTAMP_BITS: u32 = 41;

const SEQUENCE_MASK: u64 = (1 << SEQUENCE_BITS) - 1;
const NODE_MASK: u64 = (1 << NODE_BITS) - 1;
const MAX_TIMESTAMP: u64 = (1 << TIMESTAMP_BITS) - 1;
const NODE_SHIFT: u32 = SEQUENCE_BITS;
const TIMESTAMP_SHIFT: u32 = SEQUENCE_BITS + NODE_BITS;

/// Errors from identifier generation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GeneratorError {
    /// The clock did not advance in time or the timestamp field overflowed.
    #[error("identifier generator exhausted: {0}")]
    Exhausted(String),
}

/// Millisecond wall clock.
pub trait Clock: Send + Sync {
    /// Current time in Unix milliseconds.
    fn now_millis(&self) -> u64;
}

/// [`Clock`] backed by the system time.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_millis(&self) -> u64 {
        u64::try_from(chrono::Utc::now().timestamp_millis()).unwrap_or(0)
    }
}

/// Produces unique numeric identifiers and their short text form.
#[cfg_attr(test, mockall::automock)]
pub trait IdGenerator: Send + Sync {
    /// Returns an identifier strictly greater than every previous one from
    /// this generator.
    ///
    /// # Errors
    ///
    /// Returns [`GeneratorError::Exhausted`] if the clock stalls or overflows.
    fn next_id(&self) -> Result<u64, GeneratorError>;

    /// Encodes an identifier as a short id.
    fn encode(&self, id: u64) -> String {
        encode_base62(id)
    }
}

/// Fields packed into a Snowflake identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IdParts {
    /// Unix milliseconds at which the identifier was issued.
    pub unix_millis: u64,
    /// Node that issued the identifier.
    pub node_id: u16,
    /// Position within the issuing millisecond.
    pub sequence: u16,
}

impl IdParts {
    /// Splits a Snowflake identifier into its fields.
    pub fn from_id(id: u64) -> Self {
        Self {
            unix_millis: (id >> TIMESTAMP_SHIFT) + EPOCH_MILLIS,
            node_id: ((id >> NODE_SHIFT) & NODE_MASK) as u16,
            sequence: (id & SEQUENCE_MASK) as u16,
        }
    }
}

#[derive(Debug, Default)]
struct GeneratorState {
    last_timestamp: u64,
    sequence: u64,
}

/// Snowflake-style generator for a single node.
///
/// Construct one per process and share it (`Arc<dyn IdGenerator>`).
pub struct SnowflakeGenerator {
    node_id: u16,
    clock: Box<dyn Clock>,
    max_clock_wait: Duration,
    state: Mutex<GeneratorState>,
}

impl SnowflakeGenerator {
    /// Creates a generator for `node_id` using the system clock.
    ///
    /// Values outside `0..=1023` fall back to [`DEFAULT_NODE_ID`].
    pub fn new(node_id: i64) -> Self {
        Self::with_clock(node_id, SystemClock)
    }

    /// Creates a generator reading time from `clock`.
    pub fn with_clock(node_id: i64, clock: impl Clock + 'static) -> Self {
        let node_id = match u16::try_from(node_id) {
            Ok(id) if id <= MAX_NODE_ID => id,
            _ => {
                warn!(
                    "Node id {} is outside 0..={}, using {}",
                    node_id, MAX_NODE_ID, DEFAULT_NODE_ID
                );
                DEFAULT_NODE_ID
            }
        };

        Self {
            node_id,
            clock: Box::new(clock),
            max_clock_wait: DEFAULT_MAX_CLOCK_WAIT,
            state: Mutex::new(GeneratorState::default()),
        }
    }

    /// Overrides how long to wait for the clock when a millisecond's sequence
    /// space is exhausted.
    pub fn max_clock_wait(mut self, wait: Duration) -> Self {
        self.max_clock_wait = wait;
        self
    }

    /// The node id embedded in every identifier.
    pub fn node_id(&self) -> u16 {
        self.node_id
    }

    fn elapsed_millis(&self) -> u64 {
        self.clock.now_millis().saturating_sub(EPOCH_MILLIS)
    }

    /// Polls until the clock passes `last`, or gives up after `max_clock_wait`.
    fn wait_next_millis(&self, last: u64) -> Result<u64, GeneratorError> {
        let deadline = Instant::now() + self.max_clock_wait;
        loop {
            let now = self.elapsed_millis();
            if now > last {
                return Ok(now);
            }
            if Instant::now() >= deadline {
                return Err(GeneratorError::Exhausted(format!(
                    "sequence exhausted and clock did not advance within {:?}",
                    self.max_clock_wait
                )));
            }
            std::thread::sleep(CLOCK_POLL_INTERVAL);
        }
    }
}

impl IdGenerator for SnowflakeGenerator {
    fn next_id(&self) -> Result<u64, GeneratorError> {
        let mut state = self
            .state
            .lock()
            .map_err(|_| GeneratorError::Exhausted("generator state poisoned".to_string()))?;

        // A clock that moved backwards keeps issuing from the last millisecond.
        let mut timestamp = self.elapsed_millis().max(state.last_timestamp);
        let mut sequence = 0;

        if timestamp == state.last_timestamp {
            sequence = (state.sequence + 1) & SEQUENCE_MASK;
            if sequence == 0 {
                timestamp = self.wait_next_millis(state.last_timestamp)?;
            }
        }

        if timestamp > MAX_TIMESTAMP {
            return Err(GeneratorError::Exhausted(
                "timestamp no longer fits in 41 bits".to_string(),
            ));
        }

        // Commit only after every failure point so a failed call never
        // consumes a sequence number.
        state.last_timestamp = timestamp;
        state.sequence = sequence;

        Ok((timestamp << TIMESTAMP_SHIFT) | (u64::from(self.node_id) << NODE_SHIFT) | sequence)
    }
}

/// Encodes `id` in base 62 over [`BASE62_ALPHABET`].
///
/// `0` encodes to `"0"`. Distinct inputs give distinct outputs.
pub fn encode_base62(mut id: u64) -> String {
    if id == 0 {
        return (BASE62_ALPHABET[0] as char).to_string();
    }

    let base = BASE62_ALPHABET.len() as u64;
    let mut digits = Vec::with_capacity(11);
    while id > 0 {
        digits.push(BASE62_ALPHABET[(id % base) as usize]);
        id /= base;
    }
    digits.reverse();

    digits.into_iter().map(char::from).collect()
}

/// Inverse of [`encode_base62`].
///
/// Returns `None` for empty input, symbols outside the alphabet, or values
/// that overflow `u64`.
pub fn decode_base62(encoded: &str) -> Option<u64> {
    if encoded.is_empty() {
        return None;
    }

    encoded.bytes().try_fold(0u64, |acc, byte| {
        let digit = BASE62_ALPHABET.iter().position(|&c| c == byte)? as u64;
        acc.checked_mul(BASE62_ALPHABET.len() as u64)?
            .checked_add(digit)
    })
}

/// Wall-clock nanoseconds, used as a last-resort identifier.
pub fn fallback_id() -> u64 {
    let nanos = chrono::Utc::now().timestamp_nanos_opt().unwrap_or(i64::MAX);
    u64::try_from(nanos).unwrap_or(0)
}

/// Returns a short id from `generator`, never failing.
///
/// When `next_id` fails the current wall-clock nanoseconds are encoded instead.
/// Such ids are not guaranteed unique, so callers should check them against
/// storage.
pub fn generate_short_id(generator: &dyn IdGenerator) -> String {
    match generator.next_id() {
        Ok(id) => generator.encode(id),
        Err(e) => {
            warn!("Identifier generation failed, using timestamp fallback: {}", e);
            generator.encode(fallback_id())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU64, Ordering};

    /// Clock whose time only moves when the test says so.
    #[derive(Clone)]
    struct ManualClock(Arc<AtomicU64>);

    impl ManualClock {
        fn at(millis: u64) -> Self {
            Self(Arc::new(AtomicU64::new(millis)))
        }

        fn set(&self, millis: u64) {
            self.0.store(millis, Ordering::SeqCst);
        }
    }

    impl Clock for ManualClock {
        fn now_millis(&self) -> u64 {
            self.0.load(Ordering::SeqCst)
        }
    }

    const T0: u64 = EPOCH_MILLIS + 1_000_000;

    #[test]
    fn test_encode_known_values() {
        assert_eq!(encode_base62(0), "0");
        assert_eq!(encode_base62(1), "1");
        assert_eq!(encode_base62(10), "a");
        assert_eq!(encode_base62(36), "A");
        assert_eq!(encode_base62(61), "Z");
        assert_eq!(encode_base62(62), "10");
        assert_eq!(encode_base62(62 * 62), "100");
    }

    #[test]
    fn test_encode_is_injective_over_a_range() {
        let encoded: HashSet<String> = (0..20_000u64).map(encode_base62).collect();
        assert_eq!(encoded.len(), 20_000);
    }

    #[test]
    fn test_encode_max_value_is_non_empty() {
        let encoded = encode_base62(u64::MAX);
        assert_eq!(encoded.len(), 11);
        assert_eq!(decode_base62(&encoded), Some(u64::MAX));
    }

    #[test]
    fn test_decode_rejects_invalid_input() {
        assert_eq!(decode_base62(""), None);
        assert_eq!(decode_base62("ab-c"), None);
        assert_eq!(decode_base62("zzzzzzzzzzzzzz"), None);
    }

    #[test]
    fn test_decode_inverts_encode() {
        for id in [0u64, 1, 61, 62, 3843, 123_456_789, 1 << 62] {
            assert_eq!(decode_base62(&encode_base62(id)), Some(id));
        }
    }

    #[test]
    fn test_node_id_clamping() {
        assert_eq!(SnowflakeGenerator::new(5).node_id(), 5);
        assert_eq!(SnowflakeGenerator::new(0).node_id(), 0);
        assert_eq!(SnowflakeGenerator::new(1023).node_id(), 1023);
        assert_eq!(SnowflakeGenerator::new(-5).node_id(), DEFAULT_NODE_ID);
        assert_eq!(SnowflakeGenerator::new(1024).node_id(), DEFAULT_NODE_ID);
    }

    #[test]
    fn test_sequential_ids_strictly_increase() {
        let generator = SnowflakeGenerator::new(1);
        let mut last = 0;

        for _ in 0..10_000 {
            let id = generator.next_id().unwrap();
            assert!(id > last, "id {} not greater than {}", id, last);
            last = id;
        }
    }

    #[test]
    fn test_ids_are_positive_63_bit() {
        let generator = SnowflakeGenerator::new(MAX_NODE_ID as i64);
        let id = generator.next_id().unwrap();
        assert!(id > 0);
        assert!(id < (1 << 63));
    }

    #[test]
    fn test_id_parts_round_trip() {
        let clock = ManualClock::at(T0);
        let generator = SnowflakeGenerator::with_clock(42, clock);

        let first = IdParts::from_id(generator.next_id().unwrap());
        let second = IdParts::from_id(generator.next_id().unwrap());

        assert_eq!(first.unix_millis, T0);
        assert_eq!(first.node_id, 42);
        assert_eq!(first.sequence, 0);
        assert_eq!(second.sequence, 1);
    }

    #[test]
    fn test_sequence_resets_on_new_millisecond() {
        let clock = ManualClock::at(T0);
        let generator = SnowflakeGenerator::with_clock(1, clock.clone());

        generator.next_id().unwrap();
        generator.next_id().unwrap();
        clock.set(T0 + 1);
        let parts = IdParts::from_id(generator.next_id().unwrap());

        assert_eq!(parts.unix_millis, T0 + 1);
        assert_eq!(parts.sequence, 0);
    }

    #[test]
    fn test_exhausted_sequence_with_frozen_clock_fails() {
        let clock = ManualClock::at(T0);
        let generator = SnowflakeGenerator::with_clock(1, clock.clone())
            .max_clock_wait(Duration::from_millis(5));

        for _ in 0..=SEQUENCE_MASK {
            generator.next_id().unwrap();
        }

        let err = generator.next_id().unwrap_err();
        assert!(matches!(err, GeneratorError::Exhausted(_)));
        assert!(generator.next_id().is_err());

        clock.set(T0 + 1);
        let parts = IdParts::from_id(generator.next_id().unwrap());
        assert_eq!(parts.unix_millis, T0 + 1);
    }

    #[test]
    fn test_clock_regression_keeps_ids_increasing() {
        let clock = ManualClock::at(T0);
        let generator = SnowflakeGenerator::with_clock(1, clock.clone());

        let before = generator.next_id().unwrap();
        clock.set(T0 - 500);
        let after = generator.next_id().unwrap();

        assert!(after > before);
        assert_eq!(IdParts::from_id(after).unix_millis, T0);
    }

    #[test]
    fn test_timestamp_overflow_is_exhaustion() {
        let clock = ManualClock::at(EPOCH_MILLIS + MAX_TIMESTAMP + 1);
        let generator = SnowflakeGenerator::with_clock(1, clock);

        assert!(matches!(
            generator.next_id(),
            Err(GeneratorError::Exhausted(_))
        ));
    }

    #[test]
    fn test_fallback_id_is_recent_and_encodable() {
        let id = fallback_id();
        assert!(id > 1_600_000_000_000_000_000);
        assert_eq!(decode_base62(&encode_base62(id)), Some(id));
    }

    #[test]
    fn test_generate_short_id_uses_generator() {
        let mut generator = MockIdGenerator::new();
        generator.expect_next_id().times(1).returning(|| Ok(62));
        generator.expect_encode().returning(encode_base62);

        assert_eq!(generate_short_id(&generator), "10");
    }

    #[test]
    fn test_generate_short_id_falls_back_to_timestamp() {
        let mut generator = MockIdGenerator::new();
        generator
            .expect_next_id()
            .times(1)
            .returning(|| Err(GeneratorError::Exhausted("clock stalled".to_string())));
        generator.expect_encode().returning(encode_base62);

        let before = fallback_id();
        let id = decode_base62(&generate_short_id(&generator)).unwrap();

        assert!(id >= before);
        assert!(id <= fallback_id());
    }

    #[test]
    fn test_frozen_clock_with_default_wait_gives_up_quickly() {
        let generator = SnowflakeGenerator::with_clock(1, ManualClock::at(T0));
        for _ in 0..=SEQUENCE_MASK {
            generator.next_id().unwrap();
        }

        let started = Instant::now();
        assert!(generator.next_id().is_err());
        assert!(started.elapsed() < Duration::from_millis(500));
    }

    #[test]
    fn test_concurrent_generation_is_unique() {
        let generator = Arc::new(SnowflakeGenerator::new(7));
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let generator = Arc::clone(&generator);
                std::thread::spawn(move || {
                    (0..2_000)
                        .map(|_| generator.next_id().unwrap())
                        .collect::<Vec<_>>()
                })
            })
            .collect();

        let mut all = HashSet::new();
        for handle in handles {
            for id in handle.join().unwrap() {
                assert!(all.insert(id));
            }
        }
        assert_eq!(all.len(), 8_000);
    }
}
