use std::collections::HashSet;
use std::fmt;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::block::BlockKey;

/// Source of block keys. One generator is shared by every revision derived
/// from the same document so keys never collide across undo history.
pub trait KeyGenerator: Send + Sync + fmt::Debug {
    fn next_key(&self) -> BlockKey;
}

const KEY_SPACE: u128 = 1 << 24;

/// Short random keys (24 random bits in radix 32), never repeated by the
/// same generator and never purely numeric.
#[derive(Debug, Default)]
pub struct RandomKeys {
    seen: Mutex<HashSet<String>>,
}

impl RandomKeys {
    pub fn new() -> Self {
        Self::default()
    }

    /// A generator that will not hand out any of `existing`.
    pub fn excluding<'a>(existing: impl IntoIterator<Item = &'a BlockKey>) -> Self {
        let seen = existing
            .into_iter()
            .map(|key| key.as_str().to_string())
            .collect();
        Self {
            seen: Mutex::new(seen),
        }
    }
}

impl KeyGenerator for RandomKeys {
    fn next_key(&self) -> BlockKey {
        let mut seen = self.seen.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        loop {
            let raw = (uuid::Uuid::new_v4().as_u128() % KEY_SPACE) as u32;
            let key = to_radix_32(raw);
            if key.parse::<f64>().is_ok() {
                continue;
            }
            if seen.insert(key.clone()) {
                return BlockKey::new(key);
            }
        }
    }
}

fn to_radix_32(mut value: u32) -> String {
    const DIGITS: &[u8; 32] = b"0123456789abcdefghijklmnopqrstuv";
    if value == 0 {
        return "0".to_string();
    }
    let mut out = Vec::new();
    while value > 0 {
        out.push(DIGITS[(value % 32) as usize]);
        value /= 32;
    }
    out.reverse();
    String::from_utf8(out).unwrap_or_default()
}

/// Deterministic keys (`k1`, `k2`, ...) for tests and reproducible output.
#[derive(Debug)]
pub struct SequentialKeys {
    prefix: String,
    next: AtomicU64,
}

impl SequentialKeys {
    pub fn new() -> Self {
        Self::with_prefix("k")
    }

    pub fn with_prefix(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            next: AtomicU64::new(1),
        }
    }
}

impl Default for SequentialKeys {
    fn default() -> Self {
        Self::new()
    }
}

impl KeyGenerator for SequentialKeys {
    fn next_key(&self) -> BlockKey {
        let n = self.next.fetch_add(1, Ordering::Relaxed);
        BlockKey::new(format!("{}{n}", self.prefix))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn random_keys_are_unique_and_not_numeric() {
        let keys = RandomKeys::new();
        let mut seen = HashSet::new();
        for _ in 0..500 {
            let key = keys.next_key();
            assert!(key.as_str().parse::<f64>().is_err());
            assert!(seen.insert(key));
        }
    }

    #[test]
    fn radix_32_matches_expected_digits() {
        assert_eq!(to_radix_32(0), "0");
        assert_eq!(to_radix_32(31), "v");
        assert_eq!(to_radix_32(32), "10");
    }

    #[test]
    fn sequential_keys_count_up() {
        let keys = SequentialKeys::with_prefix("b");
        assert_eq!(keys.next_key().as_str(), "b1");
        assert_eq!(keys.next_key().as_str(), "b2");
    }
}
