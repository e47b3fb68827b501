use serde::Deserialize;

use super::{Counter, NumberGenerator, Random};

/// Length of a generated key: `0x<16 hex>-0x<16 hex>`.
pub const KEY_SIZE: usize = 37;
/// Length of a key prefix: `0x<16 hex>-`.
pub const PREFIX_SIZE: usize = 19;

#[derive(Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum KeyStrategy {
    #[default]
    #[serde(rename = "sequence")]
    Sequential,
    #[serde(rename = "random")]
    Random,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct KeyGeneratorConfig {
    pub strategy: KeyStrategy,
}

impl KeyGeneratorConfig {
    pub fn new(strategy: KeyStrategy) -> Self {
        KeyGeneratorConfig { strategy }
    }
}

/// Produces the key sequence for one work item.
///
/// Every key starts with a prefix derived from the seed alone, so the keys of
/// one seed form a contiguous range that never overlaps another seed's range.
/// Two generators built from the same seed and config produce the same keys,
/// which lets a later stage regenerate exactly what an earlier stage wrote.
pub struct KeyGenerator {
    prefix: u32,
    numbers: Box<dyn NumberGenerator>,
}

impl KeyGenerator {
    pub fn new(config: KeyGeneratorConfig, seed: u32) -> Self {
        let numbers: Box<dyn NumberGenerator> = match config.strategy {
            KeyStrategy::Sequential => Box::new(Counter::new(0)),
            KeyStrategy::Random => Box::new(Random::new(seed)),
        };
        KeyGenerator {
            prefix: seed,
            numbers,
        }
    }

    pub fn next_key(&mut self) -> String {
        format!("0x{:016x}-0x{:016x}", self.prefix, self.numbers.next())
    }

    pub fn prefix(&self) -> String {
        format!("0x{:016x}-", self.prefix)
    }

    /// First key past this seed's key space: the prefix with its trailing `-`
    /// bumped to the next byte.
    pub fn scan_end(&self) -> String {
        format!("0x{:016x}.", self.prefix)
    }
}
