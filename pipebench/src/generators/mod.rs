mod counter;
mod keygen;
mod random;

pub use counter::Counter;
pub use keygen::{KeyGenerator, KeyGeneratorConfig, KeyStrategy, KEY_SIZE, PREFIX_SIZE};
pub use random::Random;

pub trait NumberGenerator: 'static + std::marker::Send {
    fn next(&mut self) -> u64;
}
