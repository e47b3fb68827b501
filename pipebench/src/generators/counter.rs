use super::NumberGenerator;

/// Hands out `start, start + 1, ...`; never repeats within one instance.
pub struct Counter {
    counter: u64,
}

impl Counter {
    pub fn new(start: u64) -> Self {
        Counter { counter: start }
    }
}

impl NumberGenerator for Counter {
    fn next(&mut self) -> u64 {
        let ret = self.counter;
        self.counter += 1;
        ret
    }
}
