use std::time::{Duration, Instant};

use crate::Error;

/// The number of pipeline stages a work item can pass through.
pub const MAX_STAGES: usize = 2;

/// One unit of benchmark work.
///
/// The seed drives the key generator for every stage, so the producer and
/// the consumer operate on the same logical keys.  Each stage fills in one
/// timing slot.
#[derive(Debug)]
pub struct WorkItem {
    seed: u32,
    stage_start: [Option<Instant>; MAX_STAGES],
    stage_elapsed: [Duration; MAX_STAGES],
    progress: usize,
}

impl WorkItem {
    pub fn new(seed: u32) -> Self {
        WorkItem {
            seed,
            stage_start: [None; MAX_STAGES],
            stage_elapsed: [Duration::ZERO; MAX_STAGES],
            progress: 0,
        }
    }

    pub fn seed(&self) -> u32 {
        self.seed
    }

    /// How many stages have processed this item.
    pub fn progress(&self) -> usize {
        self.progress
    }

    pub fn stage_start(&self, stage: usize) -> Option<Instant> {
        self.stage_start.get(stage).copied().flatten()
    }

    pub fn stage_elapsed(&self, stage: usize) -> Option<Duration> {
        if stage < self.progress {
            Some(self.stage_elapsed[stage])
        } else {
            None
        }
    }

    /// Fails when every stage slot is already filled.
    pub fn check_stage(&self) -> Result<(), Error> {
        if self.progress >= MAX_STAGES {
            return Err(Error::StageOverflow {
                seed: self.seed,
                progress: self.progress,
            });
        }
        Ok(())
    }

    /// Record one stage's timing and advance to the next stage.
    pub fn record_stage(&mut self, start: Instant, elapsed: Duration) -> Result<(), Error> {
        self.check_stage()?;
        self.stage_start[self.progress] = Some(start);
        self.stage_elapsed[self.progress] = elapsed;
        self.progress += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn records_two_stages() {
        let mut w = WorkItem::new(3);
        let t0 = Instant::now();
        w.record_stage(t0, Duration::from_micros(10)).unwrap();
        w.record_stage(t0, Duration::from_micros(20)).unwrap();
        assert_eq!(2, w.progress());
        assert_eq!(Some(Duration::from_micros(10)), w.stage_elapsed(0));
        assert_eq!(Some(Duration::from_micros(20)), w.stage_elapsed(1));
        assert_eq!(Some(t0), w.stage_start(1));
    }

    #[test]
    fn unfilled_stage_has_no_timing() {
        let w = WorkItem::new(0);
        assert_eq!(None, w.stage_start(0));
        assert_eq!(None, w.stage_elapsed(0));
        assert_eq!(None, w.stage_elapsed(7));
    }

    #[test]
    fn third_stage_is_rejected() {
        let mut w = WorkItem::new(9);
        let t0 = Instant::now();
        w.record_stage(t0, Duration::ZERO).unwrap();
        w.record_stage(t0, Duration::ZERO).unwrap();
        assert!(matches!(
            w.record_stage(t0, Duration::ZERO),
            Err(Error::StageOverflow { seed: 9, progress: 2 })
        ));
        assert_eq!(2, w.progress());
    }
}
