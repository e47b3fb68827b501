use std::fmt::Write;
use std::time::{Duration, Instant};

use crate::work::{WorkItem, MAX_STAGES};

/// Sum, min and max of one stage's elapsed times.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StageStats {
    pub count: u64,
    pub sum: Duration,
    pub min: Duration,
    pub max: Duration,
}

impl StageStats {
    pub fn add(&mut self, elapsed: Duration) {
        if self.count == 0 || elapsed < self.min {
            self.min = elapsed;
        }
        if elapsed > self.max {
            self.max = elapsed;
        }
        self.sum += elapsed;
        self.count += 1;
    }

    pub fn avg(&self) -> Duration {
        if self.count == 0 {
            return Duration::ZERO;
        }
        Duration::from_micros((self.sum.as_micros() / self.count as u128) as u64)
    }
}

impl Default for StageStats {
    fn default() -> Self {
        StageStats {
            count: 0,
            sum: Duration::ZERO,
            min: Duration::ZERO,
            max: Duration::ZERO,
        }
    }
}

/// Collects per-stage timings from finished work items.
#[derive(Clone, Debug)]
pub struct StatsAggregator {
    stages: Vec<StageStats>,
}

impl StatsAggregator {
    pub fn new(stages: usize) -> Self {
        StatsAggregator {
            stages: vec![StageStats::default(); stages.min(MAX_STAGES)],
        }
    }

    pub fn add(&mut self, work: &WorkItem) {
        for (idx, stage) in self.stages.iter_mut().enumerate() {
            if let Some(elapsed) = work.stage_elapsed(idx) {
                stage.add(elapsed);
            }
        }
    }

    pub fn stage(&self, idx: usize) -> Option<&StageStats> {
        self.stages.get(idx)
    }

    pub fn stages(&self) -> usize {
        self.stages.len()
    }

    /// `# <avg> <min> <max>` for each stage, in seconds.
    pub fn report(&self) -> String {
        let mut line = String::from("#");
        for stage in &self.stages {
            for d in [stage.avg(), stage.min, stage.max] {
                let _ = write!(line, " {}", format_secs(d));
            }
        }
        line
    }
}

/// One verbose line for a finished item: the start offset from `run_start`
/// and the elapsed time of each stage it went through.
pub fn item_line(run_start: Instant, work: &WorkItem) -> String {
    let mut fields = Vec::with_capacity(2 * work.progress());
    for stage in 0..work.progress() {
        let offset = work
            .stage_start(stage)
            .map(|t| t.saturating_duration_since(run_start))
            .unwrap_or_default();
        let elapsed = work.stage_elapsed(stage).unwrap_or_default();
        fields.push(format_secs(offset));
        fields.push(format_secs(elapsed));
    }
    fields.join(" ")
}

/// Seconds with three (truncated) millisecond digits.
pub fn format_secs(d: Duration) -> String {
    let ms = d.as_millis();
    format!("{}.{:03}", ms / 1000, ms % 1000)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(seed: u32, stages: &[u64]) -> (Instant, WorkItem) {
        let start = Instant::now();
        let mut w = WorkItem::new(seed);
        let mut at = start;
        for us in stages {
            let d = Duration::from_micros(*us);
            w.record_stage(at, d).unwrap();
            at += d;
        }
        (start, w)
    }

    #[test]
    fn format() {
        assert_eq!("0.000", format_secs(Duration::ZERO));
        assert_eq!("0.000", format_secs(Duration::from_micros(999)));
        assert_eq!("0.001", format_secs(Duration::from_micros(1999)));
        assert_eq!("1.234", format_secs(Duration::from_micros(1_234_567)));
        assert_eq!("62.005", format_secs(Duration::from_millis(62_005)));
    }

    #[test]
    fn min_max_avg() {
        let mut s = StageStats::default();
        for ms in [30, 10, 20] {
            s.add(Duration::from_millis(ms));
        }
        assert_eq!(3, s.count);
        assert_eq!(Duration::from_millis(10), s.min);
        assert_eq!(Duration::from_millis(30), s.max);
        assert_eq!(Duration::from_millis(20), s.avg());
        assert_eq!(Duration::ZERO, StageStats::default().avg());
    }

    #[test]
    fn report_two_stages() {
        let mut agg = StatsAggregator::new(2);
        for (a, b) in [(1_000_000, 2_000), (3_000_000, 4_000)] {
            agg.add(&item(0, &[a, b]).1);
        }
        assert_eq!("# 2.000 1.000 3.000 0.003 0.002 0.004", agg.report());
    }

    #[test]
    fn report_one_stage() {
        let mut agg = StatsAggregator::new(1);
        agg.add(&item(0, &[5_000]).1);
        let report = agg.report();
        assert_eq!("# 0.005 0.005 0.005", report);
        assert_eq!(4, report.split_whitespace().count());
    }

    #[test]
    fn verbose_line() {
        let (start, w) = item(0, &[1_500_000, 2_000]);
        assert_eq!("0.000 1.500 1.500 0.002", item_line(start, &w));
    }
}
