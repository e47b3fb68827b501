use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::config::BenchmarkConfig;
use crate::db::Store;
use crate::queue::WorkQueue;
use crate::stats::{item_line, StatsAggregator};
use crate::work::WorkItem;
use crate::worker::{HandlePool, WorkerPool};
use crate::Error;

/// The outcome of one benchmark run.
pub struct Report {
    pub stats: StatsAggregator,
    /// Finished items in the order they left the pipeline.
    pub completed: Vec<WorkItem>,
    /// When seeding began.
    pub start: Instant,
    /// From the start of seeding until the last item was collected.
    pub elapsed: Duration,
    pub handles_opened: usize,
    pub handles_closed: usize,
}

impl Report {
    /// The `# avg min max ...` line.
    pub fn summary(&self) -> String {
        self.stats.report()
    }

    /// One `<start offset> <elapsed> ...` line per finished item.
    pub fn item_lines(&self) -> impl Iterator<Item = String> + '_ {
        self.completed.iter().map(|w| item_line(self.start, w))
    }
}

/// Two-stage producer/consumer pipeline over a store.
///
/// Work items flow `to_producer -> producers -> to_consumer -> consumers ->
/// trash`.  Each queue is closed only after everything upstream of it has
/// been joined, so no stage ever pushes into a closed queue.  Without a
/// consumer operation the producers feed `to_consumer` and it is drained in
/// place of the trash queue.
pub struct Benchmark {
    config: Arc<BenchmarkConfig>,
}

impl Benchmark {
    pub fn new(config: BenchmarkConfig) -> Self {
        Benchmark {
            config: Arc::new(config),
        }
    }

    pub fn config(&self) -> &BenchmarkConfig {
        &self.config
    }

    /// Run against store `S`, opening handles with `S::open`.
    pub fn run<S: Store>(&self) -> Result<Report, Error> {
        let config = Arc::clone(&self.config);
        self.run_with(move || S::open(&config))
    }

    /// Run with a caller-supplied way of opening store handles.
    pub fn run_with<S, F>(&self, mut open: F) -> Result<Report, Error>
    where
        S: Store,
        F: FnMut() -> Result<S, Error>,
    {
        let config = &self.config;
        let num_works = config.num_works;
        let consumer_threads = if config.consumer.is_some() {
            config.consumer_threads
        } else {
            0
        };
        tracing::info!(
            db = %config.db,
            producer = %config.producer,
            consumer = %config.consumer.as_ref().map(|c| c.to_string()).unwrap_or_else(|| "none".to_string()),
            producer_threads = config.producer_threads,
            consumer_threads,
            num_works,
            share = config.share,
            "starting benchmark"
        );

        let to_producer = Arc::new(WorkQueue::new());
        let to_consumer = Arc::new(WorkQueue::new());
        let trash = Arc::new(WorkQueue::new());

        let mut handles = HandlePool::new(config.share, config.producer_threads + consumer_threads);
        let spawned = WorkerPool::spawn(
            "producer",
            config,
            0,
            config.producer_threads,
            &config.producer,
            &to_producer,
            &to_consumer,
            &mut handles,
            &mut open,
        );
        let mut producers = match spawned {
            Ok(pool) => pool,
            Err(e) => {
                close_after_failure(handles);
                return Err(e);
            }
        };
        let mut consumers = match &config.consumer {
            Some(consumer) => {
                let spawned = WorkerPool::spawn(
                    "consumer",
                    config,
                    config.producer_threads,
                    consumer_threads,
                    consumer,
                    &to_consumer,
                    &trash,
                    &mut handles,
                    &mut open,
                );
                match spawned {
                    Ok(pool) => Some(pool),
                    Err(e) => {
                        to_producer.close();
                        if let Err(join_err) = producers.join() {
                            tracing::error!(error = %join_err, "producer failed while aborting");
                        }
                        close_after_failure(handles);
                        return Err(e);
                    }
                }
            }
            None => None,
        };

        let start = Instant::now();
        let mut failure = None;
        for i in 0..num_works {
            let seed = config.seed_offset.wrapping_add(i as u32);
            if let Err(e) = to_producer.push(WorkItem::new(seed)) {
                failure = Some(e);
                break;
            }
        }
        to_producer.close();

        if let Err(e) = producers.join() {
            failure.get_or_insert(e);
        }
        to_consumer.close();
        if let Some(consumers) = consumers.as_mut() {
            if let Err(e) = consumers.join() {
                failure.get_or_insert(e);
            }
        }
        trash.close();

        let terminal = if consumers.is_some() {
            &trash
        } else {
            &to_consumer
        };
        let mut stats = StatsAggregator::new(config.stages());
        let mut completed = Vec::with_capacity(num_works);
        while completed.len() < num_works {
            match terminal.pop() {
                Some(work) => {
                    stats.add(&work);
                    completed.push(work);
                }
                None => break,
            }
        }
        let elapsed = start.elapsed();

        let handles_opened = handles.opened();
        if let Some(e) = failure {
            close_after_failure(handles);
            return Err(e);
        }
        let handles_closed = handles.close_all()?;
        if completed.len() != num_works {
            return Err(Error::LostWork {
                expected: num_works,
                found: completed.len(),
            });
        }
        for queue in [to_producer, to_consumer, trash] {
            destroy_queue(queue)?;
        }
        tracing::info!(
            elapsed_ms = elapsed.as_millis() as u64,
            handles = handles_opened,
            "benchmark finished"
        );
        Ok(Report {
            stats,
            completed,
            start,
            elapsed,
            handles_opened,
            handles_closed,
        })
    }
}

fn close_after_failure<S: Store>(handles: HandlePool<S>) {
    if let Err(e) = handles.close_all() {
        tracing::error!(error = %e, "closing store handles after failure");
    }
}

fn destroy_queue(queue: Arc<WorkQueue<WorkItem>>) -> Result<(), Error> {
    match Arc::try_unwrap(queue) {
        Ok(queue) => queue.destroy(),
        Err(queue) if !queue.is_empty() => Err(Error::QueueNotEmpty(queue.len())),
        Err(_) => Ok(()),
    }
}
