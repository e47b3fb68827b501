use serde::Deserialize;
use toml::Table;

use crate::generators::{KeyGeneratorConfig, KeyStrategy};
use crate::operation::Operation;
use crate::Error;

/// Everything a benchmark run needs to know, fixed before any worker starts.
///
/// Shared read-only (behind an `Arc`) by the orchestrator and every worker.
#[derive(Clone, Debug)]
pub struct BenchmarkConfig {
    /// Which store to benchmark.
    pub db: String,
    pub producer: Operation,
    /// `None` runs a single-stage pipeline.
    pub consumer: Option<Operation>,

    /// Where the store keeps its data.
    pub path: String,

    /// Records touched per work item.
    pub num: usize,
    pub vsiz: usize,
    pub batch: usize,

    pub producer_threads: usize,
    pub consumer_threads: usize,
    pub num_works: usize,
    /// Number of worker threads, across both pools, that open their own
    /// handle.  0 means every thread opens its own.
    pub share: usize,
    pub seed_offset: u32,
    pub key_generator: KeyGeneratorConfig,

    pub debug: bool,
    pub verbose: u32,
}

impl BenchmarkConfig {
    /// Build a config from merged properties, applying the same fixups for
    /// out-of-range counts the command line has always had.
    pub fn parse(props: Table) -> Result<Self, Error> {
        let props: Properties = props.try_into()?;
        let thread_count = props.thread_count.max(1);
        let producer_threads = props.producer_threads.unwrap_or(thread_count).max(1) as usize;
        let consumer_threads = props.consumer_threads.unwrap_or(thread_count).max(1) as usize;
        let num_works = if props.work_count < 1 {
            producer_threads
        } else {
            props.work_count as usize
        };
        let consumer = match &*props.consumer {
            "none" => None,
            name => Some(name.parse::<Operation>()?),
        };
        let config = BenchmarkConfig {
            db: props.db,
            producer: props.producer.parse::<Operation>()?,
            consumer,
            path: props.path,
            num: non_negative("num", props.num)?,
            vsiz: non_negative("vsiz", props.vsiz)?,
            batch: props.batch.max(1) as usize,
            producer_threads,
            consumer_threads,
            num_works,
            share: props.share.max(0) as usize,
            seed_offset: props.seed,
            key_generator: KeyGeneratorConfig::new(props.key_generator),
            debug: props.debug,
            verbose: props.verbose,
        };
        Ok(config)
    }

    pub fn stages(&self) -> usize {
        if self.consumer.is_some() {
            2
        } else {
            1
        }
    }
}

impl Default for BenchmarkConfig {
    fn default() -> Self {
        BenchmarkConfig {
            db: default_db(),
            producer: Operation::Nop,
            consumer: Some(Operation::Nop),
            path: default_path(),
            num: default_num() as usize,
            vsiz: default_vsiz() as usize,
            batch: default_batch() as usize,
            producer_threads: 1,
            consumer_threads: 1,
            num_works: 1,
            share: default_share() as usize,
            seed_offset: 0,
            key_generator: KeyGeneratorConfig::default(),
            debug: false,
            verbose: 0,
        }
    }
}

fn non_negative(name: &str, value: i64) -> Result<usize, Error> {
    usize::try_from(value).map_err(|_| Error::Config(format!("{} must not be negative", name)))
}

#[derive(Deserialize, Debug)]
#[serde(deny_unknown_fields)]
struct Properties {
    #[serde(default = "default_db")]
    db: String,

    #[serde(default = "default_operation")]
    producer: String,

    #[serde(default = "default_operation")]
    consumer: String,

    #[serde(default = "default_path")]
    path: String,

    #[serde(default = "default_num")]
    num: i64,

    #[serde(default = "default_vsiz")]
    vsiz: i64,

    #[serde(default = "default_batch")]
    batch: i64,

    #[serde(rename = "threadcount", default = "default_thread_count")]
    thread_count: i64,

    #[serde(rename = "producerthreads")]
    producer_threads: Option<i64>,

    #[serde(rename = "consumerthreads")]
    consumer_threads: Option<i64>,

    #[serde(rename = "workcount", default)]
    work_count: i64,

    #[serde(default = "default_share")]
    share: i64,

    #[serde(default)]
    seed: u32,

    #[serde(rename = "keygenerator", default)]
    key_generator: KeyStrategy,

    #[serde(default)]
    debug: bool,

    #[serde(default)]
    verbose: u32,
}

fn default_db() -> String {
    "std_btreemap".to_string()
}
fn default_operation() -> String {
    "nop".to_string()
}
fn default_path() -> String {
    "data.tcb".to_string()
}
fn default_num() -> i64 {
    5000000
}
fn default_vsiz() -> i64 {
    100
}
fn default_batch() -> i64 {
    1000
}
fn default_thread_count() -> i64 {
    1
}
fn default_share() -> i64 {
    1
}
