use crate::config::BenchmarkConfig;
use crate::Error;

mod nop;
mod std_btree;
pub use nop::Nop;
pub use std_btree::StdBTreeMap;

pub type Record = (String, Vec<u8>);

/// The operations a store client exposes to the benchmark.
///
/// A handle may be shared by several worker threads, so every operation takes
/// `&self`; a store whose client cannot be used concurrently must not be run
/// with a sharing factor below the thread count.
pub trait Store: Sized + Send + Sync + 'static {
    fn open(config: &BenchmarkConfig) -> Result<Self, Error>;
    fn close(self) -> Result<(), Error>;

    fn put(&self, key: &str, value: &[u8]) -> Result<(), Error>;
    /// `Ok(None)` when the key does not exist.
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, Error>;
    fn put_batch(&self, records: &[Record]) -> Result<(), Error>;
    /// Keys starting with `prefix`, in key order; at most `limit` of them.
    fn prefix_keys(&self, prefix: &str, limit: Option<usize>) -> Result<Vec<String>, Error>;
    /// The records for `keys` that exist, in request order.
    fn get_batch(&self, keys: &[String]) -> Result<Vec<Record>, Error>;
    /// Up to `max` records with `start <= key < end` (or `start < key` when
    /// `inclusive` is false), in key order.
    fn range_scan(
        &self,
        start: &str,
        inclusive: bool,
        end: &str,
        max: usize,
    ) -> Result<Vec<Record>, Error>;
    fn delete_batch(&self, keys: &[String]) -> Result<(), Error>;
}
