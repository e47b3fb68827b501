use crate::config::BenchmarkConfig;
use crate::db::{Record, Store};
use crate::Error;

/// A store that accepts everything and holds nothing.  Measures the harness.
pub struct Nop;

impl Store for Nop {
    fn open(_: &BenchmarkConfig) -> Result<Self, Error> {
        Ok(Nop)
    }

    fn close(self) -> Result<(), Error> {
        Ok(())
    }

    fn put(&self, _: &str, _: &[u8]) -> Result<(), Error> {
        Ok(())
    }

    fn get(&self, _: &str) -> Result<Option<Vec<u8>>, Error> {
        Ok(None)
    }

    fn put_batch(&self, _: &[Record]) -> Result<(), Error> {
        Ok(())
    }

    fn prefix_keys(&self, _: &str, _: Option<usize>) -> Result<Vec<String>, Error> {
        Ok(Vec::new())
    }

    fn get_batch(&self, _: &[String]) -> Result<Vec<Record>, Error> {
        Ok(Vec::new())
    }

    fn range_scan(&self, _: &str, _: bool, _: &str, _: usize) -> Result<Vec<Record>, Error> {
        Ok(Vec::new())
    }

    fn delete_batch(&self, _: &[String]) -> Result<(), Error> {
        Ok(())
    }
}
