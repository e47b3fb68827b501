use std::collections::{BTreeMap, HashMap};
use std::ops::Bound;
use std::sync::Arc;

use once_cell::sync::Lazy;
use parking_lot::{Mutex, RwLock};

use crate::config::BenchmarkConfig;
use crate::db::{Record, Store};
use crate::Error;

type Table = Arc<RwLock<BTreeMap<String, Vec<u8>>>>;

// Handles opened on the same path see the same data, the way connections to
// one server would.
static INSTANCES: Lazy<Mutex<HashMap<String, Table>>> = Lazy::new(|| Mutex::new(HashMap::new()));

/// An in-process ordered store backed by a `BTreeMap` behind a `RwLock`.
pub struct StdBTreeMap {
    path: String,
    db: Table,
}

impl StdBTreeMap {
    /// Number of records stored under `path`, or `None` if it was never opened.
    pub fn records(path: &str) -> Option<usize> {
        INSTANCES.lock().get(path).map(|db| db.read().len())
    }

    /// Forget everything stored under `path`.
    pub fn remove(path: &str) {
        INSTANCES.lock().remove(path);
    }
}

impl Store for StdBTreeMap {
    fn open(config: &BenchmarkConfig) -> Result<Self, Error> {
        if config.path.is_empty() {
            return Err(Error::Open("empty path".to_string()));
        }
        let db = INSTANCES
            .lock()
            .entry(config.path.clone())
            .or_insert_with(|| Arc::new(RwLock::new(BTreeMap::new())))
            .clone();
        tracing::debug!(path = %config.path, "opened std_btreemap");
        Ok(StdBTreeMap {
            path: config.path.clone(),
            db,
        })
    }

    fn close(self) -> Result<(), Error> {
        let registered = INSTANCES
            .lock()
            .get(&self.path)
            .is_some_and(|db| Arc::ptr_eq(db, &self.db));
        if !registered {
            return Err(Error::Close(format!("{} was removed while open", self.path)));
        }
        tracing::debug!(path = %self.path, "closed std_btreemap");
        Ok(())
    }

    fn put(&self, key: &str, value: &[u8]) -> Result<(), Error> {
        self.db.write().insert(key.to_string(), value.to_vec());
        Ok(())
    }

    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, Error> {
        Ok(self.db.read().get(key).cloned())
    }

    fn put_batch(&self, records: &[Record]) -> Result<(), Error> {
        let mut x = self.db.write();
        for (k, v) in records {
            x.insert(k.clone(), v.clone());
        }
        Ok(())
    }

    fn prefix_keys(&self, prefix: &str, limit: Option<usize>) -> Result<Vec<String>, Error> {
        let x = self.db.read();
        let keys = x
            .range::<str, _>((Bound::Included(prefix), Bound::Unbounded))
            .map(|(k, _)| k)
            .take_while(|k| k.starts_with(prefix))
            .take(limit.unwrap_or(usize::MAX))
            .cloned()
            .collect();
        Ok(keys)
    }

    fn get_batch(&self, keys: &[String]) -> Result<Vec<Record>, Error> {
        let x = self.db.read();
        Ok(keys
            .iter()
            .filter_map(|k| x.get(k).map(|v| (k.clone(), v.clone())))
            .collect())
    }

    fn range_scan(
        &self,
        start: &str,
        inclusive: bool,
        end: &str,
        max: usize,
    ) -> Result<Vec<Record>, Error> {
        if start >= end {
            return Ok(Vec::new());
        }
        let lower = if inclusive {
            Bound::Included(start)
        } else {
            Bound::Excluded(start)
        };
        let x = self.db.read();
        Ok(x.range::<str, _>((lower, Bound::Excluded(end)))
            .take(max)
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect())
    }

    fn delete_batch(&self, keys: &[String]) -> Result<(), Error> {
        let mut x = self.db.write();
        for k in keys {
            x.remove(k);
        }
        Ok(())
    }
}
