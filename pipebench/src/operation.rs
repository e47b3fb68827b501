use std::fmt;
use std::str::FromStr;

use crate::config::BenchmarkConfig;
use crate::db::{Record, Store};
use crate::generators::{KeyGenerator, KeyStrategy};
use crate::Error;

/// A named unit of store work that one pipeline stage applies to a work item.
///
/// Every variant derives its keys from the work item's seed, so a consumer
/// stage touches exactly the records the producer stage wrote.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Operation {
    /// `num` single puts.
    Put,
    /// `num` single gets.
    Get,
    /// Puts in batches of `batch` records.
    PutList,
    /// Gets in batches of `batch` keys.
    GetList,
    /// Lists every key under the seed's prefix.
    FwmKeys,
    /// Pages through the seed's key range, `batch` records per page.
    Range,
    /// Deletes in batches of `batch` keys.
    OutList,
    Nop,
    /// Two operations run back to back within one stage.
    Then(Box<Operation>, Box<Operation>),
}

impl FromStr for Operation {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let op = match s {
            "put" => Operation::Put,
            "get" => Operation::Get,
            "putlist" | "putlist2" => Operation::PutList,
            "getlist" | "getlist2" => Operation::GetList,
            "fwmkeys" => Operation::FwmKeys,
            "range" | "range2" => Operation::Range,
            "outlist" | "outlist2" => Operation::OutList,
            "nop" => Operation::Nop,
            "fwmkeys-getlist" | "fwmkeys-getlist2" => {
                Operation::Then(Box::new(Operation::FwmKeys), Box::new(Operation::GetList))
            }
            "fwmkeys-outlist" | "fwmkeys-outlist2" => {
                Operation::Then(Box::new(Operation::FwmKeys), Box::new(Operation::OutList))
            }
            _ => return Err(Error::UnknownOperation(s.to_string())),
        };
        Ok(op)
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operation::Put => write!(f, "put"),
            Operation::Get => write!(f, "get"),
            Operation::PutList => write!(f, "putlist"),
            Operation::GetList => write!(f, "getlist"),
            Operation::FwmKeys => write!(f, "fwmkeys"),
            Operation::Range => write!(f, "range"),
            Operation::OutList => write!(f, "outlist"),
            Operation::Nop => write!(f, "nop"),
            Operation::Then(a, b) => write!(f, "{}-{}", a, b),
        }
    }
}

impl Operation {
    /// Apply this operation for the work item with the given seed.
    pub fn run<S: Store>(&self, db: &S, config: &BenchmarkConfig, seed: u32) -> Result<(), Error> {
        match self {
            Operation::Put => put_test(db, config, seed),
            Operation::Get => get_test(db, config, seed),
            Operation::PutList => putlist_test(db, config, seed),
            Operation::GetList => getlist_test(db, config, seed),
            Operation::FwmKeys => fwmkeys_test(db, config, seed),
            Operation::Range => range_test(db, config, seed),
            Operation::OutList => outlist_test(db, config, seed),
            Operation::Nop => Ok(()),
            Operation::Then(first, second) => {
                first.run(db, config, seed)?;
                second.run(db, config, seed)
            }
        }
    }
}

fn keygen(config: &BenchmarkConfig, seed: u32) -> KeyGenerator {
    KeyGenerator::new(config.key_generator, seed)
}

/// The distinct keys a seed produces, in key order.  This is what an ordered
/// listing of the seed's prefix should return.
fn expected_keys(config: &BenchmarkConfig, seed: u32) -> Vec<String> {
    let mut kg = keygen(config, seed);
    let mut keys: Vec<String> = (0..config.num).map(|_| kg.next_key()).collect();
    keys.sort();
    keys.dedup();
    keys
}

fn put_test<S: Store>(db: &S, config: &BenchmarkConfig, seed: u32) -> Result<(), Error> {
    let mut kg = keygen(config, seed);
    let value = vec![0u8; config.vsiz];
    for _ in 0..config.num {
        let key = kg.next_key();
        if let Err(e) = db.put(&key, &value) {
            tracing::warn!(%key, error = %e, "put failed");
        }
    }
    Ok(())
}

fn get_test<S: Store>(db: &S, config: &BenchmarkConfig, seed: u32) -> Result<(), Error> {
    let mut kg = keygen(config, seed);
    for _ in 0..config.num {
        let key = kg.next_key();
        match db.get(&key) {
            Ok(Some(value)) => {
                if config.debug && value.len() != config.vsiz {
                    return Err(Error::Verification(format!(
                        "unexpected value size: {}",
                        value.len()
                    )));
                }
            }
            Ok(None) => {
                tracing::warn!(%key, "get: not found");
            }
            Err(e) => {
                tracing::warn!(%key, error = %e, "get failed");
            }
        }
    }
    Ok(())
}

fn putlist_test<S: Store>(db: &S, config: &BenchmarkConfig, seed: u32) -> Result<(), Error> {
    let mut kg = keygen(config, seed);
    let value = vec![0u8; config.vsiz];
    let mut records: Vec<Record> = Vec::with_capacity(config.batch);
    for _ in 0..config.num {
        records.push((kg.next_key(), value.clone()));
        if records.len() >= config.batch {
            db.put_batch(&records)?;
            records.clear();
        }
    }
    if !records.is_empty() {
        db.put_batch(&records)?;
    }
    Ok(())
}

fn check_records(
    config: &BenchmarkConfig,
    records: &[Record],
    expected: &mut dyn Iterator<Item = String>,
    count: usize,
) -> Result<(), Error> {
    if !config.debug {
        return Ok(());
    }
    if records.len() != count {
        return Err(Error::Verification(format!(
            "unexpected list size {}",
            records.len()
        )));
    }
    for (key, value) in records {
        if expected.next().as_deref() != Some(key.as_str()) {
            return Err(Error::Verification(format!("unexpected key {}", key)));
        }
        if value.len() != config.vsiz {
            return Err(Error::Verification(format!(
                "unexpected value size {}",
                value.len()
            )));
        }
    }
    Ok(())
}

fn getlist_test<S: Store>(db: &S, config: &BenchmarkConfig, seed: u32) -> Result<(), Error> {
    let mut kg = keygen(config, seed);
    let mut check = keygen(config, seed);
    let mut expected = std::iter::from_fn(|| Some(check.next_key()));
    let mut keys: Vec<String> = Vec::with_capacity(config.batch);
    for _ in 0..config.num {
        keys.push(kg.next_key());
        if keys.len() >= config.batch {
            let records = db.get_batch(&keys)?;
            check_records(config, &records, &mut expected, keys.len())?;
            keys.clear();
        }
    }
    if !keys.is_empty() {
        let records = db.get_batch(&keys)?;
        check_records(config, &records, &mut expected, keys.len())?;
    }
    Ok(())
}

fn fwmkeys_test<S: Store>(db: &S, config: &BenchmarkConfig, seed: u32) -> Result<(), Error> {
    let kg = keygen(config, seed);
    let keys = db.prefix_keys(&kg.prefix(), None)?;
    if config.debug {
        let expected = expected_keys(config, seed);
        if keys.len() != expected.len() {
            return Err(Error::Verification(format!(
                "unexpected key num: {}",
                keys.len()
            )));
        }
        if keys != expected {
            return Err(Error::Verification("unexpected key".to_string()));
        }
    }
    Ok(())
}

fn range_test<S: Store>(db: &S, config: &BenchmarkConfig, seed: u32) -> Result<(), Error> {
    let kg = keygen(config, seed);
    let end = kg.scan_end();
    let expected = if config.debug {
        Some(expected_keys(config, seed))
    } else {
        None
    };
    let mut check = expected.iter().flatten().cloned();
    let mut start = kg.prefix();
    let mut inclusive = true;
    let mut total = 0usize;
    loop {
        let records = db.range_scan(&start, inclusive, &end, config.batch)?;
        let Some((last, _)) = records.last() else {
            break;
        };
        check_records(config, &records, &mut check, records.len())?;
        total += records.len();
        start = last.clone();
        inclusive = false;
    }
    let want = match &expected {
        Some(keys) => Some(keys.len()),
        None if config.key_generator.strategy == KeyStrategy::Sequential => Some(config.num),
        None => None,
    };
    if let Some(want) = want {
        if total != want {
            return Err(Error::Verification(format!(
                "unexpected record num {} (expected {})",
                total, want
            )));
        }
    }
    Ok(())
}

fn outlist_test<S: Store>(db: &S, config: &BenchmarkConfig, seed: u32) -> Result<(), Error> {
    let mut kg = keygen(config, seed);
    let mut keys: Vec<String> = Vec::with_capacity(config.batch);
    for _ in 0..config.num {
        keys.push(kg.next_key());
        if keys.len() >= config.batch {
            db.delete_batch(&keys)?;
            keys.clear();
        }
    }
    if !keys.is_empty() {
        db.delete_batch(&keys)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::StdBTreeMap;
    use crate::generators::KeyGeneratorConfig;

    fn config(path: &str, strategy: KeyStrategy) -> BenchmarkConfig {
        BenchmarkConfig {
            path: path.to_string(),
            num: 25,
            vsiz: 8,
            batch: 4,
            debug: true,
            key_generator: KeyGeneratorConfig::new(strategy),
            ..BenchmarkConfig::default()
        }
    }

    fn run(op: &str, db: &StdBTreeMap, config: &BenchmarkConfig, seed: u32) -> Result<(), Error> {
        op.parse::<Operation>()?.run(db, config, seed)
    }

    #[test]
    fn parse_names() {
        assert_eq!(Operation::PutList, "putlist2".parse::<Operation>().unwrap());
        assert_eq!(Operation::Range, "range2".parse::<Operation>().unwrap());
        assert_eq!("fwmkeys-outlist", "fwmkeys-outlist2".parse::<Operation>().unwrap().to_string());
        for name in ["put", "get", "putlist", "getlist", "fwmkeys", "range", "outlist", "nop"] {
            assert_eq!(name, name.parse::<Operation>().unwrap().to_string());
        }
        assert!(matches!(
            "putlist3".parse::<Operation>(),
            Err(Error::UnknownOperation(_))
        ));
    }

    #[test]
    fn write_then_read_back() {
        for (path, strategy) in [
            ("operation::seq", KeyStrategy::Sequential),
            ("operation::rand", KeyStrategy::Random),
        ] {
            let config = config(path, strategy);
            let db = StdBTreeMap::open(&config).unwrap();
            run("putlist", &db, &config, 1).unwrap();
            run("put", &db, &config, 2).unwrap();
            for seed in [1, 2] {
                run("get", &db, &config, seed).unwrap();
                run("getlist", &db, &config, seed).unwrap();
                run("fwmkeys", &db, &config, seed).unwrap();
                run("range", &db, &config, seed).unwrap();
            }
            run("fwmkeys-outlist", &db, &config, 1).unwrap();
            assert_eq!(
                expected_keys(&config, 2).len(),
                StdBTreeMap::records(path).unwrap()
            );
            StdBTreeMap::remove(path);
        }
    }

    #[test]
    fn missing_records_fail_verification() {
        let config = config("operation::missing", KeyStrategy::Sequential);
        let db = StdBTreeMap::open(&config).unwrap();
        run("get", &db, &config, 7).unwrap();
        assert!(matches!(run("getlist", &db, &config, 7), Err(Error::Verification(_))));
        assert!(matches!(run("fwmkeys", &db, &config, 7), Err(Error::Verification(_))));
        assert!(matches!(run("range", &db, &config, 7), Err(Error::Verification(_))));
        StdBTreeMap::remove("operation::missing");
    }

    #[test]
    fn short_range_fails_without_debug() {
        let mut config = config("operation::short", KeyStrategy::Sequential);
        config.debug = false;
        let db = StdBTreeMap::open(&config).unwrap();
        run("put", &db, &config, 3).unwrap();
        run("range", &db, &config, 3).unwrap();
        config.num += 1;
        assert!(matches!(run("range", &db, &config, 3), Err(Error::Verification(_))));
        StdBTreeMap::remove("operation::short");
    }

    struct Refusing;

    impl Store for Refusing {
        fn open(_: &BenchmarkConfig) -> Result<Self, Error> {
            Ok(Refusing)
        }
        fn close(self) -> Result<(), Error> {
            Ok(())
        }
        fn put(&self, _: &str, _: &[u8]) -> Result<(), Error> {
            Err(Error::Store("put refused".to_string()))
        }
        fn get(&self, _: &str) -> Result<Option<Vec<u8>>, Error> {
            Err(Error::Store("get refused".to_string()))
        }
        fn put_batch(&self, _: &[Record]) -> Result<(), Error> {
            Err(Error::Store("put_batch refused".to_string()))
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

    #[test]
    fn single_put_and_get_failures_are_not_fatal() {
        let config = config("operation::refusing", KeyStrategy::Sequential);
        Operation::Put.run(&Refusing, &config, 1).unwrap();
        Operation::Get.run(&Refusing, &config, 1).unwrap();
        assert!(matches!(
            Operation::PutList.run(&Refusing, &config, 1),
            Err(Error::Store(_))
        ));
    }

    #[test]
    fn wrong_value_size_fails_verification() {
        let mut config = config("operation::vsiz", KeyStrategy::Sequential);
        let db = StdBTreeMap::open(&config).unwrap();
        run("put", &db, &config, 4).unwrap();
        config.vsiz = 9;
        assert!(matches!(run("get", &db, &config, 4), Err(Error::Verification(_))));
        StdBTreeMap::remove("operation::vsiz");
    }
}
