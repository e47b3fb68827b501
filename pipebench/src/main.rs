use std::io::Write;

use toml::Table;
use tracing_subscriber::EnvFilter;

use pipebench::db::{Nop, StdBTreeMap};
use pipebench::{Benchmark, BenchmarkConfig, Error, Report};

fn main() -> Result<(), anyhow::Error> {
    let args = parse_args(std::env::args().skip(1).collect())?;
    let config = BenchmarkConfig::parse(args)?;
    init_logging(config.debug);

    let bench = Benchmark::new(config);
    let report = match &*bench.config().db {
        "nop" => bench.run::<Nop>()?,
        "std_btreemap" => bench.run::<StdBTreeMap>()?,
        db => return Err(Error::UnknownStore(db.to_string()).into()),
    };
    print_report(&bench, &report)?;
    Ok(())
}

fn init_logging(debug: bool) {
    let default = if debug { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn print_report(bench: &Benchmark, report: &Report) -> std::io::Result<()> {
    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    if bench.config().verbose > 1 {
        for line in report.item_lines() {
            writeln!(out, "{}", line)?;
        }
    }
    writeln!(out, "{}", report.summary())?;
    out.flush()
}

/// `-P file` merges a toml property file, `-p key=value` overrides one
/// property.  Overrides win regardless of where they appear.
fn parse_args(mut args: Vec<String>) -> Result<Table, Error> {
    args.reverse();

    let mut overwrites: Vec<(String, String)> = Vec::new();
    let mut ret = Table::new();

    while let Some(k) = args.pop() {
        match &*k {
            "-P" => {
                let path = args
                    .pop()
                    .ok_or_else(|| Error::Config("-P needs a path".to_string()))?;
                let toml_text = std::fs::read_to_string(&path)
                    .map_err(|e| Error::Config(format!("{}: {}", path, e)))?;
                let tbl = toml_text.parse::<Table>()?;
                ret.extend(tbl);
            }
            "-p" => {
                let kv = args
                    .pop()
                    .ok_or_else(|| Error::Config("-p needs key=value".to_string()))?;
                let (k, v) = kv
                    .split_once('=')
                    .ok_or_else(|| Error::Config(format!("invalid property: {}", kv)))?;
                overwrites.push((k.to_string(), v.to_string()));
            }
            _ => {
                return Err(Error::Config(format!("invalid command option: {}", k)));
            }
        }
    }

    for (k, v) in overwrites {
        ret.insert(k, {
            if let Ok(t0) = v.parse::<i64>() {
                toml::Value::from(t0)
            } else if let Ok(t1) = v.parse::<f64>() {
                toml::Value::from(t1)
            } else if let Ok(t2) = v.to_ascii_lowercase().parse::<bool>() {
                toml::Value::from(t2)
            } else {
                toml::Value::from(v.clone())
            }
        });
    }

    Ok(ret)
}
