use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Instant;

use crate::config::BenchmarkConfig;
use crate::db::Store;
use crate::operation::Operation;
use crate::queue::WorkQueue;
use crate::work::WorkItem;
use crate::Error;

/// Decides which worker threads open a store handle and which borrow one.
///
/// With a sharing factor of `k`, threads `0..k` each open their own handle and
/// thread `i >= k` uses the handle of thread `i % k`.  A factor of 0 means
/// every thread opens its own.  Only the pool closes handles, and only once
/// nobody else holds them.
pub struct HandlePool<S> {
    share: usize,
    owned: Vec<Arc<S>>,
}

impl<S: Store> HandlePool<S> {
    pub fn new(share: usize, thread_count: usize) -> Self {
        let share = if share == 0 { thread_count.max(1) } else { share };
        HandlePool {
            share,
            owned: Vec::new(),
        }
    }

    pub fn share(&self) -> usize {
        self.share
    }

    pub fn is_owner(&self, thread_index: usize) -> bool {
        thread_index % self.share == thread_index
    }

    /// The handle for `thread_index` and whether that thread owns it.  Threads
    /// must be asked for in index order, since a borrower needs its owner's
    /// handle to exist already.
    pub fn acquire_or_share(
        &mut self,
        thread_index: usize,
        open: &mut dyn FnMut() -> Result<S, Error>,
    ) -> Result<(Arc<S>, bool), Error> {
        if self.is_owner(thread_index) {
            if thread_index != self.owned.len() {
                return Err(Error::Config(format!(
                    "handle for thread {} requested out of order",
                    thread_index
                )));
            }
            let handle = Arc::new(open()?);
            self.owned.push(Arc::clone(&handle));
            tracing::debug!(thread_index, "opened store handle");
            Ok((handle, true))
        } else {
            let owner = thread_index % self.share;
            match self.owned.get(owner) {
                Some(handle) => Ok((Arc::clone(handle), false)),
                None => Err(Error::Config(format!(
                    "handle for thread {} requested before its owner {}",
                    thread_index, owner
                ))),
            }
        }
    }

    /// Number of handles opened so far.
    pub fn opened(&self) -> usize {
        self.owned.len()
    }

    /// Close every owned handle exactly once.  Fails if a handle is still
    /// referenced elsewhere, e.g. by a worker that was never joined.
    pub fn close_all(self) -> Result<usize, Error> {
        let mut closed = 0;
        for (idx, handle) in self.owned.into_iter().enumerate() {
            match Arc::try_unwrap(handle) {
                Ok(db) => {
                    db.close()?;
                    closed += 1;
                }
                Err(_) => return Err(Error::HandleInUse(idx)),
            }
        }
        Ok(closed)
    }
}

/// What one worker thread is bound to.
pub struct WorkerInfo<S> {
    pub thread_index: usize,
    pub db: Arc<S>,
    pub operation: Operation,
    pub in_queue: Arc<WorkQueue<WorkItem>>,
    pub out_queue: Arc<WorkQueue<WorkItem>>,
    pub config: Arc<BenchmarkConfig>,
}

/// Run one stage of `operation` over `work` and record how long it took.
pub fn handle_work<S: Store>(
    db: &S,
    operation: &Operation,
    config: &BenchmarkConfig,
    work: &mut WorkItem,
) -> Result<(), Error> {
    work.check_stage()?;
    let start = Instant::now();
    operation.run(db, config, work.seed())?;
    let elapsed = start.elapsed();
    work.record_stage(start, elapsed)
}

fn benchmark_thread<S: Store>(info: WorkerInfo<S>) -> Result<(), Error> {
    while let Some(mut work) = info.in_queue.pop() {
        handle_work(&*info.db, &info.operation, &info.config, &mut work)?;
        info.out_queue.push(work)?;
    }
    Ok(())
}

/// A fixed set of threads moving work items from one queue to the next.
pub struct WorkerPool {
    name: &'static str,
    threads: Vec<JoinHandle<Result<(), Error>>>,
}

impl WorkerPool {
    /// Bind `thread_count` threads to handles from `handles`, then start them
    /// all.  The threads count as `first_index..first_index + thread_count`
    /// for the sharing policy and begin popping `in_queue` immediately.
    #[allow(clippy::too_many_arguments)]
    pub fn spawn<S: Store>(
        name: &'static str,
        config: &Arc<BenchmarkConfig>,
        first_index: usize,
        thread_count: usize,
        operation: &Operation,
        in_queue: &Arc<WorkQueue<WorkItem>>,
        out_queue: &Arc<WorkQueue<WorkItem>>,
        handles: &mut HandlePool<S>,
        open: &mut dyn FnMut() -> Result<S, Error>,
    ) -> Result<Self, Error> {
        let mut infos = Vec::with_capacity(thread_count);
        for thread_index in first_index..first_index + thread_count {
            let (db, _) = handles.acquire_or_share(thread_index, open)?;
            infos.push(WorkerInfo {
                thread_index,
                db,
                operation: operation.clone(),
                in_queue: Arc::clone(in_queue),
                out_queue: Arc::clone(out_queue),
                config: Arc::clone(config),
            });
        }
        tracing::debug!(
            pool = name,
            threads = thread_count,
            %operation,
            "starting workers"
        );
        let mut pool = WorkerPool {
            name,
            threads: Vec::with_capacity(thread_count),
        };
        for info in infos {
            let spawned = thread::Builder::new()
                .name(format!("{}-{}", name, info.thread_index))
                .spawn(move || benchmark_thread(info));
            match spawned {
                Ok(join) => pool.threads.push(join),
                Err(e) => {
                    // The threads already running would wait on in_queue forever.
                    in_queue.close();
                    if let Err(join_err) = pool.join() {
                        tracing::error!(pool = name, error = %join_err, "worker failed while aborting spawn");
                    }
                    return Err(e.into());
                }
            }
        }
        Ok(pool)
    }

    pub fn len(&self) -> usize {
        self.threads.len()
    }

    pub fn is_empty(&self) -> bool {
        self.threads.is_empty()
    }

    /// Wait for every thread to exit.  All threads are joined even when one
    /// of them failed; the first failure is returned.
    pub fn join(&mut self) -> Result<(), Error> {
        let mut result = Ok(());
        for (idx, join) in self.threads.drain(..).enumerate() {
            let outcome = match join.join() {
                Ok(outcome) => outcome,
                Err(_) => Err(Error::WorkerPanicked(idx)),
            };
            if let Err(e) = outcome {
                tracing::error!(pool = self.name, thread = idx, error = %e, "worker failed");
                if result.is_ok() {
                    result = Err(e);
                }
            }
        }
        result
    }
}
