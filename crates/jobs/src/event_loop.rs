use std::sync::Arc;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::job::PeriodicJob;

/// Supervisor for periodic-job workers: one tokio task per registered job,
/// all signalled through a single watch channel on stop.
pub struct EventLoop {
    jobs: Vec<Arc<dyn PeriodicJob>>,
    stop_tx: Option<watch::Sender<bool>>,
    workers: Vec<JoinHandle<()>>,
}

impl EventLoop {
    pub fn new() -> Self {
        Self { jobs: Vec::new(), stop_tx: None, workers: Vec::new() }
    }

    pub fn register(&mut self, job: Arc<dyn PeriodicJob>) {
        self.jobs.push(job);
    }

    pub fn job_count(&self) -> usize {
        self.jobs.len()
    }

    /// Starts one worker per job. Idempotent while running.
    pub fn start(&mut self) {
        if self.stop_tx.is_some() {
            return;
        }
        let (stop_tx, stop_rx) = watch::channel(false);
        for job in &self.jobs {
            let job = job.clone();
            let stop_rx = stop_rx.clone();
            self.workers.push(tokio::spawn(run_worker(job, stop_rx)));
        }
        self.stop_tx = Some(stop_tx);
        info!(job_count = self.jobs.len(), "periodic jobs started");
    }

    /// Signals every worker and joins them. The signal unblocks in-wait
    /// workers immediately; a job mid-invocation finishes first.
    pub async fn stop(&mut self) {
        let Some(stop_tx) = self.stop_tx.take() else {
            return;
        };
        let _ = stop_tx.send(true);
        for worker in self.workers.drain(..) {
            if let Err(error) = worker.await {
                warn!(error = %error, "job worker did not shut down cleanly");
            }
        }
        info!("periodic jobs stopped");
    }
}

impl Default for EventLoop {
    fn default() -> Self {
        Self::new()
    }
}

async fn run_worker(job: Arc<dyn PeriodicJob>, mut stop_rx: watch::Receiver<bool>) {
    let mut first = true;
    loop {
        let delay = if first { job.initial_delay() } else { job.interval() };
        tokio::select! {
            _ = stop_rx.changed() => {
                debug!(job = job.name(), "job worker stopping");
                return;
            }
            _ = tokio::time::sleep(delay) => {}
        }
        if *stop_rx.borrow() {
            return;
        }

        if let Err(error) = job.job().await {
            warn!(job = job.name(), error = %error, "periodic job failed; keeping schedule");
        }
        first = false;
    }
}
