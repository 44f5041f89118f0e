use crate::config::{ Config, Target };
use crate::outcome::Outcome;
use crate::report::{ Banner, Progress, RunStats };
use crate::tally::Tally;

use std::sync::{ Arc, atomic::{ AtomicU64, Ordering } };
use anyhow::Context;
use chrono::Local;
use isahc::{
    HttpClient,
    HttpClientBuilder,
    config::{ Configurable, RedirectPolicy },
    http::Uri,
    AsyncReadResponseExt,
};
use tokio::{ sync::Notify, runtime::{ Builder, Runtime }, task::JoinSet, time::Instant };
use tracing::{ debug, info, trace, warn };

const MAX_REDIRECTS: u32 = 10;

/// Receives every progress line; stdout unless replaced.
pub type ProgressSink = Arc<dyn Fn(&Progress) + Send + Sync>;

/// Owns the HTTP client, the validated target and the shared tally for one run.
pub struct Runner {
    config: Config,
    target: Target,
    client: HttpClient, // shared by every worker
    tally: Tally,
    progress: ProgressSink,
}

/// State every worker task reads from.
struct Pool {
    client: HttpClient,
    target: Target,
    tally: Tally,
    progress: ProgressSink,
    next_ticket: AtomicU64, // attempts handed out so far
    total: u64,
    progress_every: u64,
    started: Instant,
}

impl Runner {
    /*------------------==| Public Functions |==-------------------------*/
    /// Validate the target and build the client. Nothing is sent yet.
    pub fn new(config: Config) -> anyhow::Result<Self> {
        let target = config.target()?;

        let client = HttpClientBuilder::new()
            .timeout(config.timeout)
            .max_connections(
                usize::try_from(config.workers).context("worker count does not fit in usize")?
            )
            .redirect_policy(RedirectPolicy::Limit(MAX_REDIRECTS))
            .proxy(None::<Uri>)
            .build()
            .context("failed to build HTTP client")?;

        Ok(Self {
            config,
            target,
            client,
            tally: Tally::new(),
            progress: Arc::new(|line: &Progress| println!("{}", line)),
        })
    }

    /// Route progress lines somewhere other than stdout.
    #[cfg(test)]
    pub fn with_progress_sink(mut self, sink: ProgressSink) -> Self {
        self.progress = sink;
        self
    }

    #[cfg(test)]
    pub fn tally(&self) -> &Tally {
        &self.tally
    }

    /// Blocking entry point: prints the banner, then drives the pool on its own runtime.
    pub fn run(self, cancel: Arc<Notify>) -> anyhow::Result<RunStats> {
        let runtime = Self::get_runtime(self.config.threads)?;

        println!(
            "{}",
            Banner {
                config: &self.config,
                target: self.target.as_str(),
                started_at: Local::now(),
            }
        );

        let stats = runtime.block_on(self.dispatch(&cancel));

        // drop the runtime so abandoned attempts are torn down before reporting
        drop(runtime);
        Ok(stats)
    }

    /// Run `requests` attempts with at most `workers` in flight, stopping early if
    /// `cancel` is notified. In-flight attempts are abandoned on cancellation.
    pub async fn dispatch(&self, cancel: &Notify) -> RunStats {
        let total = self.config.requests;
        let pool = Arc::new(Pool {
            client: self.client.clone(),
            target: self.target.clone(),
            tally: self.tally.clone(),
            progress: Arc::clone(&self.progress),
            next_ticket: AtomicU64::new(0),
            total,
            progress_every: self.config.progress_every,
            started: Instant::now(),
        });

        // never spawn more workers than there are requests
        let worker_count = self.config.workers.min(total);
        info!(url = %self.target.as_str(), workers = worker_count, requests = total, "dispatching");

        let mut workers = JoinSet::new();
        for worker_id in 0..worker_count {
            workers.spawn(Self::worker_loop(worker_id, Arc::clone(&pool)));
        }

        let interrupted = tokio::select! {
            _ = Self::join_all(&mut workers) => false,
            _ = cancel.notified() => true,
        };

        if interrupted {
            workers.abort_all();
            // a worker already past its last await still finishes recording
            while workers.join_next().await.is_some() {}
            println!("\n\nTest interrupted by user");
            info!(completed = self.tally.snapshot().completed(), "run interrupted");
        }

        let duration = pool.started.elapsed();
        let tally = self.tally.snapshot();
        info!(completed = tally.completed(), elapsed = ?duration, "run finished");

        RunStats {
            tally,
            requested: total,
            duration,
            interrupted,
        }
    }

    /*-------------------==| Private/Helpers |==----------------------- */

    /// One pool slot: take tickets until every attempt has been handed out.
    async fn worker_loop(worker_id: u64, pool: Arc<Pool>) {
        loop {
            let ticket = pool.next_ticket.fetch_add(1, Ordering::Relaxed);
            if ticket >= pool.total {
                break;
            }

            let outcome = Self::attempt(&pool.client, &pool.target).await;
            trace!(worker_id, ticket, ?outcome, "attempt completed");

            let completed = pool.tally.record(&outcome);
            if completed % pool.progress_every == 0 {
                (pool.progress)(&Progress {
                    snapshot: pool.tally.snapshot(),
                    completed,
                    total: pool.total,
                    elapsed: pool.started.elapsed(),
                });
            }
        }
        debug!(worker_id, "worker finished");
    }

    /// Send one GET and classify the result. Never fails.
    async fn attempt(client: &HttpClient, target: &Target) -> Outcome {
        match client.get_async(target.as_str()).await {
            Ok(mut response) => {
                let status = response.status();
                // drain the body so the connection can be reused
                match response.text().await {
                    Ok(_) => Outcome::from_status(status),
                    Err(err) => Outcome::from_body_error(&err),
                }
            }
            Err(err) => Outcome::from_error(&err),
        }
    }

    async fn join_all(workers: &mut JoinSet<()>) {
        while let Some(joined) = workers.join_next().await {
            if let Err(err) = joined {
                if err.is_panic() {
                    warn!(error = %err, "worker panicked");
                }
            }
        }
    }

    /// Helper function to create the tokio runtime
    fn get_runtime(threads: Option<u64>) -> anyhow::Result<Runtime> {
        let mut builder = Builder::new_multi_thread();
        if let Some(threads) = threads {
            builder.worker_threads(
                usize::try_from(threads).context("thread count does not fit in usize")?
            );
        }
        builder.enable_all().build().context("failed to create tokio runtime")
    }
}
