//! Smaller voters that sit around the warn-before-quit gesture in the chain.

use crate::decision::{TerminationDecider, TerminationDecision, TerminationQuery};
use futures::future::LocalBoxFuture;
use futures::FutureExt;
use std::future::Future;
use std::rc::Rc;
use std::time::Duration;

/// How many downloads are still running.
pub trait DownloadsQuery {
    /// Count of active downloads.
    fn active_downloads(&self) -> usize;
}

/// Asks the user whether to quit while downloads are running.
pub trait DownloadsConfirmation {
    /// `true` to quit anyway, `false` to keep downloading.
    fn confirm_quit(&self, active_downloads: usize) -> bool;
}

/// Cancels termination unless there are no active downloads or the user
/// agrees to abandon them.
///
/// Unlike the hold gesture, this decider prompts even when an earlier
/// decider deferred: interrupted downloads are always worth a question.
pub struct ActiveDownloadsDecider {
    downloads: Rc<dyn DownloadsQuery>,
    confirmation: Rc<dyn DownloadsConfirmation>,
}

impl ActiveDownloadsDecider {
    pub fn new(downloads: Rc<dyn DownloadsQuery>, confirmation: Rc<dyn DownloadsConfirmation>) -> Self {
        Self { downloads, confirmation }
    }
}

impl TerminationDecider for ActiveDownloadsDecider {
    fn should_terminate(&mut self, _is_async: bool) -> TerminationQuery {
        let active = self.downloads.active_downloads();
        if active == 0 {
            return TerminationQuery::next();
        }
        let proceed = self.confirmation.confirm_quit(active);
        tracing::info!(active, proceed, "quit with active downloads");
        TerminationQuery::Sync(TerminationDecision::from_proceed(proceed))
    }

    fn name(&self) -> &str {
        "ActiveDownloads"
    }
}

type Job = Box<dyn FnOnce() -> LocalBoxFuture<'static, ()>>;

/// Runs one housekeeping job before letting termination continue.
///
/// The job starts when the decider is asked and always ends in `Next`. With
/// a timeout, a stuck job is abandoned once the timeout passes.
pub struct FlushDecider {
    name: &'static str,
    job: Option<Job>,
    timeout: Option<Duration>,
}

impl FlushDecider {
    /// Wrap `job`, started lazily on the first
    /// [`should_terminate`](TerminationDecider::should_terminate).
    pub fn new<F, Fut>(name: &'static str, job: F) -> Self
    where
        F: FnOnce() -> Fut + 'static,
        Fut: Future<Output = ()> + 'static,
    {
        Self {
            name,
            job: Some(Box::new(move || job().boxed_local())),
            timeout: None,
        }
    }

    /// Abandon the job after `timeout`.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

impl TerminationDecider for FlushDecider {
    fn should_terminate(&mut self, _is_async: bool) -> TerminationQuery {
        let Some(job) = self.job.take() else {
            return TerminationQuery::next();
        };
        let name = self.name;
        let timeout = self.timeout;
        TerminationQuery::deferred(async move {
            let work = job();
            match timeout {
                Some(limit) => {
                    if tokio::time::timeout(limit, work).await.is_err() {
                        tracing::warn!(job = name, ?limit, "housekeeping timed out; quitting anyway");
                    }
                }
                None => work.await,
            }
            tracing::debug!(job = name, "housekeeping finished");
            TerminationDecision::Next
        })
    }

    fn name(&self) -> &str {
        self.name
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    struct Downloads(usize);

    impl DownloadsQuery for Downloads {
        fn active_downloads(&self) -> usize {
            self.0
        }
    }

    #[derive(Default)]
    struct Answer {
        proceed: bool,
        asked: Cell<usize>,
    }

    impl DownloadsConfirmation for Answer {
        fn confirm_quit(&self, active_downloads: usize) -> bool {
            self.asked.set(active_downloads);
            self.proceed
        }
    }

    #[test]
    fn no_downloads_means_no_prompt() {
        let answer = Rc::new(Answer::default());
        let mut decider = ActiveDownloadsDecider::new(Rc::new(Downloads(0)), answer.clone());
        assert_eq!(decider.should_terminate(false).as_sync(), Some(TerminationDecision::Next));
        assert_eq!(answer.asked.get(), 0);
    }

    #[test]
    fn active_downloads_follow_the_answer() {
        let keep = Rc::new(Answer::default());
        let mut decider = ActiveDownloadsDecider::new(Rc::new(Downloads(2)), keep.clone());
        assert_eq!(decider.should_terminate(true).as_sync(), Some(TerminationDecision::Cancel));
        assert_eq!(keep.asked.get(), 2);

        let quit = Rc::new(Answer { proceed: true, ..Answer::default() });
        let mut decider = ActiveDownloadsDecider::new(Rc::new(Downloads(1)), quit);
        assert_eq!(decider.should_terminate(false).as_sync(), Some(TerminationDecision::Next));
    }

    #[tokio::test(start_paused = true)]
    async fn flush_runs_job_once() {
        let runs = Rc::new(Cell::new(0));
        let counter = runs.clone();
        let mut decider = FlushDecider::new("stats", move || async move {
            counter.set(counter.get() + 1);
        });
        let query = decider.should_terminate(false);
        assert!(query.is_async());
        assert_eq!(runs.get(), 0);
        assert_eq!(query.resolve().await, TerminationDecision::Next);
        assert_eq!(runs.get(), 1);

        assert_eq!(decider.should_terminate(true).as_sync(), Some(TerminationDecision::Next));
        assert_eq!(runs.get(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn stuck_flush_is_abandoned_after_timeout() {
        let mut decider = FlushDecider::new("updater", futures::future::pending::<()>)
            .with_timeout(Duration::from_secs(2));
        let started = tokio::time::Instant::now();
        assert_eq!(decider.should_terminate(false).resolve().await, TerminationDecision::Next);
        assert!(started.elapsed() >= Duration::from_secs(2));
        assert_eq!(decider.name(), "updater");
    }
}
