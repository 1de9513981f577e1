//! Activity scheduler - bounded job queue drained by a fixed worker pool

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures::FutureExt;
use tokio::sync::{Mutex, mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::Instrument;

use crate::errors::BotError;
use crate::model::{
    ActivityAction, ActivityJob, ActivityNotification, ActivityResult, BotIdentity, Post,
};

/// Processes one activity; implemented by the activity pipeline
#[async_trait]
pub trait JobHandler: Send + Sync {
    async fn handle(&self, bot: &BotIdentity, post: &Post) -> ActivityResult;
}

/// Worker pool sizing
#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    /// Number of worker tasks
    pub workers: usize,
    /// Queue capacity
    pub max_queue: usize,
    /// How long a submission may wait for a free queue slot
    pub enqueue_timeout: Duration,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            workers: 4,
            max_queue: 100,
            enqueue_timeout: Duration::from_secs(30),
        }
    }
}

impl SchedulerConfig {
    /// Replace zero values with the defaults
    pub fn normalized(self) -> Self {
        let defaults = Self::default();
        Self {
            workers: if self.workers == 0 {
                defaults.workers
            } else {
                self.workers
            },
            max_queue: if self.max_queue == 0 {
                defaults.max_queue
            } else {
                self.max_queue
            },
            enqueue_timeout: if self.enqueue_timeout.is_zero() {
                defaults.enqueue_timeout
            } else {
                self.enqueue_timeout
            },
        }
    }
}

/// Bounded queue of activity jobs with a fixed number of workers.
///
/// Every submitted job reports exactly one [`ActivityResult`] on the receiver
/// returned by [`ActivityScheduler::submit`].
pub struct ActivityScheduler {
    sender: mpsc::Sender<ActivityJob>,
    config: SchedulerConfig,
    cancel: CancellationToken,
    workers: Vec<JoinHandle<()>>,
}

impl ActivityScheduler {
    /// Spawn the workers. Must be called inside a tokio runtime.
    pub fn start(
        handler: Arc<dyn JobHandler>,
        config: SchedulerConfig,
        cancel: CancellationToken,
    ) -> Self {
        let config = config.normalized();
        let (sender, receiver) = mpsc::channel(config.max_queue);
        let receiver = Arc::new(Mutex::new(receiver));

        let workers = (0..config.workers)
            .map(|worker| {
                tokio::spawn(run_worker(
                    worker,
                    Arc::clone(&handler),
                    Arc::clone(&receiver),
                    cancel.clone(),
                ))
            })
            .collect();

        tracing::info!(
            workers = config.workers,
            max_queue = config.max_queue,
            enqueue_timeout_secs = config.enqueue_timeout.as_secs(),
            "Activity scheduler started"
        );

        Self {
            sender,
            config,
            cancel,
            workers,
        }
    }

    /// Queue a job without blocking the caller.
    ///
    /// When the queue is full a background task waits for a slot; if none
    /// frees up within the enqueue timeout the job is reported as timed out
    /// and never runs.
    pub fn submit(&self, bot: BotIdentity, post: Post) -> oneshot::Receiver<ActivityResult> {
        let (job, result_rx) = ActivityJob::new(bot, post);

        if self.cancel.is_cancelled() {
            reject(job, BotError::Cancelled);
            return result_rx;
        }

        match self.sender.try_send(job) {
            Ok(()) => {}
            Err(mpsc::error::TrySendError::Closed(job)) => reject(job, BotError::Cancelled),
            Err(mpsc::error::TrySendError::Full(job)) => {
                tracing::debug!(post_id = %job.post.id, "Queue full, waiting for a slot");
                tokio::spawn(wait_for_slot(
                    self.sender.clone(),
                    job,
                    self.cancel.clone(),
                    self.config.enqueue_timeout,
                ));
            }
        }

        result_rx
    }

    /// Queue every post of a notification that addresses the bot
    pub fn submit_notification(
        &self,
        notification: ActivityNotification,
    ) -> Vec<oneshot::Receiver<ActivityResult>> {
        let ActivityNotification {
            bot,
            posts,
            sender_blocked,
        } = notification;

        if sender_blocked {
            tracing::info!(posts = posts.len(), "Sender blocked the bot, ignoring batch");
            return Vec::new();
        }

        posts
            .into_iter()
            .filter(|post| {
                if is_self_authored(post, &bot) {
                    tracing::debug!(post_id = %post.id, "Skipping own post");
                    return false;
                }
                if !post.mentions_bot(&bot) {
                    tracing::debug!(post_id = %post.id, "Post does not mention the bot");
                    return false;
                }
                true
            })
            .map(|post| self.submit(bot.clone(), post))
            .collect()
    }

    /// Stop accepting work; queued jobs still run
    pub fn shutdown(&self) {
        self.cancel.cancel();
    }

    /// Wait for every worker to exit.
    ///
    /// Workers exit after [`shutdown`](Self::shutdown), or once every queued
    /// job ran and no submission is still waiting for a slot.
    pub async fn join(self) {
        let Self {
            sender, workers, ..
        } = self;
        drop(sender);

        for worker in workers {
            if let Err(e) = worker.await {
                tracing::error!(error = %e, "Worker task failed");
            }
        }
        tracing::info!("Activity scheduler stopped");
    }
}

fn is_self_authored(post: &Post, bot: &BotIdentity) -> bool {
    (!bot.id.is_empty() && post.author.id == bot.id)
        || (!bot.handle.is_empty() && post.author.handle.eq_ignore_ascii_case(&bot.handle))
}

fn reject(job: ActivityJob, error: BotError) {
    let action = match error {
        BotError::Timeout => ActivityAction::Timeout,
        _ => ActivityAction::Cancelled,
    };
    tracing::warn!(post_id = %job.post.id, error = %error, "Job rejected");
    let result = ActivityResult::new(job.post.id.clone(), action).with_error(error);
    job.finish(result);
}

async fn wait_for_slot(
    sender: mpsc::Sender<ActivityJob>,
    job: ActivityJob,
    cancel: CancellationToken,
    timeout: Duration,
) {
    let slot = tokio::select! {
        _ = cancel.cancelled() => Err(BotError::Cancelled),
        reserved = tokio::time::timeout(timeout, sender.reserve()) => match reserved {
            Ok(Ok(permit)) => Ok(permit),
            Ok(Err(_)) => Err(BotError::Cancelled),
            Err(_) => Err(BotError::Timeout),
        },
    };

    match slot {
        Ok(permit) => permit.send(job),
        Err(error) => reject(job, error),
    }
}

async fn run_worker(
    worker: usize,
    handler: Arc<dyn JobHandler>,
    receiver: Arc<Mutex<mpsc::Receiver<ActivityJob>>>,
    cancel: CancellationToken,
) {
    loop {
        let job = {
            let mut receiver = receiver.lock().await;
            tokio::select! {
                biased;
                job = receiver.recv() => job,
                _ = cancel.cancelled() => {
                    // Closing keeps buffered jobs receivable
                    receiver.close();
                    receiver.recv().await
                }
            }
        };

        let Some(job) = job else {
            break;
        };
        run_job(worker, handler.as_ref(), job).await;
    }
    tracing::debug!(worker, "Worker exiting");
}

async fn run_job(worker: usize, handler: &dyn JobHandler, job: ActivityJob) {
    let span = tracing::info_span!("activity", job_id = %job.id, post_id = %job.post.id, worker);
    let started = Instant::now();

    let outcome = AssertUnwindSafe(handler.handle(&job.bot, &job.post))
        .catch_unwind()
        .instrument(span.clone())
        .await;

    let result = match outcome {
        Ok(result) => result,
        Err(panic) => {
            let message = panic_message(&*panic);
            tracing::error!(parent: &span, panic = %message, "Job panicked");
            ActivityResult::new(job.post.id.clone(), ActivityAction::Panicked)
                .with_error(BotError::Unknown(message))
        }
    };

    let elapsed_ms = started.elapsed().as_millis() as u64;
    match &result.error {
        Some(error) => tracing::warn!(
            parent: &span,
            action = %result.action,
            replied = result.replied,
            error_kind = error.kind(),
            error = %error,
            elapsed_ms,
            "Activity finished with error"
        ),
        None => tracing::info!(
            parent: &span,
            action = %result.action,
            replied = result.replied,
            elapsed_ms,
            "Activity finished"
        ),
    }

    job.finish(result);
}

/// Best-effort text of a caught panic payload
pub(crate) fn panic_message(panic: &(dyn Any + Send)) -> String {
    panic
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| panic.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Author, Mention};
    use std::sync::Mutex as StdMutex;

    /// Records handled posts; sleeps for posts whose text is `slow`, panics on `panic`
    #[derive(Default)]
    struct RecordingHandler {
        handled: StdMutex<Vec<String>>,
        started: StdMutex<Option<mpsc::UnboundedSender<String>>>,
    }

    impl RecordingHandler {
        fn handled(&self) -> Vec<String> {
            self.handled.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl JobHandler for RecordingHandler {
        async fn handle(&self, _bot: &BotIdentity, post: &Post) -> ActivityResult {
            if let Some(started) = self.started.lock().unwrap().as_ref() {
                let _ = started.send(post.id.clone());
            }
            match post.text.as_str() {
                "slow" => tokio::time::sleep(Duration::from_secs(60)).await,
                "panic" => panic!("handler exploded"),
                _ => {}
            }
            self.handled.lock().unwrap().push(post.id.clone());
            ActivityResult::new(post.id.clone(), ActivityAction::Replied).with_replied(true)
        }
    }

    fn bot() -> BotIdentity {
        BotIdentity {
            id: "bot".to_string(),
            handle: "alttextbot".to_string(),
        }
    }

    fn post(id: &str, text: &str) -> Post {
        Post {
            id: id.to_string(),
            text: text.to_string(),
            author: Author {
                id: "user".to_string(),
                name: "User".to_string(),
                handle: "user".to_string(),
            },
            ..Default::default()
        }
    }

    fn config(workers: usize, max_queue: usize) -> SchedulerConfig {
        SchedulerConfig {
            workers,
            max_queue,
            enqueue_timeout: Duration::from_secs(1),
        }
    }

    #[test]
    fn test_zero_config_uses_defaults() {
        let config = SchedulerConfig {
            workers: 0,
            max_queue: 0,
            enqueue_timeout: Duration::ZERO,
        }
        .normalized();
        assert_eq!(config.workers, 4);
        assert_eq!(config.max_queue, 100);
        assert_eq!(config.enqueue_timeout, Duration::from_secs(30));
    }

    #[tokio::test]
    async fn test_every_job_reports_once() {
        let handler = Arc::new(RecordingHandler::default());
        let scheduler = ActivityScheduler::start(
            handler.clone(),
            config(2, 10),
            CancellationToken::new(),
        );

        let receivers: Vec<_> = (0..5)
            .map(|i| scheduler.submit(bot(), post(&format!("p{}", i), "hi")))
            .collect();

        for (i, receiver) in receivers.into_iter().enumerate() {
            let result = receiver.await.unwrap();
            assert_eq!(result.post_id, format!("p{}", i));
            assert_eq!(result.action, ActivityAction::Replied);
        }

        scheduler.shutdown();
        scheduler.join().await;
        assert_eq!(handler.handled().len(), 5);
    }

    #[tokio::test(start_paused = true)]
    async fn test_workers_run_jobs_in_parallel() {
        let handler = Arc::new(RecordingHandler::default());
        let scheduler = ActivityScheduler::start(
            handler.clone(),
            config(2, 10),
            CancellationToken::new(),
        );
        let started = Instant::now();

        let first = scheduler.submit(bot(), post("a", "slow"));
        let second = scheduler.submit(bot(), post("b", "slow"));
        first.await.unwrap();
        second.await.unwrap();

        assert!(started.elapsed() < Duration::from_secs(120));
        scheduler.shutdown();
        scheduler.join().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_full_queue_times_out_without_running_job() {
        let (started_tx, mut started_rx) = mpsc::unbounded_channel();
        let handler = Arc::new(RecordingHandler {
            started: StdMutex::new(Some(started_tx)),
            ..Default::default()
        });
        let scheduler = ActivityScheduler::start(
            handler.clone(),
            config(1, 1),
            CancellationToken::new(),
        );

        let busy = scheduler.submit(bot(), post("busy", "slow"));
        assert_eq!(started_rx.recv().await.as_deref(), Some("busy"));

        let queued = scheduler.submit(bot(), post("queued", "hi"));
        let overflow = scheduler.submit(bot(), post("overflow", "hi"));

        let result = overflow.await.unwrap();
        assert_eq!(result.action, ActivityAction::Timeout);
        assert_eq!(result.error, Some(BotError::Timeout));

        assert_eq!(busy.await.unwrap().action, ActivityAction::Replied);
        assert_eq!(queued.await.unwrap().action, ActivityAction::Replied);

        scheduler.shutdown();
        scheduler.join().await;
        assert_eq!(
            handler.handled(),
            vec!["busy".to_string(), "queued".to_string()]
        );
    }

    #[tokio::test]
    async fn test_submissions_after_shutdown_are_cancelled() {
        let handler = Arc::new(RecordingHandler::default());
        let cancel = CancellationToken::new();
        let scheduler = ActivityScheduler::start(handler.clone(), config(1, 4), cancel.clone());

        cancel.cancel();
        let result = scheduler.submit(bot(), post("late", "hi")).await.unwrap();

        assert_eq!(result.action, ActivityAction::Cancelled);
        assert_eq!(result.error, Some(BotError::Cancelled));
        scheduler.join().await;
        assert!(handler.handled().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_releases_waiting_submission() {
        let (started_tx, mut started_rx) = mpsc::unbounded_channel();
        let handler = Arc::new(RecordingHandler {
            started: StdMutex::new(Some(started_tx)),
            ..Default::default()
        });
        let scheduler = ActivityScheduler::start(
            handler.clone(),
            SchedulerConfig {
                workers: 1,
                max_queue: 1,
                enqueue_timeout: Duration::from_secs(600),
            },
            CancellationToken::new(),
        );

        let _busy = scheduler.submit(bot(), post("busy", "slow"));
        started_rx.recv().await;
        let _queued = scheduler.submit(bot(), post("queued", "hi"));
        let waiting = scheduler.submit(bot(), post("waiting", "hi"));

        scheduler.shutdown();
        let result = waiting.await.unwrap();

        assert_eq!(result.action, ActivityAction::Cancelled);
        scheduler.join().await;
        assert!(!handler.handled().contains(&"waiting".to_string()));
    }

    #[tokio::test]
    async fn test_panicking_job_does_not_kill_worker() {
        let handler = Arc::new(RecordingHandler::default());
        let scheduler = ActivityScheduler::start(
            handler.clone(),
            config(1, 4),
            CancellationToken::new(),
        );

        let exploded = scheduler.submit(bot(), post("boom", "panic")).await.unwrap();
        let next = scheduler.submit(bot(), post("next", "hi")).await.unwrap();

        assert_eq!(exploded.action, ActivityAction::Panicked);
        assert_eq!(
            exploded.error,
            Some(BotError::Unknown("handler exploded".to_string()))
        );
        assert_eq!(next.action, ActivityAction::Replied);
        scheduler.shutdown();
        scheduler.join().await;
    }

    #[tokio::test]
    async fn test_notification_filtering() {
        let handler = Arc::new(RecordingHandler::default());
        let scheduler = ActivityScheduler::start(
            handler.clone(),
            config(1, 10),
            CancellationToken::new(),
        );

        let mut own = post("own", "@alttextbot describe");
        own.author.id = "bot".to_string();
        let mut by_entity = post("entity", "look at this");
        by_entity.mentions = vec![Mention {
            id: Some("bot".to_string()),
            handle: "alttextbot".to_string(),
        }];

        let receivers = scheduler.submit_notification(ActivityNotification {
            bot: bot(),
            posts: vec![
                post("mention", "@AltTextBot ocr"),
                post("unrelated", "nice photo"),
                own,
                by_entity,
            ],
            sender_blocked: false,
        });
        assert_eq!(receivers.len(), 2);
        for receiver in receivers {
            receiver.await.unwrap();
        }

        let blocked = scheduler.submit_notification(ActivityNotification {
            bot: bot(),
            posts: vec![post("blocked", "@alttextbot ocr")],
            sender_blocked: true,
        });
        assert!(blocked.is_empty());

        scheduler.shutdown();
        scheduler.join().await;
        assert_eq!(
            handler.handled(),
            vec!["mention".to_string(), "entity".to_string()]
        );
    }
}
