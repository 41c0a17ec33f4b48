/*!
 * Asynchronous translation pipeline.
 *
 * A single worker task drains a FIFO queue one task at a time: cache lookup,
 * backend call, cache write, callback. Backend calls are never made in
 * parallel. Stopping is cooperative: the worker checks the stop flag before
 * every dequeue and right after it, and tasks still queued when stop is
 * requested are dropped without a callback.
 */

use std::collections::VecDeque;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use log::{debug, error, info, warn};
use parking_lot::Mutex;
use tokio::sync::Notify;
use tokio::task::JoinHandle;

use crate::errors::TranslationError;
use crate::providers::Backend;

use super::cache::TranslationCache;

/// One queued translation request
#[derive(Debug, Clone)]
pub struct PipelineTask {
    /// Text to translate
    pub text: String,
    /// Key the result is cached under
    pub correlation_key: String,
    /// Backend for this task only; the run's backend when `None`
    pub backend: Option<Arc<dyn Backend>>,
    /// Go to the backend even if the cache has an entry
    pub skip_cache_lookup: bool,
}

impl PipelineTask {
    /// Task whose correlation key is `text` itself (trimmed)
    pub fn for_text(text: impl Into<String>) -> Self {
        let text = text.into();
        let correlation_key = text.trim().to_string();
        Self::new(text, correlation_key)
    }

    /// Task with an explicit correlation key
    pub fn new(text: impl Into<String>, correlation_key: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            correlation_key: correlation_key.into(),
            backend: None,
            skip_cache_lookup: false,
        }
    }

    /// Dispatch this task to `backend`
    pub fn with_backend(mut self, backend: Arc<dyn Backend>) -> Self {
        self.backend = Some(backend);
        self
    }

    /// Ignore any cached translation for this task
    pub fn bypass_cache(mut self) -> Self {
        self.skip_cache_lookup = true;
        self
    }
}

/// Where a successful translation came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResultSource {
    Backend,
    Cache,
}

/// Outcome of one task, delivered to the callback exactly once
#[derive(Debug, Clone)]
pub enum PipelineResult {
    Success {
        translated_text: String,
        original_text: String,
        elapsed: Duration,
        source: ResultSource,
        /// Set when the translation could not be saved to the cache
        cache_warning: Option<String>,
    },
    Failure {
        error: TranslationError,
        original_text: String,
    },
}

impl PipelineResult {
    /// Text the task was submitted with
    pub fn original_text(&self) -> &str {
        match self {
            Self::Success { original_text, .. } | Self::Failure { original_text, .. } => original_text,
        }
    }

    /// Whether the task succeeded
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }
}

/// Receives every result, on the worker
pub type ResultCallback = Arc<dyn Fn(PipelineResult) + Send + Sync>;

/// Everything a worker needs for one run
#[derive(Clone)]
pub struct PipelineRun {
    /// Backend used when a task does not name one
    pub backend: Arc<dyn Backend>,
    /// Cache consulted before and updated after backend calls
    pub cache: Option<TranslationCache>,
    /// Result sink
    pub callback: ResultCallback,
}

impl PipelineRun {
    /// Run without a cache
    pub fn new(backend: Arc<dyn Backend>, callback: ResultCallback) -> Self {
        Self {
            backend,
            cache: None,
            callback,
        }
    }

    /// Use `cache` for lookups and writes
    pub fn with_cache(mut self, cache: TranslationCache) -> Self {
        self.cache = Some(cache);
        self
    }
}

/// Lifecycle of a pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    Idle,
    Running,
    Stopping,
}

/// Worker timings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PipelineConfig {
    /// How long an idle worker waits for a task before checking the stop flag
    pub poll_interval: Duration,
    /// How long `stop` waits for the worker to exit
    pub stop_timeout: Duration,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(1),
            stop_timeout: Duration::from_secs(2),
        }
    }
}

const STOP_CHECK_INTERVAL: Duration = Duration::from_millis(10);

struct Shared {
    queue: Mutex<VecDeque<PipelineTask>>,
    notify: Notify,
    should_stop: AtomicBool,
    state: Mutex<PipelineState>,
}

/// Single-worker FIFO translation pipeline
pub struct TranslationPipeline {
    config: PipelineConfig,
    shared: Arc<Shared>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl TranslationPipeline {
    /// Create an idle pipeline
    pub fn new(config: PipelineConfig) -> Self {
        Self {
            config,
            shared: Arc::new(Shared {
                queue: Mutex::new(VecDeque::new()),
                notify: Notify::new(),
                should_stop: AtomicBool::new(false),
                state: Mutex::new(PipelineState::Idle),
            }),
            worker: Mutex::new(None),
        }
    }

    /// Current state
    pub fn state(&self) -> PipelineState {
        *self.shared.state.lock()
    }

    /// Tasks waiting in the queue
    pub fn pending(&self) -> usize {
        self.shared.queue.lock().len()
    }

    /// Start the worker.
    ///
    /// Returns `false` without doing anything when a worker is still alive,
    /// when a stop has not completed, or when there is no Tokio runtime to
    /// run it on. Pending tasks from a previous run are discarded.
    pub fn start(&self, run: PipelineRun) -> bool {
        let mut worker = self.worker.lock();
        if worker.as_ref().is_some_and(|handle| !handle.is_finished()) {
            debug!("Pipeline already running, start ignored");
            return false;
        }
        if self.state() == PipelineState::Stopping {
            debug!("Pipeline is stopping, start ignored");
            return false;
        }

        let runtime = match tokio::runtime::Handle::try_current() {
            Ok(runtime) => runtime,
            Err(e) => {
                warn!("Cannot start translation pipeline outside a Tokio runtime: {}", e);
                return false;
            }
        };

        self.shared.queue.lock().clear();
        self.shared.should_stop.store(false, Ordering::SeqCst);
        *self.shared.state.lock() = PipelineState::Running;

        let shared = Arc::clone(&self.shared);
        let poll_interval = self.config.poll_interval;
        info!("Starting translation pipeline with backend {}", run.backend.id());
        *worker = Some(runtime.spawn(run_worker(shared, run, poll_interval)));
        true
    }

    /// Queue a task. Returns `false` when the pipeline is not running.
    pub fn submit(&self, task: PipelineTask) -> bool {
        if self.state() != PipelineState::Running || self.shared.should_stop.load(Ordering::SeqCst) {
            return false;
        }
        self.shared.queue.lock().push_back(task);
        self.shared.notify.notify_one();
        true
    }

    /// Stop the worker, dropping queued tasks.
    ///
    /// Returns whether the worker exited within the stop timeout. A task
    /// already being processed still gets its callback. After a timeout the
    /// pipeline stays `Stopping` and refuses `start` until a later `stop`
    /// sees the worker gone.
    pub async fn stop(&self) -> bool {
        if !self.worker_finished() {
            *self.shared.state.lock() = PipelineState::Stopping;
            self.shared.should_stop.store(true, Ordering::SeqCst);
            let dropped = {
                let mut queue = self.shared.queue.lock();
                let dropped = queue.len();
                queue.clear();
                dropped
            };
            if dropped > 0 {
                debug!("Dropped {} queued translation tasks", dropped);
            }
            self.shared.notify.notify_one();

            // The handle stays in its slot until the worker is gone
            let deadline = Instant::now() + self.config.stop_timeout;
            while !self.worker_finished() {
                let now = Instant::now();
                if now >= deadline {
                    warn!(
                        "Translation worker did not stop within {:?}, it will exit after its current task",
                        self.config.stop_timeout
                    );
                    return false;
                }
                tokio::time::sleep((deadline - now).min(STOP_CHECK_INTERVAL)).await;
            }
        }

        let handle = self.worker.lock().take();
        if let Some(handle) = handle {
            if let Err(e) = handle.await {
                error!("Translation worker ended abnormally: {}", e);
            }
            info!("Translation pipeline stopped");
        }
        *self.shared.state.lock() = PipelineState::Idle;
        true
    }

    fn worker_finished(&self) -> bool {
        self.worker.lock().as_ref().is_none_or(|handle| handle.is_finished())
    }

    /// Stop, then start again with `run`
    pub async fn restart(&self, run: PipelineRun) -> bool {
        if !self.stop().await {
            return false;
        }
        self.start(run)
    }
}

impl Default for TranslationPipeline {
    fn default() -> Self {
        Self::new(PipelineConfig::default())
    }
}

impl Drop for TranslationPipeline {
    fn drop(&mut self) {
        self.shared.should_stop.store(true, Ordering::SeqCst);
        self.shared.notify.notify_one();
    }
}

async fn run_worker(shared: Arc<Shared>, run: PipelineRun, poll_interval: Duration) {
    loop {
        if shared.should_stop.load(Ordering::SeqCst) {
            break;
        }

        let next = shared.queue.lock().pop_front();
        let Some(task) = next else {
            let _ = tokio::time::timeout(poll_interval, shared.notify.notified()).await;
            continue;
        };

        if shared.should_stop.load(Ordering::SeqCst) {
            debug!("Stop requested, dropping dequeued task");
            break;
        }

        let result = process(&run, task).await;
        let callback = &run.callback;
        if catch_unwind(AssertUnwindSafe(|| callback(result))).is_err() {
            error!("Result callback panicked, continuing with next task");
        }
    }

    debug!("Translation worker exited");
}

async fn process(run: &PipelineRun, task: PipelineTask) -> PipelineResult {
    let started = Instant::now();
    let backend = task.backend.as_ref().unwrap_or(&run.backend);

    // A cache table belongs to one backend
    let cache = run
        .cache
        .as_ref()
        .filter(|cache| cache.backend_id() == backend.id());

    if !task.skip_cache_lookup {
        if let Some(translated) = cache.and_then(|c| c.get(&task.correlation_key)) {
            return PipelineResult::Success {
                translated_text: translated,
                original_text: task.text,
                elapsed: started.elapsed(),
                source: ResultSource::Cache,
                cache_warning: None,
            };
        }
    }

    match backend.translate(&task.text).await {
        Ok(translated) if translated.trim().is_empty() => {
            warn!("{} returned an empty translation", backend.id());
            PipelineResult::Failure {
                error: TranslationError::EmptyResponse,
                original_text: task.text,
            }
        }
        Ok(translated) => {
            let cache_warning = cache.and_then(|c| match c.put(&task.correlation_key, &translated) {
                Ok(()) => None,
                Err(e) => {
                    warn!("{}", e);
                    Some(e.to_string())
                }
            });
            PipelineResult::Success {
                translated_text: translated,
                original_text: task.text,
                elapsed: started.elapsed(),
                source: ResultSource::Backend,
                cache_warning,
            }
        }
        Err(e) => {
            error!("Translation failed on {}: {}", backend.id(), e);
            PipelineResult::Failure {
                error: e.into(),
                original_text: task.text,
            }
        }
    }
}
