//! Generator state machine and dispatch loop

use crate::config::GeneratorConfig;
use crate::error::LoadResult;
use crate::result::CallResult;
use crate::tickets::TicketPool;
use crate::traits::Caller;

use super::builder::GeneratorBuilder;
use super::call::Call;
use super::rate_limiter::RateTicker;
use super::status::GenStatus;

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::{mpsc, watch};

/// State shared between the generator handle, the dispatch loop, the
/// duration timer and every call executor
pub(crate) struct Shared {
    /// Set once when shutdown begins; call executors discard results after
    pub(crate) shutting_down: AtomicBool,

    /// Admitted calls, recorded when the generator stops
    call_count: AtomicU64,

    /// Lifecycle state
    status_tx: watch::Sender<GenStatus>,

    /// Stop request; only ever goes from `false` to `true`
    stop_tx: watch::Sender<bool>,
}

impl Shared {
    fn new() -> Self {
        let (status_tx, _) = watch::channel(GenStatus::Original);
        let (stop_tx, _) = watch::channel(false);
        Self {
            shutting_down: AtomicBool::new(false),
            call_count: AtomicU64::new(0),
            status_tx,
            stop_tx,
        }
    }

    /// Raise the stop request. Repeated requests collapse into one.
    fn request_stop(&self) {
        self.stop_tx.send_replace(true);
    }

    /// Subscribe to the stop request
    pub(crate) fn stop_rx(&self) -> watch::Receiver<bool> {
        self.stop_tx.subscribe()
    }
}

/// Resolves once a stop has been requested
pub(crate) async fn stop_requested(stop_rx: &mut watch::Receiver<bool>) {
    while !*stop_rx.borrow_and_update() {
        if stop_rx.changed().await.is_err() {
            return;
        }
    }
}

/// Load generator
///
/// Admits calls against a [`Caller`] at a bounded rate and concurrency for a
/// fixed duration, publishing one [`CallResult`] per call on the result
/// stream. The stream is closed exactly once, after every in-flight call has
/// finished.
///
/// Lifecycle: `Original --start--> Started --stop/timer--> Stopped`.
pub struct Generator {
    /// Generator configuration
    config: GeneratorConfig,

    /// Admission pool sized to `config.concurrency`
    tickets: Arc<TicketPool>,

    /// State shared with the spawned tasks
    shared: Arc<Shared>,

    /// Dispatch loop waiting to be launched; taken by the first `start`
    pending: Mutex<Option<Dispatch>>,

    /// Set by the `stop` call that gets to report the call count
    stop_claimed: AtomicBool,
}

impl Generator {
    /// Create a generator
    ///
    /// Use [`GeneratorBuilder`] when parameters may be absent.
    ///
    /// # Errors
    /// Returns a validation error naming the offending parameter.
    pub fn new(
        caller: Arc<dyn Caller>,
        config: GeneratorConfig,
        result_tx: mpsc::Sender<CallResult>,
    ) -> LoadResult<Self> {
        tracing::debug!("Checking load generator parameters");
        if let Err(e) = config.validate() {
            tracing::error!(error = %e, "Invalid load generator parameters");
            return Err(e);
        }

        let tickets = Arc::new(TicketPool::new(config.concurrency)?);
        let shared = Arc::new(Shared::new());

        let dispatch = Dispatch {
            caller,
            config: config.clone(),
            tickets: Arc::clone(&tickets),
            shared: Arc::clone(&shared),
            result_tx,
        };

        tracing::info!(
            call_timeout = ?config.call_timeout,
            rate_per_second = config.rate_per_second,
            run_duration = ?config.run_duration,
            concurrency = config.concurrency,
            "Load generator initialized"
        );

        Ok(Self {
            config,
            tickets,
            shared,
            pending: Mutex::new(Some(dispatch)),
            stop_claimed: AtomicBool::new(false),
        })
    }

    /// Start building a generator
    pub fn builder() -> GeneratorBuilder {
        GeneratorBuilder::new()
    }

    /// Start generating load
    ///
    /// Arms the run-duration timer and launches the dispatch loop. Only the
    /// first call has any effect; later calls return `false`.
    ///
    /// Must be called from within a tokio runtime. Outside one it returns
    /// `false` and the generator stays startable.
    pub fn start(&self) -> bool {
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            tracing::error!("Load generator must be started inside a tokio runtime");
            return false;
        };

        let dispatch = self
            .pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        let Some(dispatch) = dispatch else {
            tracing::warn!(status = %self.status(), "Load generator already started");
            return false;
        };

        tracing::info!("Starting load generator");
        if let Some(interval) = self.config.tick_interval() {
            tracing::info!(interval = ?interval, "Rate limited admission");
        }

        self.shared.status_tx.send_replace(GenStatus::Started);

        let shared = Arc::clone(&self.shared);
        let run_duration = self.config.run_duration;
        runtime.spawn(async move {
            let mut stop_rx = shared.stop_tx.subscribe();
            tokio::select! {
                _ = tokio::time::sleep(run_duration) => {
                    tracing::info!(run_duration = ?run_duration, "Run duration elapsed, stopping load generator");
                    shared.request_stop();
                }
                _ = stop_requested(&mut stop_rx) => {}
            }
        });

        runtime.spawn(dispatch.run());
        true
    }

    /// Stop generating load
    ///
    /// Halts admission, waits for every in-flight call to finish and for the
    /// result stream to be closed, then returns the number of admitted calls
    /// with `true`. Returns `(0, false)` without side effects when the
    /// generator is not running or another `stop` already reported.
    pub async fn stop(&self) -> (u64, bool) {
        let status = self.status();
        if status != GenStatus::Started {
            tracing::debug!(status = %status, "Stop ignored, load generator not running");
            return (0, false);
        }

        let claimed = !self.stop_claimed.swap(true, Ordering::SeqCst);
        tracing::info!("Stopping load generator");
        self.shared.request_stop();
        self.stopped().await;

        if claimed {
            (self.call_count(), true)
        } else {
            (0, false)
        }
    }

    /// Current lifecycle state; never blocks
    pub fn status(&self) -> GenStatus {
        *self.shared.status_tx.borrow()
    }

    /// Wait until the generator reaches [`GenStatus::Stopped`]
    ///
    /// Does not request a stop. Never resolves for a generator that is never
    /// started.
    pub async fn stopped(&self) {
        let mut status_rx = self.shared.status_tx.subscribe();
        while *status_rx.borrow_and_update() != GenStatus::Stopped {
            if status_rx.changed().await.is_err() {
                return;
            }
        }
    }

    /// Number of admitted calls
    ///
    /// Only meaningful once the generator is stopped.
    pub fn call_count(&self) -> u64 {
        self.shared.call_count.load(Ordering::SeqCst)
    }

    /// The admission pool, for introspection
    pub fn tickets(&self) -> &TicketPool {
        &self.tickets
    }

    /// Get the generator configuration
    pub fn config(&self) -> &GeneratorConfig {
        &self.config
    }
}

impl std::fmt::Debug for Generator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Generator")
            .field("config", &self.config)
            .field("status", &self.status())
            .field("tickets", &self.tickets)
            .finish()
    }
}

/// The dispatch loop and everything it owns
struct Dispatch {
    caller: Arc<dyn Caller>,
    config: GeneratorConfig,
    tickets: Arc<TicketPool>,
    shared: Arc<Shared>,
    result_tx: mpsc::Sender<CallResult>,
}

impl Dispatch {
    /// Admit calls until a stop is requested, then shut down
    async fn run(self) {
        let Dispatch {
            caller,
            config,
            tickets,
            shared,
            result_tx,
        } = self;

        let mut stop_rx = shared.stop_tx.subscribe();
        let ticker = RateTicker::new(config.rate_per_second);
        let mut call_count: u64 = 0;
        let mut next_id: i64 = 1;

        tracing::debug!(ticker = ?ticker, "Dispatch loop started");

        loop {
            if *stop_rx.borrow_and_update() {
                break;
            }

            // Saturated concurrency stalls admission here.
            let ticket = tokio::select! {
                biased;

                _ = stop_requested(&mut stop_rx) => break,

                ticket = tickets.take() => match ticket {
                    Ok(ticket) => ticket,
                    Err(e) => {
                        tracing::error!(error = %e, "Ticket pool unavailable, halting admission");
                        break;
                    }
                },
            };

            let call = Call {
                id: next_id,
                caller: Arc::clone(&caller),
                call_timeout: config.call_timeout,
                shared: Arc::clone(&shared),
                result_tx: result_tx.clone(),
                ticket,
            };
            tokio::spawn(call.run());
            next_id += 1;
            call_count += 1;

            if ticker.is_enabled() {
                // A stop arriving together with a tick wins.
                tokio::select! {
                    biased;

                    _ = stop_requested(&mut stop_rx) => break,
                    _ = ticker.tick() => {}
                }
            }
        }

        shared.shutting_down.store(true, Ordering::SeqCst);
        tracing::info!(
            call_count,
            in_flight = tickets.in_use(),
            "Admission halted, draining in-flight calls"
        );

        tickets.wait_idle().await;

        tracing::debug!("Closing result stream");
        drop(result_tx);
        tickets.close();

        shared.call_count.store(call_count, Ordering::SeqCst);
        shared.status_tx.send_replace(GenStatus::Stopped);
        tracing::info!(call_count, "Load generator stopped");
    }
}
