//! The shared screen: backend slot, explicit lock, and lifecycle.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use crate::config::{EnvConfig, GlobalOptions, TrueColorPolicy};
use crate::core::backend::{Backend, BackendFactory, BackendOptions, XTERM_FALLBACK};
use crate::core::raw_seq::RawSequenceSet;
use crate::core::redraw::{RedrawReceiver, RedrawScheduler};
use crate::error::ScreenError;
use crate::logging;
use crate::platform::simulation::{SimulationBackend, SIM_COLUMNS, SIM_ROWS};
use crate::runtime::cursor::ScreenCell;
use crate::runtime::lock::ScreenLock;

type RestartCallback = Box<dyn FnMut() + Send>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    Uninitialized,
    Active,
    Suspended,
    Finalized,
}

/// A terminal shared between an input poller and the main thread.
///
/// Every method takes `&self`; share the screen as `Arc<Screen>`.
///
/// Lock order for the internal mutexes: `raw_seqs`, then `backend`, then
/// `last_cursor`. The explicit lock ([`Screen::lock`]) is taken before any
/// of them.
pub struct Screen {
    factory: Box<dyn BackendFactory>,
    pub(super) options: Arc<dyn GlobalOptions>,
    env: EnvConfig,
    lock: ScreenLock,
    backend: Mutex<Option<Box<dyn Backend>>>,
    raw_seqs: Mutex<RawSequenceSet>,
    last_cursor: Mutex<Option<ScreenCell>>,
    restart_callback: Mutex<Option<RestartCallback>>,
    pub(super) force_fake_cursor: AtomicBool,
    redraw: RedrawScheduler,
    state: Mutex<LifecycleState>,
}

fn recover<T>(result: std::sync::LockResult<MutexGuard<'_, T>>) -> MutexGuard<'_, T> {
    match result {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

impl Screen {
    /// A screen reading `TERMSCREEN_TRUECOLOR` from the process environment.
    pub fn new(factory: impl BackendFactory + 'static, options: Arc<dyn GlobalOptions>) -> Self {
        Self::with_env(factory, options, EnvConfig::from_env())
    }

    pub fn with_env(
        factory: impl BackendFactory + 'static,
        options: Arc<dyn GlobalOptions>,
        env: EnvConfig,
    ) -> Self {
        Self {
            factory: Box::new(factory),
            options,
            env,
            lock: ScreenLock::new(),
            backend: Mutex::new(None),
            raw_seqs: Mutex::new(RawSequenceSet::new()),
            last_cursor: Mutex::new(None),
            restart_callback: Mutex::new(None),
            force_fake_cursor: AtomicBool::new(cfg!(windows)),
            redraw: RedrawScheduler::new(),
            state: Mutex::new(LifecycleState::Uninitialized),
        }
    }

    pub(super) fn slot(&self) -> MutexGuard<'_, Option<Box<dyn Backend>>> {
        recover(self.backend.lock())
    }

    pub(super) fn last_cursor(&self) -> MutexGuard<'_, Option<ScreenCell>> {
        recover(self.last_cursor.lock())
    }

    fn set_state(&self, state: LifecycleState) {
        *recover(self.state.lock()) = state;
        log::debug!(target: logging::SCREEN, "screen {state:?}");
    }

    pub fn state(&self) -> LifecycleState {
        *recover(self.state.lock())
    }

    /// Takes the explicit screen lock. It stays held until [`Screen::unlock`],
    /// which may be called from anywhere.
    pub fn lock(&self) {
        self.lock.lock();
    }

    pub fn unlock(&self) {
        self.lock.unlock();
    }

    /// Runs `f` on the active backend. `None` while no backend is installed.
    pub fn with_backend<R>(&self, f: impl FnOnce(&mut dyn Backend) -> R) -> Option<R> {
        let mut slot = self.slot();
        slot.as_mut().map(|backend| f(backend.as_mut()))
    }

    pub fn has_backend(&self) -> bool {
        self.slot().is_some()
    }

    /// Asks for a redraw. Never blocks.
    pub fn redraw(&self) {
        self.redraw.request();
    }

    /// The receiving end of redraw requests. Stays valid across
    /// suspend and resume.
    pub fn draw_chan(&self) -> RedrawReceiver {
        self.redraw.receiver()
    }

    /// Adds `seq` to the sequences reported as [`crate::Event::RawSeq`].
    /// Registering a sequence twice does nothing the second time.
    pub fn register_raw_seq(&self, seq: &str) {
        let mut raw_seqs = recover(self.raw_seqs.lock());
        if !raw_seqs.insert(seq) {
            return;
        }
        if let Some(backend) = self.slot().as_mut() {
            backend.register_raw_seq(seq);
        }
    }

    pub fn unregister_raw_seq(&self, seq: &str) {
        let mut raw_seqs = recover(self.raw_seqs.lock());
        raw_seqs.remove(seq);
        if let Some(backend) = self.slot().as_mut() {
            backend.unregister_raw_seq(seq);
        }
    }

    /// Registered sequences, in registration order (removal may reorder).
    pub fn raw_seqs(&self) -> Vec<String> {
        recover(self.raw_seqs.lock()).to_vec()
    }

    /// Called after every successful [`Screen::temp_start`].
    pub fn set_restart_callback(&self, callback: impl FnMut() + Send + 'static) {
        *recover(self.restart_callback.lock()) = Some(Box::new(callback));
    }

    pub fn clear_restart_callback(&self) {
        *recover(self.restart_callback.lock()) = None;
    }

    fn run_restart_callback(&self) {
        let callback = recover(self.restart_callback.lock()).take();
        if let Some(mut callback) = callback {
            callback();
            let mut slot = recover(self.restart_callback.lock());
            // Keep a replacement installed by the callback itself.
            if slot.is_none() {
                *slot = Some(callback);
            }
        }
    }

    fn backend_options(&self, force_xterm: bool) -> BackendOptions {
        let policy = self
            .options
            .string_option("truecolor")
            .map(|value| TrueColorPolicy::parse(&value))
            .unwrap_or(TrueColorPolicy::Auto);
        let xterm = force_xterm || self.options.bool_option("xterm").unwrap_or(false);
        BackendOptions {
            truecolor: policy.resolve(&self.env),
            term: xterm.then(|| XTERM_FALLBACK.to_string()),
        }
    }

    fn construct_backend(&self) -> Result<Box<dyn Backend>, ScreenError> {
        match self.factory.create(&self.backend_options(false)) {
            Ok(backend) => Ok(backend),
            Err(err) => {
                log::warn!(
                    target: logging::SCREEN,
                    "terminal backend construction failed ({err}); retrying with TERM={XTERM_FALLBACK}"
                );
                self.factory
                    .create(&self.backend_options(true))
                    .map_err(|source| ScreenError::BackendConstruction {
                        fallback_term: XTERM_FALLBACK,
                        source,
                    })
            }
        }
    }

    /// Finalizes and removes the installed backend, if any.
    fn release_backend(&self) -> bool {
        let previous = self.slot().take();
        match previous {
            Some(mut backend) => {
                backend.fini();
                true
            }
            None => false,
        }
    }

    /// Constructs, initializes, and installs a backend, then replays every
    /// registered raw sequence into it.
    ///
    /// On failure no backend is installed and the state is `Uninitialized`.
    pub fn init(&self) -> Result<(), ScreenError> {
        let result = self.install_backend();
        if result.is_err() {
            self.set_state(LifecycleState::Uninitialized);
        }
        result
    }

    fn install_backend(&self) -> Result<(), ScreenError> {
        if self.release_backend() {
            log::debug!(target: logging::SCREEN, "replacing the active backend");
        }

        let mut backend = self.construct_backend()?;
        backend.init().map_err(ScreenError::BackendInit)?;

        if self.options.bool_option("paste").unwrap_or(false) {
            backend.set_paste(true);
        }
        if self.options.bool_option("mouse").unwrap_or(false) {
            backend.enable_mouse();
        }

        let raw_seqs = recover(self.raw_seqs.lock());
        for seq in raw_seqs.iter() {
            log::trace!(target: logging::SCREEN, "replaying raw sequence {seq:?}");
            backend.register_raw_seq(seq);
        }
        *self.slot() = Some(backend);
        drop(raw_seqs);

        self.set_state(LifecycleState::Active);
        Ok(())
    }

    /// Installs an 80x24 in-memory backend and returns a handle to it.
    ///
    /// Only the `mouse` option is applied; registered raw sequences are not
    /// replayed.
    pub fn init_simulation(&self) -> Result<SimulationBackend, ScreenError> {
        let result = self.install_simulation();
        if result.is_err() {
            self.set_state(LifecycleState::Uninitialized);
        }
        result
    }

    fn install_simulation(&self) -> Result<SimulationBackend, ScreenError> {
        self.release_backend();

        let sim = SimulationBackend::new(SIM_COLUMNS, SIM_ROWS).map_err(ScreenError::Simulation)?;
        let mut backend = sim.clone();
        backend
            .init()
            .map_err(|err| ScreenError::Simulation(err.into()))?;
        if self.options.bool_option("mouse").unwrap_or(false) {
            backend.enable_mouse();
        }

        *self.slot() = Some(Box::new(backend));
        self.set_state(LifecycleState::Active);
        Ok(sim)
    }

    /// Suspends the screen so another program can use the terminal.
    ///
    /// Returns whether the backend was already absent. Otherwise the backend
    /// is finalized and removed and the explicit lock is left HELD; pass the
    /// return value to [`Screen::temp_start`], which releases it.
    pub fn temp_fini(&self) -> bool {
        {
            let mut slot = self.slot();
            let Some(backend) = slot.as_mut() else {
                return true;
            };
            // Closing the event queue wakes a poller that holds the lock.
            backend.fini();
        }

        self.lock.lock();
        let backend = self.slot().take();
        drop(backend);
        self.set_state(LifecycleState::Suspended);
        false
    }

    /// Resumes after [`Screen::temp_fini`].
    ///
    /// Does nothing when `was_absent`. Otherwise re-initializes the screen,
    /// releases the explicit lock (also when initialization fails), and on
    /// success runs the restart callback.
    pub fn temp_start(&self, was_absent: bool) -> Result<(), ScreenError> {
        if was_absent {
            return Ok(());
        }
        let result = self.init();
        self.lock.unlock();
        if result.is_ok() {
            self.run_restart_callback();
        }
        result
    }

    /// Releases the terminal for good.
    pub fn fini(&self) {
        self.release_backend();
        self.set_state(LifecycleState::Finalized);
    }
}

impl std::fmt::Debug for Screen {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Screen")
            .field("state", &self.state())
            .field("has_backend", &self.has_backend())
            .field("locked", &self.lock.is_locked())
            .field("raw_seqs", &self.raw_seqs())
            .field(
                "force_fake_cursor",
                &self.force_fake_cursor.load(Ordering::Relaxed),
            )
            .finish()
    }
}
