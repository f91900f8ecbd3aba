//! Inventory scan windows.
//!
//! A window runs `Idle -> Scanning -> Draining -> Idle`:
//!
//! ```text
//!   lock reader ─► start_inventory ─► poll every interval ─┐
//!                                                          │ target / deadline / cancel
//!   unlock ◄─ take session ◄─ final poll ◄─ stop_inventory ◄┘
//! ```
//!
//! The reader lock is held for the whole window, so tag access can never run
//! while inventory is open. `stop_inventory` is called exactly once for every
//! window that started, whatever ended the wait. If the scan future is
//! dropped mid-window, the window is stopped by the next
//! [`ReaderHandle::lock`] instead.

use std::time::Duration;

use serde::Serialize;
use tokio::sync::watch;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uhfsense_core::constants::{
    DEFAULT_IDLE_MS, DEFAULT_MAX_SCAN_MS, DEFAULT_POLL_INTERVAL_MS, DEFAULT_TARGET_COUNT,
    DEFAULT_WINDOW_MS,
};
use uhfsense_core::{InventoryArea, InventoryMode};
use uhfsense_hardware::{HardwareError, ReaderDevice};

use crate::error::ScanError;
use crate::reader::ReaderHandle;
use crate::store::{InventorySession, InventoryStore, ScanStats};

/// When a single scan window ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScanLimits {
    /// Stop once this many detections (duplicates included) have been seen.
    pub target_count: Option<u32>,

    /// Stop after this long regardless of the count.
    pub max_duration: Duration,

    pub poll_interval: Duration,
}

impl ScanLimits {
    /// Scan until `target_count` detections or `max_duration`, whichever first.
    pub fn new(target_count: u32, max_duration: Duration) -> Self {
        Self {
            target_count: Some(target_count),
            max_duration,
            poll_interval: Duration::from_millis(DEFAULT_POLL_INTERVAL_MS),
        }
    }

    /// Fixed-length window with no count target.
    pub fn window(duration: Duration) -> Self {
        Self {
            target_count: None,
            max_duration: duration,
            poll_interval: Duration::from_millis(DEFAULT_POLL_INTERVAL_MS),
        }
    }

    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }
}

impl Default for ScanLimits {
    fn default() -> Self {
        Self::new(
            DEFAULT_TARGET_COUNT,
            Duration::from_millis(DEFAULT_MAX_SCAN_MS),
        )
    }
}

/// What ended the wait of a scan window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ScanExit {
    TargetReached,
    DurationElapsed,
    Cancelled,
}

/// Scanner phase, published on a watch channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum ScanPhase {
    #[default]
    Idle,
    Scanning,
    Draining,
}

impl std::fmt::Display for ScanPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Idle => write!(f, "Idle"),
            Self::Scanning => write!(f, "Scanning"),
            Self::Draining => write!(f, "Draining"),
        }
    }
}

/// Result of one completed window.
#[derive(Debug, Clone)]
pub struct ScanReport {
    pub session: InventorySession,
    pub stats: ScanStats,
    pub exit: ScanExit,
}

/// Receives every completed window of a continuous scan.
#[allow(async_fn_in_trait)]
pub trait WindowSink {
    async fn on_window(&mut self, report: &ScanReport);

    /// Called when a window fails. The loop carries on with the next window.
    async fn on_error(&mut self, error: &ScanError) {
        warn!("Scan window failed: {}", error);
    }
}

/// Window and idle durations of continuous mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContinuousCadence {
    pub window: Duration,
    pub idle: Duration,
    pub poll_interval: Duration,
}

impl Default for ContinuousCadence {
    fn default() -> Self {
        Self {
            window: Duration::from_millis(DEFAULT_WINDOW_MS),
            idle: Duration::from_millis(DEFAULT_IDLE_MS),
            poll_interval: Duration::from_millis(DEFAULT_POLL_INTERVAL_MS),
        }
    }
}

/// Opens scan windows on the reader and collects what they see.
#[derive(Debug)]
pub struct InventoryScanner<R> {
    reader: ReaderHandle<R>,
    store: InventoryStore,
    phase: watch::Sender<ScanPhase>,
}

impl<R: ReaderDevice> InventoryScanner<R> {
    pub fn new(reader: ReaderHandle<R>) -> Self {
        Self {
            reader,
            store: InventoryStore::new(),
            phase: watch::Sender::new(ScanPhase::Idle),
        }
    }

    /// Subscribe to phase changes.
    pub fn phase(&self) -> watch::Receiver<ScanPhase> {
        self.phase.subscribe()
    }

    /// Apply an inventory area and return what the reader reports back.
    ///
    /// # Errors
    ///
    /// Returns `ScanError::Area` if either call fails.
    pub async fn configure_area(&self, area: InventoryArea) -> Result<InventoryArea, ScanError> {
        let mut device = self.reader.lock().await;
        device
            .set_inventory_area(area)
            .await
            .map_err(ScanError::Area)?;
        let applied = device.get_inventory_area().await.map_err(ScanError::Area)?;
        info!(
            area = applied.area,
            start_word = applied.start_word,
            word_length = applied.word_length,
            "Inventory area configured"
        );
        Ok(applied)
    }

    /// Query the reader's current inventory area.
    pub async fn inventory_area(&self) -> Result<InventoryArea, ScanError> {
        self.reader
            .lock()
            .await
            .get_inventory_area()
            .await
            .map_err(ScanError::Area)
    }

    /// Run one scan window.
    ///
    /// Waits for the reader, opens inventory, polls every
    /// `limits.poll_interval` until the target count, the duration limit or
    /// cancellation, then stops inventory and drains.
    ///
    /// # Errors
    ///
    /// `Start` if the window could not be opened (nothing to stop), `Poll` if
    /// polling failed mid-window, `Stop` if closing the window failed. In the
    /// latter two cases inventory was still stopped.
    pub async fn run_scan(
        &mut self,
        limits: ScanLimits,
        cancel: &CancellationToken,
    ) -> Result<ScanReport, ScanError> {
        let reader = self.reader.clone();
        let mut device = reader.lock().await;

        self.store.begin_window();
        device
            .start_inventory(InventoryMode::default())
            .await
            .map_err(ScanError::Start)?;
        reader.mark_window_open();
        self.phase.send_replace(ScanPhase::Scanning);
        debug!(?limits, "Scan window opened");

        let deadline = Instant::now() + limits.max_duration;
        let mut ticker = tokio::time::interval(limits.poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let waited: Result<ScanExit, HardwareError> = loop {
            if limits
                .target_count
                .is_some_and(|target| self.store.total_count() >= target)
            {
                break Ok(ScanExit::TargetReached);
            }

            tokio::select! {
                biased;

                _ = cancel.cancelled() => break Ok(ScanExit::Cancelled),
                _ = tokio::time::sleep_until(deadline) => break Ok(ScanExit::DurationElapsed),
                _ = ticker.tick() => {
                    match device.poll_inventory().await {
                        Ok(reports) => {
                            self.store.extend(reports);
                        }
                        Err(e) => break Err(e),
                    }
                }
            }
        };

        self.phase.send_replace(ScanPhase::Draining);
        let stopped = device.stop_inventory().await;
        reader.mark_window_closed();

        if waited.is_ok() && stopped.is_ok() {
            match device.poll_inventory().await {
                Ok(reports) => {
                    self.store.extend(reports);
                }
                Err(e) => warn!("Final inventory drain failed: {}", e),
            }
        }
        drop(device);

        let elapsed = self.store.session().start_time.elapsed();
        let session = self.store.take_session();
        self.phase.send_replace(ScanPhase::Idle);

        let exit = waited.map_err(ScanError::Poll)?;
        stopped.map_err(ScanError::Stop)?;

        let stats = ScanStats::compute(&session, elapsed);
        info!(
            exit = ?exit,
            distinct = stats.distinct_tags,
            detections = stats.total_detections,
            rate = stats.rate_per_sec,
            elapsed = %stats.elapsed_display(),
            "Scan window completed"
        );
        Ok(ScanReport {
            session,
            stats,
            exit,
        })
    }

    /// Repeat scan windows until `cancel` fires.
    ///
    /// Every completed window is handed to `sink` before the store is cleared
    /// for the next one. A window interrupted by cancellation still completes
    /// its drain and is delivered. Returns the number of windows delivered.
    pub async fn run_continuous<S: WindowSink>(
        &mut self,
        cadence: ContinuousCadence,
        cancel: &CancellationToken,
        sink: &mut S,
    ) -> u64 {
        let limits = ScanLimits::window(cadence.window).with_poll_interval(cadence.poll_interval);
        let mut windows = 0;

        info!(
            window_ms = cadence.window.as_millis() as u64,
            idle_ms = cadence.idle.as_millis() as u64,
            "Continuous scanning started"
        );
        while !cancel.is_cancelled() {
            match self.run_scan(limits, cancel).await {
                Ok(report) => {
                    windows += 1;
                    sink.on_window(&report).await;
                }
                Err(e) => sink.on_error(&e).await,
            }

            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = tokio::time::sleep(cadence.idle) => {}
            }
        }
        info!(windows, "Continuous scanning stopped");
        windows
    }
}
