//! Mock UHF reader implementation for testing and development.
//!
//! This module provides a simulated reader with programmable tags in its
//! field, injectable faults and call counters, controlled through a
//! [`MockReaderHandle`].

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use tracing::{debug, trace};
use uhfsense_core::constants::{
    BYTES_PER_WORD, TAG_ERROR_MEMORY_LOCKED, TAG_ERROR_MEMORY_OVERRUN, TAG_ERROR_NON_SPECIFIC,
};
use uhfsense_core::{
    AccessPassword, Bank, BankAddress, Epc, InventoryArea, InventoryMode, TagReport,
};

use crate::{
    HardwareError, Result,
    traits::ReaderDevice,
    types::AccessResult,
};

/// SDK status returned by the mock when an access call arrives during inventory.
pub const STATUS_INVENTORY_ACTIVE: i32 = 0x10;

/// SDK status returned by the mock when the reader is not initialized.
pub const STATUS_NOT_INITIALIZED: i32 = 0x11;

/// A simulated tag in the reader's field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MockTag {
    pub epc: Epc,
    pub tid: Vec<u8>,
    pub user: Vec<u8>,
    pub password: AccessPassword,
    pub antenna_port: u8,
    pub rssi: i16,
}

impl MockTag {
    /// Create a tag with a 64-byte zeroed USER bank and an open password.
    pub fn new(epc: Epc) -> Self {
        let mut tid = vec![0xE2, 0x80, 0x11, 0x05];
        tid.extend(epc.as_bytes().iter().rev().take(4));
        Self {
            epc,
            tid,
            user: vec![0; 64],
            password: AccessPassword::default(),
            antenna_port: 1,
            rssi: -55,
        }
    }

    /// Set the USER bank contents.
    pub fn with_user(mut self, user: Vec<u8>) -> Self {
        self.user = user;
        self
    }

    /// Set the access password.
    pub fn with_password(mut self, password: AccessPassword) -> Self {
        self.password = password;
        self
    }

    /// Set the antenna port and RSSI reported for this tag.
    pub fn with_signal(mut self, antenna_port: u8, rssi: i16) -> Self {
        self.antenna_port = antenna_port;
        self.rssi = rssi;
        self
    }

    /// EPC bank image: CRC word, PC word, then the EPC.
    fn epc_bank(&self) -> Vec<u8> {
        let words = (self.epc.as_bytes().len() / BYTES_PER_WORD) as u8;
        let mut bank = vec![0x00, 0x00, words << 3, 0x00];
        bank.extend_from_slice(self.epc.as_bytes());
        bank
    }

    fn bank(&self, bank: Bank) -> Vec<u8> {
        match bank {
            Bank::Epc => self.epc_bank(),
            Bank::Tid => self.tid.clone(),
            Bank::User => self.user.clone(),
        }
    }
}

/// Fault injected into an access call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessFault {
    /// The SDK call itself returns this nonzero status.
    CallFailed(i32),

    /// The tag answers with this Gen2 error code.
    Rejected(u8),

    /// No tag answers.
    Timeout,
}

/// Counters of SDK calls received by the mock.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MockCallCounts {
    pub initialize: u32,
    pub deinitialize: u32,
    pub start_inventory: u32,
    pub stop_inventory: u32,
    pub poll_inventory: u32,
    pub read_tag: u32,
    pub write_tag: u32,
    /// Access calls that arrived while an inventory window was open.
    pub access_during_inventory: u32,
}

#[derive(Debug)]
struct MockReaderState {
    initialized: bool,
    port: Option<String>,
    fail_initialize: bool,
    area: InventoryArea,
    inventory_active: bool,
    inventory_silent: bool,
    fail_polls: bool,
    tags: Vec<MockTag>,
    one_shot_faults: VecDeque<AccessFault>,
    persistent_fault: Option<AccessFault>,
    access_latency: Duration,
    counts: MockCallCounts,
}

impl Default for MockReaderState {
    fn default() -> Self {
        Self {
            initialized: false,
            port: None,
            fail_initialize: false,
            area: InventoryArea::default(),
            inventory_active: false,
            inventory_silent: false,
            fail_polls: false,
            tags: Vec::new(),
            one_shot_faults: VecDeque::new(),
            persistent_fault: None,
            access_latency: Duration::ZERO,
            counts: MockCallCounts::default(),
        }
    }
}

fn lock(state: &Mutex<MockReaderState>) -> MutexGuard<'_, MockReaderState> {
    // A panicking test thread must not wedge every other assertion.
    state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Mock UHF reader for testing and development.
///
/// # Examples
///
/// ```
/// use uhfsense_hardware::mock::{MockReader, MockTag};
/// use uhfsense_hardware::traits::ReaderDevice;
/// use uhfsense_core::{AccessPassword, BankAddress, Epc};
/// use std::time::Duration;
///
/// #[tokio::main]
/// async fn main() -> uhfsense_hardware::Result<()> {
///     let (mut reader, handle) = MockReader::new();
///     handle.add_tag(MockTag::new(Epc::from_hex("E2000017221101441890A3B4").unwrap()));
///
///     reader.initialize("COM4").await?;
///     let result = reader
///         .read_tag(&AccessPassword::default(), BankAddress::epc(), Duration::from_secs(3))
///         .await?;
///     assert!(result.is_success());
///     assert_eq!(result.data, vec![0xE2, 0x00]);
///     Ok(())
/// }
/// ```
#[derive(Debug)]
pub struct MockReader {
    state: Arc<Mutex<MockReaderState>>,
    name: String,
}

impl MockReader {
    /// Create a new mock reader with the default name.
    ///
    /// Returns a tuple of (MockReader, MockReaderHandle) where the handle
    /// controls the simulated field and observes SDK calls.
    pub fn new() -> (Self, MockReaderHandle) {
        Self::with_name("Mock UHF Reader".to_string())
    }

    /// Create a new mock reader with a custom name.
    pub fn with_name(name: String) -> (Self, MockReaderHandle) {
        let state = Arc::new(Mutex::new(MockReaderState::default()));
        let reader = Self {
            state: Arc::clone(&state),
            name,
        };
        (reader, MockReaderHandle { state })
    }

    /// Check the preconditions shared by read and write, then apply faults.
    ///
    /// Returns `Ok(Some(result))` when the call is answered without touching
    /// tag memory, `Ok(None)` when the access should proceed.
    fn begin_access(
        state: &mut MockReaderState,
        operation: &str,
    ) -> Result<Option<AccessResult>> {
        if !state.initialized {
            return Err(HardwareError::call_failed(operation, STATUS_NOT_INITIALIZED));
        }
        if state.inventory_active {
            state.counts.access_during_inventory += 1;
            return Err(HardwareError::call_failed(operation, STATUS_INVENTORY_ACTIVE));
        }

        let fault = state.one_shot_faults.pop_front().or(state.persistent_fault);
        match fault {
            Some(AccessFault::CallFailed(code)) => Err(HardwareError::call_failed(operation, code)),
            Some(AccessFault::Rejected(code)) => {
                let epc = state.tags.first().map(|t| t.epc.clone()).unwrap_or_default();
                Ok(Some(AccessResult::device_error(code, epc)))
            }
            Some(AccessFault::Timeout) => Ok(Some(AccessResult::timeout())),
            None if state.tags.is_empty() => Ok(Some(AccessResult::timeout())),
            None => Ok(None),
        }
    }

    fn latency(&self) -> Duration {
        lock(&self.state).access_latency
    }
}

impl Default for MockReader {
    fn default() -> Self {
        Self::new().0
    }
}

impl ReaderDevice for MockReader {
    async fn initialize(&mut self, port: &str) -> Result<()> {
        let mut state = lock(&self.state);
        state.counts.initialize += 1;
        if state.fail_initialize {
            return Err(HardwareError::initialization_failed(format!(
                "reader did not answer on {port}"
            )));
        }
        state.initialized = true;
        state.port = Some(port.to_string());
        debug!(port, "mock reader initialized");
        Ok(())
    }

    async fn deinitialize(&mut self) -> Result<()> {
        let mut state = lock(&self.state);
        state.counts.deinitialize += 1;
        state.initialized = false;
        state.inventory_active = false;
        state.port = None;
        Ok(())
    }

    async fn set_inventory_area(&mut self, area: InventoryArea) -> Result<()> {
        let mut state = lock(&self.state);
        if !state.initialized {
            return Err(HardwareError::not_initialized(&self.name));
        }
        state.area = area;
        Ok(())
    }

    async fn get_inventory_area(&self) -> Result<InventoryArea> {
        let state = lock(&self.state);
        if !state.initialized {
            return Err(HardwareError::not_initialized(&self.name));
        }
        Ok(state.area)
    }

    async fn start_inventory(&mut self, mode: InventoryMode) -> Result<()> {
        let mut state = lock(&self.state);
        state.counts.start_inventory += 1;
        if !state.initialized {
            return Err(HardwareError::call_failed(
                "start_inventory",
                STATUS_NOT_INITIALIZED,
            ));
        }
        trace!(mode = mode.mode, param = mode.param, "mock inventory started");
        state.inventory_active = true;
        Ok(())
    }

    async fn stop_inventory(&mut self) -> Result<()> {
        let mut state = lock(&self.state);
        state.counts.stop_inventory += 1;
        state.inventory_active = false;
        Ok(())
    }

    async fn poll_inventory(&mut self) -> Result<Vec<TagReport>> {
        let mut state = lock(&self.state);
        state.counts.poll_inventory += 1;
        if state.fail_polls {
            return Err(HardwareError::disconnected(&self.name));
        }
        if !state.inventory_active || state.inventory_silent {
            return Ok(Vec::new());
        }

        let area = state.area;
        let reports = state
            .tags
            .iter()
            .map(|tag| {
                let start = area.start_word as usize * BYTES_PER_WORD;
                let end = start + area.word_length as usize * BYTES_PER_WORD;
                let external = tag.user.get(start..end).unwrap_or_default().to_vec();
                TagReport::new(tag.epc.clone(), tag.antenna_port, tag.rssi)
                    .with_external_data(external)
            })
            .collect();
        Ok(reports)
    }

    async fn read_tag(
        &mut self,
        password: &AccessPassword,
        address: BankAddress,
        timeout: Duration,
    ) -> Result<AccessResult> {
        let latency = self.latency();
        if !latency.is_zero() {
            tokio::time::sleep(latency.min(timeout)).await;
        }

        let mut state = lock(&self.state);
        state.counts.read_tag += 1;
        if let Some(result) = Self::begin_access(&mut state, "read_tag")? {
            return Ok(result);
        }
        if latency > timeout {
            return Err(HardwareError::timeout(timeout.as_millis() as u64));
        }

        let Some(tag) = state.tags.first() else {
            return Ok(AccessResult::timeout());
        };
        if !tag.password.eq(&AccessPassword::default()) && tag.password != *password {
            return Ok(AccessResult::device_error(
                TAG_ERROR_MEMORY_LOCKED,
                tag.epc.clone(),
            ));
        }

        let memory = tag.bank(address.bank);
        let start = address.start_word as usize * BYTES_PER_WORD;
        let end = start + address.byte_len();
        match memory.get(start..end) {
            Some(data) => Ok(AccessResult::success(data.to_vec(), tag.epc.clone())),
            None => Ok(AccessResult::device_error(
                TAG_ERROR_MEMORY_OVERRUN,
                tag.epc.clone(),
            )),
        }
    }

    async fn write_tag(
        &mut self,
        password: &AccessPassword,
        address: BankAddress,
        data: &[u8],
        timeout: Duration,
    ) -> Result<AccessResult> {
        let latency = self.latency();
        if !latency.is_zero() {
            tokio::time::sleep(latency.min(timeout)).await;
        }

        let mut state = lock(&self.state);
        state.counts.write_tag += 1;
        if let Some(result) = Self::begin_access(&mut state, "write_tag")? {
            return Ok(result);
        }
        if latency > timeout {
            return Err(HardwareError::timeout(timeout.as_millis() as u64));
        }

        let Some(tag) = state.tags.first_mut() else {
            return Ok(AccessResult::timeout());
        };
        let epc = tag.epc.clone();
        if !tag.password.eq(&AccessPassword::default()) && tag.password != *password {
            return Ok(AccessResult::device_error(TAG_ERROR_MEMORY_LOCKED, epc));
        }
        if data.len() != address.byte_len() {
            return Ok(AccessResult::device_error(TAG_ERROR_NON_SPECIFIC, epc));
        }

        let start = address.start_word as usize * BYTES_PER_WORD;
        let end = start + address.byte_len();
        let target = match address.bank {
            Bank::Tid => return Ok(AccessResult::device_error(TAG_ERROR_MEMORY_LOCKED, epc)),
            Bank::User => &mut tag.user,
            Bank::Epc => {
                // Only the EPC words past CRC and PC are writable here.
                let mut image = tag.epc_bank();
                match image.get_mut(start..end) {
                    Some(slot) if start >= 2 * BYTES_PER_WORD => {
                        slot.copy_from_slice(data);
                        tag.epc = Epc::new(image[2 * BYTES_PER_WORD..].to_vec());
                        return Ok(AccessResult::success(Vec::new(), tag.epc.clone()));
                    }
                    _ => return Ok(AccessResult::device_error(TAG_ERROR_MEMORY_OVERRUN, epc)),
                }
            }
        };
        match target.get_mut(start..end) {
            Some(slot) => {
                slot.copy_from_slice(data);
                Ok(AccessResult::success(Vec::new(), epc))
            }
            None => Ok(AccessResult::device_error(TAG_ERROR_MEMORY_OVERRUN, epc)),
        }
    }
}

/// Handle for controlling a mock reader.
///
/// Clones share the same simulated device.
#[derive(Debug, Clone)]
pub struct MockReaderHandle {
    state: Arc<Mutex<MockReaderState>>,
}

impl MockReaderHandle {
    /// Place a tag in the reader's field. Access calls target the first tag.
    pub fn add_tag(&self, tag: MockTag) {
        lock(&self.state).tags.push(tag);
    }

    /// Remove a tag from the field.
    pub fn remove_tag(&self, epc: &Epc) {
        lock(&self.state).tags.retain(|t| &t.epc != epc);
    }

    /// Remove every tag from the field.
    pub fn clear_tags(&self) {
        lock(&self.state).tags.clear();
    }

    /// USER bank contents of a tag in the field.
    pub fn user_memory(&self, epc: &Epc) -> Option<Vec<u8>> {
        lock(&self.state)
            .tags
            .iter()
            .find(|t| &t.epc == epc)
            .map(|t| t.user.clone())
    }

    /// Make the next access call fail with `fault`. Faults queue in order.
    pub fn inject_fault(&self, fault: AccessFault) {
        lock(&self.state).one_shot_faults.push_back(fault);
    }

    /// Make every access call fail with `fault` until cleared with `None`.
    pub fn fail_every_access(&self, fault: Option<AccessFault>) {
        lock(&self.state).persistent_fault = fault;
    }

    /// Make `initialize` fail.
    pub fn fail_initialize(&self, fail: bool) {
        lock(&self.state).fail_initialize = fail;
    }

    /// Make `poll_inventory` fail with a disconnection.
    pub fn fail_polls(&self, fail: bool) {
        lock(&self.state).fail_polls = fail;
    }

    /// Report no detections while inventory runs.
    pub fn set_inventory_silent(&self, silent: bool) {
        lock(&self.state).inventory_silent = silent;
    }

    /// Delay every access call by `latency`; calls slower than their timeout time out.
    pub fn set_access_latency(&self, latency: Duration) {
        lock(&self.state).access_latency = latency;
    }

    /// Snapshot of the SDK call counters.
    pub fn counts(&self) -> MockCallCounts {
        lock(&self.state).counts
    }

    /// Check if the reader is initialized.
    pub fn is_initialized(&self) -> bool {
        lock(&self.state).initialized
    }

    /// Port passed to the last successful `initialize`, if still initialized.
    pub fn port(&self) -> Option<String> {
        lock(&self.state).port.clone()
    }

    /// Check if an inventory window is open.
    pub fn is_inventory_active(&self) -> bool {
        lock(&self.state).inventory_active
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn epc() -> Epc {
        Epc::from_hex("E2000017221101441890A3B4").unwrap()
    }

    async fn ready_reader() -> (MockReader, MockReaderHandle) {
        let (mut reader, handle) = MockReader::new();
        handle.add_tag(MockTag::new(epc()));
        reader.initialize("COM4").await.unwrap();
        (reader, handle)
    }

    #[tokio::test]
    async fn test_mock_reader_write_then_read_user() {
        let (mut reader, handle) = ready_reader().await;
        let password = AccessPassword::default();
        let timeout = Duration::from_millis(500);

        let written = reader
            .write_tag(&password, BankAddress::user(), &[0x12, 0x34, 0x56, 0x78], timeout)
            .await
            .unwrap();
        assert!(written.is_success());
        assert_eq!(written.epc, epc());

        let read = reader
            .read_tag(&password, BankAddress::user(), timeout)
            .await
            .unwrap();
        assert_eq!(read.data, vec![0x12, 0x34, 0x56, 0x78]);
        assert_eq!(handle.counts().write_tag, 1);
        assert_eq!(handle.counts().read_tag, 1);
    }

    #[tokio::test]
    async fn test_mock_reader_rejects_access_during_inventory() {
        let (mut reader, handle) = ready_reader().await;
        reader.start_inventory(InventoryMode::default()).await.unwrap();

        let err = reader
            .read_tag(
                &AccessPassword::default(),
                BankAddress::epc(),
                Duration::from_secs(1),
            )
            .await
            .unwrap_err();
        assert_eq!(err.status_code(), STATUS_INVENTORY_ACTIVE);
        assert_eq!(handle.counts().access_during_inventory, 1);
    }

    #[tokio::test]
    async fn test_mock_reader_poll_reports_every_tag() {
        let (mut reader, handle) = ready_reader().await;
        handle.add_tag(MockTag::new(Epc::new(vec![0x01, 0x02])).with_signal(2, -70));

        assert!(reader.poll_inventory().await.unwrap().is_empty());

        reader.start_inventory(InventoryMode::default()).await.unwrap();
        let reports = reader.poll_inventory().await.unwrap();
        assert_eq!(reports.len(), 2);
        assert_eq!(reports[1].antenna_port, 2);
        assert_eq!(reports[0].external_data.len(), 12);

        handle.set_inventory_silent(true);
        assert!(reader.poll_inventory().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_mock_reader_faults_are_consumed_in_order() {
        let (mut reader, handle) = ready_reader().await;
        handle.inject_fault(AccessFault::CallFailed(3));
        handle.inject_fault(AccessFault::Rejected(TAG_ERROR_MEMORY_LOCKED));
        let password = AccessPassword::default();
        let timeout = Duration::from_secs(1);

        let first = reader.read_tag(&password, BankAddress::tid(), timeout).await;
        assert_eq!(first.unwrap_err().status_code(), 3);

        let second = reader
            .read_tag(&password, BankAddress::tid(), timeout)
            .await
            .unwrap();
        assert_eq!(
            second.status,
            crate::types::AccessStatus::DeviceError(TAG_ERROR_MEMORY_LOCKED)
        );

        let third = reader
            .read_tag(&password, BankAddress::tid(), timeout)
            .await
            .unwrap();
        assert!(third.is_success());
    }

    #[tokio::test]
    async fn test_mock_reader_password_mismatch() {
        let (mut reader, handle) = MockReader::new();
        let locked = AccessPassword::new([1, 2, 3, 4]);
        handle.add_tag(MockTag::new(epc()).with_password(locked));
        reader.initialize("COM4").await.unwrap();

        let denied = reader
            .read_tag(
                &AccessPassword::default(),
                BankAddress::user(),
                Duration::from_secs(1),
            )
            .await
            .unwrap();
        assert!(!denied.is_success());

        let allowed = reader
            .read_tag(&locked, BankAddress::user(), Duration::from_secs(1))
            .await
            .unwrap();
        assert!(allowed.is_success());
    }

    #[tokio::test]
    async fn test_mock_reader_out_of_range_read() {
        let (mut reader, _handle) = ready_reader().await;
        let address = BankAddress::new(Bank::User, 100, 2).unwrap();
        let result = reader
            .read_tag(&AccessPassword::default(), address, Duration::from_secs(1))
            .await
            .unwrap();
        assert_eq!(
            result.status,
            crate::types::AccessStatus::DeviceError(TAG_ERROR_MEMORY_OVERRUN)
        );
    }

    #[tokio::test]
    async fn test_mock_reader_initialization_failure() {
        let (mut reader, handle) = MockReader::new();
        handle.fail_initialize(true);
        assert!(matches!(
            reader.initialize("COM4").await,
            Err(HardwareError::InitializationFailed { .. })
        ));
        assert!(!handle.is_initialized());

        // Deinitialize is safe on a reader that never came up.
        reader.deinitialize().await.unwrap();
        reader.deinitialize().await.unwrap();
        assert_eq!(handle.counts().deinitialize, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_mock_reader_latency_beyond_timeout() {
        let (mut reader, handle) = ready_reader().await;
        handle.set_access_latency(Duration::from_secs(5));
        let result = reader
            .read_tag(
                &AccessPassword::default(),
                BankAddress::user(),
                Duration::from_secs(3),
            )
            .await;
        assert!(matches!(
            result,
            Err(HardwareError::Timeout { duration_ms: 3000 })
        ));
    }
}
