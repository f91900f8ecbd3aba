//! Bank-addressed tag reads and writes with bounded retries.
//!
//! Each attempt calls the reader once. An attempt succeeds only when the call
//! itself returns `Ok` and the result's status is `Success`; anything else
//! spends one attempt. When the budget is exhausted the failure kind of the
//! last attempt is returned.
//!
//! Writes have no rollback. A failed write leaves the tag contents
//! unspecified; callers re-read to find out what is there (see
//! [`verify_write`](crate::verify::verify_write)).
//!
//! # Examples
//!
//! ```
//! use uhfsense_rfid::{ReaderHandle, TagAccessController, AccessPolicy};
//! use uhfsense_hardware::mock::{MockReader, MockTag};
//! use uhfsense_hardware::traits::ReaderDevice;
//! use uhfsense_core::{AccessPassword, BankAddress, Epc};
//!
//! #[tokio::main]
//! async fn main() {
//!     let (mut reader, handle) = MockReader::new();
//!     handle.add_tag(MockTag::new(Epc::from_hex("E200001722110144").unwrap()));
//!     reader.initialize("COM4").await.unwrap();
//!
//!     let access = TagAccessController::new(
//!         ReaderHandle::new(reader),
//!         AccessPassword::default(),
//!         AccessPolicy::default(),
//!     );
//!     access.write_bank(BankAddress::user(), &[0x12, 0x34, 0x56, 0x78]).await.unwrap();
//!     let result = access.read_bank(BankAddress::user()).await.unwrap();
//!     assert_eq!(result.data, vec![0x12, 0x34, 0x56, 0x78]);
//! }
//! ```

use std::time::Duration;

use tracing::{debug, error, info, warn};
use uhfsense_core::AccessPassword;
use uhfsense_core::BankAddress;
use uhfsense_core::constants::{
    DEFAULT_MAX_ATTEMPTS, DEFAULT_READ_TIMEOUT_MS, DEFAULT_WRITE_TIMEOUT_MS,
};
use uhfsense_core::encoding::to_hex;
use uhfsense_hardware::{AccessResult, AccessStatus, HardwareError, ReaderDevice};

use crate::error::AccessError;
use crate::reader::ReaderHandle;

/// Retry budget and per-attempt timeouts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AccessPolicy {
    /// Attempts per call, at least 1.
    pub max_attempts: u32,
    pub read_timeout: Duration,
    pub write_timeout: Duration,
}

impl AccessPolicy {
    /// Create a policy. A zero attempt budget is raised to 1.
    pub fn new(max_attempts: u32, read_timeout: Duration, write_timeout: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            read_timeout,
            write_timeout,
        }
    }
}

impl Default for AccessPolicy {
    fn default() -> Self {
        Self::new(
            DEFAULT_MAX_ATTEMPTS,
            Duration::from_millis(DEFAULT_READ_TIMEOUT_MS),
            Duration::from_millis(DEFAULT_WRITE_TIMEOUT_MS),
        )
    }
}

/// Parameters of one read or write call.
#[derive(Debug, Clone)]
pub struct AccessRequest {
    pub password: AccessPassword,
    pub address: BankAddress,
    pub timeout: Duration,
    pub retries_remaining: u32,
}

#[derive(Debug, Clone, Copy)]
enum Operation<'a> {
    Read,
    Write(&'a [u8]),
}

impl Operation<'_> {
    fn name(&self) -> &'static str {
        match self {
            Operation::Read => "read",
            Operation::Write(_) => "write",
        }
    }
}

/// Why a single attempt failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AttemptFailure {
    CallFailed(i32),
    Rejected(u8),
    Timeout,
}

impl AttemptFailure {
    fn classify(outcome: Result<AccessResult, HardwareError>) -> Result<AccessResult, Self> {
        match outcome {
            Ok(result) => match result.status {
                AccessStatus::Success => Ok(result),
                AccessStatus::DeviceError(code) => Err(Self::Rejected(code)),
                AccessStatus::Timeout => Err(Self::Timeout),
            },
            Err(HardwareError::Timeout { .. }) => Err(Self::Timeout),
            Err(e) => Err(Self::CallFailed(e.status_code())),
        }
    }

    fn into_error(self, address: &BankAddress, attempts: u32) -> AccessError {
        let bank = address.bank;
        match self {
            Self::CallFailed(code) => AccessError::CallFailed {
                bank,
                code,
                attempts,
            },
            Self::Rejected(code) => AccessError::DeviceRejected {
                bank,
                code,
                attempts,
            },
            Self::Timeout => AccessError::Timeout { bank, attempts },
        }
    }
}

/// Drives reads and writes against the tag in the field.
#[derive(Debug)]
pub struct TagAccessController<R> {
    reader: ReaderHandle<R>,
    password: AccessPassword,
    policy: AccessPolicy,
}

impl<R: ReaderDevice> TagAccessController<R> {
    /// Create a controller using `password` and `policy` as defaults for the
    /// `*_bank` shortcuts.
    pub fn new(reader: ReaderHandle<R>, password: AccessPassword, policy: AccessPolicy) -> Self {
        Self {
            reader,
            password,
            policy,
        }
    }

    pub fn policy(&self) -> &AccessPolicy {
        &self.policy
    }

    /// Read `address` with an explicit password and per-attempt timeout.
    ///
    /// # Errors
    ///
    /// Returns the last attempt's failure once all attempts are spent, or
    /// `InvalidRequest` for a zero-length address.
    pub async fn read(
        &self,
        address: BankAddress,
        password: &AccessPassword,
        timeout: Duration,
    ) -> Result<AccessResult, AccessError> {
        if address.word_length == 0 {
            return Err(AccessError::InvalidRequest {
                reason: format!("{} word length must be greater than zero", address.bank),
            });
        }

        let request = self.request(address, password, timeout);
        let result = self.execute(request, Operation::Read).await?;
        info!(
            address = %address,
            data = %to_hex(&result.data),
            epc = %result.epc,
            "Tag read succeeded"
        );
        Ok(result)
    }

    /// Write `data` to `address` with an explicit password and timeout.
    ///
    /// # Errors
    ///
    /// Fails fast with `InvalidBank` for the TID bank and `InvalidRequest`
    /// when `data` does not cover exactly `address.word_length` words; the
    /// device is not contacted in either case. Otherwise returns the last
    /// attempt's failure once all attempts are spent.
    pub async fn write(
        &self,
        address: BankAddress,
        password: &AccessPassword,
        data: &[u8],
        timeout: Duration,
    ) -> Result<AccessResult, AccessError> {
        if !address.bank.is_writable() {
            error!(address = %address, "Refusing write to read-only bank");
            return Err(AccessError::InvalidBank { bank: address.bank });
        }
        if address.word_length == 0 || data.len() != address.byte_len() {
            return Err(AccessError::InvalidRequest {
                reason: format!(
                    "{} expects {} bytes, got {}",
                    address,
                    address.byte_len(),
                    data.len()
                ),
            });
        }

        let request = self.request(address, password, timeout);
        let result = self.execute(request, Operation::Write(data)).await?;
        info!(
            address = %address,
            data = %to_hex(data),
            epc = %result.epc,
            "Tag write succeeded"
        );
        Ok(result)
    }

    /// Read with the configured password and read timeout.
    pub async fn read_bank(&self, address: BankAddress) -> Result<AccessResult, AccessError> {
        self.read(address, &self.password, self.policy.read_timeout)
            .await
    }

    /// Write with the configured password and write timeout.
    pub async fn write_bank(
        &self,
        address: BankAddress,
        data: &[u8],
    ) -> Result<AccessResult, AccessError> {
        self.write(address, &self.password, data, self.policy.write_timeout)
            .await
    }

    fn request(
        &self,
        address: BankAddress,
        password: &AccessPassword,
        timeout: Duration,
    ) -> AccessRequest {
        AccessRequest {
            password: *password,
            address,
            timeout,
            retries_remaining: self.policy.max_attempts,
        }
    }

    async fn execute(
        &self,
        mut request: AccessRequest,
        operation: Operation<'_>,
    ) -> Result<AccessResult, AccessError> {
        let mut attempts = 0;
        let mut last_failure = AttemptFailure::Timeout;

        while request.retries_remaining > 0 {
            request.retries_remaining -= 1;
            attempts += 1;

            let outcome = {
                let mut reader = self.reader.lock().await;
                match operation {
                    Operation::Read => {
                        reader
                            .read_tag(&request.password, request.address, request.timeout)
                            .await
                    }
                    Operation::Write(data) => {
                        reader
                            .write_tag(&request.password, request.address, data, request.timeout)
                            .await
                    }
                }
            };

            match AttemptFailure::classify(outcome) {
                Ok(result) => return Ok(result),
                Err(failure) => {
                    debug!(
                        operation = operation.name(),
                        address = %request.address,
                        attempt = attempts,
                        remaining = request.retries_remaining,
                        ?failure,
                        "Tag access attempt failed"
                    );
                    last_failure = failure;
                }
            }
        }

        let err = last_failure.into_error(&request.address, attempts);
        warn!(operation = operation.name(), "{}", err);
        Err(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use uhfsense_core::constants::TAG_ERROR_MEMORY_LOCKED;
    use uhfsense_core::{Bank, Epc};
    use uhfsense_hardware::mock::{AccessFault, MockReader, MockReaderHandle, MockTag};

    async fn controller(policy: AccessPolicy) -> (TagAccessController<MockReader>, MockReaderHandle) {
        let (mut reader, handle) = MockReader::new();
        handle.add_tag(MockTag::new(Epc::from_hex("E2000017221101441890A3B4").unwrap()));
        reader.initialize("COM4").await.unwrap();
        let access = TagAccessController::new(
            ReaderHandle::new(reader),
            AccessPassword::default(),
            policy,
        );
        (access, handle)
    }

    #[tokio::test]
    async fn test_write_to_tid_fails_without_device_call() {
        let (access, handle) = controller(AccessPolicy::default()).await;
        let err = access
            .write_bank(BankAddress::tid(), &[0x00, 0x00])
            .await
            .unwrap_err();

        assert!(matches!(err, AccessError::InvalidBank { bank: Bank::Tid }));
        assert_eq!(handle.counts().write_tag, 0);
    }

    #[tokio::test]
    async fn test_write_with_wrong_length_fails_fast() {
        let (access, handle) = controller(AccessPolicy::default()).await;
        let err = access
            .write_bank(BankAddress::user(), &[0x12, 0x34])
            .await
            .unwrap_err();

        assert!(matches!(err, AccessError::InvalidRequest { .. }));
        assert_eq!(handle.counts().write_tag, 0);
    }

    #[rstest]
    #[case(AccessFault::CallFailed(2))]
    #[case(AccessFault::Rejected(TAG_ERROR_MEMORY_LOCKED))]
    #[case(AccessFault::Timeout)]
    #[tokio::test]
    async fn test_persistent_fault_spends_exact_budget(#[case] fault: AccessFault) {
        let (access, handle) = controller(AccessPolicy::default()).await;
        handle.fail_every_access(Some(fault));

        let err = access.read_bank(BankAddress::user()).await.unwrap_err();
        assert_eq!(err.attempts(), 5);
        assert_eq!(handle.counts().read_tag, 5);

        match fault {
            AccessFault::CallFailed(code) => {
                assert!(matches!(err, AccessError::CallFailed { code: c, .. } if c == code))
            }
            AccessFault::Rejected(code) => {
                assert!(matches!(err, AccessError::DeviceRejected { code: c, .. } if c == code))
            }
            AccessFault::Timeout => assert!(matches!(err, AccessError::Timeout { .. })),
        }
    }

    #[tokio::test]
    async fn test_recovers_before_budget_is_spent() {
        let (access, handle) = controller(AccessPolicy::default()).await;
        handle.inject_fault(AccessFault::Timeout);
        handle.inject_fault(AccessFault::CallFailed(1));

        let result = access
            .write_bank(BankAddress::user(), &[0xAA, 0xBB, 0xCC, 0xDD])
            .await
            .unwrap();
        assert!(result.is_success());
        assert_eq!(handle.counts().write_tag, 3);
    }

    #[tokio::test]
    async fn test_last_failure_kind_is_reported() {
        let policy = AccessPolicy::new(2, Duration::from_secs(1), Duration::from_secs(1));
        let (access, handle) = controller(policy).await;
        handle.inject_fault(AccessFault::Timeout);
        handle.inject_fault(AccessFault::Rejected(0x0B));

        let err = access.read_bank(BankAddress::epc()).await.unwrap_err();
        assert!(matches!(
            err,
            AccessError::DeviceRejected {
                bank: Bank::Epc,
                code: 0x0B,
                attempts: 2
            }
        ));
    }

    #[tokio::test]
    async fn test_zero_budget_still_attempts_once() {
        let policy = AccessPolicy::new(0, Duration::from_secs(1), Duration::from_secs(1));
        assert_eq!(policy.max_attempts, 1);

        let (access, handle) = controller(policy).await;
        access.read_bank(BankAddress::tid()).await.unwrap();
        assert_eq!(handle.counts().read_tag, 1);
    }

    #[tokio::test]
    async fn test_read_without_tag_times_out() {
        let (access, handle) = controller(AccessPolicy::default()).await;
        handle.clear_tags();

        let err = access.read_bank(BankAddress::user()).await.unwrap_err();
        assert!(matches!(err, AccessError::Timeout { attempts: 5, .. }));
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_device_spends_full_timeout_per_attempt() {
        let (access, handle) = controller(AccessPolicy::default()).await;
        handle.set_access_latency(Duration::from_secs(10));

        let started = tokio::time::Instant::now();
        let err = access.read_bank(BankAddress::user()).await.unwrap_err();

        assert!(matches!(err, AccessError::Timeout { attempts: 5, .. }));
        assert_eq!(started.elapsed(), Duration::from_secs(15));
    }
}
