//! Write verification and the reader acceptance sequence.

use std::fmt;

use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use uhfsense_core::encoding::{hex_eq_ignore_case, parse_hex, to_hex};
use uhfsense_core::{BankAddress, InventoryArea};
use uhfsense_hardware::{AccessResult, ReaderDevice};

use crate::access::TagAccessController;
use crate::error::AccessError;
use crate::scanner::{InventoryScanner, ScanLimits, ScanReport};

/// Outcome of a read, write, read-back cycle on one address.
#[derive(Debug)]
pub struct WriteVerification {
    pub address: BankAddress,

    /// Value requested by the caller, as given.
    pub target: String,

    pub before: Result<Vec<u8>, AccessError>,
    pub write: Result<(), AccessError>,
    pub after: Result<Vec<u8>, AccessError>,
}

impl WriteVerification {
    /// The write succeeded and the read-back matches the target, ignoring
    /// hex letter case.
    pub fn verified(&self) -> bool {
        match (&self.write, &self.after) {
            (Ok(()), Ok(after)) => hex_eq_ignore_case(&to_hex(after), &self.target),
            _ => false,
        }
    }
}

/// Read `address`, write `data_hex` to it, and read it back.
///
/// Failures of the individual steps are recorded in the report rather than
/// aborting the sequence.
///
/// # Errors
///
/// Returns `InvalidRequest` if `data_hex` is not valid hex, and `InvalidBank`
/// or `InvalidRequest` if the write would be rejected before reaching the
/// device.
pub async fn verify_write<R: ReaderDevice>(
    access: &TagAccessController<R>,
    address: BankAddress,
    data_hex: &str,
) -> Result<WriteVerification, AccessError> {
    let data = parse_hex(data_hex).map_err(|e| AccessError::InvalidRequest {
        reason: e.to_string(),
    })?;
    if !address.bank.is_writable() {
        return Err(AccessError::InvalidBank { bank: address.bank });
    }
    if data.len() != address.byte_len() {
        return Err(AccessError::InvalidRequest {
            reason: format!(
                "{} expects {} bytes, got {}",
                address,
                address.byte_len(),
                data.len()
            ),
        });
    }
    let target: String = data_hex.chars().filter(|c| !c.is_whitespace()).collect();

    let before = access.read_bank(address).await.map(|r| r.data);
    let write = access.write_bank(address, &data).await.map(|_| ());
    let after = access.read_bank(address).await.map(|r| r.data);

    let verification = WriteVerification {
        address,
        target,
        before,
        write,
        after,
    };
    if verification.verified() {
        info!(address = %address, "Write verified");
    } else {
        warn!(address = %address, "Write verification failed");
    }
    Ok(verification)
}

/// Steps of the acceptance sequence, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AcceptanceStep {
    InventoryArea,
    Inventory,
    EpcRead,
    UserWrite,
    TidRead,
}

impl fmt::Display for AcceptanceStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::InventoryArea => "inventory area",
            Self::Inventory => "inventory",
            Self::EpcRead => "EPC read",
            Self::UserWrite => "USER write",
            Self::TidRead => "TID read",
        };
        f.write_str(name)
    }
}

/// Structured results of [`run_acceptance`].
#[derive(Debug, Default)]
pub struct AcceptanceReport {
    pub inventory_area: Option<InventoryArea>,
    pub inventory: Option<ScanReport>,
    pub epc: Option<AccessResult>,
    pub user: Option<WriteVerification>,
    pub tid: Option<AccessResult>,
    pub failures: Vec<(AcceptanceStep, String)>,
}

impl AcceptanceReport {
    pub fn passed(&self) -> bool {
        self.failures.is_empty()
    }

    fn fail(&mut self, step: AcceptanceStep, error: impl fmt::Display) {
        warn!(step = %step, "Acceptance step failed: {}", error);
        self.failures.push((step, error.to_string()));
    }
}

/// Exercise an initialized reader end to end: configure the inventory area,
/// run one inventory, read EPC, verify a USER write of `user_hex`, read TID.
///
/// Every step runs even if an earlier one failed.
pub async fn run_acceptance<R: ReaderDevice>(
    scanner: &mut InventoryScanner<R>,
    access: &TagAccessController<R>,
    limits: ScanLimits,
    user_hex: &str,
    cancel: &CancellationToken,
) -> AcceptanceReport {
    let mut report = AcceptanceReport::default();

    match scanner.configure_area(InventoryArea::default()).await {
        Ok(area) => report.inventory_area = Some(area),
        Err(e) => report.fail(AcceptanceStep::InventoryArea, e),
    }

    match scanner.run_scan(limits, cancel).await {
        Ok(scan) => {
            for tag in &scan.session.tags {
                info!(
                    epc = %tag.epc,
                    antenna = tag.antenna_port,
                    rssi = tag.rssi,
                    reads = tag.read_count,
                    "Tag detected"
                );
            }
            report.inventory = Some(scan);
        }
        Err(e) => report.fail(AcceptanceStep::Inventory, e),
    }

    match access.read_bank(BankAddress::epc()).await {
        Ok(result) => report.epc = Some(result),
        Err(e) => report.fail(AcceptanceStep::EpcRead, e),
    }

    match verify_write(access, BankAddress::user(), user_hex).await {
        Ok(verification) => {
            if !verification.verified() {
                report.fail(
                    AcceptanceStep::UserWrite,
                    format!("read-back does not match {}", verification.target),
                );
            }
            report.user = Some(verification);
        }
        Err(e) => report.fail(AcceptanceStep::UserWrite, e),
    }

    match access.read_bank(BankAddress::tid()).await {
        Ok(result) => report.tid = Some(result),
        Err(e) => report.fail(AcceptanceStep::TidRead, e),
    }

    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use uhfsense_core::{AccessPassword, Epc};
    use uhfsense_hardware::mock::{AccessFault, MockReader, MockReaderHandle, MockTag};

    use crate::access::AccessPolicy;
    use crate::reader::ReaderHandle;

    async fn fixture() -> (
        InventoryScanner<MockReader>,
        TagAccessController<MockReader>,
        MockReaderHandle,
    ) {
        let (mut reader, handle) = MockReader::new();
        handle.add_tag(
            MockTag::new(Epc::from_hex("E2000017221101441890A3B4").unwrap())
                .with_signal(1, -48),
        );
        reader.initialize("COM4").await.unwrap();
        let shared = ReaderHandle::new(reader);
        let scanner = InventoryScanner::new(shared.clone());
        let access =
            TagAccessController::new(shared, AccessPassword::default(), AccessPolicy::default());
        (scanner, access, handle)
    }

    #[tokio::test]
    async fn test_verify_write_lowercase_target() {
        let (_scanner, access, _handle) = fixture().await;
        let verification = verify_write(&access, BankAddress::user(), "deadbeef")
            .await
            .unwrap();

        assert_eq!(verification.before.as_deref().unwrap(), &[0, 0, 0, 0]);
        assert_eq!(
            verification.after.as_deref().unwrap(),
            &[0xDE, 0xAD, 0xBE, 0xEF]
        );
        assert!(verification.verified());
    }

    #[tokio::test]
    async fn test_verify_write_reports_failed_write() {
        let (_scanner, access, handle) = fixture().await;
        handle.fail_every_access(Some(AccessFault::CallFailed(3)));

        let verification = verify_write(&access, BankAddress::user(), "12345678")
            .await
            .unwrap();
        assert!(verification.before.is_err());
        assert!(matches!(
            verification.write,
            Err(AccessError::CallFailed { code: 3, attempts: 5, .. })
        ));
        assert!(!verification.verified());
    }

    #[tokio::test]
    async fn test_verify_write_rejects_bad_input() {
        let (_scanner, access, handle) = fixture().await;
        assert!(matches!(
            verify_write(&access, BankAddress::user(), "XYZ").await,
            Err(AccessError::InvalidRequest { .. })
        ));
        assert!(matches!(
            verify_write(&access, BankAddress::tid(), "1234").await,
            Err(AccessError::InvalidBank { .. })
        ));
        assert_eq!(handle.counts().read_tag, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_acceptance_sequence_passes() {
        let (mut scanner, access, handle) = fixture().await;
        let report = run_acceptance(
            &mut scanner,
            &access,
            ScanLimits::new(20, Duration::from_secs(2)),
            "12345678",
            &CancellationToken::new(),
        )
        .await;

        assert!(report.passed(), "{:?}", report.failures);
        assert_eq!(report.inventory.unwrap().session.tag_count, 1);
        assert_eq!(report.epc.unwrap().data, vec![0xE2, 0x00]);
        assert!(report.user.unwrap().verified());
        assert_eq!(report.tid.unwrap().data.len(), 2);
        assert_eq!(handle.counts().access_during_inventory, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_acceptance_continues_after_failure() {
        let (mut scanner, access, handle) = fixture().await;
        handle.fail_polls(true);

        let report = run_acceptance(
            &mut scanner,
            &access,
            ScanLimits::default(),
            "12345678",
            &CancellationToken::new(),
        )
        .await;

        assert!(!report.passed());
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].0, AcceptanceStep::Inventory);
        assert!(report.tid.is_some());
    }
}
