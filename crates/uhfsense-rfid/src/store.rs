//! Per-window inventory state.
//!
//! An [`InventoryStore`] collects the detections of one scan window. Every
//! detection bumps `total_count`; only the first detection of an EPC adds a
//! [`TagRecord`] and bumps `tag_count`. Repeat detections update the record's
//! read count and latest signal values.

use std::collections::HashMap;
use std::fmt;
use std::time::Duration;

use serde::Serialize;
use tokio::time::Instant;
use uhfsense_core::{Epc, TagReport};

/// A distinct tag observed during a scan window.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TagRecord {
    pub epc: Epc,
    pub antenna_port: u8,
    pub rssi: i16,
    pub read_count: u32,
    /// Inventory-area payload from the most recent detection.
    pub external_data: Vec<u8>,
}

impl From<TagReport> for TagRecord {
    fn from(report: TagReport) -> Self {
        Self {
            epc: report.epc,
            antenna_port: report.antenna_port,
            rssi: report.rssi,
            read_count: 1,
            external_data: report.external_data,
        }
    }
}

/// Snapshot of one scan window.
///
/// `tag_count <= total_count` and `tags.len() == tag_count` always hold.
#[derive(Debug, Clone)]
pub struct InventorySession {
    pub start_time: Instant,
    pub tag_count: u32,
    pub total_count: u32,
    pub tags: Vec<TagRecord>,
}

impl InventorySession {
    fn new(start_time: Instant) -> Self {
        Self {
            start_time,
            tag_count: 0,
            total_count: 0,
            tags: Vec::new(),
        }
    }

    /// Look up a tag by EPC.
    pub fn get(&self, epc: &Epc) -> Option<&TagRecord> {
        self.tags.iter().find(|t| &t.epc == epc)
    }

    pub fn is_empty(&self) -> bool {
        self.tags.is_empty()
    }
}

/// Mutable inventory of the current scan window.
#[derive(Debug)]
pub struct InventoryStore {
    session: InventorySession,
    index: HashMap<Epc, usize>,
}

impl InventoryStore {
    pub fn new() -> Self {
        Self {
            session: InventorySession::new(Instant::now()),
            index: HashMap::new(),
        }
    }

    /// Clear all state and restart the window clock.
    pub fn begin_window(&mut self) {
        self.session = InventorySession::new(Instant::now());
        self.index.clear();
    }

    /// Record one detection. Returns `true` if the EPC is new in this window.
    pub fn record(&mut self, report: TagReport) -> bool {
        self.session.total_count = self.session.total_count.saturating_add(1);

        if let Some(&slot) = self.index.get(&report.epc) {
            let record = &mut self.session.tags[slot];
            record.read_count = record.read_count.saturating_add(1);
            record.rssi = report.rssi;
            record.antenna_port = report.antenna_port;
            record.external_data = report.external_data;
            return false;
        }

        self.index.insert(report.epc.clone(), self.session.tags.len());
        self.session.tags.push(TagRecord::from(report));
        self.session.tag_count += 1;
        true
    }

    /// Record a batch of detections. Returns how many EPCs were new.
    pub fn extend(&mut self, reports: impl IntoIterator<Item = TagReport>) -> usize {
        reports
            .into_iter()
            .map(|report| self.record(report))
            .filter(|is_new| *is_new)
            .count()
    }

    pub fn total_count(&self) -> u32 {
        self.session.total_count
    }

    pub fn tag_count(&self) -> u32 {
        self.session.tag_count
    }

    pub fn session(&self) -> &InventorySession {
        &self.session
    }

    /// Move the session out, leaving an empty window behind.
    pub fn take_session(&mut self) -> InventorySession {
        self.index.clear();
        std::mem::replace(&mut self.session, InventorySession::new(Instant::now()))
    }
}

impl Default for InventoryStore {
    fn default() -> Self {
        Self::new()
    }
}

/// Summary of a completed scan window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ScanStats {
    pub elapsed: Duration,

    /// Distinct tags per second, rounded up. Zero when no time elapsed.
    pub rate_per_sec: u64,

    pub distinct_tags: usize,
    pub total_detections: u32,
}

impl ScanStats {
    /// Compute statistics for a session that ended `elapsed` after it started.
    pub fn compute(session: &InventorySession, elapsed: Duration) -> Self {
        let millis = elapsed.as_millis();
        let rate_per_sec = if millis == 0 {
            0
        } else {
            (u128::from(session.tag_count) * 1000).div_ceil(millis) as u64
        };
        Self {
            elapsed,
            rate_per_sec,
            distinct_tags: session.tags.len(),
            total_detections: session.total_count,
        }
    }

    /// Elapsed time rendered as hours, minutes, seconds and milliseconds.
    pub fn elapsed_display(&self) -> ElapsedTime {
        ElapsedTime(self.elapsed)
    }
}

/// `Display` adapter rendering a duration as `1h 2m 3s 4ms`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ElapsedTime(pub Duration);

impl fmt::Display for ElapsedTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let total_ms = self.0.as_millis();
        let hours = total_ms / 3_600_000;
        let minutes = (total_ms / 60_000) % 60;
        let seconds = (total_ms / 1000) % 60;
        let millis = total_ms % 1000;
        write!(f, "{hours}h {minutes}m {seconds}s {millis}ms")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rstest::rstest;

    fn report(epc: &[u8], rssi: i16) -> TagReport {
        TagReport::new(Epc::new(epc.to_vec()), 1, rssi)
    }

    #[test]
    fn test_duplicates_count_toward_total_only() {
        let mut store = InventoryStore::new();
        assert!(store.record(report(&[0x01], -50)));
        assert!(!store.record(report(&[0x01], -42)));
        assert!(store.record(report(&[0x02], -60)));

        assert_eq!(store.total_count(), 3);
        assert_eq!(store.tag_count(), 2);

        let first = store.session().get(&Epc::new(vec![0x01])).unwrap();
        assert_eq!(first.read_count, 2);
        assert_eq!(first.rssi, -42);
    }

    #[test]
    fn test_begin_window_clears_everything() {
        let mut store = InventoryStore::new();
        store.extend(vec![report(&[0x01], -50), report(&[0x02], -50)]);
        store.begin_window();

        assert_eq!(store.total_count(), 0);
        assert!(store.session().is_empty());
        // The index is cleared too: a previously seen EPC counts as new again.
        assert!(store.record(report(&[0x01], -50)));
    }

    #[test]
    fn test_take_session_leaves_empty_store() {
        let mut store = InventoryStore::new();
        store.extend(vec![report(&[0x0A], -50)]);
        let session = store.take_session();

        assert_eq!(session.tag_count, 1);
        assert_eq!(store.tag_count(), 0);
        assert!(store.record(report(&[0x0A], -50)));
    }

    #[rstest]
    #[case(10, 1000, 10)]
    #[case(1, 3, 334)]
    #[case(7, 2000, 4)]
    #[case(0, 500, 0)]
    #[case(5, 0, 0)]
    fn test_rate_rounds_up(#[case] tags: u32, #[case] millis: u64, #[case] expected: u64) {
        let mut session = InventorySession::new(Instant::now());
        session.tag_count = tags;
        session.total_count = tags;
        let stats = ScanStats::compute(&session, Duration::from_millis(millis));
        assert_eq!(stats.rate_per_sec, expected);
    }

    #[rstest]
    #[case(0, "0h 0m 0s 0ms")]
    #[case(1_500, "0h 0m 1s 500ms")]
    #[case(3_723_004, "1h 2m 3s 4ms")]
    fn test_elapsed_display(#[case] millis: u64, #[case] expected: &str) {
        assert_eq!(
            ElapsedTime(Duration::from_millis(millis)).to_string(),
            expected
        );
    }

    proptest! {
        #[test]
        fn prop_counters_stay_consistent(epcs in prop::collection::vec(0u8..16, 0..200)) {
            let mut store = InventoryStore::new();
            for epc in &epcs {
                store.record(report(&[*epc], -40));
                let session = store.session();
                prop_assert!(session.tag_count <= session.total_count);
                prop_assert_eq!(session.tags.len(), session.tag_count as usize);
            }
            prop_assert_eq!(store.total_count() as usize, epcs.len());
        }
    }
}
