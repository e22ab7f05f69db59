//! Inventory of daily microwave grid files over a date range.

use chrono::NaiveDate;
use std::path::PathBuf;
use tracing::{info, warn};

use goes_common::config::MicrowaveConfig;
use goes_common::DayIterator;
use raster_io::NetcdfMicrowaveSource;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GridStatus {
    Present,
    /// Listed as unavailable; aligned outputs carry NaN for this date.
    KnownMissing,
    /// Absent and not listed; aligning a scene on this date fails.
    Missing,
}

#[derive(Debug, Clone, PartialEq)]
pub struct InventoryEntry {
    pub date: NaiveDate,
    pub path: PathBuf,
    pub status: GridStatus,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InventorySummary {
    pub present: usize,
    pub known_missing: usize,
    pub missing: usize,
}

impl InventorySummary {
    pub fn from_entries(entries: &[InventoryEntry]) -> Self {
        entries.iter().fold(Self::default(), |mut s, e| {
            match e.status {
                GridStatus::Present => s.present += 1,
                GridStatus::KnownMissing => s.known_missing += 1,
                GridStatus::Missing => s.missing += 1,
            }
            s
        })
    }

    pub fn is_complete(&self) -> bool {
        self.missing == 0
    }
}

/// Status of the grid file of every `step`-th day in `[from, to]`.
pub fn inventory(
    source: &NetcdfMicrowaveSource,
    config: &MicrowaveConfig,
    from: NaiveDate,
    to: NaiveDate,
    step: u32,
) -> Vec<InventoryEntry> {
    let entries: Vec<InventoryEntry> = DayIterator::new(from, to, step)
        .map(|date| {
            let path = source.path_for(date);
            let status = if config.is_missing(date) {
                GridStatus::KnownMissing
            } else if path.exists() {
                GridStatus::Present
            } else {
                warn!(%date, path = %path.display(), "Microwave grid file missing");
                GridStatus::Missing
            };
            InventoryEntry { date, path, status }
        })
        .collect();

    let summary = InventorySummary::from_entries(&entries);
    info!(
        %from,
        %to,
        step,
        present = summary.present,
        known_missing = summary.known_missing,
        missing = summary.missing,
        "Microwave inventory complete"
    );
    entries
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_inventory_classifies_days() {
        let dir = tempfile::tempdir().unwrap();
        let config = MicrowaveConfig::default();
        for d in [date(2021, 12, 29), date(2022, 1, 1)] {
            std::fs::write(dir.path().join(config.file_name(d)), b"").unwrap();
        }
        let source = NetcdfMicrowaveSource::new(dir.path(), config.clone());

        let entries = inventory(&source, &config, date(2021, 12, 29), date(2022, 1, 1), 1);
        let statuses: Vec<_> = entries.iter().map(|e| (e.date, e.status)).collect();
        assert_eq!(
            statuses,
            vec![
                (date(2021, 12, 29), GridStatus::Present),
                (date(2021, 12, 30), GridStatus::Missing),
                (date(2021, 12, 31), GridStatus::KnownMissing),
                (date(2022, 1, 1), GridStatus::Present),
            ]
        );
        assert_eq!(
            entries[1].path,
            dir.path().join("MW_LST_DTC_20211230_x1y.h5")
        );

        let summary = InventorySummary::from_entries(&entries);
        assert_eq!(
            summary,
            InventorySummary {
                present: 2,
                known_missing: 1,
                missing: 1
            }
        );
        assert!(!summary.is_complete());
    }

    #[test]
    fn test_inventory_step() {
        let dir = tempfile::tempdir().unwrap();
        let config = MicrowaveConfig::default();
        let source = NetcdfMicrowaveSource::new(dir.path(), config.clone());

        let entries = inventory(&source, &config, date(2022, 3, 1), date(2022, 3, 31), 7);
        let days: Vec<_> = entries.iter().map(|e| e.date).collect();
        assert_eq!(
            days,
            vec![
                date(2022, 3, 1),
                date(2022, 3, 8),
                date(2022, 3, 15),
                date(2022, 3, 22),
                date(2022, 3, 29)
            ]
        );
        assert_eq!(entries[3].status, GridStatus::KnownMissing);
        assert!(inventory(&source, &config, date(2022, 3, 2), date(2022, 3, 1), 1).is_empty());
    }
}
