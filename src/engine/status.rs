//! Snapshot chain inspection.
//!
//! The engine reports its backup chain only as free text. This module owns
//! the grammar for that text: a snapshot line starts with `Full` or
//! `Incremental`, followed by a `ctime`-style date spread over five
//! whitespace-separated columns:
//!
//! ```text
//!                 Full         Tue Jun 17 10:00:00 2014                 1
//!          Incremental         Tue Jun 17 10:05:00 2014                 1
//! ```
//!
//! Everything else in the status output is ignored.

use super::Duplicity;
use crate::constants::{STATUS_DATE_FORMAT, STATUS_TOKEN_FULL, STATUS_TOKEN_INCREMENTAL};
use crate::errors::AppResult;
use chrono::{DateTime, Local, NaiveDateTime, TimeZone};
use tracing::{debug, warn};

/// Whether a snapshot starts a chain or extends one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SnapshotKind {
    Full,
    Incremental,
}

/// One backup set in the chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Snapshot {
    pub kind: SnapshotKind,
    pub time: DateTime<Local>,
}

/// Parses a single collection-status line.
///
/// Returns `None` for lines that do not describe a snapshot, including
/// snapshot lines whose date cannot be read.
///
/// # Examples
///
/// ```
/// use doublewrap::engine::{parse_snapshot_line, SnapshotKind};
///
/// let snapshot = parse_snapshot_line("Full Tue Jun 17 10:00:00 2014 1").unwrap();
/// assert_eq!(snapshot.kind, SnapshotKind::Full);
///
/// assert!(parse_snapshot_line("Chain start time: Tue Jun 17 10:00:00 2014").is_none());
/// ```
pub fn parse_snapshot_line(line: &str) -> Option<Snapshot> {
    let tokens: Vec<&str> = line.split_whitespace().collect();
    let kind = match tokens.first().copied() {
        Some(STATUS_TOKEN_FULL) => SnapshotKind::Full,
        Some(STATUS_TOKEN_INCREMENTAL) => SnapshotKind::Incremental,
        _ => return None,
    };
    if tokens.len() < 6 {
        debug!("Snapshot line without a complete date: {}", line);
        return None;
    }

    let date = tokens[1..6].join(" ");
    let naive = match NaiveDateTime::parse_from_str(&date, STATUS_DATE_FORMAT) {
        Ok(naive) => naive,
        Err(e) => {
            debug!("Unreadable snapshot date '{}': {}", date, e);
            return None;
        }
    };
    // Ambiguous wall-clock times (DST fold) resolve to the earlier instant.
    let time = Local.from_local_datetime(&naive).earliest()?;
    Some(Snapshot { kind, time })
}

/// Renders a snapshot time the way `--restore-time` accepts it.
pub fn restore_time_arg(time: &DateTime<Local>) -> String {
    time.timestamp().to_string()
}

impl Duplicity {
    /// Snapshots in the order the engine reports them.
    pub fn snapshots(&self) -> AppResult<Vec<Snapshot>> {
        let mut snapshots = Vec::new();
        for line in self.collection_status()? {
            if let Some(snapshot) = parse_snapshot_line(&line?) {
                snapshots.push(snapshot);
            }
        }
        Ok(snapshots)
    }

    /// Times of every snapshot, oldest first as reported by the engine.
    ///
    /// The order is not re-sorted; a time that does not advance is logged.
    pub fn chain_timestamps(&self) -> AppResult<Vec<DateTime<Local>>> {
        let times: Vec<DateTime<Local>> = self.snapshots()?.into_iter().map(|s| s.time).collect();
        for pair in times.windows(2) {
            if pair[1] <= pair[0] {
                warn!(
                    "Engine reported snapshot {} after {}; history will follow the reported order",
                    pair[1], pair[0]
                );
            }
        }
        Ok(times)
    }

    /// Whether the engine lists `path` in the snapshot at `time`.
    ///
    /// `path` must match the last column of the listing exactly, in the form
    /// the engine prints it (no leading `/` for duplicity).
    pub fn file_at_timestamp(&self, path: &str, time: &DateTime<Local>) -> AppResult<bool> {
        let mut lines = self.list_files(Some(&restore_time_arg(time)))?;
        for line in lines.by_ref() {
            if line?.split_whitespace().last() == Some(path) {
                lines.close()?;
                return Ok(true);
            }
        }
        Ok(false)
    }
}
