// ABOUTME: Timestamped backup directory names.
// ABOUTME: Format is <base>-backup-<YYYYMMDDTHHMMSSZ>[-N], ordered oldest to newest.

use chrono::{DateTime, NaiveDateTime, Utc};
use std::cmp::Ordering;
use std::fmt;
use thiserror::Error;

const TIMESTAMP_FORMAT: &str = "%Y%m%dT%H%M%SZ";
const TIMESTAMP_LEN: usize = 16;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseBackupNameError {
    #[error("'{0}' is not a backup of '{1}'")]
    WrongBase(String, String),

    #[error("invalid backup timestamp in '{0}'")]
    BadTimestamp(String),

    #[error("invalid backup sequence suffix in '{0}'")]
    BadSequence(String),
}

/// Name of a backup directory created from a former installation.
///
/// The sequence number disambiguates backups taken within the same second;
/// the first backup of a second has `seq == 1` and no suffix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackupName {
    base: String,
    taken_at: DateTime<Utc>,
    seq: u32,
}

impl BackupName {
    pub fn new(base: &str, taken_at: DateTime<Utc>, seq: u32) -> Self {
        Self {
            base: base.to_string(),
            // Sub-second precision is not representable in the name.
            taken_at: DateTime::from_timestamp(taken_at.timestamp(), 0).unwrap_or(taken_at),
            seq: seq.max(1),
        }
    }

    /// Parse a directory name as a backup of `base`.
    pub fn parse(base: &str, name: &str) -> Result<Self, ParseBackupNameError> {
        let prefix = format!("{base}-backup-");
        let rest = name
            .strip_prefix(&prefix)
            .ok_or_else(|| ParseBackupNameError::WrongBase(name.to_string(), base.to_string()))?;

        if rest.len() < TIMESTAMP_LEN || !rest.is_char_boundary(TIMESTAMP_LEN) {
            return Err(ParseBackupNameError::BadTimestamp(name.to_string()));
        }
        let (stamp, suffix) = rest.split_at(TIMESTAMP_LEN);

        let taken_at = NaiveDateTime::parse_from_str(stamp, TIMESTAMP_FORMAT)
            .map_err(|_| ParseBackupNameError::BadTimestamp(name.to_string()))?
            .and_utc();

        let seq = match suffix {
            "" => 1,
            s => s
                .strip_prefix('-')
                .and_then(|n| n.parse::<u32>().ok())
                .filter(|n| *n >= 2)
                .ok_or_else(|| ParseBackupNameError::BadSequence(name.to_string()))?,
        };

        Ok(Self {
            base: base.to_string(),
            taken_at,
            seq,
        })
    }

    pub fn base(&self) -> &str {
        &self.base
    }

    pub fn taken_at(&self) -> DateTime<Utc> {
        self.taken_at
    }

    pub fn seq(&self) -> u32 {
        self.seq
    }

    /// The next candidate name for the same second.
    pub fn next_seq(&self) -> Self {
        Self {
            base: self.base.clone(),
            taken_at: self.taken_at,
            seq: self.seq + 1,
        }
    }
}

impl fmt::Display for BackupName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}-backup-{}",
            self.base,
            self.taken_at.format(TIMESTAMP_FORMAT)
        )?;
        if self.seq > 1 {
            write!(f, "-{}", self.seq)?;
        }
        Ok(())
    }
}

impl PartialOrd for BackupName {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for BackupName {
    fn cmp(&self, other: &Self) -> Ordering {
        self.taken_at
            .cmp(&other.taken_at)
            .then(self.seq.cmp(&other.seq))
            .then_with(|| self.base.cmp(&other.base))
    }
}
