use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use crate::errors::IndexError;

/// Fiscal quarter of a year, as laid out in the EDGAR full-index tree
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Quarter {
    Q1,
    Q2,
    Q3,
    Q4,
}

impl Quarter {
    pub const ALL: [Quarter; 4] = [Quarter::Q1, Quarter::Q2, Quarter::Q3, Quarter::Q4];

    /// Path segment used by the remote index tree and by fragment file names
    pub fn label(&self) -> &'static str {
        match self {
            Quarter::Q1 => "QTR1",
            Quarter::Q2 => "QTR2",
            Quarter::Q3 => "QTR3",
            Quarter::Q4 => "QTR4",
        }
    }

    /// Calendar quarter containing `month` (1-12)
    pub fn from_month(month: u32) -> Option<Quarter> {
        match month {
            1..=3 => Some(Quarter::Q1),
            4..=6 => Some(Quarter::Q2),
            7..=9 => Some(Quarter::Q3),
            10..=12 => Some(Quarter::Q4),
            _ => None,
        }
    }

    pub fn from_label(label: &str) -> Option<Quarter> {
        Quarter::ALL.into_iter().find(|q| q.label() == label)
    }
}

impl fmt::Display for Quarter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// One (year, quarter) unit of work pointing at a remote index archive
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Endpoint {
    pub year: i32,
    pub quarter: Quarter,
    pub locator: String,
}

impl Endpoint {
    pub const ARCHIVE_NAME: &'static str = "master.zip";

    pub fn new(base_url: &str, year: i32, quarter: Quarter) -> Self {
        let locator = format!(
            "{}/{}/{}/{}",
            base_url.trim_end_matches('/'),
            year,
            quarter.label(),
            Self::ARCHIVE_NAME
        );
        Self {
            year,
            quarter,
            locator,
        }
    }

    /// Local file the extracted index is written to, e.g. `2021-QTR1.tsv`
    pub fn fragment_file_name(&self) -> String {
        format!("{}-{}.tsv", self.year, self.quarter.label())
    }
}

/// Inverse of [`Endpoint::fragment_file_name`]. Any other file name yields `None`.
pub fn parse_fragment_name(file_name: &str) -> Option<(i32, Quarter)> {
    let stem = file_name.strip_suffix(".tsv")?;
    let (year, label) = stem.rsplit_once('-')?;
    let digits = year.strip_prefix('-').unwrap_or(year);
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    Some((year.parse().ok()?, Quarter::from_label(label)?))
}

/// Result reported by a single fetch-extract worker
#[derive(Debug)]
pub struct FetchOutcome {
    pub locator: String,
    /// Transport status, if a response was received at all
    pub status: Option<StatusCode>,
    /// Bytes written to the fragment file; `None` if the archive held no index entry
    pub extracted_bytes: Option<u64>,
    pub error: Option<IndexError>,
}

impl FetchOutcome {
    pub fn new(locator: impl Into<String>) -> Self {
        Self {
            locator: locator.into(),
            status: None,
            extracted_bytes: None,
            error: None,
        }
    }

    pub fn failed(locator: impl Into<String>, error: IndexError) -> Self {
        Self {
            error: Some(error),
            ..Self::new(locator)
        }
    }

    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }
}

impl fmt::Display for FetchOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let status = self
            .status
            .map(|s| s.to_string())
            .unwrap_or_default();
        match (&self.error, self.extracted_bytes) {
            (Some(e), _) => write!(f, "{} [{}] failed: {}", self.locator, status, e),
            (None, Some(bytes)) => {
                write!(f, "{} [{}] extracted {} bytes", self.locator, status, bytes)
            }
            (None, None) => write!(f, "{} [{}] no index entry in archive", self.locator, status),
        }
    }
}

/// How the consolidated output is opened at the start of a merge
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MergeMode {
    /// Start from an empty `master.tsv`; re-runs produce identical output
    #[default]
    Truncate,
    /// Append to an existing `master.tsv`; re-runs duplicate records
    Append,
}

impl FromStr for MergeMode {
    type Err = IndexError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "truncate" => Ok(MergeMode::Truncate),
            "append" => Ok(MergeMode::Append),
            other => Err(IndexError::Config(format!(
                "Unsupported merge mode: {}. Supported modes: truncate, append",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeSummary {
    pub output: PathBuf,
    pub fragments: usize,
    pub lines: u64,
}
