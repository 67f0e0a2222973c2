use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Report formats the service renders for a finished scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportType {
    Json,
    Jsonl,
    Html,
    Hits,
}

impl ReportType {
    pub const ALL: [ReportType; 4] = [Self::Json, Self::Jsonl, Self::Html, Self::Hits];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Json => "json",
            Self::Jsonl => "jsonl",
            Self::Html => "html",
            Self::Hits => "hits",
        }
    }

    /// File name suffix used when saving this report next to others of the same scan.
    pub fn file_suffix(self) -> &'static str {
        match self {
            Self::Json => "report.json",
            Self::Jsonl => "report.jsonl",
            Self::Html => "report.html",
            Self::Hits => "hitlog.jsonl",
        }
    }
}

impl fmt::Display for ReportType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ReportType {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str().eq_ignore_ascii_case(value.trim()))
            .ok_or_else(|| {
                format!("unknown report type `{value}` (expected json, jsonl, html or hits)")
            })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportInfo {
    #[serde(rename = "type")]
    pub report_type: ReportType,
    #[serde(default)]
    pub file_path: Option<String>,
    #[serde(default)]
    pub file_size: Option<u64>,
    #[serde(default)]
    pub available: bool,
}
