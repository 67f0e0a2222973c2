use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use super::ReportInfo;
use crate::error::{GarakError, Result};

/// Lifecycle state of a scan. Moves forward only; the last three are final.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScanStatus {
    Pending,
    Running,
    Completed,
    Failed,
    Cancelled,
}

impl ScanStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Cancelled)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for ScanStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Work counters reported while a scan runs.
///
/// The service uses two spellings for the same fields and may send both;
/// the long names win when both are present.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "RawProgress")]
pub struct ScanProgress {
    pub completed_items: u64,
    pub total_items: u64,
    pub progress_percent: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

#[derive(Deserialize)]
struct RawProgress {
    #[serde(default)]
    completed_items: Option<u64>,
    #[serde(default)]
    current: Option<u64>,
    #[serde(default)]
    total_items: Option<u64>,
    #[serde(default)]
    total: Option<u64>,
    #[serde(default)]
    progress_percent: Option<f64>,
    #[serde(default)]
    percentage: Option<f64>,
    #[serde(default)]
    message: Option<String>,
}

impl From<RawProgress> for ScanProgress {
    fn from(raw: RawProgress) -> Self {
        Self {
            completed_items: raw.completed_items.or(raw.current).unwrap_or(0),
            total_items: raw.total_items.or(raw.total).unwrap_or(0),
            progress_percent: raw.progress_percent.or(raw.percentage).unwrap_or(0.0),
            message: raw.message,
        }
    }
}

/// Snapshot of a scan's configuration and lifecycle timestamps.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScanMetadata {
    pub scan_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub status: ScanStatus,
    pub generator: String,
    pub model_name: String,
    #[serde(default)]
    pub probe_categories: Vec<String>,
    #[serde(default)]
    pub probes: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub progress: Option<ScanProgress>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_email: Option<String>,
    #[serde(default)]
    pub use_free_tier: bool,
    #[serde(default)]
    pub needs_subscription: bool,
}

/// Size of the log window returned alongside a status poll.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputMetadata {
    #[serde(default)]
    pub total_lines: u64,
    #[serde(default)]
    pub start_line: u64,
    #[serde(default)]
    pub returned_lines: u64,
}

/// Result of a single status poll.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScanStatusResponse {
    pub scan_id: String,
    pub status: ScanStatus,
    #[serde(default)]
    pub progress: ScanProgress,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_metadata: Option<OutputMetadata>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PassFailCounts {
    #[serde(default)]
    pub passed: u64,
    #[serde(default)]
    pub failed: u64,
}

/// Aggregate outcome of a finished scan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScanResults {
    pub scan_id: String,
    #[serde(default)]
    pub security_score: Option<f64>,
    #[serde(default)]
    pub total_prompts: u64,
    #[serde(default)]
    pub passed_prompts: u64,
    #[serde(default)]
    pub failed_prompts: u64,
    #[serde(default)]
    pub detector_summary: BTreeMap<String, PassFailCounts>,
    #[serde(default)]
    pub probe_summary: BTreeMap<String, PassFailCounts>,
}

/// Full scan record: metadata plus whatever results and reports exist so far.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scan {
    pub metadata: ScanMetadata,
    #[serde(default)]
    pub results: Option<ScanResults>,
    #[serde(default)]
    pub reports: Vec<ReportInfo>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_log: Option<String>,
}

impl Scan {
    pub fn id(&self) -> &str {
        &self.metadata.scan_id
    }

    pub fn status(&self) -> ScanStatus {
        self.metadata.status
    }
}

impl From<ScanMetadata> for Scan {
    fn from(metadata: ScanMetadata) -> Self {
        Self {
            metadata,
            results: None,
            reports: Vec::new(),
            output_log: None,
        }
    }
}

/// Body of `POST /api/v1/scans`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CreateScanRequest {
    pub generator: String,
    pub model_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub probe_categories: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub probes: Vec<String>,
    pub parallel_attempts: u32,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub api_keys: BTreeMap<String, String>,
    pub use_free_tier: bool,
    /// Endpoint description for the `rest` generator, passed through untouched.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rest_config: Option<serde_json::Value>,
}

impl CreateScanRequest {
    pub fn new(generator: impl Into<String>, model_name: impl Into<String>) -> Self {
        Self {
            generator: generator.into(),
            model_name: model_name.into(),
            name: None,
            description: None,
            probe_categories: Vec::new(),
            probes: Vec::new(),
            parallel_attempts: 1,
            api_keys: BTreeMap::new(),
            use_free_tier: false,
            rest_config: None,
        }
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn probe_categories<I, S>(mut self, categories: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.probe_categories = categories.into_iter().map(Into::into).collect();
        self
    }

    pub fn probes<I, S>(mut self, probes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.probes = probes.into_iter().map(Into::into).collect();
        self
    }

    pub fn parallel_attempts(mut self, attempts: u32) -> Self {
        self.parallel_attempts = attempts;
        self
    }

    pub fn api_key(mut self, env_name: impl Into<String>, value: impl Into<String>) -> Self {
        self.api_keys.insert(env_name.into(), value.into());
        self
    }

    pub fn use_free_tier(mut self, free: bool) -> Self {
        self.use_free_tier = free;
        self
    }

    pub fn rest_config(mut self, config: serde_json::Value) -> Self {
        self.rest_config = Some(config);
        self
    }

    /// Reject requests the service would refuse anyway.
    pub fn validate(&self) -> Result<()> {
        if self.generator.trim().is_empty() {
            return Err(GarakError::scan_validation("generator must not be blank"));
        }
        if self.model_name.trim().is_empty() {
            return Err(GarakError::scan_validation("model_name must not be blank"));
        }
        if self.parallel_attempts == 0 {
            return Err(GarakError::scan_validation(
                "parallel_attempts must be at least 1",
            ));
        }
        Ok(())
    }
}

/// Body of `PATCH /api/v1/scans/{id}`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct UpdateScanRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl UpdateScanRequest {
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.description.is_none()
    }
}

/// Query parameters for `GET /api/v1/scans`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ListScansQuery {
    pub page: u32,
    pub per_page: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<ScanStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub search: Option<String>,
}

impl Default for ListScansQuery {
    fn default() -> Self {
        Self {
            page: 1,
            per_page: 20,
            status: None,
            search: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScanList {
    #[serde(default)]
    pub scans: Vec<ScanMetadata>,
    #[serde(default)]
    pub total: u64,
    #[serde(default = "first_page")]
    pub page: u32,
    #[serde(default)]
    pub per_page: u32,
    #[serde(default)]
    pub has_next: bool,
}

fn first_page() -> u32 {
    1
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CancelResponse {
    #[serde(default)]
    pub message: Option<String>,
    pub status: String,
}

/// Usage counters for the calling account.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct QuotaStatus {
    pub total_scans_used: u32,
    pub total_scans_limit: u32,
    pub remaining_total_scans: u32,
    pub free_scans_used: u32,
    pub free_scans_limit: u32,
    pub remaining_free_scans: u32,
    pub can_use_free_tier: bool,
    pub can_use_paid_tier: bool,
    pub user_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuotaResponse {
    pub quota_status: QuotaStatus,
    #[serde(default)]
    pub message: Option<String>,
}
