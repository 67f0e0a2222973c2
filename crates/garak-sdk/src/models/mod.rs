//! Typed records for every payload the service sends or accepts.

mod metadata;
mod report;
mod scan;

pub use metadata::{AllMetadata, ApiInfo, GeneratorInfo, HealthResponse, ProbeCategory, ProbeInfo};
pub use report::{ReportInfo, ReportType};
pub use scan::{
    CancelResponse, CreateScanRequest, ListScansQuery, OutputMetadata, PassFailCounts,
    QuotaResponse, QuotaStatus, Scan, ScanList, ScanMetadata, ScanProgress, ScanResults,
    ScanStatus, ScanStatusResponse, UpdateScanRequest,
};
