use async_trait::async_trait;
use reqwest::Method;
use serde::Deserialize;
use tracing::{info, instrument, warn};

use super::{not_found_as, path_segment};
use crate::error::{GarakError, RawResponse, Result};
use crate::lifecycle::{self, ProgressHandler, ScanStatusSource, WaitOptions};
use crate::models::{
    CancelResponse, CreateScanRequest, ListScansQuery, QuotaResponse, Scan, ScanList,
    ScanMetadata, ScanResults, ScanStatusResponse, UpdateScanRequest,
};
use crate::transport::{decode_body, HttpTransport};

const SCANS_PATH: &str = "/api/v1/scans";

/// Create and manage scans.
#[derive(Clone, Copy)]
pub struct Scans<'a> {
    transport: &'a HttpTransport,
}

impl<'a> Scans<'a> {
    pub(crate) fn new(transport: &'a HttpTransport) -> Self {
        Self { transport }
    }

    /// Submit a new scan.
    ///
    /// The service reports an exhausted quota with a 2xx status and a
    /// `needs_subscription` flag rather than an error status, so the body is
    /// inspected before it is trusted as a created scan.
    #[instrument(skip(self, request), fields(generator = %request.generator, model = %request.model_name))]
    pub async fn create(&self, request: &CreateScanRequest) -> Result<Scan> {
        request.validate()?;
        let response = self
            .transport
            .send(Method::POST, SCANS_PATH, |req| req.json(request))
            .await?;
        let status = response.status().as_u16();
        let body = response.text().await.map_err(|err| {
            GarakError::network(format!("failed to read response body: {err}"), Some(err))
        })?;

        let payload: serde_json::Value = decode_body(status, &body)?;
        if needs_subscription(&payload) {
            warn!("scan creation refused: subscription required");
            return Err(GarakError::quota_exceeded(
                "Scan quota exceeded: a subscription is required to create more scans",
            )
            .with_response(RawResponse::new(status, body)));
        }

        let created: CreateScanResponse = decode_body(status, &body)?;
        info!(
            scan_id = %created.scan_id,
            free_tier = created.free_tier.unwrap_or(false),
            remaining_free_scans = ?created.remaining_free_scans,
            "scan created"
        );
        Ok(Scan::from(created.metadata))
    }

    #[instrument(skip(self))]
    pub async fn list(&self, query: &ListScansQuery) -> Result<ScanList> {
        self.transport.get_json_with_query(SCANS_PATH, query).await
    }

    #[instrument(skip(self))]
    pub async fn get(&self, scan_id: &str) -> Result<Scan> {
        let id = path_segment("scan id", scan_id)?;
        self.transport
            .get_json(&format!("{SCANS_PATH}/{id}"))
            .await
            .map_err(not_found_as(format!("Scan {id} not found")))
    }

    /// Current lifecycle status, optionally with the tail of the scan's output log.
    #[instrument(skip(self))]
    pub async fn status(&self, scan_id: &str, include_output: bool) -> Result<ScanStatusResponse> {
        let id = path_segment("scan id", scan_id)?;
        let path = format!("{SCANS_PATH}/{id}/status");
        let result: Result<ScanStatusResponse> = if include_output {
            self.transport
                .get_json_with_query(&path, &[("include_output", "true")])
                .await
        } else {
            self.transport.get_json(&path).await
        };
        result.map_err(not_found_as(format!("Scan {id} not found")))
    }

    #[instrument(skip(self))]
    pub async fn results(&self, scan_id: &str) -> Result<ScanResults> {
        let id = path_segment("scan id", scan_id)?;
        self.transport
            .get_json(&format!("{SCANS_PATH}/{id}/results"))
            .await
            .map_err(not_found_as(format!("Results for scan {id} not found")))
    }

    #[instrument(skip(self, update))]
    pub async fn update(&self, scan_id: &str, update: &UpdateScanRequest) -> Result<Scan> {
        let id = path_segment("scan id", scan_id)?;
        if update.is_empty() {
            return Err(GarakError::scan_validation(
                "update must set at least one of name or description",
            ));
        }
        let updated: MetadataEnvelope = self
            .transport
            .patch_json(&format!("{SCANS_PATH}/{id}"), update)
            .await
            .map_err(not_found_as(format!("Scan {id} not found")))?;
        Ok(Scan::from(updated.metadata))
    }

    /// Ask the service to stop a scan. Cancellation completes asynchronously.
    #[instrument(skip(self))]
    pub async fn cancel(&self, scan_id: &str) -> Result<CancelResponse> {
        let id = path_segment("scan id", scan_id)?;
        let response: CancelResponse = self
            .transport
            .delete_json(&format!("{SCANS_PATH}/{id}"))
            .await
            .map_err(not_found_as(format!("Scan {id} not found")))?;
        info!(scan_id = %id, status = %response.status, "cancellation requested");
        Ok(response)
    }

    #[instrument(skip(self))]
    pub async fn quota(&self) -> Result<QuotaResponse> {
        self.transport
            .get_json(&format!("{SCANS_PATH}/quota"))
            .await
    }

    /// Poll until the scan finishes; see [`lifecycle::wait_for_completion`].
    pub async fn wait_for_completion(
        &self,
        scan_id: &str,
        options: WaitOptions,
        on_progress: Option<&mut ProgressHandler<'_>>,
    ) -> Result<Scan> {
        lifecycle::wait_for_completion(self, scan_id, options, on_progress).await
    }
}

#[async_trait]
impl<'a> ScanStatusSource for Scans<'a> {
    async fn poll_status(&self, scan_id: &str) -> Result<ScanStatusResponse> {
        self.status(scan_id, false).await
    }

    async fn fetch_scan(&self, scan_id: &str) -> Result<Scan> {
        self.get(scan_id).await
    }
}

fn needs_subscription(payload: &serde_json::Value) -> bool {
    payload["needs_subscription"].as_bool().unwrap_or(false)
        || payload["metadata"]["needs_subscription"]
            .as_bool()
            .unwrap_or(false)
}

#[derive(Deserialize)]
struct CreateScanResponse {
    scan_id: String,
    metadata: ScanMetadata,
    #[serde(default)]
    free_tier: Option<bool>,
    #[serde(default)]
    remaining_free_scans: Option<u32>,
}

#[derive(Deserialize)]
struct MetadataEnvelope {
    metadata: ScanMetadata,
}
