use std::path::{Path, PathBuf};

use serde::Deserialize;
use tokio::fs;
use tracing::{debug, info, instrument};

use super::{not_found_as, path_segment};
use crate::error::{GarakError, Result};
use crate::models::{ReportInfo, ReportType};
use crate::transport::HttpTransport;

/// Listing and downloading the report files a finished scan produces.
#[derive(Clone, Copy)]
pub struct Reports<'a> {
    transport: &'a HttpTransport,
}

impl<'a> Reports<'a> {
    pub(crate) fn new(transport: &'a HttpTransport) -> Self {
        Self { transport }
    }

    #[instrument(skip(self))]
    pub async fn list(&self, scan_id: &str) -> Result<Vec<ReportInfo>> {
        let id = path_segment("scan id", scan_id)?;
        let list: ReportList = self
            .transport
            .get_json(&format!("/api/v1/scans/{id}/reports"))
            .await
            .map_err(not_found_as(format!("Scan {id} not found")))?;
        Ok(list.reports)
    }

    /// Absolute download URL for one report.
    pub fn report_url(&self, scan_id: &str, report_type: ReportType) -> String {
        self.transport
            .build_url(&format!("/api/v1/scans/{}/reports/{report_type}", scan_id.trim()))
    }

    /// Save one report to `path`. Existing files are only replaced when `overwrite` is set.
    #[instrument(skip(self, path), fields(path = %path.as_ref().display()))]
    pub async fn download(
        &self,
        scan_id: &str,
        report_type: ReportType,
        path: impl AsRef<Path>,
        overwrite: bool,
    ) -> Result<PathBuf> {
        let path = path.as_ref();
        let id = path_segment("scan id", scan_id)?;
        if !overwrite {
            let exists = fs::try_exists(path).await.map_err(|err| {
                GarakError::invalid_configuration(format!(
                    "cannot check whether {} exists: {err}",
                    path.display()
                ))
            })?;
            if exists {
                return Err(GarakError::invalid_configuration(format!(
                    "{} already exists; pass overwrite to replace it",
                    path.display()
                )));
            }
        }

        let bytes = self
            .transport
            .get_bytes(&format!("/api/v1/scans/{id}/reports/{report_type}"))
            .await
            .map_err(not_found_as(format!(
                "Report {report_type} for scan {id} not found"
            )))?;

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).await.map_err(|err| {
                GarakError::invalid_configuration(format!(
                    "cannot create directory {}: {err}",
                    parent.display()
                ))
            })?;
        }
        fs::write(path, &bytes).await.map_err(|err| {
            GarakError::invalid_configuration(format!("cannot write {}: {err}", path.display()))
        })?;
        debug!(bytes = bytes.len(), "report written");
        Ok(path.to_path_buf())
    }

    /// Download every available report (optionally only `types`) into `dir`
    /// as `<scan_id>.<suffix>`.
    #[instrument(skip(self, dir, types), fields(dir = %dir.as_ref().display()))]
    pub async fn download_all(
        &self,
        scan_id: &str,
        dir: impl AsRef<Path>,
        types: Option<&[ReportType]>,
        overwrite: bool,
    ) -> Result<Vec<PathBuf>> {
        let dir = dir.as_ref();
        let id = path_segment("scan id", scan_id)?;
        let wanted: Vec<ReportType> = self
            .list(id)
            .await?
            .into_iter()
            .filter(|report| report.available)
            .map(|report| report.report_type)
            .filter(|kind| types.map_or(true, |types| types.contains(kind)))
            .collect();

        let mut written = Vec::with_capacity(wanted.len());
        for kind in wanted {
            let target = dir.join(format!("{id}.{}", kind.file_suffix()));
            written.push(self.download(id, kind, target, overwrite).await?);
        }
        info!(scan_id = %id, count = written.len(), "reports downloaded");
        Ok(written)
    }
}

#[derive(Deserialize)]
struct ReportList {
    #[serde(default)]
    reports: Vec<ReportInfo>,
}
