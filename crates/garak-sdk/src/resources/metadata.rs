use serde::Deserialize;
use tracing::instrument;

use super::path_segment;
use crate::error::Result;
use crate::models::{AllMetadata, ApiInfo, GeneratorInfo, HealthResponse, ProbeCategory, ProbeInfo};
use crate::transport::HttpTransport;

/// Discovery endpoints: generators, models, probes, service health.
#[derive(Clone, Copy)]
pub struct Metadata<'a> {
    transport: &'a HttpTransport,
}

impl<'a> Metadata<'a> {
    pub(crate) fn new(transport: &'a HttpTransport) -> Self {
        Self { transport }
    }

    #[instrument(skip(self))]
    pub async fn list_generators(&self) -> Result<Vec<GeneratorInfo>> {
        let list: GeneratorList = self.transport.get_json("/api/v1/generators").await?;
        Ok(list.generators)
    }

    #[instrument(skip(self))]
    pub async fn get_generator(&self, name: &str) -> Result<GeneratorInfo> {
        let name = path_segment("generator", name)?;
        self.transport
            .get_json(&format!("/api/v1/generators/{name}"))
            .await
    }

    #[instrument(skip(self))]
    pub async fn list_models(&self, generator: &str) -> Result<Vec<String>> {
        let generator = path_segment("generator", generator)?;
        let list: ModelList = self
            .transport
            .get_json(&format!("/api/v1/generators/{generator}/models"))
            .await?;
        Ok(list.models)
    }

    #[instrument(skip(self))]
    pub async fn list_probe_categories(&self) -> Result<Vec<ProbeCategory>> {
        let list: CategoryList = self.transport.get_json("/api/v1/probes").await?;
        Ok(list.categories)
    }

    #[instrument(skip(self))]
    pub async fn list_probes(&self, category: &str) -> Result<Vec<ProbeInfo>> {
        let category = path_segment("probe category", category)?;
        let list: ProbeList = self
            .transport
            .get_json(&format!("/api/v1/probes/{category}"))
            .await?;
        Ok(list.probes)
    }

    #[instrument(skip(self))]
    pub async fn health_check(&self) -> Result<HealthResponse> {
        self.transport.get_json("/api/v1/health").await
    }

    #[instrument(skip(self))]
    pub async fn api_info(&self) -> Result<ApiInfo> {
        self.transport.get_json("/api/v1/info").await
    }

    /// Generators, probe categories and API info, fetched one after another.
    pub async fn all_metadata(&self) -> Result<AllMetadata> {
        let generators = self.list_generators().await?;
        let probe_categories = self.list_probe_categories().await?;
        let api_info = self.api_info().await?;
        Ok(AllMetadata {
            generators,
            probe_categories,
            api_info,
        })
    }
}

#[derive(Deserialize)]
struct GeneratorList {
    generators: Vec<GeneratorInfo>,
}

#[derive(Deserialize)]
struct ModelList {
    models: Vec<String>,
}

#[derive(Deserialize)]
struct CategoryList {
    categories: Vec<ProbeCategory>,
}

#[derive(Deserialize)]
struct ProbeList {
    probes: Vec<ProbeInfo>,
}
