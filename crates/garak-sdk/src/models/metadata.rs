use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// A target model family the service can scan (`openai`, `anthropic`, `rest`, ...).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneratorInfo {
    pub name: String,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub requires_api_key: bool,
    /// Environment variable name the service expects the target key under.
    #[serde(default)]
    pub api_key_env: Option<String>,
    #[serde(default)]
    pub supported_models: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProbeInfo {
    pub name: String,
    #[serde(default)]
    pub display_name: Option<String>,
    pub category: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub recommended_detectors: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProbeCategory {
    pub name: String,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub probes: Vec<ProbeInfo>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    #[serde(default)]
    pub timestamp: Option<String>,
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub services: BTreeMap<String, String>,
}

impl HealthResponse {
    pub fn is_healthy(&self) -> bool {
        self.status.eq_ignore_ascii_case("healthy")
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiInfo {
    pub api_version: String,
    #[serde(default)]
    pub service: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub documentation_url: Option<String>,
    #[serde(default)]
    pub capabilities: serde_json::Value,
    #[serde(default)]
    pub supported_generators: Vec<String>,
    #[serde(default)]
    pub supported_probe_categories: Vec<String>,
}

/// Everything the discovery endpoints expose, fetched in one go.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AllMetadata {
    pub generators: Vec<GeneratorInfo>,
    pub probe_categories: Vec<ProbeCategory>,
    pub api_info: ApiInfo,
}
