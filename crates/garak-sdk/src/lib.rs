//! Async client for the Garak LLM vulnerability-scanning service.
//!
//! ```no_run
//! use garak_sdk::{ClientConfig, CreateScanRequest, GarakClient, WaitOptions};
//!
//! # async fn run() -> garak_sdk::Result<()> {
//! let client = GarakClient::new(ClientConfig::from_env())?;
//! let request = CreateScanRequest::new("openai", "gpt-4")
//!     .probe_categories(["jailbreak", "harmful"]);
//! let scan = client.scans().create(&request).await?;
//! let finished = client
//!     .scans()
//!     .wait_for_completion(scan.id(), WaitOptions::default(), None)
//!     .await?;
//! let results = client.scans().results(finished.id()).await?;
//! println!("security score: {:?}", results.security_score);
//! # Ok(())
//! # }
//! ```

pub mod auth;
pub mod client;
pub mod config;
pub mod error;
pub mod lifecycle;
pub mod models;
pub mod resources;
pub mod transport;

pub use auth::{validate_api_key, Credentials, KeySource};
pub use client::GarakClient;
pub use config::ClientConfig;
pub use error::{GarakError, RawResponse, Result};
pub use lifecycle::{wait_for_completion, ProgressHandler, ScanStatusSource, WaitOptions};
pub use models::*;
pub use resources::{Metadata, Reports, Scans};
