use std::fmt;
use std::time::Duration;

use tracing::{debug, info};

use crate::auth::Credentials;
use crate::config::ClientConfig;
use crate::error::Result;
use crate::models::{ApiInfo, HealthResponse};
use crate::resources::{Metadata, Reports, Scans};
use crate::transport::HttpTransport;

/// Entry point to the Garak detection API.
///
/// Owns the HTTP session and the resolved credentials; the resource facades
/// returned by [`scans`](Self::scans), [`metadata`](Self::metadata) and
/// [`reports`](Self::reports) borrow both.
pub struct GarakClient {
    transport: HttpTransport,
}

impl GarakClient {
    /// Resolve credentials and open an HTTP session.
    ///
    /// Fails with [`crate::GarakError::Authentication`] when no key is found
    /// and [`crate::GarakError::InvalidConfiguration`] when the key is malformed.
    pub fn new(config: ClientConfig) -> Result<Self> {
        let credentials = Credentials::resolve(config.api_key.as_deref())?;
        let transport = HttpTransport::new(&config, credentials)?;
        info!(
            base_url = transport.base_url(),
            key = %transport.credentials().key_prefix(),
            source = ?transport.credentials().source(),
            "garak client ready"
        );
        Ok(Self { transport })
    }

    /// [`ClientConfig::from_env`] followed by [`GarakClient::new`].
    pub fn from_env() -> Result<Self> {
        Self::new(ClientConfig::from_env())
    }

    pub fn scans(&self) -> Scans<'_> {
        Scans::new(&self.transport)
    }

    pub fn metadata(&self) -> Metadata<'_> {
        Metadata::new(&self.transport)
    }

    pub fn reports(&self) -> Reports<'_> {
        Reports::new(&self.transport)
    }

    pub fn base_url(&self) -> &str {
        self.transport.base_url()
    }

    pub fn timeout(&self) -> Duration {
        self.transport.timeout()
    }

    pub fn verify_ssl(&self) -> bool {
        self.transport.verify_ssl()
    }

    pub fn credentials(&self) -> &Credentials {
        self.transport.credentials()
    }

    pub async fn health_check(&self) -> Result<HealthResponse> {
        self.metadata().health_check().await
    }

    pub async fn api_info(&self) -> Result<ApiInfo> {
        self.metadata().api_info().await
    }

    /// Release the HTTP session. Safe to call more than once; later requests
    /// fail with [`crate::GarakError::InvalidConfiguration`].
    pub fn close(&self) {
        if self.transport.close() {
            debug!("http session closed");
        }
    }

    pub fn is_closed(&self) -> bool {
        self.transport.is_closed()
    }
}

impl fmt::Debug for GarakClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GarakClient")
            .field("base_url", &self.base_url())
            .field("api_key", &self.credentials().key_prefix())
            .field("closed", &self.is_closed())
            .finish()
    }
}
