use std::fmt;

use hcs_backend::{Backend, Entry, RequestContext};
use serde::{Deserialize, Serialize};

use crate::error::{NomadError, NomadResult};

/// Storage key of the access configuration.
pub const CONFIG_ACCESS_KEY: &str = "config/access";

/// How the engine reaches the Nomad cluster.
///
/// Missing JSON fields decode to their defaults so entries written by older
/// versions remain readable.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AccessConfig {
    pub address: String,
    pub token: String,
    pub max_token_name_length: i64,
    pub ca_cert: String,
    pub client_cert: String,
    pub client_key: String,
}

// The token and client key are credentials.
impl fmt::Debug for AccessConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AccessConfig")
            .field("address", &self.address)
            .field("token", &"<redacted>")
            .field("max_token_name_length", &self.max_token_name_length)
            .field("has_ca_cert", &!self.ca_cert.is_empty())
            .field("has_client_cert", &!self.client_cert.is_empty())
            .field("client_key", &"<redacted>")
            .finish()
    }
}

/// Fields supplied on a write. `None` leaves the stored value untouched,
/// except `max_token_name_length`, which resets to 0 when not supplied.
#[derive(Clone, Debug, Default)]
pub struct AccessConfigUpdate {
    pub address: Option<String>,
    pub token: Option<String>,
    pub max_token_name_length: Option<i64>,
    pub ca_cert: Option<String>,
    pub client_cert: Option<String>,
    pub client_key: Option<String>,
}

impl AccessConfigUpdate {
    fn apply(self, config: &mut AccessConfig) {
        if let Some(address) = self.address {
            config.address = address;
        }
        if let Some(token) = self.token {
            config.token = token;
        }
        if let Some(ca_cert) = self.ca_cert {
            config.ca_cert = ca_cert;
        }
        if let Some(client_cert) = self.client_cert {
            config.client_cert = client_cert;
        }
        if let Some(client_key) = self.client_key {
            config.client_key = client_key;
        }
        config.max_token_name_length = self.max_token_name_length.unwrap_or(0);
    }
}

/// What a read returns. Credentials are never echoed back.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct AccessConfigView {
    pub address: String,
    pub max_token_name_length: i64,
}

impl From<&AccessConfig> for AccessConfigView {
    fn from(config: &AccessConfig) -> Self {
        Self {
            address: config.address.clone(),
            max_token_name_length: config.max_token_name_length,
        }
    }
}

/// Reads and writes the access configuration through a [`Backend`].
#[derive(Debug)]
pub struct AccessConfigStore<B> {
    backend: B,
}

impl<B: Backend> AccessConfigStore<B> {
    pub fn new(backend: B) -> Self {
        Self { backend }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// The full stored configuration, or `None` if none has been written.
    pub async fn load(&self, ctx: &RequestContext) -> NomadResult<Option<AccessConfig>> {
        let Some(entry) = self.backend.get(ctx, CONFIG_ACCESS_KEY).await? else {
            return Ok(None);
        };
        let config = serde_json::from_slice(&entry.value).map_err(NomadError::Decode)?;
        Ok(Some(config))
    }

    /// The externally visible part of the configuration.
    pub async fn read(&self, ctx: &RequestContext) -> NomadResult<Option<AccessConfigView>> {
        Ok(self.load(ctx).await?.as_ref().map(AccessConfigView::from))
    }

    /// Merge `update` into the stored configuration, creating it if absent.
    pub async fn write(&self, ctx: &RequestContext, update: AccessConfigUpdate) -> NomadResult<()> {
        let mut config = self.load(ctx).await?.unwrap_or_default();
        update.apply(&mut config);

        let value = serde_json::to_vec(&config).map_err(NomadError::Encode)?;
        self.backend
            .put(ctx, &Entry::new(CONFIG_ACCESS_KEY, value))
            .await?;
        tracing::info!(address = %config.address, "nomad access configuration written");
        Ok(())
    }

    pub async fn delete(&self, ctx: &RequestContext) -> NomadResult<()> {
        self.backend.delete(ctx, CONFIG_ACCESS_KEY).await?;
        tracing::info!("nomad access configuration deleted");
        Ok(())
    }

    /// Whether a configuration has been written. A stored entry that does not
    /// decode is an error, not absence.
    pub async fn exists(&self, ctx: &RequestContext) -> NomadResult<bool> {
        Ok(self.load(ctx).await?.is_some())
    }
}
