//! The gateway: the authenticated operation surface over channels.
//!
//! Every operation runs the same shape: authenticate the caller against
//! the user directory, load the channel, run the channel's own access
//! checks, mutate, persist. The gateway is transport-agnostic; an HTTP or
//! socket front end maps requests onto these methods and renders
//! [`HavenError::body`] for rejections.

use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, instrument};

use haven_core::{apply_mode_batch, ChannelId, ChannelModes, Handle, ModeBatch, User};
use haven_store::ChannelStore;
use haven_verify::{Resolver, UpdateVerifier};

use crate::auth::Credentials;
use crate::counters::Counters;
use crate::error::{HavenError, Result};
use crate::users::UserDirectory;

/// Static gateway configuration.
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// Stable network identifier, mixed into identity derivation records.
    pub network_id: String,
    /// Human-readable network name, reported to clients on registration.
    pub network_name: String,
    /// Salt for handle and password-hash derivation.
    pub salt: String,
    /// Routing endpoints handed to clients for relay attachment.
    pub routing: Vec<String>,
}

/// Registration response.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct RegisterResponse {
    #[serde(rename = "networkId")]
    pub network_id: String,
    pub name: String,
    pub config: RoutingConfig,
    pub user: UserSummary,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct RoutingConfig {
    pub routing: Vec<String>,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct UserSummary {
    pub id: Handle,
    pub username: String,
}

/// Channel state visible to an authorized reader.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ChannelInfo {
    pub head: Option<String>,
    pub modes: ChannelModes,
}

/// Response to an accepted head update.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct HeadResponse {
    pub head: String,
}

/// Response to a mode change.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ModesResponse {
    pub modes: ChannelModes,
}

/// The unified operation surface.
pub struct Gateway<S, R> {
    store: S,
    users: UserDirectory,
    verifier: UpdateVerifier<R>,
    counters: Arc<Counters>,
    config: GatewayConfig,
}

impl<S: ChannelStore, R: Resolver> Gateway<S, R> {
    pub fn new(
        store: S,
        users: UserDirectory,
        verifier: UpdateVerifier<R>,
        config: GatewayConfig,
    ) -> Self {
        Self {
            store,
            users,
            verifier,
            counters: Counters::new(),
            config,
        }
    }

    /// Shared activity counters, for wiring up a flush task.
    pub fn counters(&self) -> Arc<Counters> {
        Arc::clone(&self.counters)
    }

    /// Register (or log in) the caller and report network parameters.
    ///
    /// The only operation where a missing auth header is a credential
    /// failure rather than a malformed request.
    #[instrument(skip(self, auth))]
    pub async fn register(&self, auth: Option<&str>) -> Result<RegisterResponse> {
        let header = auth.ok_or(HavenError::InvalidCredentials)?;
        let user = self.authenticate(header).await?;
        self.counters.incr_connect();
        Ok(RegisterResponse {
            network_id: self.config.network_id.clone(),
            name: self.config.network_name.clone(),
            config: RoutingConfig {
                routing: self.config.routing.clone(),
            },
            user: UserSummary {
                id: user.handle,
                username: user.username,
            },
        })
    }

    /// Liveness probe; carries no state.
    pub fn index(&self) -> serde_json::Value {
        serde_json::json!({})
    }

    /// Read a channel's head and modes.
    #[instrument(skip(self, auth, password), fields(channel = %id))]
    pub async fn channel_info(
        &self,
        auth: Option<&str>,
        id: &ChannelId,
        password: Option<&str>,
    ) -> Result<ChannelInfo> {
        self.authenticate(self.require_auth(auth)?).await?;
        let channel = self.store.load(id).await?;
        channel.authenticate_read(password)?;
        self.counters.incr_read();
        Ok(ChannelInfo {
            head: channel.head,
            modes: channel.modes,
        })
    }

    /// Propose `head` as the channel's next head.
    ///
    /// The caller must pass the channel's read and write checks; when
    /// verification is enabled the candidate must resolve to a correctly
    /// signed envelope whose sequence advances past the stored one.
    #[instrument(skip(self, auth, password), fields(channel = %id))]
    pub async fn add_head(
        &self,
        auth: Option<&str>,
        id: &ChannelId,
        head: &str,
        password: Option<&str>,
    ) -> Result<HeadResponse> {
        let user = self.authenticate(self.require_auth(auth)?).await?;
        let mut channel = self.store.load(id).await?;
        channel.authenticate_read(password)?;
        channel.authenticate_write(&user.handle)?;

        if head.is_empty() {
            return Err(HavenError::InvalidRequest);
        }
        self.verifier.verify(head, &channel).await?;

        channel.record_head(head);
        self.store.persist_head(&channel).await?;
        self.counters.incr_write();
        debug!(head, seq = channel.seq, "accepted head");
        Ok(HeadResponse {
            head: head.to_string(),
        })
    }

    /// Apply a batch of mode changes to a channel.
    ///
    /// Mode changes are guarded by both facets: a secret channel demands
    /// the read password before any facet can be altered, so a caller who
    /// cannot read the channel cannot strip or replace its gate.
    #[instrument(skip(self, auth, batch, password), fields(channel = %id))]
    pub async fn set_modes(
        &self,
        auth: Option<&str>,
        id: &ChannelId,
        batch: ModeBatch,
        password: Option<&str>,
    ) -> Result<ModesResponse> {
        let user = self.authenticate(self.require_auth(auth)?).await?;
        let mut channel = self.store.load(id).await?;
        channel.authenticate_read(password)?;
        channel.authenticate_write(&user.handle)?;

        apply_mode_batch(&mut channel, &batch.into_ops());
        self.store.persist_modes(&channel).await?;
        self.counters.incr_set_mode();
        Ok(ModesResponse {
            modes: channel.modes,
        })
    }

    /// Remove a channel's stored record entirely.
    ///
    /// Requires both read and write access; a later write to the same id
    /// sees a fresh channel.
    #[instrument(skip(self, auth, password), fields(channel = %id))]
    pub async fn delete_channel(
        &self,
        auth: Option<&str>,
        id: &ChannelId,
        password: Option<&str>,
    ) -> Result<serde_json::Value> {
        let user = self.authenticate(self.require_auth(auth)?).await?;
        let channel = self.store.load(id).await?;
        channel.authenticate_read(password)?;
        channel.authenticate_write(&user.handle)?;

        self.store.remove(id).await?;
        debug!("deleted channel");
        Ok(serde_json::json!({}))
    }

    /// Channel operations treat an absent auth header as a malformed
    /// request, not a credential failure.
    fn require_auth<'a>(&self, auth: Option<&'a str>) -> Result<&'a str> {
        auth.ok_or(HavenError::InvalidRequest)
    }

    /// Resolve the auth header to a per-request user identity, creating
    /// the directory record on first contact.
    async fn authenticate(&self, header: &str) -> Result<User> {
        let creds = Credentials::parse(header)?;
        let user = User::new(
            &creds.username,
            &creds.password,
            &self.config.salt,
            &self.config.network_id,
        );
        let outcome = self.users.authenticate(&user).await?;
        if outcome.created {
            self.counters.incr_newuser();
        }
        Ok(user)
    }
}
