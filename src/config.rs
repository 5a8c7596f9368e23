//! Client configuration.
//!
//! [`ClientOptions`] is what a caller supplies; [`Configuration`] is the merged
//! result the client runs with. Merging only touches fields that exist in the
//! defaults: unknown keys in a JSON options document are ignored.

use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Result, TetheredError};
use crate::hooks::{HookRegistry, IntoTag, Listener, Modifier};

/// Report types pushed by `sync`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum SyncFlag {
    Status = 1,
    Metrics = 2,
}

impl TryFrom<u8> for SyncFlag {
    type Error = TetheredError;

    fn try_from(value: u8) -> Result<Self> {
        match value {
            1 => Ok(Self::Status),
            2 => Ok(Self::Metrics),
            other => Err(TetheredError::config_error(format!("Unknown sync flag: {other}"))),
        }
    }
}

impl From<SyncFlag> for u8 {
    fn from(flag: SyncFlag) -> Self {
        flag as u8
    }
}

/// Host resources included in automatic metric snapshots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum MetricFlag {
    Cpu = 1,
    Memory = 2,
    Drive = 3,
}

impl TryFrom<u8> for MetricFlag {
    type Error = TetheredError;

    fn try_from(value: u8) -> Result<Self> {
        match value {
            1 => Ok(Self::Cpu),
            2 => Ok(Self::Memory),
            3 => Ok(Self::Drive),
            other => Err(TetheredError::config_error(format!("Unknown metric flag: {other}"))),
        }
    }
}

impl From<MetricFlag> for u8 {
    fn from(flag: MetricFlag) -> Self {
        flag as u8
    }
}

/// HTTP transport settings used for every outbound call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransportOptions {
    /// API root, without the version segment
    pub base_url: String,
    /// Whole-request timeout in seconds
    pub timeout_secs: u64,
    /// `User-Agent` header value
    pub user_agent: String,
    /// Honour `HTTP_PROXY`/`HTTPS_PROXY`/`NO_PROXY` from the environment
    pub system_proxy: bool,
}

impl Default for TransportOptions {
    fn default() -> Self {
        Self {
            base_url: crate::API_BASE.to_string(),
            timeout_secs: 30,
            user_agent: format!("tethered-rs/{}", env!("CARGO_PKG_VERSION")),
            system_proxy: true,
        }
    }
}

/// Partial override for [`TransportOptions`]; absent fields keep their default.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransportPatch {
    pub base_url: Option<String>,
    pub timeout_secs: Option<u64>,
    pub user_agent: Option<String>,
    pub system_proxy: Option<bool>,
}

impl TransportOptions {
    /// Overwrite only the fields the patch carries.
    pub fn merge(&mut self, patch: TransportPatch) {
        if let Some(base_url) = patch.base_url {
            self.base_url = base_url;
        }
        if let Some(timeout_secs) = patch.timeout_secs {
            self.timeout_secs = timeout_secs;
        }
        if let Some(user_agent) = patch.user_agent {
            self.user_agent = user_agent;
        }
        if let Some(system_proxy) = patch.system_proxy {
            self.system_proxy = system_proxy;
        }
    }
}

/// The effective configuration of a client.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Configuration {
    /// API key from the account section on Tethered
    pub apikey: Option<String>,
    /// Monitor the data is reported for; 0 means unset
    pub monitor_id: u64,
    pub sync_flags: Vec<SyncFlag>,
    pub metric_flags: Vec<MetricFlag>,
    pub transport: TransportOptions,
}

impl Default for Configuration {
    fn default() -> Self {
        Self {
            apikey: None,
            monitor_id: 0,
            sync_flags: vec![SyncFlag::Status, SyncFlag::Metrics],
            metric_flags: vec![MetricFlag::Cpu, MetricFlag::Memory, MetricFlag::Drive],
            transport: TransportOptions::default(),
        }
    }
}

impl Configuration {
    /// Build a configuration from defaults, overridden by whatever `options` sets.
    ///
    /// Hooks carried by the options are not part of the configuration; they are
    /// registered separately by the client.
    pub fn merged(options: &ClientOptions) -> Self {
        let mut configuration = Self::default();

        if let Some(apikey) = &options.apikey {
            configuration.apikey = Some(apikey.clone());
        }
        if let Some(monitor_id) = options.monitor_id {
            configuration.monitor_id = monitor_id;
        }
        if let Some(sync_flags) = &options.sync_flags {
            configuration.sync_flags = sync_flags.clone();
        }
        if let Some(metric_flags) = &options.metric_flags {
            configuration.metric_flags = metric_flags.clone();
        }
        if let Some(transport) = &options.transport {
            configuration.transport.merge(transport.clone());
        }

        configuration
    }

    /// Both credentials required to talk to the API are present.
    pub fn has_credentials(&self) -> bool {
        self.apikey.as_deref().is_some_and(|key| !key.is_empty()) && self.monitor_id != 0
    }

    pub fn syncs(&self, flag: SyncFlag) -> bool {
        self.sync_flags.contains(&flag)
    }

    pub fn collects(&self, flag: MetricFlag) -> bool {
        self.metric_flags.contains(&flag)
    }
}

/// Caller-supplied options. Every field is optional.
#[derive(Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientOptions {
    pub apikey: Option<String>,
    pub monitor_id: Option<u64>,
    pub sync_flags: Option<Vec<SyncFlag>>,
    pub metric_flags: Option<Vec<MetricFlag>>,
    pub transport: Option<TransportPatch>,
    #[serde(skip)]
    pub(crate) hooks: HookRegistry,
}

impl ClientOptions {
    /// Create empty options; every value falls back to its default.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse options from a JSON document. Unknown keys are ignored.
    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Read and parse a JSON options file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_json_str(&contents)
    }

    pub fn with_apikey(mut self, apikey: impl Into<String>) -> Self {
        self.apikey = Some(apikey.into());
        self
    }

    pub fn with_monitor_id(mut self, monitor_id: u64) -> Self {
        self.monitor_id = Some(monitor_id);
        self
    }

    pub fn with_sync_flags(mut self, flags: impl Into<Vec<SyncFlag>>) -> Self {
        self.sync_flags = Some(flags.into());
        self
    }

    pub fn with_metric_flags(mut self, flags: impl Into<Vec<MetricFlag>>) -> Self {
        self.metric_flags = Some(flags.into());
        self
    }

    /// Override the API root, e.g. for a proxy or a local stub.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.transport.get_or_insert_with(TransportPatch::default).base_url = Some(base_url.into());
        self
    }

    pub fn with_timeout_secs(mut self, timeout_secs: u64) -> Self {
        self.transport.get_or_insert_with(TransportPatch::default).timeout_secs = Some(timeout_secs);
        self
    }

    pub fn with_system_proxy(mut self, enabled: bool) -> Self {
        self.transport.get_or_insert_with(TransportPatch::default).system_proxy = Some(enabled);
        self
    }

    /// Register a modifier once the client is configured.
    pub fn with_modifier<T, F>(mut self, tag: impl IntoTag<T>, modifier: F) -> Self
    where
        T: 'static,
        F: Fn(T) -> T + Send + Sync + 'static,
    {
        self.hooks.add_modifier(tag, modifier);
        self
    }

    /// Register a chain of modifiers for one tag, in list order.
    pub fn with_modifiers<T: 'static>(
        mut self,
        tag: impl IntoTag<T>,
        modifiers: impl IntoIterator<Item = Modifier<T>>,
    ) -> Self {
        let tag = tag.into_tag();
        for modifier in modifiers {
            self.hooks.add_boxed_modifier(tag.clone(), modifier);
        }
        self
    }

    /// Register an event listener once the client is configured.
    pub fn with_listener<T, F>(mut self, tag: impl IntoTag<T>, listener: F) -> Self
    where
        T: 'static,
        F: Fn(&T) + Send + Sync + 'static,
    {
        self.hooks.listen(tag, listener);
        self
    }

    /// Register several listeners for one tag, in list order.
    pub fn with_listeners<T: 'static>(
        mut self,
        tag: impl IntoTag<T>,
        listeners: impl IntoIterator<Item = Listener<T>>,
    ) -> Self {
        let tag = tag.into_tag();
        for listener in listeners {
            self.hooks.listen_boxed(tag.clone(), listener);
        }
        self
    }
}

impl fmt::Debug for ClientOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientOptions")
            .field("apikey", &self.apikey.as_ref().map(|_| "***"))
            .field("monitor_id", &self.monitor_id)
            .field("sync_flags", &self.sync_flags)
            .field("metric_flags", &self.metric_flags)
            .field("transport", &self.transport)
            .field("hooks", &self.hooks)
            .finish()
    }
}
