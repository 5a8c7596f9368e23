//! The Tethered client: lifecycle gate and reporting operations.

use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::api::payloads::{
    CredentialsQuery, IncidentPayload, IncidentsQuery, MetricListPayload, MetricPayload,
    StatusPayload,
};
use crate::api::{Dispatcher, Method, Page, RequestResult};
use crate::config::{ClientOptions, Configuration, SyncFlag};
use crate::error::{Result, TetheredError};
use crate::hooks::{tags, HookRegistry, IntoTag};
use crate::metrics::collector::default_disk_directory;
use crate::metrics::{MetricEntry, MetricsProvider, Snapshot, SystemCollector};

/// Results of the operations a [`Tethered::sync`] ran.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SyncReport {
    /// Present when status sync is enabled
    pub status: Option<RequestResult>,
    /// Present when metric sync is enabled and there was something to push
    pub metrics: Option<RequestResult>,
}

/// Client for one monitor on the Tethered API.
///
/// The client becomes ready at construction when both an API key and a
/// monitor id were supplied. Until then every reporting operation returns
/// `None` without sending anything or firing any event.
///
/// Calls block until the API answers. Nothing runs in the background: call
/// [`sync`](Self::sync) on whatever schedule suits the host.
pub struct Tethered {
    configuration: Configuration,
    hooks: HookRegistry,
    provider: Box<dyn MetricsProvider>,
    ready: bool,
}

impl Tethered {
    /// Create a client that reads host metrics with [`SystemCollector`].
    pub fn new(options: ClientOptions) -> Self {
        Self::with_provider(options, SystemCollector::new())
    }

    /// Create a client with a custom metrics source.
    pub fn with_provider(options: ClientOptions, provider: impl MetricsProvider + 'static) -> Self {
        let mut client = Self {
            configuration: Configuration::default(),
            hooks: HookRegistry::new(),
            provider: Box::new(provider),
            ready: false,
        };
        client.configure(options);

        if client.configuration.has_credentials() {
            client.ready = true;
            info!(monitor_id = client.configuration.monitor_id, "Tethered client ready");
            client.hooks.trigger(tags::READY, &());
        } else {
            debug!("Tethered client missing API key or monitor id; reporting disabled");
        }

        client
    }

    /// Reset hooks and configuration, then apply `options` over the defaults.
    ///
    /// Hooks carried by `options` are registered in the order they were added.
    /// Readiness is decided once, at construction, and is not re-evaluated here.
    pub fn configure(&mut self, options: ClientOptions) {
        let configuration = Configuration::merged(&options);

        self.hooks.clear();
        self.hooks.append(options.hooks);
        self.configuration = configuration;

        debug!(
            monitor_id = self.configuration.monitor_id,
            sync_flags = ?self.configuration.sync_flags,
            metric_flags = ?self.configuration.metric_flags,
            "Configured Tethered client"
        );
        self.hooks.trigger(tags::CONFIGURED, &self.configuration);
    }

    pub fn is_ready(&self) -> bool {
        self.ready
    }

    pub fn configuration(&self) -> &Configuration {
        &self.configuration
    }

    pub fn hooks(&self) -> &HookRegistry {
        &self.hooks
    }

    /// Point the client at another monitor. An id of 0 is ignored.
    pub fn set_monitor(&mut self, monitor_id: u64) {
        if monitor_id != 0 {
            self.configuration.monitor_id = monitor_id;
        }
    }

    /// Append a modifier for `tag`. See [`HookRegistry::add_modifier`].
    pub fn add_modifier<T, F>(&mut self, tag: impl IntoTag<T>, modifier: F)
    where
        T: 'static,
        F: Fn(T) -> T + Send + Sync + 'static,
    {
        self.hooks.add_modifier(tag, modifier);
    }

    /// Append a listener for `tag`. See [`HookRegistry::listen`].
    pub fn listen<T, F>(&mut self, tag: impl IntoTag<T>, listener: F)
    where
        T: 'static,
        F: Fn(&T) + Send + Sync + 'static,
    {
        self.hooks.listen(tag, listener);
    }

    /// Push every report type enabled in the sync flags: status first, then metrics.
    ///
    /// Fires `sync` once both have run.
    pub fn sync(&self) -> Option<SyncReport> {
        if !self.ready {
            return None;
        }

        let mut report = SyncReport::default();
        if self.configuration.syncs(SyncFlag::Status) {
            report.status = self.push_status(crate::DEFAULT_STATUS_CODE, crate::DEFAULT_STATUS_TIME);
        }
        if self.configuration.syncs(SyncFlag::Metrics) {
            report.metrics = self.push_metrics();
        }

        self.hooks.trigger(tags::SYNC, &());
        Some(report)
    }

    /// Send an uptime update.
    ///
    /// `code` and `time` pass through the `status.code` and `status.time`
    /// modifiers before being sent.
    pub fn push_status(&self, code: u16, time: u64) -> Option<RequestResult> {
        if !self.ready {
            return None;
        }

        let payload = StatusPayload {
            apikey: self.apikey(),
            id: self.configuration.monitor_id,
            status: self.hooks.apply_modifiers(tags::STATUS_CODE, code),
            time: self.hooks.apply_modifiers(tags::STATUS_TIME, time),
        };

        self.hooks.trigger(tags::STATUS, &());
        let result = self.post_payload("site/status", &payload);
        self.hooks.trigger(tags::STATUS_COMPLETE, &result);

        Some(result)
    }

    /// Log one custom metric.
    ///
    /// Returns `None` when `key` is empty or `value` is unset. Empty `label`,
    /// `kind` or `widget` values are left out of the payload.
    pub fn push_metric(
        &self,
        key: &str,
        value: Option<f64>,
        label: Option<&str>,
        kind: Option<&str>,
        widget: Option<&str>,
    ) -> Option<RequestResult> {
        if !self.ready {
            return None;
        }
        let value = value.filter(|_| !key.is_empty())?;

        let mut entry = MetricEntry::new(key, value);
        entry.label = non_empty(label);
        entry.kind = non_empty(kind);
        entry.widget = non_empty(widget);

        let payload = MetricPayload {
            apikey: self.apikey(),
            site: self.configuration.monitor_id,
            entry: &entry,
        };

        self.hooks.trigger(tags::METRICS, &());
        let result = self.post_payload("metrics/", &payload);
        self.hooks.trigger(tags::METRICS_COMPLETE, &result);

        Some(result)
    }

    /// Snapshot the host and push the readings enabled in the metric flags.
    ///
    /// The entry list passes through the `metrics.list` modifiers, which may
    /// drop or add entries. Returns `None` without sending when the final list
    /// is empty. Blocks for at least the CPU sample interval.
    pub fn push_metrics(&self) -> Option<RequestResult> {
        if !self.ready {
            return None;
        }

        let snapshot = self.snapshot();
        let list = snapshot.metric_entries(&self.configuration.metric_flags);
        let list = self.hooks.apply_modifiers(tags::METRICS_LIST, list);
        if list.is_empty() {
            debug!("No metrics to push");
            return None;
        }

        let encoded = match serde_json::to_string(&list) {
            Ok(encoded) => encoded,
            Err(err) => return Some(RequestResult::failed(TetheredError::from(err))),
        };
        let payload = MetricListPayload {
            apikey: self.apikey(),
            site: self.configuration.monitor_id,
            list: encoded,
        };

        self.hooks.trigger(tags::METRICS, &());
        let result = self.post_payload("metrics/", &payload);
        self.hooks.trigger(tags::METRICS_COMPLETE, &result);

        Some(result)
    }

    /// List the monitors on the account.
    pub fn get_monitors(&self) -> Option<RequestResult> {
        if !self.ready {
            return None;
        }

        let query = CredentialsQuery {
            apikey: self.apikey(),
        };

        self.hooks.trigger(tags::MONITORS, &());
        let result = self.send_payload("sites/", &query, Method::Get);
        self.hooks.trigger(tags::MONITORS_COMPLETE, &result);

        Some(result)
    }

    /// List incidents on the account, one page at a time.
    ///
    /// Pages that are zero, negative or unparseable fall back to page 1.
    pub fn get_incidents(&self, page: impl Into<Page>) -> Option<RequestResult> {
        if !self.ready {
            return None;
        }

        let query = IncidentsQuery {
            apikey: self.apikey(),
            page: page.into().get(),
        };

        self.hooks.trigger(tags::INCIDENTS, &());
        let result = self.send_payload("incidents/", &query, Method::Get);
        self.hooks.trigger(tags::INCIDENTS_COMPLETE, &result);

        Some(result)
    }

    /// Open an incident on the monitor.
    ///
    /// Returns `None` when `title` or `description` is empty. The API records
    /// `api` as the source when none is given; a `status` of 0 (ongoing) is
    /// not sent.
    pub fn push_incident(
        &self,
        title: &str,
        description: &str,
        source: Option<&str>,
        status: u32,
    ) -> Option<RequestResult> {
        if !self.ready || title.is_empty() || description.is_empty() {
            return None;
        }

        let payload = IncidentPayload {
            apikey: self.apikey(),
            siteid: self.configuration.monitor_id,
            incident_title: title,
            data_description: description,
            incident_source: source.filter(|source| !source.is_empty()),
            status: (status != 0).then_some(status),
        };

        self.hooks.trigger(tags::INCIDENT, &());
        let result = self.post_payload("incident/", &payload);
        self.hooks.trigger(tags::INCIDENT_COMPLETE, &result);

        Some(result)
    }

    /// Read memory, CPU and disk usage, then run the result through the
    /// `snapshot` modifiers.
    ///
    /// The disk directory passes through `disk.directory` first. A reading
    /// that fails is logged and left empty.
    pub fn snapshot(&self) -> Snapshot {
        let memory = reading("memory", self.provider.read_memory_mb());
        let cpu = reading("cpu", self.provider.read_cpu_percent());
        let directory = self
            .hooks
            .apply_modifiers(tags::DISK_DIRECTORY, default_disk_directory().to_string());
        let disk = reading("disk", self.provider.read_disk_usage(&directory));

        self.hooks
            .apply_modifiers(tags::SNAPSHOT, Snapshot::new(memory, cpu, disk))
    }

    /// Raw GET against the API. The payload must carry any credentials needed.
    pub fn get(&self, endpoint: &str, data: Option<Value>) -> RequestResult {
        self.dispatcher().get(endpoint, data)
    }

    /// Raw POST against the API. The payload must carry any credentials needed.
    pub fn post(&self, endpoint: &str, data: Option<Value>) -> RequestResult {
        self.dispatcher().post(endpoint, data)
    }

    /// Raw DELETE against the API. The payload must carry any credentials needed.
    pub fn delete(&self, endpoint: &str, data: Option<Value>) -> RequestResult {
        self.dispatcher().delete(endpoint, data)
    }

    pub fn request(&self, endpoint: &str, data: Option<Value>, method: Method) -> RequestResult {
        self.dispatcher().request(endpoint, data, method)
    }

    fn dispatcher(&self) -> Dispatcher<'_> {
        Dispatcher::new(&self.configuration.transport, &self.hooks)
    }

    fn post_payload<P: Serialize>(&self, endpoint: &str, payload: &P) -> RequestResult {
        self.send_payload(endpoint, payload, Method::Post)
    }

    fn send_payload<P: Serialize>(&self, endpoint: &str, payload: &P, method: Method) -> RequestResult {
        match serde_json::to_value(payload) {
            Ok(data) => self.request(endpoint, Some(data), method),
            Err(err) => RequestResult::failed(TetheredError::from(err)),
        }
    }

    fn apikey(&self) -> &str {
        self.configuration.apikey.as_deref().unwrap_or_default()
    }
}

fn reading<T>(metric: &str, result: Result<T>) -> Option<T> {
    result
        .map_err(|err| warn!(metric, error = %err, "Failed to read host metric"))
        .ok()
}

fn non_empty(value: Option<&str>) -> Option<String> {
    value.filter(|value| !value.is_empty()).map(str::to_string)
}
