mod common;

use std::sync::{Arc, Mutex};

use common::{direct_options, FixedReadings, StubServer};
use serde_json::json;
use tethered::{
    tags, ClientOptions, Configuration, MetricEntry, MetricFlag, RequestResult, SyncFlag, Tethered,
};

type EventLog = Arc<Mutex<Vec<&'static str>>>;

fn client_for(options: ClientOptions) -> Tethered {
    Tethered::with_provider(options, FixedReadings::new(42.0, 10.0))
}

/// Record every reporting event by name, in firing order.
fn record_events(options: ClientOptions, log: &EventLog) -> ClientOptions {
    let mut options = options;
    for (tag, name) in [
        (tags::READY, "ready"),
        (tags::STATUS, "status"),
        (tags::METRICS, "metrics"),
        (tags::MONITORS, "monitors"),
        (tags::INCIDENTS, "incidents"),
        (tags::INCIDENT, "incident"),
        (tags::SYNC, "sync"),
    ] {
        let sink = Arc::clone(log);
        options = options.with_listener(tag, move |_: &()| sink.lock().unwrap().push(name));
    }
    for (tag, name) in [
        (tags::STATUS_COMPLETE, "status.complete"),
        (tags::METRICS_COMPLETE, "metrics.complete"),
        (tags::MONITORS_COMPLETE, "monitors.complete"),
        (tags::INCIDENTS_COMPLETE, "incidents.complete"),
        (tags::INCIDENT_COMPLETE, "incident.complete"),
    ] {
        let sink = Arc::clone(log);
        options = options.with_listener(tag, move |_: &RequestResult| sink.lock().unwrap().push(name));
    }
    options
}

/// Test that a client without credentials sends nothing and stays silent
#[test]
fn test_not_ready_client_is_inert() {
    let server = StubServer::start(vec![(200, "{}")]);
    let log = EventLog::default();
    let client = client_for(record_events(direct_options(server.base_url.clone()).with_apikey("k"), &log));

    assert!(!client.is_ready());
    assert_eq!(client.sync(), None);
    assert_eq!(client.push_status(200, 0), None);
    assert_eq!(client.push_metric("queue", Some(1.0), None, None, None), None);
    assert_eq!(client.push_metrics(), None);
    assert_eq!(client.get_monitors(), None);
    assert_eq!(client.get_incidents(1u32), None);
    assert_eq!(client.push_incident("Down", "No answer", None, 0), None);

    assert!(server.received_nothing());
    assert!(log.lock().unwrap().is_empty());
}

/// Test the ready and configured events at construction
#[test]
fn test_lifecycle_events() {
    let server = StubServer::start(vec![]);
    let log = EventLog::default();
    let configured = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&configured);
    let options = record_events(server.options(), &log)
        .with_metric_flags([MetricFlag::Memory])
        .with_listener(tags::CONFIGURED, move |configuration: &Configuration| {
            sink.lock().unwrap().push(configuration.clone());
        });

    let client = client_for(options);

    assert!(client.is_ready());
    assert_eq!(*log.lock().unwrap(), vec!["ready"]);

    let configured = configured.lock().unwrap();
    assert_eq!(configured.len(), 1);
    assert_eq!(configured[0].apikey.as_deref(), Some("k"));
    assert_eq!(configured[0].monitor_id, 5);
    assert_eq!(configured[0].metric_flags, vec![MetricFlag::Memory]);
    assert_eq!(configured[0].sync_flags, vec![SyncFlag::Status, SyncFlag::Metrics]);
}

/// Test the status payload and its modifiers
#[test]
fn test_push_status_applies_modifiers() {
    let server = StubServer::start(vec![(200, r#"{"logged":true}"#)]);
    let options = server
        .options()
        .with_modifier(tags::STATUS_CODE, |code: u16| code + 300)
        .with_modifier(tags::STATUS_TIME, |time: u64| time * 2);
    let client = client_for(options);

    let result = client.push_status(200, 60).expect("client is ready");

    assert!(result.success);
    assert_eq!(result.data, Some(json!({"logged": true})));
    let request = server.next_request();
    assert_eq!(request.method, "POST");
    assert_eq!(request.target, "/v1/site/status");
    assert_eq!(request.json(), json!({"apikey": "k", "id": 5, "status": 500, "time": 120}));
}

/// Test single metric validation and optional fields
#[test]
fn test_push_metric() {
    let server = StubServer::start(vec![(200, "{}"), (200, "{}")]);
    let client = client_for(server.options());

    assert_eq!(client.push_metric("", Some(5.0), None, None, None), None);
    assert_eq!(client.push_metric("queue", None, None, None, None), None);

    let zero = client.push_metric("queue", Some(0.0), None, Some(""), None);
    assert!(zero.is_some_and(|result| result.success));
    assert_eq!(
        server.next_request().json(),
        json!({"apikey": "k", "site": 5, "key": "queue", "value": 0.0})
    );

    client.push_metric("queue", Some(12.0), Some("Queue {{}}jobs"), Some("counter"), Some("line"));
    assert_eq!(
        server.next_request().json(),
        json!({
            "apikey": "k",
            "site": 5,
            "key": "queue",
            "value": 12.0,
            "label": "Queue {{}}jobs",
            "type": "counter",
            "widget": "line"
        })
    );
}

/// Test that host metrics are pushed as a JSON-encoded list
#[test]
fn test_push_metrics_encodes_list() {
    let server = StubServer::start(vec![(200, "{}")]);
    let client = client_for(server.options().with_metric_flags([MetricFlag::Cpu]));

    let result = client.push_metrics().expect("list is not empty");

    assert!(result.success);
    let request = server.next_request();
    assert_eq!(request.target, "/v1/metrics/");
    let body = request.json();
    assert_eq!(body["apikey"], "k");
    assert_eq!(body["site"], 5);
    let list: serde_json::Value =
        serde_json::from_str(body["list"].as_str().expect("list is a string")).unwrap();
    assert_eq!(
        list,
        json!([{"key": "cpu", "value": 42.0, "label": "CPU", "type": "percentage", "widget": "donut"}])
    );
}

/// Test that the metrics list modifier can add and remove entries
#[test]
fn test_metrics_list_modifier() {
    let server = StubServer::start(vec![(200, "{}")]);
    let options = server
        .options()
        .with_modifier(tags::METRICS_LIST, |mut list: Vec<MetricEntry>| {
            list.retain(|entry| entry.key != "cpu");
            list.push(MetricEntry::new("jobs", 3.0));
            list
        });
    let client = client_for(options);

    client.push_metrics();

    let body = server.next_request().json();
    let list: Vec<MetricEntry> = serde_json::from_str(body["list"].as_str().unwrap()).unwrap();
    let keys: Vec<&str> = list.iter().map(|entry| entry.key.as_str()).collect();
    assert_eq!(keys, vec!["memory", "disk_primary", "jobs"]);
    assert_eq!(list[1].label.as_deref(), Some("Disk root"));
}

/// Test that an empty metric list is not sent
#[test]
fn test_empty_metric_list_is_skipped() {
    let server = StubServer::start(vec![(200, "{}")]);
    let log = EventLog::default();
    let options = record_events(server.options(), &log)
        .with_modifier(tags::METRICS_LIST, |_: Vec<MetricEntry>| Vec::new());
    let client = client_for(options);

    assert_eq!(client.push_metrics(), None);
    assert!(server.received_nothing());
    assert_eq!(*log.lock().unwrap(), vec!["ready"]);
}

/// Test that sync pushes status then metrics, then fires sync once
#[test]
fn test_sync_event_order() {
    let server = StubServer::start(vec![(200, "{}"), (200, "{}")]);
    let log = EventLog::default();
    let client = client_for(record_events(server.options(), &log));

    let report = client.sync().expect("client is ready");

    assert!(report.status.is_some_and(|result| result.success));
    assert!(report.metrics.is_some_and(|result| result.success));
    assert_eq!(
        *log.lock().unwrap(),
        vec!["ready", "status", "status.complete", "metrics", "metrics.complete", "sync"]
    );

    let status = server.next_request();
    assert_eq!(status.target, "/v1/site/status");
    assert_eq!(status.json(), json!({"apikey": "k", "id": 5, "status": 200, "time": 0}));
    assert_eq!(server.next_request().target, "/v1/metrics/");
}

/// Test that sync flags select what is pushed
#[test]
fn test_sync_respects_flags() {
    let server = StubServer::start(vec![(200, "{}")]);
    let log = EventLog::default();
    let client = client_for(record_events(
        server.options().with_sync_flags([SyncFlag::Metrics]),
        &log,
    ));

    let report = client.sync().expect("client is ready");

    assert_eq!(report.status, None);
    assert!(report.metrics.is_some());
    assert_eq!(*log.lock().unwrap(), vec!["ready", "metrics", "metrics.complete", "sync"]);
    assert_eq!(server.next_request().target, "/v1/metrics/");
    assert!(server.received_nothing());
}

/// Test the monitor listing request
#[test]
fn test_get_monitors() {
    let server = StubServer::start(vec![(200, r#"[{"id":5}]"#)]);
    let client = client_for(server.options());

    let result = client.get_monitors().expect("client is ready");

    assert_eq!(result.data, Some(json!([{"id": 5}])));
    let request = server.next_request();
    assert_eq!(request.method, "GET");
    assert_eq!(request.target, "/v1/sites/?apikey=k");
}

/// Test that invalid pages fall back to the first page
#[test]
fn test_get_incidents_page_coercion() {
    let server = StubServer::start(vec![(200, "[]"), (200, "[]"), (200, "[]"), (200, "[]")]);
    let client = client_for(server.options());

    client.get_incidents("abc");
    assert_eq!(server.next_request().target, "/v1/incidents/?apikey=k&page=1");

    client.get_incidents(-4i64);
    assert_eq!(server.next_request().target, "/v1/incidents/?apikey=k&page=1");

    client.get_incidents(3u32);
    assert_eq!(server.next_request().target, "/v1/incidents/?apikey=k&page=3");

    client.get_incidents(2);
    assert_eq!(server.next_request().target, "/v1/incidents/?apikey=k&page=2");
}

/// Test the incident payload with and without optional fields
#[test]
fn test_push_incident() {
    let server = StubServer::start(vec![(200, "{}"), (200, "{}")]);
    let client = client_for(server.options());

    client.push_incident("Down", "No answer on port 443", None, 0);
    assert_eq!(
        server.next_request().json(),
        json!({
            "apikey": "k",
            "siteid": 5,
            "incident_title": "Down",
            "data_description": "No answer on port 443"
        })
    );

    client.push_incident("Down", "No answer on port 443", Some("cron"), 2);
    assert_eq!(
        server.next_request().json(),
        json!({
            "apikey": "k",
            "siteid": 5,
            "incident_title": "Down",
            "data_description": "No answer on port 443",
            "incident_source": "cron",
            "status": 2
        })
    );
}

/// Test that a failed call is handed to the completion listener
#[test]
fn test_completion_listener_receives_result() {
    let server = StubServer::start(vec![(503, r#"{"error":"maintenance"}"#)]);
    let seen = Arc::new(Mutex::new(None));
    let sink = Arc::clone(&seen);
    let options = server
        .options()
        .with_listener(tags::INCIDENT_COMPLETE, move |result: &RequestResult| {
            *sink.lock().unwrap() = Some(result.clone());
        });
    let client = client_for(options);

    let result = client.push_incident("Down", "desc", None, 0);

    assert_eq!(*seen.lock().unwrap(), result);
    assert_eq!(result.and_then(|result| result.status), Some(503));
}

/// Test that a new monitor id is used for later calls
#[test]
fn test_set_monitor() {
    let server = StubServer::start(vec![(200, "{}")]);
    let mut client = client_for(server.options());

    client.set_monitor(77);
    client.push_status(200, 0);

    assert_eq!(server.next_request().json()["id"], 77);
}
