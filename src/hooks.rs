//! Modifier and listener registry.
//!
//! Modifiers form a data pipeline: each one receives the previous one's output
//! and returns a value of the same type. Listeners observe events and cannot
//! influence the data being pushed.
//!
//! Hooks are keyed by a string tag. A [`Tag<T>`] carries the payload type so
//! that registration and dispatch agree at compile time; the built-in tags
//! live in [`tags`].

use std::any::Any;
use std::borrow::Cow;
use std::collections::HashMap;
use std::fmt;
use std::marker::PhantomData;
use std::panic::{self, AssertUnwindSafe};

use tracing::warn;

/// A boxed modifier: transforms a value and returns one of the same type.
pub type Modifier<T> = Box<dyn Fn(T) -> T + Send + Sync>;

/// A boxed listener: observes a payload, return value unused.
pub type Listener<T> = Box<dyn Fn(&T) + Send + Sync>;

type Erased = Box<dyn Any + Send + Sync>;

/// A hook tag bound to the payload type its hooks receive.
pub struct Tag<T> {
    name: Cow<'static, str>,
    _payload: PhantomData<fn(T) -> T>,
}

impl<T> Tag<T> {
    /// Create a tag from a static name.
    pub const fn new(name: &'static str) -> Self {
        Self {
            name: Cow::Borrowed(name),
            _payload: PhantomData,
        }
    }

    /// The tag's name.
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl<T> Clone for Tag<T> {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            _payload: PhantomData,
        }
    }
}

impl<T> fmt::Debug for Tag<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Tag").field(&self.name).finish()
    }
}

/// Anything usable as a hook tag: a typed [`Tag`] or a plain name.
pub trait IntoTag<T> {
    fn into_tag(self) -> Tag<T>;
}

impl<T> IntoTag<T> for Tag<T> {
    fn into_tag(self) -> Tag<T> {
        self
    }
}

impl<T> IntoTag<T> for &str {
    fn into_tag(self) -> Tag<T> {
        Tag {
            name: Cow::Owned(self.to_string()),
            _payload: PhantomData,
        }
    }
}

impl<T> IntoTag<T> for String {
    fn into_tag(self) -> Tag<T> {
        Tag {
            name: Cow::Owned(self),
            _payload: PhantomData,
        }
    }
}

/// Built-in modifier and event tags.
pub mod tags {
    use super::Tag;
    use crate::api::{RequestInfo, RequestResult};
    use crate::config::Configuration;
    use crate::metrics::{MetricEntry, Snapshot};

    // Modifiers
    pub const STATUS_CODE: Tag<u16> = Tag::new("status.code");
    pub const STATUS_TIME: Tag<u64> = Tag::new("status.time");
    pub const METRICS_LIST: Tag<Vec<MetricEntry>> = Tag::new("metrics.list");
    pub const SNAPSHOT: Tag<Snapshot> = Tag::new("snapshot");
    pub const DISK_DIRECTORY: Tag<String> = Tag::new("disk.directory");
    /// Receives the outgoing request before it is sent (headers, timeouts, proxies).
    pub const REQUEST_HANDLE: Tag<reqwest::blocking::RequestBuilder> =
        Tag::new("request.curlhandle");

    // Events
    pub const READY: Tag<()> = Tag::new("ready");
    pub const CONFIGURED: Tag<Configuration> = Tag::new("configured");
    pub const STATUS: Tag<()> = Tag::new("status");
    pub const STATUS_COMPLETE: Tag<RequestResult> = Tag::new("status.complete");
    pub const METRICS: Tag<()> = Tag::new("metrics");
    pub const METRICS_COMPLETE: Tag<RequestResult> = Tag::new("metrics.complete");
    pub const MONITORS: Tag<()> = Tag::new("monitors");
    pub const MONITORS_COMPLETE: Tag<RequestResult> = Tag::new("monitors.complete");
    pub const INCIDENTS: Tag<()> = Tag::new("incidents");
    pub const INCIDENTS_COMPLETE: Tag<RequestResult> = Tag::new("incidents.complete");
    pub const INCIDENT: Tag<()> = Tag::new("incident");
    pub const INCIDENT_COMPLETE: Tag<RequestResult> = Tag::new("incident.complete");
    pub const REQUEST: Tag<RequestInfo> = Tag::new("request");
    pub const REQUEST_COMPLETE: Tag<RequestResult> = Tag::new("request.complete");
    pub const SYNC: Tag<()> = Tag::new("sync");
}

/// Ordered modifier and listener lists, keyed by tag.
///
/// Registration order is execution order; registering the same tag twice
/// appends.
#[derive(Default)]
pub struct HookRegistry {
    modifiers: HashMap<String, Vec<Erased>>,
    events: HashMap<String, Vec<Erased>>,
}

impl HookRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a modifier to the tag's chain.
    pub fn add_modifier<T, F>(&mut self, tag: impl IntoTag<T>, modifier: F)
    where
        T: 'static,
        F: Fn(T) -> T + Send + Sync + 'static,
    {
        self.add_boxed_modifier(tag, Box::new(modifier));
    }

    /// Append an already boxed modifier to the tag's chain.
    pub fn add_boxed_modifier<T: 'static>(&mut self, tag: impl IntoTag<T>, modifier: Modifier<T>) {
        let tag = tag.into_tag();
        self.modifiers
            .entry(tag.name().to_string())
            .or_default()
            .push(Box::new(modifier));
    }

    /// Pipe `data` through the tag's modifiers in registration order.
    ///
    /// Returns `data` unchanged when nothing is registered. A modifier that was
    /// registered for a different payload type under the same name is skipped.
    pub fn apply_modifiers<T: 'static>(&self, tag: impl IntoTag<T>, data: T) -> T {
        let tag = tag.into_tag();
        let Some(chain) = self.modifiers.get(tag.name()) else {
            return data;
        };

        chain.iter().fold(data, |data, entry| match entry.downcast_ref::<Modifier<T>>() {
            Some(modifier) => modifier(data),
            None => {
                warn!(tag = tag.name(), "Skipping modifier registered for another payload type");
                data
            }
        })
    }

    /// Append a listener to the tag's event list.
    pub fn listen<T, F>(&mut self, tag: impl IntoTag<T>, listener: F)
    where
        T: 'static,
        F: Fn(&T) + Send + Sync + 'static,
    {
        self.listen_boxed(tag, Box::new(listener));
    }

    /// Append an already boxed listener to the tag's event list.
    pub fn listen_boxed<T: 'static>(&mut self, tag: impl IntoTag<T>, listener: Listener<T>) {
        let tag = tag.into_tag();
        self.events
            .entry(tag.name().to_string())
            .or_default()
            .push(Box::new(listener));
    }

    /// Invoke every listener for the tag, in order.
    ///
    /// A panicking listener is logged and does not stop the ones after it.
    pub fn trigger<T: 'static>(&self, tag: impl IntoTag<T>, payload: &T) {
        let tag = tag.into_tag();
        let Some(listeners) = self.events.get(tag.name()) else {
            return;
        };

        for entry in listeners {
            let Some(listener) = entry.downcast_ref::<Listener<T>>() else {
                warn!(tag = tag.name(), "Skipping listener registered for another payload type");
                continue;
            };

            if panic::catch_unwind(AssertUnwindSafe(|| listener(payload))).is_err() {
                warn!(tag = tag.name(), "Event listener panicked");
            }
        }
    }

    /// Number of modifiers registered under a tag name.
    pub fn modifier_count(&self, tag: &str) -> usize {
        self.modifiers.get(tag).map_or(0, Vec::len)
    }

    /// Number of listeners registered under a tag name.
    pub fn listener_count(&self, tag: &str) -> usize {
        self.events.get(tag).map_or(0, Vec::len)
    }

    /// Whether the registry holds no hooks at all.
    pub fn is_empty(&self) -> bool {
        self.modifiers.values().all(Vec::is_empty) && self.events.values().all(Vec::is_empty)
    }

    /// Drop every modifier and listener.
    pub fn clear(&mut self) {
        self.modifiers.clear();
        self.events.clear();
    }

    /// Move every hook of `other` to the end of this registry's lists.
    pub fn append(&mut self, other: HookRegistry) {
        for (tag, mut chain) in other.modifiers {
            self.modifiers.entry(tag).or_default().append(&mut chain);
        }
        for (tag, mut listeners) in other.events {
            self.events.entry(tag).or_default().append(&mut listeners);
        }
    }
}

impl fmt::Debug for HookRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let counts = |map: &HashMap<String, Vec<Erased>>| {
            map.iter()
                .map(|(tag, hooks)| (tag.clone(), hooks.len()))
                .collect::<HashMap<_, _>>()
        };
        f.debug_struct("HookRegistry")
            .field("modifiers", &counts(&self.modifiers))
            .field("events", &counts(&self.events))
            .finish()
    }
}
