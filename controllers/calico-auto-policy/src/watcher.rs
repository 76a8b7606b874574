//! Kubernetes NetworkPolicy watcher.
//!
//! Turns the raw kube watch stream into [`PolicyEvent`]s: applies are
//! classified as added or updated against the set of known objects, a
//! re-list reports objects that disappeared while the watch was down, and a
//! periodic tick re-emits every known object as updated.

use crate::error::ControllerError;
use crate::events::{PolicyEvent, UpstreamPolicy};
use calico_client::ObjectKey;
use futures::{Stream, StreamExt, future, stream};
use kube::Api;
use kube::core::DynamicObject;
use kube_runtime::WatchStreamExt;
use kube_runtime::watcher::{self, Event};
use policy_document::{Document, DocumentError};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt::Display;
use std::time::Duration;
use tokio::time::{Instant, MissedTickBehavior, interval_at};
use tracing::{debug, info};

/// Item type of the policy event stream.
pub type EventResult = Result<PolicyEvent, ControllerError>;

/// Watches NetworkPolicies through `api`, resyncing every `resync`.
///
/// Watch failures are retried with kube's default backoff and surface as
/// `Err` items; the stream itself does not end.
pub fn policy_events(api: Api<DynamicObject>, resync: Duration) -> impl Stream<Item = EventResult> + Send {
    info!("Starting NetworkPolicy watcher (resync every {:?})", resync);
    let watch = watcher::watcher(api, watcher::Config::default()).default_backoff();
    track(watch, resync)
}

enum Signal<E> {
    Watch(Result<Event<DynamicObject>, E>),
    Resync,
}

/// Runs a raw watch stream through an [`EventTracker`] and merges in resync ticks.
pub fn track<S, E>(watch: S, resync: Duration) -> impl Stream<Item = EventResult> + Send
where
    S: Stream<Item = Result<Event<DynamicObject>, E>> + Send,
    E: Display + Send,
{
    // A sweep that outlasts the period yields one catch-up tick, not a burst
    let mut interval = interval_at(Instant::now() + resync, resync);
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let ticks = stream::unfold(interval, |mut interval| async move {
        interval.tick().await;
        Some((Signal::Resync, interval))
    });

    stream::select(watch.map(Signal::Watch), ticks)
        .scan(EventTracker::default(), |tracker, signal| {
            let items = match signal {
                Signal::Watch(Ok(event)) => tracker.observe(event),
                Signal::Watch(Err(e)) => vec![Err(ControllerError::Watch(e.to_string()))],
                Signal::Resync => tracker.resync().into_iter().map(Ok).collect(),
            };
            future::ready(Some(stream::iter(items)))
        })
        .flatten()
}

/// Classifies watch events against the set of objects seen so far.
#[derive(Debug, Default)]
pub struct EventTracker {
    known: BTreeMap<ObjectKey, Document>,
    /// Keys seen since the last `Init`, while a re-list is in progress
    relisted: Option<BTreeSet<ObjectKey>>,
}

impl EventTracker {
    /// Feeds one raw watch event, returning the resulting policy events.
    pub fn observe(&mut self, event: Event<DynamicObject>) -> Vec<EventResult> {
        match event {
            Event::Init => {
                debug!("NetworkPolicy re-list started");
                self.relisted = Some(BTreeSet::new());
                Vec::new()
            }
            Event::InitApply(object) | Event::Apply(object) => vec![self.apply(&object)],
            Event::InitDone => self.finish_relist(),
            Event::Delete(object) => vec![self.delete(&object)],
        }
    }

    /// Every known object as `Updated`, in key order.
    pub fn resync(&self) -> Vec<PolicyEvent> {
        if self.is_empty() {
            return Vec::new();
        }
        debug!("Resyncing {} NetworkPolicies", self.len());
        self.known
            .iter()
            .map(|(key, document)| {
                PolicyEvent::Updated(UpstreamPolicy {
                    key: key.clone(),
                    document: document.clone(),
                })
            })
            .collect()
    }

    /// Number of objects currently known.
    #[must_use]
    pub fn len(&self) -> usize {
        self.known.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.known.is_empty()
    }

    fn apply(&mut self, object: &DynamicObject) -> EventResult {
        let key = object_key(object)?;
        if let Some(relisted) = &mut self.relisted {
            relisted.insert(key.clone());
        }
        let document = to_document(object)?;
        let policy = UpstreamPolicy {
            key: key.clone(),
            document: document.clone(),
        };
        Ok(match self.known.insert(key, document) {
            None => PolicyEvent::Added(policy),
            Some(_) => PolicyEvent::Updated(policy),
        })
    }

    fn delete(&mut self, object: &DynamicObject) -> EventResult {
        let key = object_key(object)?;
        let last_known = self.known.remove(&key);
        let document = to_document(object).ok().or(last_known).unwrap_or_default();
        Ok(PolicyEvent::Deleted(UpstreamPolicy { key, document }))
    }

    fn finish_relist(&mut self) -> Vec<EventResult> {
        let Some(relisted) = self.relisted.take() else {
            return Vec::new();
        };
        let vanished: Vec<ObjectKey> = self
            .known
            .keys()
            .filter(|key| !relisted.contains(key))
            .cloned()
            .collect();
        debug!(
            "NetworkPolicy re-list complete: {} listed, {} vanished",
            relisted.len(),
            vanished.len()
        );
        vanished
            .into_iter()
            .filter_map(|key| {
                let document = self.known.remove(&key)?;
                Some(Ok(PolicyEvent::Deleted(UpstreamPolicy { key, document })))
            })
            .collect()
    }
}

fn object_key(object: &DynamicObject) -> Result<ObjectKey, ControllerError> {
    match (&object.metadata.namespace, &object.metadata.name) {
        (Some(namespace), Some(name)) => Ok(ObjectKey::new(namespace.as_str(), name.as_str())),
        _ => Err(ControllerError::Watch(format!(
            "NetworkPolicy without namespace or name: {:?}",
            object.metadata.name
        ))),
    }
}

fn to_document(object: &DynamicObject) -> Result<Document, ControllerError> {
    let value = serde_json::to_value(object).map_err(DocumentError::from)?;
    Ok(Document::try_from(value)?)
}
