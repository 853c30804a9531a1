// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Service lifecycle events.
//!
//! The Kubernetes watcher reports objects as they are applied or deleted, and replays
//! the full set after every (re)list. The dispatcher wants informer-style events with
//! before/after state instead, so [`EventTranslator`] keeps the last seen
//! [`ServiceView`] per `namespace/name` and turns watcher events into
//! [`ServiceEvent`]s:
//!
//! | Watcher event | Cache | Emitted |
//! |---|---|---|
//! | `Apply` / `InitApply` | key unknown | `Created(new)` |
//! | `Apply` / `InitApply` | key known | `Updated(old, new)` |
//! | `Delete` | any | `Deleted(obj)` |
//! | `InitDone` | keys missing from the re-list | `Deleted(last known)` |
//!
//! [`EventTranslator::resync`] re-delivers `Updated(v, v)` for every cached Service;
//! [`service_events`] calls it every resync interval.

use std::collections::{BTreeMap, BTreeSet, VecDeque};
use std::fmt;
use std::time::Duration;

use futures::stream::{self, BoxStream};
use futures::{Stream, StreamExt};
use k8s_openapi::api::core::v1::Service;
use kube::runtime::watcher::{self, Event};
use kube::runtime::WatchStreamExt;
use kube::Api;
use tokio::time::{Instant, Interval, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::service_view::ServiceView;

/// A Service lifecycle event with full object state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServiceEvent {
    Created(ServiceView),
    Updated(ServiceView, ServiceView),
    Deleted(ServiceView),
}

impl ServiceEvent {
    /// Short lowercase name used in logs and metrics.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Created(_) => "created",
            Self::Updated(_, _) => "updated",
            Self::Deleted(_) => "deleted",
        }
    }

    /// The current state of the object (the new state for updates).
    #[must_use]
    pub fn object(&self) -> &ServiceView {
        match self {
            Self::Created(view) | Self::Deleted(view) | Self::Updated(_, view) => view,
        }
    }
}

impl fmt::Display for ServiceEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.kind(), self.object().key())
    }
}

/// Turns watcher events into [`ServiceEvent`]s.
#[derive(Debug, Default)]
pub struct EventTranslator {
    known: BTreeMap<String, ServiceView>,
    /// Keys seen since the last `Init`; `Some` while a re-list is in progress
    relisted: Option<BTreeSet<String>>,
}

impl EventTranslator {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of Services currently known.
    #[must_use]
    pub fn len(&self) -> usize {
        self.known.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.known.is_empty()
    }

    /// Translate one watcher event.
    pub fn translate(&mut self, event: Event<Service>) -> Vec<ServiceEvent> {
        match event {
            Event::Apply(service) => vec![self.apply(ServiceView::from(&service))],
            Event::Delete(service) => {
                let view = ServiceView::from(&service);
                self.known.remove(&view.key());
                vec![ServiceEvent::Deleted(view)]
            }
            Event::Init => {
                debug!(known = self.known.len(), "Service re-list started");
                self.relisted = Some(BTreeSet::new());
                Vec::new()
            }
            Event::InitApply(service) => {
                let view = ServiceView::from(&service);
                if let Some(relisted) = self.relisted.as_mut() {
                    relisted.insert(view.key());
                }
                vec![self.apply(view)]
            }
            Event::InitDone => self.finish_relist(),
        }
    }

    /// `Updated(v, v)` for every known Service, in key order.
    #[must_use]
    pub fn resync(&self) -> Vec<ServiceEvent> {
        self.known
            .values()
            .map(|view| ServiceEvent::Updated(view.clone(), view.clone()))
            .collect()
    }

    fn apply(&mut self, view: ServiceView) -> ServiceEvent {
        match self.known.insert(view.key(), view.clone()) {
            Some(old) => ServiceEvent::Updated(old, view),
            None => ServiceEvent::Created(view),
        }
    }

    fn finish_relist(&mut self) -> Vec<ServiceEvent> {
        let Some(relisted) = self.relisted.take() else {
            return Vec::new();
        };

        let stale: Vec<String> = self
            .known
            .keys()
            .filter(|key| !relisted.contains(*key))
            .cloned()
            .collect();

        debug!(
            listed = relisted.len(),
            stale = stale.len(),
            "Service re-list finished"
        );

        stale
            .into_iter()
            .filter_map(|key| self.known.remove(&key))
            .map(ServiceEvent::Deleted)
            .collect()
    }
}

struct EventStreamState<S> {
    watch: S,
    resync: Interval,
    translator: EventTranslator,
    pending: VecDeque<ServiceEvent>,
}

/// Translate a raw watch stream into [`ServiceEvent`]s, adding periodic resyncs.
///
/// Watch errors are logged and skipped; the stream ends when `watch` ends.
///
/// # Panics
///
/// Panics if `resync_interval` is zero.
pub fn translate_watch<S, E>(
    watch: S,
    resync_interval: Duration,
) -> impl Stream<Item = ServiceEvent> + Send
where
    S: Stream<Item = Result<Event<Service>, E>> + Send + Unpin + 'static,
    E: fmt::Display + Send + 'static,
{
    let mut resync = tokio::time::interval_at(Instant::now() + resync_interval, resync_interval);
    resync.set_missed_tick_behavior(MissedTickBehavior::Delay);

    let state = EventStreamState {
        watch,
        resync,
        translator: EventTranslator::new(),
        pending: VecDeque::new(),
    };

    stream::unfold(state, |mut state| async move {
        loop {
            if let Some(event) = state.pending.pop_front() {
                return Some((event, state));
            }

            tokio::select! {
                next = state.watch.next() => match next {
                    Some(Ok(event)) => {
                        let translated = state.translator.translate(event);
                        state.pending.extend(translated);
                    }
                    Some(Err(e)) => warn!(error = %e, "Service watch error"),
                    None => {
                        info!("Service watch ended");
                        return None;
                    }
                },
                _ = state.resync.tick() => {
                    debug!(services = state.translator.len(), "Resyncing services");
                    let resynced = state.translator.resync();
                    state.pending.extend(resynced);
                }
            }
        }
    })
}

/// Watch Services through `api` and yield [`ServiceEvent`]s.
///
/// Reconnects use kube's default watch backoff.
pub fn service_events(
    api: Api<Service>,
    watcher_config: watcher::Config,
    resync_interval: Duration,
) -> impl Stream<Item = ServiceEvent> + Send {
    let watch: BoxStream<'static, Result<Event<Service>, watcher::Error>> =
        watcher::watcher(api, watcher_config).default_backoff().boxed();
    translate_watch(watch, resync_interval)
}

#[cfg(test)]
#[path = "events_tests.rs"]
mod events_tests;
