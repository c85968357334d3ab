//! Sequential event dispatch with deferral.
//!
//! The dispatcher hands one event at a time to an [`EventHandler`] and waits
//! for it to finish before touching the next. A handler that cannot act yet
//! returns [`EventOutcome::Deferred`]; the event is persisted in the
//! key/value store and redelivered after the next event, so an event that
//! arrived before its prerequisites gets another chance once something else
//! has happened. Handlers never retry; only the dispatcher redelivers.

use std::collections::VecDeque;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info};

use crate::error::{Error, Result};
use crate::event::UnitEvent;
use crate::store::{get_typed, set_typed, KeyValueStore};
use crate::types::EventId;

/// Store key holding events awaiting redelivery.
pub const DEFERRED_EVENTS_KEY: &str = "dispatcher.deferred";

/// What a handler did with an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EventOutcome {
    /// The event was fully handled (including deliberately ignored).
    Handled,
    /// Preconditions are not met yet; redeliver later.
    Deferred,
}

/// Trait for handling unit events.
#[async_trait]
pub trait EventHandler: Send + Sync {
    /// Error surfaced when handling fails outright.
    type Error: std::error::Error + Send + Sync + 'static;

    /// Handle one event to completion.
    async fn handle(&self, event: &UnitEvent) -> std::result::Result<EventOutcome, Self::Error>;
}

/// Events processed by a single [`Dispatcher::dispatch`] call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DispatchReport {
    /// Events handled, in delivery order.
    pub handled: Vec<EventId>,
    /// Events deferred again and still pending.
    pub deferred: Vec<EventId>,
}

impl DispatchReport {
    /// Check whether every delivered event was handled.
    pub fn all_handled(&self) -> bool {
        self.deferred.is_empty()
    }
}

/// Delivers events to a handler one at a time, persisting deferred events.
pub struct Dispatcher<H: EventHandler> {
    handler: H,
    store: Arc<dyn KeyValueStore>,
}

impl<H: EventHandler> Dispatcher<H> {
    /// Create a new dispatcher.
    pub fn new(handler: H, store: Arc<dyn KeyValueStore>) -> Self {
        Self { handler, store }
    }

    /// Get the handler.
    pub fn handler(&self) -> &H {
        &self.handler
    }

    /// Events currently waiting for redelivery.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read.
    pub async fn pending(&self) -> Result<Vec<UnitEvent>> {
        Ok(get_typed(self.store.as_ref(), DEFERRED_EVENTS_KEY)
            .await?
            .unwrap_or_default())
    }

    /// Deliver `event`, then redeliver every previously deferred event.
    ///
    /// Pending events that `event` supersedes are dropped first, so stale
    /// relation data never overwrites newer data and repeated
    /// `config_changed` events collapse into one.
    ///
    /// When a redelivered event is handled, events deferred earlier in the
    /// same call get another pass, since it may have unblocked them. Passes
    /// stop once no redelivered event is handled; whatever is still deferred
    /// stays queued for the next call.
    ///
    /// If the handler fails, the failing event and everything not yet
    /// delivered are kept for the next call and the error is returned.
    ///
    /// # Errors
    ///
    /// Returns an error if the store fails or the handler fails.
    pub async fn dispatch(&self, event: UnitEvent) -> Result<DispatchReport> {
        let (superseded, pending): (Vec<_>, Vec<_>) = self
            .pending()
            .await?
            .into_iter()
            .partition(|old| event.supersedes(old));
        for old in &superseded {
            debug!(
                event_id = %old.event_id(),
                event_type = old.event_type(),
                "Dropping superseded pending event"
            );
        }

        let mut queue: VecDeque<UnitEvent> = VecDeque::from([event]);
        queue.extend(pending);

        let mut report = DispatchReport::default();
        let mut fresh = true;

        loop {
            let mut still_pending = Vec::new();
            let mut redelivered_handled = false;

            while let Some(event) = queue.pop_front() {
                let redelivered = !std::mem::replace(&mut fresh, false);
                debug!(
                    event_id = %event.event_id(),
                    event_type = event.event_type(),
                    redelivered,
                    "Delivering event"
                );

                match self.handler.handle(&event).await {
                    Ok(EventOutcome::Handled) => {
                        report.handled.push(event.event_id());
                        redelivered_handled |= redelivered;
                    }
                    Ok(EventOutcome::Deferred) => {
                        info!(
                            event_id = %event.event_id(),
                            event_type = event.event_type(),
                            "Event deferred"
                        );
                        still_pending.push(event);
                    }
                    Err(e) => {
                        error!(
                            event_id = %event.event_id(),
                            event_type = event.event_type(),
                            error = %e,
                            "Event handler failed; event kept for retry"
                        );
                        let event_type = event.event_type();
                        still_pending.push(event);
                        still_pending.extend(queue);
                        self.save_pending(&still_pending).await?;
                        return Err(Error::handler_failed(event_type, e));
                    }
                }
            }

            // A redelivered event may have unblocked one deferred before it.
            if redelivered_handled && !still_pending.is_empty() {
                queue.extend(still_pending);
                continue;
            }

            report.deferred = still_pending.iter().map(UnitEvent::event_id).collect();
            self.save_pending(&still_pending).await?;
            return Ok(report);
        }
    }

    async fn save_pending(&self, events: &[UnitEvent]) -> Result<()> {
        if events.is_empty() {
            self.store.remove(DEFERRED_EVENTS_KEY).await
        } else {
            set_typed(self.store.as_ref(), DEFERRED_EVENTS_KEY, &events).await
        }
    }
}
