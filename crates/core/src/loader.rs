//! Fetch coordination: request generations and the async driver.
//!
//! Every filter change starts a new generation. Only responses tagged with the
//! current generation may reach the picker, whatever order the source
//! resolves them in. Superseded work is also cancelled early, but correctness
//! never depends on that.

use std::sync::Arc;

use tokio::runtime::Handle;
use tokio::sync::{mpsc, oneshot};
use tokio_util::sync::CancellationToken;

use crate::diagnostics::{DiagnosticEvent, Diagnostics};
use crate::error::FetchError;
use crate::model::Entity;
use crate::source::{EntitySource, FetchPage, FetchRequest};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchTicket {
    pub generation: u64,
    pub request: FetchRequest,
}

impl FetchTicket {
    pub fn is_first_page(&self) -> bool {
        self.request.cursor == 0
    }
}

#[derive(Debug, Clone, Default)]
pub struct FetchTracker {
    generation: u64,
    last_request: Option<FetchRequest>,
}

impl FetchTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Start a new generation for `request`, superseding everything in flight.
    pub fn issue(&mut self, request: FetchRequest) -> FetchTicket {
        self.generation = self.generation.wrapping_add(1);
        self.last_request = Some(request.clone());
        FetchTicket {
            generation: self.generation,
            request,
        }
    }

    /// Follow-up page within the current generation.
    pub fn continue_with(&mut self, request: FetchRequest) -> FetchTicket {
        self.last_request = Some(request.clone());
        FetchTicket {
            generation: self.generation,
            request,
        }
    }

    /// Re-issue the last request unchanged under a fresh generation.
    pub fn retry(&mut self) -> Option<FetchTicket> {
        let request = self.last_request.clone()?;
        Some(self.issue(request))
    }

    pub fn accepts(&self, ticket: &FetchTicket) -> bool {
        ticket.generation == self.generation
    }
}

#[derive(Debug, Clone)]
pub struct FetchOutcome {
    pub ticket: FetchTicket,
    pub result: Result<FetchPage, FetchError>,
}

/// Runs fetches on a Tokio runtime and hands results back over a channel
/// that a synchronous UI loop drains on its own schedule.
pub struct FetchDriver {
    source: Arc<dyn EntitySource>,
    runtime: Handle,
    sender: mpsc::UnboundedSender<FetchOutcome>,
    receiver: mpsc::UnboundedReceiver<FetchOutcome>,
    cancel: Option<(u64, CancellationToken)>,
    diagnostics: Arc<Diagnostics>,
    in_flight: usize,
    universe: Option<oneshot::Receiver<Result<Vec<Entity>, FetchError>>>,
}

impl FetchDriver {
    pub fn new(
        source: Arc<dyn EntitySource>,
        runtime: Handle,
        diagnostics: Arc<Diagnostics>,
    ) -> Self {
        let (sender, receiver) = mpsc::unbounded_channel();
        Self {
            source,
            runtime,
            sender,
            receiver,
            cancel: None,
            diagnostics,
            in_flight: 0,
            universe: None,
        }
    }

    pub fn in_flight(&self) -> usize {
        self.in_flight
    }

    /// Spawn the fetch for `ticket`. A ticket from a newer generation cancels
    /// whatever the previous generation still has running.
    pub fn spawn(&mut self, ticket: FetchTicket) {
        let token = match &self.cancel {
            Some((generation, token)) if *generation == ticket.generation => token.clone(),
            _ => {
                if let Some((_, previous)) = self.cancel.take() {
                    previous.cancel();
                }
                let token = CancellationToken::new();
                self.cancel = Some((ticket.generation, token.clone()));
                token
            }
        };

        self.diagnostics.record(DiagnosticEvent::FetchIssued {
            generation: ticket.generation,
            query: ticket.request.filter.query.clone(),
            cursor: ticket.request.cursor,
        });
        self.in_flight += 1;

        let source = Arc::clone(&self.source);
        let sender = self.sender.clone();
        self.runtime.spawn(async move {
            let result = tokio::select! {
                _ = token.cancelled() => {
                    Err(FetchError::Aborted("superseded by a newer filter".into()))
                }
                result = source.fetch(&ticket.request) => result,
            };
            let _ = sender.send(FetchOutcome { ticket, result });
        });
    }

    /// Start loading the source's whole universe in the background. A load
    /// already running is replaced.
    pub fn load_universe(&mut self) {
        let (sender, receiver) = oneshot::channel();
        let source = Arc::clone(&self.source);
        self.runtime.spawn(async move {
            let _ = sender.send(source.universe().await);
        });
        self.universe = Some(receiver);
    }

    pub fn universe_pending(&self) -> bool {
        self.universe.is_some()
    }

    /// The universe load's result once it has finished. Never blocks.
    pub fn take_universe(&mut self) -> Option<Result<Vec<Entity>, FetchError>> {
        let result = match self.universe.as_mut()?.try_recv() {
            Ok(result) => result,
            Err(oneshot::error::TryRecvError::Empty) => return None,
            Err(oneshot::error::TryRecvError::Closed) => {
                Err(FetchError::Aborted("universe load was dropped".into()))
            }
        };
        self.universe = None;
        if let Ok(entities) = &result {
            self.diagnostics.record(DiagnosticEvent::UniverseLoaded {
                entities: entities.len(),
            });
        }
        Some(result)
    }

    /// Completed outcomes, oldest first. Never blocks.
    pub fn drain(&mut self) -> Vec<FetchOutcome> {
        let mut outcomes = Vec::new();
        while let Ok(outcome) = self.receiver.try_recv() {
            self.in_flight = self.in_flight.saturating_sub(1);
            outcomes.push(outcome);
        }
        outcomes
    }

    /// Wait for the next outcome. Used by non-interactive callers and tests.
    pub async fn next_outcome(&mut self) -> Option<FetchOutcome> {
        let outcome = self.receiver.recv().await?;
        self.in_flight = self.in_flight.saturating_sub(1);
        Some(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Entity, EntityKind, FilterState};
    use crate::source::MemorySource;
    use async_trait::async_trait;
    use std::time::Duration;

    fn request(query: &str) -> FetchRequest {
        FetchRequest::first_page(FilterState::new(query, None), 50)
    }

    #[test]
    fn newer_generation_supersedes_older_tickets() {
        let mut tracker = FetchTracker::new();
        let first = tracker.issue(request("a"));
        let second = tracker.issue(request("ab"));

        assert!(!tracker.accepts(&first));
        assert!(tracker.accepts(&second));
    }

    #[test]
    fn follow_up_pages_share_the_generation() {
        let mut tracker = FetchTracker::new();
        let first = tracker.issue(request("a"));
        let more = tracker.continue_with(first.request.next_page(50));
        assert_eq!(more.generation, first.generation);
        assert!(tracker.accepts(&more));
    }

    #[test]
    fn retry_repeats_the_identical_request() {
        let mut tracker = FetchTracker::new();
        assert!(tracker.retry().is_none());

        let failed = tracker.issue(request("baki"));
        let retried = tracker.retry().unwrap();
        assert_eq!(retried.request, failed.request);
        assert!(retried.generation > failed.generation);
    }

    /// Answers each query after a per-query delay.
    struct DelayedSource {
        inner: MemorySource,
    }

    #[async_trait]
    impl EntitySource for DelayedSource {
        async fn fetch(&self, request: &FetchRequest) -> Result<FetchPage, FetchError> {
            let delay = if request.filter.query == "slow" { 500 } else { 10 };
            tokio::time::sleep(Duration::from_millis(delay)).await;
            self.inner.fetch(request).await
        }
    }

    #[tokio::test(start_paused = true)]
    async fn superseded_fetch_is_cancelled_and_never_accepted() {
        let source = DelayedSource {
            inner: MemorySource::new(vec![
                Entity::new(1, EntityKind::User, "slow"),
                Entity::new(2, EntityKind::User, "fast"),
            ]),
        };
        let diagnostics = Arc::new(Diagnostics::new(16));
        let mut driver = FetchDriver::new(Arc::new(source), Handle::current(), diagnostics);
        let mut tracker = FetchTracker::new();

        let stale = tracker.issue(request("slow"));
        driver.spawn(stale.clone());
        let fresh = tracker.issue(request("fast"));
        driver.spawn(fresh.clone());

        let mut accepted = Vec::new();
        for _ in 0..2 {
            let outcome = driver.next_outcome().await.unwrap();
            if tracker.accepts(&outcome.ticket) {
                accepted.push(outcome);
            } else {
                assert_eq!(outcome.ticket, stale);
            }
        }

        assert_eq!(accepted.len(), 1);
        assert_eq!(accepted[0].ticket, fresh);
        let page = accepted[0].result.as_ref().unwrap();
        assert_eq!(page.items[0].label, "fast");
        assert_eq!(driver.in_flight(), 0);
    }

    #[tokio::test]
    async fn universe_loads_beside_paged_fetches() {
        let source = MemorySource::new(
            (1..=3)
                .map(|n| Entity::new(n, EntityKind::User, format!("user {n}")))
                .collect(),
        );
        let diagnostics = Arc::new(Diagnostics::new(16));
        let mut driver =
            FetchDriver::new(Arc::new(source), Handle::current(), Arc::clone(&diagnostics));
        assert!(driver.take_universe().is_none());

        driver.load_universe();
        assert!(driver.universe_pending());
        let loaded = loop {
            if let Some(result) = driver.take_universe() {
                break result.unwrap();
            }
            tokio::time::sleep(Duration::from_millis(1)).await;
        };

        assert_eq!(loaded.len(), 3);
        assert!(!driver.universe_pending());
        assert!(diagnostics
            .snapshot()
            .iter()
            .any(|record| record.event == DiagnosticEvent::UniverseLoaded { entities: 3 }));
    }
}
