//! Supersession of in-flight load and page-render requests
//!
//! Only one load or page render is in flight per engine. Issuing a new
//! request cancels the previous token, and a completion whose ticket is
//! no longer current is discarded as stale.

use crate::error::{EngineError, EngineResult};
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

/// Cooperative cancellation flag shared with whoever performs the render
///
/// Clones share the same state, so a worker holding a clone observes
/// supersession without a reference back to the engine.
#[derive(Debug, Clone)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self {
            cancelled: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Cancel this token and all of its clones. Idempotent.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }
}

impl Default for CancellationToken {
    fn default() -> Self {
        Self::new()
    }
}

/// What an in-flight request is for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RequestKind {
    Load,
    Page { page_index: u32 },
}

/// Identifies one issued request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Ticket {
    generation: u64,
    kind: RequestKind,
}

impl Ticket {
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn kind(&self) -> RequestKind {
        self.kind
    }
}

#[derive(Debug)]
struct InFlight {
    ticket: Ticket,
    token: CancellationToken,
}

/// Issues tickets and decides which completion is still wanted (last request wins)
#[derive(Debug, Default)]
pub struct RequestTracker {
    next_generation: u64,
    in_flight: Option<InFlight>,
}

impl RequestTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Issue a new request, cancelling whatever was in flight
    pub fn issue(&mut self, kind: RequestKind) -> (Ticket, CancellationToken) {
        if let Some(previous) = self.in_flight.take() {
            previous.token.cancel();
            tracing::debug!(
                superseded = previous.ticket.generation,
                "Cancelled in-flight request"
            );
        }

        self.next_generation += 1;
        let ticket = Ticket {
            generation: self.next_generation,
            kind,
        };
        let token = CancellationToken::new();
        self.in_flight = Some(InFlight {
            ticket,
            token: token.clone(),
        });
        (ticket, token)
    }

    /// Whether `ticket` is the request currently in flight
    pub fn is_current(&self, ticket: &Ticket) -> bool {
        self.in_flight
            .as_ref()
            .is_some_and(|in_flight| in_flight.ticket == *ticket)
    }

    /// Retire `ticket` if it is current, otherwise report it as stale
    pub fn resolve(&mut self, ticket: &Ticket) -> EngineResult<()> {
        if self.is_current(ticket) {
            self.in_flight = None;
            Ok(())
        } else {
            Err(EngineError::RenderStale {
                generation: ticket.generation,
            })
        }
    }

    /// The request currently in flight, if any
    pub fn pending(&self) -> Option<Ticket> {
        self.in_flight.as_ref().map(|in_flight| in_flight.ticket)
    }

    pub fn has_pending(&self) -> bool {
        self.in_flight.is_some()
    }

    /// Cancel the in-flight request without issuing a new one
    pub fn cancel(&mut self) -> bool {
        match self.in_flight.take() {
            Some(in_flight) => {
                in_flight.token.cancel();
                true
            }
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_clones_share_state() {
        let token = CancellationToken::new();
        let worker = token.clone();
        assert!(!worker.is_cancelled());
        token.cancel();
        token.cancel();
        assert!(worker.is_cancelled());
    }

    #[test]
    fn newer_request_supersedes_older() {
        let mut tracker = RequestTracker::new();
        let (first, first_token) = tracker.issue(RequestKind::Load);
        let (second, second_token) = tracker.issue(RequestKind::Page { page_index: 2 });

        assert!(first_token.is_cancelled());
        assert!(!second_token.is_cancelled());
        assert!(!tracker.is_current(&first));
        assert!(tracker.is_current(&second));
        assert!(second.generation() > first.generation());
        assert_eq!(second.kind(), RequestKind::Page { page_index: 2 });
    }

    #[test]
    fn stale_completion_is_rejected() {
        let mut tracker = RequestTracker::new();
        let (first, _) = tracker.issue(RequestKind::Load);
        let (second, _) = tracker.issue(RequestKind::Load);

        let err = tracker.resolve(&first).unwrap_err();
        assert!(matches!(err, EngineError::RenderStale { generation } if generation == first.generation()));

        assert!(tracker.resolve(&second).is_ok());
        assert!(!tracker.has_pending());
        // Resolving twice is stale too
        assert!(tracker.resolve(&second).is_err());
    }

    #[test]
    fn cancel_clears_in_flight() {
        let mut tracker = RequestTracker::new();
        let (ticket, token) = tracker.issue(RequestKind::Load);
        assert_eq!(tracker.pending(), Some(ticket));
        assert!(tracker.cancel());
        assert!(token.is_cancelled());
        assert!(!tracker.cancel());
        assert_eq!(tracker.pending(), None);
    }
}
