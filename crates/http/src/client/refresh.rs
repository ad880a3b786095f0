//! Single-flight access token renewal
//!
//! Any number of requests can fail authentication at the same time. The
//! first one to ask for a renewal becomes the leader and performs the refresh
//! call; the others are parked until the leader settles and then receive the
//! same outcome. At most one refresh is in flight per coordinator.

use super::error::{ApiError, ErrorKind};
use std::fmt;
use std::future::Future;
use std::sync::{Mutex, PoisonError};
use tokio::sync::oneshot;
use tracing::debug;

/// New access token, or the reason renewal failed
pub type RefreshOutcome = Result<String, ApiError>;

enum RefreshState {
    Idle,
    /// A refresh is in flight; parked requests wait in FIFO order
    Refreshing {
        waiters: Vec<oneshot::Sender<RefreshOutcome>>,
    },
}

enum Role {
    Leader,
    Follower(oneshot::Receiver<RefreshOutcome>),
}

/// Coordinates token renewal for one client
pub struct RefreshCoordinator {
    state: Mutex<RefreshState>,
}

impl Default for RefreshCoordinator {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for RefreshCoordinator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RefreshCoordinator")
            .field("refreshing", &self.is_refreshing())
            .field("waiting", &self.waiting())
            .finish()
    }
}

impl RefreshCoordinator {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(RefreshState::Idle),
        }
    }

    pub fn is_refreshing(&self) -> bool {
        matches!(*self.lock(), RefreshState::Refreshing { .. })
    }

    /// Number of requests parked behind the in-flight refresh
    pub fn waiting(&self) -> usize {
        match &*self.lock() {
            RefreshState::Idle => 0,
            RefreshState::Refreshing { waiters } => waiters.len(),
        }
    }

    /// Obtain a renewed token, running `refresh` only if no renewal is
    /// already in flight
    pub async fn run<F, Fut>(&self, refresh: F) -> RefreshOutcome
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = RefreshOutcome>,
    {
        match self.join() {
            Role::Follower(receiver) => receiver.await.unwrap_or_else(|_| Err(abandoned())),
            Role::Leader => {
                let guard = LeaderGuard {
                    coordinator: self,
                    armed: true,
                };
                let outcome = refresh().await;
                guard.settle(&outcome);
                outcome
            }
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, RefreshState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn join(&self) -> Role {
        let mut state = self.lock();
        match &mut *state {
            RefreshState::Idle => {
                *state = RefreshState::Refreshing {
                    waiters: Vec::new(),
                };
                debug!("Starting token refresh");
                Role::Leader
            }
            RefreshState::Refreshing { waiters } => {
                let (sender, receiver) = oneshot::channel();
                waiters.push(sender);
                debug!(waiting = waiters.len(), "Token refresh in flight, request parked");
                Role::Follower(receiver)
            }
        }
    }

    /// Return to idle and hand `outcome` to every parked request
    fn settle(&self, outcome: &RefreshOutcome) -> usize {
        let previous = std::mem::replace(&mut *self.lock(), RefreshState::Idle);
        let waiters = match previous {
            RefreshState::Idle => Vec::new(),
            RefreshState::Refreshing { waiters } => waiters,
        };

        let count = waiters.len();
        for waiter in waiters {
            // A receiver that went away no longer needs the token
            let _ = waiter.send(outcome.clone());
        }
        debug!(
            released = count,
            success = outcome.is_ok(),
            "Token refresh settled"
        );
        count
    }
}

/// Settles parked requests even if the leader's future is dropped mid-refresh
struct LeaderGuard<'a> {
    coordinator: &'a RefreshCoordinator,
    armed: bool,
}

impl LeaderGuard<'_> {
    fn settle(mut self, outcome: &RefreshOutcome) {
        self.armed = false;
        self.coordinator.settle(outcome);
    }
}

impl Drop for LeaderGuard<'_> {
    fn drop(&mut self) {
        if self.armed {
            self.coordinator.settle(&Err(abandoned()));
        }
    }
}

fn abandoned() -> ApiError {
    ApiError::new(ErrorKind::Unauthenticated, "Token refresh was abandoned").with_status(401)
}
