//! # Mock Framework & Testing Guide
//!
//! The `MockClient<T>` type hands out a real [`ResourceClient<T>`] whose requests are answered
//! from a queue of expectations instead of an entity. It lets you unit test the logic *around*
//! a client (request shape, error mapping) without spawning an actor.
//!
//! ## When to use Mocks vs Real Actors
//!
//! | Feature | MockClient | Real Actor |
//! |---------|------------|------------|
//! | **Speed** | Instant (in-memory) | Fast (but involves tokio spawn) |
//! | **Determinism** | 100% Deterministic | Subject to scheduler |
//! | **State** | No real state (expectations) | Real state management |
//! | **Error Injection** | Easy (`return_err`) | Hard (requires specific state) |
//!
//! ## Testing Failure Scenarios
//!
//! The mock makes it easy to inject failures that are hard to provoke with a real actor,
//! such as a store outage surfacing as an action error, or an actor that vanished mid-request.
//!
//! ## Mocking Utilities
//!
//! Use [`create_mock_client`] to get a client and a receiver you drive by hand, or use the
//! fluent [`MockClient`] API.

use crate::framework::{ActorEntity, FrameworkError, ResourceClient, ResourceRequest};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use tokio::sync::{mpsc, oneshot};

// =============================================================================
// EXPECTATION BUILDER API
// =============================================================================

/// An expected request and the canned answer for it.
enum Expectation<T: ActorEntity> {
    /// `None` drops the responder, which the client observes as `ActorDropped`.
    Get { response: Option<T> },
    Action {
        response: Result<T::ActionResult, T::Error>,
    },
    Stop { response: Option<T> },
}

type Expectations<T> = Arc<Mutex<VecDeque<Expectation<T>>>>;

/// A mock client with expectation tracking for fluent testing.
///
/// Expectations are consumed in FIFO order; a request that does not match the next
/// expectation panics the mock task, which the caller observes as `ActorDropped`.
pub struct MockClient<T: ActorEntity> {
    client: ResourceClient<T>,
    expectations: Expectations<T>,
    _handle: tokio::task::JoinHandle<()>,
}

impl<T: ActorEntity> Default for MockClient<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: ActorEntity> MockClient<T> {
    /// Creates a new mock client with no expectations.
    pub fn new() -> Self {
        let (sender, mut receiver) = mpsc::channel::<ResourceRequest<T>>(100);
        let expectations: Expectations<T> = Arc::new(Mutex::new(VecDeque::new()));
        let expectations_clone = expectations.clone();

        let handle = tokio::spawn(async move {
            while let Some(request) = receiver.recv().await {
                let expectation = expectations_clone.lock().unwrap().pop_front();

                match (request, expectation) {
                    (ResourceRequest::Get { respond_to }, Some(Expectation::Get { response })) => {
                        if let Some(entity) = response {
                            let _ = respond_to.send(entity);
                        }
                    }
                    (
                        ResourceRequest::Action { respond_to, .. },
                        Some(Expectation::Action { response }),
                    ) => {
                        let _ = respond_to.send(response);
                    }
                    (
                        ResourceRequest::Stop { respond_to },
                        Some(Expectation::Stop { response }),
                    ) => {
                        if let Some(entity) = response {
                            let _ = respond_to.send(entity);
                        }
                    }
                    _ => {
                        panic!("Unexpected request or expectation mismatch");
                    }
                }
            }
        });

        Self {
            client: ResourceClient::new(sender),
            expectations,
            _handle: handle,
        }
    }

    /// Returns the client for use in tests.
    pub fn client(&self) -> ResourceClient<T> {
        self.client.clone()
    }

    /// Expects a `get` request.
    pub fn expect_get(&mut self) -> StateExpectationBuilder<T> {
        StateExpectationBuilder {
            expectations: self.expectations.clone(),
            stop: false,
        }
    }

    /// Expects a `stop` request.
    pub fn expect_stop(&mut self) -> StateExpectationBuilder<T> {
        StateExpectationBuilder {
            expectations: self.expectations.clone(),
            stop: true,
        }
    }

    /// Expects an `action` request.
    pub fn expect_action(&mut self) -> ActionExpectationBuilder<T> {
        ActionExpectationBuilder {
            expectations: self.expectations.clone(),
        }
    }

    /// Verifies that all expectations were met.
    pub fn verify(&self) {
        let exps = self.expectations.lock().unwrap();
        if !exps.is_empty() {
            panic!("Not all expectations were met. {} remaining", exps.len());
        }
    }
}

/// Builder for `get` and `stop` expectations.
pub struct StateExpectationBuilder<T: ActorEntity> {
    expectations: Expectations<T>,
    stop: bool,
}

impl<T: ActorEntity> StateExpectationBuilder<T> {
    /// Answers with `entity`.
    pub fn return_ok(self, entity: T) {
        self.push(Some(entity));
    }

    /// Drops the responder, as an actor that died mid-request would.
    pub fn return_dropped(self) {
        self.push(None);
    }

    fn push(self, response: Option<T>) {
        let expectation = if self.stop {
            Expectation::Stop { response }
        } else {
            Expectation::Get { response }
        };
        self.expectations.lock().unwrap().push_back(expectation);
    }
}

/// Builder for `action` expectations.
pub struct ActionExpectationBuilder<T: ActorEntity> {
    expectations: Expectations<T>,
}

impl<T: ActorEntity> ActionExpectationBuilder<T> {
    /// Sets the expectation to return a successful result.
    pub fn return_ok(self, result: T::ActionResult) {
        let mut exps = self.expectations.lock().unwrap();
        exps.push_back(Expectation::Action {
            response: Ok(result),
        });
    }

    /// Sets the expectation to return an entity error.
    pub fn return_err(self, error: T::Error) {
        let mut exps = self.expectations.lock().unwrap();
        exps.push_back(Expectation::Action {
            response: Err(error),
        });
    }
}

// =============================================================================
// RECEIVER HELPERS
// =============================================================================

/// Creates a client and the receiving end of its mailbox.
///
/// Tests read requests off the receiver, assert on them, and answer through the
/// included responder, which allows simulating success, failure, or delays deterministically.
pub fn create_mock_client<T: ActorEntity>(
    buffer_size: usize,
) -> (ResourceClient<T>, mpsc::Receiver<ResourceRequest<T>>) {
    let (sender, receiver) = mpsc::channel(buffer_size);
    (ResourceClient::new(sender), receiver)
}

/// Helper to verify that the next message is a Get request
pub async fn expect_get<T: ActorEntity>(
    receiver: &mut mpsc::Receiver<ResourceRequest<T>>,
) -> Option<oneshot::Sender<T>> {
    match receiver.recv().await {
        Some(ResourceRequest::Get { respond_to }) => Some(respond_to),
        _ => None,
    }
}

/// Helper to verify that the next message is an Action request
pub async fn expect_action<T: ActorEntity>(
    receiver: &mut mpsc::Receiver<ResourceRequest<T>>,
) -> Option<(
    T::Action,
    oneshot::Sender<Result<T::ActionResult, T::Error>>,
)> {
    match receiver.recv().await {
        Some(ResourceRequest::Action { action, respond_to }) => Some((action, respond_to)),
        _ => None,
    }
}
