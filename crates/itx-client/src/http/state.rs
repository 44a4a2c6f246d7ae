//! Shared state of the interaction endpoint

use itx_common::SignatureVerifier;
use itx_dispatch::Dispatcher;
use std::sync::Arc;
use std::time::Duration;

/// State shared by every request; nothing in it is mutated per request
#[derive(Clone)]
pub struct HttpState {
    dispatcher: Arc<Dispatcher>,
    verifier: Arc<SignatureVerifier>,
    response_deadline: Duration,
}

impl HttpState {
    pub fn new(dispatcher: Arc<Dispatcher>, verifier: SignatureVerifier, response_deadline: Duration) -> Self {
        Self {
            dispatcher,
            verifier: Arc::new(verifier),
            response_deadline,
        }
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    pub fn verifier(&self) -> &SignatureVerifier {
        &self.verifier
    }

    /// How long a request waits for the initial response before answering 204
    pub fn response_deadline(&self) -> Duration {
        self.response_deadline
    }
}

impl std::fmt::Debug for HttpState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpState")
            .field("dispatcher", &"Dispatcher")
            .field("response_deadline", &self.response_deadline)
            .finish_non_exhaustive()
    }
}
