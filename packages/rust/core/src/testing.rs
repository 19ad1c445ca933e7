//! Test doubles for the generation collaborator.

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;
use docdigest_generation::{GenerationRequest, TextGenerator};
use docdigest_shared::{DigestError, Result};

type Responder = Box<dyn Fn(&GenerationRequest) -> Result<String> + Send + Sync>;

/// Records every request and answers with a scripted responder.
pub(crate) struct ScriptedGenerator {
    responder: Responder,
    calls: Mutex<Vec<GenerationRequest>>,
}

impl ScriptedGenerator {
    pub(crate) fn new(
        responder: impl Fn(&GenerationRequest) -> Result<String> + Send + Sync + 'static,
    ) -> Self {
        Self {
            responder: Box::new(responder),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Replies with the request text unchanged.
    pub(crate) fn echo() -> Self {
        Self::new(|request| Ok(request.text.clone()))
    }

    /// Always fails.
    pub(crate) fn failing() -> Self {
        Self::new(|_| Err(DigestError::Generation("service unavailable".into())))
    }

    /// Replies from a queue, failing once it runs dry.
    pub(crate) fn from_replies(replies: Vec<Result<String>>) -> Self {
        let queue = Mutex::new(VecDeque::from(replies));
        Self::new(move |_| {
            queue
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Err(DigestError::Generation("script exhausted".into())))
        })
    }

    pub(crate) fn calls(&self) -> Vec<GenerationRequest> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl TextGenerator for ScriptedGenerator {
    async fn generate(&self, request: &GenerationRequest) -> Result<String> {
        self.calls.lock().unwrap().push(request.clone());
        (self.responder)(request)
    }
}
