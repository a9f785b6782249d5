//! Session coordination: one generation request from open to terminal outcome.
//!
//! [`drive`] is the decode loop. It reads chunks from a [`Transport`], feeds
//! them through the [`FrameDecoder`] and the classifier, and hands the events
//! to a [`Dispatcher`] whose handler accumulates text and reports to a
//! [`GenerationObserver`]. The observer sees exactly one of `on_complete` or
//! `on_error`, unless the session is cancelled, in which case it sees
//! neither.
//!
//! [`spawn`] runs the same loop on its own task and returns a
//! [`SessionHandle`] exposing progress as a channel and the result as a
//! future.

use std::sync::Arc;

use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::{CancellationToken, DropGuard};
use tracing::{debug, info, info_span, warn, Instrument};
use uuid::Uuid;

use crate::classify::classify;
use crate::client::{ClientError, GenerationError};
use crate::dispatch::{Dispatcher, EventHandler};
use crate::model::{DecodedEvent, DocumentField, ErrorEvent, FinalDocuments, GenerationRequest};
use crate::options::SecretString;
use crate::sse::{Frame, FrameDecoder};
use crate::transport::{ChunkRead, Transport};

/// Message of the error synthesized when the body ends with no terminal frame.
pub const STREAM_ENDED: &str = "stream ended without terminal result";

/// Lifecycle of a session. `Completed`, `Failed` and `Cancelled` are final.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum SessionState {
    Pending,
    Streaming,
    Completed,
    Failed,
    Cancelled,
}

impl SessionState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            SessionState::Completed | SessionState::Failed | SessionState::Cancelled
        )
    }

    /// Whether moving from `self` to `next` is a legal transition.
    pub fn can_transition_to(&self, next: SessionState) -> bool {
        match self {
            SessionState::Pending => next != SessionState::Pending,
            SessionState::Streaming => next.is_terminal(),
            _ => false,
        }
    }
}

/// How a session ended.
#[derive(Debug)]
pub enum SessionOutcome {
    Completed(FinalDocuments),
    Failed(GenerationError),
    Cancelled,
}

impl SessionOutcome {
    pub fn state(&self) -> SessionState {
        match self {
            SessionOutcome::Completed(_) => SessionState::Completed,
            SessionOutcome::Failed(_) => SessionState::Failed,
            SessionOutcome::Cancelled => SessionState::Cancelled,
        }
    }
}

/// Text accumulated so far for each document field.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Transcript {
    pub cover_letter: String,
    pub resume: String,
}

impl Transcript {
    pub fn get(&self, field: DocumentField) -> &str {
        match field {
            DocumentField::CoverLetter => &self.cover_letter,
            DocumentField::Resume => &self.resume,
        }
    }

    pub fn append(&mut self, field: DocumentField, text: &str) {
        match field {
            DocumentField::CoverLetter => self.cover_letter.push_str(text),
            DocumentField::Resume => self.resume.push_str(text),
        }
    }
}

/// Caller-facing callbacks of a session.
pub trait GenerationObserver {
    /// A chunk arrived for `field`; `transcript` already includes it.
    fn on_data(&mut self, field: DocumentField, chunk: &str, transcript: &Transcript) {
        let _ = (field, chunk, transcript);
    }

    fn on_complete(&mut self, documents: &FinalDocuments) {
        let _ = documents;
    }

    fn on_error(&mut self, error: &GenerationError) {
        let _ = error;
    }
}

/// Progress notification delivered through a [`SessionHandle`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgressUpdate {
    pub field: DocumentField,
    pub chunk: String,
    pub transcript: Transcript,
}

/// Dispatcher handler that owns the per-session state and fronts the
/// caller's observer.
struct Coordinator<'a, O> {
    observer: &'a mut O,
    cancel: CancellationToken,
    transcript: Transcript,
    state: watch::Sender<SessionState>,
    outcome: Option<SessionOutcome>,
}

impl<'a, O: GenerationObserver> Coordinator<'a, O> {
    fn transition(&mut self, next: SessionState) {
        let current = *self.state.borrow();
        if current.can_transition_to(next) {
            debug!(from = ?current, to = ?next, "session state change");
            self.state.send_replace(next);
        } else {
            warn!(from = ?current, to = ?next, "ignoring illegal session transition");
        }
    }

    fn fail(&mut self, error: GenerationError) {
        if self.cancel.is_cancelled() {
            return;
        }
        info!(error = %error, "generation failed");
        self.observer.on_error(&error);
        self.outcome = Some(SessionOutcome::Failed(error));
        self.transition(SessionState::Failed);
    }

    fn finish(mut self) -> SessionOutcome {
        let outcome = self.outcome.take().unwrap_or(SessionOutcome::Cancelled);
        if matches!(outcome, SessionOutcome::Cancelled) {
            info!("generation cancelled");
            self.transition(SessionState::Cancelled);
        }
        outcome
    }
}

impl<'a, O: GenerationObserver> EventHandler for Coordinator<'a, O> {
    fn on_partial(&mut self, field: DocumentField, text: String) {
        self.transcript.append(field, &text);
        if !self.cancel.is_cancelled() {
            self.observer.on_data(field, &text, &self.transcript);
        }
    }

    fn on_final(&mut self, documents: FinalDocuments) {
        if self.cancel.is_cancelled() {
            return;
        }
        info!(document_url = %documents.document_url, "generation completed");
        self.observer.on_complete(&documents);
        self.outcome = Some(SessionOutcome::Completed(documents));
        self.transition(SessionState::Completed);
    }

    fn on_error(&mut self, error: ErrorEvent) {
        self.fail(error.into());
    }
}

fn route<H: EventHandler>(dispatcher: &mut Dispatcher<H>, frame: &Frame) {
    match classify(frame) {
        Ok(events) => {
            if events.is_empty() {
                debug!(frame = frame.as_str(), "skipping frame");
            }
            for event in events {
                dispatcher.dispatch(event);
            }
        }
        Err(e) => debug!(error = %e, "dropping undecodable frame"),
    }
}

/// Run one generation to its outcome on the current task.
///
/// Cancelling `cancel` makes any pending read return immediately, discards
/// buffered data, and suppresses every further callback.
pub async fn drive<T, O>(
    transport: &T,
    request: GenerationRequest,
    token: SecretString,
    observer: &mut O,
    cancel: CancellationToken,
) -> SessionOutcome
where
    T: Transport + ?Sized,
    O: GenerationObserver,
{
    let (state, _) = watch::channel(SessionState::Pending);
    let span = info_span!("generation", session = %Uuid::new_v4());
    run_session(transport, request, token, observer, cancel, state)
        .instrument(span)
        .await
}

async fn run_session<T, O>(
    transport: &T,
    request: GenerationRequest,
    token: SecretString,
    observer: &mut O,
    cancel: CancellationToken,
    state: watch::Sender<SessionState>,
) -> SessionOutcome
where
    T: Transport + ?Sized,
    O: GenerationObserver,
{
    let mut coordinator = Coordinator {
        observer,
        cancel: cancel.clone(),
        transcript: Transcript::default(),
        state,
        outcome: None,
    };
    info!(chars = request.job_description.len(), "starting generation");

    let opened = tokio::select! {
        biased;
        _ = cancel.cancelled() => return coordinator.finish(),
        opened = transport.open(&request, &token, cancel.child_token()) => opened,
    };
    let mut source = match opened {
        Ok(source) => source,
        Err(e) => {
            warn!(error = %e, "failed to open generation stream");
            coordinator.fail(GenerationError::Transport(e));
            return coordinator.finish();
        }
    };
    coordinator.transition(SessionState::Streaming);

    let mut decoder = FrameDecoder::new();
    let mut dispatcher = Dispatcher::new(coordinator);

    loop {
        match source.read().await {
            Ok(ChunkRead::Chunk(bytes)) => {
                for frame in decoder.feed(&bytes) {
                    if cancel.is_cancelled() {
                        break;
                    }
                    route(&mut dispatcher, &frame);
                }
                if cancel.is_cancelled() {
                    decoder.discard();
                    break;
                }
                if dispatcher.is_terminated() {
                    debug!(buffered = decoder.buffered_len(), "terminal event received, closing stream");
                    break;
                }
            }
            Ok(ChunkRead::End) => {
                if let Some(frame) = decoder.finish() {
                    route(&mut dispatcher, &frame);
                }
                if !dispatcher.is_terminated() {
                    dispatcher.dispatch(DecodedEvent::Error(ErrorEvent::protocol(STREAM_ENDED)));
                }
                break;
            }
            Ok(ChunkRead::Cancelled) => {
                debug!(buffered = decoder.buffered_len(), "read cancelled, discarding buffer");
                decoder.discard();
                break;
            }
            Err(e) => {
                warn!(error = %e, "generation stream failed");
                if !dispatcher.is_terminated() {
                    dispatcher.handler_mut().fail(GenerationError::Transport(e));
                }
                break;
            }
        }
    }

    source.cancel();
    dispatcher.into_handler().finish()
}

/// Observer forwarding progress into a [`SessionHandle`]'s channel.
struct ChannelObserver {
    updates: mpsc::UnboundedSender<ProgressUpdate>,
}

impl GenerationObserver for ChannelObserver {
    fn on_data(&mut self, field: DocumentField, chunk: &str, transcript: &Transcript) {
        let _ = self.updates.send(ProgressUpdate {
            field,
            chunk: chunk.to_string(),
            transcript: transcript.clone(),
        });
    }
}

/// Handle to a session running on its own task.
///
/// Dropping the handle cancels the session.
pub struct SessionHandle {
    id: Uuid,
    updates: mpsc::UnboundedReceiver<ProgressUpdate>,
    state: watch::Receiver<SessionState>,
    cancel: CancellationToken,
    cancel_requested: bool,
    task: JoinHandle<SessionOutcome>,
    guard: DropGuard,
}

impl std::fmt::Debug for SessionHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionHandle")
            .field("id", &self.id)
            .field("state", &self.state())
            .finish()
    }
}

impl SessionHandle {
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Current lifecycle state as seen by the caller.
    pub fn state(&self) -> SessionState {
        let current = *self.state.borrow();
        if self.cancel_requested || (self.cancel.is_cancelled() && !current.is_terminal()) {
            SessionState::Cancelled
        } else {
            current
        }
    }

    /// Cancel the session. No further progress is delivered and the outcome
    /// becomes `Cancelled`. Has no effect once the session has ended.
    pub fn cancel(&mut self) {
        if self.state().is_terminal() {
            return;
        }
        self.cancel_requested = true;
        self.cancel.cancel();
        self.silence();
    }

    /// Close the progress channel and drop anything still queued.
    fn silence(&mut self) {
        self.updates.close();
        while self.updates.try_recv().is_ok() {}
    }

    /// Token that cancels this session, for wiring up external timeouts.
    /// Cancelling it has the same effect on progress delivery as `cancel`.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Next progress update, or `None` once the session has ended or been
    /// cancelled.
    pub async fn next_update(&mut self) -> Option<ProgressUpdate> {
        if self.cancel_requested || self.cancel.is_cancelled() {
            self.silence();
            return None;
        }
        let update = tokio::select! {
            biased;
            _ = self.cancel.cancelled() => None,
            update = self.updates.recv() => update,
        };
        if self.cancel.is_cancelled() {
            self.silence();
            return None;
        }
        update
    }

    /// Wait for the session's outcome.
    pub async fn outcome(self) -> SessionOutcome {
        let SessionHandle {
            cancel_requested,
            task,
            guard,
            ..
        } = self;
        let result = task.await;
        let _ = guard.disarm();
        if cancel_requested {
            return SessionOutcome::Cancelled;
        }
        match result {
            Ok(outcome) => outcome,
            Err(e) => SessionOutcome::Failed(GenerationError::Transport(ClientError::Config(
                format!("session task ended abnormally: {}", e),
            ))),
        }
    }
}

/// Start a session on a new task.
pub fn spawn<T>(transport: Arc<T>, request: GenerationRequest, token: SecretString) -> SessionHandle
where
    T: Transport + ?Sized + 'static,
{
    let id = Uuid::new_v4();
    let cancel = CancellationToken::new();
    let (state_tx, state_rx) = watch::channel(SessionState::Pending);
    let (updates_tx, updates_rx) = mpsc::unbounded_channel();

    let task_cancel = cancel.clone();
    let span = info_span!("generation", session = %id);
    let task = tokio::spawn(
        async move {
            let mut observer = ChannelObserver {
                updates: updates_tx,
            };
            run_session(
                &*transport,
                request,
                token,
                &mut observer,
                task_cancel,
                state_tx,
            )
            .await
        }
        .instrument(span),
    );

    SessionHandle {
        id,
        updates: updates_rx,
        state: state_rx,
        guard: cancel.clone().drop_guard(),
        cancel,
        cancel_requested: false,
        task,
    }
}
