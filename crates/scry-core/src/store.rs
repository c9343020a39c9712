//! The conversation store
//!
//! All mutation happens here, synchronously: every operation is an atomic
//! state transition and the store never suspends. The transport feeds it
//! through the pump; the render layer only reads the snapshot getters.

use uuid::Uuid;

use crate::conversation::{Conversation, StreamSession};
use crate::error::{Error, Result};
use crate::message::Message;

/// Owns all conversation state for a dataset session: message lists, the
/// active-conversation pointer, and the streaming buffer.
///
/// At most one stream may be in flight, modeled as `Option<StreamSession>`
/// and enforced by check-then-set. Relaxing single-flight would require a
/// per-conversation buffer map, not just removing the check.
#[derive(Debug, Default)]
pub struct ConversationStore {
    conversations: Vec<Conversation>,
    active: Option<Uuid>,
    stream: Option<StreamSession>,
}

impl ConversationStore {
    pub fn new() -> Self {
        Self::default()
    }

    // ---- Conversation lifecycle ----

    /// Create an empty conversation for the dataset and make it active.
    ///
    /// An in-flight stream for the previously active conversation is NOT
    /// cancelled; it keeps updating its conversation in the background.
    /// Callers that want it gone call [`cancel_streaming`](Self::cancel_streaming).
    pub fn start_new_conversation(&mut self, dataset_id: impl Into<String>) -> Uuid {
        let conversation = Conversation::new(dataset_id);
        let id = conversation.id;
        self.conversations.push(conversation);
        self.active = Some(id);
        id
    }

    /// Switch the active pointer. A stream targeting another conversation
    /// continues streaming into that (now backgrounded) conversation.
    pub fn set_active_conversation(&mut self, id: Uuid) -> Result<()> {
        self.find(id)?;
        self.active = Some(id);
        Ok(())
    }

    /// Explicitly delete a conversation. Refused while the buffer targets
    /// it, for the same reason edits are.
    pub fn delete_conversation(&mut self, id: Uuid) -> Result<()> {
        if self.stream_targets(id) {
            return Err(Error::ConflictingStream);
        }
        let idx = self
            .conversations
            .iter()
            .position(|c| c.id == id)
            .ok_or(Error::UnknownConversation(id))?;
        self.conversations.remove(idx);
        if self.active == Some(id) {
            self.active = self.conversations.last().map(|c| c.id);
        }
        Ok(())
    }

    // ---- Appending ----

    /// Append a user message synchronously.
    pub fn append_user_message(&mut self, id: Uuid, text: impl Into<String>) -> Result<Uuid> {
        let conversation = self.find_mut(id)?;
        let message = Message::user(text);
        let message_id = message.id;
        conversation.messages.push(message);
        Ok(message_id)
    }

    /// Append a complete assistant message in one shot: the non-streaming
    /// fallback path.
    pub fn append_assistant_message(
        &mut self,
        id: Uuid,
        text: impl Into<String>,
        chart: Option<serde_json::Value>,
        technical_details: Option<String>,
    ) -> Result<Uuid> {
        let conversation = self.find_mut(id)?;
        let message = Message::assistant(text)
            .with_chart(chart)
            .with_technical_details(technical_details);
        let message_id = message.id;
        conversation.messages.push(message);
        Ok(message_id)
    }

    // ---- Streaming ----

    /// Arm the streaming buffer for one exchange.
    ///
    /// Fails with `ConflictingStream` if a buffer is already active; the
    /// existing buffer is left intact. Starting a second stream before the
    /// first one's terminal event is a programming error, never queued.
    pub fn start_streaming(&mut self, conversation_id: Uuid, message_id: Uuid) -> Result<()> {
        if self.stream.is_some() {
            return Err(Error::ConflictingStream);
        }
        self.find(conversation_id)?;
        self.stream = Some(StreamSession::new(conversation_id, message_id));
        Ok(())
    }

    /// Concatenate a token onto the buffer.
    ///
    /// With no active buffer this logs and returns: tokens arriving after
    /// cancellation must be discardable without crashing.
    pub fn append_token(&mut self, token: &str) {
        match self.stream.as_mut() {
            Some(session) => session.text.push_str(token),
            None => tracing::debug!("discarding token with no active buffer"),
        }
    }

    /// Stage an out-of-band chart payload on the buffer. The chart may
    /// arrive before or after the last token; either order lands here.
    pub fn stage_chart(&mut self, config: serde_json::Value) {
        match self.stream.as_mut() {
            Some(session) => session.chart = Some(config),
            None => tracing::debug!("discarding chart with no active buffer"),
        }
    }

    /// Finalize the pending assistant message and append it.
    ///
    /// Content is `final_text` if supplied, else the accumulated buffer.
    /// An explicit `chart` wins over one staged by an earlier chart event.
    /// Idempotent: with no buffer armed this is a no-op returning `None`,
    /// which absorbs duplicate terminal events from the transport.
    pub fn finish_streaming(
        &mut self,
        final_text: Option<String>,
        chart: Option<serde_json::Value>,
    ) -> Option<Uuid> {
        let session = self.stream.take()?;
        let mut message = Message::assistant(final_text.unwrap_or(session.text));
        message.id = session.message_id;
        message.chart = chart.or(session.chart);
        match self.find_mut(session.conversation_id) {
            Ok(conversation) => {
                conversation.messages.push(message);
                Some(session.message_id)
            }
            Err(_) => {
                tracing::warn!(
                    conversation = %session.conversation_id,
                    "finalized stream for a conversation that no longer exists"
                );
                None
            }
        }
    }

    /// Discard the buffer without appending anything. The conversation is
    /// left exactly as it was before `start_streaming`.
    pub fn cancel_streaming(&mut self) {
        self.stream = None;
    }

    // ---- Read-only snapshot surface ----

    /// Ordered messages of a conversation. If the buffer targets it, the
    /// in-progress assistant text appears as a transient pseudo-message at
    /// the end; nothing is written into the conversation until finalized.
    pub fn get_messages(&self, id: Uuid) -> Result<Vec<Message>> {
        let conversation = self.find(id)?;
        let mut messages = conversation.messages.clone();
        if let Some(session) = self.stream.as_ref().filter(|s| s.conversation_id == id) {
            let mut pending = Message::assistant(session.text.clone());
            pending.id = session.message_id;
            pending.chart = session.chart.clone();
            messages.push(pending);
        }
        Ok(messages)
    }

    pub fn active_conversation_id(&self) -> Option<Uuid> {
        self.active
    }

    pub fn is_streaming(&self) -> bool {
        self.stream.is_some()
    }

    /// Accumulated text of the in-flight response, if any
    pub fn streaming_buffer_text(&self) -> Option<&str> {
        self.stream.as_ref().map(|s| s.text.as_str())
    }

    /// All conversations in creation order, for the sidebar
    pub fn conversations(&self) -> &[Conversation] {
        &self.conversations
    }

    /// Replace the conversation list from a persisted session. Refused
    /// mid-stream; the buffer's target must stay resolvable.
    pub fn restore_conversations(&mut self, conversations: Vec<Conversation>) -> Result<()> {
        if self.stream.is_some() {
            return Err(Error::ConflictingStream);
        }
        self.active = conversations.last().map(|c| c.id);
        self.conversations = conversations;
        Ok(())
    }

    // ---- Internals ----

    pub(crate) fn stream_targets(&self, conversation_id: Uuid) -> bool {
        self.stream
            .as_ref()
            .is_some_and(|s| s.conversation_id == conversation_id)
    }

    pub(crate) fn find(&self, id: Uuid) -> Result<&Conversation> {
        self.conversations
            .iter()
            .find(|c| c.id == id)
            .ok_or(Error::UnknownConversation(id))
    }

    pub(crate) fn find_mut(&mut self, id: Uuid) -> Result<&mut Conversation> {
        self.conversations
            .iter_mut()
            .find(|c| c.id == id)
            .ok_or(Error::UnknownConversation(id))
    }
}
