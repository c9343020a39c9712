//! Edit-and-rerun of past user turns
//!
//! Two deliberately distinct operations: `edit_message` rewrites history
//! (truncate-and-replace), `rerun_message` only reads it and leaves the
//! append to the caller. Confusing the two produces either duplicated
//! history or accidental data loss.

use uuid::Uuid;

use crate::error::{Error, Result};
use crate::message::Role;
use crate::store::ConversationStore;

/// What an edit did: how many later messages were removed, and the content
/// now in place.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditOutcome {
    pub truncated_count: usize,
    pub new_content: String,
}

impl ConversationStore {
    /// Rewrite a past user turn and drop everything after it.
    ///
    /// Sets the message's content, marks it `edited`, and deletes every
    /// later message (user and assistant turns alike). The caller then
    /// resubmits the edited content as the new conversation tail. Refused
    /// while a stream targets the conversation: history must not be
    /// truncated out from under an in-flight response.
    pub fn edit_message(
        &mut self,
        message_id: Uuid,
        new_content: impl Into<String>,
        conversation_id: Uuid,
    ) -> Result<EditOutcome> {
        if self.stream_targets(conversation_id) {
            return Err(Error::ConflictingStream);
        }
        let conversation = self.find_mut(conversation_id)?;
        let idx = conversation
            .messages
            .iter()
            .position(|m| m.id == message_id)
            .ok_or(Error::NotFound(message_id))?;
        if conversation.messages[idx].role != Role::User {
            return Err(Error::InvalidRole);
        }

        let new_content = new_content.into();
        let message = &mut conversation.messages[idx];
        message.content = new_content.clone();
        message.edited = true;

        let truncated_count = conversation.messages.len() - idx - 1;
        conversation.messages.truncate(idx + 1);
        Ok(EditOutcome {
            truncated_count,
            new_content,
        })
    }

    /// Non-destructive variant: return a prior user turn's content without
    /// touching history. Resending it as a brand-new turn (append) versus
    /// an edit (truncate-and-replace) is the caller's decision.
    pub fn rerun_message(&self, message_id: Uuid, conversation_id: Uuid) -> Result<String> {
        if self.stream_targets(conversation_id) {
            return Err(Error::ConflictingStream);
        }
        let conversation = self.find(conversation_id)?;
        let message = conversation
            .messages
            .iter()
            .find(|m| m.id == message_id)
            .ok_or(Error::NotFound(message_id))?;
        if message.role != Role::User {
            return Err(Error::InvalidRole);
        }
        Ok(message.content.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Build a conversation alternating user/assistant turns, returning
    /// the store, conversation id, and message ids in order.
    fn seeded_store(turns: &[(&str, Role)]) -> (ConversationStore, Uuid, Vec<Uuid>) {
        let mut store = ConversationStore::new();
        let conversation_id = store.start_new_conversation("ds-42");
        let mut ids = Vec::new();
        for (content, role) in turns {
            let id = match role {
                Role::User => store.append_user_message(conversation_id, *content).unwrap(),
                Role::Assistant => store
                    .append_assistant_message(conversation_id, *content, None, None)
                    .unwrap(),
            };
            ids.push(id);
        }
        (store, conversation_id, ids)
    }

    #[test]
    fn test_edit_truncates_tail_and_marks_edited() {
        // spec scenario: ["u1: revenue trend?", "a1: upward 12%"]
        let (mut store, conversation_id, ids) = seeded_store(&[
            ("revenue trend?", Role::User),
            ("upward 12%", Role::Assistant),
        ]);

        let outcome = store
            .edit_message(ids[0], "show me outliers instead", conversation_id)
            .unwrap();
        assert_eq!(outcome.truncated_count, 1);
        assert_eq!(outcome.new_content, "show me outliers instead");

        let messages = store.get_messages(conversation_id).unwrap();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].id, ids[0]);
        assert_eq!(messages[0].content, "show me outliers instead");
        assert!(messages[0].edited);
    }

    #[test]
    fn test_edit_nth_of_k_messages() {
        // K = 6, editing the message at index 3 (N = 4, 1-indexed)
        let (mut store, conversation_id, ids) = seeded_store(&[
            ("q1", Role::User),
            ("a1", Role::Assistant),
            ("q2", Role::User),
            ("q3", Role::User),
            ("a3", Role::Assistant),
            ("q4", Role::User),
        ]);

        let outcome = store.edit_message(ids[3], "q3 edited", conversation_id).unwrap();
        assert_eq!(outcome.truncated_count, 2);
        let messages = store.get_messages(conversation_id).unwrap();
        assert_eq!(messages.len(), 4);
        assert_eq!(messages[3].content, "q3 edited");
    }

    #[test]
    fn test_edit_last_message_truncates_nothing() {
        let (mut store, conversation_id, ids) = seeded_store(&[("only", Role::User)]);
        let outcome = store.edit_message(ids[0], "still only", conversation_id).unwrap();
        assert_eq!(outcome.truncated_count, 0);
        assert_eq!(store.get_messages(conversation_id).unwrap().len(), 1);
    }

    #[test]
    fn test_edit_assistant_message_fails_invalid_role() {
        let (mut store, conversation_id, ids) = seeded_store(&[
            ("q", Role::User),
            ("a", Role::Assistant),
        ]);
        let before = store.get_messages(conversation_id).unwrap();

        assert!(matches!(
            store.edit_message(ids[1], "rewrite", conversation_id),
            Err(Error::InvalidRole)
        ));

        // List identically sized and ordered
        let after = store.get_messages(conversation_id).unwrap();
        assert_eq!(after.len(), before.len());
        assert!(after.iter().zip(&before).all(|(a, b)| a.id == b.id));
        assert_eq!(after[1].content, "a");
        assert!(!after[1].edited);
    }

    #[test]
    fn test_edit_unknown_message_fails_not_found() {
        let (mut store, conversation_id, _) = seeded_store(&[("q", Role::User)]);
        let bogus = Uuid::new_v4();
        match store.edit_message(bogus, "x", conversation_id) {
            Err(Error::NotFound(id)) => assert_eq!(id, bogus),
            other => panic!("expected NotFound, got {:?}", other),
        }
    }

    #[test]
    fn test_edit_refused_while_stream_targets_conversation() {
        let (mut store, conversation_id, ids) = seeded_store(&[
            ("q", Role::User),
            ("a", Role::Assistant),
        ]);
        store
            .start_streaming(conversation_id, Uuid::new_v4())
            .unwrap();
        assert!(matches!(
            store.edit_message(ids[0], "x", conversation_id),
            Err(Error::ConflictingStream)
        ));
        assert_eq!(store.conversations()[0].messages.len(), 2);
    }

    #[test]
    fn test_edit_allowed_while_stream_targets_other_conversation() {
        let (mut store, conversation_id, ids) = seeded_store(&[("q", Role::User)]);
        let other = store.start_new_conversation("ds-42");
        store.start_streaming(other, Uuid::new_v4()).unwrap();

        let outcome = store.edit_message(ids[0], "q2", conversation_id).unwrap();
        assert_eq!(outcome.truncated_count, 0);
    }

    #[test]
    fn test_rerun_returns_content_without_mutating() {
        let (store, conversation_id, ids) = seeded_store(&[
            ("original question", Role::User),
            ("answer", Role::Assistant),
        ]);
        let content = store.rerun_message(ids[0], conversation_id).unwrap();
        assert_eq!(content, "original question");

        let messages = store.get_messages(conversation_id).unwrap();
        assert_eq!(messages.len(), 2);
        assert!(!messages[0].edited);
    }

    #[test]
    fn test_rerun_assistant_message_fails_invalid_role() {
        let (store, conversation_id, ids) = seeded_store(&[
            ("q", Role::User),
            ("a", Role::Assistant),
        ]);
        assert!(matches!(
            store.rerun_message(ids[1], conversation_id),
            Err(Error::InvalidRole)
        ));
    }

    #[test]
    fn test_rerun_refused_while_stream_targets_conversation() {
        let (mut store, conversation_id, ids) = seeded_store(&[("q", Role::User)]);
        store
            .start_streaming(conversation_id, Uuid::new_v4())
            .unwrap();
        assert!(matches!(
            store.rerun_message(ids[0], conversation_id),
            Err(Error::ConflictingStream)
        ));
    }
}
