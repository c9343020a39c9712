//! The event pump: applies one exchange's transport events to the store
//!
//! The store itself never suspends; suspension happens only here, at the
//! transport boundary, while awaiting the next event. There is no internal
//! watchdog — imposing a wall-clock bound and cancelling is the caller's
//! job.

use futures::StreamExt;
use tokio::sync::broadcast;
use tokio_stream::Stream;
use uuid::Uuid;

use scry_transport::ServerEvent;

use crate::error::{Error, Result};
use crate::store::ConversationStore;

/// Arm the buffer and drain `events` until the terminal event.
///
/// Returns the finalized message id on `done` (or `None` if a duplicate
/// terminal already finalized it). On `error{detail}` the buffer is
/// discarded and the detail surfaces verbatim as [`Error::StreamFailed`];
/// the conversation is left unchanged. A stream that ends without any
/// terminal event (connection dropped mid-exchange) is treated the same
/// way.
pub async fn run_exchange<S>(
    store: &mut ConversationStore,
    conversation_id: Uuid,
    message_id: Uuid,
    events: &mut S,
) -> Result<Option<Uuid>>
where
    S: Stream<Item = ServerEvent> + Unpin,
{
    store.start_streaming(conversation_id, message_id)?;

    while let Some(event) = events.next().await {
        match event {
            ServerEvent::Token { text } => store.append_token(&text),
            ServerEvent::Chart { config } => store.stage_chart(config),
            ServerEvent::Status { .. } => {}
            ServerEvent::Done { chart_config, .. } => {
                return Ok(store.finish_streaming(None, chart_config));
            }
            ServerEvent::Error { detail } => {
                store.cancel_streaming();
                return Err(Error::StreamFailed(detail));
            }
        }
    }

    store.cancel_streaming();
    Err(Error::StreamFailed(
        "stream ended without a terminal event".to_string(),
    ))
}

/// [`run_exchange`] over a transport subscription.
///
/// A lagged receiver has lost tokens, which would corrupt the finalized
/// content, so lag is treated as a failed exchange rather than papered
/// over.
pub async fn run_exchange_from_receiver(
    store: &mut ConversationStore,
    conversation_id: Uuid,
    message_id: Uuid,
    receiver: &mut broadcast::Receiver<ServerEvent>,
) -> Result<Option<Uuid>> {
    store.start_streaming(conversation_id, message_id)?;

    loop {
        match receiver.recv().await {
            Ok(ServerEvent::Token { text }) => store.append_token(&text),
            Ok(ServerEvent::Chart { config }) => store.stage_chart(config),
            Ok(ServerEvent::Status { .. }) => {}
            Ok(ServerEvent::Done { chart_config, .. }) => {
                return Ok(store.finish_streaming(None, chart_config));
            }
            Ok(ServerEvent::Error { detail }) => {
                store.cancel_streaming();
                return Err(Error::StreamFailed(detail));
            }
            Err(broadcast::error::RecvError::Lagged(missed)) => {
                store.cancel_streaming();
                return Err(Error::StreamFailed(format!(
                    "event channel lagged, {} events lost",
                    missed
                )));
            }
            Err(broadcast::error::RecvError::Closed) => {
                store.cancel_streaming();
                return Err(Error::StreamFailed(
                    "stream ended without a terminal event".to_string(),
                ));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::pin_mut;

    fn token(text: &str) -> ServerEvent {
        ServerEvent::Token { text: text.into() }
    }

    fn done(chart: Option<serde_json::Value>) -> ServerEvent {
        ServerEvent::Done {
            conversation_id: "c1".into(),
            chart_config: chart,
        }
    }

    fn store_with_conversation() -> (ConversationStore, Uuid) {
        let mut store = ConversationStore::new();
        let id = store.start_new_conversation("ds-42");
        (store, id)
    }

    #[tokio::test]
    async fn test_pump_finalizes_on_done() {
        let (mut store, conversation_id) = store_with_conversation();
        let message_id = Uuid::new_v4();

        let events = async_stream::stream! {
            yield ServerEvent::Status { info: serde_json::json!({"phase": "queued"}) };
            yield token("Sales ");
            yield token("rose.");
            yield done(None);
        };
        pin_mut!(events);

        let finalized = run_exchange(&mut store, conversation_id, message_id, &mut events)
            .await
            .unwrap();
        assert_eq!(finalized, Some(message_id));

        let messages = store.get_messages(conversation_id).unwrap();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].content, "Sales rose.");
        assert!(!store.is_streaming());
    }

    #[tokio::test]
    async fn test_pump_chart_before_last_token() {
        let (mut store, conversation_id) = store_with_conversation();
        let events = async_stream::stream! {
            yield token("See ");
            yield ServerEvent::Chart { config: serde_json::json!({"kind": "bar"}) };
            yield token("the chart.");
            yield done(None);
        };
        pin_mut!(events);

        run_exchange(&mut store, conversation_id, Uuid::new_v4(), &mut events)
            .await
            .unwrap();
        let messages = store.get_messages(conversation_id).unwrap();
        assert_eq!(messages[0].content, "See the chart.");
        assert_eq!(messages[0].chart.as_ref().unwrap()["kind"], "bar");
    }

    #[tokio::test]
    async fn test_pump_chart_in_terminal_event() {
        let (mut store, conversation_id) = store_with_conversation();
        let events = async_stream::stream! {
            yield token("Here.");
            yield done(Some(serde_json::json!({"kind": "line"})));
        };
        pin_mut!(events);

        run_exchange(&mut store, conversation_id, Uuid::new_v4(), &mut events)
            .await
            .unwrap();
        let messages = store.get_messages(conversation_id).unwrap();
        assert_eq!(messages[0].chart.as_ref().unwrap()["kind"], "line");
    }

    #[tokio::test]
    async fn test_pump_error_surfaces_detail_and_cancels() {
        let (mut store, conversation_id) = store_with_conversation();
        let events = async_stream::stream! {
            yield token("partial ");
            yield ServerEvent::Error { detail: "model unavailable".into() };
        };
        pin_mut!(events);

        let result = run_exchange(&mut store, conversation_id, Uuid::new_v4(), &mut events).await;
        match result {
            Err(Error::StreamFailed(detail)) => assert_eq!(detail, "model unavailable"),
            other => panic!("expected StreamFailed, got {:?}", other),
        }
        assert!(store.get_messages(conversation_id).unwrap().is_empty());
        assert!(!store.is_streaming());
    }

    #[tokio::test]
    async fn test_pump_dropped_stream_cancels() {
        let (mut store, conversation_id) = store_with_conversation();
        let events = async_stream::stream! {
            yield token("lost ");
        };
        pin_mut!(events);

        let result = run_exchange(&mut store, conversation_id, Uuid::new_v4(), &mut events).await;
        assert!(matches!(result, Err(Error::StreamFailed(_))));
        assert!(store.get_messages(conversation_id).unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_pump_refuses_second_exchange() {
        let (mut store, conversation_id) = store_with_conversation();
        store
            .start_streaming(conversation_id, Uuid::new_v4())
            .unwrap();

        let events = async_stream::stream! {
            yield done(None);
        };
        pin_mut!(events);

        let result = run_exchange(&mut store, conversation_id, Uuid::new_v4(), &mut events).await;
        assert!(matches!(result, Err(Error::ConflictingStream)));
        // The pre-existing buffer is untouched
        assert!(store.is_streaming());
    }

    #[tokio::test]
    async fn test_receiver_variant_finalizes() {
        let (mut store, conversation_id) = store_with_conversation();
        let message_id = Uuid::new_v4();

        let (tx, mut rx) = broadcast::channel(16);
        tx.send(token("from ")).unwrap();
        tx.send(token("channel")).unwrap();
        tx.send(done(None)).unwrap();

        let finalized =
            run_exchange_from_receiver(&mut store, conversation_id, message_id, &mut rx)
                .await
                .unwrap();
        assert_eq!(finalized, Some(message_id));
        assert_eq!(
            store.get_messages(conversation_id).unwrap()[0].content,
            "from channel"
        );
    }

    #[tokio::test]
    async fn test_receiver_closed_mid_exchange_cancels() {
        let (mut store, conversation_id) = store_with_conversation();
        let (tx, mut rx) = broadcast::channel(16);
        tx.send(token("orphaned")).unwrap();
        drop(tx);

        let result =
            run_exchange_from_receiver(&mut store, conversation_id, Uuid::new_v4(), &mut rx).await;
        assert!(matches!(result, Err(Error::StreamFailed(_))));
        assert!(store.get_messages(conversation_id).unwrap().is_empty());
    }
}
