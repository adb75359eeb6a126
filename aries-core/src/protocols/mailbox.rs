use rst_common::with_logging::log::warn;

use crate::errors::AgentError;
use crate::handle::Handle;
use crate::messages::AriesMessage;

use super::connection::types::{ConnectionAPI, ReceivedMessage};

/// next_on_thread picks the first pending message of the connection that belongs to
/// `thread_id` and is accepted by the caller, everything else stays in the mailbox
pub async fn next_on_thread<TConnection, F>(
    connections: &TConnection,
    connection_handle: Handle,
    thread_id: &str,
    accepts: F,
) -> Result<Option<ReceivedMessage>, AgentError>
where
    TConnection: ConnectionAPI + Send + Sync,
    F: Fn(&AriesMessage) -> bool + Send,
{
    let messages = connections.download_messages(connection_handle).await?;
    Ok(messages
        .into_iter()
        .find(|received| received.message.thread_id() == thread_id && accepts(&received.message)))
}

/// require_thread rejects a message that belongs to another exchange, pushed messages
/// go through it so they are filtered like the ones [`next_on_thread`] polls
pub fn require_thread(
    owner: &str,
    thread_id: Option<&str>,
    message: &AriesMessage,
) -> Result<(), AgentError> {
    let received = message.thread_id();
    if thread_id == Some(received.as_str()) {
        return Ok(());
    }

    Err(AgentError::ProtocolViolation(format!(
        "{} received {} from thread {}",
        owner,
        message.name(),
        received
    )))
}

/// consume acknowledges a polled message once its effect is settled
///
/// A message is consumed when it was handled, when the failure would not go away on
/// a retry, or when the object already moved and the remaining work is re-driven from
/// its state.
pub async fn consume<TConnection, T>(
    connections: &TConnection,
    connection_handle: Handle,
    received: ReceivedMessage,
    outcome: &Result<(), AgentError>,
    before: &T,
    after: &T,
) -> Result<(), AgentError>
where
    TConnection: ConnectionAPI + Send + Sync,
    T: PartialEq + Sync,
{
    let consumed = match outcome {
        Ok(_) => true,
        Err(err) => !err.is_retryable() || before != after,
    };

    if !consumed {
        return Ok(());
    }

    if let Err(err) = outcome {
        warn!("dropped {}: {}", received.message.name(), err);
    }

    connections
        .acknowledge_message(connection_handle, received.envelope_id)
        .await
}

/// settle acknowledges every pending message matching `predicate`, used once an
/// exchange has answered the message that opened it
pub async fn settle<TConnection, F>(
    connections: &TConnection,
    connection_handle: Handle,
    predicate: F,
) -> Result<(), AgentError>
where
    TConnection: ConnectionAPI + Send + Sync,
    F: Fn(&AriesMessage) -> bool + Send,
{
    let messages = connections.download_messages(connection_handle).await?;
    for received in messages {
        if predicate(&received.message) {
            connections
                .acknowledge_message(connection_handle, received.envelope_id)
                .await?;
        }
    }

    Ok(())
}
