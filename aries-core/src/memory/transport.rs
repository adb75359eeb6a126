use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use rst_common::standard::async_trait::async_trait;
use rst_common::with_logging::log::debug;
use rst_common::with_tokio::tokio::sync::RwLock;

use crate::collaborators::{Envelope, TransportBuilder};
use crate::errors::AgentError;

/// InMemoryTransport routes envelopes into mailboxes keyed by recipient verkey
///
/// The endpoint is not used for routing. Taking the transport offline makes every
/// send fail, which is how tests exercise retry paths.
#[derive(Clone, Default)]
pub struct InMemoryTransport {
    mailboxes: Arc<RwLock<HashMap<String, Vec<Envelope>>>>,
    offline: Arc<AtomicBool>,
}

impl InMemoryTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    pub async fn pending(&self, recipient_verkey: &str) -> usize {
        let mailboxes = self.mailboxes.read().await;
        mailboxes
            .get(recipient_verkey)
            .map(|mailbox| mailbox.len())
            .unwrap_or(0)
    }
}

#[async_trait]
impl TransportBuilder for InMemoryTransport {
    async fn send(&self, endpoint: String, envelope: Envelope) -> Result<(), AgentError> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(AgentError::TransportError(format!(
                "endpoint unreachable: {}",
                endpoint
            )));
        }

        debug!(
            "[transport] deliver envelope {} to {} via {}",
            envelope.id, envelope.recipient_verkey, endpoint
        );

        let mut mailboxes = self.mailboxes.write().await;
        mailboxes
            .entry(envelope.recipient_verkey.clone())
            .or_default()
            .push(envelope);

        Ok(())
    }

    async fn receive(&self, recipient_verkey: String) -> Result<Vec<Envelope>, AgentError> {
        let mailboxes = self.mailboxes.read().await;
        Ok(mailboxes.get(&recipient_verkey).cloned().unwrap_or_default())
    }

    async fn acknowledge(
        &self,
        recipient_verkey: String,
        envelope_id: String,
    ) -> Result<(), AgentError> {
        let mut mailboxes = self.mailboxes.write().await;
        if let Some(mailbox) = mailboxes.get_mut(&recipient_verkey) {
            mailbox.retain(|envelope| envelope.id != envelope_id);
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rst_common::with_tokio::tokio;

    #[tokio::test]
    async fn test_mailbox_until_acknowledged() {
        let transport = InMemoryTransport::new();
        let envelope = Envelope::new("bob".to_string(), vec![1, 2, 3]);

        transport
            .send("http://bob".to_string(), envelope.clone())
            .await
            .unwrap();

        let first = transport.receive("bob".to_string()).await.unwrap();
        let second = transport.receive("bob".to_string()).await.unwrap();
        assert_eq!(first, vec![envelope.clone()]);
        assert_eq!(first, second);

        transport
            .acknowledge("bob".to_string(), envelope.id.clone())
            .await
            .unwrap();
        assert_eq!(transport.pending("bob").await, 0);
    }

    #[tokio::test]
    async fn test_offline_send_fails() {
        let transport = InMemoryTransport::new();
        transport.set_offline(true);

        let sent = transport
            .send("http://bob".to_string(), Envelope::new("bob".to_string(), vec![]))
            .await;
        assert!(matches!(sent, Err(AgentError::TransportError(_))));
        assert_eq!(transport.pending("bob").await, 0);
    }
}
