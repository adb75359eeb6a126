use std::collections::HashMap;
use std::sync::Arc;

use rst_common::standard::async_trait::async_trait;
use rst_common::standard::chrono::Utc;
use rst_common::with_tokio::tokio::sync::RwLock;

use crate::collaborators::{LedgerBuilder, LedgerDelta, RecordKind, TxnReceipt};
use crate::errors::AgentError;

#[derive(Default)]
struct LedgerState {
    records: HashMap<(RecordKind, String), String>,
    deltas: HashMap<String, Vec<LedgerDelta>>,
    seq_no: u64,
    clock: i64,
}

/// InMemoryLedger is a single-node ledger with a controllable clock
///
/// Records are write-once. Deltas of one registry always get strictly increasing
/// timestamps, a write in the same second as the previous delta moves the clock forward.
#[derive(Clone)]
pub struct InMemoryLedger {
    state: Arc<RwLock<LedgerState>>,
}

impl InMemoryLedger {
    pub fn new() -> Self {
        let state = LedgerState {
            clock: Utc::now().timestamp(),
            ..LedgerState::default()
        };

        Self {
            state: Arc::new(RwLock::new(state)),
        }
    }

    pub async fn set_time(&self, timestamp: i64) {
        self.state.write().await.clock = timestamp;
    }

    pub async fn advance_time(&self, seconds: i64) -> i64 {
        let mut state = self.state.write().await;
        state.clock += seconds;
        state.clock
    }
}

impl Default for InMemoryLedger {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl LedgerBuilder for InMemoryLedger {
    async fn write_record(
        &self,
        kind: RecordKind,
        id: String,
        data: String,
    ) -> Result<TxnReceipt, AgentError> {
        let mut state = self.state.write().await;
        let key = (kind, id.clone());
        if state.records.contains_key(&key) {
            return Err(AgentError::LedgerError(format!(
                "{:?} already exists: {}",
                kind, id
            )));
        }

        state.records.insert(key, data);
        state.seq_no += 1;

        Ok(TxnReceipt {
            seq_no: state.seq_no,
            timestamp: state.clock,
        })
    }

    async fn read_record(&self, kind: RecordKind, id: String) -> Result<String, AgentError> {
        let state = self.state.read().await;
        state
            .records
            .get(&(kind, id.clone()))
            .cloned()
            .ok_or_else(|| AgentError::NotFound(format!("{:?}: {}", kind, id)))
    }

    async fn write_rev_reg_delta(
        &self,
        rev_reg_id: String,
        data: String,
    ) -> Result<TxnReceipt, AgentError> {
        let mut state = self.state.write().await;

        let last = state
            .deltas
            .get(&rev_reg_id)
            .and_then(|deltas| deltas.last())
            .map(|delta| delta.timestamp);

        if let Some(last) = last {
            if state.clock <= last {
                state.clock = last + 1;
            }
        }

        let timestamp = state.clock;
        state.seq_no += 1;
        let seq_no = state.seq_no;

        state
            .deltas
            .entry(rev_reg_id)
            .or_default()
            .push(LedgerDelta { timestamp, data });

        Ok(TxnReceipt { seq_no, timestamp })
    }

    async fn read_rev_reg_deltas(
        &self,
        rev_reg_id: String,
        to: i64,
    ) -> Result<Vec<LedgerDelta>, AgentError> {
        let state = self.state.read().await;
        let deltas = state
            .deltas
            .get(&rev_reg_id)
            .ok_or_else(|| AgentError::NotFound(format!("revocation registry: {}", rev_reg_id)))?;

        Ok(deltas
            .iter()
            .filter(|delta| delta.timestamp <= to)
            .cloned()
            .collect())
    }

    async fn current_time(&self) -> Result<i64, AgentError> {
        Ok(self.state.read().await.clock)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rst_common::with_tokio::tokio;

    #[tokio::test]
    async fn test_records_are_write_once() {
        let ledger = InMemoryLedger::new();
        let receipt = ledger
            .write_record(RecordKind::Schema, "schema-1".to_string(), "{}".to_string())
            .await
            .unwrap();
        assert_eq!(receipt.seq_no, 1);

        let again = ledger
            .write_record(RecordKind::Schema, "schema-1".to_string(), "{}".to_string())
            .await;
        assert!(matches!(again, Err(AgentError::LedgerError(_))));

        let missing = ledger
            .read_record(RecordKind::CredentialDefinition, "schema-1".to_string())
            .await;
        assert!(matches!(missing, Err(AgentError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_deltas_are_ordered() {
        let ledger = InMemoryLedger::new();
        ledger.set_time(100).await;

        let first = ledger
            .write_rev_reg_delta("rev".to_string(), "a".to_string())
            .await
            .unwrap();
        let second = ledger
            .write_rev_reg_delta("rev".to_string(), "b".to_string())
            .await
            .unwrap();

        assert_eq!(first.timestamp, 100);
        assert_eq!(second.timestamp, 101);

        let until_first = ledger
            .read_rev_reg_deltas("rev".to_string(), 100)
            .await
            .unwrap();
        assert_eq!(until_first.len(), 1);
        assert_eq!(until_first[0].data, "a".to_string());

        let all = ledger
            .read_rev_reg_deltas("rev".to_string(), 200)
            .await
            .unwrap();
        assert_eq!(all.len(), 2);
    }
}
