use std::collections::BTreeMap;

use rst_common::standard::serde::{self, Deserialize, Serialize};
use rst_common::standard::serde_json;

use rstdev_domain::entity::ToJSON;
use rstdev_domain::BaseError;

use crate::anoncreds::credential::Credential;
use crate::anoncreds::proof::{
    satisfies_restrictions, NonRevokedInterval, Proof, ProofCredential, ProofRequest,
    ProvedPredicate, RequestedProof, Restriction, RevealedAttribute,
};
use crate::collaborators::CredentialRecord;
use crate::errors::AgentError;
use crate::handle::Handle;
use crate::messages::presentation::PresentationRequest;
use crate::messages::AriesMessage;
use crate::protocols::mailbox::require_thread;

use super::types::{
    CredentialCandidate, DisclosedProofEntityAccessor, RetrievedCredentials, SelectedCredentials,
    State,
};

/// Draft is a proof before its non-revocation parts are filled in
///
/// `sources` is aligned with `proof.credentials`, `intervals` names the disclosed
/// credentials that need a non-revocation proof.
#[derive(Debug, Clone)]
pub struct Draft {
    pub proof: Proof,
    pub sources: Vec<Credential>,
    pub intervals: BTreeMap<usize, NonRevokedInterval>,
    positions: BTreeMap<String, usize>,
}

impl Draft {
    fn new(nonce: String) -> Self {
        Self {
            proof: Proof {
                nonce,
                credentials: Vec::new(),
                requested_proof: RequestedProof::default(),
            },
            sources: Vec::new(),
            intervals: BTreeMap::new(),
            positions: BTreeMap::new(),
        }
    }

    fn include(&mut self, record: &CredentialRecord) -> usize {
        if let Some(position) = self.positions.get(&record.referent) {
            return *position;
        }

        let position = self.proof.credentials.len();
        self.proof
            .credentials
            .push(ProofCredential::from_credential(&record.credential));
        self.sources.push(record.credential.clone());
        self.positions.insert(record.referent.clone(), position);
        position
    }

    fn require_interval(&mut self, position: usize, interval: Option<NonRevokedInterval>) {
        let revocable = self
            .sources
            .get(position)
            .map(|credential| credential.is_revocable())
            .unwrap_or(false);

        if let (true, Some(interval)) = (revocable, interval) {
            self.intervals.entry(position).or_insert(interval);
        }
    }
}

/// DisclosedProof is the prover side of one presentation exchange, created from the
/// request it answers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(crate = "self::serde")]
pub struct DisclosedProof {
    pub(crate) source_id: String,
    pub(crate) state: State,
    pub(crate) thread_id: String,
    pub(crate) connection_handle: Option<Handle>,
    pub(crate) request_msg: PresentationRequest,
    pub(crate) request: ProofRequest,
    pub(crate) proof: Option<Proof>,
    pub(crate) problem: Option<String>,
}

impl DisclosedProof {
    pub fn new(source_id: String, request_msg: PresentationRequest) -> Result<Self, AgentError> {
        let attachment = request_msg.request_presentations_attach.first().ok_or_else(|| {
            AgentError::ValidationError("presentation request without attachment".to_string())
        })?;
        let request: ProofRequest = attachment.decode()?;

        Ok(Self {
            source_id,
            state: State::RequestReceived,
            thread_id: request_msg.id.clone(),
            connection_handle: None,
            request_msg,
            request,
            proof: None,
            problem: None,
        })
    }

    /// retrieve lists, per referent, every held credential able to answer it
    pub fn retrieve(&self, records: &[CredentialRecord]) -> RetrievedCredentials {
        let mut retrieved = RetrievedCredentials::default();

        for (referent, info) in self.request.requested_attributes.iter() {
            let found = records
                .iter()
                .filter(|record| {
                    record.credential.values.contains_key(&info.name)
                        && Self::allowed(&info.restrictions, &record.credential)
                })
                .map(Self::candidate)
                .collect();
            retrieved.attributes.insert(referent.to_owned(), found);
        }

        for (referent, info) in self.request.requested_predicates.iter() {
            let found = records
                .iter()
                .filter(|record| {
                    let holds = record
                        .credential
                        .values
                        .get(&info.name)
                        .and_then(|raw| raw.parse::<i64>().ok())
                        .map(|value| info.p_type.holds(value, info.p_value))
                        .unwrap_or(false);

                    holds && Self::allowed(&info.restrictions, &record.credential)
                })
                .map(Self::candidate)
                .collect();
            retrieved.predicates.insert(referent.to_owned(), found);
        }

        retrieved
    }

    /// assemble builds the proof body from the caller's selection, every referent
    /// must be answered
    pub fn assemble(
        &self,
        selected: &SelectedCredentials,
        self_attested: &BTreeMap<String, String>,
        records: &BTreeMap<String, CredentialRecord>,
    ) -> Result<Draft, AgentError> {
        let mut draft = Draft::new(self.request.nonce.clone());

        for (referent, info) in self.request.requested_attributes.iter() {
            if let Some(value) = self_attested.get(referent) {
                if !info.restrictions.is_empty() {
                    return Err(AgentError::ValidationError(format!(
                        "{} is restricted and cannot be self attested",
                        referent
                    )));
                }

                draft
                    .proof
                    .requested_proof
                    .self_attested_attrs
                    .insert(referent.to_owned(), value.to_owned());
                continue;
            }

            let record = Self::selected_record(referent, selected.attributes.get(referent), records)?;
            let raw = record.credential.values.get(&info.name).ok_or_else(|| {
                AgentError::ValidationError(format!(
                    "{} selected a credential without {}",
                    referent, info.name
                ))
            })?;

            if !Self::allowed(&info.restrictions, &record.credential) {
                return Err(AgentError::ValidationError(format!(
                    "{} selected a credential outside its restrictions",
                    referent
                )));
            }

            let position = draft.include(record);
            draft.proof.requested_proof.revealed_attrs.insert(
                referent.to_owned(),
                RevealedAttribute {
                    sub_proof_index: position,
                    raw: raw.to_owned(),
                },
            );
            draft.require_interval(position, self.request.attribute_interval(referent));
        }

        for (referent, info) in self.request.requested_predicates.iter() {
            let record = Self::selected_record(referent, selected.predicates.get(referent), records)?;
            let holds = record
                .credential
                .values
                .get(&info.name)
                .and_then(|raw| raw.parse::<i64>().ok())
                .map(|value| info.p_type.holds(value, info.p_value))
                .unwrap_or(false);

            if !holds || !Self::allowed(&info.restrictions, &record.credential) {
                return Err(AgentError::ValidationError(format!(
                    "{} selected a credential that does not satisfy {} {} {}",
                    referent, info.name, info.p_type, info.p_value
                )));
            }

            let position = draft.include(record);
            draft.proof.requested_proof.predicates.insert(
                referent.to_owned(),
                ProvedPredicate {
                    sub_proof_index: position,
                },
            );
            draft.require_interval(position, self.request.predicate_interval(referent));
        }

        Ok(draft)
    }

    pub fn proof_generated(&self, proof: Proof) -> Result<Self, AgentError> {
        if !matches!(self.state, State::RequestReceived | State::ProofGenerated) {
            return Err(AgentError::InvalidState(format!(
                "prover {} cannot generate a proof in {}",
                self.source_id, self.state
            )));
        }

        let mut next = self.clone();
        next.proof = Some(proof);
        next.state = State::ProofGenerated;
        Ok(next)
    }

    pub fn proof_sent(&self, connection_handle: Handle) -> Result<Self, AgentError> {
        if self.state != State::ProofGenerated {
            return Err(AgentError::InvalidState(format!(
                "prover {} cannot send a proof in {}",
                self.source_id, self.state
            )));
        }

        let mut next = self.clone();
        next.state = State::ProofSent;
        next.connection_handle = Some(connection_handle);
        Ok(next)
    }

    pub fn declined(&self, reason: Option<String>) -> Result<Self, AgentError> {
        if !matches!(self.state, State::RequestReceived | State::ProofGenerated) {
            return Err(AgentError::InvalidState(format!(
                "prover {} cannot decline in {}",
                self.source_id, self.state
            )));
        }

        let mut next = self.clone();
        next.state = State::Declined;
        next.problem = reason;
        Ok(next)
    }

    /// transition is the prover table, undefined pairs are
    /// [`AgentError::ProtocolViolation`] with the object untouched
    pub fn transition(&self, message: &AriesMessage) -> Result<Self, AgentError> {
        require_thread(&self.source_id, Some(&self.thread_id), message)?;

        match (self.state, message) {
            (state, AriesMessage::ProblemReport(report)) if !Self::is_terminal(state) => {
                let mut next = self.clone();
                next.state = State::Failed;
                next.problem = Some(
                    report
                        .comment
                        .clone()
                        .unwrap_or_else(|| report.description.code.clone()),
                );
                Ok(next)
            }
            (State::ProofSent, AriesMessage::PresentationAck(_)) => {
                let mut next = self.clone();
                next.state = State::Finished;
                Ok(next)
            }
            (state, message) => Err(AgentError::ProtocolViolation(format!(
                "prover {} cannot handle {} in {}",
                self.source_id,
                message.name(),
                state
            ))),
        }
    }

    pub fn accepts(message: &AriesMessage) -> bool {
        matches!(
            message,
            AriesMessage::PresentationAck(_) | AriesMessage::ProblemReport(_)
        )
    }

    pub fn is_terminal(state: State) -> bool {
        matches!(state, State::Finished | State::Declined | State::Failed)
    }

    pub fn require_proof(&self) -> Result<&Proof, AgentError> {
        self.proof.as_ref().ok_or_else(|| {
            AgentError::InvalidState(format!("prover {} has no proof", self.source_id))
        })
    }

    fn allowed(restrictions: &[Restriction], credential: &Credential) -> bool {
        satisfies_restrictions(restrictions, &credential.schema_id, &credential.cred_def_id)
    }

    fn candidate(record: &CredentialRecord) -> CredentialCandidate {
        CredentialCandidate {
            referent: record.referent.clone(),
            schema_id: record.credential.schema_id.clone(),
            cred_def_id: record.credential.cred_def_id.clone(),
            values: record.credential.values.clone(),
            rev_reg_id: record.credential.rev_reg_id.clone(),
            cred_rev_id: record.credential.cred_rev_id,
        }
    }

    fn selected_record<'a>(
        referent: &str,
        wallet_referent: Option<&String>,
        records: &'a BTreeMap<String, CredentialRecord>,
    ) -> Result<&'a CredentialRecord, AgentError> {
        let wallet_referent = wallet_referent.ok_or_else(|| {
            AgentError::ValidationError(format!("{} has no selected credential", referent))
        })?;

        records
            .get(wallet_referent)
            .ok_or_else(|| AgentError::NotFound(format!("credential {}", wallet_referent)))
    }
}

impl DisclosedProofEntityAccessor for DisclosedProof {
    fn get_source_id(&self) -> String {
        self.source_id.to_owned()
    }

    fn get_state(&self) -> State {
        self.state
    }

    fn get_thread_id(&self) -> String {
        self.thread_id.to_owned()
    }

    fn get_connection_handle(&self) -> Option<Handle> {
        self.connection_handle
    }

    fn get_proof_request(&self) -> ProofRequest {
        self.request.clone()
    }

    fn get_proof(&self) -> Option<Proof> {
        self.proof.clone()
    }

    fn get_problem(&self) -> Option<String> {
        self.problem.clone()
    }
}

impl ToJSON for DisclosedProof {
    fn to_json(&self) -> Result<String, BaseError> {
        serde_json::to_string(self).map_err(|err| BaseError::ToJSONError(err.to_string()))
    }
}

impl TryInto<Vec<u8>> for DisclosedProof {
    type Error = AgentError;

    fn try_into(self) -> Result<Vec<u8>, Self::Error> {
        serde_json::to_vec(&self).map_err(|err| AgentError::SerializationError(err.to_string()))
    }
}

impl TryFrom<Vec<u8>> for DisclosedProof {
    type Error = AgentError;

    fn try_from(value: Vec<u8>) -> Result<Self, Self::Error> {
        serde_json::from_slice(&value)
            .map_err(|err| AgentError::SerializationError(err.to_string()))
    }
}
