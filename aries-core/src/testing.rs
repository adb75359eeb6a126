//! Shared fixtures for tests driving several agents over one in-memory network
use std::collections::BTreeMap;
use std::path::PathBuf;

use rst_common::standard::uuid::Uuid;

use crate::agent::Agent;
use crate::anoncreds::credential_definition::types::CredentialDefinitionAPI;
use crate::anoncreds::revocation::types::{RevocationRegistryAPI, RevocationRegistryConfig};
use crate::anoncreds::schema::types::SchemaAPI;
use crate::collaborators::{Profile, ProfileBuilder, WalletBuilder};
use crate::config::{Agent as AgentSection, AgentConfig, Discovery, Tails};
use crate::handle::Handle;
use crate::memory::{
    FileTailsFetcher, InMemoryLedger, InMemoryProfile, InMemoryTransport, InMemoryWallet,
};
use crate::protocols::connection::types::{ConnectionAPI, State as ConnectionState};
use crate::protocols::issuance::holder::types::{HolderAPI, State as HolderState};
use crate::protocols::issuance::issuer::types::{IssuerAPI, State as IssuerState};

pub type TestAgent = Agent<InMemoryProfile>;

pub const ATTRIBUTES: &[&str] = &["name", "degree", "age"];

pub fn scratch_dir(prefix: &str) -> PathBuf {
    std::env::temp_dir().join(format!("{}-{}", prefix, Uuid::new_v4()))
}

/// Network is the ledger and transport every agent of one test shares
#[derive(Clone)]
pub struct Network {
    pub ledger: InMemoryLedger,
    pub transport: InMemoryTransport,
}

pub fn network() -> Network {
    Network {
        ledger: InMemoryLedger::new(),
        transport: InMemoryTransport::new(),
    }
}

impl Network {
    pub fn agent(&self, label: &str) -> TestAgent {
        let profile = Profile::new(
            InMemoryWallet::new(),
            self.ledger.clone(),
            self.transport.clone(),
            FileTailsFetcher::new(),
        );

        let config = AgentConfig::new(
            AgentSection::new(label.to_string(), format!("http://{}", label)),
            Tails::new(scratch_dir(&format!("{}-tails", label)).display().to_string()),
            Discovery::default(),
        );

        Agent::new(profile, config)
    }
}

/// connect runs the whole handshake, returning `(inviter side, invitee side)`
pub async fn connect(inviter: &TestAgent, invitee: &TestAgent) -> (Handle, Handle) {
    let inviter_handle = inviter
        .connections()
        .create("invitee".to_string())
        .await
        .unwrap();
    inviter.connections().connect(inviter_handle).await.unwrap();

    let invitation = inviter
        .connections()
        .get_invite_details(inviter_handle)
        .await
        .unwrap();
    let invitee_handle = invitee
        .connections()
        .create_with_invite("inviter".to_string(), invitation)
        .await
        .unwrap();
    invitee.connections().connect(invitee_handle).await.unwrap();

    inviter.connections().update_state(inviter_handle).await.unwrap();
    invitee.connections().update_state(invitee_handle).await.unwrap();
    let state = inviter.connections().update_state(inviter_handle).await.unwrap();
    assert_eq!(state, ConnectionState::Accepted);

    (inviter_handle, invitee_handle)
}

/// Published is a credential definition ready to issue against
pub struct Published {
    pub cred_def: Handle,
    pub cred_def_id: String,
    pub schema_id: String,
    pub rev_reg: Option<Handle>,
    pub rev_reg_id: Option<String>,
    pub tails_dir: Option<PathBuf>,
}

pub async fn publish_cred_def(issuer: &TestAgent, revocable: bool) -> Published {
    let (issuer_did, _) = issuer
        .profile()
        .wallet()
        .create_and_store_my_did()
        .await
        .unwrap();

    let schema = issuer
        .schemas()
        .create(
            "degree".to_string(),
            issuer_did.clone(),
            "degree".to_string(),
            "1.0".to_string(),
            ATTRIBUTES.iter().map(|name| name.to_string()).collect(),
        )
        .await
        .unwrap();
    issuer.schemas().publish(schema).await.unwrap();
    let schema_id = issuer.schemas().get_schema_id(schema).await.unwrap();

    let cred_def = issuer
        .cred_defs()
        .create(
            "degree".to_string(),
            issuer_did.clone(),
            schema_id.clone(),
            "tag1".to_string(),
            revocable,
        )
        .await
        .unwrap();
    issuer.cred_defs().publish(cred_def).await.unwrap();
    let cred_def_id = issuer.cred_defs().get_cred_def_id(cred_def).await.unwrap();

    if !revocable {
        return Published {
            cred_def,
            cred_def_id,
            schema_id,
            rev_reg: None,
            rev_reg_id: None,
            tails_dir: None,
        };
    }

    let tails_dir = scratch_dir("aries-issuer-tails");
    let rev_reg = issuer
        .registries()
        .create(RevocationRegistryConfig {
            issuer_did,
            cred_def_id: cred_def_id.clone(),
            tag: "tag1".to_string(),
            tails_dir: tails_dir.display().to_string(),
            max_creds: 10,
        })
        .await
        .unwrap();

    let tails_hash = issuer.registries().get_tails_hash(rev_reg).await.unwrap();
    let location = tails_dir.join(&tails_hash).display().to_string();
    issuer.registries().publish(rev_reg, location).await.unwrap();
    let rev_reg_id = issuer.registries().get_rev_reg_id(rev_reg).await.unwrap();

    Published {
        cred_def,
        cred_def_id,
        schema_id,
        rev_reg: Some(rev_reg),
        rev_reg_id: Some(rev_reg_id),
        tails_dir: Some(tails_dir),
    }
}

pub fn values(name: &str, age: &str) -> BTreeMap<String, String> {
    let mut values = BTreeMap::new();
    values.insert("name".to_string(), name.to_string());
    values.insert("degree".to_string(), "maths".to_string());
    values.insert("age".to_string(), age.to_string());
    values
}

/// issue runs a whole issuance over an accepted connection, returning
/// `(issuer handle, holder handle)`
pub async fn issue(
    issuer: &TestAgent,
    holder: &TestAgent,
    connections: (Handle, Handle),
    published: &Published,
    values: BTreeMap<String, String>,
) -> (Handle, Handle) {
    let (issuer_conn, holder_conn) = connections;

    let issuer_handle = issuer.issuers().create("degree".to_string()).await.unwrap();
    issuer
        .issuers()
        .build_credential_offer_msg(
            issuer_handle,
            published.cred_def,
            published.rev_reg,
            values,
            None,
        )
        .await
        .unwrap();
    issuer
        .issuers()
        .send_credential_offer(issuer_handle, issuer_conn)
        .await
        .unwrap();

    let offers = holder.holders().get_offers(holder_conn).await.unwrap();
    let offer = offers.last().cloned().unwrap();
    let holder_handle = holder
        .holders()
        .create_with_offer("degree".to_string(), offer)
        .await
        .unwrap();
    holder
        .holders()
        .send_request(holder_handle, holder_conn)
        .await
        .unwrap();

    let state = issuer
        .issuers()
        .update_state(issuer_handle, issuer_conn)
        .await
        .unwrap();
    assert_eq!(state, IssuerState::RequestReceived);
    issuer
        .issuers()
        .send_credential(issuer_handle, issuer_conn)
        .await
        .unwrap();

    let state = holder
        .holders()
        .update_state(holder_handle, holder_conn)
        .await
        .unwrap();
    assert_eq!(state, HolderState::Finished);

    let state = issuer
        .issuers()
        .update_state(issuer_handle, issuer_conn)
        .await
        .unwrap();
    assert_eq!(state, IssuerState::Finished);

    (issuer_handle, holder_handle)
}
