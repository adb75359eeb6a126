//! DID Exchange 1.0 handshake messages
//!
//! The request opens its own thread, `thid` is the request id and `pthid` the
//! invitation it answers. Response and complete stay on that thread.
use rst_common::standard::serde::{self, Deserialize, Serialize};
use rst_common::standard::uuid::Uuid;

use crate::errors::AgentError;

use super::connection::DidDoc;
use super::{Attachment, Thread};

pub const DID_DOC_ATTACHMENT_ID: &str = "did-doc";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(crate = "self::serde")]
pub struct Request {
    #[serde(rename = "@id")]
    pub id: String,

    pub label: String,
    pub did: String,

    #[serde(rename = "did_doc~attach")]
    pub did_doc_attach: Attachment,

    #[serde(rename = "~thread")]
    pub thread: Thread,
}

impl Request {
    pub fn new(label: String, did: String, did_doc_attach: Attachment, pthid: String) -> Self {
        let id = Uuid::new_v4().to_string();
        Self {
            thread: Thread::with_parent(id.clone(), pthid),
            id,
            label,
            did,
            did_doc_attach,
        }
    }

    pub fn invitation_id(&self) -> Option<&str> {
        self.thread.pthid.as_deref()
    }
}

/// Response carries the responder's DID document signed with the invitation key
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(crate = "self::serde")]
pub struct Response {
    #[serde(rename = "@id")]
    pub id: String,

    pub did: String,

    #[serde(rename = "did_doc~attach")]
    pub did_doc_attach: Attachment,

    #[serde(rename = "~thread")]
    pub thread: Thread,
}

impl Response {
    pub fn new(did: String, did_doc_attach: Attachment, thid: String, pthid: String) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            did,
            did_doc_attach,
            thread: Thread::with_parent(thid, pthid),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(crate = "self::serde")]
pub struct Complete {
    #[serde(rename = "@id")]
    pub id: String,

    #[serde(rename = "~thread")]
    pub thread: Thread,
}

impl Complete {
    pub fn new(thid: String, pthid: String) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            thread: Thread::with_parent(thid, pthid),
        }
    }
}

pub fn did_doc_attachment(did_doc: &DidDoc) -> Result<Attachment, AgentError> {
    Attachment::from_json(DID_DOC_ATTACHMENT_ID, did_doc)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::messages::connection::ConnectionData;

    #[test]
    fn test_request_opens_child_thread() {
        let data = ConnectionData::new(
            "alice-did".to_string(),
            "alice-key".to_string(),
            "http://alice".to_string(),
        );
        let attach = did_doc_attachment(&data.did_doc).unwrap();
        let request = Request::new(
            "alice".to_string(),
            data.did.clone(),
            attach,
            "invitation-1".to_string(),
        );

        assert_eq!(request.thread.thid, Some(request.id.clone()));
        assert_eq!(request.invitation_id(), Some("invitation-1"));

        let doc: DidDoc = request.did_doc_attach.decode().unwrap();
        assert_eq!(doc, data.did_doc);
    }
}
