use base64::engine::general_purpose::STANDARD;
use base64::Engine;

use rst_common::standard::serde::de::DeserializeOwned;
use rst_common::standard::serde::{self, Deserialize, Serialize};
use rst_common::standard::serde_json;

use crate::errors::AgentError;

/// JwsHeader names the key that produced an attachment signature
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(crate = "self::serde")]
pub struct JwsHeader {
    pub kid: String,
}

/// AttachmentSignature is the detached `jws` of an attachment, `signature` is the
/// base64 ed25519 signature over the decoded payload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(crate = "self::serde")]
pub struct AttachmentSignature {
    pub header: JwsHeader,
    pub signature: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(crate = "self::serde")]
pub struct AttachmentData {
    pub base64: String,

    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub jws: Option<AttachmentSignature>,
}

/// Attachment carries a JSON payload encoded as base64, as used by `~attach` fields
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(crate = "self::serde")]
pub struct Attachment {
    #[serde(rename = "@id")]
    pub id: String,

    #[serde(rename = "mime-type")]
    pub mime_type: String,

    pub data: AttachmentData,
}

impl Attachment {
    pub fn from_json<T: Serialize>(id: &str, value: &T) -> Result<Self, AgentError> {
        let json = serde_json::to_vec(value)
            .map_err(|err| AgentError::SerializationError(err.to_string()))?;

        Ok(Self {
            id: id.to_string(),
            mime_type: "application/json".to_string(),
            data: AttachmentData {
                base64: STANDARD.encode(json),
                jws: None,
            },
        })
    }

    /// payload returns the decoded bytes, the input of an attachment signature
    pub fn payload(&self) -> Result<Vec<u8>, AgentError> {
        STANDARD
            .decode(&self.data.base64)
            .map_err(|err| AgentError::SerializationError(err.to_string()))
    }

    pub fn signed(mut self, kid: String, signature: &[u8]) -> Self {
        self.data.jws = Some(AttachmentSignature {
            header: JwsHeader { kid },
            signature: STANDARD.encode(signature),
        });
        self
    }

    /// signature returns the signer key and the raw signature when the attachment is signed
    pub fn signature(&self) -> Result<Option<(String, Vec<u8>)>, AgentError> {
        match &self.data.jws {
            Some(jws) => {
                let raw = STANDARD
                    .decode(&jws.signature)
                    .map_err(|err| AgentError::SerializationError(err.to_string()))?;
                Ok(Some((jws.header.kid.clone(), raw)))
            }
            None => Ok(None),
        }
    }

    pub fn decode<T: DeserializeOwned>(&self) -> Result<T, AgentError> {
        let raw = self.payload()?;
        serde_json::from_slice(&raw).map_err(|err| AgentError::SerializationError(err.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    #[test]
    fn test_decode_payload() {
        let mut values = BTreeMap::new();
        values.insert("name".to_string(), "alice".to_string());

        let attachment = Attachment::from_json("libindy-cred-offer-0", &values).unwrap();
        assert_eq!(attachment.mime_type, "application/json".to_string());

        let decoded: BTreeMap<String, String> = attachment.decode().unwrap();
        assert_eq!(decoded, values);
    }

    #[test]
    fn test_signed_attachment() {
        let attachment = Attachment::from_json("did-doc", &"doc").unwrap();
        assert_eq!(attachment.signature().unwrap(), None);

        let signed = attachment.signed("faber-key".to_string(), &[1u8, 2, 3]);
        let json = serde_json::to_string(&signed).unwrap();
        assert!(json.contains("\"jws\""));
        assert!(json.contains("\"kid\":\"faber-key\""));

        let (kid, signature) = signed.signature().unwrap().unwrap();
        assert_eq!(kid, "faber-key".to_string());
        assert_eq!(signature, vec![1u8, 2, 3]);
        assert_eq!(signed.payload().unwrap(), b"\"doc\"".to_vec());
    }

    #[test]
    fn test_decode_invalid_base64() {
        let attachment = Attachment {
            id: "broken".to_string(),
            mime_type: "application/json".to_string(),
            data: AttachmentData {
                base64: "%%%".to_string(),
                jws: None,
            },
        };

        let decoded: Result<BTreeMap<String, String>, AgentError> = attachment.decode();
        assert!(matches!(decoded, Err(AgentError::SerializationError(_))));
    }
}
