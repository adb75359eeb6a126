use rst_common::standard::serde::{self, Deserialize, Serialize};
use rst_common::standard::uuid::Uuid;

use super::Thread;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(crate = "self::serde")]
pub struct Query {
    #[serde(rename = "@id")]
    pub id: String,

    pub query: String,

    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub comment: Option<String>,
}

impl Query {
    pub fn new(query: Option<String>, comment: Option<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            query: query.unwrap_or_else(|| "*".to_string()),
            comment,
        }
    }

    /// matches supports an exact protocol URI or a prefix ending with `*`
    pub fn matches(&self, protocol: &str) -> bool {
        match self.query.strip_suffix('*') {
            Some(prefix) => protocol.starts_with(prefix),
            None => protocol == self.query,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(crate = "self::serde")]
pub struct ProtocolDescriptor {
    pub pid: String,

    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub roles: Option<Vec<String>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(crate = "self::serde")]
pub struct Disclose {
    #[serde(rename = "@id")]
    pub id: String,

    pub protocols: Vec<ProtocolDescriptor>,

    #[serde(rename = "~thread")]
    pub thread: Thread,
}

impl Disclose {
    pub fn new(protocols: Vec<ProtocolDescriptor>, thid: String) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            protocols,
            thread: Thread::new(thid),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use table_test::table_test;

    #[test]
    fn test_query_matches() {
        let table = vec![
            (
                ("https://didcomm.org/*", "https://didcomm.org/trust_ping/1.0"),
                true,
            ),
            (
                (
                    "https://didcomm.org/trust_ping/1.0",
                    "https://didcomm.org/trust_ping/1.0",
                ),
                true,
            ),
            (
                (
                    "https://didcomm.org/issue-credential/*",
                    "https://didcomm.org/trust_ping/1.0",
                ),
                false,
            ),
        ];

        for (validator, input, expected) in table_test!(table) {
            let query = Query::new(Some(input.0.to_string()), None);

            validator
                .given(&format!("{:?}", input))
                .when("match the protocol")
                .then("it should follow the wildcard rule")
                .assert_eq(expected, query.matches(input.1));
        }
    }
}
