use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Consumer,
    Merchant,
}

/// Identity used when a request carries no bearer token. Wallet reads for
/// this consumer always resolve, so anonymous demo traffic gets an empty
/// wallet instead of a 401.
pub const PLACEHOLDER_CONSUMER_ID: &str = "00000000-0000-0000-0000-000000000000";
