use serde::{ Serialize, Deserialize };

/// Body of a `500` reply from `POST /api/chat`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}

/// Body of a `429` reply from `POST /api/chat`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RateLimitBody {
    pub error: String,
    pub message: String,
    pub retry_after: u64,
}

impl RateLimitBody {
    pub fn new(retry_after: u64) -> Self {
        Self {
            error: "Rate limit exceeded".to_string(),
            message: format!(
                "Too many requests. Please wait {} seconds before trying again.",
                retry_after
            ),
            retry_after,
        }
    }
}

/// Lenient view of any error body the client may receive. Every field is
/// optional because proxies and older servers do not always send them.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorReply {
    pub error: Option<String>,
    pub message: Option<String>,
    pub retry_after: Option<u64>,
}
