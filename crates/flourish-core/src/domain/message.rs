//! Requests sent to the coordinator and their responses.
//!
//! Wire form: `{"type": "ADD_PRODUCTIVE_SITE", "payload": {"domain": "github.com"}}`.
//! Decoding is done by hand (not derive) so that an unknown `type` and a bad
//! payload for a known `type` can be told apart.

use serde::{Deserialize, Serialize};
use serde::de::DeserializeOwned;
use serde_json::Value;

use super::errors::MessageError;
use super::state::{FlourishState, StateKey};

/// Which of the two user lists an edit command targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SiteList {
    Productive,
    Unproductive,
}

impl SiteList {
    pub fn key(self) -> StateKey {
        match self {
            SiteList::Productive => StateKey::ProductiveSites,
            SiteList::Unproductive => StateKey::UnproductiveSites,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Request {
    GetState,
    AddSite { list: SiteList, domain: String },
    RemoveSite { list: SiteList, domain: String },
    ToggleOverlay { enabled: bool },
    ResetScore,
}

#[derive(Debug, Deserialize)]
struct DomainPayload {
    domain: String,
}

#[derive(Debug, Deserialize)]
struct TogglePayload {
    enabled: bool,
}

impl Request {
    pub const GET_STATE: &'static str = "GET_STATE";
    pub const ADD_PRODUCTIVE_SITE: &'static str = "ADD_PRODUCTIVE_SITE";
    pub const REMOVE_PRODUCTIVE_SITE: &'static str = "REMOVE_PRODUCTIVE_SITE";
    pub const ADD_UNPRODUCTIVE_SITE: &'static str = "ADD_UNPRODUCTIVE_SITE";
    pub const REMOVE_UNPRODUCTIVE_SITE: &'static str = "REMOVE_UNPRODUCTIVE_SITE";
    pub const TOGGLE_OVERLAY: &'static str = "TOGGLE_OVERLAY";
    pub const RESET_SCORE: &'static str = "RESET_SCORE";

    pub fn message_type(&self) -> &'static str {
        match self {
            Request::GetState => Self::GET_STATE,
            Request::AddSite { list: SiteList::Productive, .. } => Self::ADD_PRODUCTIVE_SITE,
            Request::AddSite { list: SiteList::Unproductive, .. } => Self::ADD_UNPRODUCTIVE_SITE,
            Request::RemoveSite { list: SiteList::Productive, .. } => Self::REMOVE_PRODUCTIVE_SITE,
            Request::RemoveSite { list: SiteList::Unproductive, .. } => Self::REMOVE_UNPRODUCTIVE_SITE,
            Request::ToggleOverlay { .. } => Self::TOGGLE_OVERLAY,
            Request::ResetScore => Self::RESET_SCORE,
        }
    }

    /// Decode a wire message.
    pub fn from_json(message: &Value) -> Result<Self, MessageError> {
        let kind = message
            .get("type")
            .and_then(Value::as_str)
            .ok_or(MessageError::Malformed)?;
        let payload = message.get("payload").filter(|p| !p.is_null());

        let request = match kind {
            Self::GET_STATE => Request::GetState,
            Self::RESET_SCORE => Request::ResetScore,
            Self::ADD_PRODUCTIVE_SITE => Request::AddSite {
                list: SiteList::Productive,
                domain: decode::<DomainPayload>(Self::ADD_PRODUCTIVE_SITE, payload)?.domain,
            },
            Self::REMOVE_PRODUCTIVE_SITE => Request::RemoveSite {
                list: SiteList::Productive,
                domain: decode::<DomainPayload>(Self::REMOVE_PRODUCTIVE_SITE, payload)?.domain,
            },
            Self::ADD_UNPRODUCTIVE_SITE => Request::AddSite {
                list: SiteList::Unproductive,
                domain: decode::<DomainPayload>(Self::ADD_UNPRODUCTIVE_SITE, payload)?.domain,
            },
            Self::REMOVE_UNPRODUCTIVE_SITE => Request::RemoveSite {
                list: SiteList::Unproductive,
                domain: decode::<DomainPayload>(Self::REMOVE_UNPRODUCTIVE_SITE, payload)?.domain,
            },
            Self::TOGGLE_OVERLAY => Request::ToggleOverlay {
                enabled: decode::<TogglePayload>(Self::TOGGLE_OVERLAY, payload)?.enabled,
            },
            other => return Err(MessageError::UnknownType(other.to_string())),
        };
        Ok(request)
    }

    /// Encode to the wire form (used by clients such as the CLI).
    pub fn to_json(&self) -> Value {
        let payload = match self {
            Request::GetState | Request::ResetScore => None,
            Request::AddSite { domain, .. } | Request::RemoveSite { domain, .. } => {
                Some(serde_json::json!({ "domain": domain }))
            }
            Request::ToggleOverlay { enabled } => Some(serde_json::json!({ "enabled": enabled })),
        };
        match payload {
            Some(payload) => serde_json::json!({ "type": self.message_type(), "payload": payload }),
            None => serde_json::json!({ "type": self.message_type() }),
        }
    }
}

fn decode<T: DeserializeOwned>(message: &'static str, payload: Option<&Value>) -> Result<T, MessageError> {
    let payload = payload.ok_or(MessageError::MissingPayload(message))?;
    serde_json::from_value(payload.clone()).map_err(|e| MessageError::InvalidPayload {
        message,
        reason: e.to_string(),
    })
}

/// Coordinator reply.
///
/// - `State`: `GET_STATE` の応答（状態オブジェクト）
/// - `Done`: コマンドの応答（`null`）
/// - `Error`: `{"error": "..."}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Response {
    State(Box<FlourishState>),
    Error { error: String },
    Done,
}

impl Response {
    pub fn error(message: impl Into<String>) -> Self {
        Response::Error { error: message.into() }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Response::Error { .. })
    }
}
