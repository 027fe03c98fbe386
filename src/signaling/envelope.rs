//! Wire format for signaling messages relayed between peers.

use serde_json::{Map, Value};

/// Envelope type handed to a peer right after it connects.
pub const CLIENT_ID: &str = "client-id";
/// Envelope type carrying the current number of connected peers.
pub const USER_COUNT: &str = "user-count";
/// Envelope type announcing that a peer stopped sharing (or vanished).
pub const STOP_SHARING: &str = "stop-sharing";

/// Identifier the hub assigns to a connection.
///
/// Stamped into envelopes as a bare number so browser clients can compare
/// it against the value they received in their `client-id` envelope.
/// Identifiers are never reused while the process runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PeerId(pub u64);

impl std::fmt::Display for PeerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A signaling message: the parsed JSON object of a frame.
///
/// The hub requires a string `type` and stamps `from` before relaying.
/// Everything else (`data` payloads, `targetId`, null-valued fields,
/// fields it has never heard of) re-serializes exactly as it arrived;
/// clients own the shape of what they exchange.
#[derive(Debug, Clone)]
pub struct Envelope {
    fields: Map<String, Value>,
}

impl Envelope {
    /// Parse an inbound text frame. Anything that is not a JSON object with
    /// a string `type` field yields `None`; callers drop those silently.
    pub fn from_text(text: &str) -> Option<Self> {
        let fields: Map<String, Value> = serde_json::from_str(text).ok()?;
        match fields.get("type") {
            Some(Value::String(_)) => Some(Self { fields }),
            _ => None,
        }
    }

    /// Serialize for delivery. Envelopes hold plain JSON trees, so this
    /// cannot fail.
    pub fn to_text(&self) -> String {
        serde_json::to_string(&self.fields).unwrap()
    }

    /// The message name carried in `type`.
    pub fn kind(&self) -> &str {
        self.fields
            .get("type")
            .and_then(Value::as_str)
            .unwrap_or_default()
    }

    /// Overwrite the sender stamp. Whatever `from` the client supplied is
    /// discarded; the hub's word is authoritative.
    pub fn stamp_from(&mut self, id: PeerId) {
        self.fields.insert("from".to_string(), Value::from(id.0));
    }

    /// Opaque payload, if the sender included one.
    pub fn data(&self) -> Option<&Value> {
        self.fields.get("data")
    }

    /// The stamped sender identifier.
    pub fn sender(&self) -> Option<&Value> {
        self.fields.get("from")
    }

    /// Addressee hint relayed untouched; the hub never routes by it.
    pub fn target_id(&self) -> Option<&Value> {
        self.fields.get("targetId")
    }

    fn tagged(kind: &str) -> Map<String, Value> {
        let mut fields = Map::new();
        fields.insert("type".to_string(), Value::from(kind));
        fields
    }

    /// The greeting that tells a freshly connected peer its own identifier.
    pub fn client_id(id: PeerId) -> Self {
        let mut fields = Self::tagged(CLIENT_ID);
        fields.insert("data".to_string(), Value::from(id.0));
        Self { fields }
    }

    /// Connection-count update, sent to everyone whenever membership changes.
    pub fn user_count(count: usize) -> Self {
        let mut fields = Self::tagged(USER_COUNT);
        fields.insert("data".to_string(), Value::from(count));
        Self { fields }
    }

    /// Synthetic stop notice emitted on behalf of a departed peer so its
    /// viewers tear down their sessions.
    pub fn stop_sharing(from: PeerId) -> Self {
        let mut fields = Self::tagged(STOP_SHARING);
        fields.insert("from".to_string(), Value::from(from.0));
        Self { fields }
    }
}
