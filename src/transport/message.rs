use serde::{Deserialize, Serialize};
use tungstenite::protocol::Message as WsMessage;

use crate::broker::RosterEntry;
use crate::persistence::HistoryRecord;

/// Packets the relay originates itself. Everything else on the wire is a
/// client envelope relayed verbatim.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ServerPacket {
    History { messages: Vec<HistoryRecord> },
    Userlist { users: Vec<RosterEntry> },
}

impl ServerPacket {
    pub fn to_ws(&self) -> Result<WsMessage, serde_json::Error> {
        Ok(WsMessage::text(serde_json::to_string(self)?))
    }
}
