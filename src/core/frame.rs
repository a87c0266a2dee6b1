//! Wire frame shapes. Server to client frames are tagged JSON
//! objects; client to server frames are bare strings (handled as plain
//! `String` at the transport layer, see `core::spectator::CLIENT_LOST_TRACK`).

use serde::Serialize;
use serde_json::Value;

/// A slot address of the form `"/seg1/seg2/..."`.
pub type SlotAddress = String;

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type")]
pub enum ServerFrame {
    #[serde(rename = "message")]
    Message {
        text: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        sender: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        highlight: Option<bool>,
    },
    #[serde(rename = "choice")]
    Choice(ChoiceFrame),
    #[serde(rename = "error")]
    Error { message: String },
    #[serde(rename = "chatcontrol")]
    ChatControl {
        set: ChatControlState,
        #[serde(skip_serializing_if = "Option::is_none")]
        message: Option<String>,
    },
    /// View updates are an un-wrapped JSON array on the wire;
    /// `ServerFrame::into_wire` special-cases this variant.
    #[serde(skip)]
    ViewUpdate(Vec<ViewDiff>),
}

#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum ChoiceFrame {
    Slots {
        slots: Vec<SlotAddress>,
        special_options: Vec<String>,
    },
    Schema {
        schema: Value,
    },
}

#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatControlState {
    On,
    Off,
}

#[derive(Debug, Clone, Serialize)]
pub struct ViewDiff {
    pub op: DiffOp,
    pub key: SlotAddress,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
}

#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DiffOp {
    Add,
    Remove,
    Replace,
}

impl ServerFrame {
    /// Serializes this frame to the exact text sent over the wire. A
    /// `ViewUpdate` is a bare JSON array with no `{type: ...}` wrapper;
    /// every other frame is the tagged object produced by serde.
    pub fn into_wire_text(self) -> Result<String, serde_json::Error> {
        match self {
            ServerFrame::ViewUpdate(diffs) => serde_json::to_string(&diffs),
            other => serde_json::to_string(&other),
        }
    }
}
