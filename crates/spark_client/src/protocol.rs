//! Wire protocol models.
//!
//! One JSON request body per exchange, then a stream of JSON frames until
//! the terminal frame (status 2) which also carries the usage block.

use serde::{Deserialize, Serialize};
use spark_core::{SparkConfig, Turn};

// ---------------------------------------------------------------------------
// Outbound request
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
pub struct ChatRequest {
    pub header: RequestHeader,
    pub parameter: Parameter,
    pub payload: RequestPayload,
}

#[derive(Debug, Clone, Serialize)]
pub struct RequestHeader {
    pub app_id: String,
    pub uid: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct Parameter {
    pub chat: ChatParameter,
}

#[derive(Debug, Clone, Serialize)]
pub struct ChatParameter {
    pub domain: String,
    pub max_tokens: u32,
    pub temperature: f32,
    pub top_k: u32,
}

#[derive(Debug, Clone, Serialize)]
pub struct RequestPayload {
    pub message: MessageBlock,
}

#[derive(Debug, Clone, Serialize)]
pub struct MessageBlock {
    pub text: Vec<Turn>,
}

impl ChatRequest {
    /// Assemble the request body from the configured sampling parameters
    /// and the (already trimmed) transcript.
    pub fn new(config: &SparkConfig, turns: &[Turn]) -> Self {
        Self {
            header: RequestHeader {
                app_id: config.credentials.app_id.clone(),
                uid: config.uid.clone(),
            },
            parameter: Parameter {
                chat: ChatParameter {
                    domain: config.domain.clone(),
                    max_tokens: config.max_tokens,
                    temperature: config.temperature,
                    top_k: config.top_k,
                },
            },
            payload: RequestPayload {
                message: MessageBlock {
                    text: turns.to_vec(),
                },
            },
        }
    }
}

// ---------------------------------------------------------------------------
// Inbound frames
// ---------------------------------------------------------------------------

/// One raw frame as received from the service.
#[derive(Debug, Clone, Deserialize)]
pub struct StreamFrame {
    pub header: FrameHeader,
    #[serde(default)]
    pub payload: Option<FramePayload>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FrameHeader {
    pub code: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FramePayload {
    #[serde(default)]
    pub choices: Option<Choices>,
    /// Present only on the terminal frame.
    #[serde(default)]
    pub usage: Option<UsageBlock>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Choices {
    pub seq: u32,
    pub status: u8,
    pub text: Vec<TextPiece>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TextPiece {
    pub content: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UsageBlock {
    pub text: UsageCounters,
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct UsageCounters {
    pub total_tokens: u64,
    pub completion_tokens: u64,
    pub prompt_tokens: u64,
}

/// Completion marker carried by every fragment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FragmentStatus {
    /// First fragment of the exchange (wire value 0).
    First,
    /// Intermediate fragment (wire value 1).
    Middle,
    /// Terminal fragment, usage block attached (wire value 2).
    Last,
}

impl FragmentStatus {
    pub fn from_wire(value: u8) -> Option<Self> {
        match value {
            0 => Some(FragmentStatus::First),
            1 => Some(FragmentStatus::Middle),
            2 => Some(FragmentStatus::Last),
            _ => None,
        }
    }

    pub fn is_terminal(self) -> bool {
        self == FragmentStatus::Last
    }
}

/// One partial-answer unit, decoded from a frame's `choices` block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fragment {
    pub seq: u32,
    pub status: FragmentStatus,
    pub text: String,
}

impl Fragment {
    /// Decode the choices block. Returns `None` for an unknown status
    /// value, which callers treat as a protocol violation.
    pub fn from_choices(choices: &Choices) -> Option<Self> {
        let status = FragmentStatus::from_wire(choices.status)?;
        let text = choices
            .text
            .iter()
            .map(|piece| piece.content.as_str())
            .collect();
        Some(Fragment {
            seq: choices.seq,
            status,
            text,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use spark_core::{Role, SparkConfig};

    #[test]
    fn request_body_shape() {
        let mut config = SparkConfig::default();
        config.credentials.app_id = "app".into();
        config.domain = "generalv2".into();

        let turns = vec![Turn::new(Role::User, "hi")];
        let request = ChatRequest::new(&config, &turns);
        let json = serde_json::to_value(&request).unwrap();

        assert_eq!(json["header"]["app_id"], "app");
        assert_eq!(json["header"]["uid"], "1234");
        assert_eq!(json["parameter"]["chat"]["domain"], "generalv2");
        assert_eq!(json["parameter"]["chat"]["max_tokens"], 2048);
        assert_eq!(json["parameter"]["chat"]["top_k"], 4);
        assert_eq!(
            json["payload"]["message"]["text"],
            serde_json::json!([{"role": "user", "content": "hi"}])
        );
    }

    #[test]
    fn parses_middle_frame() {
        let raw = r#"{
            "header": {"code": 0},
            "payload": {"choices": {"seq": 3, "status": 1, "text": [{"content": "lo"}]}}
        }"#;
        let frame: StreamFrame = serde_json::from_str(raw).unwrap();
        assert_eq!(frame.header.code, 0);

        let choices = frame.payload.unwrap().choices.unwrap();
        let fragment = Fragment::from_choices(&choices).unwrap();
        assert_eq!(fragment.seq, 3);
        assert_eq!(fragment.status, FragmentStatus::Middle);
        assert_eq!(fragment.text, "lo");
    }

    #[test]
    fn parses_terminal_frame_with_usage() {
        let raw = r#"{
            "header": {"code": 0},
            "payload": {
                "choices": {"seq": 9, "status": 2, "text": [{"content": "."}]},
                "usage": {"text": {"total_tokens": 30, "completion_tokens": 20, "prompt_tokens": 10}}
            }
        }"#;
        let frame: StreamFrame = serde_json::from_str(raw).unwrap();
        let payload = frame.payload.unwrap();
        let usage = payload.usage.unwrap();
        assert_eq!(usage.text.total_tokens, 30);
        assert_eq!(usage.text.completion_tokens, 20);
        assert_eq!(usage.text.prompt_tokens, 10);

        let fragment = Fragment::from_choices(&payload.choices.unwrap()).unwrap();
        assert!(fragment.status.is_terminal());
    }

    #[test]
    fn parses_error_frame_without_payload() {
        let raw = r#"{"header": {"code": 10163}}"#;
        let frame: StreamFrame = serde_json::from_str(raw).unwrap();
        assert_eq!(frame.header.code, 10163);
        assert!(frame.payload.is_none());
    }

    #[test]
    fn unknown_status_is_not_a_fragment() {
        let choices = Choices {
            seq: 0,
            status: 7,
            text: vec![],
        };
        assert!(Fragment::from_choices(&choices).is_none());
    }
}
