// Records produced by queries and the polling loop

use serde::Serialize;

use crate::controller::{Command, ErrorCode, SessionError};

/// Outcome of one read-only query
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "value")]
pub enum Reading {
    Value(String),
    /// The controller stayed silent or sent only markers
    NoData,
}

impl Reading {
    pub fn value(&self) -> Option<&str> {
        match self {
            Reading::Value(v) => Some(v),
            Reading::NoData => None,
        }
    }
}

/// One polling cycle's result
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PollResult {
    pub axis: String,
    #[serde(serialize_with = "serialize_mnemonic")]
    pub command: Command,
    pub reading: Reading,
}

fn serialize_mnemonic<S: serde::Serializer>(command: &Command, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_str(command.mnemonic())
}

/// What the polling loop hands to its sink
#[derive(Debug)]
pub enum PollEvent {
    Reading(PollResult),
    /// The reply was an error report; polling continues
    DeviceError {
        axis: String,
        command: Command,
        code: ErrorCode,
    },
    /// The link failed; this is the last event before the loop stops
    Failed(SessionError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reading_value() {
        assert_eq!(Reading::Value("12.5".to_string()).value(), Some("12.5"));
        assert_eq!(Reading::NoData.value(), None);
    }

    #[test]
    fn test_poll_result_json() {
        let result = PollResult {
            axis: "1".to_string(),
            command: Command::Pos,
            reading: Reading::Value("123.45".to_string()),
        };
        assert_eq!(
            serde_json::to_string(&result).unwrap(),
            r#"{"axis":"1","command":"POS","reading":{"kind":"value","value":"123.45"}}"#
        );

        let empty = PollResult {
            reading: Reading::NoData,
            ..result
        };
        assert_eq!(
            serde_json::to_string(&empty).unwrap(),
            r#"{"axis":"1","command":"POS","reading":{"kind":"no_data"}}"#
        );
    }
}
