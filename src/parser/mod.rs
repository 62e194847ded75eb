//! Document parsing collaborator.
//!
//! The engine never looks at raw bytes itself; it hands them to a
//! [`DocumentParser`] and works with the generic YAML values it gets back.
//! [`YamlParser`] is the default implementation: it understands multi-document
//! YAML streams and accepts JSON.

use serde::Deserialize;
use serde_yaml::Value;
use thiserror::Error;

/// A document could not be parsed.
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct ParseError {
    pub message: String,
}

/// Turns raw bytes into a sequence of generic documents.
pub trait DocumentParser: Send + Sync {
    /// Parses every document in `bytes`, in stream order.
    ///
    /// Empty documents (for example between two `---` markers) are returned as
    /// [`Value::Null`]; an empty input yields no documents at all.
    fn parse(&self, bytes: &[u8]) -> Result<Vec<Value>, ParseError>;
}

/// `serde_yaml` based parser.
#[derive(Debug, Clone, Copy, Default)]
pub struct YamlParser;

impl DocumentParser for YamlParser {
    fn parse(&self, bytes: &[u8]) -> Result<Vec<Value>, ParseError> {
        let text = std::str::from_utf8(bytes).map_err(|e| ParseError {
            message: format!("not valid UTF-8: {e}"),
        })?;

        match parse_yaml_stream(text) {
            Ok(documents) => Ok(documents),
            Err(yaml_error) => {
                let trimmed = text.trim_start();
                if trimmed.starts_with('{') || trimmed.starts_with('[') {
                    // JSON with tab indentation is valid JSON but not valid YAML
                    let json: serde_json::Value =
                        serde_json::from_str(text).map_err(|e| ParseError {
                            message: format!("invalid JSON: {e}"),
                        })?;
                    let value = serde_yaml::to_value(json).map_err(|e| ParseError {
                        message: e.to_string(),
                    })?;
                    Ok(vec![value])
                } else {
                    Err(yaml_error)
                }
            }
        }
    }
}

fn parse_yaml_stream(text: &str) -> Result<Vec<Value>, ParseError> {
    if text.trim().is_empty() {
        return Ok(Vec::new());
    }

    let mut documents = Vec::new();
    for document in serde_yaml::Deserializer::from_str(text) {
        let value = Value::deserialize(document).map_err(|e| ParseError {
            message: format!("invalid YAML: {e}"),
        })?;
        documents.push(value);
    }
    Ok(documents)
}
