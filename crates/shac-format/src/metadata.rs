//! Per-layer metadata and its tolerant parser.
//!
//! Layer metadata is UTF-8 text that is normally JSON:
//!
//! ```json
//! {"position": [1.0, 0.0, 0.0], "gain": 0.8}
//! ```
//!
//! Older writers emitted Python dict literals instead
//! (`{'position': (1.0, 0.0, 0.0), 'premixed': True}`). Parsing is a three-way
//! outcome, see [`MetadataParse`]: strict JSON, the legacy literal grammar
//! rewritten to JSON, or a typed default carrying the reason both failed.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

/// A named source inside a pre-mixed composite layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceRef {
    pub name: String,
    pub position: [f64; 3],
}

/// Parsed metadata for a single layer.
///
/// Position components and gain are always finite: anything else found in
/// the file is replaced (position → 0.0, gain → 1.0) while parsing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayerMetadata {
    /// World position of the layer (x forward, y left, z up).
    pub position: [f64; 3],
    /// Linear gain applied when rendering.
    pub gain: f64,
    /// The layer is an already spatialized composite field.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub premixed: bool,
    /// Sources mixed into a pre-mixed layer, for display only.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub sources: Vec<SourceRef>,
    /// Unrecognised keys, kept for the scene visualizer.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Default for LayerMetadata {
    fn default() -> Self {
        Self {
            position: [0.0; 3],
            gain: 1.0,
            premixed: false,
            sources: Vec::new(),
            extra: Map::new(),
        }
    }
}

impl LayerMetadata {
    /// Metadata for a point layer at `position`.
    pub fn at(position: [f64; 3]) -> Self {
        Self {
            position: sanitize_position(position),
            ..Self::default()
        }
    }

    pub fn with_gain(mut self, gain: f64) -> Self {
        self.gain = if gain.is_finite() { gain } else { 1.0 };
        self
    }

    pub fn with_premixed(mut self, premixed: bool) -> Self {
        self.premixed = premixed;
        self
    }

    pub fn with_source(mut self, name: impl Into<String>, position: [f64; 3]) -> Self {
        self.sources.push(SourceRef {
            name: name.into(),
            position: sanitize_position(position),
        });
        self
    }

    /// Serialize to the JSON text stored in a layer record.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    /// Build metadata from an already parsed JSON value.
    pub fn from_value(value: Value) -> Result<Self, MetadataParseError> {
        let mut map = match value {
            Value::Object(map) => map,
            other => return Err(MetadataParseError::NotAnObject(value_kind(&other))),
        };

        let position = map
            .remove("position")
            .map(|v| position_from_value(&v))
            .unwrap_or([0.0; 3]);
        let gain = map
            .remove("gain")
            .and_then(|v| v.as_f64())
            .filter(|g| g.is_finite())
            .unwrap_or(1.0);

        let mut premixed = false;
        for key in ["premixed", "pre_mixed", "is_premixed", "isPremixed"] {
            if let Some(v) = map.remove(key) {
                premixed |= v.as_bool().unwrap_or(false);
            }
        }

        let sources = map
            .remove("sources")
            .map(|v| sources_from_value(&v))
            .unwrap_or_default();

        Ok(Self {
            position,
            gain,
            premixed,
            sources,
            extra: map,
        })
    }
}

fn sanitize_position(p: [f64; 3]) -> [f64; 3] {
    p.map(|c| if c.is_finite() { c } else { 0.0 })
}

fn position_from_value(value: &Value) -> [f64; 3] {
    let mut out = [0.0; 3];
    if let Value::Array(items) = value {
        for (slot, item) in out.iter_mut().zip(items) {
            *slot = item.as_f64().filter(|c| c.is_finite()).unwrap_or(0.0);
        }
    }
    out
}

fn sources_from_value(value: &Value) -> Vec<SourceRef> {
    let Value::Array(items) = value else {
        return Vec::new();
    };
    items
        .iter()
        .enumerate()
        .filter_map(|(i, item)| {
            let obj = item.as_object()?;
            let name = obj
                .get("name")
                .and_then(Value::as_str)
                .map(str::to_string)
                .unwrap_or_else(|| format!("source{i}"));
            let position = obj
                .get("position")
                .map(position_from_value)
                .unwrap_or([0.0; 3]);
            Some(SourceRef { name, position })
        })
        .collect()
}

fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Why metadata could not be parsed. Never propagated out of the reader;
/// it is carried by [`MetadataParse::Fallback`] and logged.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MetadataParseError {
    #[error("metadata block is empty")]
    Empty,

    #[error("metadata is not valid UTF-8")]
    InvalidUtf8,

    #[error("metadata is a {0}, expected an object")]
    NotAnObject(&'static str),

    #[error("metadata is neither JSON ({json}) nor a legacy literal ({legacy})")]
    Unparseable { json: String, legacy: String },
}

/// Which parser produced a layer's metadata.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MetadataSource {
    Json,
    Legacy,
    Default,
}

/// Outcome of parsing one metadata block.
#[derive(Debug, Clone, PartialEq)]
pub enum MetadataParse {
    /// Strict JSON.
    Json(LayerMetadata),
    /// Legacy Python-literal text, rewritten to JSON first.
    Legacy(LayerMetadata),
    /// Neither parser succeeded; defaults are used.
    Fallback {
        metadata: LayerMetadata,
        error: MetadataParseError,
    },
}

impl MetadataParse {
    /// Parse a raw metadata block.
    pub fn parse(bytes: &[u8]) -> Self {
        let text = match std::str::from_utf8(bytes) {
            Ok(t) => t.trim(),
            Err(_) => return Self::fallback(MetadataParseError::InvalidUtf8),
        };
        if text.is_empty() {
            return Self::fallback(MetadataParseError::Empty);
        }

        let json_err = match serde_json::from_str::<Value>(text) {
            Ok(value) => {
                return match LayerMetadata::from_value(value) {
                    Ok(m) => Self::Json(m),
                    Err(e) => Self::fallback(e),
                }
            }
            Err(e) => e.to_string(),
        };

        let legacy_err = match legacy_to_json(text) {
            Ok(normalized) => match serde_json::from_str::<Value>(&normalized) {
                Ok(value) => {
                    return match LayerMetadata::from_value(value) {
                        Ok(m) => Self::Legacy(m),
                        Err(e) => Self::fallback(e),
                    }
                }
                Err(e) => e.to_string(),
            },
            Err(e) => e,
        };

        Self::fallback(MetadataParseError::Unparseable {
            json: json_err,
            legacy: legacy_err,
        })
    }

    fn fallback(error: MetadataParseError) -> Self {
        Self::Fallback {
            metadata: LayerMetadata::default(),
            error,
        }
    }

    pub fn source(&self) -> MetadataSource {
        match self {
            Self::Json(_) => MetadataSource::Json,
            Self::Legacy(_) => MetadataSource::Legacy,
            Self::Fallback { .. } => MetadataSource::Default,
        }
    }

    pub fn metadata(&self) -> &LayerMetadata {
        match self {
            Self::Json(m) | Self::Legacy(m) => m,
            Self::Fallback { metadata, .. } => metadata,
        }
    }

    pub fn error(&self) -> Option<&MetadataParseError> {
        match self {
            Self::Fallback { error, .. } => Some(error),
            _ => None,
        }
    }

    pub fn into_metadata(self) -> LayerMetadata {
        match self {
            Self::Json(m) | Self::Legacy(m) => m,
            Self::Fallback { metadata, .. } => metadata,
        }
    }
}

/// Rewrite a Python-style literal into JSON text.
///
/// Handles single- or double-quoted strings, `True`/`False`/`None`,
/// `nan`/`inf` (mapped to `null`), tuples written with parentheses and
/// trailing commas. Any other bare word is rejected.
pub fn legacy_to_json(text: &str) -> Result<String, String> {
    let mut out = String::with_capacity(text.len() + 8);
    let mut chars = text.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '\'' | '"' => {
                out.push('"');
                let quote = c;
                let mut closed = false;
                while let Some(s) = chars.next() {
                    match s {
                        '\\' => match chars.next() {
                            Some('\'') => out.push('\''),
                            Some(e) => {
                                out.push('\\');
                                out.push(e);
                            }
                            None => return Err("dangling escape at end of input".into()),
                        },
                        s if s == quote => {
                            closed = true;
                            break;
                        }
                        '"' => out.push_str("\\\""),
                        s => out.push(s),
                    }
                }
                if !closed {
                    return Err("unterminated string".into());
                }
                out.push('"');
            }
            // Exponent of a number literal such as `1e-3`.
            'e' | 'E' if out.ends_with(|p: char| p.is_ascii_digit() || p == '.') => out.push(c),
            '(' => out.push('['),
            ')' | ']' | '}' => {
                let trimmed = out.trim_end().len();
                out.truncate(trimmed);
                if out.ends_with(',') {
                    out.pop();
                }
                out.push(if c == ')' { ']' } else { c });
            }
            c if c.is_ascii_alphabetic() || c == '_' => {
                let mut word = String::from(c);
                while let Some(&n) = chars.peek() {
                    if n.is_ascii_alphanumeric() || n == '_' {
                        word.push(n);
                        chars.next();
                    } else {
                        break;
                    }
                }
                let replacement = match word.as_str() {
                    "True" | "true" => "true",
                    "False" | "false" => "false",
                    "None" | "null" | "nan" | "NaN" | "inf" | "Infinity" => "null",
                    _ => return Err(format!("unexpected identifier '{word}'")),
                };
                // A sign before inf/nan has nothing left to apply to.
                if replacement == "null" && (out.ends_with('-') || out.ends_with('+')) {
                    out.pop();
                }
                out.push_str(replacement);
            }
            c => out.push(c),
        }
    }

    Ok(out)
}
