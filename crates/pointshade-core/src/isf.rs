//! ISF-style metadata embedded in the leading comment of a shader file.
//!
//! A shader starts with a `/* ... */` block holding a JSON object. Its
//! `INPUTS` array declares the tunable numeric inputs of the shader:
//!
//! ```text
//! /*{
//!   "DESCRIPTION": "concentric ripples",
//!   "INPUTS": [
//!     { "NAME": "amp", "TYPE": "float", "DEFAULT": 0.5, "MIN": 0.0, "MAX": 1.0 }
//!   ]
//! }*/
//! ```
//!
//! [`extract_metadata`] turns that header into an [`IsfMetadata`]. It never
//! touches the GPU and never panics on malformed input.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Numeric input types accepted in an `INPUTS` declaration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IsfType {
    Float,
    #[serde(alias = "long", alias = "integer")]
    Int,
    Bool,
}

impl Default for IsfType {
    fn default() -> Self {
        Self::Float
    }
}

/// One declared shader input.
#[derive(Debug, Clone, PartialEq)]
pub struct IsfInput {
    pub name: String,
    pub ty: IsfType,
    pub default: f32,
    pub min: f32,
    pub max: f32,
}

/// Parsed metadata header. Input order is declaration order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IsfMetadata {
    pub description: Option<String>,
    pub inputs: Vec<IsfInput>,
}

#[derive(Debug, Error)]
pub enum MetadataError {
    #[error("shader does not start with a /* ... */ metadata block")]
    MissingBlock,
    #[error("metadata block is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("input #{index} is missing required field {field}")]
    MissingField { index: usize, field: &'static str },
    #[error("input '{input}' has an unsupported TYPE '{ty}'")]
    UnsupportedType { input: String, ty: String },
    #[error("input '{input}' has a non-finite {field}")]
    NonFinite { input: String, field: &'static str },
    #[error("input '{input}' violates MIN <= DEFAULT <= MAX ({min} / {default} / {max})")]
    BoundsOrder {
        input: String,
        default: f32,
        min: f32,
        max: f32,
    },
    #[error("input '{0}' is declared more than once")]
    DuplicateName(String),
}

// Wire shapes. Fields are optional so missing ones are reported by name
// instead of as a generic serde error.
#[derive(Debug, Deserialize, Serialize)]
struct RawHeader {
    #[serde(rename = "DESCRIPTION", default, skip_serializing_if = "Option::is_none")]
    description: Option<String>,
    #[serde(rename = "INPUTS", default)]
    inputs: Vec<RawInput>,
}

#[derive(Debug, Deserialize, Serialize)]
struct RawInput {
    #[serde(rename = "NAME")]
    name: Option<String>,
    #[serde(rename = "TYPE", default)]
    ty: Option<String>,
    #[serde(rename = "DEFAULT")]
    default: Option<f64>,
    #[serde(rename = "MIN")]
    min: Option<f64>,
    #[serde(rename = "MAX")]
    max: Option<f64>,
}

/// Return the text between the leading `/*` and the first `*/`.
pub fn metadata_block(source: &str) -> Option<&str> {
    let body = source.trim_start().strip_prefix("/*")?;
    let end = body.find("*/")?;
    Some(&body[..end])
}

/// Parse the metadata header of `source`.
pub fn extract_metadata(source: &str) -> Result<IsfMetadata, MetadataError> {
    let block = metadata_block(source).ok_or(MetadataError::MissingBlock)?;
    let raw: RawHeader = serde_json::from_str(block)?;

    let mut inputs: Vec<IsfInput> = Vec::with_capacity(raw.inputs.len());
    for (index, input) in raw.inputs.into_iter().enumerate() {
        let parsed = parse_input(index, input)?;
        if inputs.iter().any(|i| i.name == parsed.name) {
            return Err(MetadataError::DuplicateName(parsed.name));
        }
        inputs.push(parsed);
    }

    Ok(IsfMetadata {
        description: raw.description,
        inputs,
    })
}

fn parse_input(index: usize, raw: RawInput) -> Result<IsfInput, MetadataError> {
    let name = raw
        .name
        .ok_or(MetadataError::MissingField { index, field: "NAME" })?;

    let ty = match raw.ty.as_deref() {
        None => IsfType::Float,
        Some(ty) => serde_json::from_value(serde_json::Value::String(ty.to_ascii_lowercase()))
            .map_err(|_| MetadataError::UnsupportedType {
                input: name.clone(),
                ty: ty.to_string(),
            })?,
    };

    let field = |value: Option<f64>, field: &'static str| -> Result<f32, MetadataError> {
        let value = value.ok_or(MetadataError::MissingField { index, field })? as f32;
        if !value.is_finite() {
            return Err(MetadataError::NonFinite {
                input: name.clone(),
                field,
            });
        }
        Ok(value)
    };
    let default = field(raw.default, "DEFAULT")?;
    let min = field(raw.min, "MIN")?;
    let max = field(raw.max, "MAX")?;

    if !(min <= default && default <= max) {
        return Err(MetadataError::BoundsOrder {
            input: name,
            default,
            min,
            max,
        });
    }

    Ok(IsfInput {
        name,
        ty,
        default,
        min,
        max,
    })
}

impl IsfMetadata {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.inputs.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<&IsfInput> {
        self.inputs.iter().find(|i| i.name == name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.inputs.iter().map(|i| i.name.as_str())
    }

    /// Serialize back into the JSON header format, without comment delimiters.
    pub fn to_json(&self) -> String {
        let raw = RawHeader {
            description: self.description.clone(),
            inputs: self
                .inputs
                .iter()
                .map(|i| RawInput {
                    name: Some(i.name.clone()),
                    ty: Some(
                        match i.ty {
                            IsfType::Float => "float",
                            IsfType::Int => "int",
                            IsfType::Bool => "bool",
                        }
                        .to_string(),
                    ),
                    default: Some(f64::from(i.default)),
                    min: Some(f64::from(i.min)),
                    max: Some(f64::from(i.max)),
                })
                .collect(),
        };
        serde_json::to_string_pretty(&raw).unwrap_or_else(|_| String::from("{}"))
    }

    /// Serialize as a complete `/* ... */` header block.
    pub fn to_header(&self) -> String {
        format!("/*{}*/", self.to_json())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const RIPPLE: &str = r#"/*{
        "DESCRIPTION": "ripple",
        "INPUTS": [
            { "NAME": "amp", "TYPE": "float", "DEFAULT": 0.5, "MIN": 0.0, "MAX": 1.0 },
            { "NAME": "freq", "TYPE": "float", "DEFAULT": 4.0, "MIN": 1.0, "MAX": 16.0 },
            { "NAME": "steps", "TYPE": "int", "DEFAULT": 3, "MIN": 1, "MAX": 8 }
        ]
    }*/
    #version 330
    in vec3 position;
    out vec3 outColor;
    void main() { outColor = position; }
    "#;

    #[test]
    fn parses_inputs_in_declaration_order() {
        let meta = extract_metadata(RIPPLE).unwrap();
        let names: Vec<_> = meta.names().collect();
        assert_eq!(names, ["amp", "freq", "steps"]);
        assert_eq!(meta.description.as_deref(), Some("ripple"));

        let amp = meta.get("amp").unwrap();
        assert_eq!((amp.default, amp.min, amp.max), (0.5, 0.0, 1.0));
        assert_eq!(meta.get("steps").unwrap().ty, IsfType::Int);
    }

    #[test]
    fn reserialized_header_parses_to_the_same_metadata() {
        let meta = extract_metadata(RIPPLE).unwrap();
        let again = extract_metadata(&meta.to_header()).unwrap();
        assert_eq!(meta, again);
    }

    #[test]
    fn leading_whitespace_is_allowed() {
        let src = "\n\n   /*{\"INPUTS\": []}*/ void main() {}";
        assert!(extract_metadata(src).unwrap().is_empty());
    }

    #[test]
    fn missing_block_is_reported() {
        let err = extract_metadata("void main() {}").unwrap_err();
        assert!(matches!(err, MetadataError::MissingBlock));

        // Block not at the start of the file.
        let err = extract_metadata("#version 330\n/*{\"INPUTS\":[]}*/").unwrap_err();
        assert!(matches!(err, MetadataError::MissingBlock));

        // Unterminated.
        let err = extract_metadata("/*{\"INPUTS\":[]}").unwrap_err();
        assert!(matches!(err, MetadataError::MissingBlock));
    }

    #[test]
    fn malformed_json_is_reported() {
        let err = extract_metadata("/*{ INPUTS: [ }*/").unwrap_err();
        assert!(matches!(err, MetadataError::Json(_)));
    }

    #[test]
    fn missing_numeric_fields_are_rejected() {
        let src = r#"/*{"INPUTS":[{"NAME":"amp","DEFAULT":0.5,"MIN":0}]}*/"#;
        let err = extract_metadata(src).unwrap_err();
        assert!(matches!(
            err,
            MetadataError::MissingField { index: 0, field: "MAX" }
        ));
    }

    #[test]
    fn type_defaults_to_float_and_non_numeric_types_fail() {
        let src = r#"/*{"INPUTS":[{"NAME":"a","DEFAULT":1,"MIN":0,"MAX":2}]}*/"#;
        assert_eq!(extract_metadata(src).unwrap().inputs[0].ty, IsfType::Float);

        let src = r#"/*{"INPUTS":[{"NAME":"img","TYPE":"image","DEFAULT":0,"MIN":0,"MAX":1}]}*/"#;
        assert!(matches!(
            extract_metadata(src).unwrap_err(),
            MetadataError::UnsupportedType { .. }
        ));
    }

    #[test]
    fn bounds_and_duplicates_are_validated() {
        let src = r#"/*{"INPUTS":[{"NAME":"a","DEFAULT":3,"MIN":0,"MAX":2}]}*/"#;
        assert!(matches!(
            extract_metadata(src).unwrap_err(),
            MetadataError::BoundsOrder { .. }
        ));

        let src = r#"/*{"INPUTS":[
            {"NAME":"a","DEFAULT":0,"MIN":0,"MAX":1},
            {"NAME":"a","DEFAULT":0,"MIN":0,"MAX":1}
        ]}*/"#;
        assert!(matches!(
            extract_metadata(src).unwrap_err(),
            MetadataError::DuplicateName(name) if name == "a"
        ));
    }
}
