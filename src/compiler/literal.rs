//! Literal and identifier rendering
//!
//! Structural clause assembly never formats values inline: every value
//! embedded in a statement goes through [`PropertyRenderer`], and every
//! string literal through the configured [`LiteralEscape`].

use super::shape::{FieldShape, ShapeKind};
use super::{CompileError, CompileResult};
use crate::record::FieldValue;
use serde::{Deserialize, Serialize};
use std::fmt;

/// How string literals are escaped before embedding
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LiteralEscape {
    /// Backslash-escape `\` and `'`
    #[default]
    Cypher,
    /// Embed strings as-is; the caller must have sanitized them
    Verbatim,
}

impl LiteralEscape {
    /// Render a single-quoted string literal
    pub fn quote(&self, raw: &str) -> String {
        match self {
            LiteralEscape::Verbatim => format!("'{}'", raw),
            LiteralEscape::Cypher => {
                let mut out = String::with_capacity(raw.len() + 2);
                out.push('\'');
                for c in raw.chars() {
                    match c {
                        '\\' => out.push_str("\\\\"),
                        '\'' => out.push_str("\\'"),
                        c => out.push(c),
                    }
                }
                out.push('\'');
                out
            }
        }
    }
}

/// What to do with null (and, when writing nulls, empty-string) values
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NullPolicy {
    /// Leave null properties out of the rendered map
    #[default]
    Omit,
    /// Render null and empty-string values as the `null` literal
    WriteNull,
}

/// Separator between a property name and its literal
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delimiter {
    /// `name:literal`, inside a property map
    Property,
    /// `name=literal`, in a SET assignment
    Assignment,
}

impl Delimiter {
    pub fn as_str(&self) -> &'static str {
        match self {
            Delimiter::Property => ":",
            Delimiter::Assignment => "=",
        }
    }
}

/// Quote an identifier with backticks unless it is a plain token
pub fn escape_identifier(name: &str) -> String {
    let mut chars = name.chars();
    let plain = match chars.next() {
        Some(first) => {
            (first.is_ascii_alphabetic() || first == '_')
                && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        }
        None => false,
    };

    if plain {
        name.to_string()
    } else {
        format!("`{}`", name.replace('`', "``"))
    }
}

/// Renders record values as statement literals
#[derive(Debug, Clone, Copy)]
pub struct PropertyRenderer {
    escape: LiteralEscape,
}

impl PropertyRenderer {
    pub fn new(escape: LiteralEscape) -> Self {
        Self { escape }
    }

    /// Render one scalar field as `name<delimiter>literal`.
    ///
    /// Returns `None` when the value is null and the policy omits nulls.
    /// Non-scalar shapes are a caller error and report an inconsistency.
    pub fn render_property(
        &self,
        name: &str,
        value: &FieldValue,
        shape: &FieldShape,
        delimiter: Delimiter,
        nulls: NullPolicy,
    ) -> CompileResult<Option<String>> {
        if !matches!(shape.kind, ShapeKind::Scalar(_) | ShapeKind::ScalarList(_)) {
            return Err(CompileError::SchemaInconsistency {
                field: name.to_string(),
                reason: "structural field rendered as a property".to_string(),
            });
        }

        let literal = match nulls {
            NullPolicy::WriteNull if value.is_blank() => "null".to_string(),
            NullPolicy::Omit if value.is_null() => return Ok(None),
            _ => self.literal(name, value)?,
        };

        Ok(Some(format!(
            "{}{}{}",
            escape_identifier(name),
            delimiter.as_str(),
            literal
        )))
    }

    /// Render a value as a bare literal
    pub fn literal(&self, field: &str, value: &FieldValue) -> CompileResult<String> {
        match value {
            FieldValue::Null => Ok("null".to_string()),
            FieldValue::Boolean(b) => Ok(b.to_string()),
            FieldValue::Int(i) => Ok(i.to_string()),
            FieldValue::Long(l) => Ok(l.to_string()),
            FieldValue::Float(f) => float_literal(field, *f),
            FieldValue::Double(d) => float_literal(field, *d),
            FieldValue::String(s) => Ok(self.escape.quote(s)),
            FieldValue::Array(items) => {
                let rendered = items
                    .iter()
                    .map(|item| self.literal(field, item))
                    .collect::<CompileResult<Vec<_>>>()?;
                Ok(format!("[{}]", rendered.join(",")))
            }
            FieldValue::Record(_) => Err(CompileError::SchemaInconsistency {
                field: field.to_string(),
                reason: "record value cannot be rendered as a literal".to_string(),
            }),
        }
    }

    /// Render a `{name:literal,...}` map from already rendered entries
    pub fn property_map(entries: &[String]) -> String {
        format!("{{{}}}", entries.join(","))
    }
}

/// Floats at their own precision, so `0.1f32` stays `0.1`
trait FloatLiteral: Copy + fmt::Display {
    fn is_finite(self) -> bool;
    fn is_integral(self) -> bool;
}

impl FloatLiteral for f32 {
    fn is_finite(self) -> bool {
        f32::is_finite(self)
    }

    fn is_integral(self) -> bool {
        self.fract() == 0.0
    }
}

impl FloatLiteral for f64 {
    fn is_finite(self) -> bool {
        f64::is_finite(self)
    }

    fn is_integral(self) -> bool {
        self.fract() == 0.0
    }
}

fn float_literal<F: FloatLiteral>(field: &str, value: F) -> CompileResult<String> {
    if !value.is_finite() {
        return Err(CompileError::SchemaInconsistency {
            field: field.to_string(),
            reason: format!("{} has no literal form", value),
        });
    }
    if value.is_integral() {
        Ok(format!("{:.1}", value))
    } else {
        Ok(value.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compiler::shape::classify_field;
    use crate::record::Schema;

    fn scalar(schema: Schema) -> FieldShape {
        classify_field("f", &schema).unwrap()
    }

    #[test]
    fn test_render_by_type() {
        let r = PropertyRenderer::new(LiteralEscape::Cypher);
        let s = scalar(Schema::String);
        let i = scalar(Schema::Long);
        let b = scalar(Schema::Boolean);
        let d = scalar(Schema::Double);

        let render = |name, value: FieldValue, shape| {
            r.render_property(name, &value, shape, Delimiter::Property, NullPolicy::Omit)
                .unwrap()
                .unwrap()
        };

        assert_eq!(render("name", "Ann".into(), &s), "name:'Ann'");
        assert_eq!(render("age", 42i64.into(), &i), "age:42");
        assert_eq!(render("active", false.into(), &b), "active:false");
        assert_eq!(render("score", 2.0f64.into(), &d), "score:2.0");
        assert_eq!(render("ratio", 0.25f64.into(), &d), "ratio:0.25");
    }

    #[test]
    fn test_assignment_delimiter_and_nulls() {
        let r = PropertyRenderer::new(LiteralEscape::Cypher);
        let s = scalar(Schema::nullable(Schema::String));

        let out = r
            .render_property("name", &FieldValue::from(""), &s, Delimiter::Assignment, NullPolicy::WriteNull)
            .unwrap();
        assert_eq!(out.as_deref(), Some("name=null"));

        let out = r
            .render_property("name", &FieldValue::Null, &s, Delimiter::Property, NullPolicy::Omit)
            .unwrap();
        assert_eq!(out, None);

        let out = r
            .render_property("name", &FieldValue::from(""), &s, Delimiter::Property, NullPolicy::Omit)
            .unwrap();
        assert_eq!(out.as_deref(), Some("name:''"));
    }

    #[test]
    fn test_string_escaping() {
        assert_eq!(LiteralEscape::Cypher.quote("O'Brien"), r"'O\'Brien'");
        assert_eq!(LiteralEscape::Cypher.quote(r"a\b"), r"'a\\b'");
        assert_eq!(LiteralEscape::Verbatim.quote("O'Brien"), "'O'Brien'");
    }

    #[test]
    fn test_identifier_escaping() {
        assert_eq!(escape_identifier("name"), "name");
        assert_eq!(escape_identifier("_x1"), "_x1");
        assert_eq!(escape_identifier("first name"), "`first name`");
        assert_eq!(escape_identifier("1st"), "`1st`");
        assert_eq!(escape_identifier("a`b"), "`a``b`");
    }

    #[test]
    fn test_list_and_non_finite() {
        let r = PropertyRenderer::new(LiteralEscape::Cypher);
        let list = FieldValue::Array(vec!["a".into(), FieldValue::Null, "c".into()]);
        assert_eq!(r.literal("tags", &list).unwrap(), "['a',null,'c']");
        assert!(r.literal("x", &FieldValue::Double(f64::NAN)).is_err());
    }

    #[test]
    fn test_float_keeps_its_precision() {
        let r = PropertyRenderer::new(LiteralEscape::Cypher);
        assert_eq!(r.literal("x", &FieldValue::Float(0.1)).unwrap(), "0.1");
        assert_eq!(r.literal("x", &FieldValue::Float(2.0)).unwrap(), "2.0");
        assert_eq!(r.literal("x", &FieldValue::Double(0.1)).unwrap(), "0.1");
        assert!(r.literal("x", &FieldValue::Float(f32::INFINITY)).is_err());
    }
}
