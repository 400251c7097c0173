//! Compiled JSON-Schema (draft 2020-12) documents and their violation reports.
//!
//! Validation is delegated to `jsonschema`; this module owns the shape of
//! the report callers see and rejects schemas whose `$ref`s loop back onto
//! the same instance location.

use std::collections::HashMap;
use std::fmt;

use serde_json::Value;

/// One failed constraint, located by JSON pointer into the instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Violation {
    pub pointer: String,
    pub message: String,
}

impl Violation {
    /// Pointer for display; the document root shows as `/`.
    pub fn location(&self) -> &str {
        if self.pointer.is_empty() {
            "/"
        } else {
            &self.pointer
        }
    }
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.location(), self.message)
    }
}

/// Every violation found in a document, ordered by location.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{}", render(.violations))]
pub struct ValidationError {
    violations: Vec<Violation>,
}

impl ValidationError {
    /// Orders by pointer segments; array indices compare numerically and
    /// violations at the same location keep the order they were found in.
    pub fn new(mut violations: Vec<Violation>) -> Self {
        violations.sort_by_cached_key(|violation| segments(&violation.pointer));
        Self { violations }
    }

    pub fn violations(&self) -> &[Violation] {
        &self.violations
    }
}

fn render(violations: &[Violation]) -> String {
    violations
        .iter()
        .map(Violation::to_string)
        .collect::<Vec<_>>()
        .join("\n")
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
enum Segment {
    Index(u64),
    Key(String),
}

fn segments(pointer: &str) -> Vec<Segment> {
    pointer
        .split('/')
        .skip(1)
        .map(|raw| match raw.parse::<u64>() {
            Ok(index) => Segment::Index(index),
            Err(_) => Segment::Key(raw.replace("~1", "/").replace("~0", "~")),
        })
        .collect()
}

/// The schema document itself cannot be used.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SchemaDefinitionError {
    #[error("`$ref` cycle through #{0}")]
    RefCycle(String),
    #[error("invalid schema: {0}")]
    Invalid(String),
}

/// A schema document paired with its compiled validator.
pub struct CompiledSchema {
    document: Value,
    validator: jsonschema::Validator,
}

impl CompiledSchema {
    pub fn compile(document: Value) -> Result<Self, SchemaDefinitionError> {
        if let Some(pointer) = find_ref_cycle(&document) {
            return Err(SchemaDefinitionError::RefCycle(pointer));
        }
        let validator = jsonschema::draft202012::new(&document)
            .map_err(|err| SchemaDefinitionError::Invalid(err.to_string()))?;
        Ok(Self {
            document,
            validator,
        })
    }

    pub fn document(&self) -> &Value {
        &self.document
    }

    /// Check `instance`, collecting every violation.
    pub fn validate(&self, instance: &Value) -> Result<(), ValidationError> {
        let violations: Vec<Violation> = self
            .validator
            .iter_errors(instance)
            .map(|err| Violation {
                pointer: err.instance_path.to_string(),
                message: err.to_string(),
            })
            .collect();
        if violations.is_empty() {
            Ok(())
        } else {
            Err(ValidationError::new(violations))
        }
    }
}

impl fmt::Debug for CompiledSchema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompiledSchema")
            .field("document", &self.document)
            .finish_non_exhaustive()
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Mark {
    Active,
    Done,
}

/// Pointer of a subschema that reaches itself through `$ref` and the
/// applicators that stay on the same instance location.
fn find_ref_cycle(root: &Value) -> Option<String> {
    let mut pointers = Vec::new();
    collect_subschemas(root, String::new(), &mut pointers);

    let mut marks = HashMap::new();
    pointers
        .iter()
        .find_map(|pointer| visit(root, pointer, &mut marks))
}

fn visit(root: &Value, pointer: &str, marks: &mut HashMap<String, Mark>) -> Option<String> {
    match marks.get(pointer) {
        Some(Mark::Active) => return Some(pointer.to_string()),
        Some(Mark::Done) => return None,
        None => {}
    }
    marks.insert(pointer.to_string(), Mark::Active);
    for next in in_place_edges(root, pointer) {
        if let Some(cycle) = visit(root, &next, marks) {
            return Some(cycle);
        }
    }
    marks.insert(pointer.to_string(), Mark::Done);
    None
}

fn in_place_edges(root: &Value, pointer: &str) -> Vec<String> {
    let Some(Value::Object(rules)) = root.pointer(pointer) else {
        return Vec::new();
    };

    let mut edges = Vec::new();
    if let Some(target) = rules
        .get("$ref")
        .and_then(Value::as_str)
        .and_then(|reference| reference.strip_prefix('#'))
    {
        if root.pointer(target).is_some() {
            edges.push(target.to_string());
        }
    }
    for key in ["not", "if", "then", "else"] {
        if rules.contains_key(key) {
            edges.push(format!("{pointer}/{key}"));
        }
    }
    for key in ["allOf", "anyOf", "oneOf"] {
        if let Some(Value::Array(branches)) = rules.get(key) {
            edges.extend((0..branches.len()).map(|index| format!("{pointer}/{key}/{index}")));
        }
    }
    if let Some(Value::Object(dependent)) = rules.get("dependentSchemas") {
        edges.extend(
            dependent
                .keys()
                .map(|name| format!("{pointer}/dependentSchemas/{}", escape(name))),
        );
    }
    edges
}

fn collect_subschemas(value: &Value, pointer: String, out: &mut Vec<String>) {
    match value {
        Value::Object(map) => {
            for (key, child) in map {
                // Literal data, not schemas.
                if matches!(key.as_str(), "enum" | "const" | "default" | "examples") {
                    continue;
                }
                collect_subschemas(child, format!("{pointer}/{}", escape(key)), out);
            }
            out.push(pointer);
        }
        Value::Array(items) => {
            for (index, child) in items.iter().enumerate() {
                collect_subschemas(child, format!("{pointer}/{index}"), out);
            }
        }
        _ => {}
    }
}

fn escape(segment: &str) -> String {
    segment.replace('~', "~0").replace('/', "~1")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn compiled(schema: Value) -> CompiledSchema {
        CompiledSchema::compile(schema).expect("schema compiles")
    }

    fn rejected(schema: Value, instance: Value) -> Vec<Violation> {
        compiled(schema)
            .validate(&instance)
            .expect_err("document should be rejected")
            .violations()
            .to_vec()
    }

    fn locations(violations: &[Violation]) -> Vec<&str> {
        violations.iter().map(Violation::location).collect()
    }

    #[test]
    fn accepts_matching_document() {
        let schema = compiled(json!({
            "type": "object",
            "required": ["name"],
            "properties": { "name": { "type": "string", "minLength": 1 } }
        }));
        assert_eq!(schema.validate(&json!({ "name": "btc" })), Ok(()));
    }

    #[test]
    fn booleans_are_not_numbers() {
        let found = rejected(json!({ "type": "number" }), json!(true));
        assert_eq!(locations(&found), vec!["/"]);
        assert!(found[0].message.contains("number"));
    }

    #[test]
    fn integers_accept_whole_floats_only() {
        let schema = compiled(json!({ "type": "integer" }));
        assert!(schema.validate(&json!(3)).is_ok());
        assert!(schema.validate(&json!(3.0)).is_ok());
        assert!(schema.validate(&json!(3.5)).is_err());
    }

    #[test]
    fn string_and_array_keywords_are_enforced() {
        let text = rejected(
            json!({
                "maxLength": 3,
                "pattern": "^a",
                "allOf": [{ "const": "abc" }]
            }),
            json!("bbbbbb"),
        );
        assert_eq!(text.len(), 3);

        let list = rejected(
            json!({ "maxItems": 2, "uniqueItems": true }),
            json!([1, 1, 1]),
        );
        assert_eq!(list.len(), 2);
        assert_eq!(locations(&list), vec!["/", "/"]);
    }

    #[test]
    fn violations_are_ordered_by_location() {
        let found = rejected(
            json!({
                "type": "object",
                "properties": {
                    "b": { "type": "number" },
                    "a": { "type": "string" }
                },
                "required": ["c"]
            }),
            json!({ "b": "x", "a": 1 }),
        );
        assert_eq!(locations(&found), vec!["/", "/a", "/b"]);
        assert!(found[0].message.contains("\"c\" is a required property"));
    }

    #[test]
    fn array_indices_order_numerically() {
        let found = rejected(
            json!({ "type": "array", "items": { "type": "string" } }),
            json!([
                "0", 1, 2, "3", "4", "5", "6", "7", "8", "9", 10, "11"
            ]),
        );
        assert_eq!(locations(&found), vec!["/1", "/2", "/10"]);
    }

    #[test]
    fn same_location_keeps_discovery_order() {
        let error = compiled(json!({ "required": ["x", "y"] }))
            .validate(&json!({}))
            .expect_err("missing keys");
        let lines: Vec<String> = error.to_string().lines().map(str::to_string).collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("/: ") && lines[0].contains("\"x\""));
        assert!(lines[1].starts_with("/: ") && lines[1].contains("\"y\""));
    }

    #[test]
    fn segment_keys_order_after_indices_and_unescape() {
        let mut pointers = vec!["/b", "/a~1b", "/10", "", "/2/x", "/2"];
        pointers.sort_by_key(|pointer| segments(pointer));
        assert_eq!(pointers, vec!["", "/2", "/2/x", "/10", "/a~1b", "/b"]);
    }

    #[test]
    fn refs_and_any_of() {
        let schema = compiled(json!({
            "$defs": {
                "signal": { "type": "number", "minimum": -1, "maximum": 1 }
            },
            "anyOf": [
                { "type": "object", "required": ["summary"] },
                { "type": "object", "required": ["predictions"] }
            ],
            "properties": { "overall": { "$ref": "#/$defs/signal" } }
        }));
        assert!(schema
            .validate(&json!({ "summary": {}, "overall": 0.5 }))
            .is_ok());

        let found = schema
            .validate(&json!({ "overall": 2 }))
            .expect_err("neither shape")
            .violations()
            .to_vec();
        assert_eq!(locations(&found), vec!["/", "/overall"]);
        assert!(found[1].message.contains("maximum of 1"));
    }

    #[test]
    fn self_referencing_schemas_are_refused() {
        for schema in [
            json!({ "$ref": "#" }),
            json!({ "allOf": [{ "$ref": "#" }] }),
            json!({
                "$defs": {
                    "a": { "$ref": "#/$defs/b" },
                    "b": { "anyOf": [{ "$ref": "#/$defs/a" }] }
                },
                "properties": { "x": { "$ref": "#/$defs/a" } }
            }),
        ] {
            match CompiledSchema::compile(schema.clone()) {
                Err(SchemaDefinitionError::RefCycle(pointer)) => {
                    assert!(schema.pointer(&pointer).is_some(), "{pointer} exists");
                }
                other => panic!("{schema}: expected a ref cycle, got {other:?}"),
            }
        }
    }

    #[test]
    fn recursion_through_child_locations_is_allowed() {
        let schema = compiled(json!({
            "type": "object",
            "properties": { "child": { "$ref": "#" } }
        }));
        assert!(schema.validate(&json!({ "child": { "child": {} } })).is_ok());
        let found = schema
            .validate(&json!({ "child": { "child": 1 } }))
            .expect_err("leaf is not an object")
            .violations()
            .to_vec();
        assert_eq!(locations(&found), vec!["/child/child"]);
    }

    #[test]
    fn literal_values_are_not_walked_as_schemas() {
        let schema = compiled(json!({ "const": { "$ref": "#" } }));
        assert!(schema.validate(&json!({ "$ref": "#" })).is_ok());
    }

    #[test]
    fn unresolvable_reference_fails_to_compile() {
        let error = CompiledSchema::compile(json!({ "$ref": "#/$defs/missing" }))
            .expect_err("dangling ref");
        assert!(matches!(error, SchemaDefinitionError::Invalid(_)));
    }

    #[test]
    fn pointer_segments_are_escaped() {
        let found = rejected(
            json!({ "additionalProperties": { "type": "number" } }),
            json!({ "a/b": "x" }),
        );
        assert_eq!(locations(&found), vec!["/a~1b"]);
    }
}
