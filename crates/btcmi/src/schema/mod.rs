//! Schema loading, caching and validation of payloads and reports.

pub mod validator;

use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, PoisonError, RwLock};

use serde_json::Value;
use tracing::debug;

pub use validator::{CompiledSchema, SchemaDefinitionError, ValidationError, Violation};

/// Schemas shipped with the crate.
pub const BUNDLED_SCHEMA_DIR: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/schemas");

#[derive(Debug, thiserror::Error)]
pub enum SchemaError {
    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("{} is not valid JSON: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("schema not found: {name}")]
    UnknownSchema { name: String },
    #[error("{}: {source}", path.display())]
    Definition {
        path: PathBuf,
        #[source]
        source: SchemaDefinitionError,
    },
    #[error(transparent)]
    Invalid(#[from] ValidationError),
}

impl SchemaError {
    /// Whether the document (not the schema or the filesystem) is at fault.
    pub fn is_violation(&self) -> bool {
        matches!(self, Self::Invalid(_))
    }
}

/// Read and parse a JSON document.
pub fn load_json(path: &Path) -> Result<Value, SchemaError> {
    let text = fs::read_to_string(path).map_err(|source| SchemaError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&text).map_err(|source| SchemaError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

/// Load and compile the schema document at `path`.
pub fn load_schema(path: &Path) -> Result<CompiledSchema, SchemaError> {
    CompiledSchema::compile(load_json(path)?).map_err(|source| SchemaError::Definition {
        path: path.to_path_buf(),
        source,
    })
}

/// Compiled schemas keyed by path. Entries are loaded on first use and never
/// evicted; concurrent first loads of the same path store one entry.
#[derive(Debug, Default)]
pub struct SchemaCache {
    entries: RwLock<HashMap<String, Arc<CompiledSchema>>>,
}

impl SchemaCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_or_load(&self, path: &Path) -> Result<Arc<CompiledSchema>, SchemaError> {
        let key = path.to_string_lossy().into_owned();

        if let Some(schema) = self
            .entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&key)
        {
            return Ok(Arc::clone(schema));
        }

        let loaded = Arc::new(load_schema(path)?);
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        // Another thread may have won the race while we were reading.
        let schema = entries.entry(key).or_insert_with(|| {
            debug!(path = %path.display(), "schema cached");
            loaded
        });
        Ok(Arc::clone(schema))
    }

    pub fn len(&self) -> usize {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Named schemas exposed to callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SchemaKind {
    Input,
    Output,
}

impl SchemaKind {
    pub const ALL: [Self; 2] = [Self::Input, Self::Output];

    pub const fn name(self) -> &'static str {
        match self {
            Self::Input => "input",
            Self::Output => "output",
        }
    }

    pub const fn file_name(self) -> &'static str {
        match self {
            Self::Input => "input_schema.json",
            Self::Output => "output_schema.json",
        }
    }

    pub fn parse(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.name() == name)
    }
}

impl fmt::Display for SchemaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Resolves schema names inside one directory and caches what it loads.
#[derive(Debug)]
pub struct SchemaRegistry {
    dir: PathBuf,
    cache: SchemaCache,
}

impl SchemaRegistry {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            cache: SchemaCache::new(),
        }
    }

    pub fn bundled() -> Self {
        Self::new(BUNDLED_SCHEMA_DIR)
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, kind: SchemaKind) -> PathBuf {
        self.dir.join(kind.file_name())
    }

    pub fn schema(&self, kind: SchemaKind) -> Result<Arc<CompiledSchema>, SchemaError> {
        self.cache.get_or_load(&self.path_for(kind))
    }

    pub fn validate(&self, kind: SchemaKind, document: &Value) -> Result<(), SchemaError> {
        self.schema(kind)?.validate(document)?;
        Ok(())
    }

    /// Validate against a schema looked up by its public name.
    pub fn validate_named(&self, name: &str, document: &Value) -> Result<(), SchemaError> {
        let kind = SchemaKind::parse(name).ok_or_else(|| SchemaError::UnknownSchema {
            name: name.to_string(),
        })?;
        self.validate(kind, document)
    }

    pub fn cache(&self) -> &SchemaCache {
        &self.cache
    }
}

impl Default for SchemaRegistry {
    fn default() -> Self {
        Self::bundled()
    }
}

/// Validate the JSON file at `data` against the schema file at `schema`.
pub fn validate_file(schema: &Path, data: &Path) -> Result<(), SchemaError> {
    let schema = load_schema(schema)?;
    let document = load_json(data)?;
    schema.validate(&document)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::thread;

    fn write_schema(dir: &Path, kind: SchemaKind, schema: &Value) {
        fs::write(dir.join(kind.file_name()), schema.to_string()).expect("schema written");
    }

    #[test]
    fn cache_loads_once_and_reuses_the_entry() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("s.json");
        fs::write(&path, r#"{"type":"object"}"#).expect("schema written");

        let cache = SchemaCache::new();
        let first = cache.get_or_load(&path).expect("loads");
        fs::write(&path, r#"{"type":"array"}"#).expect("schema rewritten");
        let second = cache.get_or_load(&path).expect("cached");

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(*second.document(), json!({ "type": "object" }));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn concurrent_first_use_stores_one_entry() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("s.json");
        fs::write(&path, r#"{"type":"number"}"#).expect("schema written");

        let cache = Arc::new(SchemaCache::new());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let cache = Arc::clone(&cache);
                let path = path.clone();
                thread::spawn(move || cache.get_or_load(&path).expect("loads"))
            })
            .collect();
        let loaded: Vec<_> = handles
            .into_iter()
            .map(|handle| handle.join().expect("thread finished"))
            .collect();

        assert_eq!(cache.len(), 1);
        assert!(loaded.iter().all(|schema| Arc::ptr_eq(schema, &loaded[0])));
    }

    #[test]
    fn missing_schema_file_names_the_path() {
        let cache = SchemaCache::new();
        let error = cache
            .get_or_load(Path::new("/nonexistent/schema.json"))
            .expect_err("missing file");
        assert!(error.to_string().contains("/nonexistent/schema.json"));
        assert!(cache.is_empty());
    }

    #[test]
    fn registry_resolves_names_in_its_directory() {
        let dir = tempfile::tempdir().expect("tempdir");
        write_schema(dir.path(), SchemaKind::Input, &json!({ "required": ["scenario"] }));

        let registry = SchemaRegistry::new(dir.path());
        assert!(registry
            .validate_named("input", &json!({ "scenario": "swing" }))
            .is_ok());

        let error = registry
            .validate_named("input", &json!({}))
            .expect_err("missing scenario");
        assert!(error.is_violation());
        let message = error.to_string();
        assert!(message.starts_with("/: "), "{message}");
        assert!(message.contains("\"scenario\" is a required property"));

        let unknown = registry
            .validate_named("metrics", &json!({}))
            .expect_err("unknown name");
        assert!(matches!(unknown, SchemaError::UnknownSchema { .. }));
    }

    #[test]
    fn bundled_schemas_parse() {
        let registry = SchemaRegistry::bundled();
        for kind in SchemaKind::ALL {
            let schema = registry.schema(kind).expect("bundled schema loads");
            assert!(schema.document().is_object(), "{kind} schema is an object");
        }
        assert_eq!(registry.cache().len(), 2);
    }

    #[test]
    fn validate_file_reads_both_documents() {
        let dir = tempfile::tempdir().expect("tempdir");
        let schema = dir.path().join("schema.json");
        let data = dir.path().join("data.json");
        fs::write(&schema, r#"{"type":"object","required":["a"]}"#).expect("schema");
        fs::write(&data, r#"{"b":1}"#).expect("data");

        let error = validate_file(&schema, &data).expect_err("invalid document");
        assert!(error.is_violation());

        fs::write(&data, "not json").expect("data");
        let error = validate_file(&schema, &data).expect_err("unparseable");
        assert!(matches!(error, SchemaError::Parse { .. }));
    }

    #[test]
    fn looping_schema_is_a_definition_error_not_a_violation() {
        let dir = tempfile::tempdir().expect("tempdir");
        write_schema(
            dir.path(),
            SchemaKind::Input,
            &json!({ "allOf": [{ "$ref": "#" }] }),
        );

        let registry = SchemaRegistry::new(dir.path());
        let error = registry
            .validate(SchemaKind::Input, &json!({}))
            .expect_err("schema loops");
        assert!(!error.is_violation());
        assert!(matches!(
            error,
            SchemaError::Definition {
                source: SchemaDefinitionError::RefCycle(_),
                ..
            }
        ));
        assert!(error.to_string().contains("input_schema.json"));
        assert!(registry.cache().is_empty());
    }

    #[test]
    fn keywords_beyond_the_bundled_set_are_enforced() {
        let dir = tempfile::tempdir().expect("tempdir");
        write_schema(
            dir.path(),
            SchemaKind::Input,
            &json!({
                "properties": {
                    "scenario": { "type": "string", "maxLength": 5, "pattern": "^s" }
                }
            }),
        );

        let registry = SchemaRegistry::new(dir.path());
        assert!(registry
            .validate(SchemaKind::Input, &json!({ "scenario": "swing" }))
            .is_ok());
        let error = registry
            .validate(SchemaKind::Input, &json!({ "scenario": "intraday" }))
            .expect_err("too long and wrong prefix");
        match error {
            SchemaError::Invalid(found) => {
                assert_eq!(found.violations().len(), 2);
                assert!(found
                    .violations()
                    .iter()
                    .all(|violation| violation.pointer == "/scenario"));
            }
            other => panic!("expected violations, got {other:?}"),
        }
    }
}
