//! In-memory registry of [`super::Schema`] values.
//!
//! Modeled on the teacher crate's `KvStoresRegistry`: a single
//! `parking_lot::RwLock` over a map, shared freely by readers and taken
//! exclusively only for register/delete (spec.md I4). Once registered a
//! schema is immutable and handed out as an `Arc`, so a reader's view is
//! consistent for the lifetime of one translation even if another thread
//! concurrently deletes the name from the map.

use super::Schema;
use crate::error::SchemaErrorKind;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;

#[derive(Clone, Default)]
pub struct SchemaRegistry {
    inner: Arc<RwLock<HashMap<String, Arc<Schema>>>>,
}

impl SchemaRegistry {
    pub fn new() -> Self {
        Self { inner: Arc::new(RwLock::new(HashMap::new())) }
    }

    /// Register a new schema. Fails with `SchemaExists` if the name is
    /// already taken, or `InvalidSchema` if [`Schema::validate`] rejects it.
    pub fn register(&self, schema: Schema) -> Result<(), SchemaErrorKind> {
        schema.validate()?;
        let mut guard = self.inner.write();
        if guard.contains_key(&schema.name) {
            return Err(SchemaErrorKind::SchemaExists(schema.name.clone()));
        }
        guard.insert(schema.name.clone(), Arc::new(schema));
        Ok(())
    }

    /// Replace an existing schema, or insert it if absent. Used by tests and
    /// admin tooling that want upsert semantics without racing `register`.
    pub fn put(&self, schema: Schema) -> Result<(), SchemaErrorKind> {
        schema.validate()?;
        let mut guard = self.inner.write();
        guard.insert(schema.name.clone(), Arc::new(schema));
        Ok(())
    }

    pub fn get(&self, name: &str) -> Result<Arc<Schema>, SchemaErrorKind> {
        self.inner
            .read()
            .get(name)
            .cloned()
            .ok_or_else(|| SchemaErrorKind::SchemaNotFound(name.to_string()))
    }

    pub fn delete(&self, name: &str) -> Result<(), SchemaErrorKind> {
        let mut guard = self.inner.write();
        guard
            .remove(name)
            .map(|_| ())
            .ok_or_else(|| SchemaErrorKind::SchemaNotFound(name.to_string()))
    }

    /// Snapshot of all currently registered schema names.
    pub fn list(&self) -> Vec<String> {
        self.inner.read().keys().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{Field, FieldType};

    fn one_field_schema(name: &str) -> Schema {
        Schema::new(name, vec![Field::new("a", FieldType::Text)])
    }

    #[test]
    fn register_get_delete_roundtrip() {
        let reg = SchemaRegistry::new();
        reg.register(one_field_schema("products")).unwrap();
        assert_eq!(reg.list(), vec!["products".to_string()]);
        let got = reg.get("products").unwrap();
        assert_eq!(got.name, "products");
        reg.delete("products").unwrap();
        assert!(matches!(reg.get("products"), Err(SchemaErrorKind::SchemaNotFound(_))));
    }

    #[test]
    fn register_rejects_duplicate_name() {
        let reg = SchemaRegistry::new();
        reg.register(one_field_schema("products")).unwrap();
        let err = reg.register(one_field_schema("products")).unwrap_err();
        assert!(matches!(err, SchemaErrorKind::SchemaExists(_)));
    }

    #[test]
    fn register_rejects_invalid_schema() {
        let reg = SchemaRegistry::new();
        let empty = Schema::new("empty", vec![]);
        assert!(matches!(reg.register(empty), Err(SchemaErrorKind::InvalidSchema(_))));
    }

    #[test]
    fn delete_missing_reports_not_found() {
        let reg = SchemaRegistry::new();
        assert!(matches!(reg.delete("missing"), Err(SchemaErrorKind::SchemaNotFound(_))));
    }

    #[test]
    fn concurrent_readers_see_consistent_snapshot() {
        use std::thread;
        let reg = SchemaRegistry::new();
        reg.register(one_field_schema("s")).unwrap();
        let reg2 = reg.clone();
        let handle = thread::spawn(move || {
            for _ in 0..100 {
                let _ = reg2.get("s");
            }
        });
        for _ in 0..100 {
            let _ = reg.list();
        }
        handle.join().unwrap();
    }
}
