use std::sync::{Arc, Mutex};

use serde_json::Value;

use super::ModelSource;
use crate::error::{ModelError, ModelResult};
use crate::model::{Instance, ModelType};

/// In-process source keeping raw records in insertion order.
///
/// Useful for prototypes and tests. Records saved without an `id` get the
/// next numeric id.
pub struct MemorySource {
    model: Arc<ModelType>,
    records: Mutex<Vec<Value>>,
}

impl MemorySource {
    pub fn new(model: Arc<ModelType>) -> Self {
        Self {
            model,
            records: Mutex::new(Vec::new()),
        }
    }

    /// Seeds the source with raw records. Records are not validated until
    /// they are fetched.
    pub fn with_records(model: Arc<ModelType>, records: Vec<Value>) -> Self {
        Self {
            model,
            records: Mutex::new(records),
        }
    }

    /// Replaces the stored raw record with the same id, or appends it.
    pub fn put(&self, record: Value) {
        let mut records = self.records.lock().expect("record lock poisoned");
        Self::upsert(&mut records, record);
    }

    fn upsert(records: &mut Vec<Value>, record: Value) {
        let id = record.get("id").cloned();
        match id.and_then(|id| records.iter().position(|r| r.get("id") == Some(&id))) {
            Some(pos) => records[pos] = record,
            None => records.push(record),
        }
    }

    pub fn len(&self) -> usize {
        self.records.lock().expect("record lock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn next_id(records: &[Value]) -> Value {
        let max = records
            .iter()
            .filter_map(|r| r.get("id").and_then(Value::as_u64))
            .max()
            .unwrap_or(0);
        Value::from(max + 1)
    }
}

impl ModelSource for MemorySource {
    fn model(&self) -> &Arc<ModelType> {
        &self.model
    }

    async fn fetch_raw(&self, id: &Value) -> ModelResult<Value> {
        let records = self.records.lock().expect("record lock poisoned");
        records
            .iter()
            .find(|r| r.get("id") == Some(id))
            .cloned()
            .ok_or_else(|| {
                ModelError::invalid_argument(format!(
                    "no '{}' record with id {}",
                    self.model.name(),
                    id
                ))
            })
    }

    async fn fetch_collection_raw(&self) -> ModelResult<Value> {
        let records = self.records.lock().expect("record lock poisoned");
        Ok(Value::Array(records.clone()))
    }

    async fn save(&self, instance: &Instance) -> ModelResult<Instance> {
        let mut saved = instance.clone();
        // One guard covers id assignment and the insert.
        let mut records = self.records.lock().expect("record lock poisoned");
        if instance.id().is_none() {
            saved.set_value("id", &Self::next_id(&records))?;
        }
        Self::upsert(&mut records, saved.to_stored_value());
        Ok(saved)
    }

    async fn delete(&self, instance: &Instance) -> ModelResult<()> {
        let id = instance
            .id()
            .ok_or_else(|| ModelError::invalid_argument("cannot delete a record without an id"))?;
        let mut records = self.records.lock().expect("record lock poisoned");
        let before = records.len();
        records.retain(|r| r.get("id") != Some(id));
        if records.len() == before {
            return Err(ModelError::invalid_argument(format!(
                "no '{}' record with id {}",
                self.model.name(),
                id
            )));
        }
        Ok(())
    }
}
