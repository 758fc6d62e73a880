//! In-memory reference data source

use std::collections::HashMap;

use anyhow::Result;

use super::{ReferenceRow, ReferenceSource};
use crate::schema::EntitySchema;

/// Stored instance: primary key plus textual field values
#[derive(Debug, Clone, Default)]
struct Instance {
    id: i64,
    fields: HashMap<String, String>,
}

/// Reference data held in memory, keyed by case-insensitive entity name
#[derive(Debug, Clone, Default)]
pub struct MemoryReferences {
    entities: HashMap<String, Vec<Instance>>,
}

impl MemoryReferences {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an instance with the given field values
    pub fn insert<I, K, V>(&mut self, entity: &str, id: i64, fields: I)
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let fields = fields
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        self.entities
            .entry(entity.to_lowercase())
            .or_default()
            .push(Instance { id, fields });
    }

    /// Number of instances stored for an entity
    pub fn count(&self, entity: &str) -> usize {
        self.entities
            .get(&entity.to_lowercase())
            .map(|v| v.len())
            .unwrap_or(0)
    }
}

impl ReferenceSource for MemoryReferences {
    fn instances(&self, entity: &EntitySchema, label_field: &str) -> Result<Vec<ReferenceRow>> {
        let Some(instances) = self.entities.get(&entity.name.to_lowercase()) else {
            log::warn!("No reference data for entity '{}'", entity.name);
            return Ok(Vec::new());
        };

        Ok(instances
            .iter()
            .map(|i| ReferenceRow {
                id: i.id,
                label: i.fields.get(label_field).cloned().unwrap_or_default(),
            })
            .collect())
    }
}
