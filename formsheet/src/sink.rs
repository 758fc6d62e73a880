//! Persistence sink for accepted records

use std::collections::HashMap;

use anyhow::Result;
use async_trait::async_trait;

use crate::types::Record;

/// Receives validated records and commits them as one batch
#[async_trait]
pub trait PersistenceSink: Send {
    /// Stage records of one entity type
    async fn add_many(&mut self, entity: &str, records: Vec<Record>) -> Result<()>;

    /// Commit everything staged since the last commit
    async fn commit(&mut self) -> Result<()>;
}

/// Sink keeping committed records in memory
#[derive(Debug, Default)]
pub struct MemorySink {
    staged: Vec<(String, Record)>,
    committed: HashMap<String, Vec<Record>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records committed for an entity
    pub fn committed(&self, entity: &str) -> &[Record] {
        self.committed
            .get(entity)
            .map(|v| v.as_slice())
            .unwrap_or(&[])
    }

    pub fn staged_count(&self) -> usize {
        self.staged.len()
    }
}

#[async_trait]
impl PersistenceSink for MemorySink {
    async fn add_many(&mut self, entity: &str, records: Vec<Record>) -> Result<()> {
        self.staged
            .extend(records.into_iter().map(|r| (entity.to_string(), r)));
        Ok(())
    }

    async fn commit(&mut self) -> Result<()> {
        for (entity, record) in self.staged.drain(..) {
            self.committed.entry(entity).or_default().push(record);
        }
        Ok(())
    }
}
