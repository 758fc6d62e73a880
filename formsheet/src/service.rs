//! Export/import facade over the schema registry and the collaborators

use anyhow::Result;

use crate::error::PersistenceError;
use crate::excel::{
    ImportOptions, ImportOutcome, ImportReport, ImportValidator, TemplateGenerator,
    TemplateLayout,
};
use crate::reference::ReferenceSource;
use crate::schema::SchemaRegistry;
use crate::sink::PersistenceSink;
use crate::types::Record;
use crate::upload::{Download, Upload, check_upload};
use crate::validation::CoercionRules;

/// Caller-visible result of an import request
#[derive(Debug)]
pub enum ImportResponse {
    /// All rows were valid and have been committed
    Success {
        committed: usize,
        report: ImportReport,
    },
    /// Nothing was committed; the annotated workbook should be re-downloaded
    Annotated {
        download: Download,
        report: ImportReport,
    },
}

/// Everything an export or import call needs, owned in one place.
///
/// Each call plans its template from the registry and the reference source
/// as they are at call time; nothing is cached between calls.
pub struct Workbench {
    registry: SchemaRegistry,
    references: Box<dyn ReferenceSource + Send + Sync>,
    layout: TemplateLayout,
    rules: CoercionRules,
}

impl Workbench {
    pub fn new<R>(registry: SchemaRegistry, references: R) -> Self
    where
        R: ReferenceSource + Send + Sync + 'static,
    {
        Workbench {
            registry,
            references: Box::new(references),
            layout: TemplateLayout::default(),
            rules: CoercionRules::default(),
        }
    }

    pub fn with_layout(mut self, layout: TemplateLayout) -> Self {
        self.layout = layout;
        self
    }

    pub fn with_rules(mut self, rules: CoercionRules) -> Self {
        self.rules = rules;
        self
    }

    /// Replace the reference data, e.g. after reloading it from storage
    pub fn set_references<R>(&mut self, references: R)
    where
        R: ReferenceSource + Send + Sync + 'static,
    {
        self.references = Box::new(references);
    }

    pub fn registry(&self) -> &SchemaRegistry {
        &self.registry
    }

    /// Generate the fillable template for an entity
    pub fn export(&self, entity: &str) -> Result<Download> {
        let schema = self.registry.get(entity)?;
        let bytes = TemplateGenerator::new(&self.registry, self.references.as_ref(), self.layout)
            .export(&schema.name)?;
        Ok(Download::workbook(&schema.name, bytes))
    }

    /// Check and validate an uploaded workbook without persisting anything
    pub fn import(
        &self,
        upload: Option<&Upload>,
        entity: &str,
        options: ImportOptions,
    ) -> Result<ImportOutcome> {
        let upload = check_upload(upload)?;
        log::debug!(
            "Importing '{}' ({} bytes) as '{}'",
            upload.filename,
            upload.content.len(),
            entity
        );
        ImportValidator::new(
            &self.registry,
            self.references.as_ref(),
            self.layout,
            &self.rules,
        )
        .import(&upload.content, entity, options)
    }

    /// Validate an upload and, if every row is valid, commit the records
    pub async fn import_and_commit(
        &self,
        upload: Option<&Upload>,
        entity: &str,
        options: ImportOptions,
        sink: &mut dyn PersistenceSink,
    ) -> Result<ImportResponse> {
        match self.import(upload, entity, options)? {
            ImportOutcome::Accepted { records, report } => {
                let committed = commit_records(sink, &report.entity, records).await?;
                Ok(ImportResponse::Success { committed, report })
            }
            ImportOutcome::Rejected { workbook, report } => Ok(ImportResponse::Annotated {
                download: Download::workbook(&report.entity, workbook),
                report,
            }),
        }
    }
}

/// Hand a validated batch to the sink and commit it
pub async fn commit_records(
    sink: &mut dyn PersistenceSink,
    entity: &str,
    records: Vec<Record>,
) -> Result<usize, PersistenceError> {
    let count = records.len();
    let wrap = |source| PersistenceError {
        entity: entity.to_string(),
        source,
    };

    sink.add_many(entity, records).await.map_err(wrap)?;
    sink.commit().await.map_err(wrap)?;

    log::info!("Committed {} '{}' record(s)", count, entity);
    Ok(count)
}
