//! Entity tables: schema-driven DDL, reference loading and the SQLite sink

use std::collections::HashMap;
use std::str::FromStr;

use anyhow::{Context, Result, bail};
use async_trait::async_trait;
use sqlx::query::Query;
use sqlx::sqlite::{Sqlite, SqliteArguments, SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{SqliteConnection, SqlitePool, Transaction};

use crate::reference::{MemoryReferences, label_field};
use crate::schema::{
    EntitySchema, FieldKind, ScalarType, SchemaRegistry, describe_fields, exportable_fields,
    navigation_target,
};
use crate::sink::PersistenceSink;
use crate::types::{Record, Value};

/// Open a pool on the configured database, creating the file if needed
pub async fn connect(database_url: &str) -> Result<SqlitePool> {
    let options = SqliteConnectOptions::from_str(database_url)
        .with_context(|| format!("Invalid database URL: {}", database_url))?
        .create_if_missing(true)
        .foreign_keys(true);

    if let Some(dir) = options.get_filename().parent() {
        if !dir.as_os_str().is_empty() && !dir.exists() {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create database directory: {}", dir.display()))?;
        }
    }

    // In-memory databases live and die with their single connection
    let pool = if database_url.contains(":memory:") {
        SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
    } else {
        SqlitePoolOptions::new().max_connections(4)
    };

    pool.connect_with(options)
        .await
        .with_context(|| format!("Failed to open database: {}", database_url))
}

/// Quote an identifier, refusing names that would need escaping
fn quote(ident: &str) -> Result<String> {
    if ident.is_empty() || ident.contains('"') || ident.contains('\0') {
        bail!("Unsupported identifier: {:?}", ident);
    }
    Ok(format!("\"{}\"", ident))
}

fn column_type(scalar: Option<ScalarType>) -> &'static str {
    match scalar {
        Some(ScalarType::Integer) | Some(ScalarType::Boolean) => "INTEGER",
        Some(ScalarType::Text) | Some(ScalarType::Date) | None => "TEXT",
    }
}

/// CREATE TABLE statement for one entity
fn create_table_sql(registry: &SchemaRegistry, schema: &EntitySchema) -> Result<String> {
    let descriptors = describe_fields(schema);
    let mut columns = vec!["\"id\" INTEGER PRIMARY KEY AUTOINCREMENT".to_string()];

    for field in exportable_fields(&descriptors) {
        let mut column = format!("{} {}", quote(&field.name)?, column_type(field.scalar_type));
        if field.required {
            column.push_str(" NOT NULL");
        }
        if field.kind == FieldKind::ForeignKey {
            let target = navigation_target(schema, &descriptors, field)?;
            match registry.get(target) {
                Ok(target) => {
                    column.push_str(&format!(" REFERENCES {}(\"id\")", quote(&target.table_name())?))
                }
                Err(_) => log::warn!(
                    "'{}.{}' references unregistered entity '{}'",
                    schema.name,
                    field.name,
                    target
                ),
            }
        }
        columns.push(column);
    }

    Ok(format!(
        "CREATE TABLE IF NOT EXISTS {} ({})",
        quote(&schema.table_name())?,
        columns.join(", ")
    ))
}

/// Create a table for every registered entity that lacks one
pub async fn ensure_tables(pool: &SqlitePool, registry: &SchemaRegistry) -> Result<()> {
    for schema in registry.entities() {
        let sql = create_table_sql(registry, schema)?;
        log::debug!("{}", sql);
        sqlx::query(&sql)
            .execute(pool)
            .await
            .with_context(|| format!("Failed to create table for '{}'", schema.name))?;
    }
    log::info!("Ensured {} entity table(s)", registry.len());
    Ok(())
}

/// Read the primary key and label of every stored instance
///
/// Entities without a usable label field are skipped; they can still be
/// imported but never appear in a pick-list.
pub async fn load_references(
    pool: &SqlitePool,
    registry: &SchemaRegistry,
) -> Result<MemoryReferences> {
    let mut references = MemoryReferences::new();

    for schema in registry.entities() {
        let label = match label_field(schema) {
            Ok(label) => label,
            Err(e) => {
                log::debug!("Skipping reference data: {}", e);
                continue;
            }
        };
        let descriptors = describe_fields(schema);
        if !exportable_fields(&descriptors).iter().any(|f| f.name == label) {
            log::warn!(
                "Label field '{}.{}' is not stored; '{}' has no reference data",
                schema.name,
                label,
                schema.name
            );
            continue;
        }

        let sql = format!(
            "SELECT \"id\", CAST({} AS TEXT) FROM {} ORDER BY \"id\"",
            quote(label)?,
            quote(&schema.table_name())?
        );
        let rows: Vec<(i64, Option<String>)> = sqlx::query_as(&sql)
            .fetch_all(pool)
            .await
            .with_context(|| format!("Failed to load instances of '{}'", schema.name))?;

        log::debug!("Loaded {} '{}' instance(s)", rows.len(), schema.name);
        for (id, text) in rows {
            references.insert(&schema.name, id, [(label, text.unwrap_or_default())]);
        }
    }

    Ok(references)
}

fn bind_value<'q>(
    query: Query<'q, Sqlite, SqliteArguments<'q>>,
    value: &Value,
) -> Query<'q, Sqlite, SqliteArguments<'q>> {
    match value {
        Value::Null => query.bind(None::<String>),
        Value::Text(s) => query.bind(s.clone()),
        Value::Int(n) => query.bind(*n),
        Value::Bool(b) => query.bind(*b),
        Value::Date(d) => query.bind(*d),
    }
}

/// Insert one batch of records through an open transaction
async fn insert_records(
    conn: &mut SqliteConnection,
    table: &str,
    entity: &str,
    records: &[Record],
) -> Result<()> {
    for record in records {
        let (names, values): (Vec<&str>, Vec<&Value>) = record.fields().unzip();
        let columns = names
            .iter()
            .map(|n| quote(n))
            .collect::<Result<Vec<_>>>()?;
        let sql = if columns.is_empty() {
            format!("INSERT INTO {} DEFAULT VALUES", table)
        } else {
            format!(
                "INSERT INTO {} ({}) VALUES ({})",
                table,
                columns.join(", "),
                vec!["?"; columns.len()].join(", ")
            )
        };

        let mut query = sqlx::query(&sql);
        for value in values {
            query = bind_value(query, value);
        }
        query
            .execute(&mut *conn)
            .await
            .with_context(|| format!("Failed to insert '{}' record", entity))?;
    }
    Ok(())
}

/// Persistence sink writing records into entity tables inside one transaction
///
/// The transaction opens on the first `add_many` and closes on `commit`.
/// Dropping the sink before `commit` rolls everything back. A failed insert
/// or commit discards every batch staged since the last commit and leaves
/// the sink failed: `add_many` and `commit` return errors until `reset`.
pub struct SqliteSink {
    pool: SqlitePool,
    tables: HashMap<String, String>,
    tx: Option<Transaction<'static, Sqlite>>,
    failed: bool,
}

impl SqliteSink {
    pub fn new(pool: SqlitePool, registry: &SchemaRegistry) -> Self {
        let tables = registry
            .entities()
            .map(|s| (s.name.to_lowercase(), s.table_name()))
            .collect();
        Self {
            pool,
            tables,
            tx: None,
            failed: false,
        }
    }

    /// Whether staged work was lost and the sink needs a `reset`
    pub fn is_failed(&self) -> bool {
        self.failed
    }

    /// Drop any staged work and make the sink usable again
    pub fn reset(&mut self) {
        self.tx = None;
        self.failed = false;
    }

    fn table(&self, entity: &str) -> Result<&str> {
        self.tables
            .get(&entity.to_lowercase())
            .map(|t| t.as_str())
            .with_context(|| format!("No table for entity '{}'", entity))
    }

    fn ensure_usable(&self) -> Result<()> {
        if self.failed {
            bail!("An earlier batch failed and staged records were rolled back; reset the sink");
        }
        Ok(())
    }
}

#[async_trait]
impl PersistenceSink for SqliteSink {
    async fn add_many(&mut self, entity: &str, records: Vec<Record>) -> Result<()> {
        self.ensure_usable()?;
        let table = quote(self.table(entity)?)?;

        let mut tx = match self.tx.take() {
            Some(tx) => tx,
            None => self
                .pool
                .begin()
                .await
                .context("Failed to begin transaction")?,
        };

        if let Err(e) = insert_records(&mut *tx, &table, entity, &records).await {
            // dropping the transaction rolls back earlier batches too
            self.failed = true;
            return Err(e);
        }

        log::debug!("Staged {} '{}' record(s)", records.len(), entity);
        self.tx = Some(tx);
        Ok(())
    }

    async fn commit(&mut self) -> Result<()> {
        self.ensure_usable()?;
        if let Some(tx) = self.tx.take() {
            if let Err(e) = tx.commit().await {
                self.failed = true;
                return Err(e).context("Failed to commit transaction");
            }
        }
        Ok(())
    }
}
