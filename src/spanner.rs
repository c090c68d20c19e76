use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use gcloud_gax::grpc::Code;
use gcloud_googleapis::spanner::admin::database::v1::{
    CreateDatabaseRequest, GetDatabaseDdlRequest, GetDatabaseRequest, UpdateDatabaseDdlRequest,
};
use gcloud_googleapis::spanner::admin::instance::v1::{
    CreateInstanceRequest, GetInstanceRequest, Instance,
};
use gcloud_spanner::admin::client::Client as AdminClient;
use gcloud_spanner::admin::AdminClientConfig;
use gcloud_spanner::client::{Client, ClientConfig, Error as SpannerError};
use gcloud_spanner::mutation::{insert, insert_or_update};
use gcloud_spanner::row::Row;
use gcloud_spanner::statement::Statement;
use serde_json::Value as JsonValue;
use std::sync::Arc;
use uuid::Uuid;

use crate::config::SpannerConfig;
use crate::store::{
    blob_id, validate_blob_id, BlobStore, ConfigDocument, DocumentFilter, DocumentStore,
    NewConfigDocument, StoreError, StoreResult, StoredValue,
};

const CONFIGS_TABLE: &str = "configs";
const BLOBS_TABLE: &str = "config_blobs";

const CONFIGS_DDL: &str = r#"
CREATE TABLE configs (
    id STRING(36) NOT NULL,
    config_type STRING(MAX) NOT NULL,
    name STRING(MAX) NOT NULL,
    value_json STRING(MAX),
    blob_id STRING(64),
    created TIMESTAMP NOT NULL,
    modified ARRAY<TIMESTAMP> NOT NULL,
    discarded BOOL NOT NULL,
) PRIMARY KEY (id)
"#;

const CONFIGS_INDEX_DDL: &str =
    "CREATE INDEX configs_by_key ON configs (config_type, name, discarded)";

const BLOBS_DDL: &str = r#"
CREATE TABLE config_blobs (
    id STRING(64) NOT NULL,
    content BYTES(MAX) NOT NULL,
) PRIMARY KEY (id)
"#;

const DOCUMENT_COLUMNS: &str =
    "id, config_type, name, value_json, blob_id, created, modified, discarded";

/// Shareable Spanner client for use across async handlers
///
/// Serves as both the [`DocumentStore`] (table `configs`) and the
/// [`BlobStore`] (table `config_blobs`).
#[derive(Clone)]
pub struct SpannerClient {
    inner: Arc<Client>,
}

impl SpannerClient {
    /// Create a new Spanner client from configuration
    ///
    /// The gcloud-spanner library automatically detects the
    /// SPANNER_EMULATOR_HOST environment variable and connects to
    /// the emulator when set, or production Spanner otherwise.
    ///
    /// This function also performs auto-provisioning: it will automatically
    /// create the instance, database, and tables if they don't exist.
    pub async fn from_config(config: &SpannerConfig) -> Result<Self> {
        auto_provision(config).await?;

        let database_path = config.database_path();

        match &config.emulator_host {
            Some(host) => tracing::info!("Connecting to Spanner emulator at: {}", host),
            None => tracing::info!("Connecting to production Spanner"),
        }

        let client = Client::new(&database_path, ClientConfig::default())
            .await
            .context("Failed to create Spanner client")?;

        tracing::info!(
            "Successfully connected to Spanner database: {}",
            database_path
        );

        Ok(Self {
            inner: Arc::new(client),
        })
    }

    async fn query_documents(
        &self,
        filter: &DocumentFilter,
        limit: Option<i64>,
    ) -> Result<Vec<ConfigDocument>> {
        let statement = select_statement(filter, limit);

        let mut tx = self.inner
            .single()
            .await
            .context("Failed to create read transaction")?;

        let mut result_set = tx
            .query(statement)
            .await
            .context("Failed to query configs from Spanner")?;

        let mut documents = Vec::new();
        while let Some(row) = result_set.next().await? {
            documents.push(document_from_row(&row)?);
        }
        Ok(documents)
    }

    async fn query_scalar(&self, sql: &str) -> Result<i64> {
        let mut tx = self.inner
            .single()
            .await
            .context("Failed to create read transaction")?;

        let mut result_set = tx
            .query(Statement::new(sql))
            .await
            .with_context(|| format!("Failed to execute query: {}", sql))?;

        match result_set.next().await? {
            Some(row) => Ok(row.column_by_name("total")?),
            None => Ok(0),
        }
    }
}

#[async_trait]
impl DocumentStore for SpannerClient {
    async fn find(&self, filter: &DocumentFilter) -> StoreResult<Vec<ConfigDocument>> {
        let documents = self.query_documents(filter, None).await?;
        tracing::debug!("Found {} documents matching {:?}", documents.len(), filter);
        Ok(documents)
    }

    async fn find_one(&self, filter: &DocumentFilter) -> StoreResult<Option<ConfigDocument>> {
        let mut documents = self.query_documents(filter, Some(1)).await?;
        Ok(documents.pop())
    }

    async fn insert(&self, doc: NewConfigDocument) -> StoreResult<String> {
        let id = Uuid::new_v4().to_string();
        let created = format_timestamp(&doc.created);
        let (value_json, blob_ref) = match &doc.value {
            StoredValue::Inline(value) => (
                Some(serde_json::to_string(value).context("Failed to serialize JSON value")?),
                None,
            ),
            StoredValue::Blob(blob) => (None, Some(blob.clone())),
        };

        let mutation = insert(
            CONFIGS_TABLE,
            &["id", "config_type", "name", "value_json", "blob_id", "created", "modified", "discarded"],
            &[
                &id,
                &doc.config_type,
                &doc.name,
                &value_json,
                &blob_ref,
                &created,
                &vec![created.clone()],
                &false,
            ],
        );

        match self.inner.apply(vec![mutation]).await {
            Ok(_) => {
                tracing::debug!("Inserted document with id: {}", id);
                Ok(id)
            }
            Err(SpannerError::GRPC(status)) if status.code() == Code::AlreadyExists => {
                Err(StoreError::DuplicateKey(id))
            }
            Err(err) => Err(anyhow::Error::new(err)
                .context("Failed to insert config into Spanner")
                .into()),
        }
    }

    async fn update(&self, id: &str, name: &str, discarded: bool) -> StoreResult<u64> {
        Uuid::parse_str(id).map_err(|_| StoreError::InvalidIdentifier(id.to_string()))?;

        let id = id.to_string();
        let name = name.to_string();

        let (_, affected) = self.inner
            .read_write_transaction(|tx| {
                let id = id.clone();
                let name = name.clone();
                Box::pin(async move {
                    let mut statement = Statement::new(
                        "UPDATE configs SET name = @name, discarded = @discarded, \
                         modified = ARRAY_CONCAT(modified, [CURRENT_TIMESTAMP()]) \
                         WHERE id = @id",
                    );
                    statement.add_param("name", &name);
                    statement.add_param("discarded", &discarded);
                    statement.add_param("id", &id);
                    let affected = tx.update(statement).await?;
                    Ok::<i64, SpannerError>(affected)
                })
            })
            .await
            .context("Failed to update config in Spanner")?;

        tracing::debug!("Updated document with id: {} ({} rows)", id, affected);
        Ok(affected.max(0) as u64)
    }

    async fn config_types(&self) -> StoreResult<Vec<String>> {
        let mut tx = self.inner
            .single()
            .await
            .context("Failed to create read transaction")?;

        let mut result_set = tx
            .query(Statement::new(
                "SELECT DISTINCT config_type FROM configs ORDER BY config_type",
            ))
            .await
            .context("Failed to query config types")?;

        let mut types = Vec::new();
        while let Some(row) = result_set.next().await.context("Failed to read config types")? {
            let config_type: String = row
                .column_by_name("config_type")
                .context("Failed to read config_type column")?;
            types.push(config_type);
        }
        Ok(types)
    }

    async fn count(&self) -> StoreResult<u64> {
        let count = self
            .query_scalar("SELECT COUNT(*) AS total FROM configs")
            .await?;
        Ok(count.max(0) as u64)
    }

    async fn data_size(&self) -> StoreResult<u64> {
        let size = self
            .query_scalar(
                "SELECT COALESCE(SUM(BYTE_LENGTH(id) + BYTE_LENGTH(config_type) + BYTE_LENGTH(name) \
                 + COALESCE(BYTE_LENGTH(value_json), 0) + COALESCE(BYTE_LENGTH(blob_id), 0)), 0) \
                 AS total FROM configs",
            )
            .await?;
        Ok(size.max(0) as u64)
    }

    /// Perform a health check by executing a simple query
    ///
    /// This method performs a lightweight query (SELECT 1) to verify
    /// that the database connection is alive and responsive.
    async fn health_check(&self) -> StoreResult<()> {
        let value = self.query_scalar("SELECT 1 AS total").await?;
        if value == 1 {
            tracing::debug!("Health check query succeeded");
            Ok(())
        } else {
            Err(anyhow::anyhow!("Health check query returned an unexpected result").into())
        }
    }
}

#[async_trait]
impl BlobStore for SpannerClient {
    async fn put(&self, content: Vec<u8>) -> StoreResult<String> {
        let id = blob_id(&content);

        // Same id implies same content, so overwriting is harmless
        let mutation = insert_or_update(BLOBS_TABLE, &["id", "content"], &[&id, &content]);

        self.inner
            .apply(vec![mutation])
            .await
            .context("Failed to store blob in Spanner")?;

        tracing::debug!("Stored blob with id: {} ({} bytes)", id, content.len());
        Ok(id)
    }

    async fn get(&self, id: &str) -> StoreResult<Vec<u8>> {
        validate_blob_id(id)?;

        let mut statement = Statement::new("SELECT content FROM config_blobs WHERE id = @id");
        statement.add_param("id", &id.to_string());

        let mut tx = self.inner
            .single()
            .await
            .context("Failed to create read transaction")?;

        let mut result_set = tx
            .query(statement)
            .await
            .context("Failed to query blob from Spanner")?;

        match result_set.next().await.context("Failed to read blob row")? {
            Some(row) => {
                let content: Vec<u8> = row
                    .column_by_name("content")
                    .context("Failed to read blob content")?;
                Ok(content)
            }
            None => Err(StoreError::BlobNotFound(id.to_string())),
        }
    }

    async fn data_size(&self) -> StoreResult<u64> {
        let size = self
            .query_scalar("SELECT COALESCE(SUM(BYTE_LENGTH(content)), 0) AS total FROM config_blobs")
            .await?;
        Ok(size.max(0) as u64)
    }
}

fn select_statement(filter: &DocumentFilter, limit: Option<i64>) -> Statement {
    let mut conditions = Vec::new();
    if filter.config_type.is_some() {
        conditions.push("config_type = @config_type");
    }
    if filter.name.is_some() {
        conditions.push("name = @name");
    }
    if filter.discarded.is_some() {
        conditions.push("discarded = @discarded");
    }

    let mut sql = format!("SELECT {} FROM configs", DOCUMENT_COLUMNS);
    if !conditions.is_empty() {
        sql.push_str(" WHERE ");
        sql.push_str(&conditions.join(" AND "));
    }
    if let Some(limit) = limit {
        sql.push_str(&format!(" LIMIT {}", limit));
    }

    let mut statement = Statement::new(&sql);
    if let Some(config_type) = &filter.config_type {
        statement.add_param("config_type", config_type);
    }
    if let Some(name) = &filter.name {
        statement.add_param("name", name);
    }
    if let Some(discarded) = &filter.discarded {
        statement.add_param("discarded", discarded);
    }
    statement
}

fn document_from_row(row: &Row) -> Result<ConfigDocument> {
    let value_json: Option<String> = row.column_by_name("value_json")?;
    let blob_ref: Option<String> = row.column_by_name("blob_id")?;

    let value = match (value_json, blob_ref) {
        (_, Some(blob)) => StoredValue::Blob(blob),
        (Some(json), None) => StoredValue::Inline(
            serde_json::from_str::<JsonValue>(&json).context("Failed to deserialize JSON value")?,
        ),
        (None, None) => StoredValue::Inline(JsonValue::Null),
    };

    // TIMESTAMP columns arrive as RFC3339 strings
    let created_str: String = row.column_by_name("created")?;
    let modified_strs: Vec<String> = row.column_by_name("modified")?;

    let modified = modified_strs
        .iter()
        .map(|ts| parse_timestamp(ts))
        .collect::<Result<Vec<_>>>()?;

    Ok(ConfigDocument {
        id: row.column_by_name("id")?,
        config_type: row.column_by_name("config_type")?,
        name: row.column_by_name("name")?,
        value,
        created: parse_timestamp(&created_str)?,
        modified,
        discarded: row.column_by_name("discarded")?,
    })
}

fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn parse_timestamp(ts: &str) -> Result<DateTime<Utc>> {
    Ok(DateTime::parse_from_rfc3339(ts)
        .with_context(|| format!("Failed to parse timestamp '{}'", ts))?
        .with_timezone(&Utc))
}

/// Automatically provision Spanner instance, database, and tables
///
/// This function checks if the configured resources exist and creates them if needed.
/// It's designed to enable zero-setup local development with the emulator.
async fn auto_provision(config: &SpannerConfig) -> Result<()> {
    tracing::info!("Starting auto-provisioning checks...");

    let admin_client = AdminClient::new(AdminClientConfig::default())
        .await
        .context("Failed to create Spanner admin client")?;

    let project_path = format!("projects/{}", config.project);
    let instance_path = format!("{}/instances/{}", project_path, config.instance);
    let database_path = config.database_path();

    ensure_instance_exists(&admin_client, config, &project_path, &instance_path).await?;
    ensure_database_exists(&admin_client, &instance_path, &database_path).await?;
    ensure_schema_exists(&admin_client, &database_path).await?;

    tracing::info!("Auto-provisioning complete");
    Ok(())
}

/// Ensure the Spanner instance exists, creating it if necessary
async fn ensure_instance_exists(
    admin_client: &AdminClient,
    config: &SpannerConfig,
    project_path: &str,
    instance_path: &str,
) -> Result<()> {
    let get_request = GetInstanceRequest {
        name: instance_path.to_string(),
        field_mask: None,
    };

    match admin_client.instance().get_instance(get_request, None).await {
        Ok(_) => {
            tracing::info!("Instance already exists: {}", instance_path);
            Ok(())
        }
        Err(status) if status.code() == Code::NotFound => {
            tracing::info!("Instance not found, creating: {}", instance_path);

            let instance_config = if config.emulator_host.is_some() {
                format!("{}/instanceConfigs/emulator-config", project_path)
            } else {
                format!("{}/instanceConfigs/regional-us-central1", project_path)
            };

            let create_request = CreateInstanceRequest {
                parent: project_path.to_string(),
                instance_id: config.instance.clone(),
                instance: Some(Instance {
                    name: instance_path.to_string(),
                    config: instance_config,
                    display_name: format!("{} instance", config.instance),
                    node_count: 1,
                    ..Default::default()
                }),
            };

            let mut operation = admin_client
                .instance()
                .create_instance(create_request, None)
                .await
                .context("Failed to start instance creation")?;

            operation
                .wait(None)
                .await
                .context("Failed to create instance")?;

            tracing::info!("Instance created successfully: {}", instance_path);
            Ok(())
        }
        Err(e) => Err(anyhow::anyhow!(
            "Failed to check instance existence: {}",
            e.message()
        )),
    }
}

/// Ensure the Spanner database exists, creating it if necessary
async fn ensure_database_exists(
    admin_client: &AdminClient,
    instance_path: &str,
    database_path: &str,
) -> Result<()> {
    let get_request = GetDatabaseRequest {
        name: database_path.to_string(),
    };

    match admin_client
        .database()
        .get_database(get_request, None)
        .await
    {
        Ok(_) => {
            tracing::info!("Database already exists: {}", database_path);
            Ok(())
        }
        Err(status) if status.code() == Code::NotFound => {
            tracing::info!("Database not found, creating: {}", database_path);

            let database_id = database_path
                .split('/')
                .next_back()
                .context("Invalid database path")?;

            let create_request = CreateDatabaseRequest {
                parent: instance_path.to_string(),
                create_statement: format!("CREATE DATABASE `{}`", database_id),
                extra_statements: vec![],
                encryption_config: None,
                database_dialect: 1, // Google Standard SQL
                proto_descriptors: vec![],
            };

            let mut operation = admin_client
                .database()
                .create_database(create_request, None)
                .await
                .context("Failed to start database creation")?;

            operation
                .wait(None)
                .await
                .context("Failed to create database")?;

            tracing::info!("Database created successfully: {}", database_path);
            Ok(())
        }
        Err(e) => Err(anyhow::anyhow!(
            "Failed to check database existence: {}",
            e.message()
        )),
    }
}

/// DDL statements still missing from `existing`, in creation order
fn missing_schema_statements(existing: &[String]) -> Vec<String> {
    let defined = |needle: &str| existing.iter().any(|stmt| stmt.contains(needle));

    let mut statements = Vec::new();
    if !defined("CREATE TABLE configs") && !defined("CREATE TABLE `configs`") {
        statements.push(CONFIGS_DDL.trim().to_string());
    }
    if !defined("configs_by_key") {
        statements.push(CONFIGS_INDEX_DDL.to_string());
    }
    if !defined("CREATE TABLE config_blobs") && !defined("CREATE TABLE `config_blobs`") {
        statements.push(BLOBS_DDL.trim().to_string());
    }
    statements
}

/// Ensure the configs and config_blobs tables exist, creating them if necessary
async fn ensure_schema_exists(admin_client: &AdminClient, database_path: &str) -> Result<()> {
    let get_ddl_request = GetDatabaseDdlRequest {
        database: database_path.to_string(),
    };

    let ddl_response = admin_client
        .database()
        .get_database_ddl(get_ddl_request, None)
        .await
        .context("Failed to get database DDL")?;

    let statements = missing_schema_statements(&ddl_response.into_inner().statements);

    if statements.is_empty() {
        tracing::info!("Tables '{}' and '{}' already exist", CONFIGS_TABLE, BLOBS_TABLE);
        return Ok(());
    }

    tracing::info!("Applying {} schema statement(s)...", statements.len());

    let update_request = UpdateDatabaseDdlRequest {
        database: database_path.to_string(),
        statements,
        operation_id: String::new(),
        proto_descriptors: vec![],
        throughput_mode: false,
    };

    let mut operation = admin_client
        .database()
        .update_database_ddl(update_request, None)
        .await
        .context("Failed to start schema creation")?;

    operation
        .wait(None)
        .await
        .context("Failed to create schema")?;

    tracing::info!("Schema created successfully");
    Ok(())
}
