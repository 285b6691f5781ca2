use crate::domain::task::driven_ports::{TaskReader, TaskWriter};
use crate::domain::task::{NewTaskRecord, Priority, TASK_COLLECTION, Task, normalize_due_date};
use crate::external_connections::ExternalConnectivity;
use anyhow::{Context, Error, anyhow};
use chrono::{DateTime, SecondsFormat, Utc};
use serde::Deserialize;
use serde_json::{Value, json};
use std::collections::HashMap;
use tracing::warn;

/// Task documents in a Firestore database, reached through the REST API
pub struct FirestoreTaskStore {
    documents_url: String,
}

impl FirestoreTaskStore {
    pub fn new(base_url: &str, project_id: &str) -> Self {
        FirestoreTaskStore {
            documents_url: format!(
                "{}/v1/projects/{project_id}/databases/(default)/documents",
                super::trim_base(base_url)
            ),
        }
    }
}

#[derive(Deserialize)]
struct FirestoreDocument {
    name: String,
    #[serde(default)]
    fields: HashMap<String, Value>,
    #[serde(rename = "createTime")]
    create_time: Option<DateTime<Utc>>,
}

#[derive(Deserialize)]
struct RunQueryRow {
    document: Option<FirestoreDocument>,
}

fn timestamp_value(timestamp: &DateTime<Utc>) -> Value {
    json!({ "timestampValue": timestamp.to_rfc3339_opts(SecondsFormat::Millis, true) })
}

fn string_value(value: &str) -> Value {
    json!({ "stringValue": value })
}

fn encode_fields(record: &NewTaskRecord) -> Value {
    json!({
        "title": string_value(&record.title),
        "description": string_value(&record.description),
        "priority": string_value(record.priority.as_str()),
        "dueDate": timestamp_value(&record.due_date),
        "imageUrl": string_value(&record.image_url),
        "userId": string_value(&record.user_id),
        "createdAt": timestamp_value(&record.created_at),
    })
}

fn text_field(fields: &HashMap<String, Value>, key: &str) -> String {
    fields
        .get(key)
        .and_then(|value| value.get("stringValue"))
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_owned()
}

/// Reads a timestamp field, accepting date labels written as plain strings by older clients
fn time_field(fields: &HashMap<String, Value>, key: &str) -> Option<DateTime<Utc>> {
    let value = fields.get(key)?;
    if let Some(timestamp) = value.get("timestampValue").and_then(Value::as_str) {
        return DateTime::parse_from_rfc3339(timestamp)
            .ok()
            .map(|parsed| parsed.with_timezone(&Utc));
    }

    value
        .get("stringValue")
        .and_then(Value::as_str)
        .and_then(|label| normalize_due_date(label).ok())
}

fn document_id(name: &str) -> &str {
    name.rsplit('/').next().unwrap_or(name)
}

impl From<FirestoreDocument> for Task {
    fn from(document: FirestoreDocument) -> Self {
        let fields = &document.fields;
        let priority = match fields.get("priority") {
            None => None,
            Some(_) => text_field(fields, "priority").parse::<Priority>().ok(),
        };

        Task {
            id: document_id(&document.name).to_owned(),
            title: text_field(fields, "title"),
            description: text_field(fields, "description"),
            priority,
            due_date: time_field(fields, "dueDate"),
            image_url: text_field(fields, "imageUrl"),
            user_id: text_field(fields, "userId"),
            created_at: time_field(fields, "createdAt")
                .or(document.create_time)
                .unwrap_or_default(),
        }
    }
}

impl TaskReader for FirestoreTaskStore {
    async fn tasks_for_owner(
        &self,
        owner_uid: &str,
        ext_cxn: &mut impl ExternalConnectivity,
    ) -> Result<Vec<Task>, Error> {
        let query = json!({
            "structuredQuery": {
                "from": [{ "collectionId": TASK_COLLECTION }],
                "where": {
                    "fieldFilter": {
                        "field": { "fieldPath": "userId" },
                        "op": "EQUAL",
                        "value": string_value(owner_uid),
                    }
                }
            }
        });
        let request = ext_cxn
            .http_client()
            .post(format!("{}:runQuery", self.documents_url))
            .json(&query);

        let response = super::with_credential(request, &*ext_cxn)
            .send()
            .await
            .context("querying tasks for an owner")?;
        let rows: Vec<RunQueryRow> = super::success_or_error(response)
            .await
            .context("querying tasks for an owner")?
            .json()
            .await
            .context("decoding task query results")?;

        let tasks = rows
            .into_iter()
            .filter_map(|row| row.document)
            .map(Task::from)
            .collect();

        Ok(tasks)
    }
}

impl TaskWriter for FirestoreTaskStore {
    async fn create_task(
        &self,
        record: &NewTaskRecord,
        ext_cxn: &mut impl ExternalConnectivity,
    ) -> Result<String, Error> {
        let request = ext_cxn
            .http_client()
            .post(format!("{}/{TASK_COLLECTION}", self.documents_url))
            .json(&json!({ "fields": encode_fields(record) }));

        let response = super::with_credential(request, &*ext_cxn)
            .send()
            .await
            .context("creating a task document")?;
        let created: FirestoreDocument = super::success_or_error(response)
            .await
            .context("creating a task document")?
            .json()
            .await
            .context("decoding the created task document")?;

        let task_id = document_id(&created.name);
        if task_id.is_empty() {
            warn!("Document store returned a document with no name: {}", created.name);
            return Err(anyhow!("the document store did not assign an ID to the task"));
        }

        Ok(task_id.to_owned())
    }
}
