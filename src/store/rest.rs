use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response};
use serde_json::Value;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::types::{Task, TaskPatch};

use super::{StoreConfig, StoreError, TaskStore};

const RETURN_REPRESENTATION: &str = "return=representation";

/// PostgREST client for the task table.
#[derive(Debug, Clone)]
pub struct RestTaskStore {
    client: Client,
    config: StoreConfig,
    endpoint: String,
}

impl RestTaskStore {
    pub fn new(config: StoreConfig) -> Result<Self, StoreError> {
        let client = Client::builder()
            .timeout(config.request_timeout)
            .build()?;
        Ok(Self {
            endpoint: config.rest_endpoint(),
            client,
            config,
        })
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        request
            .header("apikey", &self.config.anon_key)
            .header(
                reqwest::header::AUTHORIZATION,
                format!("Bearer {}", self.config.anon_key),
            )
            .header(reqwest::header::ACCEPT, "application/json")
    }

    fn row_url(&self, id: Uuid) -> String {
        format!(
            "{}?id=eq.{}",
            self.endpoint,
            urlencoding::encode(&id.to_string())
        )
    }

    async fn rows(&self, request: RequestBuilder) -> Result<Vec<Value>, StoreError> {
        let response = ensure_success(self.authorized(request).send().await?).await?;
        let body = response.text().await?;
        serde_json::from_str::<Vec<Value>>(&body)
            .map_err(|err| StoreError::Decode(format!("expected a JSON array of rows: {err}")))
    }
}

#[async_trait]
impl TaskStore for RestTaskStore {
    async fn list(&self) -> Result<Vec<Task>, StoreError> {
        let url = format!("{}?select=*&order=due_date.asc", self.endpoint);
        let rows = self.rows(self.client.get(url)).await?;
        let total = rows.len();
        let tasks = decode_rows_lenient(rows);
        debug!(total, decoded = tasks.len(), "listed tasks");
        Ok(tasks)
    }

    async fn create(&self, task: &Task) -> Result<Task, StoreError> {
        let request = self
            .client
            .post(&self.endpoint)
            .header("Prefer", RETURN_REPRESENTATION)
            .json(task);
        let rows = self.rows(request).await?;
        single_row(rows, None)
    }

    async fn update(&self, id: Uuid, patch: &TaskPatch) -> Result<Task, StoreError> {
        let request = self
            .client
            .patch(self.row_url(id))
            .header("Prefer", RETURN_REPRESENTATION)
            .json(patch);
        let rows = self.rows(request).await?;
        single_row(rows, Some(id))
    }

    async fn delete(&self, id: Uuid) -> Result<(), StoreError> {
        let request = self
            .client
            .delete(self.row_url(id))
            .header("Prefer", RETURN_REPRESENTATION);
        let rows = self.rows(request).await?;
        match rows.len() {
            0 => Err(StoreError::NotFound(id)),
            1 => Ok(()),
            actual => Err(StoreError::UnexpectedRowCount {
                expected: 1,
                actual,
            }),
        }
    }
}

async fn ensure_success(response: Response) -> Result<Response, StoreError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(StoreError::Status {
        status: status.as_u16(),
        body: body.trim().to_string(),
    })
}

fn decode_rows_lenient(rows: Vec<Value>) -> Vec<Task> {
    rows.into_iter()
        .filter_map(|row| match serde_json::from_value::<Task>(row) {
            Ok(task) => Some(task),
            Err(err) => {
                warn!(error = %err, "skipping task row that failed to decode");
                None
            }
        })
        .collect()
}

/// Exactly one row is expected back; zero rows on a keyed call means the id
/// did not match.
fn single_row(rows: Vec<Value>, id: Option<Uuid>) -> Result<Task, StoreError> {
    let actual = rows.len();
    let mut rows = rows.into_iter();
    match (rows.next(), rows.next(), id) {
        (Some(row), None, _) => {
            serde_json::from_value(row).map_err(|err| StoreError::Decode(err.to_string()))
        }
        (None, _, Some(id)) => Err(StoreError::NotFound(id)),
        _ => Err(StoreError::UnexpectedRowCount {
            expected: 1,
            actual,
        }),
    }
}
