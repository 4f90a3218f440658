use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode, header::ETAG};
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::debug;

use couchlayer_core::{
    client::{CouchClient, DocumentMeta, ViewOptions, ViewResult, WriteReceipt},
    config::{ConnectionConfig, Credentials},
    error::{CouchError, CouchResult},
};

/// CouchDB success body for puts and deletes.
#[derive(Debug, Deserialize)]
struct WriteResponse {
    id: String,
    rev: String,
}

/// CouchDB error body.
#[derive(Debug, Default, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    reason: Option<String>,
}

/// A store client speaking CouchDB's HTTP API.
#[derive(Debug)]
pub struct HttpCouchClient {
    base_url: String,
    database: String,
    auth: Option<Credentials>,
    client: Client,
}

impl HttpCouchClient {
    /// Creates a client for the given connection settings.
    ///
    /// # Errors
    ///
    /// Returns a transport error when the underlying HTTP client cannot be
    /// constructed.
    pub fn new(config: ConnectionConfig) -> CouchResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(60))
            .build()
            .map_err(|e| CouchError::Transport(e.to_string()))?;

        Ok(Self {
            base_url: format!("http://{}:{}", config.host, config.port),
            database: config.database,
            auth: config.auth,
            client,
        })
    }

    /// Creates a client from a `scheme://[auth@]host[:port]/database`
    /// connection string.
    pub fn from_uri(uri: &str) -> CouchResult<Self> {
        Self::new(ConnectionConfig::from_uri(uri)?)
    }

    fn db_url(&self) -> String {
        format!("{}/{}", self.base_url, urlencoding::encode(&self.database))
    }

    /// Document URL with the identifier encoded; the `_design/` prefix
    /// stays a path segment of its own.
    fn doc_url(&self, id: &str) -> String {
        let encoded = match id.strip_prefix("_design/") {
            Some(rest) => format!("_design/{}", urlencoding::encode(rest)),
            None => urlencoding::encode(id).into_owned(),
        };
        format!("{}/{encoded}", self.db_url())
    }

    fn request(&self, method: Method, url: &str) -> RequestBuilder {
        let mut request = self.client.request(method, url);
        if let Some(auth) = &self.auth {
            request = request.basic_auth(&auth.username, Some(&auth.password));
        }
        request
    }

    async fn send(&self, request: RequestBuilder) -> CouchResult<Response> {
        request
            .send()
            .await
            .map_err(|e| CouchError::Transport(e.to_string()))
    }

    /// Maps a failed response onto the error taxonomy.
    async fn status_error(&self, id: &str, response: Response) -> CouchError {
        let status = response.status();
        let body: ErrorBody = response.json().await.unwrap_or_default();
        let reason = body.reason.unwrap_or_default();

        match status {
            StatusCode::NOT_FOUND
                if reason == "no_db_file" || reason.contains("Database does not exist") =>
            {
                CouchError::DatabaseMissing(self.database.clone())
            }
            StatusCode::NOT_FOUND => CouchError::NotFound(id.to_string()),
            StatusCode::CONFLICT => CouchError::Conflict(id.to_string()),
            _ => CouchError::Transport(format!(
                "unexpected status {status}: {} {reason}",
                body.error.unwrap_or_default()
            )),
        }
    }

    async fn read_json<T: for<'de> Deserialize<'de>>(
        &self,
        id: &str,
        response: Response,
    ) -> CouchResult<T> {
        if !response.status().is_success() {
            return Err(self.status_error(id, response).await);
        }
        response
            .json()
            .await
            .map_err(|e| CouchError::Serialization(e.to_string()))
    }

    fn view_query(options: &ViewOptions) -> CouchResult<Vec<(&'static str, String)>> {
        let mut params = Vec::new();
        if let Some(key) = &options.key {
            // view keys are compared structurally, so they travel JSON-encoded
            params.push(("key", serde_json::to_string(key)?));
        }
        if options.include_docs {
            params.push(("include_docs", "true".to_string()));
        }
        if let Some(limit) = options.limit {
            params.push(("limit", limit.to_string()));
        }
        if let Some(skip) = options.skip {
            params.push(("skip", skip.to_string()));
        }
        if options.descending {
            params.push(("descending", "true".to_string()));
        }
        Ok(params)
    }

    /// Queries a rows endpoint, posting the key set when one is given.
    async fn rows_request(
        &self,
        url: &str,
        options: &ViewOptions,
    ) -> CouchResult<ViewResult> {
        let params = Self::view_query(options)?;
        let request = match &options.keys {
            Some(keys) => self
                .request(Method::POST, url)
                .query(&params)
                .json(&json!({ "keys": keys })),
            None => self.request(Method::GET, url).query(&params),
        };
        let response = self.send(request).await?;
        self.read_json(url, response).await
    }
}

#[async_trait]
impl CouchClient for HttpCouchClient {
    async fn head(&self, id: &str) -> CouchResult<DocumentMeta> {
        let response = self.send(self.request(Method::HEAD, &self.doc_url(id))).await?;
        let status = response.status();

        if !(status.is_success() || status == StatusCode::NOT_FOUND) {
            return Err(CouchError::Transport(format!(
                "head {id}: unexpected status {status}"
            )));
        }

        let rev = response
            .headers()
            .get(ETAG)
            .and_then(|value| value.to_str().ok())
            .map(|etag| etag.trim_matches('"').to_string());
        Ok(DocumentMeta {
            rev,
            status: status.as_u16(),
        })
    }

    async fn get(&self, id: &str) -> CouchResult<Value> {
        let response = self.send(self.request(Method::GET, &self.doc_url(id))).await?;
        self.read_json(id, response).await
    }

    async fn get_many(&self, ids: &[String]) -> CouchResult<ViewResult> {
        let options = ViewOptions::new()
            .keys(ids.iter().map(|id| json!(id)).collect())
            .include_docs(true);
        self.rows_request(&format!("{}/_all_docs", self.db_url()), &options)
            .await
    }

    async fn put(&self, id: &str, doc: &Value) -> CouchResult<WriteReceipt> {
        let response = self
            .send(self.request(Method::PUT, &self.doc_url(id)).json(doc))
            .await?;
        debug!(id, status = response.status().as_u16(), "put document");
        let body: WriteResponse = self.read_json(id, response).await?;
        Ok(WriteReceipt {
            id: body.id,
            rev: body.rev,
            status: 201,
        })
    }

    async fn merge(&self, id: &str, patch: &Value) -> CouchResult<Value> {
        let Some(patch_map) = patch.as_object() else {
            return Err(CouchError::Serialization(
                "partial document must be a JSON object".into(),
            ));
        };

        // CouchDB has no partial-update endpoint; merge is a read-modify-write
        // against the current revision.
        let mut current = self.get(id).await?;
        let Some(fields) = current.as_object_mut() else {
            return Err(CouchError::Serialization(format!(
                "document {id} is not a JSON object"
            )));
        };
        for (key, value) in patch_map {
            fields.insert(key.clone(), value.clone());
        }

        let receipt = self.put(id, &current).await?;
        if let Some(fields) = current.as_object_mut() {
            fields.insert("_id".to_string(), json!(receipt.id));
            fields.insert("_rev".to_string(), json!(receipt.rev));
        }
        Ok(current)
    }

    async fn remove(&self, id: &str, rev: &str) -> CouchResult<WriteReceipt> {
        let request = self
            .request(Method::DELETE, &self.doc_url(id))
            .query(&[("rev", rev)]);
        let response = self.send(request).await?;
        debug!(id, rev, "remove document");
        let body: WriteResponse = self.read_json(id, response).await?;
        Ok(WriteReceipt {
            id: body.id,
            rev: body.rev,
            status: 200,
        })
    }

    async fn view(&self, path: &str, options: &ViewOptions) -> CouchResult<ViewResult> {
        let (design, view) = path
            .split_once('/')
            .ok_or_else(|| CouchError::NotFound(path.to_string()))?;
        let url = format!(
            "{}/_design/{}/_view/{}",
            self.db_url(),
            urlencoding::encode(design),
            urlencoding::encode(view)
        );
        debug!(path, "query view");
        self.rows_request(&url, options).await
    }

    async fn all_docs(&self, options: &ViewOptions) -> CouchResult<ViewResult> {
        self.rows_request(&format!("{}/_all_docs", self.db_url()), options)
            .await
    }

    async fn create_database(&self) -> CouchResult<()> {
        let response = self.send(self.request(Method::PUT, &self.db_url())).await?;
        let status = response.status();
        // 412 means the database already exists
        if status.is_success() || status == StatusCode::PRECONDITION_FAILED {
            debug!(database = %self.database, "database created");
            return Ok(());
        }
        Err(self.status_error(&self.database.clone(), response).await)
    }

    fn database(&self) -> &str {
        &self.database
    }
}
