use super::{BackendError, BoxFuture, Table, TableBackend, TableQuery};
use color_eyre::{eyre::eyre, Result};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION};
use reqwest::{Method, RequestBuilder, Response};
use serde::Deserialize;
use serde_json::Value;
use url::Url;

/// Media type that makes the backend return one object instead of an array.
const SINGLE_OBJECT: &str = "application/vnd.pgrst.object+json";

/// Error body returned by the REST endpoint
#[derive(Debug, Deserialize)]
struct ApiError {
  code: Option<String>,
  message: Option<String>,
  details: Option<String>,
}

/// Table backend speaking the hosted REST dialect over HTTPS.
#[derive(Clone)]
pub struct RestBackend {
  http: reqwest::Client,
  base: Url,
}

impl RestBackend {
  /// Create a backend for `base_url` authenticated with the project api key
  /// and, when signed in, the user's access token.
  pub fn new(base_url: &str, api_key: &str, access_token: Option<&str>) -> Result<Self> {
    let mut base =
      Url::parse(base_url).map_err(|e| eyre!("Invalid backend url {}: {}", base_url, e))?;
    if !base.path().ends_with('/') {
      let path = format!("{}/", base.path());
      base.set_path(&path);
    }
    let base = base
      .join("rest/v1/")
      .map_err(|e| eyre!("Invalid backend url {}: {}", base_url, e))?;

    let bearer = access_token.unwrap_or(api_key);
    let mut headers = HeaderMap::new();
    headers.insert(
      "apikey",
      HeaderValue::from_str(api_key).map_err(|e| eyre!("Invalid api key: {}", e))?,
    );
    headers.insert(
      AUTHORIZATION,
      HeaderValue::from_str(&format!("Bearer {}", bearer))
        .map_err(|e| eyre!("Invalid access token: {}", e))?,
    );

    let http = reqwest::Client::builder()
      .default_headers(headers)
      .build()
      .map_err(|e| eyre!("Failed to create HTTP client: {}", e))?;

    Ok(Self { http, base })
  }

  fn request(&self, method: Method, query: &TableQuery) -> Result<RequestBuilder, BackendError> {
    let url = self
      .base
      .join(query.table.as_str())
      .map_err(|e| BackendError::new(format!("Invalid table url: {}", e)))?;

    let mut params: Vec<(String, String)> = query
      .filters
      .iter()
      .map(|f| (f.column.clone(), format!("eq.{}", filter_value(&f.value))))
      .collect();
    if let Some(order) = &query.order {
      let direction = if order.ascending { "asc" } else { "desc" };
      params.push(("order".to_string(), format!("{}.{}", order.column, direction)));
    }
    if method == Method::GET {
      params.push(("select".to_string(), "*".to_string()));
    }

    Ok(self.http.request(method, url).query(&params))
  }

  fn write_request(
    &self,
    method: Method,
    query: &TableQuery,
  ) -> Result<RequestBuilder, BackendError> {
    Ok(
      self
        .request(method, query)?
        .header("Prefer", "return=representation")
        .header(ACCEPT, SINGLE_OBJECT),
    )
  }
}

/// Render a filter value the way the query string expects it (no JSON quotes).
fn filter_value(value: &Value) -> String {
  match value {
    Value::String(s) => s.clone(),
    other => other.to_string(),
  }
}

/// Send a request, turning non-success statuses into backend errors.
async fn send(builder: RequestBuilder) -> Result<Response, BackendError> {
  let response = builder
    .send()
    .await
    .map_err(|e| BackendError::new(format!("Request failed: {}", e)))?;

  let status = response.status();
  if status.is_success() {
    return Ok(response);
  }

  let body = response.text().await.unwrap_or_default();
  let err = match serde_json::from_str::<ApiError>(&body) {
    Ok(api) => {
      let message = api
        .message
        .or(api.details)
        .unwrap_or_else(|| status.to_string());
      BackendError {
        code: api.code,
        message,
      }
    }
    Err(_) => BackendError::new(format!("{}: {}", status, body.trim())),
  };
  tracing::debug!(status = %status, code = ?err.code, "backend request failed");
  Err(err)
}

async fn decode<T: serde::de::DeserializeOwned>(response: Response) -> Result<T, BackendError> {
  response
    .json()
    .await
    .map_err(|e| BackendError::new(format!("Failed to decode response: {}", e)))
}

impl TableBackend for RestBackend {
  fn select(&self, query: TableQuery) -> BoxFuture<Vec<Value>> {
    let request = self.request(Method::GET, &query);
    Box::pin(async move { decode(send(request?).await?).await })
  }

  fn select_single(&self, query: TableQuery) -> BoxFuture<Value> {
    let request = self
      .request(Method::GET, &query)
      .map(|r| r.header(ACCEPT, SINGLE_OBJECT));
    Box::pin(async move { decode(send(request?).await?).await })
  }

  fn insert(&self, table: Table, row: Value) -> BoxFuture<Value> {
    let request = self
      .write_request(Method::POST, &TableQuery::new(table))
      .map(|r| r.json(&row));
    Box::pin(async move { decode(send(request?).await?).await })
  }

  fn update(&self, query: TableQuery, patch: Value) -> BoxFuture<Value> {
    let request = self
      .write_request(Method::PATCH, &query)
      .map(|r| r.json(&patch));
    Box::pin(async move { decode(send(request?).await?).await })
  }

  fn delete(&self, query: TableQuery) -> BoxFuture<()> {
    let request = self.request(Method::DELETE, &query);
    Box::pin(async move {
      send(request?).await?;
      Ok::<(), BackendError>(())
    })
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use serde_json::json;

  #[test]
  fn test_filter_value_strips_json_quotes() {
    assert_eq!(filter_value(&json!("my-bot")), "my-bot");
    assert_eq!(filter_value(&json!(true)), "true");
    assert_eq!(filter_value(&json!(42)), "42");
  }

  #[test]
  fn test_request_url_includes_filters_and_order() {
    let backend = RestBackend::new("https://example.supabase.co", "anon", None).unwrap();
    let query = TableQuery::new(Table::Projects)
      .eq("user_id", "u1")
      .order_desc("created_at");

    let request = backend
      .request(Method::GET, &query)
      .unwrap()
      .build()
      .unwrap();
    let url = request.url();

    assert_eq!(url.path(), "/rest/v1/projects");
    let pairs: Vec<(String, String)> = url.query_pairs().into_owned().collect();
    assert!(pairs.contains(&("user_id".to_string(), "eq.u1".to_string())));
    assert!(pairs.contains(&("order".to_string(), "created_at.desc".to_string())));
    assert!(pairs.contains(&("select".to_string(), "*".to_string())));
  }

  #[test]
  fn test_base_url_with_path_prefix() {
    let backend = RestBackend::new("http://localhost:54321/proxy", "anon", Some("token")).unwrap();
    assert_eq!(backend.base.as_str(), "http://localhost:54321/proxy/rest/v1/");
  }
}
