//! An in-memory REST API for end-to-end tests.

use apientity_core::WireMap;
use apientity_sync::{HttpClient, HttpMethod, HttpRequest, HttpResponse, SyncResult};
use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::{json, Value};
use std::collections::{BTreeMap, VecDeque};
use std::sync::Arc;
use tracing::debug;

/// A REST server kept in memory, used as an [`HttpClient`].
///
/// Any path whose last segment is not an integer is a collection;
/// `{collection}/{id}` addresses a record. Identifiers are integers
/// assigned from one counter shared by all collections.
///
/// | Request                  | Response                         |
/// |--------------------------|----------------------------------|
/// | `GET {collection}`       | 200, every record                |
/// | `GET {collection}/{id}`  | 200 or 404                       |
/// | `POST {collection}`      | 201, the stored record(s)        |
/// | `PUT {collection}/{id}`  | 200 with the merged record, 404  |
/// | `DELETE {collection}/{id}` | 204 or 404                     |
#[derive(Debug)]
pub struct InMemoryApi {
    state: Mutex<ApiState>,
}

#[derive(Debug)]
struct ApiState {
    collections: BTreeMap<String, BTreeMap<i64, WireMap>>,
    next_id: i64,
    requests: Vec<HttpRequest>,
    failures: VecDeque<(u16, String)>,
}

impl InMemoryApi {
    /// Base URL to configure syncers with.
    pub const BASE_URL: &'static str = "memory://api";

    /// Creates an empty API.
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            state: Mutex::new(ApiState {
                collections: BTreeMap::new(),
                next_id: 1,
                requests: Vec::new(),
                failures: VecDeque::new(),
            }),
        })
    }

    /// Stores a record directly, bypassing the request log.
    ///
    /// Keeps the record's integer `id` if it has one, otherwise assigns one.
    pub fn seed(&self, collection: &str, record: Value) -> i64 {
        let mut state = self.state.lock();
        let map = match record {
            Value::Object(map) => map,
            other => {
                let mut map = WireMap::new();
                map.insert("value".into(), other);
                map
            }
        };
        state.store(collection, map)
    }

    /// Returns a stored record.
    pub fn record(&self, collection: &str, id: i64) -> Option<Value> {
        self.state
            .lock()
            .collections
            .get(collection)
            .and_then(|records| records.get(&id))
            .map(|record| Value::Object(record.clone()))
    }

    /// Returns every record of a collection, in identifier order.
    pub fn records(&self, collection: &str) -> Vec<Value> {
        self.state
            .lock()
            .collections
            .get(collection)
            .map(|records| records.values().cloned().map(Value::Object).collect())
            .unwrap_or_default()
    }

    /// Makes the next request fail with `status` and an `error` message.
    pub fn fail_next(&self, status: u16, message: impl Into<String>) {
        self.state.lock().failures.push_back((status, message.into()));
    }

    /// Every request received so far.
    pub fn requests(&self) -> Vec<HttpRequest> {
        self.state.lock().requests.clone()
    }

    /// Number of requests received so far.
    pub fn request_count(&self) -> usize {
        self.state.lock().requests.len()
    }

    fn handle(&self, request: HttpRequest) -> HttpResponse {
        let mut state = self.state.lock();
        let response = state.respond(&request);
        debug!(method = %request.method, url = %request.url, status = response.status, "in-memory api");
        state.requests.push(request);
        response
    }
}

impl ApiState {
    fn respond(&mut self, request: &HttpRequest) -> HttpResponse {
        if let Some((status, message)) = self.failures.pop_front() {
            return error(status, &message);
        }

        let Some(path) = request.url.strip_prefix(InMemoryApi::BASE_URL) else {
            return error(404, "unknown host");
        };
        let path = path.trim_matches('/');
        let (collection, id) = match path.rsplit_once('/') {
            Some((parent, last)) => match last.parse::<i64>() {
                Ok(id) => (parent, Some(id)),
                Err(_) => (path, None),
            },
            None => (path, None),
        };

        match (request.method, id) {
            (HttpMethod::Get, None) => HttpResponse::ok(Value::Array(
                self.collections
                    .get(collection)
                    .map(|records| records.values().cloned().map(Value::Object).collect())
                    .unwrap_or_default(),
            )),
            (HttpMethod::Get, Some(id)) => match self.lookup(collection, id) {
                Some(record) => HttpResponse::ok(Value::Object(record.clone())),
                None => error(404, "not found"),
            },
            (HttpMethod::Post, None) => self.create(collection, request.params.as_ref()),
            (HttpMethod::Put, Some(id)) => {
                let Some(Value::Object(changes)) = &request.params else {
                    return error(400, "expected object body");
                };
                match self.collections.get_mut(collection).and_then(|r| r.get_mut(&id)) {
                    Some(record) => {
                        for (key, value) in changes {
                            if key != "id" {
                                record.insert(key.clone(), value.clone());
                            }
                        }
                        HttpResponse::ok(Value::Object(record.clone()))
                    }
                    None => error(404, "not found"),
                }
            }
            (HttpMethod::Delete, Some(id)) => {
                match self.collections.get_mut(collection).and_then(|r| r.remove(&id)) {
                    Some(_) => HttpResponse::no_content(),
                    None => error(404, "not found"),
                }
            }
            _ => error(405, "method not allowed"),
        }
    }

    fn lookup(&self, collection: &str, id: i64) -> Option<&WireMap> {
        self.collections.get(collection)?.get(&id)
    }

    /// Creates one record, or several when the body wraps an array.
    fn create(&mut self, collection: &str, params: Option<&Value>) -> HttpResponse {
        let Some(Value::Object(body)) = params else {
            return error(400, "expected object body");
        };

        if body.len() == 1 {
            if let Some(Value::Array(items)) = body.values().next() {
                let mut created = Vec::with_capacity(items.len());
                for item in items {
                    let Value::Object(map) = item else {
                        return error(400, "expected array of objects");
                    };
                    let id = self.store(collection, without_id(map));
                    if let Some(record) = self.lookup(collection, id) {
                        created.push(Value::Object(record.clone()));
                    }
                }
                return HttpResponse::new(201, Value::Array(created));
            }
        }

        let id = self.store(collection, without_id(body));
        match self.lookup(collection, id) {
            Some(record) => HttpResponse::new(201, Value::Object(record.clone())),
            None => error(500, "record vanished"),
        }
    }

    fn store(&mut self, collection: &str, mut record: WireMap) -> i64 {
        let id = match record.get("id").and_then(Value::as_i64) {
            Some(id) => id,
            None => self.next_id,
        };
        self.next_id = self.next_id.max(id.saturating_add(1));
        record.insert("id".into(), Value::from(id));
        self.collections
            .entry(collection.to_string())
            .or_default()
            .insert(id, record);
        id
    }
}

fn without_id(map: &WireMap) -> WireMap {
    let mut map = map.clone();
    map.remove("id");
    map
}

fn error(status: u16, message: &str) -> HttpResponse {
    HttpResponse::new(status, json!({ "error": message }))
}

#[async_trait]
impl HttpClient for InMemoryApi {
    async fn perform_request(&self, request: HttpRequest) -> SyncResult<HttpResponse> {
        Ok(self.handle(request))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(method: HttpMethod, path: &str, params: Option<Value>) -> HttpRequest {
        HttpRequest {
            method,
            url: format!("{}/{path}", InMemoryApi::BASE_URL),
            params,
            headers: BTreeMap::new(),
        }
    }

    #[test]
    fn seeding_the_largest_identifier() {
        let api = InMemoryApi::new();
        assert_eq!(api.seed("widgets", json!({"id": i64::MAX, "name": "edge"})), i64::MAX);
        assert_eq!(api.record("widgets", i64::MAX).unwrap()["name"], json!("edge"));
    }

    #[tokio::test]
    async fn crud_round_trip() {
        let api = InMemoryApi::new();

        let created = api
            .perform_request(request(HttpMethod::Post, "widgets", Some(json!({"name": "a"}))))
            .await
            .unwrap();
        assert_eq!(created.status, 201);
        assert_eq!(created.body, json!({"id": 1, "name": "a"}));

        let updated = api
            .perform_request(request(HttpMethod::Put, "widgets/1", Some(json!({"name": "b", "id": 99}))))
            .await
            .unwrap();
        assert_eq!(updated.body, json!({"id": 1, "name": "b"}));

        let listed = api
            .perform_request(request(HttpMethod::Get, "widgets", None))
            .await
            .unwrap();
        assert_eq!(listed.body, json!([{"id": 1, "name": "b"}]));

        let deleted = api
            .perform_request(request(HttpMethod::Delete, "widgets/1", None))
            .await
            .unwrap();
        assert_eq!(deleted.status, 204);
        assert!(api.records("widgets").is_empty());
        assert_eq!(api.request_count(), 4);
    }

    #[tokio::test]
    async fn nested_paths_and_failures() {
        let api = InMemoryApi::new();
        let widget = api.seed("widgets", json!({"name": "w"}));
        api.seed(&format!("widgets/{widget}/parts"), json!({"label": "hinge"}));

        let parts = api
            .perform_request(request(HttpMethod::Get, &format!("widgets/{widget}/parts"), None))
            .await
            .unwrap();
        assert_eq!(parts.body, json!([{"id": 2, "label": "hinge"}]));

        api.fail_next(503, "maintenance");
        let failed = api
            .perform_request(request(HttpMethod::Get, "widgets", None))
            .await
            .unwrap();
        assert_eq!(failed.status, 503);
        assert_eq!(failed.body, json!({"error": "maintenance"}));

        let missing = api
            .perform_request(request(HttpMethod::Get, "widgets/42", None))
            .await
            .unwrap();
        assert_eq!(missing.status, 404);
    }

    #[tokio::test]
    async fn bulk_create_from_wrapped_array() {
        let api = InMemoryApi::new();
        let created = api
            .perform_request(request(
                HttpMethod::Post,
                "widgets",
                Some(json!({"widgets": [{"name": "a"}, {"name": "b"}]})),
            ))
            .await
            .unwrap();
        assert_eq!(created.body, json!([{"id": 1, "name": "a"}, {"id": 2, "name": "b"}]));
    }
}
