//! In-process object store speaking enough of the S3 and Blob REST APIs to
//! drive the cloud backends end to end. Signatures are not checked.

use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, HeaderValue, Method, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::Router;
use std::collections::{BTreeMap, HashMap};
use std::fmt::Write as _;
use std::sync::{Arc, Mutex};
use tokio::net::TcpListener;

const LAST_MODIFIED_HTTP: &str = "Tue, 02 Jan 2024 03:04:05 GMT";
const LAST_MODIFIED_ISO: &str = "2024-01-02T03:04:05.000Z";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Flavor {
    S3,
    Blob,
}

/// An object held by the stub.
#[derive(Debug, Clone)]
pub(crate) struct StubObject {
    pub data: Bytes,
    pub content_type: String,
    headers: BTreeMap<String, String>,
}

impl StubObject {
    /// A request header recorded when the object was written.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).map(String::as_str)
    }
}

#[derive(Debug)]
struct Recorded {
    method: Method,
    query: HashMap<String, String>,
}

struct StubState {
    flavor: Flavor,
    page_size: usize,
    objects: Mutex<BTreeMap<String, StubObject>>,
    requests: Mutex<Vec<Recorded>>,
    fail_with: Mutex<Option<u16>>,
}

/// A running stub bound to a local port.
pub(crate) struct StubServer {
    endpoint: String,
    state: Arc<StubState>,
}

impl StubServer {
    /// S3-style stub addressed path style: `/{bucket}/{key}`.
    pub async fn s3() -> Self {
        Self::start(Flavor::S3, 1000).await
    }

    /// Blob-style stub addressed as `/{account}/{container}/{blob}`.
    pub async fn blob() -> Self {
        Self::start(Flavor::Blob, 5000).await
    }

    /// Blob-style stub returning at most `page_size` blobs per list call.
    pub async fn blob_paged(page_size: usize) -> Self {
        Self::start(Flavor::Blob, page_size).await
    }

    async fn start(flavor: Flavor, page_size: usize) -> Self {
        let state = Arc::new(StubState {
            flavor,
            page_size,
            objects: Mutex::new(BTreeMap::new()),
            requests: Mutex::new(Vec::new()),
            fail_with: Mutex::new(None),
        });

        let app = Router::new().fallback(handle).with_state(state.clone());
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        let endpoint = match flavor {
            Flavor::S3 => format!("http://{}", addr),
            Flavor::Blob => format!("http://{}/devstoreaccount1", addr),
        };
        Self { endpoint, state }
    }

    /// Base URL to configure the backend with.
    pub fn endpoint(&self) -> String {
        self.endpoint.clone()
    }

    /// Object stored under `path` (`bucket/key` or `container/blob`).
    pub fn object(&self, path: &str) -> Option<StubObject> {
        self.state.objects.lock().unwrap().get(path).cloned()
    }

    /// Seed an object without going through HTTP.
    pub fn insert(&self, path: &str, data: &'static [u8], content_type: &str) {
        self.state.objects.lock().unwrap().insert(
            path.to_string(),
            StubObject {
                data: Bytes::from_static(data),
                content_type: content_type.to_string(),
                headers: BTreeMap::new(),
            },
        );
    }

    /// Answer every request with `status` until replaced; clients that
    /// retry internally see the same failure on each attempt.
    pub fn fail_with(&self, status: u16) {
        *self.state.fail_with.lock().unwrap() = Some(status);
    }

    /// Number of requests received with `method`.
    pub fn count(&self, method: &str) -> usize {
        self.state
            .requests
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.method.as_str() == method)
            .count()
    }

    /// Whether any request carried the query parameter `name`.
    pub fn saw_query(&self, name: &str) -> bool {
        self.state
            .requests
            .lock()
            .unwrap()
            .iter()
            .any(|r| r.query.contains_key(name))
    }
}

async fn handle(
    State(state): State<Arc<StubState>>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let query: HashMap<String, String> =
        url::form_urlencoded::parse(uri.query().unwrap_or("").as_bytes())
            .into_owned()
            .collect();
    let path = percent_encoding::percent_decode_str(uri.path())
        .decode_utf8_lossy()
        .trim_matches('/')
        .to_string();
    state.requests.lock().unwrap().push(Recorded {
        method: method.clone(),
        query: query.clone(),
    });

    let injected = *state.fail_with.lock().unwrap();
    if let Some(status) = injected {
        let status = StatusCode::from_u16(status).unwrap();
        return (status, "<Error><Code>Injected</Code></Error>").into_response();
    }

    // Blob paths carry the account as their first segment.
    let path = match state.flavor {
        Flavor::S3 => path,
        Flavor::Blob => path
            .split_once('/')
            .map(|(_, rest)| rest.to_string())
            .unwrap_or_default(),
    };

    let is_list = match state.flavor {
        Flavor::S3 => query.contains_key("list-type"),
        Flavor::Blob => query.get("comp").map(String::as_str) == Some("list"),
    };
    if method == Method::GET && is_list {
        return list(&state, &path, &query);
    }

    match method {
        Method::PUT => put(&state, path, &headers, body),
        Method::HEAD | Method::GET => read(&state, &path),
        Method::DELETE => delete(&state, &path),
        _ => StatusCode::METHOD_NOT_ALLOWED.into_response(),
    }
}

fn put(state: &StubState, path: String, headers: &HeaderMap, body: Bytes) -> Response {
    let recorded: BTreeMap<String, String> = headers
        .iter()
        .filter_map(|(name, value)| {
            Some((name.as_str().to_string(), value.to_str().ok()?.to_string()))
        })
        .collect();
    let content_type = recorded
        .get("content-type")
        .cloned()
        .unwrap_or_else(|| "application/octet-stream".to_string());

    state.objects.lock().unwrap().insert(
        path,
        StubObject {
            data: body,
            content_type,
            headers: recorded,
        },
    );

    let status = match state.flavor {
        Flavor::S3 => StatusCode::OK,
        Flavor::Blob => StatusCode::CREATED,
    };
    let mut response_headers = HeaderMap::new();
    response_headers.insert("etag", HeaderValue::from_static("\"stub-etag\""));
    response_headers.insert("last-modified", HeaderValue::from_static(LAST_MODIFIED_HTTP));
    (status, response_headers).into_response()
}

// HEAD responses keep the body so Content-Length is derived from it; hyper
// never writes the bytes.
fn read(state: &StubState, path: &str) -> Response {
    let Some(object) = state.objects.lock().unwrap().get(path).cloned() else {
        return StatusCode::NOT_FOUND.into_response();
    };

    let mut headers = HeaderMap::new();
    headers.insert("content-type", HeaderValue::from_str(&object.content_type).unwrap());
    headers.insert("etag", HeaderValue::from_static("\"stub-etag\""));
    headers.insert("last-modified", HeaderValue::from_static(LAST_MODIFIED_HTTP));
    if state.flavor == Flavor::Blob {
        headers.insert("x-ms-blob-type", HeaderValue::from_static("BlockBlob"));
    }
    (StatusCode::OK, headers, object.data).into_response()
}

fn delete(state: &StubState, path: &str) -> Response {
    let removed = state.objects.lock().unwrap().remove(path).is_some();
    match (state.flavor, removed) {
        (Flavor::S3, _) => StatusCode::NO_CONTENT.into_response(),
        (Flavor::Blob, true) => StatusCode::ACCEPTED.into_response(),
        (Flavor::Blob, false) => StatusCode::NOT_FOUND.into_response(),
    }
}

fn list(state: &StubState, container: &str, query: &HashMap<String, String>) -> Response {
    let (prefix_param, max_param, marker_param) = match state.flavor {
        Flavor::S3 => ("prefix", "max-keys", "continuation-token"),
        Flavor::Blob => ("prefix", "maxresults", "marker"),
    };
    let prefix = query.get(prefix_param).cloned().unwrap_or_default();
    let limit = query
        .get(max_param)
        .and_then(|v| v.parse::<usize>().ok())
        .unwrap_or(state.page_size)
        .min(state.page_size)
        .max(1);
    let marker = query.get(marker_param).filter(|m| !m.is_empty());

    let scope = format!("{}/", container);
    let objects = state.objects.lock().unwrap();
    let mut matching = objects
        .iter()
        .filter_map(|(path, object)| Some((path.strip_prefix(&scope)?, object)))
        .filter(|(key, _)| key.starts_with(&prefix))
        .filter(|(key, _)| marker.map_or(true, |m| *key > m.as_str()))
        .peekable();

    let mut page = Vec::new();
    while page.len() < limit {
        match matching.next() {
            Some(item) => page.push(item),
            None => break,
        }
    }
    let next = if matching.peek().is_some() {
        page.last().map(|(key, _)| key.to_string())
    } else {
        None
    };

    let body = match state.flavor {
        Flavor::S3 => s3_listing(container, &prefix, &page, next.as_deref()),
        Flavor::Blob => blob_listing(container, &prefix, &page, next.as_deref()),
    };
    let mut headers = HeaderMap::new();
    headers.insert("content-type", HeaderValue::from_static("application/xml"));
    (StatusCode::OK, headers, body).into_response()
}

type Page<'a> = [(&'a str, &'a StubObject)];

fn s3_listing(bucket: &str, prefix: &str, page: &Page<'_>, next: Option<&str>) -> String {
    let mut xml = String::from(r#"<?xml version="1.0" encoding="UTF-8"?>"#);
    xml.push_str(r#"<ListBucketResult xmlns="http://s3.amazonaws.com/doc/2006-03-01/">"#);
    let _ = write!(
        xml,
        "<Name>{}</Name><Prefix>{}</Prefix><KeyCount>{}</KeyCount>\
         <MaxKeys>1000</MaxKeys><IsTruncated>{}</IsTruncated>",
        bucket,
        prefix,
        page.len(),
        next.is_some()
    );
    for (key, object) in page {
        let _ = write!(
            xml,
            "<Contents><Key>{}</Key><LastModified>{}</LastModified>\
             <ETag>\"stub-etag\"</ETag><Size>{}</Size>\
             <StorageClass>STANDARD</StorageClass></Contents>",
            key,
            LAST_MODIFIED_ISO,
            object.data.len()
        );
    }
    if let Some(token) = next {
        let _ = write!(xml, "<NextContinuationToken>{}</NextContinuationToken>", token);
    }
    xml.push_str("</ListBucketResult>");
    xml
}

fn blob_listing(container: &str, prefix: &str, page: &Page<'_>, next: Option<&str>) -> String {
    let mut xml = String::from(r#"<?xml version="1.0" encoding="utf-8"?>"#);
    let _ = write!(
        xml,
        "<EnumerationResults ServiceEndpoint=\"http://127.0.0.1/devstoreaccount1/\" \
         ContainerName=\"{}\"><Prefix>{}</Prefix><Blobs>",
        container, prefix
    );
    for (key, object) in page {
        let _ = write!(
            xml,
            "<Blob><Name>{}</Name><Properties><Last-Modified>{}</Last-Modified>\
             <Etag>0x8DC0B1</Etag><Content-Length>{}</Content-Length>\
             <Content-Type>{}</Content-Type><Content-MD5></Content-MD5>\
             <BlobType>BlockBlob</BlobType></Properties></Blob>",
            key,
            LAST_MODIFIED_HTTP,
            object.data.len(),
            object.content_type
        );
    }
    let _ = write!(
        xml,
        "</Blobs><NextMarker>{}</NextMarker></EnumerationResults>",
        next.unwrap_or("")
    );
    xml
}
