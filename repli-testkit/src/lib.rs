//! Loopback fake of the repository contents API, shared by the core and CLI
//! integration tests.
//!
//! `FakeGithub::start` serves an axum router on an ephemeral port from a
//! background thread with its own tokio runtime, so blocking clients can talk
//! to it from plain `#[test]` functions. Directories are implied by file
//! paths; empty ones can be added with [`FakeGithub::with_dir`].

use axum::extract::{Path, State};
use axum::http::{header, HeaderMap, Method, StatusCode, Uri};
use axum::routing::any;
use axum::{Json, Router};
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use serde_json::{json, Value};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::{Arc, Mutex};
use std::thread;

pub const TOKEN: &str = "test-token";
pub const REPO: &str = "octo/site";

/// One request as the server saw it. `target` is the raw (still
/// percent-encoded) path and query.
#[derive(Clone, Debug)]
pub struct Recorded {
    pub method: String,
    pub target: String,
    pub headers: Vec<(String, String)>,
    pub body: String,
}

impl Recorded {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.iter().find(|(k, _)| k == name).map(|(_, v)| v.as_str())
    }
}

/// When an injected status is returned relative to the real handling.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Fault {
    /// Answer with the status and do nothing.
    Reject,
    /// Handle the request (a PUT commits), then answer with the status.
    AfterCommit,
}

#[derive(Debug)]
struct Injected {
    method: Method,
    path: String,
    status: u16,
    remaining: usize,
    mode: Fault,
}

#[derive(Default)]
struct Repo {
    files: BTreeMap<String, String>,
    dirs: BTreeSet<String>,
    faults: Vec<Injected>,
    requests: Vec<Recorded>,
    commits: Vec<(String, String)>,
}

type Shared = Arc<Mutex<Repo>>;

pub struct FakeGithub {
    pub url: String,
    state: Shared,
}

impl FakeGithub {
    pub fn start(files: &[(&str, &str)]) -> Self {
        let state: Shared = Arc::new(Mutex::new(Repo {
            files: files.iter().map(|(p, t)| (p.to_string(), t.to_string())).collect(),
            ..Repo::default()
        }));
        let app = Router::new()
            .route("/repos/{owner}/{repo}/contents", any(contents))
            .route("/repos/{owner}/{repo}/contents/{*path}", any(contents))
            .with_state(state.clone());

        // Bound before the thread starts, so early connections just queue.
        let listener = std::net::TcpListener::bind(("127.0.0.1", 0)).expect("bind loopback");
        listener.set_nonblocking(true).expect("nonblocking listener");
        let url = format!("http://{}", listener.local_addr().expect("local addr"));
        thread::spawn(move || {
            let rt = tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
                .expect("test runtime");
            rt.block_on(async move {
                let listener = tokio::net::TcpListener::from_std(listener).expect("adopt listener");
                axum::serve(listener, app).await.expect("serve fake contents API");
            });
        });
        Self { url, state }
    }

    /// Add an empty directory that lists as `[]`.
    pub fn with_dir(self, path: &str) -> Self {
        self.lock().dirs.insert(path.to_string());
        self
    }

    /// Answer the next `times` requests for (method, path) with `status`.
    pub fn fail(&self, method: &str, path: &str, status: u16, times: usize) {
        self.inject(method, path, status, times, Fault::Reject);
    }

    /// Like [`fail`](Self::fail), but the request takes effect first.
    pub fn fail_after_commit(&self, method: &str, path: &str, status: u16, times: usize) {
        self.inject(method, path, status, times, Fault::AfterCommit);
    }

    fn inject(&self, method: &str, path: &str, status: u16, times: usize, mode: Fault) {
        let method = Method::from_bytes(method.as_bytes()).expect("http method");
        self.lock().faults.push(Injected { method, path: path.into(), status, remaining: times, mode });
    }

    pub fn file(&self, path: &str) -> Option<String> {
        self.lock().files.get(path).cloned()
    }

    pub fn paths(&self) -> Vec<String> {
        self.lock().files.keys().cloned().collect()
    }

    pub fn requests(&self) -> Vec<Recorded> {
        self.lock().requests.clone()
    }

    /// `(path, message)` of every successful create, in order.
    pub fn commits(&self) -> Vec<(String, String)> {
        self.lock().commits.clone()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Repo> {
        self.state.lock().expect("fake state poisoned")
    }
}

async fn contents(
    State(state): State<Shared>,
    Path(params): Path<HashMap<String, String>>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: String,
) -> (StatusCode, Json<Value>) {
    let mut repo = state.lock().expect("fake state poisoned");
    repo.requests.push(Recorded {
        method: method.to_string(),
        target: uri.path_and_query().map(|pq| pq.to_string()).unwrap_or_default(),
        headers: headers
            .iter()
            .map(|(k, v)| (k.as_str().to_string(), v.to_str().unwrap_or_default().to_string()))
            .collect(),
        body: body.clone(),
    });
    let (status, payload) = respond(&mut repo, &params, &method, &headers, &body);
    (StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR), Json(payload))
}

fn respond(
    repo: &mut Repo,
    params: &HashMap<String, String>,
    method: &Method,
    headers: &HeaderMap,
    body: &str,
) -> (u16, Value) {
    let want = format!("token {TOKEN}");
    let auth = headers.get(header::AUTHORIZATION).and_then(|v| v.to_str().ok());
    if auth != Some(want.as_str()) {
        return (401, json!({"message": "Bad credentials"}));
    }
    let owner = params.get("owner").map(String::as_str).unwrap_or_default();
    let name = params.get("repo").map(String::as_str).unwrap_or_default();
    if format!("{owner}/{name}") != REPO {
        return (404, json!({"message": "Not Found"}));
    }
    // path segments arrive percent-decoded from the extractor
    let path = params.get("path").map(|p| p.trim_matches('/')).unwrap_or_default().to_string();

    let fault = repo
        .faults
        .iter_mut()
        .find(|f| f.method == *method && f.path == path && f.remaining > 0)
        .map(|f| {
            f.remaining -= 1;
            (f.status, f.mode)
        });
    if let Some((status, Fault::Reject)) = fault {
        return (status, json!({"message": "injected"}));
    }

    let handled = match *method {
        Method::GET => get(&path, repo),
        Method::PUT => put(&path, body, repo),
        _ => (405, json!({"message": "Method Not Allowed"})),
    };
    match fault {
        Some((status, Fault::AfterCommit)) => (status, json!({"message": "injected"})),
        _ => handled,
    }
}

fn get(path: &str, repo: &Repo) -> (u16, Value) {
    if let Some(text) = repo.files.get(path) {
        let b64 = STANDARD.encode(text.as_bytes());
        // the real API wraps base64 at 60 columns
        let wrapped: Vec<&str> =
            b64.as_bytes().chunks(60).filter_map(|c| std::str::from_utf8(c).ok()).collect();
        let name = path.rsplit('/').next().unwrap_or(path);
        return (
            200,
            json!({
                "type": "file", "name": name, "path": path, "sha": format!("sha-{path}"),
                "encoding": "base64", "content": wrapped.join("\n") + "\n",
            }),
        );
    }
    let keys = repo.files.keys().map(|k| (k, false)).chain(repo.dirs.iter().map(|d| (d, true)));
    let mut entries: BTreeMap<String, Value> = BTreeMap::new();
    let mut found = path.is_empty() || repo.dirs.contains(path);
    for (key, is_dir) in keys {
        let rel = if path.is_empty() {
            key.as_str()
        } else {
            match key.strip_prefix(path).and_then(|r| r.strip_prefix('/')) {
                Some(r) => r,
                None => continue,
            }
        };
        found = true;
        let (name, kind) = match rel.split_once('/') {
            Some((first, _)) => (first, "dir"),
            None => (rel, if is_dir { "dir" } else { "file" }),
        };
        let full = if path.is_empty() { name.to_string() } else { format!("{path}/{name}") };
        entries.insert(name.to_string(), json!({"name": name, "path": full, "type": kind, "sha": "x"}));
    }
    if !found {
        return (404, json!({"message": "Not Found"}));
    }
    (200, Value::Array(entries.into_values().collect()))
}

fn put(path: &str, body: &str, repo: &mut Repo) -> (u16, Value) {
    if repo.files.contains_key(path) {
        return (422, json!({"message": "Invalid request.\n\n\"sha\" wasn't supplied."}));
    }
    let Ok(v) = serde_json::from_str::<Value>(body) else {
        return (400, json!({"message": "Problems parsing JSON"}));
    };
    let content = v["content"].as_str().unwrap_or_default();
    let message = v["message"].as_str().unwrap_or_default().to_string();
    let Ok(bytes) = STANDARD.decode(content) else {
        return (400, json!({"message": "content is not valid Base64"}));
    };
    repo.files.insert(path.to_string(), String::from_utf8_lossy(&bytes).into_owned());
    repo.commits.push((path.to_string(), message));
    (201, json!({"content": {"path": path}}))
}
