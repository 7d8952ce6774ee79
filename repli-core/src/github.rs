//! Blocking client for a hosted repository's contents-by-path API.

use crate::config::Config;
use crate::error::StoreError;
use crate::retry::RetryPolicy;
use crate::store::{DirectoryEntry, EntryKind, FileContent, RemoteStore};
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use reqwest::blocking::{Client, Response};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION, USER_AGENT};
use reqwest::{StatusCode, Url};
use serde::{Deserialize, Serialize};
use std::cell::Cell;
use tracing::{debug, warn};

const ACCEPT_V3: &str = "application/vnd.github.v3+json";

#[derive(Deserialize)]
struct ApiEntry {
    name: String,
    path: String,
    #[serde(rename = "type")]
    kind: String,
}

#[derive(Deserialize)]
struct ApiFile {
    path: String,
    #[serde(rename = "type")]
    kind: String,
    sha: String,
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    encoding: Option<String>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ApiContents {
    Listing(Vec<ApiEntry>),
    Single(ApiFile),
}

#[derive(Serialize)]
struct CreateBody<'a> {
    message: &'a str,
    content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    branch: Option<&'a str>,
}

pub struct ContentsClient {
    http: Client,
    repo_url: Url,
    branch: Option<String>,
    retry: RetryPolicy,
}

impl ContentsClient {
    pub fn new(cfg: &Config, retry: RetryPolicy) -> Result<Self, StoreError> {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, cfg.auth_header()?);
        headers.insert(ACCEPT, HeaderValue::from_static(ACCEPT_V3));
        headers.insert(
            USER_AGENT,
            HeaderValue::from_static(concat!("repli/", env!("CARGO_PKG_VERSION"))),
        );
        let http = Client::builder().default_headers(headers).timeout(cfg.timeout).build()?;
        Ok(Self { http, repo_url: cfg.repo_url(), branch: cfg.branch.clone(), retry })
    }

    /// `{repo}/contents/{path}`; the empty path addresses the root.
    fn contents_url(&self, path: &str) -> Url {
        let mut url = self.repo_url.clone();
        if let Ok(mut segs) = url.path_segments_mut() {
            segs.pop_if_empty().push("contents").extend(path.split('/').filter(|s| !s.is_empty()));
        }
        url
    }

    fn read_url(&self, path: &str) -> Url {
        let mut url = self.contents_url(path);
        if let Some(b) = &self.branch {
            url.query_pairs_mut().append_pair("ref", b);
        }
        url
    }

    fn get_contents(&self, path: &str) -> Result<ApiContents, StoreError> {
        let url = self.read_url(path);
        self.retry.run(&format!("GET {path:?}"), || {
            debug!("GET {url}");
            let resp = self.http.get(url.clone()).send()?;
            let resp = expect_status(resp, StatusCode::OK, path)?;
            Ok(resp.json::<ApiContents>()?)
        })
    }
}

fn expect_status(resp: Response, want: StatusCode, path: &str) -> Result<Response, StoreError> {
    let status = resp.status();
    if status == want {
        Ok(resp)
    } else {
        debug!("{path:?}: HTTP {status}");
        Err(StoreError::from_status(status.as_u16(), path))
    }
}

/// Decode a contents-API file payload into UTF-8 text.
fn decode_file(file: ApiFile) -> Result<FileContent, StoreError> {
    if file.kind != "file" {
        return Err(StoreError::Decode(format!("{} is a {}, not a file", file.path, file.kind)));
    }
    let text = match (file.encoding.as_deref(), file.content) {
        (Some("base64"), Some(b64)) => {
            let compact: String = b64.chars().filter(|c| !c.is_ascii_whitespace()).collect();
            let bytes = STANDARD
                .decode(compact)
                .map_err(|e| StoreError::Decode(format!("{}: {e}", file.path)))?;
            String::from_utf8(bytes)
                .map_err(|_| StoreError::Decode(format!("{}: not UTF-8 text", file.path)))?
        }
        (encoding, _) => {
            warn!("{}: no inline content (encoding {:?}); treating as empty", file.path, encoding);
            String::new()
        }
    };
    Ok(FileContent { text, sha: file.sha })
}

impl RemoteStore for ContentsClient {
    fn list_directory(&self, path: &str) -> Result<Vec<DirectoryEntry>, StoreError> {
        match self.get_contents(path)? {
            ApiContents::Listing(items) => Ok(items
                .into_iter()
                .map(|e| DirectoryEntry { name: e.name, path: e.path, kind: EntryKind::from_api(&e.kind) })
                .collect()),
            ApiContents::Single(_) => Err(StoreError::NotADirectory(path.to_string())),
        }
    }

    fn get_file(&self, path: &str) -> Result<FileContent, StoreError> {
        match self.get_contents(path)? {
            ApiContents::Single(f) => decode_file(f),
            ApiContents::Listing(_) => Err(StoreError::Decode(format!("{path} is a directory"))),
        }
    }

    fn create_file(&self, path: &str, content: &str, message: &str) -> Result<(), StoreError> {
        let url = self.contents_url(path);
        let body = CreateBody {
            message,
            content: STANDARD.encode(content.as_bytes()),
            branch: self.branch.as_deref(),
        };
        let attempts = Cell::new(0u32);
        let result = self.retry.run(&format!("PUT {path:?}"), || {
            attempts.set(attempts.get() + 1);
            debug!("PUT {url}");
            let resp = self.http.put(url.clone()).json(&body).send()?;
            expect_status(resp, StatusCode::CREATED, path).map(|_| ())
        });
        match result {
            // A retried create can find the commit of an attempt whose response was lost.
            Err(e @ StoreError::Conflict { .. }) if attempts.get() > 1 => match self.get_file(path) {
                Ok(existing) if existing.text == content => {
                    warn!("{path}: already committed by an earlier attempt");
                    Ok(())
                }
                _ => Err(e),
            },
            other => other,
        }
    }
}
