//! In-memory bridge fakes shared by the unit tests.

use async_trait::async_trait;
use bridge_traits::error::{BridgeError, Result as BridgeResult};
use bridge_traits::http::{HttpClient, HttpRequest, HttpResponse};
use bridge_traits::{CodePrompt, FileSystemAccess};
use bytes::Bytes;
use core_runtime::AuthConfig;
use std::collections::{BTreeMap, HashMap, VecDeque};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

mockall::mock! {
    pub Http {}

    #[async_trait]
    impl HttpClient for Http {
        async fn execute(&self, request: HttpRequest) -> BridgeResult<HttpResponse>;
    }
}

pub fn json_response(status: u16, body: &str) -> HttpResponse {
    let mut headers = HashMap::new();
    headers.insert("content-type".to_string(), "application/json".to_string());
    HttpResponse {
        status,
        headers,
        body: Bytes::from(body.to_string()),
    }
}

pub const INSTALLED_SECRETS: &str = r#"{
    "installed": {
        "client_id": "1234.apps.googleusercontent.com",
        "client_secret": "GOCSPX-installed",
        "auth_uri": "https://accounts.google.com/o/oauth2/auth",
        "token_uri": "https://oauth2.googleapis.com/token",
        "redirect_uris": ["http://localhost"]
    }
}"#;

pub const WEB_SECRETS: &str = r#"{
    "web": {
        "client_id": "5678.apps.googleusercontent.com",
        "client_secret": "GOCSPX-web",
        "redirect_uris": ["https://helper.example.com/oauth2callback"]
    }
}"#;

/// Filesystem held in a map; directories are implied by file paths plus
/// anything passed to `create_dir_all`.
#[derive(Default)]
pub struct MemoryFileSystem {
    files: Mutex<BTreeMap<PathBuf, Bytes>>,
    dirs: Mutex<Vec<PathBuf>>,
    fail_listing: bool,
}

impl MemoryFileSystem {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_listing() -> Self {
        Self {
            fail_listing: true,
            ..Self::default()
        }
    }

    pub fn insert(&self, path: impl Into<PathBuf>, contents: &str) {
        self.files
            .lock()
            .unwrap()
            .insert(path.into(), Bytes::from(contents.to_string()));
    }

    pub fn contents(&self, path: impl AsRef<Path>) -> Option<String> {
        self.files
            .lock()
            .unwrap()
            .get(path.as_ref())
            .map(|bytes| String::from_utf8_lossy(bytes).into_owned())
    }

    pub fn has_dir(&self, path: impl AsRef<Path>) -> bool {
        self.dirs.lock().unwrap().iter().any(|d| d == path.as_ref())
    }
}

#[async_trait]
impl FileSystemAccess for MemoryFileSystem {
    async fn exists(&self, path: &Path) -> BridgeResult<bool> {
        let is_file = self.files.lock().unwrap().contains_key(path);
        Ok(is_file || self.has_dir(path))
    }

    async fn create_dir_all(&self, path: &Path) -> BridgeResult<()> {
        let mut dirs = self.dirs.lock().unwrap();
        if !dirs.iter().any(|d| d == path) {
            dirs.push(path.to_path_buf());
        }
        Ok(())
    }

    async fn read_file(&self, path: &Path) -> BridgeResult<Bytes> {
        self.files
            .lock()
            .unwrap()
            .get(path)
            .cloned()
            .ok_or_else(|| {
                BridgeError::Io(std::io::Error::new(
                    std::io::ErrorKind::NotFound,
                    format!("{} not found", path.display()),
                ))
            })
    }

    async fn write_file(&self, path: &Path, data: Bytes) -> BridgeResult<()> {
        self.files.lock().unwrap().insert(path.to_path_buf(), data);
        Ok(())
    }

    async fn create_file(&self, path: &Path, data: Bytes) -> BridgeResult<()> {
        let mut files = self.files.lock().unwrap();
        if files.contains_key(path) {
            return Err(BridgeError::Io(std::io::Error::new(
                std::io::ErrorKind::AlreadyExists,
                format!("{} exists", path.display()),
            )));
        }
        files.insert(path.to_path_buf(), data);
        Ok(())
    }

    async fn list_directory(&self, path: &Path) -> BridgeResult<Vec<PathBuf>> {
        if self.fail_listing {
            return Err(BridgeError::OperationFailed("permission denied".to_string()));
        }
        Ok(self
            .files
            .lock()
            .unwrap()
            .keys()
            .filter(|file| file.parent() == Some(path))
            .cloned()
            .collect())
    }
}

/// Prompt that answers with queued codes and records every URL it was shown.
#[derive(Default)]
pub struct ScriptedPrompt {
    answers: Mutex<VecDeque<String>>,
    shown_urls: Mutex<Vec<String>>,
}

impl ScriptedPrompt {
    pub fn with_answers(answers: &[&str]) -> Self {
        Self {
            answers: Mutex::new(answers.iter().map(|a| a.to_string()).collect()),
            shown_urls: Mutex::new(Vec::new()),
        }
    }

    pub fn shown_urls(&self) -> Vec<String> {
        self.shown_urls.lock().unwrap().clone()
    }

    pub fn prompt_count(&self) -> usize {
        self.shown_urls.lock().unwrap().len()
    }
}

#[async_trait]
impl CodePrompt for ScriptedPrompt {
    async fn prompt_for_code(&self, authorization_url: &str) -> BridgeResult<String> {
        self.shown_urls
            .lock()
            .unwrap()
            .push(authorization_url.to_string());
        self.answers
            .lock()
            .unwrap()
            .pop_front()
            .ok_or(BridgeError::InputClosed)
    }
}

pub fn project_root() -> PathBuf {
    PathBuf::from("/srv/helper")
}

pub fn credentials_dir() -> PathBuf {
    project_root().join("credentials")
}

pub fn test_config(
    fs: Arc<MemoryFileSystem>,
    http: Arc<dyn HttpClient>,
    prompt: Arc<ScriptedPrompt>,
) -> AuthConfig {
    AuthConfig::builder()
        .project_root(project_root())
        .file_system(fs)
        .http_client(http)
        .code_prompt(prompt)
        .build()
        .unwrap()
}
