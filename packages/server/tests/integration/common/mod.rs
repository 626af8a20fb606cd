use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use reqwest::Client;
use reqwest::header::{CONTENT_LENGTH, CONTENT_TYPE, HeaderName};
use serde_json::Value;
use tempfile::TempDir;

use ::common::storage::filesystem::FilesystemBlobStore;
use server::avatar::AvatarService;
use server::config::{AppConfig, CorsConfig, DatabaseConfig, ServerConfig, StorageAppConfig};
use server::mock::{InMemoryAvatarRepository, InMemoryStudentLookup};
use server::state::AppState;

pub const APP_NAME: &str = "school-test";
pub const CONFIGURED_PORT: u16 = 8080;

/// Students that exist in every test app.
pub const STUDENTS: std::ops::RangeInclusive<i32> = 1..=10;

pub mod routes {
    pub const AVATARS: &str = "/api/v1/avatars";
    pub const INFO: &str = "/api/v1/info";

    pub fn avatar(student_id: i32) -> String {
        format!("/api/v1/students/{student_id}/avatar")
    }

    pub fn avatar_preview(student_id: i32) -> String {
        format!("/api/v1/students/{student_id}/avatar/preview")
    }

    pub fn avatars_page(page: u64, size: u64) -> String {
        format!("/api/v1/avatars?page={page}&size={size}")
    }
}

/// A running test server backed by in-memory records and a temporary avatar
/// directory.
pub struct TestApp {
    pub addr: SocketAddr,
    pub client: Client,
    pub avatars_dir: PathBuf,
    pub students: Arc<InMemoryStudentLookup>,
    pub records: Arc<InMemoryAvatarRepository>,
    _dir: TempDir,
}

/// Parsed HTTP response for test assertions.
pub struct TestResponse {
    pub status: u16,
    pub content_type: Option<String>,
    pub content_length: Option<u64>,
    /// Raw response body.
    pub bytes: Vec<u8>,
    /// Parsed JSON body, or `Null` if the response is not valid JSON.
    pub body: Value,
}

impl TestApp {
    pub async fn spawn() -> Self {
        Self::spawn_with_limit(300 * 1024).await
    }

    pub async fn spawn_with_limit(max_avatar_size: u64) -> Self {
        let dir = tempfile::tempdir().expect("Failed to create temp dir");
        let avatars_dir = dir.path().join("avatars");

        let storage = StorageAppConfig {
            avatars_dir: avatars_dir.clone(),
            max_avatar_size,
        };
        let app_config = AppConfig {
            server: ServerConfig {
                name: APP_NAME.to_string(),
                host: "127.0.0.1".to_string(),
                port: CONFIGURED_PORT,
                cors: CorsConfig::default(),
            },
            database: DatabaseConfig {
                url: "postgres://unused".to_string(),
            },
            storage: storage.clone(),
        };

        let students = Arc::new(InMemoryStudentLookup::with_students(STUDENTS));
        let records = Arc::new(InMemoryAvatarRepository::new());
        let blobs = FilesystemBlobStore::new(avatars_dir.clone())
            .await
            .expect("Failed to create blob store");
        let avatars = AvatarService::new(
            students.clone(),
            records.clone(),
            Arc::new(blobs),
            storage,
        );

        let state = AppState {
            config: app_config,
            avatars: Arc::new(avatars),
        };
        let app = server::build_router(state);

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind to random port");
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            addr,
            client: Client::new(),
            avatars_dir,
            students,
            records,
            _dir: dir,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    pub async fn get(&self, path: &str) -> TestResponse {
        let res = self
            .client
            .get(self.url(path))
            .send()
            .await
            .expect("Failed to send GET request");

        TestResponse::from_response(res).await
    }

    pub async fn upload_field(
        &self,
        student_id: i32,
        field: &str,
        file_name: &str,
        media_type: &str,
        data: Vec<u8>,
    ) -> TestResponse {
        let part = reqwest::multipart::Part::bytes(data)
            .file_name(file_name.to_string())
            .mime_str(media_type)
            .expect("Failed to set MIME type");
        let form = reqwest::multipart::Form::new().part(field.to_string(), part);

        let res = self
            .client
            .post(self.url(&routes::avatar(student_id)))
            .multipart(form)
            .send()
            .await
            .expect("Failed to send multipart upload request");

        TestResponse::from_response(res).await
    }

    pub async fn upload_avatar(
        &self,
        student_id: i32,
        file_name: &str,
        media_type: &str,
        data: Vec<u8>,
    ) -> TestResponse {
        self.upload_field(student_id, "file", file_name, media_type, data)
            .await
    }

    /// Upload an avatar and assert it was accepted.
    pub async fn store_avatar(&self, student_id: i32, file_name: &str, data: &[u8]) {
        let res = self
            .upload_avatar(student_id, file_name, "image/png", data.to_vec())
            .await;
        assert_eq!(res.status, 200, "upload failed: {:?}", res.body);
    }

    /// File names currently in the avatar directory, sorted.
    pub fn avatar_files(&self) -> Vec<String> {
        list_files(&self.avatars_dir)
    }
}

fn list_files(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = std::fs::read_dir(dir)
        .unwrap()
        .filter_map(Result::ok)
        .filter(|e| e.file_type().map(|t| t.is_file()).unwrap_or(false))
        .map(|e| e.file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}

impl TestResponse {
    pub async fn from_response(res: reqwest::Response) -> Self {
        let status = res.status().as_u16();
        let header = |name: HeaderName| {
            res.headers()
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string)
        };
        let content_type = header(CONTENT_TYPE);
        let content_length = header(CONTENT_LENGTH).and_then(|v| v.parse().ok());
        let bytes = res.bytes().await.unwrap_or_default().to_vec();
        let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        Self {
            status,
            content_type,
            content_length,
            bytes,
            body,
        }
    }

    pub fn code(&self) -> &str {
        self.body["code"].as_str().unwrap_or_default()
    }
}
