//! End-to-end tests for the HTTP API.
//!
//! Each test starts a server on an ephemeral port backed by an in-memory
//! database and a temporary file directory, then talks to it over HTTP.
//! Clients live in SQLite unless a test asks for the JSON file store.

use pro_irp::api::{AppState, start_server};
use pro_irp::config::{Config, StorageBackend};
use pro_irp::db::Database;
use pro_irp::store::open_client_store;
use reqwest::StatusCode;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, SET_COOKIE};
use serde_json::{Value, json};
use std::sync::Arc;
use tempfile::TempDir;
use tokio::sync::oneshot;

const MAX_UPLOAD: usize = 1024;

struct TestServer {
    base: String,
    http: reqwest::Client,
    _shutdown: oneshot::Sender<()>,
    _temp: TempDir,
}

impl TestServer {
    async fn start() -> Self {
        Self::start_with(StorageBackend::Sqlite).await
    }

    async fn start_with(backend: StorageBackend) -> Self {
        let temp = TempDir::new().expect("temp dir");
        let mut config = Config::default();
        config.storage.backend = backend;
        config.storage.data_dir = temp.path().join("data");
        config.storage.files_dir = temp.path().join("files");
        config.storage.db_path = temp.path().join("irp.db");
        config.server.max_upload_bytes = MAX_UPLOAD;
        config.auth.jwt_secret = Some("integration-test-secret".into());
        config.auth.min_password_len = 8;
        config.ensure_dirs().expect("dirs");

        let db = Arc::new(Database::open_in_memory().expect("db"));
        let store = open_client_store(&config.storage, &db).expect("store");
        let state = AppState::new(config, db, store).expect("state");
        let (shutdown, addr) = start_server(state, "127.0.0.1:0".parse().unwrap())
            .await
            .expect("server");

        Self {
            base: format!("http://{}", addr),
            http: reqwest::Client::new(),
            _shutdown: shutdown,
            _temp: temp,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base, path)
    }

    /// Sign up and return the bearer token.
    async fn signup(&self, email: &str) -> String {
        let resp = self
            .http
            .post(self.url("/auth/signup"))
            .json(&json!({"email": email, "password": "correct horse", "name": "Agent"}))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::CREATED);
        let body: Value = resp.json().await.unwrap();
        body["token"].as_str().expect("token").to_string()
    }

    async fn get(&self, token: &str, path: &str) -> reqwest::Response {
        self.http
            .get(self.url(path))
            .header(AUTHORIZATION, format!("Bearer {}", token))
            .send()
            .await
            .unwrap()
    }

    async fn post(&self, token: &str, path: &str, body: Value) -> reqwest::Response {
        self.http
            .post(self.url(path))
            .header(AUTHORIZATION, format!("Bearer {}", token))
            .json(&body)
            .send()
            .await
            .unwrap()
    }

    async fn create_client(&self, token: &str, name: &str) -> Value {
        let resp = self.post(token, "/clients", json!({"name": name})).await;
        assert_eq!(resp.status(), StatusCode::CREATED);
        resp.json().await.unwrap()
    }
}

fn cookie_value(resp: &reqwest::Response, name: &str) -> Option<String> {
    resp.headers().get_all(SET_COOKIE).iter().find_map(|v| {
        let v = v.to_str().ok()?;
        let (pair, _) = v.split_once(';').unwrap_or((v, ""));
        let (k, val) = pair.split_once('=')?;
        (k.trim() == name).then(|| val.trim().to_string())
    })
}

mod system_tests {
    use super::*;

    #[tokio::test]
    async fn health_and_version_are_public() {
        let server = TestServer::start().await;

        let resp = server.http.get(server.url("/health")).send().await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let body: Value = resp.json().await.unwrap();
        assert_eq!(body["status"], "healthy");
        assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));

        let resp = server.http.get(server.url("/version")).send().await.unwrap();
        let body: Value = resp.json().await.unwrap();
        assert_eq!(body["name"], env!("CARGO_PKG_NAME"));
    }

    #[tokio::test]
    async fn unknown_route_and_wrong_method_are_json() {
        let server = TestServer::start().await;

        let resp = server.http.get(server.url("/nope")).send().await.unwrap();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
        let body: Value = resp.json().await.unwrap();
        assert_eq!(body["code"], "ROUTE_NOT_FOUND");

        let resp = server.http.put(server.url("/health")).send().await.unwrap();
        assert_eq!(resp.status(), StatusCode::METHOD_NOT_ALLOWED);
        let body: Value = resp.json().await.unwrap();
        assert_eq!(body["code"], "METHOD_NOT_ALLOWED");
    }

    #[tokio::test]
    async fn risk_reference_data() {
        let server = TestServer::start().await;
        let token = server.signup("risk@example.com").await;

        let factors: Vec<Value> = server.get(&token, "/risk/factors").await.json().await.unwrap();
        assert!(!factors.is_empty());
        assert!(factors.iter().all(|f| f["active"] == true));

        let outcomes: Vec<Value> = server
            .get(&token, "/risk/call-outcomes")
            .await
            .json()
            .await
            .unwrap();
        assert!(outcomes.iter().any(|o| o["key"] == "no_answer"));
    }

    #[tokio::test]
    async fn enrollment_extraction() {
        let server = TestServer::start().await;
        let token = server.signup("enroll@example.com").await;

        let resp = server
            .http
            .post(server.url("/enrollment/extract"))
            .header(AUTHORIZATION, format!("Bearer {}", token))
            .header(CONTENT_TYPE, "text/plain")
            .body("First Name: Ada\nLast Name: Byron\nMBI: 1EG4-TE5-MK73\n")
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let body: Value = resp.json().await.unwrap();
        assert_eq!(body["fields"]["name"], "Ada Byron");
        assert_eq!(body["fields"]["medicareId"], "1EG4TE5MK73");
        assert_eq!(body["matched"], 4);
    }
}

mod auth_tests {
    use super::*;

    #[tokio::test]
    async fn signup_login_me() {
        let server = TestServer::start().await;

        let resp = server
            .http
            .post(server.url("/auth/signup"))
            .json(&json!({"email": "New@Example.com", "password": "correct horse"}))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::CREATED);
        assert!(cookie_value(&resp, "irp_session").is_some());
        assert!(cookie_value(&resp, "irp_csrf").is_some());
        let body: Value = resp.json().await.unwrap();
        assert_eq!(body["user"]["email"], "new@example.com");
        assert!(body["user"].get("passwordHash").is_none());

        let resp = server
            .http
            .post(server.url("/auth/login"))
            .json(&json!({"email": "new@example.com", "password": "correct horse"}))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let body: Value = resp.json().await.unwrap();
        let token = body["token"].as_str().unwrap().to_string();

        let me: Value = server.get(&token, "/auth/me").await.json().await.unwrap();
        assert_eq!(me["email"], "new@example.com");
    }

    #[tokio::test]
    async fn signup_validation_and_conflicts() {
        let server = TestServer::start().await;
        server.signup("taken@example.com").await;

        let dup = server
            .http
            .post(server.url("/auth/signup"))
            .json(&json!({"email": "TAKEN@example.com", "password": "correct horse"}))
            .send()
            .await
            .unwrap();
        assert_eq!(dup.status(), StatusCode::CONFLICT);

        let short = server
            .http
            .post(server.url("/auth/signup"))
            .json(&json!({"email": "short@example.com", "password": "abc"}))
            .send()
            .await
            .unwrap();
        assert_eq!(short.status(), StatusCode::BAD_REQUEST);
        let body: Value = short.json().await.unwrap();
        assert_eq!(body["field"], "password");

        let missing = server
            .http
            .post(server.url("/auth/signup"))
            .json(&json!({"password": "correct horse"}))
            .send()
            .await
            .unwrap();
        assert_eq!(missing.status(), StatusCode::BAD_REQUEST);
        let body: Value = missing.json().await.unwrap();
        assert_eq!(body["code"], "MISSING_REQUIRED_FIELD");

        let malformed = server
            .http
            .post(server.url("/auth/signup"))
            .header(CONTENT_TYPE, "application/json")
            .body("{not json")
            .send()
            .await
            .unwrap();
        assert_eq!(malformed.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn bad_credentials_are_rejected() {
        let server = TestServer::start().await;
        server.signup("who@example.com").await;

        for (email, password) in [
            ("who@example.com", "wrong password"),
            ("nobody@example.com", "correct horse"),
        ] {
            let resp = server
                .http
                .post(server.url("/auth/login"))
                .json(&json!({"email": email, "password": password}))
                .send()
                .await
                .unwrap();
            assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
            let body: Value = resp.json().await.unwrap();
            assert_eq!(body["code"], "INVALID_CREDENTIALS");
        }
    }

    #[tokio::test]
    async fn protected_routes_need_a_valid_token() {
        let server = TestServer::start().await;

        let resp = server.http.get(server.url("/clients")).send().await.unwrap();
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

        let resp = server.get("not.a.token", "/clients").await;
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
        let body: Value = resp.json().await.unwrap();
        assert_eq!(body["code"], "UNAUTHORIZED");
    }

    #[tokio::test]
    async fn cookie_sessions_require_csrf_for_writes() {
        let server = TestServer::start().await;
        let resp = server
            .http
            .post(server.url("/auth/signup"))
            .json(&json!({"email": "cookie@example.com", "password": "correct horse"}))
            .send()
            .await
            .unwrap();
        let session = cookie_value(&resp, "irp_session").unwrap();
        let csrf = cookie_value(&resp, "irp_csrf").unwrap();
        let cookie = format!("irp_session={}; irp_csrf={}", session, csrf);

        // Reads only need the session cookie
        let resp = server
            .http
            .get(server.url("/clients"))
            .header("cookie", &cookie)
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);

        let resp = server
            .http
            .post(server.url("/clients"))
            .header("cookie", &cookie)
            .json(&json!({"name": "No CSRF"}))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::FORBIDDEN);

        let resp = server
            .http
            .post(server.url("/clients"))
            .header("cookie", &cookie)
            .header("x-csrf-token", "guess")
            .json(&json!({"name": "Wrong CSRF"}))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::FORBIDDEN);

        let resp = server
            .http
            .post(server.url("/clients"))
            .header("cookie", &cookie)
            .header("x-csrf-token", &csrf)
            .json(&json!({"name": "With CSRF"}))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::CREATED);
    }

    #[tokio::test]
    async fn logout_clears_cookies() {
        let server = TestServer::start().await;
        let resp = server
            .http
            .post(server.url("/auth/logout"))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::NO_CONTENT);
        assert_eq!(cookie_value(&resp, "irp_session").as_deref(), Some(""));
    }
}

mod client_tests {
    use super::*;

    #[tokio::test]
    async fn client_crud() {
        let server = TestServer::start().await;
        let token = server.signup("crud@example.com").await;

        let created = server.create_client(&token, "Ruth Baker").await;
        let id = created["id"].as_str().unwrap().to_string();
        assert_eq!(created["status"], "lead");
        assert_eq!(created["risk"], "unknown");

        let fetched: Value = server
            .get(&token, &format!("/clients/{}", id))
            .await
            .json()
            .await
            .unwrap();
        assert_eq!(fetched["name"], "Ruth Baker");

        let resp = server
            .http
            .patch(server.url(&format!("/clients/{}", id)))
            .header(AUTHORIZATION, format!("Bearer {}", token))
            .json(&json!({"status": "active", "phone": "555-0100"}))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let updated: Value = resp.json().await.unwrap();
        assert_eq!(updated["status"], "active");
        assert_eq!(updated["name"], "Ruth Baker");

        let list: Vec<Value> = server.get(&token, "/clients").await.json().await.unwrap();
        assert_eq!(list.len(), 1);

        let resp = server
            .http
            .delete(server.url(&format!("/clients/{}", id)))
            .header(AUTHORIZATION, format!("Bearer {}", token))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::NO_CONTENT);

        let resp = server.get(&token, &format!("/clients/{}", id)).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
        let body: Value = resp.json().await.unwrap();
        assert_eq!(body["code"], "CLIENT_NOT_FOUND");
    }

    #[tokio::test]
    async fn create_validates_input() {
        let server = TestServer::start().await;
        let token = server.signup("valid@example.com").await;

        let resp = server.post(&token, "/clients", json!({"phone": "1"})).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let body: Value = resp.json().await.unwrap();
        assert_eq!(body["field"], "name");

        let resp = server
            .post(&token, "/clients", json!({"name": "X", "email": "not-an-email"}))
            .await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        let resp = server
            .post(&token, "/clients", json!({"name": "X", "status": "vip"}))
            .await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn clients_are_isolated_between_users() {
        let server = TestServer::start().await;
        let alice = server.signup("alice@example.com").await;
        let bob = server.signup("bob@example.com").await;

        let created = server.create_client(&alice, "Alice's client").await;
        let id = created["id"].as_str().unwrap();

        let list: Vec<Value> = server.get(&bob, "/clients").await.json().await.unwrap();
        assert!(list.is_empty());
        assert_eq!(
            server.get(&bob, &format!("/clients/{}", id)).await.status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            server
                .post(&bob, &format!("/comms/{}", id), json!({"type": "note"}))
                .await
                .status(),
            StatusCode::NOT_FOUND
        );
    }

    #[tokio::test]
    async fn comms_are_logged_newest_first() {
        let server = TestServer::start().await;
        let token = server.signup("comms@example.com").await;
        let client = server.create_client(&token, "Talker").await;
        let path = format!("/comms/{}", client["id"].as_str().unwrap());

        let resp = server
            .post(&token, &path, json!({"type": "call", "direction": "outbound", "preview": "first"}))
            .await;
        assert_eq!(resp.status(), StatusCode::CREATED);
        let comm: Value = resp.json().await.unwrap();
        assert_eq!(comm["type"], "call");

        server
            .post(&token, &path, json!({"type": "sms", "preview": "second"}))
            .await;

        let comms: Vec<Value> = server.get(&token, &path).await.json().await.unwrap();
        assert_eq!(comms.len(), 2);
        assert_eq!(comms[0]["preview"], "second");
        assert_eq!(comms[1]["preview"], "first");

        let resp = server.post(&token, &path, json!({"preview": "no type"})).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn updating_unknown_client_is_not_found() {
        let server = TestServer::start().await;
        let token = server.signup("ghost@example.com").await;

        for method in [reqwest::Method::PUT, reqwest::Method::PATCH] {
            let resp = server
                .http
                .request(method, server.url("/clients/does-not-exist"))
                .header(AUTHORIZATION, format!("Bearer {}", token))
                .json(&json!({"name": "Nobody"}))
                .send()
                .await
                .unwrap();
            assert_eq!(resp.status(), StatusCode::NOT_FOUND);
            let body: Value = resp.json().await.unwrap();
            assert_eq!(body["code"], "CLIENT_NOT_FOUND");
        }
    }
}

mod task_tests {
    use super::*;

    #[tokio::test]
    async fn task_lifecycle() {
        let server = TestServer::start().await;
        let token = server.signup("tasks@example.com").await;
        let client = server.create_client(&token, "Follow me").await;
        let client_id = client["id"].as_str().unwrap();

        let resp = server
            .post(
                &token,
                "/tasks",
                json!({"title": "Call about renewal", "clientId": client_id, "dueAt": 1}),
            )
            .await;
        assert_eq!(resp.status(), StatusCode::CREATED);
        let task: Value = resp.json().await.unwrap();
        let id = task["id"].as_str().unwrap().to_string();
        assert_eq!(task["status"], "open");

        let resp = server
            .http
            .patch(server.url(&format!("/tasks/{}/complete", id)))
            .header(AUTHORIZATION, format!("Bearer {}", token))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let done: Value = resp.json().await.unwrap();
        assert_eq!(done["status"], "done");
        assert!(done["completedAt"].is_i64());

        let open: Vec<Value> = server
            .get(&token, "/tasks?status=open")
            .await
            .json()
            .await
            .unwrap();
        assert!(open.is_empty());

        let resp = server
            .http
            .patch(server.url(&format!("/tasks/{}/reopen", id)))
            .header(AUTHORIZATION, format!("Bearer {}", token))
            .send()
            .await
            .unwrap();
        let reopened: Value = resp.json().await.unwrap();
        assert_eq!(reopened["status"], "open");
        assert!(reopened.get("completedAt").is_none());

        let resp = server
            .http
            .delete(server.url(&format!("/tasks/{}", id)))
            .header(AUTHORIZATION, format!("Bearer {}", token))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::NO_CONTENT);
        assert_eq!(
            server.get(&token, &format!("/tasks/{}", id)).await.status(),
            StatusCode::NOT_FOUND
        );
    }

    #[tokio::test]
    async fn task_validation() {
        let server = TestServer::start().await;
        let token = server.signup("tv@example.com").await;

        let resp = server.post(&token, "/tasks", json!({"title": "  "})).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        let resp = server
            .post(&token, "/tasks", json!({"title": "x", "clientId": "missing"}))
            .await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
        let body: Value = resp.json().await.unwrap();
        assert_eq!(body["field"], "clientId");

        let resp = server.get(&token, "/tasks?status=someday").await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn deleting_a_client_removes_its_tasks() {
        let server = TestServer::start().await;
        let token = server.signup("cascade@example.com").await;
        let client = server.create_client(&token, "Gone soon").await;
        let client_id = client["id"].as_str().unwrap();

        server
            .post(&token, "/tasks", json!({"title": "t", "clientId": client_id}))
            .await;
        server.post(&token, "/tasks", json!({"title": "unrelated"})).await;

        server
            .http
            .delete(server.url(&format!("/clients/{}", client_id)))
            .header(AUTHORIZATION, format!("Bearer {}", token))
            .send()
            .await
            .unwrap();

        let tasks: Vec<Value> = server.get(&token, "/tasks").await.json().await.unwrap();
        assert_eq!(tasks.len(), 1);
        assert_eq!(tasks[0]["title"], "unrelated");
    }
}

mod file_tests {
    use super::*;

    #[tokio::test]
    async fn upload_download_delete() {
        let server = TestServer::start().await;
        let token = server.signup("files@example.com").await;
        let client = server.create_client(&token, "Paper trail").await;
        let client_id = client["id"].as_str().unwrap();

        let resp = server
            .http
            .post(server.url(&format!("/files/{}?name=soa.pdf", client_id)))
            .header(AUTHORIZATION, format!("Bearer {}", token))
            .header(CONTENT_TYPE, "application/pdf")
            .body(b"%PDF-1.4 test".to_vec())
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::CREATED);
        let upload: Value = resp.json().await.unwrap();
        let upload_id = upload["id"].as_str().unwrap().to_string();
        assert_eq!(upload["name"], "soa.pdf");
        assert_eq!(upload["size"], 13);

        let list: Vec<Value> = server
            .get(&token, &format!("/files/{}", client_id))
            .await
            .json()
            .await
            .unwrap();
        assert_eq!(list.len(), 1);

        let resp = server
            .get(&token, &format!("/files/{}/{}", client_id, upload_id))
            .await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(resp.headers()[CONTENT_TYPE], "application/pdf");
        assert_eq!(resp.bytes().await.unwrap().as_ref(), b"%PDF-1.4 test");

        let resp = server
            .http
            .delete(server.url(&format!("/files/{}/{}", client_id, upload_id)))
            .header(AUTHORIZATION, format!("Bearer {}", token))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::NO_CONTENT);
        assert_eq!(
            server
                .get(&token, &format!("/files/{}/{}", client_id, upload_id))
                .await
                .status(),
            StatusCode::NOT_FOUND
        );
    }

    #[tokio::test]
    async fn oversized_and_empty_uploads_are_rejected() {
        let server = TestServer::start().await;
        let token = server.signup("big@example.com").await;
        let client = server.create_client(&token, "Big").await;
        let path = format!("/files/{}?name=big.bin", client["id"].as_str().unwrap());

        let resp = server
            .http
            .post(server.url(&path))
            .header(AUTHORIZATION, format!("Bearer {}", token))
            .body(vec![0u8; MAX_UPLOAD * 2])
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::PAYLOAD_TOO_LARGE);

        let resp = server
            .http
            .post(server.url(&path))
            .header(AUTHORIZATION, format!("Bearer {}", token))
            .body(Vec::new())
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn malformed_query_is_a_json_error() {
        let server = TestServer::start().await;
        let token = server.signup("query@example.com").await;
        let client = server.create_client(&token, "Q").await;

        let resp = server
            .http
            .post(server.url(&format!(
                "/files/{}?name=a.pdf&name=b.pdf",
                client["id"].as_str().unwrap()
            )))
            .header(AUTHORIZATION, format!("Bearer {}", token))
            .body(b"data".to_vec())
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let body: Value = resp.json().await.unwrap();
        assert_eq!(body["code"], "INVALID_BODY");
    }
}

mod json_backend_tests {
    use super::*;

    #[tokio::test]
    async fn clients_comms_and_uploads() {
        let server = TestServer::start_with(StorageBackend::Json).await;
        let token = server.signup("json@example.com").await;

        let created = server.create_client(&token, "File Backed").await;
        let id = created["id"].as_str().unwrap().to_string();

        let resp = server
            .http
            .put(server.url(&format!("/clients/{}", id)))
            .header(AUTHORIZATION, format!("Bearer {}", token))
            .json(&json!({"risk": "high", "tags": ["t65"]}))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let updated: Value = resp.json().await.unwrap();
        assert_eq!(updated["risk"], "high");
        assert_eq!(updated["tags"], json!(["t65"]));

        let comms_path = format!("/comms/{}", id);
        for preview in ["first", "second"] {
            let resp = server
                .post(&token, &comms_path, json!({"type": "note", "preview": preview}))
                .await;
            assert_eq!(resp.status(), StatusCode::CREATED);
        }
        let comms: Vec<Value> = server.get(&token, &comms_path).await.json().await.unwrap();
        assert_eq!(comms.len(), 2);
        assert_eq!(comms[0]["preview"], "second");

        let resp = server
            .http
            .post(server.url(&format!("/files/{}?name=card.png", id)))
            .header(AUTHORIZATION, format!("Bearer {}", token))
            .header(CONTENT_TYPE, "image/png")
            .body(b"png bytes".to_vec())
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::CREATED);
        let upload: Value = resp.json().await.unwrap();
        let upload_id = upload["id"].as_str().unwrap();

        let resp = server
            .get(&token, &format!("/files/{}/{}", id, upload_id))
            .await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(resp.bytes().await.unwrap().as_ref(), b"png bytes");

        let fetched: Value = server
            .get(&token, &format!("/clients/{}", id))
            .await
            .json()
            .await
            .unwrap();
        assert_eq!(fetched["uploads"].as_array().unwrap().len(), 1);
        assert_eq!(fetched["comms"].as_array().unwrap().len(), 2);

        let other = server.signup("json-other@example.com").await;
        let resp = server.get(&other, &format!("/clients/{}", id)).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);

        let resp = server
            .http
            .delete(server.url(&format!("/clients/{}", id)))
            .header(AUTHORIZATION, format!("Bearer {}", token))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::NO_CONTENT);
        let list: Vec<Value> = server.get(&token, "/clients").await.json().await.unwrap();
        assert!(list.is_empty());
    }
}

mod dashboard_tests {
    use super::*;

    #[tokio::test]
    async fn summary_counts_the_callers_data() {
        let server = TestServer::start().await;
        let token = server.signup("dash@example.com").await;
        let other = server.signup("other@example.com").await;

        let client = server.create_client(&token, "One").await;
        server
            .post(
                &token,
                &format!("/comms/{}", client["id"].as_str().unwrap()),
                json!({"type": "email"}),
            )
            .await;
        server.post(&token, "/tasks", json!({"title": "late", "dueAt": 1})).await;
        server.create_client(&other, "Not mine").await;

        let summary: Value = server
            .get(&token, "/dashboard/summary")
            .await
            .json()
            .await
            .unwrap();
        assert_eq!(summary["totalClients"], 1);
        assert_eq!(summary["byStatus"]["lead"], 1);
        assert_eq!(summary["byStatus"]["churned"], 0);
        assert_eq!(summary["byRisk"]["unknown"], 1);
        assert_eq!(summary["openTasks"], 1);
        assert_eq!(summary["overdueTasks"], 1);
        assert_eq!(summary["commsLast7Days"], 1);
    }
}
