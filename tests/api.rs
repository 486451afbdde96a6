//! End-to-end tests driving the full router against the in-memory store.

use std::sync::Arc;

use axum::body::{to_bytes, Body};
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use tokio::sync::Mutex;
use tower::ServiceExt;

use voiceagent::api::{create_router, AppState};
use voiceagent::config::Config;
use voiceagent::error::MailError;
use voiceagent::security::compute_twilio_signature;
use voiceagent::services::Mailer;
use voiceagent::store::MemoryStore;

const SECRET: &str = "integration-secret-0123456789abcdef";
const PASSWORD: &str = "correct-horse-battery";
const WEBHOOK_PATH: &str = "/api/v1/voice/webhook/call-events";

/// Mailer keeping every link it was asked to send.
#[derive(Default)]
struct RecordingMailer {
    links: Mutex<Vec<(String, String)>>,
}

impl RecordingMailer {
    async fn token_for(&self, email: &str) -> String {
        let links = self.links.lock().await;
        let (_, link) = links
            .iter()
            .rev()
            .find(|(to, _)| to == email)
            .expect("a mail was sent to this address");
        link.split("token=").nth(1).expect("link carries a token").to_string()
    }
}

#[async_trait::async_trait]
impl Mailer for RecordingMailer {
    async fn send_invite(&self, to: &str, _tenant_name: &str, link: &str) -> Result<(), MailError> {
        self.links.lock().await.push((to.to_string(), link.to_string()));
        Ok(())
    }

    async fn send_password_reset(&self, to: &str, link: &str) -> Result<(), MailError> {
        self.links.lock().await.push((to.to_string(), link.to_string()));
        Ok(())
    }
}

struct TestApp {
    router: Router,
    mailer: Arc<RecordingMailer>,
}

impl TestApp {
    fn new() -> Self {
        Self::with_config(Config::with_secret(SECRET))
    }

    fn with_config(config: Config) -> Self {
        let mailer = Arc::new(RecordingMailer::default());
        let state = AppState::new(
            Arc::new(config),
            Arc::new(MemoryStore::new()),
            mailer.clone(),
        );
        state.set_ready(true);
        Self {
            router: create_router(state),
            mailer,
        }
    }

    async fn send(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };
        (status, value)
    }

    /// Send `body` verbatim, for payloads that are not valid JSON.
    async fn send_raw(&self, method: Method, uri: &str, token: &str, body: &str) -> (StatusCode, Value) {
        let request = Request::builder()
            .method(method)
            .uri(uri)
            .header(header::AUTHORIZATION, format!("Bearer {token}"))
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap();
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
    }

    async fn get(&self, uri: &str, token: &str) -> (StatusCode, Value) {
        self.send(Method::GET, uri, Some(token), None).await
    }

    async fn post(&self, uri: &str, token: Option<&str>, body: Value) -> (StatusCode, Value) {
        self.send(Method::POST, uri, token, Some(body)).await
    }

    async fn webhook(&self, params: &[(&str, &str)], signature: Option<&str>) -> (StatusCode, String) {
        let form = url::form_urlencoded::Serializer::new(String::new())
            .extend_pairs(params.iter())
            .finish();
        let mut builder = Request::builder()
            .method(Method::POST)
            .uri(WEBHOOK_PATH)
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded");
        if let Some(signature) = signature {
            builder = builder.header("x-twilio-signature", signature);
        }
        let response = self
            .router
            .clone()
            .oneshot(builder.body(Body::from(form)).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, String::from_utf8(bytes.to_vec()).unwrap())
    }

    /// Register a user and return their access token.
    async fn register(&self, email: &str) -> String {
        let (status, body) = self
            .post(
                "/api/v1/auth/register",
                None,
                json!({
                    "first_name": "Test",
                    "last_name": "User",
                    "email": email,
                    "password": PASSWORD,
                }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "register failed: {body}");
        body["data"]["access_token"].as_str().unwrap().to_string()
    }

    /// Create a tenant and return `(tenant_id, access token scoped to it)`.
    async fn create_tenant(&self, token: &str, name: &str) -> (String, String) {
        let (status, body) = self
            .post("/api/v1/tenants", Some(token), json!({ "name": name }))
            .await;
        assert_eq!(status, StatusCode::CREATED, "tenant failed: {body}");
        let tenant_id = body["data"]["tenant_id"].as_str().unwrap().to_string();

        let (status, body) = self
            .post(
                "/api/v1/auth/switch-tenant",
                Some(token),
                json!({ "tenant_id": tenant_id }),
            )
            .await;
        assert_eq!(status, StatusCode::OK);
        let scoped = body["data"]["access_token"].as_str().unwrap().to_string();
        (tenant_id, scoped)
    }

    /// Admin with a fresh tenant, returns the scoped token.
    async fn admin(&self, email: &str, tenant: &str) -> String {
        let token = self.register(email).await;
        self.create_tenant(&token, tenant).await.1
    }

    async fn create_agent(&self, token: &str, name: &str) -> String {
        let (status, body) = self
            .post("/api/v1/agents", Some(token), json!({ "name": name }))
            .await;
        assert_eq!(status, StatusCode::CREATED, "agent failed: {body}");
        body["data"]["id"].as_str().unwrap().to_string()
    }
}

#[tokio::test]
async fn health_and_root_use_the_envelope() {
    let app = TestApp::new();

    let (status, body) = app.send(Method::GET, "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body,
        json!({ "data": { "status": "ok" }, "message": "Service is healthy", "status_code": 200 })
    );

    let (status, body) = app.send(Method::GET, "/", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status_code"], 200);

    let (status, _) = app.send(Method::GET, "/ready", None, None).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn openapi_document_is_served() {
    let app = TestApp::new();
    let (status, body) = app
        .send(Method::GET, "/api/v1/openapi.json", None, None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["paths"]["/api/v1/agents"].is_object());
}

#[tokio::test]
async fn register_login_and_me() {
    let app = TestApp::new();
    app.register("ada@example.com").await;

    let (status, body) = app
        .post(
            "/api/v1/auth/register",
            None,
            json!({ "first_name": "A", "last_name": "B", "email": "ADA@example.com", "password": PASSWORD }),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "conflict");

    let (status, body) = app
        .post(
            "/api/v1/auth/login",
            None,
            json!({ "email": "ada@example.com", "password": "wrong-password" }),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["status_code"], 401);

    let (status, body) = app
        .post(
            "/api/v1/auth/login",
            None,
            json!({ "email": "ada@example.com", "password": PASSWORD }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["token_type"], "bearer");
    assert_eq!(body["data"]["tenant_id"], Value::Null);
    let token = body["data"]["access_token"].as_str().unwrap().to_string();

    let (status, body) = app.get("/api/v1/auth/me", &token).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["email"], "ada@example.com");
    assert!(body["data"].get("hashed_password").is_none());

    let (status, body) = app.get("/api/v1/auth/token-info", &token).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["type"], "access");
    assert_eq!(body["data"]["is_expired"], false);
}

#[tokio::test]
async fn missing_or_bad_tokens_are_unauthorized() {
    let app = TestApp::new();

    let (status, body) = app.send(Method::GET, "/api/v1/auth/me", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "unauthorized");

    let (status, _) = app.get("/api/v1/auth/me", "not-a-jwt").await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn refresh_rotates_and_detects_reuse() {
    let app = TestApp::new();
    app.register("rot@example.com").await;
    let (_, body) = app
        .post(
            "/api/v1/auth/login",
            None,
            json!({ "email": "rot@example.com", "password": PASSWORD }),
        )
        .await;
    let first = body["data"]["refresh_token"].as_str().unwrap().to_string();

    let (status, body) = app
        .post("/api/v1/auth/refresh", None, json!({ "refresh_token": first }))
        .await;
    assert_eq!(status, StatusCode::OK);
    let second = body["data"]["refresh_token"].as_str().unwrap().to_string();
    assert_ne!(first, second);

    // Replaying the rotated token burns the whole family.
    let (status, _) = app
        .post("/api/v1/auth/refresh", None, json!({ "refresh_token": first }))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = app
        .post("/api/v1/auth/refresh", None, json!({ "refresh_token": second }))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn logout_revokes_refresh_token() {
    let app = TestApp::new();
    let (_, body) = app
        .post(
            "/api/v1/auth/register",
            None,
            json!({ "first_name": "L", "last_name": "O", "email": "out@example.com", "password": PASSWORD }),
        )
        .await;
    let refresh = body["data"]["refresh_token"].as_str().unwrap().to_string();

    let (status, _) = app
        .post("/api/v1/auth/logout", None, json!({ "refresh_token": refresh }))
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = app
        .post("/api/v1/auth/refresh", None, json!({ "refresh_token": refresh }))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn password_reset_flow() {
    let app = TestApp::new();
    app.register("forgot@example.com").await;

    let (status, unknown) = app
        .post(
            "/api/v1/auth/forgot-password",
            None,
            json!({ "email": "nobody@example.com" }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, known) = app
        .post(
            "/api/v1/auth/forgot-password",
            None,
            json!({ "email": "forgot@example.com" }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(unknown["message"], known["message"]);

    let token = app.mailer.token_for("forgot@example.com").await;
    let (status, _) = app
        .post(
            "/api/v1/auth/reset-password",
            None,
            json!({ "token": token, "new_password": "a-brand-new-password" }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = app
        .post(
            "/api/v1/auth/reset-password",
            None,
            json!({ "token": token, "new_password": "another-password" }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "bad_request");

    let (status, _) = app
        .post(
            "/api/v1/auth/login",
            None,
            json!({ "email": "forgot@example.com", "password": "a-brand-new-password" }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn tenant_lifecycle() {
    let app = TestApp::new();
    let token = app.register("owner@example.com").await;

    // Tenant scoped endpoints need an active tenant.
    let (status, body) = app.get("/api/v1/agents", &token).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "User has no current tenant set");

    let (status, body) = app
        .post("/api/v1/tenants", Some(&token), json!({ "name": "Acme Corp!" }))
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["data"]["tenant"]["schema_name"], "acme_corp_schema");
    let tenant_id = body["data"]["tenant_id"].as_str().unwrap().to_string();

    let (status, _) = app
        .post("/api/v1/tenants", Some(&token), json!({ "name": "Acme Corp!" }))
        .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, body) = app.get("/api/v1/tenants", &token).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"][0]["role"], "admin");

    let (status, body) = app
        .get(&format!("/api/v1/tenants/{tenant_id}"), &token)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["name"], "Acme Corp!");

    let outsider = app.register("outsider@example.com").await;
    let (status, _) = app
        .get(&format!("/api/v1/tenants/{tenant_id}"), &outsider)
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, _) = app
        .post(
            "/api/v1/auth/switch-tenant",
            Some(&outsider),
            json!({ "tenant_id": tenant_id }),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = app
        .get(&format!("/api/v1/tenants/{}", uuid::Uuid::new_v4()), &token)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    // Login picks up the tenant as the active one.
    let (_, body) = app
        .post(
            "/api/v1/auth/login",
            None,
            json!({ "email": "owner@example.com", "password": PASSWORD }),
        )
        .await;
    assert_eq!(body["data"]["tenant_id"], tenant_id.as_str());
    assert_eq!(body["data"]["tenant_ids"], json!([tenant_id]));
}

#[tokio::test]
async fn invite_flow_adds_member() {
    let app = TestApp::new();
    let admin = app.admin("boss@example.com", "Invite Co").await;

    let (status, body) = app
        .post("/api/v1/invites", Some(&admin), json!({ "email": "New.Hire@Example.com" }))
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["data"]["email"], "new.hire@example.com");

    let (status, _) = app
        .post("/api/v1/invites", Some(&admin), json!({ "email": "new.hire@example.com" }))
        .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, _) = app
        .post("/api/v1/invites", Some(&admin), json!({ "email": "boss@example.com" }))
        .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let token = app.mailer.token_for("new.hire@example.com").await;

    let (status, _) = app
        .post("/api/v1/invites/accept", None, json!({ "token": token }))
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    let (status, body) = app
        .post(
            "/api/v1/invites/accept",
            None,
            json!({ "token": token, "password": PASSWORD }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["data"]["user"]["first_name"], "new.hire");
    assert_eq!(body["data"]["user"]["last_name"], "User");
    let member = body["data"]["tokens"]["access_token"].as_str().unwrap().to_string();

    let (status, _) = app
        .post(
            "/api/v1/invites/accept",
            None,
            json!({ "token": token, "password": PASSWORD }),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, body) = app.get("/api/v1/tenants/current/members", &member).await;
    assert_eq!(status, StatusCode::OK);
    let mut roles: Vec<String> = body["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|m| m["role"].as_str().unwrap().to_string())
        .collect();
    roles.sort();
    assert_eq!(roles, vec!["admin".to_string(), "member".to_string()]);

    // Members cannot administer.
    let (status, body) = app
        .post("/api/v1/invites", Some(&member), json!({ "email": "x@example.com" }))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "forbidden");
}

#[tokio::test]
async fn member_roles_and_last_admin() {
    let app = TestApp::new();
    let admin = app.admin("chief@example.com", "Roles Co").await;

    let (_, body) = app.get("/api/v1/auth/me", &admin).await;
    let admin_id = body["data"]["id"].as_str().unwrap().to_string();

    let (status, body) = app
        .send(
            Method::PUT,
            &format!("/api/v1/tenants/current/members/{admin_id}/role"),
            Some(&admin),
            Some(json!({ "role_name": "member" })),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT, "{body}");

    let (status, _) = app
        .send(
            Method::PUT,
            &format!("/api/v1/tenants/current/members/{}/role", uuid::Uuid::new_v4()),
            Some(&admin),
            Some(json!({ "role_name": "member" })),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn role_crud() {
    let app = TestApp::new();
    let admin = app.admin("roles@example.com", "Role Admin Co").await;

    let (status, body) = app
        .post(
            "/api/v1/roles",
            Some(&admin),
            json!({ "name": "supervisor", "description": "Listens in" }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    let role_id = body["data"]["id"].as_str().unwrap().to_string();

    let (status, _) = app
        .post("/api/v1/roles", Some(&admin), json!({ "name": "supervisor" }))
        .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, body) = app.get("/api/v1/roles", &admin).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"].as_array().unwrap().len(), 3);

    let (status, body) = app
        .send(
            Method::PUT,
            &format!("/api/v1/roles/{role_id}"),
            Some(&admin),
            Some(json!({ "name": "lead", "description": null })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["name"], "lead");

    let (status, _) = app
        .send(Method::DELETE, &format!("/api/v1/roles/{role_id}"), Some(&admin), None)
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = app.get(&format!("/api/v1/roles/{role_id}"), &admin).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn agents_are_paginated_and_tenant_isolated() {
    let app = TestApp::new();
    let admin = app.admin("agents@example.com", "Agents Co").await;

    for name in ["Sales Bot", "Support Bot", "Billing Helper"] {
        app.create_agent(&admin, name).await;
    }

    let (status, body) = app.get("/api/v1/agents?page=1&limit=2", &admin).await;
    assert_eq!(status, StatusCode::OK);
    let page = &body["data"];
    assert_eq!(page["total"], 3);
    assert_eq!(page["total_pages"], 2);
    assert_eq!(page["has_next"], true);
    assert_eq!(page["has_prev"], false);
    assert_eq!(page["data"][0]["name"], "Sales Bot");

    let (_, body) = app.get("/api/v1/agents?search=%20BOT%20", &admin).await;
    assert_eq!(body["data"]["total"], 2);

    let (status, _) = app.get("/api/v1/agents?limit=101", &admin).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    let (status, body) = app
        .get("/api/v1/agents?page=9223372036854775807&limit=100", &admin)
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"], "validation_error");

    let (status, body) = app.get("/api/v1/agents/search/helper", &admin).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"].as_array().unwrap().len(), 1);

    let (status, body) = app.get("/api/v1/agents/search/%20", &admin).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"], json!([]));

    let agent_id = app.create_agent(&admin, "Private Bot").await;
    let other = app.admin("rival@example.com", "Rival Co").await;
    let (status, _) = app.get(&format!("/api/v1/agents/{agent_id}"), &other).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    // An agent with call history is invisible to other tenants, not in conflict.
    let busy_id = app.create_agent(&admin, "Busy Bot").await;
    let (status, _) = app
        .post("/api/v1/calls/sessions", Some(&admin), json!({ "agent_id": busy_id }))
        .await;
    assert_eq!(status, StatusCode::CREATED);
    let (status, body) = app
        .send(Method::DELETE, &format!("/api/v1/agents/{busy_id}"), Some(&other), None)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND, "{body}");
    let (status, _) = app
        .send(Method::DELETE, &format!("/api/v1/agents/{busy_id}"), Some(&admin), None)
        .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, body) = app
        .send(
            Method::PUT,
            &format!("/api/v1/agents/{agent_id}"),
            Some(&admin),
            Some(json!({ "language": "en-US" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["name"], "Private Bot");
    assert_eq!(body["data"]["language"], "en-US");
    assert!(body["data"]["updated_at"].is_string());

    let (status, _) = app
        .send(Method::DELETE, &format!("/api/v1/agents/{agent_id}"), Some(&admin), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = app.get(&format!("/api/v1/agents/{agent_id}"), &admin).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn call_session_lifecycle() {
    let app = TestApp::new();
    let admin = app.admin("calls@example.com", "Calls Co").await;
    let agent_id = app.create_agent(&admin, "Receptionist").await;

    let (status, _) = app
        .post(
            "/api/v1/calls/sessions",
            Some(&admin),
            json!({ "agent_id": agent_id, "from_number": "5550100" }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app
        .post(
            "/api/v1/calls/sessions",
            Some(&admin),
            json!({ "agent_id": uuid::Uuid::new_v4() }),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, body) = app
        .post(
            "/api/v1/calls/sessions",
            Some(&admin),
            json!({ "agent_id": agent_id, "from_number": "+15550100", "to_number": "+15550199" }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["data"]["status"], "active");
    let session_id = body["data"]["id"].as_str().unwrap().to_string();
    let base = format!("/api/v1/calls/sessions/{session_id}");

    for (role, content, response_time) in [
        ("user", "Hi there", None),
        ("assistant", "Hello, how can I help?", Some(1.5)),
        ("assistant", "Anything else?", Some(0.5)),
    ] {
        let (status, _) = app
            .post(
                &format!("{base}/transcript"),
                Some(&admin),
                json!({ "role": role, "content": content, "response_time": response_time }),
            )
            .await;
        assert_eq!(status, StatusCode::OK);
    }

    let (status, body) = app.get(&format!("{base}/stats"), &admin).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["total_messages"], 3);
    assert_eq!(body["data"]["user_messages"], 1);
    assert_eq!(body["data"]["assistant_messages"], 2);
    assert_eq!(body["data"]["average_response_time"], 1.0);

    let (status, body) = app
        .send(
            Method::PATCH,
            &format!("{base}/status"),
            Some(&admin),
            Some(json!({ "status": "completed" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["status"], "completed");
    assert!(body["data"]["end_time"].is_string());
    assert!(body["data"]["duration"].is_number());

    let (status, body) = app
        .get("/api/v1/calls/sessions?status=completed", &admin)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["total"], 1);

    let (status, _) = app.get("/api/v1/calls/sessions?status=ringing", &admin).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app
        .get(&format!("/api/v1/calls/sessions/{}", uuid::Uuid::new_v4()), &admin)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn sessions_are_private_to_their_caller() {
    let app = TestApp::new();
    let admin = app.admin("privacy@example.com", "Privacy Co").await;
    let agent_id = app.create_agent(&admin, "Agent").await;
    let (_, body) = app
        .post("/api/v1/calls/sessions", Some(&admin), json!({ "agent_id": agent_id }))
        .await;
    let session_id = body["data"]["id"].as_str().unwrap().to_string();

    app.post("/api/v1/invites", Some(&admin), json!({ "email": "peer@example.com" }))
        .await;
    let token = app.mailer.token_for("peer@example.com").await;
    let (_, body) = app
        .post(
            "/api/v1/invites/accept",
            None,
            json!({ "token": token, "password": PASSWORD }),
        )
        .await;
    let peer = body["data"]["tokens"]["access_token"].as_str().unwrap().to_string();

    let (status, _) = app
        .get(&format!("/api/v1/calls/sessions/{session_id}"), &peer)
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (_, body) = app.get("/api/v1/calls/sessions", &peer).await;
    assert_eq!(body["data"]["total"], 0);
}

#[tokio::test]
async fn unsigned_webhook_updates_session() {
    let app = TestApp::new();
    let admin = app.admin("hooks@example.com", "Hooks Co").await;
    let agent_id = app.create_agent(&admin, "Agent").await;
    let (_, body) = app
        .post(
            "/api/v1/calls/sessions",
            Some(&admin),
            json!({ "agent_id": agent_id, "twilio_call_sid": "CA0001" }),
        )
        .await;
    let session_id = body["data"]["id"].as_str().unwrap().to_string();

    let (status, xml) = app
        .webhook(&[("CallSid", "CA0001"), ("CallStatus", "ringing")], None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert!(xml.contains("Thank you for answering our call."));

    let (status, xml) = app
        .webhook(
            &[("CallSid", "CA0001"), ("CallStatus", "completed"), ("CallDuration", "42")],
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert!(xml.ends_with("<Response/>"));

    let (_, body) = app
        .get(&format!("/api/v1/calls/sessions/{session_id}"), &admin)
        .await;
    assert_eq!(body["data"]["status"], "completed");
    assert_eq!(body["data"]["duration"], 42);

    // Unknown calls still get an answer.
    let (status, xml) = app
        .webhook(&[("CallSid", "CA9999"), ("CallStatus", "busy")], None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert!(xml.contains("Thank you for your call."));
}

#[tokio::test]
async fn signed_webhook_requires_valid_signature() {
    let mut config = Config::with_secret(SECRET);
    config.twilio_auth_token = Some("twilio-auth-token".to_string());
    config.public_base_url = Some("https://voice.example.com".to_string());
    let app = TestApp::with_config(config);

    let params = [("CallSid", "CA4242"), ("CallStatus", "in-progress")];

    let (status, _) = app.webhook(&params, None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = app.webhook(&params, Some("bm90LWEtc2lnbmF0dXJl")).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let owned: Vec<(String, String)> = params
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    let signature = compute_twilio_signature(
        "twilio-auth-token",
        &format!("https://voice.example.com{WEBHOOK_PATH}"),
        &owned,
    );
    let (status, xml) = app.webhook(&params, Some(&signature)).await;
    assert_eq!(status, StatusCode::OK);
    assert!(xml.contains("Your call is now connected."));
}

#[tokio::test]
async fn malformed_requests_use_the_error_envelope() {
    let app = TestApp::new();
    let admin = app.admin("envelope@example.com", "Envelope Co").await;

    let (status, body) = app
        .send_raw(Method::POST, "/api/v1/agents", &admin, "{\"name\": ")
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["status_code"], 400);
    assert_eq!(body["error"], "bad_request");
    assert!(body["message"].is_string());

    let (status, body) = app
        .send_raw(Method::POST, "/api/v1/agents", &admin, "{\"name\": 42}")
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"], "validation_error");

    let (status, body) = app.get("/api/v1/agents?page=abc", &admin).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "bad_request");

    let (status, body) = app.get("/api/v1/agents/not-a-uuid", &admin).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["status_code"], 400);
}
