use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::{
    body::{to_bytes, Body},
    http::{header, Method, Request, StatusCode},
    Router,
};
use lopdf::{
    content::{Content, Operation},
    dictionary, Document, Object, Stream,
};
use serde_json::{json, Value};
use tempfile::TempDir;
use tower::ServiceExt;
use uuid::Uuid;

use finance_tracker::{
    ai::{AiError, GenerativeModel, Part},
    config::Config,
    create_router,
    store::{MemoryStore, Store},
    AppState,
};

const BOUNDARY: &str = "test-boundary-7MA4YWxkTrZu0gW";

struct StubModel {
    reply: String,
    calls: Mutex<usize>,
}

#[async_trait]
impl GenerativeModel for StubModel {
    async fn generate(&self, _parts: Vec<Part>) -> Result<String, AiError> {
        *self.calls.lock().unwrap() += 1;
        Ok(self.reply.clone())
    }
}

struct TestApp {
    router: Router,
    store: Arc<MemoryStore>,
    upload_dir: TempDir,
}

impl TestApp {
    fn new(model: Option<Arc<dyn GenerativeModel>>) -> Self {
        let upload_dir = tempfile::tempdir().unwrap();
        let upload_path = upload_dir.path().to_string_lossy().to_string();
        let config = Config::from_lookup(|name| match name {
            "STORAGE_BACKEND" => Some("memory".to_string()),
            "JWT_SECRET" => Some("test-secret".to_string()),
            "BCRYPT_COST" => Some("4".to_string()),
            "MAX_UPLOAD_BYTES" => Some("4096".to_string()),
            "UPLOAD_DIR" => Some(upload_path.clone()),
            _ => None,
        })
        .unwrap();

        let store = Arc::new(MemoryStore::new());
        let router = create_router(AppState::new(store.clone(), config, model));
        Self { router, store, upload_dir }
    }

    async fn send(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        // Extractor rejections answer in plain text.
        let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, body)
    }

    async fn json(&self, method: Method, uri: &str, token: Option<&str>, body: Option<Value>) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string())),
            None => builder.body(Body::empty()),
        };
        self.send(request.unwrap()).await
    }

    async fn upload(&self, uri: &str, token: &str, field: &str, file_name: &str, mime: &str, data: &[u8]) -> (StatusCode, Value) {
        let request = Request::builder()
            .method(Method::POST)
            .uri(uri)
            .header(header::AUTHORIZATION, format!("Bearer {}", token))
            .header(header::CONTENT_TYPE, format!("multipart/form-data; boundary={}", BOUNDARY))
            .body(Body::from(multipart_body(field, file_name, mime, data)))
            .unwrap();
        self.send(request).await
    }

    async fn register(&self, name: &str, email: &str) -> String {
        let (status, body) = self
            .json(
                Method::POST,
                "/api/auth/register",
                None,
                Some(json!({ "name": name, "email": email, "password": "secret123" })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "{}", body);
        body["token"].as_str().unwrap().to_string()
    }

    fn leftover_uploads(&self) -> usize {
        std::fs::read_dir(self.upload_dir.path()).map(|dir| dir.count()).unwrap_or(0)
    }
}

fn multipart_body(field: &str, file_name: &str, mime: &str, data: &[u8]) -> Vec<u8> {
    let mut body = Vec::new();
    body.extend_from_slice(
        format!(
            "--{b}\r\nContent-Disposition: form-data; name=\"{field}\"; filename=\"{file}\"\r\nContent-Type: {mime}\r\n\r\n",
            b = BOUNDARY,
            field = field,
            file = file_name,
            mime = mime,
        )
        .as_bytes(),
    );
    body.extend_from_slice(data);
    body.extend_from_slice(format!("\r\n--{}--\r\n", BOUNDARY).as_bytes());
    body
}

/// A one-page PDF whose text layer holds `lines`, one text object per line.
fn pdf_with_lines(lines: &[&str]) -> Vec<u8> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Courier",
    });
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! { "F1" => font_id },
    });

    let mut operations = Vec::new();
    for (i, line) in lines.iter().enumerate() {
        operations.push(Operation::new("BT", vec![]));
        operations.push(Operation::new("Tf", vec!["F1".into(), 12.into()]));
        operations.push(Operation::new("Td", vec![50.into(), (780 - 16 * i as i64).into()]));
        operations.push(Operation::new("Tj", vec![Object::string_literal(*line)]));
        operations.push(Operation::new("ET", vec![]));
    }
    let content = Content { operations };
    let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode().unwrap()));
    let page_id = doc.add_object(dictionary! {
        "Type" => "Page",
        "Parent" => pages_id,
        "Contents" => content_id,
        "Resources" => resources_id,
        "MediaBox" => vec![0.into(), 0.into(), 595.into(), 842.into()],
    });
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => vec![page_id.into()],
            "Count" => 1,
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut bytes = Vec::new();
    doc.save_to(&mut bytes).unwrap();
    bytes
}

#[tokio::test]
async fn health_is_public() {
    let app = TestApp::new(None);
    let (status, body) = app.json(Method::GET, "/api/health", None, None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "OK");
    assert!(body["timestamp"].is_string());
}

#[tokio::test]
async fn register_and_login() {
    let app = TestApp::new(None);
    app.register("Asha", "asha@example.com").await;

    let (status, body) = app
        .json(
            Method::POST,
            "/api/auth/register",
            None,
            Some(json!({ "name": "Asha", "email": "ASHA@example.com", "password": "secret123" })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "User already exists");

    let (status, body) = app
        .json(
            Method::POST,
            "/api/auth/login",
            None,
            Some(json!({ "email": "asha@example.com", "password": "wrong-password" })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Invalid email or password");

    let (status, body) = app
        .json(
            Method::POST,
            "/api/auth/login",
            None,
            Some(json!({ "email": "asha@example.com", "password": "secret123" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    let token = body["token"].as_str().unwrap();

    let (status, profile) = app.json(Method::GET, "/api/users/profile", Some(token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(profile["name"], "Asha");
    assert!(profile.get("passwordHash").is_none());
}

#[tokio::test]
async fn registration_is_validated() {
    let app = TestApp::new(None);
    let (status, _) = app
        .json(
            Method::POST,
            "/api/auth/register",
            None,
            Some(json!({ "name": "Asha", "email": "asha@example.com", "password": "123" })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn protected_routes_need_a_valid_token() {
    let app = TestApp::new(None);

    let (status, body) = app.json(Method::GET, "/api/transactions", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["message"], "No token, authorization denied");

    let (status, body) = app.json(Method::GET, "/api/transactions", Some("garbage"), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["message"], "Token is not valid");
}

#[tokio::test]
async fn transactions_belong_to_their_creator() {
    let app = TestApp::new(None);
    let owner = app.register("Owner", "owner@example.com").await;
    let other = app.register("Other", "other@example.com").await;

    let (status, created) = app
        .json(
            Method::POST,
            "/api/transactions",
            Some(&owner),
            Some(json!({
                "type": "expense",
                "category": "Food",
                "amount": 249.5,
                "date": "2025-08-01",
                "description": "Dinner"
            })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["type"], "expense");
    assert_eq!(created["amount"], 249.5);
    assert_eq!(created["date"], "2025-08-01");
    let id = created["id"].as_str().unwrap().to_string();
    let uri = format!("/api/transactions/{}", id);

    let (_, listed) = app.json(Method::GET, "/api/transactions", Some(&owner), None).await;
    assert_eq!(listed.as_array().unwrap().len(), 1);
    assert_eq!(listed[0]["id"], id.as_str());

    let (_, listed) = app.json(Method::GET, "/api/transactions", Some(&other), None).await;
    assert!(listed.as_array().unwrap().is_empty());

    let (status, _) = app
        .json(Method::PUT, &uri, Some(&other), Some(json!({ "amount": 1 })))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = app.json(Method::DELETE, &uri, Some(&other), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (_, listed) = app.json(Method::GET, "/api/transactions", Some(&owner), None).await;
    assert_eq!(listed[0]["amount"], 249.5);
}

#[tokio::test]
async fn update_changes_only_supplied_fields_and_delete_removes() {
    let app = TestApp::new(None);
    let token = app.register("Asha", "asha@example.com").await;

    let (_, created) = app
        .json(
            Method::POST,
            "/api/transactions",
            Some(&token),
            Some(json!({ "type": "expense", "category": "Transport", "amount": 80, "date": "2025-08-03" })),
        )
        .await;
    let uri = format!("/api/transactions/{}", created["id"].as_str().unwrap());

    let (status, body) = app
        .json(Method::PUT, &uri, Some(&token), Some(json!({ "amount": 120.75 })))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Transaction updated successfully");
    assert_eq!(body["transaction"]["amount"], 120.75);
    assert_eq!(body["transaction"]["category"], "Transport");
    assert_eq!(body["transaction"]["date"], "2025-08-03");
    assert_eq!(body["transaction"]["type"], "expense");

    let (status, _) = app
        .json(Method::PUT, &uri, Some(&token), Some(json!({ "amount": -5 })))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (_, body) = app
        .json(Method::PUT, &uri, Some(&token), Some(json!({ "description": "  Airport cab  " })))
        .await;
    assert_eq!(body["transaction"]["description"], "Airport cab");
    let (_, body) = app
        .json(Method::PUT, &uri, Some(&token), Some(json!({ "description": "" })))
        .await;
    assert!(body["transaction"]["description"].is_null());

    let (status, body) = app.json(Method::DELETE, &uri, Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Transaction deleted successfully");

    let (_, listed) = app.json(Method::GET, "/api/transactions", Some(&token), None).await;
    assert!(listed.as_array().unwrap().is_empty());

    let (status, _) = app.json(Method::DELETE, &uri, Some(&token), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn invalid_transactions_are_rejected() {
    let app = TestApp::new(None);
    let token = app.register("Asha", "asha@example.com").await;

    for body in [
        json!({ "type": "expense", "category": "Food", "amount": 0 }),
        json!({ "type": "expense", "category": "  ", "amount": 10 }),
    ] {
        let (status, _) = app.json(Method::POST, "/api/transactions", Some(&token), Some(body)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    let (status, _) = app
        .json(
            Method::POST,
            "/api/transactions",
            Some(&token),
            Some(json!({ "type": "gift", "category": "Food", "amount": 10 })),
        )
        .await;
    assert!(status.is_client_error());
}

#[tokio::test]
async fn amounts_are_stored_to_cents_within_range() {
    let app = TestApp::new(None);
    let token = app.register("Asha", "asha@example.com").await;

    for amount in [json!(5e28), json!(1e12), json!(0.001)] {
        let (status, body) = app
            .json(
                Method::POST,
                "/api/transactions",
                Some(&token),
                Some(json!({ "type": "expense", "category": "Rent", "amount": amount })),
            )
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{} -> {}", amount, body);
    }

    let (status, created) = app
        .json(
            Method::POST,
            "/api/transactions",
            Some(&token),
            Some(json!({ "type": "income", "category": "Interest", "amount": 12.345 })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["amount"], 12.35);

    let uri = format!("/api/transactions/{}", created["id"].as_str().unwrap());
    let (status, _) = app
        .json(Method::PUT, &uri, Some(&token), Some(json!({ "amount": 0.004 })))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    for _ in 0..2 {
        let (status, _) = app
            .json(
                Method::POST,
                "/api/transactions",
                Some(&token),
                Some(json!({ "type": "expense", "category": "Rent", "amount": 999_999_999_999.99_f64 })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED);
    }

    let (status, categories) = app.json(Method::GET, "/api/analytics/categories", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(categories[0]["category"], "Rent");
    assert_eq!(categories[0]["percentage"], 100);
    for uri in ["/api/analytics/summary", "/api/analytics/monthly", "/api/analytics/insights"] {
        let (status, _) = app.json(Method::GET, uri, Some(&token), None).await;
        assert_eq!(status, StatusCode::OK, "{}", uri);
    }
}

#[tokio::test]
async fn deleting_the_account_removes_its_transactions() {
    let app = TestApp::new(None);
    let token = app.register("Asha", "asha@example.com").await;
    app.json(
        Method::POST,
        "/api/transactions",
        Some(&token),
        Some(json!({ "type": "income", "category": "Salary", "amount": 50000 })),
    )
    .await;

    let (_, profile) = app.json(Method::GET, "/api/users/profile", Some(&token), None).await;
    let user_id = Uuid::parse_str(profile["id"].as_str().unwrap()).unwrap();
    assert_eq!(app.store.list_transactions(user_id).await.unwrap().len(), 1);

    let (status, _) = app.json(Method::DELETE, "/api/users/profile", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);

    assert!(app.store.list_transactions(user_id).await.unwrap().is_empty());
    let (status, _) = app.json(Method::GET, "/api/users/profile", Some(&token), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn profile_updates_respect_unique_emails() {
    let app = TestApp::new(None);
    let token = app.register("Asha", "asha@example.com").await;
    app.register("Ravi", "ravi@example.com").await;

    let (status, body) = app
        .json(Method::PUT, "/api/users/profile", Some(&token), Some(json!({ "email": "ravi@example.com" })))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "User already exists");

    let (status, body) = app
        .json(Method::PUT, "/api/users/profile", Some(&token), Some(json!({ "name": "Asha K" })))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["name"], "Asha K");
    assert_eq!(body["email"], "asha@example.com");
}

#[tokio::test]
async fn analytics_aggregate_the_callers_transactions() {
    let app = TestApp::new(None);
    let token = app.register("Asha", "asha@example.com").await;
    let today = chrono::Utc::now().date_naive().format("%Y-%m-%d").to_string();

    for (kind, category, amount) in [
        ("income", "Salary", 1000.0),
        ("expense", "Food", 300.0),
        ("expense", "Food", 150.0),
        ("expense", "Bills", 150.0),
    ] {
        let (status, _) = app
            .json(
                Method::POST,
                "/api/transactions",
                Some(&token),
                Some(json!({ "type": kind, "category": category, "amount": amount, "date": today })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED);
    }

    let (status, summary) = app.json(Method::GET, "/api/analytics/summary", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(summary["totalIncome"], 1000.0);
    assert_eq!(summary["totalExpenses"], 600.0);
    assert_eq!(summary["balance"], 400.0);
    assert_eq!(summary["savingsRate"], 40.0);
    assert_eq!(summary["transactionCount"], 4);
    assert_eq!(summary["recentTransactions"].as_array().unwrap().len(), 4);

    let (_, categories) = app.json(Method::GET, "/api/analytics/categories", Some(&token), None).await;
    assert_eq!(
        categories,
        json!([
            { "category": "Food", "amount": 450.0, "percentage": 75 },
            { "category": "Bills", "amount": 150.0, "percentage": 25 },
        ])
    );

    let (_, monthly) = app.json(Method::GET, "/api/analytics/monthly", Some(&token), None).await;
    assert_eq!(monthly.as_array().unwrap().len(), 1);
    assert_eq!(monthly[0]["savings"], 400.0);

    let (status, _) = app
        .json(Method::GET, "/api/analytics/monthly?months=0", Some(&token), None)
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (_, insights) = app.json(Method::GET, "/api/analytics/insights", Some(&token), None).await;
    assert_eq!(insights["anomalies"], "Normal transaction activity.");
    assert_eq!(insights["categoryBreakdown"]["Food"], 75);

    let other = app.register("Ravi", "ravi@example.com").await;
    let (_, categories) = app.json(Method::GET, "/api/analytics/categories", Some(&other), None).await;
    assert_eq!(categories, json!([]));
}

#[tokio::test]
async fn receipt_pdf_is_read_locally_and_cleaned_up() {
    let app = TestApp::new(None);
    let token = app.register("Asha", "asha@example.com").await;
    let pdf = pdf_with_lines(&[
        "Apollo Pharmacy",
        "Date: 15/07/2025",
        "Paracetamol 45.00",
        "Total 45.00",
        "Printed on 2025-09-01",
    ]);

    let (status, body) = app
        .upload("/api/transactions/upload-receipt", &token, "receipt", "receipt.pdf", "application/pdf", &pdf)
        .await;
    assert_eq!(status, StatusCode::OK, "{}", body);
    assert_eq!(body["merchant"], "Apollo Pharmacy");
    assert_eq!(body["amount"], 45.0);
    assert_eq!(body["date"], "2025-07-15");
    assert_eq!(body["suggestedCategory"], "Healthcare");
    assert_eq!(body["success"], true);
    assert_eq!(app.leftover_uploads(), 0);
}

#[tokio::test]
async fn unreadable_pdf_is_a_bad_request_and_cleaned_up() {
    let app = TestApp::new(None);
    let token = app.register("Asha", "asha@example.com").await;

    let (status, _) = app
        .upload("/api/transactions/upload-receipt", &token, "receipt", "broken.pdf", "application/pdf", b"not a pdf")
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(app.leftover_uploads(), 0);
}

#[tokio::test]
async fn uploads_are_checked_for_type_and_size() {
    let app = TestApp::new(None);
    let token = app.register("Asha", "asha@example.com").await;

    let (status, body) = app
        .upload("/api/transactions/upload-receipt", &token, "receipt", "notes.txt", "text/plain", b"hello")
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["message"].as_str().unwrap().starts_with("Unsupported file type"));

    let too_big = vec![b'x'; 5000];
    let (status, _) = app
        .upload("/api/transactions/upload-receipt", &token, "receipt", "big.png", "image/png", &too_big)
        .await;
    assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);

    let (status, body) = app
        .upload("/api/transactions/upload-receipt", &token, "other", "r.png", "image/png", b"png")
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "No file uploaded");
    assert_eq!(app.leftover_uploads(), 0);
}

#[tokio::test]
async fn bodies_over_the_router_limit_are_too_large() {
    let app = TestApp::new(None);
    let token = app.register("Asha", "asha@example.com").await;

    let huge = vec![b'x'; 100_000];
    let (status, body) = app
        .upload("/api/transactions/upload-receipt", &token, "receipt", "huge.png", "image/png", &huge)
        .await;
    assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE, "{}", body);
    assert_eq!(body["message"], "File too large. Maximum size is 4096 bytes");
    assert_eq!(app.leftover_uploads(), 0);
}

#[cfg(not(feature = "ocr"))]
#[tokio::test]
async fn image_receipts_need_ocr_support() {
    let app = TestApp::new(None);
    let token = app.register("Asha", "asha@example.com").await;

    let (status, _) = app
        .upload("/api/transactions/upload-receipt", &token, "receipt", "receipt.png", "image/png", b"png bytes")
        .await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(app.leftover_uploads(), 0);
}

#[tokio::test]
async fn statement_history_is_split_into_lines() {
    let app = TestApp::new(None);
    let token = app.register("Asha", "asha@example.com").await;
    let pdf = pdf_with_lines(&[
        "Date Category Amount Description",
        "2025-08-01 Food 249.50 Dinner out",
        "2025-08-02 Transport 80 Metro card",
    ]);

    let (status, body) = app
        .upload("/api/transactions/upload-history", &token, "history", "statement.pdf", "application/pdf", &pdf)
        .await;
    assert_eq!(status, StatusCode::OK, "{}", body);
    let lines = body["extractedTransactions"].as_array().unwrap();
    assert_eq!(lines.len(), 2);
    assert_eq!(lines[0]["category"], "Food");
    assert_eq!(lines[0]["amount"], 249.5);
    assert_eq!(lines[1]["description"], "Metro card");
    assert_eq!(app.leftover_uploads(), 0);
}

#[tokio::test]
async fn hosted_model_reads_receipts() {
    let model = Arc::new(StubModel {
        reply: r#"```json
{"merchant": "Cafe Coffee Day", "amount": 340, "date": "31-Aug-2025", "category": "Food", "extractedText": "CCD"}
```"#
            .to_string(),
        calls: Mutex::new(0),
    });
    let shared: Arc<dyn GenerativeModel> = model.clone();
    let app = TestApp::new(Some(shared));
    let token = app.register("Asha", "asha@example.com").await;

    let (status, body) = app
        .upload("/api/ai/analyze-receipt", &token, "receipt", "bill.jpg", "image/jpeg", b"jpeg bytes")
        .await;
    assert_eq!(status, StatusCode::OK, "{}", body);
    assert_eq!(body["merchant"], "Cafe Coffee Day");
    assert_eq!(body["amount"], 340.0);
    assert_eq!(body["date"], "2025-08-31");
    assert_eq!(body["suggestedCategory"], "Food");
    assert_eq!(body["confidence"], 0.9);
    assert_eq!(*model.calls.lock().unwrap(), 1);
    assert_eq!(app.leftover_uploads(), 0);
}

#[tokio::test]
async fn transaction_analysis_needs_a_model() {
    let app = TestApp::new(None);
    let token = app.register("Asha", "asha@example.com").await;
    let (status, _) = app
        .json(Method::POST, "/api/ai/analyze", Some(&token), Some(json!({ "transaction": { "amount": 10 } })))
        .await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);

    let model: Arc<dyn GenerativeModel> = Arc::new(StubModel {
        reply: "Category: Food\nTrend: more eating out\nAnomaly: none".to_string(),
        calls: Mutex::new(0),
    });
    let app = TestApp::new(Some(model));
    let token = app.register("Asha", "asha@example.com").await;
    let (status, body) = app
        .json(Method::POST, "/api/ai/analyze", Some(&token), Some(json!({ "transaction": { "amount": 10 } })))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["suggestedCategory"], "Food");
    assert_eq!(body["trends"], json!(["more eating out"]));
    assert!(body.get("parsedReceipt").is_none());
}
