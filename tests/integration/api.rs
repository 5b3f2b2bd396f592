//! In-process API tests: the full router against the in-memory store

use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    Router,
};
use chrono::{Duration, Utc};
use serde_json::{json, Value};
use tower::ServiceExt;

use biblio_server::{
    api,
    config::AppConfig,
    models::{
        loan::NewLoan,
        user::{Role, User},
    },
    repository::Repository,
    services::auth::hash_password,
    AppState,
};

const ADMIN_EMAIL: &str = "admin@biblio.test";
const ADMIN_PASSWORD: &str = "admin-password";

struct TestApp {
    router: Router,
    repository: Repository,
}

impl TestApp {
    async fn new() -> Self {
        let repository = Repository::in_memory();
        let admin = User::new(
            "Admin",
            ADMIN_EMAIL,
            Role::Admin,
            hash_password(ADMIN_PASSWORD).unwrap(),
        );
        repository.users.create(&admin).await.unwrap();

        let state = AppState::new(AppConfig::default(), repository.clone());
        Self {
            router: api::router(state),
            repository,
        }
    }

    async fn request(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(serde_json::to_vec(&body).unwrap()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };
        (status, value)
    }

    async fn get(&self, uri: &str, token: &str) -> (StatusCode, Value) {
        self.request(Method::GET, uri, Some(token), None).await
    }

    async fn post(&self, uri: &str, token: &str, body: Value) -> (StatusCode, Value) {
        self.request(Method::POST, uri, Some(token), Some(body)).await
    }

    async fn patch(&self, uri: &str, token: &str, body: Option<Value>) -> (StatusCode, Value) {
        self.request(Method::PATCH, uri, Some(token), body).await
    }

    async fn delete(&self, uri: &str, token: &str) -> (StatusCode, Value) {
        self.request(Method::DELETE, uri, Some(token), None).await
    }

    async fn admin_token(&self) -> String {
        let (status, body) = self
            .request(
                Method::POST,
                "/api/auth/login",
                None,
                Some(json!({ "email": ADMIN_EMAIL, "password": ADMIN_PASSWORD })),
            )
            .await;
        assert_eq!(status, StatusCode::OK);
        body["token"].as_str().unwrap().to_string()
    }

    /// Register a reader and return (token, user id)
    async fn register(&self, name: &str) -> (String, String) {
        let (status, body) = self
            .request(
                Method::POST,
                "/api/auth/register",
                None,
                Some(json!({
                    "name": name,
                    "email": format!("{}@biblio.test", name.to_lowercase()),
                    "password": "reader-password"
                })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "{}", body);
        (
            body["token"].as_str().unwrap().to_string(),
            body["user"]["id"].as_str().unwrap().to_string(),
        )
    }

    async fn create_book(&self, admin: &str, title: &str, copies: u32) -> String {
        let (status, body) = self
            .post(
                "/api/books",
                admin,
                json!({ "title": title, "author": "Ursula K. Le Guin", "copies": copies }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "{}", body);
        body["id"].as_str().unwrap().to_string()
    }
}

#[tokio::test]
async fn health_is_public() {
    let app = TestApp::new().await;
    let (status, body) = app.request(Method::GET, "/api/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");

    let (status, body) = app.request(Method::GET, "/api/ready", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ready");
}

#[tokio::test]
async fn openapi_document_is_served() {
    let app = TestApp::new().await;
    let (status, body) = app
        .request(Method::GET, "/api-docs/openapi.json", None, None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["paths"]["/loans"].is_object());
}

#[tokio::test]
async fn requests_without_token_are_rejected() {
    let app = TestApp::new().await;
    let (status, body) = app.request(Method::GET, "/api/books", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["code"], 2);

    let (status, _) = app.get("/api/books", "not-a-jwt").await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn login_with_wrong_password_fails() {
    let app = TestApp::new().await;
    let (status, _) = app
        .request(
            Method::POST,
            "/api/auth/login",
            None,
            Some(json!({ "email": ADMIN_EMAIL, "password": "nope" })),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn borrow_and_return_lifecycle() {
    let app = TestApp::new().await;
    let admin = app.admin_token().await;
    let (reader, reader_id) = app.register("Ged").await;
    let (other, _) = app.register("Tenar").await;
    let book_id = app.create_book(&admin, "A Wizard of Earthsea", 1).await;

    let (status, loan) = app
        .post("/api/loans", &reader, json!({ "bookId": book_id }))
        .await;
    assert_eq!(status, StatusCode::CREATED, "{}", loan);
    assert_eq!(loan["status"], "BORROWED");
    assert_eq!(loan["isOverdue"], false);
    assert_eq!(loan["userId"], reader_id.as_str());
    assert_eq!(loan["bookTitle"], "A Wizard of Earthsea");
    let loan_id = loan["id"].as_str().unwrap().to_string();

    let (_, book) = app.get(&format!("/api/books/{}", book_id), &reader).await;
    assert_eq!(book["totalCopies"], 1);
    assert_eq!(book["availableCopies"], 0);

    // the only copy is out
    let (status, body) = app
        .post("/api/loans", &other, json!({ "bookId": book_id }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "No copies available");

    let (_, notifications) = app.get("/api/notifications", &reader).await;
    assert_eq!(notifications.as_array().unwrap().len(), 1);
    assert_eq!(notifications[0]["type"], "LOAN_CREATED");

    // someone else's loan
    let (status, _) = app
        .patch(&format!("/api/loans/{}/return", loan_id), &other, None)
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, returned) = app
        .patch(&format!("/api/loans/{}/return", loan_id), &reader, None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(returned["status"], "RETURNED");
    assert!(returned["returnDate"].is_string());

    let (status, body) = app
        .patch(&format!("/api/loans/{}/return", loan_id), &reader, None)
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Loan already returned");

    let (_, book) = app.get(&format!("/api/books/{}", book_id), &reader).await;
    assert_eq!(book["availableCopies"], 1);

    let (status, _) = app
        .post("/api/loans", &other, json!({ "bookId": book_id }))
        .await;
    assert_eq!(status, StatusCode::CREATED);
}

#[tokio::test]
async fn plain_due_dates_are_accepted() {
    let app = TestApp::new().await;
    let admin = app.admin_token().await;
    let (reader, _) = app.register("Ged").await;
    let book_id = app.create_book(&admin, "The Farthest Shore", 1).await;

    let (status, loan) = app
        .post(
            "/api/loans",
            &reader,
            json!({ "bookId": book_id, "dueDate": "2999-01-01" }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{}", loan);
    assert!(loan["dueDate"].as_str().unwrap().starts_with("2999-01-01T00:00:00"));

    let (status, _) = app
        .post(
            "/api/loans",
            &reader,
            json!({ "bookId": book_id, "dueDate": "2000-01-01" }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn readers_cannot_borrow_for_others() {
    let app = TestApp::new().await;
    let admin = app.admin_token().await;
    let (reader, _) = app.register("Ged").await;
    let (_, other_id) = app.register("Tenar").await;
    let book_id = app.create_book(&admin, "Tehanu", 1).await;

    let (status, _) = app
        .post("/api/loans", &reader, json!({ "bookId": book_id, "userId": other_id }))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, loan) = app
        .post("/api/loans", &admin, json!({ "bookId": book_id, "userId": other_id }))
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(loan["userId"], other_id.as_str());
}

#[tokio::test]
async fn overdue_is_derived_on_read() {
    let app = TestApp::new().await;
    let admin = app.admin_token().await;
    let (reader, reader_id) = app.register("Ged").await;
    let book_id = app.create_book(&admin, "The Tombs of Atuan", 2).await;

    let borrowed_at = Utc::now() - Duration::days(40);
    let late = app
        .repository
        .loans
        .checkout(&NewLoan {
            user_id: reader_id.clone(),
            book_id: book_id.clone(),
            borrow_date: borrowed_at,
            due_date: borrowed_at + Duration::days(14),
        })
        .await
        .unwrap()
        .unwrap();
    app.post("/api/loans", &reader, json!({ "bookId": book_id })).await;

    let (status, loan) = app.get(&format!("/api/loans/{}", late.id), &reader).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(loan["status"], "OVERDUE");
    assert_eq!(loan["isOverdue"], true);

    let (_, overdue) = app.get("/api/loans?status=OVERDUE", &admin).await;
    let overdue = overdue.as_array().unwrap();
    assert_eq!(overdue.len(), 1);
    assert_eq!(overdue[0]["id"], late.id.as_str());

    let (_, mine) = app
        .get(&format!("/api/users/{}/loans", reader_id), &reader)
        .await;
    assert_eq!(mine.as_array().unwrap().len(), 2);

    let (_, stats) = app.get("/api/dashboard", &reader).await;
    assert_eq!(stats["activeLoans"], 2);
    assert_eq!(stats["overdueLoans"], 1);

    // reminder reconciles the stored status
    let (status, reminded) = app
        .post(&format!("/api/loans/{}/remind", late.id), &admin, json!({}))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(reminded["reminderCount"], 1);
    let stored = app.repository.loans.get(&late.id).await.unwrap().unwrap();
    assert_eq!(stored.status.as_str(), "OVERDUE");

    let (status, _) = app
        .post(&format!("/api/loans/{}/remind", late.id), &reader, json!({}))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn deleting_a_user_cascades() {
    let app = TestApp::new().await;
    let admin = app.admin_token().await;
    let (reader, reader_id) = app.register("Ged").await;
    let book_id = app.create_book(&admin, "Tales from Earthsea", 2).await;

    app.post("/api/loans", &reader, json!({ "bookId": book_id })).await;
    let (_, done) = app.post("/api/loans", &reader, json!({ "bookId": book_id })).await;
    app.patch(
        &format!("/api/loans/{}/return", done["id"].as_str().unwrap()),
        &reader,
        None,
    )
    .await;

    let (status, _) = app
        .request(
            Method::POST,
            "/api/auth/forgot-password",
            None,
            Some(json!({ "email": "ged@biblio.test" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    let (_, unread) = app.get("/api/notifications/unread-count", &admin).await;
    assert_eq!(unread["unread"], 1);

    let (status, summary) = app.delete(&format!("/api/users/{}", reader_id), &admin).await;
    assert_eq!(status, StatusCode::OK, "{}", summary);
    assert_eq!(summary["freedCopies"], 1);
    assert_eq!(summary["deletedLoans"], 2);
    // two loan notifications plus one return notification plus the reset request
    assert_eq!(summary["deletedNotifications"], 4);

    let (_, loans) = app.get("/api/loans", &admin).await;
    assert!(loans.as_array().unwrap().is_empty());
    let (_, admin_inbox) = app.get("/api/notifications", &admin).await;
    assert!(admin_inbox.as_array().unwrap().is_empty());
    let (_, book) = app.get(&format!("/api/books/{}", book_id), &admin).await;
    assert_eq!(book["availableCopies"], 2);

    let (status, _) = app.get("/api/auth/me", &reader).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn admin_cannot_delete_themselves() {
    let app = TestApp::new().await;
    let admin = app.admin_token().await;
    let (_, me) = app.get("/api/auth/me", &admin).await;

    let (status, _) = app
        .delete(&format!("/api/users/{}", me["id"].as_str().unwrap()), &admin)
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn notifications_are_private() {
    let app = TestApp::new().await;
    let admin = app.admin_token().await;
    let (reader, _) = app.register("Ged").await;
    let (other, _) = app.register("Tenar").await;
    let book_id = app.create_book(&admin, "Earthsea", 1).await;
    app.post("/api/loans", &reader, json!({ "bookId": book_id })).await;

    let (_, inbox) = app.get("/api/notifications", &reader).await;
    let id = inbox[0]["id"].as_str().unwrap().to_string();

    let (status, _) = app
        .patch(&format!("/api/notifications/{}/read", id), &other, None)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, read) = app
        .patch(&format!("/api/notifications/{}/read", id), &reader, None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(read["isRead"], true);

    let (status, body) = app.patch("/api/notifications/read-all", &reader, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["updated"], 0);
}

#[tokio::test]
async fn borrowed_copies_are_protected() {
    let app = TestApp::new().await;
    let admin = app.admin_token().await;
    let (reader, _) = app.register("Ged").await;
    let book_id = app.create_book(&admin, "The Other Wind", 1).await;
    let (_, loan) = app.post("/api/loans", &reader, json!({ "bookId": book_id })).await;
    let copy_id = loan["copyId"].as_str().unwrap().to_string();

    let (status, _) = app
        .patch(
            &format!("/api/copies/{}", copy_id),
            &admin,
            Some(json!({ "status": "MAINTENANCE" })),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, _) = app.delete(&format!("/api/books/{}", book_id), &admin).await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, _) = app
        .post(&format!("/api/books/{}/copies", book_id), &reader, json!({ "count": 1 }))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn only_admins_manage_users() {
    let app = TestApp::new().await;
    let admin = app.admin_token().await;
    let (reader, reader_id) = app.register("Ged").await;

    let (status, _) = app.get("/api/users", &reader).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, page) = app.get("/api/users?q=ged", &admin).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(page["total"], 1);
    assert!(page["items"][0].get("passwordHash").is_none());

    let (status, updated) = app
        .patch(
            &format!("/api/users/{}", reader_id),
            &admin,
            Some(json!({ "role": "ADMIN" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["role"], "ADMIN");

    let (status, _) = app
        .post(
            "/api/users",
            &admin,
            json!({ "name": "Ged", "email": "GED@biblio.test", "password": "whatever" }),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn huge_page_numbers_return_an_empty_page() {
    let app = TestApp::new().await;
    let admin = app.admin_token().await;
    app.create_book(&admin, "A Wizard of Earthsea", 1).await;

    for uri in [
        "/api/books?page=9223372036854775807",
        "/api/users?page=9223372036854775807&perPage=100",
    ] {
        let (status, page) = app.get(uri, &admin).await;
        assert_eq!(status, StatusCode::OK, "{}", uri);
        assert_eq!(page["items"].as_array().unwrap().len(), 0);
        assert_eq!(page["total"], 1);
        assert_eq!(page["page"], i64::MAX);
    }
}
