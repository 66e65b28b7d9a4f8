//! Greeting and user lookup endpoints under `/api`.
//!
//! Stateless; merged into any router state. The greeting answers with and
//! without the trailing slash. A non-integer user id is a 404,
//! same as an unknown one.

use axum::{extract::Path, http::StatusCode, response::IntoResponse, routing::get, Json, Router};
use serde::Serialize;
use serde_json::{json, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct User {
    pub id: u32,
    pub name: &'static str,
    pub email: &'static str,
}

pub const GREETING: &str = "Merhaba, Dünya!";
pub const USER_NOT_FOUND: &str = "Kullanıcı bulunamadı";

const USERS: [User; 2] = [
    User {
        id: 1,
        name: "Ahmet",
        email: "ahmet@example.com",
    },
    User {
        id: 2,
        name: "Mehmet",
        email: "mehmet@example.com",
    },
];

pub fn router<S>() -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    Router::new()
        .route("/api", get(hello).post(echo))
        .route("/api/", get(hello).post(echo))
        .route("/api/users/:id", get(user))
}

pub fn find_user(id: u32) -> Option<User> {
    USERS.iter().copied().find(|u| u.id == id)
}

pub async fn hello() -> Json<Value> {
    Json(json!({ "message": GREETING }))
}

pub async fn echo(Json(body): Json<Value>) -> impl IntoResponse {
    (StatusCode::CREATED, Json(json!({ "received": body })))
}

async fn user(Path(id): Path<String>) -> (StatusCode, Json<Value>) {
    match id.parse::<u32>().ok().and_then(find_user) {
        Some(user) => (StatusCode::OK, Json(json!(user))),
        None => not_found(),
    }
}

fn not_found() -> (StatusCode, Json<Value>) {
    (StatusCode::NOT_FOUND, Json(json!({ "message": USER_NOT_FOUND })))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn hello_returns_greeting() {
        let Json(body) = hello().await;
        assert_eq!(body["message"], GREETING);
    }

    #[tokio::test]
    async fn echo_wraps_body_with_created() {
        let response = echo(Json(json!({"name": "robot"}))).await.into_response();
        assert_eq!(response.status(), StatusCode::CREATED);
    }

    #[tokio::test]
    async fn user_lookup() {
        assert_eq!(find_user(2).map(|u| u.name), Some("Mehmet"));
        assert!(find_user(7).is_none());

        let (status, Json(body)) = user(Path("1".into())).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["email"], "ahmet@example.com");

        let (status, Json(body)) = user(Path("99".into())).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["message"], USER_NOT_FOUND);
    }

    #[tokio::test]
    async fn non_integer_id_is_not_found() {
        let (status, _) = user(Path("abc".into())).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        let (status, _) = user(Path("-1".into())).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}
