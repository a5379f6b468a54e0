//! In-memory stand-in for the book catalog API.
//!
//! Serves the same routes and status codes as the real service so the
//! client core can be exercised over real HTTP. Everything lives in one
//! `Store` behind an `RwLock`; nothing is persisted.

use std::{
    collections::{BTreeMap, HashMap},
    sync::Arc,
};

use axum::{
    extract::{Path, Query, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{delete, get, post, put},
    Form, Json, Router,
};
use serde::{Deserialize, Serialize};
use tokio::{net::TcpListener, sync::RwLock};
use tracing::{debug, info};
use uuid::Uuid;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Book {
    pub id: i64,
    pub title: String,
    pub author: String,
    pub description: Option<String>,
    pub year: i32,
    pub genre: String,
}

/// Body of `POST /add_book` (form-encoded) and `PUT /edit_book/{id}` (JSON).
#[derive(Debug, Deserialize)]
pub struct BookInput {
    pub title: String,
    pub author: String,
    #[serde(default)]
    pub description: Option<String>,
    pub year: i32,
    #[serde(default)]
    pub genre: String,
}

#[derive(Debug, Deserialize)]
pub struct SearchParams {
    pub title: Option<String>,
    pub author: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct LoginInput {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct RegisterInput {
    pub username: String,
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TokenOutput {
    pub access_token: String,
    pub token_type: String,
}

#[derive(Debug, Default)]
pub struct Store {
    books: BTreeMap<i64, Book>,
    next_id: i64,
    /// username -> password
    users: HashMap<String, String>,
    /// token -> username
    tokens: HashMap<String, String>,
}

impl Store {
    fn insert(&mut self, input: BookInput) -> Book {
        self.next_id += 1;
        let book = Book {
            id: self.next_id,
            title: input.title,
            author: input.author,
            description: input.description,
            year: input.year,
            genre: input.genre,
        };
        self.books.insert(book.id, book.clone());
        book
    }
}

pub type Db = Arc<RwLock<Store>>;

/// `{"detail": ...}` error body with a status.
#[derive(Debug)]
pub struct Failure {
    status: StatusCode,
    detail: &'static str,
}

impl Failure {
    const fn new(status: StatusCode, detail: &'static str) -> Self {
        Self { status, detail }
    }
}

const NOT_FOUND: Failure = Failure::new(StatusCode::NOT_FOUND, "Book not found");
const NOT_AUTHENTICATED: Failure = Failure::new(StatusCode::UNAUTHORIZED, "Not authenticated");

impl IntoResponse for Failure {
    fn into_response(self) -> Response {
        (self.status, Json(serde_json::json!({ "detail": self.detail }))).into_response()
    }
}

pub fn app() -> Router {
    app_with_store(Db::default())
}

/// Router over an existing store, so tests can seed or inspect it.
pub fn app_with_store(db: Db) -> Router {
    Router::new()
        .route("/all_books/", get(list_books))
        .route("/search_book_by_name_or_author", get(search_books))
        .route("/add_book", post(add_book))
        .route("/edit_book/{id}", put(edit_book))
        .route("/delete_book/{id}", delete(delete_book))
        .route("/token", post(login))
        .route("/register", post(register))
        .with_state(db)
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    axum::serve(listener, app()).await
}

/// Username owning the bearer token in `headers`.
fn authenticate(headers: &HeaderMap, store: &Store) -> Result<String, Failure> {
    let token = headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| {
            value
                .strip_prefix("Bearer ")
                .or_else(|| value.strip_prefix("bearer "))
        })
        .ok_or(NOT_AUTHENTICATED)?;
    store.tokens.get(token).cloned().ok_or(NOT_AUTHENTICATED)
}

async fn list_books(State(db): State<Db>) -> Json<Vec<Book>> {
    let store = db.read().await;
    Json(store.books.values().cloned().collect())
}

async fn search_books(
    State(db): State<Db>,
    Query(params): Query<SearchParams>,
) -> Result<Json<Vec<Book>>, Failure> {
    let contains = |haystack: &str, needle: &Option<String>| match needle {
        Some(needle) if !needle.is_empty() => {
            haystack.to_lowercase().contains(&needle.to_lowercase())
        }
        _ => true,
    };
    let store = db.read().await;
    let found: Vec<Book> = store
        .books
        .values()
        .filter(|book| contains(&book.title, &params.title) && contains(&book.author, &params.author))
        .cloned()
        .collect();
    if found.is_empty() {
        return Err(NOT_FOUND);
    }
    Ok(Json(found))
}

async fn add_book(
    State(db): State<Db>,
    headers: HeaderMap,
    Form(input): Form<BookInput>,
) -> Result<Json<Book>, Failure> {
    let mut store = db.write().await;
    let user = authenticate(&headers, &store)?;
    let book = store.insert(input);
    info!(id = book.id, %user, "book added");
    Ok(Json(book))
}

async fn edit_book(
    State(db): State<Db>,
    Path(id): Path<i64>,
    headers: HeaderMap,
    Json(input): Json<BookInput>,
) -> Result<Json<Book>, Failure> {
    let mut store = db.write().await;
    authenticate(&headers, &store)?;
    let book = store.books.get_mut(&id).ok_or(NOT_FOUND)?;
    book.title = input.title;
    book.author = input.author;
    book.description = input.description;
    book.year = input.year;
    book.genre = input.genre;
    debug!(id, "book replaced");
    Ok(Json(book.clone()))
}

async fn delete_book(
    State(db): State<Db>,
    Path(id): Path<i64>,
    headers: HeaderMap,
) -> Result<Json<Vec<&'static str>>, Failure> {
    let mut store = db.write().await;
    authenticate(&headers, &store)?;
    store.books.remove(&id).ok_or(NOT_FOUND)?;
    debug!(id, "book deleted");
    Ok(Json(vec!["Book deleted"]))
}

async fn login(
    State(db): State<Db>,
    Json(input): Json<LoginInput>,
) -> Result<Json<TokenOutput>, Failure> {
    let mut store = db.write().await;
    let valid = store
        .users
        .get(&input.username)
        .is_some_and(|password| *password == input.password);
    if !valid {
        return Err(Failure::new(
            StatusCode::UNAUTHORIZED,
            "Incorrect username or password",
        ));
    }
    let token = Uuid::new_v4().to_string();
    store.tokens.insert(token.clone(), input.username);
    Ok(Json(TokenOutput {
        access_token: token,
        token_type: "bearer".to_string(),
    }))
}

async fn register(
    State(db): State<Db>,
    Json(input): Json<RegisterInput>,
) -> Result<impl IntoResponse, Failure> {
    if input.username.trim().is_empty() || input.password.is_empty() {
        return Err(Failure::new(
            StatusCode::BAD_REQUEST,
            "Username and password are required",
        ));
    }
    let mut store = db.write().await;
    if store.users.contains_key(&input.username) {
        return Err(Failure::new(
            StatusCode::BAD_REQUEST,
            "Username already registered",
        ));
    }
    info!(username = %input.username, "user registered");
    store.users.insert(input.username.clone(), input.password);
    Ok(Json(serde_json::json!({
        "username": input.username,
        "email": input.email,
    })))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input(title: &str) -> BookInput {
        BookInput {
            title: title.to_string(),
            author: "Herbert".to_string(),
            description: None,
            year: 1965,
            genre: "SciFi".to_string(),
        }
    }

    #[test]
    fn book_serializes_to_json() {
        let book = Book {
            id: 1,
            title: "Dune".to_string(),
            author: "Herbert".to_string(),
            description: None,
            year: 1965,
            genre: "SciFi".to_string(),
        };
        let json = serde_json::to_value(&book).unwrap();
        assert_eq!(json["id"], 1);
        assert_eq!(json["description"], serde_json::Value::Null);
        assert_eq!(json["year"], 1965);
    }

    #[test]
    fn book_input_defaults_optional_fields() {
        let input: BookInput =
            serde_json::from_str(r#"{"title":"T","author":"A","year":1900}"#).unwrap();
        assert!(input.description.is_none());
        assert_eq!(input.genre, "");
    }

    #[test]
    fn book_input_rejects_missing_title() {
        let result: Result<BookInput, _> = serde_json::from_str(r#"{"author":"A","year":1900}"#);
        assert!(result.is_err());
    }

    #[test]
    fn ids_are_assigned_sequentially() {
        let mut store = Store::default();
        assert_eq!(store.insert(input("One")).id, 1);
        assert_eq!(store.insert(input("Two")).id, 2);
        store.books.remove(&2);
        assert_eq!(store.insert(input("Three")).id, 3);
    }

    #[test]
    fn authenticate_requires_known_bearer_token() {
        let mut store = Store::default();
        store.tokens.insert("good".to_string(), "reader".to_string());

        let mut headers = HeaderMap::new();
        assert!(authenticate(&headers, &store).is_err());

        headers.insert(header::AUTHORIZATION, "Bearer bad".parse().unwrap());
        assert!(authenticate(&headers, &store).is_err());

        headers.insert(header::AUTHORIZATION, "Bearer good".parse().unwrap());
        assert_eq!(authenticate(&headers, &store).unwrap(), "reader");
    }
}
