//! HTTP request builder and response parser for the book API.
//!
//! # Design
//! `CatalogClient` holds the `base_url` and a handle to the session store.
//! Each operation is split into a `build_*` method that produces an
//! `HttpRequest` and a `parse_*` method that consumes an `HttpResponse`;
//! the caller executes the round-trip in between, keeping this module free
//! of I/O.
//!
//! Protected requests read the token from the store when they are built,
//! so a login or logout between two calls takes effect without rebuilding
//! the client. A missing token fails the build with `ApiError::Auth`
//! before anything is sent.

use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;
use url::form_urlencoded;

use crate::draft::BookDraft;
use crate::error::ApiError;
use crate::http::{HttpMethod, HttpRequest, HttpResponse};
use crate::session::SessionStore;
use crate::types::{BookPayload, BookRecord, Credentials, Registration, TokenResponse};

const JSON: &str = "application/json";
const FORM: &str = "application/x-www-form-urlencoded";

/// Stateless client for the book API, apart from the shared session store.
#[derive(Debug, Clone)]
pub struct CatalogClient {
    base_url: String,
    session: Arc<dyn SessionStore>,
}

impl CatalogClient {
    pub fn new(base_url: &str, session: Arc<dyn SessionStore>) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            session,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn session(&self) -> &Arc<dyn SessionStore> {
        &self.session
    }

    // --- auth ---

    pub fn build_login(&self, credentials: &Credentials) -> Result<HttpRequest, ApiError> {
        self.json_request(HttpMethod::Post, "/token".to_string(), credentials, None)
    }

    pub fn build_register(&self, registration: &Registration) -> Result<HttpRequest, ApiError> {
        self.json_request(HttpMethod::Post, "/register".to_string(), registration, None)
    }

    /// Returns the access token. Any 4xx means the credentials were refused.
    pub fn parse_login(&self, response: HttpResponse) -> Result<String, ApiError> {
        check_status(&response).map_err(|e| match e {
            ApiError::Validation(detail) | ApiError::Auth(detail) => ApiError::Auth(detail),
            ApiError::NotFound => ApiError::Auth(detail(&response)),
            other => other,
        })?;
        let token: TokenResponse = decode(&response)?;
        Ok(token.access_token)
    }

    /// Any 4xx means the server refused the registration.
    pub fn parse_register(&self, response: HttpResponse) -> Result<(), ApiError> {
        check_status(&response).map_err(|e| match e {
            ApiError::Validation(detail) | ApiError::Auth(detail) => ApiError::Validation(detail),
            ApiError::NotFound => ApiError::Validation(detail(&response)),
            other => other,
        })
    }

    // --- books ---

    pub fn build_list_books(&self) -> HttpRequest {
        HttpRequest {
            method: HttpMethod::Get,
            path: format!("{}/all_books/", self.base_url),
            headers: Vec::new(),
            body: None,
        }
    }

    /// Server-side search on title and/or author. Absent terms are not sent.
    pub fn build_search_books(&self, title: Option<&str>, author: Option<&str>) -> HttpRequest {
        let mut query = form_urlencoded::Serializer::new(String::new());
        if let Some(title) = title.filter(|t| !t.is_empty()) {
            query.append_pair("title", title);
        }
        if let Some(author) = author.filter(|a| !a.is_empty()) {
            query.append_pair("author", author);
        }
        let query = query.finish();
        let path = if query.is_empty() {
            format!("{}/search_book_by_name_or_author", self.base_url)
        } else {
            format!("{}/search_book_by_name_or_author?{query}", self.base_url)
        };
        HttpRequest {
            method: HttpMethod::Get,
            path,
            headers: Vec::new(),
            body: None,
        }
    }

    /// Create sends the payload form-encoded, not as JSON.
    pub fn build_create_book(&self, draft: &BookDraft) -> Result<HttpRequest, ApiError> {
        let bearer = self.bearer()?;
        let payload = BookPayload::try_from(draft)?;
        Ok(HttpRequest {
            method: HttpMethod::Post,
            path: format!("{}/add_book", self.base_url),
            headers: vec![
                ("content-type".to_string(), FORM.to_string()),
                bearer,
            ],
            body: Some(payload.to_form()),
        })
    }

    /// Full replacement: every field is sent.
    pub fn build_update_book(&self, id: i64, draft: &BookDraft) -> Result<HttpRequest, ApiError> {
        let bearer = self.bearer()?;
        let payload = BookPayload::try_from(draft)?;
        self.json_request(
            HttpMethod::Put,
            format!("/edit_book/{id}"),
            &payload,
            Some(bearer),
        )
    }

    pub fn build_delete_book(&self, id: i64) -> Result<HttpRequest, ApiError> {
        let bearer = self.bearer()?;
        Ok(HttpRequest {
            method: HttpMethod::Delete,
            path: format!("{}/delete_book/{id}", self.base_url),
            headers: vec![bearer],
            body: None,
        })
    }

    pub fn parse_list_books(&self, response: HttpResponse) -> Result<Vec<BookRecord>, ApiError> {
        check_status(&response)?;
        decode(&response)
    }

    /// The API answers 404 when nothing matches; that is an empty result.
    pub fn parse_search_books(&self, response: HttpResponse) -> Result<Vec<BookRecord>, ApiError> {
        match check_status(&response) {
            Ok(()) => decode(&response),
            Err(ApiError::NotFound) => Ok(Vec::new()),
            Err(e) => Err(e),
        }
    }

    pub fn parse_create_book(&self, response: HttpResponse) -> Result<BookRecord, ApiError> {
        check_status(&response)?;
        decode(&response)
    }

    pub fn parse_update_book(&self, response: HttpResponse) -> Result<(), ApiError> {
        check_status(&response)
    }

    pub fn parse_delete_book(&self, response: HttpResponse) -> Result<(), ApiError> {
        check_status(&response)
    }

    // --- helpers ---

    fn bearer(&self) -> Result<(String, String), ApiError> {
        match self.session.get() {
            Some(token) if !token.is_empty() => {
                Ok(("authorization".to_string(), format!("Bearer {token}")))
            }
            _ => {
                debug!("protected request built without a session");
                Err(ApiError::Auth("not logged in".to_string()))
            }
        }
    }

    fn json_request<T: Serialize>(
        &self,
        method: HttpMethod,
        path: String,
        body: &T,
        bearer: Option<(String, String)>,
    ) -> Result<HttpRequest, ApiError> {
        let body = serde_json::to_string(body).map_err(|e| ApiError::Encode(e.to_string()))?;
        let mut headers = vec![("content-type".to_string(), JSON.to_string())];
        headers.extend(bearer);
        Ok(HttpRequest {
            method,
            path: format!("{}{path}", self.base_url),
            headers,
            body: Some(body),
        })
    }
}

/// Map non-success status codes to the appropriate `ApiError` variant.
fn check_status(response: &HttpResponse) -> Result<(), ApiError> {
    if response.is_success() {
        return Ok(());
    }
    match response.status {
        401 | 403 => Err(ApiError::Auth(detail(response))),
        404 => Err(ApiError::NotFound),
        400..=499 => Err(ApiError::Validation(detail(response))),
        status => Err(ApiError::UnexpectedStatus {
            status,
            body: response.body.clone(),
        }),
    }
}

/// Human-readable reason from an error body. The API reports
/// `{"detail": ...}`, where `detail` is a string or a list of field errors.
fn detail(response: &HttpResponse) -> String {
    let parsed: Option<serde_json::Value> = serde_json::from_str(&response.body).ok();
    match parsed.as_ref().and_then(|v| v.get("detail")) {
        Some(serde_json::Value::String(detail)) => detail.clone(),
        Some(other) => other.to_string(),
        None if !response.body.trim().is_empty() => response.body.clone(),
        None => format!("HTTP {}", response.status),
    }
}

fn decode<T: DeserializeOwned>(response: &HttpResponse) -> Result<T, ApiError> {
    serde_json::from_str(&response.body).map_err(|e| ApiError::Decode(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::MemorySessionStore;

    fn client() -> CatalogClient {
        CatalogClient::new("http://localhost:8000", Arc::new(MemorySessionStore::with_token("tok")))
    }

    fn anonymous() -> CatalogClient {
        CatalogClient::new("http://localhost:8000", Arc::new(MemorySessionStore::new()))
    }

    fn response(status: u16, body: &str) -> HttpResponse {
        HttpResponse {
            status,
            headers: Vec::new(),
            body: body.to_string(),
        }
    }

    fn dune() -> BookDraft {
        BookDraft {
            title: "Dune".to_string(),
            author: "Herbert".to_string(),
            description: "Sci-fi".to_string(),
            year: "1965".to_string(),
            genre: "SciFi".to_string(),
        }
    }

    #[test]
    fn build_list_books_produces_correct_request() {
        let req = client().build_list_books();
        assert_eq!(req.method, HttpMethod::Get);
        assert_eq!(req.path, "http://localhost:8000/all_books/");
        assert!(req.body.is_none());
        assert!(req.headers.is_empty());
    }

    #[test]
    fn build_create_book_is_form_encoded_with_bearer() {
        let req = client().build_create_book(&dune()).unwrap();
        assert_eq!(req.method, HttpMethod::Post);
        assert_eq!(req.path, "http://localhost:8000/add_book");
        assert_eq!(req.header("content-type"), Some(FORM));
        assert_eq!(req.header("authorization"), Some("Bearer tok"));
        assert_eq!(
            req.body.as_deref(),
            Some("title=Dune&author=Herbert&description=Sci-fi&year=1965&genre=SciFi")
        );
    }

    #[test]
    fn build_update_book_sends_every_field_as_json() {
        let req = client().build_update_book(7, &dune()).unwrap();
        assert_eq!(req.method, HttpMethod::Put);
        assert_eq!(req.path, "http://localhost:8000/edit_book/7");
        assert_eq!(req.header("authorization"), Some("Bearer tok"));
        let body: serde_json::Value = serde_json::from_str(req.body.as_deref().unwrap()).unwrap();
        assert_eq!(
            body,
            serde_json::json!({
                "title": "Dune",
                "author": "Herbert",
                "description": "Sci-fi",
                "year": 1965,
                "genre": "SciFi",
            })
        );
    }

    #[test]
    fn build_delete_book_produces_correct_request() {
        let req = client().build_delete_book(3).unwrap();
        assert_eq!(req.method, HttpMethod::Delete);
        assert_eq!(req.path, "http://localhost:8000/delete_book/3");
        assert_eq!(req.headers, vec![("authorization".to_string(), "Bearer tok".to_string())]);
        assert!(req.body.is_none());
    }

    #[test]
    fn protected_builds_fail_without_token() {
        let c = anonymous();
        assert!(matches!(c.build_create_book(&dune()), Err(ApiError::Auth(_))));
        assert!(matches!(c.build_update_book(1, &dune()), Err(ApiError::Auth(_))));
        assert!(matches!(c.build_delete_book(1), Err(ApiError::Auth(_))));
    }

    #[test]
    fn token_is_read_when_the_request_is_built() {
        let c = anonymous();
        assert!(c.build_delete_book(1).is_err());
        c.session().set("late").unwrap();
        let req = c.build_delete_book(1).unwrap();
        assert_eq!(req.header("authorization"), Some("Bearer late"));
        c.session().clear().unwrap();
        assert!(c.build_delete_book(1).is_err());
    }

    #[test]
    fn build_create_book_rejects_unparsable_year() {
        let mut draft = dune();
        draft.year = "soon".to_string();
        let err = client().build_create_book(&draft).unwrap_err();
        assert!(matches!(err, ApiError::Validation(_)));
    }

    #[test]
    fn build_login_sends_json() {
        let req = client().build_login(&Credentials::new("reader", "pw")).unwrap();
        assert_eq!(req.path, "http://localhost:8000/token");
        assert_eq!(req.header("content-type"), Some(JSON));
        assert_eq!(req.header("authorization"), None);
        let body: serde_json::Value = serde_json::from_str(req.body.as_deref().unwrap()).unwrap();
        assert_eq!(body, serde_json::json!({"username": "reader", "password": "pw"}));
    }

    #[test]
    fn build_search_books_encodes_query() {
        let req = client().build_search_books(Some("war & peace"), None);
        assert_eq!(
            req.path,
            "http://localhost:8000/search_book_by_name_or_author?title=war+%26+peace"
        );
        let req = client().build_search_books(None, Some(""));
        assert_eq!(req.path, "http://localhost:8000/search_book_by_name_or_author");
    }

    #[test]
    fn parse_login_returns_token() {
        let token = client()
            .parse_login(response(200, r#"{"access_token":"abc","token_type":"bearer"}"#))
            .unwrap();
        assert_eq!(token, "abc");
    }

    #[test]
    fn parse_login_maps_any_4xx_to_auth() {
        for status in [400, 401, 404, 422] {
            let err = client()
                .parse_login(response(status, r#"{"detail":"Incorrect username or password"}"#))
                .unwrap_err();
            assert!(matches!(err, ApiError::Auth(_)), "{status}");
        }
    }

    #[test]
    fn parse_register_maps_any_4xx_to_validation() {
        let err = client()
            .parse_register(response(400, r#"{"detail":"Username already registered"}"#))
            .unwrap_err();
        match err {
            ApiError::Validation(detail) => assert_eq!(detail, "Username already registered"),
            other => panic!("unexpected error: {other:?}"),
        }
        let err = client().parse_register(response(403, "")).unwrap_err();
        assert!(matches!(err, ApiError::Validation(_)));
    }

    #[test]
    fn parse_list_books_success() {
        let books = client()
            .parse_list_books(response(
                200,
                r#"[{"id":1,"title":"Dune","author":"Herbert","description":null,"year":1965,"genre":"SciFi"}]"#,
            ))
            .unwrap();
        assert_eq!(books.len(), 1);
        assert_eq!(books[0].title, "Dune");
        assert_eq!(books[0].description, None);
    }

    #[test]
    fn parse_list_books_bad_json() {
        let err = client().parse_list_books(response(200, "not json")).unwrap_err();
        assert!(matches!(err, ApiError::Decode(_)));
    }

    #[test]
    fn parse_search_books_treats_404_as_empty() {
        let books = client()
            .parse_search_books(response(404, r#"{"detail":"Book not found"}"#))
            .unwrap();
        assert!(books.is_empty());
    }

    #[test]
    fn parse_create_book_status_mapping() {
        let c = client();
        assert!(matches!(
            c.parse_create_book(response(401, r#"{"detail":"Not authenticated"}"#)),
            Err(ApiError::Auth(_))
        ));
        assert!(matches!(
            c.parse_create_book(response(422, r#"{"detail":[{"loc":["body","year"]}]}"#)),
            Err(ApiError::Validation(_))
        ));
        assert!(matches!(
            c.parse_create_book(response(500, "boom")),
            Err(ApiError::UnexpectedStatus { status: 500, .. })
        ));
    }

    #[test]
    fn parse_update_and_delete_not_found() {
        let c = client();
        assert!(matches!(c.parse_update_book(response(404, "")), Err(ApiError::NotFound)));
        assert!(matches!(c.parse_delete_book(response(404, "")), Err(ApiError::NotFound)));
        assert!(c.parse_update_book(response(200, "{}")).is_ok());
        assert!(c.parse_delete_book(response(204, "")).is_ok());
    }

    #[test]
    fn check_status_accepts_exactly_the_2xx_range() {
        for status in [200, 201, 204, 299] {
            assert!(check_status(&response(status, "")).is_ok(), "{status}");
        }
        assert!(matches!(
            check_status(&response(302, "")),
            Err(ApiError::UnexpectedStatus { status: 302, .. })
        ));
    }

    #[test]
    fn trailing_slash_is_stripped() {
        let c = CatalogClient::new("http://localhost:8000/", Arc::new(MemorySessionStore::new()));
        assert_eq!(c.build_list_books().path, "http://localhost:8000/all_books/");
    }

    #[test]
    fn detail_prefers_structured_message() {
        assert_eq!(detail(&response(400, r#"{"detail":"nope"}"#)), "nope");
        assert_eq!(detail(&response(400, "plain")), "plain");
        assert_eq!(detail(&response(400, "")), "HTTP 400");
    }
}
