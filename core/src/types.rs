//! Domain DTOs for the book API.
//!
//! # Design
//! These types mirror the mock-server's schema but are defined independently;
//! integration tests catch any schema drift between the two crates.
//! `BookRecord` enforces nothing: the server is the source of truth and may
//! hold records that predate the client's validation rules.

use std::fmt;

use serde::{Deserialize, Serialize};
use url::form_urlencoded;

use crate::draft::BookDraft;
use crate::error::ApiError;

/// A book as stored by the API.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct BookRecord {
    pub id: i64,
    pub title: String,
    pub author: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub year: i32,
    #[serde(default)]
    pub genre: String,
}

/// Wire form of a book sent by create and update. Unlike `BookDraft`, the
/// year is already an integer.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct BookPayload {
    pub title: String,
    pub author: String,
    pub description: Option<String>,
    pub year: i32,
    pub genre: String,
}

impl BookPayload {
    /// Encode as `application/x-www-form-urlencoded`. A missing description
    /// is omitted rather than sent empty.
    pub fn to_form(&self) -> String {
        let mut form = form_urlencoded::Serializer::new(String::new());
        form.append_pair("title", &self.title);
        form.append_pair("author", &self.author);
        if let Some(description) = &self.description {
            form.append_pair("description", description);
        }
        form.append_pair("year", &self.year.to_string());
        form.append_pair("genre", &self.genre);
        form.finish()
    }
}

impl TryFrom<&BookDraft> for BookPayload {
    type Error = ApiError;

    fn try_from(draft: &BookDraft) -> Result<Self, Self::Error> {
        let year = draft
            .year
            .trim()
            .parse()
            .map_err(|_| ApiError::Validation(format!("year '{}' is not a number", draft.year)))?;
        let description = if draft.description.is_empty() {
            None
        } else {
            Some(draft.description.clone())
        };
        Ok(Self {
            title: draft.title.clone(),
            author: draft.author.clone(),
            description,
            year,
            genre: draft.genre.clone(),
        })
    }
}

/// Login request body.
#[derive(Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Registration request body.
#[derive(Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Registration {
    pub username: String,
    pub email: String,
    pub password: String,
}

impl fmt::Debug for Registration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registration")
            .field("username", &self.username)
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Response of `POST /token`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    #[serde(default)]
    pub token_type: Option<String>,
}
