//! One call per API operation.
//!
//! `CatalogApi` is the seam the orchestrator's driver talks to; tests swap
//! in an in-memory implementation. `HttpCatalogApi` is the real one: it
//! builds with `CatalogClient`, executes with a `Transport` and parses the
//! response.

use std::sync::Arc;

use crate::client::CatalogClient;
use crate::draft::BookDraft;
use crate::error::{ApiError, ConfigError};
use crate::session::SessionStore;
use crate::settings::ClientConfig;
use crate::transport::{Transport, UreqTransport};
use crate::types::{BookRecord, Credentials, Registration};

pub trait CatalogApi {
    /// Exchange credentials for a bearer token.
    fn login(&self, credentials: &Credentials) -> Result<String, ApiError>;
    fn register(&self, registration: &Registration) -> Result<(), ApiError>;
    fn list_books(&self) -> Result<Vec<BookRecord>, ApiError>;
    fn search_books(
        &self,
        title: Option<&str>,
        author: Option<&str>,
    ) -> Result<Vec<BookRecord>, ApiError>;
    fn create_book(&self, draft: &BookDraft) -> Result<BookRecord, ApiError>;
    /// Replace every field of book `id`.
    fn update_book(&self, id: i64, draft: &BookDraft) -> Result<(), ApiError>;
    fn delete_book(&self, id: i64) -> Result<(), ApiError>;
}

#[derive(Debug, Clone)]
pub struct HttpCatalogApi<T> {
    client: CatalogClient,
    transport: T,
}

impl<T: Transport> HttpCatalogApi<T> {
    pub fn new(client: CatalogClient, transport: T) -> Self {
        Self { client, transport }
    }

    pub fn client(&self) -> &CatalogClient {
        &self.client
    }
}

impl HttpCatalogApi<UreqTransport> {
    /// Client against `config.base_url` with a ureq transport honoring the
    /// configured timeout.
    pub fn from_config(
        config: &ClientConfig,
        session: Arc<dyn SessionStore>,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self::new(
            CatalogClient::new(&config.base_url, session),
            UreqTransport::new(config.timeout()),
        ))
    }
}

impl<T: Transport> CatalogApi for HttpCatalogApi<T> {
    fn login(&self, credentials: &Credentials) -> Result<String, ApiError> {
        let req = self.client.build_login(credentials)?;
        self.client.parse_login(self.transport.execute(req)?)
    }

    fn register(&self, registration: &Registration) -> Result<(), ApiError> {
        let req = self.client.build_register(registration)?;
        self.client.parse_register(self.transport.execute(req)?)
    }

    fn list_books(&self) -> Result<Vec<BookRecord>, ApiError> {
        let req = self.client.build_list_books();
        self.client.parse_list_books(self.transport.execute(req)?)
    }

    fn search_books(
        &self,
        title: Option<&str>,
        author: Option<&str>,
    ) -> Result<Vec<BookRecord>, ApiError> {
        let req = self.client.build_search_books(title, author);
        self.client.parse_search_books(self.transport.execute(req)?)
    }

    fn create_book(&self, draft: &BookDraft) -> Result<BookRecord, ApiError> {
        let req = self.client.build_create_book(draft)?;
        self.client.parse_create_book(self.transport.execute(req)?)
    }

    fn update_book(&self, id: i64, draft: &BookDraft) -> Result<(), ApiError> {
        let req = self.client.build_update_book(id, draft)?;
        self.client.parse_update_book(self.transport.execute(req)?)
    }

    fn delete_book(&self, id: i64) -> Result<(), ApiError> {
        let req = self.client.build_delete_book(id)?;
        self.client.parse_delete_book(self.transport.execute(req)?)
    }
}
