//! Client core for the book catalog service.
//!
//! # Overview
//! Builds `HttpRequest` values and parses `HttpResponse` values without
//! touching the network (host-does-IO pattern); a `Transport` performs the
//! round-trip. On top of that sit the pure pieces a catalog UI needs:
//! draft validation, list filtering and sorting, and a sans-IO state
//! machine (`Catalog`) that turns UI intents into API calls.
//!
//! # Design
//! - `CatalogClient` holds only `base_url` and a shared `SessionStore`; the
//!   bearer token is read each time a protected request is built.
//! - Each operation is split into `build_*` (produces request) and
//!   `parse_*` (consumes response), so the I/O boundary is explicit.
//! - `CatalogApi` is the one-call-per-operation seam; `HttpCatalogApi` is
//!   the real implementation and tests substitute fakes.
//! - DTOs are defined independently from the mock-server crate; integration
//!   tests catch schema drift.

pub mod api;
pub mod catalog;
pub mod client;
pub mod draft;
pub mod error;
pub mod http;
pub mod query;
pub mod session;
pub mod settings;
pub mod transport;
pub mod types;
pub mod validate;

pub use api::{CatalogApi, HttpCatalogApi};
pub use catalog::{
    ApiCall, ApiReply, Catalog, Driver, FetchState, Intent, Mode, NewBookForm, Notice,
    NoticeLevel, PendingCall, Selection, Ticket,
};
pub use client::CatalogClient;
pub use draft::{BookDraft, Field};
pub use error::{ApiError, ConfigError, SessionError};
pub use http::{HttpMethod, HttpRequest, HttpResponse};
pub use query::{derive_view, SortKey};
pub use session::{FileSessionStore, MemorySessionStore, SessionEvent, SessionSignal, SessionStore};
pub use settings::ClientConfig;
pub use transport::{Transport, UreqTransport};
pub use types::{BookPayload, BookRecord, Credentials, Registration, TokenResponse};
pub use validate::{filter_input, validate, validate_at, FieldError, InputOutcome, Rule, Validity};
