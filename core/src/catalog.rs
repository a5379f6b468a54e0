//! State machine behind the book catalog screens.
//!
//! # Design
//! `Catalog` never performs I/O, the same way `CatalogClient` doesn't.
//! `handle` turns a UI `Intent` into state changes and at most one
//! `PendingCall`; the host executes the call and hands the result to
//! `resolve`, which may in turn ask for a follow-up call (the refetch after
//! a mutation). `Driver` runs that loop synchronously against any
//! `CatalogApi`.
//!
//! Every pending call carries a `Ticket`. A result is applied only if its
//! ticket is still the one the matching part of the state is waiting for.
//! Results for a superseded fetch or a selection that was closed in the
//! meantime are discarded. The collection is never patched in place: a
//! successful mutation always ends in a full refetch.
//!
//! Two confirms in a row both go out; only the later one is awaited.

use std::collections::VecDeque;
use std::sync::mpsc::Receiver;
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::api::CatalogApi;
use crate::draft::{BookDraft, Field};
use crate::error::ApiError;
use crate::query::{derive_view, SortKey};
use crate::session::{SessionEvent, SessionSignal, SessionStore};
use crate::types::{BookRecord, Credentials, Registration};
use crate::validate::validate;

/// A user action coming from the UI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Intent {
    Refresh,
    SetFilter(String),
    SetSort(SortKey),
    /// Open the book with this id in view mode.
    Select(i64),
    CloseSelection,
    Edit,
    EditInput { field: Field, value: String },
    Delete,
    /// Leave edit or delete mode without saving.
    Cancel,
    /// Commit the pending edit or delete.
    Confirm,
    OpenNewBook,
    NewBookInput { field: Field, value: String },
    ClearNewBook,
    SubmitNewBook,
    CloseNewBook,
    Login(Credentials),
    Register(Registration),
    Logout,
}

/// Pairs a pending call with its result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Ticket(u64);

/// An API operation the host must execute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApiCall {
    ListBooks,
    CreateBook(BookDraft),
    UpdateBook { id: i64, draft: BookDraft },
    DeleteBook { id: i64 },
    Login(Credentials),
    Register(Registration),
}

impl ApiCall {
    pub fn execute<A: CatalogApi + ?Sized>(&self, api: &A) -> Result<ApiReply, ApiError> {
        match self {
            ApiCall::ListBooks => api.list_books().map(ApiReply::Books),
            ApiCall::CreateBook(draft) => api.create_book(draft).map(ApiReply::Created),
            ApiCall::UpdateBook { id, draft } => {
                api.update_book(*id, draft).map(|()| ApiReply::Updated)
            }
            ApiCall::DeleteBook { id } => api.delete_book(*id).map(|()| ApiReply::Deleted),
            ApiCall::Login(credentials) => api.login(credentials).map(ApiReply::Token),
            ApiCall::Register(registration) => {
                api.register(registration).map(|()| ApiReply::Registered)
            }
        }
    }
}

/// Successful result of an `ApiCall`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApiReply {
    Books(Vec<BookRecord>),
    Created(BookRecord),
    Updated,
    Deleted,
    Token(String),
    Registered,
}

impl ApiReply {
    fn is_mutation(&self) -> bool {
        matches!(self, ApiReply::Created(_) | ApiReply::Updated | ApiReply::Deleted)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingCall {
    pub ticket: Ticket,
    pub call: ApiCall,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchState {
    Idle,
    Loading,
    Ready,
    Error(String),
}

/// What the selected book's panel is doing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mode {
    Default,
    Editing(BookDraft),
    Deleting,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selection {
    pub record: BookRecord,
    pub mode: Mode,
    awaiting: Option<Ticket>,
}

impl Selection {
    /// A confirm is in flight.
    pub fn busy(&self) -> bool {
        self.awaiting.is_some()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NewBookForm {
    pub draft: BookDraft,
    awaiting: Option<Ticket>,
}

impl NewBookForm {
    pub fn busy(&self) -> bool {
        self.awaiting.is_some()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Success,
    Error,
}

/// A message for the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub text: String,
}

impl Notice {
    fn success(text: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Success,
            text: text.into(),
        }
    }

    fn error(text: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Error,
            text: text.into(),
        }
    }
}

#[derive(Debug)]
pub struct Catalog {
    session: Arc<dyn SessionStore>,
    signal: SessionSignal,
    records: Vec<BookRecord>,
    fetch: FetchState,
    fetch_ticket: Option<Ticket>,
    filter_text: String,
    sort_key: SortKey,
    selection: Option<Selection>,
    new_book: Option<NewBookForm>,
    login_ticket: Option<Ticket>,
    register_ticket: Option<Ticket>,
    notices: VecDeque<Notice>,
    next_ticket: u64,
}

impl Catalog {
    pub fn new(session: Arc<dyn SessionStore>) -> Self {
        Self {
            session,
            signal: SessionSignal::default(),
            records: Vec::new(),
            fetch: FetchState::Idle,
            fetch_ticket: None,
            filter_text: String::new(),
            sort_key: SortKey::default(),
            selection: None,
            new_book: None,
            login_ticket: None,
            register_ticket: None,
            notices: VecDeque::new(),
            next_ticket: 0,
        }
    }

    // --- read side ---

    /// The filtered, sorted collection to display.
    pub fn view(&self) -> Vec<BookRecord> {
        derive_view(&self.records, &self.filter_text, self.sort_key)
    }

    pub fn records(&self) -> &[BookRecord] {
        &self.records
    }

    pub fn fetch_state(&self) -> &FetchState {
        &self.fetch
    }

    pub fn is_loading(&self) -> bool {
        self.fetch == FetchState::Loading
    }

    pub fn filter_text(&self) -> &str {
        &self.filter_text
    }

    pub fn sort_key(&self) -> SortKey {
        self.sort_key
    }

    pub fn selection(&self) -> Option<&Selection> {
        self.selection.as_ref()
    }

    pub fn new_book(&self) -> Option<&NewBookForm> {
        self.new_book.as_ref()
    }

    pub fn is_logged_in(&self) -> bool {
        self.session.get().is_some()
    }

    /// Drain the messages queued for the user.
    pub fn take_notices(&mut self) -> Vec<Notice> {
        self.notices.drain(..).collect()
    }

    pub fn subscribe_session(&self) -> Receiver<SessionEvent> {
        self.signal.subscribe()
    }

    // --- intents ---

    pub fn handle(&mut self, intent: Intent) -> Option<PendingCall> {
        debug!(?intent, "handling intent");
        match intent {
            Intent::Refresh => Some(self.begin_fetch()),
            Intent::SetFilter(text) => {
                self.filter_text = text;
                None
            }
            Intent::SetSort(key) => {
                self.sort_key = key;
                None
            }
            Intent::Select(id) => {
                self.select(id);
                None
            }
            Intent::CloseSelection => {
                self.selection = None;
                None
            }
            Intent::Edit => {
                if let Some(selection) = self.idle_selection(|mode| *mode == Mode::Default) {
                    selection.mode = Mode::Editing(BookDraft::from_record(&selection.record));
                }
                None
            }
            Intent::EditInput { field, value } => {
                if let Some(Selection {
                    mode: Mode::Editing(draft),
                    ..
                }) = self.selection.as_mut()
                {
                    draft.apply_input(field, &value);
                }
                None
            }
            Intent::Delete => {
                if let Some(selection) = self.idle_selection(|mode| *mode == Mode::Default) {
                    selection.mode = Mode::Deleting;
                }
                None
            }
            Intent::Cancel => {
                if let Some(selection) = self.idle_selection(|mode| *mode != Mode::Default) {
                    selection.mode = Mode::Default;
                }
                None
            }
            Intent::Confirm => self.confirm(),
            Intent::OpenNewBook => {
                self.new_book.get_or_insert_with(NewBookForm::default);
                None
            }
            Intent::NewBookInput { field, value } => {
                if let Some(form) = self.new_book.as_mut() {
                    form.draft.apply_input(field, &value);
                }
                None
            }
            Intent::ClearNewBook => {
                if let Some(form) = self.new_book.as_mut() {
                    form.draft.clear();
                }
                None
            }
            Intent::SubmitNewBook => self.submit_new_book(),
            Intent::CloseNewBook => {
                self.new_book = None;
                None
            }
            Intent::Login(credentials) => {
                let ticket = self.issue();
                self.login_ticket = Some(ticket);
                Some(PendingCall {
                    ticket,
                    call: ApiCall::Login(credentials),
                })
            }
            Intent::Register(registration) => {
                let ticket = self.issue();
                self.register_ticket = Some(ticket);
                Some(PendingCall {
                    ticket,
                    call: ApiCall::Register(registration),
                })
            }
            Intent::Logout => {
                self.logout();
                None
            }
        }
    }

    fn issue(&mut self) -> Ticket {
        self.next_ticket += 1;
        Ticket(self.next_ticket)
    }

    fn begin_fetch(&mut self) -> PendingCall {
        let ticket = self.issue();
        self.fetch = FetchState::Loading;
        self.fetch_ticket = Some(ticket);
        PendingCall {
            ticket,
            call: ApiCall::ListBooks,
        }
    }

    fn select(&mut self, id: i64) {
        match self.records.iter().find(|record| record.id == id) {
            Some(record) => {
                self.selection = Some(Selection {
                    record: record.clone(),
                    mode: Mode::Default,
                    awaiting: None,
                });
            }
            None => {
                warn!(id, "selected book is not in the collection");
                self.selection = None;
            }
        }
    }

    /// The selection, if it is not waiting on a call and its mode passes
    /// `accept`.
    fn idle_selection(&mut self, accept: impl Fn(&Mode) -> bool) -> Option<&mut Selection> {
        self.selection
            .as_mut()
            .filter(|selection| !selection.busy() && accept(&selection.mode))
    }

    fn confirm(&mut self) -> Option<PendingCall> {
        let selection = self.selection.as_ref()?;
        let id = selection.record.id;
        let call = match &selection.mode {
            Mode::Default => return None,
            Mode::Deleting => ApiCall::DeleteBook { id },
            Mode::Editing(draft) => {
                let validity = validate(draft);
                if let Some(message) = validity.message() {
                    self.notices.push_back(Notice::error(message));
                    return None;
                }
                ApiCall::UpdateBook {
                    id,
                    draft: draft.clone(),
                }
            }
        };
        let ticket = self.issue();
        if let Some(selection) = self.selection.as_mut() {
            selection.awaiting = Some(ticket);
        }
        Some(PendingCall { ticket, call })
    }

    fn submit_new_book(&mut self) -> Option<PendingCall> {
        let draft = self.new_book.as_ref()?.draft.clone();
        if let Some(message) = validate(&draft).message() {
            self.notices.push_back(Notice::error(message));
            return None;
        }
        let ticket = self.issue();
        if let Some(form) = self.new_book.as_mut() {
            form.awaiting = Some(ticket);
        }
        Some(PendingCall {
            ticket,
            call: ApiCall::CreateBook(draft),
        })
    }

    fn logout(&mut self) {
        if let Err(e) = self.session.clear() {
            warn!(error = %e, "could not clear session");
            self.notices.push_back(Notice::error("Logout failed."));
            return;
        }
        info!("logged out");
        self.signal.broadcast(SessionEvent::LoggedOut);
    }

    // --- results ---

    /// Apply the result of the call issued with `ticket`.
    pub fn resolve(
        &mut self,
        ticket: Ticket,
        result: Result<ApiReply, ApiError>,
    ) -> Option<PendingCall> {
        if self.fetch_ticket == Some(ticket) {
            self.fetch_ticket = None;
            self.finish_fetch(result);
            return None;
        }
        if self.selection.as_ref().and_then(|s| s.awaiting) == Some(ticket) {
            return self.finish_selection(result);
        }
        if self.new_book.as_ref().and_then(|f| f.awaiting) == Some(ticket) {
            return self.finish_new_book(result);
        }
        if self.login_ticket == Some(ticket) {
            self.login_ticket = None;
            self.finish_login(result);
            return None;
        }
        if self.register_ticket == Some(ticket) {
            self.register_ticket = None;
            self.finish_register(result);
            return None;
        }

        debug!(?ticket, "discarding result nobody is waiting for");
        match result {
            Ok(reply) if reply.is_mutation() => Some(self.begin_fetch()),
            _ => None,
        }
    }

    fn finish_fetch(&mut self, result: Result<ApiReply, ApiError>) {
        match result {
            Ok(ApiReply::Books(records)) => {
                debug!(count = records.len(), "collection loaded");
                self.records = records;
                self.fetch = FetchState::Ready;
            }
            Ok(other) => self.fail_fetch(format!("unexpected reply {other:?}")),
            Err(e) => self.fail_fetch(e.to_string()),
        }
    }

    fn fail_fetch(&mut self, message: String) {
        warn!(error = %message, "error fetching books");
        self.records.clear();
        self.notices
            .push_back(Notice::error(format!("Could not load books: {message}")));
        self.fetch = FetchState::Error(message);
    }

    fn finish_selection(&mut self, result: Result<ApiReply, ApiError>) -> Option<PendingCall> {
        match result {
            Ok(reply @ (ApiReply::Updated | ApiReply::Deleted)) => {
                let text = if reply == ApiReply::Updated {
                    "Book updated."
                } else {
                    "Book deleted."
                };
                self.notices.push_back(Notice::success(text));
                self.selection = None;
                self.fetch = FetchState::Idle;
                Some(self.begin_fetch())
            }
            Ok(other) => {
                warn!(reply = ?other, "unexpected reply to a selection call");
                self.release_selection();
                None
            }
            Err(e) => {
                let action = match self.selection.as_ref().map(|s| &s.mode) {
                    Some(Mode::Deleting) => "deleting",
                    _ => "updating",
                };
                warn!(error = %e, "error {action} book");
                self.notices
                    .push_back(Notice::error(format!("Error {action} book: {e}")));
                self.release_selection();
                None
            }
        }
    }

    fn release_selection(&mut self) {
        if let Some(selection) = self.selection.as_mut() {
            selection.awaiting = None;
        }
    }

    fn finish_new_book(&mut self, result: Result<ApiReply, ApiError>) -> Option<PendingCall> {
        match result {
            Ok(ApiReply::Created(record)) => {
                info!(id = record.id, "book created");
                self.notices.push_back(Notice::success("Book added."));
                self.new_book = None;
                self.fetch = FetchState::Idle;
                Some(self.begin_fetch())
            }
            other => {
                let message = match other {
                    Err(e) => e.to_string(),
                    Ok(reply) => format!("unexpected reply {reply:?}"),
                };
                warn!(error = %message, "error adding book");
                self.notices
                    .push_back(Notice::error(format!("Error adding book: {message}")));
                if let Some(form) = self.new_book.as_mut() {
                    form.awaiting = None;
                }
                None
            }
        }
    }

    fn finish_login(&mut self, result: Result<ApiReply, ApiError>) {
        let token = match result {
            Ok(ApiReply::Token(token)) => token,
            Ok(other) => {
                warn!(reply = ?other, "unexpected reply to login");
                self.notices.push_back(Notice::error("Login failed."));
                return;
            }
            Err(e) => {
                warn!(error = %e, "error during login");
                self.notices.push_back(Notice::error("Login failed."));
                return;
            }
        };
        if let Err(e) = self.session.set(&token) {
            warn!(error = %e, "could not store session");
            self.notices.push_back(Notice::error("Login failed."));
            return;
        }
        info!("logged in");
        self.signal.broadcast(SessionEvent::LoggedIn);
        self.notices
            .push_back(Notice::success("Successfully logged in!"));
    }

    fn finish_register(&mut self, result: Result<ApiReply, ApiError>) {
        match result {
            Ok(ApiReply::Registered) => {
                self.notices
                    .push_back(Notice::success("Successfully registered!"));
            }
            Ok(other) => {
                warn!(reply = ?other, "unexpected reply to register");
                self.notices.push_back(Notice::error("Registration failed."));
            }
            Err(e) => {
                warn!(error = %e, "error during registration");
                self.notices.push_back(Notice::error("Registration failed."));
            }
        }
    }
}

/// Runs a `Catalog` against a `CatalogApi`, executing each pending call
/// as soon as it is issued.
#[derive(Debug)]
pub struct Driver<A> {
    api: A,
    catalog: Catalog,
}

impl<A: CatalogApi> Driver<A> {
    pub fn new(api: A, catalog: Catalog) -> Self {
        Self { api, catalog }
    }

    pub fn dispatch(&mut self, intent: Intent) {
        let mut next = self.catalog.handle(intent);
        while let Some(pending) = next {
            let result = pending.call.execute(&self.api);
            next = self.catalog.resolve(pending.ticket, result);
        }
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn catalog_mut(&mut self) -> &mut Catalog {
        &mut self.catalog
    }

    pub fn api(&self) -> &A {
        &self.api
    }
}
