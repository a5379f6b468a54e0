//! Editable form state for a book.
//!
//! A `BookDraft` holds every field as text so a form can pass through
//! invalid intermediate states (an empty year, a half-typed title). It is
//! only converted to a `BookPayload` at submit time.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::types::BookRecord;
use crate::validate::{filter_input, InputOutcome};

/// One editable field of a book form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Field {
    Title,
    Author,
    Description,
    Year,
    Genre,
}

impl Field {
    pub const ALL: [Field; 5] = [
        Field::Title,
        Field::Author,
        Field::Description,
        Field::Year,
        Field::Genre,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Field::Title => "Title",
            Field::Author => "Author",
            Field::Description => "Description",
            Field::Year => "Year",
            Field::Genre => "Genre",
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Unsaved working copy of a book.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookDraft {
    pub title: String,
    pub author: String,
    pub description: String,
    pub year: String,
    pub genre: String,
}

impl BookDraft {
    /// Snapshot a stored record into an editable draft.
    pub fn from_record(record: &BookRecord) -> Self {
        Self {
            title: record.title.clone(),
            author: record.author.clone(),
            description: record.description.clone().unwrap_or_default(),
            year: record.year.to_string(),
            genre: record.genre.clone(),
        }
    }

    pub fn get(&self, field: Field) -> &str {
        match field {
            Field::Title => &self.title,
            Field::Author => &self.author,
            Field::Description => &self.description,
            Field::Year => &self.year,
            Field::Genre => &self.genre,
        }
    }

    fn slot(&mut self, field: Field) -> &mut String {
        match field {
            Field::Title => &mut self.title,
            Field::Author => &mut self.author,
            Field::Description => &mut self.description,
            Field::Year => &mut self.year,
            Field::Genre => &mut self.genre,
        }
    }

    /// Apply one keystroke-level change to `field`.
    ///
    /// The value passes through [`filter_input`]; a rejected change leaves
    /// the field as it was. Returns whether the change was accepted.
    pub fn apply_input(&mut self, field: Field, value: &str) -> bool {
        match filter_input(field, value) {
            InputOutcome::Accepted(value) => {
                *self.slot(field) = value;
                true
            }
            InputOutcome::Rejected(reason) => {
                tracing::debug!(%field, ?reason, "input rejected");
                false
            }
        }
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }
}
