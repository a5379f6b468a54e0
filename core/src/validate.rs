//! Validation rules for book drafts.
//!
//! Two independent layers guard a draft:
//!
//! - [`filter_input`] runs on every keystroke and refuses characters a field
//!   can never contain.
//! - [`validate`] runs at submit time and checks the whole draft.
//!
//! Submit-time validation reports every failing rule, in rule order. Forms
//! that show a single message use [`Validity::message`], which is the first
//! failure.

use std::fmt;

use chrono::Datelike;

use crate::draft::{BookDraft, Field};

/// Earliest publication year accepted.
pub const MIN_YEAR: i32 = 1700;

/// Maximum number of characters in the year field.
pub const MAX_YEAR_LEN: usize = 4;

/// Which rule a field broke.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rule {
    Required,
    NoDigits,
    YearRange { min: i32, max: i32 },
    YearTooLong,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    pub field: Field,
    pub rule: Rule,
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.rule {
            Rule::Required => write!(f, "{} is required", self.field),
            Rule::NoDigits => write!(f, "{} must not contain digits", self.field),
            Rule::YearRange { min, max } => {
                write!(f, "{} must be between {min} and {max}", self.field)
            }
            Rule::YearTooLong => {
                write!(f, "{} must have at most {MAX_YEAR_LEN} digits", self.field)
            }
        }
    }
}

/// Outcome of [`validate`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Validity {
    pub valid: bool,
    pub errors: Vec<FieldError>,
}

impl Validity {
    fn from_errors(errors: Vec<FieldError>) -> Self {
        Self {
            valid: errors.is_empty(),
            errors,
        }
    }

    /// First failure, for single-message forms.
    pub fn message(&self) -> Option<String> {
        self.errors.first().map(ToString::to_string)
    }

    pub fn has(&self, field: Field, rule: Rule) -> bool {
        self.errors
            .iter()
            .any(|error| error.field == field && error.rule == rule)
    }
}

/// Validate a draft against the local clock's current year.
pub fn validate(draft: &BookDraft) -> Validity {
    validate_at(draft, chrono::Local::now().year())
}

/// Validate a draft with an explicit upper bound for the year.
pub fn validate_at(draft: &BookDraft, current_year: i32) -> Validity {
    let mut errors = Vec::new();

    for field in [Field::Title, Field::Author, Field::Description, Field::Genre] {
        if draft.get(field).trim().is_empty() {
            errors.push(FieldError {
                field,
                rule: Rule::Required,
            });
        }
    }

    if has_digit(&draft.author) {
        errors.push(FieldError {
            field: Field::Author,
            rule: Rule::NoDigits,
        });
    }

    let in_range = draft
        .year
        .trim()
        .parse::<i32>()
        .is_ok_and(|year| (MIN_YEAR..=current_year).contains(&year));
    if !in_range {
        errors.push(FieldError {
            field: Field::Year,
            rule: Rule::YearRange {
                min: MIN_YEAR,
                max: current_year,
            },
        });
    }

    if draft.year.chars().count() > MAX_YEAR_LEN {
        errors.push(FieldError {
            field: Field::Year,
            rule: Rule::YearTooLong,
        });
    }

    if has_digit(&draft.genre) {
        errors.push(FieldError {
            field: Field::Genre,
            rule: Rule::NoDigits,
        });
    }

    Validity::from_errors(errors)
}

/// Result of a keystroke-level change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputOutcome {
    /// The value to store, with leading whitespace removed.
    Accepted(String),
    Rejected(Rule),
}

/// Filter one proposed field value as the user types it.
///
/// Leading whitespace is always trimmed. Digits are refused in `author` and
/// `genre`; `year` takes digits only, at most [`MAX_YEAR_LEN`] of them.
pub fn filter_input(field: Field, proposed: &str) -> InputOutcome {
    let value = proposed.trim_start();
    match field {
        Field::Author | Field::Genre if has_digit(value) => InputOutcome::Rejected(Rule::NoDigits),
        Field::Year if !value.chars().all(|c| c.is_ascii_digit()) => {
            InputOutcome::Rejected(Rule::YearRange {
                min: MIN_YEAR,
                max: chrono::Local::now().year(),
            })
        }
        Field::Year if value.chars().count() > MAX_YEAR_LEN => {
            InputOutcome::Rejected(Rule::YearTooLong)
        }
        _ => InputOutcome::Accepted(value.to_string()),
    }
}

fn has_digit(value: &str) -> bool {
    value.chars().any(|c| c.is_ascii_digit())
}

#[cfg(test)]
mod tests {
    use super::*;

    const NOW: i32 = 2024;

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
    fn complete_draft_is_valid() {
        let validity = validate_at(&dune(), NOW);
        assert!(validity.valid);
        assert!(validity.errors.is_empty());
        assert_eq!(validity.message(), None);
    }

    #[test]
    fn validate_uses_the_current_year() {
        assert!(validate(&dune()).valid);
    }

    #[test]
    fn blank_required_fields_are_rejected() {
        for field in [Field::Title, Field::Author, Field::Description, Field::Genre] {
            let mut draft = dune();
            match field {
                Field::Title => draft.title = "   ".to_string(),
                Field::Author => draft.author = "\t".to_string(),
                Field::Description => draft.description = " \n ".to_string(),
                _ => draft.genre = String::new(),
            }
            let validity = validate_at(&draft, NOW);
            assert!(!validity.valid, "{field} left blank");
            assert!(validity.has(field, Rule::Required), "{field}");
        }
    }

    #[test]
    fn digits_in_author_or_genre_are_rejected() {
        let mut draft = dune();
        draft.author = "Herbert2".to_string();
        draft.genre = "Sci5".to_string();
        let validity = validate_at(&draft, NOW);
        assert!(validity.has(Field::Author, Rule::NoDigits));
        assert!(validity.has(Field::Genre, Rule::NoDigits));
    }

    #[test]
    fn year_must_be_in_range() {
        let range = Rule::YearRange { min: MIN_YEAR, max: NOW };
        for year in ["1699", "2025", "0", "-1"] {
            let mut draft = dune();
            draft.year = year.to_string();
            let validity = validate_at(&draft, NOW);
            assert!(validity.has(Field::Year, range), "{year}");
        }
        for year in ["1700", "2024"] {
            let mut draft = dune();
            draft.year = year.to_string();
            assert!(validate_at(&draft, NOW).valid, "{year}");
        }
    }

    #[test]
    fn non_numeric_year_fails_the_range_rule() {
        let mut draft = dune();
        draft.year = "abcd".to_string();
        let validity = validate_at(&draft, NOW);
        assert!(!validity.valid);
        assert_eq!(
            validity.errors,
            vec![FieldError {
                field: Field::Year,
                rule: Rule::YearRange { min: MIN_YEAR, max: NOW },
            }]
        );
        assert_eq!(
            validity.message().as_deref(),
            Some("Year must be between 1700 and 2024")
        );
    }

    #[test]
    fn long_year_is_rejected_even_when_numeric() {
        for year in ["01965", "00001", "19650", "1965 "] {
            let mut draft = dune();
            draft.year = year.to_string();
            let validity = validate_at(&draft, 99_999);
            assert!(!validity.valid, "{year:?}");
            assert!(validity.has(Field::Year, Rule::YearTooLong), "{year:?}");
        }
    }

    #[test]
    fn errors_follow_rule_order() {
        let draft = BookDraft {
            title: String::new(),
            author: "A1".to_string(),
            description: "d".to_string(),
            year: "12345".to_string(),
            genre: "G2".to_string(),
        };
        let rules: Vec<_> = validate_at(&draft, NOW)
            .errors
            .into_iter()
            .map(|e| (e.field, e.rule))
            .collect();
        assert_eq!(
            rules,
            vec![
                (Field::Title, Rule::Required),
                (Field::Author, Rule::NoDigits),
                (Field::Year, Rule::YearRange { min: MIN_YEAR, max: NOW }),
                (Field::Year, Rule::YearTooLong),
                (Field::Genre, Rule::NoDigits),
            ]
        );
    }

    #[test]
    fn keystroke_filter_trims_leading_whitespace() {
        assert_eq!(
            filter_input(Field::Title, "   Dune "),
            InputOutcome::Accepted("Dune ".to_string())
        );
        assert_eq!(
            filter_input(Field::Year, " 19"),
            InputOutcome::Accepted("19".to_string())
        );
    }

    #[test]
    fn keystroke_filter_rejects_digits_in_names() {
        assert_eq!(
            filter_input(Field::Author, "Herbert2"),
            InputOutcome::Rejected(Rule::NoDigits)
        );
        assert_eq!(
            filter_input(Field::Genre, "4X"),
            InputOutcome::Rejected(Rule::NoDigits)
        );
        assert!(matches!(
            filter_input(Field::Title, "2001"),
            InputOutcome::Accepted(_)
        ));
    }

    #[test]
    fn keystroke_filter_limits_year() {
        assert!(matches!(
            filter_input(Field::Year, "19a"),
            InputOutcome::Rejected(Rule::YearRange { .. })
        ));
        assert_eq!(
            filter_input(Field::Year, "19650"),
            InputOutcome::Rejected(Rule::YearTooLong)
        );
        assert_eq!(
            filter_input(Field::Year, ""),
            InputOutcome::Accepted(String::new())
        );
    }
}
