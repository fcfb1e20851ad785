//! Book form backed by a per-field schema.
//!
//! Raw text typed into an input is coerced according to the [`FieldSchema`]
//! of the field it belongs to, so a single [`BookForm::set_field`] handles every input.

use serde_json::{Map, Value};

use bookinventory_repository::api::{BookRecord, BookValidationError, MAX_RATING};

/// Kind of value a form field holds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Text,
    Decimal,
    Integer,
}

impl std::fmt::Display for FieldKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FieldKind::Text => write!(f, "text"),
            FieldKind::Decimal => write!(f, "decimal"),
            FieldKind::Integer => write!(f, "integer"),
        }
    }
}

/// Definition of one input of the book form.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FieldSchema {
    /// Field name as sent over the wire
    pub name: &'static str,
    pub kind: FieldKind,
    /// Whether the field has to be filled before submitting
    pub required: bool,
    /// Inclusive lower bound of numeric fields
    pub min: Option<f64>,
    /// Inclusive upper bound of numeric fields
    pub max: Option<f64>,
}

impl FieldSchema {
    pub const fn required_text(name: &'static str) -> Self {
        Self {
            name,
            kind: FieldKind::Text,
            required: true,
            min: None,
            max: None,
        }
    }

    pub const fn text(name: &'static str) -> Self {
        Self {
            name,
            kind: FieldKind::Text,
            required: false,
            min: None,
            max: None,
        }
    }

    pub const fn number(name: &'static str, kind: FieldKind, min: f64, max: Option<f64>) -> Self {
        Self {
            name,
            kind,
            required: false,
            min: Some(min),
            max,
        }
    }

    /// Coerces raw input into the value stored for this field, None for an empty input
    pub fn parse(&self, raw: &str) -> Result<Option<Value>, FormError> {
        if self.kind != FieldKind::Text && raw.trim().is_empty() {
            return Ok(None);
        }
        if self.kind == FieldKind::Text && raw.is_empty() && !self.required {
            return Ok(None);
        }
        let value = match self.kind {
            FieldKind::Text => return Ok(Some(Value::String(raw.to_string()))),
            FieldKind::Decimal => raw
                .trim()
                .parse::<f64>()
                .ok()
                .filter(|value| value.is_finite())
                .ok_or_else(|| self.invalid_number(raw))?,
            FieldKind::Integer => raw
                .trim()
                .parse::<i64>()
                .map_err(|_| self.invalid_number(raw))? as f64,
        };
        self.check_bounds(value)?;
        let value = match self.kind {
            FieldKind::Integer => Value::from(value as u32),
            _ => Value::from(value),
        };
        Ok(Some(value))
    }

    fn check_bounds(&self, value: f64) -> Result<(), FormError> {
        let below = self.min.is_some_and(|min| value < min);
        let above = self.max.is_some_and(|max| value > max);
        if below || above {
            return Err(FormError::OutOfRange {
                field: self.name,
                min: self.min,
                max: self.max,
            });
        }
        Ok(())
    }

    fn invalid_number(&self, raw: &str) -> FormError {
        FormError::InvalidNumber {
            field: self.name,
            kind: self.kind,
            raw: raw.to_string(),
        }
    }
}

pub static BOOK_FIELDS: [FieldSchema; 9] = [
    FieldSchema::required_text("title"),
    FieldSchema::required_text("author"),
    FieldSchema::required_text("isbn"),
    FieldSchema::number("price", FieldKind::Decimal, 0.0, None),
    FieldSchema::number("pageCount", FieldKind::Integer, 0.0, Some(u32::MAX as f64)),
    FieldSchema::text("description"),
    FieldSchema::text("category"),
    FieldSchema::number("stockQuantity", FieldKind::Integer, 0.0, Some(u32::MAX as f64)),
    FieldSchema::number("rating", FieldKind::Decimal, 0.0, Some(MAX_RATING)),
];

pub fn field_schema(name: &str) -> Option<&'static FieldSchema> {
    BOOK_FIELDS.iter().find(|field| field.name == name)
}

#[derive(thiserror::Error, Debug, PartialEq)]
pub enum FormError {
    #[error("Unknown field {0}")]
    UnknownField(String),

    #[error("Field {field} expects a {kind} number, got {raw:?}")]
    InvalidNumber {
        field: &'static str,
        kind: FieldKind,
        raw: String,
    },

    #[error("Field {field} is out of range {}..={}", fmt_bound(.min), fmt_bound(.max))]
    OutOfRange {
        field: &'static str,
        min: Option<f64>,
        max: Option<f64>,
    },

    #[error(transparent)]
    Invalid(#[from] BookValidationError),

    #[error("Malformed form values: {0}")]
    Malformed(String),
}

fn fmt_bound(bound: &Option<f64>) -> String {
    bound.map(|bound| bound.to_string()).unwrap_or_default()
}

/// Values of the create/edit form.
/// Holds an id only while an existing book is edited
#[derive(Debug, Clone, PartialEq)]
pub struct BookForm {
    values: Map<String, Value>,
}

impl Default for BookForm {
    fn default() -> Self {
        Self::new()
    }
}

impl BookForm {
    /// Empty form for a new book
    pub fn new() -> Self {
        let values = BOOK_FIELDS
            .iter()
            .filter(|field| field.required)
            .map(|field| (field.name.to_string(), Value::String(String::new())))
            .collect();
        Self { values }
    }

    /// Form prefilled with an existing book
    pub fn edit(book: &BookRecord) -> Self {
        match serde_json::to_value(book) {
            Ok(Value::Object(values)) => Self { values },
            _ => Self::new(),
        }
    }

    pub fn set_field(&mut self, name: &str, raw: &str) -> Result<(), FormError> {
        let field = field_schema(name).ok_or_else(|| FormError::UnknownField(name.to_string()))?;
        match field.parse(raw)? {
            Some(value) => self.values.insert(field.name.to_string(), value),
            None => self.values.remove(field.name),
        };
        Ok(())
    }

    pub fn value(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
    }

    pub fn is_editing(&self) -> bool {
        self.values.get("id").is_some_and(|id| !id.is_null())
    }

    /// Builds the book to submit, checking the required fields
    pub fn submit(&self) -> Result<BookRecord, FormError> {
        let book: BookRecord = serde_json::from_value(Value::Object(self.values.clone()))
            .map_err(|err| FormError::Malformed(err.to_string()))?;
        book.validate()?;
        Ok(book)
    }

    pub fn clear(&mut self) {
        *self = Self::new();
    }
}

#[cfg(test)]
mod form_tests {
    use bookinventory_repository::api::{BookRecord, BookValidationError};
    use serde_json::json;

    use crate::form::{field_schema, BookForm, FieldKind, FormError};

    #[test]
    fn test_new_form_fails_on_required_fields() {
        let form = BookForm::new();
        assert!(!form.is_editing());
        assert_eq!(form.value("title"), Some(&json!("")));
        assert_eq!(
            form.submit(),
            Err(FormError::Invalid(BookValidationError::MissingField("title")))
        );
    }

    #[test]
    fn test_fields_are_coerced_by_schema() {
        let mut form = BookForm::new();
        form.set_field("title", "Kindred").unwrap();
        form.set_field("author", "Octavia E. Butler").unwrap();
        form.set_field("isbn", "978-0807083697").unwrap();
        form.set_field("price", " 14.95 ").unwrap();
        form.set_field("pageCount", "264").unwrap();
        form.set_field("stockQuantity", "7").unwrap();
        form.set_field("rating", "5").unwrap();
        form.set_field("category", "Classics").unwrap();

        assert_eq!(form.value("pageCount"), Some(&json!(264)));
        assert_eq!(
            form.submit().unwrap(),
            BookRecord {
                title: "Kindred".to_string(),
                author: "Octavia E. Butler".to_string(),
                isbn: "978-0807083697".to_string(),
                price: Some(14.95),
                page_count: Some(264),
                category: Some("Classics".to_string()),
                stock_quantity: Some(7),
                rating: Some(5.0),
                ..BookRecord::default()
            }
        );

        form.set_field("price", "").unwrap();
        form.set_field("category", "").unwrap();
        let book = form.submit().unwrap();
        assert_eq!(book.price, None);
        assert_eq!(book.category, None);
    }

    #[test]
    fn test_bad_input_is_rejected() {
        let mut form = BookForm::new();
        assert_eq!(
            form.set_field("publisher", "Ace"),
            Err(FormError::UnknownField("publisher".to_string()))
        );
        assert!(matches!(
            form.set_field("pageCount", "12.5"),
            Err(FormError::InvalidNumber {
                field: "pageCount",
                kind: FieldKind::Integer,
                ..
            })
        ));
        assert!(matches!(
            form.set_field("price", "NaN"),
            Err(FormError::InvalidNumber { .. })
        ));
        assert!(matches!(
            form.set_field("price", "-1"),
            Err(FormError::OutOfRange { field: "price", .. })
        ));
        assert_eq!(
            form.set_field("rating", "5.5").unwrap_err().to_string(),
            "Field rating is out of range 0..=5"
        );
        assert!(matches!(
            form.set_field("stockQuantity", "-3"),
            Err(FormError::OutOfRange { .. })
        ));
        assert_eq!(form.value("price"), None);
        assert_eq!(field_schema("rating").unwrap().kind, FieldKind::Decimal);
    }

    #[test]
    fn test_edit_keeps_id_and_clear_resets() {
        let book = BookRecord {
            id: Some(9),
            title: "Parable of the Sower".to_string(),
            author: "Octavia E. Butler".to_string(),
            isbn: "978-1538732182".to_string(),
            stock_quantity: Some(0),
            in_stock: Some(false),
            ..BookRecord::default()
        };
        let mut form = BookForm::edit(&book);
        assert!(form.is_editing());

        form.set_field("title", "Parable of the Talents").unwrap();
        let submitted = form.submit().unwrap();
        assert_eq!(submitted.id, Some(9));
        assert_eq!(submitted.title, "Parable of the Talents");

        form.clear();
        assert_eq!(form, BookForm::new());
    }
}
