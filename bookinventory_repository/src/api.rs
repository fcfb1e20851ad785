use paperclip::actix::Apiv2Schema;
use serde::{Deserialize, Serialize};

pub type BookId = i64;

pub const MAX_RATING: f64 = 5.0;

#[derive(Debug, Default, Clone, Serialize, Deserialize, PartialEq, Apiv2Schema)]
#[serde(rename_all = "camelCase")]
/// Struct representing a single book of the inventory.
/// `id` is empty until the book is stored, afterwards it is assigned by the server and never changes
pub struct BookRecord {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<BookId>,
    pub title: String,
    pub author: String,
    pub isbn: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page_count: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stock_quantity: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub in_stock: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rating: Option<f64>,
}

#[derive(Debug, Default, Clone, Serialize, Deserialize, PartialEq, Apiv2Schema)]
#[serde(rename_all = "camelCase")]
/// Struct representing a patch to a book. Allows to specify only a few fields and patch the current record.
/// `inStock` is not patchable, it always follows `stockQuantity`
pub struct BookPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub isbn: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page_count: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stock_quantity: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rating: Option<f64>,
}

#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum BookValidationError {
    #[error("Missing required field {0}")]
    MissingField(&'static str),

    #[error("Field {0} must be a non-negative number")]
    Negative(&'static str),

    #[error("Rating {0} is outside of the 0-5 range")]
    RatingOutOfRange(f64),

    #[error("Quantity must be greater than zero")]
    ZeroQuantity,
}

impl BookRecord {
    /// Checks the rules every stored book has to follow
    pub fn validate(&self) -> Result<(), BookValidationError> {
        require_text("title", &self.title)?;
        require_text("author", &self.author)?;
        require_text("isbn", &self.isbn)?;
        if let Some(price) = self.price {
            check_price(price)?;
        }
        if let Some(rating) = self.rating {
            check_rating(rating)?;
        }
        Ok(())
    }

    /// Fills in the default stock and derives `in_stock` from it
    pub fn with_normalized_stock(mut self) -> Self {
        let quantity = self.stock_quantity.unwrap_or_default();
        self.stock_quantity = Some(quantity);
        self.in_stock = Some(quantity > 0);
        self
    }
}

impl BookPatch {
    pub fn validate(&self) -> Result<(), BookValidationError> {
        if let Some(title) = &self.title {
            require_text("title", title)?;
        }
        if let Some(author) = &self.author {
            require_text("author", author)?;
        }
        if let Some(isbn) = &self.isbn {
            require_text("isbn", isbn)?;
        }
        if let Some(price) = self.price {
            check_price(price)?;
        }
        if let Some(rating) = self.rating {
            check_rating(rating)?;
        }
        Ok(())
    }
}

fn require_text(field: &'static str, value: &str) -> Result<(), BookValidationError> {
    if value.trim().is_empty() {
        Err(BookValidationError::MissingField(field))
    } else {
        Ok(())
    }
}

pub fn check_price(price: f64) -> Result<(), BookValidationError> {
    if price.is_finite() && price >= 0.0 {
        Ok(())
    } else {
        Err(BookValidationError::Negative("price"))
    }
}

pub fn check_rating(rating: f64) -> Result<(), BookValidationError> {
    if (0.0..=MAX_RATING).contains(&rating) {
        Ok(())
    } else {
        Err(BookValidationError::RatingOutOfRange(rating))
    }
}

pub fn check_quantity(quantity: u32) -> Result<(), BookValidationError> {
    if quantity == 0 {
        Err(BookValidationError::ZeroQuantity)
    } else {
        Ok(())
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
/// Selection of books to list. Only one kind of filter can be active at a time
pub enum BookFilter {
    #[default]
    All,
    Search(String),
    Category(String),
    Stock(bool),
    PriceRange { min_price: f64, max_price: f64 },
    MinRating(f64),
}

impl BookFilter {
    /// Builds a search filter, blank query means no filtering at all
    pub fn search(query: &str) -> Self {
        let query = query.trim();
        if query.is_empty() {
            BookFilter::All
        } else {
            BookFilter::Search(query.to_string())
        }
    }

    pub fn matches(&self, book: &BookRecord) -> bool {
        match self {
            BookFilter::All => true,
            BookFilter::Search(query) => {
                let query = query.to_lowercase();
                [&book.title, &book.author, &book.isbn]
                    .iter()
                    .any(|value| value.to_lowercase().contains(&query))
            }
            BookFilter::Category(category) => book.category.as_ref() == Some(category),
            BookFilter::Stock(in_stock) => book.in_stock.unwrap_or_default() == *in_stock,
            BookFilter::PriceRange {
                min_price,
                max_price,
            } => book
                .price
                .is_some_and(|price| *min_price <= price && price <= *max_price),
            BookFilter::MinRating(min_rating) => {
                book.rating.is_some_and(|rating| rating >= *min_rating)
            }
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Apiv2Schema)]
pub struct SearchQuery {
    pub query: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Apiv2Schema)]
pub struct CategoryQuery {
    pub category: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Apiv2Schema)]
#[serde(rename_all = "camelCase")]
pub struct StockQuery {
    pub in_stock: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, Apiv2Schema)]
#[serde(rename_all = "camelCase")]
pub struct PriceRangeQuery {
    pub min_price: f64,
    pub max_price: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, Apiv2Schema)]
#[serde(rename_all = "camelCase")]
pub struct RatingQuery {
    pub min_rating: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, Apiv2Schema)]
pub struct QuantityQuery {
    pub quantity: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize, Apiv2Schema)]
pub struct RatingValueQuery {
    pub rating: f64,
}

#[cfg(test)]
mod api_tests {
    use serde_json::json;

    use crate::api::{BookFilter, BookPatch, BookRecord, BookValidationError};

    fn book(title: &str, author: &str, isbn: &str) -> BookRecord {
        BookRecord {
            title: title.to_string(),
            author: author.to_string(),
            isbn: isbn.to_string(),
            ..BookRecord::default()
        }
    }

    #[test]
    fn test_record_uses_camel_case_and_skips_empty_fields() {
        let record = BookRecord {
            page_count: Some(120),
            stock_quantity: Some(3),
            ..book("Dune", "Herbert", "978-0441013593")
        };

        assert_eq!(
            serde_json::to_value(&record).unwrap(),
            json!({
                "title": "Dune",
                "author": "Herbert",
                "isbn": "978-0441013593",
                "pageCount": 120,
                "stockQuantity": 3
            })
        );

        let parsed: BookRecord =
            serde_json::from_value(json!({"id": 7, "title": "a", "author": "b", "isbn": "c", "inStock": true}))
                .unwrap();
        assert_eq!(parsed.id, Some(7));
        assert_eq!(parsed.in_stock, Some(true));
        assert_eq!(parsed.rating, None);
    }

    #[test]
    fn test_validation_rules() {
        assert_eq!(book("a", "b", "c").validate(), Ok(()));
        assert_eq!(
            book("  ", "b", "c").validate(),
            Err(BookValidationError::MissingField("title"))
        );
        assert_eq!(
            book("a", "", "c").validate(),
            Err(BookValidationError::MissingField("author"))
        );
        assert_eq!(
            book("a", "b", "").validate(),
            Err(BookValidationError::MissingField("isbn"))
        );
        assert_eq!(
            BookRecord {
                price: Some(-1.0),
                ..book("a", "b", "c")
            }
            .validate(),
            Err(BookValidationError::Negative("price"))
        );
        assert_eq!(
            BookRecord {
                rating: Some(5.5),
                ..book("a", "b", "c")
            }
            .validate(),
            Err(BookValidationError::RatingOutOfRange(5.5))
        );

        let empty_title_patch = BookPatch {
            title: Some("".to_string()),
            ..BookPatch::default()
        };
        assert_eq!(
            empty_title_patch.validate(),
            Err(BookValidationError::MissingField("title"))
        );
        assert_eq!(BookPatch::default().validate(), Ok(()));
    }

    #[test]
    fn test_stock_normalization() {
        let normalized = book("a", "b", "c").with_normalized_stock();
        assert_eq!(normalized.stock_quantity, Some(0));
        assert_eq!(normalized.in_stock, Some(false));

        let normalized = BookRecord {
            stock_quantity: Some(4),
            in_stock: Some(false),
            ..book("a", "b", "c")
        }
        .with_normalized_stock();
        assert_eq!(normalized.in_stock, Some(true));
    }

    #[test]
    fn test_filter_matching() {
        let record = BookRecord {
            price: Some(25.0),
            rating: Some(4.5),
            category: Some("Fiction".to_string()),
            ..book("The Hobbit", "Tolkien", "978-0547928227")
        }
        .with_normalized_stock();

        assert!(BookFilter::All.matches(&record));
        assert!(BookFilter::Search("hobb".to_string()).matches(&record));
        assert!(BookFilter::Search("TOLK".to_string()).matches(&record));
        assert!(BookFilter::Search("928227".to_string()).matches(&record));
        assert!(!BookFilter::Search("dune".to_string()).matches(&record));
        assert!(BookFilter::Category("Fiction".to_string()).matches(&record));
        assert!(!BookFilter::Category("fiction".to_string()).matches(&record));
        assert!(BookFilter::Stock(false).matches(&record));
        assert!(!BookFilter::Stock(true).matches(&record));
        assert!(BookFilter::PriceRange {
            min_price: 25.0,
            max_price: 30.0
        }
        .matches(&record));
        assert!(!BookFilter::PriceRange {
            min_price: 0.0,
            max_price: 24.99
        }
        .matches(&record));
        assert!(BookFilter::MinRating(4.5).matches(&record));
        assert!(!BookFilter::MinRating(4.6).matches(&record));
    }

    #[test]
    fn test_blank_search_lists_everything() {
        assert_eq!(BookFilter::search("   "), BookFilter::All);
        assert_eq!(
            BookFilter::search(" tolkien "),
            BookFilter::Search("tolkien".to_string())
        );
    }
}
