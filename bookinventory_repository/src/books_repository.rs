pub use in_memory_books_repository::InMemoryBookRepository;
pub use postgres_books_repository::{PostgresBooksRepository, PostgresBooksRepositoryConfig};

use crate::api::{BookFilter, BookId, BookPatch, BookRecord, BookValidationError};

mod in_memory_books_repository;
mod postgres_books_repository;

#[derive(thiserror::Error, Debug)]
pub enum BookRepositoryError {
    #[error("Book {0} not found")]
    NotFound(BookId),

    #[error("Book {book_id} has only {available} copies in stock, requested {requested}")]
    InsufficientStock {
        book_id: BookId,
        requested: u32,
        available: u32,
    },

    #[error("Invalid book: {0}")]
    Invalid(#[from] BookValidationError),

    #[error("Failed to deserialize book: {0}")]
    DeserializationError(#[from] serde_json::Error),

    #[error("DatabaseFailure failure {0}")]
    DatabaseFailure(#[from] tokio_postgres::Error),

    #[error("Other error {0}")]
    Other(String),
}

/// Storage of the book inventory.
/// Every write keeps `in_stock` derived from `stock_quantity`
#[async_trait::async_trait]
pub trait BookRepository: Send + Sync {
    /// Adds book to repository, returns the stored book with its assigned id
    async fn add_book(&self, book: BookRecord) -> Result<BookRecord, BookRepositoryError>;
    /// Replaces all fields of the book, id stays the same
    async fn replace_book(
        &self,
        book_id: BookId,
        book: BookRecord,
    ) -> Result<BookRecord, BookRepositoryError>;
    /// Updates only the fields present in the patch
    async fn patch_book(
        &self,
        book_id: BookId,
        patch: BookPatch,
    ) -> Result<BookRecord, BookRepositoryError>;
    async fn delete_book(&self, book_id: BookId) -> Result<(), BookRepositoryError>;
    /// Retrieves the book from repository
    async fn get_book(&self, book_id: BookId) -> Result<BookRecord, BookRepositoryError>;
    /// Lists books matching the filter, ordered by id
    async fn list_books(&self, filter: &BookFilter)
        -> Result<Vec<BookRecord>, BookRepositoryError>;
    /// Distinct categories of all books, sorted
    async fn list_categories(&self) -> Result<Vec<String>, BookRepositoryError>;
    async fn set_stock(
        &self,
        book_id: BookId,
        quantity: u32,
    ) -> Result<BookRecord, BookRepositoryError>;
    /// Decreases stock by quantity, fails without change when there is not enough copies
    async fn buy_book(
        &self,
        book_id: BookId,
        quantity: u32,
    ) -> Result<BookRecord, BookRepositoryError>;
    async fn set_rating(
        &self,
        book_id: BookId,
        rating: f64,
    ) -> Result<BookRecord, BookRepositoryError>;
}
