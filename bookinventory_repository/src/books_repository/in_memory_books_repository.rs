use std::collections::{BTreeMap, BTreeSet};
use std::sync::atomic::{AtomicI64, Ordering};

use serde_json::json;

use crate::api::{check_quantity, check_rating, BookFilter, BookId, BookPatch, BookRecord};
use crate::books_repository::{BookRepository, BookRepositoryError};

pub struct InMemoryBookRepository {
    book_sequence_generator: AtomicI64,
    books: parking_lot::RwLock<BTreeMap<BookId, BookRecord>>,
}

impl Default for InMemoryBookRepository {
    fn default() -> Self {
        Self {
            book_sequence_generator: AtomicI64::new(1),
            books: Default::default(),
        }
    }
}

impl InMemoryBookRepository {
    fn update_with<F>(&self, book_id: BookId, update: F) -> Result<BookRecord, BookRepositoryError>
    where
        F: FnOnce(&BookRecord) -> Result<BookRecord, BookRepositoryError>,
    {
        let mut locked_books = self.books.write();
        let book = locked_books
            .get_mut(&book_id)
            .ok_or(BookRepositoryError::NotFound(book_id))?;
        let mut updated = update(book)?.with_normalized_stock();
        updated.id = Some(book_id);
        *book = updated.clone();
        Ok(updated)
    }
}

#[async_trait::async_trait]
impl BookRepository for InMemoryBookRepository {
    async fn add_book(&self, book: BookRecord) -> Result<BookRecord, BookRepositoryError> {
        book.validate()?;
        let id = self.book_sequence_generator.fetch_add(1, Ordering::Relaxed);
        let book = BookRecord {
            id: Some(id),
            ..book.with_normalized_stock()
        };
        self.books.write().insert(id, book.clone());
        Ok(book)
    }

    async fn replace_book(
        &self,
        book_id: BookId,
        book: BookRecord,
    ) -> Result<BookRecord, BookRepositoryError> {
        book.validate()?;
        self.update_with(book_id, |_| Ok(book))
    }

    async fn patch_book(
        &self,
        book_id: BookId,
        patch: BookPatch,
    ) -> Result<BookRecord, BookRepositoryError> {
        patch.validate()?;
        self.update_with(book_id, |book| {
            let mut result_book = json!(book);
            json_patch::merge(&mut result_book, &json!(patch));
            Ok(serde_json::from_value(result_book)?)
        })
    }

    async fn delete_book(&self, book_id: BookId) -> Result<(), BookRepositoryError> {
        self.books
            .write()
            .remove(&book_id)
            .map(|_| ())
            .ok_or(BookRepositoryError::NotFound(book_id))
    }

    async fn get_book(&self, book_id: BookId) -> Result<BookRecord, BookRepositoryError> {
        self.books
            .read()
            .get(&book_id)
            .cloned()
            .ok_or(BookRepositoryError::NotFound(book_id))
    }

    async fn list_books(
        &self,
        filter: &BookFilter,
    ) -> Result<Vec<BookRecord>, BookRepositoryError> {
        Ok(self
            .books
            .read()
            .values()
            .filter(|book| filter.matches(book))
            .cloned()
            .collect())
    }

    async fn list_categories(&self) -> Result<Vec<String>, BookRepositoryError> {
        let categories: BTreeSet<String> = self
            .books
            .read()
            .values()
            .filter_map(|book| book.category.clone())
            .collect();
        Ok(categories.into_iter().collect())
    }

    async fn set_stock(
        &self,
        book_id: BookId,
        quantity: u32,
    ) -> Result<BookRecord, BookRepositoryError> {
        self.update_with(book_id, |book| {
            Ok(BookRecord {
                stock_quantity: Some(quantity),
                ..book.clone()
            })
        })
    }

    async fn buy_book(
        &self,
        book_id: BookId,
        quantity: u32,
    ) -> Result<BookRecord, BookRepositoryError> {
        check_quantity(quantity)?;
        self.update_with(book_id, |book| {
            let available = book.stock_quantity.unwrap_or_default();
            if available < quantity {
                return Err(BookRepositoryError::InsufficientStock {
                    book_id,
                    requested: quantity,
                    available,
                });
            }
            Ok(BookRecord {
                stock_quantity: Some(available - quantity),
                ..book.clone()
            })
        })
    }

    async fn set_rating(
        &self,
        book_id: BookId,
        rating: f64,
    ) -> Result<BookRecord, BookRepositoryError> {
        check_rating(rating)?;
        self.update_with(book_id, |book| {
            Ok(BookRecord {
                rating: Some(rating),
                ..book.clone()
            })
        })
    }
}
