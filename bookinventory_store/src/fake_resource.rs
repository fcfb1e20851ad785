use std::collections::{BTreeSet, HashMap};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::Notify;

use bookinventory_repository::api::{
    check_quantity, check_rating, BookFilter, BookId, BookPatch, BookRecord,
};
use bookinventory_repository::client::RequestError;

use crate::remote::BooksResource;

/// In process stand-in for the books REST resource.
/// Requests can be held back with [`FakeBooksResource::gate`] to control the order of responses
pub struct FakeBooksResource {
    books: Mutex<Vec<BookRecord>>,
    next_id: Mutex<BookId>,
    calls: AtomicUsize,
    failing: AtomicBool,
    gates: Mutex<HashMap<String, Arc<Notify>>>,
    response_gates: Mutex<HashMap<String, Arc<Notify>>>,
}

fn status(status: u16, message: &str) -> RequestError {
    RequestError::Status {
        status,
        message: message.to_string(),
    }
}

fn not_found(book_id: BookId) -> RequestError {
    status(404, &format!("Book with id {} not found", book_id))
}

impl FakeBooksResource {
    pub fn with_books(books: Vec<BookRecord>) -> Self {
        let next_id = books.iter().filter_map(|book| book.id).max().unwrap_or(0) + 1;
        Self {
            books: Mutex::new(books),
            next_id: Mutex::new(next_id),
            calls: AtomicUsize::new(0),
            failing: AtomicBool::new(false),
            gates: Default::default(),
            response_gates: Default::default(),
        }
    }

    /// Number of requests that reached the resource
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn fail_requests(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Next request with `key` waits until the returned notify is triggered.
    /// Keys are `list`, `search:<query>` and `category:<name>`
    pub fn gate(&self, key: &str) -> Arc<Notify> {
        let notify = Arc::new(Notify::new());
        self.gates.lock().insert(key.to_string(), notify.clone());
        notify
    }

    /// Next request with `key` is applied right away but its response waits
    /// until the returned notify is triggered. Keys are `list`, `create` and `categories`
    pub fn gate_response(&self, key: &str) -> Arc<Notify> {
        let notify = Arc::new(Notify::new());
        self.response_gates
            .lock()
            .insert(key.to_string(), notify.clone());
        notify
    }

    /// Changes a book behind the back of the store
    pub fn replace_remote(&self, book: BookRecord) {
        let mut books = self.books.lock();
        if let Some(existing) = books.iter_mut().find(|existing| existing.id == book.id) {
            *existing = book;
        }
    }

    async fn request(&self, key: &str) -> Result<(), RequestError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let gate = self.gates.lock().remove(key);
        if let Some(gate) = gate {
            gate.notified().await;
        }
        if self.failing.load(Ordering::SeqCst) {
            return Err(status(500, "Internal Server Error"));
        }
        Ok(())
    }

    async fn respond(&self, key: &str) {
        let gate = self.response_gates.lock().remove(key);
        if let Some(gate) = gate {
            gate.notified().await;
        }
    }

    fn listed(&self, filter: BookFilter) -> Vec<BookRecord> {
        self.books
            .lock()
            .iter()
            .filter(|book| filter.matches(book))
            .cloned()
            .collect()
    }

    fn update(
        &self,
        book_id: BookId,
        update: impl FnOnce(&BookRecord) -> Result<BookRecord, RequestError>,
    ) -> Result<BookRecord, RequestError> {
        let mut books = self.books.lock();
        let book = books
            .iter_mut()
            .find(|book| book.id == Some(book_id))
            .ok_or_else(|| not_found(book_id))?;
        let mut updated = update(book)?.with_normalized_stock();
        updated.id = Some(book_id);
        *book = updated.clone();
        Ok(updated)
    }
}

#[async_trait::async_trait]
impl BooksResource for FakeBooksResource {
    async fn list_all(&self) -> Result<Vec<BookRecord>, RequestError> {
        self.request("list").await?;
        let books = self.listed(BookFilter::All);
        self.respond("list").await;
        Ok(books)
    }

    async fn get_by_id(&self, book_id: BookId) -> Result<BookRecord, RequestError> {
        self.request("get").await?;
        self.books
            .lock()
            .iter()
            .find(|book| book.id == Some(book_id))
            .cloned()
            .ok_or_else(|| not_found(book_id))
    }

    async fn create(&self, book: &BookRecord) -> Result<BookRecord, RequestError> {
        self.request("create").await?;
        let created = {
            let mut next_id = self.next_id.lock();
            let created = BookRecord {
                id: Some(*next_id),
                ..book.clone().with_normalized_stock()
            };
            *next_id += 1;
            created
        };
        self.books.lock().push(created.clone());
        self.respond("create").await;
        Ok(created)
    }

    async fn replace(
        &self,
        book_id: BookId,
        book: &BookRecord,
    ) -> Result<BookRecord, RequestError> {
        self.request("replace").await?;
        self.update(book_id, |_| Ok(book.clone()))
    }

    async fn patch(&self, book_id: BookId, patch: &BookPatch) -> Result<BookRecord, RequestError> {
        self.request("patch").await?;
        self.update(book_id, |book| {
            let mut merged = serde_json::to_value(book).map_err(|_| status(500, "encode"))?;
            if let (Some(target), serde_json::Value::Object(changes)) = (
                merged.as_object_mut(),
                serde_json::to_value(patch).map_err(|_| status(500, "encode"))?,
            ) {
                target.extend(changes);
            }
            serde_json::from_value(merged).map_err(|_| status(400, "decode"))
        })
    }

    async fn remove(&self, book_id: BookId) -> Result<(), RequestError> {
        self.request("remove").await?;
        let mut books = self.books.lock();
        let before = books.len();
        books.retain(|book| book.id != Some(book_id));
        if books.len() == before {
            return Err(not_found(book_id));
        }
        Ok(())
    }

    async fn search(&self, query: &str) -> Result<Vec<BookRecord>, RequestError> {
        self.request(&format!("search:{}", query)).await?;
        Ok(self.listed(BookFilter::search(query)))
    }

    async fn filter_by_category(&self, category: &str) -> Result<Vec<BookRecord>, RequestError> {
        self.request(&format!("category:{}", category)).await?;
        Ok(self.listed(BookFilter::Category(category.to_string())))
    }

    async fn filter_by_stock(&self, in_stock: bool) -> Result<Vec<BookRecord>, RequestError> {
        self.request("stock").await?;
        Ok(self.listed(BookFilter::Stock(in_stock)))
    }

    async fn filter_by_price_range(
        &self,
        min_price: f64,
        max_price: f64,
    ) -> Result<Vec<BookRecord>, RequestError> {
        self.request("price").await?;
        Ok(self.listed(BookFilter::PriceRange {
            min_price,
            max_price,
        }))
    }

    async fn filter_by_rating(&self, min_rating: f64) -> Result<Vec<BookRecord>, RequestError> {
        self.request("rating").await?;
        Ok(self.listed(BookFilter::MinRating(min_rating)))
    }

    async fn list_categories(&self) -> Result<Vec<String>, RequestError> {
        self.request("categories").await?;
        let categories: BTreeSet<String> = self
            .books
            .lock()
            .iter()
            .filter_map(|book| book.category.clone())
            .collect();
        self.respond("categories").await;
        Ok(categories.into_iter().collect())
    }

    async fn set_stock(&self, book_id: BookId, quantity: u32) -> Result<BookRecord, RequestError> {
        self.request("set_stock").await?;
        self.update(book_id, |book| {
            Ok(BookRecord {
                stock_quantity: Some(quantity),
                ..book.clone()
            })
        })
    }

    async fn buy(&self, book_id: BookId, quantity: u32) -> Result<BookRecord, RequestError> {
        self.request("buy").await?;
        check_quantity(quantity).map_err(|err| status(400, &err.to_string()))?;
        self.update(book_id, |book| {
            let available = book.stock_quantity.unwrap_or_default();
            if available < quantity {
                return Err(status(400, "Insufficient stock"));
            }
            Ok(BookRecord {
                stock_quantity: Some(available - quantity),
                ..book.clone()
            })
        })
    }

    async fn set_rating(&self, book_id: BookId, rating: f64) -> Result<BookRecord, RequestError> {
        self.request("set_rating").await?;
        check_rating(rating).map_err(|err| status(400, &err.to_string()))?;
        self.update(book_id, |book| {
            Ok(BookRecord {
                rating: Some(rating),
                ..book.clone()
            })
        })
    }
}
