use bookinventory_repository::api::{BookFilter, BookId, BookPatch, BookRecord};
use bookinventory_repository::client::{BookInventoryClient, RequestError};

/// Remote books collection the store synchronizes with.
/// Implementations do a single pass-through call per method, no retries and no caching
#[async_trait::async_trait]
pub trait BooksResource: Send + Sync {
    async fn list_all(&self) -> Result<Vec<BookRecord>, RequestError>;
    async fn get_by_id(&self, book_id: BookId) -> Result<BookRecord, RequestError>;
    /// Returns the created book with its server assigned id
    async fn create(&self, book: &BookRecord) -> Result<BookRecord, RequestError>;
    async fn replace(&self, book_id: BookId, book: &BookRecord)
        -> Result<BookRecord, RequestError>;
    async fn patch(&self, book_id: BookId, patch: &BookPatch) -> Result<BookRecord, RequestError>;
    async fn remove(&self, book_id: BookId) -> Result<(), RequestError>;
    async fn search(&self, query: &str) -> Result<Vec<BookRecord>, RequestError>;
    async fn filter_by_category(&self, category: &str) -> Result<Vec<BookRecord>, RequestError>;
    async fn filter_by_stock(&self, in_stock: bool) -> Result<Vec<BookRecord>, RequestError>;
    async fn filter_by_price_range(
        &self,
        min_price: f64,
        max_price: f64,
    ) -> Result<Vec<BookRecord>, RequestError>;
    async fn filter_by_rating(&self, min_rating: f64) -> Result<Vec<BookRecord>, RequestError>;
    async fn list_categories(&self) -> Result<Vec<String>, RequestError>;
    async fn set_stock(&self, book_id: BookId, quantity: u32) -> Result<BookRecord, RequestError>;
    async fn buy(&self, book_id: BookId, quantity: u32) -> Result<BookRecord, RequestError>;
    async fn set_rating(&self, book_id: BookId, rating: f64) -> Result<BookRecord, RequestError>;

    /// Lists the books selected by the filter using the matching endpoint
    async fn fetch(&self, filter: &BookFilter) -> Result<Vec<BookRecord>, RequestError> {
        match filter {
            BookFilter::All => self.list_all().await,
            BookFilter::Search(query) => self.search(query).await,
            BookFilter::Category(category) => self.filter_by_category(category).await,
            BookFilter::Stock(in_stock) => self.filter_by_stock(*in_stock).await,
            BookFilter::PriceRange {
                min_price,
                max_price,
            } => self.filter_by_price_range(*min_price, *max_price).await,
            BookFilter::MinRating(min_rating) => self.filter_by_rating(*min_rating).await,
        }
    }
}

#[async_trait::async_trait]
impl BooksResource for BookInventoryClient {
    async fn list_all(&self) -> Result<Vec<BookRecord>, RequestError> {
        self.list_books().await
    }

    async fn get_by_id(&self, book_id: BookId) -> Result<BookRecord, RequestError> {
        self.get_book(book_id).await
    }

    async fn create(&self, book: &BookRecord) -> Result<BookRecord, RequestError> {
        self.add_book(book).await
    }

    async fn replace(
        &self,
        book_id: BookId,
        book: &BookRecord,
    ) -> Result<BookRecord, RequestError> {
        self.replace_book(book_id, book).await
    }

    async fn patch(&self, book_id: BookId, patch: &BookPatch) -> Result<BookRecord, RequestError> {
        self.patch_book(book_id, patch).await
    }

    async fn remove(&self, book_id: BookId) -> Result<(), RequestError> {
        self.delete_book(book_id).await
    }

    async fn search(&self, query: &str) -> Result<Vec<BookRecord>, RequestError> {
        self.search_books(query).await
    }

    async fn filter_by_category(&self, category: &str) -> Result<Vec<BookRecord>, RequestError> {
        BookInventoryClient::filter_by_category(self, category).await
    }

    async fn filter_by_stock(&self, in_stock: bool) -> Result<Vec<BookRecord>, RequestError> {
        BookInventoryClient::filter_by_stock(self, in_stock).await
    }

    async fn filter_by_price_range(
        &self,
        min_price: f64,
        max_price: f64,
    ) -> Result<Vec<BookRecord>, RequestError> {
        BookInventoryClient::filter_by_price_range(self, min_price, max_price).await
    }

    async fn filter_by_rating(&self, min_rating: f64) -> Result<Vec<BookRecord>, RequestError> {
        BookInventoryClient::filter_by_rating(self, min_rating).await
    }

    async fn list_categories(&self) -> Result<Vec<String>, RequestError> {
        BookInventoryClient::list_categories(self).await
    }

    async fn set_stock(&self, book_id: BookId, quantity: u32) -> Result<BookRecord, RequestError> {
        BookInventoryClient::set_stock(self, book_id, quantity).await
    }

    async fn buy(&self, book_id: BookId, quantity: u32) -> Result<BookRecord, RequestError> {
        self.buy_book(book_id, quantity).await
    }

    async fn set_rating(&self, book_id: BookId, rating: f64) -> Result<BookRecord, RequestError> {
        BookInventoryClient::set_rating(self, book_id, rating).await
    }
}
