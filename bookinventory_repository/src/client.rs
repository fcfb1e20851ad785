use anyhow::Context;
use reqwest::Response;
use reqwest_middleware::{ClientBuilder, ClientWithMiddleware};
use reqwest_tracing::TracingMiddleware;
use serde::de::DeserializeOwned;

use crate::api::{
    BookId, BookPatch, BookRecord, CategoryQuery, PriceRangeQuery, QuantityQuery, RatingQuery,
    RatingValueQuery, SearchQuery, StockQuery,
};

pub const BOOKS_PATH: &str = "/api/books";

#[derive(thiserror::Error, Debug)]
pub enum RequestError {
    #[error("Request failed with status {status}: {message}")]
    Status { status: u16, message: String },

    #[error("Failed to send request: {0}")]
    Transport(#[from] reqwest_middleware::Error),

    #[error("Failed to read response: {0}")]
    Decode(#[from] reqwest::Error),
}

impl RequestError {
    /// HTTP status returned by the server, None if the server was never reached
    pub fn status(&self) -> Option<u16> {
        match self {
            RequestError::Status { status, .. } => Some(*status),
            RequestError::Transport(_) => None,
            RequestError::Decode(err) => err.status().map(|status| status.as_u16()),
        }
    }
}

/// Typed client of the books collection resource.
/// Every call is a single request, there are no retries and nothing is cached
pub struct BookInventoryClient {
    url: String,
    client: ClientWithMiddleware,
}

impl BookInventoryClient {
    /// `url` is the address of the host, the `/api/books` collection path is appended to it
    pub fn new(url: &str) -> anyhow::Result<Self> {
        let reqwest_client = reqwest::Client::builder()
            .build()
            .context("Failed to build reqwest client")?;
        let client = ClientBuilder::new(reqwest_client)
            // Insert the tracing middleware
            .with(TracingMiddleware::default())
            .build();

        Ok(Self {
            url: format!("{}{}", url.trim_end_matches('/'), BOOKS_PATH),
            client,
        })
    }

    /// Calls GET /api/books endpoint
    pub async fn list_books(&self) -> Result<Vec<BookRecord>, RequestError> {
        let response = self.client.get(&self.url).send().await?;
        parse(response).await
    }

    /// Calls GET /api/books/{book_id} endpoint
    /// Missing book is reported as an error with 404 status
    pub async fn get_book(&self, book_id: BookId) -> Result<BookRecord, RequestError> {
        let response = self.client.get(self.book_url(book_id)).send().await?;
        parse(response).await
    }

    /// Calls POST /api/books endpoint
    /// Returns the stored book with the id assigned by the server
    pub async fn add_book(&self, book: &BookRecord) -> Result<BookRecord, RequestError> {
        let response = self.client.post(&self.url).json(book).send().await?;
        parse(response).await
    }

    /// Calls PUT /api/books/{book_id} endpoint
    pub async fn replace_book(
        &self,
        book_id: BookId,
        book: &BookRecord,
    ) -> Result<BookRecord, RequestError> {
        let response = self
            .client
            .put(self.book_url(book_id))
            .json(book)
            .send()
            .await?;
        parse(response).await
    }

    /// Calls PATCH /api/books/{book_id} endpoint
    pub async fn patch_book(
        &self,
        book_id: BookId,
        patch: &BookPatch,
    ) -> Result<BookRecord, RequestError> {
        let response = self
            .client
            .patch(self.book_url(book_id))
            .json(patch)
            .send()
            .await?;
        parse(response).await
    }

    /// Calls DELETE /api/books/{book_id} endpoint
    pub async fn delete_book(&self, book_id: BookId) -> Result<(), RequestError> {
        let response = self.client.delete(self.book_url(book_id)).send().await?;
        ensure_success(response).await?;
        Ok(())
    }

    /// Calls GET /api/books/search endpoint
    pub async fn search_books(&self, query: &str) -> Result<Vec<BookRecord>, RequestError> {
        let response = self
            .client
            .get(format!("{}/search", self.url))
            .query(&SearchQuery {
                query: query.to_string(),
            })
            .send()
            .await?;
        parse(response).await
    }

    /// Calls GET /api/books/filter/category endpoint
    pub async fn filter_by_category(
        &self,
        category: &str,
    ) -> Result<Vec<BookRecord>, RequestError> {
        let response = self
            .client
            .get(format!("{}/filter/category", self.url))
            .query(&CategoryQuery {
                category: category.to_string(),
            })
            .send()
            .await?;
        parse(response).await
    }

    /// Calls GET /api/books/filter/stock endpoint
    pub async fn filter_by_stock(&self, in_stock: bool) -> Result<Vec<BookRecord>, RequestError> {
        let response = self
            .client
            .get(format!("{}/filter/stock", self.url))
            .query(&StockQuery { in_stock })
            .send()
            .await?;
        parse(response).await
    }

    /// Calls GET /api/books/filter/price endpoint, both bounds are inclusive
    pub async fn filter_by_price_range(
        &self,
        min_price: f64,
        max_price: f64,
    ) -> Result<Vec<BookRecord>, RequestError> {
        let response = self
            .client
            .get(format!("{}/filter/price", self.url))
            .query(&PriceRangeQuery {
                min_price,
                max_price,
            })
            .send()
            .await?;
        parse(response).await
    }

    /// Calls GET /api/books/filter/rating endpoint
    pub async fn filter_by_rating(
        &self,
        min_rating: f64,
    ) -> Result<Vec<BookRecord>, RequestError> {
        let response = self
            .client
            .get(format!("{}/filter/rating", self.url))
            .query(&RatingQuery { min_rating })
            .send()
            .await?;
        parse(response).await
    }

    /// Calls GET /api/books/categories endpoint
    pub async fn list_categories(&self) -> Result<Vec<String>, RequestError> {
        let response = self
            .client
            .get(format!("{}/categories", self.url))
            .send()
            .await?;
        parse(response).await
    }

    /// Calls PUT /api/books/{book_id}/stock endpoint
    pub async fn set_stock(
        &self,
        book_id: BookId,
        quantity: u32,
    ) -> Result<BookRecord, RequestError> {
        let response = self
            .client
            .put(format!("{}/stock", self.book_url(book_id)))
            .query(&QuantityQuery { quantity })
            .send()
            .await?;
        parse(response).await
    }

    /// Calls POST /api/books/{book_id}/buy endpoint
    /// Returns the book with decreased stock
    pub async fn buy_book(
        &self,
        book_id: BookId,
        quantity: u32,
    ) -> Result<BookRecord, RequestError> {
        let response = self
            .client
            .post(format!("{}/buy", self.book_url(book_id)))
            .query(&QuantityQuery { quantity })
            .send()
            .await?;
        parse(response).await
    }

    /// Calls PUT /api/books/{book_id}/rating endpoint
    pub async fn set_rating(&self, book_id: BookId, rating: f64) -> Result<BookRecord, RequestError> {
        let response = self
            .client
            .put(format!("{}/rating", self.book_url(book_id)))
            .query(&RatingValueQuery { rating })
            .send()
            .await?;
        parse(response).await
    }

    fn book_url(&self, book_id: BookId) -> String {
        format!("{}/{}", self.url, book_id)
    }
}

async fn ensure_success(response: Response) -> Result<Response, RequestError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    // Server reports failures as a plain json string
    let message: String = response.json().await.unwrap_or_default();
    let message = if message.is_empty() {
        status.canonical_reason().unwrap_or_default().to_string()
    } else {
        message
    };
    Err(RequestError::Status {
        status: status.as_u16(),
        message,
    })
}

async fn parse<T: DeserializeOwned>(response: Response) -> Result<T, RequestError> {
    Ok(ensure_success(response).await?.json().await?)
}
