use anyhow::Context;
use serde_json::json;
use tokio_postgres::types::ToSql;
use tokio_postgres::{Client, NoTls, Row, Statement};

use crate::api::{check_quantity, check_rating, BookFilter, BookId, BookPatch, BookRecord};
use crate::books_repository::BookRepositoryError::Other;
use crate::books_repository::{BookRepository, BookRepositoryError};

pub struct PostgresBooksRepository {
    client: Client,
}

pub struct PostgresBooksRepositoryConfig {
    pub hostname: String,
    pub username: String,
    pub password: String,
}

impl PostgresBooksRepository {
    pub async fn init(config: PostgresBooksRepositoryConfig) -> anyhow::Result<Self> {
        let connection_str = format!(
            "postgresql://{}:{}@{}",
            config.username, config.password, config.hostname
        );
        tracing::info!("Postgres host: {}", config.hostname);
        let (client, connection) = tokio_postgres::connect(&connection_str, NoTls)
            .await
            .context("Failed to start postgres")?;

        tokio::spawn(async move {
            if let Err(e) = connection.await {
                tracing::error!("Postgres connection error: {}", e);
            }
        });

        client
            .batch_execute(
                "
        CREATE TABLE IF NOT EXISTS books (
            id              BIGSERIAL PRIMARY KEY,
            params          JSONB NOT NULL
            )
        ",
            )
            .await
            .context("Failed to setup table")?;
        Ok(Self { client })
    }

    /// Runs an UPDATE ... RETURNING id, params statement and maps missing row to NotFound
    async fn update_returning(
        &self,
        book_id: BookId,
        query: &str,
        params: &[&(dyn ToSql + Sync)],
    ) -> Result<BookRecord, BookRepositoryError> {
        let stmt: Statement = self.client.prepare(query).await?;
        let rows = self.client.query(&stmt, params).await?;
        rows.first()
            .map(row_to_book)
            .unwrap_or(Err(BookRepositoryError::NotFound(book_id)))
    }
}

fn row_to_book(row: &Row) -> Result<BookRecord, BookRepositoryError> {
    let book_id: BookId = row.try_get(0)?;
    let params: serde_json::Value = row.try_get(1)?;
    let mut book: BookRecord = serde_json::from_value(params)?;
    book.id = Some(book_id);
    Ok(book)
}

/// Book as stored in the params column, the id lives in its own column
fn to_params(book: BookRecord) -> serde_json::Value {
    json!(BookRecord {
        id: None,
        ..book.with_normalized_stock()
    })
}

#[async_trait::async_trait]
impl BookRepository for PostgresBooksRepository {
    async fn add_book(&self, book: BookRecord) -> Result<BookRecord, BookRepositoryError> {
        book.validate()?;
        let stmt: Statement = self
            .client
            .prepare("INSERT INTO books (params) VALUES ($1) RETURNING id, params")
            .await?;

        let rows = self.client.query(&stmt, &[&to_params(book)]).await?;

        rows.first()
            .ok_or_else(|| Other("Id not returned".to_string()))
            .and_then(row_to_book)
    }

    async fn replace_book(
        &self,
        book_id: BookId,
        book: BookRecord,
    ) -> Result<BookRecord, BookRepositoryError> {
        book.validate()?;
        self.update_returning(
            book_id,
            "UPDATE books SET params = ($1) WHERE id = ($2) RETURNING id, params",
            &[&to_params(book), &book_id],
        )
        .await
    }

    async fn patch_book(
        &self,
        book_id: BookId,
        patch: BookPatch,
    ) -> Result<BookRecord, BookRepositoryError> {
        patch.validate()?;
        // inStock is recomputed from the patched stockQuantity in the same statement
        self.update_returning(
            book_id,
            "UPDATE books SET params = (params || ($1)::JSONB) || jsonb_build_object(\
             'inStock', COALESCE(((params || ($1)::JSONB)->>'stockQuantity')::BIGINT, 0) > 0) \
             WHERE id = ($2) RETURNING id, params",
            &[&json!(patch), &book_id],
        )
        .await
    }

    async fn delete_book(&self, book_id: BookId) -> Result<(), BookRepositoryError> {
        let deleted = self
            .client
            .execute("DELETE FROM books WHERE id = ($1)", &[&book_id])
            .await?;
        if deleted == 0 {
            Err(BookRepositoryError::NotFound(book_id))
        } else {
            Ok(())
        }
    }

    async fn get_book(&self, book_id: BookId) -> Result<BookRecord, BookRepositoryError> {
        let stmt: Statement = self
            .client
            .prepare("SELECT id, params FROM books WHERE id = ($1)")
            .await?;

        let rows = self.client.query(&stmt, &[&book_id]).await?;

        rows.first()
            .ok_or(BookRepositoryError::NotFound(book_id))
            .and_then(row_to_book)
    }

    async fn list_books(
        &self,
        filter: &BookFilter,
    ) -> Result<Vec<BookRecord>, BookRepositoryError> {
        let rows = match filter {
            BookFilter::All => {
                self.client
                    .query("SELECT id, params FROM books ORDER BY id", &[])
                    .await?
            }
            BookFilter::Search(query) => {
                let pattern = format!("%{}%", query);
                self.client
                    .query(
                        "SELECT id, params FROM books WHERE \
                         params->>'title' ILIKE ($1) OR \
                         params->>'author' ILIKE ($1) OR \
                         params->>'isbn' ILIKE ($1) ORDER BY id",
                        &[&pattern],
                    )
                    .await?
            }
            BookFilter::Category(category) => {
                self.client
                    .query(
                        "SELECT id, params FROM books WHERE params->>'category' = ($1) ORDER BY id",
                        &[category],
                    )
                    .await?
            }
            BookFilter::Stock(in_stock) => {
                self.client
                    .query(
                        "SELECT id, params FROM books \
                         WHERE COALESCE((params->>'inStock')::BOOLEAN, FALSE) = ($1) ORDER BY id",
                        &[in_stock],
                    )
                    .await?
            }
            BookFilter::PriceRange {
                min_price,
                max_price,
            } => {
                self.client
                    .query(
                        "SELECT id, params FROM books \
                         WHERE (params->>'price')::FLOAT8 BETWEEN ($1) AND ($2) ORDER BY id",
                        &[min_price, max_price],
                    )
                    .await?
            }
            BookFilter::MinRating(min_rating) => {
                self.client
                    .query(
                        "SELECT id, params FROM books \
                         WHERE (params->>'rating')::FLOAT8 >= ($1) ORDER BY id",
                        &[min_rating],
                    )
                    .await?
            }
        };

        rows.iter().map(row_to_book).collect()
    }

    async fn list_categories(&self) -> Result<Vec<String>, BookRepositoryError> {
        let rows = self
            .client
            .query(
                "SELECT DISTINCT params->>'category' AS category FROM books \
                 WHERE params->>'category' IS NOT NULL ORDER BY category",
                &[],
            )
            .await?;

        rows.iter()
            .map(|row| Ok(row.try_get::<_, String>(0)?))
            .collect()
    }

    async fn set_stock(
        &self,
        book_id: BookId,
        quantity: u32,
    ) -> Result<BookRecord, BookRepositoryError> {
        let quantity = i64::from(quantity);
        self.update_returning(
            book_id,
            "UPDATE books SET params = params || jsonb_build_object(\
             'stockQuantity', ($1)::BIGINT, 'inStock', ($1)::BIGINT > 0) \
             WHERE id = ($2) RETURNING id, params",
            &[&quantity, &book_id],
        )
        .await
    }

    async fn buy_book(
        &self,
        book_id: BookId,
        quantity: u32,
    ) -> Result<BookRecord, BookRepositoryError> {
        check_quantity(quantity)?;
        let requested = i64::from(quantity);
        let result = self
            .update_returning(
                book_id,
                "UPDATE books SET params = params || jsonb_build_object(\
                 'stockQuantity', COALESCE((params->>'stockQuantity')::BIGINT, 0) - ($1)::BIGINT, \
                 'inStock', COALESCE((params->>'stockQuantity')::BIGINT, 0) - ($1)::BIGINT > 0) \
                 WHERE id = ($2) AND COALESCE((params->>'stockQuantity')::BIGINT, 0) >= ($1)::BIGINT \
                 RETURNING id, params",
                &[&requested, &book_id],
            )
            .await;

        match result {
            // Either the book is missing or there is not enough stock
            Err(BookRepositoryError::NotFound(_)) => {
                let book = self.get_book(book_id).await?;
                Err(BookRepositoryError::InsufficientStock {
                    book_id,
                    requested: quantity,
                    available: book.stock_quantity.unwrap_or_default(),
                })
            }
            other => other,
        }
    }

    async fn set_rating(
        &self,
        book_id: BookId,
        rating: f64,
    ) -> Result<BookRecord, BookRepositoryError> {
        check_rating(rating)?;
        self.update_returning(
            book_id,
            "UPDATE books SET params = params || jsonb_build_object('rating', ($1)::FLOAT8) \
             WHERE id = ($2) RETURNING id, params",
            &[&rating, &book_id],
        )
        .await
    }
}
