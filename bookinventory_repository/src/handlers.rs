use std::sync::Arc;

use actix_web::http::header::LOCATION;
use actix_web::web::Data;
use actix_web::Error;
use actix_web::HttpResponse;
use paperclip::actix::{
    api_v2_operation,
    web::{self},
};

use crate::api::{
    BookFilter, BookId, BookPatch, BookRecord, CategoryQuery, PriceRangeQuery, QuantityQuery,
    RatingQuery, RatingValueQuery, SearchQuery, StockQuery,
};
use crate::books_repository::{BookRepository, BookRepositoryError};

type Repository = Data<Arc<dyn BookRepository>>;

/// Maps repository failures to responses, client errors carry the message as a json string
fn error_response(operation: &str, err: BookRepositoryError) -> HttpResponse {
    match err {
        BookRepositoryError::NotFound(_) => HttpResponse::NotFound().json(err.to_string()),
        BookRepositoryError::Invalid(_) | BookRepositoryError::InsufficientStock { .. } => {
            tracing::info!("{} rejected {}", operation, err);
            HttpResponse::BadRequest().json(err.to_string())
        }
        err => {
            tracing::error!("{} failed {}", operation, err);
            HttpResponse::InternalServerError().finish()
        }
    }
}

fn book_response(operation: &str, result: Result<BookRecord, BookRepositoryError>) -> HttpResponse {
    match result {
        Ok(book) => HttpResponse::Ok().json(book),
        Err(err) => error_response(operation, err),
    }
}

async fn list_response(books_repository: Repository, filter: BookFilter) -> HttpResponse {
    match books_repository.list_books(&filter).await {
        Ok(books) => HttpResponse::Ok().json(books),
        Err(err) => error_response("List books", err),
    }
}

#[api_v2_operation]
pub async fn health() -> Result<HttpResponse, Error> {
    Ok(HttpResponse::Ok().finish())
}

#[api_v2_operation]
pub async fn get_all_books(books_repository: Repository) -> Result<HttpResponse, Error> {
    Ok(list_response(books_repository, BookFilter::All).await)
}

#[api_v2_operation]
pub async fn add_book(
    books_repository: Repository,
    book: web::Json<BookRecord>,
) -> Result<HttpResponse, Error> {
    Ok(match books_repository.add_book(book.into_inner()).await {
        Ok(book) => HttpResponse::Created()
            .append_header((
                LOCATION,
                format!("/api/books/{}", book.id.unwrap_or_default()),
            ))
            .json(book),
        Err(err) => error_response("Add book", err),
    })
}

#[api_v2_operation]
pub async fn get_book(
    books_repository: Repository,
    book_id: web::Path<BookId>,
) -> Result<HttpResponse, Error> {
    Ok(book_response(
        "Get book",
        books_repository.get_book(book_id.into_inner()).await,
    ))
}

#[api_v2_operation]
pub async fn replace_book(
    books_repository: Repository,
    book_id: web::Path<BookId>,
    book: web::Json<BookRecord>,
) -> Result<HttpResponse, Error> {
    Ok(book_response(
        "Replace book",
        books_repository
            .replace_book(book_id.into_inner(), book.into_inner())
            .await,
    ))
}

#[api_v2_operation]
pub async fn patch_book(
    books_repository: Repository,
    book_id: web::Path<BookId>,
    patch: web::Json<BookPatch>,
) -> Result<HttpResponse, Error> {
    Ok(book_response(
        "Patch book",
        books_repository
            .patch_book(book_id.into_inner(), patch.into_inner())
            .await,
    ))
}

#[api_v2_operation]
pub async fn delete_book(
    books_repository: Repository,
    book_id: web::Path<BookId>,
) -> Result<HttpResponse, Error> {
    Ok(
        match books_repository.delete_book(book_id.into_inner()).await {
            Ok(()) => HttpResponse::NoContent().finish(),
            Err(err) => error_response("Delete book", err),
        },
    )
}

#[api_v2_operation]
pub async fn search_books(
    books_repository: Repository,
    query: web::Query<SearchQuery>,
) -> Result<HttpResponse, Error> {
    Ok(list_response(books_repository, BookFilter::search(&query.query)).await)
}

#[api_v2_operation]
pub async fn filter_by_category(
    books_repository: Repository,
    query: web::Query<CategoryQuery>,
) -> Result<HttpResponse, Error> {
    Ok(list_response(books_repository, BookFilter::Category(query.into_inner().category)).await)
}

#[api_v2_operation]
pub async fn filter_by_stock(
    books_repository: Repository,
    query: web::Query<StockQuery>,
) -> Result<HttpResponse, Error> {
    Ok(list_response(books_repository, BookFilter::Stock(query.in_stock)).await)
}

#[api_v2_operation]
pub async fn filter_by_price_range(
    books_repository: Repository,
    query: web::Query<PriceRangeQuery>,
) -> Result<HttpResponse, Error> {
    let filter = BookFilter::PriceRange {
        min_price: query.min_price,
        max_price: query.max_price,
    };
    Ok(list_response(books_repository, filter).await)
}

#[api_v2_operation]
pub async fn filter_by_rating(
    books_repository: Repository,
    query: web::Query<RatingQuery>,
) -> Result<HttpResponse, Error> {
    Ok(list_response(books_repository, BookFilter::MinRating(query.min_rating)).await)
}

#[api_v2_operation]
pub async fn get_categories(books_repository: Repository) -> Result<HttpResponse, Error> {
    Ok(match books_repository.list_categories().await {
        Ok(categories) => HttpResponse::Ok().json(categories),
        Err(err) => error_response("List categories", err),
    })
}

#[api_v2_operation]
pub async fn set_stock(
    books_repository: Repository,
    book_id: web::Path<BookId>,
    query: web::Query<QuantityQuery>,
) -> Result<HttpResponse, Error> {
    Ok(book_response(
        "Set stock",
        books_repository
            .set_stock(book_id.into_inner(), query.quantity)
            .await,
    ))
}

#[api_v2_operation]
pub async fn buy_book(
    books_repository: Repository,
    book_id: web::Path<BookId>,
    query: web::Query<QuantityQuery>,
) -> Result<HttpResponse, Error> {
    Ok(book_response(
        "Buy book",
        books_repository
            .buy_book(book_id.into_inner(), query.quantity)
            .await,
    ))
}

#[api_v2_operation]
pub async fn set_rating(
    books_repository: Repository,
    book_id: web::Path<BookId>,
    query: web::Query<RatingValueQuery>,
) -> Result<HttpResponse, Error> {
    Ok(book_response(
        "Set rating",
        books_repository
            .set_rating(book_id.into_inner(), query.rating)
            .await,
    ))
}
