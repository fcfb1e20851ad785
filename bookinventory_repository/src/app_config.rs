use paperclip::actix::web;

use crate::handlers;

pub fn config_app(cfg: &mut web::ServiceConfig) {
    cfg.service(web::resource("/health").route(web::get().to(handlers::health)))
        .service(
            web::scope("/api/books")
                .service(
                    web::resource("")
                        .route(web::get().to(handlers::get_all_books))
                        .route(web::post().to(handlers::add_book)),
                )
                // Fixed paths go before /{book_id} so they are never taken for an id
                .service(web::resource("/search").route(web::get().to(handlers::search_books)))
                .service(
                    web::resource("/categories").route(web::get().to(handlers::get_categories)),
                )
                .service(
                    web::scope("/filter")
                        .service(
                            web::resource("/category")
                                .route(web::get().to(handlers::filter_by_category)),
                        )
                        .service(
                            web::resource("/stock").route(web::get().to(handlers::filter_by_stock)),
                        )
                        .service(
                            web::resource("/price")
                                .route(web::get().to(handlers::filter_by_price_range)),
                        )
                        .service(
                            web::resource("/rating")
                                .route(web::get().to(handlers::filter_by_rating)),
                        ),
                )
                .service(
                    web::scope("/{book_id}")
                        .service(
                            web::resource("")
                                .route(web::get().to(handlers::get_book))
                                .route(web::put().to(handlers::replace_book))
                                .route(web::patch().to(handlers::patch_book))
                                .route(web::delete().to(handlers::delete_book)),
                        )
                        .service(web::resource("/stock").route(web::put().to(handlers::set_stock)))
                        .service(web::resource("/buy").route(web::post().to(handlers::buy_book)))
                        .service(
                            web::resource("/rating").route(web::put().to(handlers::set_rating)),
                        ),
                ),
        );
}
