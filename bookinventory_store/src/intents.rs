use bookinventory_repository::api::{BookFilter, BookId, BookRecord};

use crate::form::BookForm;
use crate::store::CollectionStore;

/// User action coming from the presentation layer
#[derive(Debug, Clone, PartialEq)]
pub enum Intent {
    /// Initial load of the books and the category picker
    Load,
    EditField {
        name: String,
        value: String,
    },
    Submit,
    Edit(BookRecord),
    CancelEdit,
    Delete(BookId),
    Search(String),
    /// None shows every category
    FilterCategory(Option<String>),
    /// None shows books regardless of stock
    FilterStock(Option<bool>),
    FilterPrice {
        min_price: f64,
        max_price: f64,
    },
    FilterRating(f64),
    ClearFilter,
    SetStock {
        book_id: BookId,
        quantity: u32,
    },
    Buy {
        book_id: BookId,
        quantity: u32,
    },
    Rate {
        book_id: BookId,
        rating: f64,
    },
}

/// Translates user actions into store operations, owning the book form
pub struct IntentDispatcher {
    store: CollectionStore,
    form: BookForm,
}

impl IntentDispatcher {
    pub fn new(store: CollectionStore) -> Self {
        Self {
            store,
            form: BookForm::new(),
        }
    }

    pub fn store(&self) -> &CollectionStore {
        &self.store
    }

    pub fn form(&self) -> &BookForm {
        &self.form
    }

    /// Returns whether the action took effect
    pub async fn dispatch(&mut self, intent: Intent) -> bool {
        tracing::debug!("Dispatching {:?}", intent);
        match intent {
            Intent::Load => self.store.refresh().await && self.store.load_categories().await,
            Intent::EditField { name, value } => match self.form.set_field(&name, &value) {
                Ok(()) => true,
                Err(err) => self.store.report("edit field", err),
            },
            Intent::Submit => self.submit().await,
            Intent::Edit(book) => {
                self.form = BookForm::edit(&book);
                self.store.select(Some(book));
                true
            }
            Intent::CancelEdit => {
                self.form.clear();
                self.store.select(None);
                true
            }
            Intent::Delete(book_id) => {
                let deleted = self.store.delete(book_id).await;
                if deleted && self.form.value("id") == Some(&serde_json::Value::from(book_id)) {
                    self.form.clear();
                }
                deleted
            }
            Intent::Search(query) => self.store.search(&query).await,
            Intent::FilterCategory(Some(category)) => {
                self.store
                    .apply_filter(BookFilter::Category(category))
                    .await
            }
            Intent::FilterStock(Some(in_stock)) => {
                self.store.apply_filter(BookFilter::Stock(in_stock)).await
            }
            Intent::FilterCategory(None) | Intent::FilterStock(None) | Intent::ClearFilter => {
                self.store.refresh().await
            }
            Intent::FilterPrice {
                min_price,
                max_price,
            } => {
                self.store
                    .apply_filter(BookFilter::PriceRange {
                        min_price,
                        max_price,
                    })
                    .await
            }
            Intent::FilterRating(min_rating) => {
                self.store
                    .apply_filter(BookFilter::MinRating(min_rating))
                    .await
            }
            Intent::SetStock { book_id, quantity } => self.store.set_stock(book_id, quantity).await,
            Intent::Buy { book_id, quantity } => self.store.buy(book_id, quantity).await,
            Intent::Rate { book_id, rating } => self.store.set_rating(book_id, rating).await,
        }
    }

    async fn submit(&mut self) -> bool {
        let book = match self.form.submit() {
            Ok(book) => book,
            Err(err) => {
                let operation = if self.form.is_editing() {
                    "update book"
                } else {
                    "create book"
                };
                return self.store.report(operation, err);
            }
        };
        let committed = if book.id.is_some() {
            self.store.update(book).await
        } else {
            self.store.create(book).await
        };
        if committed {
            self.form.clear();
            // Best effort: the book is saved either way, a failed reload only leaves
            // the previous categories and its message in the error slot
            let _ = self.store.load_categories().await;
        }
        committed
    }
}
