use std::fmt::Display;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::watch;

use bookinventory_repository::api::{
    check_quantity, check_rating, BookFilter, BookId, BookPatch, BookRecord, BookValidationError,
};
use bookinventory_repository::client::RequestError;

use crate::remote::BooksResource;

#[derive(Debug, Clone, Default, PartialEq)]
/// Local state rendered by the presentation layer
pub struct CollectionView {
    /// Books in the order of the last list response, created books are appended at the end
    pub books: Vec<BookRecord>,
    /// Book currently being edited
    pub selected: Option<BookRecord>,
    /// The single active filter the books were listed with
    pub filter: BookFilter,
    pub categories: Vec<String>,
    pub loading: bool,
    /// Message of the last failed operation, cleared when the next operation starts
    pub error: Option<String>,
}

#[derive(thiserror::Error, Debug)]
pub enum StoreError {
    #[error("{0}")]
    Validation(#[from] BookValidationError),

    #[error("Book has no id, it has to be created first")]
    MissingId,

    #[error("{0}")]
    Request(#[from] RequestError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Kind {
    /// Replaces the whole sequence
    Listing,
    /// Server confirmed change of a single book
    Mutation,
    /// Read that does not replace the sequence
    Lookup,
}

#[derive(Debug, Clone, Copy)]
struct Ticket {
    seq: u64,
    kind: Kind,
    /// Mutations committed when the request was issued
    commits: u64,
}

#[derive(Default)]
struct StoreState {
    view: CollectionView,
    issued: u64,
    latest_listing: u64,
    commits: u64,
    in_flight: usize,
}

impl StoreState {
    /// A listing is stale once a newer listing was requested
    /// or any mutation committed while it was in flight
    fn is_stale(&self, ticket: Ticket) -> bool {
        ticket.kind == Kind::Listing
            && (ticket.seq != self.latest_listing || ticket.commits != self.commits)
    }
}

/// Owner of the local books collection.
///
/// Every operation clears the error, calls the remote resource once and only then
/// reconciles the result into the view, so a failed call never changes the books.
/// Clones share the same state, which allows overlapping operations;
/// responses that became stale in the meantime are dropped.
#[derive(Clone)]
pub struct CollectionStore {
    resource: Arc<dyn BooksResource>,
    state: Arc<Mutex<StoreState>>,
    changes: Arc<watch::Sender<CollectionView>>,
}

impl CollectionStore {
    pub fn new(resource: Arc<dyn BooksResource>) -> Self {
        let (changes, _) = watch::channel(CollectionView::default());
        Self {
            resource,
            state: Default::default(),
            changes: Arc::new(changes),
        }
    }

    /// Snapshot of the current state
    pub fn view(&self) -> CollectionView {
        self.state.lock().view.clone()
    }

    /// Receives a fresh snapshot after every change of the view
    pub fn subscribe(&self) -> watch::Receiver<CollectionView> {
        self.changes.subscribe()
    }

    /// Lists all books, deactivating any filter
    pub async fn refresh(&self) -> bool {
        self.apply_filter(BookFilter::All).await
    }

    /// Makes `filter` the only active filter and lists the books matching it
    pub async fn apply_filter(&self, filter: BookFilter) -> bool {
        let ticket = self.begin(Kind::Listing, |view| view.filter = filter.clone());
        let result = self.resource.fetch(&filter).await.map_err(StoreError::from);
        self.finish(ticket, "load books", result, |view, books| {
            view.books = books;
        })
    }

    /// Blank query lists all books
    pub async fn search(&self, query: &str) -> bool {
        self.apply_filter(BookFilter::search(query)).await
    }

    pub async fn load_categories(&self) -> bool {
        let ticket = self.begin(Kind::Lookup, |_| {});
        let result = self
            .resource
            .list_categories()
            .await
            .map_err(StoreError::from);
        self.finish(ticket, "load categories", result, |view, categories| {
            view.categories = categories;
        })
    }

    /// Fetches a single book again and replaces its local copy
    pub async fn reload(&self, book_id: BookId) -> bool {
        let ticket = self.begin(Kind::Lookup, |_| {});
        let result = self
            .resource
            .get_by_id(book_id)
            .await
            .map_err(StoreError::from);
        self.finish(ticket, "reload book", result, reconcile)
    }

    /// Sends a new book to the server, appends it once the server assigned its id
    pub async fn create(&self, book: BookRecord) -> bool {
        if let Err(err) = book.validate() {
            return self.report("create book", err);
        }
        let ticket = self.begin(Kind::Mutation, |_| {});
        let result = self.resource.create(&book).await.map_err(StoreError::from);
        self.finish(ticket, "create book", result, |view, created| {
            // a listing answered after the insert may already hold it
            match view.books.iter_mut().find(|book| book.id == created.id) {
                Some(existing) => *existing = created,
                None => view.books.push(created),
            }
            view.selected = None;
        })
    }

    /// Replaces a stored book with `book`, matched by id
    pub async fn update(&self, book: BookRecord) -> bool {
        let Some(book_id) = book.id else {
            return self.report("update book", StoreError::MissingId);
        };
        if let Err(err) = book.validate() {
            return self.report("update book", err);
        }
        let ticket = self.begin(Kind::Mutation, |_| {});
        let result = self
            .resource
            .replace(book_id, &book)
            .await
            .map_err(StoreError::from);
        self.finish(ticket, "update book", result, |view, updated| {
            reconcile(view, updated);
            view.selected = None;
        })
    }

    pub async fn patch(&self, book_id: BookId, patch: BookPatch) -> bool {
        if let Err(err) = patch.validate() {
            return self.report("update book", err);
        }
        let ticket = self.begin(Kind::Mutation, |_| {});
        let result = self
            .resource
            .patch(book_id, &patch)
            .await
            .map_err(StoreError::from);
        self.finish(ticket, "update book", result, reconcile)
    }

    pub async fn delete(&self, book_id: BookId) -> bool {
        let ticket = self.begin(Kind::Mutation, |_| {});
        let result = self
            .resource
            .remove(book_id)
            .await
            .map_err(StoreError::from);
        self.finish(ticket, "delete book", result, |view, ()| {
            view.books.retain(|book| book.id != Some(book_id));
            if view
                .selected
                .as_ref()
                .is_some_and(|selected| selected.id == Some(book_id))
            {
                view.selected = None;
            }
        })
    }

    pub async fn set_stock(&self, book_id: BookId, quantity: u32) -> bool {
        let ticket = self.begin(Kind::Mutation, |_| {});
        let result = self
            .resource
            .set_stock(book_id, quantity)
            .await
            .map_err(StoreError::from);
        self.finish(ticket, "update stock", result, reconcile)
    }

    pub async fn buy(&self, book_id: BookId, quantity: u32) -> bool {
        if let Err(err) = check_quantity(quantity) {
            return self.report("buy book", err);
        }
        let ticket = self.begin(Kind::Mutation, |_| {});
        let result = self
            .resource
            .buy(book_id, quantity)
            .await
            .map_err(StoreError::from);
        self.finish(ticket, "buy book", result, reconcile)
    }

    pub async fn set_rating(&self, book_id: BookId, rating: f64) -> bool {
        if let Err(err) = check_rating(rating) {
            return self.report("update rating", err);
        }
        let ticket = self.begin(Kind::Mutation, |_| {});
        let result = self
            .resource
            .set_rating(book_id, rating)
            .await
            .map_err(StoreError::from);
        self.finish(ticket, "update rating", result, reconcile)
    }

    /// Enters edit mode for `book`, None leaves it. Local only
    pub fn select(&self, book: Option<BookRecord>) {
        let mut state = self.state.lock();
        state.view.selected = book;
        self.publish(&state.view);
    }

    /// Puts an error detected before reaching the server into the error slot
    pub fn report(&self, operation: &str, err: impl Display) -> bool {
        tracing::warn!("{} rejected {}", operation, err);
        let mut state = self.state.lock();
        state.view.error = Some(format!("Failed to {}: {}", operation, err));
        self.publish(&state.view);
        false
    }

    fn begin(&self, kind: Kind, prepare: impl FnOnce(&mut CollectionView)) -> Ticket {
        let mut state = self.state.lock();
        state.issued += 1;
        let ticket = Ticket {
            seq: state.issued,
            kind,
            commits: state.commits,
        };
        if kind == Kind::Listing {
            state.latest_listing = ticket.seq;
        }
        state.in_flight += 1;
        state.view.loading = true;
        state.view.error = None;
        prepare(&mut state.view);
        self.publish(&state.view);
        ticket
    }

    fn finish<T>(
        &self,
        ticket: Ticket,
        operation: &str,
        result: Result<T, StoreError>,
        apply: impl FnOnce(&mut CollectionView, T),
    ) -> bool {
        let mut state = self.state.lock();
        state.in_flight -= 1;
        state.view.loading = state.in_flight > 0;

        let committed = if state.is_stale(ticket) {
            tracing::warn!(
                "Discarding stale response of {} request {}",
                operation,
                ticket.seq
            );
            false
        } else {
            match result {
                Ok(value) => {
                    apply(&mut state.view, value);
                    if ticket.kind == Kind::Mutation {
                        state.commits += 1;
                    }
                    tracing::info!("{} done, {} books", operation, state.view.books.len());
                    true
                }
                Err(err) => {
                    tracing::error!("{} failed {}", operation, err);
                    state.view.error = Some(format!("Failed to {}: {}", operation, err));
                    false
                }
            }
        };
        self.publish(&state.view);
        committed
    }

    fn publish(&self, view: &CollectionView) {
        self.changes.send_replace(view.clone());
    }
}

/// Replaces the local copies of the book returned by the server
fn reconcile(view: &mut CollectionView, book: BookRecord) {
    if let Some(existing) = view.books.iter_mut().find(|existing| existing.id == book.id) {
        *existing = book.clone();
    }
    if let Some(selected) = view.selected.as_mut().filter(|selected| selected.id == book.id) {
        *selected = book;
    }
}
