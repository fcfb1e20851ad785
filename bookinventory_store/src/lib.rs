//! Client side state of the book inventory.
//!
//! [`store::CollectionStore`] keeps the local copy of the books collection in sync with the
//! REST resource, [`intents::IntentDispatcher`] turns user actions into store operations.

pub mod form;
pub mod intents;
pub mod remote;
pub mod store;

#[cfg(test)]
mod fake_resource;
