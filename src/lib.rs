//! pimbridge – answers a backend's PIM questions from a local calendar and contacts store.
//!
//! The backend turns a user's prompt into an abstract query: a service name
//! (`calendar`, `contacts`, `alarm`/`reminder`), the fields it wants, a filter
//! template, optional selection arguments, a sort template and a row limit.
//! This crate translates that into a concrete content-provider query, runs it,
//! and returns flat JSON rows over the same WebSocket the question came in on.
//!
//! ## Modules
//! * [`catalog`] – Static field catalogs mapping abstract field names to store columns.
//! * [`selection`] – Resolves argument tokens (timestamps, `START_OF_NEXT_WEEK`, LIKE patterns).
//! * [`filter`] – Rewrites filter templates; infers arguments from the prompt when none are given.
//! * [`provider`] – The content-provider seam: [`provider::ContentProvider`] and typed records.
//! * [`store`] – SQLite implementation of the provider.
//! * [`row`] – Materializes typed column values into uniform result rows.
//! * [`dispatch`] – Plans and executes a query for one request.
//! * [`protocol`] – Messages exchanged with the backend.
//! * [`transport`] – The WebSocket connection with its readiness gate and correlation slot.
//! * [`relay`] – Prompt round trips and the chat relay.
//! * [`settings`] – Runtime settings from file and environment.
//!
//! ## Rows
//! Every returned row carries exactly the requested fields, in request order.
//! A column the store could not supply becomes an empty string, so the shape
//! of the output never depends on which data happened to be present.
//!
//! ## Quick Start
//! ```
//! use pimbridge::{dispatch, protocol::QueryParameters, store::SqliteStore};
//! let store = SqliteStore::open_in_memory().unwrap();
//! store.add_phone("Alice", "+46 70 123 45 67").unwrap();
//! let parameters = QueryParameters {
//!     fields: vec!["display_name".into(), "phone_number".into()],
//!     filter: "display_name LIKE ?".into(),
//!     selection_args: vec!["%Ali%".into()],
//!     sort: "display_name ASC".into(),
//!     limit: 5,
//! };
//! let rows = dispatch::execute(&store, "contacts", &parameters, "call Alice", chrono::Utc::now()).unwrap();
//! assert_eq!(rows.len(), 1);
//! assert_eq!(rows[0].get("display_name").and_then(|v| v.as_str()), Some("Alice"));
//! ```

pub mod catalog;
pub mod dispatch;
pub mod error;
pub mod filter;
pub mod protocol;
pub mod provider;
pub mod relay;
pub mod row;
pub mod selection;
pub mod settings;
pub mod store;
pub mod transport;
