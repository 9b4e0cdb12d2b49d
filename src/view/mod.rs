//! Views
//!
//! A view owns one ordered store, one cursor and one lifecycle state. Open it
//! through a [`ViewFactory`], feed it through a [`Sink`](crate::Sink), read it
//! with `get` and `read`.

mod config;
mod instance;
mod state;

pub use config::{ViewConfig, DEFAULT_BATCH_SIZE, DEFAULT_CLEAR_CHUNK_SIZE};
pub use instance::{create_view, View, ViewFactory};
pub use state::Phase;

pub(crate) use instance::{offload, ViewInner};
pub(crate) use state::ViewState;
