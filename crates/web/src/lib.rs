//! Single-page web form for turning an uploaded deck into a narration script.

pub mod page;
pub mod routes;
pub mod session;

pub use routes::{create_router, AppState};
pub use session::{SessionState, SessionStore};
