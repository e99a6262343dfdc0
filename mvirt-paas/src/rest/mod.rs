//! REST transport for the resource services.

mod handlers;
mod routes;

pub use handlers::{ApiError, AppState, Payload};
pub use routes::{ApiDoc, create_router};
