//! Device-facing HTTP gateway.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, middleware)
//!     → request.rs (request ID, query/body parsing)
//!     → handlers.rs (registry read or acknowledgment write)
//!     → response.rs (JSON body, error translation)
//!     → Send to device
//! ```

pub mod handlers;
pub mod request;
pub mod response;
pub mod server;

pub use request::{MakeUuidRequestId, X_REQUEST_ID};
pub use response::ApiError;
pub use server::{AppState, GatewayServer};
