//! Connection management
//!
//! Sessions, their identities, and the registry of live connections.

mod connection;
mod error;
mod identity;
mod registry;
mod session;

pub use connection::ConnectionState;
pub use error::{BoxError, ConnectionError, SendError};
pub use identity::{generate_id, DEFAULT_ID_LENGTH};
pub use registry::Registry;
pub use session::Session;
