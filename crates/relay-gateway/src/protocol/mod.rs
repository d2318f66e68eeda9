//! Wire-level protocol definitions
//!
//! Close status codes used when the relay ends a connection.

mod close_codes;

pub use close_codes::CloseCode;
