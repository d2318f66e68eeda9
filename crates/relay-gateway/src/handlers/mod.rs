//! Lifecycle handlers
//!
//! User callbacks dispatched at connect, message, disconnect, and error, plus
//! the relay's default set of them.

mod lifecycle;
mod relay;

pub use lifecycle::{
    ConnectHandler, DisconnectHandler, ErrorHandler, LifecycleHandlers, MessageHandler,
};
pub use relay::relay_handlers;
