//! # relay-gateway
//!
//! WebSocket relay: every message a client sends is rebroadcast to all other
//! connected clients.
//!
//! The pieces, leaf first: [`connection`] (sessions, ids, the registry),
//! [`broadcast`] (concurrent fan-out), [`handlers`] (lifecycle callbacks),
//! and [`server`] (the per-connection acceptor and the HTTP application).

pub mod broadcast;
pub mod connection;
pub mod directory;
pub mod handlers;
pub mod protocol;
pub mod server;

pub use server::run;
