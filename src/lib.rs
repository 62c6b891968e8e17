//! Client-side voting session for wallet-backed elections.
//!
//! A [`SessionController`] walks one voter through connecting a wallet,
//! passing the eligibility gate, filling in a ballot, and casting a vote that
//! yields a [`VoteReceipt`](model::receipt::VoteReceipt). Receipts can later be
//! checked with [`verify::verify`], and [`results::ResultsListener`] keeps an
//! advisory view of live results.

#[macro_use]
extern crate log;

#[cfg(test)]
#[macro_use]
extern crate session_test;

pub mod boundary;
pub mod config;
pub mod controller;
pub mod error;
pub mod logging;
pub mod model;
pub mod results;
pub mod retry;
pub mod verify;

#[cfg(test)]
mod testing;

pub use config::{CastRoute, Config};
pub use controller::SessionController;
pub use error::{Error, ErrorKind, Result};
