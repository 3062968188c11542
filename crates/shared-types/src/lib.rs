//! # Shared Types Crate
//!
//! Protocol types shared by the gateway (`rp-02`), the ledger (`rp-01`) and
//! the correlation client (`rp-03`).
//!
//! ## Design Principles
//!
//! - **Single Source of Truth**: the wire envelope is defined once, here.
//! - **Closed Action Set**: requests are dispatched over the [`Action`] enum,
//!   never over free-form strings.
//! - **Total Decoding**: every parse function returns a `Result`; malformed
//!   input never panics.
//! - **Fixed-Point Money**: balances and amounts are [`Money`], two decimals.

pub mod entities;
pub mod envelope;
pub mod errors;
pub mod humantime_serde;
pub mod views;

pub use entities::*;
pub use envelope::{
    Action, ErrorBody, EventType, ParseFailure, Params, RawRequest, Request, RequestEnvelope,
    Response, PROTOCOL_VERSION,
};
pub use errors::*;
pub use views::*;
