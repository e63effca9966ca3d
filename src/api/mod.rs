//! # API Module
//!
//! Business logic behind the webhook handlers.
//!
//! ## Modules
//!
//! - [`raffle`] - Diamond counting and the idempotent counter update

pub mod raffle;
