//! # Domain Models
//!
//! Typed inputs of the ranking pipeline.
//!
//! | Type | Description |
//! |------|-------------|
//! | [`Symbol`] | Caller-supplied equity identifier |
//! | [`MarketSuffix`] | Exchange suffix used to build provider tickers |
//! | [`Field`] | Provider attribute name |
//! | [`RawAttributes`] | Per-symbol attribute record, every field optional |
//! | [`AttributeTable`] | Ordered symbol → attributes mapping |
//! | [`UtcDateTime`] | UTC timestamp |
//!
//! Missing data is a first-class `None` all the way through: a field the
//! provider did not return, a non-numeric value, and a failed fetch all end
//! up as `None` in [`RawAttributes`].

mod attributes;
mod symbol;
mod timestamp;

pub use attributes::{AttributeTable, Field, RawAttributes};
pub use symbol::{MarketSuffix, Symbol};
pub use timestamp::UtcDateTime;
