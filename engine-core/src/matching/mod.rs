//! Price-time priority matching over a book with price improvement for the
//! taker, and the four order-type-specific residual-handling rules.

mod engine;

pub use engine::MatchingEngine;
