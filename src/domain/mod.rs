//! Domain layer - Core pool, pricing, and ledger logic.
//!
//! This module contains the pure domain logic for the AMM swap engine.
//! No I/O happens here (hexagonal architecture inner ring): pricing is a
//! set of side-effect-free functions and every type is serializable and
//! testable in isolation.

pub mod decimal;
pub mod error;
pub mod fpmm;
pub mod pool;
pub mod shares;
pub mod swap;

// Re-export core types for convenience
pub use error::AmmError;
pub use fpmm::{BuyQuote, PricePair, SellQuote};
pub use pool::{MarketPool, PoolStatus, QuestionId};
pub use shares::{SharesSnapshot, UserShares};
pub use swap::{
    MemberId, Outcome, SwapAction, SwapRecord, SwapRequest, SwapResult, SwapSimulation,
};
