//! Use Cases Layer - Application Business Logic
//!
//! Orchestrates domain logic with port interfaces to implement the
//! engine's workflows. Each use case is a self-contained operation.
//!
//! Use cases:
//! - `SwapExecutor`: seed, swap (with optimistic-lock retry), simulate,
//!   and pool lifecycle transitions
//! - `MarketQueries`: pool state, price history, swap history paging,
//!   user share snapshots

pub mod market_queries;
pub mod swap_executor;
