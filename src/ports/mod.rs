//! Ports Layer - Hexagonal Architecture Boundaries
//!
//! Defines the interfaces (traits) that the domain/usecases layer
//! requires from the outside world. Adapters implement these traits.
//!
//! Port categories:
//! - `MarketStore`: versioned pool persistence, append-only swap history,
//!   and the user share ledger, atomic per swap

pub mod store;
