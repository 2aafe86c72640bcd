//! Network structure shared by the layout stages.
//!
//! The [`network::Network`] type is the canonical (nodes, links) pair every
//! stage consumes and produces. Adjacency lists and route groupings are
//! derived on demand and passed into stages explicitly, so no stage holds
//! mutable graph state of its own.

pub mod network;

pub use network::Network;

/// Delimiter separating the route prefix from the rest of a stop identifier.
const ROUTE_PREFIX_DELIMITER: char = ':';

/// Extracts the main-route token from a stop identifier.
///
/// Stop identifiers follow the source-data convention `prefix:rest`, where
/// the prefix names the dominant route of the stop. This string convention
/// is fragile and deliberately isolated here; every algorithm that groups by
/// route prefix goes through this function.
pub fn route_prefix(stop_id: &str) -> &str {
    stop_id
        .split(ROUTE_PREFIX_DELIMITER)
        .next()
        .unwrap_or(stop_id)
}
