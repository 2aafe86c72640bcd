//! Per-route derived metrics.
//!
//! Routes are ranked by a normalized importance score so the schematic
//! optimizer straightens dominant lines first and weights their demands
//! higher when transfer hubs are placed. Metrics are derived fresh each
//! pipeline run and never persisted.

use indexmap::IndexMap;

use pantograph_core::{identifier::Id, model::StationKind};

use crate::structure::Network;

/// Importance blend weights: length 40%, station count 30%, transfers 30%.
const LENGTH_WEIGHT: f64 = 0.4;
const STATION_WEIGHT: f64 = 0.3;
const TRANSFER_WEIGHT: f64 = 0.3;

/// Derived metrics for one route.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RouteMetrics {
    stations: usize,
    transfers: usize,
    length: f64,
    importance: f64,
}

impl RouteMetrics {
    /// Number of stations the route touches.
    pub fn stations(&self) -> usize {
        self.stations
    }

    /// Number of transfer stations on the route.
    pub fn transfers(&self) -> usize {
        self.transfers
    }

    /// Total Euclidean length of the route's links.
    pub fn length(&self) -> f64 {
        self.length
    }

    /// Normalized importance score in [0, 1].
    pub fn importance(&self) -> f64 {
        self.importance
    }
}

/// Computes metrics for every route, sorted by descending importance.
///
/// Each raw metric is normalized against the network maximum before the
/// weighted blend; a metric whose maximum is zero contributes nothing.
pub fn rank_routes(network: &Network) -> Vec<(Id, RouteMetrics)> {
    let members = network.route_members();
    let mut raw: IndexMap<Id, (usize, usize, f64)> = IndexMap::new();

    for (route, ids) in &members {
        let transfers = ids
            .iter()
            .filter_map(|id| network.node(*id))
            .filter(|node| node.kind() == StationKind::Transfer)
            .count();
        let length: f64 = network
            .links()
            .iter()
            .filter(|link| link.route() == *route)
            .filter_map(|link| {
                let source = network.node(link.source())?;
                let target = network.node(link.target())?;
                Some(source.position().distance(target.position()))
            })
            .sum();
        raw.insert(*route, (ids.len(), transfers, length));
    }

    let max_stations = raw.values().map(|(s, _, _)| *s).max().unwrap_or(0);
    let max_transfers = raw.values().map(|(_, t, _)| *t).max().unwrap_or(0);
    let max_length = raw.values().map(|(_, _, l)| *l).fold(0.0, f64::max);

    let normalize_count = |value: usize, max: usize| {
        if max == 0 { 0.0 } else { value as f64 / max as f64 }
    };

    let mut ranked: Vec<(Id, RouteMetrics)> = raw
        .into_iter()
        .map(|(route, (stations, transfers, length))| {
            let length_term = if max_length > 0.0 { length / max_length } else { 0.0 };
            let importance = LENGTH_WEIGHT * length_term
                + STATION_WEIGHT * normalize_count(stations, max_stations)
                + TRANSFER_WEIGHT * normalize_count(transfers, max_transfers);
            (
                route,
                RouteMetrics {
                    stations,
                    transfers,
                    length,
                    importance,
                },
            )
        })
        .collect();

    ranked.sort_by(|(_, a), (_, b)| {
        b.importance
            .partial_cmp(&a.importance)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    ranked
}
