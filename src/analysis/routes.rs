//! Per-route latency aggregation.

use std::collections::BTreeMap;

use super::types::{MeasurementRecord, RouteStatistic, RouteSummary};

/// Group valid records by server and keep each group's worst latency.
///
/// Records without a server or without a latency value do not form groups.
pub fn route_latencies<'a>(
    valid: impl IntoIterator<Item = &'a MeasurementRecord>,
) -> Vec<RouteStatistic> {
    let mut by_server: BTreeMap<&str, f64> = BTreeMap::new();

    for record in valid {
        let (Some(server), Some(latency)) = (record.server.as_deref(), record.max_latency_ms) else {
            continue;
        };
        by_server
            .entry(server)
            .and_modify(|max| *max = max.max(latency))
            .or_insert(latency);
    }

    by_server
        .into_iter()
        .map(|(server, max_latency_ms)| RouteStatistic {
            server: server.to_string(),
            max_latency_ms,
        })
        .collect()
}

/// Pick the best (lowest max latency) and worst (highest) routes.
///
/// Ties go to the server that sorts first, so repeated runs agree.
pub fn summarize_routes<'a>(
    valid: impl IntoIterator<Item = &'a MeasurementRecord>,
) -> Option<RouteSummary> {
    let routes = route_latencies(valid);

    let mut iter = routes.iter();
    let first = iter.next()?;
    let (best, worst) = iter.fold((first, first), |(best, worst), route| {
        let best = if route.max_latency_ms < best.max_latency_ms { route } else { best };
        let worst = if route.max_latency_ms > worst.max_latency_ms { route } else { worst };
        (best, worst)
    });
    let (best, worst) = (best.clone(), worst.clone());

    Some(RouteSummary { routes, best, worst })
}
