//! Proximity ordering of the cached feed.

use vigil_common::{Coordinates, Incident};

/// Order `incidents` by distance from `reference`, nearest first.
///
/// Incidents without usable coordinates keep the index they had in the input;
/// the located ones are stably sorted into the remaining slots. Without a
/// reference (or with nothing to rank) the input comes back unchanged.
pub fn rank(incidents: &[Incident], reference: Option<Coordinates>) -> Vec<Incident> {
    let reference = match reference {
        Some(reference) if !incidents.is_empty() => reference,
        _ => return incidents.to_vec(),
    };

    let mut located: Vec<(f64, &Incident)> = incidents
        .iter()
        .filter_map(|incident| {
            incident
                .coordinates()
                .map(|at| (reference.distance_km(&at), incident))
        })
        .collect();
    // NaN only comes from a non-finite reference; total_cmp keeps that deterministic.
    located.sort_by(|a, b| a.0.total_cmp(&b.0));

    let mut nearest = located.into_iter().map(|(_, incident)| incident);
    incidents
        .iter()
        .map(|incident| {
            if incident.coordinates().is_some() {
                nearest.next().unwrap_or(incident).clone()
            } else {
                incident.clone()
            }
        })
        .collect()
}
