/// Hazard selection for a river segment.

use crate::model::Hazard;

/// Active hazards between two river-miles, inclusive, ascending by mile.
///
/// The bounds are direction-agnostic: a take-out upstream of the put-in
/// selects the same hazards as the reverse trip. Hazards at the same mile
/// keep their input order.
pub fn filter(hazards: &[Hazard], mile_a: f64, mile_b: f64) -> Vec<Hazard> {
    if !mile_a.is_finite() || !mile_b.is_finite() {
        return Vec::new();
    }
    let min = mile_a.min(mile_b);
    let max = mile_a.max(mile_b);

    let mut selected: Vec<Hazard> = hazards
        .iter()
        .filter(|h| h.active && h.river_mile >= min && h.river_mile <= max)
        .cloned()
        .collect();
    selected.sort_by(|a, b| a.river_mile.total_cmp(&b.river_mile));
    selected
}
