//! Governing gauge selection.
//!
//! Every caller that needs "the gauge for this stretch of river" goes
//! through `select_gauge`: the plan builder, the cached condition lookup,
//! and the river condition endpoint. Stores hand over raw associations and
//! never pick a gauge themselves.

use serde::Serialize;

use crate::model::{RiverGaugeAssociation, SourceError};
use crate::sources::ReferenceStore;

/// Why a gauge was chosen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SelectionBasis {
    /// Nearest gauge at or upstream of the reference mile.
    Upstream,
    /// No positioned gauge upstream; the river's primary gauge was used.
    PrimaryFallback,
}

#[derive(Debug, Clone, PartialEq)]
pub struct GaugeSelection<'a> {
    pub association: &'a RiverGaugeAssociation,
    pub basis: SelectionBasis,
    /// Distance from the gauge down to the reference mile. `None` for the
    /// primary fallback or when the gauge has no mile position.
    pub miles_upstream: Option<f64>,
}

impl GaugeSelection<'_> {
    /// Reason to distrust the selected gauge for conditions at the
    /// reference mile, if any.
    pub fn accuracy_note(&self, max_distance_miles: f64) -> Option<String> {
        let gauge_name = &self.association.gauge.name;
        match self.basis {
            SelectionBasis::PrimaryFallback => Some(format!(
                "No gauge upstream of this put-in; conditions are from {}",
                gauge_name
            )),
            SelectionBasis::Upstream => match self.miles_upstream {
                Some(miles) if miles > max_distance_miles => Some(format!(
                    "Nearest gauge ({}) is {:.1} miles upstream; conditions at the put-in may differ",
                    gauge_name, miles
                )),
                _ => None,
            },
        }
    }
}

/// Chooses the association with the greatest river-mile that is still at
/// or upstream of `reference_mile`. Without one, returns the primary
/// association; without that, `None`.
///
/// Ties on mile go to the first association in input order. A non-finite
/// reference mile skips straight to the primary fallback.
pub fn select_gauge(
    associations: &[RiverGaugeAssociation],
    reference_mile: f64,
) -> Option<GaugeSelection<'_>> {
    if reference_mile.is_finite() {
        let mut best: Option<(&RiverGaugeAssociation, f64)> = None;
        for association in associations {
            let Some(mile) = association.river_mile.filter(|m| m.is_finite()) else {
                continue;
            };
            if mile > reference_mile {
                continue;
            }
            if best.is_none_or(|(_, best_mile)| mile > best_mile) {
                best = Some((association, mile));
            }
        }

        if let Some((association, mile)) = best {
            return Some(GaugeSelection {
                association,
                basis: SelectionBasis::Upstream,
                miles_upstream: Some(reference_mile - mile),
            });
        }
    }

    primary_association(associations).map(|association| GaugeSelection {
        association,
        basis: SelectionBasis::PrimaryFallback,
        miles_upstream: None,
    })
}

/// The river's primary association. Several primaries resolve to the first.
pub fn primary_association(
    associations: &[RiverGaugeAssociation],
) -> Option<&RiverGaugeAssociation> {
    associations.iter().find(|a| a.is_primary)
}

/// Store-backed lookup of the river's primary gauge, used when no gauge
/// governs the reference mile.
pub struct GaugeResolver<'a> {
    store: &'a dyn ReferenceStore,
}

impl<'a> GaugeResolver<'a> {
    pub fn new(store: &'a dyn ReferenceStore) -> Self {
        GaugeResolver { store }
    }

    /// Loads the river's associations and returns the primary one.
    pub fn primary(&self, river_id: &str) -> Result<Option<RiverGaugeAssociation>, SourceError> {
        let associations = self.store.gauge_associations(river_id)?;
        Ok(primary_association(&associations).cloned())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
