use tracing::{debug, instrument, warn};

use super::types::{AlignedRow, AlignedSeries, AlignmentWarning, EquityCurvePoint};

/// Merge curves onto the first curve's date index.
///
/// Secondary curves are matched by position, never extrapolated. Rows follow the
/// reference length: a short secondary leaves trailing rows without a point, a long
/// one has its surplus dropped. Both cases, and any date disagreement, are reported
/// as warnings. An empty reference yields an empty set.
#[instrument(skip(curves), fields(n_curves = curves.len()))]
pub fn align_curves(curves: &[(String, &[EquityCurvePoint])]) -> AlignedSeries {
    let Some((_, reference)) = curves.first() else {
        return AlignedSeries::default();
    };
    if reference.is_empty() {
        debug!("Reference curve is empty, nothing to align");
        return AlignedSeries::default();
    }

    let labels: Vec<String> = curves.iter().map(|(label, _)| label.clone()).collect();
    let reference_len = reference.len();
    let mut warnings = Vec::new();

    for (label, curve) in curves.iter().skip(1) {
        if curve.len() < reference_len {
            warnings.push(AlignmentWarning::ShorterThanReference {
                label: label.clone(),
                len: curve.len(),
                reference_len,
            });
        } else if curve.len() > reference_len {
            warnings.push(AlignmentWarning::SurplusIgnored {
                label: label.clone(),
                dropped: curve.len() - reference_len,
            });
        }

        let mut mismatches = curve
            .iter()
            .zip(reference.iter())
            .enumerate()
            .filter(|(_, (point, reference_point))| point.date != reference_point.date)
            .map(|(i, _)| i);
        if let Some(first_index) = mismatches.next() {
            warnings.push(AlignmentWarning::DateMismatch {
                label: label.clone(),
                first_index,
                count: 1 + mismatches.count(),
            });
        }
    }

    let rows = reference
        .iter()
        .enumerate()
        .map(|(i, reference_point)| AlignedRow {
            date: reference_point.date,
            values: curves
                .iter()
                .map(|(_, curve)| curve.get(i).map(|p| p.value))
                .collect(),
        })
        .collect();

    for warning in &warnings {
        warn!(?warning, "Curve alignment warning");
    }

    AlignedSeries { labels, rows, warnings }
}
