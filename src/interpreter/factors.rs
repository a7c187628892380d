//! Feature sensitivity aggregation.

use super::{
    canonical::{Factor, FactorBreakdown, Factors},
    prediction::InterpretError,
};
use crate::oracle::FeatureSensitivity;
use std::collections::{BTreeMap, BTreeSet};

/// Strips the `_<suffix>` an oracle appends to feature names.
fn feature_name(mangled: &str) -> &str {
    mangled
        .rsplit_once('_')
        .map_or(mangled, |(feature, _)| feature)
}

/// Sums absolute sensitivities per unmangled feature.
#[expect(clippy::float_arithmetic, reason = "summing colliding features")]
fn demangle(raw: &BTreeMap<String, f64>) -> BTreeMap<String, f64> {
    let mut features: BTreeMap<String, f64> = BTreeMap::new();
    for (mangled, value) in raw {
        if value.is_nan() {
            continue;
        }
        *features.entry(feature_name(mangled).to_owned()).or_default() += value.abs();
    }
    features
}

#[expect(
    clippy::float_arithmetic,
    reason = "percentage normalisation and rounding"
)]
fn to_percentages(values: &BTreeMap<String, f64>) -> BTreeMap<String, f64> {
    let total: f64 = values.values().sum();
    values
        .iter()
        .map(|(feature, value)| {
            let share = if total > 0.0 {
                (value / total * 100.0 * 100.0).round() / 100.0
            } else {
                0.0
            };
            (feature.clone(), share)
        })
        .collect()
}

#[expect(clippy::float_arithmetic, reason = "mean of per-symbol percentages")]
fn mean_over_symbols(
    per_symbol: &BTreeMap<String, BTreeMap<String, f64>>,
    features: &BTreeSet<String>,
) -> BTreeMap<String, f64> {
    let count = u32::try_from(per_symbol.len()).map_or(f64::from(u32::MAX), f64::from);
    features
        .iter()
        .map(|feature| {
            let sum: f64 = per_symbol
                .values()
                .map(|shares| shares.get(feature).copied().unwrap_or(0.0))
                .sum();
            let mean = if count > 0.0 { sum / count } else { 0.0 };
            (feature.clone(), mean)
        })
        .collect()
}

/// Aggregates raw sensitivities into percentage factors.
///
/// Each symbol's absolute sensitivities are normalised to sum to 100 across
/// features, and so are the feature averages. When the oracle reports no
/// averages they are the mean of the per-symbol percentages, counting a
/// feature a symbol lacks as zero. Every factor lists every symbol. A zero
/// total yields zero percentages. Values are rounded to two decimal places.
///
/// # Errors
///
/// Returns [`InterpretError::ReservedSymbol`] when a symbol is named
/// `average`, which would clash with the averaged share in the breakdown.
pub fn aggregate_factors(sensitivity: &FeatureSensitivity) -> Result<Factors, InterpretError> {
    if let Some(symbol) = sensitivity
        .per_symbol
        .keys()
        .find(|symbol| symbol.as_str() == FactorBreakdown::AVERAGE_KEY)
    {
        return Err(InterpretError::ReservedSymbol(symbol.clone()));
    }

    let per_symbol: BTreeMap<String, BTreeMap<String, f64>> = sensitivity
        .per_symbol
        .iter()
        .map(|(symbol, raw)| (symbol.clone(), to_percentages(&demangle(raw))))
        .collect();

    let mut features: BTreeSet<String> = per_symbol
        .values()
        .flat_map(|shares| shares.keys().cloned())
        .collect();

    let raw_average = match &sensitivity.average {
        Some(average) => demangle(average),
        None => mean_over_symbols(&per_symbol, &features),
    };
    let average = to_percentages(&raw_average);
    features.extend(average.keys().cloned());

    let factors = features
        .into_iter()
        .map(|feature| {
            let symbols = per_symbol
                .iter()
                .map(|(symbol, shares)| {
                    (symbol.clone(), shares.get(&feature).copied().unwrap_or(0.0))
                })
                .collect();
            let breakdown = FactorBreakdown {
                average: average.get(&feature).copied().unwrap_or(0.0),
                symbols,
            };
            Factor { feature, breakdown }
        })
        .collect();
    Ok(Factors::from_factors(factors))
}
