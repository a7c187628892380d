//! Canonical result document.

use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;

/// Normalised forecast stored for a successful task.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CanonicalResult {
    /// One entry per forecast timestamp, in forecast order.
    pub datapoints: Vec<Datapoint>,
    /// Feature contributions, strongest first.
    #[serde(default)]
    pub factors: Factors,
}

/// Forecast for one timestamp.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Datapoint {
    /// `YYYY-MM-DD`, or `YYYY-MM-DD HH:MM:SS` for intraday timestamps.
    pub timestamp: String,
    /// One entry per symbol; may be empty.
    pub prediction: Vec<SymbolPrediction>,
}

/// Forecast for one symbol at one timestamp.
///
/// Values are rounded to two decimal places; `None` marks a missing value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SymbolPrediction {
    /// Series or ticker name.
    pub symbol: String,
    /// Mean forecast.
    pub value: Option<f64>,
    /// Lower bound.
    pub lower: Option<f64>,
    /// Upper bound.
    pub upper: Option<f64>,
}

/// Percentage contribution of one feature.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FactorBreakdown {
    /// Share of the feature in the averaged sensitivities.
    pub average: f64,
    /// Share of the feature per symbol.
    #[serde(flatten)]
    pub symbols: BTreeMap<String, f64>,
}

impl FactorBreakdown {
    /// JSON key of the averaged share; no symbol may use it.
    pub const AVERAGE_KEY: &'static str = "average";
}

/// A feature and its contribution.
#[derive(Debug, Clone, PartialEq)]
pub struct Factor {
    /// Feature name with any mangling suffix removed.
    pub feature: String,
    /// Contribution percentages.
    pub breakdown: FactorBreakdown,
}

/// Feature contributions sorted by descending average, then by name.
///
/// Serialised as a JSON object whose keys keep that order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Factors(Vec<Factor>);

fn by_contribution(left: &Factor, right: &Factor) -> Ordering {
    right
        .breakdown
        .average
        .total_cmp(&left.breakdown.average)
        .then_with(|| left.feature.cmp(&right.feature))
}

impl Factors {
    /// Builds the ordered factor list.
    #[must_use]
    pub fn from_factors(mut factors: Vec<Factor>) -> Self {
        factors.sort_by(by_contribution);
        Self(factors)
    }

    /// Returns the breakdown of `feature`.
    #[must_use]
    pub fn get(&self, feature: &str) -> Option<&FactorBreakdown> {
        self.0
            .iter()
            .find(|factor| factor.feature == feature)
            .map(|factor| &factor.breakdown)
    }

    /// Iterates factors strongest first.
    pub fn iter(&self) -> impl Iterator<Item = &Factor> {
        self.0.iter()
    }

    /// Returns the number of features.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns `true` when no factors are known.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Serialize for Factors {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for factor in &self.0 {
            map.serialize_entry(&factor.feature, &factor.breakdown)?;
        }
        map.end()
    }
}

struct FactorsVisitor;

impl<'de> Visitor<'de> for FactorsVisitor {
    type Value = Factors;

    fn expecting(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str("a map of feature breakdowns")
    }

    fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
        let mut factors = Vec::new();
        while let Some((feature, breakdown)) = access.next_entry::<String, FactorBreakdown>()? {
            factors.push(Factor { feature, breakdown });
        }
        Ok(Factors::from_factors(factors))
    }
}

impl<'de> Deserialize<'de> for Factors {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_map(FactorsVisitor)
    }
}
