//! Learned per-ingredient unit factors.
//!
//! A [`ConversionRecord`] holds, for one (ingredient, region) pair, how many of
//! each known unit make up one base amount of that ingredient. Converting `q`
//! from unit S to unit T is then `(q / f_S) * f_T`, with no model call.
//!
//! Records only ever gain units; an existing factor is never removed.

mod cache;
mod disk;
mod locks;
mod memory;
mod store;

pub use cache::ConversionCache;
pub use disk::DiskStore;
pub use locks::KeyGuard;
pub use memory::MemoryStore;
pub use store::{ConversionStore, StoreError};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::types::Region;

/// Lowercase, trim and collapse inner whitespace.
pub fn normalize_name(name: &str) -> String {
    name.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// Identity of a conversion record. Equal ingredients differing only in case
/// or spacing share a key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ConversionKey {
    ingredient: String,
    region: Region,
}

impl ConversionKey {
    pub fn new(ingredient: &str, region: Region) -> Self {
        Self {
            ingredient: normalize_name(ingredient),
            region,
        }
    }

    pub fn ingredient(&self) -> &str {
        &self.ingredient
    }

    pub fn region(&self) -> Region {
        self.region
    }
}

impl fmt::Display for ConversionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.ingredient, self.region)
    }
}

/// Unit factors learned for one ingredient in one region.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversionRecord {
    pub ingredient: String,
    pub region: Region,
    /// Normalized unit name to units-per-base-amount.
    pub units: BTreeMap<String, f64>,
    pub updated_at: DateTime<Utc>,
}

impl ConversionRecord {
    pub fn empty(key: &ConversionKey) -> Self {
        Self {
            ingredient: key.ingredient.clone(),
            region: key.region,
            units: BTreeMap::new(),
            updated_at: Utc::now(),
        }
    }

    pub fn factor(&self, unit: &str) -> Option<f64> {
        self.units.get(&normalize_name(unit)).copied()
    }

    /// Factors for both units, if both have been learned.
    pub fn pair(&self, source: &str, target: &str) -> Option<FactorPair> {
        Some(FactorPair {
            source: self.factor(source)?,
            target: self.factor(target)?,
        })
    }

    /// The unit the record is anchored to: the one with factor 1 if present,
    /// otherwise the first known unit.
    pub fn base_unit(&self) -> Option<(&str, f64)> {
        self.units
            .iter()
            .find(|(_, f)| **f == 1.0)
            .or_else(|| self.units.iter().next())
            .map(|(u, f)| (u.as_str(), *f))
    }

    /// Merge `units` into the record. Returns true if anything changed.
    ///
    /// Units the record already holds keep their factor when an incoming
    /// factor agrees to within rounding, so relearning a pair is a no-op.
    pub fn merge(&mut self, units: &BTreeMap<String, f64>) -> bool {
        let mut changed = false;
        for (unit, factor) in units {
            let unit = normalize_name(unit);
            match self.units.get(&unit) {
                Some(existing) if approx_eq(*existing, *factor) => {}
                _ => {
                    self.units.insert(unit, *factor);
                    changed = true;
                }
            }
        }
        if changed {
            self.updated_at = Utc::now();
        }
        changed
    }
}

fn approx_eq(a: f64, b: f64) -> bool {
    (a - b).abs() <= 1e-9 * a.abs().max(b.abs()).max(1.0)
}

/// Factors of the source and target unit of a conversion.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FactorPair {
    pub source: f64,
    pub target: f64,
}

impl FactorPair {
    pub fn apply(&self, quantity: f64) -> f64 {
        convert_quantity(quantity, self.source, self.target)
    }
}

/// `(quantity / source_factor) * target_factor`
pub fn convert_quantity(quantity: f64, source_factor: f64, target_factor: f64) -> f64 {
    (quantity / source_factor) * target_factor
}

/// What to learn from one model answer "`quantity` S is `answer` T".
#[derive(Debug, Clone, PartialEq)]
pub enum LearnPlan {
    /// Factors to merge into the record.
    Learn(BTreeMap<String, f64>),
    /// Neither unit relates to the record yet. The caller must first ask how
    /// much `quantity` S is in `base_unit`, then call [`plan_anchored`].
    NeedsAnchor { base_unit: String, base_factor: f64 },
}

/// Decide which factors a fresh answer teaches, given the current record.
///
/// Units are expected to be normalized already. `quantity` and `answer` must
/// be positive.
pub fn plan_learning(
    record: Option<&ConversionRecord>,
    source: &str,
    target: &str,
    quantity: f64,
    answer: f64,
) -> LearnPlan {
    let known_source = record.and_then(|r| r.units.get(source).copied());
    let known_target = record.and_then(|r| r.units.get(target).copied());

    let mut learned = BTreeMap::new();
    match (known_source, known_target) {
        (Some(fs), _) => {
            learned.insert(target.to_string(), answer * fs / quantity);
        }
        (None, Some(ft)) => {
            learned.insert(source.to_string(), quantity * ft / answer);
        }
        (None, None) => match record.and_then(|r| r.base_unit()) {
            Some((base, base_factor)) => {
                return LearnPlan::NeedsAnchor {
                    base_unit: base.to_string(),
                    base_factor,
                };
            }
            None => {
                learned.insert(source.to_string(), 1.0);
                learned.insert(target.to_string(), answer / quantity);
            }
        },
    }
    LearnPlan::Learn(learned)
}

/// Factors for S and T once "`quantity` S is `anchor_answer` of the base unit"
/// is known, alongside the original answer "`quantity` S is `answer` T".
pub fn plan_anchored(
    source: &str,
    target: &str,
    quantity: f64,
    answer: f64,
    base_factor: f64,
    anchor_answer: f64,
) -> BTreeMap<String, f64> {
    let source_factor = quantity * base_factor / anchor_answer;
    let target_factor = answer * source_factor / quantity;
    BTreeMap::from([
        (source.to_string(), source_factor),
        (target.to_string(), target_factor),
    ])
}
