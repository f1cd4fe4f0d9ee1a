//! OTIF, per-step variance, and bottleneck ranking.
//!
//! A step's actual duration runs from its predecessor's completion (or order placement for
//! the first step) to its own completion. Nothing is carried between calls: every snapshot
//! is recomputed from the order set it is given.

use crate::model::{Order, OrderStatus, StepCatalog};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepVariance {
    pub step_name: String,
    pub tier: u8,
    /// Orders that contributed a measured duration for this step.
    pub samples: usize,
    pub nominal_hours: f64,
    pub avg_actual_hours: f64,
    /// Positive means the step overran its nominal duration on average.
    pub avg_variance_hours: f64,
    /// Share of samples that overran nominal, as a percentage.
    pub late_pct: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SupplierPerformance {
    pub supplier_id: String,
    pub completed_orders: usize,
    /// In `[0, 100]`; zero when there are no completed orders.
    pub otif_pct: f64,
    /// Mean of every measured step variance, in hours.
    pub avg_variance_hours: f64,
    pub step_variance: Vec<StepVariance>,
    pub bottleneck: Option<String>,
    /// Steps with positive average variance, worst first.
    pub ranked_bottlenecks: Vec<StepVariance>,
    pub computed_at: DateTime<Utc>,
}

impl SupplierPerformance {
    /// The zero-state snapshot for a supplier without completed orders.
    pub fn empty(supplier_id: impl Into<String>, computed_at: DateTime<Utc>) -> Self {
        Self {
            supplier_id: supplier_id.into(),
            completed_orders: 0,
            otif_pct: 0.0,
            avg_variance_hours: 0.0,
            step_variance: Vec::new(),
            bottleneck: None,
            ranked_bottlenecks: Vec::new(),
            computed_at,
        }
    }

    pub fn has_data(&self) -> bool {
        self.completed_orders > 0
    }

    pub fn bottleneck_step(&self) -> Option<&StepVariance> {
        self.ranked_bottlenecks.first()
    }
}

#[derive(Default)]
struct Accumulator {
    tier: u8,
    nominal_hours: f64,
    samples: usize,
    actual_sum: f64,
    variance_sum: f64,
    late: usize,
}

fn hours_between(from: DateTime<Utc>, to: DateTime<Utc>) -> f64 {
    (to - from).num_milliseconds() as f64 / 3_600_000.0
}

/// The `supplier_id` carried by fleet-wide snapshots.
pub const FLEET_SCOPE: &str = "*";

/// Computes a supplier snapshot from `orders`.
///
/// Orders that are not COMPLETED or belong to another supplier are ignored. An order whose
/// steps cannot all be timed counts as completed but not on time. `bottleneck_limit` caps
/// the ranked list only.
pub fn compute(
    supplier_id: &str,
    orders: &[Order],
    catalog: &StepCatalog,
    bottleneck_limit: usize,
    computed_at: DateTime<Utc>,
) -> SupplierPerformance {
    let completed: Vec<&Order> = orders
        .iter()
        .filter(|o| o.status == OrderStatus::Completed && o.supplier_id == supplier_id)
        .collect();
    summarize(supplier_id, &completed, catalog, bottleneck_limit, computed_at)
}

/// Same figures as [`compute`] over every supplier's COMPLETED orders, reported under
/// [`FLEET_SCOPE`].
pub fn compute_fleet(
    orders: &[Order],
    catalog: &StepCatalog,
    bottleneck_limit: usize,
    computed_at: DateTime<Utc>,
) -> SupplierPerformance {
    let completed: Vec<&Order> = orders
        .iter()
        .filter(|o| o.status == OrderStatus::Completed)
        .collect();
    summarize(FLEET_SCOPE, &completed, catalog, bottleneck_limit, computed_at)
}

fn summarize(
    scope: &str,
    completed: &[&Order],
    catalog: &StepCatalog,
    bottleneck_limit: usize,
    computed_at: DateTime<Utc>,
) -> SupplierPerformance {
    if completed.is_empty() {
        return SupplierPerformance::empty(scope, computed_at);
    }

    // Step names in first-appearance catalog order, so ties resolve deterministically.
    let mut names: Vec<String> = Vec::new();
    let mut stats: Vec<Accumulator> = Vec::new();
    for order_type in catalog.order_types() {
        for def in &order_type.steps {
            if !names.contains(&def.name) {
                names.push(def.name.clone());
                stats.push(Accumulator {
                    tier: def.tier,
                    nominal_hours: def.nominal_hours,
                    ..Default::default()
                });
            }
        }
    }

    let mut on_time = 0usize;
    for order in completed {
        let Some(defs) = catalog.steps(&order.order_type) else {
            continue;
        };

        let mut all_on_time = true;
        let mut previous = Some(order.placed_at);
        for def in defs {
            let completed_at = order.completed_at(&def.name);
            let (Some(start), Some(end)) = (previous, completed_at) else {
                all_on_time = false;
                previous = completed_at;
                continue;
            };
            previous = Some(end);

            let actual = hours_between(start, end);
            let variance = actual - def.nominal_hours;
            if variance > 0.0 {
                all_on_time = false;
            }
            if let Some(slot) = names.iter().position(|n| n == &def.name) {
                let acc = &mut stats[slot];
                acc.samples += 1;
                acc.actual_sum += actual;
                acc.variance_sum += variance;
                if variance > 0.0 {
                    acc.late += 1;
                }
            }
        }
        if all_on_time {
            on_time += 1;
        }
    }

    let step_variance: Vec<StepVariance> = names
        .into_iter()
        .zip(stats)
        .filter(|(_, acc)| acc.samples > 0)
        .map(|(step_name, acc)| {
            let n = acc.samples as f64;
            StepVariance {
                step_name,
                tier: acc.tier,
                samples: acc.samples,
                nominal_hours: acc.nominal_hours,
                avg_actual_hours: acc.actual_sum / n,
                avg_variance_hours: acc.variance_sum / n,
                late_pct: acc.late as f64 / n * 100.0,
            }
        })
        .collect();

    let total_samples: usize = step_variance.iter().map(|s| s.samples).sum();
    let avg_variance_hours = if total_samples == 0 {
        0.0
    } else {
        step_variance
            .iter()
            .map(|s| s.avg_variance_hours * s.samples as f64)
            .sum::<f64>()
            / total_samples as f64
    };

    // Stable sort keeps catalog order among equal variances.
    let mut ranked: Vec<StepVariance> = step_variance
        .iter()
        .filter(|s| s.avg_variance_hours > 0.0)
        .cloned()
        .collect();
    ranked.sort_by(|a, b| b.avg_variance_hours.total_cmp(&a.avg_variance_hours));
    let bottleneck = ranked.first().map(|s| s.step_name.clone());
    ranked.truncate(bottleneck_limit);

    SupplierPerformance {
        supplier_id: scope.to_string(),
        completed_orders: completed.len(),
        otif_pct: on_time as f64 / completed.len() as f64 * 100.0,
        avg_variance_hours,
        step_variance,
        bottleneck,
        ranked_bottlenecks: ranked,
        computed_at,
    }
}
