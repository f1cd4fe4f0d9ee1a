//! Natural-language insight over a supplier snapshot.
//!
//! Text generation is an external service reached through [`InsightGenerator`]. The
//! [`TemplateInsightGenerator`] answers offline with fixed prose.

use super::{StepVariance, SupplierPerformance};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum InsightError {
    #[error("Insight service unavailable: {0}")]
    Unavailable(String),

    #[error("Insight service returned no text")]
    EmptyResponse,
}

/// The summary handed to a generator: the worst step plus headline numbers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InsightRequest {
    pub supplier_id: String,
    pub completed_orders: usize,
    pub otif_pct: f64,
    pub bottleneck: Option<StepVariance>,
}

impl InsightRequest {
    /// `None` when the snapshot has no completed orders to talk about.
    pub fn from_snapshot(snapshot: &SupplierPerformance) -> Option<Self> {
        if !snapshot.has_data() {
            return None;
        }
        Some(Self {
            supplier_id: snapshot.supplier_id.clone(),
            completed_orders: snapshot.completed_orders,
            otif_pct: snapshot.otif_pct,
            bottleneck: snapshot.bottleneck_step().cloned(),
        })
    }

    /// Every completed order was timed and finished within its nominal total.
    pub fn all_on_time(&self) -> bool {
        self.otif_pct >= 100.0
    }

    /// Prompt text for model-backed generators.
    pub fn prompt(&self) -> String {
        match &self.bottleneck {
            Some(step) => format!(
                "You are a supply chain analyst. Analyze this delay:\n\
                 Supplier: {}\nStep: {} (tier {})\nAverage delay: {:.1} hours\n\
                 Late rate: {:.1}%\n\
                 Provide a concise 3-sentence root cause analysis and recommendation.",
                self.supplier_id, step.step_name, step.tier, step.avg_variance_hours, step.late_pct
            ),
            None if self.all_on_time() => format!(
                "You are a supply chain analyst. Supplier {} met nominal durations on every \
                 step across {} orders ({:.1}% OTIF). Suggest one way to keep it that way.",
                self.supplier_id, self.completed_orders, self.otif_pct
            ),
            None => format!(
                "You are a supply chain analyst. Supplier {} has no step running over its \
                 nominal duration on average across {} orders, yet OTIF is {:.1}%. Some orders \
                 overran individual steps or lack step timestamps. Suggest how to find them.",
                self.supplier_id, self.completed_orders, self.otif_pct
            ),
        }
    }
}

#[async_trait]
pub trait InsightGenerator: Send + Sync {
    async fn generate(&self, request: &InsightRequest) -> Result<String, InsightError>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct TemplateInsightGenerator;

#[async_trait]
impl InsightGenerator for TemplateInsightGenerator {
    async fn generate(&self, request: &InsightRequest) -> Result<String, InsightError> {
        let text = match &request.bottleneck {
            Some(step) => format!(
                "{} is the main source of delay for supplier {}, running {:.1} hours over its \
                 {:.1} hour target on average. {:.1}% of orders overran it, pulling OTIF down \
                 to {:.1}%. Review capacity and hand-off timing at this tier {} step first.",
                step.step_name,
                request.supplier_id,
                step.avg_variance_hours,
                step.nominal_hours,
                step.late_pct,
                request.otif_pct,
                step.tier
            ),
            None if request.all_on_time() => format!(
                "Supplier {} finished every step within its nominal duration across {} \
                 completed orders. OTIF stands at {:.1}%.",
                request.supplier_id, request.completed_orders, request.otif_pct
            ),
            None => format!(
                "No step at supplier {} overruns its nominal duration on average across {} \
                 completed orders, but OTIF is only {:.1}%. The late orders overran individual \
                 steps or could not be fully timed.",
                request.supplier_id, request.completed_orders, request.otif_pct
            ),
        };
        Ok(text)
    }
}
