//! The Step Catalog: the ordered, canonical production steps for each order type.
//!
//! Steps form a total order per type; a step's predecessor is always the one before it.
//! A step may also name a sub-tier step owned by another party. That link is shown to
//! dashboards and never consulted when deciding whether a step may complete.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use thiserror::Error;

/// Display-only reference to a step run by a sub-tier party.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubTierLink {
    pub step_name: String,
    pub tier: u8,
    #[serde(default)]
    pub owner: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepDefinition {
    pub name: String,
    pub nominal_hours: f64,
    /// Echelon responsible for the step (1 = direct supplier, 2 = its sub-supplier, ...).
    #[serde(default = "default_tier")]
    pub tier: u8,
    #[serde(default)]
    pub sub_tier: Option<SubTierLink>,
}

fn default_tier() -> u8 {
    1
}

impl StepDefinition {
    pub fn new(name: impl Into<String>, nominal_hours: f64, tier: u8) -> Self {
        Self {
            name: name.into(),
            nominal_hours,
            tier,
            sub_tier: None,
        }
    }

    pub fn with_sub_tier(mut self, step_name: impl Into<String>, tier: u8, owner: impl Into<String>) -> Self {
        self.sub_tier = Some(SubTierLink {
            step_name: step_name.into(),
            tier,
            owner: Some(owner.into()),
        });
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderTypeSteps {
    pub name: String,
    pub steps: Vec<StepDefinition>,
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum CatalogError {
    #[error("Catalog defines no order types")]
    Empty,
    #[error("Order type '{0}' defined more than once")]
    DuplicateOrderType(String),
    #[error("Order type '{0}' has no steps")]
    NoSteps(String),
    #[error("Order type '{order_type}' repeats step '{step}'")]
    DuplicateStep { order_type: String, step: String },
    #[error("Step '{step}' of '{order_type}' has invalid nominal duration {hours}")]
    InvalidDuration {
        order_type: String,
        step: String,
        hours: f64,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct StepCatalog {
    order_types: Vec<OrderTypeSteps>,
}

impl StepCatalog {
    pub fn new(order_types: Vec<OrderTypeSteps>) -> Result<Self, CatalogError> {
        if order_types.is_empty() {
            return Err(CatalogError::Empty);
        }
        let mut type_names = HashSet::new();
        for order_type in &order_types {
            if !type_names.insert(order_type.name.as_str()) {
                return Err(CatalogError::DuplicateOrderType(order_type.name.clone()));
            }
            if order_type.steps.is_empty() {
                return Err(CatalogError::NoSteps(order_type.name.clone()));
            }
            let mut step_names = HashSet::new();
            for step in &order_type.steps {
                if !step_names.insert(step.name.as_str()) {
                    return Err(CatalogError::DuplicateStep {
                        order_type: order_type.name.clone(),
                        step: step.name.clone(),
                    });
                }
                if !step.nominal_hours.is_finite() || step.nominal_hours < 0.0 {
                    return Err(CatalogError::InvalidDuration {
                        order_type: order_type.name.clone(),
                        step: step.name.clone(),
                        hours: step.nominal_hours,
                    });
                }
            }
        }
        Ok(Self { order_types })
    }

    pub fn steps(&self, order_type: &str) -> Option<&[StepDefinition]> {
        self.order_types
            .iter()
            .find(|t| t.name == order_type)
            .map(|t| t.steps.as_slice())
    }

    /// Positional index of `step_name` within `order_type`.
    pub fn position(&self, order_type: &str, step_name: &str) -> Option<usize> {
        self.steps(order_type)?
            .iter()
            .position(|s| s.name == step_name)
    }

    pub fn order_types(&self) -> impl Iterator<Item = &OrderTypeSteps> {
        self.order_types.iter()
    }
}

impl Default for StepCatalog {
    fn default() -> Self {
        Self {
            order_types: vec![
                OrderTypeSteps {
                    name: "coffee".to_string(),
                    steps: vec![
                        StepDefinition::new("Sourcing", 24.0, 2).with_sub_tier(
                            "Farm Harvesting",
                            2,
                            "Valley Farms",
                        ),
                        StepDefinition::new("Processing", 12.0, 1),
                        StepDefinition::new("Quality", 4.0, 1),
                        StepDefinition::new("Logistics", 24.0, 1),
                        StepDefinition::new("Delivered", 8.0, 1),
                    ],
                },
                OrderTypeSteps {
                    name: "standard".to_string(),
                    steps: vec![
                        StepDefinition::new("Raw Material Sourcing", 48.0, 2),
                        StepDefinition::new("Processing", 24.0, 1),
                        StepDefinition::new("Quality", 8.0, 1),
                        StepDefinition::new("Logistics", 48.0, 1),
                        StepDefinition::new("Delivered", 12.0, 1),
                    ],
                },
            ],
        }
    }
}
