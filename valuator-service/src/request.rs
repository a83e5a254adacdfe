//! Valuation submission.
//!
//! The form payload accepted by `POST /api/valuations`, its validation, and
//! its conversion into the engine's `CompanyProfile`.

use serde::{Deserialize, Serialize};
use valuator_common::{Error, Result};

use crate::valuation::{CompanyProfile, CompanyStage, Industry, ValuationMethod};

/// A company submitted for valuation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValuationRequest {
    pub company_name: String,
    /// Industry label; unrecognized labels are valued as "Other"
    pub industry: String,
    pub company_stage: CompanyStage,
    pub revenue: f64,
    pub ebitda: f64,
    /// Percentage points
    pub growth_rate: f64,
    pub employees: u32,
    #[serde(default = "default_methods")]
    pub selected_methods: Vec<ValuationMethod>,
}

fn default_methods() -> Vec<ValuationMethod> {
    vec![
        ValuationMethod::Dcf,
        ValuationMethod::Comparables,
        ValuationMethod::AssetBased,
    ]
}

impl ValuationRequest {
    /// Check the submission before it reaches the engine.
    pub fn validate(&self) -> Result<()> {
        if self.company_name.trim().is_empty() {
            return Err(Error::InvalidInput("Company name is required".into()));
        }
        if self.industry.trim().is_empty() {
            return Err(Error::InvalidInput("Industry is required".into()));
        }
        if !self.revenue.is_finite() || self.revenue <= 0.0 {
            return Err(Error::InvalidInput(
                "Revenue must be a positive number".into(),
            ));
        }
        if !self.ebitda.is_finite() {
            return Err(Error::InvalidInput("EBITDA must be a number".into()));
        }
        if !self.growth_rate.is_finite() {
            return Err(Error::InvalidInput("Growth rate must be a number".into()));
        }
        if self.selected_methods.is_empty() {
            return Err(Error::InvalidInput(
                "Please select at least one valuation method".into(),
            ));
        }
        Ok(())
    }

    /// Resolved industry category.
    pub fn industry_category(&self) -> Industry {
        Industry::from_label(&self.industry)
    }

    /// Engine input for this submission.
    pub fn profile(&self) -> CompanyProfile {
        CompanyProfile {
            industry: self.industry_category(),
            revenue: self.revenue,
            ebitda: self.ebitda,
            growth_rate: self.growth_rate,
            employees: self.employees,
        }
    }
}

#[cfg(test)]
pub(crate) fn sample_request() -> ValuationRequest {
    ValuationRequest {
        company_name: "Acme Analytics".into(),
        industry: "Technology".into(),
        company_stage: CompanyStage::Growth,
        revenue: 1_000_000.0,
        ebitda: 200_000.0,
        growth_rate: 15.0,
        employees: 50,
        selected_methods: default_methods(),
    }
}
