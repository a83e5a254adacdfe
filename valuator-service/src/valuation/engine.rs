//! Valuation Engine.
//!
//! Blends three simplified methods (DCF, market comparables, asset-based)
//! into a weighted estimate and derives a four-factor risk score. Pure and
//! synchronous: every call reads only its input and the constant industry table.

use thiserror::Error;
use valuator_common::ValuationSettings;

use super::types::*;

/// Domain errors raised by the engine.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValuationError {
    /// A ratio would divide by zero.
    #[error("Cannot compute {ratio}: {denominator} is zero")]
    UndefinedRatio {
        ratio: &'static str,
        denominator: &'static str,
    },

    /// An input was NaN or infinite.
    #[error("{field} must be a finite number")]
    NonFiniteInput { field: &'static str },

    /// A computed quantity overflowed to a non-finite value.
    #[error("{quantity} is out of range for the given inputs")]
    Overflow { quantity: &'static str },

    /// Required input absent or zero.
    #[error("{0}")]
    MissingInput(String),
}

/// Engine constants.
#[derive(Debug, Clone)]
pub struct ValuationConfig {
    /// Weighted average cost of capital (fraction)
    pub wacc: f64,
    /// Terminal growth rate (fraction)
    pub terminal_growth: f64,
    /// Flat factor standing in for present-value discounting of the terminal value
    pub dcf_discount_factor: f64,
    /// Marketability discount applied to public comparables
    pub illiquidity_discount: f64,
    /// Book value proxy as a fraction of revenue
    pub asset_to_revenue: f64,
    /// Net income proxy as a fraction of EBITDA
    pub earnings_to_ebitda: f64,
    pub dcf_weight: f64,
    pub comps_weight: f64,
    pub asset_weight: f64,
    /// Half-width of the reported range around the weighted value
    pub range_band: f64,
    /// Spread applied below/above the quick-calculator estimates
    pub quick_band: f64,
}

impl Default for ValuationConfig {
    fn default() -> Self {
        Self {
            wacc: 0.10,
            terminal_growth: 0.03,
            dcf_discount_factor: 0.8,
            illiquidity_discount: 0.30,
            asset_to_revenue: 0.8,
            earnings_to_ebitda: 0.7,
            dcf_weight: 0.4,
            comps_weight: 0.4,
            asset_weight: 0.2,
            range_band: 0.15,
            quick_band: 0.10,
        }
    }
}

impl From<&ValuationSettings> for ValuationConfig {
    fn from(settings: &ValuationSettings) -> Self {
        Self {
            wacc: settings.wacc,
            terminal_growth: settings.terminal_growth,
            ..Self::default()
        }
    }
}

/// Unrounded risk factors; rounding happens only when building the output.
#[derive(Debug, Clone, Copy)]
struct RiskFactors {
    market: f64,
    financial: f64,
    operational: f64,
    liquidity: f64,
}

impl RiskFactors {
    fn overall(&self) -> f64 {
        (self.market + self.financial + self.operational + self.liquidity) / 4.0
    }

    fn to_assessment(self) -> Result<RiskAssessment, ValuationError> {
        Ok(RiskAssessment {
            market_risk: to_whole(self.market, "market risk")?,
            financial_risk: to_whole(self.financial, "financial risk")?,
            operational_risk: to_whole(self.operational, "operational risk")?,
            liquidity_risk: to_whole(self.liquidity, "liquidity risk")?,
            overall_score: to_whole(self.overall(), "overall risk score")?,
        })
    }
}

/// Private company valuation engine.
#[derive(Debug, Clone, Default)]
pub struct ValuationEngine {
    config: ValuationConfig,
}

impl ValuationEngine {
    /// Create an engine with the default assumptions.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create with custom config.
    pub fn with_config(config: ValuationConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ValuationConfig {
        &self.config
    }

    /// Compute the full valuation for a company profile.
    ///
    /// The returned `ai_analysis` is empty; the narrative is attached later.
    pub fn compute_valuation(
        &self,
        profile: &CompanyProfile,
    ) -> Result<ValuationResult, ValuationError> {
        let cfg = &self.config;

        ensure_finite(profile.revenue, "revenue")?;
        ensure_finite(profile.ebitda, "ebitda")?;
        ensure_finite(profile.growth_rate, "growthRate")?;

        let revenue = profile.revenue;
        let ebitda = profile.ebitda;
        let growth = profile.growth_rate / 100.0;
        let multiples = profile.industry.multiples();

        // DCF: single projected year capitalized into a Gordon growth terminal value.
        let projected_cash_flow = ebitda * (1.0 + growth);
        let terminal_value = divide(
            projected_cash_flow * (1.0 + cfg.terminal_growth),
            cfg.wacc - cfg.terminal_growth,
            "terminal value",
            "wacc minus terminal growth",
        )?;
        let dcf = terminal_value * cfg.dcf_discount_factor;

        let comps = revenue * multiples.revenue * (1.0 - cfg.illiquidity_discount);
        let asset_based = revenue * cfg.asset_to_revenue;

        let weighted =
            dcf * cfg.dcf_weight + comps * cfg.comps_weight + asset_based * cfg.asset_weight;
        ensure_in_range(weighted, "weighted value")?;
        let low = weighted * (1.0 - cfg.range_band);
        let high = weighted * (1.0 + cfg.range_band);

        let margin = divide(ebitda, revenue, "EBITDA margin", "revenue")?;
        let risk = RiskFactors {
            market: (60.0 + growth * 100.0 * 2.0).min(80.0),
            financial: (50.0 - margin * 100.0).max(20.0),
            operational: (45.0 + size_adjustment(profile.employees)).min(70.0),
            liquidity: (40.0 - revenue / 1_000_000.0 * 5.0).max(20.0),
        };

        let confidence = (100.0 - (risk.overall() - 40.0)).clamp(70.0, 95.0);

        let pe_ratio = divide(
            comps,
            ebitda * cfg.earnings_to_ebitda,
            "P/E ratio",
            "EBITDA",
        )?;
        let peg_ratio = if growth == 0.0 {
            None
        } else {
            Some(round_tenth(pe_ratio / (growth * 100.0))).filter(|peg| peg.is_finite())
        };

        let key_metrics = KeyMetrics {
            revenue_multiple: round_tenth(divide(comps, revenue, "revenue multiple", "revenue")?),
            ebitda_multiple: round_tenth(divide(comps, ebitda, "EBITDA multiple", "EBITDA")?),
            enterprise_value: to_whole(weighted, "enterprise value")?,
            pe_ratio: round_tenth(pe_ratio),
            peg_ratio,
            price_to_book: round_tenth(divide(
                comps,
                asset_based,
                "price-to-book",
                "asset-based value",
            )?),
        };

        tracing::debug!(
            industry = %profile.industry,
            dcf,
            comps,
            asset_based,
            weighted,
            confidence,
            "Valuation computed"
        );

        Ok(ValuationResult {
            valuation_range: format_range(low, high),
            confidence: to_whole(confidence, "confidence")? as u32,
            dcf: to_whole(dcf, "DCF value")?,
            comps: to_whole(comps, "comparables value")?,
            asset_based: to_whole(asset_based, "asset-based value")?,
            ai_analysis: String::new(),
            risk_assessment: risk.to_assessment()?,
            key_metrics,
            weighted_value: weighted,
            low_estimate: low,
            high_estimate: high,
        })
    }

    /// Quick range from revenue and EBITDA multiples alone.
    ///
    /// Both figures are required and must be nonzero.
    pub fn quick_estimate(
        &self,
        revenue: Option<f64>,
        ebitda: Option<f64>,
        industry: Industry,
    ) -> Result<QuickEstimate, ValuationError> {
        let (revenue, ebitda) = match (revenue, ebitda) {
            (Some(r), Some(e)) if r != 0.0 && e != 0.0 => (r, e),
            _ => {
                return Err(ValuationError::MissingInput(
                    "Revenue and EBITDA are required".to_string(),
                ))
            }
        };
        ensure_finite(revenue, "revenue")?;
        ensure_finite(ebitda, "ebitda")?;

        let multiples = industry.multiples();
        let revenue_estimate = revenue * multiples.revenue;
        let ebitda_estimate = ebitda * multiples.ebitda;

        let low = revenue_estimate.min(ebitda_estimate) * (1.0 - self.config.quick_band);
        let high = revenue_estimate.max(ebitda_estimate) * (1.0 + self.config.quick_band);
        ensure_in_range(high, "quick estimate")?;

        Ok(QuickEstimate {
            revenue_multiple: format_multiple(multiples.revenue),
            ebitda_multiple: format_multiple(multiples.ebitda),
            quick_estimate: format_range(low, high),
        })
    }
}

/// Headcount adjustment to operational risk: small teams carry more risk.
fn size_adjustment(employees: u32) -> f64 {
    if employees < 20 {
        20.0
    } else if employees < 100 {
        10.0
    } else {
        0.0
    }
}

fn divide(
    numerator: f64,
    denominator: f64,
    ratio: &'static str,
    denominator_name: &'static str,
) -> Result<f64, ValuationError> {
    if denominator == 0.0 {
        return Err(ValuationError::UndefinedRatio {
            ratio,
            denominator: denominator_name,
        });
    }
    let value = numerator / denominator;
    ensure_in_range(value, ratio)?;
    Ok(value)
}

fn ensure_finite(value: f64, field: &'static str) -> Result<(), ValuationError> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(ValuationError::NonFiniteInput { field })
    }
}

fn ensure_in_range(value: f64, quantity: &'static str) -> Result<(), ValuationError> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(ValuationError::Overflow { quantity })
    }
}

/// Round to whole units, rejecting values an `i64` cannot hold.
fn to_whole(value: f64, quantity: &'static str) -> Result<i64, ValuationError> {
    let rounded = round_half_up(value);
    // `i64::MAX as f64` is 2^63, one past the largest representable value.
    if rounded.is_finite() && rounded >= i64::MIN as f64 && rounded < i64::MAX as f64 {
        Ok(rounded as i64)
    } else {
        Err(ValuationError::Overflow { quantity })
    }
}

// ============================================================================
// Tests
// ============================================================================
