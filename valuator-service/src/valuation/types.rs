//! Valuation Types.
//!
//! Inputs, the fixed industry multiple table, and the result structures
//! produced by the valuation engine. Field names serialize as camelCase so the
//! browser client can read them unchanged.

use serde::{Deserialize, Deserializer, Serialize, Serializer};

// ============================================================================
// Industry Table
// ============================================================================

/// Market-observed valuation multiples for a sector.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct IndustryMultiples {
    /// Enterprise value / revenue
    pub revenue: f64,
    /// Enterprise value / EBITDA
    pub ebitda: f64,
}

/// Industry category.
///
/// Closed set with `Other` as the named default: any label that is not an
/// exact match maps to `Other`, so lookups never fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Industry {
    Technology,
    Healthcare,
    FinancialServices,
    Manufacturing,
    Retail,
    #[default]
    Other,
}

impl Industry {
    /// Every category, in table order.
    pub const ALL: [Industry; 6] = [
        Self::Technology,
        Self::Healthcare,
        Self::FinancialServices,
        Self::Manufacturing,
        Self::Retail,
        Self::Other,
    ];

    /// Resolve a submitted label. Unknown or empty labels resolve to `Other`.
    pub fn from_label(label: &str) -> Self {
        Self::ALL
            .into_iter()
            .find(|industry| industry.label() == label)
            .unwrap_or(Self::Other)
    }

    /// Display label, as used by the submission form.
    pub const fn label(self) -> &'static str {
        match self {
            Self::Technology => "Technology",
            Self::Healthcare => "Healthcare",
            Self::FinancialServices => "Financial Services",
            Self::Manufacturing => "Manufacturing",
            Self::Retail => "Retail",
            Self::Other => "Other",
        }
    }

    /// Revenue and EBITDA multiples for this industry.
    pub const fn multiples(self) -> IndustryMultiples {
        let (revenue, ebitda) = match self {
            Self::Technology => (4.2, 15.5),
            Self::Healthcare => (3.8, 12.3),
            Self::FinancialServices => (2.9, 11.2),
            Self::Manufacturing => (1.8, 8.5),
            Self::Retail => (1.4, 7.8),
            Self::Other => (2.5, 10.0),
        };
        IndustryMultiples { revenue, ebitda }
    }
}

impl std::fmt::Display for Industry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

impl Serialize for Industry {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.label())
    }
}

impl<'de> Deserialize<'de> for Industry {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let label = String::deserialize(deserializer)?;
        Ok(Self::from_label(&label))
    }
}

// ============================================================================
// Company Descriptors
// ============================================================================

/// Lifecycle stage of the company being valued.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CompanyStage {
    Startup,
    Growth,
    Mature,
    Public,
}

impl std::fmt::Display for CompanyStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Startup => write!(f, "Startup"),
            Self::Growth => write!(f, "Growth"),
            Self::Mature => write!(f, "Mature"),
            Self::Public => write!(f, "Public"),
        }
    }
}

/// Valuation methods a user can select on the form.
///
/// Precedent transactions can be selected but are not computed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ValuationMethod {
    Dcf,
    Comparables,
    Precedent,
    AssetBased,
}

/// Financial profile consumed by the engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompanyProfile {
    pub industry: Industry,
    /// Annual revenue, currency units
    pub revenue: f64,
    /// Annual EBITDA, currency units (may be negative)
    pub ebitda: f64,
    /// Growth rate in percentage points (15 means 15%)
    pub growth_rate: f64,
    pub employees: u32,
}

// ============================================================================
// Risk
// ============================================================================

/// Coarse classification of a risk score.
///
/// Scores are nominally 0-100 but are not clamped; extreme inputs can fall
/// outside that range and classify as `Low` or `High`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

impl RiskLevel {
    /// Low up to 30, Medium up to 60, High above.
    pub fn from_score(score: i64) -> Self {
        if score <= 30 {
            Self::Low
        } else if score <= 60 {
            Self::Medium
        } else {
            Self::High
        }
    }
}

impl std::fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Low => write!(f, "Low"),
            Self::Medium => write!(f, "Medium"),
            Self::High => write!(f, "High"),
        }
    }
}

/// Four-factor risk breakdown, each score rounded to an integer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RiskAssessment {
    pub market_risk: i64,
    pub financial_risk: i64,
    pub operational_risk: i64,
    pub liquidity_risk: i64,
    pub overall_score: i64,
}

impl RiskAssessment {
    /// Factor names paired with their levels, in display order.
    pub fn levels(&self) -> [(&'static str, RiskLevel); 4] {
        [
            ("Market Risk", RiskLevel::from_score(self.market_risk)),
            ("Financial Risk", RiskLevel::from_score(self.financial_risk)),
            ("Operational Risk", RiskLevel::from_score(self.operational_risk)),
            ("Liquidity Risk", RiskLevel::from_score(self.liquidity_risk)),
        ]
    }

    pub fn overall_level(&self) -> RiskLevel {
        RiskLevel::from_score(self.overall_score)
    }
}

// ============================================================================
// Results
// ============================================================================

/// Derived financial ratios. Ratios carry one decimal.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KeyMetrics {
    pub revenue_multiple: f64,
    pub ebitda_multiple: f64,
    /// Weighted value, rounded to whole currency units
    pub enterprise_value: i64,
    pub pe_ratio: f64,
    /// `None` when the growth rate is zero
    pub peg_ratio: Option<f64>,
    pub price_to_book: f64,
}

/// Full valuation output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValuationResult {
    /// e.g. "$3.0M - $4.1M"
    pub valuation_range: String,
    /// Always within 70..=95
    pub confidence: u32,
    pub dcf: i64,
    pub comps: i64,
    pub asset_based: i64,
    /// Narrative text; the engine leaves it empty
    pub ai_analysis: String,
    pub risk_assessment: RiskAssessment,
    pub key_metrics: KeyMetrics,
    /// Unrounded blend the range is derived from
    pub weighted_value: f64,
    pub low_estimate: f64,
    pub high_estimate: f64,
}

/// Output of the quick calculator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuickEstimate {
    /// e.g. "4.2x"
    pub revenue_multiple: String,
    /// e.g. "15.5x"
    pub ebitda_multiple: String,
    /// e.g. "$2.5M - $3.4M"
    pub quick_estimate: String,
}

// ============================================================================
// Formatting
// ============================================================================

/// Round to the nearest integer, exact halves toward positive infinity.
pub fn round_half_up(value: f64) -> f64 {
    // Comparing against the floor avoids the precision loss of `value + 0.5`.
    let floor = value.floor();
    if value - floor >= 0.5 {
        floor + 1.0
    } else {
        floor
    }
}

/// Round to one decimal place, halves toward positive infinity.
pub fn round_tenth(value: f64) -> f64 {
    round_half_up(value * 10.0) / 10.0
}

/// Format a currency amount in millions with one decimal, e.g. `$2.5M`.
pub fn format_millions(value: f64) -> String {
    // Adding 0.0 turns -0.0 into 0.0.
    format!("${:.1}M", round_tenth(value / 1_000_000.0) + 0.0)
}

/// Format a low/high pair as `"$L.LM - $H.HM"`.
pub fn format_range(low: f64, high: f64) -> String {
    format!("{} - {}", format_millions(low), format_millions(high))
}

/// Format a multiple as e.g. `4.2x` or `10x`.
pub fn format_multiple(multiple: f64) -> String {
    format!("{}x", multiple)
}

// ============================================================================
// Tests
// ============================================================================
