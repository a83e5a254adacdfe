//! Valuation Module.
//!
//! Estimates a private company's fair-value range from five inputs: industry,
//! revenue, EBITDA, growth rate, and headcount.
//!
//! # Methods
//!
//! 1. **DCF**: next-year EBITDA capitalized into a terminal value
//!    (WACC 10%, terminal growth 3%) with a flat 0.8 discount factor.
//! 2. **Market comparables**: revenue times the industry revenue multiple,
//!    less a 30% illiquidity discount.
//! 3. **Asset-based**: 80% of revenue as a book value proxy.
//!
//! The three are blended 40/40/20 and reported as a ±15% range. Risk is
//! scored on market, financial, operational, and liquidity factors; the
//! confidence score falls as overall risk rises and stays within 70-95.
//!
//! # Usage
//!
//! ```ignore
//! use valuator_service::valuation::{CompanyProfile, Industry, ValuationEngine};
//!
//! let engine = ValuationEngine::new();
//! let profile = CompanyProfile {
//!     industry: Industry::from_label("Technology"),
//!     revenue: 1_000_000.0,
//!     ebitda: 200_000.0,
//!     growth_rate: 15.0,
//!     employees: 50,
//! };
//!
//! let result = engine.compute_valuation(&profile)?;
//! println!("Range: {}", result.valuation_range);
//! ```

pub mod engine;
pub mod types;

pub use engine::{ValuationConfig, ValuationEngine, ValuationError};
pub use types::{
    format_millions, format_range, CompanyProfile, CompanyStage, Industry, IndustryMultiples,
    KeyMetrics, QuickEstimate, RiskAssessment, RiskLevel, ValuationMethod, ValuationResult,
};
