//! Prompt construction for the narrative call.

use crate::request::ValuationRequest;
use crate::valuation::ValuationResult;

/// System message sent with every narrative request.
pub const SYSTEM_PROMPT: &str = "You are a professional financial analyst specializing in business valuations. Provide detailed, accurate analysis based on the company data provided.";

/// Format a number with thousands separators and up to three decimals,
/// e.g. `1234567.5` -> `1,234,567.5`.
pub fn format_thousands(value: f64) -> String {
    let formatted = format!("{:.3}", value.abs());
    let (whole, fraction) = formatted
        .split_once('.')
        .unwrap_or((formatted.as_str(), ""));

    let mut grouped = String::with_capacity(whole.len() + whole.len() / 3);
    for (i, digit) in whole.chars().enumerate() {
        if i > 0 && (whole.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(digit);
    }

    let fraction = fraction.trim_end_matches('0');
    let sign = if value < 0.0 && (whole != "0" || !fraction.is_empty()) {
        "-"
    } else {
        ""
    };

    if fraction.is_empty() {
        format!("{sign}{grouped}")
    } else {
        format!("{sign}{grouped}.{fraction}")
    }
}

/// Build the user prompt describing the company and its computed valuation.
pub fn build_prompt(request: &ValuationRequest, result: &ValuationResult) -> String {
    format!(
        "Analyze this company for a business valuation.

Company: {name}
Industry: {industry}
Stage: {stage}
Revenue: ${revenue}
EBITDA: ${ebitda}
Growth Rate: {growth}%
Employees: {employees}

Valuation Results:
- DCF Value: ${dcf}
- Market Comps: ${comps}
- Asset-Based: ${asset}
- Estimated Range: {range}

Write a concise analysis (150-200 words) covering:
1. Key strengths and weaknesses
2. Insights on the valuation methodology
3. Industry-specific considerations
4. Growth prospects and risks

Focus on actionable insights for decision-making.",
        name = request.company_name,
        industry = request.industry,
        stage = request.company_stage,
        revenue = format_thousands(request.revenue),
        ebitda = format_thousands(request.ebitda),
        growth = request.growth_rate,
        employees = request.employees,
        dcf = format_thousands(result.dcf as f64),
        comps = format_thousands(result.comps as f64),
        asset = format_thousands(result.asset_based as f64),
        range = result.valuation_range,
    )
}
