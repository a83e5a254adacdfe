//! In-memory valuation records.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use crate::request::ValuationRequest;
use crate::valuation::{CompanyStage, RiskAssessment, ValuationMethod, ValuationResult};

/// A stored valuation: the submitted form plus its results once computed.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValuationRecord {
    pub id: u64,
    pub company_name: String,
    pub industry: String,
    pub company_stage: CompanyStage,
    pub revenue: f64,
    pub ebitda: f64,
    pub growth_rate: f64,
    pub employees: u32,
    pub selected_methods: Vec<ValuationMethod>,
    pub ai_analysis: Option<String>,
    pub valuation_range: Option<String>,
    pub confidence: Option<u32>,
    pub dcf_value: Option<i64>,
    pub comps_value: Option<i64>,
    pub asset_based_value: Option<i64>,
    pub risk_assessment: Option<RiskAssessment>,
    pub created_at: DateTime<Utc>,
}

/// Result fields written back after a valuation completes.
#[derive(Debug, Clone, Default)]
pub struct ValuationUpdate {
    pub ai_analysis: Option<String>,
    pub valuation_range: Option<String>,
    pub confidence: Option<u32>,
    pub dcf_value: Option<i64>,
    pub comps_value: Option<i64>,
    pub asset_based_value: Option<i64>,
    pub risk_assessment: Option<RiskAssessment>,
}

impl From<&ValuationResult> for ValuationUpdate {
    fn from(result: &ValuationResult) -> Self {
        Self {
            ai_analysis: Some(result.ai_analysis.clone()),
            valuation_range: Some(result.valuation_range.clone()),
            confidence: Some(result.confidence),
            dcf_value: Some(result.dcf),
            comps_value: Some(result.comps),
            asset_based_value: Some(result.asset_based),
            risk_assessment: Some(result.risk_assessment),
        }
    }
}

/// Thread-safe record store with ids assigned from 1.
pub struct ValuationStore {
    records: RwLock<HashMap<u64, ValuationRecord>>,
    next_id: AtomicU64,
}

impl Default for ValuationStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ValuationStore {
    pub fn new() -> Self {
        Self {
            records: RwLock::new(HashMap::new()),
            next_id: AtomicU64::new(1),
        }
    }

    /// Store a new submission with empty result fields.
    pub async fn create(&self, request: &ValuationRequest) -> ValuationRecord {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let record = ValuationRecord {
            id,
            company_name: request.company_name.clone(),
            industry: request.industry.clone(),
            company_stage: request.company_stage,
            revenue: request.revenue,
            ebitda: request.ebitda,
            growth_rate: request.growth_rate,
            employees: request.employees,
            selected_methods: request.selected_methods.clone(),
            ai_analysis: None,
            valuation_range: None,
            confidence: None,
            dcf_value: None,
            comps_value: None,
            asset_based_value: None,
            risk_assessment: None,
            created_at: Utc::now(),
        };

        self.records.write().await.insert(id, record.clone());
        tracing::debug!(id, company = %record.company_name, "Valuation record created");
        record
    }

    pub async fn get(&self, id: u64) -> Option<ValuationRecord> {
        self.records.read().await.get(&id).cloned()
    }

    /// Apply result fields to an existing record. Fields left `None` in the
    /// update are not touched.
    pub async fn update(&self, id: u64, update: ValuationUpdate) -> Option<ValuationRecord> {
        let mut records = self.records.write().await;
        let record = records.get_mut(&id)?;

        if let Some(v) = update.ai_analysis {
            record.ai_analysis = Some(v);
        }
        if let Some(v) = update.valuation_range {
            record.valuation_range = Some(v);
        }
        if let Some(v) = update.confidence {
            record.confidence = Some(v);
        }
        if let Some(v) = update.dcf_value {
            record.dcf_value = Some(v);
        }
        if let Some(v) = update.comps_value {
            record.comps_value = Some(v);
        }
        if let Some(v) = update.asset_based_value {
            record.asset_based_value = Some(v);
        }
        if let Some(v) = update.risk_assessment {
            record.risk_assessment = Some(v);
        }

        Some(record.clone())
    }

    /// Most recent records, newest first.
    pub async fn recent(&self, limit: usize) -> Vec<ValuationRecord> {
        let records = self.records.read().await;
        let mut list: Vec<ValuationRecord> = records.values().cloned().collect();
        list.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| b.id.cmp(&a.id))
        });
        list.truncate(limit);
        list
    }

    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }
}
