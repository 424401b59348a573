//! Opportunity writes. Creation is a plain create with no dedup lookup, so
//! re-pushing the same engagement yields a second opportunity.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{info, warn};

use crate::crm::replies::{CreateResult, WriteResult};
use crate::crm::{ContactId, CrmClient, CrmError, OpportunityId};

pub const OPPORTUNITY_MODEL: &str = "crm.lead";

#[derive(Debug, Clone)]
pub struct NewOpportunity {
    pub name: String,
    pub contact_id: ContactId,
    pub expected_value: f64,
    /// 0 – 100
    pub probability: f64,
    pub description: String,
    pub deadline: Option<NaiveDate>,
}

#[derive(Debug, Serialize)]
struct LeadValues<'a> {
    name: &'a str,
    partner_id: i64,
    expected_revenue: f64,
    probability: f64,
    description: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    date_deadline: Option<NaiveDate>,
    #[serde(rename = "type")]
    kind: &'static str,
}

pub async fn create_opportunity(
    crm: &CrmClient,
    opportunity: &NewOpportunity,
) -> Result<OpportunityId, CrmError> {
    let values = LeadValues {
        name: &opportunity.name,
        partner_id: opportunity.contact_id.0,
        expected_revenue: opportunity.expected_value,
        probability: opportunity.probability,
        description: &opportunity.description,
        date_deadline: opportunity.deadline,
        kind: "opportunity",
    };
    let created: CreateResult = crm
        .call_typed(OPPORTUNITY_MODEL, "create", vec![json!(values)], json!({}))
        .await?;

    info!(
        "Created CRM opportunity {} '{}' for contact {}",
        created.id, opportunity.name, opportunity.contact_id
    );
    Ok(OpportunityId(created.id))
}

/// Terminal outcome of a deal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DealOutcome {
    Won,
    Lost,
}

impl DealOutcome {
    pub fn default_probability(self) -> f64 {
        match self {
            DealOutcome::Won => 100.0,
            DealOutcome::Lost => 0.0,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            DealOutcome::Won => "won",
            DealOutcome::Lost => "lost",
        }
    }
}

/// Writes the final probability and, when given, posts notes to the
/// opportunity's message log.
pub async fn record_outcome(
    crm: &CrmClient,
    opportunity_id: OpportunityId,
    probability: f64,
    notes: Option<&str>,
) -> Result<(), CrmError> {
    let written: WriteResult = crm
        .call_typed(
            OPPORTUNITY_MODEL,
            "write",
            vec![json!([opportunity_id.0]), json!({"probability": probability})],
            json!({}),
        )
        .await?;
    if !written.applied {
        return Err(CrmError::Rpc {
            model: OPPORTUNITY_MODEL.to_string(),
            method: "write".to_string(),
            cause: format!("opportunity {opportunity_id} was not updated"),
        });
    }

    if let Some(notes) = notes.map(str::trim).filter(|n| !n.is_empty()) {
        crm.call(
            OPPORTUNITY_MODEL,
            "message_post",
            vec![json!([opportunity_id.0])],
            json!({"body": notes}),
        )
        .await?;
    }

    info!("Set CRM opportunity {opportunity_id} probability to {probability}");
    Ok(())
}

/// Parses a free-form budget such as "$12,000" or "15000 USD" into a number.
/// Currency symbols, separators and one ISO currency code are tolerated; any
/// other text ("10k", "$5 per hour") makes the budget unparseable, which
/// becomes 0 so that bad budget data never blocks a sync.
pub fn parse_budget(raw: Option<&str>) -> f64 {
    let Some(raw) = raw.map(str::trim).filter(|s| !s.is_empty()) else {
        return 0.0;
    };

    let cleaned: String = strip_currency_code(raw)
        .chars()
        .filter(|c| !matches!(c, '$' | '€' | '£' | ',' | '_') && !c.is_whitespace())
        .collect();

    match cleaned.parse::<f64>() {
        Ok(value) if value.is_finite() && value >= 0.0 => value,
        _ => {
            warn!("Unparseable budget '{raw}', using expected value 0");
            0.0
        }
    }
}

/// Strips one leading or trailing ISO currency code such as `USD` or `eur`.
/// Any other letters are left in place so the number fails to parse.
fn strip_currency_code(raw: &str) -> &str {
    for code in CURRENCY_CODES {
        let n = code.len();
        if raw.len() <= n {
            continue;
        }
        let split = raw.len() - n;
        if let (Some(head), Some(tail)) = (raw.get(..split), raw.get(split..)) {
            if tail.eq_ignore_ascii_case(code) {
                return head.trim_end();
            }
        }
        if let (Some(head), Some(tail)) = (raw.get(..n), raw.get(n..)) {
            if head.eq_ignore_ascii_case(code) {
                return tail.trim_start();
            }
        }
    }
    raw
}

const CURRENCY_CODES: &[&str] = &["USD", "EUR", "GBP", "CAD", "AUD", "CHF", "INR"];
