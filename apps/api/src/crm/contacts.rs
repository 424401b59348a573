//! Contact resolution keyed by email.
//!
//! Creates a remote contact only when none exists for the email, otherwise
//! reuses whichever match the CRM lists first. Two concurrent resolutions of
//! the same new email can both miss and both create; sequential batch sync
//! never hits that.

use serde::Serialize;
use serde_json::json;
use tracing::info;

use crate::crm::replies::{CountResult, CreateResult, SearchResult};
use crate::crm::{ContactId, CrmClient, CrmError};

pub const CONTACT_MODEL: &str = "res.partner";

#[derive(Debug, Serialize)]
struct NewContact<'a> {
    name: &'a str,
    email: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    phone: Option<&'a str>,
    is_company: bool,
}

pub async fn resolve_contact(
    crm: &CrmClient,
    email: &str,
    display_name: &str,
    phone: Option<&str>,
    is_company: bool,
) -> Result<ContactId, CrmError> {
    let existing: SearchResult = crm
        .call_typed(
            CONTACT_MODEL,
            "search",
            vec![json!([["email", "=", email]])],
            json!({"limit": 1}),
        )
        .await?;

    if let Some(&id) = existing.ids.first() {
        info!("Reusing CRM contact {id} for {email}");
        return Ok(ContactId(id));
    }

    let values = NewContact {
        name: display_name,
        email,
        phone,
        is_company,
    };
    let created: CreateResult = crm
        .call_typed(CONTACT_MODEL, "create", vec![json!(values)], json!({}))
        .await?;

    info!("Created CRM contact {} for {email}", created.id);
    Ok(ContactId(created.id))
}

/// Number of company contacts, used as a cheap end-to-end read.
pub async fn count_companies(crm: &CrmClient) -> Result<i64, CrmError> {
    let result: CountResult = crm
        .call_typed(
            CONTACT_MODEL,
            "search_count",
            vec![json!([["is_company", "=", true]])],
            json!({}),
        )
        .await?;
    Ok(result.count)
}
