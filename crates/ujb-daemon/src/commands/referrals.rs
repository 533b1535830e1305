//! Referral terms command handlers.
//!
//! These write only the deal terms; ledger counters are moved by the
//! settlement commands alone.

use std::sync::Arc;

use serde::Deserialize;
use serde_json::Value;
use ujb_db::queries::referrals;
use ujb_ledger::LedgerError;
use ujb_types::commission::CommissionTerms;
use ujb_types::events::EventType;
use ujb_types::referral::{DealStatus, Party, Referral, ReferralCounters};
use ujb_types::Amount;

use super::{now, parse, to_result};
use crate::rpc::RpcError;
use crate::DaemonState;

type Result = std::result::Result<Value, RpcError>;

#[derive(Debug, Deserialize)]
struct UpsertReferralParams {
    referral_id: String,
    orbiter: Party,
    cosmo: Party,
    #[serde(default)]
    orbiter_mentor: Option<Party>,
    #[serde(default)]
    cosmo_mentor: Option<Party>,
    #[serde(default)]
    commission: Option<CommissionTerms>,
    #[serde(default)]
    agreed_amount: Option<Amount>,
    #[serde(default)]
    status_history: Vec<DealStatus>,
}

#[derive(Debug, Deserialize)]
struct ReferralIdParams {
    referral_id: String,
}

#[derive(Debug, Deserialize)]
struct ListParams {
    #[serde(default = "default_limit")]
    limit: u32,
}

fn default_limit() -> u32 {
    100
}

#[derive(Debug, Deserialize)]
struct DealStatusParams {
    referral_id: String,
    status: DealStatus,
}

#[derive(Debug, Deserialize)]
struct AgreedAmountParams {
    referral_id: String,
    agreed_amount: Amount,
}

/// Create a referral or replace its terms.
///
/// A commission configuration is validated here, so a malformed slab table
/// never reaches the ledger. An existing referral keeps its status history.
pub async fn upsert_referral(state: &Arc<DaemonState>, params: &Value) -> Result {
    let params: UpsertReferralParams = parse(params)?;
    if params.referral_id.trim().is_empty() {
        return Err(RpcError::invalid_params("referral_id required"));
    }
    if let Some(terms) = &params.commission {
        ujb_commission::validate_terms(terms).map_err(LedgerError::from)?;
    }

    let referral = Referral {
        referral_id: params.referral_id,
        orbiter: params.orbiter,
        cosmo: params.cosmo,
        orbiter_mentor: params.orbiter_mentor,
        cosmo_mentor: params.cosmo_mentor,
        commission: params.commission,
        agreed_amount: params.agreed_amount,
        status_history: params.status_history,
        counters: ReferralCounters::default(),
        revision: 0,
    };

    let mut db = state.db.lock().await;
    let tx = ujb_db::begin_write(&mut db)?;
    let stored = referrals::upsert_terms(&tx, &referral, now())?;
    tx.commit().map_err(LedgerError::from)?;

    tracing::info!(referral_id = %stored.referral_id, revision = stored.revision, "referral upserted");
    state.event_bus.publish(
        EventType::ReferralUpserted,
        serde_json::json!({"referral_id": stored.referral_id, "revision": stored.revision}),
    );
    to_result(&stored)
}

pub async fn get_referral(state: &Arc<DaemonState>, params: &Value) -> Result {
    let params: ReferralIdParams = parse(params)?;
    let db = state.db.lock().await;
    let referral = referrals::get(&db, &params.referral_id)?;
    to_result(&referral)
}

/// Most recently updated referrals.
pub async fn list_referrals(state: &Arc<DaemonState>, params: &Value) -> Result {
    let params: ListParams = parse(params)?;
    let db = state.db.lock().await;
    let list = referrals::list(&db, params.limit)?;
    to_result(&list)
}

/// Append a status to the referral's history.
pub async fn update_deal_status(state: &Arc<DaemonState>, params: &Value) -> Result {
    let params: DealStatusParams = parse(params)?;

    let mut db = state.db.lock().await;
    let tx = ujb_db::begin_write(&mut db)?;
    let referral = referrals::push_status(&tx, &params.referral_id, params.status, now())?;
    tx.commit().map_err(LedgerError::from)?;

    tracing::info!(referral_id = %referral.referral_id, status = %params.status, "deal status changed");
    state.event_bus.publish(
        EventType::DealStatusChanged,
        serde_json::json!({
            "referral_id": referral.referral_id,
            "status": params.status,
            "deal_ever_won": referral.deal_ever_won(),
        }),
    );
    to_result(&referral)
}

/// Set the negotiated deal value.
pub async fn set_agreed_amount(state: &Arc<DaemonState>, params: &Value) -> Result {
    let params: AgreedAmountParams = parse(params)?;

    let mut db = state.db.lock().await;
    let tx = ujb_db::begin_write(&mut db)?;
    let referral = referrals::set_agreed_amount(&tx, &params.referral_id, params.agreed_amount, now())?;
    tx.commit().map_err(LedgerError::from)?;

    tracing::info!(
        referral_id = %referral.referral_id,
        agreed_amount = params.agreed_amount,
        "agreed amount set"
    );
    state.event_bus.publish(
        EventType::ReferralUpserted,
        serde_json::json!({"referral_id": referral.referral_id, "revision": referral.revision}),
    );
    to_result(&referral)
}
