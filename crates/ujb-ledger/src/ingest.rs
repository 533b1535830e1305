//! Planning a client payment against a referral.
//!
//! [`plan_payment`] is pure: it checks the referral can take the payment,
//! resolves the commission, and returns the Payment to append together with
//! the referral counters as they must read afterwards.

use serde::{Deserialize, Serialize};
use ujb_commission::{ResolveInput, SlabPortion};
use ujb_types::ledger::Payment;
use ujb_types::referral::{Referral, ReferralCounters};
use ujb_types::{Amount, PaymentId, ReferralId};

use crate::fold::LedgerState;
use crate::{checked_add, LedgerError, Result};

/// A manually confirmed receipt from the Cosmo.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentRequest {
    pub referral_id: ReferralId,
    pub amount_received: Amount,
    /// Unix timestamp (seconds).
    pub payment_date: u64,
    pub payment_from: String,
    /// Reject if the referral has moved past this revision.
    #[serde(default)]
    pub expected_revision: Option<u64>,
}

/// A payment ready to append.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PlannedPayment {
    pub payment: Payment,
    pub counters: ReferralCounters,
    pub agreed_remaining: Amount,
    pub portions: Vec<SlabPortion>,
}

/// Plan a payment on `referral`, whose ledger folds to `state`.
///
/// # Errors
///
/// - [`LedgerError::ZeroAmount`] if nothing was received
/// - [`LedgerError::MissingCommission`] / [`LedgerError::Commission`] on bad config
/// - [`LedgerError::DealNotWon`] if the deal was never won
/// - [`LedgerError::AgreedAmountMissing`] if no deal value was agreed
/// - [`LedgerError::Overpayment`] if the payment exceeds the agreed remaining
pub fn plan_payment(
    referral: &Referral,
    state: &LedgerState,
    request: &PaymentRequest,
    payment_id: PaymentId,
) -> Result<PlannedPayment> {
    if request.amount_received == 0 {
        return Err(LedgerError::ZeroAmount);
    }

    let terms = referral
        .commission
        .as_ref()
        .ok_or_else(|| LedgerError::MissingCommission(referral.referral_id.clone()))?;
    ujb_commission::validate_terms(terms)?;

    if !referral.deal_ever_won() {
        return Err(LedgerError::DealNotWon(referral.referral_id.clone()));
    }

    if referral.agreed_amount.is_none() {
        return Err(LedgerError::AgreedAmountMissing(referral.referral_id.clone()));
    }
    let remaining = referral.agreed_remaining();
    if request.amount_received > remaining {
        return Err(LedgerError::Overpayment {
            amount: request.amount_received,
            remaining,
        });
    }

    let resolution = ujb_commission::resolve(
        terms,
        ResolveInput {
            value_before: referral.counters.cosmo_paid,
            increment: request.amount_received,
            commission_before: state.commission_charged,
        },
    )?;

    let payment = Payment {
        payment_id,
        referral_id: referral.referral_id.clone(),
        amount_received: request.amount_received,
        payment_date: request.payment_date,
        payment_from: request.payment_from.clone(),
        commission: resolution.commission,
        distribution: resolution.distribution,
    };

    let counters = ReferralCounters {
        cosmo_paid: checked_add(referral.counters.cosmo_paid, request.amount_received)?,
        ujb_balance: checked_add(
            referral.counters.ujb_balance,
            resolution.retained(request.amount_received),
        )?,
        ..referral.counters
    };

    Ok(PlannedPayment {
        agreed_remaining: remaining - request.amount_received,
        payment,
        counters,
        portions: resolution.portions,
    })
}
