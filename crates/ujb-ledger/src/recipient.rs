//! Resolving the member behind a payout slot.

use ujb_types::ledger::{Recipient, Slot};
use ujb_types::referral::{Party, Referral};

/// Recipient for `slot` on `referral`.
///
/// A slot with no member on file (typically a missing mentor) resolves to the
/// platform itself under `platform_label`, with no adjustment key.
pub fn resolve(referral: &Referral, slot: Slot, platform_label: &str) -> Recipient {
    let party = match slot {
        Slot::Orbiter => Some(&referral.orbiter),
        Slot::OrbiterMentor => referral.orbiter_mentor.as_ref(),
        Slot::CosmoMentor => referral.cosmo_mentor.as_ref(),
    };

    match party {
        Some(Party { name, ujb_code }) if !name.trim().is_empty() => Recipient {
            name: name.clone(),
            key: ujb_code.clone(),
        },
        _ => {
            tracing::debug!(
                referral_id = %referral.referral_id,
                %slot,
                "no member on file, falling back to platform"
            );
            Recipient {
                name: platform_label.to_string(),
                key: None,
            }
        }
    }
}
