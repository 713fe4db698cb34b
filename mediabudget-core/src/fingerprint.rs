//! Result fingerprinting — a stable digest of a snapshot's derived figures.
//!
//! Two calculations that produce the same media, client, fee, volume, bonus
//! and reference figures share a fingerprint, regardless of trailing zeros in
//! the decimal representation. Used to detect no-op recalculations and to
//! verify persisted snapshots.

use rust_decimal::Decimal;
use serde_json::json;

use crate::domain::BudgetSnapshot;

fn canon(value: Decimal) -> String {
    value.normalize().to_string()
}

/// BLAKE3 hex digest over the derived fields of a snapshot.
pub fn derived_fingerprint(snapshot: &BudgetSnapshot) -> String {
    let fees: Vec<String> = snapshot.fees.iter().map(|slot| canon(slot.computed_value)).collect();
    let reference = snapshot.reference_totals.as_ref().map(|r| {
        json!({
            "client_budget": canon(r.client_budget),
            "fees_total": canon(r.fees_total),
            "media_budget": canon(r.media_budget),
        })
    });

    // json! objects are BTreeMap-backed, so keys serialize sorted
    let canonical = json!({
        "bonus_value": canon(snapshot.bonus_value),
        "client_budget": canon(snapshot.client_budget),
        "currency_rate": canon(snapshot.currency_rate),
        "fees": fees,
        "media_budget": canon(snapshot.media_budget),
        "reference_currency": snapshot.reference_currency.as_str(),
        "reference_totals": reference,
        "unit_volume": canon(snapshot.unit_volume),
    });

    blake3::hash(canonical.to_string().as_bytes()).to_hex().to_string()
}
