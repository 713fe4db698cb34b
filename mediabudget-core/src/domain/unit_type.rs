use serde::{Deserialize, Serialize};

use super::ids::UnitTypeId;

/// How a unit price is denominated.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PricingBasis {
    /// Price is per single unit (clicks, spots, insertions).
    #[default]
    PerUnit,
    /// Price is per thousand units (CPM, impressions).
    PerMille,
}

impl PricingBasis {
    /// Units bought per price unit: 1 for per-unit, 1000 for per-mille.
    pub fn multiplier(self) -> u32 {
        match self {
            Self::PerUnit => 1,
            Self::PerMille => 1000,
        }
    }
}

/// Entry of the unit type catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitType {
    pub id: UnitTypeId,
    pub label: String,
    #[serde(default)]
    pub pricing: PricingBasis,
}

impl UnitType {
    pub fn new(id: impl Into<String>, label: impl Into<String>, pricing: PricingBasis) -> Self {
        Self { id: UnitTypeId::new(id), label: label.into(), pricing }
    }

    /// Convenience constructor for impression-based (CPM) units.
    pub fn per_mille(id: impl Into<String>, label: impl Into<String>) -> Self {
        Self::new(id, label, PricingBasis::PerMille)
    }

    /// Convenience constructor for per-unit priced units.
    pub fn per_unit(id: impl Into<String>, label: impl Into<String>) -> Self {
        Self::new(id, label, PricingBasis::PerUnit)
    }
}

/// Look up a unit type by id.
pub fn find_unit_type<'a>(catalog: &'a [UnitType], id: &UnitTypeId) -> Option<&'a UnitType> {
    catalog.iter().find(|u| &u.id == id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn per_mille_multiplier_is_thousand() {
        assert_eq!(PricingBasis::PerMille.multiplier(), 1000);
        assert_eq!(PricingBasis::PerUnit.multiplier(), 1);
    }

    #[test]
    fn lookup_by_id() {
        let catalog = vec![UnitType::per_mille("cpm", "Impressions"), UnitType::per_unit("cpc", "Clicks")];
        let found = find_unit_type(&catalog, &UnitTypeId::new("cpc")).unwrap();
        assert_eq!(found.pricing, PricingBasis::PerUnit);
        assert!(find_unit_type(&catalog, &UnitTypeId::new("cpv")).is_none());
    }

    #[test]
    fn pricing_defaults_to_per_unit_when_omitted() {
        let unit: UnitType = serde_json::from_str(r#"{"id":"spot","label":"Spot"}"#).unwrap();
        assert_eq!(unit.pricing, PricingBasis::PerUnit);
    }
}
