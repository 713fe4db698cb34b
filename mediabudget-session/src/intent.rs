//! User intent tracking for fee slots and the bonus toggle.
//!
//! A fee the user switched on can lose its selection without the user asking
//! for it: a stored snapshot that dropped zero-valued fees, or an import that
//! only kept priced slots. The tracker remembers what the user wanted and
//! restores it before the next calculation.

use serde::{Deserialize, Serialize};

use mediabudget_core::domain::{BudgetSnapshot, FeeSelection, FEE_SLOT_COUNT};

/// Something `reconcile` put back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Restored {
    /// Slot re-activated as `ActiveUnselected` (0-based index).
    FeeSlot { slot: usize },
    /// Bonus switched back on.
    Bonus,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntentTracker {
    fees: [bool; FEE_SLOT_COUNT],
    bonus: bool,
}

impl IntentTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Tracker seeded from the selections currently on a snapshot.
    pub fn from_snapshot(snapshot: &BudgetSnapshot) -> Self {
        let mut tracker = Self::new();
        tracker.observe(snapshot);
        tracker
    }

    /// Record active slots and the bonus toggle as intended.
    ///
    /// Observation only adds intent; switching something off goes through
    /// `set_fee` / `set_bonus`.
    pub fn observe(&mut self, snapshot: &BudgetSnapshot) {
        for (intent, slot) in self.fees.iter_mut().zip(snapshot.fees.iter()) {
            *intent |= slot.selection.is_active();
        }
        self.bonus |= snapshot.bonus_active;
    }

    /// Explicit user toggle for one slot. Out-of-range slots are ignored.
    pub fn set_fee(&mut self, slot: usize, active: bool) {
        if let Some(intent) = self.fees.get_mut(slot) {
            *intent = active;
        }
    }

    pub fn set_bonus(&mut self, active: bool) {
        self.bonus = active;
    }

    pub fn fee_intended(&self, slot: usize) -> bool {
        self.fees.get(slot).copied().unwrap_or(false)
    }

    pub fn bonus_intended(&self) -> bool {
        self.bonus
    }

    /// Restore intended state the snapshot lost. Returns what was restored.
    pub fn reconcile(&self, snapshot: &mut BudgetSnapshot) -> Vec<Restored> {
        let mut restored = Vec::new();
        for (slot, (intent, fee)) in self.fees.iter().zip(snapshot.fees.iter_mut()).enumerate() {
            if *intent && !fee.selection.is_active() {
                fee.selection = FeeSelection::ActiveUnselected;
                restored.push(Restored::FeeSlot { slot });
            }
        }
        if self.bonus && !snapshot.bonus_active {
            snapshot.bonus_active = true;
            restored.push(Restored::Bonus);
        }
        restored
    }

    /// Slots the user wants active whose computed value is currently zero.
    pub fn pending_fees(&self, snapshot: &BudgetSnapshot) -> Vec<usize> {
        self.fees
            .iter()
            .zip(snapshot.fees.iter())
            .enumerate()
            .filter(|(_, (intent, fee))| **intent && fee.computed_value.is_zero())
            .map(|(slot, _)| slot)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn observe_only_adds_intent() {
        let mut tracker = IntentTracker::new();
        tracker.observe(&BudgetSnapshot::new("EUR").with_fee(1, FeeSelection::selected("std")));
        tracker.observe(&BudgetSnapshot::new("EUR"));
        assert!(tracker.fee_intended(1));
        assert!(!tracker.fee_intended(0));
    }

    #[test]
    fn reconcile_restores_lost_slots_and_bonus() {
        let source = BudgetSnapshot::new("EUR")
            .with_fee(0, FeeSelection::selected("std"))
            .with_fee(3, FeeSelection::ActiveUnselected)
            .with_bonus(dec!(0));
        let tracker = IntentTracker::from_snapshot(&source);

        // Persisted form dropped zero-valued state.
        let mut stored = BudgetSnapshot::new("EUR").with_fee(0, FeeSelection::selected("std"));
        let restored = tracker.reconcile(&mut stored);

        assert_eq!(restored, vec![Restored::FeeSlot { slot: 3 }, Restored::Bonus]);
        assert_eq!(stored.fees[3].selection, FeeSelection::ActiveUnselected);
        assert_eq!(stored.fees[0].selection, FeeSelection::selected("std"));
        assert!(stored.bonus_active);
    }

    #[test]
    fn explicit_off_is_not_restored() {
        let mut tracker =
            IntentTracker::from_snapshot(&BudgetSnapshot::new("EUR").with_fee(2, FeeSelection::ActiveUnselected));
        tracker.set_fee(2, false);
        let mut snap = BudgetSnapshot::new("EUR");
        assert!(tracker.reconcile(&mut snap).is_empty());
        assert!(!snap.fees[2].selection.is_active());
    }

    #[test]
    fn pending_fees_are_intended_and_zero() {
        let mut snap = BudgetSnapshot::new("EUR")
            .with_fee(0, FeeSelection::selected("std"))
            .with_fee(1, FeeSelection::selected("cpm"));
        snap.fees[0].computed_value = dec!(100);
        let tracker = IntentTracker::from_snapshot(&snap);
        assert_eq!(tracker.pending_fees(&snap), vec![1]);
    }

    #[test]
    fn out_of_range_slot_is_ignored() {
        let mut tracker = IntentTracker::new();
        tracker.set_fee(FEE_SLOT_COUNT, true);
        assert!(!tracker.fee_intended(FEE_SLOT_COUNT));
    }
}
