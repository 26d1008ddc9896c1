//! Economy ledger: resources, base health and per-participant scores.

use lane_defence_core::{LedgerSnapshot, MatchRules, ParticipantId};

#[derive(Debug)]
pub(crate) struct Ledger {
    state: LedgerSnapshot,
}

impl Ledger {
    pub(crate) fn from_rules(rules: &MatchRules) -> Self {
        Self {
            state: LedgerSnapshot {
                resources: rules.starting_resources,
                base_health: rules.base_health,
                scores: Default::default(),
            },
        }
    }

    pub(crate) fn snapshot(&self) -> &LedgerSnapshot {
        &self.state
    }

    pub(crate) fn resources(&self) -> u64 {
        self.state.resources
    }

    /// Debits `amount` if the ledger can cover it. Returns whether the debit happened.
    pub(crate) fn try_debit(&mut self, amount: u64) -> bool {
        match self.state.resources.checked_sub(amount) {
            Some(remaining) => {
                self.state.resources = remaining;
                true
            }
            None => false,
        }
    }

    pub(crate) fn credit(&mut self, amount: u64) {
        self.state.resources = self.state.resources.saturating_add(amount);
    }

    /// Adds `value` to the participant's score.
    pub(crate) fn award(&mut self, participant: &ParticipantId, value: u64) {
        let score = self.state.scores.entry(participant.clone()).or_insert(0);
        *score = score.saturating_add(value);
    }

    /// Removes `amount` base health, saturating at zero. Returns the remaining health.
    pub(crate) fn damage_base(&mut self, amount: u32) -> u32 {
        self.state.base_health = self.state.base_health.saturating_sub(amount);
        self.state.base_health
    }

    pub(crate) fn replace(&mut self, state: LedgerSnapshot) {
        self.state = state;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn debit_refuses_overdraft() {
        let mut ledger = Ledger::from_rules(&MatchRules::default());

        assert!(ledger.try_debit(75));
        assert!(!ledger.try_debit(26));
        assert_eq!(ledger.resources(), 25);
        assert!(ledger.try_debit(25));
        assert_eq!(ledger.resources(), 0);
    }

    #[test]
    fn base_damage_saturates_at_zero() {
        let mut ledger = Ledger::from_rules(&MatchRules {
            base_health: 2,
            ..MatchRules::default()
        });

        assert_eq!(ledger.damage_base(1), 1);
        assert_eq!(ledger.damage_base(5), 0);
    }

    #[test]
    fn awards_accumulate_per_participant() {
        let mut ledger = Ledger::from_rules(&MatchRules::default());
        let ana = ParticipantId::new("ana");
        let bo = ParticipantId::new("bo");

        ledger.award(&ana, 10);
        ledger.award(&ana, 15);
        ledger.award(&bo, 25);

        assert_eq!(ledger.snapshot().scores.get(&ana), Some(&25));
        assert_eq!(ledger.snapshot().scores.get(&bo), Some(&25));
    }
}
