//! Poll aggregation.
//!
//! Every eligible user resolves to exactly one effective decision and weighs
//! 1. Counting is by voter, never by chain weight, so a delegate and the
//! users routed through them are each counted once.

use std::collections::BTreeMap;

use agora_core::entities::Poll;
use agora_core::enums::{PollKind, Position};
use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::decision::{DecisionSet, EffectiveDecision, effective_decision};
use crate::error::DemocracyError;
use crate::graph::DelegationGraph;
use crate::resolver::Resolver;

/// Pass rule for adopt and repeal polls.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct TallyPolicy {
    /// `adopt / (adopt + reject)` must exceed this.
    pub required_majority: f64,
    /// `adopt + reject + abstain` must reach this.
    pub min_participation: u32,
}

impl Default for TallyPolicy {
    fn default() -> Self {
        Self {
            required_majority: 0.5,
            min_participation: 0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    Adopted,
    /// Includes ties and missed participation: the status quo stands.
    Rejected,
}

impl Outcome {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Adopted => "adopted",
            Self::Rejected => "rejected",
        }
    }
}

impl std::fmt::Display for Outcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Aggregated result of a poll at one instant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Tally {
    pub poll_id: String,
    pub kind: PollKind,
    pub at: DateTime<Utc>,
    pub eligible: usize,
    pub adopt: usize,
    pub reject: usize,
    pub abstain: usize,
    /// Votes per rating value (rate polls only).
    pub ratings: BTreeMap<i64, usize>,
    /// Eligible users with no effective decision.
    pub undecided: usize,
    /// Effective decisions that came through a delegate.
    pub delegated: usize,
    /// Cycles met while resolving, one path per affected voter. Each such
    /// voter is counted in `abstain`, so cycles add to the participation
    /// that `min_participation` checks.
    pub cycles: Vec<Vec<String>>,
    /// Sum of ratings (rate polls only), saturated at the `i64` bounds.
    pub score: Option<i64>,
    /// Mean of ratings, abstentions excluded (rate polls only).
    pub mean_rating: Option<f64>,
    /// Binary result (adopt and repeal polls only).
    pub outcome: Option<Outcome>,
}

impl Tally {
    fn empty(poll: &Poll, at: DateTime<Utc>, eligible: usize) -> Self {
        Self {
            poll_id: poll.id.clone(),
            kind: poll.kind,
            at,
            eligible,
            adopt: 0,
            reject: 0,
            abstain: 0,
            ratings: BTreeMap::new(),
            undecided: 0,
            delegated: 0,
            cycles: Vec::new(),
            score: None,
            mean_rating: None,
            outcome: None,
        }
    }

    /// Voters with an effective position, abstentions included.
    #[must_use]
    pub fn participation(&self) -> usize {
        self.adopt + self.reject + self.abstain + self.ratings.values().sum::<usize>()
    }

    fn count(&mut self, position: Position) {
        match position {
            Position::Adopt => self.adopt += 1,
            Position::Reject => self.reject += 1,
            Position::Abstain => self.abstain += 1,
            Position::Rating(value) => *self.ratings.entry(value).or_default() += 1,
        }
    }
}

/// Apply the pass rule. Ties are rejected.
#[must_use]
pub fn decide(adopt: usize, reject: usize, participation: usize, policy: &TallyPolicy) -> Outcome {
    let decisive = adopt + reject;
    if decisive == 0 || participation < policy.min_participation as usize {
        return Outcome::Rejected;
    }
    #[allow(clippy::cast_precision_loss)]
    let share = adopt as f64 / decisive as f64;
    if share > policy.required_majority {
        Outcome::Adopted
    } else {
        Outcome::Rejected
    }
}

/// Sum of `value * count`, saturating instead of overflowing.
fn rating_total(ratings: &BTreeMap<i64, usize>) -> i128 {
    ratings.iter().fold(0_i128, |total, (value, n)| {
        let n = i128::try_from(*n).unwrap_or(i128::MAX);
        total.saturating_add(i128::from(*value).saturating_mul(n))
    })
}

/// Count `poll` over `eligible` users.
///
/// `decisions` must be the current decisions at the tally instant and
/// `resolver` must walk a graph snapshot taken at the same instant.
///
/// # Errors
///
/// Returns `DemocracyError::InvalidScope` if the poll scope is unknown.
pub fn tally<G: DelegationGraph>(
    poll: &Poll,
    eligible: &[String],
    resolver: &Resolver<'_, G>,
    decisions: &DecisionSet,
    policy: &TallyPolicy,
    at: DateTime<Utc>,
) -> Result<Tally, DemocracyError> {
    let mut result = Tally::empty(poll, at, eligible.len());

    for user in eligible {
        match effective_decision(resolver, decisions, user, &poll.scope_id)? {
            EffectiveDecision::Own { decision } => result.count(decision.position),
            EffectiveDecision::Delegated { decision, .. } => {
                result.delegated += 1;
                result.count(decision.position);
            }
            EffectiveDecision::Undecided { .. } => result.undecided += 1,
            EffectiveDecision::Cycle { cycle } => {
                result.abstain += 1;
                result.cycles.push(cycle);
            }
        }
    }

    match poll.kind {
        PollKind::Adopt | PollKind::Repeal => {
            result.outcome = Some(decide(
                result.adopt,
                result.reject,
                result.participation(),
                policy,
            ));
        }
        PollKind::Rate { .. } => {
            let votes: usize = result.ratings.values().sum();
            let total = rating_total(&result.ratings);
            result.score = Some(i64::try_from(total).unwrap_or(if total < 0 {
                i64::MIN
            } else {
                i64::MAX
            }));
            #[allow(clippy::cast_precision_loss)]
            let mean = (votes > 0).then(|| total as f64 / votes as f64);
            result.mean_rating = mean;
        }
    }

    if !result.cycles.is_empty() {
        warn!(poll = %poll.id, cycles = result.cycles.len(), "delegation cycles counted as abstentions");
    }
    debug!(
        poll = %poll.id,
        eligible = result.eligible,
        adopt = result.adopt,
        reject = result.reject,
        abstain = result.abstain,
        undecided = result.undecided,
        "tally computed"
    );
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::GraphSnapshot;
    use crate::scope::ScopeTree;
    use agora_core::entities::{Decision, Delegation};
    use chrono::{Duration, TimeZone};
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 9, 1, 0, 0, 0).unwrap()
    }

    fn poll(kind: PollKind) -> Poll {
        Poll {
            id: "pol-1".into(),
            scope_id: "global".into(),
            subject: "Subject".into(),
            kind,
            begin_time: t0(),
            end_time: None,
            delete_time: None,
            created_at: t0(),
        }
    }

    fn vote(user: &str, position: Position) -> Decision {
        Decision {
            id: format!("dec-{user}"),
            user_id: user.into(),
            poll_id: "pol-1".into(),
            position,
            created_at: t0(),
        }
    }

    fn edge(from: &str, to: &str) -> Delegation {
        Delegation {
            id: format!("dlg-{from}-{to}"),
            principal_id: from.into(),
            agent_id: to.into(),
            scope_id: "global".into(),
            created_at: t0(),
            revoke_time: None,
        }
    }

    fn users(names: &[&str]) -> Vec<String> {
        names.iter().map(ToString::to_string).collect()
    }

    fn run(kind: PollKind, edges: Vec<Delegation>, votes: Vec<Decision>, eligible: &[&str]) -> Tally {
        run_with(&TallyPolicy::default(), kind, edges, votes, eligible)
    }

    fn run_with(
        policy: &TallyPolicy,
        kind: PollKind,
        edges: Vec<Delegation>,
        votes: Vec<Decision>,
        eligible: &[&str],
    ) -> Tally {
        let scopes = ScopeTree::new([("global", None::<&str>)]).unwrap();
        let at = t0() + Duration::hours(1);
        let graph = GraphSnapshot::new(edges, at);
        let resolver = Resolver::new(&scopes, &graph);
        let decisions = DecisionSet::new("pol-1", votes, at);
        tally(
            &poll(kind),
            &users(eligible),
            &resolver,
            &decisions,
            policy,
            at,
        )
        .unwrap()
    }

    #[test]
    fn delegator_follows_delegate_without_double_count() {
        let result = run(
            PollKind::Adopt,
            vec![edge("a", "b")],
            vec![vote("b", Position::Adopt)],
            &["a", "b"],
        );
        assert_eq!(result.adopt, 2);
        assert_eq!(result.delegated, 1);
        assert_eq!(result.undecided, 0);
        assert_eq!(result.outcome, Some(Outcome::Adopted));
    }

    #[test]
    fn own_vote_overrides_delegation() {
        let result = run(
            PollKind::Adopt,
            vec![edge("a", "b")],
            vec![vote("a", Position::Reject), vote("b", Position::Adopt)],
            &["a", "b"],
        );
        assert_eq!((result.adopt, result.reject), (1, 1));
        assert_eq!(result.delegated, 0);
    }

    #[test]
    fn tie_is_rejected() {
        let result = run(
            PollKind::Repeal,
            vec![],
            vec![vote("a", Position::Adopt), vote("b", Position::Reject)],
            &["a", "b"],
        );
        assert_eq!(result.outcome, Some(Outcome::Rejected));
    }

    #[test]
    fn cycles_abstain_and_are_listed() {
        let result = run(
            PollKind::Adopt,
            vec![edge("a", "b"), edge("b", "a")],
            vec![vote("c", Position::Adopt)],
            &["a", "b", "c"],
        );
        assert_eq!(result.abstain, 2);
        assert_eq!(result.undecided, 0);
        assert_eq!(result.cycles.len(), 2);
        assert_eq!(result.adopt, 1);
        assert_eq!(result.outcome, Some(Outcome::Adopted));
    }

    #[test]
    fn cycle_abstentions_reach_quorum() {
        let policy = TallyPolicy {
            required_majority: 0.5,
            min_participation: 3,
        };
        let result = run_with(
            &policy,
            PollKind::Adopt,
            vec![edge("a", "b"), edge("b", "a")],
            vec![vote("c", Position::Adopt)],
            &["a", "b", "c"],
        );
        assert_eq!(result.participation(), 3);
        assert_eq!(result.outcome, Some(Outcome::Adopted));
    }

    #[test]
    fn ineligible_voters_do_not_count() {
        let result = run(
            PollKind::Adopt,
            vec![],
            vec![vote("outsider", Position::Reject), vote("a", Position::Adopt)],
            &["a"],
        );
        assert_eq!((result.adopt, result.reject), (1, 0));
        assert_eq!(result.eligible, 1);
    }

    #[test]
    fn rate_poll_reports_score_and_mean() {
        let result = run(
            PollKind::Rate { min: -1, max: 1 },
            vec![edge("d", "a")],
            vec![
                vote("a", Position::Rating(1)),
                vote("b", Position::Rating(-1)),
                vote("c", Position::Rating(1)),
                vote("e", Position::Abstain),
            ],
            &["a", "b", "c", "d", "e", "f"],
        );
        assert_eq!(result.ratings.get(&1), Some(&3));
        assert_eq!(result.ratings.get(&-1), Some(&1));
        assert_eq!(result.score, Some(2));
        assert_eq!(result.mean_rating, Some(0.5));
        assert_eq!(result.abstain, 1);
        assert_eq!(result.undecided, 1);
        assert_eq!(result.outcome, None);
        assert_eq!(result.participation(), 5);
    }

    #[test]
    fn rate_poll_without_votes_has_no_mean() {
        let result = run(PollKind::Rate { min: 1, max: 5 }, vec![], vec![], &["a"]);
        assert_eq!(result.score, Some(0));
        assert_eq!(result.mean_rating, None);
    }

    #[test]
    fn extreme_ratings_saturate_score() {
        let result = run(
            PollKind::Rate { min: 0, max: i64::MAX },
            vec![],
            vec![vote("a", Position::Rating(i64::MAX)), vote("b", Position::Rating(i64::MAX))],
            &["a", "b"],
        );
        assert_eq!(result.score, Some(i64::MAX));
        #[allow(clippy::cast_precision_loss)]
        let expected = i64::MAX as f64;
        assert_eq!(result.mean_rating, Some(expected));

        let result = run(
            PollKind::Rate { min: i64::MIN, max: i64::MAX },
            vec![],
            vec![
                vote("a", Position::Rating(i64::MIN)),
                vote("b", Position::Rating(i64::MIN)),
                vote("c", Position::Rating(i64::MAX)),
            ],
            &["a", "b", "c"],
        );
        assert_eq!(result.score, Some(i64::MIN));
    }

    #[rstest]
    #[case(3, 1, 4, 0.5, 0, Outcome::Adopted)]
    #[case(2, 2, 4, 0.5, 0, Outcome::Rejected)]
    #[case(0, 0, 3, 0.5, 0, Outcome::Rejected)]
    #[case(3, 1, 4, 0.75, 0, Outcome::Rejected)]
    #[case(4, 1, 5, 0.75, 0, Outcome::Adopted)]
    #[case(3, 0, 3, 0.5, 5, Outcome::Rejected)]
    #[case(3, 0, 5, 0.5, 5, Outcome::Adopted)]
    fn pass_rule(
        #[case] adopt: usize,
        #[case] reject: usize,
        #[case] participation: usize,
        #[case] required_majority: f64,
        #[case] min_participation: u32,
        #[case] expected: Outcome,
    ) {
        let policy = TallyPolicy {
            required_majority,
            min_participation,
        };
        assert_eq!(decide(adopt, reject, participation, &policy), expected);
    }
}
