//! Exploration strategies.
//!
//! An [`Explorer`] turns a salted seed and a context into an [`ExploreDecision`]: the chosen
//! action(s), the exact probability with which the strategy's randomization selected it, and
//! whether the decision carries information worth recording.
//!
//! Explorers declare at the type level which mapper they consume through
//! [`Explorer::Mapper`], and at construction whether it can be swapped through
//! [`Explorer::policy_handle`]. The dispatcher uses that declaration instead of probing the
//! explorer's type at runtime.
use serde::{Deserialize, Serialize};

use crate::{actions::ExploreAction, policy::PolicyHandle, Error, Result};

mod bootstrap;
mod epsilon_greedy;
mod generic;
mod softmax;
mod tau_first;
mod top_slot;
mod uniform;

pub use bootstrap::BootstrapExplorer;
pub use epsilon_greedy::{EpsilonGreedy, EpsilonGreedyExplorer};
pub use generic::GenericExplorer;
pub use softmax::SoftmaxExplorer;
pub use tau_first::{TauFirst, TauFirstExplorer};
pub use top_slot::TopSlotExplorer;
pub use uniform::UniformExplorer;

/// Output of a single exploration step.
#[derive(Debug, Clone, PartialEq)]
pub struct ExploreDecision<A> {
    /// Chosen action or ranking.
    pub action: A,
    /// Probability that the strategy chose `action` (the first slot, for rankings).
    pub probability: f32,
    /// Whether the decision should be forwarded to the recorder.
    pub should_record: bool,
    /// Strategy-specific diagnostics.
    pub state: ExplorerState,
    /// Raw outputs of the underlying policies that took part in the decision. The dispatcher
    /// validates them along with `action`.
    pub proposed: Vec<A>,
    /// Identifier of the model snapshot used for the decision, if the mapper reports one.
    pub model_id: Option<String>,
}

/// Strategy-specific diagnostic data logged with every recorded decision.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(
    tag = "explorer",
    rename_all = "camelCase",
    rename_all_fields = "camelCase"
)]
pub enum ExplorerState {
    /// Epsilon-greedy decision.
    EpsilonGreedy {
        /// Effective epsilon. Zero while exploration is disabled, or when an exploratory pick
        /// would have a probability too small to record.
        epsilon: f32,
        /// `true` if the action came from the uniform draw.
        is_explore: bool,
    },
    /// Tau-first decision.
    TauFirst {
        /// `true` while the exploration budget lasts.
        is_explore: bool,
        /// Exploration budget left after this decision.
        remaining: u32,
    },
    /// Bootstrap decision.
    Bootstrap {
        /// Action proposed by every bag, in bag order.
        bag_actions: Vec<u32>,
    },
    /// Softmax decision.
    Softmax {
        /// Inverse temperature applied to the scores.
        lambda: f32,
    },
    /// Decision sampled directly from scorer weights.
    Generic,
    /// Uniformly random decision.
    Uniform,
}

/// A strategy that explores around a single action proposed by a policy.
///
/// [`EpsilonGreedy`] and [`TauFirst`] are strategies; [`EpsilonGreedyExplorer`] and
/// [`TauFirstExplorer`] pair them with a policy, and [`TopSlotExplorer`] pairs them with the top
/// slot of a ranker.
pub trait ExplorationStrategy {
    /// Name used in errors and logs.
    fn name(&self) -> &'static str;

    /// Pick an action among `num_actions`. `policy_action` is invoked at most once, and only if the
    /// strategy needs the policy's proposal.
    fn explore(
        &self,
        seed: u64,
        num_actions: u32,
        policy_action: impl FnOnce() -> u32,
    ) -> ExploreDecision<u32>;

    /// Turn exploration on or off.
    fn enable_explore(&self, explore: bool);
}

/// An exploration algorithm.
pub trait Explorer<C: ?Sized> {
    /// What a decision returns: `u32` for single actions, `Vec<u32>` for rankings.
    type Action: ExploreAction;

    /// The swappable mapper this explorer consumes.
    type Mapper;

    /// Name used in errors and logs.
    fn name(&self) -> &'static str;

    /// Number of actions available for `context`.
    fn num_actions(&self, context: &C) -> Result<u32>;

    /// Make a decision for `context` using the salted `seed`.
    fn choose_action(
        &self,
        seed: u64,
        context: &C,
        num_actions: u32,
    ) -> Result<ExploreDecision<Self::Action>>;

    /// Handle to the swappable mapper, or `None` if this explorer does not support policy
    /// updates.
    fn policy_handle(&self) -> Option<&PolicyHandle<Self::Mapper>>;

    /// Check a replacement mapper before it is published. Accepts everything by default.
    fn check_mapper(&self, _mapper: &Self::Mapper) -> Result<()> {
        Ok(())
    }

    /// Turn exploration on or off. Explorers without a policy to fall back on ignore this.
    fn enable_explore(&self, explore: bool);
}

/// Check that a scorer returned one finite score per action and widen them.
pub(crate) fn checked_scores(
    component: &'static str,
    scores: &[f32],
    num_actions: u32,
) -> Result<Vec<f64>> {
    if scores.len() != num_actions as usize {
        return Err(Error::ScoreCountMismatch {
            component,
            expected: num_actions,
            found: scores.len(),
        });
    }
    if scores.iter().any(|s| !s.is_finite()) {
        return Err(Error::InvalidScores {
            component,
            reason: "scores must be finite",
        });
    }
    Ok(scores.iter().map(|&s| f64::from(s)).collect())
}

/// Zero the mass of actions whose probability narrows to `0.0` as `f32` and renormalize the rest.
///
/// Sampling from the result never yields an action that would be recorded with probability 0.
pub(crate) fn representable_pmf(mut pmf: Vec<f64>) -> Vec<f64> {
    let mut dropped = false;
    for p in pmf.iter_mut() {
        if *p > 0.0 && *p as f32 == 0.0 {
            *p = 0.0;
            dropped = true;
        }
    }
    let total: f64 = pmf.iter().sum();
    if dropped && total > 0.0 {
        for p in pmf.iter_mut() {
            *p /= total;
        }
    }
    pmf
}

/// Index of the highest score, first one on ties.
pub(crate) fn argmax(values: &[f64]) -> usize {
    let mut best = 0;
    for (i, value) in values.iter().enumerate() {
        if *value > values[best] {
            best = i;
        }
    }
    best
}
