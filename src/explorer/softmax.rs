use std::sync::atomic::{AtomicBool, Ordering};

use crate::{
    actions::{ActionCount, VariableActionContext},
    policy::{PolicyHandle, Scorer},
    sampler::Prg,
    Error, Result,
};

use super::{
    argmax, checked_scores, representable_pmf, ExploreDecision, Explorer, ExplorerState,
};

const NAME: &str = "SoftmaxExplorer";

/// Softmax exploration over scorer output.
///
/// Action `i` is chosen with probability proportional to `exp(lambda * score[i])`. Large `lambda`
/// approaches greedy selection, zero gives a uniform choice, negative values favor low scores.
/// While exploration is disabled the highest-scoring action is taken with probability 1.
pub struct SoftmaxExplorer<C: ?Sized, S> {
    scorer: PolicyHandle<S>,
    lambda: f32,
    explore: AtomicBool,
    num_actions: ActionCount<C>,
}

impl<C: ?Sized, S: Scorer<C>> SoftmaxExplorer<C, S> {
    /// Explore over a fixed number of actions. `lambda` must be finite.
    pub fn new(scorer: S, lambda: f32, num_actions: u32) -> Result<Self> {
        Self::build(scorer, lambda, ActionCount::fixed(NAME, num_actions)?)
    }

    /// Explore over the number of actions reported by each context.
    pub fn with_variable_actions(scorer: S, lambda: f32) -> Result<Self>
    where
        C: VariableActionContext,
    {
        Self::build(scorer, lambda, ActionCount::variable())
    }

    fn build(scorer: S, lambda: f32, num_actions: ActionCount<C>) -> Result<Self> {
        if !lambda.is_finite() {
            return Err(Error::InvalidParameter {
                component: NAME,
                parameter: "lambda",
                reason: format!("{lambda} is not finite"),
            });
        }
        Ok(SoftmaxExplorer {
            scorer: PolicyHandle::new(scorer),
            lambda,
            explore: AtomicBool::new(true),
            num_actions,
        })
    }
}

/// Turn scores into a normalized distribution. The exponent is shifted by its maximum so the
/// largest weight is exactly 1.
fn softmax(scores: &[f64], lambda: f64) -> Vec<f64> {
    let scaled: Vec<f64> = scores.iter().map(|s| lambda * s).collect();
    let max = scaled.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let weights: Vec<f64> = scaled.iter().map(|s| (s - max).exp()).collect();
    let total: f64 = weights.iter().sum();
    weights.into_iter().map(|w| w / total).collect()
}

impl<C: ?Sized, S: Scorer<C>> Explorer<C> for SoftmaxExplorer<C, S> {
    type Action = u32;
    type Mapper = S;

    fn name(&self) -> &'static str {
        NAME
    }

    fn num_actions(&self, context: &C) -> Result<u32> {
        self.num_actions.resolve(NAME, context)
    }

    fn choose_action(&self, seed: u64, context: &C, num_actions: u32) -> Result<ExploreDecision<u32>> {
        let scorer = self.scorer.snapshot();
        let scores = checked_scores(NAME, &scorer.score_actions(context), num_actions)?;

        let (index, probability) = if self.explore.load(Ordering::Relaxed) {
            let pmf = representable_pmf(softmax(&scores, f64::from(self.lambda)));
            let index = Prg::new(seed)
                .sample_pmf(&pmf)
                .ok_or(Error::InvalidScores {
                    component: NAME,
                    reason: "no action has positive probability",
                })?;
            (index, pmf[index])
        } else {
            (argmax(&scores), 1.0)
        };

        Ok(ExploreDecision {
            // index < num_actions, which is a u32.
            action: index as u32 + 1,
            probability: probability as f32,
            should_record: true,
            state: ExplorerState::Softmax {
                lambda: self.lambda,
            },
            proposed: Vec::new(),
            model_id: scorer.model_id().map(str::to_owned),
        })
    }

    fn policy_handle(&self) -> Option<&PolicyHandle<S>> {
        Some(&self.scorer)
    }

    fn enable_explore(&self, explore: bool) {
        self.explore.store(explore, Ordering::Relaxed);
    }
}
