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

const NAME: &str = "GenericExplorer";

/// Samples an action with probability proportional to the scorer's weights.
///
/// Weights must be non-negative with a positive sum; they do not need to be normalized.
pub struct GenericExplorer<C: ?Sized, S> {
    scorer: PolicyHandle<S>,
    explore: AtomicBool,
    num_actions: ActionCount<C>,
}

impl<C: ?Sized, S: Scorer<C>> GenericExplorer<C, S> {
    /// Explore over a fixed number of actions.
    pub fn new(scorer: S, num_actions: u32) -> Result<Self> {
        Ok(GenericExplorer {
            scorer: PolicyHandle::new(scorer),
            explore: AtomicBool::new(true),
            num_actions: ActionCount::fixed(NAME, num_actions)?,
        })
    }

    /// Explore over the number of actions reported by each context.
    pub fn with_variable_actions(scorer: S) -> Self
    where
        C: VariableActionContext,
    {
        GenericExplorer {
            scorer: PolicyHandle::new(scorer),
            explore: AtomicBool::new(true),
            num_actions: ActionCount::variable(),
        }
    }
}

fn normalize(weights: &[f64]) -> Result<Vec<f64>> {
    if weights.iter().any(|&w| w < 0.0) {
        return Err(Error::InvalidScores {
            component: NAME,
            reason: "weights must not be negative",
        });
    }
    let total: f64 = weights.iter().sum();
    if total <= 0.0 {
        return Err(Error::InvalidScores {
            component: NAME,
            reason: "weights must have a positive sum",
        });
    }
    Ok(weights.iter().map(|w| w / total).collect())
}

impl<C: ?Sized, S: Scorer<C>> Explorer<C> for GenericExplorer<C, S> {
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
        let weights = checked_scores(NAME, &scorer.score_actions(context), num_actions)?;
        let pmf = normalize(&weights)?;

        let (index, probability) = if self.explore.load(Ordering::Relaxed) {
            // The heaviest action holds at least 1/num_actions, so some mass always survives.
            let pmf = representable_pmf(pmf);
            let index = Prg::new(seed).sample_pmf(&pmf).unwrap_or_else(|| argmax(&pmf));
            (index, pmf[index])
        } else {
            (argmax(&pmf), 1.0)
        };

        Ok(ExploreDecision {
            action: index as u32 + 1,
            probability: probability as f32,
            should_record: true,
            state: ExplorerState::Generic,
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

#[cfg(test)]
mod tests {
    use super::GenericExplorer;
    use crate::{explorer::Explorer, sampler::tests::ZERO_DRAW_SEED, Error};

    #[test]
    fn samples_proportionally_to_weights() {
        let explorer =
            GenericExplorer::<(), _>::new(|_: &()| vec![1.0f32, 0.0, 3.0], 3).unwrap();
        let mut counts = [0u32; 3];
        for seed in 0..8_000u64 {
            let decision = explorer
                .choose_action(seed.wrapping_mul(0x9e37_79b9_7f4a_7c15), &(), 3)
                .unwrap();
            let expected = if decision.action == 1 { 0.25 } else { 0.75 };
            assert_eq!(decision.probability, expected);
            counts[decision.action as usize - 1] += 1;
        }
        assert_eq!(counts[1], 0);
        let share = f64::from(counts[0]) / 8_000.0;
        assert!((share - 0.25).abs() < 0.03, "share {share}");
    }

    #[test]
    fn negligible_weight_is_never_chosen() {
        // The first draw is 0.0, which would land on any action with nonzero f64 mass.
        let explorer = GenericExplorer::<(), _>::new(|_: &()| vec![1e-30f32, 1e30], 2).unwrap();
        let decision = explorer.choose_action(ZERO_DRAW_SEED, &(), 2).unwrap();
        assert!(decision.probability > 0.0);
        assert_eq!((decision.action, decision.probability), (2, 1.0));
    }

    #[test]
    fn rejects_invalid_weights() {
        let negative = GenericExplorer::<(), _>::new(|_: &()| vec![1.0f32, -0.5], 2).unwrap();
        assert!(matches!(
            negative.choose_action(1, &(), 2),
            Err(Error::InvalidScores { .. })
        ));

        let zero = GenericExplorer::<(), _>::new(|_: &()| vec![0.0f32, 0.0], 2).unwrap();
        assert!(matches!(
            zero.choose_action(1, &(), 2),
            Err(Error::InvalidScores { .. })
        ));
    }

    #[test]
    fn disabled_exploration_takes_heaviest_action() {
        let explorer =
            GenericExplorer::<(), _>::new(|_: &()| vec![0.2f32, 0.5, 0.3], 3).unwrap();
        explorer.enable_explore(false);
        let decision = explorer.choose_action(9, &(), 3).unwrap();
        assert_eq!((decision.action, decision.probability), (2, 1.0));
    }
}
