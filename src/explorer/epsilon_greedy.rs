use std::sync::atomic::{AtomicBool, Ordering};

use crate::{
    actions::{ActionCount, VariableActionContext},
    policy::{Policy, PolicyHandle},
    sampler::Prg,
    Error, Result,
};

use super::{ExplorationStrategy, ExploreDecision, Explorer, ExplorerState};

const NAME: &str = "EpsilonGreedyExplorer";

/// Epsilon-greedy strategy: with probability `epsilon` pick an action uniformly at random,
/// otherwise take the policy's action.
#[derive(Debug)]
pub struct EpsilonGreedy {
    epsilon: f32,
    explore: AtomicBool,
}

impl EpsilonGreedy {
    /// Create the strategy. `epsilon` must lie in `[0, 1]`.
    pub fn new(epsilon: f32) -> Result<EpsilonGreedy> {
        if !(0.0..=1.0).contains(&epsilon) {
            return Err(Error::InvalidParameter {
                component: NAME,
                parameter: "epsilon",
                reason: format!("{epsilon} is not within [0, 1]"),
            });
        }
        Ok(EpsilonGreedy {
            epsilon,
            explore: AtomicBool::new(true),
        })
    }

    /// Configured epsilon.
    pub fn epsilon(&self) -> f32 {
        self.epsilon
    }
}

impl ExplorationStrategy for EpsilonGreedy {
    fn name(&self) -> &'static str {
        NAME
    }

    fn explore(
        &self,
        seed: u64,
        num_actions: u32,
        policy_action: impl FnOnce() -> u32,
    ) -> ExploreDecision<u32> {
        let policy_action = policy_action();

        let mut epsilon = if self.explore.load(Ordering::Relaxed) {
            self.epsilon
        } else {
            0.0
        };
        if (f64::from(epsilon) / f64::from(num_actions)) as f32 == 0.0 {
            // An exploratory pick would be recorded with probability 0.
            epsilon = 0.0;
        }
        let eps = f64::from(epsilon);
        let base_probability = eps / f64::from(num_actions);

        let mut random = Prg::new(seed);
        let (action, probability, is_explore) = if random.uniform_unit_interval() < eps {
            let action = random.uniform_int(1, num_actions);
            let probability = if action == policy_action {
                (1.0 - eps) + base_probability
            } else {
                base_probability
            };
            (action, probability, true)
        } else {
            (policy_action, (1.0 - eps) + base_probability, false)
        };

        ExploreDecision {
            action,
            probability: probability as f32,
            should_record: true,
            state: ExplorerState::EpsilonGreedy {
                epsilon,
                is_explore,
            },
            proposed: vec![policy_action],
            model_id: None,
        }
    }

    fn enable_explore(&self, explore: bool) {
        self.explore.store(explore, Ordering::Relaxed);
    }
}

/// Epsilon-greedy exploration around a [`Policy`].
pub struct EpsilonGreedyExplorer<C: ?Sized, P> {
    policy: PolicyHandle<P>,
    strategy: EpsilonGreedy,
    num_actions: ActionCount<C>,
}

impl<C: ?Sized, P: Policy<C>> EpsilonGreedyExplorer<C, P> {
    /// Explore over a fixed number of actions.
    pub fn new(policy: P, epsilon: f32, num_actions: u32) -> Result<Self> {
        Ok(EpsilonGreedyExplorer {
            policy: PolicyHandle::new(policy),
            strategy: EpsilonGreedy::new(epsilon)?,
            num_actions: ActionCount::fixed(NAME, num_actions)?,
        })
    }

    /// Explore over the number of actions reported by each context.
    pub fn with_variable_actions(policy: P, epsilon: f32) -> Result<Self>
    where
        C: VariableActionContext,
    {
        Ok(EpsilonGreedyExplorer {
            policy: PolicyHandle::new(policy),
            strategy: EpsilonGreedy::new(epsilon)?,
            num_actions: ActionCount::variable(),
        })
    }
}

impl<C: ?Sized, P: Policy<C>> Explorer<C> for EpsilonGreedyExplorer<C, P> {
    type Action = u32;
    type Mapper = P;

    fn name(&self) -> &'static str {
        NAME
    }

    fn num_actions(&self, context: &C) -> Result<u32> {
        self.num_actions.resolve(NAME, context)
    }

    fn choose_action(&self, seed: u64, context: &C, num_actions: u32) -> Result<ExploreDecision<u32>> {
        let policy = self.policy.snapshot();
        let mut decision = self
            .strategy
            .explore(seed, num_actions, || policy.choose_action(context));
        decision.model_id = policy.model_id().map(str::to_owned);
        Ok(decision)
    }

    fn policy_handle(&self) -> Option<&PolicyHandle<P>> {
        Some(&self.policy)
    }

    fn enable_explore(&self, explore: bool) {
        self.strategy.enable_explore(explore);
    }
}
