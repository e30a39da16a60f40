use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};

use crate::{
    actions::{ActionCount, VariableActionContext},
    policy::{Policy, PolicyHandle},
    sampler::Prg,
    Result,
};

use super::{ExplorationStrategy, ExploreDecision, Explorer, ExplorerState};

const NAME: &str = "TauFirstExplorer";

/// Tau-first strategy: the first `tau` decisions are uniformly random, every later decision takes
/// the policy's action.
///
/// The budget is shared by all decisions made through one instance and is consumed atomically:
/// under any interleaving of concurrent calls exactly `tau` decisions explore. Exploiting
/// decisions are not recorded since they carry no information about alternatives.
#[derive(Debug)]
pub struct TauFirst {
    tau: AtomicU32,
    explore: AtomicBool,
}

impl TauFirst {
    /// Create the strategy with an exploration budget of `tau` decisions.
    pub fn new(tau: u32) -> TauFirst {
        TauFirst {
            tau: AtomicU32::new(tau),
            explore: AtomicBool::new(true),
        }
    }

    /// Exploration budget left.
    pub fn remaining(&self) -> u32 {
        self.tau.load(Ordering::Acquire)
    }

    /// Take one unit of the budget. Returns the budget left afterwards, or `None` if it was
    /// already exhausted.
    fn try_consume(&self) -> Option<u32> {
        self.tau
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |tau| tau.checked_sub(1))
            .ok()
            .map(|previous| previous - 1)
    }
}

impl ExplorationStrategy for TauFirst {
    fn name(&self) -> &'static str {
        NAME
    }

    fn explore(
        &self,
        seed: u64,
        num_actions: u32,
        policy_action: impl FnOnce() -> u32,
    ) -> ExploreDecision<u32> {
        // Disabled exploration must not eat into the budget.
        let remaining = if self.explore.load(Ordering::Relaxed) {
            self.try_consume()
        } else {
            None
        };

        match remaining {
            Some(remaining) => ExploreDecision {
                action: Prg::new(seed).uniform_int(1, num_actions),
                probability: (1.0 / f64::from(num_actions)) as f32,
                should_record: true,
                state: ExplorerState::TauFirst {
                    is_explore: true,
                    remaining,
                },
                proposed: Vec::new(),
                model_id: None,
            },
            None => {
                let action = policy_action();
                ExploreDecision {
                    action,
                    probability: 1.0,
                    should_record: false,
                    state: ExplorerState::TauFirst {
                        is_explore: false,
                        remaining: self.remaining(),
                    },
                    proposed: vec![action],
                    model_id: None,
                }
            }
        }
    }

    fn enable_explore(&self, explore: bool) {
        self.explore.store(explore, Ordering::Relaxed);
    }
}

/// Tau-first exploration in front of a [`Policy`].
pub struct TauFirstExplorer<C: ?Sized, P> {
    policy: PolicyHandle<P>,
    strategy: TauFirst,
    num_actions: ActionCount<C>,
}

impl<C: ?Sized, P: Policy<C>> TauFirstExplorer<C, P> {
    /// Explore over a fixed number of actions.
    pub fn new(policy: P, tau: u32, num_actions: u32) -> Result<Self> {
        Ok(TauFirstExplorer {
            policy: PolicyHandle::new(policy),
            strategy: TauFirst::new(tau),
            num_actions: ActionCount::fixed(NAME, num_actions)?,
        })
    }

    /// Explore over the number of actions reported by each context.
    pub fn with_variable_actions(policy: P, tau: u32) -> Self
    where
        C: VariableActionContext,
    {
        TauFirstExplorer {
            policy: PolicyHandle::new(policy),
            strategy: TauFirst::new(tau),
            num_actions: ActionCount::variable(),
        }
    }

    /// Exploration budget left.
    pub fn remaining(&self) -> u32 {
        self.strategy.remaining()
    }
}

impl<C: ?Sized, P: Policy<C>> Explorer<C> for TauFirstExplorer<C, P> {
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
