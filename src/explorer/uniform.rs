use crate::{
    actions::{ActionCount, VariableActionContext},
    policy::PolicyHandle,
    sampler::Prg,
    Result,
};

use super::{ExploreDecision, Explorer, ExplorerState};

const NAME: &str = "UniformExplorer";

/// Picks every action with equal probability. Uses no policy.
pub struct UniformExplorer<C: ?Sized> {
    num_actions: ActionCount<C>,
}

impl<C: ?Sized> UniformExplorer<C> {
    /// Explore over a fixed number of actions.
    pub fn new(num_actions: u32) -> Result<Self> {
        Ok(UniformExplorer {
            num_actions: ActionCount::fixed(NAME, num_actions)?,
        })
    }

    /// Explore over the number of actions reported by each context.
    pub fn with_variable_actions() -> Self
    where
        C: VariableActionContext,
    {
        UniformExplorer {
            num_actions: ActionCount::variable(),
        }
    }
}

impl<C: ?Sized> Explorer<C> for UniformExplorer<C> {
    type Action = u32;
    type Mapper = ();

    fn name(&self) -> &'static str {
        NAME
    }

    fn num_actions(&self, context: &C) -> Result<u32> {
        self.num_actions.resolve(NAME, context)
    }

    fn choose_action(&self, seed: u64, _context: &C, num_actions: u32) -> Result<ExploreDecision<u32>> {
        Ok(ExploreDecision {
            action: Prg::new(seed).uniform_int(1, num_actions),
            probability: (1.0 / f64::from(num_actions)) as f32,
            should_record: true,
            state: ExplorerState::Uniform,
            proposed: Vec::new(),
            model_id: None,
        })
    }

    fn policy_handle(&self) -> Option<&PolicyHandle<()>> {
        None
    }

    // Nothing to fall back on.
    fn enable_explore(&self, _explore: bool) {}
}
