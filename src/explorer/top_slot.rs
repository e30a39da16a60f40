use crate::{
    actions::{put_action_to_list, ActionCount, VariableActionContext},
    policy::{PolicyHandle, Ranker},
    Result,
};

use super::{ExplorationStrategy, ExploreDecision, Explorer};

const NAME: &str = "TopSlotExplorer";

/// Explores the first slot of a ranking with a single-action strategy.
///
/// The wrapped strategy sees the ranker's top action as the policy proposal. Whatever action it
/// picks is moved to the front of the ranking; the remaining actions keep the ranker's order. The
/// logged probability is that of the first slot.
///
/// ```
/// # use mwt::{EpsilonGreedy, TopSlotExplorer};
/// let explorer = TopSlotExplorer::<(), _, _>::new(
///     |_: &()| vec![3u32, 1, 2],
///     EpsilonGreedy::new(0.1)?,
///     3,
/// )?;
/// # Ok::<(), mwt::Error>(())
/// ```
pub struct TopSlotExplorer<C: ?Sized, R, S> {
    ranker: PolicyHandle<R>,
    strategy: S,
    num_actions: ActionCount<C>,
}

impl<C: ?Sized, R: Ranker<C>, S: ExplorationStrategy> TopSlotExplorer<C, R, S> {
    /// Explore over a fixed number of actions.
    pub fn new(ranker: R, strategy: S, num_actions: u32) -> Result<Self> {
        Ok(TopSlotExplorer {
            ranker: PolicyHandle::new(ranker),
            strategy,
            num_actions: ActionCount::fixed(NAME, num_actions)?,
        })
    }

    /// Explore over the number of actions reported by each context.
    pub fn with_variable_actions(ranker: R, strategy: S) -> Self
    where
        C: VariableActionContext,
    {
        TopSlotExplorer {
            ranker: PolicyHandle::new(ranker),
            strategy,
            num_actions: ActionCount::variable(),
        }
    }
}

impl<C: ?Sized, R: Ranker<C>, S: ExplorationStrategy> Explorer<C> for TopSlotExplorer<C, R, S> {
    type Action = Vec<u32>;
    type Mapper = R;

    fn name(&self) -> &'static str {
        NAME
    }

    fn num_actions(&self, context: &C) -> Result<u32> {
        self.num_actions.resolve(NAME, context)
    }

    fn choose_action(
        &self,
        seed: u64,
        context: &C,
        num_actions: u32,
    ) -> Result<ExploreDecision<Vec<u32>>> {
        let ranker = self.ranker.snapshot();
        let ranking = ranker.choose_ranking(context);
        // An empty ranking proposes action 0, which the dispatcher rejects along with the ranking.
        let top = ranking.first().copied().unwrap_or(0);

        let decision = self.strategy.explore(seed, num_actions, || top);

        let mut chosen = ranking.clone();
        put_action_to_list(decision.action, &mut chosen);

        Ok(ExploreDecision {
            action: chosen,
            probability: decision.probability,
            should_record: decision.should_record,
            state: decision.state,
            proposed: vec![ranking],
            model_id: ranker.model_id().map(str::to_owned),
        })
    }

    fn policy_handle(&self) -> Option<&PolicyHandle<R>> {
        Some(&self.ranker)
    }

    fn enable_explore(&self, explore: bool) {
        self.strategy.enable_explore(explore);
    }
}
