use std::sync::atomic::{AtomicBool, Ordering};

use crate::{
    actions::{ActionCount, VariableActionContext},
    policy::{Policy, PolicyHandle},
    sampler::Prg,
    Error, Result,
};

use super::{ExploreDecision, Explorer, ExplorerState};

const NAME: &str = "BootstrapExplorer";

/// Bootstrap (bagging) exploration over an ensemble of policies.
///
/// Every bag proposes an action for the context; one bag is drawn uniformly and its proposal is
/// taken. The logged probability is the share of bags that agree with the chosen action.
///
/// The ensemble is swapped as a whole: [`Explorer::Mapper`] is `Vec<P>`, and each decision uses a
/// single snapshot of it. An empty replacement is rejected. The decision's model id is the bags'
/// common id, or `None` if they report different ones.
pub struct BootstrapExplorer<C: ?Sized, P> {
    bags: PolicyHandle<Vec<P>>,
    explore: AtomicBool,
    num_actions: ActionCount<C>,
}

impl<C: ?Sized, P: Policy<C>> BootstrapExplorer<C, P> {
    /// Explore over a fixed number of actions. At least one bag is required.
    pub fn new(bags: Vec<P>, num_actions: u32) -> Result<Self> {
        Self::build(bags, ActionCount::fixed(NAME, num_actions)?)
    }

    /// Explore over the number of actions reported by each context.
    pub fn with_variable_actions(bags: Vec<P>) -> Result<Self>
    where
        C: VariableActionContext,
    {
        Self::build(bags, ActionCount::variable())
    }

    fn build(bags: Vec<P>, num_actions: ActionCount<C>) -> Result<Self> {
        bag_count(&bags)?;
        Ok(BootstrapExplorer {
            bags: PolicyHandle::new(bags),
            explore: AtomicBool::new(true),
            num_actions,
        })
    }
}

fn bag_count<P>(bags: &[P]) -> Result<u32> {
    u32::try_from(bags.len())
        .ok()
        .filter(|&n| n > 0)
        .ok_or_else(|| Error::InvalidParameter {
            component: NAME,
            parameter: "bags",
            reason: format!("{} bags given, expected between 1 and {}", bags.len(), u32::MAX),
        })
}

/// Id shared by every bag, if any.
fn common_model_id<C: ?Sized, P: Policy<C>>(bags: &[P]) -> Option<String> {
    let mut ids = bags.iter().map(|bag| bag.model_id());
    let first = ids.next().flatten();
    if ids.all(|id| id == first) {
        first.map(str::to_owned)
    } else {
        None
    }
}

impl<C: ?Sized, P: Policy<C>> Explorer<C> for BootstrapExplorer<C, P> {
    type Action = u32;
    type Mapper = Vec<P>;

    fn name(&self) -> &'static str {
        NAME
    }

    fn num_actions(&self, context: &C) -> Result<u32> {
        self.num_actions.resolve(NAME, context)
    }

    fn choose_action(&self, seed: u64, context: &C, _num_actions: u32) -> Result<ExploreDecision<u32>> {
        let bags = self.bags.snapshot();
        // Empty if an empty ensemble was published straight through the handle.
        let num_bags = bag_count(bags.as_slice())?;
        let bag_actions: Vec<u32> = bags.iter().map(|bag| bag.choose_action(context)).collect();

        let (action, probability) = if self.explore.load(Ordering::Relaxed) {
            let bag = Prg::new(seed).uniform_int(0, num_bags - 1);
            let action = bag_actions[bag as usize];
            let agreeing = bag_actions.iter().filter(|&&a| a == action).count();
            (action, agreeing as f64 / f64::from(num_bags))
        } else {
            (bag_actions[0], 1.0)
        };

        Ok(ExploreDecision {
            action,
            probability: probability as f32,
            should_record: true,
            state: ExplorerState::Bootstrap {
                bag_actions: bag_actions.clone(),
            },
            proposed: bag_actions,
            model_id: common_model_id::<C, P>(bags.as_slice()),
        })
    }

    fn policy_handle(&self) -> Option<&PolicyHandle<Vec<P>>> {
        Some(&self.bags)
    }

    fn check_mapper(&self, bags: &Vec<P>) -> Result<()> {
        bag_count(bags).map(|_| ())
    }

    fn enable_explore(&self, explore: bool) {
        self.explore.store(explore, Ordering::Relaxed);
    }
}
