//! Action counts and action validation.
//!
//! Actions are 1-based. A single-action decision must lie in `[1, num_actions]`; a ranking must be
//! a permutation of `1..=num_actions`.
use serde::Serialize;

use crate::{error::RankingDefect, Error, Result};

/// Capability of a context type to report how many actions are available for this particular
/// decision.
pub trait VariableActionContext {
    /// Number of actions available for the decision. Must be positive.
    fn number_of_actions(&self) -> u32;
}

impl<T: VariableActionContext + ?Sized> VariableActionContext for &T {
    fn number_of_actions(&self) -> u32 {
        (**self).number_of_actions()
    }
}

/// How an explorer learns the number of actions for a decision.
///
/// A fixed count is validated when the explorer is constructed. A variable count can only be
/// constructed for context types implementing [`VariableActionContext`], so a missing capability
/// is rejected at compile time rather than at the first decision:
///
/// ```compile_fail
/// # use mwt::ActionCount;
/// struct PlainContext;
/// let count = ActionCount::<PlainContext>::variable();
/// ```
pub struct ActionCount<C: ?Sized> {
    source: CountSource<C>,
}

enum CountSource<C: ?Sized> {
    Fixed(u32),
    Variable(fn(&C) -> u32),
}

impl<C: ?Sized> ActionCount<C> {
    /// A count fixed at construction. Fails if `num_actions` is zero.
    pub fn fixed(component: &'static str, num_actions: u32) -> Result<Self> {
        if num_actions == 0 {
            return Err(Error::InvalidNumberOfActions { component });
        }
        Ok(ActionCount {
            source: CountSource::Fixed(num_actions),
        })
    }

    /// A count read from every context at decision time.
    pub fn variable() -> Self
    where
        C: VariableActionContext,
    {
        ActionCount {
            source: CountSource::Variable(<C as VariableActionContext>::number_of_actions),
        }
    }

    /// Returns `true` if the count is read from the context.
    pub fn is_variable(&self) -> bool {
        matches!(self.source, CountSource::Variable(_))
    }

    /// Resolve the number of actions for `context`.
    pub fn resolve(&self, component: &'static str, context: &C) -> Result<u32> {
        let num_actions = match self.source {
            CountSource::Fixed(n) => n,
            CountSource::Variable(get) => get(context),
        };
        if num_actions == 0 {
            return Err(Error::InvalidNumberOfActions { component });
        }
        Ok(num_actions)
    }
}

impl<C: ?Sized> Clone for ActionCount<C> {
    fn clone(&self) -> Self {
        let source = match self.source {
            CountSource::Fixed(n) => CountSource::Fixed(n),
            CountSource::Variable(get) => CountSource::Variable(get),
        };
        ActionCount { source }
    }
}

impl<C: ?Sized> std::fmt::Debug for ActionCount<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.source {
            CountSource::Fixed(n) => write!(f, "ActionCount::Fixed({n})"),
            CountSource::Variable(_) => f.write_str("ActionCount::Variable"),
        }
    }
}

/// A value an explorer can return: a single action or a ranking.
pub trait ExploreAction: Clone + std::fmt::Debug + Serialize {
    /// Check that the value is well-formed for `num_actions` actions.
    fn validate(&self, component: &'static str, num_actions: u32) -> Result<()>;
}

impl ExploreAction for u32 {
    fn validate(&self, component: &'static str, num_actions: u32) -> Result<()> {
        check_range(component, *self, num_actions)
    }
}

impl ExploreAction for Vec<u32> {
    fn validate(&self, component: &'static str, num_actions: u32) -> Result<()> {
        if self.len() != num_actions as usize {
            return Err(Error::MalformedRanking {
                component,
                defect: RankingDefect::Length {
                    expected: num_actions,
                    found: self.len(),
                },
            });
        }

        let mut seen = vec![false; self.len()];
        for &action in self {
            check_range(component, action, num_actions)?;
            let slot = &mut seen[action as usize - 1];
            if *slot {
                return Err(Error::MalformedRanking {
                    component,
                    defect: RankingDefect::Duplicate(action),
                });
            }
            *slot = true;
        }
        // Length matches, every action is in range and none repeats: nothing can be missing.
        Ok(())
    }
}

fn check_range(component: &'static str, action: u32, num_actions: u32) -> Result<()> {
    if action == 0 || action > num_actions {
        return Err(Error::ActionOutOfRange {
            component,
            action,
            num_actions,
        });
    }
    Ok(())
}

/// Move `action` to the front of `ranking`, keeping the relative order of the other actions.
///
/// If `action` is not part of the ranking it is inserted at the front, which makes the ranking
/// fail validation downstream.
pub fn put_action_to_list(action: u32, ranking: &mut Vec<u32>) {
    match ranking.iter().position(|&a| a == action) {
        Some(index) => ranking[..=index].rotate_right(1),
        None => ranking.insert(0, action),
    }
}

#[cfg(test)]
mod tests {
    use super::{put_action_to_list, ActionCount, ExploreAction, VariableActionContext};
    use crate::{error::RankingDefect, Error};

    struct Ctx(u32);

    impl VariableActionContext for Ctx {
        fn number_of_actions(&self) -> u32 {
            self.0
        }
    }

    #[test]
    fn fixed_count_rejects_zero() {
        assert!(matches!(
            ActionCount::<Ctx>::fixed("test", 0),
            Err(Error::InvalidNumberOfActions { component: "test" })
        ));
        let count = ActionCount::<Ctx>::fixed("test", 10).unwrap();
        assert!(!count.is_variable());
        // Fixed count ignores the context.
        assert_eq!(count.resolve("test", &Ctx(3)).unwrap(), 10);
    }

    #[test]
    fn variable_count_reads_context() {
        let count = ActionCount::<Ctx>::variable();
        assert!(count.is_variable());
        assert_eq!(count.resolve("test", &Ctx(4)).unwrap(), 4);
        assert!(matches!(
            count.resolve("test", &Ctx(0)),
            Err(Error::InvalidNumberOfActions { .. })
        ));
    }

    #[test]
    fn single_action_range() {
        assert!(1u32.validate("p", 3).is_ok());
        assert!(3u32.validate("p", 3).is_ok());
        assert!(matches!(
            0u32.validate("p", 3),
            Err(Error::ActionOutOfRange { action: 0, .. })
        ));
        assert!(matches!(
            4u32.validate("p", 3),
            Err(Error::ActionOutOfRange {
                action: 4,
                num_actions: 3,
                ..
            })
        ));
    }

    #[test]
    fn ranking_must_be_permutation() {
        assert!(vec![2, 3, 1].validate("r", 3).is_ok());
        assert!(matches!(
            vec![2, 2, 1].validate("r", 3),
            Err(Error::MalformedRanking {
                defect: RankingDefect::Duplicate(2),
                ..
            })
        ));
        assert!(matches!(
            vec![1, 2].validate("r", 3),
            Err(Error::MalformedRanking {
                defect: RankingDefect::Length {
                    expected: 3,
                    found: 2
                },
                ..
            })
        ));
        assert!(matches!(
            vec![1, 2, 4].validate("r", 3),
            Err(Error::ActionOutOfRange { action: 4, .. })
        ));
    }

    #[test]
    fn put_action_to_front_preserves_order() {
        let mut ranking = vec![4, 2, 5, 1, 3];
        put_action_to_list(5, &mut ranking);
        assert_eq!(ranking, vec![5, 4, 2, 1, 3]);

        put_action_to_list(5, &mut ranking);
        assert_eq!(ranking, vec![5, 4, 2, 1, 3]);

        put_action_to_list(3, &mut ranking);
        assert_eq!(ranking, vec![3, 5, 4, 2, 1]);

        let mut ranking = vec![1, 2];
        put_action_to_list(7, &mut ranking);
        assert_eq!(ranking, vec![7, 1, 2]);
    }
}
