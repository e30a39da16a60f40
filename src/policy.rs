//! Context mappers (policies, rankers, scorers) and the hot-swappable handle that holds them.
//!
//! The mapper held by a [`PolicyHandle`] is immutable and can only be replaced completely. A decision takes a *snapshot* at invocation
//! time and uses it throughout, so a concurrent update never produces a decision that mixes the
//! old and new mapper. Readers never lock.
use std::{io::Read, sync::Arc};

use arc_swap::ArcSwap;

use crate::Result;

/// Maps a context to a single 1-based action.
///
/// Any `Fn(&C) -> u32` closure is a policy.
pub trait Policy<C: ?Sized> {
    /// Choose an action for `context`.
    fn choose_action(&self, context: &C) -> u32;

    /// Identifier of the model backing this policy, logged alongside decisions.
    fn model_id(&self) -> Option<&str> {
        None
    }
}

/// Maps a context to an ordered list of actions, best first.
///
/// Any `Fn(&C) -> Vec<u32>` closure is a ranker.
pub trait Ranker<C: ?Sized> {
    /// Rank all actions for `context`.
    fn choose_ranking(&self, context: &C) -> Vec<u32>;

    /// Identifier of the model backing this ranker, logged alongside decisions.
    fn model_id(&self) -> Option<&str> {
        None
    }
}

/// Maps a context to one score per action; index `i` scores action `i + 1`.
///
/// Any `Fn(&C) -> Vec<f32>` closure is a scorer.
pub trait Scorer<C: ?Sized> {
    /// Score every action for `context`.
    fn score_actions(&self, context: &C) -> Vec<f32>;

    /// Identifier of the model backing this scorer, logged alongside decisions.
    fn model_id(&self) -> Option<&str> {
        None
    }
}

impl<C: ?Sized, F: Fn(&C) -> u32> Policy<C> for F {
    fn choose_action(&self, context: &C) -> u32 {
        self(context)
    }
}

impl<C: ?Sized, F: Fn(&C) -> Vec<u32>> Ranker<C> for F {
    fn choose_ranking(&self, context: &C) -> Vec<u32> {
        self(context)
    }
}

impl<C: ?Sized, F: Fn(&C) -> Vec<f32>> Scorer<C> for F {
    fn score_actions(&self, context: &C) -> Vec<f32> {
        self(context)
    }
}

/// Capability of a mapper to be rebuilt from a serialized model.
///
/// Called by an external updater (e.g. a background poller) through
/// [`MwtExplorer::update_model`](crate::MwtExplorer::update_model).
pub trait LoadModel: Sized {
    /// Build a new mapper from the model bytes in `reader`.
    fn load_model(reader: &mut dyn Read) -> Result<Self>;
}

/// Shared, atomically replaceable handle to the current mapper.
pub struct PolicyHandle<P> {
    current: ArcSwap<P>,
}

impl<P> PolicyHandle<P> {
    /// Create a handle holding `policy`.
    pub fn new(policy: P) -> PolicyHandle<P> {
        PolicyHandle {
            current: ArcSwap::from_pointee(policy),
        }
    }

    /// Get the current mapper. The snapshot is not affected by later updates.
    pub fn snapshot(&self) -> Arc<P> {
        self.current.load_full()
    }

    /// Publish a new mapper, returning the previous one.
    ///
    /// Decisions started after this call returns observe `policy`. Decisions already in flight
    /// keep their snapshot. Unlike [`MwtExplorer::update_policy`](crate::MwtExplorer::update_policy),
    /// this does not run [`Explorer::check_mapper`](crate::Explorer::check_mapper).
    pub fn replace(&self, policy: P) -> Arc<P> {
        // Constructing new value before publishing to keep the swap itself trivial.
        let new_value = Arc::new(policy);
        self.current.swap(new_value)
    }
}

impl<P: std::fmt::Debug> std::fmt::Debug for PolicyHandle<P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PolicyHandle")
            .field("current", &*self.current.load_full())
            .finish()
    }
}
