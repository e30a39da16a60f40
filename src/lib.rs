//! Multi-World Testing: contextual-bandit exploration with reproducible propensity logging.
//!
//! # Overview
//!
//! The crate revolves around an [`MwtExplorer`] that chooses an action for a `context`. Every
//! decision is identified by a unique key; together with the application id the key is hashed
//! into a salted seed, so the same decision is made whenever the same key is seen again.
//!
//! The choice itself is delegated to an [`Explorer`]. Explorers wrap a policy (context → action),
//! a ranker (context → ordering) or a scorer (context → per-action weights) and randomize around
//! it:
//!
//! - [`EpsilonGreedyExplorer`] and [`TauFirstExplorer`] explore around a [`Policy`].
//! - [`BootstrapExplorer`] samples from an ensemble of policies.
//! - [`SoftmaxExplorer`] and [`GenericExplorer`] sample from a [`Scorer`].
//! - [`UniformExplorer`] ignores any policy.
//! - [`TopSlotExplorer`] explores the first slot of a [`Ranker`]'s ordering.
//!
//! Each decision comes with the exact probability of the chosen action. That probability is
//! never returned to the caller: it is passed, along with the context and the unique key, to a
//! [`Recorder`] so that other policies can be evaluated offline (see [`evaluation`]).
//!
//! Policies can be replaced at runtime with [`MwtExplorer::update_policy`] or
//! [`MwtExplorer::update_model`]. Decisions in flight keep using the policy they started with.
//!
//! # Error Handling
//!
//! Errors are represented by the [`Error`] enum; [`Error::kind`] groups them into configuration
//! errors, broken policy contracts, and unsupported operations.
//!
//! An action outside of `[1, num_actions]` or a malformed ranking is never clamped or repaired:
//! the decision fails. A recorder refusing an interaction does not fail the decision; it is
//! reported through [`Choice::log_status`].
//!
//! # Logging
//!
//! The package uses the [`log`](https://docs.rs/log/latest/log/) crate for logging messages
//! under the `mwt` target. Every decision is logged at trace level; policy updates at debug
//! level; rejected decisions and refused interactions at warn level.
//!
//! # Examples
//!
//! ```
//! use mwt::{EpsilonGreedyExplorer, MemoryRecorder, MwtConfig};
//!
//! let recorder = MemoryRecorder::new();
//! let mwt = MwtConfig::new("my-app")
//!     .recorder(recorder.clone())
//!     .to_explorer(EpsilonGreedyExplorer::<(), _>::new(|_: &()| 1u32, 0.1, 3)?);
//!
//! let choice = mwt.choose_action("user-1", &())?;
//! assert!((1..=3).contains(&choice.action));
//!
//! recorder.report_reward("user-1", 1.0);
//! assert_eq!(recorder.interactions()[0].reward, Some(1.0));
//! # Ok::<(), mwt::Error>(())
//! ```

#![warn(rustdoc::missing_crate_level_docs)]
#![warn(missing_docs)]

mod actions;
mod config;
mod error;
pub mod evaluation;
mod explorer;
mod memory_recorder;
mod mwt;
mod policy;
mod recorder;
mod sampler;
mod seed;

pub use actions::{put_action_to_list, ActionCount, ExploreAction, VariableActionContext};
pub use config::MwtConfig;
pub use error::{Error, ErrorKind, RankingDefect, Result};
pub use explorer::{
    BootstrapExplorer, EpsilonGreedy, EpsilonGreedyExplorer, ExplorationStrategy, ExploreDecision,
    Explorer, ExplorerState, GenericExplorer, SoftmaxExplorer, TauFirst, TauFirstExplorer,
    TopSlotExplorer, UniformExplorer,
};
pub use memory_recorder::{MemoryRecorder, RecordedInteraction};
pub use mwt::{Choice, LogStatus, MwtExplorer};
pub use policy::{LoadModel, Policy, PolicyHandle, Ranker, Scorer};
pub use recorder::{Interaction, RecordRefused, Recorder};
pub use sampler::Prg;
pub use seed::{salted_seed, UniqueEventId};
