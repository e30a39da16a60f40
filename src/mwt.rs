use std::io::Read;

use crate::{
    actions::ExploreAction,
    explorer::{ExploreDecision, Explorer},
    policy::{LoadModel, PolicyHandle},
    recorder::{Interaction, RecordRefused, Recorder},
    seed::{salted_seed, UniqueEventId},
    Error, MwtConfig, Result,
};

/// Entry point for making exploration decisions.
///
/// The dispatcher owns one [`Explorer`]. For every decision it resolves the number of actions,
/// derives the salted seed from the application id and the unique key, lets the explorer decide,
/// validates the outcome and forwards it to the recorder.
///
/// In order to create an instance, first create [`MwtConfig`].
///
/// # Examples
/// ```
/// # use mwt::{EpsilonGreedyExplorer, MwtConfig};
/// let explorer = EpsilonGreedyExplorer::<(), _>::new(|_: &()| 2u32, 0.2, 5)?;
/// let mwt = MwtConfig::new("my-app").to_explorer(explorer);
///
/// let choice = mwt.choose_action("user-42", &())?;
/// assert!((1..=5).contains(&choice.action));
/// # Ok::<(), mwt::Error>(())
/// ```
pub struct MwtExplorer<'a, C: ?Sized, E: Explorer<C>> {
    app_id: String,
    explorer: E,
    recorder: Box<dyn Recorder<C, E::Action> + Send + Sync + 'a>,
}

/// Result of a decision.
///
/// The probability of the action is deliberately not part of the result: it is only meant for
/// the recorded interaction.
#[derive(Debug, Clone, PartialEq)]
pub struct Choice<A> {
    /// Chosen action (or ranking).
    pub action: A,
    /// What happened to the interaction.
    pub log_status: LogStatus,
}

/// Outcome of handing a decision to the recorder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogStatus {
    /// The recorder accepted the interaction.
    Recorded,
    /// The explorer marked the decision as not worth recording.
    NotRecorded,
    /// The recorder refused the interaction. The decision itself is still valid.
    Refused(RecordRefused),
}

impl LogStatus {
    /// Returns `true` if the recorder accepted the interaction.
    pub fn is_recorded(&self) -> bool {
        matches!(self, LogStatus::Recorded)
    }
}

impl<'a, C: ?Sized, E: Explorer<C>> MwtExplorer<'a, C, E> {
    /// Create a dispatcher for `explorer` using the specified configuration.
    pub fn new(config: MwtConfig<'a, C, E::Action>, explorer: E) -> Self {
        MwtExplorer {
            app_id: config.app_id,
            explorer,
            recorder: config.recorder,
        }
    }

    /// Application id used to salt seeds.
    pub fn app_id(&self) -> &str {
        &self.app_id
    }

    /// The active explorer.
    pub fn explorer(&self) -> &E {
        &self.explorer
    }

    /// Choose an action (or a ranking) for `context`.
    ///
    /// The result is reproducible: the same application id, unique key, explorer configuration
    /// and policy always give the same action.
    ///
    /// # Errors
    ///
    /// Fails if the number of actions is zero, or if the policy (or scorer, ranker) produces an
    /// action outside `[1, num_actions]` or a ranking that is not a permutation. A recorder refusing
    /// the interaction is not an error; see [`Choice::log_status`].
    pub fn choose_action(
        &self,
        unique_key: impl Into<UniqueEventId>,
        context: &C,
    ) -> Result<Choice<E::Action>> {
        let unique_key = unique_key.into();
        let explorer = self.explorer.name();

        let num_actions = self.explorer.num_actions(context)?;
        let seed = salted_seed(&self.app_id, &unique_key.key);
        let decision = self
            .explorer
            .choose_action(seed, context, num_actions)
            .and_then(|decision| {
                validate(explorer, &decision, num_actions)?;
                Ok(decision)
            })
            .inspect_err(|err| {
                log::warn!(target: "mwt",
                    explorer,
                    unique_key = unique_key.key.as_str(),
                    num_actions;
                    "rejected decision: {}", err);
            })?;

        log::trace!(target: "mwt",
                    explorer,
                    unique_key = unique_key.key.as_str(),
                    action:serde = decision.action,
                    probability = decision.probability,
                    should_record = decision.should_record;
                    "made a decision");

        if !decision.should_record {
            return Ok(Choice {
                action: decision.action,
                log_status: LogStatus::NotRecorded,
            });
        }

        let recorded = self.recorder.record(Interaction {
            context,
            action: &decision.action,
            probability: decision.probability,
            unique_key: &unique_key,
            explorer_state: &decision.state,
            model_id: decision.model_id.as_deref(),
        });
        let log_status = match recorded {
            Ok(()) => LogStatus::Recorded,
            Err(refused) => {
                log::warn!(target: "mwt",
                    explorer,
                    unique_key = unique_key.key.as_str();
                    "{}", refused);
                LogStatus::Refused(refused)
            }
        };

        Ok(Choice {
            action: decision.action,
            log_status,
        })
    }

    /// Replace the explorer's policy (or scorer, ranker, ensemble).
    ///
    /// Decisions started after this returns use `policy`; decisions in flight finish with the
    /// policy they started with.
    ///
    /// # Errors
    ///
    /// [`Error::PolicyUpdateNotSupported`] if the explorer has no swappable policy, or the
    /// explorer's own error if it refuses `policy` (e.g. an empty bootstrap ensemble). On failure
    /// the current policy stays active.
    pub fn update_policy(&self, policy: E::Mapper) -> Result<()> {
        let handle = self.swappable_handle()?;
        self.publish(handle, policy)
    }

    /// Load a new policy from `reader` and publish it. Meant to be called by a model updater
    /// whenever a new model is available. On failure the current policy stays active.
    pub fn update_model(&self, reader: &mut dyn Read) -> Result<()>
    where
        E::Mapper: LoadModel,
    {
        let handle = self.swappable_handle()?;
        let policy = <E::Mapper as LoadModel>::load_model(reader).inspect_err(|err| {
            log::warn!(target: "mwt",
                explorer = self.explorer.name();
                "failed to load new model: {}", err);
        })?;
        self.publish(handle, policy)
    }

    fn swappable_handle(&self) -> Result<&PolicyHandle<E::Mapper>> {
        let explorer = self.explorer.name();
        self.explorer.policy_handle().ok_or_else(|| {
            log::warn!(target: "mwt", explorer; "explorer does not support policy updates");
            Error::PolicyUpdateNotSupported {
                component: explorer,
            }
        })
    }

    fn publish(&self, handle: &PolicyHandle<E::Mapper>, policy: E::Mapper) -> Result<()> {
        let explorer = self.explorer.name();
        self.explorer.check_mapper(&policy).inspect_err(|err| {
            log::warn!(target: "mwt", explorer; "rejected policy update: {}", err);
        })?;
        handle.replace(policy);
        log::debug!(target: "mwt", explorer; "updated policy");
        Ok(())
    }

    /// Turn exploration on or off. With exploration off, explorers that have a policy follow it.
    pub fn enable_explore(&self, explore: bool) {
        self.explorer.enable_explore(explore);
        log::debug!(target: "mwt", explorer = self.explorer.name(), explore; "toggled exploration");
    }
}

/// Check the decision and every raw policy output that went into it.
fn validate<A: ExploreAction>(
    component: &'static str,
    decision: &ExploreDecision<A>,
    num_actions: u32,
) -> Result<()> {
    for proposed in &decision.proposed {
        proposed.validate(component, num_actions)?;
    }
    decision.action.validate(component, num_actions)
}

#[cfg(test)]
mod tests {
    use super::LogStatus;
    use crate::{
        actions::VariableActionContext,
        error::RankingDefect,
        explorer::{
            BootstrapExplorer, EpsilonGreedy, EpsilonGreedyExplorer, TauFirstExplorer,
            TopSlotExplorer, UniformExplorer,
        },
        policy::tests::ConstantPolicy,
        Error, ErrorKind, MemoryRecorder, MwtConfig,
    };

    fn constant(id: &str, action: u32) -> ConstantPolicy {
        ConstantPolicy {
            id: id.to_owned(),
            action,
        }
    }

    fn init_logger() {
        let _ = env_logger::builder().is_test(true).try_init();
    }

    #[test]
    fn zero_epsilon_always_exploits() {
        init_logger();
        let recorder = MemoryRecorder::new();
        let mwt = MwtConfig::new("mwt")
            .recorder(recorder.clone())
            .to_explorer(EpsilonGreedyExplorer::<(), _>::new(|_: &()| 5u32, 0.0, 10).unwrap());

        for i in 0..1_000 {
            let choice = mwt.choose_action(format!("key-{i}"), &()).unwrap();
            assert_eq!(choice.action, 5);
            assert_eq!(choice.log_status, LogStatus::Recorded);
        }

        let interactions = recorder.interactions();
        assert_eq!(interactions.len(), 1_000);
        assert!(interactions
            .iter()
            .all(|i| i.action == 5 && i.probability == 1.0));
    }

    #[test]
    fn exhausted_tau_logs_nothing() {
        let recorder = MemoryRecorder::new();
        let mwt = MwtConfig::new("mwt")
            .recorder(recorder.clone())
            .to_explorer(TauFirstExplorer::<(), _>::new(|_: &()| 5u32, 0, 10).unwrap());

        let choice = mwt.choose_action("key", &()).unwrap();
        assert_eq!(choice.action, 5);
        assert_eq!(choice.log_status, LogStatus::NotRecorded);
        assert!(recorder.is_empty());
    }

    #[test]
    fn rejects_out_of_range_actions() {
        for action in [0u32, 11] {
            let recorder = MemoryRecorder::new();
            let mwt = MwtConfig::new("mwt")
                .recorder(recorder.clone())
                .to_explorer(
                    EpsilonGreedyExplorer::<(), _>::new(move |_: &()| action, 0.5, 10).unwrap(),
                );
            for i in 0..20 {
                let err = mwt.choose_action(i.to_string(), &()).unwrap_err();
                assert!(matches!(
                    err,
                    Error::ActionOutOfRange {
                        component: "EpsilonGreedyExplorer",
                        num_actions: 10,
                        ..
                    }
                ));
                assert_eq!(err.kind(), ErrorKind::InvariantViolation);
            }
            assert!(recorder.is_empty());
        }
    }

    #[test]
    fn rejects_bad_bag_even_when_not_chosen() {
        let explorer =
            BootstrapExplorer::<(), _>::new(vec![constant("a", 1), constant("b", 9)], 3).unwrap();
        let mwt = MwtConfig::new("mwt").to_explorer(explorer);
        for i in 0..20 {
            assert!(matches!(
                mwt.choose_action(i.to_string(), &()),
                Err(Error::ActionOutOfRange { action: 9, .. })
            ));
        }
    }

    #[test]
    fn decisions_are_reproducible() {
        let make = |app_id: &str| {
            MwtConfig::new(app_id).to_explorer(
                EpsilonGreedyExplorer::<(), _>::new(|_: &()| 1u32, 0.8, 10).unwrap(),
            )
        };
        let (first, second, other_app) = (make("app"), make("app"), make("other"));

        let mut differs = false;
        for i in 0..100 {
            let key = format!("user-{i}");
            let action = first.choose_action(key.as_str(), &()).unwrap().action;
            assert_eq!(action, second.choose_action(key.as_str(), &()).unwrap().action);
            differs |= action != other_app.choose_action(key.as_str(), &()).unwrap().action;
        }
        assert!(differs);
    }

    #[test]
    fn refusal_does_not_fail_decision() {
        let recorder = MemoryRecorder::with_capacity(1);
        let mwt = MwtConfig::new("mwt")
            .recorder(recorder.clone())
            .to_explorer(EpsilonGreedyExplorer::<(), _>::new(|_: &()| 3u32, 0.0, 4).unwrap());

        assert!(mwt.choose_action("a", &()).unwrap().log_status.is_recorded());
        let choice = mwt.choose_action("b", &()).unwrap();
        assert_eq!(choice.action, 3);
        assert!(matches!(choice.log_status, LogStatus::Refused(_)));
        assert_eq!(recorder.len(), 1);
    }

    #[test]
    fn interaction_carries_key_and_model() {
        let recorder = MemoryRecorder::new();
        let mwt = MwtConfig::new("mwt")
            .recorder(recorder.clone())
            .to_explorer(EpsilonGreedyExplorer::<(), _>::new(constant("v7", 2), 0.0, 4).unwrap());

        let key = crate::UniqueEventId::now("session-1");
        mwt.choose_action(key.clone(), &()).unwrap();

        let interaction = &recorder.interactions()[0];
        assert_eq!(interaction.unique_key, key);
        assert_eq!(interaction.model_id.as_deref(), Some("v7"));
        assert!(recorder.report_reward("session-1", 1.0));
    }

    #[test]
    fn update_policy_is_observed_by_later_decisions() {
        let mwt = MwtConfig::new("mwt")
            .to_explorer(EpsilonGreedyExplorer::<(), _>::new(constant("a", 1), 0.0, 4).unwrap());
        assert_eq!(mwt.choose_action("k", &()).unwrap().action, 1);
        mwt.update_policy(constant("b", 4)).unwrap();
        assert_eq!(mwt.choose_action("k", &()).unwrap().action, 4);
    }

    #[test]
    fn update_is_not_supported_without_policy_handle() {
        let uniform = MwtConfig::new("mwt").to_explorer(UniformExplorer::<()>::new(3).unwrap());
        let err = uniform.update_policy(()).unwrap_err();
        assert!(matches!(
            err,
            Error::PolicyUpdateNotSupported {
                component: "UniformExplorer"
            }
        ));
        assert_eq!(err.kind(), ErrorKind::Unsupported);
    }

    #[test]
    fn bootstrap_ensemble_is_updated_as_a_whole() {
        let recorder = MemoryRecorder::new();
        let mwt = MwtConfig::new("mwt").recorder(recorder.clone()).to_explorer(
            BootstrapExplorer::<(), _>::new(vec![constant("a", 1), constant("b", 2)], 3).unwrap(),
        );

        mwt.update_policy(vec![constant("v2", 3); 3]).unwrap();
        assert_eq!(mwt.choose_action("k", &()).unwrap().action, 3);

        let err = mwt.update_policy(Vec::new()).unwrap_err();
        assert!(matches!(
            err,
            Error::InvalidParameter {
                component: "BootstrapExplorer",
                parameter: "bags",
                ..
            }
        ));
        assert_eq!(mwt.choose_action("k", &()).unwrap().action, 3);

        let interactions = recorder.interactions();
        assert_eq!(interactions.len(), 2);
        assert_eq!(interactions[0].model_id.as_deref(), Some("v2"));
        assert_eq!(interactions[0].probability, 1.0);
    }

    #[test]
    fn bootstrap_swap_never_mixes_ensembles() {
        let ensemble = |id: &str, action: u32| vec![constant(id, action); 4];
        let recorder = MemoryRecorder::new();
        let mwt = MwtConfig::new("mwt")
            .recorder(recorder.clone())
            .to_explorer(BootstrapExplorer::<(), _>::new(ensemble("a", 1), 2).unwrap());

        std::thread::scope(|scope| {
            for thread in 0..4 {
                let mwt = &mwt;
                scope.spawn(move || {
                    for i in 0..500 {
                        mwt.choose_action(format!("{thread}-{i}"), &()).unwrap();
                    }
                });
            }
            scope.spawn(|| {
                for i in 0..200 {
                    let bags = if i % 2 == 0 {
                        ensemble("b", 2)
                    } else {
                        ensemble("a", 1)
                    };
                    mwt.update_policy(bags).unwrap();
                }
            });
        });

        let interactions = recorder.interactions();
        assert_eq!(interactions.len(), 2_000);
        for interaction in interactions {
            let expected = match interaction.model_id.as_deref() {
                Some("a") => 1,
                Some("b") => 2,
                other => panic!("unexpected model {other:?}"),
            };
            assert_eq!(interaction.action, expected);
            assert_eq!(interaction.probability, 1.0);
        }
    }

    #[test]
    fn update_model_from_stream() {
        let mwt = MwtConfig::new("mwt")
            .to_explorer(EpsilonGreedyExplorer::<(), _>::new(constant("v1", 1), 0.0, 5).unwrap());

        mwt.update_model(&mut "v2 3".as_bytes()).unwrap();
        assert_eq!(mwt.choose_action("k", &()).unwrap().action, 3);

        let err = mwt.update_model(&mut "broken".as_bytes()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ModelUpdate);
        assert_eq!(mwt.choose_action("k", &()).unwrap().action, 3);
    }

    #[test]
    fn hot_swap_never_mixes_policies() {
        let recorder = MemoryRecorder::new();
        let mwt = MwtConfig::new("mwt")
            .recorder(recorder.clone())
            .to_explorer(EpsilonGreedyExplorer::<(), _>::new(constant("a", 1), 0.0, 2).unwrap());

        std::thread::scope(|scope| {
            for thread in 0..4 {
                let mwt = &mwt;
                scope.spawn(move || {
                    for i in 0..500 {
                        mwt.choose_action(format!("{thread}-{i}"), &()).unwrap();
                    }
                });
            }
            scope.spawn(|| {
                for i in 0..200 {
                    let policy = if i % 2 == 0 {
                        constant("b", 2)
                    } else {
                        constant("a", 1)
                    };
                    mwt.update_policy(policy).unwrap();
                }
            });
        });

        let interactions = recorder.interactions();
        assert_eq!(interactions.len(), 2_000);
        for interaction in interactions {
            let expected = match interaction.model_id.as_deref() {
                Some("a") => 1,
                Some("b") => 2,
                other => panic!("unexpected model {other:?}"),
            };
            assert_eq!(interaction.action, expected);
        }
    }

    #[test]
    fn disabled_exploration_is_forwarded() {
        let mwt = MwtConfig::new("mwt")
            .to_explorer(EpsilonGreedyExplorer::<(), _>::new(|_: &()| 4u32, 1.0, 10).unwrap());
        mwt.enable_explore(false);
        for i in 0..100 {
            assert_eq!(mwt.choose_action(i.to_string(), &()).unwrap().action, 4);
        }
    }

    #[derive(Clone)]
    struct Slate {
        items: Vec<&'static str>,
    }

    impl VariableActionContext for Slate {
        fn number_of_actions(&self) -> u32 {
            self.items.len() as u32
        }
    }

    #[test]
    fn action_count_from_context() {
        let mwt =
            MwtConfig::new("mwt").to_explorer(UniformExplorer::<Slate>::with_variable_actions());

        let slate = Slate {
            items: vec!["news", "sports", "weather"],
        };
        for i in 0..50 {
            let action = mwt.choose_action(i.to_string(), &slate).unwrap().action;
            assert!((1..=3).contains(&action));
        }

        let empty = Slate { items: Vec::new() };
        assert!(matches!(
            mwt.choose_action("k", &empty),
            Err(Error::InvalidNumberOfActions { .. })
        ));
    }

    #[test]
    fn rankings_are_validated() {
        let ranker = |slate: &Slate| -> Vec<u32> {
            if slate.items.len() == 2 {
                vec![1, 1]
            } else {
                (1..=slate.items.len() as u32).rev().collect()
            }
        };
        let explorer =
            TopSlotExplorer::with_variable_actions(ranker, EpsilonGreedy::new(0.3).unwrap());
        let recorder = MemoryRecorder::new();
        let mwt = MwtConfig::new("mwt")
            .recorder(recorder.clone())
            .to_explorer(explorer);

        let slate = Slate {
            items: vec!["a", "b", "c", "d"],
        };
        let mut ranking = mwt.choose_action("k", &slate).unwrap().action;
        ranking.sort_unstable();
        assert_eq!(ranking, vec![1, 2, 3, 4]);
        assert_eq!(recorder.len(), 1);

        let broken = Slate {
            items: vec!["a", "b"],
        };
        assert!(matches!(
            mwt.choose_action("k", &broken),
            Err(Error::MalformedRanking {
                defect: RankingDefect::Duplicate(1),
                ..
            })
        ));
        assert_eq!(recorder.len(), 1);
    }
}
