//! In-memory recorder with reward join.
use std::{
    collections::HashMap,
    io::Write,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};

use serde::Serialize;

use crate::{
    explorer::ExplorerState,
    recorder::{Interaction, RecordRefused, Recorder},
    seed::UniqueEventId,
    Result,
};

/// An owned copy of a recorded interaction, with the reward or outcome joined to it later.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordedInteraction<C, A> {
    /// Context the decision was made for.
    pub context: C,
    /// Chosen action or ranking.
    pub action: A,
    /// Probability with which `action` was chosen.
    pub probability: f32,
    /// Key identifying the decision.
    pub unique_key: UniqueEventId,
    /// Strategy-specific diagnostics.
    pub explorer_state: ExplorerState,
    /// Identifier of the model used for the decision.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model_id: Option<String>,
    /// Reward reported for the decision.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reward: Option<f32>,
    /// Free-form (typically JSON) outcome reported for the decision.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub outcome: Option<String>,
}

struct Buffer<C, A> {
    interactions: Vec<RecordedInteraction<C, A>>,
    by_key: HashMap<String, usize>,
}

/// Keeps recorded interactions in memory so rewards can be joined to them and the result exported
/// or evaluated offline.
///
/// Clones share the same buffer: keep one clone and pass another to
/// [`MwtConfig::recorder`](crate::MwtConfig::recorder).
///
/// With a capacity set, interactions arriving while the buffer is full are refused rather than
/// waiting for space.
pub struct MemoryRecorder<C, A> {
    capacity: Option<usize>,
    buffer: Arc<Mutex<Buffer<C, A>>>,
}

impl<C, A> Clone for MemoryRecorder<C, A> {
    fn clone(&self) -> Self {
        MemoryRecorder {
            capacity: self.capacity,
            buffer: Arc::clone(&self.buffer),
        }
    }
}

impl<C, A> Default for MemoryRecorder<C, A> {
    fn default() -> Self {
        MemoryRecorder::new()
    }
}

impl<C, A> MemoryRecorder<C, A> {
    /// Create an unbounded recorder.
    pub fn new() -> MemoryRecorder<C, A> {
        MemoryRecorder {
            capacity: None,
            buffer: Arc::new(Mutex::new(Buffer {
                interactions: Vec::new(),
                by_key: HashMap::new(),
            })),
        }
    }

    /// Create a recorder that holds at most `capacity` interactions.
    pub fn with_capacity(capacity: usize) -> MemoryRecorder<C, A> {
        MemoryRecorder {
            capacity: Some(capacity),
            ..MemoryRecorder::new()
        }
    }

    fn lock(&self) -> MutexGuard<'_, Buffer<C, A>> {
        // The buffer is consistent between statements, so a poisoned lock is still usable.
        self.buffer.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Number of recorded interactions.
    pub fn len(&self) -> usize {
        self.lock().interactions.len()
    }

    /// Returns `true` if nothing has been recorded.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop all recorded interactions, making room for new ones.
    pub fn clear(&self) {
        let mut buffer = self.lock();
        buffer.interactions.clear();
        buffer.by_key.clear();
    }

    /// Attach a reward to the interaction recorded under `unique_key`. Returns `false` if no
    /// such interaction exists.
    pub fn report_reward(&self, unique_key: &str, reward: f32) -> bool {
        self.update(unique_key, |interaction| interaction.reward = Some(reward))
    }

    /// Attach rewards to several interactions. Returns `true` only if every key was found.
    pub fn report_rewards<'k>(&self, rewards: impl IntoIterator<Item = (&'k str, f32)>) -> bool {
        rewards
            .into_iter()
            .fold(true, |all_found, (key, reward)| {
                self.report_reward(key, reward) && all_found
            })
    }

    /// Attach a free-form outcome to the interaction recorded under `unique_key`. Returns `false`
    /// if no such interaction exists.
    pub fn report_outcome(&self, unique_key: &str, outcome: impl Into<String>) -> bool {
        let outcome = outcome.into();
        self.update(unique_key, |interaction| interaction.outcome = Some(outcome))
    }

    fn update(
        &self,
        unique_key: &str,
        f: impl FnOnce(&mut RecordedInteraction<C, A>),
    ) -> bool {
        let mut buffer = self.lock();
        let Some(&index) = buffer.by_key.get(unique_key) else {
            log::debug!(target: "mwt", unique_key; "no recorded interaction to join");
            return false;
        };
        f(&mut buffer.interactions[index]);
        true
    }

    /// Copy of all recorded interactions, in recording order.
    pub fn interactions(&self) -> Vec<RecordedInteraction<C, A>>
    where
        C: Clone,
        A: Clone,
    {
        self.lock().interactions.clone()
    }

    /// Write all recorded interactions to `writer`, one JSON object per line.
    pub fn to_json_lines(&self, mut writer: impl Write) -> Result<()>
    where
        C: Serialize,
        A: Serialize,
    {
        let buffer = self.lock();
        for interaction in &buffer.interactions {
            serde_json::to_writer(&mut writer, interaction).map_err(std::io::Error::from)?;
            writer.write_all(b"\n")?;
        }
        writer.flush()?;
        Ok(())
    }
}

impl<C: Clone, A: Clone> Recorder<C, A> for MemoryRecorder<C, A> {
    fn record(&self, interaction: Interaction<'_, C, A>) -> std::result::Result<(), RecordRefused> {
        let mut buffer = self.lock();
        if let Some(capacity) = self.capacity {
            if buffer.interactions.len() >= capacity {
                return Err(RecordRefused::new(format!(
                    "memory recorder is full ({capacity} interactions)"
                )));
            }
        }

        let index = buffer.interactions.len();
        buffer.interactions.push(RecordedInteraction {
            context: interaction.context.clone(),
            action: interaction.action.clone(),
            probability: interaction.probability,
            unique_key: interaction.unique_key.clone(),
            explorer_state: interaction.explorer_state.clone(),
            model_id: interaction.model_id.map(str::to_owned),
            reward: None,
            outcome: None,
        });
        // A repeated key joins to the latest interaction.
        buffer
            .by_key
            .insert(interaction.unique_key.key.clone(), index);
        Ok(())
    }
}
