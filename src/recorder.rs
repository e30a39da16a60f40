//! Recording of exploration decisions.
//!
//! Every decision an explorer marks as worth recording is handed to a [`Recorder`] as an
//! [`Interaction`]: the context, the chosen action, the probability with which it was chosen and
//! the unique key that lets rewards be joined back to the decision. Data scientists use these
//! tuples to evaluate policies offline.
use serde::Serialize;

use crate::{explorer::ExplorerState, seed::UniqueEventId};

/// A decision passed to the recorder.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Interaction<'a, C: ?Sized, A> {
    /// Context the decision was made for.
    pub context: &'a C,
    /// Chosen action or ranking.
    pub action: &'a A,
    /// Probability with which `action` was chosen.
    pub probability: f32,
    /// Key identifying the decision.
    pub unique_key: &'a UniqueEventId,
    /// Strategy-specific diagnostics.
    pub explorer_state: &'a ExplorerState,
    /// Identifier of the model used for the decision, if known.
    pub model_id: Option<&'a str>,
}

/// Returned by a recorder that could not store an interaction (e.g. a full buffer).
///
/// The decision itself stands: the dispatcher still returns the chosen action and reports the
/// refusal through [`LogStatus::Refused`](crate::LogStatus::Refused).
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("interaction was not recorded: {reason}")]
pub struct RecordRefused {
    /// Why the interaction was refused.
    pub reason: String,
}

impl RecordRefused {
    /// Create a refusal with a human-readable reason.
    pub fn new(reason: impl Into<String>) -> RecordRefused {
        RecordRefused {
            reason: reason.into(),
        }
    }
}

/// Sink for recorded interactions.
///
/// Recorders are shared between threads and must not block for long: they are called on the
/// decision path.
///
/// Any `Fn(Interaction<C, A>)` closure is a recorder that accepts every interaction.
pub trait Recorder<C: ?Sized, A> {
    /// Store `interaction`, or refuse it.
    fn record(&self, interaction: Interaction<'_, C, A>) -> Result<(), RecordRefused>;
}

/// Recorder that drops every interaction. Used when no recorder is configured.
pub(crate) struct NoopRecorder;

impl<C: ?Sized, A> Recorder<C, A> for NoopRecorder {
    fn record(&self, _interaction: Interaction<'_, C, A>) -> Result<(), RecordRefused> {
        Ok(())
    }
}

impl<C: ?Sized, A, T: Fn(Interaction<'_, C, A>)> Recorder<C, A> for T {
    fn record(&self, interaction: Interaction<'_, C, A>) -> Result<(), RecordRefused> {
        self(interaction);
        Ok(())
    }
}
