//! Offline policy evaluation over recorded interactions.
use crate::{memory_recorder::RecordedInteraction, policy::Policy};

/// Inverse propensity score estimate of the average reward `policy` would have earned on the
/// recorded traffic.
///
/// Only interactions with a reward take part. Each one where `policy` agrees with the logged
/// action contributes `reward / probability`; the sum is divided by the number of rewarded
/// interactions. Returns `None` if no interaction has a reward.
///
/// Interactions where `policy` disagrees count as zero reward. This differs from optimizers that
/// divide only by the number of matching interactions: those report the average weighted reward
/// over the matches, which is not an unbiased estimate of the policy's value.
///
/// ```
/// # use mwt::{evaluation::ips_estimate, MemoryRecorder};
/// let recorder = MemoryRecorder::<u32, u32>::new();
/// // ... record decisions and report rewards ...
/// assert_eq!(ips_estimate(&recorder.interactions(), &|_: &u32| 1u32), None);
/// ```
pub fn ips_estimate<C, P>(interactions: &[RecordedInteraction<C, u32>], policy: &P) -> Option<f64>
where
    P: Policy<C> + ?Sized,
{
    let mut total = 0.0;
    let mut rewarded = 0usize;
    for interaction in interactions {
        let Some(reward) = interaction.reward else {
            continue;
        };
        rewarded += 1;
        if interaction.probability > 0.0
            && policy.choose_action(&interaction.context) == interaction.action
        {
            total += f64::from(reward) / f64::from(interaction.probability);
        }
    }

    if rewarded == 0 {
        return None;
    }
    Some(total / rewarded as f64)
}

#[cfg(test)]
mod tests {
    use super::ips_estimate;
    use crate::{
        explorer::ExplorerState, memory_recorder::RecordedInteraction, seed::UniqueEventId,
    };

    fn interaction(context: u32, action: u32, probability: f32, reward: Option<f32>) -> RecordedInteraction<u32, u32> {
        RecordedInteraction {
            context,
            action,
            probability,
            unique_key: UniqueEventId::from(format!("{context}")),
            explorer_state: ExplorerState::Uniform,
            model_id: None,
            reward,
            outcome: None,
        }
    }

    #[test]
    fn weights_matching_rewards_by_inverse_propensity() {
        let log = vec![
            interaction(1, 1, 0.5, Some(1.0)),
            interaction(2, 2, 0.25, Some(1.0)),
            interaction(3, 1, 0.5, Some(0.0)),
            interaction(4, 2, 0.5, None),
        ];
        // Always picks action 2: matches the second and fourth interactions, but the fourth has
        // no reward.
        let estimate = ips_estimate(&log, &|_: &u32| 2u32).unwrap();
        assert!((estimate - 4.0 / 3.0).abs() < 1e-12);

        // Picks action 1: matches the first and third.
        let estimate = ips_estimate(&log, &|_: &u32| 1u32).unwrap();
        assert!((estimate - 2.0 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn disagreements_count_as_zero_reward() {
        let log = vec![
            interaction(1, 1, 0.5, Some(1.0)),
            interaction(2, 1, 0.5, Some(1.0)),
        ];
        // Divided by both rewarded interactions, not by the single match.
        let first_only = |context: &u32| if *context == 1 { 1u32 } else { 2 };
        assert_eq!(ips_estimate(&log, &first_only), Some(1.0));
        assert_eq!(ips_estimate(&log, &|_: &u32| 3u32), Some(0.0));
    }

    #[test]
    fn nothing_rewarded_gives_none() {
        let log = vec![interaction(1, 1, 0.5, None)];
        assert_eq!(ips_estimate(&log, &|_: &u32| 1u32), None);
        assert_eq!(ips_estimate::<u32, _>(&[], &|_: &u32| 1u32), None);
    }
}
