use crate::{error::Result, TraceArray, TraceField};
use ndarray::ArrayD;

/// Per-field buffers of one batch.
///
/// A [`TraceRecorder`](super::TraceRecorder) appends to exactly one buffer set
/// and replaces it with an empty one at each flush.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct TraceBuffers {
    pub(super) actions: Vec<ArrayD<f32>>,
    pub(super) observations: Vec<ArrayD<f32>>,
    pub(super) rewards: Vec<f32>,
    pub(super) episode_returns: Vec<f32>,
    pub(super) episode_steps: Vec<i64>,
    pub(super) episodes_end_point: Vec<i64>,
}

impl TraceBuffers {
    /// Buffers of the first batch of a run, whose episode boundaries start with 0.
    pub(super) fn first() -> Self {
        Self {
            episodes_end_point: vec![0],
            ..Self::default()
        }
    }

    /// Buffered actions.
    pub fn actions(&self) -> &[ArrayD<f32>] {
        &self.actions
    }

    /// Buffered observations.
    pub fn observations(&self) -> &[ArrayD<f32>] {
        &self.observations
    }

    /// Buffered per-step rewards.
    pub fn rewards(&self) -> &[f32] {
        &self.rewards
    }

    /// Buffered episode returns.
    pub fn episode_returns(&self) -> &[f32] {
        &self.episode_returns
    }

    /// Buffered episode lengths.
    pub fn episode_steps(&self) -> &[i64] {
        &self.episode_steps
    }

    /// Buffered episode boundaries.
    pub fn episodes_end_point(&self) -> &[i64] {
        &self.episodes_end_point
    }

    /// Number of buffered items of a field.
    pub fn len(&self, field: TraceField) -> usize {
        match field {
            TraceField::Actions => self.actions.len(),
            TraceField::Observations => self.observations.len(),
            TraceField::Rewards => self.rewards.len(),
            TraceField::EpisodeReturns => self.episode_returns.len(),
            TraceField::EpisodeSteps => self.episode_steps.len(),
            TraceField::EpisodesEndPoint => self.episodes_end_point.len(),
        }
    }

    /// Converts the buffer of a field into an array, or `None` if it is empty.
    pub fn to_array(&self, field: TraceField) -> Result<Option<TraceArray>> {
        if self.len(field) == 0 {
            return Ok(None);
        }
        let array = match field {
            TraceField::Actions => TraceArray::stack_f32(field.as_str(), &self.actions)?,
            TraceField::Observations => {
                TraceArray::stack_f32(field.as_str(), &self.observations)?
            }
            TraceField::Rewards => TraceArray::from_f32_vec(self.rewards.clone()),
            TraceField::EpisodeReturns => TraceArray::from_f32_vec(self.episode_returns.clone()),
            TraceField::EpisodeSteps => TraceArray::from_i64_vec(self.episode_steps.clone()),
            TraceField::EpisodesEndPoint => {
                TraceArray::from_i64_vec(self.episodes_end_point.clone())
            }
        };
        Ok(Some(array))
    }
}
