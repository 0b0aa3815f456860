//! Per-episode aggregation of rewards.
//!
//! [`SaveType`] decides which per-episode quantity a recorder keeps and which
//! fields are written at each flush. [`EpisodeStats`] summarizes the episodes
//! completed between two periodic reports.
use crate::{TraceError, TraceField};
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

/// Unit persisted by a [`TraceRecorder`](crate::TraceRecorder).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum SaveType {
    /// Per-step rewards and episode boundaries.
    Raw,

    /// Sum of rewards of each episode.
    Returns,

    /// Number of steps of each episode.
    Steps,
}

impl Default for SaveType {
    fn default() -> Self {
        Self::Raw
    }
}

impl SaveType {
    /// Name used in configuration files.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Raw => "raw",
            Self::Returns => "returns",
            Self::Steps => "steps",
        }
    }

    /// Fields written at each flush.
    ///
    /// Observations and actions come first unless `only_reward` is set.
    pub fn persisted_fields(&self, only_reward: bool) -> Vec<TraceField> {
        let mut fields = if only_reward {
            vec![]
        } else {
            vec![TraceField::Observations, TraceField::Actions]
        };
        match self {
            Self::Raw => {
                fields.push(TraceField::Rewards);
                fields.push(TraceField::EpisodesEndPoint);
            }
            Self::Returns => fields.push(TraceField::EpisodeReturns),
            Self::Steps => fields.push(TraceField::EpisodeSteps),
        }
        fields
    }

    /// Value of a finished episode used in periodic reports.
    pub fn episode_value(&self, rewards: &[f32]) -> f32 {
        match self {
            Self::Raw | Self::Returns => rewards.iter().sum(),
            Self::Steps => rewards.len() as f32,
        }
    }
}

impl fmt::Display for SaveType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SaveType {
    type Err = TraceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "raw" => Ok(Self::Raw),
            "returns" => Ok(Self::Returns),
            "steps" => Ok(Self::Steps),
            _ => Err(TraceError::UnknownSaveType(s.to_string())),
        }
    }
}

impl TryFrom<String> for SaveType {
    type Error = TraceError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<SaveType> for String {
    fn from(save_type: SaveType) -> Self {
        save_type.as_str().to_string()
    }
}

/// Statistics of per-episode values.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EpisodeStats {
    /// Mean.
    pub mean: f32,

    /// Maximum.
    pub max: f32,

    /// Minimum.
    pub min: f32,

    /// Population standard deviation.
    pub std: f32,
}

impl EpisodeStats {
    /// Computes the statistics, or `None` if `vs` is empty.
    pub fn compute(vs: &[f32]) -> Option<Self> {
        if vs.is_empty() {
            return None;
        }

        let n = vs.len() as f32;
        let mean = vs.iter().sum::<f32>() / n;
        let var = vs.iter().map(|v| (v - mean) * (v - mean)).sum::<f32>() / n;
        let max = *vs.iter().max_by(|x, y| x.total_cmp(y))?;
        let min = *vs.iter().min_by(|x, y| x.total_cmp(y))?;

        Some(Self {
            mean,
            max,
            min,
            std: var.sqrt(),
        })
    }
}

impl fmt::Display for EpisodeStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "mean = {:.3}, max = {:.3}, min = {:.3}, std = {:.3}",
            self.mean, self.max, self.min, self.std
        )
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_episode_value() {
        let rewards = [1f32, 2., 3.];
        assert_eq!(SaveType::Returns.episode_value(&rewards), 6.);
        assert_eq!(SaveType::Raw.episode_value(&rewards), 6.);
        assert_eq!(SaveType::Steps.episode_value(&rewards), 3.);
    }

    #[test]
    fn test_persisted_fields() {
        assert_eq!(
            SaveType::Raw.persisted_fields(false),
            vec![
                TraceField::Observations,
                TraceField::Actions,
                TraceField::Rewards,
                TraceField::EpisodesEndPoint
            ]
        );
        assert_eq!(
            SaveType::Returns.persisted_fields(true),
            vec![TraceField::EpisodeReturns]
        );
        assert_eq!(
            SaveType::Steps.persisted_fields(true),
            vec![TraceField::EpisodeSteps]
        );
    }

    #[test]
    fn test_parse_save_type() {
        assert_eq!("returns".parse::<SaveType>().unwrap(), SaveType::Returns);
        assert!(matches!(
            "full".parse::<SaveType>(),
            Err(TraceError::UnknownSaveType(_))
        ));
    }

    #[test]
    fn test_stats() {
        let stats = EpisodeStats::compute(&[2., 4., 4., 4., 5., 5., 7., 9.]).unwrap();
        assert_eq!(stats.mean, 5.);
        assert_eq!(stats.max, 9.);
        assert_eq!(stats.min, 2.);
        assert!((stats.std - 2.).abs() < 1e-6);
    }

    #[test]
    fn test_stats_of_empty_window() {
        assert_eq!(EpisodeStats::compute(&[]), None);
    }
}
