//! File naming convention shared by the writer and the readers.
//!
//! Every file written by [`TraceRecorder`](crate::TraceRecorder) is named
//!
//! ```text
//! rollout.trace.<field>.<run_id>.<process_id>.ep<step:09>.<ext>
//! ```
//!
//! where `step` is the total number of environment steps recorded by the run
//! at the time of the flush. Because the step count is zero-padded, sorting the
//! file names of a run lexicographically gives the batches in the order they
//! were flushed.
use crate::{RunNamespace, TraceError};
use serde::{Deserialize, Serialize};
use std::{fmt, path::Path, str::FromStr};

/// Literal prefix distinguishing trace files from unrelated files.
pub const RUN_MARKER: &str = "rollout";

/// Prefix of every trace file name, `RUN_MARKER` followed by `.trace.`.
pub const FILE_IDENTIFIER: &str = "rollout.trace.";

/// Semantic field of a trace file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TraceField {
    /// Per-step rewards.
    Rewards,

    /// Observations, including the ones given at reset.
    Observations,

    /// Per-step actions.
    Actions,

    /// Cumulative step counts at episode boundaries, starting with 0.
    EpisodesEndPoint,

    /// Sum of rewards per episode.
    EpisodeReturns,

    /// Number of steps per episode.
    EpisodeSteps,
}

/// Element type of the arrays stored for a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElemType {
    /// 32-bit float.
    F32,

    /// 64-bit signed integer.
    I64,
}

impl TraceField {
    /// All the fields, in the order used when no field is specified.
    pub const ALL: [TraceField; 6] = [
        TraceField::Rewards,
        TraceField::Observations,
        TraceField::Actions,
        TraceField::EpisodesEndPoint,
        TraceField::EpisodeReturns,
        TraceField::EpisodeSteps,
    ];

    /// Name of the field used in file names.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Rewards => "rewards",
            Self::Observations => "observations",
            Self::Actions => "actions",
            Self::EpisodesEndPoint => "episodes_end_point",
            Self::EpisodeReturns => "episode_returns",
            Self::EpisodeSteps => "episode_steps",
        }
    }

    /// Element type of the arrays of this field.
    pub fn elem_type(&self) -> ElemType {
        match self {
            Self::EpisodesEndPoint | Self::EpisodeSteps => ElemType::I64,
            _ => ElemType::F32,
        }
    }
}

impl fmt::Display for TraceField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TraceField {
    type Err = TraceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .find(|field| field.as_str() == s)
            .copied()
            .ok_or_else(|| TraceError::UnknownField(s.to_string()))
    }
}

/// Serialization format of trace files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TraceFormat {
    /// Numpy `.npy` array files.
    Npy,

    /// Bincode serialization of [`TraceArray`](crate::TraceArray),
    /// for payloads not suited to `.npy`.
    Bincode,
}

impl Default for TraceFormat {
    fn default() -> Self {
        Self::Npy
    }
}

impl TraceFormat {
    /// File extension of the format, without the leading dot.
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Npy => "npy",
            Self::Bincode => "bincode",
        }
    }

    /// Returns the format of the given extension.
    pub fn from_extension(ext: &str) -> Result<Self, TraceError> {
        match ext {
            "npy" => Ok(Self::Npy),
            "bincode" => Ok(Self::Bincode),
            _ => Err(TraceError::UnknownFormat(ext.to_string())),
        }
    }
}

/// Parsed name of a trace file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TraceFileName {
    /// Field stored in the file.
    pub field: TraceField,

    /// Run which wrote the file.
    pub namespace: RunNamespace,

    /// Total step count of the run at the flush.
    pub step: usize,

    /// Serialization format.
    pub format: TraceFormat,
}

impl TraceFileName {
    /// Parses a file name, without directory.
    pub fn parse(name: &str) -> Result<Self, TraceError> {
        let invalid = || TraceError::InvalidFileName(name.to_string());
        let rest = name.strip_prefix(FILE_IDENTIFIER).ok_or_else(invalid)?;
        let parts: Vec<&str> = rest.split('.').collect();
        if parts.len() != 5 {
            return Err(invalid());
        }

        let field = parts[0].parse::<TraceField>().map_err(|_| invalid())?;
        let run_id = parts[1].parse::<usize>().map_err(|_| invalid())?;
        let process_id = parts[2].parse::<u32>().map_err(|_| invalid())?;
        let step = parts[3]
            .strip_prefix("ep")
            .filter(|s| !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit()))
            .ok_or_else(invalid)?
            .parse::<usize>()
            .map_err(|_| invalid())?;
        let format = TraceFormat::from_extension(parts[4]).map_err(|_| invalid())?;

        Ok(Self {
            field,
            namespace: RunNamespace { run_id, process_id },
            step,
            format,
        })
    }

    /// Parses the file name component of a path.
    pub fn from_path(path: &Path) -> Result<Self, TraceError> {
        let name = path
            .file_name()
            .and_then(|s| s.to_str())
            .ok_or_else(|| TraceError::InvalidFileName(format!("{:?}", path)))?;
        Self::parse(name)
    }
}

impl fmt::Display for TraceFileName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}{}.{}.{}.ep{:09}.{}",
            FILE_IDENTIFIER,
            self.field,
            self.namespace.run_id,
            self.namespace.process_id,
            self.step,
            self.format.extension()
        )
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn file_name(field: TraceField, step: usize) -> TraceFileName {
        TraceFileName {
            field,
            namespace: RunNamespace {
                run_id: 3,
                process_id: 4242,
            },
            step,
            format: TraceFormat::Npy,
        }
    }

    #[test]
    fn test_render_file_name() {
        let name = file_name(TraceField::EpisodesEndPoint, 1500).to_string();
        assert_eq!(
            name,
            "rollout.trace.episodes_end_point.3.4242.ep000001500.npy"
        );
        assert_eq!(
            TraceFileName::parse(&name).unwrap(),
            file_name(TraceField::EpisodesEndPoint, 1500)
        );
    }

    #[test]
    fn test_zero_padding_sorts_chronologically() {
        let mut names: Vec<String> = [1000, 5, 20_000, 300]
            .iter()
            .map(|&step| file_name(TraceField::Rewards, step).to_string())
            .collect();
        names.sort();
        let steps: Vec<usize> = names
            .iter()
            .map(|n| TraceFileName::parse(n).unwrap().step)
            .collect();
        assert_eq!(steps, vec![5, 300, 1000, 20_000]);
    }

    #[test]
    fn test_reject_unrelated_names() {
        for name in [
            "manifest.json",
            "rollout.trace.rewards.0.1.ep000000001",
            "rollout.trace.reward.0.1.ep000000001.npy",
            "rollout.trace.rewards.x.1.ep000000001.npy",
            "rollout.trace.rewards.0.1.000000001.npy",
            "rollout.trace.rewards.0.1.ep.npy",
            "rollout.trace.rewards.0.1.ep000000001.pkl",
            "other.trace.rewards.0.1.ep000000001.npy",
        ] {
            assert!(TraceFileName::parse(name).is_err(), "{}", name);
        }
    }

    #[test]
    fn test_field_from_str() {
        for field in TraceField::ALL.iter() {
            assert_eq!(field.as_str().parse::<TraceField>().unwrap(), *field);
        }
        assert!(matches!(
            "reward".parse::<TraceField>(),
            Err(TraceError::UnknownField(_))
        ));
    }
}
