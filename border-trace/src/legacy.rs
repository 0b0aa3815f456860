//! Reader of the older per-episode layout.
//!
//! In this layout a directory holds a manifest, which is the first file in
//! lexicographic order and is not read, followed by batch files. Each batch
//! file is a bincode-serialized `Vec<LegacyEpisode>`. Batch files are read in
//! lexicographic order.
//!
//! The layout is only read. New traces are written by
//! [`TraceRecorder`](crate::TraceRecorder) in the per-field layout.
use crate::{error::Result, TraceError};
use log::{debug, info};
use ndarray::ArrayD;
use serde::{Deserialize, Serialize};
use std::{
    fs::{self, File},
    io::BufReader,
    path::{Path, PathBuf},
};

/// One episode of the per-episode layout.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LegacyEpisode {
    /// Observations, absent in reward-only recordings.
    pub observations: Option<Vec<ArrayD<f32>>>,

    /// Actions, absent in reward-only recordings.
    pub actions: Option<Vec<ArrayD<f32>>>,

    /// Rewards.
    pub rewards: Vec<f32>,
}

impl LegacyEpisode {
    /// Number of steps.
    pub fn len(&self) -> usize {
        self.rewards.len()
    }

    /// Returns `true` if the episode has no step.
    pub fn is_empty(&self) -> bool {
        self.rewards.is_empty()
    }

    /// Sum of rewards.
    pub fn total_reward(&self) -> f32 {
        self.rewards.iter().sum()
    }
}

/// Reads episodes stored in the per-episode layout.
#[derive(Debug, Clone)]
pub struct LegacyTraceReader {
    directory: PathBuf,
    only_reward: bool,
}

impl LegacyTraceReader {
    /// Creates a reader of `directory`.
    pub fn new(directory: impl AsRef<Path>) -> Self {
        Self {
            directory: directory.as_ref().to_path_buf(),
            only_reward: false,
        }
    }

    /// If `true`, episodes without observations or actions are accepted.
    pub fn only_reward(mut self, only_reward: bool) -> Self {
        self.only_reward = only_reward;
        self
    }

    /// Batch files in reading order, without the manifest.
    pub fn batch_files(&self) -> Result<Vec<PathBuf>> {
        let mut files = vec![];
        for entry in fs::read_dir(&self.directory)? {
            let entry = entry?;
            if entry.file_type()?.is_file() {
                files.push(entry.path());
            }
        }
        files.sort();
        if let Some(manifest) = files.first() {
            debug!("Skip manifest {:?}", manifest);
        }
        Ok(files.into_iter().skip(1).collect())
    }

    /// Calls `callback` for every episode, in order.
    ///
    /// At most `max_episodes` episodes are visited if given. An error returned
    /// by `callback` stops the scan and is returned. Returns the number of
    /// visited episodes.
    pub fn scan_episodes<F>(
        &self,
        max_episodes: Option<usize>,
        mut callback: F,
    ) -> anyhow::Result<usize>
    where
        F: FnMut(&LegacyEpisode) -> anyhow::Result<()>,
    {
        self.visit(max_episodes, |episode| callback(&episode))
    }

    /// Returns the episodes, at most `max_episodes` if given.
    pub fn recorded_episodes(&self, max_episodes: Option<usize>) -> Result<Vec<LegacyEpisode>> {
        let mut episodes = vec![];
        self.visit::<TraceError, _>(max_episodes, |episode| {
            episodes.push(episode);
            Ok(())
        })?;
        Ok(episodes)
    }

    fn visit<E, F>(&self, max_episodes: Option<usize>, mut f: F) -> std::result::Result<usize, E>
    where
        E: From<TraceError>,
        F: FnMut(LegacyEpisode) -> std::result::Result<(), E>,
    {
        let max_episodes = max_episodes.unwrap_or(usize::MAX);
        let mut n_episodes = 0;

        for path in self.batch_files()? {
            if n_episodes >= max_episodes {
                break;
            }
            for episode in self.load_batch(&path)? {
                if n_episodes >= max_episodes {
                    break;
                }
                f(episode)?;
                n_episodes += 1;
            }
        }

        info!("Read {} episodes from {:?}", n_episodes, &self.directory);
        Ok(n_episodes)
    }

    fn load_batch(&self, path: &Path) -> Result<Vec<LegacyEpisode>> {
        let file = BufReader::new(File::open(path)?);
        let episodes: Vec<LegacyEpisode> =
            bincode::deserialize_from(file).map_err(|source| TraceError::Bincode {
                path: path.to_path_buf(),
                source,
            })?;

        if !self.only_reward {
            for episode in episodes.iter() {
                let missing = if episode.observations.is_none() {
                    Some("observations")
                } else if episode.actions.is_none() {
                    Some("actions")
                } else {
                    None
                };
                if let Some(key) = missing {
                    return Err(TraceError::MissingEpisodeKey {
                        key,
                        file: path.to_path_buf(),
                    });
                }
            }
        }
        debug!("Loaded {} episodes from {:?}", episodes.len(), path);
        Ok(episodes)
    }
}
