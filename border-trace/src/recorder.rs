//! Buffered recorder of rollouts.
mod buffers;
mod config;
use crate::{
    error::Result, EpisodeStats, RunIdRegistry, RunNamespace, SaveType, TraceArray, TraceError,
    TraceFileName,
};
pub use buffers::TraceBuffers;
use chrono::Local;
pub use config::TraceRecorderConfig;
use log::{debug, info, trace, warn};
use ndarray::{Array, Dimension};
use std::{
    fs,
    path::{Path, PathBuf},
};

/// Periodic summary of the episodes finished since the previous report.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TraceReport {
    /// Total step count at the report.
    pub step: usize,

    /// Number of episodes summarized.
    pub n_episodes: usize,

    /// Statistics of the per-episode values, see [`SaveType::episode_value()`].
    pub stats: EpisodeStats,
}

/// Records rollouts and writes them to numbered batch files.
///
/// A driving loop calls [`TraceRecorder::record_reset()`] when the environment
/// is reset, [`TraceRecorder::record_step()`] for every environment step and
/// [`TraceRecorder::end_episode()`] when an episode finishes, then
/// [`TraceRecorder::close()`] at the end.
///
/// # Batches
///
/// Data is kept in memory in a [`TraceBuffers`]. When an episode ends and at
/// least `batch_size` steps have been buffered, the recorder flushes: every
/// field persisted under the configured [`SaveType`] is written to its own
/// file, named by [`TraceFileName`] with the total step count of the run, and
/// the buffers are replaced with empty ones. [`TraceRecorder::close()`] writes
/// whatever remains. A flush at the same total step count as the previous one,
/// as after a [`TraceRecorder::flush()`] in the middle of an episode, appends
/// to the files of that batch.
///
/// A failed write leaves the files already written for that batch on disk and
/// keeps the data in memory. Nothing is renamed or rolled back.
///
/// # Episode boundaries
///
/// `episodes_end_point` holds the total step count at the end of each episode.
/// The first batch of a run starts with `0`, so the concatenation of all the
/// batches has one more entry than the number of episodes.
///
/// # Example
///
/// ```rust
/// # fn main() -> anyhow::Result<()> {
/// use border_trace::{SaveType, TraceReader, TraceField, TraceRecorder, TraceRecorderConfig};
/// use ndarray::arr1;
///
/// let dir = tempdir::TempDir::new("trace")?;
/// let config = TraceRecorderConfig::default()
///     .directory(dir.path())
///     .batch_size(Some(2))
///     .save_type(SaveType::Raw);
/// let mut recorder = TraceRecorder::build(config)?;
///
/// recorder.record_reset(arr1(&[0f32, 0.]))?;
/// for t in 0..3 {
///     recorder.record_step(arr1(&[1f32]), arr1(&[t as f32, 1.]), 1.0)?;
/// }
/// recorder.end_episode()?;
/// recorder.close()?;
///
/// let recordings = TraceReader::new(dir.path()).load_fields(&[TraceField::Rewards])?;
/// assert_eq!(recordings[&TraceField::Rewards].len(), 3);
/// # Ok(())
/// # }
/// ```
pub struct TraceRecorder {
    config: TraceRecorderConfig,
    directory: PathBuf,
    namespace: RunNamespace,
    buffers: TraceBuffers,

    /// Rewards of the current episode.
    episode_rewards: Vec<f32>,

    /// Per-episode values since the last report.
    report_window: Vec<f32>,
    reports: Vec<TraceReport>,

    episode_id: usize,
    total_steps: usize,
    buffered_steps: usize,
    last_flush_step: Option<usize>,
    closed: bool,
}

impl TraceRecorder {
    /// Builds a recorder with a run id taken from [`RunIdRegistry::global()`].
    pub fn build(config: TraceRecorderConfig) -> Result<Self> {
        Self::build_with_registry(config, RunIdRegistry::global())
    }

    /// Builds a recorder with a run id taken from the given registry.
    ///
    /// The output directory is created if it does not exist.
    pub fn build_with_registry(
        config: TraceRecorderConfig,
        registry: &RunIdRegistry,
    ) -> Result<Self> {
        let directory = match &config.directory {
            Some(dir) => dir.clone(),
            None => std::env::temp_dir().join(format!(
                "border-trace.{}.{}",
                Local::now().format("%Y%m%d-%H%M%S%.6f"),
                std::process::id()
            )),
        };
        fs::create_dir_all(&directory)?;
        let namespace = registry.next_namespace();
        info!("Record traces of run {} in {:?}", namespace, &directory);

        Ok(Self {
            config,
            directory,
            namespace,
            buffers: TraceBuffers::first(),
            episode_rewards: vec![],
            report_window: vec![],
            reports: vec![],
            episode_id: 0,
            total_steps: 0,
            buffered_steps: 0,
            last_flush_step: None,
            closed: false,
        })
    }

    /// Records the observation given by a reset of the environment.
    ///
    /// If the current episode has steps, it is ended first as with
    /// [`TraceRecorder::end_episode()`].
    pub fn record_reset<D>(&mut self, obs: Array<f32, D>) -> Result<()>
    where
        D: Dimension,
    {
        self.ensure_open()?;
        if !self.episode_rewards.is_empty() {
            self.end_episode()?;
        }
        if !self.config.only_reward {
            self.buffers.observations.push(obs.into_dyn());
        }
        Ok(())
    }

    /// Records an environment step.
    pub fn record_step<D1, D2>(
        &mut self,
        act: Array<f32, D1>,
        obs: Array<f32, D2>,
        reward: f32,
    ) -> Result<()>
    where
        D1: Dimension,
        D2: Dimension,
    {
        self.ensure_open()?;
        if !self.config.only_reward {
            self.buffers.actions.push(act.into_dyn());
            self.buffers.observations.push(obs.into_dyn());
        }
        if self.config.save_type == SaveType::Raw {
            self.buffers.rewards.push(reward);
        }
        self.episode_rewards.push(reward);
        self.total_steps += 1;
        self.buffered_steps += 1;

        if let Some(interval) = self.report_interval() {
            if self.total_steps % interval == 0 {
                self.report();
            }
        }
        Ok(())
    }

    /// Ends the current episode.
    ///
    /// Does nothing if no step was recorded since the last boundary.
    /// Flushes if at least `batch_size` steps are buffered.
    pub fn end_episode(&mut self) -> Result<()> {
        self.ensure_open()?;
        if self.episode_rewards.is_empty() {
            debug!("end_episode() without steps in episode {}", self.episode_id);
            return Ok(());
        }
        self.close_episode();

        if let Some(batch_size) = self.config.batch_size {
            if self.buffered_steps >= batch_size {
                self.flush_buffers()?;
            }
        }
        Ok(())
    }

    /// Writes the buffered data and replaces the buffers with empty ones.
    ///
    /// Returns the paths of the written files.
    pub fn flush(&mut self) -> Result<Vec<PathBuf>> {
        self.ensure_open()?;
        self.flush_buffers()
    }

    /// Ends a pending episode, writes the remaining data and closes the recorder.
    ///
    /// Calling this method on a closed recorder does nothing.
    pub fn close(&mut self) -> Result<()> {
        if self.closed {
            return Ok(());
        }
        if !self.episode_rewards.is_empty() {
            self.close_episode();
        }
        self.flush_buffers()?;
        self.closed = true;
        info!("Wrote traces to {:?}", &self.directory);
        Ok(())
    }

    /// Namespace of the files written by this recorder.
    pub fn namespace(&self) -> RunNamespace {
        self.namespace
    }

    /// Output directory.
    pub fn directory(&self) -> &Path {
        &self.directory
    }

    /// Id of the current episode, which is the number of finished episodes.
    pub fn episode_id(&self) -> usize {
        self.episode_id
    }

    /// Total number of recorded steps.
    pub fn total_steps(&self) -> usize {
        self.total_steps
    }

    /// Returns `true` if the recorder has been closed.
    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Data buffered since the last flush.
    pub fn buffers(&self) -> &TraceBuffers {
        &self.buffers
    }

    /// Periodic reports computed so far.
    pub fn reports(&self) -> &[TraceReport] {
        &self.reports
    }

    /// Configuration of the recorder.
    pub fn config(&self) -> &TraceRecorderConfig {
        &self.config
    }

    fn ensure_open(&self) -> Result<()> {
        if self.closed {
            Err(TraceError::RecorderClosed)
        } else {
            Ok(())
        }
    }

    fn report_interval(&self) -> Option<usize> {
        self.config.log_interval.filter(|&i| i > 0)
    }

    fn close_episode(&mut self) {
        let rewards = std::mem::take(&mut self.episode_rewards);
        let save_type = self.config.save_type;
        match save_type {
            SaveType::Raw => {}
            SaveType::Returns => self
                .buffers
                .episode_returns
                .push(save_type.episode_value(&rewards)),
            SaveType::Steps => self.buffers.episode_steps.push(rewards.len() as i64),
        }
        if self.report_interval().is_some() {
            self.report_window.push(save_type.episode_value(&rewards));
        }
        self.buffers.episodes_end_point.push(self.total_steps as i64);
        trace!(
            "Episode {} ended at step {} after {} steps",
            self.episode_id,
            self.total_steps,
            rewards.len()
        );
        self.episode_id += 1;
    }

    fn report(&mut self) {
        match EpisodeStats::compute(&self.report_window) {
            None => debug!(
                "No episode finished before step {}, skip report",
                self.total_steps
            ),
            Some(stats) => {
                let report = TraceReport {
                    step: self.total_steps,
                    n_episodes: self.report_window.len(),
                    stats,
                };
                info!(
                    "Step {}, {} episodes ({}): {}",
                    report.step, report.n_episodes, self.config.save_type, stats
                );
                self.reports.push(report);
                self.report_window.clear();
            }
        }
    }

    fn flush_buffers(&mut self) -> Result<Vec<PathBuf>> {
        // Files are named by the total step count. A flush without new steps
        // appends to the batch already written at that step.
        let append = self.last_flush_step == Some(self.total_steps);
        let format = self.config.format;
        let mut paths = vec![];
        for field in self
            .config
            .save_type
            .persisted_fields(self.config.only_reward)
        {
            if let Some(array) = self.buffers.to_array(field)? {
                let name = TraceFileName {
                    field,
                    namespace: self.namespace,
                    step: self.total_steps,
                    format,
                };
                let path = self.directory.join(name.to_string());
                let array = if append && path.is_file() {
                    debug!("Append {} items to {:?}", array.len(), &path);
                    let written = TraceArray::load(&path, format, field.elem_type())?;
                    TraceArray::concatenate(field.as_str(), vec![written, array])?
                } else {
                    array
                };
                array.save(&path, format)?;
                paths.push(path);
            }
        }
        debug!(
            "Flushed {} files of {} steps at step {}",
            paths.len(),
            self.buffered_steps,
            self.total_steps
        );

        self.buffers = TraceBuffers::default();
        self.buffered_steps = 0;
        self.last_flush_step = Some(self.total_steps);
        Ok(paths)
    }
}

impl Drop for TraceRecorder {
    /// Closes the recorder if it has not been closed.
    fn drop(&mut self) {
        if !self.closed {
            if let Err(e) = self.close() {
                warn!("Failed to close trace recorder of run {}: {}", self.namespace, e);
            }
        }
    }
}
