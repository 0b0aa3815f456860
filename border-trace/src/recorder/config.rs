//! Configuration of [`TraceRecorder`](super::TraceRecorder).
use crate::{error::Result, SaveType, TraceFormat};
use serde::{Deserialize, Serialize};
use std::{
    fs::File,
    io::{BufReader, Write},
    path::{Path, PathBuf},
};

/// Configuration of [`TraceRecorder`](super::TraceRecorder).
#[derive(Debug, Deserialize, Serialize, PartialEq, Clone)]
pub struct TraceRecorderConfig {
    /// Directory where trace files are written.
    ///
    /// If `None`, a new directory is created under the temporary directory
    /// of the system when the recorder is built.
    pub directory: Option<PathBuf>,

    /// Number of buffered steps that triggers a flush at the end of an episode.
    ///
    /// If `None`, data is written only when the recorder is closed.
    pub batch_size: Option<usize>,

    /// Interval of periodic reports in environment steps.
    pub log_interval: Option<usize>,

    /// If `true`, observations and actions are not kept.
    pub only_reward: bool,

    /// Unit persisted at each flush.
    pub save_type: SaveType,

    /// Serialization format of the files.
    pub format: TraceFormat,
}

impl Default for TraceRecorderConfig {
    fn default() -> Self {
        Self {
            directory: None,
            batch_size: Some(10000),
            log_interval: None,
            only_reward: false,
            save_type: SaveType::Raw,
            format: TraceFormat::Npy,
        }
    }
}

impl TraceRecorderConfig {
    /// Sets the output directory.
    pub fn directory(mut self, directory: impl Into<PathBuf>) -> Self {
        self.directory = Some(directory.into());
        self
    }

    /// Sets the number of buffered steps triggering a flush. `None` disables
    /// automatic flushes.
    pub fn batch_size(mut self, batch_size: Option<usize>) -> Self {
        self.batch_size = batch_size;
        self
    }

    /// Sets the interval of periodic reports in environment steps.
    pub fn log_interval(mut self, log_interval: Option<usize>) -> Self {
        self.log_interval = log_interval;
        self
    }

    /// Keeps only rewards if `true`.
    pub fn only_reward(mut self, only_reward: bool) -> Self {
        self.only_reward = only_reward;
        self
    }

    /// Sets the unit persisted at each flush.
    pub fn save_type(mut self, save_type: SaveType) -> Self {
        self.save_type = save_type;
        self
    }

    /// Sets the serialization format.
    pub fn format(mut self, format: TraceFormat) -> Self {
        self.format = format;
        self
    }

    /// Constructs [`TraceRecorderConfig`] from YAML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let file = File::open(path)?;
        let rdr = BufReader::new(file);
        let b = serde_yaml::from_reader(rdr)?;
        Ok(b)
    }

    /// Saves [`TraceRecorderConfig`].
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let mut file = File::create(path)?;
        file.write_all(serde_yaml::to_string(&self)?.as_bytes())?;
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use anyhow::Result;
    use tempdir::TempDir;

    #[test]
    fn test_serde_trace_recorder_config() -> Result<()> {
        let config = TraceRecorderConfig::default()
            .directory("some/directory")
            .batch_size(Some(500))
            .log_interval(Some(100))
            .only_reward(true)
            .save_type(SaveType::Returns)
            .format(TraceFormat::Bincode);

        let dir = TempDir::new("trace_recorder_config")?;
        let path = dir.path().join("trace_recorder_config.yaml");

        config.save(&path)?;
        let config_ = TraceRecorderConfig::load(&path)?;
        assert_eq!(config, config_);

        let yaml = serde_yaml::to_string(&config)?;
        assert!(yaml.contains("save_type: returns"));
        assert!(yaml.contains("format: bincode"));

        Ok(())
    }

    #[test]
    fn test_unknown_save_type_is_rejected() {
        let yaml = "\
directory: ~
batch_size: 10
log_interval: ~
only_reward: false
save_type: full
format: npy
";
        let res = serde_yaml::from_str::<TraceRecorderConfig>(yaml);
        let err = res.unwrap_err().to_string();
        assert!(err.contains("Unknown save type: full"), "{}", err);
    }
}
