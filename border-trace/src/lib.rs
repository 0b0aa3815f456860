#![warn(missing_docs)]
//! Batched recording of reinforcement learning rollouts.
//!
//! This crate keeps rollout data (observations, actions, rewards and episode
//! boundaries) in memory, writes it periodically to numbered array files, and
//! reads the files back into contiguous arrays.
//!
//! # Core Components
//!
//! * [`TraceRecorder`] - Buffers steps, tracks episode boundaries and flushes batches
//! * [`TraceRecorderConfig`] - Batch size, report interval, [`SaveType`] and output format
//! * [`TraceReader`] - Concatenates the batches of each [`TraceField`]
//! * [`LegacyTraceReader`] - Reads the older per-episode layout
//!
//! The writer and the readers only share the file naming convention,
//! implemented by [`TraceFileName`]:
//!
//! ```text
//! rollout.trace.<field>.<run_id>.<process_id>.ep<step:09>.<ext>
//! ```
//!
//! # Basic Usage
//!
//! ```rust
//! # fn main() -> anyhow::Result<()> {
//! use border_trace::{get_recordings, TraceField, TraceRecorder, TraceRecorderConfig};
//! use ndarray::{arr0, arr1};
//!
//! let dir = tempdir::TempDir::new("trace")?;
//! let config = TraceRecorderConfig::default().directory(dir.path());
//! let mut recorder = TraceRecorder::build(config)?;
//!
//! for episode in 0..2 {
//!     recorder.record_reset(arr1(&[0f32, 0.]))?;
//!     for t in 0..3 {
//!         let act = arr0(1f32);
//!         let obs = arr1(&[episode as f32, t as f32]);
//!         recorder.record_step(act, obs, -1.0)?;
//!     }
//!     recorder.end_episode()?;
//! }
//! recorder.close()?;
//!
//! let fields = [TraceField::Observations, TraceField::EpisodesEndPoint];
//! let recordings = get_recordings(dir.path(), &fields)?;
//! assert_eq!(recordings[&TraceField::Observations].shape(), &[8, 2]);
//! let ends = recordings[&TraceField::EpisodesEndPoint].as_i64().unwrap();
//! assert_eq!(ends.as_slice().unwrap(), &[0, 3, 6]);
//! # Ok(())
//! # }
//! ```
mod aggregate;
mod array;
pub mod error;
mod legacy;
mod naming;
mod reader;
mod recorder;
mod run_id;

pub use aggregate::{EpisodeStats, SaveType};
pub use array::TraceArray;
pub use error::TraceError;
pub use legacy::{LegacyEpisode, LegacyTraceReader};
pub use naming::{ElemType, TraceField, TraceFileName, TraceFormat, FILE_IDENTIFIER, RUN_MARKER};
pub use reader::{get_recordings, TraceReader};
pub use recorder::{TraceBuffers, TraceRecorder, TraceRecorderConfig, TraceReport};
pub use run_id::{RunIdRegistry, RunNamespace};
