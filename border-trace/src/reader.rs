//! Reader of trace files written by [`TraceRecorder`](crate::TraceRecorder).
use crate::{error::Result, RunNamespace, TraceArray, TraceError, TraceField, TraceFileName};
use log::{debug, info};
use std::{
    collections::BTreeMap,
    fs,
    path::{Path, PathBuf},
};

/// Loads the batches in a directory and concatenates them per field.
///
/// Files are ordered by file name. For the files of one run this is the order
/// in which the batches were flushed. When several runs wrote to the same
/// directory, use [`TraceReader::with_namespace()`] to read one of them.
///
/// The directory must not be written to while it is read.
#[derive(Debug, Clone)]
pub struct TraceReader {
    directory: PathBuf,
    namespace: Option<RunNamespace>,
}

impl TraceReader {
    /// Creates a reader of all the trace files in `directory`.
    pub fn new(directory: impl AsRef<Path>) -> Self {
        Self {
            directory: directory.as_ref().to_path_buf(),
            namespace: None,
        }
    }

    /// Restricts the reader to the files of one run.
    pub fn with_namespace(mut self, namespace: RunNamespace) -> Self {
        self.namespace = Some(namespace);
        self
    }

    /// Directory of the reader.
    pub fn directory(&self) -> &Path {
        &self.directory
    }

    /// Lists the files of each field, sorted by file name.
    ///
    /// Files not following the naming convention are ignored. A field without
    /// files maps to an empty list.
    pub fn list_batches(
        &self,
        fields: &[TraceField],
    ) -> Result<BTreeMap<TraceField, Vec<PathBuf>>> {
        let mut names = vec![];
        for entry in fs::read_dir(&self.directory)? {
            let entry = entry?;
            let name = entry.file_name();
            let name = match name.to_str() {
                Some(name) => name.to_string(),
                None => continue,
            };
            match TraceFileName::parse(&name) {
                Ok(parsed) => {
                    if self.namespace.map_or(true, |ns| ns == parsed.namespace) {
                        names.push((name, parsed));
                    }
                }
                Err(_) => debug!("Skip {:?}", &name),
            }
        }
        names.sort_by(|a, b| a.0.cmp(&b.0));

        let batches = fields
            .iter()
            .map(|&field| {
                let paths = names
                    .iter()
                    .filter(|(_, parsed)| parsed.field == field)
                    .map(|(name, _)| self.directory.join(name))
                    .collect();
                (field, paths)
            })
            .collect();
        Ok(batches)
    }

    /// Loads the batches of each field and concatenates them along the leading axis.
    ///
    /// Fails with [`TraceError::NoDataForField`] if a field has no file.
    pub fn load_fields(
        &self,
        fields: &[TraceField],
    ) -> Result<BTreeMap<TraceField, TraceArray>> {
        let batches = self.list_batches(fields)?;
        let mut recordings = BTreeMap::new();

        for (field, paths) in batches.into_iter() {
            if paths.is_empty() {
                return Err(TraceError::NoDataForField(field, self.directory.clone()));
            }
            let arrays = paths
                .iter()
                .map(|path| {
                    let format = TraceFileName::from_path(path)?.format;
                    TraceArray::load(path, format, field.elem_type())
                })
                .collect::<Result<Vec<_>>>()?;
            let array = TraceArray::concatenate(field.as_str(), arrays)?;
            info!(
                "Loaded {} from {} files, shape = {:?}",
                field,
                paths.len(),
                array.shape()
            );
            recordings.insert(field, array);
        }

        Ok(recordings)
    }

    /// Fields having at least one file in the directory.
    pub fn available_fields(&self) -> Result<Vec<TraceField>> {
        Ok(self
            .list_batches(&TraceField::ALL)?
            .into_iter()
            .filter(|(_, paths)| !paths.is_empty())
            .map(|(field, _)| field)
            .collect())
    }
}

/// Loads the given fields of all the trace files in `directory`.
///
/// If `fields` is empty, every field in [`TraceField::ALL`] is loaded.
pub fn get_recordings(
    directory: impl AsRef<Path>,
    fields: &[TraceField],
) -> Result<BTreeMap<TraceField, TraceArray>> {
    let fields = if fields.is_empty() {
        &TraceField::ALL[..]
    } else {
        fields
    };
    TraceReader::new(directory).load_fields(fields)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{TraceFormat, TraceRecorder, TraceRecorderConfig};
    use anyhow::Result;
    use ndarray::arr1;
    use tempdir::TempDir;

    fn write(
        dir: &TempDir,
        field: TraceField,
        run_id: usize,
        step: usize,
        v: Vec<f32>,
    ) -> Result<()> {
        let name = TraceFileName {
            field,
            namespace: RunNamespace {
                run_id,
                process_id: 1,
            },
            step,
            format: TraceFormat::Npy,
        };
        TraceArray::from_f32_vec(v).save(&dir.path().join(name.to_string()), TraceFormat::Npy)?;
        Ok(())
    }

    #[test]
    fn test_list_batches_sorted_and_filtered() -> Result<()> {
        let dir = TempDir::new("reader")?;
        write(&dir, TraceField::Rewards, 0, 120, vec![2.])?;
        write(&dir, TraceField::Rewards, 0, 7, vec![1.])?;
        write(&dir, TraceField::EpisodeReturns, 0, 7, vec![1.])?;
        fs::write(dir.path().join("manifest.json"), "{}")?;
        fs::write(dir.path().join("rollout.trace.rewards.notes.txt"), "")?;

        let batches = TraceReader::new(dir.path())
            .list_batches(&[TraceField::Rewards, TraceField::Actions])?;
        let names: Vec<_> = batches[&TraceField::Rewards]
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(
            names,
            vec![
                "rollout.trace.rewards.0.1.ep000000007.npy",
                "rollout.trace.rewards.0.1.ep000000120.npy"
            ]
        );
        assert!(batches[&TraceField::Actions].is_empty());
        Ok(())
    }

    #[test]
    fn test_load_fields_concatenates_in_order() -> Result<()> {
        let dir = TempDir::new("reader")?;
        write(&dir, TraceField::Rewards, 0, 20, vec![3., 4.])?;
        write(&dir, TraceField::Rewards, 0, 10, vec![1., 2.])?;

        let recordings = TraceReader::new(dir.path()).load_fields(&[TraceField::Rewards])?;
        assert_eq!(
            recordings[&TraceField::Rewards],
            TraceArray::from_f32_vec(vec![1., 2., 3., 4.])
        );
        Ok(())
    }

    #[test]
    fn test_missing_field_fails() -> Result<()> {
        let dir = TempDir::new("reader")?;
        write(&dir, TraceField::Rewards, 0, 10, vec![1.])?;

        let res = TraceReader::new(dir.path())
            .load_fields(&[TraceField::Rewards, TraceField::Observations]);
        assert!(matches!(
            res,
            Err(TraceError::NoDataForField(TraceField::Observations, _))
        ));
        Ok(())
    }

    #[test]
    fn test_with_namespace() -> Result<()> {
        let dir = TempDir::new("reader")?;
        let config = TraceRecorderConfig::default().directory(dir.path());
        let registry = crate::RunIdRegistry::new();
        let mut recorders = vec![
            TraceRecorder::build_with_registry(config.clone(), &registry)?,
            TraceRecorder::build_with_registry(config, &registry)?,
        ];
        for (i, recorder) in recorders.iter_mut().enumerate() {
            recorder.record_step(arr1(&[0f32]), arr1(&[0f32]), i as f32)?;
            recorder.close()?;
        }

        let all = TraceReader::new(dir.path()).load_fields(&[TraceField::Rewards])?;
        assert_eq!(all[&TraceField::Rewards].len(), 2);

        let reader = TraceReader::new(dir.path()).with_namespace(recorders[1].namespace());
        let one = reader.load_fields(&[TraceField::Rewards])?;
        assert_eq!(one[&TraceField::Rewards], TraceArray::from_f32_vec(vec![1.]));
        assert_eq!(
            reader.available_fields()?,
            vec![
                TraceField::Rewards,
                TraceField::Observations,
                TraceField::Actions,
                TraceField::EpisodesEndPoint
            ]
        );
        Ok(())
    }
}
