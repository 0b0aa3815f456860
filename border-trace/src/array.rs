//! Arrays stored in trace files.
use crate::{error::Result, ElemType, TraceError, TraceFormat};
use log::trace;
use ndarray::{concatenate, stack, Array1, ArrayD, ArrayViewD, Axis, IxDyn, ShapeBuilder};
use npyz::WriterBuilder;
use serde::{Deserialize, Serialize};
use std::{
    fs::File,
    io::{self, BufReader, BufWriter},
    path::Path,
};

/// An array of one trace field. The leading axis is time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TraceArray {
    /// Float array, used for rewards, observations, actions and returns.
    F32(ArrayD<f32>),

    /// Integer array, used for episode boundaries and step counts.
    I64(ArrayD<i64>),
}

impl TraceArray {
    /// One-dimensional float array.
    pub fn from_f32_vec(v: Vec<f32>) -> Self {
        Self::F32(Array1::from(v).into_dyn())
    }

    /// One-dimensional integer array.
    pub fn from_i64_vec(v: Vec<i64>) -> Self {
        Self::I64(Array1::from(v).into_dyn())
    }

    /// Stacks per-step arrays along a new leading axis.
    ///
    /// All the arrays must have the same shape and `items` must not be empty.
    pub fn stack_f32(field: &str, items: &[ArrayD<f32>]) -> Result<Self> {
        let views: Vec<ArrayViewD<f32>> = items.iter().map(|a| a.view()).collect();
        let array = stack(Axis(0), &views).map_err(|e| TraceError::ShapeMismatch {
            field: field.to_string(),
            detail: e.to_string(),
        })?;
        Ok(Self::F32(array))
    }

    /// Concatenates arrays of the same element type along the leading axis.
    pub fn concatenate(field: &str, arrays: Vec<TraceArray>) -> Result<Self> {
        let mismatch = |detail: String| TraceError::ShapeMismatch {
            field: field.to_string(),
            detail,
        };

        match arrays.first() {
            None => Err(mismatch("no arrays to concatenate".to_string())),
            Some(TraceArray::F32(_)) => {
                let views = arrays
                    .iter()
                    .map(|a| a.as_f32().map(|a| a.view()))
                    .collect::<Option<Vec<_>>>()
                    .ok_or_else(|| mismatch("mixed element types".to_string()))?;
                let array = concatenate(Axis(0), &views).map_err(|e| mismatch(e.to_string()))?;
                Ok(Self::F32(array))
            }
            Some(TraceArray::I64(_)) => {
                let views = arrays
                    .iter()
                    .map(|a| a.as_i64().map(|a| a.view()))
                    .collect::<Option<Vec<_>>>()
                    .ok_or_else(|| mismatch("mixed element types".to_string()))?;
                let array = concatenate(Axis(0), &views).map_err(|e| mismatch(e.to_string()))?;
                Ok(Self::I64(array))
            }
        }
    }

    /// Length of the leading axis.
    pub fn len(&self) -> usize {
        self.shape().first().copied().unwrap_or(0)
    }

    /// Returns `true` if the leading axis is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Shape of the array.
    pub fn shape(&self) -> &[usize] {
        match self {
            Self::F32(a) => a.shape(),
            Self::I64(a) => a.shape(),
        }
    }

    /// Element type of the array.
    pub fn elem_type(&self) -> ElemType {
        match self {
            Self::F32(_) => ElemType::F32,
            Self::I64(_) => ElemType::I64,
        }
    }

    /// The float array, if this is one.
    pub fn as_f32(&self) -> Option<&ArrayD<f32>> {
        match self {
            Self::F32(a) => Some(a),
            _ => None,
        }
    }

    /// The integer array, if this is one.
    pub fn as_i64(&self) -> Option<&ArrayD<i64>> {
        match self {
            Self::I64(a) => Some(a),
            _ => None,
        }
    }

    /// Writes the array to `path`, overwriting any existing file.
    pub fn save(&self, path: &Path, format: TraceFormat) -> Result<()> {
        trace!("Save {:?} with shape {:?}", path, self.shape());
        match format {
            TraceFormat::Npy => {
                let res = match self {
                    Self::F32(a) => write_npy(path, a),
                    Self::I64(a) => write_npy(path, a),
                };
                res.map_err(|source| TraceError::Npy {
                    path: path.to_path_buf(),
                    source,
                })
            }
            TraceFormat::Bincode => {
                let file = BufWriter::new(File::create(path)?);
                bincode::serialize_into(file, self).map_err(|source| TraceError::Bincode {
                    path: path.to_path_buf(),
                    source,
                })
            }
        }
    }

    /// Reads an array of the given element type from `path`.
    pub fn load(path: &Path, format: TraceFormat, elem_type: ElemType) -> Result<Self> {
        trace!("Load {:?}", path);
        let array = match format {
            TraceFormat::Npy => {
                let res = match elem_type {
                    ElemType::F32 => read_npy::<f32>(path).map(Self::F32),
                    ElemType::I64 => read_npy::<i64>(path).map(Self::I64),
                };
                res.map_err(|source| TraceError::Npy {
                    path: path.to_path_buf(),
                    source,
                })?
            }
            TraceFormat::Bincode => {
                let file = BufReader::new(File::open(path)?);
                bincode::deserialize_from(file).map_err(|source| TraceError::Bincode {
                    path: path.to_path_buf(),
                    source,
                })?
            }
        };

        if array.elem_type() != elem_type {
            return Err(TraceError::ShapeMismatch {
                field: format!("{:?}", path),
                detail: format!("expected {:?}, found {:?}", elem_type, array.elem_type()),
            });
        }
        Ok(array)
    }
}

fn write_npy<T>(path: &Path, array: &ArrayD<T>) -> io::Result<()>
where
    T: npyz::AutoSerialize + Copy,
{
    let shape: Vec<u64> = array.shape().iter().map(|&d| d as u64).collect();
    let file = BufWriter::new(File::create(path)?);
    let mut writer = npyz::WriteOptions::<T>::new()
        .default_dtype()
        .shape(&shape)
        .writer(file)
        .begin_nd()?;
    // Logical (C) order, whatever the memory layout of the array.
    writer.extend(array.iter().copied())?;
    writer.finish()
}

fn read_npy<T>(path: &Path) -> io::Result<ArrayD<T>>
where
    T: npyz::Deserialize,
{
    let file = BufReader::new(File::open(path)?);
    let npy = npyz::NpyFile::new(file)?;
    let shape: Vec<usize> = npy.shape().iter().map(|&d| d as usize).collect();
    let fortran = matches!(npy.order(), npyz::Order::Fortran);
    let data = npy.into_vec::<T>()?;
    let array = if fortran {
        ArrayD::from_shape_vec(IxDyn(&shape).f(), data)
    } else {
        ArrayD::from_shape_vec(IxDyn(&shape), data)
    };
    array.map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
}

#[cfg(test)]
mod test {
    use super::*;
    use anyhow::Result;
    use ndarray::{arr1, arr2};
    use tempdir::TempDir;

    #[test]
    fn test_stack_and_concatenate() -> Result<()> {
        let steps = vec![
            arr1(&[1f32, 2.]).into_dyn(),
            arr1(&[3f32, 4.]).into_dyn(),
        ];
        let a = TraceArray::stack_f32("observations", &steps)?;
        assert_eq!(a.shape(), &[2, 2]);

        let b = TraceArray::stack_f32("observations", &[arr1(&[5f32, 6.]).into_dyn()])?;
        let c = TraceArray::concatenate("observations", vec![a, b])?;
        assert_eq!(c, TraceArray::F32(arr2(&[[1f32, 2.], [3., 4.], [5., 6.]]).into_dyn()));
        assert_eq!(c.len(), 3);
        Ok(())
    }

    #[test]
    fn test_stack_rejects_ragged_steps() {
        let steps = vec![arr1(&[1f32, 2.]).into_dyn(), arr1(&[3f32]).into_dyn()];
        assert!(matches!(
            TraceArray::stack_f32("observations", &steps),
            Err(TraceError::ShapeMismatch { .. })
        ));
    }

    #[test]
    fn test_concatenate_rejects_mixed_types() {
        let arrays = vec![
            TraceArray::from_f32_vec(vec![1.]),
            TraceArray::from_i64_vec(vec![1]),
        ];
        assert!(TraceArray::concatenate("rewards", arrays).is_err());
        assert!(TraceArray::concatenate("rewards", vec![]).is_err());
    }

    #[test]
    fn test_npy_file_keeps_shape() -> Result<()> {
        let dir = TempDir::new("trace_array")?;
        let path = dir.path().join("obs.npy");
        let obs = TraceArray::F32(arr2(&[[1f32, 2., 3.], [4., 5., 6.]]).into_dyn());
        obs.save(&path, TraceFormat::Npy)?;
        assert_eq!(TraceArray::load(&path, TraceFormat::Npy, ElemType::F32)?, obs);

        let path = dir.path().join("ends.npy");
        let ends = TraceArray::from_i64_vec(vec![0, 3, 5]);
        ends.save(&path, TraceFormat::Npy)?;
        assert_eq!(TraceArray::load(&path, TraceFormat::Npy, ElemType::I64)?, ends);
        Ok(())
    }

    #[test]
    fn test_transposed_array_is_written_in_logical_order() -> Result<()> {
        let dir = TempDir::new("trace_array")?;
        let path = dir.path().join("t.npy");
        let a = arr2(&[[1f32, 2.], [3., 4.]]).reversed_axes().into_dyn();
        TraceArray::F32(a.clone()).save(&path, TraceFormat::Npy)?;
        let loaded = TraceArray::load(&path, TraceFormat::Npy, ElemType::F32)?;
        assert_eq!(loaded.as_f32(), Some(&a));
        Ok(())
    }

    #[test]
    fn test_bincode_checks_element_type() -> Result<()> {
        let dir = TempDir::new("trace_array")?;
        let path = dir.path().join("r.bincode");
        TraceArray::from_f32_vec(vec![0.5, 1.5]).save(&path, TraceFormat::Bincode)?;
        assert!(TraceArray::load(&path, TraceFormat::Bincode, ElemType::F32).is_ok());
        assert!(TraceArray::load(&path, TraceFormat::Bincode, ElemType::I64).is_err());
        Ok(())
    }
}
