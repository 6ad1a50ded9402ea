//==================================================
// File: subscript/file.rs
//==================================================
// Author: ZobieLabs
// License: Duality Public License (DPL v1.0)
// Goal: File storage for file-mapped and associated variables
// Objective: Encode typed elements little-endian and read or write them at
//            element offsets through a file handle
//==================================================

use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use num_complex::{Complex32, Complex64};

use crate::interpreter::errors::{EngineError, EngineResult};
use crate::symbol::{ArrayData, NumericType};

pub(crate) fn element_size(ty: NumericType) -> EngineResult<usize> {
    ty.byte_size()
        .ok_or_else(|| EngineError::unsupported("file storage", ty))
}

fn bytes<const N: usize>(chunk: &[u8]) -> [u8; N] {
    let mut out = [0u8; N];
    out.copy_from_slice(chunk);
    out
}

/// Little-endian bytes of `len` elements of `data` starting at `from`.
pub fn encode(data: &ArrayData, from: usize, len: usize) -> EngineResult<Vec<u8>> {
    let range = from..from + len;
    Ok(match data {
        ArrayData::Byte(v) => v[range].to_vec(),
        ArrayData::Word(v) => v[range].iter().flat_map(|x| x.to_le_bytes()).collect(),
        ArrayData::Long(v) => v[range].iter().flat_map(|x| x.to_le_bytes()).collect(),
        ArrayData::Int64(v) => v[range].iter().flat_map(|x| x.to_le_bytes()).collect(),
        ArrayData::Float(v) => v[range].iter().flat_map(|x| x.to_le_bytes()).collect(),
        ArrayData::Double(v) => v[range].iter().flat_map(|x| x.to_le_bytes()).collect(),
        ArrayData::CFloat(v) => v[range]
            .iter()
            .flat_map(|c| c.re.to_le_bytes().into_iter().chain(c.im.to_le_bytes()))
            .collect(),
        ArrayData::CDouble(v) => v[range]
            .iter()
            .flat_map(|c| c.re.to_le_bytes().into_iter().chain(c.im.to_le_bytes()))
            .collect(),
        ArrayData::Text(_) => return Err(EngineError::unsupported("file storage", NumericType::Text)),
    })
}

pub fn decode(ty: NumericType, raw: &[u8]) -> EngineResult<ArrayData> {
    let size = element_size(ty)?;
    let chunks = raw.chunks_exact(size);
    Ok(match ty {
        NumericType::Byte => ArrayData::Byte(raw.to_vec()),
        NumericType::Word => ArrayData::Word(chunks.map(|c| i16::from_le_bytes(bytes(c))).collect()),
        NumericType::Long => ArrayData::Long(chunks.map(|c| i32::from_le_bytes(bytes(c))).collect()),
        NumericType::Int64 => ArrayData::Int64(chunks.map(|c| i64::from_le_bytes(bytes(c))).collect()),
        NumericType::Float => ArrayData::Float(chunks.map(|c| f32::from_le_bytes(bytes(c))).collect()),
        NumericType::Double => {
            ArrayData::Double(chunks.map(|c| f64::from_le_bytes(bytes(c))).collect())
        }
        NumericType::CFloat => ArrayData::CFloat(
            chunks
                .map(|c| {
                    Complex32::new(f32::from_le_bytes(bytes(&c[..4])), f32::from_le_bytes(bytes(&c[4..])))
                })
                .collect(),
        ),
        NumericType::CDouble => ArrayData::CDouble(
            chunks
                .map(|c| {
                    Complex64::new(f64::from_le_bytes(bytes(&c[..8])), f64::from_le_bytes(bytes(&c[8..])))
                })
                .collect(),
        ),
        NumericType::Text => return Err(EngineError::unsupported("file storage", ty)),
    })
}

/// Read `count` elements of `ty` starting `offset` bytes into the file.
pub fn read_elements(path: &Path, offset: u64, ty: NumericType, count: usize) -> EngineResult<ArrayData> {
    let size = element_size(ty)?;
    let io = |error: std::io::Error| EngineError::io(path.display(), error);
    let mut file = File::open(path).map_err(io)?;
    file.seek(SeekFrom::Start(offset)).map_err(io)?;
    let mut raw = vec![0u8; count * size];
    file.read_exact(&mut raw).map_err(io)?;
    decode(ty, &raw)
}

/// Whole elements of `element_bytes` stored after `offset`.
pub fn stored_elements(path: &Path, offset: u64, element_bytes: usize) -> EngineResult<usize> {
    let length = match std::fs::metadata(path) {
        Ok(meta) => meta.len(),
        Err(error) if error.kind() == std::io::ErrorKind::NotFound => 0,
        Err(error) => return Err(EngineError::io(path.display(), error)),
    };
    if element_bytes == 0 {
        return Ok(0);
    }
    Ok((length.saturating_sub(offset) / element_bytes as u64) as usize)
}

/// Write handle for element-addressed updates. Each write lands on disk
/// immediately, so a failure part way through leaves earlier elements
/// written.
#[derive(Debug)]
pub struct FileSink {
    path: PathBuf,
    file: File,
    base: u64,
    ty: NumericType,
    size: usize,
}

impl FileSink {
    pub fn open(path: &Path, base: u64, ty: NumericType) -> EngineResult<Self> {
        let size = element_size(ty)?;
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(path)
            .map_err(|error| EngineError::io(path.display(), error))?;
        Ok(Self {
            path: path.to_path_buf(),
            file,
            base,
            ty,
            size,
        })
    }

    pub fn ty(&self) -> NumericType {
        self.ty
    }

    /// Write `len` elements of `source` from `from` at element `at`,
    /// converting to the file's type when needed.
    pub fn write(&mut self, at: usize, source: &ArrayData, from: usize, len: usize) -> EngineResult<()> {
        let raw = if source.numeric_type() == self.ty {
            encode(source, from, len)?
        } else {
            let mut converted = ArrayData::zeros(self.ty, len);
            for k in 0..len {
                converted.copy_element(k, source, from + k);
            }
            encode(&converted, 0, len)?
        };
        let position = self.base + (at * self.size) as u64;
        let io = |error: std::io::Error| EngineError::io(self.path.display(), error);
        self.file.seek(SeekFrom::Start(position)).map_err(io)?;
        self.file.write_all(&raw).map_err(io)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn elements_round_trip_through_a_file_with_offset() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("data.bin");
        std::fs::write(&path, [0xAAu8; 4]).expect("header");
        let mut sink = FileSink::open(&path, 4, NumericType::Word).expect("open");
        sink.write(0, &ArrayData::Long(vec![1, -2, 70_000]), 0, 3)
            .expect("write");
        let back = read_elements(&path, 4, NumericType::Word, 3).expect("read");
        assert_eq!(back, ArrayData::Word(vec![1, -2, i16::MAX]));
        assert_eq!(stored_elements(&path, 4, 2).expect("count"), 3);
    }

    #[test]
    fn complex_values_keep_both_parts() {
        let data = ArrayData::CDouble(vec![Complex64::new(1.5, -2.0)]);
        let raw = encode(&data, 0, 1).expect("encode");
        assert_eq!(raw.len(), 16);
        assert_eq!(decode(NumericType::CDouble, &raw).expect("decode"), data);
    }

    #[test]
    fn short_files_report_io_errors() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("short.bin");
        std::fs::write(&path, [1u8, 2]).expect("write");
        assert!(matches!(
            read_elements(&path, 0, NumericType::Long, 1),
            Err(EngineError::Io { .. })
        ));
    }
}

//==================================================
// End of file
//==================================================
