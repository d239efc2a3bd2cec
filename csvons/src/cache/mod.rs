//! Matrix sources - where checkers get record matrices from.
//!
//! Checkers never open files themselves; they ask a [`MatrixSource`] for a
//! stem. Three sources are provided:
//!
//! - [`FsMatrixSource`] re-reads the file on every request
//! - [`MatrixCache`] reads each stem once and hands out shared handles
//! - [`MemoryMatrixSource`] serves matrices registered in memory
//!
//! Matrices are immutable once loaded, so a cached handle can be shared by
//! every checker of a run.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use crate::error::{CsvError, CsvResult};
use crate::models::{Metadata, RecordMatrix};
use crate::parser::{read_stem, resolve_path};

/// Loads the record matrix of a stem.
pub trait MatrixSource {
    fn load(&self, stem: &str) -> CsvResult<Rc<RecordMatrix>>;
}

/// Reads from disk on every call.
#[derive(Debug, Clone)]
pub struct FsMatrixSource {
    metadata: Metadata,
}

impl FsMatrixSource {
    pub fn new(metadata: &Metadata) -> Self {
        Self {
            metadata: metadata.clone(),
        }
    }
}

impl MatrixSource for FsMatrixSource {
    fn load(&self, stem: &str) -> CsvResult<Rc<RecordMatrix>> {
        read_stem(&self.metadata, stem).map(Rc::new)
    }
}

/// Reads each stem once per run.
#[derive(Debug)]
pub struct MatrixCache<S = FsMatrixSource> {
    inner: S,
    matrices: RefCell<HashMap<String, Rc<RecordMatrix>>>,
}

impl MatrixCache<FsMatrixSource> {
    /// Cache in front of the filesystem.
    pub fn from_metadata(metadata: &Metadata) -> Self {
        Self::new(FsMatrixSource::new(metadata))
    }
}

impl<S: MatrixSource> MatrixCache<S> {
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            matrices: RefCell::new(HashMap::new()),
        }
    }

    /// Stems loaded so far, sorted.
    pub fn loaded_stems(&self) -> Vec<String> {
        let mut stems: Vec<String> = self.matrices.borrow().keys().cloned().collect();
        stems.sort();
        stems
    }
}

impl<S: MatrixSource> MatrixSource for MatrixCache<S> {
    fn load(&self, stem: &str) -> CsvResult<Rc<RecordMatrix>> {
        if let Some(matrix) = self.matrices.borrow().get(stem) {
            tracing::trace!(stem, "matrix cache hit");
            return Ok(Rc::clone(matrix));
        }

        let matrix = self.inner.load(stem)?;
        self.matrices
            .borrow_mut()
            .insert(stem.to_string(), Rc::clone(&matrix));
        Ok(matrix)
    }
}

/// Matrices registered by stem, no I/O.
#[derive(Debug, Clone, Default)]
pub struct MemoryMatrixSource {
    metadata: Metadata,
    matrices: HashMap<String, Rc<RecordMatrix>>,
}

impl MemoryMatrixSource {
    /// `metadata` only shapes the path reported for unknown stems.
    pub fn new(metadata: &Metadata) -> Self {
        Self {
            metadata: metadata.clone(),
            matrices: HashMap::new(),
        }
    }

    pub fn insert(&mut self, stem: impl Into<String>, matrix: RecordMatrix) {
        self.matrices.insert(stem.into(), Rc::new(matrix));
    }

    pub fn with(mut self, stem: impl Into<String>, matrix: RecordMatrix) -> Self {
        self.insert(stem, matrix);
        self
    }
}

impl MatrixSource for MemoryMatrixSource {
    fn load(&self, stem: &str) -> CsvResult<Rc<RecordMatrix>> {
        self.matrices
            .get(stem)
            .cloned()
            .ok_or_else(|| CsvError::IoError {
                path: resolve_path(&self.metadata, stem),
                source: std::io::Error::new(std::io::ErrorKind::NotFound, "stem not registered"),
            })
    }
}
