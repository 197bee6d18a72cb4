use std::cell::Cell;

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

use crate::error::{Error, Result};
use crate::math::matrix::Matrix;

/// One step of a data source: inputs (one example per row) and their labels.
#[derive(Debug, Clone, PartialEq)]
pub struct Batch {
    pub inputs: Matrix,
    pub labels: Vec<usize>,
}

impl Batch {
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }
}

/// Examples and their integer class labels, aligned by row.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Dataset {
    pub inputs: Matrix,
    pub labels: Vec<usize>,
}

impl Dataset {
    pub fn new(inputs: Matrix, labels: Vec<usize>) -> Result<Dataset> {
        if inputs.rows != labels.len() {
            return Err(Error::LabelCount { rows: inputs.rows, labels: labels.len() });
        }
        Ok(Dataset { inputs, labels })
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// The first `n` examples (all of them when `n` is larger).
    pub fn truncate(&self, n: usize) -> Dataset {
        let n = n.min(self.len());
        Dataset {
            inputs: self.inputs.head(n),
            labels: self.labels[..n].to_vec(),
        }
    }

    pub fn select(&self, indices: &[usize]) -> Dataset {
        Dataset {
            inputs: self.inputs.select_rows(indices),
            labels: indices.iter().map(|&i| self.labels[i]).collect(),
        }
    }
}

/// Splits a dataset into fixed-size batches; only the last one may be shorter.
///
/// A loader is a restartable source: every `(&loader).into_iter()` walks the
/// whole dataset once. With `shuffled`, each traversal uses a fresh
/// permutation derived from the seed and the traversal count.
#[derive(Debug)]
pub struct DataLoader<'a> {
    dataset: &'a Dataset,
    batch_size: usize,
    shuffle_seed: Option<u64>,
    traversals: Cell<u64>,
}

impl<'a> DataLoader<'a> {
    pub fn new(dataset: &'a Dataset, batch_size: usize) -> Result<DataLoader<'a>> {
        if batch_size == 0 {
            return Err(Error::InvalidConfig("batch_size must be at least 1".to_owned()));
        }
        Ok(DataLoader { dataset, batch_size, shuffle_seed: None, traversals: Cell::new(0) })
    }

    pub fn shuffled(mut self, seed: u64) -> DataLoader<'a> {
        self.shuffle_seed = Some(seed);
        self
    }

    pub fn num_batches(&self) -> usize {
        (self.dataset.len() + self.batch_size - 1) / self.batch_size
    }

    fn order(&self) -> Vec<usize> {
        let mut order: Vec<usize> = (0..self.dataset.len()).collect();
        if let Some(seed) = self.shuffle_seed {
            let pass = self.traversals.get();
            self.traversals.set(pass + 1);
            let mut rng = StdRng::seed_from_u64(seed.wrapping_add(pass));
            order.shuffle(&mut rng);
        }
        order
    }
}

impl<'l, 'a> IntoIterator for &'l DataLoader<'a> {
    type Item = Batch;
    type IntoIter = Batches<'a>;

    fn into_iter(self) -> Batches<'a> {
        Batches {
            dataset: self.dataset,
            order: self.order(),
            batch_size: self.batch_size,
            pos: 0,
        }
    }
}

/// One traversal of a `DataLoader`.
#[derive(Debug)]
pub struct Batches<'a> {
    dataset: &'a Dataset,
    order: Vec<usize>,
    batch_size: usize,
    pos: usize,
}

impl Iterator for Batches<'_> {
    type Item = Batch;

    fn next(&mut self) -> Option<Batch> {
        if self.pos >= self.order.len() {
            return None;
        }
        let end = (self.pos + self.batch_size).min(self.order.len());
        let indices = &self.order[self.pos..end];
        self.pos = end;
        Some(Batch {
            inputs: self.dataset.inputs.select_rows(indices),
            labels: indices.iter().map(|&i| self.dataset.labels[i]).collect(),
        })
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = (self.order.len() - self.pos + self.batch_size - 1) / self.batch_size;
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for Batches<'_> {}
