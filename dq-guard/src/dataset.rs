//! Read-only tabular data handed to validators.
//!
//! A [`Dataset`] wraps an Arrow [`RecordBatch`] together with an optional row
//! selection. Sampling narrows the selection instead of copying column data,
//! so a sampled dataset is as cheap to clone and share as the original.

use crate::prelude::*;
use arrow::array::{Array, ArrayRef};
use arrow::datatypes::SchemaRef;
use arrow::record_batch::RecordBatch;
use arrow::util::display::{ArrayFormatter, FormatOptions};
use rand::Rng;
use std::sync::Arc;

/// A composite key value: one canonical string per key column, `None` for null.
pub type KeyTuple = Vec<Option<String>>;

/// An immutable view over a record batch, optionally restricted to a subset
/// of its rows.
///
/// # Examples
///
/// ```rust
/// use arrow::array::{ArrayRef, Int64Array, StringArray};
/// use dq_guard::dataset::Dataset;
/// use std::sync::Arc;
///
/// let dataset = Dataset::try_from_columns(vec![
///     ("id", Arc::new(Int64Array::from(vec![1, 2, 3])) as ArrayRef),
///     ("email", Arc::new(StringArray::from(vec![Some("a@x.com"), None, Some("")])) as ArrayRef),
/// ])
/// .unwrap();
///
/// let email = dataset.column("email").unwrap();
/// assert_eq!(dataset.num_rows(), 3);
/// assert!(email.is_missing(1, false));
/// assert!(email.is_missing(2, true));
/// assert_eq!(email.value(0).unwrap().as_deref(), Some("a@x.com"));
/// ```
#[derive(Debug, Clone)]
pub struct Dataset {
    batch: RecordBatch,
    selection: Option<Arc<[usize]>>,
}

impl Dataset {
    /// Wraps a record batch; every row is visible.
    pub fn new(batch: RecordBatch) -> Self {
        Self {
            batch,
            selection: None,
        }
    }

    /// Builds a dataset from named arrays of equal length.
    pub fn try_from_columns<I, S>(columns: I) -> Result<Self>
    where
        I: IntoIterator<Item = (S, ArrayRef)>,
        S: AsRef<str>,
    {
        let batch = RecordBatch::try_from_iter(columns)?;
        Ok(Self::new(batch))
    }

    /// Concatenates batches sharing `schema` into one dataset.
    pub fn from_batches(schema: SchemaRef, batches: &[RecordBatch]) -> Result<Self> {
        let batch = arrow::compute::concat_batches(&schema, batches)?;
        Ok(Self::new(batch))
    }

    /// The underlying batch, ignoring any selection.
    pub fn batch(&self) -> &RecordBatch {
        &self.batch
    }

    /// The dataset's schema.
    pub fn schema(&self) -> SchemaRef {
        self.batch.schema()
    }

    /// Number of visible rows.
    pub fn num_rows(&self) -> usize {
        match &self.selection {
            Some(rows) => rows.len(),
            None => self.batch.num_rows(),
        }
    }

    /// Number of rows in the underlying batch, before any sampling.
    pub fn source_rows(&self) -> usize {
        self.batch.num_rows()
    }

    /// True when only a subset of the underlying rows is visible.
    pub fn is_sampled(&self) -> bool {
        self.selection.is_some()
    }

    /// The same data with every underlying row visible again.
    pub fn unsampled(&self) -> Dataset {
        Dataset::new(self.batch.clone())
    }

    /// Column names in schema order.
    pub fn column_names(&self) -> Vec<String> {
        self.batch
            .schema()
            .fields()
            .iter()
            .map(|field| field.name().clone())
            .collect()
    }

    /// True when the schema contains `name`.
    pub fn has_column(&self, name: &str) -> bool {
        self.batch.schema().index_of(name).is_ok()
    }

    /// A view over one column.
    ///
    /// # Errors
    ///
    /// [`DqError::ColumnNotFound`] when the column does not exist.
    pub fn column(&self, name: &str) -> Result<ColumnView<'_>> {
        let array = self
            .batch
            .column_by_name(name)
            .ok_or_else(|| DqError::ColumnNotFound {
                column: name.to_string(),
            })?;
        ColumnView::new(array, self.selection.as_deref())
    }

    /// Views over several columns, in the order given.
    pub fn columns<S: AsRef<str>>(&self, names: &[S]) -> Result<Vec<ColumnView<'_>>> {
        names.iter().map(|name| self.column(name.as_ref())).collect()
    }

    /// Names from `names` that the schema lacks.
    pub fn missing_columns<S: AsRef<str>>(&self, names: &[S]) -> Vec<String> {
        names
            .iter()
            .map(AsRef::as_ref)
            .filter(|name| !self.has_column(name))
            .map(str::to_string)
            .collect()
    }

    /// Draws `n` visible rows uniformly without replacement.
    ///
    /// Row order is preserved and sampling a sampled dataset samples the
    /// current selection. When `n` is at least [`num_rows`](Self::num_rows)
    /// the dataset is returned unchanged.
    pub fn sample<R: Rng + ?Sized>(&self, n: usize, rng: &mut R) -> Self {
        let visible = self.num_rows();
        if n >= visible {
            return self.clone();
        }

        let mut picked = rand::seq::index::sample(rng, visible, n).into_vec();
        picked.sort_unstable();

        let rows: Arc<[usize]> = match &self.selection {
            Some(current) => picked.into_iter().map(|i| current[i]).collect(),
            None => picked.into(),
        };

        Self {
            batch: self.batch.clone(),
            selection: Some(rows),
        }
    }
}

impl From<RecordBatch> for Dataset {
    fn from(batch: RecordBatch) -> Self {
        Self::new(batch)
    }
}

/// Row-indexed access to one column of a [`Dataset`].
///
/// Indices are positions among the dataset's visible rows.
pub struct ColumnView<'a> {
    array: &'a ArrayRef,
    selection: Option<&'a [usize]>,
    formatter: ArrayFormatter<'a>,
}

impl std::fmt::Debug for ColumnView<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ColumnView")
            .field("data_type", self.array.data_type())
            .field("len", &self.len())
            .finish()
    }
}

impl<'a> ColumnView<'a> {
    fn new(array: &'a ArrayRef, selection: Option<&'a [usize]>) -> Result<Self> {
        let formatter = ArrayFormatter::try_new(array.as_ref(), &FormatOptions::default())?;
        Ok(Self {
            array,
            selection,
            formatter,
        })
    }

    fn physical(&self, row: usize) -> usize {
        match self.selection {
            Some(rows) => rows[row],
            None => row,
        }
    }

    /// Number of visible rows.
    pub fn len(&self) -> usize {
        match self.selection {
            Some(rows) => rows.len(),
            None => self.array.len(),
        }
    }

    /// True when the view has no rows.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// True when the value at `row` is null.
    pub fn is_null(&self, row: usize) -> bool {
        self.array.is_null(self.physical(row))
    }

    /// Canonical string rendering of the value at `row`; `None` for null.
    pub fn value(&self, row: usize) -> Result<Option<String>> {
        let idx = self.physical(row);
        if self.array.is_null(idx) {
            return Ok(None);
        }
        Ok(Some(self.formatter.value(idx).try_to_string()?))
    }

    /// True for null and, when `empty_as_missing` is set, for values that
    /// render as an empty or whitespace-only string.
    pub fn is_missing(&self, row: usize, empty_as_missing: bool) -> bool {
        let idx = self.physical(row);
        if self.array.is_null(idx) {
            return true;
        }
        if !empty_as_missing {
            return false;
        }
        match self.formatter.value(idx).try_to_string() {
            Ok(rendered) => rendered.trim().is_empty(),
            Err(_) => false,
        }
    }
}

/// Reads the composite key at `row` across `columns`.
pub fn key_at(columns: &[ColumnView<'_>], row: usize) -> Result<KeyTuple> {
    columns.iter().map(|column| column.value(row)).collect()
}
