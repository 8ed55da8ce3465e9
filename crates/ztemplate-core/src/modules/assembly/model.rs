use ndarray::{Array2, ArrayView1};

/// Model spectra converted to flux density per Angstrom and rescaled.
#[derive(Debug, Clone, PartialEq)]
pub struct ConvertedLibrary {
    pub(super) wave: Vec<f64>,
    pub(super) flam: Array2<f64>,
}

impl ConvertedLibrary {
    pub fn wave(&self) -> &[f64] {
        &self.wave
    }

    pub fn flam(&self) -> &Array2<f64> {
        &self.flam
    }

    pub fn model(&self, index: usize) -> ArrayView1<'_, f64> {
        self.flam.row(index)
    }
}

/// Library indices kept along the age axis, with their `log10(age/Gyr)`.
#[derive(Debug, Clone, PartialEq)]
pub struct SubsetSelection {
    pub(super) anchor: usize,
    pub(super) indices: Vec<usize>,
    pub(super) log_age: Vec<f64>,
}

impl SubsetSelection {
    pub fn anchor(&self) -> usize {
        self.anchor
    }

    pub fn indices(&self) -> &[usize] {
        &self.indices
    }

    pub fn log_age(&self) -> &[f64] {
        &self.log_age
    }

    pub fn len(&self) -> usize {
        self.indices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }
}

/// Boundaries and intrinsic resolution of the input model sampling.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceGrid {
    pub(super) wave: Vec<f64>,
    pub(super) wave_bound: Vec<f64>,
    pub(super) dloglam: f64,
    pub(super) intrinsic_sigma: Vec<f64>,
}

impl SourceGrid {
    pub fn wave(&self) -> &[f64] {
        &self.wave
    }

    pub fn wave_bound(&self) -> &[f64] {
        &self.wave_bound
    }

    /// Mean boundary spacing in `log10(wavelength)`.
    pub fn dloglam(&self) -> f64 {
        self.dloglam
    }

    pub fn intrinsic_sigma(&self) -> &[f64] {
        &self.intrinsic_sigma
    }
}
