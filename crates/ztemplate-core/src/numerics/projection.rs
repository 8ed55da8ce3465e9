//! Flux-conserving projection of a pixel-integrated spectrum onto a new set of
//! pixel boundaries, with optional per-source-pixel Gaussian blur.
//!
//! Each source pixel is treated as a unit-height box over its boundaries. With
//! a non-zero sigma the box is convolved with a Gaussian, truncated at
//! `n_sigma` beyond the box edges and renormalised so the footprint still
//! integrates to the pixel width. Matrix weights are the footprint integral
//! over each destination pixel divided by that pixel's width, so the matrix
//! maps flux densities to flux densities and `sum(dst * dst_width)` equals
//! `sum(src * src_width)` whenever every footprint lies inside the
//! destination range.

use super::grid::validate_boundaries;
use super::{SpectralError, ensure_length};
use faer::sparse::{SparseRowMat, Triplet};
use faer::{Col, ColRef};
use statrs::function::erf::erf;
use std::f64::consts::{FRAC_1_SQRT_2, PI};

pub const DEFAULT_KERNEL_NSIGMA: f64 = 5.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct KernelTruncation {
    n_sigma: f64,
}

impl KernelTruncation {
    pub fn new(n_sigma: f64) -> Result<Self, SpectralError> {
        if !n_sigma.is_finite() || n_sigma <= 0.0 {
            return Err(SpectralError::InvalidSigma {
                index: 0,
                value: n_sigma,
            });
        }
        Ok(Self { n_sigma })
    }

    pub fn n_sigma(&self) -> f64 {
        self.n_sigma
    }
}

impl Default for KernelTruncation {
    fn default() -> Self {
        Self {
            n_sigma: DEFAULT_KERNEL_NSIGMA,
        }
    }
}

/// Sparse destination-by-source weight matrix, stored row-major so each
/// destination pixel's contributing source pixels are contiguous.
#[derive(Debug, Clone)]
pub struct ProjectionMatrix {
    matrix: SparseRowMat<usize, f64>,
}

impl ProjectionMatrix {
    pub fn build(
        src_bound: &[f64],
        sigma: Option<&[f64]>,
        dst_bound: &[f64],
        truncation: KernelTruncation,
    ) -> Result<Self, SpectralError> {
        validate_boundaries(src_bound)?;
        validate_boundaries(dst_bound)?;

        let source_pixels = src_bound.len() - 1;
        let destination_pixels = dst_bound.len() - 1;
        if let Some(sigma) = sigma {
            ensure_length("blur sigma", source_pixels, sigma.len())?;
            if let Some(index) = sigma
                .iter()
                .position(|value| !value.is_finite() || *value < 0.0)
            {
                return Err(SpectralError::InvalidSigma {
                    index,
                    value: sigma[index],
                });
            }
        }

        let mut triplets: Vec<Triplet<usize, usize, f64>> = Vec::new();
        for source in 0..source_pixels {
            let footprint = Footprint::new(
                src_bound[source],
                src_bound[source + 1],
                sigma.map_or(0.0, |sigma| sigma[source]),
                truncation.n_sigma,
            );

            let first = dst_bound
                .partition_point(|bound| *bound <= footprint.support_lo)
                .saturating_sub(1);
            let end = dst_bound
                .partition_point(|bound| *bound < footprint.support_hi)
                .min(destination_pixels);

            for destination in first..end {
                let lower = dst_bound[destination].max(footprint.support_lo);
                let upper = dst_bound[destination + 1].min(footprint.support_hi);
                if upper <= lower {
                    continue;
                }
                let weight = footprint.integral(lower, upper)
                    / (dst_bound[destination + 1] - dst_bound[destination]);
                if weight > 0.0 {
                    triplets.push(Triplet::new(destination, source, weight));
                }
            }
        }

        let matrix =
            SparseRowMat::try_new_from_triplets(destination_pixels, source_pixels, &triplets)
                .map_err(|error| SpectralError::InvalidGrid {
                    reason: format!("failed to assemble projection matrix: {error:?}"),
                })?;
        Ok(Self { matrix })
    }

    pub fn source_pixels(&self) -> usize {
        self.matrix.ncols()
    }

    pub fn destination_pixels(&self) -> usize {
        self.matrix.nrows()
    }

    pub fn non_zero_count(&self) -> usize {
        self.matrix.parts().1.len()
    }

    pub fn apply(&self, src_flux: &[f64]) -> Result<Vec<f64>, SpectralError> {
        ensure_length("source flux", self.source_pixels(), src_flux.len())?;
        let projected: Col<f64> = self.matrix.as_ref() * ColRef::from_slice(src_flux);
        Ok((0..projected.nrows())
            .map(|destination| projected[destination])
            .collect())
    }

    /// Propagate inverse variance through the projection. A destination pixel
    /// with no coverage or touching any zero-precision source pixel gets 0.
    pub fn apply_ivar(&self, src_ivar: &[f64]) -> Result<Vec<f64>, SpectralError> {
        ensure_length(
            "source inverse variance",
            self.source_pixels(),
            src_ivar.len(),
        )?;
        let (symbolic, weights) = self.matrix.parts();
        let row_ptr = symbolic.row_ptr();
        let col_idx = symbolic.col_idx();

        Ok((0..self.destination_pixels())
            .map(|destination| {
                let mut variance = 0.0;
                for entry in row_ptr[destination]..row_ptr[destination + 1] {
                    let ivar = src_ivar[col_idx[entry]];
                    if !(ivar.is_finite() && ivar > 0.0) {
                        return 0.0;
                    }
                    variance += weights[entry] * weights[entry] / ivar;
                }
                if variance > 0.0 { 1.0 / variance } else { 0.0 }
            })
            .collect())
    }
}

/// Project `src_flux` (densities on `src_bound`) onto `dst_bound`.
pub fn project_flux(
    src_bound: &[f64],
    src_flux: &[f64],
    sigma: Option<&[f64]>,
    dst_bound: &[f64],
) -> Result<Vec<f64>, SpectralError> {
    ensure_length(
        "source flux",
        src_bound.len().saturating_sub(1),
        src_flux.len(),
    )?;
    ProjectionMatrix::build(src_bound, sigma, dst_bound, KernelTruncation::default())?
        .apply(src_flux)
}

struct Footprint {
    left: f64,
    right: f64,
    sigma: f64,
    support_lo: f64,
    support_hi: f64,
    scale: f64,
}

impl Footprint {
    fn new(left: f64, right: f64, sigma: f64, n_sigma: f64) -> Self {
        if sigma == 0.0 {
            return Self {
                left,
                right,
                sigma,
                support_lo: left,
                support_hi: right,
                scale: 1.0,
            };
        }

        let mut footprint = Self {
            left,
            right,
            sigma,
            support_lo: left - n_sigma * sigma,
            support_hi: right + n_sigma * sigma,
            scale: 1.0,
        };
        let retained = footprint.cumulative(footprint.support_hi)
            - footprint.cumulative(footprint.support_lo);
        footprint.scale = (right - left) / retained;
        footprint
    }

    fn integral(&self, lower: f64, upper: f64) -> f64 {
        if self.sigma == 0.0 {
            return upper - lower;
        }
        self.scale * (self.cumulative(upper) - self.cumulative(lower))
    }

    // Integral of the blurred unit box from -inf to x.
    fn cumulative(&self, x: f64) -> f64 {
        smoothed_ramp(x - self.left, self.sigma) - smoothed_ramp(x - self.right, self.sigma)
    }
}

// Antiderivative of the Gaussian CDF: u * Phi(u / s) + s * phi(u / s).
fn smoothed_ramp(u: f64, sigma: f64) -> f64 {
    let z = u / sigma;
    let cdf = 0.5 * (1.0 + erf(z * FRAC_1_SQRT_2));
    let pdf = (-0.5 * z * z).exp() / (2.0 * PI).sqrt();
    u * cdf + sigma * pdf
}
