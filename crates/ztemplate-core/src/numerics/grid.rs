//! Pixel-center / pixel-boundary conversions and the uniform log-wavelength
//! grid that output templates are sampled on.

use super::SpectralError;

/// Convert `N` strictly increasing pixel centers into `N + 1` boundaries.
///
/// Interior boundaries are midpoints of adjacent centers. The two edge
/// boundaries repeat the spacing of the neighbouring interior boundaries, so
/// every center stays strictly inside its own boundary pair.
pub fn centers_to_boundaries(centers: &[f64]) -> Result<Vec<f64>, SpectralError> {
    if centers.len() < 2 {
        return Err(SpectralError::InvalidGrid {
            reason: format!("need at least 2 pixel centers, got {}", centers.len()),
        });
    }
    for (index, value) in centers.iter().copied().enumerate() {
        if !value.is_finite() {
            return Err(SpectralError::InvalidGrid {
                reason: format!("center {index} is not finite ({value})"),
            });
        }
        if index > 0 && value <= centers[index - 1] {
            return Err(SpectralError::InvalidGrid {
                reason: format!(
                    "centers must be strictly increasing, index {} has {} after {}",
                    index,
                    value,
                    centers[index - 1]
                ),
            });
        }
    }

    let interior: Vec<f64> = centers
        .windows(2)
        .map(|pair| 0.5 * (pair[0] + pair[1]))
        .collect();

    let (lo, hi) = if interior.len() >= 2 {
        let last = interior.len() - 1;
        (
            2.0 * interior[0] - interior[1],
            2.0 * interior[last] - interior[last - 1],
        )
    } else {
        let spacing = centers[1] - centers[0];
        (interior[0] - spacing, interior[0] + spacing)
    };

    let mut bounds = Vec::with_capacity(centers.len() + 1);
    bounds.push(lo);
    bounds.extend_from_slice(&interior);
    bounds.push(hi);

    // Midpoints of ulp-adjacent centers round onto one of them.
    for (index, center) in centers.iter().copied().enumerate() {
        let (lower, upper) = (bounds[index], bounds[index + 1]);
        if !(lower < center && center < upper) {
            return Err(SpectralError::InvalidGrid {
                reason: format!(
                    "pixel {index} collapses: center {center} is not inside [{lower}, {upper}]"
                ),
            });
        }
    }
    Ok(bounds)
}

/// Check that a boundary sequence delimits at least one pixel and that every
/// interval has positive, finite width.
pub fn validate_boundaries(bounds: &[f64]) -> Result<(), SpectralError> {
    if bounds.len() < 2 {
        return Err(SpectralError::DegenerateGrid {
            index: 0,
            lower: bounds.first().copied().unwrap_or(f64::NAN),
            upper: f64::NAN,
        });
    }
    for (index, pair) in bounds.windows(2).enumerate() {
        let (lower, upper) = (pair[0], pair[1]);
        if !lower.is_finite() || !upper.is_finite() || upper <= lower {
            return Err(SpectralError::DegenerateGrid {
                index,
                lower,
                upper,
            });
        }
    }
    Ok(())
}

pub fn pixel_widths(bounds: &[f64]) -> Vec<f64> {
    bounds.windows(2).map(|pair| pair[1] - pair[0]).collect()
}

/// Uniform grid in `log10(wavelength)`: `loglam[k] = coeff0 + coeff1 * k`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LogLambdaGrid {
    coeff0: f64,
    coeff1: f64,
    naxis1: usize,
}

impl LogLambdaGrid {
    pub fn new(coeff0: f64, coeff1: f64, naxis1: usize) -> Result<Self, SpectralError> {
        if !coeff0.is_finite() || !coeff1.is_finite() || coeff1 <= 0.0 {
            return Err(SpectralError::InvalidGrid {
                reason: format!(
                    "log-wavelength coefficients must be finite with coeff1 > 0, got coeff0={coeff0} coeff1={coeff1}"
                ),
            });
        }
        if naxis1 < 2 {
            return Err(SpectralError::InvalidGrid {
                reason: format!("log-wavelength grid needs at least 2 pixels, got {naxis1}"),
            });
        }
        Ok(Self {
            coeff0,
            coeff1,
            naxis1,
        })
    }

    /// Grid whose pixel zero sits on the largest multiple of `step` at or below
    /// `log10(wave_lo)` and which extends to at least `log10(wave_hi)`.
    pub fn covering(wave_lo: f64, wave_hi: f64, step: f64) -> Result<Self, SpectralError> {
        if !(wave_lo.is_finite() && wave_lo > 0.0 && wave_hi.is_finite() && wave_hi > wave_lo) {
            return Err(SpectralError::InvalidGrid {
                reason: format!(
                    "output wavelength bounds must satisfy 0 < lo < hi, got lo={wave_lo} hi={wave_hi}"
                ),
            });
        }
        if !step.is_finite() || step <= 0.0 {
            return Err(SpectralError::InvalidGrid {
                reason: format!("log-wavelength step must be finite and > 0, got {step}"),
            });
        }

        let coeff0 = step * (wave_lo.log10() / step).floor();
        let naxis1 = (1.0 + (wave_hi.log10() - coeff0) / step).ceil() as usize;
        Self::new(coeff0, step, naxis1)
    }

    pub fn coeff0(&self) -> f64 {
        self.coeff0
    }

    pub fn coeff1(&self) -> f64 {
        self.coeff1
    }

    pub fn naxis1(&self) -> usize {
        self.naxis1
    }

    pub fn loglam(&self) -> Vec<f64> {
        (0..self.naxis1)
            .map(|pixel| self.coeff0 + self.coeff1 * pixel as f64)
            .collect()
    }

    pub fn wavelengths(&self) -> Vec<f64> {
        self.loglam().into_iter().map(|value| 10f64.powf(value)).collect()
    }

    /// Pixel boundaries in Angstroms, computed in log space then exponentiated.
    pub fn wave_boundaries(&self) -> Result<Vec<f64>, SpectralError> {
        let logbound = centers_to_boundaries(&self.loglam())?;
        Ok(logbound.into_iter().map(|value| 10f64.powf(value)).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::{LogLambdaGrid, centers_to_boundaries, pixel_widths, validate_boundaries};
    use crate::numerics::SpectralError;

    #[test]
    fn uniform_centers_get_half_step_boundaries() {
        let bounds = centers_to_boundaries(&[1.0, 2.0, 3.0, 4.0]).expect("bounds should build");
        assert_eq!(bounds, vec![0.5, 1.5, 2.5, 3.5, 4.5]);
    }

    #[test]
    fn two_centers_extrapolate_with_their_spacing() {
        let bounds = centers_to_boundaries(&[10.0, 14.0]).expect("bounds should build");
        assert_eq!(bounds, vec![8.0, 12.0, 16.0]);
    }

    #[test]
    fn non_uniform_centers_stay_interior() {
        let centers = [1.0, 1.5, 3.0, 3.2, 7.0];
        let bounds = centers_to_boundaries(&centers).expect("bounds should build");

        assert_eq!(bounds.len(), centers.len() + 1);
        assert!(bounds.windows(2).all(|pair| pair[1] > pair[0]));
        for (index, center) in centers.iter().enumerate() {
            assert!(bounds[index] < *center && *center < bounds[index + 1]);
        }
        // lo = 2 * 1.25 - 2.25, hi = 2 * 5.1 - 3.1
        assert!((bounds[0] - 0.25).abs() < 1e-12);
        assert!((bounds[5] - 7.1).abs() < 1e-12);
    }

    #[test]
    fn short_or_unordered_centers_fail() {
        assert!(matches!(
            centers_to_boundaries(&[1.0]),
            Err(SpectralError::InvalidGrid { .. })
        ));
        assert!(matches!(
            centers_to_boundaries(&[]),
            Err(SpectralError::InvalidGrid { .. })
        ));
        assert!(matches!(
            centers_to_boundaries(&[1.0, 3.0, 3.0]),
            Err(SpectralError::InvalidGrid { .. })
        ));
        assert!(matches!(
            centers_to_boundaries(&[1.0, f64::NAN]),
            Err(SpectralError::InvalidGrid { .. })
        ));
    }

    #[test]
    fn ulp_adjacent_centers_fail_instead_of_collapsing() {
        let eps = f64::EPSILON;
        let centers = [1.0 + eps, 1.0 + 2.0 * eps, 1.0 + 3.0 * eps];
        match centers_to_boundaries(&centers) {
            Err(SpectralError::InvalidGrid { reason }) => {
                assert!(reason.contains("pixel"), "{reason}");
            }
            other => panic!("expected InvalidGrid, got {other:?}"),
        }
    }

    #[test]
    fn validate_boundaries_reports_first_bad_interval() {
        let error = validate_boundaries(&[0.0, 1.0, 1.0, 2.0]).expect_err("zero width fails");
        assert_eq!(
            error,
            SpectralError::DegenerateGrid {
                index: 1,
                lower: 1.0,
                upper: 1.0,
            }
        );
        assert!(validate_boundaries(&[0.0]).is_err());
        assert!(validate_boundaries(&[0.0, 0.5, 2.0]).is_ok());
        assert_eq!(pixel_widths(&[0.0, 0.5, 2.0]), vec![0.5, 1.5]);
    }

    #[test]
    fn covering_grid_anchors_on_step_multiple() {
        let step = 2.5e-5;
        let grid = LogLambdaGrid::covering(1525.0, 10850.0, step).expect("grid should build");

        let ratio = grid.coeff0() / step;
        assert!((ratio - ratio.round()).abs() < 1e-6);
        assert!(grid.coeff0() <= 1525f64.log10());
        assert!(1525f64.log10() - grid.coeff0() < step);

        let last = grid.loglam()[grid.naxis1() - 1];
        assert!(last >= 10850f64.log10() - 1e-12);
        assert!(last - 10850f64.log10() < step);
    }

    #[test]
    fn log_grid_boundaries_bracket_centers() {
        let grid = LogLambdaGrid::new(3.5, 1e-3, 6).expect("grid should build");
        let bounds = grid.wave_boundaries().expect("bounds should build");
        let centers = grid.wavelengths();

        assert_eq!(bounds.len(), 7);
        for (index, center) in centers.iter().enumerate() {
            assert!(bounds[index] < *center && *center < bounds[index + 1]);
        }
        assert!((bounds[0].log10() - (3.5 - 0.5e-3)).abs() < 1e-12);
    }

    #[test]
    fn covering_rejects_inverted_bounds() {
        assert!(LogLambdaGrid::covering(2000.0, 1000.0, 1e-4).is_err());
        assert!(LogLambdaGrid::covering(1000.0, 2000.0, 0.0).is_err());
    }
}
