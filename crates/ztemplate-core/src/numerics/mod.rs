pub mod broadening;
pub mod grid;
pub mod projection;

pub use broadening::{BroadeningKernel, BroadeningPolicy, net_sigma, velocity_sigma};
pub use grid::{LogLambdaGrid, centers_to_boundaries, pixel_widths, validate_boundaries};
pub use projection::{
    DEFAULT_KERNEL_NSIGMA, KernelTruncation, ProjectionMatrix, project_flux,
};

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SpectralError {
    #[error("invalid wavelength axis: {reason}")]
    InvalidGrid { reason: String },
    #[error("length mismatch for {what}: expected {expected}, got {actual}")]
    ShapeMismatch {
        what: &'static str,
        expected: usize,
        actual: usize,
    },
    #[error(
        "degenerate boundary grid: interval {index} spans [{lower}, {upper}], boundaries must be finite and strictly increasing"
    )]
    DegenerateGrid { index: usize, lower: f64, upper: f64 },
    #[error(
        "requested broadening {target} is narrower than intrinsic sampling {intrinsic} at pixel index {index}"
    )]
    AlreadyBroader {
        index: usize,
        target: f64,
        intrinsic: f64,
    },
    #[error("broadening sigma must be finite and >= 0 at pixel index {index}, got {value}")]
    InvalidSigma { index: usize, value: f64 },
}

pub(crate) fn ensure_length(
    what: &'static str,
    expected: usize,
    actual: usize,
) -> Result<(), SpectralError> {
    if expected == actual {
        Ok(())
    } else {
        Err(SpectralError::ShapeMismatch {
            what,
            expected,
            actual,
        })
    }
}

pub(crate) fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}
