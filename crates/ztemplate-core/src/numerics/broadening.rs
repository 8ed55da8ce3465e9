use super::{SpectralError, ensure_length};
use serde::{Deserialize, Serialize};

/// What to do at a pixel whose intrinsic sampling is already broader than the
/// requested total broadening.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BroadeningPolicy {
    /// Fail with [`SpectralError::AlreadyBroader`].
    #[default]
    Reject,
    /// Apply no additional blur at that pixel.
    Clamp,
}

/// Gaussian sigma in wavelength units for a velocity dispersion.
pub fn velocity_sigma(wave: &[f64], velocity_kms: f64, c_kms: f64) -> Vec<f64> {
    wave.iter().map(|value| value * velocity_kms / c_kms).collect()
}

/// Element-wise `sqrt(target^2 - intrinsic^2)`.
pub fn net_sigma(
    target: &[f64],
    intrinsic: &[f64],
    policy: BroadeningPolicy,
) -> Result<Vec<f64>, SpectralError> {
    ensure_length("intrinsic sigma", target.len(), intrinsic.len())?;

    target
        .iter()
        .zip(intrinsic)
        .enumerate()
        .map(|(index, (target, intrinsic))| {
            let excess = target * target - intrinsic * intrinsic;
            if excess >= 0.0 {
                Ok(excess.sqrt())
            } else if matches!(policy, BroadeningPolicy::Clamp) {
                Ok(0.0)
            } else {
                Err(SpectralError::AlreadyBroader {
                    index,
                    target: *target,
                    intrinsic: *intrinsic,
                })
            }
        })
        .collect()
}

/// Net per-pixel blur that takes a source sampled with `intrinsic` width to a
/// total broadening of `velocity_kms`.
#[derive(Debug, Clone, PartialEq)]
pub struct BroadeningKernel {
    velocity_kms: f64,
    sigma: Vec<f64>,
    clamped_pixels: usize,
}

impl BroadeningKernel {
    pub fn for_velocity(
        wave: &[f64],
        intrinsic: &[f64],
        velocity_kms: f64,
        c_kms: f64,
        policy: BroadeningPolicy,
    ) -> Result<Self, SpectralError> {
        let target = velocity_sigma(wave, velocity_kms, c_kms);
        let sigma = net_sigma(&target, intrinsic, policy)?;
        let clamped_pixels = target
            .iter()
            .zip(intrinsic)
            .filter(|(target, intrinsic)| target < intrinsic)
            .count();

        Ok(Self {
            velocity_kms,
            sigma,
            clamped_pixels,
        })
    }

    pub fn velocity_kms(&self) -> f64 {
        self.velocity_kms
    }

    pub fn sigma(&self) -> &[f64] {
        &self.sigma
    }

    pub fn clamped_pixels(&self) -> usize {
        self.clamped_pixels
    }
}
