use crate::domain::{TemplateError, TemplateResult};
use ndarray::{Array2, ArrayView1};

/// Raw model spectra: wavelength centers in Angstroms, luminosity density per
/// model in L_sun/Hz, and each model's age in Gyr.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelLibrary {
    wave: Vec<f64>,
    flux: Array2<f64>,
    age_gyr: Vec<f64>,
}

impl ModelLibrary {
    pub fn new(wave: Vec<f64>, flux: Array2<f64>, age_gyr: Vec<f64>) -> TemplateResult<Self> {
        if wave.len() < 2 {
            return Err(TemplateError::input_validation(
                "INPUT.MODEL_WAVE",
                format!("model library needs at least 2 wavelengths, got {}", wave.len()),
            ));
        }
        for (index, value) in wave.iter().copied().enumerate() {
            if !value.is_finite() || value <= 0.0 {
                return Err(TemplateError::input_validation(
                    "INPUT.MODEL_WAVE",
                    format!("model wavelength at index {index} must be finite and > 0, got {value}"),
                ));
            }
            if index > 0 && value <= wave[index - 1] {
                return Err(TemplateError::input_validation(
                    "INPUT.MODEL_WAVE",
                    format!(
                        "model wavelengths must be strictly increasing, index {} has {} after {}",
                        index,
                        value,
                        wave[index - 1]
                    ),
                ));
            }
        }

        let (models, pixels) = flux.dim();
        if pixels != wave.len() {
            return Err(TemplateError::input_validation(
                "INPUT.MODEL_SHAPE",
                format!(
                    "model flux has {} pixels per model but {} wavelengths",
                    pixels,
                    wave.len()
                ),
            ));
        }
        if models != age_gyr.len() {
            return Err(TemplateError::input_validation(
                "INPUT.MODEL_SHAPE",
                format!(
                    "model flux has {} models but {} ages",
                    models,
                    age_gyr.len()
                ),
            ));
        }
        if models == 0 {
            return Err(TemplateError::input_validation(
                "INPUT.MODEL_SHAPE",
                "model library holds no models",
            ));
        }
        if let Some(index) = age_gyr
            .iter()
            .position(|age| !age.is_finite() || *age <= 0.0)
        {
            return Err(TemplateError::input_validation(
                "INPUT.MODEL_AGE",
                format!(
                    "model age at index {} must be finite and > 0, got {}",
                    index, age_gyr[index]
                ),
            ));
        }

        Ok(Self {
            wave,
            flux,
            age_gyr,
        })
    }

    pub fn wave(&self) -> &[f64] {
        &self.wave
    }

    pub fn flux(&self) -> &Array2<f64> {
        &self.flux
    }

    pub fn model(&self, index: usize) -> ArrayView1<'_, f64> {
        self.flux.row(index)
    }

    pub fn age_gyr(&self) -> &[f64] {
        &self.age_gyr
    }

    pub fn model_count(&self) -> usize {
        self.age_gyr.len()
    }

    pub fn pixel_count(&self) -> usize {
        self.wave.len()
    }
}
