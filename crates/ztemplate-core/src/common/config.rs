//! Typed configuration for a template-generation run.
//!
//! Loaded from JSON with every section optional (defaults reproduce the
//! high-resolution SSP template build) and unknown keys rejected. The model
//! data directory may come from the file or from `SSP_DATA_DIR`.

use super::constants::{
    ANGSTROM_PER_CM, C_CGS, C_KMS, DEFAULT_MODEL_FAMILY, LSUN_CGS, SSP_DATA_DIR_ENV,
};
use crate::domain::{TemplateError, TemplateResult};
use crate::modules::quality::FluxCheckConfig;
use crate::numerics::{BroadeningPolicy, DEFAULT_KERNEL_NSIGMA};

/// Largest `|flux_exponent|` for which `10^flux_exponent` is a finite,
/// non-zero `f64`.
pub const MAX_FLUX_EXPONENT: i32 = 300;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TemplateConfig {
    pub data_dir: Option<PathBuf>,
    pub model_family: String,
    pub constants: PhysicalConstants,
    /// Output flux is divided by `10^flux_exponent`.
    pub flux_exponent: i32,
    pub subset: SubsetConfig,
    pub output_grid: OutputGridConfig,
    pub broadening: BroadeningConfig,
    pub template: TemplateIdentity,
    pub quality: FluxCheckConfig,
}

impl Default for TemplateConfig {
    fn default() -> Self {
        Self {
            data_dir: None,
            model_family: DEFAULT_MODEL_FAMILY.to_string(),
            constants: PhysicalConstants::default(),
            flux_exponent: 12,
            subset: SubsetConfig::default(),
            output_grid: OutputGridConfig::default(),
            broadening: BroadeningConfig::default(),
            template: TemplateIdentity::default(),
            quality: FluxCheckConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PhysicalConstants {
    pub lsun_cgs: f64,
    pub c_cgs: f64,
    pub c_kms: f64,
    pub ang_per_cm: f64,
}

impl Default for PhysicalConstants {
    fn default() -> Self {
        Self {
            lsun_cgs: LSUN_CGS,
            c_cgs: C_CGS,
            c_kms: C_KMS,
            ang_per_cm: ANGSTROM_PER_CM,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SubsetConfig {
    pub target_log_age: f64,
    pub stride: usize,
    pub count: usize,
}

impl Default for SubsetConfig {
    fn default() -> Self {
        Self {
            target_log_age: -2.5,
            stride: 10,
            count: 15,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct OutputGridConfig {
    pub wave_lo: f64,
    pub wave_hi: f64,
    pub dloglam: f64,
}

impl Default for OutputGridConfig {
    fn default() -> Self {
        Self {
            wave_lo: 1525.0,
            wave_hi: 10850.0,
            dloglam: 2.5e-5,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BroadeningConfig {
    pub step_kms: f64,
    pub count: usize,
    pub n_sigma: f64,
    pub policy: BroadeningPolicy,
}

impl Default for BroadeningConfig {
    fn default() -> Self {
        Self {
            step_kms: 25.0,
            count: 32,
            n_sigma: DEFAULT_KERNEL_NSIGMA,
            policy: BroadeningPolicy::Reject,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TemplateIdentity {
    pub class: String,
    pub version: String,
}

impl Default for TemplateIdentity {
    fn default() -> Self {
        Self {
            class: "ssp_hires_galaxy".to_string(),
            version: "v002".to_string(),
        }
    }
}

impl TemplateConfig {
    pub fn load(path: impl AsRef<Path>) -> TemplateResult<Self> {
        let path = path.as_ref();
        let source = fs::read_to_string(path).map_err(|source| {
            TemplateError::io_system(
                "IO.CONFIG_READ",
                format!("failed to read config '{}': {}", path.display(), source),
            )
        })?;
        Self::from_json_str(&source).map_err(|error| {
            TemplateError::new(
                error.category(),
                error.placeholder(),
                format!("{} ({})", error.message(), path.display()),
            )
        })
    }

    pub fn from_json_str(source: &str) -> TemplateResult<Self> {
        let config: Self = serde_json::from_str(source).map_err(|source| {
            TemplateError::input_validation(
                "INPUT.CONFIG_PARSE",
                format!("failed to parse template config: {}", source),
            )
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Fill `data_dir` from `SSP_DATA_DIR` when the config leaves it unset.
    pub fn apply_env(&mut self) {
        self.apply_env_with(|key| std::env::var(key).ok());
    }

    pub fn apply_env_with(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if self.data_dir.is_some() {
            return;
        }
        self.data_dir = lookup(SSP_DATA_DIR_ENV)
            .filter(|value| !value.trim().is_empty())
            .map(PathBuf::from);
    }

    pub fn data_dir(&self) -> TemplateResult<&Path> {
        self.data_dir.as_deref().ok_or_else(|| {
            TemplateError::input_validation(
                "INPUT.DATA_DIR",
                format!(
                    "model data directory is not configured; set '{}' or 'data_dir'",
                    SSP_DATA_DIR_ENV
                ),
            )
        })
    }

    pub fn fluxunit(&self) -> String {
        format!("10^{} erg/s/Ang/M_sun_init", self.flux_exponent)
    }

    pub fn archive_filename(&self) -> String {
        format!(
            "ndArch-{}-{}.ndarch",
            self.template.class, self.template.version
        )
    }

    pub fn validate(&self) -> TemplateResult<()> {
        let positive = [
            ("constants.lsun_cgs", self.constants.lsun_cgs),
            ("constants.c_cgs", self.constants.c_cgs),
            ("constants.c_kms", self.constants.c_kms),
            ("constants.ang_per_cm", self.constants.ang_per_cm),
            ("output_grid.wave_lo", self.output_grid.wave_lo),
            ("output_grid.dloglam", self.output_grid.dloglam),
            ("broadening.step_kms", self.broadening.step_kms),
            ("broadening.n_sigma", self.broadening.n_sigma),
        ];
        for (name, value) in positive {
            if !value.is_finite() || value <= 0.0 {
                return Err(TemplateError::input_validation(
                    "INPUT.CONFIG_VALUE",
                    format!("'{}' must be finite and > 0, got {}", name, value),
                ));
            }
        }

        if !self.output_grid.wave_hi.is_finite()
            || self.output_grid.wave_hi <= self.output_grid.wave_lo
        {
            return Err(TemplateError::input_validation(
                "INPUT.CONFIG_VALUE",
                format!(
                    "'output_grid.wave_hi' ({}) must exceed 'output_grid.wave_lo' ({})",
                    self.output_grid.wave_hi, self.output_grid.wave_lo
                ),
            ));
        }
        if !self.subset.target_log_age.is_finite() {
            return Err(TemplateError::input_validation(
                "INPUT.CONFIG_VALUE",
                "'subset.target_log_age' must be finite",
            ));
        }

        if self.flux_exponent.unsigned_abs() > MAX_FLUX_EXPONENT.unsigned_abs() {
            return Err(TemplateError::input_validation(
                "INPUT.CONFIG_VALUE",
                format!(
                    "'flux_exponent' must lie in [-{MAX_FLUX_EXPONENT}, {MAX_FLUX_EXPONENT}], got {}",
                    self.flux_exponent
                ),
            ));
        }

        let counts = [
            ("subset.stride", self.subset.stride),
            ("subset.count", self.subset.count),
            ("broadening.count", self.broadening.count),
        ];
        for (name, value) in counts {
            if value == 0 {
                return Err(TemplateError::input_validation(
                    "INPUT.CONFIG_VALUE",
                    format!("'{}' must be at least 1", name),
                ));
            }
        }

        if self.model_family.trim().is_empty()
            || self.template.class.trim().is_empty()
            || self.template.version.trim().is_empty()
        {
            return Err(TemplateError::input_validation(
                "INPUT.CONFIG_VALUE",
                "'model_family', 'template.class' and 'template.version' must not be empty",
            ));
        }

        self.quality.validate()
    }
}
