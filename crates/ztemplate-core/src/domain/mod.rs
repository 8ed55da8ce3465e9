pub mod errors;

pub use errors::{TemplateError, TemplateErrorCategory, TemplateResult};

use ndarray::ArrayD;
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ExecutionMode {
    #[default]
    Serial,
}

impl ExecutionMode {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Serial => "serial",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AxisType {
    Regular,
}

impl AxisType {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Regular => "regular",
        }
    }
}

impl Display for AxisType {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str((*self).as_str())
    }
}

/// One physical axis of a template grid: an ordered set of distinct values
/// plus the unit label and axis type written to the archive metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ParameterBaseline {
    name: String,
    unit: String,
    axis_type: AxisType,
    values: Vec<f64>,
}

impl ParameterBaseline {
    pub fn regular(
        name: impl Into<String>,
        unit: impl Into<String>,
        values: Vec<f64>,
    ) -> TemplateResult<Self> {
        let baseline = Self {
            name: name.into(),
            unit: unit.into(),
            axis_type: AxisType::Regular,
            values,
        };
        baseline.validate()?;
        Ok(baseline)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn unit(&self) -> &str {
        &self.unit
    }

    pub fn axis_type(&self) -> AxisType {
        self.axis_type
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub(crate) fn validate(&self) -> TemplateResult<()> {
        if self.name.trim().is_empty() {
            return Err(TemplateError::input_validation(
                "INPUT.BASELINE_NAME",
                "parameter baseline name must not be empty",
            ));
        }
        if self.values.is_empty() {
            return Err(TemplateError::input_validation(
                "INPUT.BASELINE_EMPTY",
                format!("parameter baseline '{}' has no values", self.name),
            ));
        }
        if let Some(index) = self.values.iter().position(|value| !value.is_finite()) {
            return Err(TemplateError::input_validation(
                "INPUT.BASELINE_VALUE",
                format!(
                    "parameter baseline '{}' has non-finite value at index {}",
                    self.name, index
                ),
            ));
        }

        let increasing = self.values.windows(2).all(|pair| pair[1] > pair[0]);
        let decreasing = self.values.windows(2).all(|pair| pair[1] < pair[0]);
        if !(increasing || decreasing) {
            return Err(TemplateError::input_validation(
                "INPUT.BASELINE_ORDER",
                format!(
                    "parameter baseline '{}' must hold distinct, monotonically ordered values",
                    self.name
                ),
            ));
        }
        Ok(())
    }
}

/// Typed archive header. Every field is required when decoding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ArchiveMetadata {
    pub par_names: Vec<String>,
    pub par_units: Vec<String>,
    pub par_axistype: Vec<AxisType>,
    pub coeff0: f64,
    pub coeff1: f64,
    pub fluxunit: String,
    pub filename: String,
}

impl ArchiveMetadata {
    pub fn for_baselines(
        baselines: &[ParameterBaseline],
        coeff0: f64,
        coeff1: f64,
        fluxunit: impl Into<String>,
        filename: impl Into<String>,
    ) -> Self {
        Self {
            par_names: baselines.iter().map(|b| b.name().to_string()).collect(),
            par_units: baselines.iter().map(|b| b.unit().to_string()).collect(),
            par_axistype: baselines.iter().map(ParameterBaseline::axis_type).collect(),
            coeff0,
            coeff1,
            fluxunit: fluxunit.into(),
            filename: filename.into(),
        }
    }

    /// `loglam[k] = coeff0 + coeff1 * k`
    pub fn loglam(&self, pixel: usize) -> f64 {
        self.coeff0 + self.coeff1 * pixel as f64
    }
}

/// N-D template flux indexed by `(baseline_1, .., baseline_n, pixel)`.
#[derive(Debug, Clone, PartialEq)]
pub struct TemplateArchive {
    flux: ArrayD<f32>,
    baselines: Vec<ParameterBaseline>,
    metadata: ArchiveMetadata,
}

impl TemplateArchive {
    pub fn new(
        flux: ArrayD<f32>,
        baselines: Vec<ParameterBaseline>,
        metadata: ArchiveMetadata,
    ) -> TemplateResult<Self> {
        for baseline in &baselines {
            baseline.validate()?;
        }

        let shape = flux.shape();
        if shape.len() != baselines.len() + 1 {
            return Err(TemplateError::input_validation(
                "INPUT.ARCHIVE_SHAPE",
                format!(
                    "archive flux has {} dimensions but {} baselines require {}",
                    shape.len(),
                    baselines.len(),
                    baselines.len() + 1
                ),
            ));
        }
        for (axis, baseline) in baselines.iter().enumerate() {
            if shape[axis] != baseline.len() {
                return Err(TemplateError::input_validation(
                    "INPUT.ARCHIVE_SHAPE",
                    format!(
                        "archive axis {} has length {} but baseline '{}' has {} values",
                        axis,
                        shape[axis],
                        baseline.name(),
                        baseline.len()
                    ),
                ));
            }
        }
        if shape[shape.len() - 1] == 0 {
            return Err(TemplateError::input_validation(
                "INPUT.ARCHIVE_SHAPE",
                "archive must hold at least one wavelength pixel",
            ));
        }

        let expected = ArchiveMetadata::for_baselines(
            &baselines,
            metadata.coeff0,
            metadata.coeff1,
            metadata.fluxunit.clone(),
            metadata.filename.clone(),
        );
        if expected.par_names != metadata.par_names
            || expected.par_units != metadata.par_units
            || expected.par_axistype != metadata.par_axistype
        {
            return Err(TemplateError::input_validation(
                "INPUT.ARCHIVE_METADATA",
                format!(
                    "archive metadata axes {:?} do not match baselines {:?}",
                    metadata.par_names, expected.par_names
                ),
            ));
        }
        if !metadata.coeff0.is_finite() || !metadata.coeff1.is_finite() || metadata.coeff1 <= 0.0
        {
            return Err(TemplateError::input_validation(
                "INPUT.ARCHIVE_METADATA",
                format!(
                    "archive log-wavelength coefficients must be finite with coeff1 > 0, got coeff0={} coeff1={}",
                    metadata.coeff0, metadata.coeff1
                ),
            ));
        }
        if metadata.filename.trim().is_empty() {
            return Err(TemplateError::input_validation(
                "INPUT.ARCHIVE_METADATA",
                "archive filename must not be empty",
            ));
        }

        Ok(Self {
            flux,
            baselines,
            metadata,
        })
    }

    pub fn flux(&self) -> &ArrayD<f32> {
        &self.flux
    }

    pub fn baselines(&self) -> &[ParameterBaseline] {
        &self.baselines
    }

    pub fn metadata(&self) -> &ArchiveMetadata {
        &self.metadata
    }

    pub fn pixel_count(&self) -> usize {
        self.flux.shape()[self.flux.ndim() - 1]
    }

    pub fn into_parts(self) -> (ArrayD<f32>, Vec<ParameterBaseline>, ArchiveMetadata) {
        (self.flux, self.baselines, self.metadata)
    }
}

#[cfg(test)]
mod tests {
    use super::{ArchiveMetadata, AxisType, ParameterBaseline, TemplateArchive};
    use crate::domain::TemplateErrorCategory;
    use ndarray::{ArrayD, IxDyn};

    fn baselines() -> Vec<ParameterBaseline> {
        vec![
            ParameterBaseline::regular("vdisp", "km/s", vec![25.0, 50.0])
                .expect("vdisp baseline should build"),
            ParameterBaseline::regular("log10-age", "log10-Gyr", vec![-2.5, -2.0, -1.5])
                .expect("age baseline should build"),
        ]
    }

    #[test]
    fn baseline_rejects_repeated_values() {
        let error = ParameterBaseline::regular("vdisp", "km/s", vec![25.0, 25.0])
            .expect_err("repeated values should fail");
        assert_eq!(error.placeholder(), "INPUT.BASELINE_ORDER");
    }

    #[test]
    fn metadata_mirrors_baseline_axes() {
        let metadata = ArchiveMetadata::for_baselines(&baselines(), 3.18, 2.5e-5, "flux", "a.nd");
        assert_eq!(metadata.par_names, vec!["vdisp", "log10-age"]);
        assert_eq!(metadata.par_units, vec!["km/s", "log10-Gyr"]);
        assert_eq!(metadata.par_axistype, vec![AxisType::Regular; 2]);
        assert!((metadata.loglam(4) - (3.18 + 4.0 * 2.5e-5)).abs() < 1e-15);
    }

    #[test]
    fn archive_rejects_leading_dimension_mismatch() {
        let baselines = baselines();
        let metadata = ArchiveMetadata::for_baselines(&baselines, 3.18, 2.5e-5, "flux", "a.nd");
        let flux = ArrayD::<f32>::zeros(IxDyn(&[2, 4, 5]));

        let error = TemplateArchive::new(flux, baselines, metadata)
            .expect_err("axis length mismatch should fail");
        assert_eq!(error.category(), TemplateErrorCategory::InputValidationError);
        assert_eq!(error.placeholder(), "INPUT.ARCHIVE_SHAPE");
    }

    #[test]
    fn archive_rejects_metadata_that_disagrees_with_baselines() {
        let baselines = baselines();
        let mut metadata =
            ArchiveMetadata::for_baselines(&baselines, 3.18, 2.5e-5, "flux", "a.nd");
        metadata.par_units[0] = "m/s".to_string();
        let flux = ArrayD::<f32>::zeros(IxDyn(&[2, 3, 5]));

        let error = TemplateArchive::new(flux, baselines, metadata)
            .expect_err("unit mismatch should fail");
        assert_eq!(error.placeholder(), "INPUT.ARCHIVE_METADATA");
    }

    #[test]
    fn archive_accepts_consistent_parts() {
        let baselines = baselines();
        let metadata = ArchiveMetadata::for_baselines(&baselines, 3.18, 2.5e-5, "flux", "a.nd");
        let flux = ArrayD::<f32>::zeros(IxDyn(&[2, 3, 5]));

        let archive =
            TemplateArchive::new(flux, baselines, metadata).expect("archive should build");
        assert_eq!(archive.pixel_count(), 5);
        assert_eq!(archive.baselines().len(), 2);
    }
}
