mod model;

pub use model::{ConvertedLibrary, SourceGrid, SubsetSelection};

use super::library::ModelLibrary;
use super::{ArchiveWriter, ModelLibrarySource};
use crate::common::TemplateConfig;
use crate::domain::{
    ArchiveMetadata, ExecutionMode, ParameterBaseline, TemplateArchive, TemplateError,
    TemplateResult,
};
use crate::numerics::{
    BroadeningKernel, KernelTruncation, LogLambdaGrid, ProjectionMatrix, centers_to_boundaries,
    mean, pixel_widths,
};
use ndarray::{Array1, Array3, s};
use std::f64::consts::LN_10;
use std::path::PathBuf;
use tracing::{debug, info, warn};

pub const VDISP_AXIS: (&str, &str) = ("vdisp", "km/s");
pub const LOG_AGE_AXIS: (&str, &str) = ("log10-age", "log10-Gyr");

/// Builds a velocity-dispersion x age template grid from a model library.
///
/// Each stage is a separate method returning an immutable result so stages
/// can be run and inspected individually; [`TemplatePipeline::run`] chains
/// them. Any failure aborts the whole build.
#[derive(Debug, Clone, PartialEq)]
pub struct TemplatePipeline {
    config: TemplateConfig,
    execution_mode: ExecutionMode,
}

impl TemplatePipeline {
    pub fn new(config: TemplateConfig) -> TemplateResult<Self> {
        config.validate()?;
        Ok(Self {
            config,
            execution_mode: ExecutionMode::Serial,
        })
    }

    pub fn config(&self) -> &TemplateConfig {
        &self.config
    }

    pub fn execution_mode(&self) -> ExecutionMode {
        self.execution_mode
    }

    /// L_sun/Hz to `10^-exp` erg/s/Angstrom. The per-pixel factor divides by
    /// the squared wavelength before the power-of-ten rescaling is applied.
    pub fn convert_units(&self, library: &ModelLibrary) -> ConvertedLibrary {
        let constants = &self.config.constants;
        let fluxconv: Array1<f64> = library
            .wave()
            .iter()
            .map(|wave| constants.lsun_cgs * constants.c_cgs / (wave * wave * constants.ang_per_cm))
            .collect();

        let mut flam = library.flux() * &fluxconv;
        flam /= 10f64.powi(self.config.flux_exponent);

        ConvertedLibrary {
            wave: library.wave().to_vec(),
            flam,
        }
    }

    /// Anchor on the model whose `log10(age)` is nearest the target, then take
    /// every `stride`-th model from there.
    pub fn select_subset(&self, age_gyr: &[f64]) -> TemplateResult<SubsetSelection> {
        let subset = &self.config.subset;
        let anchor = age_gyr
            .iter()
            .map(|age| (age.log10() - subset.target_log_age).abs())
            .enumerate()
            .fold(None, |best: Option<(usize, f64)>, (index, distance)| match best {
                Some((_, best_distance)) if best_distance <= distance => best,
                _ => Some((index, distance)),
            })
            .map(|(index, _)| index)
            .ok_or_else(|| {
                TemplateError::input_validation("INPUT.SUBSET_RANGE", "model library has no ages")
            })?;

        let last = (subset.count - 1)
            .checked_mul(subset.stride)
            .and_then(|offset| offset.checked_add(anchor));
        if last.is_none_or(|last| last >= age_gyr.len()) {
            return Err(TemplateError::input_validation(
                "INPUT.SUBSET_RANGE",
                format!(
                    "subset of {} models (anchor {}, stride {}) exceeds library of {} models",
                    subset.count,
                    anchor,
                    subset.stride,
                    age_gyr.len()
                ),
            ));
        }

        let indices: Vec<usize> = (0..subset.count)
            .map(|step| anchor + subset.stride * step)
            .collect();
        let log_age = indices.iter().map(|index| age_gyr[*index].log10()).collect();
        Ok(SubsetSelection {
            anchor,
            indices,
            log_age,
        })
    }

    /// Boundaries are built in log10 space, where the model sampling is close
    /// to uniform. The intrinsic width uses the mean log spacing rather than
    /// each pixel's own width.
    pub fn source_grid(&self, wave: &[f64]) -> TemplateResult<SourceGrid> {
        let loglam: Vec<f64> = wave.iter().map(|value| value.log10()).collect();
        let logbound = centers_to_boundaries(&loglam)?;
        let dloglam = mean(&pixel_widths(&logbound)).ok_or_else(|| {
            TemplateError::internal("SYS.SOURCE_GRID", "source grid has no pixels")
        })?;

        let wave_bound = logbound.iter().map(|value| 10f64.powf(*value)).collect();
        let intrinsic_sigma = wave.iter().map(|value| dloglam * value * LN_10).collect();
        debug!(pixels = wave.len(), dloglam, "built source grid");

        Ok(SourceGrid {
            wave: wave.to_vec(),
            wave_bound,
            dloglam,
            intrinsic_sigma,
        })
    }

    pub fn output_grid(&self) -> TemplateResult<LogLambdaGrid> {
        let grid = &self.config.output_grid;
        let output = LogLambdaGrid::covering(grid.wave_lo, grid.wave_hi, grid.dloglam)?;
        debug!(
            coeff0 = output.coeff0(),
            coeff1 = output.coeff1(),
            naxis1 = output.naxis1(),
            "built output grid"
        );
        Ok(output)
    }

    /// `step * (1 + j)` km/s for each broadening step `j`.
    pub fn broadening_baseline(&self) -> Vec<f64> {
        let broadening = &self.config.broadening;
        (0..broadening.count)
            .map(|step| broadening.step_kms * (1 + step) as f64)
            .collect()
    }

    pub fn assemble(
        &self,
        converted: &ConvertedLibrary,
        subset: &SubsetSelection,
        source: &SourceGrid,
        output: &LogLambdaGrid,
    ) -> TemplateResult<TemplateArchive> {
        if converted.wave() != source.wave() {
            return Err(TemplateError::input_validation(
                "INPUT.SOURCE_GRID",
                "converted library and source grid use different wavelength axes",
            ));
        }
        if let Some(index) = subset
            .indices()
            .iter()
            .find(|index| **index >= converted.flam().nrows())
        {
            return Err(TemplateError::input_validation(
                "INPUT.SUBSET_RANGE",
                format!(
                    "subset index {} exceeds library of {} models",
                    index,
                    converted.flam().nrows()
                ),
            ));
        }

        let broadening = &self.config.broadening;
        let vdisp = self.broadening_baseline();
        let dst_bound = output.wave_boundaries()?;
        let truncation = KernelTruncation::new(broadening.n_sigma)?;
        let mut rebinned = Array3::<f64>::zeros((vdisp.len(), subset.len(), output.naxis1()));

        for (j_v, velocity) in vdisp.iter().copied().enumerate() {
            info!(
                step = j_v + 1,
                steps = vdisp.len(),
                velocity_kms = velocity,
                "broadening step"
            );
            let kernel = BroadeningKernel::for_velocity(
                source.wave(),
                source.intrinsic_sigma(),
                velocity,
                self.config.constants.c_kms,
                broadening.policy,
            )?;
            if kernel.clamped_pixels() > 0 {
                warn!(
                    velocity_kms = velocity,
                    clamped_pixels = kernel.clamped_pixels(),
                    "intrinsic sampling already broader than target, no extra blur applied"
                );
            }

            let matrix = ProjectionMatrix::build(
                source.wave_bound(),
                Some(kernel.sigma()),
                &dst_bound,
                truncation,
            )?;
            for (i_age, model) in subset.indices().iter().copied().enumerate() {
                let spectrum = converted.model(model);
                let projected = match spectrum.as_slice() {
                    Some(contiguous) => matrix.apply(contiguous)?,
                    None => matrix.apply(&spectrum.to_vec())?,
                };
                rebinned
                    .slice_mut(s![j_v, i_age, ..])
                    .assign(&Array1::from(projected));
            }
        }

        let baselines = vec![
            ParameterBaseline::regular(VDISP_AXIS.0, VDISP_AXIS.1, vdisp)?,
            ParameterBaseline::regular(LOG_AGE_AXIS.0, LOG_AGE_AXIS.1, subset.log_age().to_vec())?,
        ];
        let metadata = ArchiveMetadata::for_baselines(
            &baselines,
            output.coeff0(),
            output.coeff1(),
            self.config.fluxunit(),
            self.config.archive_filename(),
        );
        TemplateArchive::new(rebinned.mapv(|value| value as f32).into_dyn(), baselines, metadata)
    }

    pub fn run(&self, source: &dyn ModelLibrarySource) -> TemplateResult<TemplateArchive> {
        let library = source.load(&self.config.model_family)?;
        let converted = self.convert_units(&library);
        let subset = self.select_subset(library.age_gyr())?;
        let source_grid = self.source_grid(library.wave())?;
        let output = self.output_grid()?;
        info!(
            family = %self.config.model_family,
            models = subset.len(),
            anchor = subset.anchor(),
            naxis1 = output.naxis1(),
            mode = self.execution_mode.as_str(),
            "assembling templates"
        );
        self.assemble(&converted, &subset, &source_grid, &output)
    }

    /// Build the archive and hand it to `writer`. Nothing is written unless
    /// the whole build succeeds.
    pub fn run_and_write(
        &self,
        source: &dyn ModelLibrarySource,
        writer: &dyn ArchiveWriter,
    ) -> TemplateResult<PathBuf> {
        let archive = self.run(source)?;
        writer.write_archive(&archive)
    }
}

#[cfg(test)]
mod tests {
    use super::{ConvertedLibrary, TemplatePipeline};
    use crate::common::TemplateConfig;
    use crate::domain::{ExecutionMode, TemplateErrorCategory};
    use crate::modules::library::ModelLibrary;
    use ndarray::{Array2, ShapeBuilder, array};

    fn pipeline() -> TemplatePipeline {
        TemplatePipeline::new(TemplateConfig::default()).expect("pipeline")
    }

    #[test]
    fn unit_conversion_divides_by_squared_wavelength_then_rescales() {
        let library = ModelLibrary::new(
            vec![1000.0, 2000.0],
            array![[1.0, 1.0], [2.0, 0.5]],
            vec![0.1, 0.2],
        )
        .expect("library");

        let converted = pipeline().convert_units(&library);
        let at_1000 = 3.839e33 * 2.99792458e10 / (1000.0 * 1000.0 * 1.0e8) / 1.0e12;
        let flam = converted.flam();
        assert!((flam[[0, 0]] / at_1000 - 1.0).abs() < 1e-12);
        assert!((flam[[0, 1]] / (at_1000 / 4.0) - 1.0).abs() < 1e-12);
        assert!((flam[[1, 0]] / (2.0 * at_1000) - 1.0).abs() < 1e-12);
        assert!((flam[[1, 1]] / (at_1000 / 8.0) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn subset_anchors_on_nearest_log_age() {
        let ages: Vec<f64> = (0..30).map(|k| 10f64.powf(-3.0 + 0.1 * k as f64)).collect();
        let mut config = TemplateConfig::default();
        config.subset.stride = 2;
        config.subset.count = 3;
        let pipeline = TemplatePipeline::new(config).expect("pipeline");

        let subset = pipeline.select_subset(&ages).expect("subset");
        assert_eq!(subset.anchor(), 5);
        assert_eq!(subset.indices(), &[5, 7, 9]);
        for (actual, expected) in subset.log_age().iter().zip([-2.5, -2.3, -2.1]) {
            assert!((actual - expected).abs() < 1e-12);
        }
    }

    #[test]
    fn oversized_stride_is_a_range_error_not_an_overflow() {
        let ages: Vec<f64> = (0..30).map(|k| 10f64.powf(-3.0 + 0.1 * k as f64)).collect();
        let mut config = TemplateConfig::default();
        config.subset.stride = usize::MAX;
        config.subset.count = 3;
        let pipeline = TemplatePipeline::new(config).expect("pipeline");

        let error = pipeline
            .select_subset(&ages)
            .expect_err("stride overflow should be rejected");
        assert_eq!(error.placeholder(), "INPUT.SUBSET_RANGE");
    }

    #[test]
    fn pipeline_runs_serially() {
        assert_eq!(pipeline().execution_mode(), ExecutionMode::Serial);
        assert_eq!(pipeline().execution_mode().as_str(), "serial");
    }

    #[test]
    fn subset_beyond_library_fails() {
        let ages: Vec<f64> = (0..30).map(|k| 10f64.powf(-3.0 + 0.1 * k as f64)).collect();
        let error = pipeline()
            .select_subset(&ages)
            .expect_err("default stride 10 x 15 exceeds 30 models");
        assert_eq!(error.category(), TemplateErrorCategory::InputValidationError);
        assert_eq!(error.placeholder(), "INPUT.SUBSET_RANGE");
    }

    #[test]
    fn ties_pick_first_nearest_model() {
        let mut config = TemplateConfig::default();
        config.subset.count = 1;
        config.subset.target_log_age = 0.0;
        let pipeline = TemplatePipeline::new(config).expect("pipeline");

        let subset = pipeline.select_subset(&[0.1, 10.0, 1.0]).expect("subset");
        assert_eq!(subset.anchor(), 2);

        let subset = pipeline.select_subset(&[0.1, 10.0]).expect("subset");
        assert_eq!(subset.anchor(), 0);
    }

    #[test]
    fn source_grid_uses_mean_log_spacing() {
        let wave: Vec<f64> = (0..50).map(|k| 10f64.powf(3.5 + 1e-4 * k as f64)).collect();
        let grid = pipeline().source_grid(&wave).expect("source grid");

        assert!((grid.dloglam() - 1e-4).abs() < 1e-12);
        assert_eq!(grid.wave_bound().len(), 51);
        for (sigma, wave) in grid.intrinsic_sigma().iter().zip(&wave) {
            assert!((sigma / (1e-4 * wave * std::f64::consts::LN_10) - 1.0).abs() < 1e-6);
        }
    }

    #[test]
    fn broadening_baseline_starts_at_one_step() {
        let baseline = pipeline().broadening_baseline();
        assert_eq!(baseline.len(), 32);
        assert_eq!(baseline[0], 25.0);
        assert_eq!(baseline[31], 800.0);
    }

    #[test]
    fn assemble_rejects_mismatched_stage_results() {
        let pipeline = pipeline();
        let library = ModelLibrary::new(
            vec![4000.0, 4001.0, 4002.0],
            Array2::ones((1, 3)),
            vec![1.0],
        )
        .expect("library");
        let converted = pipeline.convert_units(&library);
        let source = pipeline
            .source_grid(&[4000.0, 4001.0, 4002.5])
            .expect("source grid");
        let mut config = TemplateConfig::default();
        config.subset.count = 1;
        let subset = TemplatePipeline::new(config)
            .expect("pipeline")
            .select_subset(library.age_gyr())
            .expect("subset");
        let output = pipeline.output_grid().expect("output grid");

        let error = pipeline
            .assemble(&converted, &subset, &source, &output)
            .expect_err("different wave axes should fail");
        assert_eq!(error.placeholder(), "INPUT.SOURCE_GRID");
    }

    #[test]
    fn column_major_models_assemble_like_row_major_models() {
        let wave: Vec<f64> = (0..=3000)
            .map(|k| 10f64.powf(3.55 + 5e-5 * k as f64))
            .collect();
        let ages: Vec<f64> = (0..8).map(|k| 10f64.powf(-3.0 + 0.25 * k as f64)).collect();
        let flux = Array2::from_shape_fn((ages.len(), wave.len()), |(model, pixel)| {
            (model + 1) as f64 * (1.0 + 0.1 * ((pixel % 7) as f64))
        });
        let library = ModelLibrary::new(wave, flux, ages).expect("library");

        let mut config = TemplateConfig::default();
        config.subset.stride = 2;
        config.subset.count = 3;
        config.output_grid.wave_lo = 3700.0;
        config.output_grid.wave_hi = 4700.0;
        config.output_grid.dloglam = 1e-4;
        config.broadening.step_kms = 50.0;
        config.broadening.count = 2;
        let pipeline = TemplatePipeline::new(config).expect("pipeline");

        let converted = pipeline.convert_units(&library);
        let mut column_major = Array2::zeros(converted.flam().raw_dim().f());
        column_major.assign(converted.flam());
        let strided = ConvertedLibrary {
            wave: converted.wave().to_vec(),
            flam: column_major,
        };
        assert!(strided.model(0).as_slice().is_none());

        let subset = pipeline.select_subset(library.age_gyr()).expect("subset");
        let source = pipeline.source_grid(library.wave()).expect("source grid");
        let output = pipeline.output_grid().expect("output grid");

        let contiguous = pipeline
            .assemble(&converted, &subset, &source, &output)
            .expect("row-major assembly");
        let from_strided = pipeline
            .assemble(&strided, &subset, &source, &output)
            .expect("column-major assembly");
        assert_eq!(contiguous.flux(), from_strided.flux());
    }
}
