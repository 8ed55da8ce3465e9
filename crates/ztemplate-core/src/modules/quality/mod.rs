//! Data-quality screening of reduced flux / inverse-variance arrays.
//!
//! Rows are independent spectra, columns are pixels. Over-significant pixels
//! are only reported. Unphysically negative pixels are reported and their
//! neighbourhood is masked by zeroing the inverse variance. Rows are scanned
//! in order and each row sees the masking applied by earlier rows.

use crate::domain::{TemplateError, TemplateResult};
use crate::numerics::SpectralError;
use ndarray::{Array2, ArrayView2, s};
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};
use tracing::warn;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MaskScope {
    /// Zero the window in every row, whichever row flagged the column.
    #[default]
    AllRows,
    /// Zero the window only in the row that flagged it.
    FlaggedRow,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FluxCheckConfig {
    pub max_snr: f64,
    pub min_snr: f64,
    /// Flagged column `j` masks columns `[j - w, j + w)`.
    pub mask_half_width: usize,
    pub mask_scope: MaskScope,
}

impl Default for FluxCheckConfig {
    fn default() -> Self {
        Self {
            max_snr: 200.0,
            min_snr: -10.0,
            mask_half_width: 2,
            mask_scope: MaskScope::AllRows,
        }
    }
}

impl FluxCheckConfig {
    pub fn validate(&self) -> TemplateResult<()> {
        if !self.max_snr.is_finite() || !self.min_snr.is_finite() || self.min_snr >= self.max_snr
        {
            return Err(TemplateError::input_validation(
                "INPUT.CONFIG_VALUE",
                format!(
                    "quality thresholds must be finite with min_snr < max_snr, got min_snr={} max_snr={}",
                    self.min_snr, self.max_snr
                ),
            ));
        }
        if self.mask_half_width == 0 {
            return Err(TemplateError::input_validation(
                "INPUT.CONFIG_VALUE",
                "'quality.mask_half_width' must be at least 1 so flagged pixels are masked",
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QualityCondition {
    OverSignificant,
    NegativeFlux,
}

impl QualityCondition {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::OverSignificant => "over_significant",
            Self::NegativeFlux => "negative_flux",
        }
    }
}

impl Display for QualityCondition {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str((*self).as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct QualityEvent {
    pub row_index: usize,
    pub pixel_count: usize,
    pub condition: QualityCondition,
}

/// Receives quality events as they are detected. Implementations must not
/// block.
pub trait QualityObserver {
    fn observe(&mut self, event: &QualityEvent);
}

#[derive(Debug, Clone, Copy, Default)]
pub struct TracingObserver;

impl QualityObserver for TracingObserver {
    fn observe(&mut self, event: &QualityEvent) {
        match event.condition {
            QualityCondition::OverSignificant => warn!(
                row_index = event.row_index,
                pixel_count = event.pixel_count,
                condition = %event.condition,
                "row has pixels with S/N above threshold"
            ),
            QualityCondition::NegativeFlux => warn!(
                row_index = event.row_index,
                pixel_count = event.pixel_count,
                condition = %event.condition,
                "row has pixels with flux below negative noise threshold"
            ),
        }
    }
}

impl QualityObserver for Vec<QualityEvent> {
    fn observe(&mut self, event: &QualityEvent) {
        self.push(*event);
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FluxCheckReport {
    pub ivar: Array2<f64>,
    pub events: Vec<QualityEvent>,
}

impl FluxCheckReport {
    pub fn events_for(&self, condition: QualityCondition) -> impl Iterator<Item = &QualityEvent> {
        self.events
            .iter()
            .filter(move |event| event.condition == condition)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct FluxChecker {
    config: FluxCheckConfig,
}

impl FluxChecker {
    pub fn new(config: FluxCheckConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &FluxCheckConfig {
        &self.config
    }

    /// Screen with events sent to `tracing`.
    pub fn check(
        &self,
        flux: ArrayView2<'_, f64>,
        ivar: ArrayView2<'_, f64>,
    ) -> Result<FluxCheckReport, SpectralError> {
        self.check_with(flux, ivar, &mut TracingObserver)
    }

    pub fn check_with(
        &self,
        flux: ArrayView2<'_, f64>,
        ivar: ArrayView2<'_, f64>,
        observer: &mut dyn QualityObserver,
    ) -> Result<FluxCheckReport, SpectralError> {
        let (rows, columns) = flux.dim();
        let (ivar_rows, ivar_columns) = ivar.dim();
        if ivar_rows != rows {
            return Err(SpectralError::ShapeMismatch {
                what: "inverse variance rows",
                expected: rows,
                actual: ivar_rows,
            });
        }
        if ivar_columns != columns {
            return Err(SpectralError::ShapeMismatch {
                what: "inverse variance columns",
                expected: columns,
                actual: ivar_columns,
            });
        }

        let mut corrected = ivar.to_owned();
        let mut events = Vec::new();
        let mut emit = |event: QualityEvent| {
            observer.observe(&event);
            events.push(event);
        };

        for row in 0..rows {
            let snr: Vec<f64> = flux
                .row(row)
                .iter()
                .zip(corrected.row(row))
                .map(|(flux, ivar)| flux * ivar.sqrt())
                .collect();

            let over_significant = snr
                .iter()
                .filter(|value| value.abs() > self.config.max_snr)
                .count();
            if over_significant > 0 {
                emit(QualityEvent {
                    row_index: row,
                    pixel_count: over_significant,
                    condition: QualityCondition::OverSignificant,
                });
            }

            let negative: Vec<usize> = snr
                .iter()
                .enumerate()
                .filter(|(_, value)| **value < self.config.min_snr)
                .map(|(column, _)| column)
                .collect();
            if negative.is_empty() {
                continue;
            }
            emit(QualityEvent {
                row_index: row,
                pixel_count: negative.len(),
                condition: QualityCondition::NegativeFlux,
            });

            for column in negative {
                let lower = column.saturating_sub(self.config.mask_half_width);
                let upper = (column + self.config.mask_half_width).min(columns);
                match self.config.mask_scope {
                    MaskScope::AllRows => corrected.slice_mut(s![.., lower..upper]).fill(0.0),
                    MaskScope::FlaggedRow => {
                        corrected.slice_mut(s![row, lower..upper]).fill(0.0)
                    }
                }
            }
        }

        Ok(FluxCheckReport {
            ivar: corrected,
            events,
        })
    }
}

/// Screen `flux`/`ivar`, logging events through `tracing`, and return the
/// corrected inverse variance.
pub fn flux_check(
    flux: ArrayView2<'_, f64>,
    ivar: ArrayView2<'_, f64>,
    config: FluxCheckConfig,
) -> TemplateResult<Array2<f64>> {
    config.validate()?;
    Ok(FluxChecker::new(config).check(flux, ivar)?.ivar)
}
