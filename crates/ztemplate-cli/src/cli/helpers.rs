use super::CliError;
use anyhow::Context;
use ndarray::Array2;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use ztemplate_core::common::TemplateConfig;
use ztemplate_core::domain::{ArchiveMetadata, ParameterBaseline, TemplateError};
use ztemplate_core::modules::QualityEvent;

/// Input accepted by `check`: row-major flux and inverse variance.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub(super) struct CheckDocument {
    pub(super) flux: Vec<Vec<f64>>,
    pub(super) ivar: Vec<Vec<f64>>,
}

#[derive(Debug, Serialize)]
pub(super) struct CheckReportDocument {
    pub(super) ivar: Vec<Vec<f64>>,
    pub(super) events: Vec<QualityEvent>,
    pub(super) masked_pixels: usize,
}

#[derive(Debug, Serialize)]
pub(super) struct InspectSummary<'a> {
    pub(super) shape: &'a [usize],
    pub(super) baselines: &'a [ParameterBaseline],
    pub(super) metadata: &'a ArchiveMetadata,
}

pub(super) fn load_config(path: Option<&Path>) -> Result<TemplateConfig, CliError> {
    match path {
        Some(path) => TemplateConfig::load(path).map_err(CliError::Compute),
        None => Ok(TemplateConfig::default()),
    }
}

pub(super) fn read_check_document(path: &Path) -> Result<CheckDocument, CliError> {
    let source = fs::read_to_string(path)
        .with_context(|| format!("failed to read check input '{}'", path.display()))?;
    serde_json::from_str(&source).map_err(|source| {
        CliError::Compute(TemplateError::input_validation(
            "INPUT.CHECK_DOCUMENT",
            format!("failed to parse check input '{}': {}", path.display(), source),
        ))
    })
}

pub(super) fn rows_to_array(name: &str, rows: Vec<Vec<f64>>) -> Result<Array2<f64>, CliError> {
    let columns = rows.first().map_or(0, Vec::len);
    if let Some(row) = rows.iter().position(|row| row.len() != columns) {
        return Err(CliError::Compute(TemplateError::input_validation(
            "INPUT.CHECK_SHAPE",
            format!(
                "'{}' row {} has {} values, expected {}",
                name,
                row,
                rows[row].len(),
                columns
            ),
        )));
    }

    let shape = (rows.len(), columns);
    Array2::from_shape_vec(shape, rows.into_iter().flatten().collect()).map_err(|source| {
        CliError::Compute(TemplateError::input_validation(
            "INPUT.CHECK_SHAPE",
            format!("failed to shape '{}': {}", name, source),
        ))
    })
}

pub(super) fn array_to_rows(array: &Array2<f64>) -> Vec<Vec<f64>> {
    array.rows().into_iter().map(|row| row.to_vec()).collect()
}

pub(super) fn write_json_report<T: Serialize>(path: &Path, value: &T) -> Result<(), CliError> {
    let rendered =
        serde_json::to_string_pretty(value).context("failed to render JSON report")?;
    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create '{}'", parent.display()))?;
    }
    fs::write(path, format!("{}\n", rendered))
        .with_context(|| format!("failed to write report '{}'", path.display()))?;
    Ok(())
}
