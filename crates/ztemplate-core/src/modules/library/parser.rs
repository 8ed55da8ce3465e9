use super::model::ModelLibrary;
use crate::domain::{TemplateError, TemplateResult};
use ndarray::Array2;
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct ModelLibraryDocument {
    wave: Vec<f64>,
    flux: Vec<Vec<f64>>,
    age_gyr: Vec<f64>,
}

pub(super) fn parse_model_library(family: &str, source: &str) -> TemplateResult<ModelLibrary> {
    let document: ModelLibraryDocument = serde_json::from_str(source).map_err(|source| {
        TemplateError::input_validation(
            "INPUT.MODEL_LIBRARY_PARSE",
            format!("failed to parse model family '{}': {}", family, source),
        )
    })?;

    let models = document.flux.len();
    let pixels = document.wave.len();
    let mut values = Vec::with_capacity(models * pixels);
    for (index, row) in document.flux.into_iter().enumerate() {
        if row.len() != pixels {
            return Err(TemplateError::input_validation(
                "INPUT.MODEL_SHAPE",
                format!(
                    "model {} of family '{}' has {} flux values but {} wavelengths",
                    index,
                    family,
                    row.len(),
                    pixels
                ),
            ));
        }
        values.extend(row);
    }

    let flux = Array2::from_shape_vec((models, pixels), values).map_err(|source| {
        TemplateError::internal(
            "SYS.MODEL_SHAPE",
            format!("failed to shape model flux for '{}': {}", family, source),
        )
    })?;
    ModelLibrary::new(document.wave, flux, document.age_gyr)
}

pub(super) fn render_model_library(library: &ModelLibrary) -> TemplateResult<String> {
    let document = ModelLibraryDocument {
        wave: library.wave().to_vec(),
        flux: library.flux().rows().into_iter().map(|row| row.to_vec()).collect(),
        age_gyr: library.age_gyr().to_vec(),
    };
    serde_json::to_string(&document).map_err(|source| {
        TemplateError::internal(
            "SYS.MODEL_LIBRARY_RENDER",
            format!("failed to render model library: {}", source),
        )
    })
}
