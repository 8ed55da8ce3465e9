mod model;
mod parser;

pub use model::ModelLibrary;

use super::ModelLibrarySource;
use super::serialization::write_text_artifact;
use crate::domain::{TemplateError, TemplateResult};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

pub const MODEL_LIBRARY_EXTENSION: &str = "json";

/// Model families stored as `<base_dir>/<family>.json`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JsonModelLibrary {
    base_dir: PathBuf,
}

impl JsonModelLibrary {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    pub fn family_path(&self, family: &str) -> PathBuf {
        self.base_dir
            .join(format!("{}.{}", family, MODEL_LIBRARY_EXTENSION))
    }

    /// Store `library` under `family`, creating the base directory if needed.
    pub fn store(&self, family: &str, library: &ModelLibrary) -> TemplateResult<PathBuf> {
        let path = self.family_path(family);
        let rendered = parser::render_model_library(library)?;
        write_text_artifact(&path, &rendered).map_err(|source| {
            TemplateError::io_system(
                "IO.MODEL_LIBRARY_WRITE",
                format!(
                    "failed to write model family '{}' to '{}': {}",
                    family,
                    path.display(),
                    source
                ),
            )
        })?;
        Ok(path)
    }
}

impl ModelLibrarySource for JsonModelLibrary {
    fn load(&self, family: &str) -> TemplateResult<ModelLibrary> {
        let path = self.family_path(family);
        let source = fs::read_to_string(&path).map_err(|source| {
            TemplateError::io_system(
                "IO.MODEL_LIBRARY_READ",
                format!(
                    "failed to read model family '{}' from '{}': {}",
                    family,
                    path.display(),
                    source
                ),
            )
        })?;
        let library = parser::parse_model_library(family, &source)?;
        debug!(
            family,
            models = library.model_count(),
            pixels = library.pixel_count(),
            "loaded model library"
        );
        Ok(library)
    }
}
