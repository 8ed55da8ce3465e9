use super::library::ModelLibrary;
use crate::domain::{TemplateArchive, TemplateResult};
use std::path::{Path, PathBuf};

/// Supplies raw model spectra for a named model family.
pub trait ModelLibrarySource {
    fn load(&self, family: &str) -> TemplateResult<ModelLibrary>;
}

/// Persists a finished template archive, returning where it was written.
pub trait ArchiveWriter {
    fn write_archive(&self, archive: &TemplateArchive) -> TemplateResult<PathBuf>;
}

pub trait ArchiveReader {
    fn read_archive(&self, path: &Path) -> TemplateResult<TemplateArchive>;
}

#[cfg(test)]
mod tests {
    use super::ModelLibrarySource;
    use crate::domain::{TemplateError, TemplateErrorCategory, TemplateResult};
    use crate::modules::library::ModelLibrary;

    struct MissingLibrary;

    impl ModelLibrarySource for MissingLibrary {
        fn load(&self, family: &str) -> TemplateResult<ModelLibrary> {
            Err(TemplateError::io_system(
                "IO.MODEL_LIBRARY_READ",
                format!("no such family '{family}'"),
            ))
        }
    }

    #[test]
    fn collaborators_use_shared_error_types() {
        let error = MissingLibrary
            .load("SSP_missing")
            .expect_err("load should fail");
        assert_eq!(error.category(), TemplateErrorCategory::IoSystemError);
        assert_eq!(error.exit_code(), 3);
        assert!(error.message().contains("SSP_missing"));
    }
}
