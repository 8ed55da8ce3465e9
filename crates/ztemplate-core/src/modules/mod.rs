pub mod archive;
pub mod assembly;
pub mod library;
pub mod quality;
pub mod serialization;
mod traits;

pub use archive::{NdArchiveFile, read_archive, write_archive};
pub use assembly::{ConvertedLibrary, SourceGrid, SubsetSelection, TemplatePipeline};
pub use library::{JsonModelLibrary, ModelLibrary};
pub use quality::{
    FluxCheckConfig, FluxCheckReport, FluxChecker, MaskScope, QualityCondition, QualityEvent,
    QualityObserver, TracingObserver, flux_check,
};
pub use traits::{ArchiveReader, ArchiveWriter, ModelLibrarySource};
