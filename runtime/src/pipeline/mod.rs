pub mod chunker;
pub mod converter;
pub mod document_manager;
pub mod extractor;
pub mod merge;
pub mod normalize;
pub mod pipeline;
pub mod quality_gate;
pub mod utils;

pub use chunker::{CharWindowChunker, Chunk, Chunker, chunk_text};
pub use converter::{PdfConverter, SofficeConverter};
pub use document_manager::{DocumentManager, FileRepository, FsFileRepository};
pub use extractor::{
    CommandExtractor, DocumentExtractor, ExtractedText, RoutingExtractor, Utf8DocumentExtractor,
};
pub use normalize::{Normalized, SchemaMatch, normalize};
pub use pipeline::{DocumentReport, ExtractionMode, ExtractionRun, Pipeline};
pub use quality_gate::{QualityAssessment, QualityGate, QualityMetrics};
