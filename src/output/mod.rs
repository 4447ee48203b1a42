// Output generation module

pub mod diagrams;
pub mod documents;
pub mod sink;
pub mod templates;

pub use diagrams::{sanitize_id, DiagramGenerator, DiagramKind};
pub use documents::{ComponentSummary, DocumentGenerator, GenerationReport, DOCUMENTS};
pub use sink::{DocumentSink, FileSink, MemorySink};
pub use templates::TemplateEngine;
