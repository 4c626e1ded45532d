pub mod assemble;
pub mod codec;
pub mod fonts;
pub mod pipeline;
pub mod scratch;

pub use pipeline::{PdfPipeline, PipelineState};
