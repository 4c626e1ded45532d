//! Request-to-PDF orchestration.
//!
//! A request moves through `Received -> DecodingImages -> Assembling -> Done`
//! and ends in `Aborted` on the first failure. Images are handled strictly in
//! item order. One bad image fails the whole request: no partial document is
//! produced and images decoded before the failure are discarded along with
//! the request's scratch directory.

use std::collections::BTreeMap;
use std::path::PathBuf;

use tracing::{debug, warn};

use crate::error::{PipelineError, Stage};
use crate::pdf::assemble::assemble;
use crate::pdf::codec::{self, DecodedImage, ImageFormat};
use crate::pdf::scratch::ScratchSpace;
use crate::types::{EmbeddedImage, PdfRequest};

pub const DEFAULT_MAX_IMAGES: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    Received,
    DecodingImages,
    Assembling,
    Done,
    Aborted,
}

impl PipelineState {
    fn enter(&mut self, next: PipelineState) {
        let from = *self;
        debug!(?from, to = ?next, "pipeline transition");
        *self = next;
    }
}

#[derive(Debug, Clone)]
pub struct PdfPipeline {
    scratch_root: PathBuf,
    max_images: usize,
}

impl PdfPipeline {
    pub fn new(scratch_root: impl Into<PathBuf>) -> Self {
        Self {
            scratch_root: scratch_root.into(),
            max_images: DEFAULT_MAX_IMAGES,
        }
    }

    pub fn with_max_images(mut self, max_images: usize) -> Self {
        self.max_images = max_images;
        self
    }

    /// Render `request` into PDF bytes. Blocking; run it off the async
    /// executor.
    pub fn run(&self, request: &PdfRequest) -> Result<Vec<u8>, PipelineError> {
        let mut state = PipelineState::Received;
        let outcome = self.drive(request, &mut state);
        if let Err(err) = &outcome {
            state.enter(PipelineState::Aborted);
            warn!(
                stage = %err.stage,
                index = ?err.index,
                kind = %err.kind,
                error = %err.cause,
                "pdf pipeline aborted"
            );
        }
        outcome
    }

    fn drive(
        &self,
        request: &PdfRequest,
        state: &mut PipelineState,
    ) -> Result<Vec<u8>, PipelineError> {
        let image_count = request.image_count();
        if image_count > self.max_images {
            return Err(PipelineError::malformed(
                None,
                format!("too many images: {image_count} (limit {})", self.max_images),
            ));
        }

        state.enter(PipelineState::DecodingImages);
        let mut scratch = ScratchSpace::create(&self.scratch_root)
            .map_err(|err| PipelineError::io(Stage::Prepare, err))?;

        let mut paths = BTreeMap::new();
        for (index, item) in request.items.iter().enumerate() {
            let Some(image) = &item.image else {
                continue;
            };
            let decoded = decode_image(index, image, &mut scratch)?;
            debug!(
                index,
                format = decoded.format.name(),
                bytes = decoded.bytes.len(),
                "decoded image"
            );
            paths.insert(index, decoded.storage_path);
        }

        state.enter(PipelineState::Assembling);
        let document = assemble(request, &paths).map_err(PipelineError::render)?;

        state.enter(PipelineState::Done);
        Ok(document)
    }
}

/// Run one embedded image through format detection, decoding and
/// persistence into `scratch`.
pub fn decode_image(
    index: usize,
    image: &EmbeddedImage,
    scratch: &mut ScratchSpace,
) -> Result<DecodedImage, PipelineError> {
    let data_uri = image.data_uri();

    let format = codec::extract_format(&data_uri)
        .and_then(ImageFormat::parse)
        .map_err(|err| PipelineError::codec(Stage::FormatDetection, index, err))?;

    let bytes = codec::extract_payload(&data_uri)
        .and_then(|bytes| codec::verify_format(&bytes, format).map(|()| bytes))
        .map_err(|err| PipelineError::codec(Stage::Decode, index, err))?;

    let storage_path = scratch.next_file(format.extension());
    codec::persist(&bytes, &storage_path)
        .map_err(|err| PipelineError::codec(Stage::Persist, index, err))?;

    Ok(DecodedImage {
        bytes,
        format,
        storage_path,
    })
}
