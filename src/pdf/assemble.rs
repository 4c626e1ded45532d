//! Lay out text blocks and images into a paginated PDF.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use image::{ColorType, DynamicImage, GenericImageView};
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Dictionary, Document, Object, ObjectId, Stream};
use tracing::debug;

use crate::error::RenderError;
use crate::pdf::codec::ImageFormat;
use crate::pdf::fonts::{encode_win_ansi, wrap_text, BASE_FONT, FONT_RESOURCE};
use crate::types::PdfRequest;
use crate::util::bbox::BBox;
use crate::util::matrix::Matrix2D;

/// A4 portrait, in points.
pub const PAGE_WIDTH: f32 = 595.28;
pub const PAGE_HEIGHT: f32 = 841.89;
pub const MARGIN: f32 = 50.0;
pub const CONTENT_WIDTH: f32 = PAGE_WIDTH - 2.0 * MARGIN;
pub const CONTENT_HEIGHT: f32 = PAGE_HEIGHT - 2.0 * MARGIN;

pub const FONT_SIZE: f32 = 12.0;
pub const LEADING: f32 = 14.4;
/// Gap after a text block.
pub const BLOCK_SPACING: f32 = 6.0;
/// Gap after an image.
pub const IMAGE_SPACING: f32 = 12.0;

/// Largest accepted width or height of an embedded image, in pixels.
pub const MAX_IMAGE_DIMENSION: u32 = 10_000;

/// Build the output document for `request`. `images` maps the index of every
/// item carrying an image to the file holding its decoded bytes.
pub fn assemble(
    request: &PdfRequest,
    images: &BTreeMap<usize, PathBuf>,
) -> Result<Vec<u8>, RenderError> {
    let mut layout = Layout::new();

    for (index, item) in request.items.iter().enumerate() {
        if let Some(text) = item.text.as_deref() {
            layout.text_block(text)?;
        }
        if item.image.is_some() {
            let path = images
                .get(&index)
                .ok_or_else(|| RenderError::item(index, "image was not decoded"))?;
            layout.image(index, path)?;
        }
    }

    layout.finish()
}

struct PageBuilder {
    operations: Vec<Operation>,
    xobjects: Dictionary,
}

impl PageBuilder {
    fn new() -> Self {
        Self {
            operations: Vec::new(),
            xobjects: Dictionary::new(),
        }
    }
}

struct Layout {
    doc: Document,
    pages_id: ObjectId,
    font_id: ObjectId,
    page_ids: Vec<ObjectId>,
    page: PageBuilder,
    cursor: f32,
}

impl Layout {
    fn new() -> Self {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        let font_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => BASE_FONT,
            "Encoding" => "WinAnsiEncoding",
        });

        Self {
            doc,
            pages_id,
            font_id,
            page_ids: Vec::new(),
            page: PageBuilder::new(),
            cursor: PAGE_HEIGHT - MARGIN,
        }
    }

    fn remaining(&self) -> f32 {
        self.cursor - MARGIN
    }

    /// Nothing, blank lines included, has advanced the cursor on this page.
    fn at_page_top(&self) -> bool {
        self.cursor >= PAGE_HEIGHT - MARGIN
    }

    fn text_block(&mut self, text: &str) -> Result<(), RenderError> {
        let lines = wrap_text(text, CONTENT_WIDTH, FONT_SIZE);
        if lines.is_empty() {
            return Ok(());
        }

        for line in lines {
            if self.remaining() < LEADING {
                self.new_page()?;
            }
            let baseline = self.cursor - FONT_SIZE;
            if !line.is_empty() {
                self.page.operations.extend([
                    Operation::new("BT", vec![]),
                    Operation::new(
                        "Tf",
                        vec![
                            Object::Name(FONT_RESOURCE.as_bytes().to_vec()),
                            Object::Real(FONT_SIZE),
                        ],
                    ),
                    Operation::new("Td", vec![Object::Real(MARGIN), Object::Real(baseline)]),
                    Operation::new("Tj", vec![Object::string_literal(encode_win_ansi(&line))]),
                    Operation::new("ET", vec![]),
                ]);
            }
            self.cursor -= LEADING;
        }
        self.cursor -= BLOCK_SPACING;
        Ok(())
    }

    fn image(&mut self, index: usize, path: &Path) -> Result<(), RenderError> {
        let bytes = fs::read(path).map_err(|err| {
            RenderError::item(index, format!("cannot read {}: {err}", path.display()))
        })?;
        let format = ImageFormat::from_path(path).ok_or_else(|| {
            RenderError::item(index, format!("unsupported image file {}", path.display()))
        })?;
        let xobject = ImageXObject::build(&bytes, format)
            .map_err(|reason| RenderError::item(index, reason))?;

        let (width, height) = fit_to_page(xobject.width, xobject.height);
        if self.remaining() < height && !self.at_page_top() {
            self.new_page()?;
        }

        let name = format!("Im{index}");
        let image_id = xobject.add_to(&mut self.doc);
        self.page
            .xobjects
            .set(name.as_bytes().to_vec(), Object::Reference(image_id));

        let rect = BBox::hanging_from(MARGIN, self.cursor, width, height);
        self.page.operations.extend([
            Operation::new("q", vec![]),
            Operation::new("cm", Matrix2D::image_placement(rect).to_operands()),
            Operation::new("Do", vec![Object::Name(name.into_bytes())]),
            Operation::new("Q", vec![]),
        ]);
        self.cursor -= height + IMAGE_SPACING;

        debug!(index, width, height, "placed image");
        Ok(())
    }

    fn new_page(&mut self) -> Result<(), RenderError> {
        let page = std::mem::replace(&mut self.page, PageBuilder::new());
        self.flush_page(page)?;
        self.cursor = PAGE_HEIGHT - MARGIN;
        Ok(())
    }

    fn flush_page(&mut self, page: PageBuilder) -> Result<(), RenderError> {
        let content = Content {
            operations: page.operations,
        }
        .encode()
        .map_err(|err| RenderError::document(format!("failed to encode page content: {err}")))?;
        let content_id = self.doc.add_object(Stream::new(Dictionary::new(), content));

        let page_id = self.doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => self.pages_id,
            "MediaBox" => vec![
                0.into(),
                0.into(),
                Object::Real(PAGE_WIDTH),
                Object::Real(PAGE_HEIGHT),
            ],
            "Contents" => content_id,
            "Resources" => dictionary! {
                "Font" => dictionary! { FONT_RESOURCE => self.font_id },
                "XObject" => page.xobjects,
            },
        });
        self.page_ids.push(page_id);
        Ok(())
    }

    fn finish(mut self) -> Result<Vec<u8>, RenderError> {
        let page = std::mem::replace(&mut self.page, PageBuilder::new());
        self.flush_page(page)?;

        let kids: Vec<Object> = self.page_ids.iter().map(|id| Object::Reference(*id)).collect();
        let count = kids.len() as i64;
        self.doc.objects.insert(
            self.pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => kids,
                "Count" => count,
            }),
        );

        let catalog_id = self.doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => self.pages_id,
        });
        self.doc.trailer.set("Root", catalog_id);
        self.doc.compress();

        let mut buffer = Vec::new();
        self.doc
            .save_to(&mut buffer)
            .map_err(|err| RenderError::document(format!("failed to write PDF: {err}")))?;
        Ok(buffer)
    }
}

/// Scale to the content width, then shrink further if the result would not
/// fit on one page.
fn fit_to_page(natural_width: u32, natural_height: u32) -> (f32, f32) {
    let (w, h) = (natural_width as f32, natural_height as f32);
    let mut scale = CONTENT_WIDTH / w;
    if h * scale > CONTENT_HEIGHT {
        scale = CONTENT_HEIGHT / h;
    }
    (w * scale, h * scale)
}

struct ImageXObject {
    width: u32,
    height: u32,
    stream: Stream,
    soft_mask: Option<Stream>,
}

impl ImageXObject {
    fn build(bytes: &[u8], format: ImageFormat) -> Result<Self, String> {
        let decoded = image::load_from_memory_with_format(bytes, format.to_image_format())
            .map_err(|err| format!("invalid {} image: {err}", format.name()))?;
        let (width, height) = decoded.dimensions();
        if width == 0 || height == 0 {
            return Err("image has no pixels".to_string());
        }
        if width > MAX_IMAGE_DIMENSION || height > MAX_IMAGE_DIMENSION {
            return Err(format!(
                "image is {width}x{height}, larger than {MAX_IMAGE_DIMENSION}px per side"
            ));
        }

        // Baseline RGB and grayscale JPEG can be handed to the viewer as-is.
        if format == ImageFormat::Jpeg {
            let color_space = match decoded.color() {
                ColorType::Rgb8 => Some("DeviceRGB"),
                ColorType::L8 => Some("DeviceGray"),
                _ => None,
            };
            if let Some(color_space) = color_space {
                let mut dict = image_dict(width, height, color_space);
                dict.set("Filter", "DCTDecode");
                return Ok(Self {
                    width,
                    height,
                    stream: Stream::new(dict, bytes.to_vec()),
                    soft_mask: None,
                });
            }
        }

        Ok(Self {
            width,
            height,
            soft_mask: soft_mask(&decoded, width, height),
            stream: Stream::new(
                image_dict(width, height, "DeviceRGB"),
                decoded.to_rgb8().into_raw(),
            ),
        })
    }

    fn add_to(self, doc: &mut Document) -> ObjectId {
        let mut stream = self.stream;
        if let Some(mask) = self.soft_mask {
            let mask_id = doc.add_object(mask);
            stream.dict.set("SMask", mask_id);
        }
        doc.add_object(stream)
    }
}

fn image_dict(width: u32, height: u32, color_space: &str) -> Dictionary {
    dictionary! {
        "Type" => "XObject",
        "Subtype" => "Image",
        "Width" => i64::from(width),
        "Height" => i64::from(height),
        "ColorSpace" => color_space,
        "BitsPerComponent" => 8,
    }
}

fn soft_mask(decoded: &DynamicImage, width: u32, height: u32) -> Option<Stream> {
    if !decoded.color().has_alpha() {
        return None;
    }
    let alpha: Vec<u8> = decoded.to_rgba8().pixels().map(|pixel| pixel.0[3]).collect();
    Some(Stream::new(image_dict(width, height, "DeviceGray"), alpha))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ContentItem, EmbeddedImage};
    use image::{ImageBuffer, Rgb, Rgba};
    use std::io::Cursor;

    fn write_png(dir: &Path, name: &str, width: u32, height: u32) -> PathBuf {
        let img: ImageBuffer<Rgba<u8>, Vec<u8>> =
            ImageBuffer::from_pixel(width, height, Rgba([255, 0, 0, 128]));
        let mut bytes = Vec::new();
        DynamicImage::ImageRgba8(img)
            .write_to(&mut Cursor::new(&mut bytes), image::ImageFormat::Png)
            .unwrap();
        let path = dir.join(name);
        fs::write(&path, bytes).unwrap();
        path
    }

    fn write_jpeg(dir: &Path, name: &str, width: u32, height: u32) -> PathBuf {
        let img: ImageBuffer<Rgb<u8>, Vec<u8>> =
            ImageBuffer::from_pixel(width, height, Rgb([0, 0, 255]));
        let mut bytes = Vec::new();
        DynamicImage::ImageRgb8(img)
            .write_to(&mut Cursor::new(&mut bytes), image::ImageFormat::Jpeg)
            .unwrap();
        let path = dir.join(name);
        fs::write(&path, bytes).unwrap();
        path
    }

    fn image_item(format: &str) -> ContentItem {
        ContentItem::image(EmbeddedImage::new(format, ""))
    }

    fn operand_text(bytes: &[u8]) -> String {
        String::from_utf8_lossy(bytes).into_owned()
    }

    /// Per page, the names drawn with `Do` and the strings shown with `Tj`.
    fn page_summary(pdf: &[u8]) -> Vec<(Vec<String>, Vec<String>)> {
        let doc = Document::load_mem(pdf).unwrap();
        doc.get_pages()
            .values()
            .map(|page_id| {
                let content = Content::decode(&doc.get_page_content(*page_id).unwrap()).unwrap();
                let mut images = Vec::new();
                let mut texts = Vec::new();
                for op in content.operations {
                    match op.operator.as_str() {
                        "Do" => images.push(operand_text(op.operands[0].as_name().unwrap())),
                        "Tj" => texts.push(operand_text(op.operands[0].as_str().unwrap())),
                        _ => {}
                    }
                }
                (images, texts)
            })
            .collect()
    }

    #[test]
    fn empty_request_yields_single_blank_page() {
        let pdf = assemble(&PdfRequest::default(), &BTreeMap::new()).unwrap();
        let pages = page_summary(&pdf);
        assert_eq!(pages.len(), 1);
        assert!(pages[0].0.is_empty());
        assert!(pages[0].1.is_empty());
    }

    #[test]
    fn mixed_formats_are_placed_in_item_order() {
        let dir = tempfile::tempdir().unwrap();
        let request = PdfRequest {
            items: vec![
                ContentItem::text("Hello"),
                image_item("png"),
                image_item("jpeg"),
            ],
        };
        let images = BTreeMap::from([
            (1, write_png(dir.path(), "1output.png", 4, 2)),
            (2, write_jpeg(dir.path(), "2output.jpg", 8, 2)),
        ]);

        let pdf = assemble(&request, &images).unwrap();
        let pages = page_summary(&pdf);
        assert_eq!(pages.len(), 1);
        assert_eq!(pages[0].0, vec!["Im1", "Im2"]);
        assert_eq!(pages[0].1, vec!["Hello"]);
    }

    #[test]
    fn tall_content_flows_onto_new_pages() {
        let dir = tempfile::tempdir().unwrap();
        let request = PdfRequest {
            items: vec![image_item("png"), image_item("png")],
        };
        let images = BTreeMap::from([
            (0, write_png(dir.path(), "1output.png", 10, 10)),
            (1, write_png(dir.path(), "2output.png", 10, 10)),
        ]);

        let pages = page_summary(&assemble(&request, &images).unwrap());
        assert_eq!(pages.len(), 2);
        assert_eq!(pages[0].0, vec!["Im0"]);
        assert_eq!(pages[1].0, vec!["Im1"]);
    }

    #[test]
    fn long_text_breaks_across_pages() {
        let text = vec!["line"; 80].join("\n");
        let request = PdfRequest {
            items: vec![ContentItem::text(text)],
        };
        let pages = page_summary(&assemble(&request, &BTreeMap::new()).unwrap());
        assert_eq!(pages.len(), 2);
        assert_eq!(pages[0].1.len() + pages[1].1.len(), 80);
    }

    /// Bottom edge of every placed image, taken from its `cm` operands.
    fn image_bottoms(pdf: &[u8]) -> Vec<f32> {
        let doc = Document::load_mem(pdf).unwrap();
        let mut bottoms = Vec::new();
        for page_id in doc.get_pages().values() {
            let content = Content::decode(&doc.get_page_content(*page_id).unwrap()).unwrap();
            for op in content.operations.iter().filter(|op| op.operator == "cm") {
                bottoms.push(op.operands[5].as_float().unwrap());
            }
        }
        bottoms
    }

    #[test]
    fn image_after_trailing_blank_lines_stays_on_page() {
        let dir = tempfile::tempdir().unwrap();
        let text = format!("a{}", "\n ".repeat(100));
        let request = PdfRequest {
            items: vec![ContentItem::text(text), image_item("png")],
        };
        let images = BTreeMap::from([(1, write_png(dir.path(), "1output.png", 10, 10))]);

        let pdf = assemble(&request, &images).unwrap();
        let bottoms = image_bottoms(&pdf);
        assert_eq!(bottoms.len(), 1);
        assert!(bottoms[0] >= MARGIN - 1e-3, "image bottom at y={}", bottoms[0]);
        assert_eq!(page_summary(&pdf).last().unwrap().0, vec!["Im1"]);
    }

    #[test]
    fn missing_image_file_reports_item_index() {
        let dir = tempfile::tempdir().unwrap();
        let request = PdfRequest {
            items: vec![ContentItem::text("intro"), image_item("png")],
        };
        let images = BTreeMap::from([(1, dir.path().join("missing.png"))]);

        let err = assemble(&request, &images).unwrap_err();
        assert_eq!(err.index, Some(1));
    }

    #[test]
    fn corrupt_image_reports_item_index() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("1output.png");
        fs::write(&path, b"\x89PNG\r\n\x1a\nnot really").unwrap();
        let request = PdfRequest {
            items: vec![image_item("png")],
        };

        let err = assemble(&request, &BTreeMap::from([(0, path)])).unwrap_err();
        assert_eq!(err.index, Some(0));
        assert!(err.reason.contains("invalid png image"));
    }

    #[test]
    fn fit_to_page_scales_to_content_width() {
        let (w, h) = fit_to_page(100, 50);
        assert!((w - CONTENT_WIDTH).abs() < 1e-3);
        assert!((h - CONTENT_WIDTH / 2.0).abs() < 1e-3);

        let (w, h) = fit_to_page(10, 100);
        assert!((h - CONTENT_HEIGHT).abs() < 1e-3);
        assert!(w < CONTENT_WIDTH);
    }
}
