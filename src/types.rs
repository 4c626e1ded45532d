use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Body of `POST /pdf` as sent by clients.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PdfPayload {
    #[serde(default)]
    pub imagenes: Vec<ImagePayload>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub contenido: Vec<ContentPayload>,
    /// Remaining top-level fields, kept in body order.
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImagePayload {
    pub extension: String,
    pub base64_string: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ContentPayload {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub texto: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub imagen: Option<ImagePayload>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PdfRequest {
    pub items: Vec<ContentItem>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ContentItem {
    pub text: Option<String>,
    pub image: Option<EmbeddedImage>,
}

impl ContentItem {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            image: None,
        }
    }

    pub fn image(image: EmbeddedImage) -> Self {
        Self {
            text: None,
            image: Some(image),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct EmbeddedImage {
    /// Bare base64 payload, or a complete `data:` URI.
    pub payload: String,
    /// Declared format, e.g. `png` or `jpeg`.
    pub format: String,
}

impl EmbeddedImage {
    pub fn new(format: impl Into<String>, payload: impl Into<String>) -> Self {
        Self {
            payload: payload.into(),
            format: format.into(),
        }
    }

    /// Data URI handed to the codec. Payloads that already carry a `data:`
    /// prefix are passed through untouched.
    pub fn data_uri(&self) -> String {
        let payload = self.payload.trim_start();
        if payload.starts_with("data:") {
            payload.to_string()
        } else {
            format!("data:image/{};base64,{}", self.format, payload)
        }
    }
}

impl PdfRequest {
    pub fn image_count(&self) -> usize {
        self.items.iter().filter(|item| item.image.is_some()).count()
    }
}

impl From<ImagePayload> for EmbeddedImage {
    fn from(payload: ImagePayload) -> Self {
        EmbeddedImage::new(payload.extension, payload.base64_string)
    }
}

impl From<PdfPayload> for PdfRequest {
    fn from(payload: PdfPayload) -> Self {
        let mut items: Vec<ContentItem> = payload
            .fields
            .into_iter()
            .filter_map(|(_, value)| field_text(value))
            .map(ContentItem::text)
            .collect();

        items.extend(
            payload
                .imagenes
                .into_iter()
                .map(|image| ContentItem::image(image.into())),
        );

        items.extend(payload.contenido.into_iter().map(|entry| ContentItem {
            text: entry.texto.filter(|text| !text.trim().is_empty()),
            image: entry.imagen.map(EmbeddedImage::from),
        }));

        PdfRequest { items }
    }
}

fn field_text(value: Value) -> Option<String> {
    match value {
        Value::String(text) if !text.trim().is_empty() => Some(text),
        Value::Number(number) => Some(number.to_string()),
        Value::Bool(flag) => Some(flag.to_string()),
        _ => None,
    }
}
