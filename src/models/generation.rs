use crate::error::{Result, StudioError};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

pub const JPEG_MIME: &str = "image/jpeg";
pub const PNG_MIME: &str = "image/png";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ModelProfile {
    Seedream,
    FluxKontext,
}

impl ModelProfile {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "seedream" | "seedream-4" => Some(ModelProfile::Seedream),
            "flux-kontext" | "kontext" | "flux" => Some(ModelProfile::FluxKontext),
            _ => None,
        }
    }

    pub fn infer_from_model(model: &str) -> Self {
        if model.to_ascii_lowercase().contains("kontext") {
            ModelProfile::FluxKontext
        } else {
            ModelProfile::Seedream
        }
    }

    pub fn default_model(&self) -> &'static str {
        match self {
            ModelProfile::Seedream => "bytedance/seedream-4",
            ModelProfile::FluxKontext => "black-forest-labs/flux-kontext-pro",
        }
    }

    pub fn default_mime(&self) -> &'static str {
        match self {
            ModelProfile::Seedream => JPEG_MIME,
            ModelProfile::FluxKontext => PNG_MIME,
        }
    }
}

/// Raw settings as the UI sends them. Every field is loosely typed so that
/// cosmetic values can fall back to defaults instead of failing to parse.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateSettings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompt: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aspect_ratio: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sequential_image_generation: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_images: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_input: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input_image: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_format: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub safety_tolerance: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seed: Option<Value>,
}

impl GenerateSettings {
    pub fn with_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.prompt = Some(Value::String(prompt.into()));
        self
    }

    pub fn studio_defaults() -> Self {
        GenerateSettings {
            size: Some(json!("2K")),
            aspect_ratio: Some(json!("match_input_image")),
            sequential_image_generation: Some(json!("disabled")),
            max_images: Some(json!(1)),
            width: Some(json!("2048")),
            height: Some(json!("2048")),
            ..Default::default()
        }
    }

    pub fn merge(&mut self, patch: GenerateSettings) {
        macro_rules! overlay {
            ($($field:ident),*) => {
                $(if patch.$field.is_some() { self.$field = patch.$field; })*
            };
        }
        overlay!(
            prompt,
            size,
            aspect_ratio,
            sequential_image_generation,
            max_images,
            width,
            height,
            image_input,
            input_image,
            output_format,
            safety_tolerance,
            seed
        );
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ImageSize {
    #[serde(rename = "1K")]
    OneK,
    #[serde(rename = "2K")]
    TwoK,
    #[serde(rename = "4K")]
    FourK,
    #[serde(rename = "custom")]
    Custom,
}

impl ImageSize {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim() {
            "1K" => Some(ImageSize::OneK),
            "2K" => Some(ImageSize::TwoK),
            "4K" => Some(ImageSize::FourK),
            "custom" => Some(ImageSize::Custom),
            _ => None,
        }
    }
}

pub const SEEDREAM_ASPECT_RATIOS: &[&str] = &[
    "match_input_image",
    "1:1",
    "4:3",
    "3:4",
    "16:9",
    "9:16",
    "3:2",
    "2:3",
    "21:9",
];

pub const KONTEXT_ASPECT_RATIOS: &[&str] = &[
    "match_input_image",
    "1:1",
    "16:9",
    "9:16",
    "4:3",
    "3:4",
    "3:2",
    "2:3",
    "4:5",
    "5:4",
    "21:9",
    "9:21",
    "2:1",
    "1:2",
];

pub const MATCH_INPUT_IMAGE: &str = "match_input_image";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SequentialMode {
    Disabled,
    Auto,
}

impl SequentialMode {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim() {
            "disabled" => Some(SequentialMode::Disabled),
            "auto" => Some(SequentialMode::Auto),
            _ => None,
        }
    }
}

/// Validated Seedream payload; serialises to the provider's parameter names.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GenerationRequest {
    pub prompt: String,
    pub size: ImageSize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub aspect_ratio: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub height: Option<u32>,
    pub sequential_image_generation: SequentialMode,
    pub max_images: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_input: Option<Vec<String>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    Jpg,
    Png,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct KontextRequest {
    pub prompt: String,
    pub aspect_ratio: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub input_image: Option<String>,
    pub output_format: OutputFormat,
    pub safety_tolerance: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seed: Option<i64>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ModelInput {
    Seedream(GenerationRequest),
    Kontext(KontextRequest),
}

impl ModelInput {
    pub fn prompt(&self) -> &str {
        match self {
            ModelInput::Seedream(request) => &request.prompt,
            ModelInput::Kontext(request) => &request.prompt,
        }
    }

    pub fn to_input(&self) -> Result<Value> {
        let value = match self {
            ModelInput::Seedream(request) => serde_json::to_value(request)?,
            ModelInput::Kontext(request) => serde_json::to_value(request)?,
        };
        Ok(value)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageResult {
    pub image_data: String,
    pub mime_type: String,
}

impl ImageResult {
    pub fn from_bytes(bytes: &[u8], mime_type: impl Into<String>) -> Result<Self> {
        if bytes.is_empty() {
            return Err(StudioError::generation("model returned an empty image"));
        }
        Ok(ImageResult {
            image_data: STANDARD.encode(bytes),
            mime_type: mime_type.into(),
        })
    }

    pub fn decode(&self) -> Result<Vec<u8>> {
        STANDARD
            .decode(self.image_data.as_bytes())
            .map_err(|e| StudioError::SerializationError(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn image_result_serialises_camel_case() {
        let result = ImageResult::from_bytes(&[1, 2, 3], JPEG_MIME).unwrap();
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["imageData"], "AQID");
        assert_eq!(json["mimeType"], "image/jpeg");
        assert_eq!(result.decode().unwrap(), vec![1, 2, 3]);
    }

    #[test]
    fn empty_bytes_are_not_an_image() {
        assert!(ImageResult::from_bytes(&[], PNG_MIME).is_err());
    }

    #[test]
    fn settings_merge_only_overlays_present_fields() {
        let mut settings = GenerateSettings::studio_defaults();
        settings.merge(GenerateSettings {
            size: Some(json!("4K")),
            ..Default::default()
        });
        assert_eq!(settings.size, Some(json!("4K")));
        assert_eq!(settings.aspect_ratio, Some(json!("match_input_image")));
    }

    #[test]
    fn settings_accept_loose_json() {
        let settings: GenerateSettings = serde_json::from_value(json!({
            "prompt": "a portrait",
            "size": 7,
            "maxImages": "3",
            "imageInput": "http://example.com/ref.png"
        }))
        .unwrap();
        assert_eq!(settings.size, Some(json!(7)));
        assert_eq!(settings.max_images, Some(json!("3")));
        assert!(settings.width.is_none());
    }

    #[test]
    fn profile_inference() {
        assert_eq!(
            ModelProfile::infer_from_model("black-forest-labs/flux-kontext-max"),
            ModelProfile::FluxKontext
        );
        assert_eq!(
            ModelProfile::infer_from_model("bytedance/seedream-4"),
            ModelProfile::Seedream
        );
        assert_eq!(ModelProfile::Seedream.default_mime(), "image/jpeg");
        assert_eq!(ModelProfile::FluxKontext.default_mime(), "image/png");
    }
}
