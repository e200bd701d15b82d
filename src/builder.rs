use crate::error::{Result, StudioError};
use crate::models::{
    GenerateSettings, GenerationRequest, ImageSize, KontextRequest, ModelInput, ModelProfile,
    OutputFormat, SequentialMode, KONTEXT_ASPECT_RATIOS, MATCH_INPUT_IMAGE,
    SEEDREAM_ASPECT_RATIOS,
};
use serde_json::Value;

pub const MIN_CUSTOM_DIMENSION: i64 = 1024;
pub const MAX_CUSTOM_DIMENSION: i64 = 4096;
pub const MAX_IMAGES: i64 = 15;
pub const MAX_IMAGE_INPUTS: usize = 10;
pub const DEFAULT_SAFETY_TOLERANCE: i64 = 2;
const MAX_SAFETY_TOLERANCE: i64 = 6;

pub fn build_for(profile: ModelProfile, settings: &GenerateSettings) -> Result<ModelInput> {
    match profile {
        ModelProfile::Seedream => build(settings).map(ModelInput::Seedream),
        ModelProfile::FluxKontext => build_kontext(settings).map(ModelInput::Kontext),
    }
}

pub fn build(settings: &GenerateSettings) -> Result<GenerationRequest> {
    let prompt = required_prompt(settings.prompt.as_ref())?;

    let size = as_trimmed_str(settings.size.as_ref())
        .and_then(ImageSize::parse)
        .unwrap_or(ImageSize::TwoK);

    let (aspect_ratio, width, height) = if size == ImageSize::Custom {
        let width = dimension(settings.width.as_ref());
        let height = dimension(settings.height.as_ref());
        match (width, height) {
            (Some(w), Some(h)) => (None, Some(w), Some(h)),
            _ => {
                return Err(StudioError::validation(
                    "custom size requires width/height in range",
                ))
            }
        }
    } else {
        let ratio = normalise_ratio(settings.aspect_ratio.as_ref(), SEEDREAM_ASPECT_RATIOS);
        (Some(ratio), None, None)
    };

    let sequential_image_generation = as_trimmed_str(settings.sequential_image_generation.as_ref())
        .and_then(SequentialMode::parse)
        .unwrap_or(SequentialMode::Disabled);

    let max_images = match sequential_image_generation {
        SequentialMode::Auto => settings
            .max_images
            .as_ref()
            .and_then(parse_int)
            .map(|n| n.clamp(1, MAX_IMAGES))
            .unwrap_or(1) as u32,
        SequentialMode::Disabled => 1,
    };

    Ok(GenerationRequest {
        prompt,
        size,
        aspect_ratio,
        width,
        height,
        sequential_image_generation,
        max_images,
        image_input: image_inputs(settings.image_input.as_ref()),
    })
}

pub fn build_kontext(settings: &GenerateSettings) -> Result<KontextRequest> {
    let prompt = required_prompt(settings.prompt.as_ref())?;
    let aspect_ratio = normalise_ratio(settings.aspect_ratio.as_ref(), KONTEXT_ASPECT_RATIOS);

    let input_image = as_trimmed_str(settings.input_image.as_ref())
        .map(String::from)
        .or_else(|| {
            image_inputs(settings.image_input.as_ref()).and_then(|urls| urls.into_iter().next())
        });

    let output_format = match as_trimmed_str(settings.output_format.as_ref()) {
        Some("jpg") | Some("jpeg") => OutputFormat::Jpg,
        _ => OutputFormat::Png,
    };

    // Tolerance above 2 is not accepted together with an input image.
    let ceiling = if input_image.is_some() {
        DEFAULT_SAFETY_TOLERANCE
    } else {
        MAX_SAFETY_TOLERANCE
    };
    let safety_tolerance = settings
        .safety_tolerance
        .as_ref()
        .and_then(parse_int)
        .unwrap_or(DEFAULT_SAFETY_TOLERANCE)
        .clamp(0, ceiling) as u8;

    Ok(KontextRequest {
        prompt,
        aspect_ratio,
        input_image,
        output_format,
        safety_tolerance,
        seed: settings.seed.as_ref().and_then(parse_int),
    })
}

fn required_prompt(value: Option<&Value>) -> Result<String> {
    as_trimmed_str(value)
        .map(String::from)
        .ok_or_else(|| StudioError::validation("prompt required"))
}

fn as_trimmed_str(value: Option<&Value>) -> Option<&str> {
    value
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
}

fn normalise_ratio(value: Option<&Value>, allowed: &[&str]) -> String {
    as_trimmed_str(value)
        .filter(|ratio| allowed.contains(ratio))
        .unwrap_or(MATCH_INPUT_IMAGE)
        .to_string()
}

pub fn parse_int(value: &Value) -> Option<i64> {
    let number = match value {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().parse::<f64>().ok()?,
        _ => return None,
    };
    if !number.is_finite() {
        return None;
    }
    let floored = number.floor();
    if floored < i64::MIN as f64 || floored > i64::MAX as f64 {
        return None;
    }
    Some(floored as i64)
}

fn dimension(value: Option<&Value>) -> Option<u32> {
    value
        .and_then(parse_int)
        .filter(|n| (MIN_CUSTOM_DIMENSION..=MAX_CUSTOM_DIMENSION).contains(n))
        .map(|n| n as u32)
}

fn image_inputs(value: Option<&Value>) -> Option<Vec<String>> {
    let urls: Vec<String> = match value? {
        Value::String(s) => vec![s.trim().to_string()],
        Value::Array(items) => items
            .iter()
            .filter_map(Value::as_str)
            .map(|s| s.trim().to_string())
            .collect(),
        _ => Vec::new(),
    };
    let urls: Vec<String> = urls.into_iter().filter(|s| !s.is_empty()).collect();
    if urls.is_empty() {
        None
    } else {
        Some(urls)
    }
}

/// Split the UI's free-text reference list (commas or newlines) and keep
/// at most [`MAX_IMAGE_INPUTS`] entries.
pub fn parse_image_input_list(raw: &str) -> Vec<String> {
    raw.split(|c: char| c == ',' || c == '\n' || c == '\r')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .take(MAX_IMAGE_INPUTS)
        .map(String::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn settings(value: Value) -> GenerateSettings {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn blank_prompt_is_rejected() {
        for body in [json!({}), json!({"prompt": "   "}), json!({"prompt": 42})] {
            let err = build(&settings(body)).unwrap_err();
            assert!(err.is_validation());
            assert!(err.to_string().contains("prompt required"));
        }
    }

    #[test]
    fn defaults_apply_to_unknown_enums() {
        let request = build(&settings(json!({
            "prompt": "  a portrait  ",
            "size": "8K",
            "aspectRatio": "7:5",
            "sequentialImageGeneration": "sometimes"
        })))
        .unwrap();
        assert_eq!(request.prompt, "a portrait");
        assert_eq!(request.size, ImageSize::TwoK);
        assert_eq!(request.aspect_ratio.as_deref(), Some("match_input_image"));
        assert_eq!(request.sequential_image_generation, SequentialMode::Disabled);
        assert_eq!(request.max_images, 1);
    }

    #[test]
    fn preset_sizes_never_carry_dimensions() {
        for size in ["1K", "2K", "4K", "bogus"] {
            let request = build(&settings(json!({
                "prompt": "p", "size": size, "width": 2048, "height": 2048
            })))
            .unwrap();
            let input = serde_json::to_value(&request).unwrap();
            assert!(input.get("width").is_none());
            assert!(input.get("height").is_none());
            assert!(input.get("aspect_ratio").is_some());
        }
    }

    #[test]
    fn custom_size_passes_in_range_dimensions_through() {
        let request = build(&settings(json!({
            "prompt": "p", "size": "custom", "width": 1024, "height": "4096", "aspectRatio": "16:9"
        })))
        .unwrap();
        assert_eq!(request.width, Some(1024));
        assert_eq!(request.height, Some(4096));
        assert!(request.aspect_ratio.is_none());
    }

    #[test]
    fn custom_size_rejects_out_of_range_or_missing_dimensions() {
        for (w, h) in [(json!(500), json!(2048)), (json!(2048), json!(4097)), (json!("abc"), json!(2048))] {
            let err = build(&settings(json!({
                "prompt": "p", "size": "custom", "width": w, "height": h
            })))
            .unwrap_err();
            assert!(err.to_string().contains("custom size requires width/height in range"));
        }
        assert!(build(&settings(json!({"prompt": "p", "size": "custom"}))).is_err());
    }

    #[test]
    fn disabled_sequential_forces_single_image() {
        for max in [json!(0), json!(7), json!(99), json!("12")] {
            let request = build(&settings(json!({
                "prompt": "p", "sequentialImageGeneration": "disabled", "maxImages": max
            })))
            .unwrap();
            assert_eq!(request.max_images, 1);
        }
    }

    #[test]
    fn auto_sequential_clamps_max_images() {
        let cases = [(json!(4), 4), (json!(40), 15), (json!(-3), 1), (json!("nope"), 1), (json!(2.9), 2)];
        for (max, expected) in cases {
            let request = build(&settings(json!({
                "prompt": "p", "sequentialImageGeneration": "auto", "maxImages": max
            })))
            .unwrap();
            assert_eq!(request.max_images, expected);
        }
    }

    #[test]
    fn image_input_accepts_string_or_list() {
        let single = build(&settings(json!({"prompt": "p", "imageInput": " http://a/1.png "}))).unwrap();
        assert_eq!(single.image_input, Some(vec!["http://a/1.png".to_string()]));

        let list = build(&settings(json!({
            "prompt": "p", "imageInput": ["http://a/1.png", "  ", 5, "http://a/2.png"]
        })))
        .unwrap();
        assert_eq!(
            list.image_input,
            Some(vec!["http://a/1.png".to_string(), "http://a/2.png".to_string()])
        );

        let empty = build(&settings(json!({"prompt": "p", "imageInput": ["", " "]}))).unwrap();
        assert!(empty.image_input.is_none());
        let input = serde_json::to_value(&empty).unwrap();
        assert!(input.get("image_input").is_none());
    }

    #[test]
    fn seedream_payload_uses_provider_names() {
        let input = build_for(
            ModelProfile::Seedream,
            &settings(json!({"prompt": "p", "sequentialImageGeneration": "auto", "maxImages": 3})),
        )
        .unwrap()
        .to_input()
        .unwrap();
        assert_eq!(input["size"], "2K");
        assert_eq!(input["sequential_image_generation"], "auto");
        assert_eq!(input["max_images"], 3);
        assert_eq!(input["aspect_ratio"], "match_input_image");
    }

    #[test]
    fn kontext_defaults_and_clamping() {
        let request = build_kontext(&settings(json!({
            "prompt": "p", "aspectRatio": "4:5", "safetyTolerance": 9, "seed": "42"
        })))
        .unwrap();
        assert_eq!(request.aspect_ratio, "4:5");
        assert_eq!(request.safety_tolerance, 6);
        assert_eq!(request.output_format, OutputFormat::Png);
        assert_eq!(request.seed, Some(42));
        assert!(request.input_image.is_none());

        let with_image = build_kontext(&settings(json!({
            "prompt": "p", "imageInput": ["http://a/ref.png"], "safetyTolerance": 5, "outputFormat": "jpg"
        })))
        .unwrap();
        assert_eq!(with_image.input_image.as_deref(), Some("http://a/ref.png"));
        assert_eq!(with_image.safety_tolerance, 2);
        assert_eq!(with_image.output_format, OutputFormat::Jpg);
    }

    #[test]
    fn free_text_reference_list_is_split_and_truncated() {
        let raw = (0..14).map(|i| format!("http://a/{i}.png")).collect::<Vec<_>>().join(",\n");
        let urls = parse_image_input_list(&raw);
        assert_eq!(urls.len(), MAX_IMAGE_INPUTS);
        assert_eq!(urls[0], "http://a/0.png");
        assert!(parse_image_input_list(" , \n ").is_empty());
    }
}
