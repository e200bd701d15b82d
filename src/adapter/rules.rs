use super::fetch::ImageFetcher;
use super::stream::drain_bytes;
use crate::error::{Result, StudioError};
use crate::models::{ImageResult, ProviderOutput};
use async_trait::async_trait;
use serde_json::{Map, Value};

pub struct RuleContext<'a> {
    pub fetcher: &'a dyn ImageFetcher,
    pub default_mime: &'a str,
}

pub enum Extraction {
    Image(ImageResult),
    Unmatched(ProviderOutput),
}

#[async_trait]
pub trait OutputRule: Send + Sync {
    fn name(&self) -> &'static str;
    fn matches(&self, output: &ProviderOutput) -> bool;
    async fn apply(&self, output: ProviderOutput, ctx: &RuleContext<'_>) -> Result<Extraction>;
}

pub static RULES: &[&dyn OutputRule] = &[
    &NoOutput,
    &DataUri,
    &HttpUrl,
    &RawBytes,
    &ReadableStream,
    &UrlAccessor,
    &ObjectUrl,
    &ObjectBase64,
    &ObjectByteArray,
];

/// Normalise one direct result. Lists contribute their first non-null item.
pub async fn normalize(output: ProviderOutput, ctx: &RuleContext<'_>) -> Result<ImageResult> {
    let mut current = first_candidate(output);
    for rule in RULES {
        if !rule.matches(&current) {
            continue;
        }
        log::debug!("Output matched rule '{}'", rule.name());
        match rule.apply(current, ctx).await? {
            Extraction::Image(image) => return Ok(image),
            Extraction::Unmatched(output) => current = output,
        }
    }
    log::error!("Unrecognised model output: {:?}", current);
    Err(StudioError::generation("model did not return a usable image"))
}

fn first_candidate(output: ProviderOutput) -> ProviderOutput {
    match output {
        ProviderOutput::List(items) => items
            .into_iter()
            .find(|item| !item.is_null())
            .unwrap_or(ProviderOutput::Null),
        other => other,
    }
}

async fn download(url: &str, ctx: &RuleContext<'_>) -> Result<ImageResult> {
    let fetched = ctx.fetcher.fetch(url).await?;
    let mime = fetched
        .content_type
        .unwrap_or_else(|| ctx.default_mime.to_string());
    log::info!("Fetched and converted image URL to base64");
    ImageResult::from_bytes(&fetched.bytes, mime)
}

fn is_http(value: &str) -> bool {
    value.starts_with("http")
}

fn object_str<'a>(map: &'a Map<String, Value>, key: &str) -> Option<&'a str> {
    map.get(key).and_then(Value::as_str)
}

pub fn parse_data_uri(value: &str) -> Option<(&str, &str)> {
    let rest = value.strip_prefix("data:")?;
    let (header, payload) = rest.split_once(',')?;
    let mime = header.split(';').next().unwrap_or("").trim();
    Some((mime, payload))
}

struct NoOutput;

#[async_trait]
impl OutputRule for NoOutput {
    fn name(&self) -> &'static str {
        "no-output"
    }

    fn matches(&self, output: &ProviderOutput) -> bool {
        output.is_null()
    }

    async fn apply(&self, _output: ProviderOutput, _ctx: &RuleContext<'_>) -> Result<Extraction> {
        Err(StudioError::generation(
            "no output: model did not return a usable image",
        ))
    }
}

struct DataUri;

#[async_trait]
impl OutputRule for DataUri {
    fn name(&self) -> &'static str {
        "data-uri"
    }

    fn matches(&self, output: &ProviderOutput) -> bool {
        matches!(output, ProviderOutput::Text(s) if parse_data_uri(s).is_some())
    }

    async fn apply(&self, output: ProviderOutput, ctx: &RuleContext<'_>) -> Result<Extraction> {
        let ProviderOutput::Text(value) = &output else {
            return Ok(Extraction::Unmatched(output));
        };
        let Some((mime, payload)) = parse_data_uri(value) else {
            return Ok(Extraction::Unmatched(output));
        };
        if payload.trim().is_empty() {
            return Err(StudioError::generation("data URI carried no image data"));
        }
        let mime = if mime.is_empty() { ctx.default_mime } else { mime };
        Ok(Extraction::Image(ImageResult {
            image_data: payload.trim().to_string(),
            mime_type: mime.to_string(),
        }))
    }
}

struct HttpUrl;

#[async_trait]
impl OutputRule for HttpUrl {
    fn name(&self) -> &'static str {
        "http-url"
    }

    fn matches(&self, output: &ProviderOutput) -> bool {
        matches!(output, ProviderOutput::Text(s) if is_http(s))
    }

    async fn apply(&self, output: ProviderOutput, ctx: &RuleContext<'_>) -> Result<Extraction> {
        match output {
            ProviderOutput::Text(url) => download(&url, ctx).await.map(Extraction::Image),
            other => Ok(Extraction::Unmatched(other)),
        }
    }
}

struct RawBytes;

#[async_trait]
impl OutputRule for RawBytes {
    fn name(&self) -> &'static str {
        "raw-bytes"
    }

    fn matches(&self, output: &ProviderOutput) -> bool {
        matches!(output, ProviderOutput::Bytes(_))
    }

    async fn apply(&self, output: ProviderOutput, ctx: &RuleContext<'_>) -> Result<Extraction> {
        match output {
            ProviderOutput::Bytes(bytes) => {
                ImageResult::from_bytes(&bytes, ctx.default_mime).map(Extraction::Image)
            }
            other => Ok(Extraction::Unmatched(other)),
        }
    }
}

struct ReadableStream;

#[async_trait]
impl OutputRule for ReadableStream {
    fn name(&self) -> &'static str {
        "readable-stream"
    }

    fn matches(&self, output: &ProviderOutput) -> bool {
        matches!(output, ProviderOutput::ByteStream(_))
    }

    async fn apply(&self, output: ProviderOutput, ctx: &RuleContext<'_>) -> Result<Extraction> {
        match output {
            ProviderOutput::ByteStream(stream) => {
                let bytes = drain_bytes(stream).await?;
                ImageResult::from_bytes(&bytes, ctx.default_mime).map(Extraction::Image)
            }
            other => Ok(Extraction::Unmatched(other)),
        }
    }
}

struct UrlAccessor;

#[async_trait]
impl OutputRule for UrlAccessor {
    fn name(&self) -> &'static str {
        "url-accessor"
    }

    fn matches(&self, output: &ProviderOutput) -> bool {
        matches!(output, ProviderOutput::File(_))
    }

    async fn apply(&self, output: ProviderOutput, ctx: &RuleContext<'_>) -> Result<Extraction> {
        let handle = match output {
            ProviderOutput::File(handle) => handle,
            other => return Ok(Extraction::Unmatched(other)),
        };
        let url = handle.url().await?;
        if is_http(&url) {
            return download(&url, ctx).await.map(Extraction::Image);
        }
        log::warn!("File output resolved to a non-http location: {}", url);
        Ok(Extraction::Unmatched(ProviderOutput::File(handle)))
    }
}

struct ObjectUrl;

#[async_trait]
impl OutputRule for ObjectUrl {
    fn name(&self) -> &'static str {
        "object-url"
    }

    fn matches(&self, output: &ProviderOutput) -> bool {
        matches!(output, ProviderOutput::Object(map) if object_str(map, "url").map_or(false, is_http))
    }

    async fn apply(&self, output: ProviderOutput, ctx: &RuleContext<'_>) -> Result<Extraction> {
        let url = match &output {
            ProviderOutput::Object(map) => object_str(map, "url")
                .filter(|url| is_http(url))
                .map(String::from),
            _ => None,
        };
        match url {
            Some(url) => download(&url, ctx).await.map(Extraction::Image),
            None => Ok(Extraction::Unmatched(output)),
        }
    }
}

struct ObjectBase64;

#[async_trait]
impl OutputRule for ObjectBase64 {
    fn name(&self) -> &'static str {
        "object-base64"
    }

    fn matches(&self, output: &ProviderOutput) -> bool {
        matches!(output, ProviderOutput::Object(map) if object_str(map, "base64").is_some())
    }

    async fn apply(&self, output: ProviderOutput, ctx: &RuleContext<'_>) -> Result<Extraction> {
        let ProviderOutput::Object(map) = &output else {
            return Ok(Extraction::Unmatched(output));
        };
        let Some(data) = object_str(map, "base64") else {
            return Ok(Extraction::Unmatched(output));
        };
        if data.trim().is_empty() {
            return Err(StudioError::generation("model returned an empty base64 image"));
        }
        let mime = object_str(map, "mime_type")
            .filter(|m| !m.trim().is_empty())
            .unwrap_or(ctx.default_mime);
        Ok(Extraction::Image(ImageResult {
            image_data: data.trim().to_string(),
            mime_type: mime.to_string(),
        }))
    }
}

struct ObjectByteArray;

#[async_trait]
impl OutputRule for ObjectByteArray {
    fn name(&self) -> &'static str {
        "object-byte-array"
    }

    fn matches(&self, output: &ProviderOutput) -> bool {
        matches!(output, ProviderOutput::Object(map) if map.get("data").map_or(false, Value::is_array))
    }

    async fn apply(&self, output: ProviderOutput, ctx: &RuleContext<'_>) -> Result<Extraction> {
        let bytes = match &output {
            ProviderOutput::Object(map) => map.get("data").and_then(byte_array),
            _ => None,
        };
        match bytes {
            Some(bytes) if !bytes.is_empty() => {
                ImageResult::from_bytes(&bytes, ctx.default_mime).map(Extraction::Image)
            }
            _ => {
                log::warn!("Failed to convert array data to a byte buffer");
                Ok(Extraction::Unmatched(output))
            }
        }
    }
}

fn byte_array(value: &Value) -> Option<Vec<u8>> {
    value
        .as_array()?
        .iter()
        .map(|item| item.as_u64().and_then(|n| u8::try_from(n).ok()))
        .collect()
}
