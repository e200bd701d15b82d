pub mod fetch;
pub mod rules;
pub mod stream;

use crate::error::{Result, StudioError};
use crate::models::{ImageResult, ModelInput, ModelProfile, RunOutput};
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;
use uuid::Uuid;

pub use fetch::{FetchedImage, HttpImageFetcher, ImageFetcher};
pub use rules::{normalize, RuleContext};
pub use stream::{drain_events, Drained};

#[async_trait]
pub trait ModelRunner: Send + Sync {
    async fn run(&self, model: &str, input: Value) -> Result<RunOutput>;
}

/// Turns one generation request into a single base64 image, whatever
/// shape the provider answered in.
#[derive(Clone)]
pub struct ImageAdapter {
    runner: Arc<dyn ModelRunner>,
    fetcher: Arc<dyn ImageFetcher>,
    model: String,
    profile: ModelProfile,
}

impl ImageAdapter {
    pub fn new(
        runner: Arc<dyn ModelRunner>,
        fetcher: Arc<dyn ImageFetcher>,
        profile: ModelProfile,
        model: impl Into<String>,
    ) -> Self {
        Self {
            runner,
            fetcher,
            model: model.into(),
            profile,
        }
    }

    pub fn profile(&self) -> ModelProfile {
        self.profile
    }

    pub async fn invoke(&self, input: &ModelInput) -> Result<ImageResult> {
        let request_id = Uuid::new_v4();
        let _timer = crate::logger::timer(&format!("generation {}", request_id));
        log::info!(
            "[{}] Generating image with {} (prompt {} chars)",
            request_id,
            self.model,
            input.prompt().chars().count()
        );

        let output = self.runner.run(&self.model, input.to_input()?).await?;
        log::debug!("[{}] Model returned {:?}", request_id, output);

        let ctx = RuleContext {
            fetcher: self.fetcher.as_ref(),
            default_mime: self.profile.default_mime(),
        };

        let image = match output {
            RunOutput::Stream(events) => match drain_events(events).await? {
                Drained::Binary(bytes) => ImageResult::from_bytes(&bytes, ctx.default_mime)?,
                Drained::Value(value) => normalize(value, &ctx).await?,
                Drained::Empty => {
                    return Err(StudioError::generation("stream yielded no usable data"));
                }
            },
            RunOutput::Direct(value) => normalize(value, &ctx).await?,
        };

        log::info!(
            "[{}] Image ready ({}, {} base64 chars)",
            request_id,
            image.mime_type,
            image.image_data.len()
        );
        Ok(image)
    }
}
