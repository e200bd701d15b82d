pub mod sse;

use crate::adapter::ModelRunner;
use crate::config::{OutputMode, ReplicateConfig};
use crate::error::{Result, StudioError};
use crate::models::{FileHandle, ProviderOutput, RunOutput, StreamEvent};
use async_trait::async_trait;
use futures::StreamExt;
use reqwest::{Client, Response};
use serde::Deserialize;
use serde_json::{json, Value};
use sse::{SseDecoder, SseEvent};
use std::time::Duration;
use tokio_stream::wrappers::ReceiverStream;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PredictionUrls {
    pub get: Option<String>,
    pub stream: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Prediction {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub output: Value,
    #[serde(default)]
    pub error: Value,
    #[serde(default)]
    pub urls: PredictionUrls,
}

impl Prediction {
    pub fn is_terminal(&self) -> bool {
        matches!(self.status.as_str(), "succeeded" | "failed" | "canceled")
    }

    fn failure(&self) -> StudioError {
        let message = match &self.error {
            Value::String(message) if !message.trim().is_empty() => message.clone(),
            Value::Null => format!("prediction {} {}", self.id, self.status),
            other => other.to_string(),
        };
        StudioError::TransportError(message)
    }
}

#[derive(Debug, Clone)]
pub struct ReplicateFile {
    url: String,
}

#[async_trait]
impl FileHandle for ReplicateFile {
    async fn url(&self) -> Result<String> {
        Ok(self.url.clone())
    }
}

#[derive(Debug)]
enum Shaped {
    Ready(RunOutput),
    Download(String),
}

fn shape_output(mode: OutputMode, output: Value) -> Shaped {
    if mode != OutputMode::Files {
        return Shaped::Ready(RunOutput::Direct(ProviderOutput::from_json(output)));
    }
    match output {
        Value::String(url) if url.starts_with("http") => Shaped::Download(url),
        Value::Array(items) => {
            let items = items
                .into_iter()
                .map(|item| match item {
                    Value::String(url) if url.starts_with("http") => {
                        ProviderOutput::File(Box::new(ReplicateFile { url }))
                    }
                    other => ProviderOutput::from_json(other),
                })
                .collect();
            Shaped::Ready(RunOutput::Direct(ProviderOutput::List(items)))
        }
        other => Shaped::Ready(RunOutput::Direct(ProviderOutput::from_json(other))),
    }
}

fn prediction_target(api_base: &str, model: &str) -> (String, Option<String>) {
    match model.split_once(':') {
        Some((_, version)) => (format!("{}/predictions", api_base), Some(version.to_string())),
        None => (format!("{}/models/{}/predictions", api_base, model), None),
    }
}

fn stream_event(event: SseEvent) -> Option<Result<StreamEvent>> {
    match event.event.as_str() {
        "output" => {
            let value = serde_json::from_str::<Value>(&event.data)
                .unwrap_or_else(|_| Value::String(event.data.clone()));
            Some(Ok(StreamEvent::Value(ProviderOutput::from_json(value))))
        }
        "error" => {
            let message = serde_json::from_str::<Value>(&event.data)
                .ok()
                .and_then(|v| v.get("detail").and_then(Value::as_str).map(String::from))
                .unwrap_or(event.data);
            Some(Err(StudioError::TransportError(message)))
        }
        _ => None,
    }
}

pub struct ReplicateClient {
    http: Client,
    api_token: String,
    config: ReplicateConfig,
}

impl ReplicateClient {
    pub fn new(http: Client, config: ReplicateConfig) -> Result<Self> {
        let api_token = config
            .api_token
            .clone()
            .filter(|token| !token.trim().is_empty())
            .ok_or_else(|| {
                StudioError::ConfigError("Missing REPLICATE_API_TOKEN environment variable".into())
            })?;
        Ok(Self {
            http,
            api_token,
            config,
        })
    }

    async fn checked(response: Response) -> Result<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        log::error!("Replicate responded with {}: {}", status, body);
        Err(StudioError::from_provider_body(status.as_u16(), &body))
    }

    async fn create_prediction(&self, model: &str, input: Value, stream: bool) -> Result<Prediction> {
        let (endpoint, version) = prediction_target(&self.config.api_base, model);
        let mut body = json!({ "input": input, "stream": stream });
        if let Some(version) = version {
            body["version"] = Value::String(version);
        }

        let mut request = self.http.post(&endpoint).bearer_auth(&self.api_token).json(&body);
        if !stream {
            request = request.header("Prefer", format!("wait={}", self.config.wait_seconds));
        }

        let response = request
            .send()
            .await
            .map_err(|e| StudioError::TransportError(format!("Replicate request failed: {}", e)))?;
        let prediction: Prediction = Self::checked(response).await?.json().await?;
        log::debug!("Prediction {} is {}", prediction.id, prediction.status);
        Ok(prediction)
    }

    async fn wait_for(&self, mut prediction: Prediction) -> Result<Prediction> {
        let interval = Duration::from_millis(self.config.poll_interval_ms);
        while !prediction.is_terminal() {
            let poll_url = prediction
                .urls
                .get
                .clone()
                .ok_or_else(|| StudioError::TransportError("prediction missing poll URL".into()))?;
            tokio::time::sleep(interval).await;
            let response = self
                .http
                .get(&poll_url)
                .bearer_auth(&self.api_token)
                .send()
                .await?;
            prediction = Self::checked(response).await?.json().await?;
            log::debug!("Prediction {} is {}", prediction.id, prediction.status);
        }

        if prediction.status == "succeeded" {
            Ok(prediction)
        } else {
            Err(prediction.failure())
        }
    }

    async fn download(&self, url: &str) -> Result<RunOutput> {
        let response = self.http.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(StudioError::fetch_failed(url, status.as_u16()));
        }
        let bytes = response
            .bytes_stream()
            .map(|chunk| chunk.map_err(StudioError::from))
            .boxed();
        Ok(RunOutput::Direct(ProviderOutput::ByteStream(bytes)))
    }

    async fn open_events(&self, url: &str) -> Result<RunOutput> {
        let response = self
            .http
            .get(url)
            .header("Accept", "text/event-stream")
            .header("Cache-Control", "no-store")
            .bearer_auth(&self.api_token)
            .send()
            .await?;
        let mut body = Box::pin(Self::checked(response).await?.bytes_stream());

        let (tx, rx) = tokio::sync::mpsc::channel(100);
        tokio::spawn(async move {
            let mut decoder = SseDecoder::new();
            while let Some(chunk) = body.next().await {
                let chunk = match chunk {
                    Ok(chunk) => chunk,
                    Err(e) => {
                        let _ = tx.send(Err(StudioError::from(e))).await;
                        return;
                    }
                };
                for event in decoder.feed(&chunk) {
                    if event.event == "done" {
                        return;
                    }
                    if let Some(item) = stream_event(event) {
                        if tx.send(item).await.is_err() {
                            return;
                        }
                    }
                }
            }
            if let Some(item) = decoder.finish().and_then(stream_event) {
                let _ = tx.send(item).await;
            }
        });

        Ok(RunOutput::Stream(Box::pin(ReceiverStream::new(rx))))
    }
}

#[async_trait]
impl ModelRunner for ReplicateClient {
    async fn run(&self, model: &str, input: Value) -> Result<RunOutput> {
        let _timer = crate::logger::timer(&format!("Replicate run {}", model));
        let mode = self.config.output_mode;
        let prediction = self.create_prediction(model, input, mode == OutputMode::Events).await?;

        if mode == OutputMode::Events {
            if let Some(stream_url) = prediction.urls.stream.clone() {
                log::info!("Streaming prediction {} events", prediction.id);
                return self.open_events(&stream_url).await;
            }
            log::warn!("Prediction {} has no stream URL, polling instead", prediction.id);
        }

        let prediction = self.wait_for(prediction).await?;
        match shape_output(mode, prediction.output) {
            Shaped::Ready(output) => Ok(output),
            Shaped::Download(url) => self.download(&url).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::testing::StubServer;

    #[test]
    fn targets_latest_or_pinned_version() {
        let (url, version) = prediction_target("https://api.replicate.com/v1", "bytedance/seedream-4");
        assert_eq!(url, "https://api.replicate.com/v1/models/bytedance/seedream-4/predictions");
        assert_eq!(version, None);

        let (url, version) = prediction_target("http://localhost:9000", "owner/model:abc123");
        assert_eq!(url, "http://localhost:9000/predictions");
        assert_eq!(version.as_deref(), Some("abc123"));
    }

    #[test]
    fn prediction_parsing_and_failures() {
        let prediction: Prediction = serde_json::from_value(json!({
            "id": "p1",
            "status": "failed",
            "error": "NSFW content detected",
            "urls": {"get": "https://api.replicate.com/v1/predictions/p1"}
        }))
        .unwrap();
        assert!(prediction.is_terminal());
        assert_eq!(
            prediction.failure().to_string(),
            "Provider error: NSFW content detected"
        );

        let running: Prediction =
            serde_json::from_value(json!({"id": "p2", "status": "processing"})).unwrap();
        assert!(!running.is_terminal());
        assert!(running.output.is_null());
        assert!(running.failure().to_string().contains("p2 processing"));
    }

    #[test]
    fn url_mode_passes_json_through() {
        match shape_output(OutputMode::Urls, json!(["https://example.com/a.png"])) {
            Shaped::Ready(RunOutput::Direct(ProviderOutput::List(items))) => {
                assert!(matches!(&items[0], ProviderOutput::Text(url) if url.ends_with("a.png")));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[tokio::test]
    async fn file_mode_wraps_urls() {
        assert!(matches!(
            shape_output(OutputMode::Files, json!("https://example.com/a.png")),
            Shaped::Download(url) if url == "https://example.com/a.png"
        ));

        match shape_output(OutputMode::Files, json!(["https://example.com/b.png", null])) {
            Shaped::Ready(RunOutput::Direct(ProviderOutput::List(items))) => {
                match &items[0] {
                    ProviderOutput::File(file) => {
                        assert_eq!(file.url().await.unwrap(), "https://example.com/b.png")
                    }
                    other => panic!("expected a file, got {other:?}"),
                }
                assert!(items[1].is_null());
            }
            other => panic!("unexpected {other:?}"),
        }

        assert!(matches!(
            shape_output(OutputMode::Files, json!({"base64": "QUJD"})),
            Shaped::Ready(RunOutput::Direct(ProviderOutput::Object(_)))
        ));
    }

    #[test]
    fn sse_events_map_to_stream_items() {
        let output = stream_event(SseEvent {
            event: "output".into(),
            data: "https://example.com/a.png".into(),
        });
        assert!(matches!(
            output,
            Some(Ok(StreamEvent::Value(ProviderOutput::Text(url)))) if url == "https://example.com/a.png"
        ));

        let error = stream_event(SseEvent {
            event: "error".into(),
            data: r#"{"detail": "out of credit"}"#.into(),
        });
        assert!(matches!(error, Some(Err(StudioError::TransportError(m))) if m == "out of credit"));

        assert!(stream_event(SseEvent {
            event: "message".into(),
            data: String::new()
        })
        .is_none());
    }

    #[test]
    fn client_requires_a_token() {
        assert!(ReplicateClient::new(Client::new(), ReplicateConfig::default()).is_err());
        assert!(ReplicateClient::new(Client::new(), ReplicateConfig::default().with_token("r8_x")).is_ok());
    }

    const SEEDREAM_PATH: &str = "/v1/models/bytedance/seedream-4/predictions";

    fn client(server: &StubServer, mode: OutputMode) -> ReplicateClient {
        let mut config = ReplicateConfig::default()
            .with_token("r8_test")
            .with_api_base(server.url("/v1/"))
            .with_output_mode(mode);
        config.poll_interval_ms = 5;
        ReplicateClient::new(Client::builder().no_proxy().build().unwrap(), config).unwrap()
    }

    #[actix_web::test]
    async fn inline_result_downloads_single_file() {
        let server = StubServer::start();
        server.json(
            "POST",
            SEEDREAM_PATH,
            201,
            json!({"id": "p1", "status": "succeeded", "output": server.url("/files/out.png")}),
        );
        server.respond("GET", "/files/out.png", 200, "image/png", vec![7u8, 8, 9]);

        let output = client(&server, OutputMode::Files)
            .run("bytedance/seedream-4", json!({"prompt": "cube"}))
            .await
            .unwrap();
        let mut downloaded = Vec::new();
        match output {
            RunOutput::Direct(ProviderOutput::ByteStream(mut chunks)) => {
                while let Some(chunk) = chunks.next().await {
                    downloaded.extend_from_slice(&chunk.unwrap());
                }
            }
            other => panic!("expected a byte stream, got {other:?}"),
        }
        assert_eq!(downloaded, vec![7, 8, 9]);

        let requests = server.requests();
        assert_eq!(requests[0].method, "POST");
        assert_eq!(requests[0].prefer.as_deref(), Some("wait=60"));
        assert_eq!(requests[0].authorization.as_deref(), Some("Bearer r8_test"));
        assert_eq!(requests[0].body["input"]["prompt"], "cube");
        assert_eq!(requests[0].body["stream"], false);
        assert!(requests[0].body.get("version").is_none());
        assert_eq!(requests[1].path, "/files/out.png");
        server.stop().await;
    }

    #[actix_web::test]
    async fn pinned_version_is_polled_until_done() {
        let server = StubServer::start();
        let poll = server.url("/v1/predictions/p2");
        server.json(
            "POST",
            "/v1/predictions",
            201,
            json!({"id": "p2", "status": "starting", "urls": {"get": poll}}),
        );
        server.json("GET", "/v1/predictions/p2", 200, json!({"id": "p2", "status": "processing", "urls": {"get": poll}}));
        server.json(
            "GET",
            "/v1/predictions/p2",
            200,
            json!({"id": "p2", "status": "succeeded", "output": ["https://cdn.example.com/a.png"], "urls": {"get": poll}}),
        );

        let output = client(&server, OutputMode::Urls)
            .run("owner/model:abc123", json!({"prompt": "cube"}))
            .await
            .unwrap();
        match output {
            RunOutput::Direct(ProviderOutput::List(items)) => {
                assert!(matches!(&items[0], ProviderOutput::Text(url) if url.ends_with("a.png")));
            }
            other => panic!("unexpected {other:?}"),
        }

        let requests = server.requests();
        assert_eq!(requests.len(), 3);
        assert_eq!(requests[0].body["version"], "abc123");
        assert!(requests[1..].iter().all(|r| r.method == "GET" && r.path == "/v1/predictions/p2"));
        assert!(requests[1].authorization.is_some());
        server.stop().await;
    }

    #[actix_web::test]
    async fn failed_and_canceled_predictions_are_errors() {
        let server = StubServer::start();
        let poll = server.url("/v1/predictions/p3");
        server.json("POST", SEEDREAM_PATH, 201, json!({"id": "p3", "status": "starting", "urls": {"get": poll}}));
        server.json(
            "GET",
            "/v1/predictions/p3",
            200,
            json!({"id": "p3", "status": "failed", "error": "NSFW content detected"}),
        );

        let err = client(&server, OutputMode::Files)
            .run("bytedance/seedream-4", json!({"prompt": "cube"}))
            .await
            .unwrap_err();
        assert!(matches!(err, StudioError::TransportError(m) if m == "NSFW content detected"));

        server.json("POST", "/v1/models/owner/other/predictions", 201, json!({"id": "p4", "status": "canceled"}));
        let err = client(&server, OutputMode::Files)
            .run("owner/other", json!({"prompt": "cube"}))
            .await
            .unwrap_err();
        assert!(matches!(err, StudioError::TransportError(m) if m == "prediction p4 canceled"));
        server.stop().await;
    }

    #[actix_web::test]
    async fn error_responses_prefer_detail() {
        let server = StubServer::start();
        server.json(
            "POST",
            SEEDREAM_PATH,
            422,
            json!({"title": "Input validation failed", "detail": "prompt is required"}),
        );

        let err = client(&server, OutputMode::Files)
            .run("bytedance/seedream-4", json!({}))
            .await
            .unwrap_err();
        assert!(matches!(err, StudioError::TransportError(m) if m == "prompt is required"));
        server.stop().await;
    }

    #[actix_web::test]
    async fn event_stream_ends_at_done() {
        let server = StubServer::start();
        server.json(
            "POST",
            SEEDREAM_PATH,
            201,
            json!({"id": "p5", "status": "starting", "urls": {"stream": server.url("/stream/p5")}}),
        );
        server.respond(
            "GET",
            "/stream/p5",
            200,
            "text/event-stream",
            "event: output\r\ndata: https://cdn.example.com/a.png\r\n\r\nevent: done\ndata: {}\n\nevent: output\ndata: late\n\n",
        );

        let output = client(&server, OutputMode::Events)
            .run("bytedance/seedream-4", json!({"prompt": "cube"}))
            .await
            .unwrap();
        let events: Vec<Result<StreamEvent>> = match output {
            RunOutput::Stream(events) => events.collect().await,
            other => panic!("expected events, got {other:?}"),
        };
        assert_eq!(events.len(), 1);
        assert!(matches!(
            &events[0],
            Ok(StreamEvent::Value(ProviderOutput::Text(url))) if url == "https://cdn.example.com/a.png"
        ));

        let requests = server.requests();
        assert_eq!(requests[0].prefer, None);
        assert_eq!(requests[0].body["stream"], true);
        server.stop().await;
    }

    #[actix_web::test]
    async fn event_stream_error_is_forwarded() {
        let server = StubServer::start();
        server.json(
            "POST",
            SEEDREAM_PATH,
            201,
            json!({"id": "p6", "status": "starting", "urls": {"stream": server.url("/stream/p6")}}),
        );
        server.respond(
            "GET",
            "/stream/p6",
            200,
            "text/event-stream",
            "event: error\ndata: {\"detail\": \"out of credit\"}\n\n",
        );

        let output = client(&server, OutputMode::Events)
            .run("bytedance/seedream-4", json!({"prompt": "cube"}))
            .await
            .unwrap();
        let events: Vec<Result<StreamEvent>> = match output {
            RunOutput::Stream(events) => events.collect().await,
            other => panic!("expected events, got {other:?}"),
        };
        assert!(matches!(&events[..], [Err(StudioError::TransportError(m))] if m == "out of credit"));
        server.stop().await;
    }
}
