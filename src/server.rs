use crate::adapter::ImageAdapter;
use crate::builder;
use crate::error::{Result, StudioError};
use crate::models::{catalog, Category, GarmentCategory, GenerateSettings, ImageResult};
use crate::state::{SelectionStateManager, StudioSnapshot};
use actix_web::http::StatusCode;
use actix_web::{web, HttpResponse, ResponseError};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::{Mutex, MutexGuard};
use uuid::Uuid;

pub struct AppState {
    pub adapter: ImageAdapter,
    studio: Mutex<SelectionStateManager>,
}

impl AppState {
    pub fn new(adapter: ImageAdapter, studio: SelectionStateManager) -> Self {
        Self {
            adapter,
            studio: Mutex::new(studio),
        }
    }

    fn studio(&self) -> Result<MutexGuard<'_, SelectionStateManager>> {
        self.studio
            .lock()
            .map_err(|_| StudioError::StorageError("studio state is unavailable".into()))
    }

    async fn generate(&self, settings: &GenerateSettings) -> Result<ImageResult> {
        let input = builder::build_for(self.adapter.profile(), settings)?;
        self.adapter.invoke(&input).await
    }
}

impl ResponseError for StudioError {
    fn status_code(&self) -> StatusCode {
        if self.is_validation() {
            StatusCode::BAD_REQUEST
        } else {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(json!({ "error": self.to_string() }))
    }
}

#[derive(Debug, Deserialize)]
pub struct SelectionUpdate {
    pub category: Category,
    pub value: String,
}

#[derive(Debug, Deserialize)]
pub struct CategoryUpdate {
    pub category: GarmentCategory,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StudioImage {
    #[serde(flatten)]
    pub image: ImageResult,
    pub prompt: String,
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.app_data(
        web::JsonConfig::default()
            .limit(4 * 1024 * 1024)
            .error_handler(|err, _req| {
                log::warn!("Rejected request body: {}", err);
                StudioError::validation(err.to_string()).into()
            }),
    )
    .route("/health", web::get().to(health))
    .service(
        web::scope("/api")
            .route("/generate", web::post().to(generate))
            .route("/options", web::get().to(options))
            .service(
                web::scope("/studio")
                    .route("", web::get().to(studio))
                    .route("/selection", web::put().to(select))
                    .route("/category", web::put().to(set_category))
                    .route("/settings", web::put().to(update_settings))
                    .route("/randomize", web::post().to(randomize))
                    .route("/reset", web::post().to(reset))
                    .route("/generate", web::post().to(generate_from_studio)),
            ),
    );
}

async fn health() -> HttpResponse {
    HttpResponse::Ok().json(json!({ "status": "ok" }))
}

async fn generate(
    state: web::Data<AppState>,
    body: web::Json<GenerateSettings>,
) -> Result<HttpResponse> {
    let request_id = Uuid::new_v4();
    log::info!("[{}] POST /api/generate", request_id);
    match state.generate(&body).await {
        Ok(image) => Ok(HttpResponse::Ok().json(image)),
        Err(e) => {
            log::error!("[{}] Generation failed: {}", request_id, e);
            Err(e)
        }
    }
}

async fn options() -> HttpResponse {
    HttpResponse::Ok().json(catalog())
}

fn snapshot_response(snapshot: StudioSnapshot) -> Result<HttpResponse> {
    Ok(HttpResponse::Ok().json(snapshot))
}

async fn studio(state: web::Data<AppState>) -> Result<HttpResponse> {
    snapshot_response(state.studio()?.snapshot())
}

async fn select(
    state: web::Data<AppState>,
    body: web::Json<SelectionUpdate>,
) -> Result<HttpResponse> {
    let mut studio = state.studio()?;
    studio.select(body.category, &body.value)?;
    snapshot_response(studio.snapshot())
}

async fn set_category(
    state: web::Data<AppState>,
    body: web::Json<CategoryUpdate>,
) -> Result<HttpResponse> {
    let mut studio = state.studio()?;
    studio.set_category(body.category);
    snapshot_response(studio.snapshot())
}

async fn update_settings(
    state: web::Data<AppState>,
    body: web::Json<GenerateSettings>,
) -> Result<HttpResponse> {
    let mut studio = state.studio()?;
    studio.update_settings(body.into_inner());
    snapshot_response(studio.snapshot())
}

async fn randomize(state: web::Data<AppState>) -> Result<HttpResponse> {
    let mut studio = state.studio()?;
    studio.randomize();
    snapshot_response(studio.snapshot())
}

async fn reset(state: web::Data<AppState>) -> Result<HttpResponse> {
    let mut studio = state.studio()?;
    studio.reset();
    snapshot_response(studio.snapshot())
}

fn optional_settings(body: &[u8]) -> Result<Option<GenerateSettings>> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(None);
    }
    serde_json::from_slice(body)
        .map(Some)
        .map_err(|e| StudioError::validation(format!("Invalid request body: {}", e)))
}

async fn generate_from_studio(
    state: web::Data<AppState>,
    body: web::Bytes,
) -> Result<HttpResponse> {
    let request_id = Uuid::new_v4();
    let overrides = optional_settings(&body)?;
    let settings = state.studio()?.generation_settings(overrides)?;
    let prompt = settings
        .prompt
        .as_ref()
        .and_then(|p| p.as_str())
        .unwrap_or_default()
        .to_string();
    log::info!("[{}] POST /api/studio/generate", request_id);

    match state.generate(&settings).await {
        Ok(image) => Ok(HttpResponse::Ok().json(StudioImage { image, prompt })),
        Err(e) => {
            log::error!("[{}] Generation failed: {}", request_id, e);
            Err(e)
        }
    }
}
