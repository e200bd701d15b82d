pub mod adapter;
pub mod builder;
pub mod config;
pub mod error;
pub mod logger;
pub mod models;
pub mod prompt;
pub mod replicate;
#[cfg(feature = "server")]
pub mod server;
pub mod state;

pub use adapter::{HttpImageFetcher, ImageAdapter, ImageFetcher, ModelRunner};
pub use config::{Config, OutputMode, ReplicateConfig};
pub use error::{Result, StudioError};
pub use models::{
    Category, GarmentCategory, GenerateSettings, ImageResult, ModelInput, ModelProfile,
    SelectionRecord,
};
pub use replicate::ReplicateClient;
pub use state::{JsonFileStore, MemoryStore, SelectionStateManager, SelectionStore};
