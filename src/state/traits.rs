use crate::error::Result;

pub const SELECTION_KEY: &str = "studioSelections";
pub const ASPECT_RATIO_KEY: &str = "studioAspectRatio";

/// Whole-value key/value persistence for studio state.
///
/// Values are opaque strings; each save replaces the previous value.
pub trait SelectionStore: Send + Sync {
    fn load(&self, key: &str) -> Result<Option<String>>;
    fn save(&self, key: &str, value: &str) -> Result<()>;
    fn remove(&self, key: &str) -> Result<()>;
}
