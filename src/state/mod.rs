pub mod file;
pub mod memory;
pub mod traits;

use crate::builder::parse_image_input_list;
use crate::error::{Result, StudioError};
use crate::models::options::{self, MALE, NO_FACIAL_HAIR};
use crate::models::{
    Category, GarmentCategory, GenerateSettings, SelectionRecord, KONTEXT_ASPECT_RATIOS,
    SEEDREAM_ASPECT_RATIOS,
};
use crate::prompt;
use rand::seq::SliceRandom;
use rand::Rng;
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;

pub use file::JsonFileStore;
pub use memory::MemoryStore;
pub use traits::{SelectionStore, ASPECT_RATIO_KEY, SELECTION_KEY};

#[derive(Debug, Clone, Serialize)]
pub struct StudioSnapshot {
    pub selection: SelectionRecord,
    pub category: GarmentCategory,
    pub settings: GenerateSettings,
    pub hair_style_options: &'static [&'static str],
    pub facial_hair_enabled: bool,
    pub prompt: Option<String>,
}

/// Current attribute selections plus the auxiliary studio settings.
///
/// After construction every change is mirrored to the store. Reset clears
/// the stored copy.
pub struct SelectionStateManager {
    selection: SelectionRecord,
    category: GarmentCategory,
    settings: GenerateSettings,
    store: Arc<dyn SelectionStore>,
    initialized: bool,
}

impl SelectionStateManager {
    pub fn new(store: Arc<dyn SelectionStore>) -> Self {
        let mut manager = Self {
            selection: SelectionRecord::default(),
            category: GarmentCategory::default(),
            settings: GenerateSettings::studio_defaults(),
            store,
            initialized: false,
        };
        manager.restore();
        manager.initialized = true;
        manager
    }

    fn restore(&mut self) {
        match self.store.load(SELECTION_KEY) {
            Ok(Some(raw)) => match serde_json::from_str::<SelectionRecord>(&raw) {
                Ok(record) => match record.validate() {
                    Ok(()) => {
                        log::debug!("Restored saved studio selection");
                        self.selection = record;
                    }
                    Err(e) => log::warn!("Ignoring saved selection: {}", e),
                },
                Err(e) => log::warn!("Failed to load saved settings: {}", e),
            },
            Ok(None) => {}
            Err(e) => log::warn!("Failed to load saved settings: {}", e),
        }

        match self.store.load(ASPECT_RATIO_KEY) {
            Ok(Some(ratio)) if is_known_ratio(&ratio) => {
                self.settings.aspect_ratio = Some(Value::String(ratio));
            }
            Ok(Some(ratio)) => log::warn!("Ignoring saved aspect ratio '{}'", ratio),
            Ok(None) => {}
            Err(e) => log::warn!("Failed to load saved aspect ratio: {}", e),
        }
    }

    fn persist(&self) {
        if !self.initialized {
            return;
        }
        match serde_json::to_string(&self.selection) {
            Ok(raw) => {
                if let Err(e) = self.store.save(SELECTION_KEY, &raw) {
                    log::warn!("Failed to save studio selection: {}", e);
                }
            }
            Err(e) => log::warn!("Failed to serialise studio selection: {}", e),
        }
        if let Some(ratio) = self.settings.aspect_ratio.as_ref().and_then(Value::as_str) {
            if let Err(e) = self.store.save(ASPECT_RATIO_KEY, ratio) {
                log::warn!("Failed to save aspect ratio: {}", e);
            }
        }
    }

    pub fn selection(&self) -> &SelectionRecord {
        &self.selection
    }

    pub fn category(&self) -> GarmentCategory {
        self.category
    }

    pub fn settings(&self) -> &GenerateSettings {
        &self.settings
    }

    /// Set one attribute. Changing gender switches the hair style to that
    /// gender's first option and clears facial hair for non-male genders.
    pub fn select(&mut self, category: Category, value: &str) -> Result<()> {
        let value = value.trim();
        let gender = if category == Category::Gender {
            value
        } else {
            self.selection.gender.as_str()
        };
        if !options::is_allowed(category, gender, value) {
            return Err(StudioError::validation(format!(
                "'{}' is not a valid {}",
                value, category
            )));
        }
        if category == Category::FacialHair && gender != MALE && value != NO_FACIAL_HAIR {
            return Err(StudioError::validation(
                "facial hair can only be chosen for the Male gender",
            ));
        }

        self.selection.set(category, value);
        if category == Category::Gender {
            let first_style = options::hair_styles_for(value)[0];
            self.selection.set(Category::HairStyle, first_style);
            if value != MALE {
                self.selection.set(Category::FacialHair, NO_FACIAL_HAIR);
            }
        }
        self.persist();
        Ok(())
    }

    pub fn randomize(&mut self) {
        self.randomize_with(&mut rand::thread_rng());
    }

    pub fn randomize_with<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        let mut record = SelectionRecord::default();
        for category in Category::ALL {
            if category == Category::FacialHair {
                continue;
            }
            let value = pick(rng, options::options_for(category, &record.gender));
            record.set(category, value);
        }
        let facial_hair = if record.is_male() {
            pick(rng, options::FACIAL_HAIR)
        } else {
            NO_FACIAL_HAIR
        };
        record.set(Category::FacialHair, facial_hair);

        self.selection = record;
        self.persist();
    }

    pub fn reset(&mut self) {
        self.selection = SelectionRecord::default();
        self.category = GarmentCategory::default();
        self.settings = GenerateSettings::studio_defaults();
        for key in [SELECTION_KEY, ASPECT_RATIO_KEY] {
            if let Err(e) = self.store.remove(key) {
                log::warn!("Failed to clear saved {}: {}", key, e);
            }
        }
    }

    pub fn set_category(&mut self, category: GarmentCategory) {
        self.category = category;
    }

    /// Merge model settings; the prompt is always composed, never stored.
    pub fn update_settings(&mut self, mut patch: GenerateSettings) {
        patch.prompt = None;
        self.settings.merge(patch);
        self.persist();
    }

    pub fn compose_prompt(&self) -> Result<String> {
        self.selection.validate()?;
        Ok(prompt::compose(&self.selection, self.category))
    }

    /// Settings ready for the request builder: stored settings, then
    /// `overrides`, then the composed prompt. A free-text reference list is
    /// split into at most ten URLs.
    pub fn generation_settings(&self, overrides: Option<GenerateSettings>) -> Result<GenerateSettings> {
        let prompt = self.compose_prompt()?;
        let mut settings = self.settings.clone();
        if let Some(mut overrides) = overrides {
            overrides.prompt = None;
            settings.merge(overrides);
        }
        if let Some(Value::String(raw)) = settings.image_input.as_ref() {
            let urls = parse_image_input_list(raw);
            settings.image_input = Some(Value::from(urls));
        }
        Ok(settings.with_prompt(prompt))
    }

    pub fn snapshot(&self) -> StudioSnapshot {
        StudioSnapshot {
            selection: self.selection.clone(),
            category: self.category,
            settings: self.settings.clone(),
            hair_style_options: options::hair_styles_for(&self.selection.gender),
            facial_hair_enabled: self.selection.is_male(),
            prompt: self.compose_prompt().ok(),
        }
    }
}

fn pick<R: Rng + ?Sized>(rng: &mut R, values: &'static [&'static str]) -> &'static str {
    values.choose(rng).copied().unwrap_or_default()
}

fn is_known_ratio(ratio: &str) -> bool {
    SEEDREAM_ASPECT_RATIOS.contains(&ratio) || KONTEXT_ASPECT_RATIOS.contains(&ratio)
}
