use super::options::{self, MALE, NO_FACIAL_HAIR};
use crate::error::{Result, StudioError};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Gender,
    Age,
    BodyType,
    HairColor,
    HairStyle,
    FacialHair,
    Expression,
    Background,
}

impl Category {
    pub const ALL: [Category; 8] = [
        Category::Gender,
        Category::Age,
        Category::BodyType,
        Category::HairColor,
        Category::HairStyle,
        Category::FacialHair,
        Category::Expression,
        Category::Background,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Gender => "gender",
            Category::Age => "age",
            Category::BodyType => "body_type",
            Category::HairColor => "hair_color",
            Category::HairStyle => "hair_style",
            Category::FacialHair => "facial_hair",
            Category::Expression => "expression",
            Category::Background => "background",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GarmentCategory {
    #[default]
    Clothing,
    Headwear,
    Jewelry,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectionRecord {
    pub gender: String,
    pub hair_color: String,
    pub hair_style: String,
    pub facial_hair: String,
    pub body_type: String,
    pub age: String,
    pub expression: String,
    pub background: String,
}

impl Default for SelectionRecord {
    fn default() -> Self {
        SelectionRecord {
            gender: options::GENDERS[0].to_string(),
            hair_color: options::HAIR_COLORS[0].to_string(),
            hair_style: options::hair_styles_for(options::GENDERS[0])[0].to_string(),
            facial_hair: NO_FACIAL_HAIR.to_string(),
            body_type: options::BODY_TYPES[0].to_string(),
            age: options::AGES[0].to_string(),
            expression: options::EXPRESSIONS[0].to_string(),
            background: options::BACKGROUNDS[0].to_string(),
        }
    }
}

impl SelectionRecord {
    pub fn get(&self, category: Category) -> &str {
        match category {
            Category::Gender => &self.gender,
            Category::HairColor => &self.hair_color,
            Category::HairStyle => &self.hair_style,
            Category::FacialHair => &self.facial_hair,
            Category::BodyType => &self.body_type,
            Category::Age => &self.age,
            Category::Expression => &self.expression,
            Category::Background => &self.background,
        }
    }

    pub(crate) fn set(&mut self, category: Category, value: impl Into<String>) {
        let slot = match category {
            Category::Gender => &mut self.gender,
            Category::HairColor => &mut self.hair_color,
            Category::HairStyle => &mut self.hair_style,
            Category::FacialHair => &mut self.facial_hair,
            Category::BodyType => &mut self.body_type,
            Category::Age => &mut self.age,
            Category::Expression => &mut self.expression,
            Category::Background => &mut self.background,
        };
        *slot = value.into();
    }

    pub fn is_male(&self) -> bool {
        self.gender == MALE
    }

    /// Every value must be non-empty and drawn from its category's list;
    /// facial hair must be the sentinel unless the gender is male.
    pub fn validate(&self) -> Result<()> {
        for category in Category::ALL {
            let value = self.get(category);
            if value.trim().is_empty() {
                return Err(StudioError::validation(format!("{} is required", category)));
            }
            if !options::is_allowed(category, &self.gender, value) {
                return Err(StudioError::validation(format!(
                    "'{}' is not a valid {}",
                    value, category
                )));
            }
        }
        if !self.is_male() && self.facial_hair != NO_FACIAL_HAIR {
            return Err(StudioError::validation(
                "facial_hair must be None unless gender is Male",
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_first_listed_values() {
        let record = SelectionRecord::default();
        assert_eq!(record.gender, "Male");
        assert_eq!(record.hair_style, "Buzz Cut");
        assert_eq!(record.facial_hair, "None");
        assert_eq!(record.background, "Studio White");
        assert!(record.validate().is_ok());
    }

    #[test]
    fn validate_rejects_foreign_and_empty_values() {
        let mut record = SelectionRecord::default();
        record.set(Category::HairStyle, "Ponytail");
        assert!(record.validate().is_err());

        let mut record = SelectionRecord::default();
        record.set(Category::Expression, "");
        let err = record.validate().unwrap_err();
        assert!(err.to_string().contains("expression is required"));
    }

    #[test]
    fn validate_rejects_facial_hair_on_non_male() {
        let mut record = SelectionRecord::default();
        record.set(Category::Gender, "Female");
        record.set(Category::HairStyle, "Long");
        record.set(Category::FacialHair, "Goatee");
        assert!(record.validate().is_err());
    }

    #[test]
    fn record_uses_snake_case_keys() {
        let json = serde_json::to_value(SelectionRecord::default()).unwrap();
        assert_eq!(json["hair_color"], "Black");
        assert_eq!(json["body_type"], "Slim");
        let category: Category = serde_json::from_str("\"facial_hair\"").unwrap();
        assert_eq!(category, Category::FacialHair);
    }
}
