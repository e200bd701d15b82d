use super::selection::Category;
use serde::Serialize;

pub const MALE: &str = "Male";
pub const BALD: &str = "Bald";
/// Sentinel for "no facial hair"; forced whenever the gender is not male.
pub const NO_FACIAL_HAIR: &str = "None";

pub const GENDERS: &[&str] = &["Male", "Female"];

pub const HAIR_COLORS: &[&str] = &[
    "Black",
    "Dark Brown",
    "Brown",
    "Blonde",
    "Red",
    "Gray",
    "Salt and Pepper",
];

pub const HAIR_STYLES_MALE: &[&str] = &[
    "Buzz Cut",
    "Short",
    "Medium",
    "Slicked Back",
    "Man Bun",
    "Bald",
];

pub const HAIR_STYLES_FEMALE: &[&str] = &[
    "Pixie Cut",
    "Short Bob",
    "Shoulder Length",
    "Long",
    "Ponytail",
    "Bun",
    "Bald",
];

pub const FACIAL_HAIR: &[&str] = &["None", "Light Stubble", "Goatee", "Mustache", "Short Beard"];

pub const BODY_TYPES: &[&str] = &["Slim", "Athletic", "Average"];

pub const AGES: &[&str] = &["Young Adult", "Adult", "Middle-aged"];

pub const EXPRESSIONS: &[&str] = &["Neutral", "Soft smile", "Serious"];

pub const BACKGROUNDS: &[&str] = &[
    "Studio White",
    "Studio Grey",
    "Outdoor Park",
    "Urban Street",
    "Beach Sunset",
];

pub fn hair_styles_for(gender: &str) -> &'static [&'static str] {
    if gender == MALE {
        HAIR_STYLES_MALE
    } else {
        HAIR_STYLES_FEMALE
    }
}

pub fn options_for(category: Category, gender: &str) -> &'static [&'static str] {
    match category {
        Category::Gender => GENDERS,
        Category::HairColor => HAIR_COLORS,
        Category::HairStyle => hair_styles_for(gender),
        Category::FacialHair => FACIAL_HAIR,
        Category::BodyType => BODY_TYPES,
        Category::Age => AGES,
        Category::Expression => EXPRESSIONS,
        Category::Background => BACKGROUNDS,
    }
}

pub fn is_allowed(category: Category, gender: &str, value: &str) -> bool {
    options_for(category, gender).contains(&value)
}

#[derive(Debug, Clone, Serialize)]
pub struct OptionCatalog {
    pub gender: &'static [&'static str],
    pub hair_color: &'static [&'static str],
    pub hair_style_male: &'static [&'static str],
    pub hair_style_female: &'static [&'static str],
    pub facial_hair: &'static [&'static str],
    pub body_type: &'static [&'static str],
    pub age: &'static [&'static str],
    pub expression: &'static [&'static str],
    pub background: &'static [&'static str],
    pub dropdown_order: Vec<Category>,
}

pub fn catalog() -> OptionCatalog {
    OptionCatalog {
        gender: GENDERS,
        hair_color: HAIR_COLORS,
        hair_style_male: HAIR_STYLES_MALE,
        hair_style_female: HAIR_STYLES_FEMALE,
        facial_hair: FACIAL_HAIR,
        body_type: BODY_TYPES,
        age: AGES,
        expression: EXPRESSIONS,
        background: BACKGROUNDS,
        dropdown_order: Category::ALL.to_vec(),
    }
}
