use crate::models::options::{BALD, NO_FACIAL_HAIR};
use crate::models::{GarmentCategory, SelectionRecord};

const DEFAULT_BACKGROUND: &str =
    "shot against a seamless, solid light gray background with bright, even studio lighting";

fn background_clause(background: &str) -> &'static str {
    match background {
        "Studio White" => {
            "shot against a seamless, solid white background with bright, even studio lighting"
        }
        "Studio Grey" => DEFAULT_BACKGROUND,
        "Outdoor Park" => {
            "shot against a tranquil park scene with lush greenery and soft, natural sunlight, creating a fresh and calm mood"
        }
        "Urban Street" => {
            "shot against a dynamic urban street scene with blurred city lights and modern architecture, creating an energetic and sophisticated mood"
        }
        "Beach Sunset" => {
            "shot against a serene beach at sunset with dramatic golden hour lighting and waves in the background, creating a romantic and peaceful mood"
        }
        _ => DEFAULT_BACKGROUND,
    }
}

fn hair_description(selection: &SelectionRecord) -> String {
    if selection.hair_style == BALD {
        "a bald head".to_string()
    } else {
        format!(
            "{} {} hair",
            selection.hair_style.to_lowercase(),
            selection.hair_color.to_lowercase()
        )
    }
}

fn facial_hair_clause(selection: &SelectionRecord) -> String {
    if selection.is_male()
        && !selection.facial_hair.is_empty()
        && selection.facial_hair != NO_FACIAL_HAIR
    {
        format!(", with {} facial hair", selection.facial_hair.to_lowercase())
    } else {
        String::new()
    }
}

/// Compose the prompt for `category`. Deterministic: the same record always
/// yields the same sentence.
pub fn compose(selection: &SelectionRecord, category: GarmentCategory) -> String {
    let age = selection.age.to_lowercase();
    let gender = selection.gender.to_lowercase();
    let build = selection.body_type.to_lowercase();
    let expression = selection.expression.to_lowercase();
    let hair = hair_description(selection);
    let facial_hair = facial_hair_clause(selection);
    let background = background_clause(&selection.background);

    let prompt = match category {
        GarmentCategory::Headwear => format!(
            "A high-resolution, front-facing photorealistic portrait of a {age} German {gender} model \
             with a {build} build and fair skin. The model has {hair}{facial_hair}, with their head \
             upright and directly facing the camera in a neutral pose. The model is wearing a plain, \
             form-fitting white t-shirt. The background is {background}. The facial expression is \
             {expression}. The model's hair is styled to be compatible with headwear. No headwear or \
             accessories are present. This is a professional e-commerce catalog photo intended for \
             virtual headwear try-on. Sharp focus, evenly lit, neutral background."
        ),
        GarmentCategory::Clothing | GarmentCategory::Jewelry => format!(
            "A full-body, photorealistic photograph of a {age} German {gender} model with a {build} \
             build and fair skin. The model has {hair}{facial_hair} and is wearing a plain, \
             form-fitting white t-shirt and neutral grey shorts with simple white sneakers. The model \
             is standing in a standard front-facing neutral pose, with arms relaxed at their sides, \
             {background}. The facial expression is {expression}. The entire body, from head to toe, \
             is visible in the frame. High-resolution, sharp focus, professional e-commerce catalogue \
             image."
        ),
    };

    prompt.trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Category;

    fn record(pairs: &[(Category, &str)]) -> SelectionRecord {
        let mut record = SelectionRecord::default();
        for (category, value) in pairs {
            record.set(*category, *value);
        }
        record
    }

    #[test]
    fn full_body_prompt_lowercases_values() {
        let prompt = compose(&SelectionRecord::default(), GarmentCategory::Clothing);
        assert!(prompt.starts_with(
            "A full-body, photorealistic photograph of a young adult German male model with a slim build"
        ));
        assert!(prompt.contains("The model has buzz cut black hair and is wearing"));
        assert!(prompt.contains("The facial expression is neutral."));
        assert!(prompt.contains(
            "with arms relaxed at their sides, shot against a seamless, solid white background with bright, even studio lighting. The facial"
        ));
    }

    #[test]
    fn facial_hair_clause_only_for_male_non_sentinel() {
        let male = record(&[(Category::FacialHair, "Goatee")]);
        assert!(compose(&male, GarmentCategory::Clothing)
            .contains("buzz cut black hair, with goatee facial hair and is wearing"));

        let female = record(&[
            (Category::Gender, "Female"),
            (Category::HairStyle, "Long"),
            (Category::FacialHair, "Goatee"),
        ]);
        assert!(!compose(&female, GarmentCategory::Clothing).contains("facial hair"));

        let sentinel = record(&[(Category::FacialHair, "None")]);
        assert!(!compose(&sentinel, GarmentCategory::Clothing).contains("facial hair"));
    }

    #[test]
    fn bald_replaces_hair_colour() {
        let bald = record(&[
            (Category::HairStyle, "Bald"),
            (Category::HairColor, "Red"),
            (Category::FacialHair, "Short Beard"),
        ]);
        let prompt = compose(&bald, GarmentCategory::Headwear);
        assert!(prompt.contains("The model has a bald head, with short beard facial hair, with their head upright"));
        assert!(!prompt.contains("red hair"));
    }

    #[test]
    fn unknown_background_falls_back_to_studio_grey() {
        let odd = record(&[(Category::Background, "Moon Base")]);
        let grey = record(&[(Category::Background, "Studio Grey")]);
        assert_eq!(
            compose(&odd, GarmentCategory::Clothing),
            compose(&grey, GarmentCategory::Clothing)
        );
        assert!(compose(&odd, GarmentCategory::Headwear)
            .contains("The background is shot against a seamless, solid light gray background"));
    }

    #[test]
    fn jewelry_uses_full_body_template() {
        let record = SelectionRecord::default();
        assert_eq!(
            compose(&record, GarmentCategory::Jewelry),
            compose(&record, GarmentCategory::Clothing)
        );
        assert_ne!(
            compose(&record, GarmentCategory::Headwear),
            compose(&record, GarmentCategory::Clothing)
        );
    }

    #[test]
    fn compose_is_deterministic() {
        let record = record(&[(Category::Background, "Beach Sunset")]);
        assert_eq!(
            compose(&record, GarmentCategory::Headwear),
            compose(&record, GarmentCategory::Headwear)
        );
    }
}
