use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Easy,
    Medium,
    Difficult,
}

impl Difficulty {
    pub fn as_str(self) -> &'static str {
        match self {
            Difficulty::Easy => "easy",
            Difficulty::Medium => "medium",
            Difficulty::Difficult => "difficult",
        }
    }
}

#[derive(Debug, thiserror::Error)]
#[error("difficulty must be one of: easy, medium, difficult (got {0})")]
pub struct ParseDifficultyError(String);

impl TryFrom<String> for Difficulty {
    type Error = ParseDifficultyError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        match value.as_str() {
            "easy" => Ok(Difficulty::Easy),
            "medium" => Ok(Difficulty::Medium),
            "difficult" => Ok(Difficulty::Difficult),
            _ => Err(ParseDifficultyError(value)),
        }
    }
}

#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Tour {
    pub id: Uuid,
    pub name: String,
    pub slug: String,
    pub duration: i32,
    pub max_group_size: i32,
    #[sqlx(try_from = "String")]
    pub difficulty: Difficulty,
    pub ratings_average: f64,
    pub ratings_quantity: i32,
    pub price: f64,
    pub price_discount: Option<f64>,
    pub summary: String,
    pub description: String,
    pub image_cover: String,
    pub images: Vec<String>,
    #[serde(serialize_with = "rfc3339_vec::serialize")]
    pub start_dates: Vec<OffsetDateTime>,
    #[serde(skip_serializing)]
    pub secret_tour: bool,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

/// RFC 3339 in and out for date lists; time only ships the scalar helpers.
pub(crate) mod rfc3339_vec {
    use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
    use time::{format_description::well_known::Rfc3339, OffsetDateTime};

    pub fn serialize<S: Serializer>(
        dates: &[OffsetDateTime],
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        let formatted = dates
            .iter()
            .map(|d| d.format(&Rfc3339))
            .collect::<Result<Vec<_>, _>>()
            .map_err(serde::ser::Error::custom)?;
        formatted.serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Vec<OffsetDateTime>, D::Error> {
        let raw = Vec::<String>::deserialize(deserializer)?;
        raw.iter()
            .map(|s| OffsetDateTime::parse(s, &Rfc3339).map_err(de::Error::custom))
            .collect()
    }

    pub fn deserialize_option<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<Vec<OffsetDateTime>>, D::Error> {
        let raw = Option::<Vec<String>>::deserialize(deserializer)?;
        raw.map(|dates| {
            dates
                .iter()
                .map(|s| OffsetDateTime::parse(s, &Rfc3339).map_err(de::Error::custom))
                .collect()
        })
        .transpose()
    }
}

/// URL slug from a tour name: "The Forest Hiker" -> "the-forest-hiker".
pub fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    let mut last_dash = true;
    for c in name.chars() {
        if c.is_ascii_alphanumeric() {
            slug.push(c.to_ascii_lowercase());
            last_dash = false;
        } else if !last_dash {
            slug.push('-');
            last_dash = true;
        }
    }
    while slug.ends_with('-') {
        slug.pop();
    }
    slug
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slugify_basics() {
        assert_eq!(slugify("The Forest Hiker"), "the-forest-hiker");
        assert_eq!(slugify("  Sea & Surf!  "), "sea-surf");
        assert_eq!(slugify("Åre Trek"), "re-trek");
    }

    #[test]
    fn difficulty_round_trips_through_text() {
        for d in [Difficulty::Easy, Difficulty::Medium, Difficulty::Difficult] {
            assert_eq!(Difficulty::try_from(d.as_str().to_string()).unwrap(), d);
        }
        assert!(Difficulty::try_from("impossible".to_string()).is_err());
    }

    #[test]
    fn secret_flag_never_serializes() {
        let tour = Tour {
            id: Uuid::new_v4(),
            name: "The Forest Hiker".into(),
            slug: "the-forest-hiker".into(),
            duration: 5,
            max_group_size: 25,
            difficulty: Difficulty::Easy,
            ratings_average: 4.5,
            ratings_quantity: 0,
            price: 397.0,
            price_discount: None,
            summary: "A walk".into(),
            description: "A long walk".into(),
            image_cover: "cover.jpg".into(),
            images: vec![],
            start_dates: vec![],
            secret_tour: true,
            created_at: OffsetDateTime::now_utc(),
        };
        let json = serde_json::to_string(&tour).unwrap();
        assert!(!json.contains("secret"));
        assert!(json.contains("maxGroupSize"));
    }
}
