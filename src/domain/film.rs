//! Film documents as stored in the search index and the cache.

use serde::{Deserialize, Deserializer, Serialize};

use super::error::DomainError;

/// A person credited on a film (actor or writer), embedded by value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Person {
    pub id: String,
    pub name: String,
}

/// A film document.
///
/// Field names match the index mapping so the same type decodes `_source`
/// payloads and the cached JSON. List fields tolerate `null` on input and are
/// always written back as arrays.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Film {
    pub id: String,
    #[serde(default, deserialize_with = "null_as_zero")]
    pub imdb_rating: f64,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub genre: Vec<String>,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub director: Vec<String>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub actors: Vec<Person>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub actors_names: Vec<String>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub writers: Vec<Person>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub writers_names: Vec<String>,
}

impl Film {
    /// Minimal film with only the required fields set.
    pub fn new(id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            imdb_rating: 0.0,
            genre: Vec::new(),
            title: title.into(),
            description: None,
            director: Vec::new(),
            actors: Vec::new(),
            actors_names: Vec::new(),
            writers: Vec::new(),
            writers_names: Vec::new(),
        }
    }

    /// Reject documents that cannot be addressed by identifier.
    pub fn validate(&self) -> Result<(), DomainError> {
        if self.id.trim().is_empty() {
            return Err(DomainError::validation("film id must not be empty"));
        }
        Ok(())
    }
}

fn null_as_empty<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Option::<Vec<T>>::deserialize(deserializer)?.unwrap_or_default())
}

fn null_as_zero<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<f64>::deserialize(deserializer)?.unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn full_film() -> Film {
        Film {
            id: "tt0137523".to_string(),
            imdb_rating: 8.8,
            genre: vec!["Drama".to_string()],
            title: "Fight Club".to_string(),
            description: Some("An insomniac office worker...".to_string()),
            director: vec!["David Fincher".to_string()],
            actors: vec![Person {
                id: "nm0000093".to_string(),
                name: "Brad Pitt".to_string(),
            }],
            actors_names: vec!["Brad Pitt".to_string()],
            writers: vec![Person {
                id: "nm0657333".to_string(),
                name: "Chuck Palahniuk".to_string(),
            }],
            writers_names: vec!["Chuck Palahniuk".to_string()],
        }
    }

    #[test]
    fn wire_roundtrip_preserves_every_field() {
        let film = full_film();
        let bytes = serde_json::to_vec(&film).expect("serialize film");
        let decoded: Film = serde_json::from_slice(&bytes).expect("decode film");
        assert_eq!(decoded, film);
    }

    #[test]
    fn empty_lists_stay_distinct_from_absent_description() {
        let film = Film::new("tt001", "Fight Club");
        let value = serde_json::to_value(&film).expect("serialize film");

        assert_eq!(value["genre"], json!([]));
        assert_eq!(value["director"], json!([]));
        assert_eq!(value["actors"], json!([]));
        assert_eq!(value["description"], json!(null));

        let decoded: Film = serde_json::from_value(value).expect("decode film");
        assert!(decoded.genre.is_empty());
        assert!(decoded.description.is_none());
        assert_eq!(decoded, film);
    }

    #[test]
    fn index_source_with_nulls_and_missing_fields_decodes() {
        let source = json!({
            "id": "tt001",
            "imdb_rating": null,
            "genre": null,
            "title": "Fight Club",
        });

        let film: Film = serde_json::from_value(source).expect("decode source");
        assert_eq!(film.imdb_rating, 0.0);
        assert!(film.genre.is_empty());
        assert!(film.actors.is_empty());
        assert!(film.writers_names.is_empty());
    }

    #[test]
    fn title_is_required() {
        let source = json!({ "id": "tt001" });
        assert!(serde_json::from_value::<Film>(source).is_err());
    }

    #[test]
    fn blank_id_fails_validation() {
        let film = Film::new("  ", "Untitled");
        assert!(matches!(
            film.validate(),
            Err(DomainError::Validation { .. })
        ));
        assert!(full_film().validate().is_ok());
    }
}
