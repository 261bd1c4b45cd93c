//! Translation of search requests into the index's native query DSL.

use serde::{
    Serialize, Serializer,
    ser::{SerializeMap, SerializeStruct},
};

use crate::application::search::{SearchRequest, SortField};

/// Fields matched by free-text queries, in priority order.
pub const SEARCH_FIELDS: [&str; 5] = [
    "actors_names",
    "writers_names",
    "title",
    "description",
    "genre",
];

/// Documents requested from the index per query, independent of page size.
pub const DEFAULT_MAX_WINDOW: usize = 250;

pub const RATING_SORT_FIELD: &str = "imdb_rating";
pub const TITLE_SORT_FIELD: &str = "title.raw";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Asc,
    Desc,
}

/// One entry of the `sort` array, serialized as `{ "<field>": { "order": .. } }`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortClause {
    pub field: &'static str,
    pub order: SortOrder,
}

impl SortClause {
    pub fn desc(field: &'static str) -> Self {
        Self {
            field,
            order: SortOrder::Desc,
        }
    }
}

impl Serialize for SortClause {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        struct Order(SortOrder);

        impl Serialize for Order {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                let mut state = serializer.serialize_struct("Order", 1)?;
                state.serialize_field("order", &self.0)?;
                state.end()
            }
        }

        let mut map = serializer.serialize_map(Some(1))?;
        map.serialize_entry(self.field, &Order(self.order))?;
        map.end()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MultiMatch {
    pub query: String,
    pub fields: Vec<&'static str>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum QueryClause {
    #[serde(rename = "multi_match")]
    MultiMatch(MultiMatch),
}

/// Request body for the index `_search` endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NativeQuery {
    pub size: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub query: Option<QueryClause>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub sort: Vec<SortClause>,
}

#[derive(Debug, Clone, Copy)]
pub struct QueryBuilder {
    max_window: usize,
}

impl Default for QueryBuilder {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_WINDOW)
    }
}

impl QueryBuilder {
    pub fn new(max_window: usize) -> Self {
        Self { max_window }
    }

    pub fn max_window(&self) -> usize {
        self.max_window
    }

    pub fn build(&self, request: &SearchRequest) -> NativeQuery {
        let query = request.text().map(|text| {
            QueryClause::MultiMatch(MultiMatch {
                query: text.to_string(),
                fields: SEARCH_FIELDS.to_vec(),
            })
        });

        NativeQuery {
            size: self.max_window,
            query,
            sort: request.sort_field().map(sort_clause).into_iter().collect(),
        }
    }
}

/// Ties keep the index's own order; no secondary key is added.
pub fn sort_clause(field: SortField) -> SortClause {
    match field {
        SortField::Rating => SortClause::desc(RATING_SORT_FIELD),
        SortField::Title => SortClause::desc(TITLE_SORT_FIELD),
    }
}
