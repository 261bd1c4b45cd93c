//! Elasticsearch-backed film index over the REST API.

use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode};
use serde::Deserialize;
use serde_json::{Map, Value};
use tracing::{debug, info};
use url::Url;

use crate::application::query::NativeQuery;
use crate::application::repos::{FilmIndex, IndexError, SearchHits};
use crate::config::ElasticSettings;
use crate::domain::film::Film;

use super::error::InfraError;

const SOURCE: &str = "infra::elastic::ElasticFilmIndex";

#[derive(Clone, Debug)]
struct Credentials {
    user: String,
    password: Option<String>,
}

/// Film index stored in a single Elasticsearch index.
#[derive(Clone, Debug)]
pub struct ElasticFilmIndex {
    client: Client,
    base: Url,
    index: String,
    credentials: Option<Credentials>,
}

impl ElasticFilmIndex {
    pub fn new(settings: &ElasticSettings) -> Result<Self, InfraError> {
        let client = Client::builder()
            .user_agent(Self::user_agent())
            .timeout(settings.timeout)
            .build()
            .map_err(|err| InfraError::backend("elasticsearch", err.to_string()))?;

        let credentials = settings.user.as_ref().map(|user| Credentials {
            user: user.clone(),
            password: settings.password.clone(),
        });

        info!(
            target_module = SOURCE,
            url = %settings.url,
            index = %settings.index,
            authenticated = credentials.is_some(),
            "configured elasticsearch index"
        );

        Ok(Self {
            client,
            base: settings.url.clone(),
            index: settings.index.clone(),
            credentials,
        })
    }

    pub fn user_agent() -> &'static str {
        concat!("film-search/", env!("CARGO_PKG_VERSION"))
    }

    fn url(&self, segments: &[&str]) -> Result<Url, IndexError> {
        let mut url = self.base.clone();
        {
            let mut path = url
                .path_segments_mut()
                .map_err(|_| IndexError::transport(format!("`{}` cannot be a base", self.base)))?;
            path.pop_if_empty().push(&self.index);
            for segment in segments {
                path.push(segment);
            }
        }
        Ok(url)
    }

    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.credentials {
            Some(credentials) => {
                request.basic_auth(&credentials.user, credentials.password.as_deref())
            }
            None => request,
        }
    }
}

#[async_trait]
impl FilmIndex for ElasticFilmIndex {
    async fn get_by_id(&self, id: &str) -> Result<Option<Film>, IndexError> {
        let url = self.url(&["_doc", id])?;
        let response = self
            .authorize(self.client.get(url))
            .send()
            .await
            .map_err(map_transport)?;

        let status = response.status();
        let bytes = response.bytes().await.map_err(map_transport)?;
        // A missing index also answers 404, without the `found` flag.
        if status == StatusCode::NOT_FOUND && is_missing_document(&bytes) {
            debug!(target_module = SOURCE, film_id = id, "document not found");
            return Ok(None);
        }

        let document: GetResponse = decode_body(status, &bytes)?;
        if !document.found {
            return Ok(None);
        }
        let source = document
            .source
            .ok_or_else(|| IndexError::decode("document found without `_source`"))?;
        film_from_source(document.id, source).map(Some)
    }

    async fn execute(&self, query: &NativeQuery) -> Result<SearchHits, IndexError> {
        let url = self.url(&["_search"])?;
        let response = self
            .authorize(self.client.post(url))
            .json(query)
            .send()
            .await
            .map_err(map_transport)?;

        let body: SearchResponse = read_json(response).await?;
        let documents = body
            .hits
            .hits
            .into_iter()
            .map(|hit| film_from_source(hit.id, hit.source))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(SearchHits {
            total: body.hits.total.value(),
            documents,
        })
    }
}

async fn read_json<T: for<'de> Deserialize<'de>>(response: Response) -> Result<T, IndexError> {
    let status = response.status();
    let bytes = response.bytes().await.map_err(map_transport)?;
    decode_body(status, &bytes)
}

fn decode_body<T: for<'de> Deserialize<'de>>(
    status: StatusCode,
    bytes: &[u8],
) -> Result<T, IndexError> {
    if !status.is_success() {
        return Err(IndexError::Status {
            status: status.as_u16(),
            body: String::from_utf8_lossy(bytes).into_owned(),
        });
    }
    serde_json::from_slice(bytes).map_err(IndexError::decode)
}

/// True only for a get response that reports `"found": false`.
fn is_missing_document(body: &[u8]) -> bool {
    #[derive(Deserialize)]
    struct FoundFlag {
        found: Option<bool>,
    }

    serde_json::from_slice::<FoundFlag>(body).is_ok_and(|flag| flag.found == Some(false))
}

fn map_transport(err: reqwest::Error) -> IndexError {
    if err.is_timeout() {
        IndexError::Timeout
    } else {
        IndexError::transport(err)
    }
}

/// Documents may omit `id` from their source; the hit id fills it in.
fn film_from_source(hit_id: String, mut source: Map<String, Value>) -> Result<Film, IndexError> {
    source.entry("id").or_insert(Value::String(hit_id));
    serde_json::from_value(Value::Object(source)).map_err(IndexError::decode)
}

#[derive(Debug, Deserialize)]
struct GetResponse {
    #[serde(rename = "_id")]
    id: String,
    #[serde(default)]
    found: bool,
    #[serde(rename = "_source")]
    source: Option<Map<String, Value>>,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    hits: HitsEnvelope,
}

#[derive(Debug, Deserialize)]
struct HitsEnvelope {
    total: TotalHits,
    #[serde(default)]
    hits: Vec<Hit>,
}

#[derive(Debug, Deserialize)]
struct Hit {
    #[serde(rename = "_id")]
    id: String,
    #[serde(rename = "_source")]
    source: Map<String, Value>,
}

/// `hits.total` is an object on 7.x and later, a bare number before.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum TotalHits {
    Count(u64),
    Object { value: u64 },
}

impl TotalHits {
    fn value(&self) -> u64 {
        match self {
            TotalHits::Count(value) | TotalHits::Object { value } => *value,
        }
    }
}
