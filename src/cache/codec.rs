//! Wire format of cached values (JSON).

use serde::{Serialize, de::DeserializeOwned};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CodecError {
    #[error("failed to encode cache value: {0}")]
    Encode(serde_json::Error),
    #[error("failed to decode cache value: {0}")]
    Decode(serde_json::Error),
}

pub fn encode<T: Serialize>(value: &T) -> Result<Vec<u8>, CodecError> {
    serde_json::to_vec(value).map_err(CodecError::Encode)
}

pub fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, CodecError> {
    serde_json::from_slice(bytes).map_err(CodecError::Decode)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::search::SearchResult;
    use crate::domain::film::Film;

    #[test]
    fn search_result_survives_the_wire() {
        let mut film = Film::new("tt001", "Fight Club");
        film.imdb_rating = 8.8;
        film.genre = vec!["Drama".to_string()];
        let result = SearchResult {
            total: 1,
            page: 1,
            results: vec![film],
        };

        let bytes = encode(&result).expect("encode result");
        let decoded: SearchResult = decode(&bytes).expect("decode result");
        assert_eq!(decoded, result);
        assert_eq!(encode(&decoded).expect("re-encode"), bytes);
    }

    #[test]
    fn garbage_is_a_decode_error() {
        let err = decode::<Film>(b"\x00not json").expect_err("garbage must not decode");
        assert!(matches!(err, CodecError::Decode(_)));
    }

    #[test]
    fn wrong_shape_is_a_decode_error() {
        let bytes = encode(&Film::new("tt001", "Fight Club")).expect("encode film");
        assert!(decode::<SearchResult>(&bytes).is_err());
    }
}
