//! Parser for MovieLens CSV files.
//!
//! - ratings.csv: userId,movieId,rating,timestamp
//! - links.csv: movieId,imdbId,tmdbId
//! - movies.csv: movieId,title,genres
//!
//! Every file starts with a header row. Titles may be quoted and contain
//! commas, so parsing goes through the `csv` crate with serde records.

use crate::error::{DataLoadError, Result};
use crate::types::*;
use serde::de::DeserializeOwned;
use std::fs::File;
use std::io::{ErrorKind, Read};
use std::path::Path;

pub const RATINGS_FILE: &str = "ratings.csv";
pub const LINKS_FILE: &str = "links.csv";
pub const MOVIES_FILE: &str = "movies.csv";

fn open(path: &Path) -> Result<File> {
    File::open(path).map_err(|e| {
        if e.kind() == ErrorKind::NotFound {
            DataLoadError::FileNotFound {
                path: path.display().to_string(),
            }
        } else {
            e.into()
        }
    })
}

/// Deserialize every record of a headed CSV stream after checking the header
fn read_records<T, R>(reader: R, file: &str, required: &[&str]) -> Result<Vec<T>>
where
    T: DeserializeOwned,
    R: Read,
{
    let mut rdr = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader);

    let headers = rdr.headers().map_err(|source| DataLoadError::Csv {
        file: file.to_string(),
        source,
    })?;
    for column in required {
        if !headers.iter().any(|h| h == *column) {
            return Err(DataLoadError::MissingColumn {
                file: file.to_string(),
                column: column.to_string(),
            });
        }
    }

    rdr.deserialize()
        .map(|record| {
            record.map_err(|source| DataLoadError::Csv {
                file: file.to_string(),
                source,
            })
        })
        .collect()
}

/// Parse the ratings.csv file
pub fn parse_ratings(path: &Path) -> Result<Vec<RawRating>> {
    read_records(
        open(path)?,
        RATINGS_FILE,
        &["userId", "movieId", "rating", "timestamp"],
    )
}

/// Parse the links.csv file
///
/// Rows with an empty tmdbId parse fine; they are dropped later as unmappable.
pub fn parse_links(path: &Path) -> Result<Vec<RawLink>> {
    read_records(open(path)?, LINKS_FILE, &["movieId", "imdbId", "tmdbId"])
}

/// Parse the movies.csv file
pub fn parse_movies(path: &Path) -> Result<Vec<RawMovie>> {
    read_records(open(path)?, MOVIES_FILE, &["movieId", "title", "genres"])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_movies_with_quoted_title() {
        let data = "movieId,title,genres\n\
                    1,Toy Story (1995),Adventure|Animation|Children|Comedy|Fantasy\n\
                    11,\"American President, The (1995)\",Comedy|Drama|Romance\n";
        let movies: Vec<RawMovie> =
            read_records(data.as_bytes(), MOVIES_FILE, &["movieId", "title", "genres"]).unwrap();

        assert_eq!(movies.len(), 2);
        assert_eq!(movies[1].title, "American President, The (1995)");
        assert_eq!(movies[1].category_set().len(), 3);
    }

    #[test]
    fn test_parse_links_with_missing_tmdb() {
        let data = "movieId,imdbId,tmdbId\n1,0114709,862\n791,0113610,\n";
        let links: Vec<RawLink> =
            read_records(data.as_bytes(), LINKS_FILE, &["movieId", "tmdbId"]).unwrap();

        assert_eq!(links[0].tmdb_id, Some(862));
        assert_eq!(links[1].tmdb_id, None);
    }

    #[test]
    fn test_no_genres_marker_is_empty_set() {
        let movie = RawMovie {
            movie_id: 1,
            title: "Nothing".to_string(),
            genres: NO_CATEGORY_TAG.to_string(),
        };
        assert!(movie.category_set().is_empty());
    }

    #[test]
    fn test_missing_column_is_reported() {
        let data = "userId,movieId,timestamp\n1,1,100\n";
        let result: Result<Vec<RawRating>> = read_records(
            data.as_bytes(),
            RATINGS_FILE,
            &["userId", "movieId", "rating", "timestamp"],
        );
        assert!(matches!(
            result,
            Err(DataLoadError::MissingColumn { ref column, .. }) if column == "rating"
        ));
    }

    #[test]
    fn test_bad_rating_value_is_fatal() {
        let data = "userId,movieId,rating,timestamp\n1,1,four,100\n";
        let result: Result<Vec<RawRating>> = read_records(
            data.as_bytes(),
            RATINGS_FILE,
            &["userId", "movieId", "rating", "timestamp"],
        );
        assert!(matches!(result, Err(DataLoadError::Csv { .. })));
    }

    #[test]
    fn test_missing_file() {
        let result = parse_ratings(Path::new("/definitely/not/here/ratings.csv"));
        assert!(matches!(result, Err(DataLoadError::FileNotFound { .. })));
    }
}
