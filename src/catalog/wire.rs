//! Raw response shapes of the TMDB v3 API and their validation into the
//! typed model. Every field is optional on the wire; the conversions decide
//! which ones are required.

use chrono::NaiveDate;
use serde::Deserialize;

use super::error::FetchError;
use super::types::*;

#[derive(Debug, Deserialize)]
pub struct RawPage {
    pub page: Option<u32>,
    pub results: Option<Vec<RawMovie>>,
    pub total_pages: Option<u32>,
    pub total_results: Option<u64>,
}

#[derive(Debug, Deserialize)]
pub struct RawMovie {
    pub id: Option<u64>,
    pub title: Option<String>,
    pub original_title: Option<String>,
    pub overview: Option<String>,
    pub poster_path: Option<String>,
    pub backdrop_path: Option<String>,
    pub release_date: Option<String>,
    pub vote_average: Option<f64>,
    pub vote_count: Option<u64>,
    #[serde(default)]
    pub genre_ids: Vec<u32>,
}

#[derive(Debug, Deserialize)]
pub struct RawMovieDetails {
    #[serde(flatten)]
    pub movie: RawMovie,
    pub tagline: Option<String>,
    pub runtime: Option<u32>,
    pub budget: Option<u64>,
    pub revenue: Option<u64>,
    pub status: Option<String>,
    pub homepage: Option<String>,
    pub imdb_id: Option<String>,
    #[serde(default)]
    pub genres: Vec<RawGenre>,
    #[serde(default)]
    pub production_companies: Vec<RawCompany>,
    #[serde(default)]
    pub spoken_languages: Vec<RawLanguage>,
    #[serde(default)]
    pub production_countries: Vec<RawCountry>,
}

#[derive(Debug, Deserialize)]
pub struct RawGenre {
    pub id: u32,
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct RawGenreList {
    pub genres: Option<Vec<RawGenre>>,
}

#[derive(Debug, Deserialize)]
pub struct RawCompany {
    pub id: u64,
    pub name: String,
    pub logo_path: Option<String>,
    pub origin_country: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct RawLanguage {
    pub iso_639_1: String,
    #[serde(default)]
    pub name: String,
    pub english_name: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct RawCountry {
    pub iso_3166_1: String,
    pub name: String,
}

/// Error body the service sends with non-2xx statuses.
#[derive(Debug, Deserialize)]
pub struct RawStatus {
    pub status_code: Option<i64>,
    pub status_message: Option<String>,
}

/// Strip empty strings the service uses in place of null.
fn non_empty(s: Option<String>) -> Option<String> {
    s.filter(|v| !v.trim().is_empty())
}

fn parse_release_date(raw: Option<String>, id: u64) -> Result<Option<NaiveDate>, FetchError> {
    match non_empty(raw) {
        None => Ok(None),
        Some(s) => NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d")
            .map(Some)
            .map_err(|_| {
                FetchError::Validation(format!("movie {}: malformed release_date {:?}", id, s))
            }),
    }
}

impl TryFrom<RawMovie> for Movie {
    type Error = FetchError;

    fn try_from(raw: RawMovie) -> Result<Self, Self::Error> {
        let id = raw
            .id
            .ok_or_else(|| FetchError::Validation("movie without id".to_string()))?;
        let title = non_empty(raw.title)
            .or_else(|| non_empty(raw.original_title))
            .ok_or_else(|| FetchError::Validation(format!("movie {} has no title", id)))?;
        let release_date = parse_release_date(raw.release_date, id)?;

        let mut genre_ids: Vec<GenreId> = Vec::with_capacity(raw.genre_ids.len());
        for g in raw.genre_ids {
            let g = GenreId(g);
            if !genre_ids.contains(&g) {
                genre_ids.push(g);
            }
        }

        Ok(Movie {
            id: MovieId(id),
            title,
            overview: raw.overview.unwrap_or_default(),
            poster_path: non_empty(raw.poster_path),
            backdrop_path: non_empty(raw.backdrop_path),
            release_date,
            vote_average: raw.vote_average.unwrap_or(0.0),
            vote_count: raw.vote_count.unwrap_or(0),
            genre_ids,
        })
    }
}

impl TryFrom<RawPage> for MoviePage {
    type Error = FetchError;

    fn try_from(raw: RawPage) -> Result<Self, Self::Error> {
        let results = raw
            .results
            .ok_or_else(|| FetchError::Validation("response has no results array".to_string()))?;
        let movies = results
            .into_iter()
            .map(Movie::try_from)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(MoviePage {
            page: raw.page.unwrap_or(1),
            movies,
            total_pages: raw.total_pages.unwrap_or(0),
            total_results: raw.total_results.unwrap_or(0),
        })
    }
}

impl TryFrom<RawMovieDetails> for MovieDetails {
    type Error = FetchError;

    fn try_from(raw: RawMovieDetails) -> Result<Self, Self::Error> {
        let mut movie = Movie::try_from(raw.movie)?;
        // The details endpoint returns full genre objects instead of ids.
        if movie.genre_ids.is_empty() {
            movie.genre_ids = raw.genres.iter().map(|g| GenreId(g.id)).collect();
        }

        Ok(MovieDetails {
            movie,
            tagline: non_empty(raw.tagline),
            runtime: raw.runtime.filter(|r| *r > 0),
            budget: raw.budget.unwrap_or(0),
            revenue: raw.revenue.unwrap_or(0),
            status: non_empty(raw.status),
            homepage: non_empty(raw.homepage),
            imdb_id: non_empty(raw.imdb_id),
            genres: raw.genres.into_iter().map(Genre::from).collect(),
            production_companies: raw
                .production_companies
                .into_iter()
                .map(|c| ProductionCompany {
                    id: c.id,
                    name: c.name,
                    logo_path: non_empty(c.logo_path),
                    origin_country: non_empty(c.origin_country),
                })
                .collect(),
            spoken_languages: raw
                .spoken_languages
                .into_iter()
                .map(|l| SpokenLanguage {
                    iso_639_1: l.iso_639_1,
                    name: l.name,
                    english_name: non_empty(l.english_name),
                })
                .collect(),
            production_countries: raw
                .production_countries
                .into_iter()
                .map(|c| ProductionCountry {
                    iso_3166_1: c.iso_3166_1,
                    name: c.name,
                })
                .collect(),
        })
    }
}

impl From<RawGenre> for Genre {
    fn from(raw: RawGenre) -> Self {
        Genre {
            id: GenreId(raw.id),
            name: raw.name,
        }
    }
}

impl TryFrom<RawGenreList> for Vec<Genre> {
    type Error = FetchError;

    fn try_from(raw: RawGenreList) -> Result<Self, Self::Error> {
        let genres = raw
            .genres
            .ok_or_else(|| FetchError::Validation("response has no genres array".to_string()))?;
        Ok(genres.into_iter().map(Genre::from).collect())
    }
}
