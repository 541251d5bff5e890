use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MovieId(pub u64);

impl fmt::Display for MovieId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GenreId(pub u32);

impl fmt::Display for GenreId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A movie as it appears in listings. Values are never mutated after they
/// come out of the catalog client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Movie {
    pub id: MovieId,
    pub title: String,
    pub overview: String,
    pub poster_path: Option<String>,
    pub backdrop_path: Option<String>,
    pub release_date: Option<NaiveDate>,
    pub vote_average: f64,
    pub vote_count: u64,
    pub genre_ids: Vec<GenreId>,
}

impl Movie {
    pub fn release_year(&self) -> Option<i32> {
        self.release_date.map(|d| d.year())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Genre {
    pub id: GenreId,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductionCompany {
    pub id: u64,
    pub name: String,
    pub logo_path: Option<String>,
    pub origin_country: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpokenLanguage {
    pub iso_639_1: String,
    pub name: String,
    pub english_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductionCountry {
    pub iso_3166_1: String,
    pub name: String,
}

/// The expanded single-movie record returned by the details endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MovieDetails {
    #[serde(flatten)]
    pub movie: Movie,
    pub tagline: Option<String>,
    /// Minutes.
    pub runtime: Option<u32>,
    pub budget: u64,
    pub revenue: u64,
    pub status: Option<String>,
    pub homepage: Option<String>,
    pub imdb_id: Option<String>,
    pub genres: Vec<Genre>,
    pub production_companies: Vec<ProductionCompany>,
    pub spoken_languages: Vec<SpokenLanguage>,
    pub production_countries: Vec<ProductionCountry>,
}

/// One page of movies as reported by the catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MoviePage {
    pub page: u32,
    pub movies: Vec<Movie>,
    pub total_pages: u32,
    pub total_results: u64,
}

/// The curated lists served under `/movie/{list}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MovieList {
    Popular,
    TopRated,
    Upcoming,
    NowPlaying,
}

impl MovieList {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "popular" => Some(MovieList::Popular),
            "top_rated" | "toprated" | "top-rated" => Some(MovieList::TopRated),
            "upcoming" => Some(MovieList::Upcoming),
            "now_playing" | "nowplaying" | "now-playing" => Some(MovieList::NowPlaying),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            MovieList::Popular => "popular",
            MovieList::TopRated => "top_rated",
            MovieList::Upcoming => "upcoming",
            MovieList::NowPlaying => "now_playing",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrendingWindow {
    Day,
    Week,
}

impl TrendingWindow {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "day" => Some(TrendingWindow::Day),
            "week" => Some(TrendingWindow::Week),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TrendingWindow::Day => "day",
            TrendingWindow::Week => "week",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_movie_list_from_str() {
        assert_eq!(MovieList::from_str("popular"), Some(MovieList::Popular));
        assert_eq!(MovieList::from_str("Top_Rated"), Some(MovieList::TopRated));
        assert_eq!(MovieList::from_str("now-playing"), Some(MovieList::NowPlaying));
        assert_eq!(MovieList::from_str("latest"), None);
    }

    #[test]
    fn test_release_year() {
        let movie = Movie {
            id: MovieId(27205),
            title: "Inception".to_string(),
            overview: String::new(),
            poster_path: None,
            backdrop_path: None,
            release_date: NaiveDate::from_ymd_opt(2010, 7, 15),
            vote_average: 8.4,
            vote_count: 35000,
            genre_ids: vec![GenreId(28)],
        };
        assert_eq!(movie.release_year(), Some(2010));
    }
}
