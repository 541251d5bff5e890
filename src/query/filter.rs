use crate::catalog::GenreId;

use super::types::{FilterSet, SortKey};

pub const MIN_YEAR: i32 = 1874;
pub const MAX_YEAR: i32 = 2100;

/// Malformed filter input. Raised before anything reaches the state manager.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ValidationError {
    #[error("Unknown filter field: {0}")]
    UnknownField(String),
    #[error("Unknown sort key: {0}")]
    UnknownSortKey(String),
    #[error("Invalid year: {0}")]
    InvalidYear(String),
    #[error("Invalid genre id: {0}")]
    InvalidGenre(String),
    #[error("Invalid minimum rating: {0}")]
    InvalidRating(String),
}

/// A single validated edit to a filter set. `None` clears the field.
#[derive(Debug, Clone, PartialEq)]
pub enum FilterChange {
    SortBy(SortKey),
    Year(Option<i32>),
    Genre(Option<GenreId>),
    MinRating(Option<f64>),
}

impl FilterChange {
    /// Parse a form field as the UI submits it. An empty value clears the
    /// field; for `sortBy` it restores the default order.
    pub fn parse(field: &str, value: &str) -> Result<Self, ValidationError> {
        let value = value.trim();
        match field.to_lowercase().as_str() {
            "sortby" | "sort_by" | "sort" => {
                if value.is_empty() {
                    return Ok(FilterChange::SortBy(SortKey::default()));
                }
                SortKey::from_str(value)
                    .map(FilterChange::SortBy)
                    .ok_or_else(|| ValidationError::UnknownSortKey(value.to_string()))
            }
            "year" => parse_optional(value, parse_year).map(FilterChange::Year),
            "genre" | "genre_id" => parse_optional(value, parse_genre).map(FilterChange::Genre),
            "rating" | "min_rating" => {
                parse_optional(value, parse_rating).map(FilterChange::MinRating)
            }
            _ => Err(ValidationError::UnknownField(field.to_string())),
        }
    }

    pub fn apply(&self, filters: &mut FilterSet) {
        match *self {
            FilterChange::SortBy(key) => filters.sort_by = key,
            FilterChange::Year(year) => filters.year = year,
            FilterChange::Genre(genre) => filters.genre = genre,
            FilterChange::MinRating(rating) => filters.min_rating = rating,
        }
    }
}

fn parse_optional<T>(
    value: &str,
    parse: fn(&str) -> Result<T, ValidationError>,
) -> Result<Option<T>, ValidationError> {
    if value.is_empty() {
        Ok(None)
    } else {
        parse(value).map(Some)
    }
}

fn parse_year(value: &str) -> Result<i32, ValidationError> {
    match value.parse::<i32>() {
        Ok(y) if (MIN_YEAR..=MAX_YEAR).contains(&y) => Ok(y),
        _ => Err(ValidationError::InvalidYear(value.to_string())),
    }
}

fn parse_genre(value: &str) -> Result<GenreId, ValidationError> {
    value
        .parse::<u32>()
        .map(GenreId)
        .map_err(|_| ValidationError::InvalidGenre(value.to_string()))
}

fn parse_rating(value: &str) -> Result<f64, ValidationError> {
    match value.parse::<f64>() {
        Ok(r) if r.is_finite() && (0.0..=10.0).contains(&r) => Ok(r),
        _ => Err(ValidationError::InvalidRating(value.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_sort_by() {
        assert_eq!(
            FilterChange::parse("sortBy", "vote_average.desc").unwrap(),
            FilterChange::SortBy(SortKey::RatingDesc)
        );
        assert_eq!(
            FilterChange::parse("sortBy", "").unwrap(),
            FilterChange::SortBy(SortKey::PopularityDesc)
        );
        assert_eq!(
            FilterChange::parse("sortBy", "title.asc"),
            Err(ValidationError::UnknownSortKey("title.asc".to_string()))
        );
    }

    #[test]
    fn test_parse_year() {
        assert_eq!(FilterChange::parse("year", "1999").unwrap(), FilterChange::Year(Some(1999)));
        assert_eq!(FilterChange::parse("year", " ").unwrap(), FilterChange::Year(None));
        assert!(matches!(
            FilterChange::parse("year", "nineteen"),
            Err(ValidationError::InvalidYear(_))
        ));
        assert!(matches!(
            FilterChange::parse("year", "1200"),
            Err(ValidationError::InvalidYear(_))
        ));
    }

    #[test]
    fn test_parse_genre_and_rating() {
        assert_eq!(
            FilterChange::parse("genre", "878").unwrap(),
            FilterChange::Genre(Some(GenreId(878)))
        );
        assert!(matches!(
            FilterChange::parse("genre", "scifi"),
            Err(ValidationError::InvalidGenre(_))
        ));
        assert_eq!(
            FilterChange::parse("rating", "7").unwrap(),
            FilterChange::MinRating(Some(7.0))
        );
        assert!(matches!(
            FilterChange::parse("rating", "11"),
            Err(ValidationError::InvalidRating(_))
        ));
        assert!(matches!(
            FilterChange::parse("rating", "NaN"),
            Err(ValidationError::InvalidRating(_))
        ));
    }

    #[test]
    fn test_unknown_field() {
        assert_eq!(
            FilterChange::parse("language", "fr"),
            Err(ValidationError::UnknownField("language".to_string()))
        );
    }

    #[test]
    fn test_apply() {
        let mut filters = FilterSet::default();
        FilterChange::Year(Some(2010)).apply(&mut filters);
        FilterChange::Genre(Some(GenreId(28))).apply(&mut filters);
        assert_eq!(filters.year, Some(2010));
        assert_eq!(filters.genre, Some(GenreId(28)));
        FilterChange::Year(None).apply(&mut filters);
        assert_eq!(filters.year, None);
    }
}
