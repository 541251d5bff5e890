pub mod client;
pub mod error;
pub mod genres;
pub mod image;
pub mod types;
pub mod wire;

pub use client::{Catalog, TmdbClient};
pub use error::FetchError;
pub use genres::GenreCache;
pub use image::{ImageSize, ImageUrls};
pub use types::{
    Genre, GenreId, Movie, MovieDetails, MovieId, MovieList, MoviePage, ProductionCompany,
    ProductionCountry, SpokenLanguage, TrendingWindow,
};
