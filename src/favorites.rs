use serde::Serialize;

use crate::catalog::{Movie, MovieId};

/// Movies the user has marked, unique by id, in the order they were added.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FavoritesSet {
    items: Vec<Movie>,
}

impl FavoritesSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add the movie if absent, remove it if present. Returns whether it is a
    /// favorite afterwards.
    pub fn toggle(&mut self, movie: Movie) -> bool {
        if let Some(pos) = self.items.iter().position(|m| m.id == movie.id) {
            self.items.remove(pos);
            false
        } else {
            self.items.push(movie);
            true
        }
    }

    pub fn is_favorite(&self, id: MovieId) -> bool {
        self.items.iter().any(|m| m.id == id)
    }

    pub fn list(&self) -> Vec<Movie> {
        self.items.clone()
    }

    pub fn ids(&self) -> impl Iterator<Item = MovieId> + '_ {
        self.items.iter().map(|m| m.id)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }
}
