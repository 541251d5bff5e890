use std::sync::Arc;

use arc_swap::ArcSwap;
use tracing::{error, info};

use super::client::Catalog;
use super::error::FetchError;
use super::types::{Genre, GenreId};

/// The catalog's genre list, fetched once and swapped in whole on refresh so
/// readers never block.
pub struct GenreCache {
    genres: ArcSwap<Vec<Genre>>,
}

impl Default for GenreCache {
    fn default() -> Self {
        Self::new()
    }
}

impl GenreCache {
    pub fn new() -> Self {
        Self {
            genres: ArcSwap::from_pointee(Vec::new()),
        }
    }

    pub fn get(&self) -> Arc<Vec<Genre>> {
        self.genres.load_full()
    }

    pub fn is_empty(&self) -> bool {
        self.genres.load().is_empty()
    }

    pub fn name(&self, id: GenreId) -> Option<String> {
        self.genres
            .load()
            .iter()
            .find(|g| g.id == id)
            .map(|g| g.name.clone())
    }

    pub fn names(&self, ids: &[GenreId]) -> Vec<String> {
        let genres = self.genres.load();
        ids.iter()
            .filter_map(|id| genres.iter().find(|g| g.id == *id).map(|g| g.name.clone()))
            .collect()
    }

    pub async fn refresh(&self, catalog: &dyn Catalog) -> Result<usize, FetchError> {
        let mut genres = catalog.genres().await?;
        genres.sort_by(|a, b| a.name.cmp(&b.name));
        let count = genres.len();
        self.genres.store(Arc::new(genres));
        Ok(count)
    }

    /// Refresh every `interval_secs`. The first refresh happens one interval
    /// from now; startup loads the list itself.
    pub fn start_background_refresh(self: Arc<Self>, catalog: Arc<dyn Catalog>, interval_secs: u64) {
        tokio::spawn(async move {
            let mut interval =
                tokio::time::interval(tokio::time::Duration::from_secs(interval_secs));
            interval.tick().await;
            loop {
                interval.tick().await;
                match self.refresh(catalog.as_ref()).await {
                    Ok(count) => info!("Loaded {} genres", count),
                    Err(e) => error!("Failed to refresh genre list: {}", e),
                }
            }
        });
    }
}
