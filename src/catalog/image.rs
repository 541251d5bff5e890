use serde::{Deserialize, Serialize};

pub const DEFAULT_IMAGE_BASE_URL: &str = "https://image.tmdb.org/t/p";
pub const DEFAULT_PLACEHOLDER: &str = "https://via.placeholder.com/500x750?text=No+Poster";

/// Size tokens accepted by the image CDN.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageSize {
    W92,
    W185,
    W342,
    W500,
    W780,
    W1280,
    Original,
}

impl ImageSize {
    pub fn as_str(&self) -> &'static str {
        match self {
            ImageSize::W92 => "w92",
            ImageSize::W185 => "w185",
            ImageSize::W342 => "w342",
            ImageSize::W500 => "w500",
            ImageSize::W780 => "w780",
            ImageSize::W1280 => "w1280",
            ImageSize::Original => "original",
        }
    }
}

/// Turns the relative image references found on movies into loadable URLs.
#[derive(Debug, Clone)]
pub struct ImageUrls {
    base_url: String,
    placeholder: String,
}

impl Default for ImageUrls {
    fn default() -> Self {
        Self::new(DEFAULT_IMAGE_BASE_URL, DEFAULT_PLACEHOLDER)
    }
}

impl ImageUrls {
    pub fn new(base_url: &str, placeholder: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            placeholder: placeholder.to_string(),
        }
    }

    pub fn url(&self, path: Option<&str>, size: ImageSize) -> String {
        let path = match path.map(str::trim) {
            Some(p) if !p.is_empty() && p != "/" => p,
            _ => return self.placeholder.clone(),
        };

        let encoded: Vec<String> = path
            .trim_start_matches('/')
            .split('/')
            .map(|s| urlencoding::encode(s).to_string())
            .collect();

        format!("{}/{}/{}", self.base_url, size.as_str(), encoded.join("/"))
    }

    pub fn poster(&self, path: Option<&str>) -> String {
        self.url(path, ImageSize::W500)
    }

    pub fn backdrop(&self, path: Option<&str>) -> String {
        self.url(path, ImageSize::W1280)
    }
}
