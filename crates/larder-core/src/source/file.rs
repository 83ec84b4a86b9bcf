//! Explicit recipe locations: local paths or HTTP(S) URLs.

use std::path::{Path, PathBuf};

use tokio_util::sync::CancellationToken;
use tracing::debug;
use url::Url;

use crate::recipe::{Recipe, parse_recipe};
use crate::types::DiscoveryManifest;

use super::local::load_file;
use super::{FetchError, HttpClient, RecipeFetcher, RecipeLoader, ensure_not_cancelled};

/// Loads recipes from a fixed list of paths or URLs.
///
/// Every location is explicit, so any failure to load one is returned to
/// the caller rather than skipped.
#[derive(Debug)]
pub struct RecipeFileFetcher {
    http: HttpClient,
    locations: Vec<String>,
}

/// How a location string is read.
#[derive(Debug, PartialEq, Eq)]
enum Location {
    Remote(Url),
    Local(PathBuf),
}

impl RecipeFileFetcher {
    pub fn new(http: HttpClient) -> Self {
        Self {
            http,
            locations: Vec::new(),
        }
    }

    pub fn with_locations(mut self, locations: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.locations = locations.into_iter().map(Into::into).collect();
        self
    }

    pub fn locations(&self) -> &[String] {
        &self.locations
    }

    /// Load one recipe from a path or URL.
    pub fn load(&self, location: &str, cancel: &CancellationToken) -> Result<Recipe, FetchError> {
        ensure_not_cancelled(cancel)?;
        if location.trim().is_empty() {
            return Err(FetchError::EmptyPath);
        }

        match classify(location)? {
            Location::Remote(url) => {
                debug!(url = %url, "loading recipe from URL");
                let body = self.http.get_text(url.as_str(), cancel)?;
                parse_recipe(&body).map_err(|source| FetchError::Invalid {
                    location: location.to_string(),
                    source,
                })
            }
            Location::Local(path) => {
                debug!(path = %path.display(), "loading recipe from file");
                load_file(&path)
            }
        }
    }
}

impl RecipeLoader for RecipeFileFetcher {
    fn load(&self, location: &str, cancel: &CancellationToken) -> Result<Recipe, FetchError> {
        RecipeFileFetcher::load(self, location, cancel)
    }
}

impl RecipeFetcher for RecipeFileFetcher {
    fn fetch_recipes(
        &self,
        _manifest: &DiscoveryManifest,
        cancel: &CancellationToken,
    ) -> Result<Vec<Recipe>, FetchError> {
        self.locations
            .iter()
            .map(|location| self.load(location, cancel))
            .collect()
    }
}

/// Anything with a URL scheme is fetched over HTTP; everything else is a
/// path. Single-letter schemes are Windows drive letters.
fn classify(location: &str) -> Result<Location, FetchError> {
    let url = match Url::parse(location) {
        Ok(url) => url,
        Err(_) => return Ok(Location::Local(PathBuf::from(location))),
    };

    match url.scheme() {
        "http" | "https" => Ok(Location::Remote(url)),
        "file" => url
            .to_file_path()
            .map(Location::Local)
            .map_err(|_| FetchError::UnsupportedScheme {
                location: location.to_string(),
                scheme: "file".to_string(),
            }),
        scheme if scheme.len() == 1 => Ok(Location::Local(Path::new(location).to_path_buf())),
        scheme => Err(FetchError::UnsupportedScheme {
            location: location.to_string(),
            scheme: scheme.to_string(),
        }),
    }
}
