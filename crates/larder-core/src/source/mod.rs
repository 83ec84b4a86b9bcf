//! Recipe sources.
//!
//! Three interchangeable providers of recipes share one capability surface:
//! - [`LocalRecipeFetcher`] scans a directory tree of recipe documents
//! - [`RecipeFileFetcher`] loads explicit paths or URLs
//! - [`RecommendationFetcher`] queries the remote recommendation service
//!
//! [`RecipeSource`] closes the set; the active variant is chosen from
//! configuration at startup.

mod file;
mod http;
mod local;
mod service;

use std::path::PathBuf;

use thiserror::Error;
use tokio_util::sync::CancellationToken;

use crate::recipe::{NormalizeError, Recipe, constrain_recipes};
use crate::types::DiscoveryManifest;

pub use file::RecipeFileFetcher;
pub use http::{DEFAULT_TIMEOUT, HttpClient};
pub use local::LocalRecipeFetcher;
pub use service::{
    DEFAULT_TARGET_ENVIRONMENT, ProcessDetailInput, RecipeMetadata, RecipeVariant,
    RecommendationFetcher, RecommendationsInput, RecommendedRecipe,
};

/// Errors that can occur while fetching recipes.
#[derive(Debug, Error)]
pub enum FetchError {
    /// No recipe with the requested name exists in the source.
    #[error("recipe not found: {name}")]
    RecipeNotFound { name: String },

    /// The source has no location to read from.
    #[error("unable to load recipes from an empty path")]
    EmptyPath,

    /// A local file or directory could not be read.
    #[error("failed to read '{path}': {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A document was read but is not a valid recipe.
    #[error("invalid recipe at '{location}': {source}")]
    Invalid {
        location: String,
        #[source]
        source: NormalizeError,
    },

    /// The location has a URL scheme this source cannot fetch.
    #[error("unsupported URL scheme '{scheme}' in '{location}'")]
    UnsupportedScheme { location: String, scheme: String },

    /// The HTTP client could not be constructed.
    #[error("failed to initialize HTTP client: {0}")]
    Client(String),

    /// The request could not be completed.
    #[error("request to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// The server answered with a non-2xx status.
    #[error("received non-2xx status code {status} from {url}")]
    HttpStatus { url: String, status: u16 },

    /// The server answered with a body we could not interpret.
    #[error("unexpected response from {url}: {reason}")]
    InvalidResponse { url: String, reason: String },

    /// The run was cancelled while fetching.
    #[error("fetch cancelled")]
    Cancelled,
}

impl FetchError {
    pub fn not_found(name: impl Into<String>) -> Self {
        Self::RecipeNotFound { name: name.into() }
    }

    /// The named recipe does not exist (as opposed to a failed lookup).
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::RecipeNotFound { .. })
    }

    /// The failure came from the network or the remote server.
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            Self::Transport { .. } | Self::HttpStatus { .. } | Self::InvalidResponse { .. }
        )
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}

/// Capability surface shared by every recipe source.
pub trait RecipeFetcher {
    /// Every recipe the source can produce, unfiltered by the manifest.
    fn fetch_recipes(
        &self,
        manifest: &DiscoveryManifest,
        cancel: &CancellationToken,
    ) -> Result<Vec<Recipe>, FetchError>;

    /// Recipes compatible with the manifest.
    fn fetch_recommendations(
        &self,
        manifest: &DiscoveryManifest,
        cancel: &CancellationToken,
    ) -> Result<Vec<Recipe>, FetchError> {
        let recipes = self.fetch_recipes(manifest, cancel)?;
        Ok(constrain_recipes(recipes, manifest))
    }

    /// The recommendation with the given name.
    fn fetch_recipe(
        &self,
        manifest: &DiscoveryManifest,
        name: &str,
        cancel: &CancellationToken,
    ) -> Result<Recipe, FetchError> {
        self.fetch_recommendations(manifest, cancel)?
            .into_iter()
            .find(|r| r.name == name)
            .ok_or_else(|| FetchError::not_found(name))
    }
}

/// Loads a single explicitly named recipe location.
pub trait RecipeLoader {
    fn load(&self, location: &str, cancel: &CancellationToken) -> Result<Recipe, FetchError>;
}

/// The configured recipe source.
#[derive(Debug)]
pub enum RecipeSource {
    Local(LocalRecipeFetcher),
    Files(RecipeFileFetcher),
    Service(RecommendationFetcher),
}

impl RecipeSource {
    /// Short label for log output.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Local(_) => "local",
            Self::Files(_) => "files",
            Self::Service(_) => "service",
        }
    }

    fn inner(&self) -> &dyn RecipeFetcher {
        match self {
            Self::Local(f) => f,
            Self::Files(f) => f,
            Self::Service(f) => f,
        }
    }
}

impl RecipeFetcher for RecipeSource {
    fn fetch_recipes(
        &self,
        manifest: &DiscoveryManifest,
        cancel: &CancellationToken,
    ) -> Result<Vec<Recipe>, FetchError> {
        self.inner().fetch_recipes(manifest, cancel)
    }

    fn fetch_recommendations(
        &self,
        manifest: &DiscoveryManifest,
        cancel: &CancellationToken,
    ) -> Result<Vec<Recipe>, FetchError> {
        self.inner().fetch_recommendations(manifest, cancel)
    }

    fn fetch_recipe(
        &self,
        manifest: &DiscoveryManifest,
        name: &str,
        cancel: &CancellationToken,
    ) -> Result<Recipe, FetchError> {
        self.inner().fetch_recipe(manifest, name, cancel)
    }
}

pub(crate) fn ensure_not_cancelled(cancel: &CancellationToken) -> Result<(), FetchError> {
    if cancel.is_cancelled() {
        return Err(FetchError::Cancelled);
    }
    Ok(())
}
