//! Remote recommendation service client.
//!
//! Speaks GraphQL over HTTP. The service returns raw recipe documents next to
//! their metadata; each document is normalized locally and a document that
//! fails normalization is dropped with a warning.

use serde::{Deserialize, Serialize};
use serde_json::json;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};
use url::Url;

use crate::recipe::{Recipe, constrain_recipes, matches, parse_recipe};
use crate::types::DiscoveryManifest;

use super::{FetchError, HttpClient, RecipeFetcher};

/// Target environment reported for hosts discovered locally.
pub const DEFAULT_TARGET_ENVIRONMENT: &str = "host";

const RECOMMENDATIONS_QUERY: &str = r#"
query Recommendations($criteria: OpenInstallationRecommendationsInput) {
  docs {
    openInstallation {
      recommendations(criteria: $criteria) {
        results {
          metadata { name description repository keywords variant { os arch targetEnvironment } }
          file
        }
      }
    }
  }
}"#;

const RECIPES_QUERY: &str = r#"
query Recipes($name: String) {
  docs {
    openInstallation {
      recipes(name: $name) {
        results {
          metadata { name description repository keywords variant { os arch targetEnvironment } }
          file
        }
      }
    }
  }
}"#;

/// Query criteria derived from a discovery manifest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecommendationsInput {
    pub os: String,
    pub arch: String,
    pub target_environment: String,
    pub process_details: Vec<ProcessDetailInput>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProcessDetailInput {
    pub name: String,
}

impl From<&DiscoveryManifest> for RecommendationsInput {
    fn from(manifest: &DiscoveryManifest) -> Self {
        Self {
            os: manifest.os.clone(),
            arch: manifest.arch.clone(),
            target_environment: DEFAULT_TARGET_ENVIRONMENT.to_string(),
            process_details: manifest
                .process_names()
                .map(|name| ProcessDetailInput {
                    name: name.to_string(),
                })
                .collect(),
        }
    }
}

/// One result entry: service metadata plus the raw recipe document.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RecommendedRecipe {
    #[serde(default)]
    pub metadata: RecipeMetadata,
    #[serde(default)]
    pub file: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RecipeMetadata {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub repository: String,
    #[serde(default)]
    pub keywords: Vec<String>,
    #[serde(default)]
    pub variant: RecipeVariant,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecipeVariant {
    #[serde(default)]
    pub os: Vec<String>,
    #[serde(default)]
    pub arch: Vec<String>,
    #[serde(default)]
    pub target_environment: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct GraphQlResponse {
    data: Option<QueryData>,
    #[serde(default)]
    errors: Vec<GraphQlError>,
}

#[derive(Debug, Deserialize)]
struct GraphQlError {
    message: String,
}

#[derive(Debug, Deserialize)]
struct QueryData {
    docs: DocsFields,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DocsFields {
    open_installation: OpenInstallation,
}

#[derive(Debug, Deserialize)]
struct OpenInstallation {
    #[serde(default)]
    recommendations: Option<ResultList>,
    #[serde(default)]
    recipes: Option<ResultList>,
}

#[derive(Debug, Default, Deserialize)]
struct ResultList {
    #[serde(default)]
    results: Vec<RecommendedRecipe>,
}

/// Fetches recommendations and recipes from the remote service.
#[derive(Debug)]
pub struct RecommendationFetcher {
    http: HttpClient,
    endpoint: Url,
    api_key: Option<String>,
}

impl RecommendationFetcher {
    pub fn new(http: HttpClient, endpoint: Url) -> Self {
        Self {
            http,
            endpoint,
            api_key: None,
        }
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        let key = api_key.into();
        self.api_key = (!key.is_empty()).then_some(key);
        self
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    fn query(
        &self,
        query: &str,
        variables: serde_json::Value,
        cancel: &CancellationToken,
    ) -> Result<OpenInstallation, FetchError> {
        let body = json!({ "query": query, "variables": variables });
        let headers: Vec<(&str, &str)> = self
            .api_key
            .as_deref()
            .map(|key| ("Api-Key", key))
            .into_iter()
            .collect();

        let url = self.endpoint.as_str();
        let response: GraphQlResponse = self.http.post_json(url, &headers, &body, cancel)?;

        if !response.errors.is_empty() {
            let messages: Vec<_> = response.errors.into_iter().map(|e| e.message).collect();
            return Err(FetchError::InvalidResponse {
                url: url.to_string(),
                reason: messages.join("; "),
            });
        }

        response
            .data
            .map(|d| d.docs.open_installation)
            .ok_or_else(|| FetchError::InvalidResponse {
                url: url.to_string(),
                reason: "response carried no data".to_string(),
            })
    }

    fn list_recipes(
        &self,
        name: Option<&str>,
        cancel: &CancellationToken,
    ) -> Result<Vec<Recipe>, FetchError> {
        let result = self.query(RECIPES_QUERY, json!({ "name": name }), cancel)?;
        Ok(decode_results(result.recipes.unwrap_or_default().results))
    }
}

impl RecipeFetcher for RecommendationFetcher {
    fn fetch_recipes(
        &self,
        _manifest: &DiscoveryManifest,
        cancel: &CancellationToken,
    ) -> Result<Vec<Recipe>, FetchError> {
        self.list_recipes(None, cancel)
    }

    fn fetch_recommendations(
        &self,
        manifest: &DiscoveryManifest,
        cancel: &CancellationToken,
    ) -> Result<Vec<Recipe>, FetchError> {
        let criteria = RecommendationsInput::from(manifest);
        debug!(os = %criteria.os, arch = %criteria.arch, processes = criteria.process_details.len(), "requesting recommendations");

        let result = self.query(RECOMMENDATIONS_QUERY, json!({ "criteria": criteria }), cancel)?;
        let recipes = decode_results(result.recommendations.unwrap_or_default().results);
        Ok(constrain_recipes(recipes, manifest))
    }

    fn fetch_recipe(
        &self,
        manifest: &DiscoveryManifest,
        name: &str,
        cancel: &CancellationToken,
    ) -> Result<Recipe, FetchError> {
        self.list_recipes(Some(name), cancel)?
            .into_iter()
            .find(|r| r.name == name && matches(r, manifest))
            .ok_or_else(|| FetchError::not_found(name))
    }
}

fn decode_results(results: Vec<RecommendedRecipe>) -> Vec<Recipe> {
    results
        .into_iter()
        .filter_map(|result| match parse_recipe(&result.file) {
            Ok(recipe) => Some(recipe),
            Err(e) => {
                warn!(recipe = %result.metadata.name, error = %e, "could not parse recommended recipe");
                None
            }
        })
        .collect()
}
