//! Test doubles shared by the integration tests.

#![allow(dead_code)]

use std::cell::RefCell;
use std::collections::{HashMap, HashSet};

use larder_core::install::{
    ExecutionError, ExecutionRequest, PromptRequest, Prompter, StepExecutor,
};
use larder_core::recipe::{Recipe, parse_recipe};
use larder_core::source::{FetchError, RecipeFetcher, RecipeLoader};
use larder_core::types::DiscoveryManifest;
use tokio_util::sync::CancellationToken;

/// Minimal recipe document with the given dependencies.
pub fn recipe_yaml(name: &str, dependencies: &[&str]) -> String {
    let mut yaml = format!("name: {}\n", name);
    if !dependencies.is_empty() {
        yaml.push_str("dependencies:\n");
        for dep in dependencies {
            yaml.push_str(&format!("  - {}\n", dep));
        }
    }
    yaml.push_str("install:\n  version: \"3\"\n  tasks:\n    default:\n      cmds:\n        - echo ok\n");
    yaml
}

pub fn recipe(name: &str) -> Recipe {
    recipe_with_deps(name, &[])
}

pub fn recipe_with_deps(name: &str, dependencies: &[&str]) -> Recipe {
    parse_recipe(&recipe_yaml(name, dependencies)).unwrap()
}

pub fn names(recipes: &[Recipe]) -> Vec<&str> {
    recipes.iter().map(|r| r.name.as_str()).collect()
}

pub fn linux() -> DiscoveryManifest {
    DiscoveryManifest::new("linux", "amd64")
}

/// In-memory fetcher with scripted failures and a call log.
#[derive(Default)]
pub struct MockFetcher {
    recipes: Vec<Recipe>,
    failures: HashMap<String, u16>,
    calls: RefCell<Vec<String>>,
    recommendation_calls: RefCell<usize>,
}

impl MockFetcher {
    pub fn new(recipes: Vec<Recipe>) -> Self {
        Self {
            recipes,
            ..Default::default()
        }
    }

    /// Fetching `name` fails with an HTTP status error.
    pub fn failing(mut self, name: &str, status: u16) -> Self {
        self.failures.insert(name.to_string(), status);
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.borrow().clone()
    }

    pub fn calls_for(&self, name: &str) -> usize {
        self.calls.borrow().iter().filter(|c| *c == name).count()
    }

    pub fn recommendation_calls(&self) -> usize {
        *self.recommendation_calls.borrow()
    }
}

impl RecipeFetcher for MockFetcher {
    fn fetch_recipes(
        &self,
        _manifest: &DiscoveryManifest,
        cancel: &CancellationToken,
    ) -> Result<Vec<Recipe>, FetchError> {
        if cancel.is_cancelled() {
            return Err(FetchError::Cancelled);
        }
        *self.recommendation_calls.borrow_mut() += 1;
        Ok(self.recipes.clone())
    }

    fn fetch_recipe(
        &self,
        _manifest: &DiscoveryManifest,
        name: &str,
        cancel: &CancellationToken,
    ) -> Result<Recipe, FetchError> {
        if cancel.is_cancelled() {
            return Err(FetchError::Cancelled);
        }
        self.calls.borrow_mut().push(name.to_string());
        if let Some(status) = self.failures.get(name) {
            return Err(FetchError::HttpStatus {
                url: format!("mock://{}", name),
                status: *status,
            });
        }
        self.recipes
            .iter()
            .find(|r| r.name == name)
            .cloned()
            .ok_or_else(|| FetchError::not_found(name))
    }
}

/// Loader serving documents registered by location.
#[derive(Default)]
pub struct MockLoader {
    documents: HashMap<String, Recipe>,
}

impl MockLoader {
    pub fn with(mut self, location: &str, recipe: Recipe) -> Self {
        self.documents.insert(location.to_string(), recipe);
        self
    }
}

impl RecipeLoader for MockLoader {
    fn load(&self, location: &str, _cancel: &CancellationToken) -> Result<Recipe, FetchError> {
        self.documents
            .get(location)
            .cloned()
            .ok_or_else(|| FetchError::Read {
                path: location.into(),
                source: std::io::Error::new(std::io::ErrorKind::NotFound, "no such file"),
            })
    }
}

/// Records every execution request; can fail or cancel on chosen recipes.
#[derive(Default)]
pub struct RecordingExecutor {
    requests: RefCell<Vec<ExecutionRequest>>,
    fail: HashSet<String>,
    cancel_on: Option<(String, CancellationToken)>,
}

impl RecordingExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_on(mut self, recipe: &str) -> Self {
        self.fail.insert(recipe.to_string());
        self
    }

    /// Cancel `token` while `recipe` is running.
    pub fn cancelling_on(mut self, recipe: &str, token: CancellationToken) -> Self {
        self.cancel_on = Some((recipe.to_string(), token));
        self
    }

    pub fn executed(&self) -> Vec<String> {
        self.requests
            .borrow()
            .iter()
            .map(|r| r.recipe.clone())
            .collect()
    }

    pub fn request(&self, recipe: &str) -> Option<ExecutionRequest> {
        self.requests
            .borrow()
            .iter()
            .find(|r| r.recipe == recipe)
            .cloned()
    }
}

impl StepExecutor for RecordingExecutor {
    fn run(
        &self,
        request: &ExecutionRequest,
        _cancel: &CancellationToken,
    ) -> Result<(), ExecutionError> {
        self.requests.borrow_mut().push(request.clone());
        if let Some((recipe, token)) = &self.cancel_on
            && *recipe == request.recipe
        {
            token.cancel();
            return Err(ExecutionError::Cancelled);
        }
        if self.fail.contains(&request.recipe) {
            return Err(ExecutionError::Failed {
                status: "exit status: 1".to_string(),
            });
        }
        Ok(())
    }
}

/// A prompt as seen by the prompter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AskedPrompt {
    pub variable: String,
    pub message: String,
    pub default: Option<String>,
    pub secret: bool,
}

/// Answers every prompt with a fixed value and records what was asked.
pub struct ScriptedPrompter {
    answer: Option<String>,
    asked: RefCell<Vec<AskedPrompt>>,
}

impl ScriptedPrompter {
    pub fn answering(answer: &str) -> Self {
        Self {
            answer: Some(answer.to_string()),
            asked: RefCell::new(Vec::new()),
        }
    }

    /// Every prompt fails, as when no terminal is attached.
    pub fn unavailable() -> Self {
        Self {
            answer: None,
            asked: RefCell::new(Vec::new()),
        }
    }

    pub fn asked(&self) -> Vec<AskedPrompt> {
        self.asked.borrow().clone()
    }
}

impl Prompter for ScriptedPrompter {
    fn prompt(&self, request: &PromptRequest<'_>) -> anyhow::Result<String> {
        self.asked.borrow_mut().push(AskedPrompt {
            variable: request.variable.to_string(),
            message: request.message.to_string(),
            default: request.default.map(str::to_string),
            secret: request.secret,
        });
        self.answer
            .clone()
            .ok_or_else(|| anyhow::anyhow!("no terminal attached"))
    }
}
