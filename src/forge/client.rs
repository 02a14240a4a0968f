//! GitHub REST API client.

use crate::error::ForgeError;
use crate::models::ForgeRepository;
use reqwest::{RequestBuilder, StatusCode};
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, info};

const PAGE_SIZE: usize = 100;

/// Credentials used for both the REST API and git transport.
#[derive(Clone)]
pub enum Credentials {
    /// Personal access token.
    Token(String),
    /// Username and password (or username and token).
    Basic { username: String, password: String },
}

impl Credentials {
    /// Username/password pair for git's HTTPS transport.
    pub fn git_userpass(&self) -> (&str, &str) {
        match self {
            Credentials::Token(token) => ("x-access-token", token.as_str()),
            Credentials::Basic { username, password } => (username.as_str(), password.as_str()),
        }
    }

    fn apply(&self, request: RequestBuilder) -> RequestBuilder {
        match self {
            Credentials::Token(token) => request.bearer_auth(token),
            Credentials::Basic { username, password } => {
                request.basic_auth(username, Some(password))
            }
        }
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Credentials::Token(_) => write!(f, "Token(***)"),
            Credentials::Basic { username, .. } => write!(f, "Basic({}, ***)", username),
        }
    }
}

/// Repository as returned by `GET /orgs/{org}/repos`.
#[derive(Debug, Deserialize)]
struct RepoResponse {
    name: String,
    full_name: String,
    clone_url: String,
}

impl From<RepoResponse> for ForgeRepository {
    fn from(repo: RepoResponse) -> Self {
        Self {
            name: repo.name,
            full_name: repo.full_name,
            clone_url: repo.clone_url,
        }
    }
}

/// Client for the GitHub REST API.
pub struct ForgeClient {
    http_client: reqwest::Client,
    api_url: String,
    credentials: Credentials,
}

impl ForgeClient {
    /// Create a new client for the given API root.
    pub fn new(
        api_url: &str,
        credentials: Credentials,
        timeout_seconds: u64,
    ) -> Result<Self, ForgeError> {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_seconds))
            .user_agent(concat!("classgrader/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            http_client,
            api_url: api_url.trim_end_matches('/').to_string(),
            credentials,
        })
    }

    /// Check that the organization exists and the credentials are accepted.
    pub async fn verify_organization(&self, org: &str) -> Result<(), ForgeError> {
        let url = format!("{}/orgs/{}", self.api_url, org);
        let response = self.get(&url).send().await?;

        match response.status() {
            status if status.is_success() => {
                info!("Using organization {}", org);
                Ok(())
            }
            StatusCode::NOT_FOUND => Err(ForgeError::UnknownOrganization(org.to_string())),
            status => Err(error_for_status(&url, status, response.text().await?)),
        }
    }

    /// List every repository of the organization, following pagination.
    pub async fn list_repositories(&self, org: &str) -> Result<Vec<ForgeRepository>, ForgeError> {
        let mut repos = Vec::new();
        let mut page = 1;

        loop {
            let url = format!(
                "{}/orgs/{}/repos?per_page={}&page={}",
                self.api_url, org, PAGE_SIZE, page
            );
            debug!("GET {}", url);

            let response = self.get(&url).send().await?;
            let status = response.status();
            if status == StatusCode::NOT_FOUND {
                return Err(ForgeError::UnknownOrganization(org.to_string()));
            }
            if !status.is_success() {
                return Err(error_for_status(&url, status, response.text().await?));
            }

            let batch: Vec<RepoResponse> = response.json().await?;
            let count = batch.len();
            repos.extend(batch.into_iter().map(ForgeRepository::from));

            if count < PAGE_SIZE {
                break;
            }
            page += 1;
        }

        info!("Found {} repositories in {}", repos.len(), org);
        Ok(repos)
    }

    fn get(&self, url: &str) -> RequestBuilder {
        let request = self
            .http_client
            .get(url)
            .header("Accept", "application/vnd.github+json");
        self.credentials.apply(request)
    }
}

fn error_for_status(url: &str, status: StatusCode, body: String) -> ForgeError {
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => ForgeError::Authentication {
            url: url.to_string(),
            status: status.as_u16(),
        },
        _ => ForgeError::Api {
            url: url.to_string(),
            status: status.as_u16(),
            body,
        },
    }
}

/// Keep repositories whose clone URL contains `filter`.
pub fn filter_repositories(repos: Vec<ForgeRepository>, filter: Option<&str>) -> Vec<ForgeRepository> {
    match filter {
        Some(filter) => repos
            .into_iter()
            .filter(|repo| repo.clone_url.contains(filter))
            .collect(),
        None => repos,
    }
}
