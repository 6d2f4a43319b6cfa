use log::debug;
use reqwest::{Method, RequestBuilder, Response, Url};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::auth::SessionStore;
use crate::config::Config;
use crate::error::AppError;

/// Whether a request carries the bearer credential.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Auth {
    None,
    Bearer,
}

/// Error body shape returned by the API.
#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: Option<String>,
    error: Option<String>,
}

/// HTTP client for the TaskForge REST API.
///
/// Endpoint wrappers live next to this type in `api::auth`, `api::tasks` and
/// `api::notifications`.
#[derive(Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: Url,
    session: Arc<SessionStore>,
}

impl ApiClient {
    pub fn new(config: &Config, session: Arc<SessionStore>) -> Result<Self, AppError> {
        let base_url = Url::parse(&config.api_base_url).map_err(|e| {
            AppError::Config(format!("Invalid API URL '{}': {}", config.api_base_url, e))
        })?;
        if base_url.cannot_be_a_base() {
            return Err(AppError::Config(format!(
                "API URL '{}' cannot be used as a base",
                config.api_base_url
            )));
        }
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()?;
        Ok(Self {
            http,
            base_url,
            session,
        })
    }

    /// Joins percent-encoded `segments` onto the base URL.
    pub(crate) fn url(&self, segments: &[&str]) -> Result<Url, AppError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| AppError::Request(format!("Cannot extend URL {}", self.base_url)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    pub(crate) async fn get<T: DeserializeOwned>(
        &self,
        segments: &[&str],
        auth: Auth,
    ) -> Result<T, AppError> {
        let request = self.request(Method::GET, segments, auth)?;
        self.send(request).await
    }

    pub(crate) async fn post<B, T>(
        &self,
        segments: &[&str],
        body: &B,
        auth: Auth,
    ) -> Result<T, AppError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let request = self.request(Method::POST, segments, auth)?.json(body);
        self.send(request).await
    }

    pub(crate) async fn patch<B, T>(
        &self,
        segments: &[&str],
        body: &B,
        auth: Auth,
    ) -> Result<T, AppError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let request = self.request(Method::PATCH, segments, auth)?.json(body);
        self.send(request).await
    }

    fn request(
        &self,
        method: Method,
        segments: &[&str],
        auth: Auth,
    ) -> Result<RequestBuilder, AppError> {
        let url = self.url(segments)?;
        debug!("{} {}", method, url);
        let request = self.http.request(method, url);
        match auth {
            Auth::None => Ok(request),
            Auth::Bearer => match self.session.token()? {
                Some(token) => Ok(request.bearer_auth(token)),
                None => Err(AppError::Unauthorized("Not logged in".into())),
            },
        }
    }

    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, AppError> {
        let response = request.send().await?;
        let response = check_status(response).await?;
        Ok(response.json::<T>().await?)
    }
}

/// Turns a non-success response into an `AppError` carrying the body's message.
async fn check_status(response: Response) -> Result<Response, AppError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let text = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<ErrorBody>(&text)
        .ok()
        .and_then(|body| body.message.or(body.error))
        .filter(|message| !message.trim().is_empty())
        .unwrap_or_else(|| {
            status
                .canonical_reason()
                .unwrap_or("Request failed")
                .to_string()
        });
    debug!("Request failed with {}: {}", status, message);
    Err(AppError::from_status(status, message))
}
