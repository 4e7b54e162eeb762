//! [`GitGateway`] over the gateway's REST API.
//!
//! | Operation         | Request                                      |
//! |-------------------|----------------------------------------------|
//! | create repository | `POST /api/v1/repos`                         |
//! | get repository    | `GET /api/v1/repos/{id}`                     |
//! | update repository | `PATCH /api/v1/repos/{id}`                   |
//! | delete repository | `DELETE /api/v1/repos/{id}`                  |
//! | create branch     | `POST /api/v1/repos/{id}/branches`           |
//! | delete branch     | `DELETE /api/v1/repos/{id}/branches/{name}`  |
//!
//! Transport errors and timeouts map to `RemoteFailure`, 404 to `NotFound`
//! (success for deletes), 409 to `Conflict`, 400 and 422 to `Validation`.

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use reqwest::{Method, StatusCode, Url};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::git_gateway::{
    CreateRemoteRepository, GitGateway, RemoteBranch, RemoteRepository, RemoteRepositoryPatch,
};
use crate::config::GitGatewayConfig;
use crate::error::{ErrorKind, StepError};

#[derive(Debug, Serialize)]
struct CreateBranchBody<'a> {
    name: &'a str,
    from: &'a str,
}

#[derive(Debug, Deserialize)]
struct RemoteErrorBody {
    #[serde(default, alias = "error")]
    message: Option<String>,
}

/// HTTP client for the Git gateway.
#[derive(Debug, Clone)]
pub struct HttpGitGateway {
    client: reqwest::Client,
    base_url: Url,
}

impl HttpGitGateway {
    /// Builds a client for `config.base_url`.
    ///
    /// # Errors
    ///
    /// Returns a `Validation` error if the base URL or token is malformed,
    /// and a `LocalFailure` if the HTTP client cannot be built.
    pub fn new(config: &GitGatewayConfig) -> Result<Self, StepError> {
        let base_url = Url::parse(&config.base_url).map_err(|e| {
            StepError::validation(format!("invalid git gateway url `{}`: {e}", config.base_url))
        })?;
        if base_url.cannot_be_a_base() {
            return Err(StepError::validation(format!(
                "git gateway url `{base_url}` cannot carry a path"
            )));
        }

        let mut headers = HeaderMap::new();
        if let Some(token) = &config.token {
            let value = HeaderValue::from_str(&format!("Bearer {token}"))
                .map_err(|e| StepError::validation(format!("invalid git gateway token: {e}")))?;
            headers.insert(AUTHORIZATION, value);
        }

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(config.timeout)
            .build()
            .map_err(|e| StepError::local(format!("failed to build HTTP client: {e}")))?;

        Ok(Self { client, base_url })
    }

    /// Base URL requests are resolved against.
    #[must_use]
    pub const fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url, StepError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| StepError::validation(format!("base url `{}` has no path", self.base_url)))?
            .pop_if_empty()
            .extend(["api", "v1", "repos"])
            .extend(segments);
        Ok(url)
    }

    async fn send<B: Serialize + Sync + ?Sized>(
        &self,
        method: Method,
        url: Url,
        body: Option<&B>,
    ) -> Result<reqwest::Response, StepError> {
        let mut request = self.client.request(method.clone(), url.clone());
        if let Some(body) = body {
            request = request.json(body);
        }
        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                StepError::remote(format!("{method} {url} timed out"))
            } else {
                StepError::remote(format!("{method} {url} failed: {e}"))
            }
        })?;

        let status = response.status();
        debug!(%method, %url, %status, "git gateway response");
        if status.is_success() {
            return Ok(response);
        }

        let text = response.text().await.unwrap_or_default();
        let detail = serde_json::from_str::<RemoteErrorBody>(&text)
            .ok()
            .and_then(|b| b.message)
            .unwrap_or(text);
        Err(StepError::new(
            kind_for_status(status),
            format!("{method} {url} returned {status}: {detail}"),
        ))
    }

    async fn send_json<B, T>(&self, method: Method, url: Url, body: Option<&B>) -> Result<T, StepError>
    where
        B: Serialize + Sync + ?Sized,
        T: DeserializeOwned,
    {
        let response = self.send(method, url, body).await?;
        response
            .json::<T>()
            .await
            .map_err(|e| StepError::remote(format!("malformed git gateway response: {e}")))
    }

    async fn send_delete(&self, url: Url) -> Result<(), StepError> {
        match self.send::<()>(Method::DELETE, url, None).await {
            Ok(_) => Ok(()),
            Err(err) if err.is_not_found() => Ok(()),
            Err(err) => Err(err),
        }
    }
}

/// Maps a non-2xx status to an error kind.
fn kind_for_status(status: StatusCode) -> ErrorKind {
    match status {
        StatusCode::NOT_FOUND => ErrorKind::NotFound,
        StatusCode::CONFLICT => ErrorKind::Conflict,
        StatusCode::BAD_REQUEST | StatusCode::UNPROCESSABLE_ENTITY => ErrorKind::Validation,
        _ => ErrorKind::RemoteFailure,
    }
}

#[async_trait]
impl GitGateway for HttpGitGateway {
    async fn create_repository(
        &self,
        request: &CreateRemoteRepository,
    ) -> Result<RemoteRepository, StepError> {
        let url = self.endpoint(&[])?;
        self.send_json(Method::POST, url, Some(request)).await
    }

    async fn get_repository(&self, remote_id: &str) -> Result<RemoteRepository, StepError> {
        let url = self.endpoint(&[remote_id])?;
        self.send_json::<(), _>(Method::GET, url, None).await
    }

    async fn update_repository(
        &self,
        remote_id: &str,
        patch: &RemoteRepositoryPatch,
    ) -> Result<RemoteRepository, StepError> {
        let url = self.endpoint(&[remote_id])?;
        self.send_json(Method::PATCH, url, Some(patch)).await
    }

    async fn delete_repository(&self, remote_id: &str) -> Result<(), StepError> {
        let url = self.endpoint(&[remote_id])?;
        self.send_delete(url).await
    }

    async fn create_branch(
        &self,
        remote_id: &str,
        branch: &str,
        from: &str,
    ) -> Result<RemoteBranch, StepError> {
        let url = self.endpoint(&[remote_id, "branches"])?;
        let body = CreateBranchBody { name: branch, from };
        self.send_json(Method::POST, url, Some(&body)).await
    }

    async fn delete_branch(&self, remote_id: &str, branch: &str) -> Result<(), StepError> {
        let url = self.endpoint(&[remote_id, "branches", branch])?;
        self.send_delete(url).await
    }
}
