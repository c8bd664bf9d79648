//! Blocking JSON-over-HTTP plumbing shared by the scheduler and resource
//! manager clients.

use reqwest::Method;
use reqwest::blocking::{Client, RequestBuilder};
use tracing::{debug, error};
use url::Url;

use crate::error::{HarborError, Result};

/// Parse a service address, accepting bare `host:port` as plain http.
pub fn parse_base_url(address: &str) -> Result<Url> {
    let trimmed = address.trim();
    let with_scheme = if trimmed.contains("://") {
        trimmed.to_string()
    } else {
        format!("http://{}", trimmed)
    };
    let mut url =
        Url::parse(&with_scheme).map_err(|e| HarborError::upstream("parse url", address, e))?;
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    Ok(url)
}

/// Status and body of a completed request.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

impl HttpResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

#[derive(Debug, Clone)]
pub struct HttpEndpoint {
    client: Client,
    base: Url,
    credentials: Option<(String, String)>,
}

impl HttpEndpoint {
    pub fn new(
        address: &str,
        credentials: Option<(String, String)>,
        accept_invalid_certs: bool,
    ) -> Result<Self> {
        let base = parse_base_url(address)?;
        let client = Client::builder()
            .danger_accept_invalid_certs(accept_invalid_certs)
            .build()
            .map_err(|e| HarborError::upstream("build http client", address, e))?;
        let credentials = credentials.filter(|(user, pass)| !user.is_empty() && !pass.is_empty());
        Ok(Self {
            client,
            base,
            credentials,
        })
    }

    pub fn url(&self, path: &str) -> Result<Url> {
        self.base
            .join(path.trim_start_matches('/'))
            .map_err(|e| HarborError::upstream("build url", path, e))
    }

    pub fn get(&self, path: &str) -> Result<HttpResponse> {
        self.send(Method::GET, path, |r| r)
    }

    pub fn delete(&self, path: &str) -> Result<HttpResponse> {
        self.send(Method::DELETE, path, |r| r)
    }

    pub fn post_json<T: serde::Serialize>(&self, path: &str, body: &T) -> Result<HttpResponse> {
        self.send(Method::POST, path, |r| r.json(body))
    }

    pub fn post_form(&self, path: &str, form: &[(&str, &str)]) -> Result<HttpResponse> {
        self.send(Method::POST, path, |r| r.form(form))
    }

    fn send(
        &self,
        method: Method,
        path: &str,
        decorate: impl FnOnce(RequestBuilder) -> RequestBuilder,
    ) -> Result<HttpResponse> {
        let url = self.url(path)?;
        let mut request = self
            .client
            .request(method.clone(), url.clone())
            .header(reqwest::header::ACCEPT, "application/json");
        if let Some((user, pass)) = &self.credentials {
            request = request.basic_auth(user, Some(pass));
        }
        request = decorate(request);

        let operation = format!("{} {}", method, url.path());
        let response = request.send().map_err(|e| {
            error!(%method, %url, error = %e, "request failed");
            HarborError::upstream(&operation, url.as_str(), e)
        })?;

        let status = response.status().as_u16();
        debug!(%method, %url, status, "request completed");
        let body = response
            .text()
            .map_err(|e| HarborError::upstream(&operation, url.as_str(), e))?;
        Ok(HttpResponse { status, body })
    }
}
