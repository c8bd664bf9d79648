//! Consul HTTP key-value client.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use reqwest::StatusCode;
use reqwest::blocking::Client;
use serde::Deserialize;
use tracing::debug;
use url::Url;

use super::{KvPair, KvStore};
use crate::backend::http::parse_base_url;
use crate::error::{HarborError, Result};

#[derive(Debug, Deserialize)]
struct ConsulEntry {
    #[serde(rename = "Key")]
    key: String,
    #[serde(rename = "Value", default)]
    value: Option<String>,
}

/// Talks to `/v1/kv` on a Consul agent.
#[derive(Debug, Clone)]
pub struct ConsulKv {
    client: Client,
    base: Url,
}

impl ConsulKv {
    pub fn new(address: &str, accept_invalid_certs: bool) -> Result<Self> {
        let base = parse_base_url(address)?;
        let client = Client::builder()
            .danger_accept_invalid_certs(accept_invalid_certs)
            .build()
            .map_err(|e| HarborError::upstream("build consul client", address, e))?;
        Ok(Self { client, base })
    }

    fn key_url(&self, key: &str) -> Result<Url> {
        self.base
            .join(&format!("v1/kv/{}", key.trim_start_matches('/')))
            .map_err(|e| HarborError::upstream("build consul url", key, e))
    }
}

impl KvStore for ConsulKv {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let url = self.key_url(key)?;
        debug!(%url, "GET");
        let response = self
            .client
            .get(url)
            .query(&[("raw", "")])
            .send()
            .map_err(|e| HarborError::upstream("kv get", key, e))?;

        match response.status() {
            StatusCode::NOT_FOUND => Ok(None),
            status if status.is_success() => {
                let bytes = response
                    .bytes()
                    .map_err(|e| HarborError::upstream("kv get", key, e))?;
                Ok(Some(bytes.to_vec()))
            }
            status => Err(HarborError::upstream(
                "kv get",
                key,
                format!("HTTP {}", status),
            )),
        }
    }

    fn put(&self, key: &str, value: &[u8]) -> Result<()> {
        let url = self.key_url(key)?;
        debug!(%url, "PUT");
        let response = self
            .client
            .put(url)
            .body(value.to_vec())
            .send()
            .map_err(|e| HarborError::upstream("kv put", key, e))?;
        if !response.status().is_success() {
            return Err(HarborError::upstream(
                "kv put",
                key,
                format!("HTTP {}", response.status()),
            ));
        }
        Ok(())
    }

    fn keys(&self, prefix: &str, separator: Option<&str>) -> Result<Vec<String>> {
        let url = self.key_url(prefix)?;
        debug!(%url, ?separator, "GET keys");
        let mut request = self.client.get(url).query(&[("keys", "")]);
        if let Some(sep) = separator {
            request = request.query(&[("separator", sep)]);
        }
        let response = request
            .send()
            .map_err(|e| HarborError::upstream("kv keys", prefix, e))?;

        match response.status() {
            StatusCode::NOT_FOUND => Ok(Vec::new()),
            status if status.is_success() => response
                .json::<Vec<String>>()
                .map_err(|e| HarborError::upstream("kv keys", prefix, e)),
            status => Err(HarborError::upstream(
                "kv keys",
                prefix,
                format!("HTTP {}", status),
            )),
        }
    }

    fn list(&self, prefix: &str) -> Result<Vec<KvPair>> {
        let url = self.key_url(prefix)?;
        debug!(%url, "GET recurse");
        let response = self
            .client
            .get(url)
            .query(&[("recurse", "")])
            .send()
            .map_err(|e| HarborError::upstream("kv list", prefix, e))?;

        let entries = match response.status() {
            StatusCode::NOT_FOUND => return Ok(Vec::new()),
            status if status.is_success() => response
                .json::<Vec<ConsulEntry>>()
                .map_err(|e| HarborError::upstream("kv list", prefix, e))?,
            status => {
                return Err(HarborError::upstream(
                    "kv list",
                    prefix,
                    format!("HTTP {}", status),
                ));
            }
        };

        entries
            .into_iter()
            .map(|entry| {
                let value = match entry.value {
                    Some(encoded) => STANDARD
                        .decode(encoded)
                        .map_err(|e| HarborError::upstream("kv decode", &entry.key, e))?,
                    None => Vec::new(),
                };
                Ok(KvPair {
                    key: entry.key,
                    value,
                })
            })
            .collect()
    }

    fn delete(&self, key: &str) -> Result<()> {
        let url = self.key_url(key)?;
        debug!(%url, "DELETE");
        let response = self
            .client
            .delete(url)
            .send()
            .map_err(|e| HarborError::upstream("kv delete", key, e))?;
        if !response.status().is_success() {
            return Err(HarborError::upstream(
                "kv delete",
                key,
                format!("HTTP {}", response.status()),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_url_joins_under_v1_kv() {
        let kv = ConsulKv::new("http://localhost:8500", false).unwrap();
        let url = kv.key_url("mantl-install/repository/0/name").unwrap();
        assert_eq!(
            url.as_str(),
            "http://localhost:8500/v1/kv/mantl-install/repository/0/name"
        );
    }

    #[test]
    fn address_without_scheme_defaults_to_http() {
        let kv = ConsulKv::new("consul.service.consul:8500", false).unwrap();
        let url = kv.key_url("/apps/").unwrap();
        assert_eq!(url.as_str(), "http://consul.service.consul:8500/v1/kv/apps/");
    }
}
