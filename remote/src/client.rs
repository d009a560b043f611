use crate::error::RegistryError;
use crate::reference::ImageReference;
use crate::types::*;
use berth_core::api::RegistryScheme;
use berth_core::Platform;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION, WWW_AUTHENTICATE};
use reqwest::StatusCode;
use sha2::{Digest as _, Sha256};
use std::collections::HashMap;
use tokio::sync::RwLock;

pub struct RegistryClient {
    client: reqwest::Client,
    scheme: RegistryScheme,
    tokens: RwLock<HashMap<String, String>>,
}

impl RegistryClient {
    pub fn new(scheme: RegistryScheme) -> Result<Self, RegistryError> {
        let client = reqwest::Client::builder()
            .user_agent("berth/0.1.0")
            .build()?;
        Ok(Self {
            client,
            scheme,
            tokens: RwLock::new(HashMap::new()),
        })
    }

    fn base_url(&self, registry: &str) -> String {
        let scheme = match self.scheme {
            RegistryScheme::Http => "http",
            RegistryScheme::Https => "https",
            RegistryScheme::Auto => {
                if registry.starts_with("localhost") || registry.starts_with("127.0.0.1") {
                    "http"
                } else {
                    "https"
                }
            }
        };
        format!("{scheme}://{registry}")
    }

    /// Resolves a reference to a single-platform manifest, following a
    /// manifest list / OCI index when the registry returns one. Returns
    /// the manifest together with its content digest.
    pub async fn manifest_for_platform(
        &self,
        reference: &ImageReference,
        platform: &Platform,
    ) -> Result<(Manifest, String), RegistryError> {
        let url = format!(
            "{}/v2/{}/manifests/{}",
            self.base_url(&reference.registry),
            reference.repository,
            reference.locator()
        );
        let (body, content_type) = self.get_manifest_bytes(reference, &url).await?;
        let digest = format!("sha256:{}", hex::encode(Sha256::digest(&body)));
        tracing::debug!(reference = %reference, %content_type, "resolved manifest");

        if content_type == MEDIA_TYPE_MANIFEST_LIST || content_type == MEDIA_TYPE_OCI_INDEX {
            let index: ManifestIndex = serde_json::from_slice(&body)?;
            let entry = index
                .manifests
                .iter()
                .find(|m| {
                    m.platform.as_ref().is_some_and(|p| {
                        p.os == platform.os
                            && p.architecture == platform.architecture
                            && platform
                                .variant
                                .as_ref()
                                .is_none_or(|v| p.variant.as_deref() == Some(v))
                    })
                })
                .ok_or_else(|| RegistryError::NoMatchingPlatform(platform.to_string()))?;

            let url = format!(
                "{}/v2/{}/manifests/{}",
                self.base_url(&reference.registry),
                reference.repository,
                entry.digest
            );
            let (body, _) = self.get_manifest_bytes(reference, &url).await?;
            let manifest: Manifest = serde_json::from_slice(&body)?;
            return Ok((manifest, entry.digest.clone()));
        }

        let manifest: Manifest = serde_json::from_slice(&body)?;
        Ok((manifest, digest))
    }

    /// Downloads a blob into memory.
    pub async fn blob(
        &self,
        reference: &ImageReference,
        digest: &str,
    ) -> Result<Vec<u8>, RegistryError> {
        let url = format!(
            "{}/v2/{}/blobs/{}",
            self.base_url(&reference.registry),
            reference.repository,
            digest
        );
        let response = self.get_with_auth(reference, &url, &HeaderMap::new()).await?;
        Ok(response.bytes().await?.to_vec())
    }

    /// Streams a blob to a writer, reporting bytes as they arrive.
    pub async fn blob_to_writer(
        &self,
        reference: &ImageReference,
        digest: &str,
        writer: &mut (impl tokio::io::AsyncWrite + Unpin),
        mut on_chunk: impl FnMut(u64),
    ) -> Result<u64, RegistryError> {
        use tokio::io::AsyncWriteExt;

        let url = format!(
            "{}/v2/{}/blobs/{}",
            self.base_url(&reference.registry),
            reference.repository,
            digest
        );
        let mut response = self.get_with_auth(reference, &url, &HeaderMap::new()).await?;
        let mut written = 0u64;
        while let Some(chunk) = response.chunk().await? {
            writer.write_all(&chunk).await?;
            written += chunk.len() as u64;
            on_chunk(chunk.len() as u64);
        }
        Ok(written)
    }

    async fn get_manifest_bytes(
        &self,
        reference: &ImageReference,
        url: &str,
    ) -> Result<(Vec<u8>, String), RegistryError> {
        let mut headers = HeaderMap::new();
        let accept = [
            MEDIA_TYPE_MANIFEST,
            MEDIA_TYPE_MANIFEST_LIST,
            MEDIA_TYPE_OCI_MANIFEST,
            MEDIA_TYPE_OCI_INDEX,
        ]
        .join(", ");
        headers.insert(ACCEPT, HeaderValue::from_str(&accept).unwrap());

        let response = self.get_with_auth(reference, url, &headers).await?;
        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string();
        Ok((response.bytes().await?.to_vec(), content_type))
    }

    async fn get_with_auth(
        &self,
        reference: &ImageReference,
        url: &str,
        headers: &HeaderMap,
    ) -> Result<reqwest::Response, RegistryError> {
        let cached = self.tokens.read().await.get(&reference.repository).cloned();
        let response = self.get(url, headers, cached.as_deref()).await?;
        if response.status() != StatusCode::UNAUTHORIZED {
            return check_status(response, url);
        }

        // Anonymous token dance: the challenge names the token endpoint.
        let challenge = response
            .headers()
            .get(WWW_AUTHENTICATE)
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| RegistryError::Auth("registry sent 401 without a challenge".into()))?;
        let token = self.fetch_token(challenge).await?;
        self.tokens
            .write()
            .await
            .insert(reference.repository.clone(), token.clone());

        let response = self.get(url, headers, Some(&token)).await?;
        check_status(response, url)
    }

    async fn get(
        &self,
        url: &str,
        headers: &HeaderMap,
        token: Option<&str>,
    ) -> Result<reqwest::Response, RegistryError> {
        let mut request = self.client.get(url).headers(headers.clone());
        if let Some(token) = token {
            request = request.header(AUTHORIZATION, format!("Bearer {token}"));
        }
        Ok(request.send().await?)
    }

    async fn fetch_token(&self, challenge: &str) -> Result<String, RegistryError> {
        let params = parse_bearer_challenge(challenge)
            .ok_or_else(|| RegistryError::Auth(format!("unsupported challenge: {challenge}")))?;
        let realm = params
            .get("realm")
            .ok_or_else(|| RegistryError::Auth("challenge without realm".into()))?;

        let mut request = self.client.get(realm.as_str());
        if let Some(service) = params.get("service") {
            request = request.query(&[("service", service)]);
        }
        if let Some(scope) = params.get("scope") {
            request = request.query(&[("scope", scope)]);
        }

        #[derive(serde::Deserialize)]
        struct TokenResponse {
            #[serde(default)]
            token: Option<String>,
            #[serde(default)]
            access_token: Option<String>,
        }

        let response: TokenResponse = request.send().await?.json().await?;
        response
            .token
            .or(response.access_token)
            .ok_or_else(|| RegistryError::Auth("token endpoint returned no token".into()))
    }
}

fn check_status(
    response: reqwest::Response,
    url: &str,
) -> Result<reqwest::Response, RegistryError> {
    match response.status() {
        status if status.is_success() => Ok(response),
        StatusCode::NOT_FOUND => Err(RegistryError::NotFound(url.to_string())),
        status => Err(RegistryError::UnexpectedStatus {
            status,
            url: url.to_string(),
        }),
    }
}

/// Parses `Bearer realm="...",service="...",scope="..."`.
fn parse_bearer_challenge(challenge: &str) -> Option<HashMap<String, String>> {
    let rest = challenge.strip_prefix("Bearer ")?;
    let mut params = HashMap::new();
    for part in rest.split(',') {
        let (key, value) = part.trim().split_once('=')?;
        params.insert(key.to_string(), value.trim_matches('"').to_string());
    }
    Some(params)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_bearer_challenge() {
        let params = parse_bearer_challenge(
            "Bearer realm=\"https://auth.docker.io/token\",service=\"registry.docker.io\",scope=\"repository:library/alpine:pull\"",
        )
        .unwrap();
        assert_eq!(
            params.get("realm").map(String::as_str),
            Some("https://auth.docker.io/token")
        );
        assert_eq!(
            params.get("scope").map(String::as_str),
            Some("repository:library/alpine:pull")
        );
    }

    #[test]
    fn test_non_bearer_challenge_rejected() {
        assert!(parse_bearer_challenge("Basic realm=\"x\"").is_none());
    }

    #[test]
    fn test_base_url_scheme_selection() {
        let auto = RegistryClient::new(RegistryScheme::Auto).unwrap();
        assert_eq!(auto.base_url("localhost:5000"), "http://localhost:5000");
        assert_eq!(auto.base_url("ghcr.io"), "https://ghcr.io");

        let http = RegistryClient::new(RegistryScheme::Http).unwrap();
        assert_eq!(http.base_url("ghcr.io"), "http://ghcr.io");
    }
}
