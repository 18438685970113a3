// SPDX-License-Identifier: MIT

//! OIDC provider client.
//!
//! Handles:
//! - Authorization URL construction
//! - Authorization-code exchange at the token endpoint
//! - Identity claims via verified ID token or the userinfo endpoint
//! - Logout URL construction
//!
//! The client is an explicitly constructed value injected through
//! `AppState`; nothing here is registered globally.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::Context;
use jsonwebtoken::{decode, decode_header, Algorithm, DecodingKey, Validation};
use serde::Deserialize;
use tokio::sync::RwLock;
use url::Url;

use crate::config::Config;
use crate::error::AppError;
use crate::session::Claims;

const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(10);
const JWKS_CACHE_TTL: Duration = Duration::from_secs(300);
const OIDC_SCOPES: &str = "openid profile email";

/// Resolved provider endpoints.
#[derive(Debug, Clone)]
pub struct ProviderEndpoints {
    pub issuer: String,
    pub authorization: String,
    pub token: String,
    pub userinfo: String,
    pub jwks: String,
    pub end_session: String,
}

impl ProviderEndpoints {
    /// Conventional endpoint layout under `https://{domain}`.
    pub fn conventional(domain: &str) -> Self {
        let base = format!("https://{}", domain.trim_end_matches('/'));
        Self {
            issuer: format!("{base}/"),
            authorization: format!("{base}/authorize"),
            token: format!("{base}/oauth/token"),
            userinfo: format!("{base}/userinfo"),
            jwks: format!("{base}/.well-known/jwks.json"),
            end_session: format!("{base}/v2/logout"),
        }
    }
}

/// Discovery document, `/.well-known/openid-configuration`.
#[derive(Debug, Deserialize)]
struct ProviderMetadata {
    issuer: Option<String>,
    authorization_endpoint: String,
    token_endpoint: String,
    userinfo_endpoint: String,
    jwks_uri: String,
    end_session_endpoint: Option<String>,
}

struct JwksCacheEntry {
    keys_by_kid: HashMap<String, Arc<DecodingKey>>,
    expires_at: Instant,
}

/// OIDC client with cached JWKS keys.
pub struct OidcClient {
    http: reqwest::Client,
    client_id: String,
    client_secret: String,
    redirect_uri: String,
    endpoints: ProviderEndpoints,
    jwks_cache: RwLock<Option<JwksCacheEntry>>,
}

impl OidcClient {
    /// Create a client using the conventional endpoint layout.
    pub fn new(config: &Config) -> anyhow::Result<Self> {
        Self::with_endpoints(config, ProviderEndpoints::conventional(&config.oidc_domain))
    }

    /// Create a client with explicitly resolved endpoints.
    pub fn with_endpoints(config: &Config, endpoints: ProviderEndpoints) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(DEFAULT_HTTP_TIMEOUT)
            .build()
            .context("failed building OIDC HTTP client")?;

        Ok(Self {
            http,
            client_id: config.oidc_client_id.clone(),
            client_secret: config.oidc_client_secret.clone(),
            redirect_uri: config.callback_url.clone(),
            endpoints,
            jwks_cache: RwLock::new(None),
        })
    }

    /// Create a client, refining the conventional endpoints via the
    /// provider's discovery document when it is reachable.
    pub async fn discover(config: &Config) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(DEFAULT_HTTP_TIMEOUT)
            .build()
            .context("failed building OIDC HTTP client")?;

        let discovery_url = format!(
            "https://{}/.well-known/openid-configuration",
            config.oidc_domain
        );

        let endpoints = match fetch_metadata(&http, &discovery_url).await {
            Ok(metadata) => {
                tracing::info!(discovery_url = %discovery_url, "Resolved provider endpoints");
                let conventional = ProviderEndpoints::conventional(&config.oidc_domain);
                ProviderEndpoints {
                    issuer: metadata.issuer.unwrap_or(conventional.issuer),
                    authorization: metadata.authorization_endpoint,
                    token: metadata.token_endpoint,
                    userinfo: metadata.userinfo_endpoint,
                    jwks: metadata.jwks_uri,
                    end_session: metadata
                        .end_session_endpoint
                        .unwrap_or(conventional.end_session),
                }
            }
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    "OIDC discovery failed; using conventional endpoints"
                );
                ProviderEndpoints::conventional(&config.oidc_domain)
            }
        };

        Self::with_endpoints(config, endpoints)
    }

    /// Build the provider authorization URL for the login redirect.
    pub fn authorize_url(&self) -> Result<String, AppError> {
        let mut url = Url::parse(&self.endpoints.authorization)
            .map_err(|e| AppError::Provider(format!("Bad authorization endpoint: {}", e)))?;

        url.query_pairs_mut()
            .append_pair("response_type", "code")
            .append_pair("client_id", &self.client_id)
            .append_pair("redirect_uri", &self.redirect_uri)
            .append_pair("scope", OIDC_SCOPES);

        Ok(url.into())
    }

    /// Build the provider end-session URL for the logout redirect.
    pub fn logout_url(&self, return_to: &str) -> Result<String, AppError> {
        let mut url = Url::parse(&self.endpoints.end_session)
            .map_err(|e| AppError::Provider(format!("Bad end-session endpoint: {}", e)))?;

        url.query_pairs_mut()
            .append_pair("client_id", &self.client_id)
            .append_pair("returnTo", return_to);

        Ok(url.into())
    }

    /// Exchange an authorization code for tokens.
    pub async fn exchange_code(&self, code: &str) -> Result<TokenResponse, AppError> {
        let response = self
            .http
            .post(&self.endpoints.token)
            .form(&[
                ("grant_type", "authorization_code"),
                ("client_id", self.client_id.as_str()),
                ("client_secret", self.client_secret.as_str()),
                ("code", code),
                ("redirect_uri", self.redirect_uri.as_str()),
            ])
            .send()
            .await
            .map_err(|e| AppError::Provider(format!("Token request failed: {}", e)))?;

        self.check_response_json(response).await
    }

    /// Extract identity claims from a token response.
    ///
    /// Prefers the signed ID token when the provider returned one; falls
    /// back to the userinfo endpoint with the access token.
    pub async fn identity(&self, tokens: &TokenResponse) -> Result<Claims, AppError> {
        match &tokens.id_token {
            Some(id_token) => self.verify_id_token(id_token).await,
            None => self.fetch_userinfo(&tokens.access_token).await,
        }
    }

    /// Fetch identity claims from the userinfo endpoint.
    async fn fetch_userinfo(&self, access_token: &str) -> Result<Claims, AppError> {
        let response = self
            .http
            .get(&self.endpoints.userinfo)
            .bearer_auth(access_token)
            .send()
            .await
            .map_err(|e| AppError::Provider(format!("Userinfo request failed: {}", e)))?;

        self.check_response_json(response).await
    }

    /// Verify an RS256 ID token against the provider JWKS and extract claims.
    async fn verify_id_token(&self, token: &str) -> Result<Claims, AppError> {
        let header = decode_header(token)
            .map_err(|e| AppError::Provider(format!("Invalid ID token header: {}", e)))?;

        if header.alg != Algorithm::RS256 {
            return Err(AppError::Provider(format!(
                "Unexpected ID token alg: {:?}",
                header.alg
            )));
        }

        let kid = header
            .kid
            .ok_or_else(|| AppError::Provider("Missing ID token kid".to_string()))?;

        let decoding_key = self.decoding_key_for_kid(&kid).await?;

        let mut validation = Validation::new(Algorithm::RS256);
        validation.set_required_spec_claims(&["exp", "iss", "aud", "sub"]);
        validation.set_issuer(&[self.endpoints.issuer.as_str()]);
        validation.set_audience(&[self.client_id.as_str()]);

        let token_data = decode::<IdTokenClaims>(token, decoding_key.as_ref(), &validation)
            .map_err(|e| AppError::Provider(format!("ID token validation failed: {}", e)))?;

        let claims = token_data.claims;
        Ok(Claims {
            sub: claims.sub,
            email: claims.email,
            name: claims.name,
            picture: claims.picture,
        })
    }

    async fn decoding_key_for_kid(&self, kid: &str) -> Result<Arc<DecodingKey>, AppError> {
        if let Some(key) = self.lookup_cached_key(kid).await {
            return Ok(key);
        }

        for force_refresh in [false, true] {
            self.refresh_jwks(force_refresh).await?;
            if let Some(key) = self.lookup_cached_key(kid).await {
                return Ok(key);
            }
        }

        Err(AppError::Provider(format!(
            "ID token kid not found in JWKS after refresh: {kid}"
        )))
    }

    async fn lookup_cached_key(&self, kid: &str) -> Option<Arc<DecodingKey>> {
        let cache = self.jwks_cache.read().await;
        let now = Instant::now();
        cache
            .as_ref()
            .filter(|entry| entry.expires_at > now)
            .and_then(|entry| entry.keys_by_kid.get(kid))
            .cloned()
    }

    async fn refresh_jwks(&self, force_refresh: bool) -> Result<(), AppError> {
        if !force_refresh {
            let cache = self.jwks_cache.read().await;
            if cache
                .as_ref()
                .is_some_and(|entry| entry.expires_at > Instant::now())
            {
                return Ok(());
            }
        }

        tracing::debug!(jwks_uri = %self.endpoints.jwks, "Refreshing JWKS cache");

        let response = self
            .http
            .get(&self.endpoints.jwks)
            .send()
            .await
            .map_err(|e| AppError::Provider(format!("JWKS request failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(AppError::Provider(format!(
                "JWKS request returned status {}",
                response.status()
            )));
        }

        let jwks: Jwks = response
            .json()
            .await
            .map_err(|e| AppError::Provider(format!("Invalid JWKS JSON: {}", e)))?;

        let mut keys_by_kid: HashMap<String, Arc<DecodingKey>> = HashMap::new();

        for jwk in jwks.keys {
            if jwk.kty != "RSA" || jwk.kid.trim().is_empty() {
                continue;
            }

            if let Some(alg) = &jwk.alg {
                if alg != "RS256" {
                    continue;
                }
            }

            if let Some(use_) = &jwk.use_ {
                if use_ != "sig" {
                    continue;
                }
            }

            match DecodingKey::from_rsa_components(&jwk.n, &jwk.e) {
                Ok(key) => {
                    keys_by_kid.insert(jwk.kid, Arc::new(key));
                }
                Err(e) => {
                    tracing::warn!(error = %e, kid = %jwk.kid, "Skipping invalid RSA JWKS key");
                }
            }
        }

        if keys_by_kid.is_empty() {
            return Err(AppError::Provider(
                "JWKS response did not include any usable RSA keys".to_string(),
            ));
        }

        *self.jwks_cache.write().await = Some(JwksCacheEntry {
            keys_by_kid,
            expires_at: Instant::now() + JWKS_CACHE_TTL,
        });

        Ok(())
    }

    /// Check response status and parse the JSON body.
    async fn check_response_json<T: for<'de> Deserialize<'de>>(
        &self,
        response: reqwest::Response,
    ) -> Result<T, AppError> {
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::Provider(format!("HTTP {}: {}", status, body)));
        }

        response
            .json()
            .await
            .map_err(|e| AppError::Provider(format!("JSON parse error: {}", e)))
    }
}

async fn fetch_metadata(
    http: &reqwest::Client,
    discovery_url: &str,
) -> Result<ProviderMetadata, AppError> {
    let response = http
        .get(discovery_url)
        .send()
        .await
        .map_err(|e| AppError::Provider(format!("Discovery request failed: {}", e)))?;

    if !response.status().is_success() {
        return Err(AppError::Provider(format!(
            "Discovery returned status {}",
            response.status()
        )));
    }

    response
        .json()
        .await
        .map_err(|e| AppError::Provider(format!("Invalid discovery JSON: {}", e)))
}

/// Token endpoint response.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    #[serde(default)]
    pub id_token: Option<String>,
    #[serde(default)]
    pub token_type: Option<String>,
    #[serde(default)]
    pub expires_in: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct Jwks {
    keys: Vec<Jwk>,
}

#[derive(Debug, Deserialize)]
struct Jwk {
    kid: String,
    kty: String,
    alg: Option<String>,
    n: String,
    e: String,
    #[serde(rename = "use")]
    use_: Option<String>,
}

#[derive(Debug, Deserialize)]
struct IdTokenClaims {
    sub: String,
    email: Option<String>,
    name: Option<String>,
    picture: Option<String>,
}
