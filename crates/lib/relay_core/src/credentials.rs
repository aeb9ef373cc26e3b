//! Google access-token resolution.
//!
//! Both upstream clients authenticate with an OAuth bearer token. Sources, in
//! the order [`GoogleCredentials::from_env`] tries them:
//!
//! 1. `GOOGLE_OAUTH_ACCESS_TOKEN`, used verbatim;
//! 2. the credentials file named by `GOOGLE_APPLICATION_CREDENTIALS`;
//! 3. gcloud's application-default credentials file, when present;
//! 4. the GCE / Cloud Run metadata server.
//!
//! Credentials files hold either a service-account key (a signed JWT is
//! exchanged for a token) or an `authorized_user` refresh token. Fetched
//! tokens are cached until shortly before expiry.

use std::env;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{Algorithm, EncodingKey, Header, encode};
use reqwest::{Client, Response};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::{debug, info};

/// Default service-account token endpoint on the metadata server.
pub const METADATA_TOKEN_URL: &str =
    "http://metadata.google.internal/computeMetadata/v1/instance/service-accounts/default/token";

/// Google's OAuth 2.0 token endpoint.
pub const GOOGLE_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";

/// Scope covering both Dialogflow and Natural Language.
pub const CLOUD_PLATFORM_SCOPE: &str = "https://www.googleapis.com/auth/cloud-platform";

const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";

/// Lifetime of the self-signed assertion; Google caps it at one hour.
const ASSERTION_LIFETIME_SECS: i64 = 3600;

/// Refresh this many seconds before the reported expiry.
const EXPIRY_MARGIN_SECS: i64 = 60;

/// Errors raised while obtaining an access token.
#[derive(Debug, Error)]
pub enum CredentialError {
    #[error("Token request failed: {0}")]
    Request(String),

    #[error("Token endpoint returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Token response parse error: {0}")]
    Parse(String),

    #[error("Credentials file error: {0}")]
    File(String),

    #[error("Signing key error: {0}")]
    Key(String),
}

#[derive(Debug, Clone)]
struct CachedToken {
    value: String,
    expires_at: DateTime<Utc>,
}

impl CachedToken {
    fn is_fresh(&self, now: DateTime<Utc>) -> bool {
        now + Duration::seconds(EXPIRY_MARGIN_SECS) < self.expires_at
    }
}

/// Shape shared by the metadata server and the OAuth token endpoint.
#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: i64,
}

fn default_token_uri() -> String {
    GOOGLE_TOKEN_URI.to_string()
}

/// Application-default credentials file, discriminated by its `type` field.
#[derive(Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum CredentialsFile {
    ServiceAccount(ServiceAccountFile),
    AuthorizedUser(AuthorizedUserFile),
}

#[derive(Deserialize)]
struct ServiceAccountFile {
    client_email: String,
    private_key: String,
    #[serde(default)]
    private_key_id: Option<String>,
    #[serde(default = "default_token_uri")]
    token_uri: String,
}

#[derive(Deserialize)]
struct AuthorizedUserFile {
    client_id: String,
    client_secret: String,
    refresh_token: String,
    #[serde(default = "default_token_uri")]
    token_uri: String,
}

#[derive(Serialize)]
struct AssertionClaims<'a> {
    iss: &'a str,
    scope: &'a str,
    aud: &'a str,
    iat: i64,
    exp: i64,
}

struct ServiceAccount {
    client_email: String,
    key_id: Option<String>,
    token_uri: String,
    signing_key: EncodingKey,
}

impl ServiceAccount {
    fn from_file(file: ServiceAccountFile) -> Result<Self, CredentialError> {
        let signing_key = EncodingKey::from_rsa_pem(file.private_key.as_bytes())
            .map_err(|e| CredentialError::Key(format!("private_key: {e}")))?;
        Ok(Self {
            client_email: file.client_email,
            key_id: file.private_key_id,
            token_uri: file.token_uri,
            signing_key,
        })
    }

    /// RS256 assertion for the JWT-bearer grant.
    fn assertion(&self, now: DateTime<Utc>) -> Result<String, CredentialError> {
        let claims = AssertionClaims {
            iss: &self.client_email,
            scope: CLOUD_PLATFORM_SCOPE,
            aud: &self.token_uri,
            iat: now.timestamp(),
            exp: (now + Duration::seconds(ASSERTION_LIFETIME_SECS)).timestamp(),
        };
        let mut header = Header::new(Algorithm::RS256);
        header.kid = self.key_id.clone();
        encode(&header, &claims, &self.signing_key)
            .map_err(|e| CredentialError::Key(format!("jwt encode: {e}")))
    }
}

/// Where a refreshable token comes from.
enum Fetcher {
    Metadata { url: String },
    ServiceAccount(ServiceAccount),
    AuthorizedUser(AuthorizedUserFile),
}

impl Fetcher {
    async fn fetch(&self, client: &Client) -> Result<CachedToken, CredentialError> {
        let resp = match self {
            Fetcher::Metadata { url } => {
                debug!(url = %url, "fetching access token from metadata server");
                client.get(url).header("Metadata-Flavor", "Google").send().await
            }
            Fetcher::ServiceAccount(account) => {
                debug!(client_email = %account.client_email, "exchanging service-account assertion");
                let assertion = account.assertion(Utc::now())?;
                client
                    .post(&account.token_uri)
                    .form(&[("grant_type", JWT_BEARER_GRANT), ("assertion", assertion.as_str())])
                    .send()
                    .await
            }
            Fetcher::AuthorizedUser(user) => {
                debug!(client_id = %user.client_id, "refreshing user access token");
                client
                    .post(&user.token_uri)
                    .form(&[
                        ("grant_type", "refresh_token"),
                        ("client_id", user.client_id.as_str()),
                        ("client_secret", user.client_secret.as_str()),
                        ("refresh_token", user.refresh_token.as_str()),
                    ])
                    .send()
                    .await
            }
        }
        .map_err(|e| CredentialError::Request(e.to_string()))?;

        read_token_response(resp).await
    }
}

async fn read_token_response(resp: Response) -> Result<CachedToken, CredentialError> {
    if !resp.status().is_success() {
        let status = resp.status().as_u16();
        let body = resp
            .text()
            .await
            .unwrap_or_else(|_| "<no body>".to_string());
        return Err(CredentialError::Status { status, body });
    }

    let data: TokenResponse = resp
        .json()
        .await
        .map_err(|e| CredentialError::Parse(e.to_string()))?;

    Ok(CachedToken {
        value: data.access_token,
        expires_at: Utc::now() + Duration::seconds(data.expires_in),
    })
}

enum Source {
    Static(String),
    Refreshing {
        client: Client,
        fetcher: Fetcher,
        cache: RwLock<Option<CachedToken>>,
    },
}

/// Bearer-token provider shared by the upstream clients.
pub struct GoogleCredentials {
    source: Source,
}

impl GoogleCredentials {
    /// Always return the given token.
    pub fn from_static(token: impl Into<String>) -> Self {
        Self {
            source: Source::Static(token.into()),
        }
    }

    fn refreshing(client: Client, fetcher: Fetcher) -> Self {
        Self {
            source: Source::Refreshing {
                client,
                fetcher,
                cache: RwLock::new(None),
            },
        }
    }

    /// Fetch tokens from the default metadata server.
    pub fn metadata(client: Client) -> Self {
        Self::metadata_at(client, METADATA_TOKEN_URL)
    }

    /// Fetch tokens from a metadata-compatible endpoint at `url`.
    pub fn metadata_at(client: Client, url: impl Into<String>) -> Self {
        Self::refreshing(client, Fetcher::Metadata { url: url.into() })
    }

    /// Parse a `service_account` or `authorized_user` credentials document.
    pub fn from_json(client: Client, json: &str) -> Result<Self, CredentialError> {
        let file: CredentialsFile =
            serde_json::from_str(json).map_err(|e| CredentialError::File(e.to_string()))?;
        let fetcher = match file {
            CredentialsFile::ServiceAccount(sa) => {
                Fetcher::ServiceAccount(ServiceAccount::from_file(sa)?)
            }
            CredentialsFile::AuthorizedUser(user) => Fetcher::AuthorizedUser(user),
        };
        Ok(Self::refreshing(client, fetcher))
    }

    /// Load a credentials file from disk.
    pub fn from_file(client: Client, path: impl AsRef<Path>) -> Result<Self, CredentialError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)
            .map_err(|e| CredentialError::File(format!("{}: {e}", path.display())))?;
        Self::from_json(client, &json)
    }

    /// Resolve credentials from the process environment (see module docs).
    pub fn from_env(client: Client) -> Result<Self, CredentialError> {
        let static_token = env::var("GOOGLE_OAUTH_ACCESS_TOKEN").ok();
        let explicit_file = env::var_os("GOOGLE_APPLICATION_CREDENTIALS").map(PathBuf::from);
        Self::resolve(client, static_token, explicit_file, well_known_file())
    }

    fn resolve(
        client: Client,
        static_token: Option<String>,
        explicit_file: Option<PathBuf>,
        well_known: Option<PathBuf>,
    ) -> Result<Self, CredentialError> {
        if let Some(token) = static_token.as_deref().map(str::trim).filter(|t| !t.is_empty()) {
            info!("using access token from GOOGLE_OAUTH_ACCESS_TOKEN");
            return Ok(Self::from_static(token));
        }
        if let Some(path) = explicit_file.filter(|p| !p.as_os_str().is_empty()) {
            info!(path = %path.display(), "using credentials file from GOOGLE_APPLICATION_CREDENTIALS");
            return Self::from_file(client, path);
        }
        if let Some(path) = well_known.filter(|p| p.is_file()) {
            info!(path = %path.display(), "using application-default credentials file");
            return Self::from_file(client, path);
        }
        info!("using metadata server credentials");
        Ok(Self::metadata(client))
    }

    /// Returns a bearer token valid for at least the next minute.
    pub async fn access_token(&self) -> Result<String, CredentialError> {
        match &self.source {
            Source::Static(token) => Ok(token.clone()),
            Source::Refreshing {
                client,
                fetcher,
                cache,
            } => {
                if let Some(cached) = cache.read().await.as_ref()
                    && cached.is_fresh(Utc::now())
                {
                    return Ok(cached.value.clone());
                }

                let mut guard = cache.write().await;
                // Another request may have refreshed while we waited for the lock.
                if let Some(cached) = guard.as_ref()
                    && cached.is_fresh(Utc::now())
                {
                    return Ok(cached.value.clone());
                }

                let fetched = fetcher.fetch(client).await?;
                let value = fetched.value.clone();
                *guard = Some(fetched);
                Ok(value)
            }
        }
    }
}

/// gcloud's `application_default_credentials.json` location.
fn well_known_file() -> Option<PathBuf> {
    let base = if cfg!(windows) {
        dirs::config_dir()
    } else {
        dirs::home_dir().map(|home| home.join(".config"))
    };
    base.map(|dir| dir.join("gcloud").join("application_default_credentials.json"))
}
