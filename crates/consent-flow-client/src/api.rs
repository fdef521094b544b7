// consent-flow-client/src/api.rs
// ============================================================================
// Module: REST API Client
// Description: Blocking client for accounts, saved documents, credits, and
//              assistant tokens.
// Purpose: Implement the core document store and token source over HTTP.
// Dependencies: consent-flow-core, reqwest, serde, serde_json, url
// ============================================================================

//! ## Overview
//! [`ApiClient`] issues bounded requests against the Consent Flow REST API.
//! Cleartext `http://` is refused unless explicitly allowed, redirects are
//! not followed, and response bodies are read up to a hard size limit. The
//! client keeps no cache and never retries; each failure surfaces once as a
//! [`ClientError`].

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::io::Read;
use std::time::Duration;

use consent_flow_core::AssistantTokenSource;
use consent_flow_core::DocumentId;
use consent_flow_core::DocumentStore;
use consent_flow_core::SavedDocument;
use consent_flow_core::StoreError;
use consent_flow_core::TokenError;
use consent_flow_core::UploadRequest;
use reqwest::Method;
use reqwest::StatusCode;
use reqwest::blocking::Client;
use reqwest::blocking::RequestBuilder;
use reqwest::blocking::Response;
use reqwest::blocking::multipart::Form;
use reqwest::blocking::multipart::Part;
use reqwest::header::AUTHORIZATION;
use reqwest::header::CONTENT_TYPE;
use reqwest::redirect::Policy;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::json;
use thiserror::Error;
use url::Url;

use crate::session::AccountUser;
use crate::session::AuthSession;

// ============================================================================
// SECTION: Configuration
// ============================================================================

/// Configuration for the REST client.
///
/// # Invariants
/// - `allow_http = false` blocks cleartext `http://` base URLs.
/// - `max_response_bytes` is a hard upper bound on response bodies.
/// - `timeout_ms` applies to the full request lifecycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiClientConfig {
    /// API base URL, e.g. `https://api.example.com/api`.
    pub base_url: String,
    /// Allow cleartext HTTP.
    pub allow_http: bool,
    /// Request timeout in milliseconds.
    pub timeout_ms: u64,
    /// User agent sent with every request.
    pub user_agent: String,
    /// Maximum response size, in bytes.
    pub max_response_bytes: usize,
}

impl ApiClientConfig {
    /// Creates a configuration with default limits for `base_url`.
    #[must_use]
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            allow_http: false,
            timeout_ms: 15_000,
            user_agent: format!("consent-flow/{}", env!("CARGO_PKG_VERSION")),
            max_response_bytes: 16 * 1024 * 1024,
        }
    }
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// REST client errors.
#[derive(Debug, Error)]
pub enum ClientError {
    /// Client configuration is unusable.
    #[error("client config error: {0}")]
    Config(String),
    /// Request requires a signed-in user.
    #[error("request requires a signed-in user")]
    Unauthorized,
    /// Account has no credits left for the request.
    #[error("insufficient credits")]
    InsufficientCredits,
    /// Resource was not found.
    #[error("not found: {0}")]
    NotFound(String),
    /// Transport failure.
    #[error("request failed: {0}")]
    Transport(String),
    /// Server answered with an error status.
    #[error("server returned {status}: {message}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Server-provided message, if any.
        message: String,
    },
    /// Response exceeded the size limit.
    #[error("response exceeds size limit of {0} bytes")]
    ResponseTooLarge(usize),
    /// Response body was not understood.
    #[error("invalid response: {0}")]
    InvalidResponse(String),
}

impl From<ClientError> for StoreError {
    fn from(err: ClientError) -> Self {
        match err {
            ClientError::Unauthorized => Self::Unauthorized,
            ClientError::NotFound(id) => Self::NotFound(id),
            ClientError::InvalidResponse(message) => Self::Invalid(message),
            other => Self::Io(other.to_string()),
        }
    }
}

impl From<ClientError> for TokenError {
    fn from(err: ClientError) -> Self {
        match err {
            ClientError::Unauthorized => Self::Unauthorized,
            other => Self::Request(other.to_string()),
        }
    }
}

// ============================================================================
// SECTION: Response Shapes
// ============================================================================

/// `POST /auth/login` response.
#[derive(Debug, Deserialize)]
struct LoginResponse {
    /// Bearer token.
    access_token: Option<String>,
    /// Signed-in account.
    user: Option<AccountUser>,
}

/// `GET /contracts` response.
#[derive(Debug, Deserialize)]
struct ListResponse {
    /// Saved documents.
    #[serde(default)]
    items: Vec<SavedDocument>,
}

/// `POST /contracts/upload` response.
#[derive(Debug, Deserialize)]
struct UploadResponse {
    /// Stored record.
    item: Option<SavedDocument>,
}

/// `GET /credits/balance` response.
#[derive(Debug, Deserialize)]
struct BalanceResponse {
    /// Remaining credits.
    credits: u64,
}

/// `POST /credits/checkout-session` response.
#[derive(Debug, Deserialize)]
struct CheckoutResponse {
    /// Hosted checkout URL.
    url: String,
}

/// `POST /credits/confirm` response.
#[derive(Debug, Deserialize)]
struct ConfirmResponse {
    /// Whether the purchase was applied.
    #[serde(default)]
    ok: bool,
    /// Credits added by the purchase.
    added: Option<u64>,
    /// Failure message.
    message: Option<String>,
}

/// `GET /voice-agent/legal/token` response.
#[derive(Debug, Deserialize)]
struct TokenResponse {
    /// Ephemeral client secret.
    client_secret: ClientSecret,
}

/// Ephemeral client secret wrapper.
#[derive(Debug, Deserialize)]
struct ClientSecret {
    /// Secret value.
    value: String,
}

/// Error body returned with failed requests.
#[derive(Debug, Default, Deserialize)]
struct ErrorBody {
    /// Machine-readable error code.
    error: Option<String>,
    /// Human-readable message.
    message: Option<String>,
}

/// Outcome of a checkout confirmation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CheckoutConfirmation {
    /// Credits added, when reported.
    pub added: Option<u64>,
}

// ============================================================================
// SECTION: Client
// ============================================================================

/// Blocking REST client.
///
/// # Invariants
/// - Redirects are not followed.
/// - Responses exceeding the configured limit fail closed.
#[derive(Debug, Clone)]
pub struct ApiClient {
    /// Client configuration.
    config: ApiClientConfig,
    /// Parsed base URL, always ending in `/`.
    base: Url,
    /// HTTP client used for outbound requests.
    client: Client,
    /// Bearer token attached to authenticated calls.
    token: Option<String>,
}

impl ApiClient {
    /// Creates a client for the configured base URL.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Config`] when the base URL is invalid or uses
    /// cleartext HTTP without opt-in.
    pub fn new(config: ApiClientConfig) -> Result<Self, ClientError> {
        let base = parse_base_url(&config.base_url, config.allow_http)?;
        let client = Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .user_agent(config.user_agent.clone())
            .redirect(Policy::none())
            .build()
            .map_err(|_| ClientError::Config("http client build failed".to_string()))?;
        Ok(Self {
            config,
            base,
            client,
            token: None,
        })
    }

    /// Attaches the bearer token of a signed-in session.
    #[must_use]
    pub fn with_session(mut self, session: &AuthSession) -> Self {
        self.token = Some(session.access_token.clone());
        self
    }

    /// Replaces the bearer token.
    pub fn set_token(&mut self, token: Option<String>) {
        self.token = token;
    }

    /// Returns true when a bearer token is attached.
    #[must_use]
    pub const fn is_authenticated(&self) -> bool {
        self.token.is_some()
    }

    /// Signs in and returns the session to persist.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError`] when the request fails or the response lacks
    /// a token or user.
    pub fn login(&self, email: &str, password: &str) -> Result<AuthSession, ClientError> {
        let body = serde_json::to_vec(&json!({ "email": email, "password": password }))
            .map_err(|err| ClientError::InvalidResponse(err.to_string()))?;
        let request = self.request(Method::POST, "auth/login", false)?.header(CONTENT_TYPE, "application/json").body(body);
        let response: LoginResponse = self.send_json(request)?;
        match (response.access_token, response.user) {
            (Some(access_token), Some(user)) if !access_token.is_empty() => Ok(AuthSession {
                user,
                access_token,
            }),
            _ => Err(ClientError::InvalidResponse("login response lacks access_token or user".to_string())),
        }
    }

    /// Lists saved documents.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError`] when the request fails.
    pub fn list_documents(&self) -> Result<Vec<SavedDocument>, ClientError> {
        let request = self.request(Method::GET, "contracts", true)?;
        let response: ListResponse = self.send_json(request)?;
        Ok(response.items)
    }

    /// Uploads a rendered document with its payload.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError`] when the request fails or the response lacks
    /// the stored record.
    pub fn upload_document(&self, upload: &UploadRequest) -> Result<SavedDocument, ClientError> {
        let payload =
            serde_json::to_string(&upload.payload).map_err(|err| ClientError::InvalidResponse(err.to_string()))?;
        let file = Part::bytes(upload.bytes.clone())
            .file_name(upload.file_name.clone())
            .mime_str(upload.content_type)
            .map_err(|err| ClientError::Config(err.to_string()))?;
        let form = Form::new().part("file", file).text("title", upload.title.clone()).text("payload", payload);
        let request = self.request(Method::POST, "contracts/upload", true)?.multipart(form);
        let response: UploadResponse = self.send_json(request)?;
        response.item.ok_or_else(|| ClientError::InvalidResponse("upload response lacks item".to_string()))
    }

    /// Deletes a saved document.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError`] when the request fails.
    pub fn delete_document(&self, id: &DocumentId) -> Result<(), ClientError> {
        let request = self.request_segments(Method::DELETE, &["contracts", id.as_str()], true)?;
        let response = self.send(request).map_err(|err| match err {
            ClientError::NotFound(_) => ClientError::NotFound(id.to_string()),
            other => other,
        })?;
        self.read_body(response).map(|_| ())
    }

    /// Returns the remaining credit balance.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError`] when the request fails.
    pub fn credit_balance(&self) -> Result<u64, ClientError> {
        let request = self.request(Method::GET, "credits/balance", true)?;
        let response: BalanceResponse = self.send_json(request)?;
        Ok(response.credits)
    }

    /// Starts a hosted checkout and returns its URL.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError`] when the request fails.
    pub fn create_checkout_session(&self) -> Result<String, ClientError> {
        let request = self
            .request(Method::POST, "credits/checkout-session", true)?
            .header(CONTENT_TYPE, "application/json")
            .body("{}");
        let response: CheckoutResponse = self.send_json(request)?;
        Ok(response.url)
    }

    /// Confirms a completed checkout.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError`] when the request fails or the purchase was
    /// not applied.
    pub fn confirm_checkout(&self, session_id: &str) -> Result<CheckoutConfirmation, ClientError> {
        let body = serde_json::to_vec(&json!({ "sessionId": session_id }))
            .map_err(|err| ClientError::InvalidResponse(err.to_string()))?;
        let request =
            self.request(Method::POST, "credits/confirm", true)?.header(CONTENT_TYPE, "application/json").body(body);
        let response: ConfirmResponse = self.send_json(request)?;
        if !response.ok {
            return Err(ClientError::Status {
                status: StatusCode::OK.as_u16(),
                message: response.message.unwrap_or_else(|| "checkout was not confirmed".to_string()),
            });
        }
        Ok(CheckoutConfirmation {
            added: response.added,
        })
    }

    /// Fetches an ephemeral realtime key for `lang`.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError`] when the request fails.
    pub fn voice_token(&self, lang: &str) -> Result<String, ClientError> {
        let mut request_url = self.url(&["voice-agent", "legal", "token"])?;
        request_url.query_pairs_mut().append_pair("lang", lang);
        let request = self.authorize(self.client.request(Method::GET, request_url), true)?;
        let response: TokenResponse = self.send_json(request)?;
        if response.client_secret.value.is_empty() {
            return Err(ClientError::InvalidResponse("empty client secret".to_string()));
        }
        Ok(response.client_secret.value)
    }

    // ------------------------------------------------------------------------
    // Request plumbing
    // ------------------------------------------------------------------------

    /// Builds a request for a `/`-separated path under the base URL.
    fn request(&self, method: Method, path: &str, authenticated: bool) -> Result<RequestBuilder, ClientError> {
        let segments: Vec<&str> = path.split('/').collect();
        self.request_segments(method, &segments, authenticated)
    }

    /// Builds a request for path segments under the base URL.
    fn request_segments(
        &self,
        method: Method,
        segments: &[&str],
        authenticated: bool,
    ) -> Result<RequestBuilder, ClientError> {
        let url = self.url(segments)?;
        self.authorize(self.client.request(method, url), authenticated)
    }

    /// Appends percent-encoded segments to the base URL.
    fn url(&self, segments: &[&str]) -> Result<Url, ClientError> {
        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|()| ClientError::Config("base url cannot carry a path".to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    /// Attaches the bearer token when the call requires one.
    fn authorize(&self, request: RequestBuilder, authenticated: bool) -> Result<RequestBuilder, ClientError> {
        if !authenticated {
            return Ok(request);
        }
        let token = self.token.as_deref().ok_or(ClientError::Unauthorized)?;
        Ok(request.header(AUTHORIZATION, format!("Bearer {token}")))
    }

    /// Sends a request and maps error statuses.
    fn send(&self, request: RequestBuilder) -> Result<Response, ClientError> {
        let response = request.send().map_err(|err| ClientError::Transport(err.without_url().to_string()))?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body: ErrorBody = self
            .read_body(response)
            .ok()
            .and_then(|bytes| serde_json::from_slice(&bytes).ok())
            .unwrap_or_default();
        Err(match status {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => ClientError::Unauthorized,
            StatusCode::NOT_FOUND => ClientError::NotFound(body.message.unwrap_or_default()),
            StatusCode::PAYMENT_REQUIRED if body.error.as_deref() == Some("insufficient_credits") => {
                ClientError::InsufficientCredits
            }
            _ => ClientError::Status {
                status: status.as_u16(),
                message: body.message.or(body.error).unwrap_or_default(),
            },
        })
    }

    /// Sends a request and decodes a JSON response.
    fn send_json<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, ClientError> {
        let response = self.send(request)?;
        let bytes = self.read_body(response)?;
        serde_json::from_slice(&bytes).map_err(|err| ClientError::InvalidResponse(err.to_string()))
    }

    /// Reads a response body up to the configured limit.
    fn read_body(&self, response: Response) -> Result<Vec<u8>, ClientError> {
        read_response_limited(response, self.config.max_response_bytes)
    }
}

impl DocumentStore for ApiClient {
    fn list(&self) -> Result<Vec<SavedDocument>, StoreError> {
        Ok(self.list_documents()?)
    }

    fn upload(&self, request: &UploadRequest) -> Result<SavedDocument, StoreError> {
        Ok(self.upload_document(request)?)
    }

    fn delete(&self, id: &DocumentId) -> Result<(), StoreError> {
        Ok(self.delete_document(id)?)
    }
}

impl AssistantTokenSource for ApiClient {
    fn ephemeral_token(&self, lang: &str) -> Result<String, TokenError> {
        Ok(self.voice_token(lang)?)
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Parses and checks the base URL.
fn parse_base_url(base_url: &str, allow_http: bool) -> Result<Url, ClientError> {
    let trimmed = base_url.trim().trim_end_matches('/');
    let url = Url::parse(&format!("{trimmed}/")).map_err(|err| ClientError::Config(format!("base url: {err}")))?;
    match url.scheme() {
        "https" => {}
        "http" if allow_http => {}
        "http" => return Err(ClientError::Config("base url uses http:// without allow_http".to_string())),
        other => return Err(ClientError::Config(format!("base url scheme {other} is not supported"))),
    }
    if url.host_str().is_none_or(str::is_empty) {
        return Err(ClientError::Config("base url is missing a host".to_string()));
    }
    if !url.username().is_empty() || url.password().is_some() {
        return Err(ClientError::Config("base url must not embed credentials".to_string()));
    }
    Ok(url)
}

/// Reads a response body, failing once `max_bytes` is exceeded.
fn read_response_limited(response: Response, max_bytes: usize) -> Result<Vec<u8>, ClientError> {
    let max_bytes_u64 =
        u64::try_from(max_bytes).map_err(|_| ClientError::Config("response size limit exceeds u64".to_string()))?;
    if let Some(expected) = response.content_length()
        && expected > max_bytes_u64
    {
        return Err(ClientError::ResponseTooLarge(max_bytes));
    }
    let mut buf = Vec::new();
    let mut handle = response.take(max_bytes_u64.saturating_add(1));
    handle.read_to_end(&mut buf).map_err(|_| ClientError::Transport("failed to read response".to_string()))?;
    if buf.len() > max_bytes {
        return Err(ClientError::ResponseTooLarge(max_bytes));
    }
    Ok(buf)
}
