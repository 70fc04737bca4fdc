use embedsync_core::{
    endpoint_url, CoreError, FeedApiError, FeedPage, FeedSource, RawFeedEntry, SessionToken,
};
use reqwest::header::{COOKIE, SET_COOKIE};
use reqwest::{Client, Response, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, error, info};
use url::Url;

const JSON_API_VERSION: &str = "json-api-version=1.0";
const SESSION_COOKIE_NAME: &str = "session_id";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedLinks {
    #[serde(default)]
    pub first: Option<String>,
    #[serde(default)]
    pub next: Option<String>,
}

/// A stream page. Entries stay as raw JSON here so that one malformed post
/// cannot reject the rest of the page.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedResponse {
    pub data: Vec<serde_json::Value>,
    #[serde(default)]
    pub links: Option<FeedLinks>,
}

impl From<FeedResponse> for FeedPage {
    fn from(response: FeedResponse) -> Self {
        let entries = response
            .data
            .into_iter()
            .filter_map(|value| match serde_json::from_value::<RawFeedEntry>(value) {
                Ok(entry) => Some(entry),
                Err(e) => {
                    debug!("Skipping malformed feed entry: {}", e);
                    None
                }
            })
            .collect();

        Self {
            entries,
            next_cursor: response
                .links
                .and_then(|links| links.next)
                .filter(|next| !next.trim().is_empty()),
        }
    }
}

#[derive(Debug, Serialize)]
struct LoginRequest<'a> {
    data: LoginData<'a>,
}

#[derive(Debug, Serialize)]
struct LoginData<'a> {
    #[serde(rename = "type")]
    kind: &'a str,
    attributes: LoginAttributes<'a>,
}

#[derive(Debug, Serialize)]
struct LoginAttributes<'a> {
    email: &'a str,
    password: &'a str,
}

#[derive(Clone)]
pub struct PatreonCredentials {
    pub email: String,
    pub password: String,
}

impl std::fmt::Debug for PatreonCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PatreonCredentials")
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .finish()
    }
}

#[derive(Debug, Clone)]
pub struct PatreonApiClient {
    http_client: Client,
    base_url: String,
}

impl PatreonApiClient {
    pub fn new(endpoint: &str, timeout: Duration, user_agent: &str) -> Result<Self, CoreError> {
        let http_client = Client::builder()
            .user_agent(user_agent)
            .timeout(timeout)
            .build()?;

        Ok(Self::with_client(http_client, endpoint))
    }

    pub fn with_client(http_client: Client, endpoint: &str) -> Self {
        Self {
            http_client,
            base_url: endpoint_url(endpoint),
        }
    }

    pub fn login_url(&self) -> String {
        format!("{}/login?{}", self.base_url, JSON_API_VERSION)
    }

    /// Cursor of the first page of the followed-creators stream.
    pub fn stream_url(&self) -> String {
        format!(
            "{}/stream?filter%5Bis_following%5D=true&json-api-use-default-includes=false&{}",
            self.base_url, JSON_API_VERSION
        )
    }

    /// Exchanges credentials for a session. Returns the raw `session_id`
    /// cookie, or `None` when the response set no such cookie.
    pub async fn login(&self, credentials: &PatreonCredentials) -> Result<Option<String>, CoreError> {
        let body = LoginRequest {
            data: LoginData {
                kind: "user",
                attributes: LoginAttributes {
                    email: &credentials.email,
                    password: &credentials.password,
                },
            },
        };

        info!("Logging in to Patreon as {}", credentials.email);
        let response = self
            .http_client
            .post(self.login_url())
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                error!("Network error during Patreon login: {}", e);
                map_transport_error(e)
            })?;

        let status = response.status();
        if !status.is_success() {
            error!("Patreon login failed with status: {}", status);
            return Err(FeedApiError::AuthenticationFailed {
                reason: format!("login returned {}", status),
            }
            .into());
        }

        Ok(session_cookie(&response))
    }

    /// Fetches one page of the stream. Any non-success status is an error.
    pub async fn fetch_page(
        &self,
        cursor: &str,
        session: &SessionToken,
    ) -> Result<FeedPage, CoreError> {
        let url = resolve_cursor(cursor)?;

        debug!("Fetching feed page {}", url);
        let response = self
            .http_client
            .get(url.clone())
            .header(COOKIE, session.cookie_header())
            .send()
            .await
            .map_err(|e| {
                error!("Network error for GET {}: {}", url, e);
                map_transport_error(e)
            })?;

        let status = response.status();
        if !status.is_success() {
            error!("Request failed with status: {} for {}", status, url);
            return Err(status_error(status, url.as_str()).into());
        }

        let feed: FeedResponse = response.json().await.map_err(|e| {
            error!("Failed to parse feed page: {}", e);
            CoreError::FeedApi(FeedApiError::InvalidResponse {
                details: format!("Failed to parse feed page {}", url),
            })
        })?;

        let received = feed.data.len();
        let page = FeedPage::from(feed);
        info!(
            "Retrieved {} of {} feed entries from {}",
            page.entries.len(),
            received,
            url
        );
        Ok(page)
    }
}

impl FeedSource for PatreonApiClient {
    fn first_cursor(&self) -> String {
        self.stream_url()
    }

    async fn fetch_page(
        &self,
        cursor: &str,
        session: &SessionToken,
    ) -> Result<FeedPage, CoreError> {
        PatreonApiClient::fetch_page(self, cursor, session).await
    }
}

/// Turns a cursor into an absolute URL. Cursors may arrive without a scheme.
pub fn resolve_cursor(cursor: &str) -> Result<Url, CoreError> {
    let cursor = cursor.trim();
    let parsed = match Url::parse(cursor) {
        Ok(url) if matches!(url.scheme(), "http" | "https") => Ok(url),
        _ => Url::parse(&format!("https://{}", cursor)),
    };

    parsed.map_err(|e| CoreError::InvalidInput {
        message: format!("invalid feed cursor {:?}: {}", cursor, e),
    })
}

fn session_cookie(response: &Response) -> Option<String> {
    response
        .headers()
        .get_all(SET_COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .find(|cookie| cookie.starts_with(SESSION_COOKIE_NAME))
        .map(str::to_string)
}

fn status_error(status: StatusCode, url: &str) -> FeedApiError {
    match status.as_u16() {
        401 => FeedApiError::InvalidSession,
        403 => FeedApiError::Forbidden {
            resource: url.to_string(),
        },
        code if status.is_server_error() => FeedApiError::ServerError { status_code: code },
        code => FeedApiError::RequestFailed {
            url: url.to_string(),
            status_code: code,
        },
    }
}

fn map_transport_error(e: reqwest::Error) -> CoreError {
    if e.is_timeout() {
        CoreError::FeedApi(FeedApiError::RequestTimeout)
    } else {
        CoreError::Network(e)
    }
}
