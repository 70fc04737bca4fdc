use embedsync_core::{CoreError, LinkChecker, LinkStatus};
use reqwest::{Client, StatusCode};
use std::time::Duration;
use tracing::debug;

/// Probes links with a `HEAD` request. Redirects are followed.
#[derive(Debug, Clone)]
pub struct HttpLinkValidator {
    http_client: Client,
}

impl HttpLinkValidator {
    pub fn new(timeout: Duration, user_agent: &str) -> Result<Self, CoreError> {
        let http_client = Client::builder()
            .user_agent(user_agent)
            .timeout(timeout)
            .build()?;

        Ok(Self { http_client })
    }

    pub async fn validate(&self, link: &str) -> LinkStatus {
        match self.http_client.head(link).send().await {
            Ok(response) => {
                let status = classify_status(response.status());
                debug!("Liveness probe for {}: {:?}", link, status);
                status
            }
            Err(e) => {
                debug!("Liveness probe for {} failed: {}", link, e);
                LinkStatus::Unreachable {
                    reason: e.to_string(),
                }
            }
        }
    }
}

impl LinkChecker for HttpLinkValidator {
    async fn check(&self, link: &str) -> LinkStatus {
        self.validate(link).await
    }
}

fn classify_status(status: StatusCode) -> LinkStatus {
    if status.is_success() {
        LinkStatus::Alive
    } else {
        LinkStatus::Dead {
            status: status.as_u16(),
        }
    }
}
