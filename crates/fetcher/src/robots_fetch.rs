use std::time::Duration;

use async_trait::async_trait;
use otto_robots::RobotsFetch;
use tracing::debug;

/// Robots.txt fetches get their own short timeout (§5), independent of the
/// general fetch timeout, so a hanging robots endpoint can't stall the
/// politeness check for as long as a regular page fetch.
const ROBOTS_TXT_TIMEOUT: Duration = Duration::from_secs(10);

/// Fetches `https://{domain}/robots.txt` over HTTP. Any failure (non-200,
/// connection error, timeout) is reported as `None`, which `RobotsChecker`
/// treats permissively.
pub struct HttpRobotsFetch {
    client: reqwest::Client,
}

impl HttpRobotsFetch {
    pub fn new(user_agent: String) -> reqwest::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(ROBOTS_TXT_TIMEOUT)
            .user_agent(user_agent)
            .build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl RobotsFetch for HttpRobotsFetch {
    async fn fetch_robots_txt(&self, domain: &str) -> Option<String> {
        let url = format!("https://{domain}/robots.txt");
        let resp = match self.client.get(&url).send().await {
            Ok(resp) => resp,
            Err(err) => {
                debug!(domain, error = %err, "robots.txt fetch failed");
                return None;
            }
        };
        if resp.status() != reqwest::StatusCode::OK {
            return None;
        }
        resp.text().await.ok()
    }
}
