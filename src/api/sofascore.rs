//! Headless-browser transport for the Sofascore API. The endpoints block
//! plain HTTP clients, so the JSON is loaded in a real browser page and read
//! back from the `<pre>` element the browser renders it into.
//!
//! The WebDriver session is an explicitly owned resource: connected once at
//! run start, passed to the driver, and closed when the run ends.

use std::time::Duration;

use anyhow::{Context, Result};
use fantoccini::{ClientBuilder, Locator};
use serde_json::{json, Value};

use super::REQUEST_DELAY_SECS;

const API_BASE_URL: &str = "https://api.sofascore.com/api/v1";
const IMG_BASE_URL: &str = "https://img.sofascore.com/api/v1";

pub fn seasons_url(league_code: i64) -> String {
    format!("{API_BASE_URL}/unique-tournament/{league_code}/seasons/")
}

pub fn events_page_url(league_code: i64, season_id: i64, page: usize) -> String {
    format!("{API_BASE_URL}/unique-tournament/{league_code}/season/{season_id}/events/last/{page}")
}

pub fn standings_url(league_code: i64, season_id: i64, partition: &str) -> String {
    format!("{API_BASE_URL}/unique-tournament/{league_code}/season/{season_id}/standings/{partition}")
}

pub fn season_listing_url(league_code: i64, season_id: i64, kind: &str) -> String {
    format!("{API_BASE_URL}/unique-tournament/{league_code}/season/{season_id}/{kind}s")
}

pub fn event_url(match_id: i64, section: &str) -> String {
    if section.is_empty() {
        format!("{API_BASE_URL}/event/{match_id}")
    } else {
        format!("{API_BASE_URL}/event/{match_id}/{section}")
    }
}

pub fn entity_url(kind: &str, id: i64) -> String {
    format!("{API_BASE_URL}/{kind}/{id}")
}

pub fn image_url(kind: &str, id: i64) -> String {
    format!("{IMG_BASE_URL}/{kind}/{id}/image")
}

pub struct BrowserClient {
    client: fantoccini::Client,
    delay: Duration,
    timeout: Duration,
}

impl BrowserClient {
    /// Connect to a WebDriver endpoint (chromedriver) and start a headless
    /// session.
    pub async fn connect(webdriver_url: &str) -> Result<Self> {
        let capabilities = json!({
            "goog:chromeOptions": {
                "args": ["--headless=new", "--disable-gpu", "--no-sandbox"]
            }
        });
        let capabilities = capabilities
            .as_object()
            .cloned()
            .expect("capabilities literal is an object");
        let client = ClientBuilder::native()
            .capabilities(capabilities)
            .connect(webdriver_url)
            .await
            .with_context(|| format!("Failed to connect to WebDriver at {webdriver_url}"))?;
        Ok(Self {
            client,
            delay: Duration::from_secs(REQUEST_DELAY_SECS),
            timeout: Duration::from_secs(10),
        })
    }

    /// Load `url` in the browser, wait for the `<pre>` element the JSON body
    /// is rendered into, and parse its text. A navigation failure, a wait
    /// timeout, or unparsable text all yield `None`.
    pub async fn fetch_json(&self, url: &str) -> Option<Value> {
        println!("Scraping {url}");

        let result = async {
            self.client.goto(url).await.ok()?;
            let pre = self
                .client
                .wait()
                .at_most(self.timeout)
                .for_element(Locator::Css("pre"))
                .await
                .ok()?;
            let text = pre.text().await.ok()?;
            serde_json::from_str::<Value>(&text).ok()
        }
        .await;

        tokio::time::sleep(self.delay).await;

        if result.is_none() {
            eprintln!("Browser fetch failed for {url}");
        }
        result
    }

    /// End the WebDriver session.
    pub async fn close(self) -> Result<()> {
        self.client.close().await.context("Failed to close WebDriver session")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn url_builders() {
        assert_eq!(
            seasons_url(54),
            "https://api.sofascore.com/api/v1/unique-tournament/54/seasons/"
        );
        assert_eq!(
            events_page_url(54, 777, 2),
            "https://api.sofascore.com/api/v1/unique-tournament/54/season/777/events/last/2"
        );
        assert_eq!(
            standings_url(54, 777, "home"),
            "https://api.sofascore.com/api/v1/unique-tournament/54/season/777/standings/home"
        );
        assert_eq!(
            season_listing_url(54, 777, "player"),
            "https://api.sofascore.com/api/v1/unique-tournament/54/season/777/players"
        );
        assert_eq!(event_url(9, ""), "https://api.sofascore.com/api/v1/event/9");
        assert_eq!(
            event_url(9, "lineups"),
            "https://api.sofascore.com/api/v1/event/9/lineups"
        );
        assert_eq!(entity_url("manager", 4), "https://api.sofascore.com/api/v1/manager/4");
        assert_eq!(image_url("team", 4), "https://img.sofascore.com/api/v1/team/4/image");
    }
}
