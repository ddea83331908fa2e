//! Plain-HTTP transport for the FotMob JSON API.

use std::time::Duration;

use serde_json::Value;

use super::REQUEST_DELAY_SECS;

const BASE_URL: &str = "https://www.fotmob.com/api";

pub fn league_url(league_code: i64) -> String {
    format!("{BASE_URL}/leagues?id={league_code}")
}

pub fn season_url(league_code: i64, season_label: &str) -> String {
    format!("{BASE_URL}/leagues?id={league_code}&season={season_label}")
}

pub struct FotmobClient {
    client: reqwest::Client,
    delay: Duration,
}

impl FotmobClient {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::builder()
                .user_agent("Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36")
                .timeout(Duration::from_secs(30))
                .build()
                .unwrap(),
            delay: Duration::from_secs(REQUEST_DELAY_SECS),
        }
    }

    /// GET `url` and parse the body as JSON. Any transport or parse failure
    /// yields `None`; the caller treats it as "no data for this entity".
    pub async fn fetch_json(&self, url: &str) -> Option<Value> {
        println!("Scraping {url}");

        let result = async {
            let response = self.client.get(url).send().await?;
            response.error_for_status()?.json::<Value>().await
        }
        .await;

        tokio::time::sleep(self.delay).await;

        match result {
            Ok(value) => Some(value),
            Err(err) => {
                eprintln!("Fetch failed for {url}: {err}");
                None
            }
        }
    }
}

impl Default for FotmobClient {
    fn default() -> Self {
        Self::new()
    }
}
