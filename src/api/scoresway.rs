//! Transport for the Scoresway widget feeds. The endpoints expect a browser:
//! spoofed headers, a referer warm-up request, and a JSONP-wrapped body
//! (`cb({...});`) that must be unwrapped before parsing.

use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE, CONNECTION, REFERER, USER_AGENT};
use serde_json::Value;

use super::REQUEST_DELAY_SECS;

const REFERER_URL: &str = "https://www.scoresway.com/";
const MATCH_FEED_URL: &str = "https://api.performfeeds.com/soccerdata/match/ft1tiv1inq7v1sk3y9tv12yh5";

/// Match-detail endpoint for one match id.
pub fn match_url(match_id: &str) -> String {
    format!("{MATCH_FEED_URL}/{match_id}?_rt=c&live=yes&_lcl=en&_fmt=jsonp&sps=widgets&_clbk=cb")
}

/// Strip a JSONP envelope `name(payload);`, returning the payload. The name
/// must be a non-empty run of word characters or `$`; anything else is not a
/// wrapper we recognize.
pub fn strip_jsonp(body: &str) -> Option<&str> {
    let text = body.trim();
    let open = text.find('(')?;
    let name = &text[..open];
    if name.is_empty() || !name.chars().all(|c| c.is_alphanumeric() || c == '_' || c == '$') {
        return None;
    }
    let rest = text[open + 1..].trim_end();
    let rest = rest.strip_suffix(';').unwrap_or(rest).trim_end();
    rest.strip_suffix(')')
}

pub struct ScoreswayClient {
    client: reqwest::Client,
    delay: Duration,
}

impl ScoreswayClient {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::builder()
                .default_headers(browser_headers())
                .timeout(Duration::from_secs(30))
                .build()
                .unwrap(),
            delay: Duration::from_secs(REQUEST_DELAY_SECS),
        }
    }

    /// GET `url` with browser headers, warm the referer first, unwrap the
    /// JSONP envelope and parse. Non-200, a non-matching wrapper, or invalid
    /// JSON all yield `None` silently.
    pub async fn fetch_json(&self, url: &str) -> Option<Value> {
        println!("Scraping {url}");

        // Warm-up so the session carries the referer's cookies. Best effort.
        let _ = self
            .client
            .get(REFERER_URL)
            .timeout(Duration::from_secs(20))
            .send()
            .await;

        let result = async {
            let response = self.client.get(url).send().await.ok()?;
            if !response.status().is_success() {
                return None;
            }
            let body = response.text().await.ok()?;
            let payload = strip_jsonp(&body)?;
            serde_json::from_str::<Value>(payload).ok()
        }
        .await;

        tokio::time::sleep(self.delay).await;
        result
    }
}

impl Default for ScoreswayClient {
    fn default() -> Self {
        Self::new()
    }
}

fn browser_headers() -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(
        USER_AGENT,
        HeaderValue::from_static(
            "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
             (KHTML, like Gecko) Chrome/145.0.0.0 Safari/537.36",
        ),
    );
    headers.insert(REFERER, HeaderValue::from_static(REFERER_URL));
    headers.insert(ACCEPT, HeaderValue::from_static("*/*"));
    headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("en-US,en;q=0.9"));
    headers.insert(CONNECTION, HeaderValue::from_static("keep-alive"));
    headers
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_plain_wrapper() {
        assert_eq!(strip_jsonp(r#"cb({"a":1})"#), Some(r#"{"a":1}"#));
    }

    #[test]
    fn strips_wrapper_with_semicolon_and_whitespace() {
        assert_eq!(strip_jsonp("  $callback_1({\"a\":1}) ;  "), Some("{\"a\":1}"));
    }

    #[test]
    fn rejects_bodies_that_are_not_wrapped() {
        assert_eq!(strip_jsonp(r#"{"a":1}"#), None);
        assert_eq!(strip_jsonp("<html>blocked</html>"), None);
        assert_eq!(strip_jsonp("cb({\"a\":1}"), None); // unbalanced
    }

    #[test]
    fn match_url_embeds_the_id() {
        let url = match_url("abc123");
        assert!(url.contains("/match/"));
        assert!(url.contains("abc123?"));
        assert!(url.ends_with("_clbk=cb"));
    }
}
