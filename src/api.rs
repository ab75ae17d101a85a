//! Async clients for the upstream sources.
//!
//! Three HTTP sources feed a country record:
//! - **REST Countries** for the base list (identity + simple attributes),
//! - **Wikipedia** REST `page/summary` for description/extract, with an
//!   override table for titles that need disambiguation,
//! - **World Bank Indicators API (v2)** for population/GDP histories, via the
//!   `country/{code}/indicator/{id}` endpoint. Pagination is handled
//!   automatically and the API's string-or-number `per_page` quirk is
//!   tolerated.
//! - Flags come from a static icon host as inline SVG markup.
//!
//! Transient failures (5xx, connection errors) are retried with a short fixed
//! backoff; any other failure propagates.

use crate::error::{Error, Result};
use crate::models::{BaseCountry, Entry, Indicator, Meta, Sample, Supplements, WikiSummary};
use ahash::AHashMap;
use percent_encoding::{AsciiSet, NON_ALPHANUMERIC};
use reqwest::Client as HttpClient;
use reqwest::redirect::Policy;
use serde_json::Value;
use std::future::Future;
use std::time::Duration;

/// World Bank indicator ids fetched per country.
pub const IND_POPULATION: &str = "SP.POP.TOTL";
pub const IND_GDP: &str = "NY.GDP.MKTP.CD";
pub const IND_GDP_PCAP: &str = "NY.GDP.PCAP.CD";

// Allow -, _, . unescaped in path segments (common in indicator ids and
// wiki titles like "Georgia_(country)"; parentheses still get escaped,
// which the wiki REST API accepts).
const SAFE: &AsciiSet = &NON_ALPHANUMERIC.remove(b'-').remove(b'_').remove(b'.');

fn enc(s: &str) -> String {
    percent_encoding::utf8_percent_encode(s.trim(), SAFE).to_string()
}

/// Seam between [`crate::service::CountryService`] and the network, so tests
/// can substitute a stub source.
pub trait CountrySource: Send + Sync {
    /// Fetch the base list (identity fields + simple attributes).
    fn fetch_base(&self) -> impl Future<Output = Result<Vec<BaseCountry>>> + Send;

    /// Fetch everything else for one country: summary, flag, and the three
    /// indicator histories.
    fn fetch_supplements(
        &self,
        base: &BaseCountry,
    ) -> impl Future<Output = Result<Supplements>> + Send;
}

#[derive(Debug, Clone)]
pub struct Client {
    pub countries_base: String,
    pub wiki_base: String,
    pub world_bank_base: String,
    pub flags_base: String,
    http: HttpClient,
    /// cca2 -> wiki title, for countries whose common name is not a valid
    /// summary lookup key (disputed territories, ambiguous names).
    overrides: AHashMap<&'static str, &'static str>,
}

impl Default for Client {
    fn default() -> Self {
        let http = HttpClient::builder()
            .timeout(Duration::from_secs(30))
            .connect_timeout(Duration::from_secs(10))
            .redirect(Policy::limited(5))
            .user_agent(concat!("country_atlas/", env!("CARGO_PKG_VERSION")))
            .build()
            .expect("reqwest client build");
        let overrides = AHashMap::from_iter([
            ("GE", "Georgia_(country)"),
            ("PS", "State_of_Palestine"),
            ("MF", "Saint_Martin_(island)"),
        ]);
        Self {
            countries_base: "https://restcountries.com/v3.1".into(),
            wiki_base: "https://en.wikipedia.org/api/rest_v1".into(),
            world_bank_base: "https://api.worldbank.org/v2".into(),
            flags_base: "https://catamphetamine.gitlab.io/country-flag-icons/3x2".into(),
            http,
            overrides,
        }
    }
}

impl Client {
    /// GET with a small retry for transient failures (5xx / network errors).
    async fn get_with_retry(&self, url: &str) -> Result<reqwest::Response> {
        let mut last_err: Option<Error> = None;
        for backoff_ms in [100u64, 300, 700] {
            match self.http.get(url).send().await {
                Ok(r) if r.status().is_success() => return Ok(r),
                Ok(r) if r.status().is_server_error() => {
                    last_err = Some(Error::Http(format!("HTTP {} for {}", r.status(), url)));
                }
                Ok(r) => {
                    return Err(Error::Http(format!("HTTP {} for {}", r.status(), url)));
                }
                Err(e) => last_err = Some(e.into()),
            }
            tokio::time::sleep(Duration::from_millis(backoff_ms)).await;
        }
        Err(last_err.unwrap_or_else(|| Error::Http(format!("request to {} failed", url))))
    }

    async fn get_json(&self, url: &str) -> Result<Value> {
        let resp = self.get_with_retry(url).await?;
        let v = resp.json::<Value>().await?;
        Ok(v)
    }

    /// Fetch the base country list with a restricted field set.
    pub async fn fetch_base_countries(&self) -> Result<Vec<BaseCountry>> {
        let url = format!(
            "{}/all?fields=name,cca2,independent,unMember,continents,area",
            self.countries_base
        );
        log::debug!("GET {url}");
        let resp = self.get_with_retry(&url).await?;
        let countries: Vec<BaseCountry> = resp.json().await?;
        Ok(countries)
    }

    /// Resolve the summary lookup title for a country.
    fn wiki_title<'a>(&'a self, cca2: &str, name: &'a str) -> &'a str {
        self.overrides.get(cca2).copied().unwrap_or(name)
    }

    /// Fetch the encyclopedia summary (description + extract).
    pub async fn fetch_summary(&self, cca2: &str, name: &str) -> Result<WikiSummary> {
        let title = self.wiki_title(cca2, name);
        let url = format!("{}/page/summary/{}", self.wiki_base, enc(title));
        log::debug!("GET {url}");
        let resp = self.get_with_retry(&url).await?;
        let summary: WikiSummary = resp.json().await?;
        Ok(summary)
    }

    /// Fetch one indicator's full history for a country.
    ///
    /// The API returns `[Meta, [Entry, …]]` per page, or `[{message: …}]` on
    /// API-level errors; entries arrive most-recent-first.
    pub async fn fetch_indicator(&self, cca2: &str, indicator: &str) -> Result<Indicator> {
        let base = format!(
            "{}/country/{}/indicator/{}?format=json&per_page=1000",
            self.world_bank_base,
            enc(cca2),
            enc(indicator)
        );

        // Safety cap to avoid pathological jobs
        let max_pages = 50u32;

        let mut page = 1u32;
        let mut history: Vec<Sample> = Vec::new();
        loop {
            if page > max_pages {
                return Err(Error::Api(format!("page limit exceeded ({max_pages})")));
            }
            let url = format!("{base}&page={page}");
            log::debug!("GET {url}");
            let v = self.get_json(&url).await?;

            let arr = v
                .as_array()
                .ok_or_else(|| Error::Api("response is not a top-level array".into()))?;
            if arr.is_empty() {
                return Err(Error::Api("response is an empty array".into()));
            }
            // An error payload puts a "message" object in position 0.
            if arr[0].get("message").is_some() {
                return Err(Error::Api(format!("world bank api error: {}", arr[0])));
            }

            let meta: Meta = serde_json::from_value(arr[0].clone())?;
            let entries: Vec<Entry> = if arr.len() > 1 && !arr[1].is_null() {
                serde_json::from_value(arr[1].clone())?
            } else {
                vec![]
            };
            history.extend(entries.into_iter().map(Sample::from));

            if page >= meta.pages {
                break;
            }
            page += 1;
        }

        Ok(Indicator::from_history(history))
    }

    /// Fetch the flag as inline SVG markup.
    pub async fn fetch_flag(&self, cca2: &str) -> Result<String> {
        let url = format!("{}/{}.svg", self.flags_base, enc(cca2));
        log::debug!("GET {url}");
        let resp = self.get_with_retry(&url).await?;
        let svg = resp.text().await?;
        Ok(svg)
    }
}

impl CountrySource for Client {
    async fn fetch_base(&self) -> Result<Vec<BaseCountry>> {
        self.fetch_base_countries().await
    }

    async fn fetch_supplements(&self, base: &BaseCountry) -> Result<Supplements> {
        let cca2 = base.cca2.as_str();
        let (summary, population, gdp, gdp_pcap, flag_svg) = tokio::try_join!(
            self.fetch_summary(cca2, &base.name.common),
            self.fetch_indicator(cca2, IND_POPULATION),
            self.fetch_indicator(cca2, IND_GDP),
            self.fetch_indicator(cca2, IND_GDP_PCAP),
            self.fetch_flag(cca2),
        )?;
        Ok(Supplements {
            summary,
            flag_svg,
            population,
            gdp,
            gdp_pcap,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wiki_title_prefers_override() {
        let cli = Client::default();
        assert_eq!(cli.wiki_title("GE", "Georgia"), "Georgia_(country)");
        assert_eq!(cli.wiki_title("PS", "Palestine"), "State_of_Palestine");
        assert_eq!(cli.wiki_title("DE", "Germany"), "Germany");
    }

    #[test]
    fn path_segments_are_percent_encoded() {
        assert_eq!(enc("SP.POP.TOTL"), "SP.POP.TOTL");
        assert_eq!(enc("Georgia_(country)"), "Georgia_%28country%29");
        assert_eq!(enc("Côte d'Ivoire"), "C%C3%B4te%20d%27Ivoire");
    }
}
