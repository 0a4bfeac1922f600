//! # Game API Client
//!
//! Rate-limited wrapper around the game's public API.
//!
//! Every request goes through a single throttle that enforces a minimum
//! interval between calls (the API's rate ceiling), so concurrent callers
//! are serialized on the wire while their results keep caller-side order.
//!
//! Response payloads are XML; parsing is split into pure functions so it
//! can be tested without the network.

use std::path::Path;
use std::time::Duration;

use serde::Deserialize;
use tokio::sync::Mutex;
use tokio::time::Instant;

use tidemark_core::{LiveOfficer, LiveRegion, NationProfile, TidemarkError, canonical_name};

const API_BASE: &str = "https://www.nationstates.net/cgi-bin/api.cgi";
const DUMP_URL: &str = "https://www.nationstates.net/pages/regions.xml.gz";

/// The API's minimum allowed interval between requests, in milliseconds.
const MIN_POLL_MS: u64 = 750;

/// The census scale id carrying the influence score.
const INFLUENCE_SCALE: u32 = 65;

/// Rate-limited client for the game's public API.
pub struct NsClient {
    http: reqwest::Client,
    min_interval: Duration,
    last_request: Mutex<Option<Instant>>,
}

impl NsClient {
    /// Build a client identified by the operator's nation.
    ///
    /// The User-Agent carries tool version and operator so the remote
    /// service can attribute traffic. `poll_speed_ms` below the API's
    /// floor is raised to it.
    pub fn new(operator_nation: &str, poll_speed_ms: u64) -> Result<Self, TidemarkError> {
        let user_agent = format!(
            "tidemark/{} (in use by {})",
            env!("CARGO_PKG_VERSION"),
            canonical_name(operator_nation),
        );
        let http = reqwest::Client::builder()
            .user_agent(user_agent)
            .build()
            .map_err(|e| TidemarkError::Api(e.to_string()))?;
        Ok(Self {
            http,
            min_interval: Duration::from_millis(poll_speed_ms.max(MIN_POLL_MS)),
            last_request: Mutex::new(None),
        })
    }

    /// Wait until the minimum inter-request interval has passed.
    ///
    /// The lock is held across the sleep so concurrent callers queue up
    /// one interval apart instead of stampeding.
    async fn throttle(&self) {
        let mut last = self.last_request.lock().await;
        if let Some(previous) = *last {
            let elapsed = previous.elapsed();
            if elapsed < self.min_interval {
                tokio::time::sleep(self.min_interval - elapsed).await;
            }
        }
        *last = Some(Instant::now());
    }

    /// Throttled GET returning the response body.
    async fn get_text(&self, url: &str) -> Result<String, TidemarkError> {
        self.throttle().await;
        let response = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|e| TidemarkError::Api(format!("{url}: {e}")))?;
        let status = response.status();
        if !status.is_success() {
            return Err(TidemarkError::Api(format!("{url}: HTTP {status}")));
        }
        response
            .text()
            .await
            .map_err(|e| TidemarkError::Api(format!("{url}: {e}")))
    }

    /// Confirm the operator's nation exists before doing any work.
    pub async fn verify_nation(&self, name: &str) -> Result<(), TidemarkError> {
        let url = format!("{API_BASE}?nation={}", canonical_name(name));
        self.get_text(&url).await.map_err(|_| {
            TidemarkError::Api(format!(
                "failed to verify operator nation '{name}': ensure it exists"
            ))
        })?;
        Ok(())
    }

    /// Names of all regions carrying the given world tag.
    pub async fn regions_by_tag(&self, tag: &str) -> Result<Vec<String>, TidemarkError> {
        let url = format!("{API_BASE}?q=regionsbytag;tags={tag}");
        let body = self.get_text(&url).await?;
        parse_tagged_regions(&body)
    }

    /// Live state of a region, including officers and password status.
    pub async fn region(&self, name: &str) -> Result<LiveRegion, TidemarkError> {
        let url = format!(
            "{API_BASE}?region={}&q=name+numnations+delegate+delegateauth+officers+tags",
            canonical_name(name),
        );
        let body = self.get_text(&url).await?;
        parse_live_region(&body)
    }

    /// Public profile of a nation: WA status, endorsements, influence.
    pub async fn nation_profile(&self, name: &str) -> Result<NationProfile, TidemarkError> {
        let url = format!(
            "{API_BASE}?nation={}&q=wa+endorsements+influence+census;scale={INFLUENCE_SCALE};mode=score",
            canonical_name(name),
        );
        let body = self.get_text(&url).await?;
        parse_nation_profile(&body)
    }

    /// Download the daily snapshot dump to the given path.
    pub async fn download_dump(&self, dest: &Path) -> Result<(), TidemarkError> {
        self.throttle().await;
        let response = self
            .http
            .get(DUMP_URL)
            .send()
            .await
            .map_err(|e| TidemarkError::Api(format!("{DUMP_URL}: {e}")))?;
        let status = response.status();
        if !status.is_success() {
            return Err(TidemarkError::Api(format!("{DUMP_URL}: HTTP {status}")));
        }
        let bytes = response
            .bytes()
            .await
            .map_err(|e| TidemarkError::Api(format!("{DUMP_URL}: {e}")))?;
        std::fs::write(dest, &bytes).map_err(|e| TidemarkError::Io(e.to_string()))?;
        Ok(())
    }
}

// =============================================================================
// XML PAYLOADS
// =============================================================================

#[derive(Debug, Deserialize)]
struct WorldPayload {
    #[serde(rename = "REGIONS", default)]
    regions: String,
}

#[derive(Debug, Deserialize)]
struct RegionPayload {
    #[serde(rename = "NAME", default)]
    name: String,
    #[serde(rename = "NUMNATIONS", default)]
    num_nations: u32,
    #[serde(rename = "DELEGATE", default)]
    delegate: String,
    #[serde(rename = "DELEGATEAUTH", default)]
    delegate_auth: String,
    #[serde(rename = "OFFICERS", default)]
    officers: OfficersPayload,
    #[serde(rename = "TAGS", default)]
    tags: TagsPayload,
}

#[derive(Debug, Default, Deserialize)]
struct OfficersPayload {
    #[serde(rename = "OFFICER", default)]
    officers: Vec<OfficerPayload>,
}

#[derive(Debug, Deserialize)]
struct OfficerPayload {
    #[serde(rename = "NATION", default)]
    nation: String,
    #[serde(rename = "OFFICE", default)]
    office: String,
    #[serde(rename = "AUTHORITY", default)]
    authority: String,
}

#[derive(Debug, Default, Deserialize)]
struct TagsPayload {
    #[serde(rename = "TAG", default)]
    tags: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct NationPayload {
    #[serde(rename = "UNSTATUS", default)]
    wa_status: String,
    #[serde(rename = "ENDORSEMENTS", default)]
    endorsements: String,
    #[serde(rename = "INFLUENCE", default)]
    influence_tier: String,
    #[serde(rename = "CENSUS", default)]
    census: CensusPayload,
}

#[derive(Debug, Default, Deserialize)]
struct CensusPayload {
    #[serde(rename = "SCALE", default)]
    scales: Vec<ScalePayload>,
}

#[derive(Debug, Default, Deserialize)]
struct ScalePayload {
    #[serde(rename = "SCORE", default)]
    score: f64,
}

// =============================================================================
// PARSING
// =============================================================================

fn parse_tagged_regions(xml: &str) -> Result<Vec<String>, TidemarkError> {
    let payload: WorldPayload = quick_xml::de::from_str(xml)
        .map_err(|e| TidemarkError::Api(format!("unexpected world payload: {e}")))?;
    Ok(payload
        .regions
        .split(',')
        .filter(|s| !s.is_empty())
        .map(|s| s.to_string())
        .collect())
}

fn parse_live_region(xml: &str) -> Result<LiveRegion, TidemarkError> {
    let payload: RegionPayload = quick_xml::de::from_str(xml)
        .map_err(|e| TidemarkError::Api(format!("unexpected region payload: {e}")))?;
    Ok(LiveRegion {
        name: payload.name,
        num_nations: payload.num_nations,
        delegate: payload.delegate,
        delegate_auth: payload.delegate_auth,
        has_password: payload.tags.tags.iter().any(|t| t == "Password"),
        officers: payload
            .officers
            .officers
            .into_iter()
            .map(|o| LiveOfficer {
                nation: o.nation,
                office: o.office,
                authority: o.authority,
            })
            .collect(),
    })
}

fn parse_nation_profile(xml: &str) -> Result<NationProfile, TidemarkError> {
    let payload: NationPayload = quick_xml::de::from_str(xml)
        .map_err(|e| TidemarkError::Api(format!("unexpected nation payload: {e}")))?;
    Ok(NationProfile {
        wa_member: payload.wa_status.starts_with("WA"),
        endorsements: payload
            .endorsements
            .split(',')
            .filter(|s| !s.is_empty())
            .count() as u32,
        influence: payload.census.scales.first().map_or(0.0, |s| s.score),
        influence_tier: payload.influence_tier,
    })
}

// =============================================================================
// TESTS
// =============================================================================
