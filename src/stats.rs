//! Crowdfunding statistics.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::info;

use crate::client::RsiClient;
use crate::error::{RsiError, Result};

/// Crowdfunding stats endpoint
pub const CROWDFUND_STATS_ENDPOINT: &str = "stats/getCrowdfundStats";

/// Which stats to request
#[derive(Debug, Clone, Copy, Serialize)]
struct FundingQuery {
    fans: bool,
    fleet: bool,
    funds: bool,
}

impl Default for FundingQuery {
    fn default() -> Self {
        Self {
            fans: true,
            fleet: true,
            funds: true,
        }
    }
}

/// Crowdfunding stats as returned by the API.
///
/// The shape is owned by the remote side, so values are kept as raw JSON.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FundingStats(Map<String, Value>);

impl FundingStats {
    /// Raw value of a stat
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// Numeric value of a stat; numeric strings are accepted
    pub fn number(&self, key: &str) -> Option<f64> {
        match self.0.get(key)? {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    /// Consume the wrapper and return the raw map
    pub fn into_inner(self) -> Map<String, Value> {
        self.0
    }
}

impl RsiClient {
    /// Fetch the aggregate crowdfunding stats (fans, fleet, funds).
    pub async fn get_funding_data(&self) -> Result<FundingStats> {
        let data = self
            .submit_request(CROWDFUND_STATS_ENDPOINT, Some(&FundingQuery::default()))
            .await?;

        match data {
            Value::Object(map) => {
                info!(stats = map.len(), "Fetched crowdfunding stats");
                Ok(FundingStats(map))
            }
            other => Err(RsiError::bad_data(format!(
                "{} returned non-object data: {}",
                CROWDFUND_STATS_ENDPOINT, other
            ))),
        }
    }
}
