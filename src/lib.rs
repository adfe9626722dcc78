//! # rsiapi
//!
//! Client for the RSI web API: crowdfunding stats and organization rosters.
//!
//! ## Modules
//!
//! - [`client`] - Request transport and response envelope handling
//! - [`stats`] - Crowdfunding stats query
//! - [`orgs`] - Paginated organization member query
//! - [`members`] - Member list HTML scraping
//! - [`error`] - Custom error types
//!
//! ## Usage
//!
//! ```rust,no_run
//! use rsiapi::{ClientConfig, RsiClient};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let client = RsiClient::with_config(ClientConfig::from_env())?;
//!
//!     let stats = client.get_funding_data().await?;
//!     println!("Funds: {:?}", stats.number("funds"));
//!
//!     let roster = client.get_org_members("BECH").await?;
//!     println!("{} members reported, {} parsed", roster.total_members, roster.members.len());
//!     Ok(())
//! }
//! ```

pub mod client;
pub mod error;
pub mod members;
pub mod orgs;
pub mod stats;

pub use client::{ClientConfig, RsiClient};
pub use error::{Result, RsiError};
pub use members::{parse_member_fragment, MemberRecord, Visibility};
pub use orgs::{MemberPage, OrgMembers};
pub use stats::FundingStats;
