//! Organization roster retrieval.
//!
//! The member endpoint is paginated: every page reports the total row count
//! and carries one HTML fragment of members. [`RsiClient::get_org_members`]
//! walks all pages in order and returns the assembled roster, or the first
//! error it hits.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info};

use crate::client::RsiClient;
use crate::error::{OptionExt, RsiError, Result};
use crate::members::{parse_member_fragment, MemberRecord};

/// Organization member list endpoint
pub const ORG_MEMBERS_ENDPOINT: &str = "orgs/getOrgMembers";

/// Members requested per page
pub const DEFAULT_PAGE_SIZE: u32 = 30;

#[derive(Debug, Serialize)]
struct MemberListQuery<'a> {
    page: u32,
    pagesize: u32,
    search: &'a str,
    symbol: &'a str,
}

/// One page of the member endpoint's payload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemberPage {
    /// Total members in the organization, as reported
    pub total_rows: u64,
    /// Roster markup for this page
    pub html: String,
}

impl MemberPage {
    /// Read a page from the unwrapped `data` payload.
    pub fn from_data(data: &Value) -> Result<Self> {
        let total_rows = data
            .get("totalrows")
            .and_then(row_count)
            .ok_or_bad_data("getOrgMembers missing value 'totalrows'")?;

        let html = match data.get("html").ok_or_bad_data("getOrgMembers missing value 'html'")? {
            Value::String(html) => html.clone(),
            Value::Null => String::new(),
            other => {
                return Err(RsiError::bad_data(format!(
                    "getOrgMembers value 'html' is not a string: {}",
                    other
                )))
            }
        };

        Ok(Self { total_rows, html })
    }
}

fn row_count(value: &Value) -> Option<u64> {
    match value {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Complete roster of an organization
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrgMembers {
    /// Member count reported by the API; may differ from `members.len()`
    pub total_members: u64,
    /// Members in page order, then document order within a page
    pub members: Vec<MemberRecord>,
}

/// Number of pages needed to cover `total_rows`
pub fn page_count(total_rows: u64, page_size: u32) -> u64 {
    if page_size == 0 {
        return 0;
    }
    total_rows.div_ceil(u64::from(page_size))
}

impl RsiClient {
    /// Fetch the full member roster of the organization `symbol`.
    pub async fn get_org_members(&self, symbol: &str) -> Result<OrgMembers> {
        self.get_org_members_with_page_size(symbol, DEFAULT_PAGE_SIZE)
            .await
    }

    /// Fetch the full member roster using `page_size` members per request.
    ///
    /// # Errors
    ///
    /// Any failed page fetch or unparseable page aborts the whole roster.
    pub async fn get_org_members_with_page_size(
        &self,
        symbol: &str,
        page_size: u32,
    ) -> Result<OrgMembers> {
        if page_size == 0 {
            return Err(RsiError::config("page size must be at least 1"));
        }

        info!(symbol = symbol, page_size = page_size, "Fetching organization members");

        let first = self.fetch_member_page(symbol, 1, page_size).await?;
        let total_members = first.total_rows;
        let total_pages = page_count(total_members, page_size);

        let mut members = parse_member_fragment(&first.html)?;
        debug!(page = 1, count = members.len(), "Parsed member page");

        for page in 2..=total_pages {
            let page = u32::try_from(page)
                .map_err(|_| RsiError::bad_data(format!("page {} out of range", page)))?;
            let data = self.fetch_member_page(symbol, page, page_size).await?;
            let page_members = parse_member_fragment(&data.html)?;
            debug!(page = page, count = page_members.len(), "Parsed member page");
            members.extend(page_members);
        }

        info!(
            symbol = symbol,
            total_members = total_members,
            total_pages = total_pages,
            parsed = members.len(),
            "Organization members fetched"
        );

        Ok(OrgMembers {
            total_members,
            members,
        })
    }

    /// Fetch a single page of the member list.
    pub async fn fetch_member_page(
        &self,
        symbol: &str,
        page: u32,
        page_size: u32,
    ) -> Result<MemberPage> {
        let query = MemberListQuery {
            page,
            pagesize: page_size,
            search: "",
            symbol,
        };
        let data = self.submit_request(ORG_MEMBERS_ENDPOINT, Some(&query)).await?;
        MemberPage::from_data(&data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{init_tracing, mock_client};
    use serde_json::json;
    use wiremock::matchers::{body_json, body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn member_html(names: &[&str]) -> String {
        names
            .iter()
            .map(|name| {
                format!(
                    r#"<li class="member-item org-visibility-V"><span class="name-wrap"><span class="name">{}</span></span></li>"#,
                    name
                )
            })
            .collect()
    }

    fn page_body(total: u64, names: &[&str]) -> Value {
        json!({
            "success": 1,
            "data": {"totalrows": total, "html": member_html(names)}
        })
    }

    async fn mount_page(server: &MockServer, page: u32, body: Value) {
        Mock::given(method("POST"))
            .and(path("/api/orgs/getOrgMembers"))
            .and(body_partial_json(json!({"page": page})))
            .respond_with(ResponseTemplate::new(200).set_body_json(body))
            .expect(1)
            .mount(server)
            .await;
    }

    #[test]
    fn test_page_count() {
        assert_eq!(page_count(0, 30), 0);
        assert_eq!(page_count(1, 30), 1);
        assert_eq!(page_count(30, 30), 1);
        assert_eq!(page_count(31, 30), 2);
        assert_eq!(page_count(65, 30), 3);
    }

    #[test]
    fn test_member_page_from_data() {
        let page = MemberPage::from_data(&json!({"totalrows": "12", "html": null})).expect("page");
        assert_eq!(page.total_rows, 12);
        assert!(page.html.is_empty());

        match MemberPage::from_data(&json!({"html": ""})) {
            Err(RsiError::BadResponseData(msg)) => assert!(msg.contains("totalrows")),
            other => panic!("unexpected result: {:?}", other),
        }
        match MemberPage::from_data(&json!({"totalrows": 3})) {
            Err(RsiError::BadResponseData(msg)) => assert!(msg.contains("html")),
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_get_org_members_paginates() {
        init_tracing();
        let server = MockServer::start().await;

        let page1: Vec<String> = (1..=30).map(|i| format!("p1-{}", i)).collect();
        let page2: Vec<String> = (1..=30).map(|i| format!("p2-{}", i)).collect();
        let page1: Vec<&str> = page1.iter().map(String::as_str).collect();
        let page2: Vec<&str> = page2.iter().map(String::as_str).collect();

        mount_page(&server, 1, page_body(65, &page1)).await;
        mount_page(&server, 2, page_body(65, &page2)).await;
        mount_page(&server, 3, page_body(65, &["p3-1", "p3-2", "p3-3", "p3-4", "p3-5"])).await;

        let roster = mock_client(&server, None)
            .get_org_members("BECH")
            .await
            .expect("roster");

        assert_eq!(roster.total_members, 65);
        assert_eq!(roster.members.len(), 65);
        assert_eq!(roster.members[0].name, "p1-1");
        assert_eq!(roster.members[30].name, "p2-1");
        assert_eq!(roster.members[64].name, "p3-5");

        let requests = server.received_requests().await.unwrap_or_default();
        assert_eq!(requests.len(), 3);
    }

    #[tokio::test]
    async fn test_get_org_members_request_payload() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/api/orgs/getOrgMembers"))
            .and(body_json(json!({"page": 1, "pagesize": 30, "search": "", "symbol": "BECH"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(page_body(2, &["a", "b"])))
            .expect(1)
            .mount(&server)
            .await;

        let roster = mock_client(&server, None)
            .get_org_members("BECH")
            .await
            .expect("roster");
        assert_eq!(roster.members.len(), 2);
    }

    #[tokio::test]
    async fn test_reported_total_is_kept() {
        let server = MockServer::start().await;

        mount_page(&server, 1, page_body(3, &["only-one"])).await;

        let roster = mock_client(&server, None)
            .get_org_members("BECH")
            .await
            .expect("roster");
        assert_eq!(roster.total_members, 3);
        assert_eq!(roster.members.len(), 1);
    }

    #[tokio::test]
    async fn test_empty_organization() {
        let server = MockServer::start().await;

        mount_page(
            &server,
            1,
            json!({"success": 1, "data": {"totalrows": 0, "html": ""}}),
        )
        .await;

        let roster = mock_client(&server, None)
            .get_org_members("EMPTY")
            .await
            .expect("roster");
        assert_eq!(roster.total_members, 0);
        assert!(roster.members.is_empty());
    }

    #[tokio::test]
    async fn test_missing_totalrows() {
        let server = MockServer::start().await;

        mount_page(&server, 1, json!({"success": 1, "data": {"html": ""}})).await;

        assert!(matches!(
            mock_client(&server, None).get_org_members("BECH").await,
            Err(RsiError::BadResponseData(_))
        ));
    }

    #[tokio::test]
    async fn test_failed_page_aborts_roster() {
        let server = MockServer::start().await;

        mount_page(&server, 1, page_body(65, &["a"])).await;
        Mock::given(method("POST"))
            .and(path("/api/orgs/getOrgMembers"))
            .and(body_partial_json(json!({"page": 2})))
            .respond_with(ResponseTemplate::new(500))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/api/orgs/getOrgMembers"))
            .and(body_partial_json(json!({"page": 3})))
            .respond_with(ResponseTemplate::new(200).set_body_json(page_body(65, &["c"])))
            .expect(0)
            .mount(&server)
            .await;

        let result = mock_client(&server, None).get_org_members("BECH").await;
        match result {
            Err(RsiError::BadResponse { status, .. }) => assert_eq!(status, 500),
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_malformed_page_aborts_roster() {
        let server = MockServer::start().await;

        mount_page(&server, 1, page_body(31, &["a"])).await;
        mount_page(
            &server,
            2,
            json!({"success": 1, "data": {"totalrows": 31, "html": "<li class=\"member-item\"></li>"}}),
        )
        .await;

        assert!(matches!(
            mock_client(&server, None)
                .get_org_members_with_page_size("BECH", 30)
                .await,
            Err(RsiError::BadResponseData(_))
        ));
    }

    #[tokio::test]
    async fn test_zero_page_size() {
        let server = MockServer::start().await;
        assert!(matches!(
            mock_client(&server, None)
                .get_org_members_with_page_size("BECH", 0)
                .await,
            Err(RsiError::Config(_))
        ));
    }
}
