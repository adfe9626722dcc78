//! Organization member list scraping.
//!
//! The member endpoint returns one page of roster markup as an HTML fragment.
//! Each `li.member-item` is one member; its name, nickname, rank and roles live
//! in nested elements that are looked up relative to that `li` only.

use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{RsiError, Result};

/// How a member's organization membership is shown publicly
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    /// Visible member
    Main,
    /// Membership is visible but the member is redacted
    Redacted,
    /// Hidden member
    Hidden,
    /// No visibility marker present
    #[default]
    Unknown,
}

/// A single organization member scraped from the roster
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemberRecord {
    /// Display name
    pub name: String,
    /// Handle shown next to the name
    pub nickname: Option<String>,
    /// False when this organization is the member's main one
    pub affiliate: bool,
    /// Public visibility of the membership
    pub visibility: Visibility,
    /// Organization rank title
    pub rank: Option<String>,
    /// Organization roles, in page order
    pub roles: Vec<String>,
}

/// Compiled selectors and patterns for one parse run
struct MemberSelectors {
    item: Selector,
    name_wrap: Selector,
    span: Selector,
    rank: Selector,
    role_list: Selector,
    list_item: Selector,
    visibility: Regex,
}

impl MemberSelectors {
    fn new() -> Result<Self> {
        Ok(Self {
            item: selector(r#"li[class*="member-item"]"#)?,
            name_wrap: selector(r#"span[class*="name-wrap"]"#)?,
            span: selector("span")?,
            rank: selector(r#"span[class*="rank"]:not([class*="ranking-stars"])"#)?,
            role_list: selector(r#"ul[class*="rolelist"]"#)?,
            list_item: selector("li")?,
            visibility: Regex::new(r"org-visibility-([VRH])")?,
        })
    }
}

fn selector(css: &str) -> Result<Selector> {
    Selector::parse(css).map_err(|e| RsiError::Selector(format!("'{}': {}", css, e)))
}

/// Parse one page of member list HTML.
///
/// An empty fragment yields no members. A member element with a missing or
/// duplicated name block, or with more than one rank or role list, fails the
/// whole fragment.
pub fn parse_member_fragment(html: &str) -> Result<Vec<MemberRecord>> {
    if html.trim().is_empty() {
        return Ok(Vec::new());
    }

    let selectors = MemberSelectors::new()?;
    let fragment = Html::parse_fragment(html);

    let members = fragment
        .select(&selectors.item)
        .map(|item| parse_member(item, &selectors))
        .collect::<Result<Vec<_>>>()?;

    debug!(count = members.len(), "Parsed member fragment");
    Ok(members)
}

fn parse_member(item: ElementRef<'_>, selectors: &MemberSelectors) -> Result<MemberRecord> {
    let class = item.value().attr("class").unwrap_or("");

    let visibility = parse_visibility(class, &selectors.visibility);
    let affiliate = !class.contains("org-main");

    // ElementRef::select only walks descendants of `item`
    let name_wraps: Vec<_> = item.select(&selectors.name_wrap).collect();
    let name_wrap = match name_wraps.as_slice() {
        [] => return Err(RsiError::bad_data("No name nodes detected for member node")),
        [single] => *single,
        _ => {
            return Err(RsiError::bad_data(
                "Multiple name nodes detected for member node",
            ))
        }
    };

    let mut name = None;
    let mut nickname = None;
    for span in name_wrap.select(&selectors.span) {
        let span_class = span.value().attr("class").unwrap_or("");
        if span_class.contains("name") {
            name = Some(element_text(span));
        }
        if span_class.contains("nick") {
            nickname = Some(element_text(span));
        }
    }
    let name = name.ok_or_else(|| RsiError::bad_data("Name node has no name for member node"))?;

    let ranks: Vec<_> = item.select(&selectors.rank).collect();
    let rank = match ranks.as_slice() {
        [] => None,
        [single] => non_empty(element_text(*single)),
        _ => {
            return Err(RsiError::bad_data(
                "Multiple rank nodes detected for member node",
            ))
        }
    };

    let role_lists: Vec<_> = item.select(&selectors.role_list).collect();
    let roles = match role_lists.as_slice() {
        [] => Vec::new(),
        [list] => list
            .select(&selectors.list_item)
            .filter(|li| li.value().attr("class").unwrap_or("").contains("role"))
            .map(element_text)
            .collect(),
        _ => {
            return Err(RsiError::bad_data(
                "Multiple role-list nodes detected for member node",
            ))
        }
    };

    Ok(MemberRecord {
        name,
        nickname: nickname.and_then(non_empty),
        affiliate,
        visibility,
        rank,
        roles,
    })
}

/// Later markers take precedence: hidden over redacted over visible.
fn parse_visibility(class: &str, pattern: &Regex) -> Visibility {
    pattern
        .captures_iter(class)
        .filter_map(|caps| caps.get(1))
        .map(|m| match m.as_str() {
            "V" => Visibility::Main,
            "R" => Visibility::Redacted,
            _ => Visibility::Hidden,
        })
        .max_by_key(|v| match v {
            Visibility::Main => 1,
            Visibility::Redacted => 2,
            Visibility::Hidden => 3,
            Visibility::Unknown => 0,
        })
        .unwrap_or_default()
}

/// Text content with surrounding whitespace (including `&nbsp;`) removed
fn element_text(element: ElementRef<'_>) -> String {
    element.text().collect::<String>().trim().to_string()
}

fn non_empty(text: String) -> Option<String> {
    if text.is_empty() {
        None
    } else {
        Some(text)
    }
}
