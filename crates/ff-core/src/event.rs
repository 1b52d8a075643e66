//! Audit-log entries as returned by the API, and their normalized form.

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::types::{FlagKey, ValidationError};

/// Site link patterns that carry the project key, tried in order.
static PROJECT_HREF_RES: LazyLock<[Regex; 3]> = LazyLock::new(|| {
    [
        Regex::new(r"/([^/]+)/~/features/").unwrap(),
        Regex::new(r"/projects/([^/]+)/").unwrap(),
        Regex::new(r"^/([^/]+)/").unwrap(),
    ]
});

/// Environment assumed when an access resource does not name one.
const DEFAULT_ENVIRONMENT: &str = "production";

/// One item of an audit-log page, as sent by the API.
///
/// Every field is optional on the wire; normalization decides what is usable.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditLogEntry {
    #[serde(rename = "_id", default)]
    pub id: String,
    pub date: Option<i64>,
    pub name: Option<String>,
    pub comment: Option<String>,
    pub title_verb: Option<String>,
    #[serde(default)]
    pub accesses: Vec<Access>,
    pub member: Option<Member>,
    #[serde(rename = "_links")]
    pub links: Option<EntryLinks>,
    pub delta: Option<Value>,
}

/// An action performed on a resource.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Access {
    #[serde(default)]
    pub action: String,
    pub resource: Option<String>,
}

/// The account member who made the change.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Member {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct EntryLinks {
    pub site: Option<Link>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Link {
    #[serde(default)]
    pub href: String,
}

/// Identity of whoever made a change. Empty strings are stored as `None`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Actor {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
}

impl Actor {
    pub fn new(
        first_name: Option<String>,
        last_name: Option<String>,
        email: Option<String>,
    ) -> Self {
        Self {
            first_name: non_blank(first_name),
            last_name: non_blank(last_name),
            email: non_blank(email),
        }
    }

    pub fn first_name_or<'a>(&'a self, placeholder: &'a str) -> &'a str {
        self.first_name.as_deref().unwrap_or(placeholder)
    }

    pub fn last_name_or<'a>(&'a self, placeholder: &'a str) -> &'a str {
        self.last_name.as_deref().unwrap_or(placeholder)
    }

    pub fn email_or<'a>(&'a self, placeholder: &'a str) -> &'a str {
        self.email.as_deref().unwrap_or(placeholder)
    }
}

/// A normalized audit-log record for a single flag.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RawAuditEvent {
    pub id: String,
    pub flag_key: FlagKey,
    pub flag_name: String,
    pub project_key: String,
    /// Action string as sent by the API; may be outside the tracked set.
    pub action: String,
    /// Epoch milliseconds.
    pub timestamp_ms: i64,
    pub actor: Actor,
    pub comment: Option<String>,
    /// Absolute link to the flag in the web UI, or empty.
    pub site_href: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title_verb: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delta: Option<Value>,
}

impl RawAuditEvent {
    /// Normalizes a wire entry.
    ///
    /// `ui_base_url` is the web UI origin used to make the site link absolute.
    pub fn from_entry(entry: AuditLogEntry, ui_base_url: &str) -> Result<Self, ValidationError> {
        let Some(timestamp_ms) = entry.date else {
            return Err(ValidationError::MissingDate { id: entry.id });
        };

        let access = entry.accesses.into_iter().next().unwrap_or_default();
        let resource = access
            .resource
            .as_deref()
            .map(ResourceSpec::parse)
            .unwrap_or_default();
        let href = entry
            .links
            .and_then(|links| links.site)
            .map(|site| site.href)
            .unwrap_or_default();

        let flag_key = resource
            .flag
            .clone()
            .or_else(|| flag_from_href(&href))
            .and_then(|key| FlagKey::new(key).ok())
            .ok_or_else(|| ValidationError::MissingFlag {
                id: entry.id.clone(),
            })?;
        let project_key = resource
            .project
            .clone()
            .or_else(|| project_from_href(&href))
            .unwrap_or_default();
        let environment = resource.environment.as_deref().unwrap_or(DEFAULT_ENVIRONMENT);
        let site_href = absolute_site_href(&href, environment, ui_base_url);

        let member = entry.member.unwrap_or_default();
        Ok(Self {
            id: entry.id,
            flag_name: non_blank(entry.name).unwrap_or_else(|| flag_key.to_string()),
            flag_key,
            project_key,
            action: access.action,
            timestamp_ms,
            actor: Actor::new(member.first_name, member.last_name, member.email),
            comment: non_blank(entry.comment),
            site_href,
            title_verb: non_blank(entry.title_verb),
            delta: entry.delta,
        })
    }
}

/// Parsed `proj/<p>:env/<e>:flag/<f>` resource specifier.
#[derive(Debug, Default, PartialEq, Eq)]
struct ResourceSpec {
    project: Option<String>,
    environment: Option<String>,
    flag: Option<String>,
}

impl ResourceSpec {
    fn parse(resource: &str) -> Self {
        let mut spec = Self::default();
        for segment in resource.split(':') {
            let Some((kind, value)) = segment.split_once('/') else {
                continue;
            };
            // Tag filters follow a semicolon: `proj/default;mobile`.
            let value = value.split(';').next().unwrap_or_default();
            if value.is_empty() || value == "*" {
                continue;
            }
            match kind {
                "proj" => spec.project = Some(value.to_string()),
                "env" => spec.environment = Some(value.to_string()),
                "flag" => spec.flag = Some(value.to_string()),
                _ => {}
            }
        }
        spec
    }
}

fn project_from_href(href: &str) -> Option<String> {
    let project = PROJECT_HREF_RES
        .iter()
        .find_map(|re| re.captures(href))
        .map(|caps| caps[1].to_string());
    if project.is_none() && !href.is_empty() {
        tracing::warn!(href, "could not extract project key from site link");
    }
    project
}

fn flag_from_href(href: &str) -> Option<String> {
    href.split(['?', '#'])
        .next()
        .and_then(|path| path.rsplit('/').find(|segment| !segment.is_empty()))
        .map(str::to_string)
}

/// Rewrites `/<project>/<env>/features/<flag>` to the flags page under
/// `<ui_base_url>/projects`.
fn absolute_site_href(href: &str, environment: &str, ui_base_url: &str) -> String {
    if href.is_empty() || href.starts_with("http://") || href.starts_with("https://") {
        return href.to_string();
    }
    let rewritten = href.replace(&format!("/{environment}/features/"), "/flags/");
    format!("{}/projects{rewritten}", ui_base_url.trim_end_matches('/'))
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}
