//! Post projections fetched from the content source.

use serde::{Deserialize, Serialize};
use time::{
    OffsetDateTime, UtcOffset, format_description::FormatItem, macros::format_description,
};

use crate::domain::rich_text::RichTextNode;

pub const HUMAN_DATE_FORMAT: &[FormatItem<'static>] =
    format_description!("[day] [month repr:short] [year]");
pub const HUMAN_TIME_FORMAT: &[FormatItem<'static>] = format_description!("[hour]:[minute]");

/// Title, subtitle and author shown on a listing card.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostSummaryData {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub subtitle: String,
    #[serde(default)]
    pub author: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PostSummary {
    pub uid: String,
    pub first_publication_date: Option<OffsetDateTime>,
    pub data: PostSummaryData,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Banner {
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub alt: Option<String>,
}

/// One titled block of a post body.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentSection {
    #[serde(default, deserialize_with = "null_as_empty")]
    pub heading: String,
    #[serde(default)]
    pub body: Vec<RichTextNode>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostDetailData {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub author: String,
    #[serde(default)]
    pub banner: Banner,
    #[serde(default)]
    pub content: Vec<ContentSection>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PostDetail {
    /// Internal document id, distinct from the public `uid`.
    pub id: String,
    pub uid: String,
    pub first_publication_date: Option<OffsetDateTime>,
    pub last_publication_date: Option<OffsetDateTime>,
    pub data: PostDetailData,
}

impl PostDetail {
    /// Headings that occur more than once within this post, in first-seen order.
    pub fn duplicate_headings(&self) -> Vec<&str> {
        let mut seen = std::collections::HashSet::new();
        let mut duplicates = Vec::new();
        for section in &self.data.content {
            let heading = section.heading.as_str();
            if !seen.insert(heading) && !duplicates.contains(&heading) {
                duplicates.push(heading);
            }
        }
        duplicates
    }

    /// True when the document was republished after its first publication.
    pub fn was_edited(&self) -> bool {
        match (self.first_publication_date, self.last_publication_date) {
            (Some(first), Some(last)) => last > first,
            _ => false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PostLink {
    pub uid: String,
    pub title: String,
}

/// Neighbouring posts by publication date. Either side may be absent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct NavigationContext {
    /// The post published immediately before this one.
    pub previous: Option<PostLink>,
    /// The post published immediately after this one.
    pub next: Option<PostLink>,
}

pub fn format_human_date(value: OffsetDateTime) -> String {
    value
        .to_offset(UtcOffset::UTC)
        .format(HUMAN_DATE_FORMAT)
        .unwrap_or_default()
}

pub fn format_edited_label(value: OffsetDateTime) -> String {
    let utc = value.to_offset(UtcOffset::UTC);
    format!(
        "* edited on {}, at {}",
        utc.format(HUMAN_DATE_FORMAT).unwrap_or_default(),
        utc.format(HUMAN_TIME_FORMAT).unwrap_or_default()
    )
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use time::macros::datetime;

    use super::*;

    fn detail(first: Option<OffsetDateTime>, last: Option<OffsetDateTime>) -> PostDetail {
        PostDetail {
            id: "doc-1".to_string(),
            uid: "first-post".to_string(),
            first_publication_date: first,
            last_publication_date: last,
            data: PostDetailData::default(),
        }
    }

    #[test]
    fn human_date_uses_day_short_month_year() {
        let value = datetime!(2021-03-25 19:25:28 UTC);
        assert_eq!(format_human_date(value), "25 Mar 2021");
    }

    #[test]
    fn edited_label_includes_time() {
        let value = datetime!(2021-03-19 15:49:00 UTC);
        assert_eq!(format_edited_label(value), "* edited on 19 Mar 2021, at 15:49");
    }

    #[test]
    fn edited_only_when_republished_later() {
        let first = datetime!(2021-03-19 15:49:00 UTC);
        assert!(!detail(Some(first), Some(first)).was_edited());
        assert!(detail(Some(first), Some(first + time::Duration::hours(1))).was_edited());
        assert!(!detail(None, Some(first)).was_edited());
    }

    #[test]
    fn null_heading_deserializes_to_empty_string() {
        let section: ContentSection =
            serde_json::from_str(r#"{"heading":null,"body":[]}"#).expect("section parses");
        assert_eq!(section.heading, "");
    }

    #[test]
    fn duplicate_headings_are_reported_once() {
        let mut post = detail(None, None);
        post.data.content = ["Intro", "Body", "Intro", "Intro"]
            .into_iter()
            .map(|heading| ContentSection {
                heading: heading.to_string(),
                body: Vec::new(),
            })
            .collect();
        assert_eq!(post.duplicate_headings(), vec!["Intro"]);
    }
}
