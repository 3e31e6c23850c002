//! Structured rich text as delivered by the content API.
//!
//! A rich-text field is an ordered list of block nodes. Each block carries its
//! plain text plus inline spans whose offsets are UTF-16 code-unit indices
//! into that text.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum NodeKind {
    #[default]
    #[serde(rename = "paragraph")]
    Paragraph,
    #[serde(rename = "heading1")]
    Heading1,
    #[serde(rename = "heading2")]
    Heading2,
    #[serde(rename = "heading3")]
    Heading3,
    #[serde(rename = "heading4")]
    Heading4,
    #[serde(rename = "heading5")]
    Heading5,
    #[serde(rename = "heading6")]
    Heading6,
    #[serde(rename = "preformatted")]
    Preformatted,
    #[serde(rename = "list-item")]
    ListItem,
    #[serde(rename = "o-list-item")]
    OrderedListItem,
    #[serde(rename = "image")]
    Image,
    #[serde(rename = "embed")]
    Embed,
    #[serde(other)]
    Unknown,
}

impl NodeKind {
    fn heading_level(self) -> Option<u8> {
        match self {
            NodeKind::Heading1 => Some(1),
            NodeKind::Heading2 => Some(2),
            NodeKind::Heading3 => Some(3),
            NodeKind::Heading4 => Some(4),
            NodeKind::Heading5 => Some(5),
            NodeKind::Heading6 => Some(6),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SpanKind {
    Strong,
    Em,
    Hyperlink,
    Label,
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpanData {
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub target: Option<String>,
    #[serde(default)]
    pub label: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Span {
    pub start: usize,
    pub end: usize,
    #[serde(rename = "type")]
    pub kind: SpanKind,
    #[serde(default)]
    pub data: Option<SpanData>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Embed {
    #[serde(default)]
    pub html: Option<String>,
    #[serde(default)]
    pub embed_url: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RichTextNode {
    #[serde(rename = "type", default)]
    pub kind: NodeKind,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub spans: Vec<Span>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub alt: Option<String>,
    #[serde(default)]
    pub oembed: Option<Embed>,
}

impl RichTextNode {
    pub fn paragraph(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Self::default()
        }
    }
}

/// Flatten rich text into plain text, joining blocks with a single space.
pub fn as_text(nodes: &[RichTextNode]) -> String {
    nodes
        .iter()
        .map(|node| node.text.as_str())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Render rich text into HTML. Text content is always escaped.
pub fn as_html(nodes: &[RichTextNode]) -> String {
    let mut html = String::new();
    let mut open_list: Option<&'static str> = None;

    for node in nodes {
        let list_tag = match node.kind {
            NodeKind::ListItem => Some("ul"),
            NodeKind::OrderedListItem => Some("ol"),
            _ => None,
        };

        if open_list != list_tag {
            if let Some(tag) = open_list.take() {
                html.push_str(&format!("</{tag}>"));
            }
            if let Some(tag) = list_tag {
                html.push_str(&format!("<{tag}>"));
                open_list = Some(tag);
            }
        }

        html.push_str(&render_block(node));
    }

    if let Some(tag) = open_list {
        html.push_str(&format!("</{tag}>"));
    }

    html
}

fn render_block(node: &RichTextNode) -> String {
    if let Some(level) = node.kind.heading_level() {
        return format!(
            "<h{level}>{}</h{level}>",
            render_inline(&node.text, &node.spans)
        );
    }

    match node.kind {
        NodeKind::ListItem | NodeKind::OrderedListItem => {
            format!("<li>{}</li>", render_inline(&node.text, &node.spans))
        }
        NodeKind::Preformatted => {
            format!("<pre>{}</pre>", render_inline(&node.text, &node.spans))
        }
        NodeKind::Image => match node.url.as_deref() {
            Some(url) => format!(
                "<p class=\"block-img\"><img src=\"{}\" alt=\"{}\" /></p>",
                ammonia::clean_text(url),
                ammonia::clean_text(node.alt.as_deref().unwrap_or(""))
            ),
            None => String::new(),
        },
        NodeKind::Embed => {
            let Some(embed) = node.oembed.as_ref() else {
                return String::new();
            };
            let body = embed.html.as_deref().map(ammonia::clean).unwrap_or_default();
            match embed.embed_url.as_deref() {
                Some(url) => format!(
                    "<div data-oembed=\"{}\">{body}</div>",
                    ammonia::clean_text(url)
                ),
                None => format!("<div data-oembed>{body}</div>"),
            }
        }
        _ => format!("<p>{}</p>", render_inline(&node.text, &node.spans)),
    }
}

const LINK_SCHEMES: [&str; 3] = ["http", "https", "mailto"];

/// Relative links and the schemes above pass; anything else becomes `#`.
fn link_href(url: Option<&str>) -> &str {
    let Some(url) = url else {
        return "#";
    };
    match url::Url::parse(url) {
        Ok(parsed) if LINK_SCHEMES.contains(&parsed.scheme()) => url,
        Err(url::ParseError::RelativeUrlWithoutBase) => url,
        _ => "#",
    }
}

fn open_tag(span: &Span) -> String {
    let data = span.data.as_ref();
    match span.kind {
        SpanKind::Strong => "<strong>".to_string(),
        SpanKind::Em => "<em>".to_string(),
        SpanKind::Hyperlink => {
            let url = link_href(data.and_then(|data| data.url.as_deref()));
            match data.and_then(|data| data.target.as_deref()) {
                Some(target) => format!(
                    "<a href=\"{}\" target=\"{}\" rel=\"noopener noreferrer\">",
                    ammonia::clean_text(url),
                    ammonia::clean_text(target)
                ),
                None => format!("<a href=\"{}\">", ammonia::clean_text(url)),
            }
        }
        SpanKind::Label => {
            let label = data.and_then(|data| data.label.as_deref()).unwrap_or("");
            format!("<span class=\"{}\">", ammonia::clean_text(label))
        }
        SpanKind::Unknown => "<span>".to_string(),
    }
}

fn close_tag(span: &Span) -> &'static str {
    match span.kind {
        SpanKind::Strong => "</strong>",
        SpanKind::Em => "</em>",
        SpanKind::Hyperlink => "</a>",
        SpanKind::Label | SpanKind::Unknown => "</span>",
    }
}

fn render_inline(text: &str, spans: &[Span]) -> String {
    let mut out = String::new();
    let mut segment = String::new();
    let mut open: Vec<&Span> = Vec::new();
    let mut position = 0usize;

    for ch in text.chars() {
        apply_boundaries(position, spans, &mut open, &mut segment, &mut out);
        segment.push(ch);
        position += ch.len_utf16();
    }

    flush_segment(&mut segment, &mut out);
    while let Some(span) = open.pop() {
        out.push_str(close_tag(span));
    }

    out
}

fn apply_boundaries<'a>(
    position: usize,
    spans: &'a [Span],
    open: &mut Vec<&'a Span>,
    segment: &mut String,
    out: &mut String,
) {
    let closes = open.iter().any(|span| span.end <= position);
    let mut starting: Vec<&Span> = spans
        .iter()
        .filter(|span| span.start == position && span.end > span.start)
        .collect();

    if !closes && starting.is_empty() {
        return;
    }

    flush_segment(segment, out);

    if let Some(lowest) = open.iter().position(|span| span.end <= position) {
        let popped: Vec<&Span> = open.drain(lowest..).collect();
        for span in popped.iter().rev() {
            out.push_str(close_tag(span));
        }
        for span in popped {
            if span.end > position {
                out.push_str(&open_tag(span));
                open.push(span);
            }
        }
    }

    starting.sort_by(|left, right| right.end.cmp(&left.end));
    for span in starting {
        out.push_str(&open_tag(span));
        open.push(span);
    }
}

fn flush_segment(segment: &mut String, out: &mut String) {
    if segment.is_empty() {
        return;
    }
    let escaped = segment
        .split('\n')
        .map(ammonia::clean_text)
        .collect::<Vec<_>>()
        .join("<br />");
    out.push_str(&escaped);
    segment.clear();
}
