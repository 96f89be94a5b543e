//! Streaming RSS item extraction and description HTML cleanup.

use std::sync::LazyLock;

use chrono::{DateTime, Utc};
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use scraper::{Html, Selector};

use crate::types::RawItem;

static IMG: LazyLock<Selector> = LazyLock::new(|| Selector::parse("img").expect("valid selector"));

/// Fields of the `<item>` currently being read.
#[derive(Default)]
struct ItemFields {
    title: String,
    link: String,
    description: String,
    content: String,
    author: String,
    pub_date: String,
    image: Option<String>,
    thumbnail: Option<String>,
}

impl ItemFields {
    fn field_mut(&mut self, tag: &str) -> Option<&mut String> {
        match tag {
            "title" => Some(&mut self.title),
            "link" => Some(&mut self.link),
            "description" | "summary" => Some(&mut self.description),
            "content:encoded" => Some(&mut self.content),
            "author" | "dc:creator" => Some(&mut self.author),
            "pubDate" | "dc:date" | "published" => Some(&mut self.pub_date),
            _ => None,
        }
    }

    fn into_raw_item(self) -> RawItem {
        let page_image = first_image(&self.description).or_else(|| first_image(&self.content));
        RawItem {
            title: non_empty(strip_html(&self.title)),
            description: non_empty(strip_html(&self.description)),
            content: non_empty(strip_html(&self.content)),
            url: non_empty(self.link.trim().to_string()),
            image: self.image,
            thumbnail: self.thumbnail,
            page_image,
            author: non_empty(self.author.trim().to_string()),
            published_at: parse_pub_date(&self.pub_date),
            source_label: None,
        }
    }
}

/// Parse the `<item>` elements of an RSS 2.0 feed into [`RawItem`]s.
///
/// Reads at most `limit` items. If the XML turns malformed part-way the items
/// completed before the fault are returned together with the error.
pub(crate) fn parse_feed(xml: &str, limit: usize) -> (Vec<RawItem>, Option<quick_xml::Error>) {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut items = Vec::new();
    let mut current: Option<ItemFields> = None;
    let mut current_tag = String::new();

    loop {
        if items.len() >= limit {
            break;
        }
        match reader.read_event() {
            Ok(Event::Start(e)) => {
                let name = tag_name(&e);
                if name == "item" {
                    current = Some(ItemFields::default());
                } else if let Some(fields) = current.as_mut() {
                    collect_media(fields, &name, &e);
                }
                current_tag = name;
            }
            Ok(Event::Empty(e)) => {
                if let Some(fields) = current.as_mut() {
                    collect_media(fields, &tag_name(&e), &e);
                }
            }
            Ok(Event::End(e)) => {
                if e.name().as_ref() == b"item" {
                    if let Some(fields) = current.take() {
                        items.push(fields.into_raw_item());
                    }
                }
                current_tag.clear();
            }
            Ok(Event::Text(e)) => {
                if let Some(field) = current.as_mut().and_then(|f| f.field_mut(&current_tag)) {
                    let text = e.unescape().unwrap_or_default();
                    append(field, &text);
                }
            }
            Ok(Event::CData(e)) => {
                if let Some(field) = current.as_mut().and_then(|f| f.field_mut(&current_tag)) {
                    append(field, &String::from_utf8_lossy(e.as_ref()));
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => return (items, Some(e)),
            _ => {}
        }
    }

    (items, None)
}

fn tag_name(e: &BytesStart<'_>) -> String {
    String::from_utf8_lossy(e.name().as_ref()).into_owned()
}

fn attr(e: &BytesStart<'_>, key: &[u8]) -> Option<String> {
    e.attributes()
        .flatten()
        .find(|a| a.key.as_ref() == key)
        .map(|a| String::from_utf8_lossy(&a.value).into_owned())
}

fn collect_media(fields: &mut ItemFields, name: &str, e: &BytesStart<'_>) {
    match name {
        "media:thumbnail" => {
            if fields.thumbnail.is_none() {
                fields.thumbnail = attr(e, b"url");
            }
        }
        "media:content" | "enclosure" => {
            let is_image = attr(e, b"type").is_none_or(|t| t.starts_with("image/"))
                || attr(e, b"medium").is_some_and(|m| m == "image");
            if is_image && fields.image.is_none() {
                fields.image = attr(e, b"url");
            }
        }
        _ => {}
    }
}

fn append(field: &mut String, text: &str) {
    if !field.is_empty() {
        field.push(' ');
    }
    field.push_str(text);
}

fn non_empty(s: String) -> Option<String> {
    if s.is_empty() {
        None
    } else {
        Some(s)
    }
}

fn parse_pub_date(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    DateTime::parse_from_rfc2822(raw)
        .or_else(|_| DateTime::parse_from_rfc3339(raw))
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

/// Extract visible text from an HTML fragment and normalize whitespace.
pub(crate) fn strip_html(html: &str) -> String {
    if !html.contains('<') {
        return html.split_whitespace().collect::<Vec<_>>().join(" ");
    }
    let fragment = Html::parse_fragment(html);
    let text: Vec<&str> = fragment.root_element().text().collect();
    text.join(" ").split_whitespace().collect::<Vec<_>>().join(" ")
}

/// `src` of the first `<img>` in an HTML fragment.
pub(crate) fn first_image(html: &str) -> Option<String> {
    if !html.contains("<img") {
        return None;
    }
    let fragment = Html::parse_fragment(html);
    fragment
        .select(&IMG)
        .find_map(|el| el.value().attr("src"))
        .map(ToString::to_string)
}
