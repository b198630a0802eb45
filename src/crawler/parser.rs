//! DOM extraction for old-style reddit pages
//!
//! This module handles parsing two kinds of pages:
//! - Subreddit listings (post summaries plus the next-page link)
//! - Post pages (self-text, media signals and the comment forest)
//!
//! Extraction is lenient: a listing entry that cannot be understood is
//! skipped on its own, and missing optional fields stay empty.

use crate::comments::{FlatComment, FlatCommentMap};
use crate::content::{is_video_url, ContentSignals};
use crate::records::raw::parse_count;
use crate::records::CommentData;
use crate::state::parse_timestamp;
use lazy_static::lazy_static;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use thiserror::Error;
use url::Url;

lazy_static! {
    static ref COMMENT_COUNT: Regex = Regex::new(r"(\d+)\s+comment").unwrap();
}

/// Errors raised while extracting a single listing entry
#[derive(Error, Debug)]
pub enum ExtractError {
    #[error("Listing entry has no {0}")]
    Missing(&'static str),

    #[error("Cannot resolve link '{href}': {source}")]
    BadLink {
        href: String,
        #[source]
        source: url::ParseError,
    },
}

/// One post summary from a subreddit listing
#[derive(Debug, Clone, PartialEq)]
pub struct ListingItem {
    /// Reddit fullname, e.g. `t3_abc123`
    pub fullname: String,
    /// Absolute URL of the post's comment page
    pub permalink: String,
    pub title: String,
    pub author: String,
    pub score: Option<i64>,
    pub num_comments: Option<i64>,
    pub created: Option<String>,
    pub created_utc: Option<f64>,
    pub external_url: Option<String>,
}

/// A parsed listing page
#[derive(Debug, Clone, Default)]
pub struct ListingPage {
    pub items: Vec<ListingItem>,
    /// Absolute URL of the next listing page, if any
    pub next_page: Option<String>,
}

/// What a post page contributes beyond its listing entry
#[derive(Debug, Clone, Default)]
pub struct PostPage {
    pub body_text: Option<String>,
    pub image_urls: Vec<String>,
    pub video_urls: Vec<String>,
    pub video_detected: bool,
    pub score: Option<i64>,
    pub comments: FlatCommentMap,
}

impl PostPage {
    /// Combines page media with the listing's external link
    pub fn signals(&self, external_url: Option<String>) -> ContentSignals {
        ContentSignals {
            external_url,
            detected_image_urls: self.image_urls.clone(),
            detected_video_urls: self.video_urls.clone(),
            video_detected: self.video_detected,
            extracted_text: self.body_text.clone(),
        }
    }
}

/// Parses a subreddit listing page
///
/// Promoted entries are ignored. Entries without a fullname or permalink are
/// skipped with a warning.
///
/// # Arguments
///
/// * `html` - The listing page HTML
/// * `page_url` - URL the page was fetched from, for resolving relative links
pub fn parse_listing(html: &str, page_url: &Url) -> ListingPage {
    let document = Html::parse_document(html);
    let mut page = ListingPage::default();

    if let Ok(sel) = Selector::parse("div.thing.link") {
        for thing in document.select(&sel) {
            if has_class(&thing, "promoted") {
                continue;
            }
            match parse_listing_item(thing, page_url) {
                Ok(item) => page.items.push(item),
                Err(e) => tracing::warn!("Skipping listing entry on {}: {}", page_url, e),
            }
        }
    }

    page.next_page = document_attr(&document, "span.next-button a", "href")
        .and_then(|href| page_url.join(&href).ok())
        .map(|u| u.to_string());

    tracing::debug!(
        "Parsed {} listing entries from {} (next page: {})",
        page.items.len(),
        page_url,
        page.next_page.is_some()
    );
    page
}

fn parse_listing_item(thing: ElementRef<'_>, page_url: &Url) -> Result<ListingItem, ExtractError> {
    let fullname = thing
        .value()
        .attr("data-fullname")
        .filter(|f| !f.is_empty())
        .ok_or(ExtractError::Missing("fullname"))?
        .to_string();

    let title_href = first_attr(thing, "a.title", "href");
    let comments_href = first_attr(thing, "a.comments", "href");

    // Link posts point the title off-site; the comment page is the identity
    let href = match title_href.as_deref() {
        Some(h) if h.contains("/comments/") => h.to_string(),
        _ => comments_href.ok_or(ExtractError::Missing("permalink"))?,
    };
    let permalink = page_url
        .join(&href)
        .map_err(|source| ExtractError::BadLink {
            href: href.clone(),
            source,
        })?
        .to_string();

    let created = first_attr(thing, "time", "datetime");
    let created_utc = created
        .as_deref()
        .and_then(parse_timestamp)
        .map(|dt| dt.timestamp() as f64);

    let num_comments = first_text(thing, "a.comments").and_then(|text| {
        COMMENT_COUNT
            .captures(&text)
            .and_then(|c| c.get(1))
            .and_then(|m| m.as_str().parse().ok())
    });

    let domain = first_text(thing, "span.domain a");
    let external_url = match (domain.as_deref(), title_href) {
        (Some(domain), Some(href))
            if !domain.contains("self.")
                && !href.contains("redd.it")
                && !href.starts_with("/r/") =>
        {
            Some(href)
        }
        _ => None,
    };

    Ok(ListingItem {
        fullname,
        permalink,
        title: first_text(thing, "a.title").unwrap_or_default(),
        author: first_text(thing, "a.author").unwrap_or_default(),
        score: first_attr(thing, "div.score.unvoted", "title").and_then(|s| parse_count(&s)),
        num_comments,
        created,
        created_utc,
        external_url,
    })
}

/// Parses a post's comment page
///
/// Self-text comes from the post body; images from the post's outbound
/// media links; videos from the inline player. The comment area is walked
/// top-level first, then each comment's direct replies recursively.
pub fn parse_post_page(html: &str) -> PostPage {
    let document = Html::parse_document(html);
    let root = document.root_element();

    let body_text = ["div.thing.self div.md", "div.expando div.md"]
        .iter()
        .find_map(|css| first(root, css))
        .map(|md| joined_text(md, " "))
        .filter(|t| !t.is_empty());

    let mut image_urls = Vec::new();
    let mut video_urls = Vec::new();
    if let Ok(sel) = Selector::parse("a.post-link") {
        for link in root.select(&sel) {
            let Some(href) = link.value().attr("href") else {
                continue;
            };
            if is_video_url(href) {
                push_unique(&mut video_urls, href);
            } else {
                push_unique(&mut image_urls, href);
            }
        }
    }

    let mut video_detected = false;
    if let Ok(sel) = Selector::parse("div.portrait") {
        for player in root.select(&sel) {
            video_detected = true;
            if let Some(url) = player.value().attr("data-seek-preview-url") {
                push_unique(&mut video_urls, url);
            }
        }
    }

    let score = first(root, "div.thing.self")
        .or_else(|| first(root, "div.thing.link"))
        .and_then(|thing| first_text(thing, "div.score span.number"))
        .and_then(|s| parse_count(&s));

    PostPage {
        body_text,
        image_urls,
        video_urls,
        video_detected,
        score,
        comments: parse_comment_area(&document),
    }
}

fn parse_comment_area(document: &Html) -> FlatCommentMap {
    let mut comments = FlatCommentMap::new();
    let Ok(sel) = Selector::parse("div.commentarea div.sitetable.nestedlisting > div.thing.comment")
    else {
        return comments;
    };

    for top in document.select(&sel) {
        collect_comment(top, None, &mut comments);
    }
    comments
}

fn collect_comment(
    thing: ElementRef<'_>,
    parent_id: Option<&str>,
    comments: &mut FlatCommentMap,
) -> Option<String> {
    let Some(id) = thing.value().attr("data-fullname").filter(|f| !f.is_empty()) else {
        tracing::debug!("Comment without fullname skipped");
        return None;
    };
    let id = id.to_string();

    let data = match child_with_class(thing, "entry") {
        Some(entry) => comment_data(entry, &id),
        None => CommentData {
            id: id.clone(),
            ..Default::default()
        },
    };

    if !comments.insert(FlatComment::new(data, parent_id.map(str::to_string), Vec::new())) {
        return None;
    }

    let child_ids: Vec<String> = direct_replies(thing)
        .into_iter()
        .filter_map(|reply| collect_comment(reply, Some(id.as_str()), comments))
        .collect();

    if let Some(entry) = comments.get_mut(&id) {
        entry.child_ids = child_ids;
    }
    Some(id)
}

fn comment_data(entry: ElementRef<'_>, id: &str) -> CommentData {
    let created = first_attr(entry, "time", "datetime").unwrap_or_default();
    let created_utc = parse_timestamp(&created).map(|dt| dt.timestamp() as f64);
    let score = |kind: &str| {
        first_attr(entry, &format!("span.score.{}", kind), "title").and_then(|s| parse_count(&s))
    };

    CommentData {
        id: id.to_string(),
        author: first_text(entry, "a.author").unwrap_or_default(),
        created,
        created_utc,
        body_text: first(entry, "div.md")
            .map(|md| joined_text(md, " "))
            .unwrap_or_default(),
        score_dislikes: score("dislikes"),
        score_unvoted: score("unvoted"),
        score_likes: score("likes"),
    }
}

/// Direct replies: `div.child > div.sitetable > div.thing.comment`
fn direct_replies(thing: ElementRef<'_>) -> Vec<ElementRef<'_>> {
    let Some(child) = child_with_class(thing, "child") else {
        return Vec::new();
    };
    let Some(table) = child_with_class(child, "sitetable") else {
        return Vec::new();
    };
    table
        .children()
        .filter_map(ElementRef::wrap)
        .filter(|el| has_class(el, "thing") && has_class(el, "comment"))
        .collect()
}

fn child_with_class<'a>(el: ElementRef<'a>, class: &str) -> Option<ElementRef<'a>> {
    el.children()
        .filter_map(ElementRef::wrap)
        .find(|c| c.value().name() == "div" && has_class(c, class))
}

fn has_class(el: &ElementRef<'_>, class: &str) -> bool {
    el.value().classes().any(|c| c == class)
}

fn first<'a>(el: ElementRef<'a>, css: &str) -> Option<ElementRef<'a>> {
    let sel = Selector::parse(css).ok()?;
    el.select(&sel).next()
}

fn first_text(el: ElementRef<'_>, css: &str) -> Option<String> {
    first(el, css)
        .map(|e| e.text().collect::<String>().trim().to_string())
        .filter(|s| !s.is_empty())
}

fn first_attr(el: ElementRef<'_>, css: &str, attr: &str) -> Option<String> {
    first(el, css)
        .and_then(|e| e.value().attr(attr))
        .map(str::to_string)
        .filter(|s| !s.is_empty())
}

fn document_attr(document: &Html, css: &str, attr: &str) -> Option<String> {
    first(document.root_element(), css).and_then(|e| e.value().attr(attr).map(str::to_string))
}

/// Text nodes trimmed and joined, empty nodes dropped
pub(super) fn joined_text(el: ElementRef<'_>, sep: &str) -> String {
    el.text()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .collect::<Vec<_>>()
        .join(sep)
}

pub(super) fn push_unique(list: &mut Vec<String>, url: &str) {
    if !list.iter().any(|u| u == url) {
        list.push(url.to_string());
    }
}
