use super::extractor::LinkTextExtractor;
use lazy_static::lazy_static;
use regex::Regex;

/// Placeholder content when a video player was seen but no URL resolved
pub const VIDEO_SENTINEL: &str = "[VIDEO CONTENT]";

lazy_static! {
    static ref VIDEO_URL: Regex = Regex::new(
        r"(?i)(\.(mp4|webm|mov|m3u8)(\?|$)|/HLSPlaylist\.m3u8|v\.redd\.it|youtube\.com/watch|youtu\.be/|vimeo\.com/)"
    )
    .unwrap();
    static ref IMAGE_URL: Regex = Regex::new(r"(?i)\.(jpg|jpeg|png|gif)(\?.*)?$").unwrap();
}

/// Category assigned to a post
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContentType {
    Text,
    Image,
    ImageGallery,
    Video,
    Link,
    Mixed,
    Unknown,
}

impl ContentType {
    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Image => "image",
            Self::ImageGallery => "image_gallery",
            Self::Video => "video",
            Self::Link => "link",
            Self::Mixed => "mixed",
            Self::Unknown => "unknown",
        }
    }

    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "text" => Some(Self::Text),
            "image" => Some(Self::Image),
            "image_gallery" => Some(Self::ImageGallery),
            "video" => Some(Self::Video),
            "link" => Some(Self::Link),
            "mixed" => Some(Self::Mixed),
            "unknown" => Some(Self::Unknown),
            _ => None,
        }
    }
}

/// Everything the extraction layer observed about a post
#[derive(Debug, Clone, Default)]
pub struct ContentSignals {
    /// Off-site link the post points at
    pub external_url: Option<String>,
    /// Image URLs found in the post, in page order
    pub detected_image_urls: Vec<String>,
    /// Video URLs found in the post, in page order
    pub detected_video_urls: Vec<String>,
    /// A video player was present even if no URL could be resolved
    pub video_detected: bool,
    /// Self-text of the post
    pub extracted_text: Option<String>,
}

impl ContentSignals {
    fn text(&self) -> Option<&str> {
        self.extracted_text
            .as_deref()
            .filter(|t| !t.trim().is_empty())
    }

    fn has_video(&self) -> bool {
        !self.detected_video_urls.is_empty() || self.video_detected
    }
}

/// Result of classifying one post
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification {
    pub content_type: ContentType,
    pub content: Option<String>,
    pub body_text: Option<String>,
}

impl Classification {
    fn new(content_type: ContentType, content: Option<String>, body_text: Option<String>) -> Self {
        Self {
            content_type,
            content,
            body_text,
        }
    }
}

/// Returns true if the URL points at a video file or a video host
pub fn is_video_url(url: &str) -> bool {
    VIDEO_URL.is_match(url)
}

/// Returns true if the URL path ends with an image extension
pub fn is_image_url(url: &str) -> bool {
    IMAGE_URL.is_match(url)
}

/// Assigns a single content category and payload to a post
///
/// Rules apply in a fixed order and the first match wins:
///
/// 1. external URL that looks like video
/// 2. external URL that looks like an image
/// 3. any other external URL (linked page text becomes the body)
/// 4. detected video
/// 5. detected images (one is `image`, several are `image_gallery`)
/// 6. media from 4 or 5 together with self-text becomes `mixed`
/// 7. self-text only
/// 8. nothing usable
pub struct ContentClassifier<E: LinkTextExtractor> {
    extractor: E,
}

impl<E: LinkTextExtractor> ContentClassifier<E> {
    pub fn new(extractor: E) -> Self {
        Self { extractor }
    }

    /// Classifies a post from its signals
    ///
    /// Only the link rule touches the network, with exactly one extraction
    /// call. The extractor never fails; an unreachable page yields an empty
    /// body.
    pub async fn classify(&self, signals: &ContentSignals) -> Classification {
        if let Some(url) = signals.external_url.as_deref() {
            if is_video_url(url) {
                return Classification::new(ContentType::Video, Some(url.to_string()), None);
            }
            if is_image_url(url) {
                return Classification::new(ContentType::Image, Some(url.to_string()), None);
            }
            let body = self.extractor.extract_text(url).await;
            return Classification::new(ContentType::Link, Some(url.to_string()), Some(body));
        }

        let media = classify_media(signals);
        match (media, signals.text()) {
            (Some((_, content)), Some(text)) => Classification::new(
                ContentType::Mixed,
                Some(joined_media(signals).unwrap_or(content)),
                Some(text.to_string()),
            ),
            (Some((content_type, content)), None) => {
                Classification::new(content_type, Some(content), None)
            }
            (None, Some(text)) => {
                Classification::new(ContentType::Text, None, Some(text.to_string()))
            }
            (None, None) => Classification::new(ContentType::Unknown, None, Some(String::new())),
        }
    }
}

/// Media-only classification (rules 4 and 5)
fn classify_media(signals: &ContentSignals) -> Option<(ContentType, String)> {
    if signals.has_video() {
        let content = signals
            .detected_video_urls
            .first()
            .cloned()
            .unwrap_or_else(|| VIDEO_SENTINEL.to_string());
        return Some((ContentType::Video, content));
    }

    match signals.detected_image_urls.len() {
        0 => None,
        1 => Some((ContentType::Image, signals.detected_image_urls[0].clone())),
        _ => Some((
            ContentType::ImageGallery,
            signals.detected_image_urls.join("|"),
        )),
    }
}

/// All resolved media URLs, images first then videos
fn joined_media(signals: &ContentSignals) -> Option<String> {
    let all: Vec<&str> = signals
        .detected_image_urls
        .iter()
        .chain(signals.detected_video_urls.iter())
        .map(String::as_str)
        .collect();

    if all.is_empty() {
        None
    } else {
        Some(all.join("|"))
    }
}
