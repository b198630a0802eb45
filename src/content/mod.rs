//! Content classification for harvested posts
//!
//! Every post gets exactly one `ContentType` together with the payload that
//! goes with it. Link posts additionally get a best-effort text extraction of
//! the linked page through a `LinkTextExtractor`.

mod classifier;
mod extractor;

pub use classifier::{
    is_image_url, is_video_url, Classification, ContentClassifier, ContentSignals, ContentType,
    VIDEO_SENTINEL,
};
pub use extractor::{extract_visible_text, HttpTextExtractor, LinkTextExtractor};
