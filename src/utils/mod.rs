pub mod constants;
pub mod string_utils;
pub mod timestamp_utils;
pub mod url_utils;

pub use constants::*;
pub use url_utils::{dedup_urls, is_valid_url, normalize_url};
