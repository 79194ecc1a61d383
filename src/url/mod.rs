//! URL handling for search pages and listing links
//!
//! - [`slugify`] turns neighborhood and city names into path slugs
//! - [`build_search_url`] renders a search origin into its portal's URL shape
//! - [`normalize_url`] produces the identity key used for queue dedup
//! - [`resolve_detail_url`] makes listing links absolute
//! - [`with_page`] derives a continuation URL from the pagination parameter

mod builder;
mod normalize;
mod resolve;
mod slug;

pub use builder::{build_search_url, path_heavy_url, query_heavy_url, with_page};
pub use normalize::normalize_url;
pub use resolve::resolve_detail_url;
pub use slug::slugify;
