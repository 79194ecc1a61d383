//! Data model shared by the crawl core
//!
//! # Components
//!
//! - `SearchOrigin`: one seeded search (portal + neighborhood + filters)
//! - `CrawlRequest`: a queued unit of work for one result page
//! - `ListingRecord` / `FailureRecord`: the persisted output schema
//! - `FailureKind`: the failure taxonomy used by the classifier

mod failure_kind;
mod origin;
mod records;
mod request;

pub use failure_kind::FailureKind;
pub use origin::{
    CountSet, OriginSource, Portal, SearchArea, SearchFilters, SearchOrigin, TransactionType,
};
pub use records::{FailureRecord, ListingRecord};
pub use request::CrawlRequest;
