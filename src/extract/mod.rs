//! Listing extraction from rendered result pages
//!
//! Extraction never fails as a whole. A page without cards is reported as a
//! structural miss, a card without a usable link is skipped, and a field whose
//! fallback chain is exhausted becomes `None`.

mod clean;
mod features;
mod strategy;

pub use clean::clean_text;
pub use features::{parse_area, parse_count};
pub use strategy::{CompiledProfile, NextControl};

use crate::crawler::RenderedPage;
use crate::model::{CrawlRequest, ListingRecord};
use crate::portal::{FeaturePattern, Field};
use crate::url::resolve_detail_url;
use chrono::Utc;
use scraper::{ElementRef, Html};

/// Why a card produced no record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// No strategy yielded a resolvable detail link
    MissingDetailUrl,
}

/// A card that was not turned into a record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedContainer {
    pub index: usize,
    pub reason: SkipReason,
}

/// Fields that resolved to `None` on one card
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldMiss {
    pub index: usize,
    pub fields: Vec<&'static str>,
}

/// Result of extracting one page
#[derive(Debug, Clone)]
pub struct PageExtraction {
    pub records: Vec<ListingRecord>,

    /// Number of cards the container selectors matched
    pub container_count: usize,

    pub skipped: Vec<SkippedContainer>,

    pub field_misses: Vec<FieldMiss>,

    pub next_control: NextControl,
}

impl PageExtraction {
    /// True when no container selector matched anything
    pub fn is_structural_miss(&self) -> bool {
        self.container_count == 0
    }
}

/// Extracts every listing on a rendered page
///
/// # Arguments
///
/// * `page` - The rendered page snapshot
/// * `profile` - Compiled capability profile of the request's portal
/// * `request` - The request the page was rendered for (page number, origin)
///
/// # Returns
///
/// The records in card order plus diagnostics. Records already extracted are
/// kept when a later card is skipped.
pub fn extract_page(
    page: &RenderedPage,
    profile: &CompiledProfile,
    request: &CrawlRequest,
) -> PageExtraction {
    let document = Html::parse_document(&page.html);
    let cards = profile.select_cards(&document);

    let mut records = Vec::with_capacity(cards.len());
    let mut skipped = Vec::new();
    let mut field_misses = Vec::new();

    for (index, card) in cards.iter().enumerate() {
        match extract_card(*card, profile, request) {
            Ok((record, missing)) => {
                if !missing.is_empty() {
                    field_misses.push(FieldMiss {
                        index,
                        fields: missing,
                    });
                }
                records.push(record);
            }
            Err(reason) => skipped.push(SkippedContainer { index, reason }),
        }
    }

    PageExtraction {
        records,
        container_count: cards.len(),
        skipped,
        field_misses,
        next_control: profile.next_control(&document),
    }
}

/// Extracts one card into a record plus the names of its missing fields
fn extract_card(
    card: ElementRef<'_>,
    profile: &CompiledProfile,
    request: &CrawlRequest,
) -> Result<(ListingRecord, Vec<&'static str>), SkipReason> {
    let base_origin = profile.profile.base_origin;
    let features = profile.feature_text(card);
    let text = |s: &str| Some(s.to_string());

    let title = profile.resolve(Field::Title, card, &features, text);
    let price = profile.resolve(Field::Price, card, &features, text);
    let address = profile.resolve(Field::Address, card, &features, text);
    let area = profile.resolve(Field::Area, card, &features, parse_area);
    let rooms = profile.resolve(Field::Rooms, card, &features, |s| {
        parse_count(FeaturePattern::Rooms, s)
    });
    let baths = profile.resolve(Field::Baths, card, &features, |s| {
        parse_count(FeaturePattern::Baths, s)
    });
    let parking = profile.resolve(Field::Parking, card, &features, |s| {
        parse_count(FeaturePattern::Parking, s)
    });
    let url = profile.resolve(Field::DetailUrl, card, &features, |href| {
        resolve_detail_url(href, base_origin)
    });

    let mut missing = Vec::new();
    for (field, present) in [
        (Field::Title, title.is_some()),
        (Field::Price, price.is_some()),
        (Field::Address, address.is_some()),
        (Field::Area, area.is_some()),
        (Field::Rooms, rooms.is_some()),
        (Field::Baths, baths.is_some()),
        (Field::Parking, parking.is_some()),
    ] {
        if !present {
            missing.push(field.name());
        }
    }

    let url = url.ok_or(SkipReason::MissingDetailUrl)?;

    let record = ListingRecord {
        portal: profile.profile.portal,
        title,
        price,
        address,
        area,
        rooms,
        baths,
        parking,
        url,
        neighborhood: request.origin.neighborhood_name().map(str::to_string),
        page: request.page,
        extracted_at: Utc::now(),
    };

    Ok((record, missing))
}
