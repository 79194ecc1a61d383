//! Interpreter for the declarative fallback chains in the capability table

use crate::extract::clean::clean_text;
use crate::extract::features;
use crate::portal::{FeaturePattern, Field, Locator, PaginationAffordance, PortalProfile};
use scraper::{ElementRef, Html, Selector};

/// A locator with its selector parsed
#[derive(Debug)]
enum CompiledLocator {
    Text(Selector),
    Attr(Selector, &'static str),
    TextContaining(Selector, &'static str),
    OwnAttr(&'static str),
    Pattern(FeaturePattern),
}

/// State of a portal's "next page" control on a rendered page
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NextControl {
    /// No control found (or the portal paginates by URL parameter only)
    Absent,

    /// The control exists but is disabled: this is the last page
    Disabled,

    /// The control is clickable; `href` is set when it is a real link
    Enabled { href: Option<String> },
}

/// A portal profile with every selector parsed once per crawl
///
/// Selectors that fail to parse are logged and dropped from their chain, so
/// a typo in one strategy degrades that strategy only.
#[derive(Debug)]
pub struct CompiledProfile {
    pub profile: &'static PortalProfile,
    containers: Vec<Selector>,
    features: Vec<Selector>,
    next_controls: Vec<Selector>,
    chains: Vec<(Field, Vec<CompiledLocator>)>,
}

impl CompiledProfile {
    /// Parses every selector in the profile
    pub fn compile(profile: &'static PortalProfile) -> Self {
        let containers = compile_all(profile.container_selectors);
        let features = compile_all(profile.feature_selectors);
        let next_controls = match profile.pagination {
            PaginationAffordance::NextControl { selectors } => compile_all(selectors),
            PaginationAffordance::UrlParameter => Vec::new(),
        };

        let chains = Field::all()
            .into_iter()
            .map(|field| {
                let locators = profile
                    .chain(field)
                    .iter()
                    .filter_map(compile_locator)
                    .collect();
                (field, locators)
            })
            .collect();

        Self {
            profile,
            containers,
            features,
            next_controls,
            chains,
        }
    }

    /// Selects the listing cards on a page
    ///
    /// Container selectors are tried in order and the first one producing at
    /// least one card wins. Elements without the portal's marker text are not
    /// cards.
    pub fn select_cards<'a>(&self, document: &'a Html) -> Vec<ElementRef<'a>> {
        for selector in &self.containers {
            let cards: Vec<ElementRef<'a>> = document
                .select(selector)
                .filter(|card| self.has_marker(card))
                .collect();
            if !cards.is_empty() {
                return cards;
            }
        }
        Vec::new()
    }

    fn has_marker(&self, card: &ElementRef<'_>) -> bool {
        match self.profile.container_marker {
            Some(marker) => card.text().any(|chunk| chunk.contains(marker)),
            None => true,
        }
    }

    /// Concatenated feature text of a card
    ///
    /// Uses the first feature selector that matches; falls back to the whole
    /// card text.
    pub fn feature_text(&self, card: ElementRef<'_>) -> String {
        for selector in &self.features {
            let parts: Vec<String> = card
                .select(selector)
                .filter_map(|el| clean_text(&element_text(el)))
                .collect();
            if !parts.is_empty() {
                return parts.join(" · ");
            }
        }
        element_text(card)
    }

    /// Runs a field's fallback chain against a card
    ///
    /// Each strategy's raw value goes through `parse`; the first strategy whose
    /// value parses wins. `None` means the chain was exhausted.
    pub fn resolve<T>(
        &self,
        field: Field,
        card: ElementRef<'_>,
        features: &str,
        parse: impl Fn(&str) -> Option<T>,
    ) -> Option<T> {
        self.chain(field)
            .iter()
            .find_map(|locator| locate(locator, card, features).and_then(|raw| parse(&raw)))
    }

    fn chain(&self, field: Field) -> &[CompiledLocator] {
        self.chains
            .iter()
            .find(|(f, _)| *f == field)
            .map(|(_, locators)| locators.as_slice())
            .unwrap_or(&[])
    }

    /// Inspects the page's "next page" control
    pub fn next_control(&self, document: &Html) -> NextControl {
        for selector in &self.next_controls {
            if let Some(control) = document.select(selector).next() {
                let element = control.value();
                let class_disabled = element.classes().any(|c| c.contains("disabled"));
                if element.attr("disabled").is_some()
                    || element.attr("aria-disabled") == Some("true")
                    || class_disabled
                {
                    return NextControl::Disabled;
                }

                let href = element
                    .attr("href")
                    .map(str::trim)
                    .filter(|h| !h.is_empty() && !h.starts_with('#') && !h.starts_with("javascript:"))
                    .map(str::to_string);
                return NextControl::Enabled { href };
            }
        }
        NextControl::Absent
    }
}

fn locate(locator: &CompiledLocator, card: ElementRef<'_>, features: &str) -> Option<String> {
    match locator {
        CompiledLocator::Text(selector) => card
            .select(selector)
            .find_map(|el| clean_text(&element_text(el))),
        CompiledLocator::Attr(selector, attr) => card
            .select(selector)
            .find_map(|el| el.value().attr(attr).and_then(clean_text)),
        CompiledLocator::TextContaining(selector, needle) => card
            .select(selector)
            .map(element_text)
            .find(|text| text.contains(needle))
            .and_then(|text| clean_text(&text)),
        CompiledLocator::OwnAttr(attr) => card.value().attr(attr).and_then(clean_text),
        CompiledLocator::Pattern(kind) => features::capture(*kind, features).map(str::to_string),
    }
}

fn element_text(element: ElementRef<'_>) -> String {
    element.text().collect::<String>()
}

fn compile_selector(selector: &str) -> Option<Selector> {
    match Selector::parse(selector) {
        Ok(parsed) => Some(parsed),
        Err(e) => {
            tracing::warn!("Dropping invalid selector '{}': {}", selector, e);
            None
        }
    }
}

fn compile_all(selectors: &[&str]) -> Vec<Selector> {
    selectors.iter().filter_map(|s| compile_selector(s)).collect()
}

fn compile_locator(locator: &Locator) -> Option<CompiledLocator> {
    match *locator {
        Locator::Text(s) => compile_selector(s).map(CompiledLocator::Text),
        Locator::Attr(s, attr) => compile_selector(s).map(|sel| CompiledLocator::Attr(sel, attr)),
        Locator::TextContaining(s, needle) => {
            compile_selector(s).map(|sel| CompiledLocator::TextContaining(sel, needle))
        }
        Locator::OwnAttr(attr) => Some(CompiledLocator::OwnAttr(attr)),
        Locator::Pattern(kind) => Some(CompiledLocator::Pattern(kind)),
    }
}
