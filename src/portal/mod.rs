//! Portal capability table
//!
//! Each supported portal is described by a [`PortalProfile`]: its URL shape,
//! card container selectors, per-field fallback chains, page size and
//! pagination affordance. Supporting a new portal or a new markup version is a
//! matter of editing this table.

mod profile;

pub use profile::{
    FeaturePattern, Field, FieldChain, Locator, PaginationAffordance, PortalProfile, UrlShape,
};

use crate::model::Portal;
use crate::url::{path_heavy_url, query_heavy_url};
use crate::UrlResult;

/// Block markers shared by both portals (matched lowercase)
const BLOCK_MARKERS: &[&str] = &[
    "captcha",
    "cf-chl",
    "px-captcha",
    "access denied",
    "acesso negado",
    "pardon our interruption",
    "request unsuccessful",
];

const FEATURE_SELECTORS: &[&str] = &[
    "[data-testid*=\"amenit\"] li",
    ".property-card__amenities li",
    "ul li",
];

static ZAP_IMOVEIS: PortalProfile = PortalProfile {
    portal: Portal::ZapImoveis,
    base_origin: "https://www.zapimoveis.com.br",
    url_shape: query_heavy_url,
    container_selectors: &[
        "[data-testid*=\"property-card\"]",
        "[data-cy=\"rp-property-cd\"]",
        "article",
        ".property-card",
    ],
    container_marker: Some("R$"),
    ready_selector: "[data-testid*=\"property\"], article, .property-card",
    feature_selectors: FEATURE_SELECTORS,
    fields: &[
        FieldChain {
            field: Field::Title,
            locators: &[
                Locator::Text("[data-testid=\"card-title\"]"),
                Locator::Text("h2"),
                Locator::Text("h3"),
                Locator::Text(".property-card__title"),
            ],
        },
        FieldChain {
            field: Field::Price,
            locators: &[
                Locator::Text("[data-testid*=\"price\"]"),
                Locator::Text(".price"),
                Locator::TextContaining("p, span", "R$"),
            ],
        },
        FieldChain {
            field: Field::Address,
            locators: &[
                Locator::Text("[data-testid*=\"address\"]"),
                Locator::Text("[data-cy*=\"street\"]"),
                Locator::Text(".address"),
                Locator::Text(".property-card__address"),
            ],
        },
        FieldChain {
            field: Field::Area,
            locators: &[
                Locator::Text("[data-testid*=\"area\"]"),
                Locator::Text(".area"),
                Locator::TextContaining("li, span, p", "m²"),
                Locator::Pattern(FeaturePattern::Area),
            ],
        },
        FieldChain {
            field: Field::Rooms,
            locators: &[
                Locator::Text("[data-testid*=\"bedroom\"]"),
                Locator::Text(".rooms"),
                Locator::TextContaining("li, span, p", "quarto"),
                Locator::Pattern(FeaturePattern::Rooms),
            ],
        },
        FieldChain {
            field: Field::Baths,
            locators: &[
                Locator::Text("[data-testid*=\"bathroom\"]"),
                Locator::Text(".baths"),
                Locator::TextContaining("li, span, p", "banheiro"),
                Locator::Pattern(FeaturePattern::Baths),
            ],
        },
        FieldChain {
            field: Field::Parking,
            locators: &[
                Locator::Text("[data-testid*=\"parking\"]"),
                Locator::Text(".parking"),
                Locator::TextContaining("li, span, p", "vaga"),
                Locator::Pattern(FeaturePattern::Parking),
            ],
        },
        FieldChain {
            field: Field::DetailUrl,
            locators: &[
                Locator::Attr("a[data-testid*=\"card-link\"]", "href"),
                Locator::Attr("a[href*=\"/imovel/\"]", "href"),
                Locator::OwnAttr("href"),
                Locator::Attr("a[href]", "href"),
            ],
        },
    ],
    page_size: 30,
    page_param: "pagina",
    pagination: PaginationAffordance::UrlParameter,
    block_markers: BLOCK_MARKERS,
};

static VIVA_REAL: PortalProfile = PortalProfile {
    portal: Portal::VivaReal,
    base_origin: "https://www.vivareal.com.br",
    url_shape: path_heavy_url,
    container_selectors: &[
        "[data-cy=\"rp-property-cd\"]",
        "[data-testid*=\"property-card\"]",
        ".property-card__container",
        "article",
        ".property-card",
    ],
    container_marker: Some("R$"),
    ready_selector: "[data-testid*=\"property\"], [data-cy=\"rp-property-cd\"], article, .property-card",
    feature_selectors: FEATURE_SELECTORS,
    fields: &[
        FieldChain {
            field: Field::Title,
            locators: &[
                Locator::Text("[data-cy=\"rp-cardProperty-location-txt\"]"),
                Locator::Text(".property-card__title"),
                Locator::Text("h2"),
                Locator::Text("h3"),
            ],
        },
        FieldChain {
            field: Field::Price,
            locators: &[
                Locator::Text("[data-cy=\"rp-cardProperty-price-txt\"] p"),
                Locator::Text(".property-card__price"),
                Locator::Text("[data-testid*=\"price\"]"),
                Locator::TextContaining("p, span", "R$"),
            ],
        },
        FieldChain {
            field: Field::Address,
            locators: &[
                Locator::Text("[data-cy=\"rp-cardProperty-street-txt\"]"),
                Locator::Text(".property-card__address"),
                Locator::Text("[data-testid*=\"address\"]"),
                Locator::Text(".address"),
            ],
        },
        FieldChain {
            field: Field::Area,
            locators: &[
                Locator::Text("[data-cy=\"rp-cardProperty-propertyArea-txt\"]"),
                Locator::Text(".property-card__detail-area"),
                Locator::TextContaining("li, span, p", "m²"),
                Locator::Pattern(FeaturePattern::Area),
            ],
        },
        FieldChain {
            field: Field::Rooms,
            locators: &[
                Locator::Text("[data-cy=\"rp-cardProperty-bedroomQuantity-txt\"]"),
                Locator::Text(".property-card__detail-room"),
                Locator::TextContaining("li, span, p", "quarto"),
                Locator::Pattern(FeaturePattern::Rooms),
            ],
        },
        FieldChain {
            field: Field::Baths,
            locators: &[
                Locator::Text("[data-cy=\"rp-cardProperty-bathroomQuantity-txt\"]"),
                Locator::Text(".property-card__detail-bathroom"),
                Locator::TextContaining("li, span, p", "banheiro"),
                Locator::Pattern(FeaturePattern::Baths),
            ],
        },
        FieldChain {
            field: Field::Parking,
            locators: &[
                Locator::Text("[data-cy=\"rp-cardProperty-parkingSpacesQuantity-txt\"]"),
                Locator::Text(".property-card__detail-garage"),
                Locator::TextContaining("li, span, p", "vaga"),
                Locator::Pattern(FeaturePattern::Parking),
            ],
        },
        FieldChain {
            field: Field::DetailUrl,
            locators: &[
                Locator::OwnAttr("href"),
                Locator::Attr("a.property-card__content-link", "href"),
                Locator::Attr("a[href*=\"/imovel/\"]", "href"),
                Locator::Attr("a[href]", "href"),
            ],
        },
    ],
    page_size: 36,
    page_param: "pagina",
    pagination: PaginationAffordance::NextControl {
        selectors: &[
            "button[data-testid=\"next-page\"]",
            "[data-testid=\"pagination-next\"]",
            "a[aria-label=\"Próxima página\"]",
            "button[title=\"Próxima página\"]",
        ],
    },
    block_markers: BLOCK_MARKERS,
};

/// Returns the capability profile for a portal
pub fn profile(portal: Portal) -> &'static PortalProfile {
    match portal {
        Portal::ZapImoveis => &ZAP_IMOVEIS,
        Portal::VivaReal => &VIVA_REAL,
    }
}

/// Looks a profile up by portal identifier
///
/// # Returns
///
/// * `Ok(&PortalProfile)` - The identifier names a supported portal
/// * `Err(UrlError::UnsupportedPortal)` - It does not
pub fn profile_by_id(id: &str) -> UrlResult<&'static PortalProfile> {
    let portal: Portal = id.parse()?;
    Ok(profile(portal))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::UrlError;
    use scraper::Selector;

    #[test]
    fn test_lookup_by_id() {
        assert_eq!(profile_by_id("zapimoveis").unwrap().portal, Portal::ZapImoveis);
        assert_eq!(profile_by_id("vivareal").unwrap().portal, Portal::VivaReal);
    }

    #[test]
    fn test_unknown_id_is_unsupported() {
        let err = profile_by_id("imovelweb").unwrap_err();
        assert!(matches!(err, UrlError::UnsupportedPortal(_)));
    }

    #[test]
    fn test_every_field_has_a_chain() {
        for portal in Portal::all() {
            let profile = profile(portal);
            for field in Field::all() {
                assert!(
                    !profile.chain(field).is_empty(),
                    "{} has no chain for {}",
                    portal,
                    field.name()
                );
            }
        }
    }

    #[test]
    fn test_all_selectors_parse() {
        for portal in Portal::all() {
            let profile = profile(portal);
            let mut selectors: Vec<&str> = profile.container_selectors.to_vec();
            selectors.extend(profile.feature_selectors);
            selectors.push(profile.ready_selector);
            if let PaginationAffordance::NextControl { selectors: next } = profile.pagination {
                selectors.extend(next);
            }
            for chain in profile.fields {
                for locator in chain.locators {
                    match locator {
                        Locator::Text(s) | Locator::Attr(s, _) | Locator::TextContaining(s, _) => {
                            selectors.push(*s)
                        }
                        Locator::OwnAttr(_) | Locator::Pattern(_) => {}
                    }
                }
            }
            for selector in selectors {
                assert!(Selector::parse(selector).is_ok(), "bad selector {}", selector);
            }
        }
    }

    #[test]
    fn test_page_sizes() {
        assert_eq!(profile(Portal::ZapImoveis).page_size, 30);
        assert_eq!(profile(Portal::VivaReal).page_size, 36);
        assert_eq!(profile(Portal::ZapImoveis).pagination, PaginationAffordance::UrlParameter);
    }
}
