//! Search URL construction
//!
//! Each portal has its own URL shape. The shape functions here are referenced
//! from the portal capability table; `build_search_url` looks the shape up
//! and applies it to an origin.

use crate::model::{OriginSource, SearchOrigin};
use crate::portal;
use crate::url::slugify;
use crate::{UrlError, UrlResult};
use url::Url;

/// Builds the first-page search URL for an origin
///
/// Neighborhood origins are rendered through the portal's URL shape; seed URL
/// origins are returned unchanged.
///
/// # Arguments
///
/// * `origin` - The search origin to build a URL for
///
/// # Returns
///
/// * `Ok(Url)` - The fully-qualified search URL
/// * `Err(UrlError)` - The neighborhood slugifies to nothing or the result does not parse
pub fn build_search_url(origin: &SearchOrigin) -> UrlResult<Url> {
    match &origin.source {
        OriginSource::SeedUrl(url) => Ok(url.clone()),
        OriginSource::Neighborhood(name) => {
            let profile = portal::profile(origin.portal);
            (profile.url_shape)(profile.base_origin, origin, name)
        }
    }
}

/// Returns `url` with the pagination parameter set to `page`
///
/// An existing value is replaced in place; otherwise the parameter is appended.
/// Every other query pair keeps its position.
pub fn with_page(url: &Url, param: &str, page: u32) -> Url {
    let page_value = page.to_string();
    let mut replaced = false;
    let mut pairs: Vec<(String, String)> = Vec::new();

    for (key, value) in url.query_pairs() {
        if key == param {
            if !replaced {
                pairs.push((key.into_owned(), page_value.clone()));
                replaced = true;
            }
        } else {
            pairs.push((key.into_owned(), value.into_owned()));
        }
    }

    if !replaced {
        pairs.push((param.to_string(), page_value));
    }

    let mut next = url.clone();
    next.query_pairs_mut().clear().extend_pairs(pairs.iter());
    next
}

/// Lowercase words kept lowercase inside a place name ("Vila da Serra")
const NAME_PARTICLES: &[&str] = &["da", "das", "de", "do", "dos", "e"];

/// Canonical spelling of a neighborhood name for embedding in a query
///
/// Whitespace runs collapse and each word is capitalized except inner
/// particles, so names that slugify alike also embed alike.
fn display_name(name: &str) -> String {
    name.split_whitespace()
        .enumerate()
        .map(|(i, word)| {
            let lower = word.to_lowercase();
            if i > 0 && NAME_PARTICLES.contains(&lower.as_str()) {
                return lower;
            }
            let mut chars = lower.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect(),
                None => lower,
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Query-heavy shape: filters and a composite location go in the query string
///
/// Path: `/{transaction}/{type}/{uf}+{city}/{neighborhood}/`
pub fn query_heavy_url(base_origin: &str, origin: &SearchOrigin, neighborhood: &str) -> UrlResult<Url> {
    let slug = neighborhood_slug(neighborhood)?;
    let area = &origin.area;
    let property = property_codes(&origin.property_type);

    let path = format!(
        "/{}/{}/{}+{}/{}/",
        origin.transaction.path_segment(),
        property.map(|(plural, _)| plural).unwrap_or("imoveis"),
        area.state_abbr.to_lowercase(),
        slugify(&area.city),
        slug
    );
    let mut url = parse_with_path(base_origin, &path)?;

    let location = format!(
        ",{state},{city},,{hood},,,neighborhood,BR>{state}>NULL>{city}>Barrios>{hood},{lat},{lon},",
        state = area.state,
        city = area.city,
        hood = display_name(neighborhood),
        lat = area.latitude,
        lon = area.longitude,
    );

    let filters = &origin.filters;
    {
        let mut query = url.query_pairs_mut();
        query.append_pair("transacao", origin.transaction.query_value());
        query.append_pair("onde", &location);
        if let Some((_, code)) = property {
            query.append_pair("tipos", code);
        }
        query.append_pair("precoMinimo", &filters.price_min.to_string());
        query.append_pair("precoMaximo", &filters.price_max.to_string());
        for (key, counts) in [
            ("quartos", &filters.rooms),
            ("banheiros", &filters.baths),
            ("vagas", &filters.parking),
        ] {
            if !counts.is_empty() {
                query.append_pair(key, &counts.as_param());
            }
        }
        query.append_pair("areaMinima", &filters.area_min.to_string());
        query.append_pair("areaMaxima", &filters.area_max.to_string());
    }

    Ok(url)
}

/// Path-heavy shape: location and property type are path segments
///
/// Path: `/{transaction}/{state}/{city}/bairros/{neighborhood}/{type}/`
pub fn path_heavy_url(base_origin: &str, origin: &SearchOrigin, neighborhood: &str) -> UrlResult<Url> {
    let slug = neighborhood_slug(neighborhood)?;
    let area = &origin.area;

    let mut path = format!(
        "/{}/{}/{}/bairros/{}/",
        origin.transaction.path_segment(),
        slugify(&area.state),
        slugify(&area.city),
        slug
    );
    if let Some((_, code)) = property_codes(&origin.property_type) {
        path.push_str(code);
        path.push('/');
    }
    let mut url = parse_with_path(base_origin, &path)?;

    let filters = &origin.filters;
    {
        let mut query = url.query_pairs_mut();
        query.append_pair("preco-desde", &filters.price_min.to_string());
        query.append_pair("preco-ate", &filters.price_max.to_string());
        query.append_pair("area-desde", &filters.area_min.to_string());
        query.append_pair("area-ate", &filters.area_max.to_string());
        for (key, counts) in [
            ("quartos", &filters.rooms),
            ("banheiros", &filters.baths),
            ("vagas", &filters.parking),
        ] {
            if !counts.is_empty() {
                query.append_pair(key, &counts.as_param());
            }
        }
    }

    Ok(url)
}

fn neighborhood_slug(neighborhood: &str) -> UrlResult<String> {
    let slug = slugify(neighborhood);
    if slug.is_empty() {
        return Err(UrlError::Malformed(format!(
            "Neighborhood '{}' has no URL-safe characters",
            neighborhood
        )));
    }
    Ok(slug)
}

fn parse_with_path(base_origin: &str, path: &str) -> UrlResult<Url> {
    let raw = format!("{}{}", base_origin.trim_end_matches('/'), path);
    Url::parse(&raw).map_err(|e| UrlError::Parse(format!("{}: {}", raw, e)))
}

/// Plural path segment and listing type code for a property type
///
/// `None` means "any type" (`imoveis`, `todos`, or a type with no known code).
fn property_codes(property_type: &str) -> Option<(&'static str, &'static str)> {
    match slugify(property_type).as_str() {
        "apartamento" | "apartamentos" => Some(("apartamentos", "apartamento_residencial")),
        "casa" | "casas" => Some(("casas", "casa_residencial")),
        "cobertura" | "coberturas" => Some(("cobertura", "cobertura_residencial")),
        "kitnet" | "kitnets" | "studio" => Some(("kitnet", "kitnet_residencial")),
        "lote" | "terreno" | "lotes" => Some(("lote-terreno", "lote_terreno_residencial")),
        _ => None,
    }
}
