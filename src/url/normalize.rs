use crate::UrlError;
use url::Url;

/// Query parameters that never change which listings a page shows
const IGNORED_PARAMS: &[&str] = &["fbclid", "gclid", "mc_eid", "ref", "source", "origem", "from"];

/// Normalizes a URL into the identity key used for queue dedup
///
/// Two search pages are the same page when their URLs agree after:
///
/// 1. upgrading `http` to `https`
/// 2. lowercasing the host and dropping a leading `www.`
/// 3. resolving dot segments, collapsing empty segments and dropping the trailing slash
/// 4. dropping the fragment
/// 5. dropping `utm_*` and other referral parameters
/// 6. sorting the remaining parameters by key (repeated keys keep their order)
///
/// # Examples
///
/// ```
/// use listing_crawl::url::normalize_url;
///
/// let url = normalize_url("http://WWW.ZAPIMOVEIS.COM.BR/venda/?pagina=2&a=1#top").unwrap();
/// assert_eq!(url.as_str(), "https://zapimoveis.com.br/venda?a=1&pagina=2");
/// ```
pub fn normalize_url(url_str: &str) -> Result<Url, UrlError> {
    let mut url = Url::parse(url_str).map_err(|e| UrlError::Parse(e.to_string()))?;

    match url.scheme() {
        "https" => {}
        "http" => url
            .set_scheme("https")
            .map_err(|_| UrlError::Malformed(format!("Cannot upgrade scheme of {}", url_str)))?,
        other => {
            return Err(UrlError::InvalidScheme(format!(
                "Only HTTP and HTTPS schemes are supported, got: {}",
                other
            )))
        }
    }

    let host = canonical_host(&url).ok_or(UrlError::MissingDomain)?;
    url.set_host(Some(&host))
        .map_err(|e| UrlError::Malformed(format!("Failed to set host: {}", e)))?;

    let path = canonical_path(url.path());
    url.set_path(&path);
    url.set_fragment(None);

    let params = canonical_query(&url);
    if params.is_empty() {
        url.set_query(None);
    } else {
        url.query_pairs_mut().clear().extend_pairs(params.iter());
    }

    Ok(url)
}

fn canonical_host(url: &Url) -> Option<String> {
    let host = url.host_str()?.to_lowercase();
    Some(match host.strip_prefix("www.") {
        Some(bare) => bare.to_string(),
        None => host,
    })
}

fn canonical_path(path: &str) -> String {
    let mut segments: Vec<&str> = Vec::new();
    for segment in path.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            _ => segments.push(segment),
        }
    }
    format!("/{}", segments.join("/"))
}

fn canonical_query(url: &Url) -> Vec<(String, String)> {
    let mut params: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(key, _)| !key.starts_with("utm_") && !IGNORED_PARAMS.contains(&key.as_ref()))
        .map(|(key, value)| (key.into_owned(), value.into_owned()))
        .collect();
    params.sort_by(|a, b| a.0.cmp(&b.0));
    params
}
