use crate::config::types::{Config, CrawlerConfig, OutputConfig, RenderEngine, RendererConfig, SearchConfig};
use crate::model::{CountSet, SearchFilters};
use crate::ConfigError;
use url::Url;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_crawler_config(&config.crawler)?;
    validate_search_config(&config.search)?;
    validate_filters(&config.search.filters)?;
    validate_renderer_config(&config.renderer)?;
    validate_output_config(&config.output)?;
    Ok(())
}

/// Validates crawler configuration
fn validate_crawler_config(config: &CrawlerConfig) -> Result<(), ConfigError> {
    if config.max_concurrency < 1 || config.max_concurrency > 16 {
        return Err(ConfigError::Validation(format!(
            "max_concurrency must be between 1 and 16, got {}",
            config.max_concurrency
        )));
    }

    if config.max_pages_per_origin < 1 {
        return Err(ConfigError::Validation(format!(
            "max_pages_per_origin must be >= 1, got {}",
            config.max_pages_per_origin
        )));
    }

    for (name, secs) in [
        ("navigation_timeout_secs", config.navigation_timeout_secs),
        ("content_wait_timeout_secs", config.content_wait_timeout_secs),
        ("request_handler_timeout_secs", config.request_handler_timeout_secs),
    ] {
        if secs == 0 {
            return Err(ConfigError::Validation(format!("{} must be > 0", name)));
        }
    }

    if config.expected_page_size == Some(0) {
        return Err(ConfigError::Validation(
            "expected_page_size must be >= 1 when set".to_string(),
        ));
    }

    Ok(())
}

/// Validates the search section: portal id, origins, seed URLs
fn validate_search_config(config: &SearchConfig) -> Result<(), ConfigError> {
    config.portal()?;

    if config.neighborhoods.is_empty() && config.seed_urls.is_empty() {
        return Err(ConfigError::Validation(
            "at least one neighborhood or seed URL is required".to_string(),
        ));
    }

    if let Some(blank) = config.neighborhoods.iter().find(|n| n.trim().is_empty()) {
        return Err(ConfigError::Validation(format!(
            "neighborhood names cannot be blank, got '{}'",
            blank
        )));
    }

    for seed in &config.seed_urls {
        let url = Url::parse(seed).map_err(|e| {
            ConfigError::InvalidUrl(format!("Invalid seed URL '{}': {}", seed, e))
        })?;

        if url.scheme() != "https" && url.scheme() != "http" {
            return Err(ConfigError::Validation(format!(
                "Seed URL '{}' must use HTTP or HTTPS",
                seed
            )));
        }
    }

    if config.area.city.trim().is_empty() || config.area.state.trim().is_empty() {
        return Err(ConfigError::Validation(
            "state and city cannot be empty".to_string(),
        ));
    }

    Ok(())
}

/// Validates filter ranges and count lists
fn validate_filters(filters: &SearchFilters) -> Result<(), ConfigError> {
    if filters.price_min > filters.price_max {
        return Err(ConfigError::Validation(format!(
            "price-min ({}) cannot exceed price-max ({})",
            filters.price_min, filters.price_max
        )));
    }

    if filters.area_min > filters.area_max {
        return Err(ConfigError::Validation(format!(
            "area-min ({}) cannot exceed area-max ({})",
            filters.area_min, filters.area_max
        )));
    }

    validate_counts("rooms", &filters.rooms)?;
    validate_counts("baths", &filters.baths)?;
    validate_counts("parking", &filters.parking)?;

    Ok(())
}

fn validate_counts(name: &str, counts: &CountSet) -> Result<(), ConfigError> {
    if counts.is_empty() {
        return Err(ConfigError::Validation(format!(
            "{} filter needs at least one value",
            name
        )));
    }
    Ok(())
}

/// Validates renderer configuration
fn validate_renderer_config(config: &RendererConfig) -> Result<(), ConfigError> {
    if config.user_agent.trim().is_empty() {
        return Err(ConfigError::Validation(
            "user_agent cannot be empty".to_string(),
        ));
    }

    if let Some(proxy) = &config.proxy_url {
        Url::parse(proxy)
            .map_err(|e| ConfigError::InvalidUrl(format!("Invalid proxy_url: {}", e)))?;
    }

    if config.engine == RenderEngine::Chrome && !cfg!(feature = "chrome") {
        return Err(ConfigError::Validation(
            "engine = \"chrome\" requires building with the `chrome` feature".to_string(),
        ));
    }

    Ok(())
}

/// Validates output configuration
fn validate_output_config(config: &OutputConfig) -> Result<(), ConfigError> {
    if config.database_path.is_empty() {
        return Err(ConfigError::Validation(
            "database_path cannot be empty".to_string(),
        ));
    }

    if config.jsonl_path.as_deref() == Some("") {
        return Err(ConfigError::Validation(
            "jsonl_path cannot be empty when set".to_string(),
        ));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_config() -> Config {
        toml::from_str(
            r#"
[search]
portal = "zapimoveis"
neighborhoods = ["Barreiro"]
"#,
        )
        .unwrap()
    }

    #[test]
    fn test_defaults_are_valid() {
        assert!(validate(&base_config()).is_ok());
    }

    #[test]
    fn test_concurrency_bounds() {
        let mut config = base_config();
        config.crawler.max_concurrency = 0;
        assert!(matches!(validate(&config), Err(ConfigError::Validation(_))));
        config.crawler.max_concurrency = 17;
        assert!(matches!(validate(&config), Err(ConfigError::Validation(_))));
    }

    #[test]
    fn test_zero_timeout_rejected() {
        let mut config = base_config();
        config.crawler.content_wait_timeout_secs = 0;
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_unsupported_portal() {
        let mut config = base_config();
        config.search.portal = "olx".to_string();
        assert!(matches!(
            validate(&config),
            Err(ConfigError::UnsupportedPortal(ref p)) if p == "olx"
        ));
    }

    #[test]
    fn test_requires_an_origin() {
        let mut config = base_config();
        config.search.neighborhoods.clear();
        assert!(validate(&config).is_err());

        config.search.seed_urls = vec!["https://www.zapimoveis.com.br/venda/".to_string()];
        assert!(validate(&config).is_ok());
    }

    #[test]
    fn test_seed_url_scheme() {
        let mut config = base_config();
        config.search.seed_urls = vec!["ftp://example.com/".to_string()];
        assert!(matches!(validate(&config), Err(ConfigError::Validation(_))));

        config.search.seed_urls = vec!["not a url".to_string()];
        assert!(matches!(validate(&config), Err(ConfigError::InvalidUrl(_))));
    }

    #[test]
    fn test_inverted_ranges() {
        let mut config = base_config();
        config.search.filters.price_min = 800_000;
        assert!(validate(&config).is_err());

        let mut config = base_config();
        config.search.filters.area_min = 200;
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_empty_count_list() {
        let mut config = base_config();
        config.search.filters.rooms = CountSet::new(vec![]);
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_blank_neighborhood() {
        let mut config = base_config();
        config.search.neighborhoods.push("  ".to_string());
        assert!(validate(&config).is_err());
    }

    #[cfg(not(feature = "chrome"))]
    #[test]
    fn test_chrome_engine_needs_feature() {
        let mut config = base_config();
        config.renderer.engine = RenderEngine::Chrome;
        assert!(validate(&config).is_err());
    }
}
