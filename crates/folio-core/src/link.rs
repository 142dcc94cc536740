use std::sync::OnceLock;

use regex::Regex;
use serde_json::Value;

use crate::entity::EntityData;
use crate::error::LinkError;

/// Accepts `http(s)://host/...` and bare `host.tld/...` addresses.
pub fn is_valid_url(url: &str) -> bool {
    static URL_REGEX: OnceLock<Regex> = OnceLock::new();
    let url_regex = URL_REGEX.get_or_init(|| {
        Regex::new(r"^(?i)(https?://)?([a-z0-9-]+\.)+[a-z0-9-]+(:\d+)?([/?#]\S*)?$")
            .expect("Invalid URL regex")
    });
    url_regex.is_match(url.trim())
}

pub fn validate_link(url: &str, title: &str) -> Result<(), LinkError> {
    if !is_valid_url(url) {
        return Err(LinkError::InvalidUrl(url.to_string()));
    }
    if title.trim().is_empty() {
        return Err(LinkError::EmptyTitle);
    }
    Ok(())
}

/// Entity data of a link inserted from the link dialog.
pub fn link_entity_data(url: &str, title: &str) -> EntityData {
    EntityData::from([
        ("url".to_string(), Value::from(url.trim())),
        ("target".to_string(), Value::from("_blank")),
        ("title".to_string(), Value::from(title)),
    ])
}
