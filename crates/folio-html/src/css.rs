//! Inline `style` attributes and attribute-name normalization.

/// `name: value` pairs of an inline style attribute, in source order.
pub fn declarations(style: &str) -> impl Iterator<Item = (&str, &str)> {
    style.split(';').filter_map(|decl| {
        let (name, value) = decl.split_once(':')?;
        let (name, value) = (name.trim(), value.trim());
        (!name.is_empty() && !value.is_empty()).then_some((name, value))
    })
}

/// The value of `property` in an inline style attribute; the last
/// declaration wins.
pub fn style_property<'a>(style: &'a str, property: &str) -> Option<&'a str> {
    declarations(style)
        .filter(|(name, _)| name.eq_ignore_ascii_case(property))
        .map(|(_, value)| value)
        .last()
}

/// `textAlign` -> `text-align`. Names that are already kebab-case pass through.
pub fn css_property_name(name: &str) -> String {
    let mut out = String::with_capacity(name.len() + 2);
    for ch in name.chars() {
        if ch.is_ascii_uppercase() {
            out.push('-');
            out.push(ch.to_ascii_lowercase());
        } else {
            out.push(ch);
        }
    }
    out
}

pub fn style_to_css(style: &[(String, String)]) -> String {
    style
        .iter()
        .map(|(name, value)| format!("{}: {value}", css_property_name(name)))
        .collect::<Vec<_>>()
        .join("; ")
}

/// React-style attribute names to their HTML spelling.
pub fn normalize_attribute_name(name: &str) -> &str {
    match name {
        "acceptCharset" => "accept-charset",
        "className" => "class",
        "htmlFor" => "for",
        "httpEquiv" => "http-equiv",
        other => other,
    }
}

/// Leading digits of a CSS length, e.g. `18` for `18px`.
pub(crate) fn leading_number(value: &str) -> Option<&str> {
    let end = value
        .char_indices()
        .find(|(_, ch)| !ch.is_ascii_digit())
        .map_or(value.len(), |(ix, _)| ix);
    (end > 0).then(|| &value[..end])
}
