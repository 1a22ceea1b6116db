use std::collections::HashMap;

/// Parse query parameters from a URI string
///
/// Handles URL decoding and returns a HashMap of parameter key-value pairs.
/// Multiple values for the same key are not supported (only the last is kept).
///
/// # Example
/// ```
/// use network::core::query_params::parse_query_params;
///
/// let params = parse_query_params("/profile/3?page=2&tab=posts");
/// assert_eq!(params.get("page"), Some(&"2".to_string()));
/// assert_eq!(params.get("tab"), Some(&"posts".to_string()));
/// ```
pub fn parse_query_params(uri: &str) -> HashMap<String, String> {
    match uri.find('?') {
        Some(query_start) => parse_urlencoded(&uri[query_start + 1..]),
        None => HashMap::new(),
    }
}

/// Parse an `application/x-www-form-urlencoded` string (query or form body).
pub fn parse_urlencoded(raw: &str) -> HashMap<String, String> {
    let mut params = HashMap::new();

    for param in raw.split('&').filter(|p| !p.is_empty()) {
        match param.find('=') {
            Some(eq_idx) => {
                let key = decode_component(&param[..eq_idx]);
                let value = decode_component(&param[eq_idx + 1..]);
                params.insert(key, value);
            }
            None => {
                // Flag parameter without value
                params.insert(decode_component(param), String::new());
            }
        }
    }

    params
}

fn decode_component(raw: &str) -> String {
    // Forms encode spaces as '+'
    let spaced = raw.replace('+', " ");
    urlencoding::decode(&spaced)
        .map(|decoded| decoded.into_owned())
        .unwrap_or_else(|_| spaced.clone())
}
