use std::collections::HashMap;

/// Parse a raw query string (`q=al&page=2`) into decoded key-value pairs.
///
/// Repeated keys keep the last value. Keys without `=` map to an empty string.
pub fn parse_query_params(query: &str) -> HashMap<String, String> {
    let query = query.trim_start_matches('?');
    let mut params = HashMap::new();

    for param in query.split('&').filter(|p| !p.is_empty()) {
        match param.split_once('=') {
            Some((key, encoded_value)) => {
                // '+' is a space in form-encoded queries
                let spaced = encoded_value.replace('+', " ");
                let decoded = urlencoding::decode(&spaced)
                    .map(|v| v.into_owned())
                    .unwrap_or(spaced);
                params.insert(key.to_string(), decoded);
            }
            None => {
                params.insert(param.to_string(), String::new());
            }
        }
    }

    params
}

pub fn get_string(params: &HashMap<String, String>, key: &str, default: Option<&str>) -> Option<String> {
    params
        .get(key)
        .cloned()
        .or_else(|| default.map(|d| d.to_string()))
}

/// Integer parameter, never below 1.
pub fn get_int(params: &HashMap<String, String>, key: &str, default: usize) -> usize {
    params
        .get(key)
        .and_then(|s| s.parse::<usize>().ok())
        .unwrap_or(default)
        .max(1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_and_defaults() {
        let params = parse_query_params("q=ali%20ce&page=0&flag");
        assert_eq!(get_string(&params, "q", None).as_deref(), Some("ali ce"));
        assert_eq!(get_int(&params, "page", 1), 1);
        assert_eq!(get_int(&params, "missing", 3), 3);
        assert_eq!(params.get("flag").map(String::as_str), Some(""));
    }
}
