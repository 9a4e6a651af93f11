//! Hop-by-hop header filtering

use http::HeaderMap;

/// Headers that are never forwarded in either direction
pub const HOP_BY_HOP_HEADERS: [&str; 6] = [
    "host",
    "content-length",
    "connection",
    "accept-encoding",
    "transfer-encoding",
    "content-encoding",
];

/// Return a copy of `headers` without the hop-by-hop entries
pub fn clean_headers(headers: &HeaderMap) -> HeaderMap {
    let mut cleaned = HeaderMap::with_capacity(headers.len());
    for (name, value) in headers {
        if !HOP_BY_HOP_HEADERS.contains(&name.as_str()) {
            cleaned.append(name.clone(), value.clone());
        }
    }
    cleaned
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::HeaderValue;

    #[test]
    fn test_strips_hop_by_hop_headers() {
        let mut headers = HeaderMap::new();
        headers.insert("host", HeaderValue::from_static("localhost:8080"));
        headers.insert("content-length", HeaderValue::from_static("12"));
        headers.insert("transfer-encoding", HeaderValue::from_static("chunked"));
        headers.insert("content-encoding", HeaderValue::from_static("gzip"));
        headers.insert("accept-encoding", HeaderValue::from_static("gzip"));
        headers.insert("connection", HeaderValue::from_static("keep-alive"));
        headers.insert("authorization", HeaderValue::from_static("Bearer abc"));
        headers.insert("accept", HeaderValue::from_static("application/json"));

        let cleaned = clean_headers(&headers);

        assert_eq!(cleaned.len(), 2);
        assert_eq!(cleaned.get("authorization").unwrap(), "Bearer abc");
        assert_eq!(cleaned.get("accept").unwrap(), "application/json");
    }

    #[test]
    fn test_keeps_repeated_values() {
        let mut headers = HeaderMap::new();
        headers.append("accept", HeaderValue::from_static("a"));
        headers.append("accept", HeaderValue::from_static("b"));

        let cleaned = clean_headers(&headers);
        assert_eq!(cleaned.get_all("accept").iter().count(), 2);
    }
}
