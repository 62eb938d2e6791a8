use repo2resume::http::{encode_path_segment, extract_rate_from_rest, map_status_to_error};
use repo2resume::ErrorKind;
use reqwest::header::HeaderMap;

#[test]
fn status_error_mapping() {
    let e = map_status_to_error(
        reqwest::StatusCode::TOO_MANY_REQUESTS,
        &HeaderMap::new(),
        "/repos/o/r/pulls",
        "rate".into(),
    );
    assert_eq!(e.kind(), ErrorKind::RateLimited);
    assert!(e.retriable());
    assert!(e.to_string().contains("/repos/o/r/pulls with status 429"));

    let e = map_status_to_error(
        reqwest::StatusCode::SERVICE_UNAVAILABLE,
        &HeaderMap::new(),
        "/repos/o/r/pulls",
        "unavailable".into(),
    );
    assert_eq!(e.kind(), ErrorKind::Transport);
    assert!(e.to_string().contains("/repos/o/r/pulls"));
    assert!(e.to_string().contains("503"));
}

#[test]
fn rest_rate_headers() {
    let mut h = HeaderMap::new();
    h.insert("x-ratelimit-remaining", "4999".parse().unwrap());
    h.insert("x-ratelimit-reset", "1700000000".parse().unwrap());
    let rate = extract_rate_from_rest(&h);
    assert_eq!(rate.remaining, Some(4999));
    assert_eq!(rate.reset, Some(1_700_000_000));
    assert!(!rate.is_exhausted());

    h.insert("x-ratelimit-remaining", "0".parse().unwrap());
    assert!(extract_rate_from_rest(&h).is_exhausted());
    assert_eq!(extract_rate_from_rest(&HeaderMap::new()).remaining, None);
}

#[test]
fn url_path_segment_encoding() {
    // Spaces, slash and percent are escaped
    assert_eq!(encode_path_segment("Prod Env/Blue%"), "Prod%20Env%2FBlue%25");
    // Unreserved characters remain as-is
    assert_eq!(encode_path_segment("abc-._~123"), "abc-._~123");
}
