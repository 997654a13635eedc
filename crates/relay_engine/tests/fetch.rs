use std::time::Duration;

use relay_engine::{parse_first_title, FailureKind, FeedSource, FetchSettings, ReqwestFeedSource};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const FEED: &str = "<rss><channel><item><title>Hello World</title></item></channel></rss>";

#[tokio::test]
async fn source_returns_decoded_feed() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/feed.xml"))
        .respond_with(
            ResponseTemplate::new(200).set_body_raw(FEED, "application/rss+xml; charset=utf-8"),
        )
        .mount(&server)
        .await;

    let source = ReqwestFeedSource::new(FetchSettings::default());
    let url = format!("{}/feed.xml", server.uri());

    let document = source.fetch_document(&url).await.expect("fetch ok");
    assert_eq!(document.text, FEED);
    assert_eq!(document.metadata.original_url, url);
    assert_eq!(document.metadata.final_url, url);
    assert_eq!(document.metadata.redirect_count, 0);
    assert_eq!(document.metadata.encoding_label, "UTF-8");
    assert_eq!(document.metadata.byte_len, FEED.len() as u64);
}

#[tokio::test]
async fn source_decodes_declared_legacy_encoding() {
    let server = MockServer::start().await;
    let mut body = b"<?xml version=\"1.0\" encoding=\"ISO-8859-1\"?><rss><item><title>Caf".to_vec();
    body.push(0xE9);
    body.extend_from_slice(b"</title></item></rss>");
    Mock::given(method("GET"))
        .and(path("/latin1"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(body, "text/xml"))
        .mount(&server)
        .await;

    let source = ReqwestFeedSource::new(FetchSettings::default());
    let url = format!("{}/latin1", server.uri());

    let document = source.fetch_document(&url).await.expect("fetch ok");
    assert!(document.text.contains("<title>Café</title>"));
}

#[tokio::test]
async fn source_fails_on_http_status() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/missing"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let source = ReqwestFeedSource::new(FetchSettings::default());
    let url = format!("{}/missing", server.uri());

    let err = source.fetch_document(&url).await.unwrap_err();
    assert_eq!(err.kind, FailureKind::HttpStatus(404));
    assert_eq!(err.to_string(), "http status 404");
}

#[tokio::test]
async fn source_rejects_invalid_url() {
    let source = ReqwestFeedSource::new(FetchSettings::default());
    let err = source.fetch_document("not a url").await.unwrap_err();
    assert_eq!(err.kind, FailureKind::InvalidUrl);
}

#[tokio::test]
async fn source_times_out_on_slow_response() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/slow"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_delay(Duration::from_millis(250))
                .set_body_raw(FEED, "application/xml"),
        )
        .mount(&server)
        .await;

    let settings = FetchSettings {
        request_timeout: Duration::from_millis(50),
        ..FetchSettings::default()
    };
    let source = ReqwestFeedSource::new(settings);
    let url = format!("{}/slow", server.uri());

    let err = source.fetch_document(&url).await.unwrap_err();
    assert_eq!(err.kind, FailureKind::Timeout);
}

#[tokio::test]
async fn source_rejects_too_large_response() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/large"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("Content-Type", "text/xml")
                .insert_header("Content-Length", "11")
                .set_body_string("01234567890"),
        )
        .mount(&server)
        .await;

    let settings = FetchSettings {
        max_bytes: 10,
        ..FetchSettings::default()
    };
    let source = ReqwestFeedSource::new(settings);
    let url = format!("{}/large", server.uri());

    let err = source.fetch_document(&url).await.unwrap_err();
    assert_eq!(
        err.kind,
        FailureKind::TooLarge {
            max_bytes: 10,
            actual: Some(11)
        }
    );
}

#[tokio::test]
async fn source_rejects_content_type_outside_configured_list() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/image"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(vec![0u8; 4], "image/png"))
        .mount(&server)
        .await;

    let settings = FetchSettings {
        allowed_content_types: vec!["application/rss+xml".to_string()],
        ..FetchSettings::default()
    };
    let source = ReqwestFeedSource::new(settings);
    let url = format!("{}/image", server.uri());

    let err = source.fetch_document(&url).await.unwrap_err();
    assert_eq!(
        err.kind,
        FailureKind::UnsupportedContentType {
            content_type: "image/png".to_string()
        }
    );
}

#[tokio::test]
async fn source_accepts_any_content_type_by_default() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/x-rss"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(FEED, "application/x-rss+xml"))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/octet"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(FEED, "application/octet-stream"))
        .mount(&server)
        .await;

    let source = ReqwestFeedSource::new(FetchSettings::default());
    for route in ["x-rss", "octet"] {
        let url = format!("{}/{route}", server.uri());
        let document = source.fetch_document(&url).await.expect("fetch ok");
        assert_eq!(parse_first_title(&document.text).unwrap(), "Hello World");
    }
}
