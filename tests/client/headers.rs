use super::{ScriptedTransport, Step, builder, registry};
use http::header::{ACCEPT, CONTENT_TYPE};
use http::{HeaderName, HeaderValue, Method};
use serde::Serialize;
use upstream_resilience_client::{HttpRequest, RequestOptions};

fn x_team() -> HeaderName {
    HeaderName::from_static("x-team")
}

#[derive(Serialize)]
struct Widget<'a> {
    title: &'a str,
    refresh_secs: u32,
}

fn recording() -> (ScriptedTransport, upstream_resilience_client::Client<ScriptedTransport>) {
    let transport = ScriptedTransport::always(Step::Status(200));
    let client = builder(&registry())
        .base_url("http://svc.test")
        .header(x_team(), HeaderValue::from_static("a"))
        .header(ACCEPT, HeaderValue::from_static("application/json"))
        .build(transport.clone());
    (transport, client)
}

#[tokio::test]
async fn per_call_header_overrides_default() {
    let (transport, client) = recording();

    client
        .get(
            "/x",
            RequestOptions::new().header(x_team(), HeaderValue::from_static("b")),
        )
        .await
        .unwrap();

    let headers = &transport.calls()[0].request.headers;
    assert_eq!(headers.get_all("x-team").iter().count(), 1);
    assert_eq!(headers["x-team"], "b");
    assert_eq!(headers[ACCEPT], "application/json");
}

#[tokio::test]
async fn override_matches_names_case_insensitively() {
    let (transport, client) = recording();

    let mixed_case = HeaderName::from_bytes(b"X-TEAM").unwrap();
    client
        .delete(
            "/x",
            RequestOptions::new().header(mixed_case, HeaderValue::from_static("ops")),
        )
        .await
        .unwrap();

    let request = &transport.calls()[0].request;
    assert_eq!(request.method, Method::DELETE);
    assert_eq!(request.headers["x-team"], "ops");
    assert!(request.body.is_none());
}

#[tokio::test]
async fn body_verbs_send_json() {
    let (transport, client) = recording();
    let widget = Widget {
        title: "CPU",
        refresh_secs: 30,
    };

    client.post("/widgets", &widget, RequestOptions::new()).await.unwrap();
    client.put("/widgets/1", &widget, RequestOptions::new()).await.unwrap();
    client.patch("/widgets/1", &widget, RequestOptions::new()).await.unwrap();

    let calls = transport.calls();
    let methods: Vec<_> = calls.iter().map(|c| c.request.method.clone()).collect();
    assert_eq!(methods, vec![Method::POST, Method::PUT, Method::PATCH]);
    for call in &calls {
        assert_eq!(call.request.headers[CONTENT_TYPE], "application/json");
        let body: serde_json::Value =
            serde_json::from_slice(call.request.body.as_ref().unwrap()).unwrap();
        assert_eq!(body, serde_json::json!({"title": "CPU", "refresh_secs": 30}));
    }
}

#[tokio::test]
async fn caller_content_type_wins() {
    let (transport, client) = recording();

    client
        .post(
            "/widgets",
            &serde_json::json!({"op": "add"}),
            RequestOptions::new().header(
                CONTENT_TYPE,
                HeaderValue::from_static("application/json-patch+json"),
            ),
        )
        .await
        .unwrap();

    let headers = &transport.calls()[0].request.headers;
    assert_eq!(headers[CONTENT_TYPE], "application/json-patch+json");
    assert_eq!(headers.get_all(CONTENT_TYPE).iter().count(), 1);
}

#[tokio::test]
async fn bodyless_verbs_have_no_content_type() {
    let (transport, client) = recording();

    client.get("/widgets", RequestOptions::new()).await.unwrap();

    assert!(!transport.calls()[0].request.headers.contains_key(CONTENT_TYPE));
}

#[tokio::test]
async fn prepared_requests_keep_their_own_headers() {
    let (transport, client) = recording();

    let request = HttpRequest::new(Method::POST, "/raw")
        .with_header(x_team(), HeaderValue::from_static("c"))
        .with_body("plain text");
    client.send(request).await.unwrap();

    let request = &transport.calls()[0].request;
    assert_eq!(request.url, "http://svc.test/raw");
    assert_eq!(request.headers["x-team"], "c");
    assert_eq!(request.headers[ACCEPT], "application/json");
    assert_eq!(request.body.as_deref(), Some(&b"plain text"[..]));
}
