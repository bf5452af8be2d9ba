//! Annotation CRUD, permissions and search over HTTP.

mod common;

use annotator_store::annotation::{Action, Annotation, EVERYONE, Permissions, Range};
use common::{TestOptions, TestServer, signed};
use reqwest::StatusCode;
use serde_json::{Value, json};

fn owned(id: i64, text: &str, owner: &str) -> Annotation {
    Annotation {
        id: Some(id),
        text: Some(text.into()),
        user: Some(owner.into()),
        ..Annotation::default()
    }
}

fn private_to(id: i64, text: &str, owner: &str) -> Annotation {
    let mut perms = Permissions::default();
    perms.set(Action::Read, vec![owner.into()]);
    Annotation {
        permissions: Some(perms),
        ..owned(id, text, owner)
    }
}

#[tokio::test]
async fn test_index_empty() {
    let server = TestServer::start().await;
    let res = signed(server.client.get(server.endpoint("/annotations")), "alice")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(res.text().await.unwrap(), "[]");
}

#[tokio::test]
async fn test_index_hides_unreadable() {
    let server = TestServer::start().await;
    server.seed(owned(1, "open", "alice"));
    server.seed(private_to(2, "secret", "alice"));

    let res = signed(server.client.get(server.endpoint("/annotations")), "bob")
        .send()
        .await
        .unwrap();
    let rows: Vec<Value> = res.json().await.unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["text"], "open");

    let res = signed(server.client.get(server.endpoint("/annotations")), "alice")
        .send()
        .await
        .unwrap();
    let rows: Vec<Value> = res.json().await.unwrap();
    assert_eq!(rows.len(), 2);
}

#[tokio::test]
async fn test_create() {
    let server = TestServer::start().await;
    let payload = json!({
        "id": 999,
        "user": "mallory",
        "text": "Foo",
        "ranges": [{"start": "/p[1]", "startOffset": 0, "end": "/p[1]", "endOffset": 3, "quote": "Foo"}],
        "uri": "http://example.com/doc"
    });

    let res = signed(server.client.post(server.endpoint("/annotations")), "alice")
        .json(&payload)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(res.headers()["access-control-allow-origin"], "*");

    let created: Value = res.json().await.unwrap();
    let id = created["id"].as_i64().unwrap();
    assert_ne!(id, 999, "client id must be ignored");
    assert_eq!(created["user"], "alice");
    assert_eq!(created["text"], "Foo");
    assert_eq!(created["uri"], "http://example.com/doc");
    assert_eq!(created["ranges"][0]["startOffset"], 0);
    assert!(created["ranges"][0]["id"].is_i64());
    assert_eq!(created["ranges"][0]["quote"], "Foo");

    let stored = server.store.insert(Annotation::default());
    assert!(stored.id.unwrap() > id);
}

#[tokio::test]
async fn test_create_rejects_empty_payloads() {
    let server = TestServer::start().await;

    for body in ["", "{}", "[1, 2]", "not json"] {
        let res = signed(server.client.post(server.endpoint("/annotations")), "alice")
            .header("content-type", "application/json")
            .body(body)
            .send()
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::BAD_REQUEST, "body {:?}", body);
        let err: Value = res.json().await.unwrap();
        assert_eq!(err["message"], "No parameters given. Annotation not created.");
    }
    assert!(server.store.is_empty());
}

#[tokio::test]
async fn test_create_rejects_schema_errors() {
    let server = TestServer::start().await;

    for body in [json!({"extras": {"a": 1}}), json!({"text": 5}), json!({"ranges": "x"})] {
        let res = signed(server.client.post(server.endpoint("/annotations")), "alice")
            .json(&body)
            .send()
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::BAD_REQUEST, "body {}", body);
    }
    assert!(server.store.is_empty());
}

#[tokio::test]
async fn test_read() {
    let server = TestServer::start().await;
    let mut ann = owned(123, "Foo", "alice");
    ann.ranges.push(Range::new("/a", 1, "/b", 2));
    ann.extras.insert("color", json!("red")).unwrap();
    server.seed(ann);

    let res = signed(server.client.get(server.endpoint("/annotations/123")), "bob")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["id"], 123);
    assert_eq!(body["text"], "Foo");
    assert_eq!(body["color"], "red");
    assert_eq!(body["ranges"][0]["start"], "/a");
    assert!(body.get("extras").is_none());
}

#[tokio::test]
async fn test_read_not_found() {
    let server = TestServer::start().await;
    let res = signed(server.client.get(server.endpoint("/annotations/123")), "alice")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
    assert!(res.headers().get("access-control-allow-origin").is_none());
    let err: Value = res.json().await.unwrap();
    assert_eq!(err["message"], "Annotation not found.");
}

#[tokio::test]
async fn test_read_forbidden() {
    let server = TestServer::start().await;
    server.seed(private_to(7, "secret", "alice"));

    let res = signed(server.client.get(server.endpoint("/annotations/7")), "bob")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_update() {
    let server = TestServer::start().await;
    let mut ann = owned(123, "Foo", "alice");
    ann.extras.insert("keep", json!(1)).unwrap();
    ann.ranges = vec![Range::new("/a", 0, "/a", 1), Range::new("/b", 0, "/b", 1)];
    server.seed(ann);

    let res = signed(server.client.put(server.endpoint("/annotations/123")), "alice")
        .json(&json!({
            "id": 5,
            "user": "mallory",
            "text": "Bar",
            "ranges": [{"start": "/c"}],
            "added": true
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["id"], 123);
    assert_eq!(body["user"], "alice");
    assert_eq!(body["text"], "Bar");
    assert_eq!(body["keep"], 1);
    assert_eq!(body["added"], true);
    assert_eq!(body["ranges"].as_array().unwrap().len(), 1);

    let res = signed(server.client.get(server.endpoint("/annotations/123")), "alice")
        .send()
        .await
        .unwrap();
    let reread: Value = res.json().await.unwrap();
    assert_eq!(reread, body);
}

#[tokio::test]
async fn test_update_checks_in_order() {
    let server = TestServer::start().await;
    server.seed(owned(1, "Foo", "alice"));

    // Missing record beats everything
    let res = signed(server.client.put(server.endpoint("/annotations/2")), "bob")
        .json(&json!({}))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);

    // Not the owner
    let res = signed(server.client.put(server.endpoint("/annotations/1")), "bob")
        .json(&json!({"text": "hijack"}))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::FORBIDDEN);

    // Owner with nothing to say
    let res = signed(server.client.put(server.endpoint("/annotations/1")), "alice")
        .json(&json!({}))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    let res = signed(server.client.get(server.endpoint("/annotations/1")), "alice")
        .send()
        .await
        .unwrap();
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["text"], "Foo");
}

#[tokio::test]
async fn test_update_granted_to_everyone() {
    let server = TestServer::start().await;
    let mut perms = Permissions::default();
    perms.set(Action::Update, vec![EVERYONE.into()]);
    server.seed(Annotation {
        permissions: Some(perms),
        ..owned(1, "wiki", "alice")
    });

    let res = signed(server.client.put(server.endpoint("/annotations/1")), "carol")
        .json(&json!({"text": "edited"}))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_delete() {
    let server = TestServer::start().await;
    server.seed(owned(456, "Foo", "alice"));

    let res = signed(server.client.delete(server.endpoint("/annotations/456")), "bob")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::FORBIDDEN);

    let res = signed(server.client.delete(server.endpoint("/annotations/456")), "alice")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NO_CONTENT);
    assert_eq!(res.text().await.unwrap(), "");

    let res = signed(server.client.get(server.endpoint("/annotations/456")), "alice")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);

    let res = signed(server.client.delete(server.endpoint("/annotations/456")), "alice")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_search() {
    let server = TestServer::start().await;
    server.seed(owned(1, "Foo", "alice"));
    server.seed(private_to(2, "Foo", "alice"));
    server.seed(owned(3, "Bar", "alice"));
    server.seed(owned(4, "Foo", "carol"));

    let res = signed(server.client.get(server.endpoint("/search?text=Foo")), "bob")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body, json!({"total": 2, "rows": [{"id": 1}, {"id": 4}]}));

    let res = signed(
        server
            .client
            .get(server.endpoint("/search?text=Foo&all_fields=1&offset=1&limit=1")),
        "alice",
    )
    .send()
    .await
    .unwrap();
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["total"], 3);
    assert_eq!(body["rows"].as_array().unwrap().len(), 1);
    assert_eq!(body["rows"][0]["id"], 2);
    assert_eq!(body["rows"][0]["text"], "Foo");
}

#[tokio::test]
async fn test_search_by_extra_field_and_limit() {
    let server = TestServer::start().await;
    for i in 1..=3 {
        let mut ann = owned(i, "x", "alice");
        ann.extras.insert("uri", json!("http://doc")).unwrap();
        server.seed(ann);
    }

    let res = signed(
        server
            .client
            .get(server.endpoint("/search?uri=http%3A%2F%2Fdoc&limit=-1")),
        "alice",
    )
    .send()
    .await
    .unwrap();
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["total"], 3);
    assert_eq!(body["rows"].as_array().unwrap().len(), 3);

    let res = signed(server.client.get(server.endpoint("/search?limit=abc")), "alice")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_cors_preflight_skips_auth() {
    let server = TestServer::start().await;

    let res = server
        .client
        .request(reqwest::Method::OPTIONS, server.endpoint("/annotations"))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let headers = res.headers();
    assert_eq!(headers["access-control-allow-origin"], "*");
    assert_eq!(headers["access-control-expose-headers"], "Location");
    assert_eq!(headers["access-control-allow-methods"], "GET, POST, PUT, DELETE");
    assert_eq!(headers["access-control-max-age"], "86400");
}

#[tokio::test]
async fn test_mountpoint_prefixes_routes() {
    let server = TestServer::start_with(TestOptions {
        mountpoint: "/store",
        ..TestOptions::default()
    })
    .await;
    assert!(server.url.ends_with("/store"));

    let res = signed(server.client.get(server.endpoint("/annotations")), "alice")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let bare = format!("http://{}/annotations", server.addr);
    let res = signed(server.client.get(bare), "alice").send().await.unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
}
