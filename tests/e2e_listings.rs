//! E2E tests for listing submission, browsing and editing

mod common;

use common::TestServer;
use serde_json::{Value, json};
use visit_iraq::data::Role;

const REDACTED_FIELDS: [&str; 7] = [
    "host_id",
    "contact_phone",
    "contact_email",
    "full_address",
    "external_link",
    "price_range",
    "rejection_reason",
];

async fn get_json(server: &TestServer, path: &str, token: Option<&str>) -> (u16, Value) {
    let mut request = server.client.get(server.url(path));
    if let Some(token) = token {
        request = request.bearer_auth(token);
    }
    let response = request.send().await.unwrap();
    let status = response.status().as_u16();
    let body = response.json().await.unwrap_or(Value::Null);
    (status, body)
}

async fn patch_listing(server: &TestServer, id: &str, token: &str, body: Value) -> reqwest::Response {
    server
        .client
        .patch(server.url(&format!("/api/listings/{id}")))
        .bearer_auth(token)
        .json(&body)
        .send()
        .await
        .unwrap()
}

#[tokio::test]
async fn test_created_listing_is_pending_and_owned_by_caller() {
    let server = TestServer::new().await;
    let host = server.host("host-1").await;

    let listing = server.create_listing(&host, json!({})).await;

    assert_eq!(listing["status"], "pending");
    assert_eq!(listing["host_id"], "host-1");
    assert_eq!(listing["rejection_reason"], Value::Null);
    assert_eq!(listing["thumbnail"], "a.jpg");
    assert_eq!(listing["type"], "accommodation");
}

#[tokio::test]
async fn test_create_rejects_status_field() {
    let server = TestServer::new().await;
    let host = server.host("host-1").await;

    let mut body = common::listing_body();
    body["status"] = json!("approved");

    let response = server
        .client
        .post(server.url("/api/listings"))
        .bearer_auth(&host)
        .json(&body)
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 400);
}

#[tokio::test]
async fn test_create_requires_authentication() {
    let server = TestServer::new().await;

    let response = server
        .client
        .post(server.url("/api/listings"))
        .json(&common::listing_body())
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 401);
}

#[tokio::test]
async fn test_plain_user_cannot_create() {
    let server = TestServer::new().await;
    let user = server.user_with_role("user-1", Role::User).await;

    let response = server
        .client
        .post(server.url("/api/listings"))
        .bearer_auth(&user)
        .json(&common::listing_body())
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 403);
}

#[tokio::test]
async fn test_create_reports_missing_fields() {
    let server = TestServer::new().await;
    let host = server.host("host-1").await;

    let response = server
        .client
        .post(server.url("/api/listings"))
        .bearer_auth(&host)
        .json(&json!({ "type": "tour", "title": "Marshes boat trip" }))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 400);
    let body: Value = response.json().await.unwrap();
    let message = body["error"].as_str().unwrap();
    assert!(message.contains("description"));
    assert!(message.contains("region"));
}

#[tokio::test]
async fn test_create_rejects_unknown_price_range() {
    let server = TestServer::new().await;
    let host = server.host("host-1").await;

    let mut body = common::listing_body();
    body["price_range"] = json!("priceless");

    let response = server
        .client
        .post(server.url("/api/listings"))
        .bearer_auth(&host)
        .json(&body)
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 400);
}

#[tokio::test]
async fn test_anonymous_view_of_approved_listing_is_redacted() {
    let server = TestServer::new().await;
    let host = server.host("host-1").await;
    let id = server.approved_listing(&host, json!({})).await;

    let (status, body) = get_json(&server, &format!("/api/listings/{id}"), None).await;

    assert_eq!(status, 200);
    assert_eq!(body["is_authenticated"], false);
    let listing = body["listing"].as_object().unwrap();
    for field in REDACTED_FIELDS {
        assert!(!listing.contains_key(field), "{field} must be redacted");
    }
    assert_eq!(listing["title"], "Tigris Riverside Guesthouse");
    assert_eq!(listing["city"], "Baghdad");
    assert_eq!(listing["status"], "approved");
}

#[tokio::test]
async fn test_authenticated_view_of_approved_listing_is_full() {
    let server = TestServer::new().await;
    let host = server.host("host-1").await;
    let visitor = server.user_with_role("visitor", Role::User).await;
    let id = server.approved_listing(&host, json!({})).await;

    let (status, body) = get_json(&server, &format!("/api/listings/{id}"), Some(&visitor)).await;

    assert_eq!(status, 200);
    assert_eq!(body["is_authenticated"], true);
    assert_eq!(body["listing"]["contact_phone"], "+964 770 000 0000");
    assert_eq!(body["listing"]["host_id"], "host-1");
}

#[tokio::test]
async fn test_non_approved_listing_is_hidden_from_others() {
    let server = TestServer::new().await;
    let host = server.host("host-1").await;
    let visitor = server.user_with_role("visitor", Role::User).await;
    let listing = server.create_listing(&host, json!({})).await;
    let path = format!("/api/listings/{}", listing["id"].as_str().unwrap());

    let (anonymous, _) = get_json(&server, &path, None).await;
    assert_eq!(anonymous, 404);

    let (other, _) = get_json(&server, &path, Some(&visitor)).await;
    assert_eq!(other, 404);

    let (owner, body) = get_json(&server, &path, Some(&host)).await;
    assert_eq!(owner, 200);
    assert_eq!(body["listing"]["status"], "pending");

    let response = server
        .client
        .get(server.url(&path))
        .header("Cookie", server.admin_cookie())
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
}

#[tokio::test]
async fn test_unknown_listing_is_not_found() {
    let server = TestServer::new().await;

    let (status, body) = get_json(&server, "/api/listings/01HZZZZZZZZZZZZZZZZZZZZZZZ", None).await;

    assert_eq!(status, 404);
    assert_eq!(body["error"], "Resource not found");
}

#[tokio::test]
async fn test_public_list_only_returns_approved() {
    let server = TestServer::new().await;
    let host = server.host("host-1").await;
    let approved = server.approved_listing(&host, json!({})).await;
    server.create_listing(&host, json!({ "title": "Still pending" })).await;

    let (status, body) = get_json(&server, "/api/listings", None).await;

    assert_eq!(status, 200);
    let listings = body["listings"].as_array().unwrap();
    assert_eq!(listings.len(), 1);
    assert_eq!(listings[0]["id"], approved.as_str());
    assert!(listings[0].get("contact_email").is_none());
}

#[tokio::test]
async fn test_public_list_filters_are_conjunctive() {
    let server = TestServer::new().await;
    let host = server.host("host-1").await;
    let erbil_tour = server
        .approved_listing(
            &host,
            json!({ "type": "tour", "city": "Erbil", "title": "Citadel walking tour" }),
        )
        .await;
    server
        .approved_listing(&host, json!({ "type": "tour", "city": "Basra" }))
        .await;
    server
        .approved_listing(&host, json!({ "type": "restaurant", "city": "Erbil" }))
        .await;

    let (_, body) = get_json(&server, "/api/listings?type=tour&city=Erbil", None).await;
    let listings = body["listings"].as_array().unwrap();
    assert_eq!(listings.len(), 1);
    assert_eq!(listings[0]["id"], erbil_tour.as_str());

    let (_, body) = get_json(&server, "/api/listings?search=citadel", None).await;
    let listings = body["listings"].as_array().unwrap();
    assert_eq!(listings.len(), 1);
    assert_eq!(listings[0]["id"], erbil_tour.as_str());

    let (status, _) = get_json(&server, "/api/listings?type=spaceship", None).await;
    assert_eq!(status, 400);
}

#[tokio::test]
async fn test_all_flag_is_honoured_only_for_admins() {
    let server = TestServer::new().await;
    let host = server.host("host-1").await;
    server.approved_listing(&host, json!({})).await;
    server.create_listing(&host, json!({})).await;

    let (_, body) = get_json(&server, "/api/listings?all=true", Some(&host)).await;
    assert_eq!(body["listings"].as_array().unwrap().len(), 1);

    let response = server
        .client
        .get(server.url("/api/listings?all=true"))
        .header("Cookie", server.admin_cookie())
        .send()
        .await
        .unwrap();
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["listings"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn test_host_listings_returns_only_own() {
    let server = TestServer::new().await;
    let host = server.host("host-1").await;
    let other = server.host("host-2").await;
    let user = server.user_with_role("user-1", Role::User).await;
    server.create_listing(&host, json!({})).await;
    server.create_listing(&host, json!({})).await;
    server.create_listing(&other, json!({})).await;

    let (status, body) = get_json(&server, "/api/listings/host", Some(&host)).await;
    assert_eq!(status, 200);
    let listings = body["listings"].as_array().unwrap();
    assert_eq!(listings.len(), 2);
    assert!(listings.iter().all(|l| l["host_id"] == "host-1"));

    let (status, _) = get_json(&server, "/api/listings/host", Some(&user)).await;
    assert_eq!(status, 403);
}

#[tokio::test]
async fn test_thumbnail_follows_image_removal() {
    let server = TestServer::new().await;
    let host = server.host("host-1").await;
    let listing = server.create_listing(&host, json!({})).await;
    let id = listing["id"].as_str().unwrap();
    assert_eq!(listing["thumbnail"], "a.jpg");

    let response = patch_listing(&server, id, &host, json!({ "images": ["b.jpg"] })).await;

    assert_eq!(response.status(), 200);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["listing"]["thumbnail"], "b.jpg");
    assert_eq!(body["listing"]["status"], "pending");
}

#[tokio::test]
async fn test_explicit_thumbnail_survives_image_edit() {
    let server = TestServer::new().await;
    let host = server.host("host-1").await;
    let listing = server
        .create_listing(&host, json!({ "thumbnail": "cover.jpg" }))
        .await;
    let id = listing["id"].as_str().unwrap();
    assert_eq!(listing["thumbnail"], "cover.jpg");

    let response = patch_listing(&server, id, &host, json!({ "images": ["c.jpg"] })).await;

    assert_eq!(response.status(), 200);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["listing"]["thumbnail"], "cover.jpg");
    assert_eq!(body["listing"]["images"], json!(["c.jpg"]));
}

#[tokio::test]
async fn test_host_cannot_edit_approved_listing() {
    let server = TestServer::new().await;
    let host = server.host("host-1").await;
    let id = server.approved_listing(&host, json!({})).await;

    let response = patch_listing(&server, &id, &host, json!({ "title": "Sneaky edit" })).await;
    assert_eq!(response.status(), 403);

    let stored = server.state.db.get_listing(&id).await.unwrap().unwrap();
    assert_eq!(stored.title, "Tigris Riverside Guesthouse");
    assert_eq!(stored.status.as_str(), "approved");
}

#[tokio::test]
async fn test_non_owner_cannot_edit_or_delete() {
    let server = TestServer::new().await;
    let host = server.host("host-1").await;
    let other = server.host("host-2").await;
    let listing = server.create_listing(&host, json!({})).await;
    let id = listing["id"].as_str().unwrap();

    let response = patch_listing(&server, id, &other, json!({ "title": "Mine now" })).await;
    assert_eq!(response.status(), 403);

    let response = server
        .client
        .delete(server.url(&format!("/api/listings/{id}")))
        .bearer_auth(&other)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 403);
}

#[tokio::test]
async fn test_rejected_listing_returns_to_pending_after_host_edit() {
    let server = TestServer::new().await;
    let host = server.host("host-1").await;
    let listing = server.create_listing(&host, json!({})).await;
    let id = listing["id"].as_str().unwrap();

    let response = server
        .moderate(id, "reject", json!({ "reason": "Low-quality photos" }))
        .await;
    assert_eq!(response.status(), 200);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["listing"]["status"], "rejected");
    assert_eq!(body["listing"]["rejection_reason"], "Low-quality photos");

    let response = patch_listing(
        &server,
        id,
        &host,
        json!({
            "images": ["c.jpg"],
            "status": "approved",
            "rejection_reason": "keep me"
        }),
    )
    .await;

    assert_eq!(response.status(), 200);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["listing"]["status"], "pending");
    assert_eq!(body["listing"]["rejection_reason"], Value::Null);
    assert_eq!(body["listing"]["thumbnail"], "c.jpg");
}

#[tokio::test]
async fn test_patch_rejects_unknown_fields() {
    let server = TestServer::new().await;
    let host = server.host("host-1").await;
    let listing = server.create_listing(&host, json!({})).await;

    let response = patch_listing(
        &server,
        listing["id"].as_str().unwrap(),
        &host,
        json!({ "host_id": "host-2" }),
    )
    .await;

    assert_eq!(response.status(), 400);
}

#[tokio::test]
async fn test_owner_deletes_listing() {
    let server = TestServer::new().await;
    let host = server.host("host-1").await;
    let listing = server.create_listing(&host, json!({})).await;
    let id = listing["id"].as_str().unwrap();

    let response = server
        .client
        .delete(server.url(&format!("/api/listings/{id}")))
        .bearer_auth(&host)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["success"], true);

    let (status, _) = get_json(&server, &format!("/api/listings/{id}"), Some(&host)).await;
    assert_eq!(status, 404);
}
