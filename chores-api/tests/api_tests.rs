/// Integration tests for the chores API
///
/// These tests drive the full router (auth guard, handlers, repositories,
/// formatter) against an in-memory database:
/// - Registration and login
/// - Token checks on protected routes
/// - Member, chore and assignment CRUD
/// - JSON/XML negotiation
/// - Search

mod common;

use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use chores_api::format::{parse_xml_items, XML_CONTENT_TYPE};
use chores_shared::auth::jwt::{create_token, Claims};
use chores_shared::models::assignment::Assignment;
use chrono::{Duration, Utc};
use common::{TestContext, TEST_SECRET};
use serde_json::{json, Value};

async fn setup() -> (TestContext, String) {
    let ctx = TestContext::new().await.unwrap();
    let token = ctx.token_for("alice", "pw1").await;
    (ctx, token)
}

async fn create_member(ctx: &TestContext, token: &str, name: &str) -> i64 {
    let res = ctx.post("/members", token, json!({ "name": name })).await;
    assert_eq!(res.status, StatusCode::CREATED, "{}", res.text());
    res.json()["member_id"].as_i64().unwrap()
}

async fn create_chore(ctx: &TestContext, token: &str, name: &str, frequency: &str) -> i64 {
    let res = ctx
        .post(
            "/chores",
            token,
            json!({ "chore_name": name, "frequency": frequency }),
        )
        .await;
    assert_eq!(res.status, StatusCode::CREATED, "{}", res.text());
    res.json()["chore_id"].as_i64().unwrap()
}

#[tokio::test]
async fn test_health_is_public() {
    let ctx = TestContext::new().await.unwrap();

    for uri in ["/", "/health"] {
        let res = ctx.request(Method::GET, uri, None, None).await;
        assert_eq!(res.status, StatusCode::OK);

        let body = res.json();
        assert_eq!(body["status"], "healthy");
        assert_eq!(body["database"], "connected");
        assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
    }
}

#[tokio::test]
async fn test_register_twice_is_conflict() {
    let ctx = TestContext::new().await.unwrap();
    let credentials = json!({ "username": "alice", "password": "pw1" });

    let first = ctx
        .request(Method::POST, "/auth/register", None, Some(credentials.clone()))
        .await;
    assert_eq!(first.status, StatusCode::CREATED);
    assert_eq!(first.json()["message"], "user registered");

    let second = ctx
        .request(Method::POST, "/auth/register", None, Some(credentials))
        .await;
    assert_eq!(second.status, StatusCode::CONFLICT);
    assert_eq!(second.json()["code"], "conflict");
}

#[tokio::test]
async fn test_register_requires_both_fields() {
    let ctx = TestContext::new().await.unwrap();

    for body in [
        json!({ "username": "alice" }),
        json!({ "password": "pw1" }),
        json!({ "username": "   ", "password": "pw1" }),
        json!({}),
    ] {
        let res = ctx
            .request(Method::POST, "/auth/register", None, Some(body.clone()))
            .await;
        assert_eq!(res.status, StatusCode::BAD_REQUEST, "{} should be rejected", body);
        assert_eq!(res.json()["code"], "bad_request");
    }

    let res = ctx
        .send(
            Request::builder()
                .method(Method::POST)
                .uri("/auth/register")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from("{\"username\":"))
                .unwrap(),
        )
        .await;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_login_failures_are_identical() {
    let (ctx, _) = setup().await;

    let wrong_password = ctx
        .request(
            Method::POST,
            "/auth/login",
            None,
            Some(json!({ "username": "alice", "password": "wrong" })),
        )
        .await;
    let unknown_user = ctx
        .request(
            Method::POST,
            "/auth/login",
            None,
            Some(json!({ "username": "nobody", "password": "pw1" })),
        )
        .await;

    assert_eq!(wrong_password.status, StatusCode::UNAUTHORIZED);
    assert_eq!(unknown_user.status, StatusCode::UNAUTHORIZED);
    assert_eq!(wrong_password.body, unknown_user.body);
}

#[tokio::test]
async fn test_login_response_shape() {
    let ctx = TestContext::new().await.unwrap();
    ctx.token_for("alice", "pw1").await;

    let res = ctx
        .request(
            Method::POST,
            "/auth/login",
            None,
            Some(json!({ "username": "alice", "password": "pw1" })),
        )
        .await;
    assert_eq!(res.status, StatusCode::OK);

    let body = res.json();
    assert!(body["token"].as_str().unwrap().split('.').count() == 3);
    assert_eq!(body["token_type"], "Bearer");
    assert!(body["expires_at"].is_string());
}

#[tokio::test]
async fn test_form_login() {
    let ctx = TestContext::new().await.unwrap();
    ctx.token_for("alice", "pw1").await;

    let res = ctx
        .send(
            Request::builder()
                .method(Method::POST)
                .uri("/auth/login")
                .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
                .body(Body::from("username=alice&password=pw1"))
                .unwrap(),
        )
        .await;
    assert_eq!(res.status, StatusCode::OK, "{}", res.text());
}

#[tokio::test]
async fn test_protected_routes_require_token() {
    let ctx = TestContext::new().await.unwrap();

    let res = ctx.request(Method::GET, "/members", None, None).await;
    assert_eq!(res.status, StatusCode::UNAUTHORIZED);
    assert_eq!(res.json()["error"], "token missing");

    let res = ctx
        .send(
            Request::builder()
                .uri("/chores")
                .header(header::AUTHORIZATION, "Basic YWxpY2U6cHcx")
                .body(Body::empty())
                .unwrap(),
        )
        .await;
    assert_eq!(res.status, StatusCode::UNAUTHORIZED);
    assert_eq!(res.json()["error"], "invalid token");

    let res = ctx.get("/assignments", "garbage.token.value").await;
    assert_eq!(res.status, StatusCode::UNAUTHORIZED);
    assert_eq!(res.json()["error"], "invalid token");

    let res = ctx
        .request(Method::GET, "/api/search?q=dish", None, None)
        .await;
    assert_eq!(res.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_token_accepted_before_expiry_and_rejected_after() {
    let ctx = TestContext::new().await.unwrap();
    let ttl = ctx.config.token_ttl();
    let now = Utc::now().timestamp();

    // Issued just now: well inside its lifetime
    let fresh = create_token(&Claims::issued_at("alice", now, ttl), TEST_SECRET).unwrap();
    assert_eq!(ctx.get("/members", &fresh).await.status, StatusCode::OK);

    // Issued exactly one TTL ago: expiry is now, so it is already rejected
    let at_expiry = create_token(
        &Claims::issued_at("alice", now - ttl.num_seconds(), ttl),
        TEST_SECRET,
    )
    .unwrap();
    let res = ctx.get("/members", &at_expiry).await;
    assert_eq!(res.status, StatusCode::UNAUTHORIZED);
    assert_eq!(res.json()["error"], "token expired");

    let long_gone = create_token(
        &Claims::issued_at("alice", now - Duration::days(1).num_seconds(), ttl),
        TEST_SECRET,
    )
    .unwrap();
    assert_eq!(
        ctx.get("/members", &long_gone).await.status,
        StatusCode::UNAUTHORIZED
    );
}

#[tokio::test]
async fn test_token_signed_with_other_secret_is_rejected() {
    let ctx = TestContext::new().await.unwrap();
    let forged = create_token(
        &Claims::new("alice", Duration::hours(2)),
        "another-secret-that-is-32-characters-long",
    )
    .unwrap();

    let res = ctx.get("/members", &forged).await;
    assert_eq!(res.status, StatusCode::UNAUTHORIZED);
    assert_eq!(res.json()["error"], "invalid token");
}

#[tokio::test]
async fn test_end_to_end_scenario() {
    let ctx = TestContext::new().await.unwrap();

    let register = ctx
        .request(
            Method::POST,
            "/auth/register",
            None,
            Some(json!({ "username": "alice", "password": "pw1" })),
        )
        .await;
    assert_eq!(register.status, StatusCode::CREATED);

    let login = ctx
        .request(
            Method::POST,
            "/auth/login",
            None,
            Some(json!({ "username": "alice", "password": "pw1" })),
        )
        .await;
    assert_eq!(login.status, StatusCode::OK);
    let token = login.json()["token"].as_str().unwrap().to_string();

    let member_id = create_member(&ctx, &token, "Bob").await;
    let chore_id = create_chore(&ctx, &token, "Dishes", "Daily").await;

    let created = ctx
        .post(
            "/assignments",
            &token,
            json!({ "member_id": member_id, "chore_id": chore_id, "assigned_date": "2025-01-10" }),
        )
        .await;
    assert_eq!(created.status, StatusCode::CREATED, "{}", created.text());
    let created = created.json();
    let assignment_id = created["assignment_id"].as_i64().unwrap();
    assert_eq!(created["is_completed"], false);

    let uri = format!("/assignments/{}", assignment_id);
    let updated = ctx.put(&uri, &token, json!({ "is_completed": true })).await;
    assert_eq!(updated.status, StatusCode::OK);

    let fetched = ctx.get(&uri, &token).await;
    assert_eq!(fetched.status, StatusCode::OK);
    assert_eq!(fetched.json()["is_completed"], true);

    let deleted = ctx.delete(&uri, &token).await;
    assert_eq!(deleted.status, StatusCode::NO_CONTENT);
    assert!(deleted.body.is_empty());

    let gone = ctx.get(&uri, &token).await;
    assert_eq!(gone.status, StatusCode::NOT_FOUND);
    assert_eq!(gone.json()["code"], "not_found");
}

#[tokio::test]
async fn test_assignment_with_missing_member_inserts_nothing() {
    let (ctx, token) = setup().await;
    let member_id = create_member(&ctx, &token, "Bob").await;
    let chore_id = create_chore(&ctx, &token, "Dishes", "Daily").await;

    let before = ctx.get("/assignments", &token).await.json()["assignments"]
        .as_array()
        .unwrap()
        .len();

    let res = ctx
        .post(
            "/assignments",
            &token,
            json!({ "member_id": member_id + 100, "chore_id": chore_id, "assigned_date": "2025-01-10" }),
        )
        .await;
    assert_eq!(res.status, StatusCode::NOT_FOUND);
    assert_eq!(res.json()["error"], "member not found");

    let res = ctx
        .post(
            "/assignments",
            &token,
            json!({ "member_id": member_id, "chore_id": chore_id + 100, "assigned_date": "2025-01-10" }),
        )
        .await;
    assert_eq!(res.status, StatusCode::NOT_FOUND);
    assert_eq!(res.json()["error"], "chore not found");

    let after = ctx.get("/assignments", &token).await.json()["assignments"]
        .as_array()
        .unwrap()
        .len();
    assert_eq!(before, after);
    assert_eq!(Assignment::count(&ctx.db).await.unwrap(), 0);
}

#[tokio::test]
async fn test_assignment_create_validation() {
    let (ctx, token) = setup().await;
    let member_id = create_member(&ctx, &token, "Bob").await;
    let chore_id = create_chore(&ctx, &token, "Dishes", "Daily").await;

    for body in [
        json!({ "member_id": member_id, "chore_id": chore_id }),
        json!({ "member_id": member_id, "assigned_date": "2025-01-10" }),
        json!({ "member_id": member_id, "chore_id": chore_id, "assigned_date": "10/01/2025" }),
        json!({ "member_id": member_id, "chore_id": chore_id, "assigned_date": "2025-02-30" }),
        json!({ "member_id": "bob", "chore_id": chore_id, "assigned_date": "2025-01-10" }),
    ] {
        let res = ctx.post("/assignments", &token, body.clone()).await;
        assert_eq!(res.status, StatusCode::BAD_REQUEST, "{} should be rejected", body);
    }
}

#[tokio::test]
async fn test_partial_update_changes_only_supplied_field() {
    let (ctx, token) = setup().await;
    let member_id = create_member(&ctx, &token, "Bob").await;
    let chore_id = create_chore(&ctx, &token, "Dishes", "Daily").await;

    let created = ctx
        .post(
            "/assignments",
            &token,
            json!({ "member_id": member_id, "chore_id": chore_id, "assigned_date": "2025-01-10" }),
        )
        .await
        .json();
    let uri = format!("/assignments/{}", created["assignment_id"]);

    let updated = ctx.put(&uri, &token, json!({ "is_completed": true })).await;
    assert_eq!(updated.status, StatusCode::OK);

    let fetched = ctx.get(&uri, &token).await.json();
    assert_eq!(fetched["is_completed"], true);
    assert_eq!(fetched["member_id"], created["member_id"]);
    assert_eq!(fetched["chore_id"], created["chore_id"]);
    assert_eq!(fetched["assigned_date"], created["assigned_date"]);

    // No recognized fields: no-op returning the current record
    let noop = ctx.put(&uri, &token, json!({ "unknown": 1 })).await;
    assert_eq!(noop.status, StatusCode::OK);
    assert_eq!(noop.json(), fetched);

    let bad_date = ctx.put(&uri, &token, json!({ "assigned_date": "tomorrow" })).await;
    assert_eq!(bad_date.status, StatusCode::BAD_REQUEST);

    let missing = ctx
        .put("/assignments/9999", &token, json!({ "is_completed": true }))
        .await;
    assert_eq!(missing.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_xml_round_trip_matches_json() {
    let (ctx, token) = setup().await;
    let member_id = create_member(&ctx, &token, "Bob & Co").await;
    let chore_id = create_chore(&ctx, &token, "Dishes", "Daily").await;
    let created = ctx
        .post(
            "/assignments",
            &token,
            json!({
                "member_id": member_id,
                "chore_id": chore_id,
                "assigned_date": "2025-01-10",
                "is_completed": true
            }),
        )
        .await
        .json();

    for uri in [
        format!("/members/{}", member_id),
        format!("/chores/{}", chore_id),
        format!("/assignments/{}", created["assignment_id"]),
    ] {
        let json_form = ctx.get(&uri, &token).await.json();

        let xml_res = ctx.get(&format!("{}?format=xml", uri), &token).await;
        assert_eq!(xml_res.status, StatusCode::OK);
        assert_eq!(xml_res.headers[header::CONTENT_TYPE], XML_CONTENT_TYPE);

        let (_, items) = parse_xml_items(&xml_res.text()).unwrap();
        assert_eq!(items.len(), 1);

        let fields = json_form.as_object().unwrap();
        assert_eq!(items[0].len(), fields.len());
        for (name, value) in fields {
            let expected = match value {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            assert_eq!(items[0][name], expected, "field {} of {}", name, uri);
        }
    }
}

#[tokio::test]
async fn test_xml_collections_and_accept_header() {
    let (ctx, token) = setup().await;
    create_member(&ctx, &token, "Bob").await;
    create_member(&ctx, &token, "Alice").await;

    let res = ctx
        .send(
            Request::builder()
                .uri("/members")
                .header(header::AUTHORIZATION, format!("Bearer {}", token))
                .header(header::ACCEPT, "application/xml")
                .body(Body::empty())
                .unwrap(),
        )
        .await;
    assert_eq!(res.status, StatusCode::OK);

    let (root, items) = parse_xml_items(&res.text()).unwrap();
    assert_eq!(root, "members");
    assert_eq!(items.len(), 2);
    assert_eq!(items[0]["name"], "Bob");
    assert_eq!(items[1]["name"], "Alice");

    // Query parameter wins over Accept
    let res = ctx
        .send(
            Request::builder()
                .uri("/members?format=json")
                .header(header::AUTHORIZATION, format!("Bearer {}", token))
                .header(header::ACCEPT, "application/xml")
                .body(Body::empty())
                .unwrap(),
        )
        .await;
    assert_eq!(res.json()["members"].as_array().unwrap().len(), 2);

    let res = ctx.get("/members?format=yaml", &token).await;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_errors_stay_json_when_xml_requested() {
    let (ctx, token) = setup().await;

    let res = ctx.get("/members/12345?format=xml", &token).await;
    assert_eq!(res.status, StatusCode::NOT_FOUND);
    assert_eq!(res.json()["error"], "member not found");
}

#[tokio::test]
async fn test_member_crud_and_conflicts() {
    let (ctx, token) = setup().await;
    let bob = create_member(&ctx, &token, "Bob").await;

    let duplicate = ctx.post("/members", &token, json!({ "name": "Bob" })).await;
    assert_eq!(duplicate.status, StatusCode::CONFLICT);

    let blank = ctx.post("/members", &token, json!({ "name": "  " })).await;
    assert_eq!(blank.status, StatusCode::BAD_REQUEST);

    let uri = format!("/members/{}", bob);
    let renamed = ctx.put(&uri, &token, json!({ "name": "Robert" })).await;
    assert_eq!(renamed.status, StatusCode::OK);
    assert_eq!(renamed.json()["name"], "Robert");

    let blank_put = ctx.put(&uri, &token, json!({ "name": "" })).await;
    assert_eq!(blank_put.status, StatusCode::BAD_REQUEST);

    let search = ctx.get("/members?q=rob", &token).await.json();
    assert_eq!(search["members"].as_array().unwrap().len(), 1);

    assert_eq!(ctx.delete(&uri, &token).await.status, StatusCode::NO_CONTENT);
    assert_eq!(ctx.delete(&uri, &token).await.status, StatusCode::NOT_FOUND);
    assert_eq!(ctx.get(&uri, &token).await.status, StatusCode::NOT_FOUND);

    let bad_id = ctx.get("/members/abc", &token).await;
    assert_eq!(bad_id.status, StatusCode::BAD_REQUEST);
    assert_eq!(bad_id.json()["code"], "bad_request");
}

#[tokio::test]
async fn test_referenced_member_and_chore_delete_is_conflict() {
    let (ctx, token) = setup().await;
    let member_id = create_member(&ctx, &token, "Bob").await;
    let chore_id = create_chore(&ctx, &token, "Dishes", "Daily").await;
    let created = ctx
        .post(
            "/assignments",
            &token,
            json!({ "member_id": member_id, "chore_id": chore_id, "assigned_date": "2025-01-10" }),
        )
        .await;
    assert_eq!(created.status, StatusCode::CREATED);

    let res = ctx.delete(&format!("/members/{}", member_id), &token).await;
    assert_eq!(res.status, StatusCode::CONFLICT);

    let res = ctx.delete(&format!("/chores/{}", chore_id), &token).await;
    assert_eq!(res.status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_chore_form_create_and_partial_update() {
    let (ctx, token) = setup().await;

    let res = ctx
        .form(
            Method::POST,
            "/chores",
            &token,
            "chore_name=Take+out+trash&frequency=Weekly",
        )
        .await;
    assert_eq!(res.status, StatusCode::CREATED, "{}", res.text());
    let chore = res.json();
    assert_eq!(chore["chore_name"], "Take out trash");

    let missing_frequency = ctx
        .post("/chores", &token, json!({ "chore_name": "Vacuum" }))
        .await;
    assert_eq!(missing_frequency.status, StatusCode::BAD_REQUEST);

    let uri = format!("/chores/{}", chore["chore_id"]);
    let res = ctx.form(Method::PUT, &uri, &token, "frequency=Daily").await;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.json()["chore_name"], "Take out trash");
    assert_eq!(res.json()["frequency"], "Daily");
}

#[tokio::test]
async fn test_assignment_list_filters() {
    let (ctx, token) = setup().await;
    let bob = create_member(&ctx, &token, "Bob").await;
    let alice = create_member(&ctx, &token, "Alice").await;
    let dishes = create_chore(&ctx, &token, "Dishes", "Daily").await;

    for (member_id, date) in [(bob, "2025-01-10"), (alice, "2025-01-11"), (bob, "2025-01-20")] {
        let res = ctx
            .post(
                "/assignments",
                &token,
                json!({ "member_id": member_id, "chore_id": dishes, "assigned_date": date }),
            )
            .await;
        assert_eq!(res.status, StatusCode::CREATED);
    }

    let count = |body: Value| body["assignments"].as_array().unwrap().len();

    let res = ctx
        .get(&format!("/assignments?member_id={}", bob), &token)
        .await;
    assert_eq!(count(res.json()), 2);

    let res = ctx
        .get("/assignments?date_from=2025-01-10&date_to=2025-01-11", &token)
        .await;
    assert_eq!(count(res.json()), 2);

    let res = ctx.get("/assignments?completed=true", &token).await;
    assert_eq!(count(res.json()), 0);

    let res = ctx.get("/assignments?q=ali", &token).await;
    assert_eq!(count(res.json()), 1);

    for bad in [
        "/assignments?member_id=bob",
        "/assignments?date_from=yesterday",
        "/assignments?completed=perhaps",
    ] {
        assert_eq!(ctx.get(bad, &token).await.status, StatusCode::BAD_REQUEST, "{}", bad);
    }
}

#[tokio::test]
async fn test_search_with_no_match_is_empty_ok() {
    let (ctx, token) = setup().await;
    create_chore(&ctx, &token, "Dishes", "Daily").await;

    let res = ctx.get("/api/search?q=zzz", &token).await;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.json(), json!({ "results": [] }));

    let res = ctx.get("/chores?q=zzz", &token).await;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.json(), json!({ "chores": [] }));
}

#[tokio::test]
async fn test_search_get_and_post() {
    let (ctx, token) = setup().await;
    create_chore(&ctx, &token, "Dishes", "Daily").await;
    create_chore(&ctx, &token, "Laundry", "Weekly").await;

    let res = ctx.get("/api/search?q=DISH", &token).await;
    assert_eq!(res.status, StatusCode::OK);
    let results = res.json()["results"].as_array().unwrap().clone();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0]["chore_name"], "Dishes");

    let res = ctx.post("/api/search", &token, json!({ "q": "laun" })).await;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.json()["results"][0]["chore_name"], "Laundry");

    let res = ctx.get("/api/search", &token).await;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);
    assert_eq!(res.json()["error"], "q required");

    let res = ctx.post("/api/search", &token, json!({ "q": "  " })).await;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_unknown_route_is_json_404() {
    let ctx = TestContext::new().await.unwrap();

    let res = ctx.request(Method::GET, "/nope", None, None).await;
    assert_eq!(res.status, StatusCode::NOT_FOUND);
    assert_eq!(res.json()["code"], "not_found");
}
