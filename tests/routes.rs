use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::body::{to_bytes, Body};
use axum::extract::State;
use axum::http::{header, Request, StatusCode};
use axum::response::Response;
use axum::routing::post;
use axum::{Json, Router};
use base64::{engine::general_purpose, Engine as _};
use chrono::NaiveDate;
use sqlx::SqlitePool;
use tempfile::TempDir;
use tower::ServiceExt;

use lbw::config::MailConfig;
use lbw::database::{activity_repo, lbw_repo, message_repo, registration_repo};
use lbw::services::notification_service::Mailer;
use lbw::web::{router, AppState};

struct TestApp {
    router: Router,
    pool: SqlitePool,
    _attachments: TempDir,
}

async fn test_app() -> TestApp {
    test_app_with(Mailer::disabled()).await
}

async fn test_app_with(mailer: Mailer) -> TestApp {
    let pool = lbw::database::connect("sqlite::memory:").await.unwrap();
    let attachments = TempDir::new().unwrap();
    let state = AppState {
        pool: pool.clone(),
        mailer,
        attachment_dir: Arc::new(PathBuf::from(attachments.path())),
    };
    TestApp {
        router: router(state),
        pool,
        _attachments: attachments,
    }
}

fn cookie_for(user_id: &str) -> String {
    let payload = format!(r#"{{"sub":"{0}","name":"{0} tester"}}"#, user_id);
    format!(
        "access_token=e30.{}.sig",
        general_purpose::URL_SAFE_NO_PAD.encode(payload)
    )
}

fn get(uri: &str, user: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method("GET").uri(uri);
    if let Some(user) = user {
        builder = builder.header(header::COOKIE, cookie_for(user));
    }
    builder.body(Body::empty()).unwrap()
}

fn post_form(uri: &str, user: Option<&str>, body: &str) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded");
    if let Some(user) = user {
        builder = builder.header(header::COOKIE, cookie_for(user));
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

fn post_ajax(uri: &str, user: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::COOKIE, cookie_for(user))
        .header("x-requested-with", "XMLHttpRequest")
        .body(Body::empty())
        .unwrap()
}

fn upload(uri: &str, user: Option<&str>, file_name: &str, contents: &str) -> Request<Body> {
    let boundary = "lbw-test-boundary";
    let body = format!(
        "--{b}\r\nContent-Disposition: form-data; name=\"attachment\"; filename=\"{f}\"\r\nContent-Type: text/plain\r\n\r\n{c}\r\n--{b}--\r\n",
        b = boundary,
        f = file_name,
        c = contents
    );
    let mut builder = Request::builder().method("POST").uri(uri).header(
        header::CONTENT_TYPE,
        format!("multipart/form-data; boundary={}", boundary),
    );
    if let Some(user) = user {
        builder = builder.header(header::COOKIE, cookie_for(user));
    }
    builder.body(Body::from(body)).unwrap()
}

impl TestApp {
    async fn send(&self, request: Request<Body>) -> Response {
        self.router.clone().oneshot(request).await.unwrap()
    }

    /// Signs the user in once so the middleware records them.
    async fn visit(&self, user: &str) {
        let res = self.send(get("/", Some(user))).await;
        assert_eq!(res.status(), StatusCode::OK);
    }

    async fn propose_lbw(&self, user: &str, name: &str) -> i64 {
        let body = format!(
            "short_name={}&location=Utrecht&start_date=2026-10-01&end_date=2026-10-04&description=Hacking",
            name
        );
        let res = self.send(post_form("/lbw/propose", Some(user), &body)).await;
        assert_eq!(res.status(), StatusCode::SEE_OTHER);
        let location = location(&res);
        location
            .trim_start_matches("/lbw/")
            .parse()
            .unwrap_or_else(|_| panic!("unexpected redirect {}", location))
    }

    async fn propose_activity(&self, user: &str, lbw_id: i64, name: &str) -> i64 {
        let uri = format!("/lbw/{}/activities/propose", lbw_id);
        let body = format!("short_name={}&duration_minutes=90&description=Bring+boots", name);
        let res = self.send(post_form(&uri, Some(user), &body)).await;
        assert_eq!(res.status(), StatusCode::SEE_OTHER);
        assert_eq!(location(&res), format!("/lbw/{}/activities", lbw_id));
        activity_repo::list_activities(&self.pool, lbw_id)
            .await
            .unwrap()
            .into_iter()
            .find(|a| a.short_name == name)
            .map(|a| a.activity_id)
            .unwrap()
    }
}

fn location(res: &Response) -> String {
    res.headers()
        .get(header::LOCATION)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string()
}

async fn body_text(res: Response) -> String {
    let bytes = to_bytes(res.into_body(), usize::MAX).await.unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

#[tokio::test]
async fn anonymous_visitor_can_browse_but_not_propose() {
    let app = test_app().await;
    let res = app.send(get("/", None)).await;
    assert_eq!(res.status(), StatusCode::OK);

    let res = app
        .send(post_form("/lbw/propose", None, "short_name=X"))
        .await;
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(body_text(res).await, "Unauthorized - Please login");

    let res = app.send(get("/lbw/propose", None)).await;
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn proposing_an_lbw_makes_the_proposer_its_owner() {
    let app = test_app().await;
    let lbw_id = app.propose_lbw("alice", "Autumn").await;

    let owners = lbw_repo::list_owners(&app.pool, lbw_id).await.unwrap();
    assert_eq!(owners.len(), 1);
    assert_eq!(owners[0].user_id, "alice");

    let res = app.send(get(&format!("/lbw/{}", lbw_id), Some("alice"))).await;
    assert_eq!(res.status(), StatusCode::OK);
    let html = body_text(res).await;
    assert!(html.contains("Autumn"));
    assert!(html.contains(&format!("/lbw/{}/update", lbw_id)));
}

#[tokio::test]
async fn lbw_form_errors_are_rendered_and_nothing_is_stored() {
    let app = test_app().await;
    let body = "short_name=Backwards&start_date=2026-10-04&end_date=2026-10-01";
    let res = app.send(post_form("/lbw/propose", Some("alice"), body)).await;
    assert_eq!(res.status(), StatusCode::OK);
    assert!(lbw_repo::list_lbws(&app.pool).await.unwrap().is_empty());
}

#[tokio::test]
async fn unknown_owner_ids_are_rejected() {
    let app = test_app().await;
    let body = "short_name=Team&start_date=2026-10-01&end_date=2026-10-02&owner_ids=ghost";
    let res = app.send(post_form("/lbw/propose", Some("alice"), body)).await;
    assert_eq!(res.status(), StatusCode::OK);
    assert!(body_text(res).await.contains("Unknown users: ghost"));
    assert!(lbw_repo::list_lbws(&app.pool).await.unwrap().is_empty());
}

#[tokio::test]
async fn missing_lbw_is_not_found() {
    let app = test_app().await;
    let res = app.send(get("/lbw/42", None)).await;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
    let res = app.send(get("/lbw/42/activities", None)).await;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn non_owner_cannot_update_an_lbw() {
    let app = test_app().await;
    let lbw_id = app.propose_lbw("alice", "Original").await;

    let uri = format!("/lbw/{}/update", lbw_id);
    let res = app.send(get(&uri, Some("bob"))).await;
    assert_eq!(res.status(), StatusCode::SEE_OTHER);

    let body = "short_name=Hijacked&start_date=2026-10-01&end_date=2026-10-02";
    let res = app.send(post_form(&uri, Some("bob"), body)).await;
    assert_eq!(res.status(), StatusCode::SEE_OTHER);
    let row = lbw_repo::load_lbw(&app.pool, lbw_id).await.unwrap().unwrap();
    assert_eq!(row.short_name, "Original");

    let res = app.send(post_form(&uri, Some("alice"), "short_name=Renamed&start_date=2026-10-01&end_date=2026-10-02")).await;
    assert_eq!(res.status(), StatusCode::SEE_OTHER);
    let row = lbw_repo::load_lbw(&app.pool, lbw_id).await.unwrap().unwrap();
    assert_eq!(row.short_name, "Renamed");
}

#[tokio::test]
async fn registering_twice_keeps_a_single_registration() {
    let app = test_app().await;
    let lbw_id = app.propose_lbw("alice", "Winter").await;
    let uri = format!("/lbw/{}/register", lbw_id);

    let res = app
        .send(post_form(&uri, Some("bob"), "arrival_date=2026-10-01&departure_date=2026-10-03"))
        .await;
    assert_eq!(res.status(), StatusCode::SEE_OTHER);
    let res = app
        .send(post_form(
            &uri,
            Some("bob"),
            "arrival_date=2026-10-02&departure_date=2026-10-04&comment=late",
        ))
        .await;
    assert_eq!(res.status(), StatusCode::SEE_OTHER);

    let participants = registration_repo::list_participants(&app.pool, lbw_id).await.unwrap();
    assert_eq!(participants.len(), 1);
    assert_eq!(
        participants[0].arrival_date,
        NaiveDate::from_ymd_opt(2026, 10, 2).unwrap()
    );
    assert_eq!(participants[0].comment, "late");

    let res = app.send(get(&uri, Some("bob"))).await;
    assert_eq!(res.status(), StatusCode::OK);
    assert!(body_text(res).await.contains("Update your registration"));
}

#[tokio::test]
async fn departure_before_arrival_is_rejected() {
    let app = test_app().await;
    let lbw_id = app.propose_lbw("alice", "Spring").await;
    let uri = format!("/lbw/{}/register", lbw_id);
    let res = app
        .send(post_form(&uri, Some("bob"), "arrival_date=2026-10-03&departure_date=2026-10-01"))
        .await;
    assert_eq!(res.status(), StatusCode::OK);
    assert!(registration_repo::list_participants(&app.pool, lbw_id)
        .await
        .unwrap()
        .is_empty());
}

#[tokio::test]
async fn deregistering_without_registration_is_not_found() {
    let app = test_app().await;
    let lbw_id = app.propose_lbw("alice", "Summer").await;
    let uri = format!("/lbw/{}/deregister", lbw_id);

    let res = app.send(post_form(&uri, Some("bob"), "")).await;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);

    app.send(post_form(
        &format!("/lbw/{}/register", lbw_id),
        Some("bob"),
        "arrival_date=2026-10-01&departure_date=2026-10-02",
    ))
    .await;
    let res = app.send(post_form(&uri, Some("bob"), "")).await;
    assert_eq!(res.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&res), format!("/lbw/{}", lbw_id));
}

#[tokio::test]
async fn activity_registration_toggles() {
    let app = test_app().await;
    let lbw_id = app.propose_lbw("alice", "Hike").await;
    let activity_id = app.propose_activity("alice", lbw_id, "Summit").await;
    let uri = format!("/lbw/{}/activities/{}/register", lbw_id, activity_id);

    let res = app.send(post_form(&uri, Some("bob"), "")).await;
    assert_eq!(res.status(), StatusCode::SEE_OTHER);
    let attendees = activity_repo::list_attendees(&app.pool, activity_id).await.unwrap();
    assert_eq!(attendees.len(), 1);
    assert_eq!(attendees[0].user_id, "bob");

    app.send(post_form(&uri, Some("bob"), "")).await;
    assert!(activity_repo::list_attendees(&app.pool, activity_id)
        .await
        .unwrap()
        .is_empty());

    let res = app.send(post_form(&uri, None, "")).await;
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn activity_from_another_lbw_is_not_found() {
    let app = test_app().await;
    let first = app.propose_lbw("alice", "First").await;
    let second = app.propose_lbw("alice", "Second").await;
    let activity_id = app.propose_activity("alice", first, "Swim").await;

    let res = app
        .send(get(&format!("/lbw/{}/activities/{}", second, activity_id), None))
        .await;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn scheduling_sets_and_clears_the_start() {
    let app = test_app().await;
    let lbw_id = app.propose_lbw("alice", "Camp").await;
    let activity_id = app.propose_activity("alice", lbw_id, "Dinner").await;
    let uri = format!("/lbw/{}/activities/{}", lbw_id, activity_id);

    let res = app
        .send(post_form(
            &uri,
            Some("alice"),
            "activity_day=10%2F02%2F2026&activity_hour=19&activity_min=30",
        ))
        .await;
    assert_eq!(res.status(), StatusCode::SEE_OTHER);
    let row = activity_repo::load_activity(&app.pool, activity_id).await.unwrap().unwrap();
    let expected = NaiveDate::from_ymd_opt(2026, 10, 2)
        .unwrap()
        .and_hms_opt(19, 30, 0)
        .unwrap();
    assert_eq!(row.start_date, Some(expected));

    let res = app
        .send(get(&format!("/lbw/{}/schedule", lbw_id), None))
        .await;
    assert_eq!(res.status(), StatusCode::OK);
    assert!(body_text(res).await.contains("Dinner"));

    let res = app
        .send(post_form(&uri, Some("alice"), "activity_day=&activity_hour=&activity_min="))
        .await;
    assert_eq!(res.status(), StatusCode::SEE_OTHER);
    let row = activity_repo::load_activity(&app.pool, activity_id).await.unwrap().unwrap();
    assert_eq!(row.start_date, None);
}

#[tokio::test]
async fn scheduling_rejects_bad_input_and_outsiders() {
    let app = test_app().await;
    let lbw_id = app.propose_lbw("alice", "Camp").await;
    let activity_id = app.propose_activity("alice", lbw_id, "Lunch").await;
    let uri = format!("/lbw/{}/activities/{}", lbw_id, activity_id);

    let res = app
        .send(post_form(&uri, Some("alice"), "activity_day=10%2F02%2F2026&activity_hour=25"))
        .await;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    let res = app
        .send(post_form(&uri, None, "activity_day=10%2F02%2F2026"))
        .await;
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

    let res = app
        .send(post_form(&uri, Some("mallory"), "activity_day=10%2F02%2F2026"))
        .await;
    assert_eq!(res.status(), StatusCode::FORBIDDEN);

    let row = activity_repo::load_activity(&app.pool, activity_id).await.unwrap().unwrap();
    assert_eq!(row.start_date, None);
}

#[tokio::test]
async fn lbw_owner_may_schedule_someone_elses_activity() {
    let app = test_app().await;
    let lbw_id = app.propose_lbw("alice", "Camp").await;
    let activity_id = app.propose_activity("bob", lbw_id, "Quiz").await;
    let uri = format!("/lbw/{}/activities/{}", lbw_id, activity_id);

    let res = app
        .send(post_form(&uri, Some("alice"), "activity_day=10%2F03%2F2026"))
        .await;
    assert_eq!(res.status(), StatusCode::SEE_OTHER);
    let row = activity_repo::load_activity(&app.pool, activity_id).await.unwrap().unwrap();
    let midnight = NaiveDate::from_ymd_opt(2026, 10, 3)
        .unwrap()
        .and_hms_opt(0, 0, 0)
        .unwrap();
    assert_eq!(row.start_date, Some(midnight));
}

#[tokio::test]
async fn only_the_activity_owner_can_cancel_it() {
    let app = test_app().await;
    let lbw_id = app.propose_lbw("alice", "Retreat").await;
    let activity_id = app.propose_activity("alice", lbw_id, "Yoga").await;
    app.visit("bob").await;
    let uri = format!("/lbw/{}/activities/{}/cancel", lbw_id, activity_id);

    let res = app.send(post_ajax(&uri, "bob")).await;
    assert_eq!(res.status(), StatusCode::FORBIDDEN);

    let res = app.send(post_form(&uri, Some("alice"), "")).await;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);

    let res = app.send(post_ajax(&uri, "alice")).await;
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(body_text(res).await, "ok");
    assert!(activity_repo::load_activity(&app.pool, activity_id)
        .await
        .unwrap()
        .is_none());
}

#[tokio::test]
async fn messages_stay_in_their_thread() {
    let app = test_app().await;
    let lbw_id = app.propose_lbw("alice", "Meetup").await;
    let activity_id = app.propose_activity("alice", lbw_id, "Karaoke").await;
    let uri = format!("/lbw/{}/messages", lbw_id);

    let res = app
        .send(post_form(
            &uri,
            Some("bob"),
            &format!("lbw_id={}&subject=Hello&body=Who+brings+snacks", lbw_id),
        ))
        .await;
    assert_eq!(res.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&res), format!("/lbw/{}", lbw_id));
    let lbw_messages = message_repo::list_lbw_messages(&app.pool, lbw_id).await.unwrap();
    assert_eq!(lbw_messages.len(), 1);
    let parent_id = lbw_messages[0].message_id;

    let res = app
        .send(post_form(
            &uri,
            Some("alice"),
            &format!(
                "lbw_id={}&activity_id={}&parent_id={}&body=wrong+thread",
                lbw_id, activity_id, parent_id
            ),
        ))
        .await;
    assert_eq!(res.status(), StatusCode::OK);
    assert!(message_repo::list_activity_messages(&app.pool, activity_id)
        .await
        .unwrap()
        .is_empty());

    let res = app
        .send(post_form(
            &uri,
            Some("alice"),
            &format!("lbw_id={}&parent_id={}&body=I+do", lbw_id, parent_id),
        ))
        .await;
    assert_eq!(res.status(), StatusCode::SEE_OTHER);
    let replies = message_repo::list_replies(&app.pool, parent_id).await.unwrap();
    assert_eq!(replies.len(), 1);
    assert_eq!(replies[0].writer_id, "alice");

    let res = app
        .send(post_form(
            &uri,
            Some("alice"),
            &format!("activity_id={}&body=See+you+there", activity_id),
        ))
        .await;
    assert_eq!(res.status(), StatusCode::SEE_OTHER);
    assert_eq!(
        location(&res),
        format!("/lbw/{}/activities/{}", lbw_id, activity_id)
    );
    let row = &message_repo::list_activity_messages(&app.pool, activity_id)
        .await
        .unwrap()[0];
    assert_eq!(row.activity_id, Some(activity_id));
    assert_eq!(row.lbw_id, None);
}

#[tokio::test]
async fn message_for_another_lbws_activity_is_not_found() {
    let app = test_app().await;
    let first = app.propose_lbw("alice", "First").await;
    let second = app.propose_lbw("alice", "Second").await;
    let activity_id = app.propose_activity("alice", first, "Chess").await;

    let res = app
        .send(post_form(
            &format!("/lbw/{}/messages", second),
            Some("alice"),
            &format!("activity_id={}&body=hi", activity_id),
        ))
        .await;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn anonymous_message_pages_redirect_home() {
    let app = test_app().await;
    let lbw_id = app.propose_lbw("alice", "Quiet").await;

    for uri in [
        format!("/lbw/{}/messages/write", lbw_id),
        format!("/lbw/{}/messages/1", lbw_id),
    ] {
        let res = app.send(get(&uri, None)).await;
        assert_eq!(res.status(), StatusCode::SEE_OTHER, "{}", uri);
        assert_eq!(location(&res), "/");
    }

    let res = app
        .send(post_form(
            &format!("/lbw/{}/messages", lbw_id),
            None,
            &format!("lbw_id={}&body=hi", lbw_id),
        ))
        .await;
    assert_eq!(res.status(), StatusCode::SEE_OTHER);
    assert!(message_repo::list_lbw_messages(&app.pool, lbw_id)
        .await
        .unwrap()
        .is_empty());
}

#[tokio::test]
async fn only_the_writer_deletes_a_message() {
    let app = test_app().await;
    let lbw_id = app.propose_lbw("alice", "Talks").await;
    app.send(post_form(
        &format!("/lbw/{}/messages", lbw_id),
        Some("bob"),
        &format!("lbw_id={}&body=first", lbw_id),
    ))
    .await;
    let message_id = message_repo::list_lbw_messages(&app.pool, lbw_id).await.unwrap()[0].message_id;
    let uri = format!("/lbw/{}/messages/{}/delete", lbw_id, message_id);

    let res = app.send(post_ajax(&uri, "alice")).await;
    assert_eq!(res.status(), StatusCode::FORBIDDEN);

    let res = app.send(post_form(&uri, Some("bob"), "")).await;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);

    let res = app.send(post_ajax(&uri, "bob")).await;
    assert_eq!(res.status(), StatusCode::OK);
    assert!(message_repo::load_message(&app.pool, message_id)
        .await
        .unwrap()
        .is_none());
}

#[tokio::test]
async fn deleting_an_lbw_removes_everything_under_it() {
    let app = test_app().await;
    let lbw_id = app.propose_lbw("alice", "Doomed").await;
    let activity_id = app.propose_activity("alice", lbw_id, "Bonfire").await;
    app.send(post_form(
        &format!("/lbw/{}/register", lbw_id),
        Some("bob"),
        "arrival_date=2026-10-01&departure_date=2026-10-02",
    ))
    .await;
    app.send(post_form(
        &format!("/lbw/{}/messages", lbw_id),
        Some("bob"),
        &format!("activity_id={}&body=count+me+in", activity_id),
    ))
    .await;
    let uri = format!("/lbw/{}/delete", lbw_id);

    let res = app.send(post_form(&uri, Some("bob"), &format!("lbw_id={}", lbw_id))).await;
    assert_eq!(res.status(), StatusCode::SEE_OTHER);
    assert!(lbw_repo::load_lbw(&app.pool, lbw_id).await.unwrap().is_some());

    let res = app.send(post_form(&uri, Some("alice"), "lbw_id=999")).await;
    assert_eq!(res.status(), StatusCode::OK);
    assert!(lbw_repo::load_lbw(&app.pool, lbw_id).await.unwrap().is_some());

    let res = app.send(post_form(&uri, Some("alice"), &format!("lbw_id={}", lbw_id))).await;
    assert_eq!(res.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&res), "/");
    assert!(lbw_repo::load_lbw(&app.pool, lbw_id).await.unwrap().is_none());
    assert!(activity_repo::load_activity(&app.pool, activity_id)
        .await
        .unwrap()
        .is_none());
    assert!(registration_repo::list_participants(&app.pool, lbw_id)
        .await
        .unwrap()
        .is_empty());
    assert!(message_repo::list_activity_messages(&app.pool, activity_id)
        .await
        .unwrap()
        .is_empty());
}

#[tokio::test]
async fn attachments_upload_and_download() {
    let app = test_app().await;
    let lbw_id = app.propose_lbw("alice", "Workshop").await;
    let activity_id = app.propose_activity("alice", lbw_id, "Soldering").await;
    app.visit("bob").await;
    let uri = format!("/lbw/{}/activities/{}/attachment", lbw_id, activity_id);

    let res = app.send(get(&uri, None)).await;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);

    let res = app.send(upload(&uri, None, "notes.txt", "x")).await;
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

    let res = app.send(upload(&uri, Some("bob"), "notes.txt", "x")).await;
    assert_eq!(res.status(), StatusCode::FORBIDDEN);

    let res = app
        .send(upload(&uri, Some("alice"), "notes.txt", "bring a multimeter"))
        .await;
    assert_eq!(res.status(), StatusCode::SEE_OTHER);

    let res = app.send(get(&uri, None)).await;
    assert_eq!(res.status(), StatusCode::OK);
    let disposition = res
        .headers()
        .get(header::CONTENT_DISPOSITION)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();
    assert!(disposition.contains("notes.txt"));
    assert_eq!(body_text(res).await, "bring a multimeter");
}

#[tokio::test]
async fn accommodation_offers_need_a_signed_in_user() {
    let app = test_app().await;
    let lbw_id = app.propose_lbw("alice", "Lodging").await;
    let uri = format!("/lbw/{}/accommodation", lbw_id);

    let res = app
        .send(post_form(&uri, None, "name=Tent&capacity=2"))
        .await;
    assert_eq!(res.status(), StatusCode::OK);
    assert!(body_text(res).await.contains("Sign in to offer accommodation."));

    let res = app
        .send(post_form(&uri, Some("bob"), "name=Cabin&location=Lakeside&capacity=4"))
        .await;
    assert_eq!(res.status(), StatusCode::OK);
    let html = body_text(res).await;
    assert!(html.contains("Thanks, your accommodation was added."));
    assert!(html.contains("Cabin"));
    assert!(!html.contains("Tent"));
}

#[tokio::test]
async fn merchandise_placeholders_echo_the_lbw() {
    let app = test_app().await;
    let res = app.send(get("/lbw/3/tshirts", None)).await;
    assert_eq!(body_text(res).await, "Showing tshirts for lbw 3.");
    let res = app.send(get("/lbw/3/rides", None)).await;
    assert_eq!(body_text(res).await, "Showing rides for lbw 3.");
}

#[tokio::test]
async fn invalid_update_from_non_owner_still_redirects() {
    let app = test_app().await;
    let lbw_id = app.propose_lbw("alice", "Guarded").await;

    let res = app
        .send(post_form(
            &format!("/lbw/{}/update", lbw_id),
            Some("bob"),
            "short_name=&start_date=&end_date=",
        ))
        .await;
    assert_eq!(res.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&res), format!("/lbw/{}", lbw_id));
}

#[tokio::test]
async fn updating_a_missing_lbw_is_not_found_even_with_bad_input() {
    let app = test_app().await;
    let res = app
        .send(post_form("/lbw/9999/update", Some("alice"), "short_name="))
        .await;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn invalid_activity_update_from_non_owner_redirects_to_the_activity() {
    let app = test_app().await;
    let lbw_id = app.propose_lbw("alice", "Guarded").await;
    let activity_id = app.propose_activity("alice", lbw_id, "Choir").await;

    let res = app
        .send(post_form(
            &format!("/lbw/{}/activities/propose", lbw_id),
            Some("bob"),
            &format!("activity_id={}&short_name=", activity_id),
        ))
        .await;
    assert_eq!(res.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&res), format!("/lbw/{}/activities/{}", lbw_id, activity_id));

    let res = app
        .send(post_form(
            &format!("/lbw/{}/activities/propose", lbw_id),
            Some("alice"),
            "activity_id=9999&short_name=Ghost",
        ))
        .await;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn ajax_only_endpoints_reject_plain_posts_before_auth() {
    let app = test_app().await;
    let lbw_id = app.propose_lbw("alice", "Quiet").await;
    let activity_id = app.propose_activity("alice", lbw_id, "Reading").await;

    for uri in [
        format!("/lbw/{}/activities/{}/cancel", lbw_id, activity_id),
        format!("/lbw/{}/messages/1/delete", lbw_id),
    ] {
        let res = app.send(post_form(&uri, None, "")).await;
        assert_eq!(res.status(), StatusCode::NOT_FOUND, "{}", uri);

        let anonymous_ajax = Request::builder()
            .method("POST")
            .uri(&uri)
            .header("x-requested-with", "XMLHttpRequest")
            .body(Body::empty())
            .unwrap();
        let res = app.send(anonymous_ajax).await;
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED, "{}", uri);
    }
    assert!(activity_repo::load_activity(&app.pool, activity_id)
        .await
        .unwrap()
        .is_some());
}

#[tokio::test]
async fn invalid_resubmission_keeps_the_update_heading() {
    let app = test_app().await;
    let lbw_id = app.propose_lbw("alice", "Reunion").await;
    let uri = format!("/lbw/{}/register", lbw_id);
    app.send(post_form(&uri, Some("bob"), "arrival_date=2026-10-01&departure_date=2026-10-02"))
        .await;

    let res = app
        .send(post_form(&uri, Some("bob"), "arrival_date=2026-10-03&departure_date=2026-10-01"))
        .await;
    assert_eq!(res.status(), StatusCode::OK);
    assert!(body_text(res).await.contains("Update your registration"));
}

#[tokio::test]
async fn current_user_row_signs_in_requests_without_a_token() {
    let app = test_app().await;
    let res = app.send(get("/lbw/propose", None)).await;
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

    lbw::database::user_repo::upsert_user(&app.pool, "local", Some("Local Dev"), None)
        .await
        .unwrap();
    sqlx::query("INSERT INTO current_user (user_id) VALUES ('local')")
        .execute(&app.pool)
        .await
        .unwrap();

    let res = app.send(get("/lbw/propose", None)).await;
    assert_eq!(res.status(), StatusCode::OK);
    assert!(body_text(res).await.contains("Signed in as Local Dev"));
}

type Outbox = Arc<Mutex<Vec<String>>>;

async fn record_email(
    State(outbox): State<Outbox>,
    Json(email): Json<serde_json::Value>,
) -> StatusCode {
    let subject = email["subject"].as_str().unwrap_or_default().to_string();
    outbox.lock().unwrap().push(subject);
    StatusCode::OK
}

/// Local mail relay; returns its URL and the subjects it received.
async fn start_relay() -> (String, Outbox) {
    let outbox: Outbox = Arc::default();
    let relay = Router::new()
        .route("/send", post(record_email))
        .with_state(outbox.clone());
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, relay).await.unwrap();
    });
    (format!("http://{}/send", addr), outbox)
}

fn mailer_for(api_url: Option<String>) -> Mailer {
    Mailer::new(MailConfig {
        api_url,
        from: "lbw@example.org".to_string(),
        to: vec!["orga@example.org".to_string()],
    })
}

async fn wait_for_emails(outbox: &Outbox, count: usize) -> Vec<String> {
    for _ in 0..100 {
        {
            let received = outbox.lock().unwrap();
            if received.len() >= count {
                return received.clone();
            }
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    outbox.lock().unwrap().clone()
}

#[tokio::test]
async fn creations_notify_and_updates_do_not() {
    let (url, outbox) = start_relay().await;
    let app = test_app_with(mailer_for(Some(url))).await;

    let lbw_id = app.propose_lbw("alice", "Autumn").await;
    assert_eq!(
        wait_for_emails(&outbox, 1).await,
        vec!["New LBW proposed: Autumn".to_string()]
    );

    let res = app
        .send(post_form(
            &format!("/lbw/{}/update", lbw_id),
            Some("alice"),
            "short_name=Renamed&start_date=2026-10-01&end_date=2026-10-02",
        ))
        .await;
    assert_eq!(res.status(), StatusCode::SEE_OTHER);

    let hike = app.propose_activity("alice", lbw_id, "Hike").await;
    assert_eq!(wait_for_emails(&outbox, 2).await.len(), 2);

    let res = app
        .send(post_form(
            &format!("/lbw/{}/activities/propose", lbw_id),
            Some("alice"),
            &format!("activity_id={}&short_name=Climb", hike),
        ))
        .await;
    assert_eq!(res.status(), StatusCode::SEE_OTHER);

    app.propose_activity("alice", lbw_id, "Swim").await;
    wait_for_emails(&outbox, 3).await;
    tokio::time::sleep(Duration::from_millis(100)).await;

    let mut subjects = outbox.lock().unwrap().clone();
    subjects.sort();
    assert_eq!(
        subjects,
        vec![
            "New LBW proposed: Autumn".to_string(),
            "New activity Hike proposed for LBW Renamed".to_string(),
            "New activity Swim proposed for LBW Renamed".to_string(),
        ]
    );
}

#[tokio::test]
async fn unreachable_or_missing_relay_never_fails_the_request() {
    let closed = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let dead_url = format!("http://{}/send", closed.local_addr().unwrap());
    drop(closed);

    for mailer in [mailer_for(Some(dead_url)), mailer_for(None)] {
        let app = test_app_with(mailer).await;
        let lbw_id = app.propose_lbw("alice", "Offline").await;
        app.propose_activity("alice", lbw_id, "Walk").await;
        assert!(lbw_repo::load_lbw(&app.pool, lbw_id).await.unwrap().is_some());
    }
}
