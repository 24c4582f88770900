//! End-to-end sync behaviour against in-memory platforms.

use std::sync::Arc;

use serde_json::{json, Value};

use avasync_core::avatar::CONFLUENCE_DEFAULT_AVATAR_FILE;
use avasync_core::digest::md5_hex;
use avasync_core::{Credentials, UserId};
use avasync_platform::http::{HttpMethod, MockTransport};
use avasync_platform::{AvatarPlatform, BitbucketClient, ConfluenceClient, JiraClient};
use avasync_sync::{Stage, SyncError, SyncOptions, Syncer, Targets, UserOutcome};

const JIRA: &str = "https://jira.example.com";
const WIKI: &str = "https://wiki.example.com";
const GIT: &str = "https://git.example.com";
const PUSH_RPC: &str = "https://wiki.example.com/rpc/json-rpc/confluenceservice-v2/addProfilePicture";
const LIST_RPC: &str = "https://wiki.example.com/rpc/json-rpc/confluenceservice-v2/getActiveUsers";

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn creds() -> Credentials {
    Credentials::new("sync-bot", "secret")
}

fn jira(transport: &MockTransport) -> JiraClient {
    JiraClient::new_with_transport(JIRA, creds(), Arc::new(transport.clone()))
}

fn confluence(transport: &MockTransport) -> ConfluenceClient {
    ConfluenceClient::new_with_transport(WIKI, creds(), Arc::new(transport.clone()))
}

fn bitbucket(transport: &MockTransport) -> BitbucketClient {
    BitbucketClient::new_with_transport(GIT, creds(), Arc::new(transport.clone()))
}

fn source_avatar_url(user: &str, avatar_id: u32) -> String {
    format!("{JIRA}/secure/useravatar?ownerId={user}&avatarId={avatar_id}")
}

/// Register the two Jira responses behind one source pull.
fn jira_user(transport: &MockTransport, user: &str, avatar_id: u32, content_type: &str, bytes: &[u8]) {
    let avatar_url = source_avatar_url(user, avatar_id);
    transport.respond_json(
        HttpMethod::Get,
        format!("{JIRA}/rest/api/2/user?username={user}"),
        json!({"name": user, "avatarUrls": {"48x48": avatar_url}}),
    );
    transport.respond(HttpMethod::Get, avatar_url, 200, content_type, bytes.to_vec());
}

fn confluence_user(transport: &MockTransport, user: &str, picture_path: Option<&str>) {
    let body = match picture_path {
        Some(path) => json!({"username": user, "profilePicture": {"path": path}}),
        None => json!({"username": user}),
    };
    transport.respond_json(
        HttpMethod::Get,
        format!("{WIKI}/rest/api/user?username={user}"),
        body,
    );
}

fn default_picture() -> String {
    format!("/images/icons/profilepics/{CONFLUENCE_DEFAULT_AVATAR_FILE}")
}

fn bitbucket_avatar(transport: &MockTransport, user: &str, bytes: &[u8]) {
    transport.respond(
        HttpMethod::Get,
        format!("{GIT}/users/{user}/avatar.png"),
        200,
        "image/png",
        bytes.to_vec(),
    );
}

fn users(names: &[&str]) -> Targets {
    Targets::Users(names.iter().map(|n| UserId::from(*n)).collect())
}

fn run(
    source: &dyn AvatarPlatform,
    destination: &dyn AvatarPlatform,
    options: SyncOptions,
    targets: Targets,
) -> avasync_sync::SyncReport {
    init_logging();
    Syncer::new(source, destination, options)
        .run(targets)
        .expect("run")
}

/// File bytes inside a single-part multipart body.
fn multipart_payload(body: &[u8]) -> Vec<u8> {
    let start = body
        .windows(4)
        .position(|w| w == b"\r\n\r\n")
        .expect("header end")
        + 4;
    let end = body
        .windows(4)
        .rposition(|w| w == b"\r\n--")
        .expect("closing boundary");
    body[start..end].to_vec()
}

// ---------------------------------------------------------------------------
// Scenarios
// ---------------------------------------------------------------------------

#[test]
fn default_destination_receives_exact_source_bytes_and_computed_name() {
    let src = MockTransport::new();
    let dst = MockTransport::new();
    let png = b"\x89PNG\r\n\x1a\nann".to_vec();
    jira_user(&src, "ann", 20411, "image/png", &png);
    confluence_user(&dst, "ann", Some(&default_picture()));
    dst.respond_json(HttpMethod::Post, PUSH_RPC, json!(true));

    let report = run(&jira(&src), &confluence(&dst), SyncOptions::default(), users(&["ann"]));

    assert!(report.is_success());
    assert_eq!(report.users[0].outcome, UserOutcome::Pushed);
    let posts = dst.requests_with(HttpMethod::Post);
    assert_eq!(posts.len(), 1);
    let body: Value = serde_json::from_slice(&posts[0].body).expect("rpc body");
    assert_eq!(
        body,
        json!([
            "ann",
            md5_hex(source_avatar_url("ann", 20411)),
            "image/png",
            png
        ])
    );
}

#[test]
fn already_synced_user_is_never_pushed() {
    let src = MockTransport::new();
    let dst = MockTransport::new();
    jira_user(&src, "ann", 20411, "image/png", b"png");
    let stored = format!(
        "/download/attachments/98305/{}",
        md5_hex(source_avatar_url("ann", 20411))
    );
    confluence_user(&dst, "ann", Some(&stored));

    let forced = SyncOptions {
        force: true,
        dry_run: false,
    };
    let report = run(&jira(&src), &confluence(&dst), forced, users(&["ann"]));

    assert_eq!(report.users[0].outcome, UserOutcome::UpToDate);
    assert!(report.is_success());
    assert!(dst.requests_with(HttpMethod::Post).is_empty());
}

#[test]
fn default_source_avatar_never_touches_destination() {
    let src = MockTransport::new();
    let dst = MockTransport::new();
    jira_user(&src, "ann", 10122, "image/png", b"generic");

    let report = run(&jira(&src), &confluence(&dst), SyncOptions::default(), users(&["ann"]));

    assert_eq!(report.users[0].outcome, UserOutcome::SkippedDefault);
    assert_eq!(report.error_count(), 0);
    assert!(dst.requests().is_empty());
}

#[test]
fn unsupported_source_type_is_skipped_without_error() {
    let src = MockTransport::new();
    let dst = MockTransport::new();
    jira_user(&src, "ann", 20411, "image/svg+xml", b"<svg/>");

    let report = run(&jira(&src), &confluence(&dst), SyncOptions::default(), users(&["ann"]));

    assert_eq!(
        report.users[0].outcome,
        UserOutcome::SkippedUnsupportedType {
            content_type: "image/svg+xml".to_string()
        }
    );
    assert!(report.is_success());
    assert!(dst.requests().is_empty());
}

#[test]
fn destination_pull_failure_counts_one_error_and_skips_push() {
    let src = MockTransport::new();
    let dst = MockTransport::new();
    jira_user(&src, "ann", 20411, "image/png", b"png");
    dst.respond(
        HttpMethod::Get,
        format!("{WIKI}/rest/api/user?username=ann"),
        404,
        "application/json",
        "{}",
    );

    let report = run(&jira(&src), &confluence(&dst), SyncOptions::default(), users(&["ann"]));

    assert_eq!(report.error_count(), 1);
    assert!(!report.is_success());
    match &report.users[0].outcome {
        UserOutcome::Failed { stage, message } => {
            assert_eq!(*stage, Stage::PullDestination);
            assert!(message.contains("HTTP 404 Not Found"), "got: {message}");
            assert!(message.contains("'ann'"), "got: {message}");
        }
        other => panic!("unexpected outcome: {other:?}"),
    }
    assert!(dst.requests_with(HttpMethod::Post).is_empty());
}

#[test]
fn force_decides_whether_a_custom_differing_avatar_is_replaced() {
    for force in [false, true] {
        let src = MockTransport::new();
        let dst = MockTransport::new();
        jira_user(&src, "ann", 20411, "image/png", b"new picture");
        bitbucket_avatar(&dst, "ann", b"old custom picture");
        dst.respond(
            HttpMethod::Post,
            format!("{GIT}/rest/api/1.0/users/ann/avatar.png"),
            201,
            "application/json",
            "",
        );

        let options = SyncOptions {
            force,
            dry_run: false,
        };
        let report = run(&jira(&src), &bitbucket(&dst), options, users(&["ann"]));
        let pushes = dst.requests_with(HttpMethod::Post).len();

        if force {
            assert_eq!(report.users[0].outcome, UserOutcome::Pushed);
            assert_eq!(pushes, 1);
        } else {
            assert_eq!(report.users[0].outcome, UserOutcome::UpToDate);
            assert_eq!(pushes, 0);
        }
        assert!(report.is_success());
    }
}

#[test]
fn bitbucket_placeholder_is_replaced_only_once_its_digest_is_configured() {
    let placeholder = b"bitbucket generic avatar".to_vec();
    for configured in [false, true] {
        let src = MockTransport::new();
        let dst = MockTransport::new();
        jira_user(&src, "ann", 20411, "image/png", b"custom picture");
        bitbucket_avatar(&dst, "ann", &placeholder);
        dst.respond(
            HttpMethod::Post,
            format!("{GIT}/rest/api/1.0/users/ann/avatar.png"),
            201,
            "application/json",
            "",
        );

        let bb = if configured {
            bitbucket(&dst).with_default_md5(md5_hex(&placeholder))
        } else {
            bitbucket(&dst)
        };
        let report = run(&jira(&src), &bb, SyncOptions::default(), users(&["ann"]));
        let pushes = dst.requests_with(HttpMethod::Post).len();

        if configured {
            assert_eq!(report.users[0].outcome, UserOutcome::Pushed);
            assert_eq!(pushes, 1);
        } else {
            // The built-in digest matches no real image, so the placeholder
            // looks like a custom avatar.
            assert_eq!(report.users[0].outcome, UserOutcome::UpToDate);
            assert_eq!(pushes, 0);
        }
    }
}

#[test]
fn pushed_bitbucket_avatar_pulls_back_with_same_digest() {
    let src = MockTransport::new();
    let dst = MockTransport::new();
    let gif = b"GIF89a\x01\x00\x01\x00".to_vec();
    jira_user(&src, "ann", 20411, "image/gif", &gif);
    let bb = bitbucket(&dst);
    let placeholder = b"bitbucket placeholder".to_vec();
    bitbucket_avatar(&dst, "ann", &placeholder);
    dst.respond(
        HttpMethod::Post,
        format!("{GIT}/rest/api/1.0/users/ann/avatar.png"),
        201,
        "application/json",
        "",
    );

    let bb = bb.with_default_md5(md5_hex(&placeholder));
    let report = run(&jira(&src), &bb, SyncOptions::default(), users(&["ann"]));
    assert_eq!(report.users[0].outcome, UserOutcome::Pushed);

    // Serve back what was uploaded, as the server would.
    let post = dst.requests_with(HttpMethod::Post).remove(0);
    let uploaded = multipart_payload(&post.body);
    dst.respond(
        HttpMethod::Get,
        format!("{GIT}/users/ann/avatar.png"),
        200,
        "image/gif",
        uploaded,
    );
    let pulled = bb.fetch_avatar(&UserId::from("ann")).expect("re-pull");
    assert_eq!(pulled.content_type(), "image/gif");
    assert_eq!(pulled.digest(), md5_hex(&gif));
}

#[test]
fn paginated_listing_is_merged_before_iteration() {
    let src = MockTransport::new();
    let dst = MockTransport::new();
    dst.respond_json(
        HttpMethod::Get,
        format!("{GIT}/rest/api/1.0/users?start=0"),
        json!({"values": [{"name": "ann"}], "isLastPage": false, "nextPageStart": 1}),
    );
    dst.respond_json(
        HttpMethod::Get,
        format!("{GIT}/rest/api/1.0/users?start=1"),
        json!({"values": [{"name": "bob"}], "isLastPage": true}),
    );
    jira_user(&src, "ann", 10122, "image/png", b"generic");
    jira_user(&src, "bob", 10122, "image/png", b"generic");

    let report = run(&jira(&src), &bitbucket(&dst), SyncOptions::default(), Targets::All);

    let seen: Vec<&str> = report.users.iter().map(|r| r.user.as_str()).collect();
    assert_eq!(seen, vec!["ann", "bob"]);

    // Both listing pages precede any per-user request.
    let urls: Vec<String> = dst.requests().into_iter().map(|r| r.url).collect();
    assert_eq!(
        urls,
        vec![
            format!("{GIT}/rest/api/1.0/users?start=0"),
            format!("{GIT}/rest/api/1.0/users?start=1"),
        ]
    );
}

#[test]
fn empty_listing_completes_with_nothing_to_do() {
    let src = MockTransport::new();
    let dst = MockTransport::new();
    dst.respond_json(HttpMethod::Post, LIST_RPC, json!([]));

    let report = run(&jira(&src), &confluence(&dst), SyncOptions::default(), Targets::from(Vec::new()));

    assert!(report.users.is_empty());
    assert!(report.is_success());
    assert_eq!(report.pushed_count(), 0);
    assert!(src.requests().is_empty());
}

#[test]
fn listing_failure_aborts_the_run() {
    init_logging();
    let src = MockTransport::new();
    let dst = MockTransport::new();
    dst.respond_json(
        HttpMethod::Post,
        LIST_RPC,
        json!({"error": {"message": "Not permitted"}}),
    );

    let err = Syncer::new(&jira(&src), &confluence(&dst), SyncOptions::default())
        .run(Targets::All)
        .expect_err("listing error");
    assert!(matches!(err, SyncError::Listing { .. }));
    assert!(err.to_string().contains("confluence"));
}

#[test]
fn failures_do_not_stop_remaining_users() {
    let src = MockTransport::new();
    let dst = MockTransport::new();
    // ann: source pull fails. bob: push fails. cy: pushed.
    src.respond(
        HttpMethod::Get,
        format!("{JIRA}/rest/api/2/user?username=ann"),
        500,
        "text/html",
        "",
    );
    jira_user(&src, "bob", 20001, "image/png", b"bob");
    jira_user(&src, "cy", 20002, "image/jpeg", b"cy");
    confluence_user(&dst, "bob", None);
    confluence_user(&dst, "cy", None);
    dst.respond(HttpMethod::Post, PUSH_RPC, 500, "application/json", "{}");
    dst.respond_json(HttpMethod::Post, PUSH_RPC, json!(true));

    let report = run(
        &jira(&src),
        &confluence(&dst),
        SyncOptions::default(),
        users(&["ann", "bob", "cy"]),
    );

    assert_eq!(report.error_count(), 2);
    assert!(matches!(
        report.users[0].outcome,
        UserOutcome::Failed { stage: Stage::PullSource, .. }
    ));
    assert!(matches!(
        report.users[1].outcome,
        UserOutcome::Failed { stage: Stage::Push, .. }
    ));
    assert_eq!(report.users[2].outcome, UserOutcome::Pushed);
}

#[test]
fn dry_run_decides_but_never_pushes() {
    let src = MockTransport::new();
    let dst = MockTransport::new();
    jira_user(&src, "ann", 20411, "image/png", b"png");
    confluence_user(&dst, "ann", None);

    let options = SyncOptions {
        force: false,
        dry_run: true,
    };
    let report = run(&jira(&src), &confluence(&dst), options, users(&["ann"]));

    assert_eq!(report.users[0].outcome, UserOutcome::WouldPush);
    assert_eq!(report.pushed_count(), 1);
    assert!(dst.requests_with(HttpMethod::Post).is_empty());
}
