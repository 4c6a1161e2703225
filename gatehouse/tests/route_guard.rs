// This file is part of the product Gatehouse.
// SPDX-FileCopyrightText: 2025-2026 Zivatar Limited
// SPDX-License-Identifier: AGPL-3.0-or-later
// The code and documentation in this repository is licensed under the GNU Affero General Public License v3.0 or later (AGPL-3.0-or-later). See LICENSE.

mod common;

use actix_web::http::StatusCode;
use actix_web::{cookie::Cookie, test};
use common::{TestHarness, alice, header, location, read_text};
use gatehouse::build_app;
use gatehouse::iam::Principal;
use gatehouse::util::TestConfigBuilder;

#[actix_web::test]
async fn anonymous_request_to_protected_path_redirects_to_login() {
    let harness = TestHarness::new();
    let app = test::init_service(build_app(harness.app_state.clone())).await;

    let req = test::TestRequest::get().uri("/dashboard").to_request();
    let resp = test::call_service(&app, req).await;

    assert_eq!(resp.status(), StatusCode::FOUND);
    assert_eq!(
        location(&resp).as_deref(),
        Some("/login?redirect=/dashboard")
    );
}

#[actix_web::test]
async fn redirect_preserves_original_query() {
    let harness = TestHarness::new();
    let app = test::init_service(build_app(harness.app_state.clone())).await;

    let req = test::TestRequest::get()
        .uri("/settings/keys?tab=api")
        .to_request();
    let resp = test::call_service(&app, req).await;

    assert_eq!(resp.status(), StatusCode::FOUND);
    assert_eq!(
        location(&resp).as_deref(),
        Some("/login?redirect=/settings/keys%3Ftab%3Dapi")
    );
}

#[actix_web::test]
async fn dot_segments_do_not_bypass_protection() {
    let harness = TestHarness::new();
    let app = test::init_service(build_app(harness.app_state.clone())).await;

    let req = test::TestRequest::get()
        .uri("/public/../dashboard")
        .to_request();
    let resp = test::call_service(&app, req).await;

    assert_eq!(resp.status(), StatusCode::FOUND);
}

#[actix_web::test]
async fn authenticated_user_reaches_landing_with_escaped_name() {
    let harness = TestHarness::new();
    let app = test::init_service(build_app(harness.app_state.clone())).await;
    let principal = Principal::new("user-eve", "<b>Eve</b>");

    let req = test::TestRequest::get()
        .uri("/dashboard")
        .cookie(harness.session_cookie(&principal))
        .to_request();
    let resp = test::call_service(&app, req).await;

    assert_eq!(resp.status(), StatusCode::OK);
    let body = read_text(resp).await;
    assert!(body.contains("Welcome, &lt;b&gt;Eve&lt;/b&gt;"));
    assert!(!body.contains("<b>Eve"));
}

#[actix_web::test]
async fn authenticated_user_is_sent_away_from_login() {
    let harness = TestHarness::new();
    let app = test::init_service(build_app(harness.app_state.clone())).await;

    let req = test::TestRequest::get()
        .uri("/login")
        .cookie(harness.session_cookie(&alice()))
        .to_request();
    let resp = test::call_service(&app, req).await;

    assert_eq!(resp.status(), StatusCode::FOUND);
    assert_eq!(location(&resp).as_deref(), Some("/dashboard"));
}

#[actix_web::test]
async fn authenticated_user_follows_safe_return_path() {
    let harness = TestHarness::new();
    let app = test::init_service(build_app(harness.app_state.clone())).await;

    let req = test::TestRequest::get()
        .uri("/login?redirect=%2Fsettings")
        .cookie(harness.session_cookie(&alice()))
        .to_request();
    let resp = test::call_service(&app, req).await;

    assert_eq!(location(&resp).as_deref(), Some("/settings"));
}

#[actix_web::test]
async fn open_redirect_targets_fall_back_to_landing() {
    let harness = TestHarness::new();
    let app = test::init_service(build_app(harness.app_state.clone())).await;

    for uri in [
        "/login?redirect=https%3A%2F%2Fevil.example",
        "/login?redirect=%2F%2Fevil.example",
        "/login?redirect=%2F%5Cevil.example",
        "/login?redirect=%2Flogin",
    ] {
        let req = test::TestRequest::get()
            .uri(uri)
            .cookie(harness.session_cookie(&alice()))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(location(&resp).as_deref(), Some("/dashboard"), "{}", uri);
    }
}

#[actix_web::test]
async fn anonymous_user_sees_login_form() {
    let harness = TestHarness::new();
    let app = test::init_service(build_app(harness.app_state.clone())).await;

    let req = test::TestRequest::get()
        .uri("/login?redirect=%2Fsettings%22%3E")
        .to_request();
    let resp = test::call_service(&app, req).await;

    assert_eq!(resp.status(), StatusCode::OK);
    let body = read_text(resp).await;
    assert!(body.contains("name=\"redirect\""));
    assert!(body.contains("value=\"/settings&quot;&gt;\""));
}

#[actix_web::test]
async fn public_paths_are_open_either_way() {
    let harness = TestHarness::new();
    let app = test::init_service(build_app(harness.app_state.clone())).await;

    let anonymous = test::TestRequest::get().uri("/").to_request();
    assert_eq!(
        test::call_service(&app, anonymous).await.status(),
        StatusCode::OK
    );

    let signed_in = test::TestRequest::get()
        .uri("/")
        .cookie(harness.session_cookie(&alice()))
        .to_request();
    assert_eq!(
        test::call_service(&app, signed_in).await.status(),
        StatusCode::OK
    );
}

#[actix_web::test]
async fn verifier_outage_fails_closed() {
    let harness = TestHarness::with_unavailable_verifier();
    let app = test::init_service(build_app(harness.app_state.clone())).await;

    let req = test::TestRequest::get()
        .uri("/dashboard")
        .cookie(Cookie::new(harness.cookie_name().to_string(), "any-token"))
        .to_request();
    let resp = test::call_service(&app, req).await;

    assert_eq!(resp.status(), StatusCode::FOUND);
    assert_eq!(
        location(&resp).as_deref(),
        Some("/login?redirect=/dashboard")
    );
}

#[actix_web::test]
async fn forged_cookie_is_treated_as_anonymous() {
    let harness = TestHarness::new();
    let app = test::init_service(build_app(harness.app_state.clone())).await;

    let req = test::TestRequest::get()
        .uri("/dashboard")
        .cookie(Cookie::new(harness.cookie_name().to_string(), "not.a.jwt"))
        .to_request();
    let resp = test::call_service(&app, req).await;

    assert_eq!(resp.status(), StatusCode::FOUND);
}

#[actix_web::test]
async fn aged_session_is_refreshed_on_response() {
    let harness = TestHarness::new();
    let app = test::init_service(build_app(harness.app_state.clone())).await;

    let req = test::TestRequest::get()
        .uri("/dashboard")
        .cookie(harness.aged_session_cookie(&alice(), 7))
        .to_request();
    let resp = test::call_service(&app, req).await;

    assert_eq!(resp.status(), StatusCode::OK);
    let set_cookie = header(&resp, "set-cookie").expect("refresh cookie");
    assert!(set_cookie.starts_with(&format!("{}=", harness.cookie_name())));
    assert!(set_cookie.contains("HttpOnly"));
}

#[actix_web::test]
async fn fresh_session_is_not_reissued() {
    let harness = TestHarness::new();
    let app = test::init_service(build_app(harness.app_state.clone())).await;

    let req = test::TestRequest::get()
        .uri("/dashboard")
        .cookie(harness.session_cookie(&alice()))
        .to_request();
    let resp = test::call_service(&app, req).await;

    assert!(header(&resp, "set-cookie").is_none());
}

#[actix_web::test]
async fn configured_prefixes_replace_defaults() {
    let harness = TestHarness::with_builder(
        TestConfigBuilder::new().with_protected_prefixes(&["/reports"]),
    );
    let app = test::init_service(build_app(harness.app_state.clone())).await;

    let req = test::TestRequest::get().uri("/reports/2026").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(
        location(&resp).as_deref(),
        Some("/login?redirect=/reports/2026")
    );

    // Segment-aware: a sibling path sharing the prefix text stays public
    let req = test::TestRequest::get().uri("/reportsarchive").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[actix_web::test]
async fn unreachable_remote_auth_backend_fails_closed() {
    let harness = TestHarness::with_builder(
        TestConfigBuilder::new().with_remote_session("http://127.0.0.1:1/auth/v1/user"),
    );
    let app = test::init_service(build_app(harness.app_state.clone())).await;

    let req = test::TestRequest::get()
        .uri("/dashboard")
        .cookie(Cookie::new(harness.cookie_name().to_string(), "opaque-token"))
        .to_request();
    let resp = test::call_service(&app, req).await;

    assert_eq!(resp.status(), StatusCode::FOUND);
}

#[actix_web::test]
async fn configured_return_param_name_is_used_both_ways() {
    let harness =
        TestHarness::with_builder(TestConfigBuilder::new().with_return_param("redirectTo"));
    let app = test::init_service(build_app(harness.app_state.clone())).await;

    let req = test::TestRequest::get().uri("/dashboard").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(
        location(&resp).as_deref(),
        Some("/login?redirectTo=/dashboard")
    );

    let req = test::TestRequest::get()
        .uri("/login?redirectTo=%2Fsettings")
        .cookie(harness.session_cookie(&alice()))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(location(&resp).as_deref(), Some("/settings"));

    // The default name is no longer honoured
    let req = test::TestRequest::get()
        .uri("/login?redirect=%2Fsettings")
        .cookie(harness.session_cookie(&alice()))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(location(&resp).as_deref(), Some("/dashboard"));
}
