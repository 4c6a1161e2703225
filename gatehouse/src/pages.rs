// This file is part of the product Gatehouse.
// SPDX-FileCopyrightText: 2025-2026 Zivatar Limited
// SPDX-License-Identifier: AGPL-3.0-or-later
// The code and documentation in this repository is licensed under the GNU Affero General Public License v3.0 or later (AGPL-3.0-or-later). See LICENSE.

//! Minimal server-rendered pages. Every interpolated value goes through the
//! output encoder for the context it lands in.

use actix_web::{HttpRequest, HttpResponse, web};
use serde::Deserialize;

use crate::app_state::AppState;
use crate::config::RoutesConfig;
use crate::iam::AuthRequest;
use crate::security::contexts::{CssValue, HtmlBody, ScriptLiteral, UrlParam};
use crate::security::{Encoded, safe_return_path};

pub fn configure(cfg: &mut web::ServiceConfig, routes: &RoutesConfig) {
    cfg.route("/", web::get().to(index))
        .route(&routes.login_path, web::get().to(login))
        .route(&routes.landing_path, web::get().to(landing));
}

fn render(
    title: &Encoded<HtmlBody>,
    body_class: &Encoded<CssValue>,
    content: &str,
) -> HttpResponse {
    let html = format!(
        "<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\">\n<title>{}</title>\n</head>\n<body class=\"theme-{}\">\n{}\n</body>\n</html>\n",
        title, body_class, content
    );
    HttpResponse::Ok()
        .content_type("text/html; charset=utf-8")
        .body(html)
}

#[derive(Deserialize)]
pub struct IndexQuery {
    #[serde(default)]
    theme: Option<String>,
}

async fn index(state: web::Data<AppState>, query: web::Query<IndexQuery>) -> HttpResponse {
    let policy = &state.route_policy;
    let title: Encoded<HtmlBody> = Encoded::new(&state.config.app.name);
    let theme: Encoded<CssValue> = Encoded::new(query.theme.as_deref().unwrap_or("light"));
    let landing: Encoded<UrlParam> = Encoded::new(policy.landing_path());
    let login_href: Encoded<HtmlBody> = Encoded::new(&format!(
        "{}?{}={}",
        policy.login_path(),
        policy.return_param(),
        landing
    ));

    let content = format!(
        "<h1>{}</h1>\n<p><a href=\"{}\">Sign in</a></p>",
        title, login_href
    );
    render(&title, &theme, &content)
}

async fn login(req: HttpRequest, state: web::Data<AppState>) -> HttpResponse {
    let policy = &state.route_policy;
    let return_to = web::Query::<Vec<(String, String)>>::from_query(req.query_string())
        .ok()
        .and_then(|pairs| {
            pairs
                .into_inner()
                .into_iter()
                .find(|(key, _)| key == policy.return_param())
                .and_then(|(_, value)| safe_return_path(&value))
        })
        .unwrap_or_else(|| policy.landing_path().to_string());

    let title: Encoded<HtmlBody> = Encoded::new(&format!("Sign in to {}", state.config.app.name));
    let param: Encoded<HtmlBody> = Encoded::new(policy.return_param());
    let return_to: Encoded<HtmlBody> = Encoded::new(&return_to);

    let content = format!(
        "<h1>{}</h1>\n<form method=\"post\">\n<input type=\"hidden\" name=\"{}\" value=\"{}\">\n</form>",
        title, param, return_to
    );
    render(&title, &Encoded::new("light"), &content)
}

async fn landing(req: HttpRequest, state: web::Data<AppState>) -> HttpResponse {
    let principal = req.principal();
    let display_name = principal
        .as_ref()
        .map(|p| p.display_name.as_str())
        .unwrap_or("guest");

    let title: Encoded<HtmlBody> = Encoded::new(&state.config.app.name);
    let greeting: Encoded<HtmlBody> = Encoded::new(&format!("Welcome, {}", display_name));
    let subject: Encoded<ScriptLiteral> =
        Encoded::new(principal.as_ref().map(|p| p.subject.as_str()).unwrap_or(""));

    let content = format!(
        "<h1>{}</h1>\n<script type=\"application/json\" id=\"session-data\">{{\"subject\":{}}}</script>",
        greeting, subject
    );
    render(&title, &Encoded::new("light"), &content)
}
