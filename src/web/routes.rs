//! HTTP route handlers for Axum.

use askama::Template;
use axum::{extract::State, http::StatusCode, response::Html, Form, Json};
use chrono::Local;
use serde::Serialize;
use tracing::{info, warn};

use crate::{config::Settings, corpus::CorpusSelector, job::JobDescriptor};

use super::{form, launch, AppState};

type ApiResult<T> = Result<Json<T>, (StatusCode, String)>;

/// One line of a submission answer, optionally followed by a link.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Notice {
    pub text: String,
    pub href: String,
    pub link_text: String,
}

impl Notice {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Self::default()
        }
    }

    pub fn link(text: impl Into<String>, href: impl Into<String>, link_text: &str) -> Self {
        Self {
            text: text.into(),
            href: href.into(),
            link_text: link_text.to_string(),
        }
    }

    fn blank() -> Self {
        Self::default()
    }
}

#[derive(Debug, Serialize)]
pub struct QueryResponse {
    pub ret: String,
}

#[derive(Template)]
#[template(path = "index.html")]
struct IndexPage<'a> {
    default_corpus: &'a str,
}

#[derive(Template)]
#[template(path = "messages.html")]
struct MessagesFragment<'a> {
    notices: &'a [Notice],
}

fn internal<E: std::fmt::Display>(err: E) -> (StatusCode, String) {
    (StatusCode::INTERNAL_SERVER_ERROR, err.to_string())
}

pub async fn index(State(state): State<AppState>) -> Result<Html<String>, (StatusCode, String)> {
    let default_corpus = default_corpus(&state.settings).to_string();
    let page = IndexPage {
        default_corpus: &default_corpus,
    };
    page.render().map(Html).map_err(internal)
}

pub async fn query(
    State(state): State<AppState>,
    Form(fields): Form<Vec<(String, String)>>,
) -> ApiResult<QueryResponse> {
    let notices = submit(&state, &fields).map_err(internal)?;
    let ret = MessagesFragment { notices: &notices }
        .render()
        .map_err(internal)?;
    Ok(Json(QueryResponse { ret }))
}

fn default_corpus(settings: &Settings) -> CorpusSelector {
    CorpusSelector::DepSearch {
        db: settings.dep_search_db.clone(),
    }
}

/// Validate, deduplicate and launch; the notices explain what happened.
fn submit(state: &AppState, fields: &[(String, String)]) -> anyhow::Result<Vec<Notice>> {
    let settings = &state.settings;
    let parsed = form::parse(fields, &default_corpus(settings));
    let mut notices: Vec<Notice> = parsed.warnings.iter().map(Notice::text).collect();

    let request = match parsed.request {
        Some(request) if parsed.errors.is_empty() => request,
        _ => {
            let mut notices: Vec<Notice> = parsed.errors.iter().map(Notice::text).collect();
            notices.push(Notice::blank());
            notices.push(Notice::text(
                "Job not submitted. Fix errors and try again.",
            ));
            return Ok(notices);
        }
    };

    let mut descriptor = JobDescriptor::from_request(&request);
    let hash = descriptor.hash()?;
    let job_path = settings.job_path(&hash);
    info!(%hash, "query submitted");

    if job_path.exists() {
        let existing = JobDescriptor::load(&job_path)?;
        let running = existing.pid.is_some_and(launch::process_alive);
        if !parsed.rerun || running {
            let url = results_url(settings, &existing.report_file_name(&hash));
            notices.push(Notice::link(
                "Results for this experiment already exist. If you anyway want to run the experiment again, use rerun option.",
                url,
                "Open results",
            ));
            if parsed.rerun {
                warn!(%hash, "rerun refused, job still running");
                notices.push(Notice::text(
                    "Not possible to rerun while the same experiment is still running on the background.",
                ));
            }
            notices.push(Notice::blank());
            notices.push(Notice::text("Job not submitted."));
            return Ok(notices);
        }
    }

    let now = Local::now();
    descriptor.date = Some(now.format("%d-%m-%y").to_string());
    descriptor.time = Some(now.format("%H-%M-%S").to_string());
    descriptor.save(&job_path)?;
    let pid = launch::spawn_job(&state.job_exe, &hash, &settings.style_url)?;
    descriptor.pid = Some(pid);
    descriptor.save(&job_path)?;

    if !notices.is_empty() {
        notices.push(Notice::blank());
    }
    notices.extend(descriptor.summary().into_iter().map(Notice::text));
    notices.push(Notice::blank());
    notices.push(Notice::text(format!(
        "Job launched {}.",
        descriptor.launched_at()
    )));
    notices.push(Notice::link(
        "Results will appear at",
        results_url(settings, &descriptor.report_file_name(&hash)),
        "this page",
    ));
    Ok(notices)
}

/// Public URL of a report, given that results live below the static root.
fn results_url(settings: &Settings, file_name: &str) -> String {
    let relative = settings
        .results_dir
        .strip_prefix(&settings.static_dir)
        .ok()
        .map(|p| {
            p.components()
                .map(|c| c.as_os_str().to_string_lossy().into_owned())
                .collect::<Vec<_>>()
                .join("/")
        })
        .unwrap_or_else(|| "results".to_string());
    if relative.is_empty() {
        format!("/static/{file_name}")
    } else {
        format!("/static/{relative}/{file_name}")
    }
}
