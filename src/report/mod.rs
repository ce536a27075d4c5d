//! HTML progress/result page written by a running job.

use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use askama::Template;
use tracing::{info, warn};

use crate::{dataset::ProgressSink, model::FeatureList};

/// Final line of every page; pollers treat it as "job finished".
pub const DONE: &str = "Done.";

/// Ranked features of one class, ready for display.
#[derive(Debug, Clone)]
pub struct ClassFeatures {
    pub name: String,
    /// Corpus browser link for the class query; empty when unavailable.
    pub link: String,
    pub features: FeatureList,
}

/// How a job ended; drives what the final page shows.
#[derive(Debug)]
pub enum JobOutcome {
    Completed(Vec<ClassFeatures>),
    Failed(String),
}

#[derive(Template)]
#[template(path = "report.html")]
struct ReportPage<'a> {
    style_path: &'a str,
    messages: &'a [String],
    classes: &'a [ClassFeatures],
    finished: bool,
}

/// Result page owned by one job, fully rewritten on every update.
#[derive(Debug)]
pub struct Report {
    path: PathBuf,
    style_path: String,
    messages: Vec<String>,
}

impl Report {
    pub fn new(path: impl Into<PathBuf>, style_path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            style_path: style_path.into(),
            messages: Vec::new(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn messages(&self) -> &[String] {
        &self.messages
    }

    /// Append a line without touching the file.
    pub fn push(&mut self, line: impl Into<String>) {
        self.messages.push(line.into());
    }

    /// Rewrite the page with the messages gathered so far.
    pub fn write_progress(&self) -> Result<()> {
        self.write(&[], false)
    }

    /// Close the page according to `outcome` and write it a last time.
    pub fn finish(&mut self, outcome: JobOutcome) -> Result<()> {
        let classes = match outcome {
            JobOutcome::Completed(classes) => classes,
            JobOutcome::Failed(reason) => {
                self.messages.push(format!("Error: {reason}"));
                Vec::new()
            }
        };
        self.messages.push(DONE.to_string());
        self.write(&classes, true)?;
        info!(path = %self.path.display(), classes = classes.len(), "report finished");
        Ok(())
    }

    fn write(&self, classes: &[ClassFeatures], finished: bool) -> Result<()> {
        let page = ReportPage {
            style_path: &self.style_path,
            messages: &self.messages,
            classes,
            finished,
        };
        let html = page.render().context("rendering report")?;
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&self.path, html).with_context(|| format!("write {:?}", self.path))?;
        Ok(())
    }
}

impl ProgressSink for Report {
    fn message(&mut self, line: String) {
        self.messages.push(line);
        if let Err(err) = self.write_progress() {
            warn!(error = %err, "could not update progress page");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Feature;

    #[test]
    fn failed_jobs_still_end_with_done() {
        let dir = tempfile::tempdir().unwrap();
        let mut report = Report::new(dir.path().join("r.html"), "/static/style.css");
        report.push("Running");
        report
            .finish(JobOutcome::Failed("backend unreachable".into()))
            .unwrap();
        assert_eq!(
            report.messages(),
            ["Running", "Error: backend unreachable", "Done."]
        );
        let html = fs::read_to_string(report.path()).unwrap();
        assert!(html.contains("Error: backend unreachable"));
        assert!(html.contains("/static/style.css"));
    }

    #[test]
    fn features_are_rendered_escaped() {
        let dir = tempfile::tempdir().unwrap();
        let mut report = Report::new(dir.path().join("r.html"), "");
        let classes = vec![ClassFeatures {
            name: "cat".into(),
            link: "http://example.org/?q=%22cat%22".into(),
            features: vec![Feature {
                token: "<b>".into(),
                weight: 0.123456,
            }],
        }];
        report.finish(JobOutcome::Completed(classes)).unwrap();
        let html = fs::read_to_string(report.path()).unwrap();
        assert!(html.contains("&lt;b&gt;"));
        assert!(html.contains("0.123"));
        assert!(html.contains("Done."));
    }
}
