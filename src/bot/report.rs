use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::Utc;
use teloxide::payloads::SendDocumentSetters;
use teloxide::prelude::*;
use teloxide::types::{ChatId, InputFile, ParseMode, UserId};

use super::{res, WBot};
use crate::impls::{file_safe, LoggableErrorResult};
use crate::registry::Registry;
use crate::scheduler;
use crate::submissions::{Merged, SubmissionBox};

/// Merges the day's submissions of every category and sends each report to the
/// admins. Processed submissions are deleted even when nothing was sent.
pub async fn run(bot: WBot, registry: Arc<Registry>, submissions: Arc<SubmissionBox>, admins: Vec<UserId>) {
    log::info!("starting daily file merge and send process");
    let schedule = registry.delivery_schedule();
    let tz = scheduler::timezone(&schedule).ok_or_log().unwrap_or(chrono_tz::Asia::Dhaka);
    let date = Utc::now().with_timezone(&tz).format("%Y-%m-%d").to_string();
    let categories = registry.submission_categories();
    if categories.is_empty() {
        log::info!("no file submission categories configured, skipping merge");
        return;
    }
    for category in categories {
        log::info!("processing report for category '{}'", category);
        let build = {
            let (submissions, category, date) = (submissions.clone(), category.clone(), date.clone());
            tokio::task::spawn_blocking(move || build_report(&submissions, &category, &date))
        };
        let path = match build.await {
            Ok(Ok(Some(path))) => path,
            Ok(Ok(None)) => continue,
            Ok(Err(e)) => {
                log::error!("cannot build report for '{}': {:#}", category, e);
                continue;
            }
            Err(e) => {
                log::error!("report task for '{}' failed: {}", category, e);
                continue;
            }
        };
        send_report(&bot, &admins, &category, &date, &path).await;
        tokio::fs::remove_file(&path).await.ok_or_log();
    }
}

fn build_report(submissions: &SubmissionBox, category: &str, date: &str) -> anyhow::Result<Option<PathBuf>> {
    let files = submissions.files_for(category)?;
    if files.is_empty() {
        log::warn!("no files submitted for category '{}', skipping", category);
        return Ok(None);
    }
    let merged = Merged::from_files(&files);
    for file in &files {
        std::fs::remove_file(file).ok_or_log();
    }
    let Some(merged) = merged else {
        log::info!("only header or no data for category '{}', skipping report", category);
        return Ok(None);
    };
    let path = std::env::temp_dir().join(report_file_name(category, date));
    merged.save(category, &path)?;
    Ok(Some(path))
}

fn report_file_name(category: &str, date: &str) -> String {
    file_safe(&format!("{}_Report_{}.xlsx", category, date))
}

async fn send_report(bot: &WBot, admins: &[UserId], category: &str, date: &str, path: &Path) {
    let caption = res::report_caption(category, date);
    for admin in admins {
        let document = InputFile::file(path.to_path_buf()).file_name(report_file_name(category, date));
        let sent = bot
            .send_document(ChatId::from(*admin), document)
            .caption(caption.clone())
            .parse_mode(ParseMode::MarkdownV2)
            .await;
        match sent {
            Ok(_) => log::info!("sent '{}' report to admin {}", category, admin.0),
            Err(e) => log::error!("failed to send '{}' report to admin {}: {}", category, admin.0, e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_xlsxwriter::Workbook;

    fn submit(inbox: &SubmissionBox, user: u64, category: &str, rows: &[[&str; 2]]) -> PathBuf {
        let path = inbox.prepare(UserId(user), category).unwrap();
        let mut workbook = Workbook::new();
        let sheet = workbook.add_worksheet();
        for (r, row) in rows.iter().enumerate() {
            for (c, value) in row.iter().enumerate() {
                sheet.write_string(r as u32, c as u16, *value).unwrap();
            }
        }
        workbook.save(&path).unwrap();
        path
    }

    #[test]
    fn report_is_built_and_submissions_are_consumed() {
        let dir = tempfile::tempdir().unwrap();
        let inbox = SubmissionBox::new(dir.path());
        let first = submit(&inbox, 1, "Cat Report Test", &[["Email", "Pass"], ["a@x.com", "1"]]);
        let second = submit(&inbox, 2, "Cat Report Test", &[["Email", "Pass"], ["b@x.com", "2"]]);

        let path = build_report(&inbox, "Cat Report Test", "2024-05-01").unwrap().unwrap();
        assert!(path.ends_with("Cat Report Test_Report_2024-05-01.xlsx"));
        assert!(path.is_file());
        assert!(!first.exists());
        assert!(!second.exists());
        std::fs::remove_file(path).unwrap();
    }

    #[test]
    fn header_only_submissions_are_deleted_without_report() {
        let dir = tempfile::tempdir().unwrap();
        let inbox = SubmissionBox::new(dir.path());
        let only_header = submit(&inbox, 1, "Empty Report Test", &[["Email", "Pass"]]);

        assert!(build_report(&inbox, "Empty Report Test", "2024-05-01").unwrap().is_none());
        assert!(!only_header.exists());
        assert!(build_report(&inbox, "Nothing Submitted", "2024-05-01").unwrap().is_none());
    }

    #[test]
    fn file_names_stay_in_one_directory() {
        assert_eq!(report_file_name("a/b", "2024-05-01"), "a_b_Report_2024-05-01.xlsx");
    }
}
