use std::error::Error;
use std::io::{self, Write};

use serde::Serialize;
use serde_json::{json, Value};

use crate::cli::OutputMode;
use crate::config::ConfigReport;
use crate::enroll::EnrollOutcome;
use crate::errors::{AppError, AppResult};
use crate::recognize::RecognizeOutcome;
use crate::users::{UserSummary, UsersOutcome};

pub fn render_enroll(outcome: &EnrollOutcome, mode: OutputMode, verbose: bool) -> AppResult<()> {
    match mode {
        OutputMode::Human => {
            if verbose {
                for line in &outcome.logs {
                    tracing::info!("{line}");
                }
            }
            println!(
                "Enrollment successful: {} ({}) with {} left and {} right image(s)",
                outcome.name, outcome.id, outcome.left_samples, outcome.right_samples
            );
            println!("Registry: {}", outcome.registry_path.display());
        }
        OutputMode::Json => write_json(&enroll_json_payload(outcome))?,
    }
    Ok(())
}

fn enroll_json_payload(outcome: &EnrollOutcome) -> Value {
    json!({
        "success": true,
        "id": outcome.id,
        "name": outcome.name,
        "session_id": outcome.session_id,
        "left_samples": outcome.left_samples,
        "right_samples": outcome.right_samples,
        "registry_path": outcome.registry_path.display().to_string(),
        "completed_at": outcome.completed_at,
    })
}

pub fn render_recognize(outcome: &RecognizeOutcome, mode: OutputMode) -> AppResult<()> {
    match mode {
        OutputMode::Human => {
            let result = &outcome.result;
            match (&result.candidate, result.is_match) {
                (Some(candidate), true) => println!(
                    "Match: {} ({}) score {:.4} > threshold {:.4}",
                    candidate.name, candidate.id, result.score, outcome.threshold
                ),
                _ => println!(
                    "No match: best score {:.4} (threshold {:.4})",
                    result.score, outcome.threshold
                ),
            }
            for entry in &result.ranking {
                println!(
                    "  {}  {:.4}  ({} template(s))",
                    entry.id, entry.score, entry.templates
                );
            }
        }
        OutputMode::Json => write_json(outcome)?,
    }
    Ok(())
}

pub fn render_users(outcome: &UsersOutcome, mode: OutputMode) -> AppResult<()> {
    match mode {
        OutputMode::Human => match outcome {
            UsersOutcome::List { users } => print_user_table(users),
            UsersOutcome::Search { query, users } => {
                println!("{} user(s) matching '{query}'", users.len());
                print_user_table(users);
            }
            UsersOutcome::Delete {
                user,
                images_removed,
                images_missing,
                images_failed,
            } => {
                println!(
                    "Deleted {} ({}): {images_removed} image(s) removed, {images_missing} already missing",
                    user.name, user.id
                );
                if *images_failed > 0 {
                    println!("warning: {images_failed} image(s) could not be removed");
                }
            }
            UsersOutcome::Images { id, images } => {
                if images.is_empty() {
                    println!("No images stored for {id}");
                }
                for image in images {
                    println!(
                        "{:<5} {:>3}  {}",
                        image.hand.to_string(),
                        image.sequence,
                        image.path.display()
                    );
                }
            }
        },
        OutputMode::Json => write_json(outcome)?,
    }
    Ok(())
}

fn print_user_table(users: &[UserSummary]) {
    if users.is_empty() {
        println!("No users registered");
        return;
    }
    for user in users {
        println!(
            "{}  {}  (left: {}, right: {})",
            user.id, user.name, user.left_images, user.right_images
        );
    }
}

pub fn render_config(report: &ConfigReport, mode: OutputMode) -> AppResult<()> {
    match mode {
        OutputMode::Human => {
            match &report.source {
                Some(path) => println!("Config file: {}", path.display()),
                None => println!("Config file: none (built-in defaults)"),
            }
            println!("similarity_threshold = {}", report.similarity_threshold);
            println!("samples_per_hand = {}", report.samples_per_hand);
            println!(
                "hand_switch_pause_millis = {}",
                report.hand_switch_pause_millis
            );
            println!("registry_path = {}", report.registry_path.display());
            println!("image_dir = {}", report.image_dir.display());
            println!("template_size = {}", report.template_size);
        }
        OutputMode::Json => write_json(report)?,
    }
    Ok(())
}

pub fn render_error(err: &AppError, mode: OutputMode) {
    match mode {
        OutputMode::Human => {
            eprintln!("error: {}", err.human_message());
            if let Some(source) = err.source() {
                eprintln!("cause: {}", source);
            }
        }
        OutputMode::Json => {
            let payload = json!({
                "success": false,
                "error": err.human_message(),
            });
            if let Ok(json) = serde_json::to_string(&payload) {
                println!("{}", json);
            }
            if let Some(source) = err.source() {
                eprintln!("cause: {}", source);
            }
        }
    }
}

fn write_json<T: Serialize + ?Sized>(payload: &T) -> AppResult<()> {
    let stdout = io::stdout();
    let mut handle = stdout.lock();
    let payload = serde_json::to_string(payload)?;
    handle.write_all(payload.as_bytes())?;
    handle.write_all(b"\n")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    use chrono::{SecondsFormat, Utc};
    use palmkiosk_core::palm::{Candidate, MatchResult, UserScore};

    #[test]
    fn enroll_json_includes_required_fields() {
        let outcome = EnrollOutcome {
            id: "110101199001010011".into(),
            name: "Alice".into(),
            session_id: Some("3f1c".into()),
            left_samples: 10,
            right_samples: 10,
            registry_path: PathBuf::from("/var/lib/palmkiosk/user_data.json"),
            completed_at: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
            logs: vec!["Left hand complete (10 samples)".into()],
        };

        let payload = enroll_json_payload(&outcome);
        assert_eq!(payload["success"], true);
        assert_eq!(payload["id"], "110101199001010011");
        assert_eq!(payload["left_samples"], 10);
        assert_eq!(
            payload["registry_path"],
            "/var/lib/palmkiosk/user_data.json"
        );
        assert!(payload.get("logs").is_none());
        assert!(payload["completed_at"].as_str().unwrap().ends_with('Z'));
    }

    #[test]
    fn recognize_json_flattens_match_result() {
        let outcome = RecognizeOutcome {
            probe: PathBuf::from("probe.png"),
            threshold: 0.5,
            result: MatchResult {
                candidate: Some(Candidate {
                    id: "110101199001010011".into(),
                    name: "Alice".into(),
                }),
                score: 0.9,
                is_match: true,
                ranking: vec![UserScore {
                    id: "110101199001010011".into(),
                    score: 0.9,
                    templates: 20,
                }],
            },
            checked_at: "2026-01-01T00:00:00.000Z".into(),
        };

        let value = serde_json::to_value(&outcome).unwrap();
        assert_eq!(value["is_match"], true);
        assert_eq!(value["candidate"]["name"], "Alice");
        assert_eq!(value["ranking"][0]["templates"], 20);
        assert_eq!(value["threshold"], 0.5);
    }

    #[test]
    fn users_json_is_tagged_by_action() {
        let outcome = UsersOutcome::Search {
            query: "ali".into(),
            users: vec![],
        };
        let value = serde_json::to_value(&outcome).unwrap();
        assert_eq!(value["action"], "search");
        assert_eq!(value["query"], "ali");
    }
}
