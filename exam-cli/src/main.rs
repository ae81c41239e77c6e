//! exam-cli: terminal client for the Exam Builder HTTP API
//!
//! # Subcommands
//! - `chat <message> [--user <id>] [--json]`: one assistant turn
//! - `evaluate --student .. --model .. --marks N`: score an answer
//! - `status`: show server health

use clap::{Parser, Subcommand, ValueEnum};
use serde::Deserialize;

const DEFAULT_SERVER: &str = "http://127.0.0.1:5000";
const DEFAULT_USER: &str = "teacher-123";

// ============================================================================
// CLI Definition
// ============================================================================

#[derive(Debug, Parser)]
#[command(name = "exam-cli", version, about = "Exam Builder assistant and evaluation CLI")]
struct Cli {
    /// Exam Builder HTTP server URL (overrides EXAM_HTTP_URL env var)
    #[arg(long, env = "EXAM_HTTP_URL", default_value = DEFAULT_SERVER)]
    server: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum BoardArg {
    Wb,
    Cbse,
    Custom,
}

impl BoardArg {
    fn wire_name(self) -> &'static str {
        match self {
            BoardArg::Wb => "WB",
            BoardArg::Cbse => "CBSE",
            BoardArg::Custom => "Custom",
        }
    }
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Send one message to the paper-creation assistant
    Chat {
        /// Message text
        message: String,

        /// Conversation owner
        #[arg(short, long, env = "EXAM_USER_ID", default_value = DEFAULT_USER)]
        user: String,

        /// Print the raw JSON response
        #[arg(long)]
        json: bool,
    },

    /// Score a student answer against a model answer
    Evaluate {
        /// Student's answer text
        #[arg(long)]
        student: String,

        /// Model answer text
        #[arg(long)]
        model: String,

        /// Total marks for the question
        #[arg(short = 'm', long)]
        marks: u32,

        /// Exam type, e.g. "Annual Exam" or "Class Test"
        #[arg(long, default_value = "Class Test")]
        exam_type: String,

        #[arg(long, value_enum, default_value_t = BoardArg::Cbse)]
        board: BoardArg,

        /// Print the raw JSON response
        #[arg(long)]
        json: bool,
    },

    /// Show Exam Builder server status
    Status,
}

// ============================================================================
// API Response Types
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct ChatResponse {
    pub reply: String,
    pub state: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoringResult {
    pub suggested_marks: u32,
    pub feedback: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EvaluateResponse {
    pub result: ScoringResult,
    pub from_cache: bool,
    pub took_ms: Option<u64>,
}

/// Human-readable evaluation summary.
pub fn format_evaluation(resp: &EvaluateResponse, total_marks: u32) -> String {
    let origin = if resp.from_cache { " (cached)" } else { "" };
    format!(
        "Marks: {}/{}{}\nFeedback: {}",
        resp.result.suggested_marks, total_marks, origin, resp.result.feedback
    )
}

// ============================================================================
// HTTP Client Calls
// ============================================================================

fn client() -> anyhow::Result<reqwest::blocking::Client> {
    Ok(reqwest::blocking::Client::builder()
        .timeout(std::time::Duration::from_secs(30))
        .build()?)
}

/// POST a JSON body and return the parsed JSON response, exiting on
/// connection or HTTP errors.
fn post(server: &str, path: &str, body: serde_json::Value) -> anyhow::Result<serde_json::Value> {
    let url = format!("{}{}", server, path);
    let resp = match client()?.post(&url).json(&body).send() {
        Ok(r) => r,
        Err(e) => {
            eprintln!("exam-cli: connection failed to {}: {}", url, e);
            std::process::exit(1);
        }
    };

    if !resp.status().is_success() {
        let status = resp.status();
        let body = resp.text().unwrap_or_default();
        eprintln!("exam-cli: server returned {}: {}", status, body);
        std::process::exit(1);
    }

    Ok(resp.json()?)
}

fn do_chat(server: &str, user: &str, message: &str, json_output: bool) -> anyhow::Result<()> {
    let value = post(
        server,
        "/api/chat",
        serde_json::json!({"userId": user, "message": message}),
    )?;

    if json_output {
        println!("{}", serde_json::to_string_pretty(&value)?);
        return Ok(());
    }

    let resp: ChatResponse = serde_json::from_value(value)?;
    println!("{}", resp.reply);
    println!("[state: {}]", resp.state);
    Ok(())
}

fn do_evaluate(
    server: &str,
    prompt: serde_json::Value,
    total_marks: u32,
    json_output: bool,
) -> anyhow::Result<()> {
    let value = post(server, "/api/ai-completion", serde_json::json!({"prompt": prompt}))?;

    if json_output {
        println!("{}", serde_json::to_string_pretty(&value)?);
        return Ok(());
    }

    let resp: EvaluateResponse = serde_json::from_value(value)?;
    println!("{}", format_evaluation(&resp, total_marks));
    Ok(())
}

fn do_status(server: &str) -> anyhow::Result<()> {
    let url = format!("{}/health", server);
    match client()?.get(&url).send() {
        Ok(resp) => {
            let status = resp.status();
            let body: serde_json::Value = resp.json().unwrap_or_default();
            if status.is_success() {
                println!("✅ Exam Builder server: {}", server);
                println!("   version: {}", body["version"].as_str().unwrap_or("unknown"));
                println!("   storage: {}", body["storage"].as_str().unwrap_or("unknown"));
                println!("   cache:   {}", body["cache"].as_str().unwrap_or("unknown"));
            } else {
                println!("❌ Exam Builder server unhealthy ({}): {}", status, body);
                std::process::exit(1);
            }
        }
        Err(e) => {
            println!("❌ Exam Builder server unreachable at {}: {}", server, e);
            std::process::exit(1);
        }
    }
    Ok(())
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let server = cli.server.trim_end_matches('/').to_string();

    match cli.command {
        Commands::Chat {
            message,
            user,
            json,
        } => do_chat(&server, &user, &message, json),
        Commands::Evaluate {
            student,
            model,
            marks,
            exam_type,
            board,
            json,
        } => {
            let prompt = serde_json::json!({
                "studentAnswer": student,
                "modelAnswer": model,
                "totalMarks": marks,
                "examType": exam_type,
                "board": board.wire_name(),
            });
            do_evaluate(&server, prompt, marks, json)
        }
        Commands::Status => do_status(&server),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parses_evaluate() {
        let cli = Cli::try_parse_from([
            "exam-cli",
            "evaluate",
            "--student",
            "plants make food",
            "--model",
            "photosynthesis makes food",
            "-m",
            "5",
            "--board",
            "wb",
        ])
        .unwrap();

        match cli.command {
            Commands::Evaluate { marks, board, exam_type, .. } => {
                assert_eq!(marks, 5);
                assert_eq!(board.wire_name(), "WB");
                assert_eq!(exam_type, "Class Test");
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_cli_chat_defaults_user() {
        let cli = Cli::try_parse_from(["exam-cli", "chat", "create a paper"]).unwrap();
        match cli.command {
            Commands::Chat { user, message, json } => {
                // EXAM_USER_ID may be set in the environment
                assert!(!user.is_empty());
                assert_eq!(message, "create a paper");
                assert!(!json);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_format_evaluation() {
        let resp: EvaluateResponse = serde_json::from_value(serde_json::json!({
            "result": {"suggestedMarks": 3, "feedback": "Good attempt"},
            "fromCache": true,
            "tookMs": 1
        }))
        .unwrap();
        assert_eq!(
            format_evaluation(&resp, 5),
            "Marks: 3/5 (cached)\nFeedback: Good attempt"
        );
    }
}
