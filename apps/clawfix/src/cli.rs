use std::io::Read;
use std::path::PathBuf;

use anyhow::{bail, Context};
use clap::{ArgGroup, Parser, Subcommand};
use serde_json::{json, Value};

use clawfix_lib::api::{self, ApiResponse};
use clawfix_lib::services::diagnostics::RuleRegistry;
use clawfix_lib::App;

#[derive(Parser, Debug)]
#[command(
    name = "clawfix",
    version,
    about = "Diagnose an OpenClaw installation and generate a fix script"
)]
pub(crate) struct Cli {
    #[command(subcommand)]
    pub(crate) command: Command,
}

#[derive(Subcommand, Debug)]
pub(crate) enum Command {
    /// Diagnose a snapshot file ("-" reads stdin)
    Diagnose {
        input: PathBuf,
        /// Print only the fix script
        #[arg(long)]
        script: bool,
    },
    /// Show a stored diagnosis
    Show {
        fix_id: String,
        /// Print only the fix script
        #[arg(long)]
        script: bool,
    },
    /// Report whether a fix worked
    #[command(group(ArgGroup::new("outcome").required(true).args(["success", "failed"])))]
    Feedback {
        fix_id: String,
        #[arg(long)]
        success: bool,
        #[arg(long)]
        failed: bool,
        /// Issues still present after running the script
        #[arg(long)]
        remaining: Option<u32>,
        #[arg(long)]
        comment: Option<String>,
    },
    /// Print aggregate statistics
    Stats,
    /// List the known-issue rules
    Rules {
        #[arg(long)]
        json: bool,
    },
}

/// Run a command. Returns the process exit code.
pub(crate) async fn run(app: &App, command: Command) -> anyhow::Result<i32> {
    match command {
        Command::Diagnose { input, script } => {
            let body = read_input(&input)?;
            let response = api::diagnose(app, &body).await;
            emit(response, script, "fixScript")
        }
        Command::Show { fix_id, script } => {
            let format = script.then_some("script");
            let response = api::get_fix(app, &fix_id, None, format).await;
            emit(response, false, "")
        }
        Command::Feedback {
            fix_id,
            success,
            failed,
            remaining,
            comment,
        } => {
            if success == failed {
                bail!("pass exactly one of --success or --failed");
            }
            let body = json!({
                "success": success,
                "issuesRemaining": remaining,
                "comment": comment,
            });
            let response = api::feedback(app, &fix_id, &body.to_string()).await;
            emit(response, false, "")
        }
        Command::Stats => emit(api::stats(app).await, false, ""),
        Command::Rules { json } => {
            print_rules(json)?;
            Ok(0)
        }
    }
}

fn read_input(input: &PathBuf) -> anyhow::Result<String> {
    if input.as_os_str() == "-" {
        let mut body = String::new();
        std::io::stdin()
            .read_to_string(&mut body)
            .context("reading snapshot from stdin")?;
        return Ok(body);
    }
    std::fs::read_to_string(input).with_context(|| format!("reading {}", input.display()))
}

/// Print a response. JSON bodies are pretty-printed; with `field` set and
/// `extract` true, only that string field is printed.
fn emit(response: ApiResponse, extract: bool, field: &str) -> anyhow::Result<i32> {
    let ok = (200..300).contains(&response.status);
    let text = match response.json_body() {
        Some(value) if ok && extract => value
            .get(field)
            .and_then(Value::as_str)
            .map(str::to_string)
            .with_context(|| format!("response has no '{}'", field))?,
        Some(value) => serde_json::to_string_pretty(&value)?,
        None => response.body,
    };

    if ok {
        print!("{}", text);
        if !text.ends_with('\n') {
            println!();
        }
        Ok(0)
    } else {
        eprintln!("{}", text);
        Ok(1)
    }
}

fn print_rules(as_json: bool) -> anyhow::Result<()> {
    let metadata = RuleRegistry::new().metadata();
    if as_json {
        println!("{}", serde_json::to_string_pretty(&metadata)?);
        return Ok(());
    }
    for rule in metadata {
        println!(
            "{:<9} {:<28} {}{}",
            rule.severity.as_str(),
            rule.id.as_str(),
            rule.title,
            if rule.fails_open { "  [fails open]" } else { "" }
        );
    }
    Ok(())
}
