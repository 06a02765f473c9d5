use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tokio::io::{AsyncBufReadExt, BufReader};

use deskpilot::agent_core::{AskOutcome, AskRequest, Orchestrator, OutputEvent, OutputSink};
use deskpilot::inference::config::find_config_path;
use deskpilot::inference::types::Message;
use deskpilot::inference::{FileSettings, InferenceClient, SettingsProvider};
use deskpilot::tools::{FileCapturer, HeadlessInput, NoCapture, ScreenCapturer, ToolDispatcher};

#[derive(Parser)]
#[command(name = "deskpilot")]
#[command(about = "A terminal chat assistant that can drive the desktop")]
#[command(long_about = "Deskpilot streams answers from an OpenAI-compatible endpoint and runs the \
mouse, keyboard and screenshot tools the model asks for. Input is simulated by a headless \
backend that logs every action.\n\n\
Commands:\n\
  /screen [prompt]  Ask with a screenshot attached\n\
  /memory on|off    Keep or drop history between questions\n\
  /reset            Clear the conversation\n\
  /quit             Exit\n\n\
Ctrl+C stops the running answer; pressed while idle, it exits.")]
struct Args {
    /// Config file (defaults to $DESKPILOT_CONFIG, then <config_dir>/deskpilot/config.yaml)
    #[arg(short = 'c', long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// PNG served as the screen capture for TakeScreenshot and /screen
    #[arg(short = 's', long, value_name = "PATH")]
    screenshot: Option<PathBuf>,

    /// Start with conversation memory on, whatever the config says
    #[arg(short = 'm', long)]
    memory: bool,
}

/// Prints streamed output to the terminal.
struct TerminalSink {
    out: std::io::Stdout,
}

impl OutputSink for TerminalSink {
    fn handle(&mut self, event: OutputEvent<'_>) {
        let _ = match event {
            OutputEvent::RequestStarted(id) => {
                tracing::debug!(request_id = %id, "request started");
                Ok(())
            }
            OutputEvent::Message(Message::ToolResult { content, .. }) => {
                writeln!(self.out, "  ← {content}")
            }
            OutputEvent::Message(_) => Ok(()),
            OutputEvent::AssistantTurnStarted => writeln!(self.out),
            OutputEvent::TextChunk(chunk) => write!(self.out, "{chunk}"),
            OutputEvent::AssistantTurnEnded => writeln!(self.out),
            OutputEvent::ToolCall(call) => writeln!(
                self.out,
                "  → {}({})",
                call.name,
                call.arguments.to_string_lossy()
            ),
            OutputEvent::Notice(notice) => writeln!(self.out, "{notice}"),
            OutputEvent::Error(error) => writeln!(self.out, "[error] {error}"),
        };
        let _ = self.out.flush();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let log_path =
        deskpilot::logging::init_tracing(&deskpilot::data_dir()).context("failed to set up logging")?;

    let config_path = args.config.unwrap_or_else(find_config_path);
    let settings = Arc::new(FileSettings::new(&config_path));
    let initial = settings
        .settings()
        .with_context(|| format!("failed to read {}", config_path.display()))?;

    let input = Arc::new(HeadlessInput::new(initial.screen.width, initial.screen.height));
    let capturer: Arc<dyn ScreenCapturer> = match args.screenshot {
        Some(path) => Arc::new(FileCapturer::new(path)),
        None => Arc::new(NoCapture),
    };
    let backend = Arc::new(InferenceClient::new()?);
    let orchestrator = Orchestrator::new(
        backend,
        settings.clone(),
        ToolDispatcher::new(input.clone(), capturer.clone()),
    );

    let stop = orchestrator.stop_handle();
    tokio::spawn(async move {
        while tokio::signal::ctrl_c().await.is_ok() {
            if !stop.stop_latest() {
                tracing::info!("interrupted while idle, exiting");
                std::process::exit(130);
            }
        }
    });

    println!(
        "deskpilot {} (config: {}, log: {})",
        env!("CARGO_PKG_VERSION"),
        config_path.display(),
        log_path.display()
    );

    let mut sink = TerminalSink {
        out: std::io::stdout(),
    };
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut memory = args.memory.then_some(true);

    loop {
        print!("> ");
        std::io::stdout().flush()?;
        let Some(line) = lines.next_line().await? else {
            break;
        };
        let line = line.trim();

        let request = match line.split_once(' ').unwrap_or((line, "")) {
            ("/quit" | "/exit", _) => break,
            ("/reset", _) => {
                match orchestrator.reset() {
                    Ok(()) => println!("Conversation cleared."),
                    Err(e) => println!("[error] {e}"),
                }
                continue;
            }
            ("/memory", state @ ("on" | "off")) => {
                let on = state == "on";
                memory = Some(on);
                println!("Memory {}.", if on { "on" } else { "off" });
                continue;
            }
            ("/screen", prompt) => match capturer.capture() {
                Ok(image) => AskRequest::text(prompt).with_image(image),
                Err(e) => {
                    println!("[error] {e}");
                    continue;
                }
            },
            _ if line.starts_with('/') => {
                println!("Unknown command: {line}");
                continue;
            }
            _ => AskRequest::text(line),
        };

        let request = AskRequest { memory, ..request };
        match orchestrator.ask(request, &mut sink).await {
            Ok(AskOutcome::Cancelled) => println!("\n[stopped]"),
            Ok(outcome) => tracing::debug!(?outcome, "ask finished"),
            Err(e) => println!("[error] {e}"),
        }
        let performed = input.drain_actions();
        if !performed.is_empty() {
            tracing::debug!(count = performed.len(), "simulated actions this ask");
        }
    }

    Ok(())
}
