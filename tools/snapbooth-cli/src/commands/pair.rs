//! Paired booth: host or join over TCP and take commands from stdin.

use snapbooth_capture_engine::{BoothController, LocalCommand, TcpLink};
use snapbooth_common::config::AppConfig;
use snapbooth_model::settings::SettingKey;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;

use crate::BoothArgs;

const HELP: &str = "Commands: snap | set <layout|filter|paper|border|caption> <value> | reset | quit";

pub async fn host(config: &AppConfig, bind: String, args: BoothArgs) -> anyhow::Result<()> {
    let booth = super::build_controller(config, &args)?;
    println!("Hosting on {bind}; waiting for the other booth to join...");
    let link = TcpLink::accept(bind.as_str()).await?;
    println!("Paired with {}", link.peer_addr());
    run_paired(booth.with_link(Box::new(link))).await
}

pub async fn join(config: &AppConfig, addr: String, args: BoothArgs) -> anyhow::Result<()> {
    let booth = super::build_controller(config, &args)?;
    println!("Joining {addr}...");
    let link = TcpLink::connect(addr.as_str()).await?;
    println!("Paired with {}", link.peer_addr());
    run_paired(booth.with_link(Box::new(link))).await
}

async fn run_paired(mut booth: BoothController) -> anyhow::Result<()> {
    let (commands, inbox) = mpsc::unbounded_channel();

    tokio::spawn(async move {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        println!("{HELP}");
        loop {
            let line = match lines.next_line().await {
                Ok(Some(line)) => line,
                Ok(None) => break,
                Err(e) => {
                    tracing::warn!(error = %e, "stdin read failed");
                    break;
                }
            };
            if line.trim().is_empty() {
                continue;
            }
            match parse_command(&line) {
                Ok(command) => {
                    let quit = command == LocalCommand::Quit;
                    if commands.send(command).is_err() || quit {
                        break;
                    }
                }
                Err(message) => println!("{message}\n{HELP}"),
            }
        }
    });

    booth.run(inbox).await?;
    Ok(())
}

/// Parse one line typed by the operator.
pub fn parse_command(line: &str) -> Result<LocalCommand, String> {
    let line = line.trim();
    let (verb, rest) = line.split_once(char::is_whitespace).unwrap_or((line, ""));
    match verb.to_ascii_lowercase().as_str() {
        "snap" | "s" => Ok(LocalCommand::Snap),
        "reset" | "r" => Ok(LocalCommand::Reset),
        "quit" | "q" | "exit" => Ok(LocalCommand::Quit),
        "set" => {
            let rest = rest.trim();
            let (key, value) = rest.split_once(char::is_whitespace).unwrap_or((rest, ""));
            let key: SettingKey = key.parse().map_err(|e| format!("{e}"))?;
            let value = value.trim();
            if value.is_empty() && key != SettingKey::Caption {
                return Err(format!("`set {key}` needs a value"));
            }
            Ok(LocalCommand::Set {
                key,
                value: value.to_string(),
            })
        }
        other => Err(format!("Unknown command {other:?}")),
    }
}
