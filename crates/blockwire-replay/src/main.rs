//! blockwire replay binary.
//!
//! Seeds a mutation pipeline, pushes a JSON-lines mutation script through it
//! and prints every collaboration notification the pipeline raises, one JSON
//! object per line on stdout. Logs go to stderr.
//!
//! Usage:
//!   blockwire-replay --settings editor.toml --script session.jsonl
//!   blockwire-replay --settings editor.toml --data seed.json --script session.jsonl --dump
//!
//!   # treat every remote mutation as an echo
//!   blockwire-replay --settings editor.toml --script session.jsonl --swallow-remote
//!
//! Script lines are serialized mutations; blank lines and `#` comments are
//! skipped:
//!
//! ```text
//! {"op": "insert", "tool": "paragraph", "data": {"text": "hi"}}
//! {"op": "remove", "target": "0190c0de-...", "origin": "remote"}
//! ```

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use blockwire_editor::{
    CollabBridge, EditorConfig, EditorSettings, Mutation, MutationPipeline, Notification,
    OutputData, StaticGate, load_data, spawn_pipeline,
};
use clap::Parser;
use tokio::sync::mpsc;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "blockwire-replay")]
#[command(about = "Replay a mutation script through a blockwire pipeline")]
struct Args {
    /// Editor settings (TOML)
    #[arg(long)]
    settings: PathBuf,

    /// Seed document (JSON). Without it the store starts with one initial block.
    #[arg(long)]
    data: Option<PathBuf>,

    /// Mutation script (JSON lines)
    #[arg(long)]
    script: PathBuf,

    /// Swallow every remote mutation instead of notifying it
    #[arg(long)]
    swallow_remote: bool,

    /// Print the final document after the script has run
    #[arg(long)]
    dump: bool,
}

/// One parsed script line, with its 1-based line number for diagnostics.
#[derive(Debug)]
struct ScriptLine {
    line: usize,
    mutation: Mutation,
}

fn parse_script(text: &str) -> Result<Vec<ScriptLine>> {
    text.lines()
        .enumerate()
        .map(|(i, raw)| (i + 1, raw.trim()))
        .filter(|(_, raw)| !raw.is_empty() && !raw.starts_with('#'))
        .map(|(line, raw)| {
            let mutation = serde_json::from_str(raw)
                .with_context(|| format!("script line {line}: invalid mutation"))?;
            Ok(ScriptLine { line, mutation })
        })
        .collect()
}

fn load_script(path: &Path) -> Result<Vec<ScriptLine>> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("reading script {}", path.display()))?;
    parse_script(&text)
}

fn init_tracing(settings: &EditorSettings) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(settings.log_level.as_filter()));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .init();
}

/// Run the script and return the notifications in the order they were raised,
/// plus the final document.
async fn replay(
    mut config: EditorConfig,
    script: Vec<ScriptLine>,
) -> Result<(Vec<Notification>, OutputData)> {
    let (tx, mut rx) = mpsc::unbounded_channel();
    config.bridge = CollabBridge::forwarding(tx);

    let pipeline = MutationPipeline::new(config).context("seeding pipeline")?;
    let handle = spawn_pipeline(pipeline);

    let mut pending = Vec::with_capacity(script.len());
    for entry in script {
        pending.push((entry.line, handle.enqueue(entry.mutation)?));
    }

    let lines: Vec<usize> = pending.iter().map(|(line, _)| *line).collect();
    let outcomes = futures::future::join_all(pending.into_iter().map(|(_, p)| p)).await;

    let mut rejected = 0usize;
    for (line, outcome) in lines.into_iter().zip(outcomes) {
        if let Err(e) = outcome {
            rejected += 1;
            warn!(line, error = %e, "mutation rejected");
        }
    }

    let document = handle.snapshot().await?;
    // Every notification is sent before its outcome resolves.
    let mut notifications = Vec::new();
    while let Ok(n) = rx.try_recv() {
        notifications.push(n);
    }

    info!(
        notifications = notifications.len(),
        rejected,
        blocks = document.blocks.len(),
        "replay finished"
    );
    Ok((notifications, document))
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let settings = EditorSettings::load(&args.settings)
        .with_context(|| format!("loading settings {}", args.settings.display()))?;
    init_tracing(&settings);

    let mut config = EditorConfig::from_settings(&settings);
    if let Some(path) = &args.data {
        config.data =
            load_data(path).with_context(|| format!("loading seed data {}", path.display()))?;
    }
    if args.swallow_remote {
        config = config.with_gate(StaticGate(true));
    }

    let script = load_script(&args.script)?;
    info!(lines = script.len(), swallow_remote = args.swallow_remote, "replaying");

    let (notifications, document) = replay(config, script).await?;
    for n in &notifications {
        println!("{}", serde_json::to_string(n)?);
    }
    if args.dump {
        println!("{}", document.to_json_pretty()?);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use blockwire_editor::{BlockId, MutationOp, Origin, OutputBlock};
    use serde_json::{Value, json};

    #[test]
    fn test_parse_script_skips_blanks_and_comments() {
        let text = r#"
# seed a paragraph
{"op": "insert", "tool": "paragraph", "data": {"text": "hi"}}

{"op": "insert", "tool": "paragraph", "origin": "remote", "swallow": true}
"#;
        let script = parse_script(text).unwrap();
        assert_eq!(script.len(), 2);
        assert_eq!(script[0].line, 3);
        assert_eq!(script[1].line, 5);
        assert_eq!(script[1].mutation.origin, Origin::Remote);
        assert_eq!(script[1].mutation.swallow, Some(true));
    }

    #[test]
    fn test_parse_script_reports_line() {
        let err = parse_script("{\"op\": \"insert\", \"tool\": \"paragraph\"}\n{\"op\": \"explode\"}")
            .unwrap_err();
        assert!(format!("{err:#}").contains("script line 2"));
    }

    #[tokio::test]
    async fn test_replay_notifies_local_and_swallows_echo() {
        let id = BlockId::new();
        let config = EditorConfig::new().with_data(OutputData {
            blocks: vec![OutputBlock {
                id: Some(id),
                tool: "paragraph".into(),
                data: json!({"text": "a"}),
                settings: Value::Null,
            }],
            ..OutputData::default()
        });

        let script = vec![
            ScriptLine {
                line: 1,
                mutation: Mutation::local(MutationOp::update(id, json!({"text": "b"}))),
            },
            ScriptLine {
                line: 2,
                mutation: Mutation::remote(MutationOp::update(id, json!({"text": "c"})))
                    .with_swallow(true),
            },
            ScriptLine {
                line: 3,
                mutation: Mutation::local(MutationOp::remove(BlockId::new())),
            },
        ];

        let (notifications, document) = replay(config, script).await.unwrap();
        assert_eq!(notifications.len(), 1);
        assert!(matches!(&notifications[0], Notification::Update { mutation } if mutation.data == json!({"text": "b"})));
        assert_eq!(document.blocks[0].data, json!({"text": "c"}));
    }
}
