/// Rename preview — scan a RON corpus for an entity's name and show every
/// proposed rewrite, optionally applying them.
///
/// Usage: rename_preview --corpus <path> --entity <id> (--to <name> | --suggest)
///                       [--from <name>] [--config <path>] [--accept-partials]
///                       [--apply [--out <path>]]

use clap::Parser;
use lore_rename::core::decision::MatchDecision;
use lore_rename::core::scanner::{MatchKind, ScanRequest};
use lore_rename::core::session::{RenameEngine, RenameSession};
use lore_rename::schema::corpus::Corpus;
use lore_rename::schema::entity::EntityId;
use lore_rename::storage::MemoryWorld;
use std::error::Error;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

const RUN_ID: &str = "preview";

#[derive(Parser, Debug)]
#[command(about = "Preview and apply an entity rename across a narrative corpus")]
struct Args {
    /// Corpus file (RON).
    #[arg(long)]
    corpus: PathBuf,

    /// Id of the entity being renamed.
    #[arg(long)]
    entity: String,

    /// Replacement name.
    #[arg(long, required_unless_present = "suggest")]
    to: Option<String>,

    /// Name to search for. Defaults to the entity's current name; pass the
    /// old name to repair text left behind by an earlier rename.
    #[arg(long)]
    from: Option<String>,

    /// Engine configuration (RON).
    #[arg(long)]
    config: Option<String>,

    /// Propose a replacement from the entity's culture instead of `--to`.
    #[arg(long)]
    suggest: bool,

    #[arg(long, default_value_t = 42)]
    seed: u64,

    /// Accept partial matches instead of leaving them rejected.
    #[arg(long)]
    accept_partials: bool,

    /// Write the patched corpus.
    #[arg(long)]
    apply: bool,

    /// Output path for `--apply`. Defaults to overwriting `--corpus`.
    #[arg(long)]
    out: Option<PathBuf>,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn Error>> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("warn".parse()?))
        .init();

    let world = MemoryWorld::new(RUN_ID, Corpus::load_from_ron(&args.corpus)?);
    let mut builder = RenameEngine::builder().seed(args.seed);
    if let Some(path) = &args.config {
        builder = builder.config_path(path);
    }
    let engine = builder.build()?;
    let mut session = RenameSession::new(engine.clone(), RUN_ID);

    let entity_id = EntityId::new(args.entity.as_str());
    let entity = session.load_entity(&world, &entity_id).await?;
    let old_name = args.from.clone().unwrap_or_else(|| entity.name.clone());
    let new_name = match &args.to {
        Some(name) => name.clone(),
        None => {
            let culture = entity.culture.as_deref().unwrap_or_default();
            let Some(name) = engine.suggest_name(&world.snapshot().await, culture) else {
                return Err(format!("no name suggestion available for culture '{culture}'").into());
            };
            println!("Suggested name: {name}");
            name
        }
    };

    let request = ScanRequest {

        entity_id,
        old_name,
        new_name: new_name.clone(),
    };
    let result = session.scan(&world, &request).await?.clone();

    if args.accept_partials {
        session
            .decisions_mut()?
            .set_kind(&result, MatchKind::Partial, MatchDecision::Accept);
    }

    println!("Renaming '{}' → '{}'\n", result.old_name, new_name);
    let previews = engine.preview(&result, &new_name, session.decisions());
    for group in &result.groups {
        println!(
            "[{}] {} '{}' ({})",
            group.label(),
            group.source.source_type,
            group.source.name,
            group.source.id
        );
        for id in &group.match_ids {
            let Some(m) = result.get(*id) else {
                continue;
            };
            if m.kind == MatchKind::Structural {
                println!("  {id} connection via {}", m.field);
                continue;
            }
            let Some((_, line)) = previews.iter().find(|(pid, _)| pid == id) else {
                continue;
            };
            let shown = match &line.replacement {
                Some(text) => format!("[{} → {}]", line.original, text),
                None => format!("[{} (kept)]", line.original),
            };
            println!(
                "  {id} {:?} {}: …{}{}{}…",
                m.kind, m.field, line.before, shown, line.after
            );
        }
    }

    let counts = session.decisions().counts();
    println!(
        "\n{} sources, {} matches: {} accepted, {} rejected, {} edited, {} connections",
        result.groups.len(),
        result.actionable().count(),
        counts.accepted,
        counts.rejected,
        counts.edited,
        result.connections().count()
    );

    if !args.apply {
        return Ok(());
    }

    let report = session.apply(&world, &world, &world, &new_name).await?;
    println!("{}", report.summary);
    if !report.skipped.is_empty() {
        println!("{} matches skipped because their text changed", report.skipped.len());
    }

    let out = args.out.unwrap_or(args.corpus);
    std::fs::write(&out, world.snapshot().await.to_ron()?)?;
    println!("Wrote {}", out.display());
    Ok(())
}
