//! Skill Memory - Entry Point
//!
//! Commands:
//! - status: registry and index counts
//! - retrieve <query...>: print retrieved skill code
//! - rebuild-index: regenerate the similarity index from skills.json
//! - frames <dir> <n>: show which frames would be sampled

use skill_memory::{AgentContext, Config, FrameSampler, SimilarityIndex, SkillStore, SqliteVectorIndex};
use skill_memory::skills::SkillPaths;
use std::path::Path;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

fn print_help() {
    println!("Skill Memory v{}", env!("CARGO_PKG_VERSION"));
    println!();
    println!("Usage: skill-memory [OPTIONS] <COMMAND>");
    println!();
    println!("Commands:");
    println!("  status               Show registry and index counts");
    println!("  retrieve <query...>  Print code of the most relevant skills");
    println!("  rebuild-index        Regenerate the similarity index from skills.json");
    println!("  frames <dir> <n>     Show frames sampled from a run directory");
    println!();
    println!("Options:");
    println!("  --json      Log as JSON lines on stderr");
    println!("  --help, -h  Show this help");
    println!();
    println!("Environment variables:");
    println!("  SKILL_CKPT_DIR         Checkpoint root (default: ckpt)");
    println!("  SKILL_RESUME           Load registry from checkpoint (default: false)");
    println!("  SKILL_RETRIEVAL_TOP_K  Retrieval bound (default: 5)");
    println!("  SKILL_CONTROL_PRIMITIVES_DIR  Directory of control primitive sources");
    println!("  EMBEDDING_BACKEND      local | ollama | openai (default: local)");
    println!("  COMPLETION_BACKEND     ollama | openai (default: openai)");
    println!("  OPENAI_API_KEY         Hosted API key");
    println!("  OLLAMA_URL             Ollama URL (default: http://localhost:11434)");
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment
    dotenvy::dotenv().ok();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let json_logs = args.iter().any(|a| a == "--json");
    let help_mode = args.iter().any(|a| a == "--help" || a == "-h");
    let positional: Vec<&str> = args
        .iter()
        .filter(|a| !a.starts_with('-'))
        .map(|a| a.as_str())
        .collect();

    if help_mode || positional.is_empty() {
        print_help();
        return Ok(());
    }

    let log_level = std::env::var("RUST_LOG")
        .map(|s| match s.to_lowercase().as_str() {
            "trace" => Level::TRACE,
            "debug" => Level::DEBUG,
            "warn" => Level::WARN,
            "error" => Level::ERROR,
            _ => Level::INFO,
        })
        .unwrap_or(Level::INFO);

    if json_logs {
        let subscriber = FmtSubscriber::builder()
            .with_max_level(log_level)
            .with_writer(std::io::stderr)
            .with_ansi(false)
            .json()
            .finish();
        tracing::subscriber::set_global_default(subscriber)?;
    } else {
        let subscriber = FmtSubscriber::builder()
            .with_max_level(log_level)
            .with_writer(std::io::stderr)
            .with_ansi(true)
            .finish();
        tracing::subscriber::set_global_default(subscriber)?;
    }

    let config = Config::from_env()?;

    match positional[0] {
        "status" => {
            let ctx = AgentContext::from_config(config)?;
            let store = SkillStore::open(&ctx).await?;
            println!("registry: {} skills", store.len());
            println!("index:    {} entries", store.index_count().await?);
        }
        "retrieve" => {
            let query = positional[1..].join(" ");
            if query.is_empty() {
                anyhow::bail!("retrieve requires a query");
            }
            let ctx = AgentContext::from_config(config)?;
            let store = SkillStore::open(&ctx).await?;
            for code in store.retrieve(&query).await? {
                println!("{}\n", code);
            }
        }
        "rebuild-index" => {
            let ctx = AgentContext::from_config(config)?;
            let paths = SkillPaths::new(&ctx.config.store.ckpt_dir, &ctx.config.store.code_extension);
            let index = SqliteVectorIndex::open(&paths.vectordb_dir, ctx.embedder.clone())?;
            info!(before = index.count().await?, "Rebuilding similarity index");
            let count = SkillStore::rebuild_index(&paths.registry_file, &index).await?;
            println!("Regenerated {} skills in the similarity index", count);
        }
        "frames" => {
            let dir = positional
                .get(1)
                .ok_or_else(|| anyhow::anyhow!("frames requires a directory"))?;
            let count: usize = positional
                .get(2)
                .map(|n| n.parse())
                .transpose()?
                .unwrap_or(config.vision.image_count);

            for path in FrameSampler::select_paths(Path::new(dir), count)? {
                let size = std::fs::metadata(&path)?.len();
                println!("{} ({} bytes)", path.display(), size);
            }
        }
        other => {
            print_help();
            anyhow::bail!("unknown command: {}", other);
        }
    }

    Ok(())
}
