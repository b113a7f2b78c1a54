// src/main.rs

use affected::{cli, load_config, logging, project_root, run};

#[tokio::main]
async fn main() {
    if let Err(err) = run_main().await {
        eprintln!("affected error: {err:?}");
        std::process::exit(1);
    }
}

async fn run_main() -> anyhow::Result<()> {
    let args = cli::parse();
    let root = project_root(&args)?;
    let cfg = load_config(&args, &root)?;
    logging::init_logging(args.log_level, cfg.config_section().verbose)?;
    run(args, root, cfg).await
}
