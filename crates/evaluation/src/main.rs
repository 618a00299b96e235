use anyhow::{Context, Result};
use clap::Parser;
use evaluation::{cli::Args, pipeline};
use log::info;

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    let config = args.config()?;
    let annotation_file = args.annotation_file(&config);
    info!(
        "{} with annotations {}, mode {:?}",
        args.video.display(),
        annotation_file.display(),
        config.mode
    );

    let model = pipeline::build_model(&config, &annotation_file)
        .context("cannot assemble the model")?;
    let results = pipeline::evaluate_and_persist(
        model,
        &config,
        &args.video,
        &annotation_file,
        chrono::Local::now().naive_local(),
    )?;

    println!("{}", results.path().display());
    Ok(())
}
