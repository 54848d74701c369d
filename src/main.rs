use detr_annotate::{
    fonts::FontResolver,
    models::{DetrModel, DetrPretrainedModels},
    pipeline::{self, RunConfig},
    Result,
};

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    println!("Loading DETR model...");
    println!(
        "Running on: {} (arch {})",
        std::env::consts::OS,
        std::env::consts::ARCH
    );
    let model = DetrModel::pretrained(DetrPretrainedModels::ResNet50)?;
    println!("Model loaded successfully!\n");

    let font = FontResolver::for_current_platform().resolve();

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    let report = pipeline::run(&model, &font, &RunConfig::default(), &mut out)?;

    tracing::info!(
        "done: {} images, {} with errors",
        report.summary.total,
        report.summary.with_errors.len()
    );

    Ok(())
}
