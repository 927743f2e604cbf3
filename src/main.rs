use skinscan_client::{
    app::{Command, ModelStatus},
    config::Configuration,
    coordinator::CoordinatorBuilder,
    error::AppError,
    intake::{FileOrigin, SelectedFile},
};
use tracing::{error, info, warn, Level};

fn init_logging(level: Level) {
    tracing_subscriber::fmt().with_max_level(level).init();
}

#[tokio::main]
async fn main() -> Result<(), AppError> {
    let configuration = Configuration::load()?;
    init_logging(configuration.tracing_level());

    let paths: Vec<String> = std::env::args().skip(1).collect();
    if paths.is_empty() {
        eprintln!("usage: skinscan-client <image>...");
        return Ok(());
    }

    info!("Using backend at {}", configuration.backend_url);
    let coordinator = CoordinatorBuilder::new(configuration).build()?;
    let handle = coordinator.handle();

    let model_status = handle
        .view()
        .wait_for(|view| view.model_status != ModelStatus::Checking)
        .await
        .map(|view| view.model_status.clone());
    match model_status {
        Ok(ModelStatus::Ready(message)) => info!("{}", message),
        Ok(ModelStatus::Unavailable(message)) => warn!("{}", message),
        Ok(ModelStatus::Checking) | Err(_) => {}
    }

    for path in paths {
        let file = match SelectedFile::from_path(&path).await {
            Ok(file) => file,
            Err(e) => {
                error!("{}", e);
                continue;
            }
        };

        let selected = handle
            .dispatch(Command::SelectFiles {
                origin: FileOrigin::Browse,
                files: vec![file],
            })
            .await;
        if let Err(e) = selected {
            error!("Skipping {}: {}", path, e);
            continue;
        }

        if let Err(e) = handle.dispatch(Command::Analyze).await {
            error!("Skipping {}: {}", path, e);
            continue;
        }

        let view = handle.analysis_settled().await?;
        match view.result {
            Some(result) => println!(
                "{}: {} {} [{}]",
                path,
                result.diagnosis,
                result.confidence_text,
                result.classification.css_class()
            ),
            None => println!("{}: Analysis failed. Please try again.", path),
        }
    }

    coordinator.shutdown().await
}
