use std::path::PathBuf;
use std::time::{Duration, Instant};

use clap::{Parser, Subcommand};
use skyline_viewer::api::{self, HttpApi};
use skyline_viewer::{Bootstrap, FrameView, ViewerConfig, ViewerSession};
use streaming::ContributionFilter;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(author, version, about = "Fetch, frame and export contribution skylines")]
struct Args {
    /// API origin (default: $SKYLINE_BASE_URL or http://127.0.0.1:8000)
    #[arg(long)]
    base_url: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(clap::Args, Debug)]
struct ModelArgs {
    /// Year to show (default: latest imported year)
    #[arg(long)]
    year: Option<i64>,

    /// all, personal or work
    #[arg(long, default_value = "all")]
    contributions: ContributionFilter,

    /// Ask the server to emboss labels onto the model
    #[arg(long)]
    labels: Option<bool>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List imported years
    Years,

    /// Import contributions for a year, then load its model
    Import { year: i64 },

    /// Load the model, fit the camera and print what would be drawn
    View {
        #[command(flatten)]
        model: ModelArgs,
    },

    /// Download the model as STL
    Export {
        #[command(flatten)]
        model: ModelArgs,

        /// Output file (default: name suggested by the server)
        #[arg(long)]
        out: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let args = Args::parse();
    let mut config = ViewerConfig::from_env()?;
    if let Some(base_url) = args.base_url {
        config = config.with_base_url(base_url)?;
    }

    let (contributions, source) = api::shared(HttpApi::new(&config)?);
    let mut session = ViewerSession::new(contributions, source, &config);

    let result = run(&mut session, &config, args.command).await;
    for event in session.drain_notifications() {
        match event.frame {
            Some(frame) => eprintln!("error at {:.2}s: {}", frame.time_s, event.payload.message),
            None => eprintln!("error: {}", event.payload.message),
        }
    }
    result
}

async fn run(
    session: &mut ViewerSession,
    config: &ViewerConfig,
    command: Command,
) -> Result<(), Box<dyn std::error::Error>> {
    match session.bootstrap().await? {
        Bootstrap::LoginRequired { redirect } => {
            return Err(format!("not signed in; log in at {}{redirect}", config.base_url).into());
        }
        Bootstrap::ImportOnly => info!("no contributions imported yet"),
        Bootstrap::Ready { years } => info!(?years, "session ready"),
    }

    match command {
        Command::Years => {
            if session.years().is_empty() {
                println!("no years imported; run `skyline import <year>`");
            }
            for year in session.years() {
                println!("{year}");
            }
        }
        Command::Import { year } => {
            if !session.import_year(year).await? {
                return Err(format!("cannot import year {year}; years start at 1").into());
            }
            println!("imported {year}");
            view(session, config).await?;
        }
        Command::View { model } => {
            apply(session, &model).await?;
            view(session, config).await?;
        }
        Command::Export { model, out } => {
            apply(session, &model).await?;
            let export = session
                .export()
                .await?
                .ok_or("no year selected; nothing to export")?;
            let path = out.unwrap_or_else(|| PathBuf::from(&export.filename));
            tokio::fs::write(&path, &export.download.bytes).await?;
            println!("wrote {} ({} bytes)", path.display(), export.download.bytes.len());
        }
    }
    Ok(())
}

async fn apply(
    session: &mut ViewerSession,
    model: &ModelArgs,
) -> Result<(), Box<dyn std::error::Error>> {
    let year = match model.year.or_else(|| session.years().last().map(|y| i64::from(*y))) {
        Some(year) => year,
        None => return Err("no years imported; run `skyline import <year>` first".into()),
    };
    session.select_year(year).await;
    if session.store().model().year.is_none() {
        return Err(format!("year {year} has not been imported").into());
    }
    session.set_contribution_filter(model.contributions).await;
    session.set_include_labels(model.labels);

    let selected = &session.store().model().contributions;
    if *selected != model.contributions {
        info!(requested = %model.contributions, using = %selected, "no work data for year");
    }
    Ok(())
}

async fn view(
    session: &mut ViewerSession,
    config: &ViewerConfig,
) -> Result<(), Box<dyn std::error::Error>> {
    let deadline = Instant::now() + config.request_timeout + Duration::from_secs(1);
    loop {
        match session.frame() {
            FrameView::Mesh { mesh } => {
                let camera = session.render().camera_state();
                println!("model     {}", mesh.locator);
                println!("triangles {}", mesh.geometry.triangle_count());
                println!("bytes     {}", mesh.payload_len);
                println!("blake3    {}", mesh.content_hash);
                println!(
                    "sphere    center=({:.2}, {:.2}, {:.2}) radius={:.2}",
                    mesh.bounding_sphere.center.x,
                    mesh.bounding_sphere.center.y,
                    mesh.bounding_sphere.center.z,
                    mesh.bounding_sphere.radius
                );
                println!(
                    "camera    eye=({:.2}, {:.2}, {:.2}) yaw={:.3} pitch={:.3} fitted={}",
                    camera.position.x,
                    camera.position.y,
                    camera.position.z,
                    camera.yaw_rad,
                    camera.pitch_rad,
                    camera.fitted
                );
                return Ok(());
            }
            FrameView::Error { message, .. } => return Err(message.into()),
            FrameView::Empty => return Err("no year selected".into()),
            FrameView::Loading { .. } => {}
        }
        if Instant::now() > deadline {
            error!(frame = session.render().frame_index(), "model did not load in time");
            return Err("timed out waiting for the model".into());
        }
        tokio::time::sleep(Duration::from_millis(16)).await;
    }
}
