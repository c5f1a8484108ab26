mod cli;

use std::sync::Arc;
use anyhow::{bail, Context};
use clap::Parser;
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;
use vx_app::generator::api::ApiClient;
use vx_app::{AppConfig, GenEvent, Generator, InputMode, Wizard, WizardStep};
use vx_core::glam::Vec3;
use vx_core::mesh::interior_point;
use vx_core::{ActiveCandidate, CameraFrame, Viewer, WALL_HEIGHT};
use crate::cli::{Cli, Command, GenerateArgs};

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    let config = AppConfig::load()?.with_overrides(cli.api_url, cli.token);
    debug!("Using layout service at {}", config.api_url);
    let client = Arc::new(ApiClient::new(&config)?);

    match cli.command {
        Command::Generate(args) => generate(&config, client, args).await,
        Command::Designs { mine, limit } => {
            let designs = if mine {
                client.my_designs().await?
            } else {
                client.list_designs(limit).await?
            };
            println!("{}", serde_json::to_string_pretty(&designs)?);
            Ok(())
        }
    }
}

async fn generate(config: &AppConfig, client: Arc<ApiClient>, args: GenerateArgs) -> anyhow::Result<()> {
    let mut wizard = Wizard::new(Generator::new(client.clone(), config.timing()));

    wizard.edit(|input| -> vx_core::Result<()> {
        input.unit = args.unit;
        input.set_total_area(args.total)?;
        if let Some(description) = &args.describe {
            input.mode = InputMode::FreeText;
            input.description = description.clone();
        }
        for (room_type, area) in &args.rooms {
            input.add_room(*room_type, *area)?;
        }
        Ok(())
    })??;

    if wizard.input().mode == InputMode::Manual {
        println!("Requested allocation ({}):", wizard.input().unit);
        for entry in wizard.derived_series() {
            println!("  {:<14} {:>8.1}  {}", entry.label, entry.value, entry.color);
        }
    }

    wizard.next()?;
    println!("\nPrompt: {}\n", wizard.prompt());

    wizard.generate()?;
    println!("{} {}", wizard.step(), wizard.phase_label());
    while wizard.step() == WizardStep::Generating {
        match wizard.next_event().await {
            Some(GenEvent::JobSubmitted { job_id, .. }) => info!("Job {} queued", job_id),
            Some(GenEvent::JobStatus { status, .. }) => debug!("Job status: {} {}", status.icon(), status.label()),
            Some(GenEvent::Phase { label, .. }) => println!("  {}", label),
            Some(_) => {}
            None => break,
        }
    }

    if wizard.step() != WizardStep::Results {
        bail!(wizard.error().unwrap_or("generation did not finish").to_string());
    }
    if let Some(job) = wizard.job() {
        info!("Job {} finished in {}s", job.id, job.elapsed().num_seconds());
    }

    print_candidates(&wizard);

    if let Some(id) = args.select {
        wizard.select_candidate(id)?;
    }
    let active = wizard
        .store()
        .active()
        .context("no active candidate")?
        .clone();
    print_active(&wizard, &active);

    let mut viewer = Viewer::new(config.fov_deg);
    if let Some(frame) = viewer.show_candidate(&active) {
        print_frame("Room footprint", &frame);
    }

    if args.fetch_model {
        match client.fetch_model(&active.model_url).await {
            Ok(mesh) => {
                println!(
                    "\nModel: {} vertices, {} triangles",
                    mesh.vertex_count(),
                    mesh.triangle_count()
                );
                if let Some(frame) = viewer.load_model(&active.model_url, mesh) {
                    print_frame("Model", &frame);
                }
            }
            Err(e) => warn!("Could not load model {}: {}", active.model_url, e),
        }
    }

    if args.probe {
        probe_rooms(&mut viewer, &active);
    }

    Ok(())
}

fn print_candidates(wizard: &Wizard) {
    let store = wizard.store();
    println!("\n{:>4} {:>7} {:>6} {:>6} {:>6} {:>6}", "id", "score", "eff", "priv", "light", "circ");
    for candidate in store.candidates() {
        let stats = &candidate.stats;
        let marker = if Some(candidate.id) == store.winner_id() { " *" } else { "" };
        println!(
            "{:>4} {:>6.1}% {:>6.1} {:>6.1} {:>6.1} {:>6.1}{}",
            candidate.id,
            candidate.score_percent(),
            stats.efficiency,
            stats.privacy,
            stats.daylight,
            stats.circulation,
            marker
        );
    }
}

fn print_active(wizard: &Wizard, active: &ActiveCandidate) {
    println!("\nCandidate {} ({:.1}%, average {:.1})", active.id, active.score, active.stats.average());

    println!("Area allocation (sqft):");
    for entry in wizard.derived_series() {
        println!("  {:<14} {:>8.1}  {}", entry.label, entry.value, entry.color);
    }
    println!("  {:<14} {:>8.1}", "Total", active.spec.total_area());

    println!("Rooms:");
    for legend in wizard.store().legend(None) {
        let dims = wizard
            .store()
            .room_dimensions(&legend.room_id)
            .ok()
            .flatten()
            .map(|d| format!("{} ({})", d.metric_label(), d.imperial_label()))
            .unwrap_or_else(|| "no footprint".to_string());
        println!("  {:<12} {:<10} {}  {}", legend.room_id, legend.label, legend.color, dims);
    }

    if let Some(summary) = wizard.store().room_summary() {
        println!("Measured floor area: {:.1} m² ({:.1} ft²)", summary.total_sqm, summary.total_sqft);
    }
}

fn print_frame(what: &str, frame: &CameraFrame) {
    println!(
        "{} framed from ({:.2}, {:.2}, {:.2}) looking at ({:.2}, {:.2}, {:.2})",
        what,
        frame.position.x,
        frame.position.y,
        frame.position.z,
        frame.target.x,
        frame.target.y,
        frame.target.z
    );
}

/// Point the cursor at the roof of each room in turn
fn probe_rooms(viewer: &mut Viewer, active: &ActiveCandidate) {
    println!("\nHover probe:");
    for (room_id, ring) in &active.rooms {
        let Some(point) = interior_point(ring) else {
            println!("  {:<12} no footprint", room_id);
            continue;
        };
        let world = Vec3::new(point.x as f32, point.y as f32, WALL_HEIGHT);
        let Some(ndc) = viewer.camera.project(world) else {
            continue;
        };

        viewer.pointer_move(ndc);
        match (viewer.tooltip(active), viewer.highlight(active)) {
            (Some(tooltip), Some(overlay)) => {
                let dims = tooltip
                    .dimensions
                    .map(|d| d.metric_label())
                    .unwrap_or_default();
                println!(
                    "  {:<12} -> {} {} highlight {} @ {:.0}%",
                    room_id,
                    tooltip.label,
                    dims,
                    overlay.color,
                    overlay.opacity * 100.0
                );
            }
            _ => println!("  {:<12} -> nothing under the cursor", room_id),
        }
        viewer.pointer_exit();
    }
}
