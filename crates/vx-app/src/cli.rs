use clap::{Args, Parser, Subcommand};
use vx_core::{AreaUnit, RoomType};

#[derive(Parser, Debug)]
#[command(name = "voxplan", version, about = "Generate, compare and inspect floor-plan layouts")]
pub struct Cli {
    /// Layout service origin, overrides VOXPLAN_API_URL
    #[arg(long, global = true)]
    pub api_url: Option<String>,

    /// Bearer token forwarded to the service, overrides VOXPLAN_API_TOKEN
    #[arg(long, global = true)]
    pub token: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run the wizard: rooms, review, generation, results
    Generate(GenerateArgs),
    /// List saved designs
    Designs {
        /// Only designs owned by the token's user
        #[arg(long)]
        mine: bool,
        #[arg(long, default_value_t = 10)]
        limit: u32,
    },
}

#[derive(Args, Debug)]
pub struct GenerateArgs {
    /// Room as TYPE:AREA, e.g. `bedroom:150`; repeat for each room
    #[arg(long = "room", value_name = "TYPE:AREA", value_parser = parse_room)]
    pub rooms: Vec<(RoomType, f64)>,

    /// Total floor area in `--unit`
    #[arg(long, default_value_t = 1200.0)]
    pub total: f64,

    #[arg(long, default_value = "sqft", value_parser = parse_unit)]
    pub unit: AreaUnit,

    /// Free-text description instead of a room list
    #[arg(long, conflicts_with = "rooms")]
    pub describe: Option<String>,

    /// Candidate to show instead of the winner
    #[arg(long)]
    pub select: Option<u32>,

    /// Download the candidate's model and frame it
    #[arg(long)]
    pub fetch_model: bool,

    /// Hover each room once and print its tooltip
    #[arg(long)]
    pub probe: bool,
}

fn parse_room(value: &str) -> Result<(RoomType, f64), String> {
    let (room_type, area) = value
        .split_once(':')
        .ok_or_else(|| format!("expected TYPE:AREA, got '{}'", value))?;
    let room_type = room_type.parse::<RoomType>().map_err(|e| e.to_string())?;
    let area = area
        .trim()
        .parse::<f64>()
        .map_err(|_| format!("'{}' is not a number", area))?;
    Ok((room_type, area))
}

fn parse_unit(value: &str) -> Result<AreaUnit, String> {
    value.parse().map_err(|e: vx_core::Error| e.to_string())
}
