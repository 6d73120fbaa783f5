//! CLI frontend for Wayfarer worlds stored in SQLite.

mod commands;

use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "wf",
    about = "Wayfarer: build place graphs and send things travelling through them",
    version,
    propagate_version = true
)]
struct Cli {
    /// World database file (created if missing)
    #[arg(long, global = true, default_value = "world.db")]
    db: PathBuf,

    /// Log cache and simulation activity to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create or rename the world in the database
    Init {
        /// Name of the world
        name: String,
    },

    /// Create a dimension
    Dimension {
        /// Dimension name
        name: String,
    },

    /// Create a place
    Place {
        /// Dimension to create it in
        dimension: String,

        /// Place name
        name: String,

        /// Map position as `x,y`
        #[arg(long, allow_hyphen_values = true)]
        spot: Option<String>,
    },

    /// Create a one-way portal between two places
    Portal {
        /// Dimension of both places
        dimension: String,

        /// Origin place
        from: String,

        /// Destination place
        to: String,

        /// Travel cost
        #[arg(short, long, default_value = "1.0")]
        weight: f64,

        /// Portal name (default: `portal[from->to]`)
        #[arg(short, long)]
        name: Option<String>,
    },

    /// Create a thing inside a place or another thing
    Thing {
        /// Dimension to create it in
        dimension: String,

        /// Thing name
        name: String,

        /// Place or thing to put it in
        location: String,
    },

    /// Move a thing into another place or thing
    Move {
        /// Dimension of the thing
        dimension: String,

        /// Thing to move
        thing: String,

        /// New place or thing to put it in
        container: String,
    },

    /// Declare the allowed values of an attribute
    Declare {
        /// Attribute name
        attribute: String,

        /// Required type: int, float, bool or str
        #[arg(short, long = "type")]
        attr_type: Option<String>,

        /// Lowest allowed number
        #[arg(long, allow_negative_numbers = true)]
        min: Option<f64>,

        /// Highest allowed number
        #[arg(long, allow_negative_numbers = true)]
        max: Option<f64>,

        /// Value accepted regardless of type and range (repeatable)
        #[arg(long)]
        permit: Vec<String>,
    },

    /// Set an attribute of a place or thing
    Set {
        /// Dimension of the item
        dimension: String,

        /// Place or thing name
        item: String,

        /// Attribute name
        attribute: String,

        /// Value; `true`/`false` and numbers are typed, anything else is text
        value: String,
    },

    /// Show a place or thing
    Show {
        /// Dimension of the item
        dimension: String,

        /// Place or thing name
        name: String,
    },

    /// Print the minimum spanning tree grown from a portal
    Tree {
        /// Dimension to span
        dimension: String,

        /// Portal to start from
        portal: String,
    },

    /// Send a thing to a place and simulate its journey
    Travel {
        /// Dimension of the journey
        dimension: String,

        /// Thing that travels
        thing: String,

        /// Destination place
        to: String,

        /// Number of ticks to simulate
        #[arg(short, long, default_value = "10")]
        ticks: u64,

        /// Portals crossed per tick
        #[arg(short, long, default_value = "0.25")]
        speed: f64,
    },
}

fn main() {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let db = cli.db.as_path();
    let result = match cli.command {
        Commands::Init { name } => commands::init::run(db, &name),
        Commands::Dimension { name } => commands::init::dimension(db, &name),
        Commands::Place {
            dimension,
            name,
            spot,
        } => commands::place::run(db, &dimension, &name, spot.as_deref()),
        Commands::Portal {
            dimension,
            from,
            to,
            weight,
            name,
        } => commands::place::portal(db, &dimension, &from, &to, weight, name.as_deref()),
        Commands::Thing {
            dimension,
            name,
            location,
        } => commands::thing::run(db, &dimension, &name, &location),
        Commands::Move {
            dimension,
            thing,
            container,
        } => commands::thing::relocate(db, &dimension, &thing, &container),
        Commands::Declare {
            attribute,
            attr_type,
            min,
            max,
            permit,
        } => commands::attribute::declare(db, &attribute, attr_type.as_deref(), min, max, &permit),
        Commands::Set {
            dimension,
            item,
            attribute,
            value,
        } => commands::attribute::set(db, &dimension, &item, &attribute, &value),
        Commands::Show { dimension, name } => commands::show::run(db, &dimension, &name),
        Commands::Tree { dimension, portal } => commands::tree::run(db, &dimension, &portal),
        Commands::Travel {
            dimension,
            thing,
            to,
            ticks,
            speed,
        } => commands::travel::run(db, &dimension, &thing, &to, ticks, speed),
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        process::exit(1);
    }
}
