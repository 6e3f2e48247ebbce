use clap::{Parser, Subcommand};
use gridroute_common::util::config::{Config, Mode};
use gridroute_common::util::generator::{self, GeneratorParams};
use gridroute_common::util::{check, logger};
use gridroute_router::GlobalRouter;
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Args {
    #[arg(short, long, value_name = "FILE", default_value = "config.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Route an ISPD benchmark and report metrics
    Route {
        input: PathBuf,
        /// Write the per-net routed paths here (ISPD result layout)
        #[arg(long)]
        output: Option<PathBuf>,
        /// fast | balanced | quality (overrides the config file)
        #[arg(long)]
        mode: Option<String>,
        /// Render the final congestion map (.ppm or .png)
        #[arg(long)]
        image: Option<PathBuf>,
        #[arg(long, default_value_t = 1)]
        scale: u32,
        #[arg(long)]
        no_adaptive: bool,
        #[arg(long)]
        no_history: bool,
    },
    /// Render a benchmark's congestion map without keeping results
    Draw {
        input: PathBuf,
        #[arg(long)]
        out: PathBuf,
        #[arg(long, default_value_t = 1)]
        scale: u32,
        /// Route first; otherwise the unrouted capacity map is drawn
        #[arg(long)]
        route: bool,
    },
    /// Emit a random benchmark for experiments
    Generate {
        #[arg(long, default_value_t = 32)]
        width: u32,
        #[arg(long, default_value_t = 32)]
        height: u32,
        #[arg(long, default_value_t = 2)]
        layers: u8,
        #[arg(long, default_value_t = 200)]
        nets: usize,
        #[arg(long, default_value_t = 4)]
        max_pins: usize,
        #[arg(long, default_value_t = 10)]
        capacity: u32,
        #[arg(long, default_value_t = 0)]
        blockages: usize,
        #[arg(long, default_value_t = 42)]
        seed: u64,
        #[arg(long, default_value = "inputs/random.gr")]
        output: String,
    },
}

fn main() -> anyhow::Result<()> {
    logger::init();
    let args = Args::parse();

    let config = if args.config.exists() {
        log::info!("Loading configuration from {:?}", args.config);
        let config_str = std::fs::read_to_string(&args.config)
            .map_err(|e| anyhow::anyhow!("Failed to read config file: {}", e))?;
        toml::from_str(&config_str)
            .map_err(|e| anyhow::anyhow!("Failed to parse config TOML: {}", e))?
    } else {
        log::warn!(
            "Configuration file {:?} not found. Using internal defaults.",
            args.config
        );
        Config::default()
    };

    match args.command {
        Commands::Route {
            input,
            output,
            mode,
            image,
            scale,
            no_adaptive,
            no_history,
        } => {
            if !input.exists() {
                return Err(anyhow::anyhow!("Input benchmark missing: {:?}", input));
            }
            if let Some(out) = &output {
                prepare_output_dir(out)?;
            }
            if let Some(img) = &image {
                prepare_output_dir(img)?;
            }
            run_route(
                &config, &input, output, mode, image, scale, no_adaptive, no_history,
            )
        }
        Commands::Draw {
            input,
            out,
            scale,
            route,
        } => {
            if !input.exists() {
                return Err(anyhow::anyhow!("Input benchmark missing: {:?}", input));
            }
            prepare_output_dir(&out)?;
            let mut router = GlobalRouter::with_config(config.route.clone());
            router
                .load(&input)
                .map_err(|e| anyhow::anyhow!("Invalid benchmark '{}': {}", input.display(), e))?;
            if route {
                router.route(None)?;
            }
            router.visualize(&out, scale)?;
            Ok(())
        }
        Commands::Generate {
            width,
            height,
            layers,
            nets,
            max_pins,
            capacity,
            blockages,
            seed,
            output,
        } => {
            prepare_output_dir(Path::new(&output))?;
            let params = GeneratorParams {
                width,
                height,
                layers,
                nets,
                max_pins,
                capacity,
                blockages,
                seed,
            };
            generator::generate_random_gr(&output, &params)?;
            Ok(())
        }
    }
}

fn run_route(
    config: &Config,
    input: &Path,
    output: Option<PathBuf>,
    mode: Option<String>,
    image: Option<PathBuf>,
    scale: u32,
    no_adaptive: bool,
    no_history: bool,
) -> anyhow::Result<()> {
    let mut router = GlobalRouter::with_config(config.route.clone());

    let mode = match mode {
        Some(name) => Mode::from_name(&name)
            .ok_or_else(|| anyhow::anyhow!("Unknown mode '{}', expected fast|balanced|quality", name))?,
        None => config.route.mode,
    };
    router.set_mode(mode);
    if no_adaptive {
        router.enable_adaptive_scoring(false);
    }
    if no_history {
        router.enable_history_optimization(false);
    }

    router
        .load(input)
        .map_err(|e| anyhow::anyhow!("Invalid benchmark '{}': {}", input.display(), e))?;
    router.route(output.as_deref())?;

    if let Some(design) = router.design() {
        check::run(design).map_err(|e| anyhow::anyhow!("Verification failed: {}", e))?;
    }

    let m = router.metrics();
    log::info!(
        "Metrics: overflow {} (max {}), wirelength {}, vias {}, {} iterations, {:.2}s",
        m.total_overflow,
        m.max_overflow,
        m.wirelength,
        m.vias,
        m.iterations,
        m.execution_time
    );

    if let Some(img) = image {
        router.visualize(&img, scale)?;
    }
    Ok(())
}

fn prepare_output_dir(path: &Path) -> anyhow::Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.exists() && !parent.as_os_str().is_empty() {
            log::info!("Creating output directory: {:?}", parent);
            std::fs::create_dir_all(parent)?;
        }
    }
    Ok(())
}
