use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::fs::File;
use std::io::{BufWriter, Write};

pub struct GeneratorParams {
    pub width: u32,
    pub height: u32,
    pub layers: u8,
    pub nets: usize,
    pub max_pins: usize,
    pub capacity: u32,
    pub blockages: usize,
    pub seed: u64,
}

impl Default for GeneratorParams {
    fn default() -> Self {
        Self {
            width: 32,
            height: 32,
            layers: 2,
            nets: 200,
            max_pins: 4,
            capacity: 10,
            blockages: 0,
            seed: 42,
        }
    }
}

/// Writes a random ISPD-2008 style benchmark. Layers alternate between
/// horizontal (even) and vertical (odd) routing direction; pins land on
/// layer 1 at random tile centers. Seeded, so the same parameters always
/// produce the same file.
pub fn generate_random_gr(filename: &str, params: &GeneratorParams) -> std::io::Result<()> {
    let mut rng = StdRng::seed_from_u64(params.seed);
    let file = File::create(filename)?;
    let mut out = BufWriter::new(file);

    let layers = params.layers.max(2);
    let tile = 10u32;

    log::info!(
        "Generating benchmark: {}x{} grid, {} layers, {} nets (seed {})",
        params.width,
        params.height,
        layers,
        params.nets,
        params.seed
    );

    writeln!(out, "grid {} {} {}", params.width, params.height, layers)?;

    let caps = |horizontal: bool| -> String {
        (0..layers)
            .map(|z| {
                let has = (z % 2 == 0) == horizontal;
                if has { params.capacity } else { 0 }.to_string()
            })
            .collect::<Vec<_>>()
            .join(" ")
    };
    writeln!(out, "vertical capacity {}", caps(false))?;
    writeln!(out, "horizontal capacity {}", caps(true))?;

    let ones = vec!["1"; layers as usize].join(" ");
    let zeros = vec!["0"; layers as usize].join(" ");
    writeln!(out, "minimum width {}", ones)?;
    writeln!(out, "minimum spacing {}", zeros)?;
    writeln!(out, "via spacing {}", zeros)?;
    writeln!(out, "0 0 {} {}", tile, tile)?;

    writeln!(out, "num net {}", params.nets)?;
    for i in 0..params.nets {
        let num_pins = rng.gen_range(2..=params.max_pins.max(2));
        writeln!(out, "net{} {} {} 1", i, i, num_pins)?;
        for _ in 0..num_pins {
            let gx = rng.gen_range(0..params.width);
            let gy = rng.gen_range(0..params.height);
            writeln!(out, "{} {} 1", gx * tile + tile / 2, gy * tile + tile / 2)?;
        }
    }

    writeln!(out, "{}", params.blockages)?;
    for _ in 0..params.blockages {
        // block one horizontal edge on the first (horizontal) layer
        let x = rng.gen_range(0..params.width.saturating_sub(1).max(1));
        let y = rng.gen_range(0..params.height);
        writeln!(out, "{} {} 1 {} {} 1 0", x, y, x + 1, y)?;
    }

    out.flush()?;
    log::info!("Generated: {}", filename);
    Ok(())
}
