//! Parser for the ISPD-2008 global routing benchmark format (.gr).
//!
//! The format is a whitespace-separated text layout:
//! grid dimensions, per-layer vertical/horizontal capacities, minimum
//! width/spacing/via spacing, die origin and tile size, the net list
//! (name, id, pin count, minimum width, then world-coordinate pins), and
//! finally capacity adjustments for blockages.

use crate::db::design::{
    CapacityAdjustment, Design, LayerInfo, NetData, PinLocation,
};
use crate::db::indices::NetId;
use crate::error::FormatError;
use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use std::str::FromStr;

struct TokenStream<R: BufRead> {
    reader: R,
    // tokens of the current line, reversed so pop() yields them in order
    pending: Vec<String>,
    line: usize,
}

impl<R: BufRead> TokenStream<R> {
    fn new(reader: R) -> Self {
        Self {
            reader,
            pending: Vec::new(),
            line: 0,
        }
    }

    fn next(&mut self) -> Result<Option<String>, FormatError> {
        loop {
            if let Some(tok) = self.pending.pop() {
                return Ok(Some(tok));
            }
            let mut buf = String::new();
            if self.reader.read_line(&mut buf)? == 0 {
                return Ok(None);
            }
            self.line += 1;
            self.pending
                .extend(buf.split_whitespace().rev().map(str::to_string));
        }
    }

    fn expect(&mut self, what: &str) -> Result<String, FormatError> {
        self.next()?.ok_or_else(|| {
            FormatError::syntax(self.line, format!("unexpected end of input, expected {what}"))
        })
    }

    fn expect_num<T: FromStr>(&mut self, what: &str) -> Result<T, FormatError> {
        let tok = self.expect(what)?;
        tok.parse().map_err(|_| {
            FormatError::syntax(self.line, format!("expected {what}, found '{tok}'"))
        })
    }

    fn expect_keyword(&mut self, keyword: &str) -> Result<(), FormatError> {
        let tok = self.expect(keyword)?;
        if tok != keyword {
            return Err(FormatError::syntax(
                self.line,
                format!("expected keyword '{keyword}', found '{tok}'"),
            ));
        }
        Ok(())
    }
}

fn read_per_layer<R: BufRead>(
    ts: &mut TokenStream<R>,
    num_layers: u8,
    what: &str,
) -> Result<Vec<u32>, FormatError> {
    (0..num_layers).map(|_| ts.expect_num(what)).collect()
}

pub fn parse_file(path: impl AsRef<Path>) -> Result<Design, FormatError> {
    let file = File::open(path.as_ref())?;
    parse(BufReader::new(file))
}

pub fn parse_str(input: &str) -> Result<Design, FormatError> {
    parse(input.as_bytes())
}

pub fn parse<R: BufRead>(reader: R) -> Result<Design, FormatError> {
    let mut ts = TokenStream::new(reader);

    ts.expect_keyword("grid")?;
    let grid_width: u32 = ts.expect_num("grid width")?;
    let grid_height: u32 = ts.expect_num("grid height")?;
    let num_layers: u32 = ts.expect_num("layer count")?;
    if grid_width == 0 || grid_height == 0 || num_layers == 0 || num_layers > 64 {
        return Err(FormatError::Inconsistent(format!(
            "degenerate grid {grid_width}x{grid_height} with {num_layers} layers"
        )));
    }
    let num_layers = num_layers as u8;

    ts.expect_keyword("vertical")?;
    ts.expect_keyword("capacity")?;
    let vertical = read_per_layer(&mut ts, num_layers, "vertical capacity")?;

    ts.expect_keyword("horizontal")?;
    ts.expect_keyword("capacity")?;
    let horizontal = read_per_layer(&mut ts, num_layers, "horizontal capacity")?;

    ts.expect_keyword("minimum")?;
    ts.expect_keyword("width")?;
    let min_width = read_per_layer(&mut ts, num_layers, "minimum width")?;

    ts.expect_keyword("minimum")?;
    ts.expect_keyword("spacing")?;
    let min_spacing = read_per_layer(&mut ts, num_layers, "minimum spacing")?;

    ts.expect_keyword("via")?;
    ts.expect_keyword("spacing")?;
    let via_spacing = read_per_layer(&mut ts, num_layers, "via spacing")?;

    let origin_x: i32 = ts.expect_num("lower-left x")?;
    let origin_y: i32 = ts.expect_num("lower-left y")?;
    let tile_width: i32 = ts.expect_num("tile width")?;
    let tile_height: i32 = ts.expect_num("tile height")?;
    if tile_width <= 0 || tile_height <= 0 {
        return Err(FormatError::Inconsistent(format!(
            "non-positive tile size {tile_width}x{tile_height}"
        )));
    }

    let layers = (0..num_layers)
        .map(|z| LayerInfo {
            index: z,
            vertical_capacity: vertical[z as usize],
            horizontal_capacity: horizontal[z as usize],
            min_width: min_width[z as usize],
            min_spacing: min_spacing[z as usize],
            via_spacing: via_spacing[z as usize],
        })
        .collect();

    ts.expect_keyword("num")?;
    ts.expect_keyword("net")?;
    let num_nets: usize = ts.expect_num("net count")?;

    let mut nets = Vec::with_capacity(num_nets);
    let mut net_name_map = HashMap::with_capacity(num_nets);
    for _ in 0..num_nets {
        let name = ts.expect("net name")?;
        let id: u32 = ts.expect_num("net id")?;
        let num_pins: usize = ts.expect_num("pin count")?;
        let net_min_width: u32 = ts.expect_num("net minimum width")?;

        let mut pins = Vec::with_capacity(num_pins);
        for _ in 0..num_pins {
            let x: i32 = ts.expect_num("pin x")?;
            let y: i32 = ts.expect_num("pin y")?;
            let layer: u32 = ts.expect_num("pin layer")?;
            if layer == 0 || layer > num_layers as u32 {
                return Err(FormatError::Inconsistent(format!(
                    "net '{name}': pin layer {layer} outside 1..={num_layers}"
                )));
            }
            pins.push(PinLocation {
                x,
                y,
                layer: (layer - 1) as u8,
            });
        }

        net_name_map.insert(name.clone(), NetId::new(nets.len()));
        nets.push(NetData {
            name,
            id,
            min_width: net_min_width,
            pins,
            grid_pins: Vec::new(),
            connections: Vec::new(),
        });
    }

    let num_adjustments: usize = ts.expect_num("capacity adjustment count")?;
    let mut adjustments = Vec::with_capacity(num_adjustments);
    for _ in 0..num_adjustments {
        let x1: u32 = ts.expect_num("adjustment x1")?;
        let y1: u32 = ts.expect_num("adjustment y1")?;
        let z1: u32 = ts.expect_num("adjustment z1")?;
        let x2: u32 = ts.expect_num("adjustment x2")?;
        let y2: u32 = ts.expect_num("adjustment y2")?;
        let z2: u32 = ts.expect_num("adjustment z2")?;
        let reduced: u32 = ts.expect_num("reduced capacity")?;

        for (x, y, z) in [(x1, y1, z1), (x2, y2, z2)] {
            if x >= grid_width || y >= grid_height || z == 0 || z > num_layers as u32 {
                return Err(FormatError::Inconsistent(format!(
                    "capacity adjustment cell ({x},{y},{z}) outside the grid"
                )));
            }
        }
        adjustments.push(CapacityAdjustment {
            from: (x1, y1, (z1 - 1) as u8),
            to: (x2, y2, (z2 - 1) as u8),
            reduced_capacity: reduced,
        });
    }

    let mut design = Design {
        grid_width,
        grid_height,
        num_layers,
        layers,
        origin_x,
        origin_y,
        tile_width,
        tile_height,
        nets,
        adjustments,
        net_name_map,
    };
    design.populate_grid_pins();

    log::info!(
        "Loaded benchmark: {}x{} grid, {} layers, {} nets, {} adjustments",
        design.grid_width,
        design.grid_height,
        design.num_layers,
        design.num_nets(),
        design.adjustments.len()
    );

    Ok(design)
}
