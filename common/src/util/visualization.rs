use crate::error::VizError;
use image::{Rgb, RgbImage};
use imageproc::drawing::draw_filled_rect_mut;
use imageproc::rect::Rect as ImageRect;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

/// Planar congestion snapshot: one entry per grid cell, row-major with
/// y = 0 at the bottom of the die (the benchmark's orientation).
#[derive(Clone, Debug)]
pub struct CongestionMap {
    pub width: u32,
    pub height: u32,
    pub cells: Vec<CongestionCell>,
}

#[derive(Clone, Copy, Debug, Default)]
pub struct CongestionCell {
    pub usage: u32,
    pub capacity: u32,
}

impl CongestionMap {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            cells: vec![CongestionCell::default(); (width * height) as usize],
        }
    }

    #[inline]
    pub fn at(&self, x: u32, y: u32) -> CongestionCell {
        self.cells[(y * self.width + x) as usize]
    }

    #[inline]
    pub fn at_mut(&mut self, x: u32, y: u32) -> &mut CongestionCell {
        &mut self.cells[(y * self.width + x) as usize]
    }
}

/// Render a congestion map to `path`. `.png` paths go through the image
/// stack; anything else gets the plain-text P3 PPM layout, which is the
/// canonical, diffable output.
pub fn render(map: &CongestionMap, path: &Path, scale: u32) -> Result<(), VizError> {
    if map.width == 0 || map.height == 0 {
        return Err(VizError::EmptyGrid);
    }
    let scale = scale.max(1);
    let is_png = path
        .extension()
        .map(|e| e.eq_ignore_ascii_case("png"))
        .unwrap_or(false);
    if is_png {
        render_png(map, path, scale)
    } else {
        let file = File::create(path)?;
        let mut out = BufWriter::new(file);
        write_ppm(&mut out, map, scale)?;
        out.flush()?;
        log::info!(
            "Congestion map saved to {} ({}x{})",
            path.display(),
            map.width * scale,
            map.height * scale
        );
        Ok(())
    }
}

/// Congestion color ramp, matching the classic routability plots:
/// black for blocked cells, dark gray for unused, green → yellow below
/// half utilization, yellow → red approaching capacity, bright red for
/// overflow.
fn color_of(cell: CongestionCell) -> [u8; 3] {
    if cell.capacity == 0 {
        return [0, 0, 0];
    }
    if cell.usage == 0 {
        return [40, 40, 40];
    }
    let util = cell.usage as f64 / cell.capacity as f64;
    if util <= 0.5 {
        [(255.0 * util * 2.0) as u8, 255, 0]
    } else if util <= 1.0 {
        [255, (255.0 * (1.0 - util) * 2.0) as u8, 0]
    } else {
        [255, 0, 0]
    }
}

/// P3 PPM: ASCII magic, width/height, max channel value, then row-major
/// RGB triples from the top row of the die down.
pub fn write_ppm<W: Write>(
    out: &mut W,
    map: &CongestionMap,
    scale: u32,
) -> std::io::Result<()> {
    let width = map.width * scale;
    let height = map.height * scale;
    writeln!(out, "P3")?;
    writeln!(out, "{} {}", width, height)?;
    writeln!(out, "255")?;
    for img_y in 0..height {
        let grid_y = map.height - 1 - img_y / scale;
        for img_x in 0..width {
            let [r, g, b] = color_of(map.at(img_x / scale, grid_y));
            if img_x > 0 {
                write!(out, " ")?;
            }
            write!(out, "{} {} {}", r, g, b)?;
        }
        writeln!(out)?;
    }
    Ok(())
}

fn render_png(map: &CongestionMap, path: &Path, scale: u32) -> Result<(), VizError> {
    let width = map.width * scale;
    let height = map.height * scale;
    let mut img = RgbImage::new(width, height);
    for gy in 0..map.height {
        for gx in 0..map.width {
            let [r, g, b] = color_of(map.at(gx, gy));
            let rect = ImageRect::at(
                (gx * scale) as i32,
                ((map.height - 1 - gy) * scale) as i32,
            )
            .of_size(scale, scale);
            draw_filled_rect_mut(&mut img, rect, Rgb([r, g, b]));
        }
    }
    img.save(path).map_err(|e| VizError::Encode(e.to_string()))?;
    log::info!(
        "Congestion map saved to {} ({}x{})",
        path.display(),
        width,
        height
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_header(s: &str) -> (String, u32, u32, u32) {
        let mut it = s.split_whitespace();
        let magic = it.next().unwrap().to_string();
        let w = it.next().unwrap().parse().unwrap();
        let h = it.next().unwrap().parse().unwrap();
        let max = it.next().unwrap().parse().unwrap();
        (magic, w, h, max)
    }

    #[test]
    fn ppm_header_is_scaled_planar_dims() {
        let map = CongestionMap::new(5, 3);
        let mut buf = Vec::new();
        write_ppm(&mut buf, &map, 4).unwrap();
        let text = String::from_utf8(buf).unwrap();
        let (magic, w, h, max) = parse_header(&text);
        assert_eq!(magic, "P3");
        assert_eq!((w, h, max), (20, 12, 255));
    }

    #[test]
    fn ppm_pixel_count_matches_dims() {
        let map = CongestionMap::new(3, 2);
        let mut buf = Vec::new();
        write_ppm(&mut buf, &map, 1).unwrap();
        let text = String::from_utf8(buf).unwrap();
        let values: Vec<&str> = text.split_whitespace().collect();
        // magic + 3 header values + 3 channels per pixel
        assert_eq!(values.len(), 4 + 3 * 3 * 2);
    }

    #[test]
    fn color_ramp_orders_by_utilization() {
        let blocked = color_of(CongestionCell { usage: 0, capacity: 0 });
        assert_eq!(blocked, [0, 0, 0]);
        let idle = color_of(CongestionCell { usage: 0, capacity: 4 });
        assert_eq!(idle, [40, 40, 40]);
        let light = color_of(CongestionCell { usage: 1, capacity: 4 });
        assert_eq!(light[1], 255); // green channel saturated
        let heavy = color_of(CongestionCell { usage: 4, capacity: 4 });
        assert_eq!(heavy[0], 255);
        let over = color_of(CongestionCell { usage: 9, capacity: 4 });
        assert_eq!(over, [255, 0, 0]);
    }

    #[test]
    fn top_row_of_image_is_highest_y() {
        let mut map = CongestionMap::new(1, 2);
        // mark the top cell (y = 1) as overflowed
        *map.at_mut(0, 1) = CongestionCell { usage: 5, capacity: 1 };
        let mut buf = Vec::new();
        write_ppm(&mut buf, &map, 1).unwrap();
        let text = String::from_utf8(buf).unwrap();
        let values: Vec<u32> = text
            .split_whitespace()
            .skip(4)
            .map(|t| t.parse().unwrap())
            .collect();
        // first pixel row is the overflowed cell, second the idle one
        assert_eq!(&values[0..3], &[255, 0, 0]);
        assert_eq!(&values[3..6], &[40, 40, 40]);
    }
}
