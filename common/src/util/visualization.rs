use crate::db::core::{CellType, GridLayout};
use crate::geom::coord::GridCoord;
use image::{Rgb, RgbImage};
use imageproc::drawing::{draw_filled_rect_mut, draw_hollow_rect_mut, draw_line_segment_mut};
use imageproc::rect::Rect as ImageRect;
use std::path::Path;

fn heat_color(t: f64) -> Rgb<u8> {
    let t = t.clamp(0.0, 1.0);
    if t < 0.5 {
        let k = t / 0.5;
        Rgb([(40.0 + 215.0 * k) as u8, (60.0 + 160.0 * k) as u8, (160.0 * (1.0 - k)) as u8])
    } else {
        let k = (t - 0.5) / 0.5;
        Rgb([255, (220.0 * (1.0 - k)) as u8, 0])
    }
}

// Row y = 0 is drawn at the top.
pub fn draw_floor(
    layout: &GridLayout,
    heat: &[(GridCoord, f64)],
    route: Option<&[GridCoord]>,
    filename: &str,
    cell_px: u32,
) -> image::ImageResult<()> {
    let px = cell_px.max(2);
    let w = layout.width() * px;
    let h = layout.height() * px;
    let mut img = RgbImage::from_pixel(w, h, Rgb([20, 20, 20]));

    let color_shelf = Rgb([70, 55, 40]);
    let color_aisle = Rgb([225, 225, 225]);
    let color_depot = Rgb([40, 170, 80]);
    let color_bin = Rgb([90, 90, 200]);
    let color_route = Rgb([200, 30, 200]);

    let cell_rect = |c: GridCoord| ImageRect::at((c.x * px) as i32, (c.y * px) as i32).of_size(px, px);

    for c in layout.bounds().cells() {
        let color = match layout.cell_type(c) {
            Some(CellType::Shelf) => color_shelf,
            Some(CellType::Depot) => color_depot,
            _ => color_aisle,
        };
        draw_filled_rect_mut(&mut img, cell_rect(c), color);
    }

    let max_heat = heat.iter().map(|&(_, s)| s).fold(0.0_f64, f64::max);
    if max_heat > 0.0 {
        for &(c, score) in heat {
            if !layout.is_traversable(c) {
                continue;
            }
            draw_filled_rect_mut(&mut img, cell_rect(c), heat_color(score / max_heat));
        }
    }

    for bin in layout.bins() {
        draw_hollow_rect_mut(&mut img, cell_rect(bin.cell), color_bin);
    }

    if let Some(path) = route {
        let center = |c: GridCoord| {
            (
                (c.x * px) as f32 + px as f32 / 2.0,
                (c.y * px) as f32 + px as f32 / 2.0,
            )
        };
        for seg in path.windows(2) {
            draw_line_segment_mut(&mut img, center(seg[0]), center(seg[1]), color_route);
        }
    }

    img.save(Path::new(filename))
}
