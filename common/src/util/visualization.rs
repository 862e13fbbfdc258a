use crate::db::core::NocDb;
use image::{Rgb, RgbImage};
use imageproc::drawing::{draw_filled_rect_mut, draw_line_segment_mut};
use imageproc::rect::Rect as ImageRect;
use std::collections::HashSet;
use std::path::Path;

/// Renders the NoC as a grid of routers with links colored by bandwidth
/// utilization (cold blue when idle, red when at or over capacity).
pub fn draw_noc(db: &NocDb, filename: &str, width: u32, height: u32) {
    let mut img = RgbImage::new(width, height);
    image::imageops::replace(
        &mut img,
        &RgbImage::from_pixel(width, height, Rgb([20, 20, 20])),
        0,
        0,
    );

    if db.num_routers() == 0 {
        return;
    }

    let grid_w = db.routers.iter().map(|r| r.pos.x).max().unwrap_or(0) + 1;
    let grid_h = db.routers.iter().map(|r| r.pos.y).max().unwrap_or(0) + 1;

    let cell_w = width as f64 / grid_w as f64;
    let cell_h = height as f64 / grid_h as f64;

    let map = |x: u32, y: u32| {
        (
            (x as f64 + 0.5) * cell_w,
            (height as f64 - (y as f64 + 0.5) * cell_h),
        )
    };

    let idle = (0.0, 110.0, 255.0);
    let hot = (255.0, 20.0, 80.0);

    for link in &db.links {
        let p1 = db.routers[link.src.index()].pos;
        let p2 = db.routers[link.dst.index()].pos;
        let (x1, y1) = map(p1.x, p1.y);
        let (x2, y2) = map(p2.x, p2.y);

        let t = link.utilization().clamp(0.0, 1.0);
        let color = Rgb([
            (idle.0 + (hot.0 - idle.0) * t) as u8,
            (idle.1 + (hot.1 - idle.1) * t) as u8,
            (idle.2 + (hot.2 - idle.2) * t) as u8,
        ]);

        // Forward and reverse links overlap; nudge by travel direction so
        // both remain visible.
        let (ox, oy) = if x2 > x1 || y2 > y1 { (1.0, 1.0) } else { (-1.0, -1.0) };

        draw_line_segment_mut(
            &mut img,
            ((x1 + ox) as f32, (y1 + oy) as f32),
            ((x2 + ox) as f32, (y2 + oy) as f32),
            color,
        );
    }

    let occupied: HashSet<_> = db.placement.iter().copied().collect();
    let color_router = Rgb([90, 90, 100]);
    let color_occupied = Rgb([180, 120, 40]);

    let size = (cell_w.min(cell_h) * 0.25).max(3.0) as u32;
    for (i, router) in db.routers.iter().enumerate() {
        let (x, y) = map(router.pos.x, router.pos.y);
        let rect = ImageRect::at(
            (x - size as f64 / 2.0) as i32,
            (y - size as f64 / 2.0) as i32,
        )
        .of_size(size, size);

        if occupied.contains(&crate::db::indices::RouterId::new(i)) {
            draw_filled_rect_mut(&mut img, rect, color_occupied);
        } else {
            draw_filled_rect_mut(&mut img, rect, color_router);
        }
    }

    let _ = img.save(Path::new(filename));
}
