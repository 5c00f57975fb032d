use anyhow::{Result, anyhow, bail};
use psylab_core::ImageId;
use psylab_timing::{HighPrecisionTimer, Timer};
use std::time::Duration;
use tiny_skia::{Color, IntSize, Paint, Pixmap, PixmapPaint, Rect, Transform};

const BACKGROUND: [u8; 4] = [128, 128, 128, 255];
const FOREGROUND: [u8; 4] = [255, 255, 255, 255];

pub struct FrameStats {
    pub clear: Duration,
    pub draw: Duration,
    pub copy: Duration,
    pub total: Duration,
    pub dirty_count: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Shown {
    Fixation,
    Image(usize),
}

/// Pixel rectangle on the canvas; may extend past its edges.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Region {
    x: i32,
    y: i32,
    w: u32,
    h: u32,
}

/// Software renderer for the two stimuli of a trial.
///
/// Content is drawn centered on an opaque canvas, so premultiplied canvas
/// bytes equal the straight RGBA the frame buffer expects. Only the region
/// that changed since the previous frame is cleared and copied.
pub struct SkiaRenderer {
    width: u32,
    height: u32,
    center: (i32, i32),
    image_box: (u32, u32),

    canvas: Pixmap,
    fixation: Pixmap,
    images: Vec<Pixmap>,

    shown: Option<Shown>,
    occupied: Option<Region>,
    first_frame: bool,

    timer: HighPrecisionTimer,
}

impl SkiaRenderer {
    /// `fixation_size` is a fraction of the screen height; `image_size` is a
    /// (width, height) fraction of the screen.
    pub fn new(width: u32, height: u32, fixation_size: f32, image_size: (f32, f32)) -> Result<Self> {
        let mut canvas = Pixmap::new(width, height)
            .ok_or_else(|| anyhow!("cannot allocate a {width}x{height} canvas"))?;
        canvas.fill(color(BACKGROUND));

        let extent = ((height as f32 * fixation_size).round() as u32).max(3);
        let image_box = (
            ((width as f32 * image_size.0).round() as u32).clamp(1, width),
            ((height as f32 * image_size.1).round() as u32).clamp(1, height),
        );

        Ok(Self {
            width,
            height,
            center: (width as i32 / 2, height as i32 / 2),
            image_box,
            canvas,
            fixation: fixation_cross(extent)?,
            images: Vec::new(),
            shown: None,
            occupied: None,
            first_frame: true,
            timer: HighPrecisionTimer::new(),
        })
    }

    /// Box images should be scaled into before [`SkiaRenderer::add_image`].
    pub fn image_box(&self) -> (u32, u32) {
        self.image_box
    }

    /// Takes straight RGBA pixels and returns the id to draw them with.
    pub fn add_image(&mut self, mut rgba: Vec<u8>, width: u32, height: u32) -> Result<ImageId> {
        let size = IntSize::from_wh(width, height)
            .ok_or_else(|| anyhow!("invalid image size {width}x{height}"))?;
        if rgba.len() != width as usize * height as usize * 4 {
            bail!(
                "image buffer holds {} bytes, expected {}x{}x4",
                rgba.len(),
                width,
                height
            );
        }
        for px in rgba.chunks_exact_mut(4) {
            let a = px[3] as u16;
            if a < 255 {
                for c in &mut px[..3] {
                    *c = ((*c as u16 * a + 127) / 255) as u8;
                }
            }
        }
        let pixmap =
            Pixmap::from_vec(rgba, size).ok_or_else(|| anyhow!("rejected image buffer"))?;
        self.images.push(pixmap);
        Ok(ImageId(self.images.len() - 1))
    }

    pub fn render_fixation(&mut self, frame: &mut [u8]) -> Result<FrameStats> {
        self.show(Shown::Fixation, frame)
    }

    pub fn render_image(&mut self, image: ImageId, frame: &mut [u8]) -> Result<FrameStats> {
        if image.0 >= self.images.len() {
            bail!("unknown image {}", image.0);
        }
        self.show(Shown::Image(image.0), frame)
    }

    fn show(&mut self, what: Shown, frame: &mut [u8]) -> Result<FrameStats> {
        let start = self.timer.now();
        let expected = self.width as usize * self.height as usize * 4;
        if frame.len() != expected {
            bail!("frame holds {} bytes, expected {}", frame.len(), expected);
        }

        if self.shown == Some(what) && !self.first_frame {
            let total = self.timer.elapsed(start);
            return Ok(FrameStats {
                clear: Duration::ZERO,
                draw: Duration::ZERO,
                copy: Duration::ZERO,
                total,
                dirty_count: 0,
            });
        }

        let mut dirty = Vec::with_capacity(2);
        if let Some(previous) = self.occupied.take() {
            self.clear_region(previous);
            dirty.push(previous);
        }
        let cleared = self.timer.now();

        let pixmap = match what {
            Shown::Fixation => &self.fixation,
            Shown::Image(i) => &self.images[i],
        };
        let region = Region {
            x: self.center.0 - pixmap.width() as i32 / 2,
            y: self.center.1 - pixmap.height() as i32 / 2,
            w: pixmap.width(),
            h: pixmap.height(),
        };
        self.canvas.draw_pixmap(
            region.x,
            region.y,
            pixmap.as_ref(),
            &PixmapPaint::default(),
            Transform::identity(),
            None,
        );
        self.occupied = Some(region);
        self.shown = Some(what);
        dirty.push(region);
        let drawn = self.timer.now();

        if self.first_frame {
            frame.copy_from_slice(self.canvas.data());
            self.first_frame = false;
        } else {
            for region in &dirty {
                self.copy_region(*region, frame);
            }
        }
        let end = self.timer.now();

        Ok(FrameStats {
            clear: cleared.saturating_sub(start),
            draw: drawn.saturating_sub(cleared),
            copy: end.saturating_sub(drawn),
            total: end.saturating_sub(start),
            dirty_count: dirty.len(),
        })
    }

    fn clear_region(&mut self, region: Region) {
        let Some(rect) = Rect::from_xywh(
            region.x as f32,
            region.y as f32,
            region.w as f32,
            region.h as f32,
        ) else {
            return;
        };
        let mut paint = Paint::default();
        paint.anti_alias = false;
        paint.set_color(color(BACKGROUND));
        self.canvas.fill_rect(rect, &paint, Transform::identity(), None);
    }

    fn copy_region(&self, region: Region, frame: &mut [u8]) {
        let clamp = |v: i32, max: u32| v.clamp(0, max as i32) as usize;
        let x0 = clamp(region.x, self.width);
        let y0 = clamp(region.y, self.height);
        let x1 = clamp(region.x + region.w as i32, self.width);
        let y1 = clamp(region.y + region.h as i32, self.height);
        if x1 <= x0 || y1 <= y0 {
            return;
        }

        let stride = self.width as usize * 4;
        let canvas = self.canvas.data();
        for row in y0..y1 {
            let from = row * stride + x0 * 4;
            let to = row * stride + x1 * 4;
            frame[from..to].copy_from_slice(&canvas[from..to]);
        }
    }
}

fn color(rgba: [u8; 4]) -> Color {
    Color::from_rgba8(rgba[0], rgba[1], rgba[2], rgba[3])
}

/// A '+' of the given extent with bars a twentieth as thick, at least 2px.
fn fixation_cross(extent: u32) -> Result<Pixmap> {
    let mut pm = Pixmap::new(extent, extent).ok_or_else(|| anyhow!("fixation pixmap"))?;
    pm.fill(color(BACKGROUND));

    let mut paint = Paint::default();
    paint.anti_alias = false;
    paint.set_color(color(FOREGROUND));

    let size = extent as f32;
    let bar = (size / 20.0).round().max(2.0);
    let offset = ((size - bar) * 0.5).floor();
    let bars = [
        Rect::from_xywh(0.0, offset, size, bar),
        Rect::from_xywh(offset, 0.0, bar, size),
    ];
    for rect in bars.into_iter().flatten() {
        pm.fill_rect(rect, &paint, Transform::identity(), None);
    }
    Ok(pm)
}
