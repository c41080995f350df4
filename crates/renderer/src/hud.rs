//! Screen-space text overlay (the on-screen clock).

use bytemuck::{Pod, Zeroable};

/// One string to draw over the finished frame, in window pixels from the top-left.
#[derive(Debug, Clone, PartialEq)]
pub struct TextRun {
    pub text: String,
    pub x: f32,
    pub y: f32,
    /// 1.0 = 6x8 screen pixels per glyph.
    pub scale: f32,
    pub color: [f32; 4],
}

/// Vertex for screen-space text.
#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub struct OverlayVertex {
    /// NDC position (x, y) in -1..1
    pub position: [f32; 2],
    /// UV into the font atlas
    pub tex_coords: [f32; 2],
    pub color: [f32; 4],
}

impl OverlayVertex {
    pub fn layout() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<OverlayVertex>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &[
                wgpu::VertexAttribute {
                    offset: 0,
                    shader_location: 0,
                    format: wgpu::VertexFormat::Float32x2,
                },
                wgpu::VertexAttribute {
                    offset: std::mem::size_of::<[f32; 2]>() as wgpu::BufferAddress,
                    shader_location: 1,
                    format: wgpu::VertexFormat::Float32x2,
                },
                wgpu::VertexAttribute {
                    offset: std::mem::size_of::<[f32; 4]>() as wgpu::BufferAddress,
                    shader_location: 2,
                    format: wgpu::VertexFormat::Float32x4,
                },
            ],
        }
    }
}

const GLYPH_PX_W: u32 = 6;
const GLYPH_PX_H: u32 = 8;

/// Glyphs in atlas order. Anything else renders as a blank advance.
const GLYPH_CHARS: &str = "0123456789: ";

/// 5x7 rows, bit 4 = leftmost column.
#[rustfmt::skip]
const GLYPH_ROWS: [[u8; 7]; 12] = [
    [0x0E,0x11,0x13,0x15,0x19,0x11,0x0E], // 0
    [0x04,0x0C,0x04,0x04,0x04,0x04,0x0E], // 1
    [0x0E,0x11,0x01,0x06,0x08,0x10,0x1F], // 2
    [0x0E,0x11,0x01,0x06,0x01,0x11,0x0E], // 3
    [0x02,0x06,0x0A,0x12,0x1F,0x02,0x02], // 4
    [0x1F,0x10,0x1E,0x01,0x01,0x11,0x0E], // 5
    [0x06,0x08,0x10,0x1E,0x11,0x11,0x0E], // 6
    [0x1F,0x01,0x02,0x04,0x08,0x08,0x08], // 7
    [0x0E,0x11,0x11,0x0E,0x11,0x11,0x0E], // 8
    [0x0E,0x11,0x11,0x0F,0x01,0x02,0x0C], // 9
    [0x00,0x00,0x04,0x00,0x00,0x04,0x00], // :
    [0x00,0x00,0x00,0x00,0x00,0x00,0x00], // space
];

/// Single-row R8 glyph atlas.
#[derive(Debug, Clone)]
pub struct FontAtlas {
    pub pixels: Vec<u8>,
    pub width: u32,
    pub height: u32,
}

impl FontAtlas {
    pub fn generate() -> Self {
        let width = GLYPH_ROWS.len() as u32 * GLYPH_PX_W;
        let height = GLYPH_PX_H;
        let mut pixels = vec![0u8; (width * height) as usize];

        for (g, rows) in GLYPH_ROWS.iter().enumerate() {
            let base_x = g as u32 * GLYPH_PX_W;
            for (gy, bits) in rows.iter().enumerate() {
                for gx in 0..5u32 {
                    if (bits >> (4 - gx)) & 1 != 0 {
                        let px = base_x + gx;
                        pixels[(gy as u32 * width + px) as usize] = 255;
                    }
                }
            }
        }

        Self { pixels, width, height }
    }

    fn glyph_index(ch: char) -> Option<usize> {
        GLYPH_CHARS.find(ch)
    }

    /// UV rectangle `[u0, v0, u1, v1]` of a glyph.
    fn glyph_uv(index: usize) -> [f32; 4] {
        let count = GLYPH_ROWS.len() as f32;
        let u0 = index as f32 / count;
        let u1 = (index + 1) as f32 / count;
        [u0, 0.0, u1, 1.0]
    }
}

/// Builds overlay quads for a set of text runs.
pub struct OverlayTextBuilder {
    pub vertices: Vec<OverlayVertex>,
    pub indices: Vec<u32>,
    screen_w: f32,
    screen_h: f32,
}

impl OverlayTextBuilder {
    pub fn new(screen_w: f32, screen_h: f32) -> Self {
        Self {
            vertices: Vec::new(),
            indices: Vec::new(),
            screen_w: screen_w.max(1.0),
            screen_h: screen_h.max(1.0),
        }
    }

    fn px_to_ndc(&self, px: f32, py: f32) -> [f32; 2] {
        [(px / self.screen_w) * 2.0 - 1.0, 1.0 - (py / self.screen_h) * 2.0]
    }

    pub fn add_text(&mut self, run: &TextRun) {
        let gw = GLYPH_PX_W as f32 * run.scale;
        let gh = GLYPH_PX_H as f32 * run.scale;
        let mut cx = run.x;
        for ch in run.text.chars() {
            if let Some(index) = FontAtlas::glyph_index(ch) {
                let [u0, v0, u1, v1] = FontAtlas::glyph_uv(index);
                let tl = self.px_to_ndc(cx, run.y);
                let br = self.px_to_ndc(cx + gw, run.y + gh);
                let base = self.vertices.len() as u32;
                let color = run.color;
                let corners = [
                    ([tl[0], tl[1]], [u0, v0]),
                    ([br[0], tl[1]], [u1, v0]),
                    ([br[0], br[1]], [u1, v1]),
                    ([tl[0], br[1]], [u0, v1]),
                ];
                for (position, tex_coords) in corners {
                    self.vertices.push(OverlayVertex {
                        position,
                        tex_coords,
                        color,
                    });
                }
                self.indices
                    .extend_from_slice(&[base, base + 2, base + 1, base, base + 3, base + 2]);
            }
            cx += gw;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(text: &str) -> TextRun {
        TextRun {
            text: text.to_string(),
            x: 20.0,
            y: 40.0,
            scale: 3.0,
            color: [1.0; 4],
        }
    }

    #[test]
    fn atlas_covers_every_glyph() {
        let atlas = FontAtlas::generate();
        assert_eq!(atlas.width, 72);
        assert_eq!(atlas.height, 8);
        // The colon lights exactly two pixels.
        let colon = FontAtlas::glyph_index(':').unwrap() as u32 * GLYPH_PX_W;
        let lit = (0..atlas.height)
            .flat_map(|y| (colon..colon + GLYPH_PX_W).map(move |x| (x, y)))
            .filter(|&(x, y)| atlas.pixels[(y * atlas.width + x) as usize] == 255)
            .count();
        assert_eq!(lit, 2);
    }

    #[test]
    fn clock_text_builds_one_quad_per_glyph() {
        let mut builder = OverlayTextBuilder::new(1280.0, 720.0);
        builder.add_text(&run("08:00"));
        assert_eq!(builder.vertices.len(), 20);
        assert_eq!(builder.indices.len(), 30);
    }

    #[test]
    fn unknown_characters_only_advance() {
        let mut builder = OverlayTextBuilder::new(1280.0, 720.0);
        builder.add_text(&run("a1"));
        assert_eq!(builder.vertices.len(), 4);
        // The '1' starts one glyph width to the right of the origin.
        let expected_x = ((20.0 + 18.0) / 1280.0) * 2.0 - 1.0;
        assert!((builder.vertices[0].position[0] - expected_x).abs() < 1e-6);
    }

    #[test]
    fn top_left_pixel_maps_to_ndc_corner() {
        let builder = OverlayTextBuilder::new(800.0, 600.0);
        assert_eq!(builder.px_to_ndc(0.0, 0.0), [-1.0, 1.0]);
        assert_eq!(builder.px_to_ndc(800.0, 600.0), [1.0, -1.0]);
    }
}
