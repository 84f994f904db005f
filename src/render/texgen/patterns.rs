//! Procedural 16×16 block art.
//!
//! Each pattern is a pure function of the RNG it is handed, so the same seed
//! always paints the same pixels.

use crate::render::atlas::TEXTURE_SIZE;
use image::{Rgba, RgbaImage};
use rand::Rng;
use rand_chacha::ChaCha8Rng;

pub type Pattern = fn(&mut ChaCha8Rng) -> RgbaImage;

/// Textures referenced by block faces.
pub const BLOCK_PATTERNS: &[(&str, Pattern)] = &[
    ("dirt", dirt),
    ("stone", stone),
    ("bedrock", bedrock),
    ("grass_top", grass_top),
    ("grass_side", grass_side),
    ("sand", sand),
    ("sandstone", sandstone),
    ("cactus_top", cactus_top),
    ("cactus_side", cactus_side),
    ("snow_block", snow_block),
    ("ice", ice),
    ("snow_layer", snow_layer),
    ("jungle_grass_top", jungle_grass_top),
    ("jungle_grass_side", jungle_grass_side),
    ("jungle_dirt", jungle_dirt),
    ("wood_top", wood_top),
    ("wood_side", wood_side),
    ("leaves", leaves),
];

/// Decoration textures not used by any block face yet.
pub const FLORA_PATTERNS: &[(&str, Pattern)] = &[
    ("flower_red", flower_red),
    ("flower_yellow", flower_yellow),
    ("flower_blue", flower_blue),
    ("leaves_sparse", leaves_sparse),
];

/// Kinds whose alpha channel is part of the look.
pub const TRANSLUCENT: &[&str] = &[
    "ice",
    "snow_layer",
    "leaves",
    "leaves_sparse",
    "flower_red",
    "flower_yellow",
    "flower_blue",
];

pub fn pattern_for(name: &str) -> Option<Pattern> {
    BLOCK_PATTERNS
        .iter()
        .chain(FLORA_PATTERNS)
        .find(|(pattern_name, _)| *pattern_name == name)
        .map(|(_, pattern)| *pattern)
}

const SIZE: u32 = TEXTURE_SIZE;

fn clamp(value: i32) -> u8 {
    value.clamp(0, 255) as u8
}

fn rgb(r: i32, g: i32, b: i32) -> Rgba<u8> {
    Rgba([clamp(r), clamp(g), clamp(b), 255])
}

fn rgba(r: i32, g: i32, b: i32, a: i32) -> Rgba<u8> {
    Rgba([clamp(r), clamp(g), clamp(b), clamp(a)])
}

/// Shifts each color channel by up to `variance`, alpha untouched.
fn jitter(base: Rgba<u8>, variance: i32, rng: &mut ChaCha8Rng) -> Rgba<u8> {
    let [r, g, b, a] = base.0;
    let mut shift = |channel: u8| clamp(channel as i32 + rng.gen_range(-variance..=variance));
    let r = shift(r);
    let g = shift(g);
    let b = shift(b);
    Rgba([r, g, b, a])
}

fn chance(rng: &mut ChaCha8Rng, percent: u32) -> bool {
    rng.gen_range(0..100) < percent
}

fn blank() -> RgbaImage {
    RgbaImage::new(SIZE, SIZE)
}

fn noisy_fill(base: Rgba<u8>, variation: i32, rng: &mut ChaCha8Rng) -> RgbaImage {
    let mut image = blank();
    for pixel in image.pixels_mut() {
        *pixel = jitter(base, variation, rng);
    }
    image
}

fn chunky_noise(primary: Rgba<u8>, secondary: Rgba<u8>, rng: &mut ChaCha8Rng) -> RgbaImage {
    let mut image = blank();
    for (x, y, pixel) in image.enumerate_pixels_mut() {
        let use_primary = ((x / 2 + y / 2) % 2 == 0) ^ rng.gen::<bool>();
        *pixel = if use_primary {
            jitter(primary, 10, rng)
        } else {
            jitter(secondary, 8, rng)
        };
    }
    image
}

fn sprinkle(image: &mut RgbaImage, color: Rgba<u8>, percent: u32, rng: &mut ChaCha8Rng) {
    for pixel in image.pixels_mut() {
        if chance(rng, percent) {
            *pixel = jitter(color, 20, rng);
        }
    }
}

fn put(image: &mut RgbaImage, x: i32, y: i32, color: Rgba<u8>) {
    if (0..SIZE as i32).contains(&x) && (0..SIZE as i32).contains(&y) {
        image.put_pixel(x as u32, y as u32, color);
    }
}

fn circle(image: &mut RgbaImage, cx: i32, cy: i32, radius: i32, color: Rgba<u8>) {
    for dy in -radius..=radius {
        for dx in -radius..=radius {
            if dx * dx + dy * dy <= radius * radius {
                put(image, cx + dx, cy + dy, color);
            }
        }
    }
}

fn plus(image: &mut RgbaImage, cx: i32, cy: i32, color: Rgba<u8>) {
    for i in -2..=2 {
        put(image, cx + i, cy, color);
        put(image, cx, cy + i, color);
    }
}

fn stem(image: &mut RgbaImage, x: i32, color: Rgba<u8>) {
    for y in (0..SIZE as i32).rev() {
        if y % 2 == 0 {
            put(image, (x - 1).max(0), y, color);
        }
        put(image, x, y, color);
        if y % 3 == 0 {
            put(image, (x + 1).min(SIZE as i32 - 1), y, color);
        }
    }
}

/// A crack wandering from top to bottom.
fn vein(image: &mut RgbaImage, color: Rgba<u8>, rng: &mut ChaCha8Rng) {
    let mut x = rng.gen_range(0..SIZE as i32);
    for y in 0..SIZE as i32 {
        let shade = jitter(color, 12, rng);
        put(image, x, y, shade);
        if rng.gen::<bool>() {
            x += if rng.gen::<bool>() { 1 } else { -1 };
            x = x.clamp(1, SIZE as i32 - 2);
        }
    }
}

fn dirt(rng: &mut ChaCha8Rng) -> RgbaImage {
    noisy_fill(rgb(126, 86, 48), 18, rng)
}

fn stone(rng: &mut ChaCha8Rng) -> RgbaImage {
    noisy_fill(rgb(128, 130, 132), 10, rng)
}

fn bedrock(rng: &mut ChaCha8Rng) -> RgbaImage {
    chunky_noise(rgb(68, 68, 72), rgb(18, 18, 18), rng)
}

fn sand(rng: &mut ChaCha8Rng) -> RgbaImage {
    noisy_fill(rgb(220, 200, 158), 12, rng)
}

fn snow_block(rng: &mut ChaCha8Rng) -> RgbaImage {
    noisy_fill(rgb(236, 240, 245), 8, rng)
}

fn jungle_dirt(rng: &mut ChaCha8Rng) -> RgbaImage {
    noisy_fill(rgb(90, 63, 28), 20, rng)
}

fn grass_top(rng: &mut ChaCha8Rng) -> RgbaImage {
    let mut image = blank();
    for pixel in image.pixels_mut() {
        let shade = 90 + rng.gen_range(0..60);
        let highlight = if chance(rng, 5) { 40 } else { 0 };
        *pixel = rgb(shade - 20 + highlight, shade + 20, shade - 30 + highlight);
    }
    sprinkle(&mut image, rgb(160, 200, 90), 18, rng);
    image
}

/// Dirt with a ragged grass band of `band` rows on top.
fn grass_over(
    mut image: RgbaImage,
    band: u32,
    grass: impl Fn(&mut ChaCha8Rng) -> Rgba<u8>,
    rng: &mut ChaCha8Rng,
) -> RgbaImage {
    for y in 0..band {
        for x in 0..SIZE {
            image.put_pixel(x, y, grass(rng));
        }
    }
    image
}

fn grass_side(rng: &mut ChaCha8Rng) -> RgbaImage {
    let soil = noisy_fill(rgb(126, 86, 48), 20, rng);
    let mut image = grass_over(
        soil,
        5,
        |rng| {
            rgb(
                70 + rng.gen_range(0..70),
                120 + rng.gen_range(0..80),
                40 + rng.gen_range(0..40),
            )
        },
        rng,
    );
    sprinkle(&mut image, rgb(180, 210, 90), 10, rng);
    image
}

fn jungle_grass_top(rng: &mut ChaCha8Rng) -> RgbaImage {
    let mut image = grass_top(rng);
    for pixel in image.pixels_mut() {
        let [r, g, b, _] = pixel.0;
        *pixel = rgb(
            (r as f32 * 0.8) as i32,
            (g as f32 * 1.1) as i32,
            (b as f32 * 0.7) as i32,
        );
    }
    sprinkle(&mut image, rgb(30, 160, 60), 10, rng);
    image
}

fn jungle_grass_side(rng: &mut ChaCha8Rng) -> RgbaImage {
    let soil = noisy_fill(rgb(90, 60, 32), 22, rng);
    let mut image = grass_over(
        soil,
        6,
        |rng| {
            rgb(
                20 + rng.gen_range(0..80),
                120 + rng.gen_range(0..80),
                30 + rng.gen_range(0..40),
            )
        },
        rng,
    );
    sprinkle(&mut image, rgb(10, 140, 50), 12, rng);
    image
}

fn sandstone(rng: &mut ChaCha8Rng) -> RgbaImage {
    let mut image = noisy_fill(rgb(214, 194, 155), 10, rng);
    for y in (1..SIZE).step_by(4) {
        for x in 0..SIZE {
            if rng.gen::<bool>() {
                image.put_pixel(x, y, rgb(200, 182, 140));
            }
        }
    }
    image
}

fn cactus_top(rng: &mut ChaCha8Rng) -> RgbaImage {
    let mut image = noisy_fill(rgb(50, 140, 60), 15, rng);
    let center = SIZE as i32 / 2;
    plus(&mut image, center, center, rgb(25, 90, 35));
    image
}

fn cactus_side(rng: &mut ChaCha8Rng) -> RgbaImage {
    let mut image = blank();
    for x in 0..SIZE {
        let base = if x % 4 < 2 {
            rgb(35, 120, 50)
        } else {
            rgb(45, 160, 70)
        };
        for y in 0..SIZE {
            image.put_pixel(x, y, jitter(base, 18, rng));
        }
    }
    // Spines
    for y in (2..SIZE).step_by(4) {
        for x in (1..SIZE).step_by(4) {
            image.put_pixel(x, y, rgb(220, 240, 200));
        }
    }
    image
}

fn ice(rng: &mut ChaCha8Rng) -> RgbaImage {
    let mut image = blank();
    for pixel in image.pixels_mut() {
        let alpha = 150 + rng.gen_range(0..70);
        *pixel = rgba(
            170 + rng.gen_range(0..20),
            200 + rng.gen_range(0..30),
            255,
            alpha,
        );
    }
    vein(&mut image, rgba(130, 170, 230, 200), rng);
    image
}

fn snow_layer(rng: &mut ChaCha8Rng) -> RgbaImage {
    let mut image = blank();
    for pixel in image.pixels_mut() {
        let alpha = if chance(rng, 15) { 220 } else { rng.gen_range(0..60) };
        let tone = 230 + rng.gen_range(0..25);
        *pixel = rgba(tone, tone, tone, alpha);
    }
    image
}

fn wood_top(rng: &mut ChaCha8Rng) -> RgbaImage {
    let mut image = blank();
    let center = (SIZE - 1) as f32 / 2.0;
    for (x, y, pixel) in image.enumerate_pixels_mut() {
        let ring = (x as f32 - center).hypot(y as f32 - center) as u32;
        let base = if ring % 2 == 0 {
            rgb(152, 123, 72)
        } else {
            rgb(134, 102, 58)
        };
        *pixel = jitter(base, 12, rng);
    }

    let mid = SIZE / 2;
    let grain = rgb(94, 69, 38);
    for i in 0..SIZE {
        if rng.gen::<bool>() {
            let shade = jitter(grain, 10, rng);
            image.put_pixel(i, mid, shade);
        }
        if rng.gen::<bool>() {
            let shade = jitter(grain, 10, rng);
            image.put_pixel(mid, i, shade);
        }
    }
    image
}

fn wood_side(rng: &mut ChaCha8Rng) -> RgbaImage {
    let mut image = blank();
    for x in 0..SIZE {
        let base = if x % 3 == 0 {
            rgb(134, 102, 58)
        } else {
            rgb(152, 123, 72)
        };
        for y in 0..SIZE {
            image.put_pixel(x, y, jitter(base, 10, rng));
        }
    }
    image
}

fn leaves(rng: &mut ChaCha8Rng) -> RgbaImage {
    let mut image = blank();
    for (_, y, pixel) in image.enumerate_pixels_mut() {
        let mut base = if y % 2 == 0 {
            rgba(40, 120, 50, 210)
        } else {
            rgba(20, 100, 30, 200)
        };
        if chance(rng, 10) {
            base = rgba(70, 150, 60, 230);
        }
        *pixel = jitter(base, 18, rng);
    }
    image
}

fn leaves_sparse(rng: &mut ChaCha8Rng) -> RgbaImage {
    let mut image = blank();
    for pixel in image.pixels_mut() {
        let alpha = if chance(rng, 50) { 200 } else { 40 };
        *pixel = jitter(rgba(60, 170, 80, alpha), 25, rng);
    }
    image
}

/// Six petals around a pollen disc on a stem, over a fully transparent base.
fn flower(petal: Rgba<u8>, pollen: Rgba<u8>, rng: &mut ChaCha8Rng) -> RgbaImage {
    let mut image = blank();
    let center = SIZE as i32 / 2;
    for i in 0..6 {
        let degrees = (i * 60 + rng.gen_range(0..10) - 5) as f32;
        let angle = degrees.to_radians();
        let px = center + (angle.cos() * 4.0).round() as i32;
        let py = center + (angle.sin() * 4.0).round() as i32;
        circle(&mut image, px, py, 2, petal);
    }
    let [r, g, b, _] = pollen.0;
    circle(&mut image, center, center, 2, Rgba([r, g, b, 240]));
    stem(&mut image, center, rgb(40, 140, 60));
    image
}

fn flower_red(rng: &mut ChaCha8Rng) -> RgbaImage {
    flower(rgb(210, 25, 50), rgb(255, 200, 90), rng)
}

fn flower_yellow(rng: &mut ChaCha8Rng) -> RgbaImage {
    flower(rgb(240, 210, 40), rgb(255, 240, 180), rng)
}

fn flower_blue(rng: &mut ChaCha8Rng) -> RgbaImage {
    flower(rgb(80, 120, 210), rgb(200, 220, 255), rng)
}
