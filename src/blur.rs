//! Pure CPU blur transforms over premultiplied RGBA8 buffers.
//!
//! Intensity maps monotonically to gaussian sigma. An intensity of zero is a
//! guaranteed no-op returning a pixel-identical copy of the input, for both
//! kernels.

use crate::foundation::error::{MatchcutError, MatchcutResult};

/// Fraction of `min(w, h)` kept perfectly sharp at the center of a radial
/// blur.
const RADIAL_SHARP_RADIUS_FACTOR: f32 = 0.3;
/// The radial falloff band extends this fraction of `max(w, h)` past the
/// sharp radius.
const RADIAL_FADE_SPAN_FACTOR: f32 = 0.15;
/// Peripheral sigma boost for radial blur relative to the configured
/// intensity.
const RADIAL_PERIPHERY_BOOST: f32 = 1.5;

const MAX_KERNEL_RADIUS: u32 = 254;

/// Kernel radius for a given sigma. Two sigmas either side captures the bulk
/// of the gaussian mass; larger tails round to zero in Q16 anyway.
fn radius_for_sigma(sigma: f32) -> u32 {
    ((sigma * 2.0).ceil() as u32).min(MAX_KERNEL_RADIUS)
}

/// Uniform gaussian blur at `intensity` (sigma in pixels).
///
/// Returns a new buffer of identical dimensions. `intensity == 0` returns a
/// pixel-identical copy.
pub fn gaussian_blur(
    src: &[u8],
    width: u32,
    height: u32,
    intensity: f32,
) -> MatchcutResult<Vec<u8>> {
    check_dims(src, width, height)?;
    if !intensity.is_finite() || intensity < 0.0 {
        return Err(MatchcutError::render(
            "blur intensity must be finite and >= 0",
        ));
    }
    if intensity == 0.0 {
        return Ok(src.to_vec());
    }

    let radius = radius_for_sigma(intensity);
    if radius == 0 {
        return Ok(src.to_vec());
    }
    let kernel = gaussian_kernel_q16(radius, intensity)?;

    let mut tmp = vec![0u8; src.len()];
    let mut out = vec![0u8; src.len()];
    horizontal_pass(src, &mut tmp, width, height, &kernel);
    vertical_pass(&tmp, &mut out, width, height, &kernel);
    Ok(out)
}

/// Radial blur: sharp at `center`, blurred at the periphery.
///
/// Implemented as a full gaussian blur at boosted intensity, blended with the
/// sharp source through a smoothstep falloff of distance from `center`. The
/// mask weight is monotone in distance, so blur strength never decreases
/// moving outward. `intensity == 0` returns a pixel-identical copy.
pub fn radial_blur(
    src: &[u8],
    width: u32,
    height: u32,
    center: (f32, f32),
    intensity: f32,
) -> MatchcutResult<Vec<u8>> {
    check_dims(src, width, height)?;
    if !intensity.is_finite() || intensity < 0.0 {
        return Err(MatchcutError::render(
            "blur intensity must be finite and >= 0",
        ));
    }
    if intensity == 0.0 {
        return Ok(src.to_vec());
    }

    let blurred = gaussian_blur(src, width, height, intensity * RADIAL_PERIPHERY_BOOST)?;

    let w = width as f32;
    let h = height as f32;
    let sharp_radius = w.min(h) * RADIAL_SHARP_RADIUS_FACTOR;
    let fade_radius = sharp_radius + w.max(h) * RADIAL_FADE_SPAN_FACTOR;

    let mut out = vec![0u8; src.len()];
    for y in 0..height {
        for x in 0..width {
            let dx = (x as f32 + 0.5) - center.0;
            let dy = (y as f32 + 0.5) - center.1;
            let dist = (dx * dx + dy * dy).sqrt();
            let t = smoothstep(sharp_radius, fade_radius, dist);
            let weight = ((t * 255.0).round() as u16).min(255);

            let idx = ((y * width + x) as usize) * 4;
            for c in 0..4 {
                let sharp = u16::from(src[idx + c]);
                let soft = u16::from(blurred[idx + c]);
                out[idx + c] =
                    ((sharp * (255 - weight) + soft * weight + 127) / 255).min(255) as u8;
            }
        }
    }
    Ok(out)
}

fn smoothstep(edge0: f32, edge1: f32, x: f32) -> f32 {
    if edge1 <= edge0 {
        return if x < edge0 { 0.0 } else { 1.0 };
    }
    let t = ((x - edge0) / (edge1 - edge0)).clamp(0.0, 1.0);
    t * t * (3.0 - 2.0 * t)
}

fn check_dims(src: &[u8], width: u32, height: u32) -> MatchcutResult<()> {
    let expected = (width as usize)
        .checked_mul(height as usize)
        .and_then(|v| v.checked_mul(4))
        .ok_or_else(|| MatchcutError::render("blur buffer size overflow"))?;
    if src.len() != expected {
        return Err(MatchcutError::render(
            "blur expects src matching width*height*4",
        ));
    }
    Ok(())
}

/// Normalized gaussian weights in Q16 fixed point, summing to exactly 65536.
fn gaussian_kernel_q16(radius: u32, sigma: f32) -> MatchcutResult<Vec<u32>> {
    if radius == 0 {
        return Ok(vec![1 << 16]);
    }
    if !sigma.is_finite() || sigma <= 0.0 {
        return Err(MatchcutError::render("blur sigma must be > 0"));
    }

    let r = radius as i32;
    let sigma = f64::from(sigma);
    let denom = 2.0 * sigma * sigma;
    let mut weights_f = Vec::<f64>::with_capacity((2 * r + 1) as usize);
    let mut sum = 0.0f64;
    for i in -r..=r {
        let x = f64::from(i);
        let w = (-x * x / denom).exp();
        weights_f.push(w);
        sum += w;
    }
    if sum <= 0.0 {
        return Err(MatchcutError::render("gaussian kernel sum is zero"));
    }

    let mut weights = Vec::<u32>::with_capacity(weights_f.len());
    let mut acc: i64 = 0;
    for &wf in &weights_f {
        let q = ((wf / sum) * 65536.0).round() as i64;
        let q = q.clamp(0, 65536);
        weights.push(q as u32);
        acc += q;
    }
    // Push rounding error into the center tap so the kernel sums to one and a
    // constant image stays constant.
    let delta = 65536i64 - acc;
    if delta != 0 {
        let mid = weights.len() / 2;
        let mid_val = i64::from(weights[mid]);
        weights[mid] = (mid_val + delta).clamp(0, 65536) as u32;
    }

    Ok(weights)
}

fn horizontal_pass(src: &[u8], dst: &mut [u8], width: u32, height: u32, k: &[u32]) {
    let radius = (k.len() / 2) as i32;
    let w = width as i32;
    for y in 0..height as i32 {
        for x in 0..w {
            let mut acc = [0u64; 4];
            for (ki, &kw) in k.iter().enumerate() {
                let dx = ki as i32 - radius;
                let sx = (x + dx).clamp(0, w - 1);
                let idx = ((y * w + sx) as usize) * 4;
                for c in 0..4 {
                    acc[c] += u64::from(kw) * u64::from(src[idx + c]);
                }
            }
            let out_idx = ((y * w + x) as usize) * 4;
            for c in 0..4 {
                dst[out_idx + c] = q16_to_u8(acc[c]);
            }
        }
    }
}

fn vertical_pass(src: &[u8], dst: &mut [u8], width: u32, height: u32, k: &[u32]) {
    let radius = (k.len() / 2) as i32;
    let w = width as i32;
    let h = height as i32;
    for y in 0..h {
        for x in 0..w {
            let mut acc = [0u64; 4];
            for (ki, &kw) in k.iter().enumerate() {
                let dy = ki as i32 - radius;
                let sy = (y + dy).clamp(0, h - 1);
                let idx = ((sy * w + x) as usize) * 4;
                for c in 0..4 {
                    acc[c] += u64::from(kw) * u64::from(src[idx + c]);
                }
            }
            let out_idx = ((y * w + x) as usize) * 4;
            for c in 0..4 {
                dst[out_idx + c] = q16_to_u8(acc[c]);
            }
        }
    }
}

fn q16_to_u8(acc: u64) -> u8 {
    let v = (acc + 32768) >> 16;
    v.min(255) as u8
}
