//! Image I/O

use crate::pbrt::*;
use crate::spectrum::*;
use byteorder::{BigEndian, LittleEndian, ReadBytesExt, WriteBytesExt};
use exr::prelude::*;
use image::{ImageBuffer, ImageFormat, Rgb};
use regex::Regex;
use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::result::Result;
use std::sync::OnceLock;

/// Write an RGB image to the given path. The format follows the extension:
/// `.exr`, `.pfm`, `.png` or `.tga`.
///
/// * `path`   - Output file path.
/// * `pixels` - Row-major pixels.
/// * `width`  - Width in pixels.
/// * `height` - Height in pixels.
pub fn write_image(path: &str, pixels: &[RGBSpectrum], width: usize, height: usize) -> Result<(), String> {
    if pixels.len() != width * height {
        return Err(format!(
            "Image {path} has {} pixels, expected {width} x {height}",
            pixels.len()
        ));
    }

    match get_extension_from_filename(path) {
        Some(".exr") => write_exr(path, pixels, width, height),
        Some(".pfm") => write_pfm(path, pixels, width, height),
        Some(".png") => write_8_bit(path, pixels, width, height, ImageFormat::Png),
        Some(".tga") => write_8_bit(path, pixels, width, height, ImageFormat::Tga),
        Some(extension) => Err(format!("Extension {extension} is not supported")),
        None => Err(format!("Can't determine file type from suffix of filename {path}")),
    }
}

/// Returns regular expression for extracting the file extension: the last
/// period followed by no periods or slashes.
fn regex_file_ext() -> &'static Regex {
    static DATA: OnceLock<Regex> = OnceLock::new();
    DATA.get_or_init(|| match Regex::new(r"(\.[^./\\]+)$") {
        Ok(re) => re,
        Err(err) => unreachable!("invalid extension pattern: {err}"),
    })
}

/// Retrieve the extension from a file path.
///
/// * `path` - The file path.
fn get_extension_from_filename(path: &str) -> Option<&str> {
    regex_file_ext()
        .captures(path)
        .and_then(|c| c.get(1).map(|m| m.as_str()))
}

/// Writes the image in OpenEXR format.
fn write_exr(path: &str, pixels: &[RGBSpectrum], width: usize, height: usize) -> Result<(), String> {
    info!("Writing image {path} with resolution {width}x{height}");

    write_rgb_file(path, width, height, |x, y| {
        let p = pixels[y * width + x];
        (p[0], p[1], p[2])
    })
    .map_err(|err| format!("Error saving output image {path}: {err}"))
}

/// Writes the image in an 8-bit format after gamma correction.
fn write_8_bit(
    path: &str,
    pixels: &[RGBSpectrum],
    width: usize,
    height: usize,
    image_format: ImageFormat,
) -> Result<(), String> {
    info!("Writing image {path} with resolution {width}x{height}");

    let imgbuf = ImageBuffer::from_fn(width as u32, height as u32, |x, y| {
        let p = pixels[y as usize * width + x as usize];
        Rgb([clamp_byte(p[0]), clamp_byte(p[1]), clamp_byte(p[2])])
    });

    imgbuf
        .save_with_format(path, image_format)
        .map_err(|err| format!("Error saving output image {path}: {err}."))
}

/// Writes the image in PFM (Portable FloatMap) format, little endian, rows
/// ordered bottom to top.
fn write_pfm(path: &str, pixels: &[RGBSpectrum], width: usize, height: usize) -> Result<(), String> {
    info!("Writing image {path} with resolution {width}x{height}");

    let file = File::create(path).map_err(|e| format!("write_pfm(): Error writing PFM file '{path}': {e}"))?;
    let mut out = BufWriter::new(file);

    // A negative scale marks little endian data.
    write!(out, "PF\n{width} {height}\n-1\n").map_err(|e| format!("write_pfm(): Error writing header '{path}': {e}"))?;

    for y in (0..height).rev() {
        for p in &pixels[y * width..(y + 1) * width] {
            for c in 0..3 {
                out.write_f32::<LittleEndian>(p[c])
                    .map_err(|e| format!("write_pfm(): Error writing PFM pixels '{path}': {e}"))?;
            }
        }
    }

    out.flush().map_err(|e| e.to_string())
}

/// Read a 3 channel PFM (Portable FloatMap) file. Returns the pixels in
/// row-major order with the top row first, and the resolution.
///
/// * `path` - Input file path.
pub fn read_pfm(path: &str) -> Result<(Vec<RGBSpectrum>, usize, usize), String> {
    let file = File::open(path).map_err(|e| format!("read_pfm(): Error reading PFM file '{path}': {e}"))?;
    let mut reader = BufReader::new(file);

    let ty = read_pfm_word(&mut reader)?;
    if ty != "PF" {
        return Err(format!("read_pfm(): Unsupported PFM type '{ty}'"));
    }

    let width = read_pfm_word(&mut reader)?
        .parse::<usize>()
        .map_err(|e| format!("Error parsing PFM width: {e}"))?;
    let height = read_pfm_word(&mut reader)?
        .parse::<usize>()
        .map_err(|e| format!("Error parsing PFM height: {e}"))?;
    let scale = read_pfm_word(&mut reader)?
        .parse::<f32>()
        .map_err(|e| format!("Error parsing PFM scale: {e}"))?;
    let little_endian = scale < 0.0;
    let scale = scale.abs();

    let mut pixels = vec![RGBSpectrum::ZERO; width * height];
    for y in (0..height).rev() {
        for x in 0..width {
            let mut c = [0.0; 3];
            for v in c.iter_mut() {
                let f = if little_endian {
                    reader.read_f32::<LittleEndian>()
                } else {
                    reader.read_f32::<BigEndian>()
                }
                .map_err(|e| format!("Error reading PFM pixel data y={y}, x={x}: {e}"))?;
                *v = f * scale;
            }
            pixels[y * width + x] = RGBSpectrum::rgb(c[0], c[1], c[2]);
        }
    }

    Ok((pixels, width, height))
}

/// Reads a whitespace-terminated header word.
fn read_pfm_word<R: Read>(reader: &mut R) -> Result<String, String> {
    let mut s = String::new();
    loop {
        let c = reader.read_u8().map_err(|e| format!("read_pfm_word(): {e}"))? as char;
        if c.is_ascii_whitespace() {
            if s.is_empty() {
                continue;
            }
            return Ok(s);
        }
        if s.len() >= 80 {
            return Err("read_pfm_word(): header word too long.".to_string());
        }
        s.push(c);
    }
}

/// Clamp floating point value to 8-bit range [0, 255] after gamma correction.
///
/// * `v` - Value to clamp.
#[inline]
fn clamp_byte(v: Float) -> u8 {
    clamp(255.0 * gamma_correct(v) + 0.5, 0.0, 255.0) as u8
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extension_parsing() {
        assert_eq!(get_extension_from_filename("out/render.exr"), Some(".exr"));
        assert_eq!(get_extension_from_filename("a.b/render.pfm"), Some(".pfm"));
        assert_eq!(get_extension_from_filename("render"), None);
    }

    #[test]
    fn unsupported_extension_is_an_error() {
        let pixels = vec![RGBSpectrum::ZERO; 4];
        assert!(write_image("image.bmpx", &pixels, 2, 2).is_err());
        assert!(write_image("image.pfm", &pixels, 3, 2).is_err());
    }

    #[test]
    fn pfm_round_trip() {
        let path = std::env::temp_dir().join("vcm_core_pfm_round_trip.pfm");
        let path = path.to_string_lossy().to_string();
        let pixels = vec![
            RGBSpectrum::rgb(0.0, 0.5, 1.0),
            RGBSpectrum::rgb(2.0, 3.0, 4.0),
            RGBSpectrum::rgb(5.0, 6.0, 7.0),
            RGBSpectrum::rgb(8.0, 9.0, 10.0),
            RGBSpectrum::rgb(11.0, 12.0, 13.0),
            RGBSpectrum::rgb(14.0, 15.0, 16.0),
        ];
        write_image(&path, &pixels, 3, 2).expect("write");
        let (read, w, h) = read_pfm(&path).expect("read");
        assert_eq!((w, h), (3, 2));
        assert_eq!(read, pixels);
        let _ = std::fs::remove_file(&path);
    }
}
