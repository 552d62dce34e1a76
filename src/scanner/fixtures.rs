//! Test images with hand-built EXIF blocks.

use exif::{Field, In, Rational, Tag, Value};
use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
use std::io::Cursor;
use std::path::Path;

/// Gradient so that rotations and flips are observable
fn gradient(width: u32, height: u32) -> RgbImage {
    RgbImage::from_fn(width, height, |x, y| {
        Rgb([(x * 255 / width.max(1)) as u8, (y * 255 / height.max(1)) as u8, 128])
    })
}

/// Write a plain image; the format follows the extension.
pub(crate) fn write_image(path: &Path, width: u32, height: u32) {
    gradient(width, height).save(path).unwrap();
}

pub(crate) fn jpeg_bytes(width: u32, height: u32) -> Vec<u8> {
    let mut buf = Vec::new();
    DynamicImage::ImageRgb8(gradient(width, height))
        .write_to(&mut Cursor::new(&mut buf), ImageFormat::Jpeg)
        .unwrap();
    buf
}

/// Write a JPEG whose APP1 segment carries `fields`.
pub(crate) fn write_jpeg_with_exif(path: &Path, width: u32, height: u32, fields: &[Field]) {
    let mut writer = exif::experimental::Writer::new();
    for field in fields {
        writer.push_field(field);
    }
    let mut tiff = Cursor::new(Vec::new());
    writer.write(&mut tiff, false).unwrap();

    let mut payload = b"Exif\0\0".to_vec();
    payload.extend_from_slice(tiff.get_ref());
    let segment_len = u16::try_from(payload.len() + 2).unwrap();

    let jpeg = jpeg_bytes(width, height);
    let mut out = vec![0xFF, 0xD8, 0xFF, 0xE1];
    out.extend_from_slice(&segment_len.to_be_bytes());
    out.extend_from_slice(&payload);
    // Everything after the original SOI marker
    out.extend_from_slice(&jpeg[2..]);

    std::fs::write(path, out).unwrap();
}

pub(crate) fn ascii(tag: Tag, text: &str) -> Field {
    Field {
        tag,
        ifd_num: In::PRIMARY,
        value: Value::Ascii(vec![text.as_bytes().to_vec()]),
    }
}

pub(crate) fn orientation(code: u16) -> Field {
    Field {
        tag: Tag::Orientation,
        ifd_num: In::PRIMARY,
        value: Value::Short(vec![code]),
    }
}

fn dms(d: u32, m: u32, s: u32) -> Value {
    Value::Rational(vec![
        Rational { num: d, denom: 1 },
        Rational { num: m, denom: 1 },
        Rational { num: s, denom: 1 },
    ])
}

pub(crate) fn gps(
    lat: (u32, u32, u32),
    lat_ref: &str,
    lon: (u32, u32, u32),
    lon_ref: &str,
) -> Vec<Field> {
    vec![
        ascii(Tag::GPSLatitudeRef, lat_ref),
        Field {
            tag: Tag::GPSLatitude,
            ifd_num: In::PRIMARY,
            value: dms(lat.0, lat.1, lat.2),
        },
        ascii(Tag::GPSLongitudeRef, lon_ref),
        Field {
            tag: Tag::GPSLongitude,
            ifd_num: In::PRIMARY,
            value: dms(lon.0, lon.1, lon.2),
        },
    ]
}
