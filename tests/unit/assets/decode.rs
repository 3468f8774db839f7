use std::io::Cursor;
use std::path::PathBuf;

use super::*;

fn encode_png(img: image::DynamicImage) -> Vec<u8> {
    let mut buf = Vec::new();
    img.write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)
        .unwrap();
    buf
}

#[test]
fn decode_image_png_keeps_dimensions_and_straight_alpha() {
    let src = image::RgbaImage::from_raw(2, 1, vec![100, 50, 200, 128, 1, 2, 3, 255]).unwrap();
    let decoded = decode_image(&encode_png(image::DynamicImage::ImageRgba8(src))).unwrap();
    assert_eq!(decoded.dimensions(), (2, 1));
    assert_eq!(decoded.as_raw(), &vec![100, 50, 200, 128, 1, 2, 3, 255]);
}

#[test]
fn decode_image_widens_rgb_to_opaque_rgba() {
    let src = image::RgbImage::from_raw(1, 1, vec![9, 8, 7]).unwrap();
    let decoded = decode_image(&encode_png(image::DynamicImage::ImageRgb8(src))).unwrap();
    assert_eq!(decoded.as_raw(), &vec![9, 8, 7, 255]);
}

#[test]
fn decode_image_rejects_garbage() {
    assert!(decode_image(b"definitely not an image").is_err());
}

#[test]
fn load_missing_file_is_image_load_error() {
    let path = PathBuf::from("target/unit_decode/does_not_exist.png");
    let err = load_source_image(&path).unwrap_err();
    match err {
        ReelError::ImageLoad { path: p, .. } => assert_eq!(p, path),
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn load_corrupt_file_is_image_load_error() {
    let dir = PathBuf::from("target").join("unit_decode");
    std::fs::create_dir_all(&dir).unwrap();
    let path = dir.join("corrupt.jpg");
    std::fs::write(&path, b"\xFF\xD8\xFF\xE0 truncated").unwrap();

    let err = load_source_image(&path).unwrap_err();
    assert!(matches!(err, ReelError::ImageLoad { .. }));
    assert!(err.to_string().contains("corrupt.jpg"));
}
