//! Integration tests for tilegfx-export
//!
//! Tests the full pipeline: generate test assets -> run the tool -> verify output


use std::path::Path;
use std::process::{Command, Output};
use tempfile::tempdir;

fn tilegfx_export(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_tilegfx-export"))
        .args(args)
        .output()
        .expect("Failed to run tilegfx-export")
}

fn path_str(path: &Path) -> &str {
    path.to_str().unwrap()
}

/// Decode a PNG with the `png` crate to inspect its color type and palette.
fn read_indexed_png(path: &Path) -> (png::ColorType, Vec<u8>, Vec<u8>) {
    let file = std::fs::File::open(path).expect("Failed to open output");
    let mut reader = png::Decoder::new(std::io::BufReader::new(file))
        .read_info()
        .expect("Failed to read PNG header");
    let color_type = reader.info().color_type;
    let palette = reader.info().palette.as_deref().unwrap_or_default().to_vec();
    let mut buf = vec![0; reader.output_buffer_size()];
    let frame = reader.next_frame(&mut buf).expect("Failed to decode PNG");
    buf.truncate(frame.buffer_size());
    (color_type, palette, buf)
}

#[test]
fn test_tile_writes_nineteen_tiles() {
    let dir = tempdir().expect("Failed to create temp dir");
    let corners = generate_test_assets::generate_corner_set(dir.path()).unwrap();
    let out = dir.path().join("tiles");

    let output = tilegfx_export(&[
        "tile",
        path_str(&corners[0]),
        path_str(&corners[1]),
        path_str(&corners[2]),
        "-o",
        path_str(&out),
        "--stem",
        "grass",
    ]);
    assert!(output.status.success(), "tile command failed: {:?}", output);

    for i in 0..19 {
        let path = out.join(format!("grass_{:02}.png", i));
        let img = image::open(&path).unwrap_or_else(|e| panic!("{:?}: {}", path, e));
        assert_eq!((img.width(), img.height()), (128, 80), "tile {}", i);
    }
    assert!(!out.join("grass_19.png").exists());
}

#[test]
fn test_tile_rejects_two_corners() {
    let dir = tempdir().expect("Failed to create temp dir");
    let corners = generate_test_assets::generate_corner_set(dir.path()).unwrap();
    let out = dir.path().join("tiles");

    let output = tilegfx_export(&[
        "tile",
        path_str(&corners[0]),
        path_str(&corners[1]),
        "-o",
        path_str(&out),
    ]);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("3 corner"));
    assert!(!out.exists(), "no output should be written");
}

#[test]
fn test_tile_rejects_unsupported_width() {
    let dir = tempdir().expect("Failed to create temp dir");
    let mut paths = Vec::new();
    for (i, height) in [10, 20, 30].into_iter().enumerate() {
        let path = dir.path().join(format!("c{}.png", i));
        generate_test_assets::generate_corner_png(&path, 48, height, 100).unwrap();
        paths.push(path);
    }
    let out = dir.path().join("tiles");

    let output = tilegfx_export(&[
        "tile",
        path_str(&paths[0]),
        path_str(&paths[1]),
        path_str(&paths[2]),
        "-o",
        path_str(&out),
    ]);
    assert!(!output.status.success());
    assert!(!out.exists(), "no output should be written");
}

#[test]
fn test_masks_are_square() {
    let dir = tempdir().expect("Failed to create temp dir");
    let corners = generate_test_assets::generate_corner_set(dir.path()).unwrap();
    let out = dir.path().join("masks");

    let output = tilegfx_export(&[
        "masks",
        path_str(&corners[0]),
        path_str(&corners[1]),
        path_str(&corners[2]),
        "-o",
        path_str(&out),
        "--prefix",
        "mask_2x_",
        "--background",
        "0,0,255",
    ]);
    assert!(output.status.success(), "masks command failed: {:?}", output);

    for i in 0..19 {
        let path = out.join(format!("mask_2x_{:04}.png", i));
        let img = image::open(&path).unwrap().to_rgba8();
        assert_eq!(img.dimensions(), (128, 128));
        // Fill shows above every mask shape
        assert_eq!(img.get_pixel(0, 0).0, [0, 0, 255, 255]);
    }
}

#[test]
fn test_quantize_writes_indexed_png() {
    let dir = tempdir().expect("Failed to create temp dir");
    let palettes = dir.path().join("palettes.toml");
    let input = dir.path().join("sprite.png");
    let output_path = dir.path().join("out/sprite_8bpp.png");
    generate_test_assets::write_palettes(&palettes).unwrap();
    generate_test_assets::generate_sprite_png(&input).unwrap();

    let output = tilegfx_export(&[
        "quantize",
        path_str(&input),
        path_str(&output_path),
        "--palettes",
        path_str(&palettes),
        "--palette",
        "dos",
    ]);
    assert!(output.status.success(), "quantize command failed: {:?}", output);

    let (color_type, palette, indices) = read_indexed_png(&output_path);
    assert_eq!(color_type, png::ColorType::Indexed);
    // Full table is written, not just the used entries
    assert_eq!(palette.len(), 8 * 3);
    assert_eq!(indices.len(), 16 * 16);
    // The action block keeps its exact palette entry
    assert_eq!(indices[0], 5);
    // Nothing free maps onto a reserved color
    for (i, &index) in indices.iter().enumerate() {
        let (x, y) = (i % 16, i / 16);
        if x >= 4 || y >= 4 {
            assert!(![0, 5, 6, 7].contains(&index), "pixel {} mapped to {}", i, index);
        }
    }
}

#[test]
fn test_quantize_unknown_palette_fails() {
    let dir = tempdir().expect("Failed to create temp dir");
    let palettes = dir.path().join("palettes.toml");
    let input = dir.path().join("sprite.png");
    let output_path = dir.path().join("sprite_8bpp.png");
    generate_test_assets::write_palettes(&palettes).unwrap();
    generate_test_assets::generate_sprite_png(&input).unwrap();

    let output = tilegfx_export(&[
        "quantize",
        path_str(&input),
        path_str(&output_path),
        "--palettes",
        path_str(&palettes),
        "--palette",
        "win",
    ]);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("win"));
    assert!(!output_path.exists());
}

#[test]
fn test_process_autocrop_prints_offset() {
    let dir = tempdir().expect("Failed to create temp dir");
    let input = dir.path().join("sprite.png");
    let output_path = dir.path().join("cropped.png");
    let mut img = image::RgbaImage::new(20, 10);
    for y in 3..7 {
        for x in 5..9 {
            img.put_pixel(x, y, image::Rgba([10, 20, 30, 255]));
        }
    }
    img.save(&input).unwrap();

    let output = tilegfx_export(&[
        "process",
        path_str(&input),
        path_str(&output_path),
        "--autocrop",
    ]);
    assert!(output.status.success(), "process command failed: {:?}", output);
    assert!(String::from_utf8_lossy(&output.stdout).contains("5 3"));

    let cropped = image::open(&output_path).unwrap();
    assert_eq!((cropped.width(), cropped.height()), (4, 4));
}

#[test]
fn test_process_palettes_without_palette_name_fails() {
    let dir = tempdir().expect("Failed to create temp dir");
    let palettes = dir.path().join("palettes.toml");
    let input = dir.path().join("sprite.png");
    let output_path = dir.path().join("sprite_out.png");
    generate_test_assets::write_palettes(&palettes).unwrap();
    generate_test_assets::generate_sprite_png(&input).unwrap();

    let output = tilegfx_export(&[
        "process",
        path_str(&input),
        path_str(&output_path),
        "--palettes",
        path_str(&palettes),
    ]);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("--palette"));
    assert!(!output_path.exists());
}

#[test]
fn test_build_from_manifest() {
    let dir = tempdir().expect("Failed to create temp dir");
    generate_test_assets::generate_corner_set(dir.path()).unwrap();
    generate_test_assets::write_palettes(&dir.path().join("palettes.toml")).unwrap();
    generate_test_assets::generate_sprite_png(&dir.path().join("sprite.png")).unwrap();

    let manifest = dir.path().join("tilegfx.toml");
    std::fs::write(
        &manifest,
        r#"
palettes = "palettes.toml"

[[tiles]]
corners = ["small.png", "medium.png", "large.png"]
output = "out/tiles"
stem = "grass"

[[masks]]
corners = ["small.png", "medium.png", "large.png"]
output = "out/masks"

[[quantize]]
input = "sprite.png"
output = "out/sprite.png"
palette = "dos"
keep_action = false
"#,
    )
    .unwrap();

    let output = tilegfx_export(&["check", path_str(&manifest)]);
    assert!(output.status.success(), "check failed: {:?}", output);

    let output = tilegfx_export(&["build", path_str(&manifest)]);
    assert!(output.status.success(), "build failed: {:?}", output);

    let out = dir.path().join("out");
    assert!(out.join("tiles/grass_00.png").exists());
    assert!(out.join("tiles/grass_18.png").exists());
    assert!(out.join("masks/mask_0018.png").exists());
    let (color_type, _, _) = read_indexed_png(&out.join("sprite.png"));
    assert_eq!(color_type, png::ColorType::Indexed);
}

#[test]
fn test_check_reports_missing_input() {
    let dir = tempdir().expect("Failed to create temp dir");
    let manifest = dir.path().join("tilegfx.toml");
    std::fs::write(
        &manifest,
        "[[tiles]]\ncorners = [\"a.png\", \"b.png\", \"c.png\"]\noutput = \"out\"\n",
    )
    .unwrap();

    let output = tilegfx_export(&["build", path_str(&manifest)]);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("a.png"));
    assert!(!dir.path().join("out").exists());
}

#[test]
fn test_build_stops_before_writing_on_bad_corner_width() {
    let dir = tempdir().expect("Failed to create temp dir");
    generate_test_assets::generate_corner_set(dir.path()).unwrap();
    generate_test_assets::generate_corner_png(&dir.path().join("large_2x.png"), 128, 65, 240).unwrap();

    let manifest = dir.path().join("tilegfx.toml");
    std::fs::write(
        &manifest,
        r#"
[[tiles]]
corners = ["small.png", "medium.png", "large.png"]
output = "out/tiles"

[[masks]]
corners = ["small.png", "medium.png", "large_2x.png"]
output = "out/masks"
"#,
    )
    .unwrap();

    let output = tilegfx_export(&["check", path_str(&manifest)]);
    assert!(!output.status.success(), "check should reject mismatched widths");

    let output = tilegfx_export(&["build", path_str(&manifest)]);
    assert!(!output.status.success());
    assert!(!dir.path().join("out").exists(), "no output should be written");
}
