mod common;

use common::{gpu_context, write_rgba_dds};
use glam::{Mat4, Vec2, Vec3, Vec4};
use image::{Rgba, RgbaImage};
use marker_based_ar::composite::flip_vertical;
use marker_based_ar::error::RenderError;
use marker_based_ar::render::{
    Mesh, RenderConfig, RenderContext, Renderer, SceneMatrices, ShaderSources, Texture,
};

const LIGHT: Vec3 = Vec3::new(4.0, 4.0, 4.0);

fn white() -> Texture {
    Texture::solid([255, 255, 255, 255])
}

#[test]
fn test_fixed_scene_matrices() {
    let m = SceneMatrices::from_config(&RenderConfig::default());
    assert_eq!(m.model, Mat4::IDENTITY);
    // camera at (0, 0, 5) looking at the origin
    let origin_in_view = m.view * Vec4::new(0.0, 0.0, 0.0, 1.0);
    assert!((origin_in_view.z + 5.0).abs() < 1e-6);
    let clip = m.mvp() * Vec4::new(0.0, 0.0, 0.0, 1.0);
    assert!(clip.x.abs() < 1e-6 && clip.y.abs() < 1e-6);
    let aspect = 512.0 / 394.0;
    let expected = Mat4::perspective_rh_gl(45f32.to_radians(), aspect, 0.1, 100.0);
    assert_eq!(m.projection, expected);
}

#[test]
fn test_invalid_settings_fail_before_device_creation() {
    let shaders = ShaderSources::standard();
    let config = RenderConfig {
        width: 0,
        ..RenderConfig::default()
    };
    let err = RenderContext::new(config, &shaders, Mesh::quad(1.0), white());
    assert!(matches!(err, Err(RenderError::InvalidViewport { .. })));

    let config = RenderConfig {
        samples: 8,
        ..RenderConfig::default()
    };
    let err = RenderContext::new(config, &shaders, Mesh::quad(1.0), white());
    assert!(matches!(err, Err(RenderError::InvalidSampleCount(8))));

    let err = RenderContext::new(RenderConfig::default(), &shaders, Mesh::default(), white());
    assert!(matches!(err, Err(RenderError::EmptyMesh(_))));
}

#[test]
fn test_missing_assets_are_reported() {
    let err = RenderContext::from_files(
        RenderConfig::default(),
        "/nonexistent/suzanne.obj",
        "uvmap.DDS",
        "StandardShading.vertexshader",
        "StandardShading.fragmentshader",
    );
    assert!(matches!(err, Err(RenderError::MeshLoad { .. })));

    let dir = tempfile::tempdir().unwrap();
    let obj_path = dir.path().join("tri.obj");
    std::fs::write(&obj_path, "v 0 0 0\nv 1 0 0\nv 0 1 0\nf 1 2 3\n").unwrap();
    let err = RenderContext::from_files(
        RenderConfig::default(),
        &obj_path,
        dir.path().join("uvmap.DDS"),
        "StandardShading.vertexshader",
        "StandardShading.fragmentshader",
    );
    assert!(matches!(err, Err(RenderError::TextureDecode { .. })));

    let png_path = dir.path().join("uvmap.png");
    RgbaImage::from_pixel(2, 2, Rgba([1, 2, 3, 255]))
        .save(&png_path)
        .unwrap();
    let err = RenderContext::from_files(
        RenderConfig::default(),
        &obj_path,
        &png_path,
        dir.path().join("missing.vertexshader"),
        dir.path().join("missing.fragmentshader"),
    );
    assert!(matches!(err, Err(RenderError::ShaderLoad { .. })));
}

#[test]
fn test_dds_texture_loading() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("uvmap.DDS");
    let img = RgbaImage::from_fn(4, 2, |x, y| Rgba([x as u8 * 60, y as u8 * 200, 7, 255]));
    write_rgba_dds(&path, &img);

    let tex = Texture::load(&path).unwrap();
    assert_eq!(tex.dimensions(), (4, 2));
    assert_eq!(tex.image(), &img);

    std::fs::write(dir.path().join("broken.dds"), b"DDS garbage").unwrap();
    let err = Texture::load(dir.path().join("broken.dds"));
    assert!(matches!(err, Err(RenderError::TextureDecode { .. })));
}

#[test]
fn test_obj_loading() {
    let dir = tempfile::tempdir().unwrap();
    let obj_path = dir.path().join("square.obj");
    std::fs::write(
        &obj_path,
        "v -1 -1 0\nv 1 -1 0\nv 1 1 0\nv -1 1 0\nvt 0 0\nvt 1 0\nvt 1 1\nvt 0 1\nf 1/1 2/2 3/3 4/4\n",
    )
    .unwrap();
    let mesh = Mesh::load_obj(&obj_path).unwrap();
    assert_eq!(mesh.triangle_count(), 2);
    assert!(mesh.normals.iter().all(|n| (*n - Vec3::Z).length() < 1e-6));
    assert_eq!(mesh.uvs[0], Vec2::new(0.0, 0.0));

    let interleaved = mesh.interleaved();
    assert_eq!(interleaved.len(), 6 * 8);
    // position, then V mirrored into sampler space, then the normal
    assert_eq!(&interleaved[0..8], &[-1.0, -1.0, 0.0, 0.0, 1.0, 0.0, 0.0, 1.0]);
}

#[test]
fn test_quad_renders_in_the_middle() {
    let Some(mut ctx) = gpu_context(RenderConfig::default(), Mesh::quad(1.0), white()) else {
        return;
    };
    ctx.draw_frame(LIGHT);
    let img = ctx.read_pixels().unwrap();
    assert_eq!(img.dimensions(), (512, 394));
    let center = img.get_pixel(256, 197);
    assert_eq!(center[3], 255);
    assert!(center[0] > 25, "lit quad should be brighter than ambient: {:?}", center);
    assert_eq!(img.get_pixel(0, 0).0, [0, 0, 0, 0]);
    assert_eq!(img.get_pixel(511, 393).0, [0, 0, 0, 0]);
    assert_eq!(ctx.frames_drawn(), 1);
}

#[test]
fn test_back_faces_are_culled() {
    let mut quad = Mesh::quad(1.0);
    for tri in quad.positions.chunks_exact_mut(3) {
        tri.swap(1, 2);
    }
    let Some(mut ctx) = gpu_context(RenderConfig::default(), quad, white()) else {
        return;
    };
    ctx.draw_frame(LIGHT);
    assert!(ctx.read_pixels().unwrap().pixels().all(|p| p.0 == [0, 0, 0, 0]));
}

#[test]
fn test_read_back_has_bottom_left_origin() {
    let mut quad = Mesh::quad(0.5);
    for p in quad.positions.iter_mut() {
        p.y += 1.5;
    }
    let Some(mut ctx) = gpu_context(RenderConfig::default(), quad, white()) else {
        return;
    };
    ctx.draw_frame(LIGHT);
    let raw = ctx.read_pixels().unwrap();
    let covered_half = |img: &RgbaImage, upper: bool| {
        img.enumerate_pixels()
            .filter(|(_, _, p)| p[3] != 0)
            .all(|(_, y, _)| if upper { y < 197 } else { y > 197 })
    };
    assert!(raw.pixels().any(|p| p[3] != 0));
    // above the view center means high rows in the raw read-back
    assert!(covered_half(&raw, false));
    assert!(covered_half(&flip_vertical(&raw), true));
}

#[test]
fn test_front_buffer_only_changes_on_swap() {
    let Some(mut ctx) = gpu_context(RenderConfig::default(), Mesh::quad(1.0), white()) else {
        return;
    };
    ctx.draw_frame(LIGHT);
    let drawn = ctx.read_pixels().unwrap();
    ctx.swap_buffers();
    // the other target was never drawn into
    assert!(ctx.read_pixels().unwrap().pixels().all(|p| p[3] == 0));
    ctx.swap_buffers();
    assert_eq!(ctx.read_pixels().unwrap(), drawn);
}

#[test]
fn test_uniforms_are_column_major() {
    let Some(mut ctx) = gpu_context(RenderConfig::default(), Mesh::quad(1.0), white()) else {
        return;
    };
    ctx.draw_frame(LIGHT);
    let u = ctx.uniforms();
    assert_eq!(u.mvp, ctx.matrices().mvp().to_cols_array());
    assert_eq!(u.light_position_worldspace, LIGHT);
}

#[test]
fn test_single_sample_and_multisample_agree_inside() {
    let single = RenderConfig {
        samples: 1,
        ..RenderConfig::default()
    };
    let (Some(mut a), Some(mut b)) = (
        gpu_context(single, Mesh::quad(1.0), white()),
        gpu_context(RenderConfig::default(), Mesh::quad(1.0), white()),
    ) else {
        return;
    };
    a.draw_frame(LIGHT);
    b.draw_frame(LIGHT);
    let (pa, pb) = (a.read_pixels().unwrap(), b.read_pixels().unwrap());
    let (ca, cb) = (pa.get_pixel(256, 197), pb.get_pixel(256, 197));
    for k in 0..4 {
        assert!(ca[k].abs_diff(cb[k]) <= 2, "{:?} vs {:?}", ca, cb);
    }
}

#[test]
fn test_textured_quad_from_files() {
    let Some(_) = gpu_context(RenderConfig::default(), Mesh::quad(1.0), white()) else {
        return;
    };
    let dir = tempfile::tempdir().unwrap();
    let obj_path = dir.path().join("square.obj");
    std::fs::write(
        &obj_path,
        "v -1 -1 0\nv 1 -1 0\nv 1 1 0\nv -1 1 0\nvt 0 0\nvt 1 0\nvt 1 1\nvt 0 1\nf 1/1 2/2 3/3 4/4\n",
    )
    .unwrap();
    // top half red, bottom half blue
    let img = RgbaImage::from_fn(8, 8, |_, y| {
        if y < 4 { Rgba([255, 0, 0, 255]) } else { Rgba([0, 0, 255, 255]) }
    });
    let dds_path = dir.path().join("uvmap.DDS");
    write_rgba_dds(&dds_path, &img);
    let assets = concat!(env!("CARGO_MANIFEST_DIR"), "/assets");
    let mut ctx = RenderContext::from_files(
        RenderConfig::default(),
        &obj_path,
        &dds_path,
        format!("{}/StandardShading.vertexshader", assets),
        format!("{}/StandardShading.fragmentshader", assets),
    )
    .unwrap();
    ctx.draw_frame(LIGHT);
    let view = flip_vertical(&ctx.read_pixels().unwrap());
    // v = 1 at the top of the quad samples the top rows of the picture
    let upper = view.get_pixel(256, 197 - 40);
    let lower = view.get_pixel(256, 197 + 40);
    assert!(upper[0] > upper[2], "{:?}", upper);
    assert!(lower[2] > lower[0], "{:?}", lower);
}
