//! Headless tiles — load a generated atlas, lay out a level, and print what
//! reached the (recording) GPU.

use std::rc::Rc;

use mosaik::prelude::*;

const SHEET: &str = r#"{
    "grass": { "minTex": { "x": 0.0, "y": 0.0 }, "maxTex": { "x": 0.5, "y": 0.5 } },
    "water": { "minTex": { "x": 0.5, "y": 0.0 }, "maxTex": { "x": 1.0, "y": 0.5 } },
    "stone": { "minTex": { "x": 0.0, "y": 0.5 }, "maxTex": { "x": 0.5, "y": 1.0 } }
}"#;

fn main() {
    init_logging(LoggingConfig {
        env_filter: Some("info".into()),
        ..Default::default()
    });

    let mut source = MemoryAssetSource::new();
    source
        .insert_image("forest.png", DecodedImage::solid(64, 64, [40, 120, 40, 255]))
        .insert_file("forest.json", SHEET);

    let bus = Rc::new(NotificationBus::new());
    bus.subscribe(NotificationKind::TileSheetLoaded, |n| println!("{n:?}"));

    let mut device = HeadlessDevice::new();
    let mut manager = TileManager::default().with_notifications(bus.clone());

    if let Err(e) = pollster::block_on(manager.load_texture(&source, &mut device, "forest")) {
        eprintln!("could not load tile sheet: {e}");
        return;
    }

    // A 20x15 meadow with a river down the middle and a stone gate.
    let mut level: Vec<TileDescriptor> = (0..20 * 15)
        .map(|i| {
            let (col, row) = (i % 20, i / 20);
            let image = if col == 9 || col == 10 { "water" } else { "grass" };
            TileDescriptor::new(
                image,
                Vec2::new(col as f32 * 32.0, row as f32 * 32.0),
                Vec2::splat(32.0),
            )
        })
        .collect();
    level.extend(
        TileDescriptor::list_from_json(
            r#"[{ "id": "gate", "image": "stone",
                  "pos": { "x": 288, "y": 224 }, "size": { "x": 64, "y": 32 } }]"#,
        )
        .unwrap_or_default(),
    );

    let created = manager.create_tiles(&level);
    println!("created {} of {} tiles", created.len(), level.len());

    for frame in 0..3 {
        manager.update(&mut device, 1.0 / 60.0);
        manager.draw(&mut device);
        let stats = device.stats();
        println!(
            "frame {frame}: {} uploads, {} bytes, {} draw calls",
            stats.uploads(),
            stats.bytes_uploaded,
            stats.draw_calls
        );
        device.reset_stats();
    }

    manager.dispose();
    manager.dispose_resources(&mut device);
    println!("live buffers after dispose: {}", device.live_buffers());
}
