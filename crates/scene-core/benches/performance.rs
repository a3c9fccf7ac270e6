use criterion::{BatchSize, Criterion, black_box, criterion_group, criterion_main};
use rand::{Rng, SeedableRng, rngs::StdRng};
use scene_core::{
    CommandBus, CommandPayload, GridDims, HandlerOutcome, History, LayerKind, SceneState,
    ViewportGeometry, ZoomOptions, ZoomRect, compute_zoom_to_rect,
};

const GRID_ROWS: usize = 256;
const GRID_COLS: usize = 256;

/// Scene with one densely painted tilemap layer, deterministic across runs.
fn painted_scene() -> (SceneState, String) {
    let mut scene = SceneState::new(GRID_ROWS, GRID_COLS);
    let layer_id = scene.add_layer("Terrain", LayerKind::Tilemap);
    let mut rng = StdRng::seed_from_u64(0x5ce9e);
    let grid = scene
        .tile_grids
        .get_mut(&layer_id)
        .expect("tilemap layer has a grid");
    for row in 0..GRID_ROWS {
        for col in 0..GRID_COLS {
            if rng.gen_bool(0.7) {
                let color = format!("#{:06x}", rng.gen_range(0u32..0x1_000_000));
                grid.set(row, col, Some(color));
            }
        }
    }
    (scene, layer_id)
}

fn bench_snapshot_capture(c: &mut Criterion) {
    let (scene, layer_id) = painted_scene();
    c.bench_function("snapshot_capture/256x256_tilemap", |b| {
        b.iter(|| {
            let entry = scene.snapshot_tilemap(black_box(&layer_id));
            black_box(entry);
        })
    });
}

fn bench_undo_redo_sweep(c: &mut Criterion) {
    let (scene, layer_id) = painted_scene();
    c.bench_function("undo_redo_sweep/100_snapshots", |b| {
        b.iter_batched(
            || {
                let mut scene = scene.clone();
                let mut history = History::new();
                for i in 0..100 {
                    let entry = scene
                        .snapshot_tilemap(&layer_id)
                        .expect("layer exists");
                    history.push(entry);
                    let grid = scene.tile_grids.get_mut(&layer_id).expect("layer exists");
                    grid.set(i % GRID_ROWS, i % GRID_COLS, Some("#ff8800".to_string()));
                }
                (scene, history)
            },
            |(mut scene, mut history)| {
                while history.undo(&mut scene).expect("undo applies") {}
                while history.redo(&mut scene).expect("redo applies") {}
                black_box(history.undo_depth());
            },
            BatchSize::LargeInput,
        )
    });
}

fn bench_command_dispatch(c: &mut Criterion) {
    c.bench_function("command_dispatch/1k_executes", |b| {
        b.iter_batched(
            || {
                let mut bus = CommandBus::new();
                bus.register(scene_core::CommandKind::SetGridSize, |_payload| {
                    Some(HandlerOutcome::new(|| Ok(()), || Ok(())))
                });
                bus
            },
            |mut bus| {
                for i in 0..1_000u32 {
                    let executed = bus
                        .execute(CommandPayload::SetGridSize {
                            rows: 16 + (i as usize % 64),
                            cols: 16,
                            anchor: None,
                        })
                        .expect("payload is valid");
                    black_box(executed);
                }
                black_box(bus.history().undo_depth());
            },
            BatchSize::LargeInput,
        )
    });
}

fn bench_zoom_to_rect(c: &mut Criterion) {
    let geometry = ViewportGeometry {
        container_width: 1920.0,
        container_height: 1080.0,
        chrome_inset: 48.0,
        scroll_left: 512.0,
        scroll_top: 256.0,
    };
    let grid = GridDims {
        rows: GRID_ROWS,
        cols: GRID_COLS,
    };
    c.bench_function("zoom_to_rect/single_solve", |b| {
        b.iter(|| {
            let target = compute_zoom_to_rect(
                black_box(&ZoomRect {
                    left: 900.0,
                    top: 700.0,
                    width: 220.0,
                    height: 180.0,
                }),
                &geometry,
                grid,
                32,
                ZoomOptions { allow_zoom_out: false },
            );
            black_box(target);
        })
    });
}

criterion_group!(
    benches,
    bench_snapshot_capture,
    bench_undo_redo_sweep,
    bench_command_dispatch,
    bench_zoom_to_rect
);
criterion_main!(benches);
