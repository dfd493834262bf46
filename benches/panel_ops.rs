//! Benchmarks for panel manager hot paths
//!
//! - open/close cycles on cached panels
//! - preload churn with LRU eviction
//! - level re-sorting as panels reopen
//! - hotness decay over many cached panels
//!
//! Run with: cargo bench panel_ops

use std::time::Duration;

use panelkit::headless::{HeadlessHost, Journal, MemoryLoader, RecordingPanel};
use panelkit::{OpenRequest, PanelConfig, PanelManager, PanelRegistry};

#[global_allocator]
static ALLOC: divan::AllocProfiler = divan::AllocProfiler::system();

fn main() {
    divan::main();
}

type BenchManager = PanelManager<HeadlessHost, MemoryLoader>;

fn make_manager(panels: usize, capacity: usize) -> BenchManager {
    let journal = Journal::new();
    let mut registry = PanelRegistry::new();
    for i in 0..panels {
        registry.register(RecordingPanel::descriptor(&format!("panel{}", i), &journal));
    }
    let config = PanelConfig {
        cache_capacity: capacity,
        decay_interval_secs: 1.0,
        ..PanelConfig::default()
    };
    PanelManager::create(config, registry, HeadlessHost::new(), MemoryLoader::new())
}

// ============================================================================
// Open / close
// ============================================================================

#[divan::bench(args = [1, 10, 100])]
fn open_close_cached(bencher: divan::Bencher, panels: usize) {
    bencher
        .with_inputs(|| {
            let mut manager = make_manager(panels, 8);
            for i in 0..panels {
                let _ = manager.open(format!("panel{}", i), OpenRequest::new());
                let _ = manager.close_key(&format!("panel{}", i).into());
            }
            manager
        })
        .bench_local_refs(|manager| {
            for i in 0..panels {
                let key = format!("panel{}", i);
                let _ = manager.open(key.as_str(), OpenRequest::new());
                let _ = manager.close_key(&key.into());
            }
        });
}

#[divan::bench(args = [10, 100])]
fn reopen_resorts_level(bencher: divan::Bencher, panels: usize) {
    bencher
        .with_inputs(|| {
            let mut manager = make_manager(panels, 8);
            for i in 0..panels {
                let _ = manager.open(format!("panel{}", i), OpenRequest::new().sub_level(i as i32 % 3));
            }
            manager
        })
        .bench_local_refs(|manager| {
            let _ = manager.open("panel0", OpenRequest::new());
            divan::black_box(manager.panels_on(0).len());
        });
}

// ============================================================================
// Preload
// ============================================================================

#[divan::bench(args = [4, 16, 64])]
fn preload_with_eviction(bencher: divan::Bencher, capacity: usize) {
    let panels = capacity * 4;
    bencher
        .with_inputs(|| make_manager(panels, capacity))
        .bench_local_values(|mut manager| {
            for i in 0..panels {
                let _ = manager.preload(format!("panel{}", i), None);
            }
            divan::black_box(manager.cache().preloaded_len());
            manager
        });
}

// ============================================================================
// Decay
// ============================================================================

#[divan::bench(args = [10, 100, 1000])]
fn decay_cached_panels(bencher: divan::Bencher, panels: usize) {
    bencher
        .with_inputs(|| {
            let mut manager = make_manager(panels, 8);
            for i in 0..panels {
                let _ = manager.open(format!("panel{}", i), OpenRequest::new());
            }
            manager
        })
        .bench_local_refs(|manager| {
            divan::black_box(manager.decay_hotness(Duration::from_secs(1)));
        });
}
