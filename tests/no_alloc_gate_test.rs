use std::alloc::{GlobalAlloc, Layout, System};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use tui_estates::core::snapshot::SessionSnapshot;
use tui_estates::core::{detect, settle, CoordSet, Session, SimpleRng};
use tui_estates::types::{Coord, GravityDirection, UpgradeFlags, GRID_SIZE};

struct CountingAlloc;

static COUNT_ENABLED: AtomicBool = AtomicBool::new(false);
static ALLOC_COUNT: AtomicUsize = AtomicUsize::new(0);

#[global_allocator]
static GLOBAL: CountingAlloc = CountingAlloc;

unsafe impl GlobalAlloc for CountingAlloc {
    unsafe fn alloc(&self, layout: Layout) -> *mut u8 {
        if COUNT_ENABLED.load(Ordering::Relaxed) {
            let _ = layout;
            ALLOC_COUNT.fetch_add(1, Ordering::Relaxed);
        }
        System.alloc(layout)
    }

    unsafe fn dealloc(&self, ptr: *mut u8, layout: Layout) {
        System.dealloc(ptr, layout)
    }

    unsafe fn realloc(&self, ptr: *mut u8, layout: Layout, new_size: usize) -> *mut u8 {
        if COUNT_ENABLED.load(Ordering::Relaxed) {
            let _ = (layout, new_size);
            ALLOC_COUNT.fetch_add(1, Ordering::Relaxed);
        }
        System.realloc(ptr, layout, new_size)
    }
}

fn with_alloc_counting<F: FnOnce()>(f: F) -> usize {
    ALLOC_COUNT.store(0, Ordering::Relaxed);
    COUNT_ENABLED.store(true, Ordering::Relaxed);
    f();
    COUNT_ENABLED.store(false, Ordering::Relaxed);
    ALLOC_COUNT.load(Ordering::Relaxed)
}

#[test]
fn core_hot_paths_do_not_allocate() {
    // Setup (outside counting) so one-time allocations don't trip the gate.
    let session = Session::new(1, UpgradeFlags::default(), 12345).unwrap();
    let mut rng = SimpleRng::new(7);
    let mut snap = SessionSnapshot::default();

    let mut matched = CoordSet::new();
    for x in 0..GRID_SIZE {
        matched.insert(Coord::new(x, GRID_SIZE - 1));
    }

    // Warm-up.
    let _ = detect::detect(session.grid());
    session.snapshot_into(&mut snap);

    let allocs = with_alloc_counting(|| {
        // Match detection is allocation-free.
        for _ in 0..200 {
            let _ = detect::detect(session.grid());
        }

        // Settling, in every direction.
        for _ in 0..50 {
            for direction in GravityDirection::ALL {
                let mut grid = session.grid().clone();
                let _ = settle::settle(&mut grid, &matched, direction, &mut rng);
            }
        }

        // Snapshot capture fills a caller-owned buffer.
        for _ in 0..200 {
            session.snapshot_into(&mut snap);
        }
    });

    // The grid is a flat array, so even the clones stay off the heap.
    assert_eq!(allocs, 0);
}
