use criterion::{Criterion, criterion_group, criterion_main};
use libc::{MAP_ANON, MAP_FAILED, MAP_PRIVATE, PROT_READ, PROT_WRITE};
use mmapper::{MapFlags, MappingRegistry, ProtFlags, mmap::DefaultProvider};

const LEN: usize = 4096;

fn map_unmap_benchmark(c: &mut Criterion) {
    let registry = MappingRegistry::new(DefaultProvider::new());
    c.bench_function("mmapper:map+unmap", |b| {
        b.iter(|| {
            let view = registry
                .map(
                    -1,
                    0,
                    LEN,
                    ProtFlags::PROT_READ | ProtFlags::PROT_WRITE,
                    MapFlags::MAP_PRIVATE | MapFlags::MAP_ANONYMOUS,
                )
                .unwrap();
            unsafe { registry.unmap(&view) }.unwrap();
        });
    });
    c.bench_function("libc:mmap+munmap", |b| {
        b.iter(|| unsafe {
            let ptr = libc::mmap(
                core::ptr::null_mut(),
                LEN,
                PROT_READ | PROT_WRITE,
                MAP_PRIVATE | MAP_ANON,
                -1,
                0,
            );
            assert!(ptr != MAP_FAILED);
            libc::munmap(ptr, LEN);
        })
    });
}

fn reject_benchmark(c: &mut Criterion) {
    let registry = MappingRegistry::new(DefaultProvider::new());
    let views: Vec<_> = (0..256)
        .map(|_| {
            registry
                .map(
                    -1,
                    0,
                    LEN,
                    ProtFlags::PROT_READ,
                    MapFlags::MAP_PRIVATE | MapFlags::MAP_ANONYMOUS,
                )
                .unwrap()
        })
        .collect();
    let head = unsafe { views[0].slice(..LEN - 1) };
    c.bench_function("mmapper:reject sub-view", |b| {
        b.iter(|| unsafe { registry.unmap(&head) }.unwrap_err())
    });
    c.bench_function("mmapper:contains", |b| {
        b.iter(|| registry.contains(&views[128]))
    });
    for view in &views {
        unsafe { registry.unmap(view) }.unwrap();
    }
}

criterion_group!(benches, map_unmap_benchmark, reject_benchmark);
criterion_main!(benches);
