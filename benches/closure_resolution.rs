use criterion::{black_box, criterion_group, criterion_main, Criterion};
use std::sync::Arc;
use tenant_modules::module::lifecycle::{LifecyclePlanner, TenantModules};
use tenant_modules::module::registry::{
    ModuleCatalog, ModuleDependencies, ModuleRegistry, RawModuleDescriptor,
};

/// Layered catalog: every module depends on up to three modules of the layer below
fn create_layered_catalog(layers: usize, width: usize) -> ModuleCatalog {
    let mut raw = Vec::with_capacity(layers * width);
    for layer in 0..layers {
        for i in 0..width {
            let dependencies = if layer == 0 {
                Vec::new()
            } else {
                (0..3)
                    .map(|k| format!("l{}m{}", layer - 1, (i + k) % width))
                    .collect()
            };
            raw.push(RawModuleDescriptor {
                key: Some(format!("l{}m{}", layer, i)),
                version: "1.0.0".to_string(),
                dependencies,
                suite: Some(format!("suite{}", i % 8)),
                ..Default::default()
            });
        }
    }
    ModuleCatalog::from_raw(raw).unwrap()
}

fn benchmark_closure_resolution(c: &mut Criterion) {
    let registry = ModuleRegistry::new(Arc::new(create_layered_catalog(20, 50)));
    let planner = LifecyclePlanner::new(&registry);

    c.bench_function("closure_resolution_deep", |b| {
        b.iter(|| black_box(planner.resolve_closure(black_box("l19m0"))))
    });
}

fn benchmark_install_suite(c: &mut Criterion) {
    let registry = ModuleRegistry::new(Arc::new(create_layered_catalog(20, 50)));
    let planner = LifecyclePlanner::new(&registry);

    c.bench_function("install_suite_fresh_tenant", |b| {
        b.iter(|| {
            let mut tenant = TenantModules::new("org");
            black_box(planner.install_suite(&mut tenant, black_box("suite3")))
        })
    });
}

fn benchmark_uninstall_batch(c: &mut Criterion) {
    let registry = ModuleRegistry::new(Arc::new(create_layered_catalog(10, 50)));
    let planner = LifecyclePlanner::new(&registry);
    let all: Vec<String> = registry.all_modules().iter().map(|m| m.key.clone()).collect();
    let mut installed = TenantModules::new("org");
    planner.install(&mut installed, &all);
    let bottom: Vec<String> = (0..50).map(|i| format!("l0m{}", i)).collect();

    c.bench_function("uninstall_blocked_layer", |b| {
        b.iter(|| {
            let mut tenant = installed.clone();
            black_box(planner.uninstall(&mut tenant, black_box(&bottom)))
        })
    });
}

fn benchmark_graph_validation(c: &mut Criterion) {
    let catalog = create_layered_catalog(20, 50);

    c.bench_function("graph_validation", |b| {
        b.iter(|| black_box(ModuleDependencies::new(black_box(&catalog)).validate()))
    });
}

criterion_group!(
    benches,
    benchmark_closure_resolution,
    benchmark_install_suite,
    benchmark_uninstall_batch,
    benchmark_graph_validation
);
criterion_main!(benches);
