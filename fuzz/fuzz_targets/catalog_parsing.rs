#![no_main]
use libfuzzer_sys::fuzz_target;
use tenant_modules::module::lifecycle::{LifecyclePlanner, TenantModules};
use tenant_modules::module::registry::{ModuleCatalog, ModuleDependencies, ModuleRegistry};

fuzz_target!(|data: &[u8]| {
    let Ok(text) = std::str::from_utf8(data) else {
        return;
    };

    // Malformed catalogs must fail with an error, never panic
    let Ok(catalog) = ModuleCatalog::from_toml_str(text) else {
        return;
    };

    // Any accepted catalog, cyclic or not, must validate and resolve in finite time
    let _ = ModuleDependencies::new(&catalog).validate();
    let registry = ModuleRegistry::new(std::sync::Arc::new(catalog));
    let planner = LifecyclePlanner::new(&registry);
    let keys: Vec<String> = registry.all_modules().iter().map(|m| m.key.clone()).collect();
    let mut tenant = TenantModules::new("fuzz");
    planner.install(&mut tenant, &keys);
    planner.uninstall(&mut tenant, &keys);
});
