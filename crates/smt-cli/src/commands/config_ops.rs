use std::path::Path;

use super::die;
use crate::loaders::load_config;

pub fn config_export() {
    print!("{}", smt_core::settings::default_toml());
}

pub fn config_check(file: &Path) {
    let config = die!(load_config(Some(file)), "Error: {}");
    let search = &config.search;
    println!(
        "OK: stack_size={}, cube_pruning={}, distortion.limit={}, features={}",
        search.stack_size,
        search.cube_pruning,
        config.distortion.limit,
        config.features.len()
    );
}
