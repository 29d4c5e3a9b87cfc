#![no_main]

use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &str| {
    // Token notation and node paths from arbitrary strings
    let _ = arbor::utils::parse_tagged(data);
    let _ = arbor::utils::parse_path(data);
});
