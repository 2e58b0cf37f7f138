#![no_main]

use libfuzzer_sys::fuzz_target;
use taskdump::loader::DumpLoader;

fuzz_target!(|data: &[u8]| {
    let text = String::from_utf8_lossy(data);
    if let Ok(mut dump) = DumpLoader::default().load_str(&text) {
        dump.dedupe();
        let _ = dump.summary().to_string();
    }
});
