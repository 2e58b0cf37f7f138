#![no_main]

use libfuzzer_sys::fuzz_target;
use taskdump::loader::DumpLoader;
use taskdump::predicate::Predicate;

const DUMP: &str = "goroutine 3 [select, 7 minutes]:\nmain.loop(0xc000010000)\n\t/app/main.go:12 +0x40\n";

fuzz_target!(|data: &[u8]| {
    if let Ok(input) = std::str::from_utf8(data) {
        // Compiling and evaluating must never panic, only return errors
        if let Ok(predicate) = Predicate::compile_builtin(input) {
            if let Ok(dump) = DumpLoader::default().load_str(DUMP) {
                let _ = dump.evaluate(&predicate);
            }
        }
    }
});
