#![no_main]
use libfuzzer_sys::fuzz_target;
use spectopic::io::table::parse_count_table;
use std::io::{BufReader, Cursor};

fuzz_target!(|data: &[u8]| {
    // Any byte stream must either parse or fail cleanly — never panic.
    let reader = BufReader::new(Cursor::new(data));
    let _ = parse_count_table(reader, "fuzz");
});
