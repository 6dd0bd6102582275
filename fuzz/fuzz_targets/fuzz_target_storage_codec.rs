#![no_main]
use keyshelf::shelf::ports::StorageCodec;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    // Decoder must not panic on arbitrary inputs
    let codec = keyshelf::shelf::codec::JsonDocumentCodec;
    if let Ok(records) = codec.decode(data) {
        let _ = codec.encode(data, &records);
    }
});
