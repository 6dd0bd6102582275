#![no_main]
use keyshelf::shelf::fields::ImportForm;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(value) = serde_json::from_slice::<serde_json::Value>(data) else {
        return;
    };
    if let Ok(form) = ImportForm::from_json(&value) {
        let _ = form.assemble();
    }
});
