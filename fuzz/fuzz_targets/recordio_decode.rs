#![no_main]

use libfuzzer_sys::fuzz_target;
use mesos_driver::{encode_record, RecordIoDecoder};

const MAX_RECORD_BYTES: usize = 64 * 1024;

fuzz_target!(|data: &[u8]| {
    // First byte picks the chunk size so framing is exercised across splits.
    let Some((&split, stream)) = data.split_first() else {
        return;
    };
    let chunk_size = usize::from(split).max(1);

    let mut decoder = RecordIoDecoder::new(MAX_RECORD_BYTES);
    let mut records = Vec::new();
    for chunk in stream.chunks(chunk_size) {
        match decoder.decode(chunk) {
            Ok(decoded) => records.extend(decoded),
            Err(_) => return,
        }
    }

    // Re-framing decoded records must reproduce them exactly.
    let reframed: Vec<u8> = records
        .iter()
        .flat_map(|record| encode_record(record))
        .collect();
    let mut again = RecordIoDecoder::new(MAX_RECORD_BYTES);
    let decoded = again.decode(&reframed).expect("re-encoded stream is valid");
    assert_eq!(decoded, records);
    assert!(again.finish().is_ok());
    for record in &records {
        assert!(record.len() <= MAX_RECORD_BYTES);
    }
});
