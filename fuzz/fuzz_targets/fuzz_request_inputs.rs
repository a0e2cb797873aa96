#![no_main]

use libfuzzer_sys::fuzz_target;

use dimspec::config::Config;
use dimspec::export::{export_filename, ExportFormat};
use dimspec::spectrum::NormalizationMethod;

fuzz_target!(|data: &[u8]| {
    let Ok(text) = std::str::from_utf8(data) else {
        return;
    };

    // Config files and query parameters must fail with an error, never a panic
    let _ = Config::from_str(text);
    let _ = text.parse::<NormalizationMethod>();
    let _ = text.parse::<ExportFormat>();

    let (table, term) = text.split_once('\n').unwrap_or((text, ""));
    for format in [ExportFormat::Csv, ExportFormat::Xlsx] {
        let name = export_filename(table, Some(term), format);
        assert!(name.is_ascii());
        assert!(!name.contains(['"', '/', '\\']));
    }
});
