#![no_main]

use libfuzzer_sys::fuzz_target;

use dimspec::plot::{render_spectra_svg, PlotOptions};
use dimspec::spectrum::{
    normalize, IntensityStatistics, LabeledSpectrum, NormalizationMethod, Peak, Spectrum,
};

fuzz_target!(|data: &[u8]| {
    // Every 16 bytes become one (m/z, intensity) pair, NaN and infinities included
    let peaks: Vec<Peak> = data
        .chunks_exact(16)
        .map(|chunk| {
            let mut mz = [0u8; 8];
            let mut intensity = [0u8; 8];
            mz.copy_from_slice(&chunk[..8]);
            intensity.copy_from_slice(&chunk[8..]);
            Peak::new(f64::from_le_bytes(mz), f64::from_le_bytes(intensity))
        })
        .collect();
    let spectrum = Spectrum::new(1, peaks);

    let _ = IntensityStatistics::of_spectrum(&spectrum);
    let traces: Vec<LabeledSpectrum> = NormalizationMethod::ALL
        .iter()
        .map(|&method| LabeledSpectrum::new(method.as_str(), normalize(&spectrum, method)))
        .collect();
    let svg = render_spectra_svg(&traces, &PlotOptions::default());
    assert!(svg.contains("<svg"));
});
