//! Generate synthetic labelled NIR scans for development and testing.
//!
//! Writes `scans/<substance>-<n>.csv` files in the canonical two-column
//! layout (wavelength, intensity), 161 samples over 900-1700 nm, with
//! per-substance Gaussian absorption features, a sloped baseline, and
//! additive noise.

use std::path::PathBuf;

use nirid::io::save_csv;
use nirid::spectrum::SpectrumBuffer;

fn gaussian(x: f64, mu: f64, sigma: f64, amplitude: f64) -> f64 {
    amplitude * (-(x - mu).powi(2) / (2.0 * sigma.powi(2))).exp()
}

fn generate_spectrum(
    wavelengths: &[f64],
    peaks: &[(f64, f64, f64)],
    noise_level: f64,
    rng: &mut SimpleRng,
) -> Vec<f64> {
    wavelengths
        .iter()
        .map(|&wl| {
            let baseline = 0.8 + 2e-4 * (wl - 900.0);
            let signal: f64 = peaks
                .iter()
                .map(|&(mu, sigma, amp)| gaussian(wl, mu, sigma, amp))
                .sum();
            baseline + signal + rng.gauss(0.0, noise_level)
        })
        .collect()
}

/// Minimal deterministic PRNG (xoshiro256**)
struct SimpleRng {
    state: [u64; 4],
}

impl SimpleRng {
    fn new(seed: u64) -> Self {
        let mut s = [0u64; 4];
        let mut x = seed;
        for slot in &mut s {
            x = x.wrapping_mul(6364136223846793005).wrapping_add(1);
            *slot = x;
        }
        SimpleRng { state: s }
    }

    fn next_u64(&mut self) -> u64 {
        let result = (self.state[1].wrapping_mul(5))
            .rotate_left(7)
            .wrapping_mul(9);
        let t = self.state[1] << 17;
        self.state[2] ^= self.state[0];
        self.state[3] ^= self.state[1];
        self.state[1] ^= self.state[2];
        self.state[0] ^= self.state[3];
        self.state[2] ^= t;
        self.state[3] = self.state[3].rotate_left(45);
        result
    }

    fn next_f64(&mut self) -> f64 {
        (self.next_u64() >> 11) as f64 / (1u64 << 53) as f64
    }

    /// Box-Muller transform for normal distribution
    fn gauss(&mut self, mean: f64, std_dev: f64) -> f64 {
        let u1 = self.next_f64().max(1e-15);
        let u2 = self.next_f64();
        let z = (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos();
        mean + std_dev * z
    }
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let mut rng = SimpleRng::new(42);

    // Wavelengths: 900 → 1700 nm, step 5 (161 samples).
    let wavelengths: Vec<f64> = (0..161).map(|i| 900.0 + i as f64 * 5.0).collect();

    // NIR overtone/combination bands roughly where the real substances
    // absorb: (center nm, width nm, amplitude).
    let substance_peaks: Vec<(&str, Vec<(f64, f64, f64)>)> = vec![
        ("msg", vec![(1180.0, 30.0, 0.35), (1500.0, 45.0, 0.55)]),
        ("salt", vec![(1440.0, 60.0, 0.25)]),
        ("sugar", vec![(1200.0, 35.0, 0.45), (1430.0, 40.0, 0.60), (1680.0, 25.0, 0.20)]),
    ];
    let scans_per_substance = 15;

    let out_dir = PathBuf::from("scans");
    std::fs::create_dir_all(&out_dir)?;

    let mut written = 0usize;
    for (name, peaks) in &substance_peaks {
        for n in 0..scans_per_substance {
            let ys = generate_spectrum(&wavelengths, peaks, 0.01, &mut rng);
            let buf = SpectrumBuffer::new(wavelengths.clone(), ys)?;
            let path = out_dir.join(format!("{name}-{n:02}.csv"));
            save_csv(&path, &buf)?;
            written += 1;
        }
        log::info!("generated {scans_per_substance} scans for '{name}'");
    }

    println!(
        "Wrote {written} scans ({} samples each) to {}",
        wavelengths.len(),
        out_dir.display()
    );
    Ok(())
}
