//! Sources of desired node degrees for topology generation.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use color_eyre::eyre::{eyre, Result, WrapErr};
use rand::{Rng, RngCore};

/// Yields the desired degree for each generated node in turn.
pub trait DegreeSource {
    fn next_degree(&mut self, rng: &mut dyn RngCore) -> u32;
}

/// Every node wants the same degree.
#[derive(Debug, Clone, Copy)]
pub struct FixedDegreeSource {
    degree: u32,
}

impl FixedDegreeSource {
    pub fn new(degree: u32) -> Self {
        FixedDegreeSource { degree }
    }
}

impl DegreeSource for FixedDegreeSource {
    fn next_degree(&mut self, _rng: &mut dyn RngCore) -> u32 {
        self.degree
    }
}

/// Degrees drawn from a Poisson distribution with the given mean,
/// sampled by Knuth's product-of-uniforms method.
#[derive(Debug, Clone, Copy)]
pub struct PoissonDegreeSource {
    mean: f64,
}

impl PoissonDegreeSource {
    pub fn new(mean: f64) -> Self {
        assert!(mean > 0.0, "Poisson mean must be positive");
        PoissonDegreeSource { mean }
    }
}

impl DegreeSource for PoissonDegreeSource {
    fn next_degree(&mut self, rng: &mut dyn RngCore) -> u32 {
        let limit = (-self.mean).exp();
        let mut k = 0u32;
        let mut product = 1.0;
        loop {
            k += 1;
            product *= rng.gen::<f64>();
            if product <= limit {
                break;
            }
        }
        k - 1
    }
}

/// Degrees sampled from an observed distribution file. Each line is
/// `<degree> <occurrences>`; sampling weight is proportional to the
/// occurrence count.
#[derive(Debug, Clone)]
pub struct ConformingDegreeSource {
    occurrences: Vec<u32>,
}

impl ConformingDegreeSource {
    pub fn from_path(path: &Path) -> Result<Self> {
        let file = File::open(path)
            .wrap_err_with(|| format!("opening degree distribution {}", path.display()))?;
        let mut occurrences = Vec::new();
        for (number, line) in BufReader::new(file).lines().enumerate() {
            let line = line.wrap_err("reading degree distribution")?;
            if line.trim().is_empty() {
                continue;
            }
            let mut fields = line.split_whitespace();
            let degree: u32 = fields
                .next()
                .ok_or_else(|| eyre!("line {}: missing degree", number + 1))?
                .parse()
                .wrap_err_with(|| format!("line {}: bad degree", number + 1))?;
            let count: u32 = fields
                .next()
                .ok_or_else(|| eyre!("line {}: missing occurrence count", number + 1))?
                .parse()
                .wrap_err_with(|| format!("line {}: bad occurrence count", number + 1))?;
            for _ in 0..count {
                occurrences.push(degree);
            }
        }
        if occurrences.is_empty() {
            return Err(eyre!(
                "degree distribution {} contains no entries",
                path.display()
            ));
        }
        Ok(ConformingDegreeSource { occurrences })
    }
}

impl DegreeSource for ConformingDegreeSource {
    fn next_degree(&mut self, rng: &mut dyn RngCore) -> u32 {
        self.occurrences[rng.gen_range(0..self.occurrences.len())]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::io::Write;

    #[test]
    fn fixed_source_is_constant() {
        let mut rng = StdRng::seed_from_u64(1);
        let mut source = FixedDegreeSource::new(6);
        for _ in 0..10 {
            assert_eq!(source.next_degree(&mut rng), 6);
        }
    }

    #[test]
    fn poisson_mean_is_close() {
        let mut rng = StdRng::seed_from_u64(42);
        let mut source = PoissonDegreeSource::new(8.0);
        let samples = 20_000;
        let total: u64 = (0..samples)
            .map(|_| source.next_degree(&mut rng) as u64)
            .sum();
        let mean = total as f64 / samples as f64;
        assert!((mean - 8.0).abs() < 0.2, "sample mean {}", mean);
    }

    #[test]
    fn conforming_source_respects_weights() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "3 1").unwrap();
        writeln!(file, "5 3").unwrap();
        let mut source = ConformingDegreeSource::from_path(file.path()).unwrap();
        let mut rng = StdRng::seed_from_u64(7);
        let mut fives = 0;
        for _ in 0..4000 {
            match source.next_degree(&mut rng) {
                3 => {}
                5 => fives += 1,
                other => panic!("unexpected degree {}", other),
            }
        }
        // Weighted 3:1 toward degree 5.
        assert!(fives > 2700 && fives < 3300, "fives {}", fives);
    }

    #[test]
    fn conforming_source_rejects_garbage() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "not a degree").unwrap();
        assert!(ConformingDegreeSource::from_path(file.path()).is_err());
    }
}
