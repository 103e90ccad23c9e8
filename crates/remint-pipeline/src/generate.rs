//! The generation orchestrator.

use crate::decode;
use crate::encode::OutputFormat;
use crate::events::{GenerationObserver, NoopObserver};
use crate::guard::{UniquenessGuard, VersionOutcome};
use crate::hash::{HashRegistry, md5_hex};
use crate::plan::PlanSelector;
use crate::transform::Catalog;
use crate::types::{GenerationConfig, GenerationReport, PipelineError};

/// Produces hash-distinct variants of one source image per run.
///
/// A generator holds configuration and a transform catalog, both
/// read-only. Every call to [`run`](Self::run) builds its own hash
/// registry and plan selector, so runs are independent of each other.
#[derive(Debug, Default)]
pub struct Generator {
    config: GenerationConfig,
    catalog: Catalog,
}

impl Generator {
    /// A generator using the standard transform catalog.
    #[must_use]
    pub fn new(config: GenerationConfig) -> Self {
        Self::with_catalog(config, Catalog::standard())
    }

    /// A generator using a custom catalog.
    #[must_use]
    pub const fn with_catalog(config: GenerationConfig, catalog: Catalog) -> Self {
        Self { config, catalog }
    }

    /// Generate `num_versions` variants of `source_bytes`.
    ///
    /// `format_hint` picks the output format: a file name, a dotted
    /// extension, or a bare extension; empty means JPEG.
    ///
    /// # Errors
    ///
    /// See [`run_with_observer`](Self::run_with_observer).
    pub fn run(
        &self,
        source_bytes: &[u8],
        format_hint: &str,
        num_versions: usize,
    ) -> Result<GenerationReport, PipelineError> {
        self.run_with_observer(source_bytes, format_hint, num_versions, &mut NoopObserver)
    }

    /// Generate variants, reporting progress to `observer`.
    ///
    /// Versions are produced sequentially in index order. A version that
    /// cannot be produced within the attempt budget is recorded in
    /// [`GenerationReport::failures`] and the run moves on; the report
    /// may therefore hold fewer versions than requested.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::InvalidConfig`] if the configuration is
    /// invalid, `num_versions` is zero, or the catalog is empty.
    /// Returns [`PipelineError::EmptyInput`] or
    /// [`PipelineError::ImageDecode`] if the source cannot be decoded.
    /// No other error aborts a run.
    #[tracing::instrument(skip_all, fields(bytes = source_bytes.len(), num_versions = num_versions))]
    pub fn run_with_observer<O: GenerationObserver + ?Sized>(
        &self,
        source_bytes: &[u8],
        format_hint: &str,
        num_versions: usize,
        observer: &mut O,
    ) -> Result<GenerationReport, PipelineError> {
        self.config.validate()?;
        if num_versions == 0 {
            return Err(PipelineError::InvalidConfig(
                "number of versions must be at least 1".to_string(),
            ));
        }
        if self.catalog.is_empty() {
            return Err(PipelineError::InvalidConfig(
                "transform catalog is empty".to_string(),
            ));
        }

        let source = decode::decode_rgb(source_bytes)?;
        let format = OutputFormat::from_hint(format_hint);
        let seed = self.config.seed.unwrap_or_else(rand::random);
        tracing::info!(
            width = source.dimensions().width,
            height = source.dimensions().height,
            %format,
            seed,
            "generating variants",
        );

        let mut selector = PlanSelector::new(&self.catalog, seed);
        let mut guard = UniquenessGuard::new(HashRegistry::new(source.hash()), &self.config);
        let mut versions = Vec::with_capacity(num_versions);
        let mut failures = Vec::new();

        for index in 1..=num_versions {
            match guard.produce(index, source.pixels(), &format, &mut selector, observer) {
                VersionOutcome::Accepted(version) => versions.push(version),
                VersionOutcome::Failed(failure) => failures.push(failure),
            }
        }

        let report = GenerationReport {
            source_hash: source.hash(),
            source_md5: md5_hex(source_bytes),
            dimensions: source.dimensions(),
            requested: num_versions,
            versions,
            failures,
            distinct_hashes: guard.into_registry().len(),
            seed,
        };
        tracing::info!(
            verified = report.verified_count(),
            degraded = report.degraded_count(),
            failed = report.failures.len(),
            "generation finished",
        );
        Ok(report)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::events::GenerationEvent;

    fn png_bytes(width: u32, height: u32) -> Vec<u8> {
        let img = image::RgbImage::from_fn(width, height, |x, y| {
            image::Rgb([
                u8::try_from(x % 256).unwrap(),
                u8::try_from(y % 256).unwrap(),
                100,
            ])
        });
        let mut buf = Vec::new();
        let encoder = image::codecs::png::PngEncoder::new(&mut buf);
        image::ImageEncoder::write_image(
            encoder,
            img.as_raw(),
            width,
            height,
            image::ExtendedColorType::Rgb8,
        )
        .unwrap();
        buf
    }

    fn seeded(seed: u64) -> Generator {
        Generator::new(GenerationConfig {
            seed: Some(seed),
            ..GenerationConfig::default()
        })
    }

    #[test]
    fn zero_versions_is_invalid_config() {
        let err = seeded(1).run(&png_bytes(8, 8), "a.png", 0).unwrap_err();
        assert!(matches!(err, PipelineError::InvalidConfig(_)));
    }

    #[test]
    fn empty_catalog_is_invalid_config() {
        let generator = Generator::with_catalog(GenerationConfig::default(), Catalog::new(Vec::new()));
        let err = generator.run(&png_bytes(8, 8), "a.png", 1).unwrap_err();
        assert!(matches!(err, PipelineError::InvalidConfig(_)));
    }

    #[test]
    fn invalid_config_is_checked_before_decoding() {
        let generator = Generator::new(GenerationConfig {
            max_attempts: 0,
            ..GenerationConfig::default()
        });
        let err = generator.run(&[], "a.png", 1).unwrap_err();
        assert!(matches!(err, PipelineError::InvalidConfig(_)));
    }

    #[test]
    fn empty_input_aborts() {
        let err = seeded(1).run(&[], "a.png", 2).unwrap_err();
        assert!(matches!(err, PipelineError::EmptyInput));
    }

    #[test]
    fn report_accounts_for_every_version() {
        let report = seeded(3).run(&png_bytes(32, 24), "a.png", 4).unwrap();
        assert_eq!(report.requested, 4);
        assert_eq!(report.versions.len() + report.failures.len(), 4);
        assert_eq!(report.seed, 3);
        let indices: Vec<usize> = report.versions.iter().map(|v| v.index).collect();
        assert_eq!(indices, vec![1, 2, 3, 4]);
    }

    #[test]
    fn resolved_seed_reproduces_run() {
        let source = png_bytes(20, 20);
        let first = Generator::default().run(&source, "x.png", 2).unwrap();
        let again = seeded(first.seed).run(&source, "x.png", 2).unwrap();
        let a: Vec<_> = first.versions.iter().map(|v| v.hash).collect();
        let b: Vec<_> = again.versions.iter().map(|v| v.hash).collect();
        assert_eq!(a, b);
    }

    #[test]
    fn observer_sees_one_terminal_event_per_version() {
        let mut terminal = Vec::new();
        let mut observer = |e: &GenerationEvent| {
            if e.is_terminal() {
                terminal.push(e.index());
            }
        };
        seeded(9)
            .run_with_observer(&png_bytes(16, 16), ".png", 3, &mut observer)
            .unwrap();
        assert_eq!(terminal, vec![1, 2, 3]);
    }
}
