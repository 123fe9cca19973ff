//! Study orchestration: acquire, derive, sample, fit, persist

use chrono::Utc;
use glacis_algorithms::sampling::{candidates, region_mask, sample_stack, SampleParams};
use glacis_cloud::ImageryProvider;
use tracing::{error, info, warn};

use crate::config::StudyConfig;
use crate::error::{PipelineError, Result, Stage};
use crate::modality::{build_study, Modality};
use crate::modeling::{fit_supervised, fit_unsupervised};
use crate::persist;
use crate::report::{ModelSummary, RunReport, SampleCounts};

/// Run one study end to end and write its outputs.
///
/// Nothing is written unless every stage before persistence succeeds.
pub fn run_study(modality: Modality, provider: &dyn ImageryProvider, config: &StudyConfig) -> Result<RunReport> {
    config.validate()?;
    let settings = config.modality(modality);
    info!(%modality, region = %config.region.name, provider = provider.name(), seed = config.seed, "starting study");

    let data = build_study(modality, provider, config)?;
    let stack = &data.stack;

    let pool = candidates(stack, &config.region).len();
    let params = SampleParams {
        cap: settings.samples,
        strategy: settings.sampling,
        seed: config.seed,
    };
    let table = sample_stack(stack, &config.region, &params)
        .map_err(|e| PipelineError::at(modality, Stage::Sampling, e))?;
    if table.len() < settings.samples {
        warn!(
            %modality,
            requested = settings.samples,
            drawn = table.len(),
            "fewer valid pixels than the sample cap"
        );
    } else {
        info!(%modality, drawn = table.len(), candidates = pool, "sampled");
    }

    let fit = match &data.label {
        Some(label) => fit_supervised(modality, &table, label, settings.classes, config.test_fraction, config.seed)?,
        None => fit_unsupervised(modality, &table, settings.classes, config.seed)?,
    };

    let mask = region_mask(stack, &config.region);
    let landcover = fit
        .artifact
        .classify_stack(stack, Some(&mask))
        .map_err(|e| PipelineError::at(modality, Stage::Modeling, e))?;

    let dir = config.study_dir(modality);
    let outputs = persist::output_paths(&dir);
    let report = RunReport {
        modality,
        region: config.region.clone(),
        seed: config.seed,
        provider: provider.name().to_string(),
        generated_at: Utc::now(),
        scenes: data.scenes.clone(),
        features: stack.feature_names(),
        auxiliary: stack.auxiliary_names(),
        samples: SampleCounts {
            requested: settings.samples,
            drawn: table.len(),
            candidates: pool,
        },
        model: fit.summary,
        config: settings.clone(),
        outputs: outputs.clone(),
    };

    let persisted = (|| -> Result<()> {
        persist::write_artifact(&fit.artifact, &outputs.model)?;
        persist::write_samples(&table, &fit.classes, &outputs.samples)?;
        persist::write_summary_csv(&report.model, &report.features, &outputs.summary)?;
        persist::write_landcover(&landcover, &outputs.landcover)?;
        persist::write_report(&report, &outputs.report)
    })();
    persisted.map_err(|e| PipelineError::at(modality, Stage::Persistence, e))?;

    match &report.model {
        ModelSummary::Supervised { selected, .. } => info!(
            %modality,
            selected = %selected,
            accuracy = report.model.selected_accuracy().unwrap_or(f64::NAN),
            dir = %dir.display(),
            "study complete"
        ),
        ModelSummary::Unsupervised { k, inertia, .. } => info!(
            %modality,
            k,
            inertia,
            dir = %dir.display(),
            "study complete"
        ),
    }
    Ok(report)
}

/// Run every study in turn. A failed study is logged and does not stop the
/// others.
pub fn run_all(provider: &dyn ImageryProvider, config: &StudyConfig) -> Vec<(Modality, Result<RunReport>)> {
    Modality::ALL
        .into_iter()
        .map(|modality| {
            let outcome = run_study(modality, provider, config);
            if let Err(e) = &outcome {
                error!(%modality, "study failed: {e}");
            }
            (modality, outcome)
        })
        .collect()
}
