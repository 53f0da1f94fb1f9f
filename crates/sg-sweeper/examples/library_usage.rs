use sg_sweeper::*;
use sg_types::*;

/// Optimizers paired with the learning rates worth trying for each.
fn optimizer() -> anyhow::Result<Vec<OverrideSet>> {
    let mut sweep = Vec::new();
    for (name, rates) in [("sgd", &[0.1, 0.01][..]), ("adam", &[0.001][..])] {
        for lr in rates {
            sweep.push(OverrideSet::from_pairs([
                ("optimizer", name.to_string()),
                ("optimizer.lr", lr.to_string()),
            ])?);
        }
    }
    Ok(sweep)
}

/// Layer stacks of depth 1..=2 with widths from {32, 64}.
fn layers() -> anyhow::Result<Vec<OverrideSet>> {
    let mut sweep = Vec::new();
    for depth in 1..=2 {
        for widths in cartesian_product(&vec![vec![32, 64]; depth]) {
            let widths: Vec<String> = widths.iter().map(ToString::to_string).collect();
            let layers = format!("[{}]", widths.join(","));
            sweep.push(OverrideSet::from_pairs([("+layers", layers)])?);
        }
    }
    Ok(sweep)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("sweepgen library example");

    let mut registry = EntrypointRegistry::new();
    registry
        .register("optimizer", optimizer)
        .register("layers", layers)
        .register("optimizer_with_layers", || {
            Ok(merge_overrides(&[optimizer()?, layers()?]))
        });
    println!("Registered entrypoints: {:?}", registry.names());

    let sweep_dir = std::env::temp_dir().join("sweepgen-example");
    let config = SweeperConfig::default()
        .with_entrypoint("optimizer_with_layers")
        .with_max_batch_size(8);

    let launcher = BasicLauncher::new(&sweep_dir, |ctx: &JobContext| {
        Ok(serde_json::json!({ "overrides": ctx.overrides }))
    });
    let mut controller = SweepController::new(config, &sweep_dir, registry, Box::new(launcher))?;

    let arguments = vec!["seed=range(3)".to_string()];
    let chunks = controller.plan(&arguments)?;
    println!("Planned {} chunks", chunks.len());

    let result = controller.sweep(&arguments).await?;
    let jobs: usize = result.iter().map(Vec::len).sum();
    println!("Ran {jobs} jobs in {} chunks", result.len());
    for job in result.iter().flatten().take(4) {
        println!("  #{} {}", job.job_idx, job.overrides.join(" "));
    }

    // CLI values win over entrypoint values for the same key
    let merged = BatchBuilder::merge(
        &OverrideSet::from_pairs([("optimizer", "adam")])?,
        &OverrideSet::from_pairs([("optimizer", "sgd"), ("+layers", "[32]")])?,
    );
    println!("Merged: {}", merged.render().join(" "));

    // Unknown entrypoints fail before anything is launched
    let result: SgResult<Vec<OverrideSet>> =
        EntrypointRunner::new(&EntrypointRegistry::new()).run(&["missing".to_string()]);
    if let Err(e) = result {
        println!("Error handling works: {}", e);
    }

    Ok(())
}
