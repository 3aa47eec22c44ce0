use tagbot_core::config::ConfigOverrides;
use tagbot_db::{DemoDataset, SeedResult};

use crate::commands::{open_database, prepare, to_data, CommandResult, StepError};

pub fn run() -> CommandResult {
    let (config, runtime) = match prepare("seed", ConfigOverrides::default()) {
        Ok(prepared) => prepared,
        Err(failure) => return failure,
    };

    let result = runtime.block_on(async {
        let pool = open_database(&config).await?;

        let seeded = DemoDataset::load(&pool)
            .await
            .map_err(|error| ("seed_execution", error.to_string(), 5u8))?;
        let verification = DemoDataset::verify(&pool)
            .await
            .map_err(|error| ("seed_verification", error.to_string(), 6u8))?;

        pool.close().await;

        let failed_checks = verification
            .checks
            .iter()
            .filter_map(|(check, passed)| (!passed).then_some(check.as_str()))
            .collect::<Vec<_>>();
        if failed_checks.is_empty() {
            Ok::<SeedResult, StepError>(seeded)
        } else {
            Err(("seed_verification", verification_failure_message(&failed_checks), 6u8))
        }
    });

    match result {
        Ok(seeded) => {
            let message = format!(
                "demo dataset loaded: {} components, {} tag rows ({} distinct tags)",
                seeded.components_seeded,
                seeded.tag_rows_seeded,
                seeded.distinct_tags.len()
            );
            CommandResult::success_with_data("seed", message, to_data(&seeded))
        }
        Err((error_class, message, exit_code)) => {
            CommandResult::failure("seed", error_class, message, exit_code)
        }
    }
}

fn verification_failure_message(failed_checks: &[&str]) -> String {
    if failed_checks.is_empty() {
        "Some seed data failed to load".to_string()
    } else {
        format!("Seed verification failed for checks: {}", failed_checks.join(", "))
    }
}
