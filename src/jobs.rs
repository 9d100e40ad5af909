// src/jobs.rs

//! Build parallelism under a memory ceiling

use crate::error::{Error, Result};
use tracing::info;

/// Environment variable holding the memory ceiling in gigabytes
pub const MAX_RAM_ENV: &str = "STOCKPOT_BUILD_MAX_RAM_GB";

/// Number of parallel jobs to hand the build tool
///
/// `min(requested, floor(max_ram_gb / per_job_gb))`, never below 1. Without a
/// ceiling, or for recipes that declare no per-job estimate, the requested
/// count is used as is. A ceiling of zero or less is a configuration error.
pub fn constrained_jobs(requested: u32, max_ram_gb: Option<f64>, per_job_gb: Option<f64>) -> Result<u32> {
    let requested = requested.max(1);

    let Some(max_ram_gb) = max_ram_gb else {
        return Ok(requested);
    };
    if !max_ram_gb.is_finite() || max_ram_gb <= 0.0 {
        return Err(Error::ConfigurationError(format!(
            "{} must be more than zero (got {})",
            MAX_RAM_ENV, max_ram_gb
        )));
    }

    let Some(per_job_gb) = per_job_gb.filter(|p| *p > 0.0) else {
        return Ok(requested);
    };

    let cap = (max_ram_gb / per_job_gb).floor().max(1.0);
    let cap = if cap >= u32::MAX as f64 { u32::MAX } else { cap as u32 };
    let jobs = requested.min(cap);

    if jobs < requested {
        info!(
            "Limiting build to {} jobs ({} GB available, ~{} GB per job)",
            jobs, max_ram_gb, per_job_gb
        );
    }
    Ok(jobs)
}
