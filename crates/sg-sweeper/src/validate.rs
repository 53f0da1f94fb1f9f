//! Legality checks run once over the full job list, before chunking.

use std::collections::HashSet;

use sg_types::{normalize_key, BatchError};

use crate::batch::RenderedOverrides;

/// Rejects a job collection the launcher cannot or should not run.
pub trait BatchValidator: Send + Sync {
    fn validate(&self, batches: &[RenderedOverrides]) -> Result<(), BatchError>;

    /// Human-readable validator name.
    fn name(&self) -> &str;
}

/// Every rendered job must be `key=value` strings with distinct keys.
#[derive(Debug, Clone, Copy, Default)]
pub struct KeyCollisionValidator;

impl BatchValidator for KeyCollisionValidator {
    fn validate(&self, batches: &[RenderedOverrides]) -> Result<(), BatchError> {
        for (job, overrides) in batches.iter().enumerate() {
            let mut keys = HashSet::with_capacity(overrides.len());
            for rendered in overrides {
                let (raw_key, _) =
                    rendered
                        .split_once('=')
                        .ok_or_else(|| BatchError::LegalityViolation {
                            job,
                            message: format!("'{rendered}' is not key=value"),
                        })?;
                if !keys.insert(normalize_key(raw_key)) {
                    return Err(BatchError::LegalityViolation {
                        job,
                        message: format!("key '{}' is set twice", normalize_key(raw_key)),
                    });
                }
            }
        }
        Ok(())
    }

    fn name(&self) -> &str {
        "key_collision"
    }
}

/// Caps the total number of jobs in one sweep.
#[derive(Debug, Clone, Copy)]
pub struct JobLimitValidator {
    pub max_jobs: usize,
}

impl JobLimitValidator {
    pub fn new(max_jobs: usize) -> Self {
        Self { max_jobs }
    }
}

impl BatchValidator for JobLimitValidator {
    fn validate(&self, batches: &[RenderedOverrides]) -> Result<(), BatchError> {
        if batches.len() > self.max_jobs {
            return Err(BatchError::TooManyJobs {
                count: batches.len(),
                limit: self.max_jobs,
            });
        }
        Ok(())
    }

    fn name(&self) -> &str {
        "job_limit"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn jobs(raw: &[&[&str]]) -> Vec<RenderedOverrides> {
        raw.iter()
            .map(|job| job.iter().map(|s| s.to_string()).collect())
            .collect()
    }

    #[test]
    fn distinct_keys_pass() {
        let batches = jobs(&[&["foo=1", "+bar=0"], &["foo=2", "+bar=0"]]);
        assert!(KeyCollisionValidator.validate(&batches).is_ok());
    }

    #[test]
    fn repeated_key_fails() {
        let batches = jobs(&[&["foo=1"], &["foo=1", "+foo=2"]]);
        let err = KeyCollisionValidator.validate(&batches).unwrap_err();
        assert_eq!(
            err,
            BatchError::LegalityViolation {
                job: 1,
                message: "key 'foo' is set twice".to_string(),
            }
        );
    }

    #[test]
    fn missing_equals_fails() {
        let batches = jobs(&[&["foo"]]);
        assert!(KeyCollisionValidator.validate(&batches).is_err());
    }

    #[test]
    fn job_limit() {
        let batches = jobs(&[&["a=1"], &["a=2"], &["a=3"]]);
        assert!(JobLimitValidator::new(3).validate(&batches).is_ok());
        assert_eq!(
            JobLimitValidator::new(2).validate(&batches).unwrap_err(),
            BatchError::TooManyJobs { count: 3, limit: 2 }
        );
    }
}
