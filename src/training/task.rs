//! Task-type resolution for a request.

use super::algorithm::{Algorithm, TaskRule, TaskType};
use crate::data::TargetVector;
use crate::error::{Result, TabfitError};
use tracing::debug;

/// Dual-mode targets with fewer distinct values than this are classified.
pub const CLASSIFICATION_THRESHOLD: usize = 20;

/// Decide the task an algorithm runs as, given the (null-free) target.
///
/// Unsupervised algorithms ignore the target. Regression, whether forced or
/// inferred, requires every target value to coerce to a number.
pub fn resolve_task_type(algorithm: Algorithm, target: Option<&TargetVector>) -> Result<TaskType> {
    let rule = algorithm.task_rule();
    if rule == TaskRule::Unsupervised {
        return Ok(TaskType::Clustering);
    }

    let target = target
        .ok_or_else(|| TabfitError::TargetRequired(algorithm.target_requirement().to_string()))?;

    let task = match rule {
        TaskRule::RegressionOnly => TaskType::Regression,
        TaskRule::ClassificationOnly => TaskType::Classification,
        TaskRule::DualMode => {
            let distinct = target.n_distinct();
            debug!(
                target = %target.name,
                distinct,
                textual = target.is_textual(),
                "inferring task type"
            );
            if target.is_textual() || distinct < CLASSIFICATION_THRESHOLD {
                TaskType::Classification
            } else {
                TaskType::Regression
            }
        }
        TaskRule::Unsupervised => TaskType::Clustering,
    };

    if task == TaskType::Regression {
        target.to_numeric()?;
    }
    Ok(task)
}
