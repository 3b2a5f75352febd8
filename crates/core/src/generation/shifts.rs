//! The fixed set of time-shift parameters.

use super::types::TaskParam;

/// Year offsets generated for every source image, in slider order.
pub const DEFAULT_YEAR_OFFSETS: [i32; 6] = [-20, -10, 10, 20, 40, 60];

/// Display label for an offset, e.g. `-10 years` or `+40 years`.
pub fn label_for_offset(years: i32) -> String {
    format!("{:+} years", years)
}

/// Instruction sent to the generation service for an offset.
pub fn directive_for_offset(years: i32) -> String {
    let direction = if years < 0 { "younger" } else { "older" };
    format!(
        "Edit this photo so the person looks {} years {}. \
         Keep their identity, pose, expression, clothing, framing and background unchanged; \
         only change age-related features such as skin, hair and facial structure. \
         Return a photorealistic image.",
        years.unsigned_abs(),
        direction
    )
}

/// Task parameters for a list of offsets, keeping the given order.
pub fn task_params_for_offsets(offsets: &[i32]) -> Vec<TaskParam> {
    offsets
        .iter()
        .map(|&years| TaskParam::new(label_for_offset(years), directive_for_offset(years)))
        .collect()
}

/// The default ordered parameter set.
pub fn default_task_params() -> Vec<TaskParam> {
    task_params_for_offsets(&DEFAULT_YEAR_OFFSETS)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_labels() {
        assert_eq!(label_for_offset(-20), "-20 years");
        assert_eq!(label_for_offset(40), "+40 years");
    }

    #[test]
    fn test_directive_direction() {
        assert!(directive_for_offset(-10).contains("10 years younger"));
        assert!(directive_for_offset(60).contains("60 years older"));
    }

    #[test]
    fn test_default_params_unique_and_ordered() {
        let params = default_task_params();
        assert_eq!(params.len(), 6);

        let labels: Vec<&str> = params.iter().map(|p| p.label.as_str()).collect();
        assert_eq!(
            labels,
            vec![
                "-20 years",
                "-10 years",
                "+10 years",
                "+20 years",
                "+40 years",
                "+60 years"
            ]
        );

        let unique: HashSet<_> = params.iter().map(|p| &p.label).collect();
        assert_eq!(unique.len(), params.len());
    }
}
