// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Human-readable error messages for the people capturing and entering forms.
//
// Every technical error is mapped to plain English with a clear suggestion.
// None of these failures clear up on their own: the remedy is always a better
// photo, a corrected template, or a fix to the setup.

use crate::error::{AlignmentFailure, FormwerkError};

/// Who has to act to get past an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// The photo is unusable and has to be taken again.
    Recapture,
    /// The template (or configuration) does not fit the form.
    FixTemplate,
    /// A setup or environment problem outside the form itself.
    Permanent,
}

/// A human-readable error with plain English message and actionable suggestion.
#[derive(Debug, Clone)]
pub struct HumanError {
    /// Plain English summary (shown as a heading).
    pub message: String,
    /// What the user should try (shown as body text).
    pub suggestion: String,
    /// Severity level.
    pub severity: Severity,
}

/// Convert a `FormwerkError` into a `HumanError` for display.
pub fn humanize_error(err: &FormwerkError) -> HumanError {
    match err {
        FormwerkError::NoMarkersFound => HumanError {
            message: "We couldn't see any of the printed corner marks.".into(),
            suggestion: "Take the photo again with the whole page in view, flat and well lit."
                .into(),
            severity: Severity::Recapture,
        },

        FormwerkError::MissingMarker(ids) => HumanError {
            message: "Some printed marks on the form couldn't be found.".into(),
            suggestion: format!(
                "Make sure nothing covers the page and retake the photo. (Missing marks: {})",
                join_ids(ids)
            ),
            severity: Severity::Recapture,
        },

        FormwerkError::AlignmentFailed(failure) => match failure {
            AlignmentFailure::MissingMarkers(ids) => HumanError {
                message: "Not all four page corners are visible.".into(),
                suggestion: format!(
                    "Fit the whole page in the photo, including all four corner squares. (Missing: {})",
                    join_ids(ids)
                ),
                severity: Severity::Recapture,
            },
            AlignmentFailure::AmbiguousRoles | AlignmentFailure::DegenerateTransform => {
                HumanError {
                    message: "The page is too tilted or turned to straighten.".into(),
                    suggestion: "Hold the camera above the page, upright, and try again.".into(),
                    severity: Severity::Recapture,
                }
            }
        },

        FormwerkError::MarkerResolutionFailed { region, missing } => HumanError {
            message: format!("We couldn't find the field '{region}' on the page."),
            suggestion: format!(
                "Check that the marks around this field are printed and visible, or correct the template. (Missing marks: {})",
                join_ids(missing)
            ),
            severity: Severity::Recapture,
        },

        FormwerkError::DegenerateRegion { region } => HumanError {
            message: format!("The field '{region}' falls outside the page."),
            suggestion: "The template's position for this field needs correcting.".into(),
            severity: Severity::FixTemplate,
        },

        FormwerkError::InvalidTemplate(detail) => HumanError {
            message: "This form template has a mistake in it.".into(),
            suggestion: format!("Ask whoever made the template to fix it. ({detail})"),
            severity: Severity::FixTemplate,
        },

        FormwerkError::InvalidConfig(detail) => HumanError {
            message: "The scanner settings are not valid.".into(),
            suggestion: format!("Restore the default settings. ({detail})"),
            severity: Severity::FixTemplate,
        },

        FormwerkError::ImageError(detail) => HumanError {
            message: "This picture couldn't be read.".into(),
            suggestion: format!("Try saving the photo as a JPEG or PNG and open it again. ({detail})"),
            severity: Severity::Recapture,
        },

        FormwerkError::OcrError(detail) => HumanError {
            message: "Handwriting recognition isn't working.".into(),
            suggestion: format!("The text recognition models may be missing. ({detail})"),
            severity: Severity::Permanent,
        },

        FormwerkError::Cancelled => HumanError {
            message: "Reading the form was stopped.".into(),
            suggestion: "Start again when you're ready.".into(),
            severity: Severity::Permanent,
        },

        FormwerkError::Io(io_err) => HumanError {
            message: "A file couldn't be opened or saved.".into(),
            suggestion: format!("Check the file exists and you have permission to use it. ({io_err})"),
            severity: Severity::Permanent,
        },

        FormwerkError::Serialization(detail) => HumanError {
            message: "A settings or template file is damaged.".into(),
            suggestion: format!("Check the file is valid JSON. ({detail})"),
            severity: Severity::FixTemplate,
        },
    }
}

fn join_ids(ids: &[u32]) -> String {
    ids.iter()
        .map(u32::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn alignment_shortfall_asks_for_recapture() {
        let err = FormwerkError::AlignmentFailed(AlignmentFailure::MissingMarkers(vec![102]));
        let human = humanize_error(&err);
        assert_eq!(human.severity, Severity::Recapture);
        assert!(human.suggestion.contains("102"));
    }

    #[test]
    fn template_mistakes_are_not_recaptures() {
        let human = humanize_error(&FormwerkError::InvalidTemplate("duplicate name".into()));
        assert_eq!(human.severity, Severity::FixTemplate);
    }
}
