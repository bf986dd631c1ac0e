use crate::model::WebObservation;

use super::violation::{ContractViolation, Verdict};

pub const HTTP_STATUS_RANGE: std::ops::RangeInclusive<i32> = 100..=599;

/// 感知层输出的一致性检查
#[derive(Clone, Copy, Debug, Default)]
pub struct ObservationChecker;

impl ObservationChecker {
    pub fn new() -> Self {
        Self
    }

    /// `first_in_step` 决定 `last_action_feedback` 应为空还是必须存在
    pub fn check(&self, observation: &WebObservation, first_in_step: bool) -> Verdict {
        let mut violations: Vec<ContractViolation> = observation
            .key_elements
            .iter()
            .filter(|element| !element.bbox.is_valid())
            .map(|element| ContractViolation::InvalidBoundingBox {
                element_id: element.element_id.clone(),
            })
            .collect();

        if !HTTP_STATUS_RANGE.contains(&observation.http_status_code) {
            violations.push(ContractViolation::InvalidHttpStatus {
                value: observation.http_status_code,
            });
        }
        if observation.page_load_time_ms < 0 {
            violations.push(ContractViolation::NegativeLoadTime {
                value: observation.page_load_time_ms,
            });
        }

        match (first_in_step, observation.last_action_feedback.is_some()) {
            (true, true) => violations.push(ContractViolation::UnexpectedFeedback),
            (false, false) => violations.push(ContractViolation::MissingFeedback),
            _ => {}
        }

        Verdict::from_violations(violations)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ActionFeedback, BoundingBox, KeyElement};

    fn element(id: &str, bbox: BoundingBox) -> KeyElement {
        KeyElement::new(id, "a", format!("//a[@id='{id}']"), bbox)
    }

    #[test]
    fn first_observation_must_not_carry_feedback() {
        let clean = WebObservation::builder("https://example.com").build();
        assert!(ObservationChecker.check(&clean, true).is_valid());

        let with_feedback = WebObservation::builder("https://example.com")
            .feedback(Some(ActionFeedback::success("ok")))
            .build();
        assert_eq!(
            ObservationChecker.check(&with_feedback, true).violations(),
            &[ContractViolation::UnexpectedFeedback]
        );
        assert!(ObservationChecker.check(&with_feedback, false).is_valid());
        assert_eq!(
            ObservationChecker.check(&clean, false).violations(),
            &[ContractViolation::MissingFeedback]
        );
    }

    #[test]
    fn http_status_must_be_a_real_status() {
        for status in [100, 200, 404, 599] {
            let observation = WebObservation::builder("https://example.com")
                .http_status(status)
                .build();
            assert!(ObservationChecker.check(&observation, true).is_valid());
        }
        for status in [0, 99, 600, -1] {
            let observation = WebObservation::builder("https://example.com")
                .http_status(status)
                .build();
            assert_eq!(
                ObservationChecker.check(&observation, true).violations(),
                &[ContractViolation::InvalidHttpStatus { value: status }]
            );
        }
    }

    #[test]
    fn reports_each_bad_bbox_and_negative_load_time() {
        let observation = WebObservation::builder("https://example.com")
            .element(element("ok", BoundingBox::new(0.0, 0.0, 10.0, 10.0)))
            .element(element("flipped", BoundingBox::new(10.0, 0.0, 0.0, 10.0)))
            .page_load_time_ms(-5)
            .build();
        let verdict = ObservationChecker.check(&observation, true);
        assert_eq!(
            verdict.violations(),
            &[
                ContractViolation::InvalidBoundingBox {
                    element_id: "flipped".into()
                },
                ContractViolation::NegativeLoadTime { value: -5 },
            ]
        );
    }
}
