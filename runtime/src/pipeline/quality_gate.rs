use serde::Serialize;

use crate::config::QualityConfig;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct QualityMetrics {
    pub text_chars: usize,
    pub image_placeholder_count: usize,
    pub image_placeholder_ratio: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FallbackReason {
    EmptyText,
    TooShort,
    ImagePlaceholderDensity,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct QualityAssessment {
    pub needs_fallback: bool,
    pub reason: Option<FallbackReason>,
    pub metrics: QualityMetrics,
}

#[derive(Debug, Clone, Default)]
pub struct QualityGate {
    config: QualityConfig,
}

impl QualityGate {
    pub fn new(config: QualityConfig) -> Self {
        Self { config }
    }

    pub fn metrics(&self, text: &str) -> QualityMetrics {
        let text_chars = text.chars().count();
        let token = self.config.image_placeholder_token.as_str();
        let image_placeholder_count = if token.is_empty() {
            0
        } else {
            text.matches(token).count()
        };
        let image_placeholder_ratio = if text_chars > 0 {
            image_placeholder_count as f64 / text_chars as f64
        } else {
            0.0
        };

        QualityMetrics {
            text_chars,
            image_placeholder_count,
            image_placeholder_ratio,
        }
    }

    pub fn assess(&self, text: &str) -> QualityAssessment {
        let metrics = self.metrics(text);
        let reason = if metrics.text_chars == 0 {
            Some(FallbackReason::EmptyText)
        } else if metrics.text_chars < self.config.min_text_chars {
            Some(FallbackReason::TooShort)
        } else if metrics.image_placeholder_ratio > self.config.max_image_placeholder_ratio {
            Some(FallbackReason::ImagePlaceholderDensity)
        } else {
            None
        };

        QualityAssessment {
            needs_fallback: reason.is_some(),
            reason,
            metrics,
        }
    }
}
