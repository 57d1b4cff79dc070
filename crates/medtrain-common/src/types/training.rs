//! Trainings, device types, quiz questions and device manuals

use crate::error::{CommonError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Default display scale for training and device images, in percent
pub const DEFAULT_IMAGE_SCALE: u32 = 100;

/// Default passing threshold for a device quiz, in percent
pub const DEFAULT_PASSING_PERCENTAGE: u32 = 70;

fn default_image_scale() -> u32 {
    DEFAULT_IMAGE_SCALE
}

fn default_passing_percentage() -> u32 {
    DEFAULT_PASSING_PERCENTAGE
}

/// A course grouping several device types
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Training {
    pub id: String,
    pub title: String,
    pub description: String,
    #[serde(default)]
    pub image_url: String,
    #[serde(default = "default_image_scale")]
    pub image_scale: u32,
    #[serde(default)]
    pub device_types: Vec<DeviceType>,
}

impl Training {
    pub fn device(&self, device_id: &str) -> Option<&DeviceType> {
        self.device_types.iter().find(|device| device.id == device_id)
    }

    pub fn device_mut(&mut self, device_id: &str) -> Option<&mut DeviceType> {
        self.device_types.iter_mut().find(|device| device.id == device_id)
    }

    pub fn has_device(&self, device_id: &str) -> bool {
        self.device(device_id).is_some()
    }
}

/// A device within a training, with its quiz and optional manual.
///
/// `training_id` is a back-reference; the owning training holds the device.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceType {
    pub id: String,
    pub training_id: String,
    pub title: String,
    pub description: String,
    #[serde(default)]
    pub image_url: String,
    #[serde(default = "default_image_scale")]
    pub image_scale: u32,
    #[serde(default = "default_passing_percentage")]
    pub passing_percentage: u32,
    #[serde(default)]
    pub questions: Vec<Question>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub documentation: Option<DeviceDocument>,
}

impl DeviceType {
    pub fn has_quiz(&self) -> bool {
        !self.questions.is_empty()
    }

    pub fn question(&self, question_id: &str) -> Option<&Question> {
        self.questions.iter().find(|question| question.id == question_id)
    }
}

/// Answer mode of a question
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QuestionType {
    Single,
    Multiple,
}

impl std::fmt::Display for QuestionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            QuestionType::Single => write!(f, "single"),
            QuestionType::Multiple => write!(f, "multiple"),
        }
    }
}

impl std::str::FromStr for QuestionType {
    type Err = CommonError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "single" => Ok(QuestionType::Single),
            "multiple" | "multi" => Ok(QuestionType::Multiple),
            other => Err(CommonError::InvalidQuestionType(other.to_string())),
        }
    }
}

/// A quiz question. `correct_answers` holds option indices.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Question {
    pub id: String,
    pub text: String,
    #[serde(rename = "type")]
    pub question_type: QuestionType,
    pub options: Vec<String>,
    pub correct_answers: BTreeSet<usize>,
}

impl Question {
    /// Build a question, enforcing its shape.
    ///
    /// Blank options are dropped before the checks; correct indices refer to
    /// the options as given, so they are remapped onto the kept ones.
    pub fn new(
        text: impl Into<String>,
        question_type: QuestionType,
        options: Vec<String>,
        correct_answers: impl IntoIterator<Item = usize>,
    ) -> Result<Self> {
        let text = text.into();
        if text.trim().is_empty() {
            return Err(CommonError::InvalidQuestion("question text is empty".into()));
        }

        let correct: BTreeSet<usize> = correct_answers.into_iter().collect();
        if let Some(out_of_range) = correct.iter().find(|&&index| index >= options.len()) {
            return Err(CommonError::InvalidQuestion(format!(
                "correct answer {out_of_range} does not refer to an option"
            )));
        }

        let mut kept = Vec::with_capacity(options.len());
        let mut remapped = BTreeSet::new();
        for (index, option) in options.into_iter().enumerate() {
            if option.trim().is_empty() {
                if correct.contains(&index) {
                    return Err(CommonError::InvalidQuestion(format!(
                        "correct answer {index} is a blank option"
                    )));
                }
                continue;
            }
            if correct.contains(&index) {
                remapped.insert(kept.len());
            }
            kept.push(option.trim().to_string());
        }

        if kept.len() < 2 {
            return Err(CommonError::InvalidQuestion(
                "a question needs at least two options".into(),
            ));
        }

        match (question_type, remapped.len()) {
            (QuestionType::Single, 1) => {}
            (QuestionType::Single, n) => {
                return Err(CommonError::InvalidQuestion(format!(
                    "a single-choice question needs exactly one correct answer, got {n}"
                )))
            }
            (QuestionType::Multiple, 0) => {
                return Err(CommonError::InvalidQuestion(
                    "a multiple-choice question needs at least one correct answer".into(),
                ))
            }
            (QuestionType::Multiple, _) => {}
        }

        Ok(Self {
            id: super::new_id(),
            text,
            question_type,
            options: kept,
            correct_answers: remapped,
        })
    }

    /// Re-run the shape checks of [`Question::new`] on a question built
    /// elsewhere, keeping its id
    pub fn validated(self) -> Result<Self> {
        let id = self.id;
        let question = Self::new(self.text, self.question_type, self.options, self.correct_answers)?;
        Ok(Self { id, ..question })
    }

    /// Exact set match; partial selections score nothing
    pub fn is_answered_by(&self, selection: &BTreeSet<usize>) -> bool {
        *selection == self.correct_answers
    }

    pub fn has_option(&self, index: usize) -> bool {
        index < self.options.len()
    }
}

/// Uploaded manual for a device.
///
/// `version` is an increasing integer kept as a string. `file_handle` is the
/// content hash of the stored PDF.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceDocument {
    pub id: String,
    pub device_id: String,
    pub file_name: String,
    pub file_size: u64,
    pub upload_date: DateTime<Utc>,
    pub version: String,
    #[serde(default)]
    pub downloads: Vec<DocumentDownload>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_handle: Option<String>,
}

impl DeviceDocument {
    /// Numeric version; a corrupt value counts as 0
    pub fn version_number(&self) -> u64 {
        self.version.trim().parse().unwrap_or(0)
    }

    /// Version string for the upload that replaces `previous`
    pub fn next_version(previous: Option<&DeviceDocument>) -> String {
        let current = previous.map(DeviceDocument::version_number).unwrap_or(0);
        (current + 1).to_string()
    }
}

/// One download of a device manual. Never changed after creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentDownload {
    pub id: String,
    pub user_id: String,
    pub username: String,
    pub document_id: String,
    pub download_date: DateTime<Utc>,
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use serde_json::json;

    fn options(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_question_drops_blank_options_and_remaps() {
        let question = Question::new(
            "Which alarms are audible?",
            QuestionType::Multiple,
            options(&["Occlusion", "  ", "Low battery", ""]),
            [0, 2],
        )
        .unwrap();

        assert_eq!(question.options, options(&["Occlusion", "Low battery"]));
        assert_eq!(question.correct_answers, BTreeSet::from([0, 1]));
    }

    #[test]
    fn test_single_choice_needs_exactly_one_answer() {
        let err = Question::new("Q", QuestionType::Single, options(&["a", "b", "c"]), [0, 1]);
        assert!(matches!(err, Err(CommonError::InvalidQuestion(_))));

        let none = Question::new("Q", QuestionType::Single, options(&["a", "b"]), Vec::new());
        assert!(none.is_err());

        assert!(Question::new("Q", QuestionType::Single, options(&["a", "b"]), [1]).is_ok());
    }

    #[test]
    fn test_question_rejects_bad_shapes() {
        assert!(Question::new(" ", QuestionType::Single, options(&["a", "b"]), [0]).is_err());
        assert!(Question::new("Q", QuestionType::Single, options(&["a", ""]), [0]).is_err());
        assert!(Question::new("Q", QuestionType::Multiple, options(&["a", "b"]), [5]).is_err());
        assert!(Question::new("Q", QuestionType::Multiple, options(&["a", "", "b"]), [1]).is_err());
    }

    #[test]
    fn test_validated_keeps_id_and_rejects_bad_shapes() {
        let stored = Question {
            id: "q-legacy".to_string(),
            text: "Rate?".to_string(),
            question_type: QuestionType::Single,
            options: options(&["a", "b"]),
            correct_answers: BTreeSet::from([1]),
        };
        assert_eq!(stored.clone().validated().unwrap(), stored);

        let broken = Question {
            id: "q-broken".to_string(),
            text: String::new(),
            question_type: QuestionType::Single,
            options: options(&["a"]),
            correct_answers: BTreeSet::from([0, 5]),
        };
        assert!(matches!(broken.validated(), Err(CommonError::InvalidQuestion(_))));
    }

    #[test]
    fn test_exact_set_match() {
        let question = Question::new("Q", QuestionType::Multiple, options(&["a", "b", "c"]), [0, 2])
            .unwrap();

        assert!(question.is_answered_by(&BTreeSet::from([0, 2])));
        assert!(!question.is_answered_by(&BTreeSet::from([0])));
        assert!(!question.is_answered_by(&BTreeSet::from([0, 1, 2])));
    }

    #[test]
    fn test_question_type_json_shape() {
        let value: Question = serde_json::from_value(json!({
            "id": "q1",
            "text": "Q",
            "type": "single",
            "options": ["a", "b"],
            "correctAnswers": [1]
        }))
        .unwrap();
        assert_eq!(value.question_type, QuestionType::Single);
        assert_eq!("MULTI".parse::<QuestionType>().unwrap(), QuestionType::Multiple);
    }

    #[test]
    fn test_training_graph_survives_persistence() {
        let training = Training {
            id: "t1".into(),
            title: "Infusion".into(),
            description: "Pumps and syringes".into(),
            image_url: "https://example.org/pump.png".into(),
            image_scale: 80,
            device_types: vec![DeviceType {
                id: "d1".into(),
                training_id: "t1".into(),
                title: "Volumetric pump".into(),
                description: "VP-200".into(),
                image_url: String::new(),
                image_scale: 100,
                passing_percentage: 70,
                questions: vec![Question::new(
                    "Q",
                    QuestionType::Multiple,
                    options(&["a", "b", "c"]),
                    [0, 2],
                )
                .unwrap()],
                documentation: Some(DeviceDocument {
                    id: "doc1".into(),
                    device_id: "d1".into(),
                    file_name: "manual.pdf".into(),
                    file_size: 1024,
                    upload_date: Utc::now(),
                    version: "2".into(),
                    downloads: vec![],
                    file_handle: Some("ab".repeat(32)),
                }),
            }],
        };

        let json = serde_json::to_string(&training).unwrap();
        assert!(json.contains("\"deviceTypes\""));
        assert!(json.contains("\"passingPercentage\":70"));
        let reloaded: Training = serde_json::from_str(&json).unwrap();
        assert_eq!(reloaded, training);
    }

    #[test]
    fn test_document_versions() {
        assert_eq!(DeviceDocument::next_version(None), "1");

        let mut doc = DeviceDocument {
            id: "doc".into(),
            device_id: "d".into(),
            file_name: "m.pdf".into(),
            file_size: 1,
            upload_date: Utc::now(),
            version: "3".into(),
            downloads: vec![],
            file_handle: None,
        };
        assert_eq!(DeviceDocument::next_version(Some(&doc)), "4");

        doc.version = "v?".into();
        assert_eq!(DeviceDocument::next_version(Some(&doc)), "1");
    }

    #[test]
    fn test_device_defaults_when_fields_missing() {
        let device: DeviceType = serde_json::from_value(json!({
            "id": "d1",
            "trainingId": "t1",
            "title": "Monitor",
            "description": ""
        }))
        .unwrap();

        assert_eq!(device.passing_percentage, DEFAULT_PASSING_PERCENTAGE);
        assert_eq!(device.image_scale, DEFAULT_IMAGE_SCALE);
        assert!(!device.has_quiz());
    }
}
