use serde::{Deserialize, Serialize};

/// A raw row of the FAQ table. Columns other than `Question` and `Answer`
/// are ignored.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct FaqPair {
    #[serde(rename = "Question")]
    pub question: String,
    #[serde(rename = "Answer")]
    pub answer: String,
}

impl FaqPair {
    pub fn new(question: impl Into<String>, answer: impl Into<String>) -> Self {
        Self {
            question: question.into(),
            answer: answer.into(),
        }
    }
}

/// An indexed FAQ entry. The embedding is computed from the answer text once,
/// when the corpus is built.
#[derive(Debug, Clone, PartialEq)]
pub struct FaqEntry {
    pub question: String,
    pub answer: String,
    pub embedding: Vec<f32>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankedAnswer {
    pub question: String,
    pub answer: String,
    pub score: f32,
}
