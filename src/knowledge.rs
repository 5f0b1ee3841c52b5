use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

const DEFAULT_PATH: &str = "psychology.json";

/// A group of trigger patterns sharing a pool of candidate responses.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QnaEntry {
    pub patterns: Vec<String>,
    pub responses: Vec<String>,
}

/// A multiple-choice question. `correct` indexes into `options`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuizQuestion {
    pub question: String,
    pub options: Vec<String>,
    pub correct: usize,
}

/// Static dataset backing the responder and the quiz popup. Loaded once
/// at startup and read-only afterwards; missing sections parse as empty.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct KnowledgeBase {
    #[serde(default)]
    pub explanation: Vec<String>,
    #[serde(default)]
    pub qna: Vec<QnaEntry>,
    #[serde(default)]
    pub quiz: Vec<QuizQuestion>,
}

impl KnowledgeBase {
    /// Parse a knowledge base file.
    pub async fn load(path: &Path) -> Result<Self> {
        let content = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("failed to read knowledge base {}", path.display()))?;
        let kb: KnowledgeBase = serde_json::from_str(&content)
            .with_context(|| format!("failed to parse knowledge base {}", path.display()))?;
        Ok(kb)
    }

    /// Load the configured file, or `psychology.json` next to the binary,
    /// or the built-in dataset when neither loads. Never fails: an
    /// unreadable file only costs the custom content.
    pub async fn load_with_fallback(override_path: Option<&Path>) -> Self {
        let path = override_path.unwrap_or_else(|| Path::new(DEFAULT_PATH));
        match Self::load(path).await {
            Ok(kb) => {
                tracing::info!(
                    path = %path.display(),
                    qna = kb.qna.len(),
                    explanations = kb.explanation.len(),
                    quiz = kb.quiz.len(),
                    "loaded knowledge base"
                );
                kb
            }
            Err(err) => {
                tracing::warn!(
                    path = %path.display(),
                    error = %err,
                    "knowledge base unavailable, using built-in dataset"
                );
                Self::builtin()
            }
        }
    }

    /// The compiled-in dataset used when no knowledge base file loads.
    pub fn builtin() -> Self {
        Self {
            explanation: vec![
                "Psychology is the scientific study of the mind and behavior.".to_string(),
                "Major perspectives in psychology include biological, cognitive, behavioral, and psychodynamic approaches.".to_string(),
                "Psychologists study mental processes, brain functions, and behavior through various research methods.".to_string(),
                "Applied psychology includes clinical, counseling, educational, and organizational psychology.".to_string(),
            ],
            qna: vec![
                QnaEntry {
                    patterns: vec![
                        "what is psychology".to_string(),
                        "define psychology".to_string(),
                        "psychology meaning".to_string(),
                    ],
                    responses: vec![
                        "Psychology is the scientific study of the human mind and its functions, especially those affecting behavior in a given context.".to_string(),
                        "Psychology encompasses the study of conscious and unconscious phenomena, including feelings and thoughts.".to_string(),
                    ],
                },
                QnaEntry {
                    patterns: vec![
                        "what is cognitive behavioral therapy".to_string(),
                        "what is cbt".to_string(),
                    ],
                    responses: vec![
                        "Cognitive Behavioral Therapy (CBT) is a psychotherapy treatment that helps patients understand how thoughts and feelings influence behaviors.".to_string(),
                        "CBT is a short-term, goal-oriented therapy that focuses on changing patterns of thinking or behavior behind people's difficulties.".to_string(),
                    ],
                },
            ],
            quiz: vec![
                QuizQuestion {
                    question: "Who founded psychoanalysis?".to_string(),
                    options: vec![
                        "B.F. Skinner".to_string(),
                        "Sigmund Freud".to_string(),
                        "Carl Rogers".to_string(),
                        "Ivan Pavlov".to_string(),
                    ],
                    correct: 1,
                },
                QuizQuestion {
                    question: "Which part of the brain is primarily responsible for memory?".to_string(),
                    options: vec![
                        "Cerebellum".to_string(),
                        "Hippocampus".to_string(),
                        "Amygdala".to_string(),
                        "Frontal lobe".to_string(),
                    ],
                    correct: 1,
                },
            ],
        }
    }
}
